//! Turns fio results into reports.
//!
//! [MetricsExtractor] reads the JSON result of one trial, [Aggregator] averages the jobs of every
//! trial and a [ReportEmitter] writes the outcome.

mod aggregator;
mod extract;
pub mod report;

pub use aggregator::Aggregator;
pub use extract::{ExtractError, MetricsExtractor};
pub use report::{BenchSummary, ConsoleReport, JsonReport, ReportEmitter, XlsxReport};
