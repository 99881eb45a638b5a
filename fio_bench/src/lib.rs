//! Runs an fio job file several times and reports the mean result of every job.

pub mod cli;
mod pipeline;

pub use pipeline::{run_benchmarks, summarise, BatchOutcome};
