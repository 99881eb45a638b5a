use fio_bench_summary_model::{GroupKey, JobMetrics, MeanRecord, RunCollection};
use serde::Serialize;

use crate::aggregator::Aggregator;

mod console;
mod json;
mod xlsx;

pub use console::ConsoleReport;
pub use json::JsonReport;
pub use xlsx::XlsxReport;

/// Report headers, in column order.
pub const COLUMNS: [&str; 15] = [
    "groupid",
    "测试名称",
    "测试描述",
    "读写模式",
    "块大小",
    "IO队列深度",
    "并发job数",
    "读取量(MB)",
    "写入量(MB)",
    "读取带宽(MB/s)",
    "写入带宽(MB/s)",
    "读取IOPS(次/秒)",
    "写入IOPS(次/秒)",
    "总延迟均值(毫秒)",
    "CPU总使用率(%)",
];

/// Sheet holding the mean of every job.
pub const MEAN_SHEET_NAME: &str = "均值汇总";

/// Columns are sized to their longest value plus this padding.
const COLUMN_PADDING: usize = 3;
const MAX_COLUMN_WIDTH: usize = 25;

/// Everything a report shows: the records of each trial and the means across them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchSummary {
    pub runs: RunCollection,
    pub means: Vec<MeanRecord>,
}

impl BenchSummary {
    /// Aggregate the trials into a summary.
    pub fn new(runs: RunCollection) -> Self {
        let means = Aggregator::aggregate(&runs);
        Self { runs, means }
    }
}

/// A destination for a [BenchSummary].
pub trait ReportEmitter {
    type Error;

    fn emit(&mut self, summary: &BenchSummary) -> Result<(), Self::Error>;
}

/// The sheet of one trial.
pub fn trial_sheet_name(trial: usize) -> String {
    format!("第{trial}次")
}

/// A single report cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Text(text) => write!(f, "{text}"),
            Cell::Number(number) => write!(f, "{number}"),
        }
    }
}

/// Lay out one job as a row of cells, in [COLUMNS] order.
pub fn row_cells(key: &GroupKey, metrics: &JobMetrics) -> Vec<Cell> {
    let mut cells = Vec::with_capacity(COLUMNS.len());
    cells.push(Cell::Number(key.group_id as f64));
    cells.extend(
        [
            &key.job_name,
            &key.description,
            &key.mode,
            &key.block_size,
            &key.queue_depth,
            &key.job_count,
        ]
        .map(|text| Cell::Text(text.clone())),
    );
    cells.extend(metrics.values().map(Cell::Number));
    cells
}

/// The width of every column: the longest value in characters, header included, plus padding,
/// capped at 25.
pub fn column_widths(rows: &[Vec<Cell>]) -> Vec<usize> {
    COLUMNS
        .iter()
        .enumerate()
        .map(|(col, header)| {
            let longest = rows
                .iter()
                .filter_map(|row| row.get(col))
                .map(|cell| cell.to_string().chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or_default();
            (longest + COLUMN_PADDING).min(MAX_COLUMN_WIDTH)
        })
        .collect()
}
