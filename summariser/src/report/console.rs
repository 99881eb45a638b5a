use std::io::{Stdout, Write};

use fio_bench_summary_model::MeanRecord;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::report::{BenchSummary, ReportEmitter};

#[derive(Tabled)]
struct MeanRow {
    #[tabled(rename = "groupid")]
    group_id: i64,
    #[tabled(rename = "测试名称")]
    job_name: String,
    #[tabled(rename = "测试描述")]
    description: String,
    #[tabled(rename = "读写模式")]
    mode: String,
    #[tabled(rename = "块大小")]
    block_size: String,
    #[tabled(rename = "IO队列深度")]
    queue_depth: String,
    #[tabled(rename = "并发job数")]
    job_count: String,
    #[tabled(rename = "读取量(MB)", display = "float2")]
    read_mb: f64,
    #[tabled(rename = "写入量(MB)", display = "float2")]
    write_mb: f64,
    #[tabled(rename = "读取带宽(MB/s)", display = "float2")]
    read_bw_mbps: f64,
    #[tabled(rename = "写入带宽(MB/s)", display = "float2")]
    write_bw_mbps: f64,
    #[tabled(rename = "读取IOPS(次/秒)", display = "float2")]
    read_iops: f64,
    #[tabled(rename = "写入IOPS(次/秒)", display = "float2")]
    write_iops: f64,
    #[tabled(rename = "总延迟均值(毫秒)", display = "float2")]
    mean_latency_ms: f64,
    #[tabled(rename = "CPU总使用率(%)", display = "float2")]
    cpu_percent: f64,
    #[tabled(rename = "runs")]
    contributing_runs: usize,
}

impl From<&MeanRecord> for MeanRow {
    fn from(mean: &MeanRecord) -> Self {
        Self {
            group_id: mean.key.group_id,
            job_name: mean.key.job_name.clone(),
            description: mean.key.description.clone(),
            mode: mean.key.mode.clone(),
            block_size: mean.key.block_size.clone(),
            queue_depth: mean.key.queue_depth.clone(),
            job_count: mean.key.job_count.clone(),
            read_mb: mean.metrics.read_mb,
            write_mb: mean.metrics.write_mb,
            read_bw_mbps: mean.metrics.read_bw_mbps,
            write_bw_mbps: mean.metrics.write_bw_mbps,
            read_iops: mean.metrics.read_iops,
            write_iops: mean.metrics.write_iops,
            mean_latency_ms: mean.metrics.mean_latency_ms,
            cpu_percent: mean.metrics.cpu_percent,
            contributing_runs: mean.contributing_runs,
        }
    }
}

fn float2(n: &f64) -> String {
    format!("{n:.2}")
}

/// Prints the table of means.
pub struct ConsoleReport<W> {
    writer: W,
}

impl ConsoleReport<Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> ConsoleReport<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ReportEmitter for ConsoleReport<W> {
    type Error = std::io::Error;

    fn emit(&mut self, summary: &BenchSummary) -> Result<(), Self::Error> {
        if summary.means.is_empty() {
            writeln!(self.writer, "\nNo job results to show")?;
            return Ok(());
        }

        let mut table = Table::new(summary.means.iter().map(MeanRow::from));
        table.with(Style::modern());

        writeln!(
            self.writer,
            "\nMean of {} trials",
            summary.runs.len()
        )?;
        writeln!(self.writer, "{table}")?;
        self.writer.flush()
    }
}
