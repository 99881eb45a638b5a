use std::path::{Path, PathBuf};

use fio_bench_summariser::{
    BenchSummary, ConsoleReport, JsonReport, MetricsExtractor, ReportEmitter, XlsxReport,
};
use fio_bench_summary_model::{JobMetrics, RunCollection};
use pretty_assertions::assert_eq;
use walkdir::WalkDir;

fn fixture_artifacts() -> Vec<PathBuf> {
    WalkDir::new(
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("test_data")
            .join("fio_results"),
    )
    .sort_by_file_name()
    .into_iter()
    .map(|entry| entry.expect("Failed to read test data"))
    .filter(|entry| entry.file_type().is_file())
    .map(|entry| entry.into_path())
    .collect()
}

fn load_fixture_runs() -> RunCollection {
    let mut runs = RunCollection::new();
    for (index, artifact) in fixture_artifacts().into_iter().enumerate() {
        let records = MetricsExtractor::extract(&artifact)
            .unwrap_or_else(|e| panic!("Failed to extract {}: {e}", artifact.display()));
        runs.push(index + 1, records);
    }
    runs
}

#[test]
fn every_fixture_decodes() {
    let artifacts = fixture_artifacts();
    assert_eq!(artifacts.len(), 3);
    for artifact in artifacts {
        MetricsExtractor::extract(&artifact).expect("Fixture should decode");
    }
}

#[test]
fn trial_without_jobs_is_left_out() {
    let runs = load_fixture_runs();
    assert_eq!(
        runs.iter().map(|t| t.trial).collect::<Vec<_>>(),
        vec![1, 2]
    );
}

#[test]
fn means_match_fixture_values() {
    let summary = BenchSummary::new(load_fixture_runs());

    let means = summary
        .means
        .iter()
        .map(|mean| (mean.key.job_name.as_str(), mean.metrics, mean.contributing_runs))
        .collect::<Vec<_>>();

    assert_eq!(
        means,
        vec![
            (
                "seq-read",
                JobMetrics {
                    read_mb: 1024.0,
                    write_mb: 0.0,
                    read_bw_mbps: 99.2,
                    write_bw_mbps: 0.0,
                    read_iops: 99.2,
                    write_iops: 0.0,
                    mean_latency_ms: 10.0,
                    cpu_percent: 5.0,
                },
                2
            ),
            (
                "rand-write",
                JobMetrics {
                    read_mb: 0.0,
                    write_mb: 200.0,
                    read_bw_mbps: 0.0,
                    write_bw_mbps: 22.0,
                    read_iops: 0.0,
                    write_iops: 5632.0,
                    mean_latency_ms: 5.63,
                    cpu_percent: 9.0,
                },
                2
            ),
        ]
    );

    let seq_read = &summary.means[0].key;
    assert_eq!(seq_read.description, "顺序读 1M");
    assert_eq!(seq_read.block_size, "1M");
    assert_eq!(seq_read.queue_depth, "32");
}

#[test]
fn reports_are_written() {
    let dir = tempfile::TempDir::new().unwrap();
    let summary = BenchSummary::new(load_fixture_runs());

    let mut xlsx = XlsxReport::new(dir.path().join("fio测试结果_3次均值汇总.xlsx"));
    xlsx.emit(&summary).unwrap();
    assert!(xlsx.path().is_file());

    let mut json = JsonReport::new(dir.path());
    json.emit(&summary).unwrap();
    let value: serde_json::Value =
        serde_json::from_reader(std::fs::File::open(json.written().unwrap()).unwrap()).unwrap();
    assert_eq!(value["means"].as_array().unwrap().len(), 2);
    assert_eq!(value["runs"]["trials"].as_array().unwrap().len(), 2);

    let mut console = ConsoleReport::new(Vec::new());
    console.emit(&summary).unwrap();
    let printed = String::from_utf8(console.into_inner()).unwrap();
    assert!(printed.contains("seq-read"));
    assert!(printed.contains("5632.00"));
}
