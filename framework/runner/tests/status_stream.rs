#![cfg(unix)]

use fio_bench_runner::prelude::{
    FioStatusParser, Invocation, ProcessRunner, ProgressMode, ProgressParser, ShutdownHandle,
};

/// Prints status lines the way fio redraws them, with carriage returns and no newline between
/// updates, then a summary on stdout and a notice on stderr.
const FAKE_FIO: &str = r#"
printf 'Jobs: 1 (f=1): [W(1)][10.0%%][w=100MiB/s][w=25.6k IOPS][eta 00m:09s]\r'
printf 'Jobs: 1 (f=1): [W(1)][55.5%%][w=120MiB/s][w=30.7k IOPS][eta 00m:04s]\r'
printf 'Jobs: 1 (f=1): [R(1)][100.0%%][r=90MiB/s][r=23.0k IOPS][eta 00m:00s]\n'
echo 'fio: this platform does not support process shared mutexes' >&2
echo 'seq-write: (groupid=0, jobs=1): err= 0'
"#;

#[tokio::test]
async fn parse_progress_from_streamed_output() {
    let handle = ShutdownHandle::new();
    let mut runner = ProcessRunner::new(handle.new_listener());
    let parser = FioStatusParser::new();

    let mut snapshots = Vec::new();
    let mut other_lines = Vec::new();
    let outcome = runner
        .run(
            &Invocation::new("sh").args(["-c", FAKE_FIO]),
            |line| match parser.parse(line) {
                Some(snapshot) => snapshots.push(snapshot),
                None => other_lines.push(line.to_string()),
            },
        )
        .await;

    assert!(outcome.success(), "{:?}", outcome.diagnostic());
    assert_eq!(
        snapshots.iter().map(|s| s.percent).collect::<Vec<_>>(),
        vec![10.0, 55.5, 100.0]
    );
    assert_eq!(snapshots[1].mode, ProgressMode::Write);
    assert_eq!(snapshots[1].bandwidth, "120MiB/s");
    assert_eq!(snapshots[2].mode, ProgressMode::Read);
    assert_eq!(snapshots[2].iops, "23.0k IOPS");
    assert_eq!(other_lines, vec!["seq-write: (groupid=0, jobs=1): err= 0"]);
}

#[tokio::test]
async fn failed_run_carries_stderr_tail() {
    let handle = ShutdownHandle::new();
    let mut runner = ProcessRunner::new(handle.new_listener());

    let script = "i=0; while [ $i -lt 50 ]; do echo \"warning $i\" >&2; i=$((i+1)); done; exit 1";
    let outcome = runner
        .run(&Invocation::new("sh").args(["-c", script]), |_| {})
        .await;

    assert!(!outcome.success());
    let diagnostic = outcome.diagnostic().unwrap();
    assert!(diagnostic.contains("warning 49"));
    assert!(diagnostic.contains("warning 30"));
    assert!(!diagnostic.contains("warning 29"));
}
