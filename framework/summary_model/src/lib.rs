use serde::{Deserialize, Serialize};
use std::io::{BufRead, Read, Write};
use std::path::{Path, PathBuf};

mod round;

pub use round::round_half_up;

/// Number of decimal places every derived metric is rounded to.
pub const METRIC_DECIMALS: u32 = 2;

/// Identity of one logical fio job across trials
///
/// Two records describe the same job if and only if every field matches. The numeric metrics are
/// never part of the identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    /// The fio reporting group id
    pub group_id: i64,
    /// The job section name from the job file
    pub job_name: String,
    /// The job description, taken from the `description` option or the free-text description
    pub description: String,
    /// The `rw` option, e.g. `randread`
    pub mode: String,
    /// The `bs` option
    pub block_size: String,
    /// The `iodepth` option
    pub queue_depth: String,
    /// The `numjobs` option
    pub job_count: String,
}

/// The numeric metrics derived for a single job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct JobMetrics {
    pub read_mb: f64,
    pub write_mb: f64,
    pub read_bw_mbps: f64,
    pub write_bw_mbps: f64,
    pub read_iops: f64,
    pub write_iops: f64,
    pub mean_latency_ms: f64,
    pub cpu_percent: f64,
}

impl JobMetrics {
    /// Number of numeric metrics per job.
    pub const COUNT: usize = 8;

    /// The metrics in report column order.
    pub fn values(&self) -> [f64; Self::COUNT] {
        [
            self.read_mb,
            self.write_mb,
            self.read_bw_mbps,
            self.write_bw_mbps,
            self.read_iops,
            self.write_iops,
            self.mean_latency_ms,
            self.cpu_percent,
        ]
    }

    /// Build metrics from values in report column order.
    pub fn from_values(values: [f64; Self::COUNT]) -> Self {
        let [read_mb, write_mb, read_bw_mbps, write_bw_mbps, read_iops, write_iops, mean_latency_ms, cpu_percent] =
            values;
        Self {
            read_mb,
            write_mb,
            read_bw_mbps,
            write_bw_mbps,
            read_iops,
            write_iops,
            mean_latency_ms,
            cpu_percent,
        }
    }

    /// Apply [round_half_up] with [METRIC_DECIMALS] to every metric.
    pub fn rounded(self) -> Self {
        Self::from_values(self.values().map(|v| round_half_up(v, METRIC_DECIMALS)))
    }
}

/// The metrics of one job from one trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    #[serde(flatten)]
    pub key: GroupKey,
    #[serde(flatten)]
    pub metrics: JobMetrics,
}

impl JobRecord {
    pub fn new(key: GroupKey, metrics: JobMetrics) -> Self {
        Self { key, metrics }
    }
}

/// The mean metrics of one job across every trial that reported it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanRecord {
    #[serde(flatten)]
    pub key: GroupKey,
    #[serde(flatten)]
    pub metrics: JobMetrics,
    /// The number of trials that reported this job
    pub contributing_runs: usize,
}

/// The job records produced by a single trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecords {
    /// The 1-based trial number
    pub trial: usize,
    pub records: Vec<JobRecord>,
}

/// The job records of every trial, in the order the trials ran
///
/// Trials that produced no records are not stored, so they take no part in aggregation and get no
/// sheet in the report. The trial number is kept so later trials are not renumbered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunCollection {
    trials: Vec<TrialRecords>,
}

impl RunCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the records of a trial
    ///
    /// Returns `false` if the trial had no records and was therefore not stored.
    pub fn push(&mut self, trial: usize, records: Vec<JobRecord>) -> bool {
        if records.is_empty() {
            log::warn!("Trial {trial} produced no job records, leaving it out of the summary");
            return false;
        }

        self.trials.push(TrialRecords { trial, records });
        true
    }

    pub fn trials(&self) -> &[TrialRecords] {
        &self.trials
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrialRecords> {
        self.trials.iter()
    }

    /// The number of stored trials
    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }
}

/// The result of running one external process
///
/// Created once by the process runner and never modified afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    success: bool,
    artifact_path: Option<PathBuf>,
    diagnostic: Option<String>,
}

impl RunOutcome {
    pub fn succeeded(artifact_path: Option<PathBuf>) -> Self {
        Self {
            success: true,
            artifact_path,
            diagnostic: None,
        }
    }

    pub fn failed(artifact_path: Option<PathBuf>, diagnostic: impl Into<String>) -> Self {
        Self {
            success: false,
            artifact_path,
            diagnostic: Some(diagnostic.into()),
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    /// The result artifact the process was asked to write, if any
    pub fn artifact_path(&self) -> Option<&Path> {
        self.artifact_path.as_deref()
    }

    /// Why the run failed, only set for failed runs
    pub fn diagnostic(&self) -> Option<&str> {
        self.diagnostic.as_deref()
    }
}

/// Summary of one trial within a batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrialSummary {
    /// The 1-based trial number
    pub trial: usize,
    /// Where fio wrote the JSON result of this trial
    pub artifact: PathBuf,
    /// The number of jobs extracted from the artifact
    pub job_count: usize,
    /// Wall-clock duration of the fio process, in seconds
    pub duration_secs: f64,
}

/// Summary of a batch of trials
///
/// One line per batch is appended to the run summary file so that a report can be rebuilt from the
/// artifacts later on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchSummary {
    /// The unique id of the batch
    ///
    /// Derived from the start time by the pipeline.
    pub run_id: String,
    /// The time the batch started
    ///
    /// This is a Unix timestamp in seconds.
    pub started_at: i64,
    /// The fio job file that was benchmarked
    pub job_file: PathBuf,
    /// The number of trials that were configured
    pub trials_requested: usize,
    /// Output of `fio --version`, if it could be determined
    pub fio_version: Option<String>,
    /// The version of fio-bench that ran the batch
    pub tool_version: String,
    /// One entry per completed trial
    pub trials: Vec<TrialSummary>,
}

impl BatchSummary {
    pub fn new(
        run_id: String,
        started_at: i64,
        job_file: PathBuf,
        trials_requested: usize,
        tool_version: String,
    ) -> Self {
        Self {
            run_id,
            started_at,
            job_file,
            trials_requested,
            fio_version: None,
            tool_version,
            trials: Vec::with_capacity(trials_requested),
        }
    }

    /// Set the fio version
    pub fn set_fio_version(&mut self, fio_version: String) {
        self.fio_version = Some(fio_version);
    }

    /// Record a completed trial
    pub fn add_trial(&mut self, trial: TrialSummary) {
        self.trials.push(trial);
    }

    /// The artifacts of every recorded trial, in trial order
    pub fn artifacts(&self) -> Vec<PathBuf> {
        self.trials.iter().map(|t| t.artifact.clone()).collect()
    }
}

/// Append the batch summary to a file
///
/// The summary will be serialized to JSON and output as a single line followed by a newline. The
/// recommended file extension is `.jsonl`.
pub fn append_batch_summary(batch_summary: &BatchSummary, path: &Path) -> anyhow::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)?;
    store_batch_summary(batch_summary, &mut file)?;
    file.write_all(b"\n")?;
    Ok(())
}

/// Serialize the batch summary to a writer
pub fn store_batch_summary<W: Write>(
    batch_summary: &BatchSummary,
    writer: &mut W,
) -> anyhow::Result<()> {
    serde_json::to_writer(writer, batch_summary)?;
    Ok(())
}

/// Load batch summaries from a reader
///
/// The input should contain one JSON object per line. Blank lines are skipped. This is the format
/// produced by [append_batch_summary].
pub fn load_batch_summaries<R: Read>(reader: R) -> anyhow::Result<Vec<BatchSummary>> {
    let reader = std::io::BufReader::new(reader);
    let mut batches = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        batches.push(serde_json::from_str(&line)?);
    }
    Ok(batches)
}

/// Load the most recently started batch from a run summary file
pub fn latest_batch_summary(path: &Path) -> anyhow::Result<Option<BatchSummary>> {
    let file = std::fs::File::open(path)?;
    let latest = load_batch_summaries(file)?
        .into_iter()
        .max_by_key(|batch| batch.started_at);
    Ok(latest)
}
