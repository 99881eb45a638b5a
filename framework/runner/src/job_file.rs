//! Light inspection of fio job files.
//!
//! Only the handful of options needed to plan a batch are read. Nothing here checks that fio will
//! accept the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;

const DEFAULT_RUNTIME_SECS: u64 = 30;
const DEFAULT_RAMP_TIME_SECS: u64 = 5;

#[derive(Debug, thiserror::Error)]
pub enum JobFileError {
    #[error("Job file not found: {}", .0.display())]
    Missing(PathBuf),
    #[error("Failed to read job file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("No jobs found in {}, expected at least one [job_name] section", .0.display())]
    NoJobs(PathBuf),
}

/// Timing and job count of a benchmark job file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobFileSummary {
    pub runtime: Duration,
    pub ramp_time: Duration,
    /// Number of job sections, not counting `[global]`
    pub job_count: usize,
}

impl JobFileSummary {
    /// Read a job file from disk, see [JobFileSummary::parse].
    pub fn load(path: &Path) -> Result<Self, JobFileError> {
        let content = read_job_file(path)?;
        Self::parse(&content).ok_or_else(|| JobFileError::NoJobs(path.to_path_buf()))
    }

    /// Parse the `runtime` and `ramp_time` options and count the job sections.
    ///
    /// Times accept an `s`, `m` or `h` suffix. A missing or zero time falls back to 30s runtime and
    /// 5s ramp time. Returns `None` if there are no job sections.
    pub fn parse(content: &str) -> Option<Self> {
        let time_pattern = Regex::new(r"(?i)(runtime|ramp_time)\s*=\s*(\d+)([smh]?)")
            .expect("Invalid time pattern");
        let section_pattern = Regex::new(r"(?m)^\s*\[(\w+)").expect("Invalid section pattern");

        let mut runtime_secs = 0;
        let mut ramp_time_secs = 0;
        for captures in time_pattern.captures_iter(content) {
            let Ok(value) = captures[2].parse::<u64>() else {
                continue;
            };
            let value = match captures[3].to_ascii_lowercase().as_str() {
                "m" => value.saturating_mul(60),
                "h" => value.saturating_mul(3600),
                _ => value,
            };
            if captures[1].eq_ignore_ascii_case("runtime") {
                runtime_secs = value;
            } else {
                ramp_time_secs = value;
            }
        }

        if runtime_secs == 0 {
            log::warn!("No runtime in job file, assuming {DEFAULT_RUNTIME_SECS}s");
            runtime_secs = DEFAULT_RUNTIME_SECS;
        }
        if ramp_time_secs == 0 {
            log::warn!("No ramp_time in job file, assuming {DEFAULT_RAMP_TIME_SECS}s");
            ramp_time_secs = DEFAULT_RAMP_TIME_SECS;
        }

        let job_count = section_pattern
            .captures_iter(content)
            .filter(|c| !c[1].eq_ignore_ascii_case("global"))
            .count();
        if job_count == 0 {
            return None;
        }

        Some(Self {
            runtime: Duration::from_secs(runtime_secs),
            ramp_time: Duration::from_secs(ramp_time_secs),
            job_count,
        })
    }

    /// The time one job takes, ramp up included.
    pub fn job_duration(&self) -> Duration {
        self.runtime + self.ramp_time
    }

    /// The expected wall-clock time of running every job `trials` times.
    pub fn estimate(&self, trials: usize) -> Duration {
        let runs = u32::try_from(self.job_count.saturating_mul(trials)).unwrap_or(u32::MAX);
        self.job_duration().saturating_mul(runs)
    }
}

/// Format a duration as `1h 2m 3s`, leaving out leading zero units.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// The test files a preparation job file will lay out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareTarget {
    pub directory: PathBuf,
    pub size: String,
    pub job_count: usize,
}

impl PrepareTarget {
    pub fn load(path: &Path) -> Result<Self, JobFileError> {
        Ok(Self::parse(&read_job_file(path)?))
    }

    /// Read `directory`, `size` and `numjobs`, defaulting to `.`, `1G` and 1.
    pub fn parse(content: &str) -> Self {
        let directory = Regex::new(r"(?i)directory\s*=\s*(\S+)").expect("Invalid directory pattern");
        let size = Regex::new(r"(?i)\bsize\s*=\s*(\S+)").expect("Invalid size pattern");
        let numjobs = Regex::new(r"(?i)numjobs\s*=\s*(\d+)").expect("Invalid numjobs pattern");

        Self {
            directory: directory
                .captures(content)
                .map(|c| PathBuf::from(&c[1]))
                .unwrap_or_else(|| PathBuf::from(".")),
            size: size
                .captures(content)
                .map(|c| c[1].to_string())
                .unwrap_or_else(|| "1G".to_string()),
            job_count: numjobs
                .captures(content)
                .and_then(|c| c[1].parse().ok())
                .unwrap_or(1),
        }
    }

    /// Create the target directory if it does not exist yet.
    pub fn ensure_directory(&self) -> Result<(), JobFileError> {
        if self.directory.exists() {
            return Ok(());
        }

        std::fs::create_dir_all(&self.directory).map_err(|source| JobFileError::Io {
            path: self.directory.clone(),
            source,
        })?;
        log::warn!("Created missing directory {}", self.directory.display());
        Ok(())
    }
}

fn read_job_file(path: &Path) -> Result<String, JobFileError> {
    if !path.exists() {
        return Err(JobFileError::Missing(path.to_path_buf()));
    }

    std::fs::read_to_string(path).map_err(|source| JobFileError::Io {
        path: path.to_path_buf(),
        source,
    })
}
