use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("The number of trials must be at least 1")]
    NoTrials,
}

/// Everything that controls a benchmark batch.
///
/// Built from the defaults, then an optional TOML file, then command line flags. Every field can be
/// left out of the TOML file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchConfig {
    /// The fio job file to benchmark.
    pub job_file: PathBuf,

    /// How many times to run the job file.
    pub trials: usize,

    /// A job file that lays out the test files, run once before the trials.
    pub prepare_job_file: Option<PathBuf>,

    /// The `fio` binary to run.
    ///
    /// If [`None`] the binary is found through the environment, see [crate::fio_binary::fio_path].
    pub fio_path: Option<PathBuf>,

    /// Where fio writes the JSON result of each trial.
    pub artifact_dir: PathBuf,

    /// File name prefix of the trial results, followed by the trial number and `.json`.
    pub artifact_prefix: String,

    /// Where the spreadsheet report is written.
    ///
    /// Defaults to a name that includes the number of trials.
    pub report_path: Option<PathBuf>,

    /// Also write the report as JSON into this directory.
    pub json_report_dir: Option<PathBuf>,

    /// Print the mean table once the batch is done.
    pub console_report: bool,

    /// Append a summary of each batch to [BenchConfig::run_summary_path].
    pub write_run_summary: bool,

    pub run_summary_path: PathBuf,

    /// Seconds to wait before starting, giving a chance to cancel. Zero starts straight away.
    pub countdown_secs: u64,

    /// Skip the countdowns.
    pub assume_yes: bool,

    /// Do not show progress bars, log the progress instead.
    pub no_progress: bool,

    /// Delete the trial results once the report is written.
    pub remove_artifacts: bool,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            job_file: PathBuf::from("benchmark.fio"),
            trials: 3,
            prepare_job_file: None,
            fio_path: None,
            artifact_dir: PathBuf::from("."),
            artifact_prefix: "fio_results_run".to_string(),
            report_path: None,
            json_report_dir: None,
            console_report: true,
            write_run_summary: true,
            run_summary_path: PathBuf::from("run_summary.jsonl"),
            countdown_secs: 10,
            assume_yes: false,
            no_progress: false,
            remove_artifacts: false,
        }
    }
}

impl BenchConfig {
    /// Load a configuration from a TOML file, filling in defaults for anything it leaves out.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trials == 0 {
            return Err(ConfigError::NoTrials);
        }
        Ok(())
    }

    pub fn with_job_file(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.job_file = path.into();
        self
    }

    pub fn with_trials(&mut self, trials: usize) -> &mut Self {
        self.trials = trials;
        self
    }

    pub fn with_prepare_job_file(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.prepare_job_file = Some(path.into());
        self
    }

    pub fn with_fio_path(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.fio_path = Some(path.into());
        self
    }

    pub fn with_artifact_dir(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.artifact_dir = path.into();
        self
    }

    pub fn with_report_path(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.report_path = Some(path.into());
        self
    }

    pub fn with_json_report_dir(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.json_report_dir = Some(path.into());
        self
    }

    pub fn with_console_report(&mut self, console_report: bool) -> &mut Self {
        self.console_report = console_report;
        self
    }

    pub fn with_run_summary_path(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.run_summary_path = path.into();
        self
    }

    pub fn with_write_run_summary(&mut self, write_run_summary: bool) -> &mut Self {
        self.write_run_summary = write_run_summary;
        self
    }

    pub fn with_countdown_secs(&mut self, seconds: u64) -> &mut Self {
        self.countdown_secs = seconds;
        self
    }

    pub fn with_assume_yes(&mut self, assume_yes: bool) -> &mut Self {
        self.assume_yes = assume_yes;
        self
    }

    pub fn with_no_progress(&mut self, no_progress: bool) -> &mut Self {
        self.no_progress = no_progress;
        self
    }

    pub fn with_remove_artifacts(&mut self, remove_artifacts: bool) -> &mut Self {
        self.remove_artifacts = remove_artifacts;
        self
    }

    /// The countdown to show before a step, zero when the user already agreed.
    pub fn effective_countdown_secs(&self) -> u64 {
        if self.assume_yes {
            0
        } else {
            self.countdown_secs
        }
    }

    /// Where fio writes the result of the given 1-based trial.
    pub fn artifact_path(&self, trial: usize) -> PathBuf {
        self.artifact_dir
            .join(format!("{}{trial}.json", self.artifact_prefix))
    }

    pub fn report_path(&self) -> PathBuf {
        self.report_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("fio测试结果_{}次均值汇总.xlsx", self.trials)))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_should_use_defaults_for_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = BenchConfig::load(file.path()).unwrap();
        assert_eq!(config, BenchConfig::default());
    }

    #[test]
    fn test_should_override_defaults_from_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            r#"
job_file = "nvme.fio"
trials = 5
artifact_dir = "results"
countdown_secs = 0
write_run_summary = false
"#,
        )
        .unwrap();

        let config = BenchConfig::load(file.path()).unwrap();
        assert_eq!(config.job_file, PathBuf::from("nvme.fio"));
        assert_eq!(config.trials, 5);
        assert_eq!(config.countdown_secs, 0);
        assert!(!config.write_run_summary);
        assert_eq!(
            config.artifact_path(2),
            PathBuf::from("results").join("fio_results_run2.json")
        );
        assert_eq!(
            config.report_path(),
            PathBuf::from("fio测试结果_5次均值汇总.xlsx")
        );
    }

    #[test]
    fn test_should_reject_unknown_keys() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "trails = 3\n").unwrap();
        assert!(matches!(
            BenchConfig::load(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_should_report_missing_file() {
        assert!(matches!(
            BenchConfig::load(Path::new("/non/existent/fio-bench.toml")),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_should_reject_zero_trials() {
        let mut config = BenchConfig::default();
        config.with_trials(0);
        assert!(matches!(config.validate(), Err(ConfigError::NoTrials)));
        config.with_trials(1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_should_skip_countdown_when_assumed_yes() {
        let mut config = BenchConfig::default();
        assert_eq!(config.effective_countdown_secs(), 10);
        config.with_assume_yes(true);
        assert_eq!(config.effective_countdown_secs(), 0);
    }
}
