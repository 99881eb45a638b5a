use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use fio_bench_runner::prelude::BenchConfig;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct FioBenchCli {
    /// A TOML file with settings to use instead of the defaults.
    ///
    /// Command line flags override the values in the file.
    #[clap(long, short, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the job file several times and report the mean results
    Run(RunArgs),
    /// Rebuild the report from existing fio results without running fio
    Summarise(SummariseArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// The fio job file to benchmark
    pub job_file: Option<PathBuf>,

    /// The number of times to run the job file
    #[clap(long, short)]
    pub trials: Option<usize>,

    /// A job file that creates the test files, run once before the benchmark
    #[clap(long)]
    pub prepare: Option<PathBuf>,

    /// The fio binary to use, looked up in the environment if not set
    #[clap(long)]
    pub fio: Option<PathBuf>,

    /// Where to write the fio result of each trial
    #[clap(long)]
    pub artifact_dir: Option<PathBuf>,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Seconds to wait before starting, press Ctrl-C in that time to cancel
    #[clap(long)]
    pub countdown: Option<u64>,

    /// Start straight away, without a countdown
    #[clap(long, short = 'y', default_value = "false")]
    pub yes: bool,

    /// Do not show progress bars.
    ///
    /// This is recommended for CI/CD environments where nobody is looking at the progress bar and it
    /// only adds noise to the logs.
    #[clap(long, default_value = "false")]
    pub no_progress: bool,

    /// Delete the fio results once the report is written
    #[clap(long, default_value = "false")]
    pub remove_artifacts: bool,

    /// Do not record the batch in the run summary file
    #[clap(long, default_value = "false")]
    pub no_run_summary: bool,
}

#[derive(Debug, Args)]
pub struct SummariseArgs {
    /// fio JSON results to summarise, in trial order.
    ///
    /// If none are given, the results of the latest batch in the run summary file are used.
    pub artifacts: Vec<PathBuf>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Where to write the spreadsheet report
    #[clap(long)]
    pub report: Option<PathBuf>,

    /// Also write the report as JSON into this directory
    #[clap(long)]
    pub json_report_dir: Option<PathBuf>,

    /// Do not print the table of means
    #[clap(long, default_value = "false")]
    pub no_console_report: bool,

    /// The run summary file that batches are recorded in
    #[clap(long)]
    pub run_summary: Option<PathBuf>,
}

impl RunArgs {
    pub fn apply(&self, config: &mut BenchConfig) {
        if let Some(job_file) = &self.job_file {
            config.with_job_file(job_file);
        }
        if let Some(trials) = self.trials {
            config.with_trials(trials);
        }
        if let Some(prepare) = &self.prepare {
            config.with_prepare_job_file(prepare);
        }
        if let Some(fio) = &self.fio {
            config.with_fio_path(fio);
        }
        if let Some(artifact_dir) = &self.artifact_dir {
            config.with_artifact_dir(artifact_dir);
        }
        if let Some(countdown) = self.countdown {
            config.with_countdown_secs(countdown);
        }
        if self.yes {
            config.with_assume_yes(true);
        }
        if self.no_progress {
            config.with_no_progress(true);
        }
        if self.remove_artifacts {
            config.with_remove_artifacts(true);
        }
        if self.no_run_summary {
            config.with_write_run_summary(false);
        }
        self.output.apply(config);
    }
}

impl OutputArgs {
    pub fn apply(&self, config: &mut BenchConfig) {
        if let Some(report) = &self.report {
            config.with_report_path(report);
        }
        if let Some(json_report_dir) = &self.json_report_dir {
            config.with_json_report_dir(json_report_dir);
        }
        if self.no_console_report {
            config.with_console_report(false);
        }
        if let Some(run_summary) = &self.run_summary {
            config.with_run_summary_path(run_summary);
        }
    }
}

/// Load the configuration file if one was given, otherwise start from the defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<BenchConfig> {
    match path {
        Some(path) => {
            log::debug!("Loading config from {}", path.display());
            BenchConfig::load(path).context("Failed to load configuration")
        }
        None => Ok(BenchConfig::default()),
    }
}
