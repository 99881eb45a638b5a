use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use fio_bench_runner::prelude::{
    benchmark_invocation, countdown_confirm, fio_path, fio_version, format_duration,
    prepare_invocation, BenchConfig, FioStatusParser, Invocation, JobFileSummary, PrepareTarget,
    ProcessRunner, ProgressDisplay, ShutdownHandle, TrialError,
};
use fio_bench_summariser::{
    BenchSummary, ConsoleReport, JsonReport, MetricsExtractor, ReportEmitter, XlsxReport,
};
use fio_bench_summary_model::{
    append_batch_summary, latest_batch_summary, BatchSummary, RunCollection, RunOutcome,
    TrialSummary,
};

/// How a benchmark batch ended without an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Every trial ran and the report was written to this path.
    Completed { report: PathBuf },
    /// The user cancelled before fio was started.
    Cancelled,
}

/// Run the configured job file `config.trials` times, one trial after another, then report the
/// mean result of every job.
///
/// Any failed trial aborts the batch and no report is written.
pub async fn run_benchmarks(
    config: &BenchConfig,
    shutdown: &ShutdownHandle,
) -> anyhow::Result<BatchOutcome> {
    config.validate()?;

    let prepare = match &config.prepare_job_file {
        Some(prepare_job_file) => {
            let target = PrepareTarget::load(prepare_job_file)
                .context("Failed to read the test file preparation job file")?;
            Some((prepare_job_file, target))
        }
        None => None,
    };
    let job_file = JobFileSummary::load(&config.job_file).context("Failed to inspect job file")?;

    let mut runner = ProcessRunner::new(shutdown.new_listener());
    let mut countdown_listener = shutdown.new_listener();

    let fio = fio_path(config.fio_path.as_deref())?;
    let version = match fio_version(&fio).await {
        Ok(version) => {
            log::info!("Using {version} from {}", fio.display());
            Some(version)
        }
        Err(e) => {
            log::warn!("Could not determine the fio version: {e:?}");
            None
        }
    };

    if let Some((prepare_job_file, target)) = prepare {
        println!(
            "Test files: {count} x {size} in {dir}",
            count = target.job_count,
            size = target.size,
            dir = target.directory.display()
        );

        if !countdown_confirm(
            "Create the test files?",
            config.effective_countdown_secs(),
            &mut countdown_listener,
        )
        .await
        {
            return Ok(BatchOutcome::Cancelled);
        }

        target.ensure_directory()?;
        let outcome = run_with_progress(
            &mut runner,
            &prepare_invocation(&fio, prepare_job_file),
            "prepare",
            config.no_progress,
        )
        .await;
        if !outcome.success() {
            anyhow::bail!(
                "Test file preparation failed: {}",
                outcome.diagnostic().unwrap_or("unknown error")
            );
        }
    }

    println!(
        "{jobs} jobs of {per_job} each, {trials} trials, estimated total {total}",
        jobs = job_file.job_count,
        per_job = format_duration(job_file.job_duration()),
        trials = config.trials,
        total = format_duration(job_file.estimate(config.trials)),
    );

    if !countdown_confirm(
        "Start the benchmark?",
        config.effective_countdown_secs(),
        &mut countdown_listener,
    )
    .await
    {
        return Ok(BatchOutcome::Cancelled);
    }

    let started_at = chrono::Utc::now();
    let mut batch = BatchSummary::new(
        started_at.format("%Y%m%dT%H%M%SZ").to_string(),
        started_at.timestamp(),
        config.job_file.clone(),
        config.trials,
        env!("CARGO_PKG_VERSION").to_string(),
    );
    if let Some(version) = version {
        batch.set_fio_version(version);
    }

    std::fs::create_dir_all(&config.artifact_dir).with_context(|| {
        format!(
            "Failed to create artifact directory {}",
            config.artifact_dir.display()
        )
    })?;

    let mut durations = Vec::with_capacity(config.trials);
    for trial in 1..=config.trials {
        let artifact = config.artifact_path(trial);
        remove_stale_artifact(&artifact)?;

        log::info!("Starting trial {trial} of {}", config.trials);
        let start = Instant::now();
        let outcome = run_with_progress(
            &mut runner,
            &benchmark_invocation(&fio, &config.job_file, &artifact),
            &format!("trial {trial}/{}", config.trials),
            config.no_progress,
        )
        .await;
        if !outcome.success() {
            return Err(TrialError::failed(trial, outcome.diagnostic()).into());
        }

        let elapsed = start.elapsed();
        log::info!(
            "Trial {trial} finished in {}, result in {}",
            format_duration(elapsed),
            artifact.display()
        );
        durations.push((trial, artifact, elapsed.as_secs_f64()));
    }

    let mut runs = RunCollection::new();
    for (trial, artifact, duration_secs) in durations {
        let records = MetricsExtractor::extract(&artifact)
            .with_context(|| format!("Failed to extract the metrics of trial {trial}"))?;
        batch.add_trial(TrialSummary {
            trial,
            artifact,
            job_count: records.len(),
            duration_secs,
        });
        runs.push(trial, records);
    }

    let summary = BenchSummary::new(runs);
    let report = emit_reports(&summary, config, Some(&batch))?;

    if config.remove_artifacts {
        for artifact in batch.artifacts() {
            match std::fs::remove_file(&artifact) {
                Ok(()) => log::debug!("Removed {}", artifact.display()),
                Err(e) => log::warn!("Failed to remove {}: {e}", artifact.display()),
            }
        }
    }

    Ok(BatchOutcome::Completed { report })
}

/// Build the report from fio results that already exist.
///
/// With no `artifacts` the results of the latest batch in the run summary file are used. Returns
/// the path of the spreadsheet report.
pub fn summarise(config: &BenchConfig, artifacts: Vec<PathBuf>) -> anyhow::Result<PathBuf> {
    let trials = if artifacts.is_empty() {
        let batch = latest_batch_summary(&config.run_summary_path)
            .with_context(|| {
                format!(
                    "Failed to load run summary {}",
                    config.run_summary_path.display()
                )
            })?
            .with_context(|| {
                format!(
                    "No batch recorded in {}",
                    config.run_summary_path.display()
                )
            })?;
        log::info!("Summarising batch {}", batch.run_id);
        batch
            .trials
            .into_iter()
            .map(|trial| (trial.trial, trial.artifact))
            .collect::<Vec<_>>()
    } else {
        artifacts
            .into_iter()
            .enumerate()
            .map(|(index, artifact)| (index + 1, artifact))
            .collect()
    };

    if trials.is_empty() {
        anyhow::bail!("No fio results to summarise");
    }

    let mut runs = RunCollection::new();
    for (trial, artifact) in &trials {
        let records = MetricsExtractor::extract(artifact)
            .with_context(|| format!("Failed to extract the metrics of trial {trial}"))?;
        runs.push(*trial, records);
    }

    let mut config = config.clone();
    config.with_trials(trials.len());
    emit_reports(&BenchSummary::new(runs), &config, None)
}

async fn run_with_progress(
    runner: &mut ProcessRunner,
    invocation: &Invocation,
    title: &str,
    no_progress: bool,
) -> RunOutcome {
    println!("Running {}", invocation.command_line());
    let parser = FioStatusParser::new();
    let display = ProgressDisplay::new(title, no_progress);
    let outcome = runner
        .run(invocation, |line| display.observe(&parser, line))
        .await;
    display.finish();
    outcome
}

fn remove_stale_artifact(artifact: &Path) -> anyhow::Result<()> {
    if artifact.exists() {
        log::debug!("Removing stale result {}", artifact.display());
        std::fs::remove_file(artifact)
            .with_context(|| format!("Failed to remove stale result {}", artifact.display()))?;
    }
    Ok(())
}

/// Write every configured report, and record `batch` when given.
///
/// Either everything is written or the reports written so far are removed again.
fn emit_reports(
    summary: &BenchSummary,
    config: &BenchConfig,
    batch: Option<&BatchSummary>,
) -> anyhow::Result<PathBuf> {
    if let Some(dir) = &config.json_report_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create report directory {}", dir.display()))?;
    }

    let mut xlsx = XlsxReport::new(config.report_path());
    let mut written = Vec::new();
    let result = xlsx
        .emit(summary)
        .context("Failed to write the spreadsheet report")
        .and_then(|()| {
            written.push(xlsx.path().to_path_buf());
            emit_secondary_reports(summary, config, batch, &mut written)
        });

    if let Err(e) = result {
        for path in written {
            match std::fs::remove_file(&path) {
                Ok(()) => log::debug!("Removed incomplete report {}", path.display()),
                Err(remove_err) => {
                    log::warn!("Failed to remove {}: {remove_err}", path.display())
                }
            }
        }
        return Err(e);
    }

    println!("Report written to {}", xlsx.path().display());
    Ok(xlsx.path().to_path_buf())
}

fn emit_secondary_reports(
    summary: &BenchSummary,
    config: &BenchConfig,
    batch: Option<&BatchSummary>,
    written: &mut Vec<PathBuf>,
) -> anyhow::Result<()> {
    if let Some(dir) = &config.json_report_dir {
        let mut json = JsonReport::new(dir);
        let result = json.emit(summary);
        written.extend(json.written().map(Path::to_path_buf));
        result.context("Failed to write the JSON report")?;
    }

    if config.console_report {
        ConsoleReport::stdout()
            .emit(summary)
            .context("Failed to print the report")?;
    }

    if let Some(batch) = batch.filter(|_| config.write_run_summary) {
        append_batch_summary(batch, &config.run_summary_path).with_context(|| {
            format!(
                "Failed to record the batch in {}",
                config.run_summary_path.display()
            )
        })?;
    }

    Ok(())
}
