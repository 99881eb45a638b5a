use std::collections::BTreeMap;

use fio_bench_summary_model::{GroupKey, JobMetrics, MeanRecord, RunCollection};

/// Averages the job records of every trial by job identity.
pub struct Aggregator;

impl Aggregator {
    /// Compute one [MeanRecord] per distinct [GroupKey], sorted by key.
    ///
    /// A job only averages over the trials that reported it. Within a job, every metric averages
    /// over its finite values only, and a metric without any is `0.0`.
    pub fn aggregate(runs: &RunCollection) -> Vec<MeanRecord> {
        let mut grouped = BTreeMap::<&GroupKey, Vec<&JobMetrics>>::new();
        for trial in runs.iter() {
            for record in &trial.records {
                grouped.entry(&record.key).or_default().push(&record.metrics);
            }
        }

        log::debug!(
            "Aggregating {} distinct jobs from {} trials",
            grouped.len(),
            runs.len()
        );

        grouped
            .into_iter()
            .map(|(key, metrics)| MeanRecord {
                key: key.clone(),
                metrics: mean_metrics(&metrics),
                contributing_runs: metrics.len(),
            })
            .collect()
    }
}

fn mean_metrics(metrics: &[&JobMetrics]) -> JobMetrics {
    let mut sums = [0.0; JobMetrics::COUNT];
    let mut counts = [0usize; JobMetrics::COUNT];
    for m in metrics {
        for (i, value) in m.values().into_iter().enumerate() {
            if value.is_finite() {
                sums[i] += value;
                counts[i] += 1;
            }
        }
    }

    let means = std::array::from_fn(|i| match counts[i] {
        0 => 0.0,
        count => sums[i] / count as f64,
    });

    JobMetrics::from_values(means).rounded()
}
