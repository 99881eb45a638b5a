use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;

/// The I/O direction fio reports for the running jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum ProgressMode {
    #[display("read")]
    Read,
    #[display("write")]
    Write,
    #[display("mixed")]
    Mixed,
    #[display("unknown")]
    Unknown,
}

impl ProgressMode {
    /// Map the job status letter fio prints, e.g. the `W` in `[W(1)]`.
    pub fn from_status_letter(letter: char) -> Self {
        match letter {
            'R' | 'r' => ProgressMode::Read,
            'W' | 'w' => ProgressMode::Write,
            'M' | 'm' => ProgressMode::Mixed,
            _ => ProgressMode::Unknown,
        }
    }
}

/// What a single fio status line says about the running benchmark.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub percent: f64,
    pub mode: ProgressMode,
    pub bandwidth: String,
    pub iops: String,
    pub eta: String,
}

impl Default for ProgressSnapshot {
    fn default() -> Self {
        Self {
            percent: 0.0,
            mode: ProgressMode::Unknown,
            bandwidth: "0B/s".to_string(),
            iops: "0 IOPS".to_string(),
            eta: "unknown".to_string(),
        }
    }
}

/// Turns one line of process output into a [ProgressSnapshot].
pub trait ProgressParser {
    /// Returns `None` for lines that are not status lines.
    fn parse(&self, line: &str) -> Option<ProgressSnapshot>;
}

/// Parses the status line fio prints with `--eta=always`, e.g.
///
/// ```text
/// Jobs: 1 (f=1): [W(1)][45.5%][w=120MiB/s][w=30.7k IOPS][eta 00m:06s]
/// ```
///
/// Every field is matched on its own so a field fio leaves out, or prints in another order, only
/// falls back to its default. The mode is taken from the first reading, writing or mixed job in
/// the job status run, so idle jobs such as `_(1)` or `P(259)` are skipped.
#[derive(Debug, Clone)]
pub struct FioStatusParser {
    mode: Regex,
    percent: Regex,
    bandwidth: Regex,
    iops: Regex,
    eta: Regex,
}

impl Default for FioStatusParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FioStatusParser {
    pub fn new() -> Self {
        Self {
            mode: Regex::new(r"\[[^\[\]]*?([RrWwMm])\(\d+\)").expect("Invalid mode pattern"),
            percent: Regex::new(r"\[(\d+(?:\.\d+)?)\s*%\]").expect("Invalid percent pattern"),
            bandwidth: Regex::new(r"([rw])=(\d+(?:\.\d+)?\s*[kKMGTP]?i?B/s)")
                .expect("Invalid bandwidth pattern"),
            iops: Regex::new(r"\[((?:[rw]=\d+(?:\.\d+)?[kKmM]?,?\s*)+)IOPS\]")
                .expect("Invalid IOPS pattern"),
            eta: Regex::new(r"eta\s*((?:\d+[dhms]:?)+)").expect("Invalid eta pattern"),
        }
    }
}

impl ProgressParser for FioStatusParser {
    fn parse(&self, line: &str) -> Option<ProgressSnapshot> {
        if !(line.contains("Jobs:") && line.contains('[') && line.contains(']')) {
            return None;
        }

        let mut snapshot = ProgressSnapshot::default();

        if let Some(letter) = self
            .mode
            .captures(line)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().chars().next())
        {
            snapshot.mode = ProgressMode::from_status_letter(letter);
        }

        if let Some(percent) = self
            .percent
            .captures(line)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
        {
            snapshot.percent = percent;
        }

        let bandwidths = self
            .bandwidth
            .captures_iter(line)
            .filter_map(|c| c.get(2))
            .map(|m| m.as_str().replace(' ', ""))
            .collect::<Vec<_>>();
        if !bandwidths.is_empty() {
            snapshot.bandwidth = bandwidths.join("/");
        }

        if let Some(iops) = self.iops.captures(line).and_then(|c| c.get(1)) {
            let values = iops
                .as_str()
                .split(',')
                .filter_map(|part| part.trim().split_once('=').map(|(_, v)| v.trim()))
                .filter(|v| !v.is_empty())
                .collect::<Vec<_>>();
            if !values.is_empty() {
                snapshot.iops = format!("{} IOPS", values.join("/"));
            }
        }

        if let Some(eta) = self.eta.captures(line).and_then(|c| c.get(1)) {
            snapshot.eta = eta.as_str().to_string();
        }

        Some(snapshot)
    }
}

/// Shows the live state of a running fio process.
///
/// The bar tracks the completion percentage and its message carries the mode, bandwidth, IOPS
/// and remaining time. When hidden the snapshots are only logged.
pub struct ProgressDisplay {
    bar: ProgressBar,
    hidden: bool,
}

impl ProgressDisplay {
    pub fn new(title: impl Into<String>, hidden: bool) -> Self {
        let title = title.into();
        let bar = if hidden {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::new(100);
            bar.set_style(
                ProgressStyle::with_template(
                    "{prefix:.bold} {spinner:.green} [{bar:30.cyan/blue}] {pos:>3}% {msg}",
                )
                .expect("Failed to set progress style")
                .progress_chars("#>-"),
            );
            bar.set_prefix(title.clone());
            bar
        };
        log::debug!("Tracking progress of {title}");

        Self { bar, hidden }
    }

    pub fn update(&self, snapshot: &ProgressSnapshot) {
        if self.hidden {
            log::trace!(
                "progress {:.1}% mode={} bw={} iops={} eta={}",
                snapshot.percent,
                snapshot.mode,
                snapshot.bandwidth,
                snapshot.iops,
                snapshot.eta
            );
            return;
        }

        self.bar
            .set_position(snapshot.percent.clamp(0.0, 100.0).round() as u64);
        self.bar.set_message(format!(
            "{} | {} | {} | eta {}",
            snapshot.mode, snapshot.bandwidth, snapshot.iops, snapshot.eta
        ));
    }

    /// Feed one line of fio output, ignoring anything that is not a status line.
    pub fn observe(&self, parser: &impl ProgressParser, line: &str) {
        match parser.parse(line) {
            Some(snapshot) => self.update(&snapshot),
            None => log::trace!(target: "fio::stdout", "{line}"),
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
