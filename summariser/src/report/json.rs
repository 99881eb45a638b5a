use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::report::{BenchSummary, ReportEmitter};

/// Writes the summary as pretty printed JSON into a directory, one file per report.
#[derive(Debug, Clone)]
pub struct JsonReport {
    dir: PathBuf,
    written: Option<PathBuf>,
}

impl JsonReport {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: None,
        }
    }

    /// The file created by the last [ReportEmitter::emit], even if writing it failed.
    pub fn written(&self) -> Option<&Path> {
        self.written.as_deref()
    }
}

impl ReportEmitter for JsonReport {
    type Error = anyhow::Error;

    fn emit(&mut self, summary: &BenchSummary) -> Result<(), Self::Error> {
        self.written = None;
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create report directory {}", self.dir.display()))?;

        let timestamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
        let path = self.dir.join(format!("fio-bench-report-{timestamp}.json"));
        let file = std::fs::File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        self.written = Some(path.clone());
        let mut writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, summary)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        writer
            .flush()
            .with_context(|| format!("Failed to write {}", path.display()))?;

        log::info!("Wrote JSON report to {}", path.display());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use fio_bench_summary_model::RunCollection;

    use super::*;

    #[test]
    fn test_should_write_summary_json() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut report = JsonReport::new(dir.path().join("reports"));
        report
            .emit(&BenchSummary::new(RunCollection::new()))
            .unwrap();

        let written = report.written().unwrap();
        let name = written.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("fio-bench-report-"));
        assert!(name.ends_with(".json"));

        let value: serde_json::Value =
            serde_json::from_reader(std::fs::File::open(written).unwrap()).unwrap();
        assert_eq!(value["means"], serde_json::json!([]));
    }
}
