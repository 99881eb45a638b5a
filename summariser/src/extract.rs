use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use fio_bench_summary_model::{GroupKey, JobMetrics, JobRecord};
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Failed to read fio result {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to decode fio result {}: {reason}", .path.display())]
    Decode { path: PathBuf, reason: String },
}

/// The parts of fio's JSON output that the report uses.
#[derive(Debug, Deserialize)]
struct FioOutput {
    #[serde(default)]
    jobs: Vec<FioJob>,
}

#[derive(Debug, Deserialize)]
struct FioJob {
    #[serde(default)]
    groupid: i64,
    #[serde(default)]
    jobname: String,
    #[serde(default)]
    desc: String,
    #[serde(rename = "job options", default)]
    job_options: BTreeMap<String, OptionValue>,
    #[serde(default)]
    read: FioDirection,
    #[serde(default)]
    write: FioDirection,
    #[serde(default)]
    usr_cpu: f64,
    #[serde(default)]
    sys_cpu: f64,
    lat_ns: Option<FioLatency>,
}

#[derive(Debug, Default, Deserialize)]
struct FioDirection {
    #[serde(default)]
    io_kbytes: f64,
    #[serde(default)]
    bw_mean: f64,
    #[serde(default)]
    iops_mean: f64,
    lat_ns: Option<FioLatency>,
}

#[derive(Debug, Deserialize)]
struct FioLatency {
    #[serde(default)]
    mean: f64,
}

/// fio writes option values as strings, but hand written or converted results use numbers too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OptionValue {
    Text(String),
    Number(serde_json::Number),
    Flag(bool),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Text(text) => write!(f, "{text}"),
            OptionValue::Number(number) => write!(f, "{number}"),
            OptionValue::Flag(flag) => write!(f, "{flag}"),
        }
    }
}

impl FioJob {
    fn option(&self, name: &str) -> String {
        self.job_options
            .get(name)
            .map(ToString::to_string)
            .unwrap_or_default()
    }

    fn key(&self) -> GroupKey {
        let description = match self.option("description") {
            description if description.is_empty() => self.desc.clone(),
            description => description,
        };

        GroupKey {
            group_id: self.groupid,
            job_name: self.jobname.clone(),
            description,
            mode: self.option("rw"),
            block_size: self.option("bs"),
            queue_depth: self.option("iodepth"),
            job_count: self.option("numjobs"),
        }
    }

    /// fio reports latency per direction. A job level value wins, otherwise the direction that
    /// moved data is used, preferring reads.
    fn mean_latency_ns(&self) -> f64 {
        let latency = match &self.lat_ns {
            Some(latency) => Some(latency),
            None if self.read.io_kbytes > 0.0 => self.read.lat_ns.as_ref(),
            None => self.write.lat_ns.as_ref(),
        };
        latency.map(|l| l.mean).unwrap_or_default()
    }

    fn metrics(&self) -> JobMetrics {
        JobMetrics {
            read_mb: self.read.io_kbytes / 1024.0,
            write_mb: self.write.io_kbytes / 1024.0,
            read_bw_mbps: self.read.bw_mean / 1024.0,
            write_bw_mbps: self.write.bw_mean / 1024.0,
            read_iops: self.read.iops_mean,
            write_iops: self.write.iops_mean,
            mean_latency_ms: self.mean_latency_ns() / 1e6,
            cpu_percent: self.usr_cpu + self.sys_cpu,
        }
        .rounded()
    }
}

/// Turns a fio JSON result file into one [JobRecord] per job.
pub struct MetricsExtractor;

impl MetricsExtractor {
    /// Read and decode the result fio wrote to `path`.
    ///
    /// A result without jobs is not an error, it yields no records.
    pub fn extract(path: &Path) -> Result<Vec<JobRecord>, ExtractError> {
        let content = std::fs::read(path).map_err(|source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let records = Self::extract_from_slice(&content).map_err(|reason| ExtractError::Decode {
            path: path.to_path_buf(),
            reason,
        })?;

        if records.is_empty() {
            log::warn!("No jobs found in {}", path.display());
        } else {
            log::info!("Extracted {} jobs from {}", records.len(), path.display());
        }

        Ok(records)
    }

    /// Decode fio output held in memory.
    ///
    /// fio can print notices ahead of the JSON document and some versions print more after it, so
    /// decoding starts at the first `{` and stops at the end of the first document.
    pub fn extract_from_slice(content: &[u8]) -> Result<Vec<JobRecord>, String> {
        let start = content
            .iter()
            .position(|b| *b == b'{')
            .ok_or_else(|| "no JSON document found".to_string())?;

        let output = serde_json::Deserializer::from_slice(&content[start..])
            .into_iter::<FioOutput>()
            .next()
            .ok_or_else(|| "no JSON document found".to_string())?
            .map_err(|e| e.to_string())?;

        Ok(output
            .jobs
            .iter()
            .map(|job| JobRecord::new(job.key(), job.metrics()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const SINGLE_JOB: &str = r#"{
  "fio version" : "fio-3.36",
  "jobs" : [
    {
      "jobname" : "seq-read",
      "groupid" : 0,
      "error" : 0,
      "job options" : {
        "rw" : "read",
        "bs" : "1M",
        "iodepth" : "32",
        "numjobs" : "1"
      },
      "read" : {
        "io_kbytes" : 2048,
        "bw_mean" : 10240.0,
        "iops_mean" : 10.004,
        "lat_ns" : { "min" : 1000, "max" : 3000000, "mean" : 1500000.0 }
      },
      "write" : {
        "io_kbytes" : 0,
        "bw_mean" : 0.0,
        "iops_mean" : 0.0,
        "lat_ns" : { "min" : 0, "max" : 0, "mean" : 0.0 }
      },
      "usr_cpu" : 1.25,
      "sys_cpu" : 2.5,
      "desc" : "sequential read"
    }
  ]
}"#;

    #[test]
    fn test_should_extract_job_metrics() {
        let records = MetricsExtractor::extract_from_slice(SINGLE_JOB.as_bytes()).unwrap();

        assert_eq!(
            records,
            vec![JobRecord::new(
                GroupKey {
                    group_id: 0,
                    job_name: "seq-read".to_string(),
                    description: "sequential read".to_string(),
                    mode: "read".to_string(),
                    block_size: "1M".to_string(),
                    queue_depth: "32".to_string(),
                    job_count: "1".to_string(),
                },
                JobMetrics {
                    read_mb: 2.0,
                    write_mb: 0.0,
                    read_bw_mbps: 10.0,
                    write_bw_mbps: 0.0,
                    read_iops: 10.0,
                    write_iops: 0.0,
                    mean_latency_ms: 1.5,
                    cpu_percent: 3.75,
                }
            )]
        );
    }

    #[test]
    fn test_should_skip_notices_around_document() {
        let content = format!(
            "note: both iodepth >= 1 and synchronous I/O engine are selected\n{SINGLE_JOB}\nfio: trailing notice\n"
        );
        let records = MetricsExtractor::extract_from_slice(content.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_should_return_no_records_without_jobs() {
        let records =
            MetricsExtractor::extract_from_slice(br#"{"fio version": "fio-3.36", "jobs": []}"#)
                .unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_should_prefer_description_option_and_render_numbers() {
        let records = MetricsExtractor::extract_from_slice(
            br#"{"jobs": [{
                "jobname": "rand-write",
                "groupid": 1,
                "desc": "free text",
                "job options": {"description": "4k random write", "iodepth": 64, "numjobs": 4, "rw": "randwrite"},
                "write": {"io_kbytes": 1024, "bw_mean": 2048, "iops_mean": 512, "lat_ns": {"mean": 2345678}}
            }]}"#,
        )
        .unwrap();

        let record = &records[0];
        assert_eq!(record.key.description, "4k random write");
        assert_eq!(record.key.queue_depth, "64");
        assert_eq!(record.key.job_count, "4");
        assert_eq!(record.key.block_size, "");
        assert_eq!(record.metrics.write_mb, 1.0);
        assert_eq!(record.metrics.write_bw_mbps, 2.0);
        assert_eq!(record.metrics.write_iops, 512.0);
        // read moved no data, so latency comes from the write direction
        assert_eq!(record.metrics.mean_latency_ms, 2.35);
    }

    #[test]
    fn test_should_prefer_job_level_latency() {
        let records = MetricsExtractor::extract_from_slice(
            br#"{"jobs": [{
                "jobname": "mixed",
                "lat_ns": {"mean": 4000000},
                "read": {"io_kbytes": 10, "lat_ns": {"mean": 1000000}}
            }]}"#,
        )
        .unwrap();
        assert_eq!(records[0].metrics.mean_latency_ms, 4.0);
    }

    #[test]
    fn test_should_fail_on_invalid_document() {
        assert!(MetricsExtractor::extract_from_slice(b"fio: no such file").is_err());
        assert!(MetricsExtractor::extract_from_slice(b"{\"jobs\": [").is_err());
    }

    #[test]
    fn test_should_report_missing_file() {
        let result = MetricsExtractor::extract(Path::new("/non/existent/fio_results_run1.json"));
        assert!(matches!(result, Err(ExtractError::Io { .. })));
    }
}
