use std::env;
use std::path::{Path, PathBuf};

use anyhow::bail;
use anyhow::Context;

use crate::process::Invocation;

/// Environment variable to override the path to the fio binary.
pub const FIO_BENCH_FIO_PATH_ENV: &str = "FIO_BENCH_FIO_PATH";

/// Get the path to the fio binary.
///
/// An explicitly configured path wins. Otherwise, if the [`FIO_BENCH_FIO_PATH_ENV`] environment
/// variable is set, its value is used. If neither is set, `fio` is looked up in the user's `PATH`.
pub fn fio_path(configured: Option<&Path>) -> anyhow::Result<PathBuf> {
    if let Some(path) = configured {
        return existing_path(path, "configured");
    }

    resolve_fio_path(env::var(FIO_BENCH_FIO_PATH_ENV).ok().as_deref())
}

fn resolve_fio_path(env_value: Option<&str>) -> anyhow::Result<PathBuf> {
    match env_value {
        Some("") => {
            bail!("'{FIO_BENCH_FIO_PATH_ENV}' set to empty string");
        }
        Some("fio") | None => {
            log::debug!("'{FIO_BENCH_FIO_PATH_ENV}' is not a path so looking in user's 'PATH'");
            which::which("fio").with_context(|| {
                format!(
                    "fio binary not found in PATH. Please install fio or set '{FIO_BENCH_FIO_PATH_ENV}' to the correct path."
                )
            })
        }
        Some(path) => existing_path(Path::new(path), FIO_BENCH_FIO_PATH_ENV),
    }
}

fn existing_path(path: &Path, source: &str) -> anyhow::Result<PathBuf> {
    if !path.exists() {
        bail!(
            "Path to fio binary set from {source} to '{path}' but that path doesn't exist",
            path = path.display()
        );
    }
    Ok(path.to_path_buf())
}

/// Get the version of the fio binary by running `fio --version`.
pub async fn fio_version(fio_path: &Path) -> anyhow::Result<String> {
    let output = tokio::process::Command::new(fio_path)
        .arg("--version")
        .stdin(std::process::Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .context("Failed to execute 'fio --version' command")?;
    if !output.status.success() {
        bail!(
            "'fio --version' command failed with exit code: {status}",
            status = output.status
        );
    }

    let version = String::from_utf8(output.stdout)
        .context("Failed to parse output of 'fio --version' command as UTF-8")?
        .trim()
        .to_string();

    Ok(version)
}

/// The command that runs one benchmark trial, writing the JSON result to `artifact`.
pub fn benchmark_invocation(fio_path: &Path, job_file: &Path, artifact: &Path) -> Invocation {
    Invocation::new(fio_path)
        .args(["--output-format=json", "--eta=always", "--group_reporting", "--output"])
        .arg(artifact.as_os_str())
        .arg(job_file.as_os_str())
        .expect_artifact(artifact)
}

/// The command that lays out the test files. Its output is only used for progress.
pub fn prepare_invocation(fio_path: &Path, job_file: &Path) -> Invocation {
    Invocation::new(fio_path)
        .args(["--eta=always", "--group_reporting"])
        .arg(job_file.as_os_str())
}

#[cfg(test)]
mod tests {
    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_should_not_get_fio_path_if_not_exist() {
        let result = resolve_fio_path(Some("/non/existent/path/to/fio"));
        assert!(result.is_err());
    }

    #[test]
    fn test_should_not_accept_empty_env_value() {
        let result = resolve_fio_path(Some(""));
        assert!(result.is_err());
    }

    #[test]
    fn test_should_get_fio_path_from_env_value() {
        let temp = NamedTempFile::new().expect("failed to create temp file");
        let test_path = temp.path().to_str().expect("failed to get temp file path");
        let result = resolve_fio_path(Some(test_path)).expect("failed to get fio path");
        assert_eq!(result, PathBuf::from(test_path));
    }

    #[test]
    fn test_should_prefer_configured_path() {
        let temp = NamedTempFile::new().expect("failed to create temp file");
        let result = fio_path(Some(temp.path())).expect("failed to get fio path");
        assert_eq!(result, temp.path());
    }

    #[test]
    fn test_should_not_get_missing_configured_path() {
        let result = fio_path(Some(Path::new("/non/existent/fio")));
        assert!(result.is_err());
    }

    #[test]
    fn test_should_build_benchmark_invocation() {
        let invocation = benchmark_invocation(
            Path::new("fio"),
            Path::new("benchmark.fio"),
            Path::new("fio_results_run1.json"),
        );
        assert_eq!(
            invocation.command_line(),
            "fio --output-format=json --eta=always --group_reporting --output fio_results_run1.json benchmark.fio"
        );
        assert_eq!(
            invocation.artifact_path(),
            Some(Path::new("fio_results_run1.json"))
        );
    }

    #[test]
    fn test_should_not_expect_artifact_from_prepare() {
        let invocation = prepare_invocation(Path::new("fio"), Path::new("read_test_file.fio"));
        assert_eq!(invocation.artifact_path(), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_should_read_version_from_binary() {
        use std::os::unix::fs::PermissionsExt as _;

        let temp = tempfile::TempDir::new().expect("failed to create temp dir");
        let fake_fio = temp.path().join("fio");
        std::fs::write(&fake_fio, "#!/bin/sh\necho fio-3.36\n").expect("failed to write fake fio");
        std::fs::set_permissions(&fake_fio, std::fs::Permissions::from_mode(0o755))
            .expect("failed to make fake fio executable");

        let version = fio_version(&fake_fio)
            .await
            .expect("failed to get version");
        assert_eq!(version, "fio-3.36");
    }
}
