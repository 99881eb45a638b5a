//! Runs an external process to completion while streaming its output.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use fio_bench_summary_model::RunOutcome;
use itertools::Itertools;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{ChildStderr, Command};

use crate::shutdown::ShutdownListener;

/// Number of trailing stderr lines kept to explain a failed run.
const STDERR_TAIL_LINES: usize = 20;

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// A command line to run with a [`ProcessRunner`], and the result artifact it is expected to
/// write.
#[derive(Debug, Clone)]
pub struct Invocation {
    program: PathBuf,
    args: Vec<OsString>,
    artifact_path: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            artifact_path: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Require the process to leave a readable file at `path` for the run to count as successful.
    pub fn expect_artifact(mut self, path: impl Into<PathBuf>) -> Self {
        self.artifact_path = Some(path.into());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn artifact_path(&self) -> Option<&Path> {
        self.artifact_path.as_deref()
    }

    /// The command line, for display only.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .map(|part| part.to_string_lossy())
            .join(" ")
    }
}

/// Runs one process at a time, draining stdout and stderr concurrently so the process can never
/// block on a full pipe.
#[derive(Debug)]
pub struct ProcessRunner {
    shutdown: ShutdownListener,
}

impl ProcessRunner {
    /// Create a runner that kills the running process when `shutdown` fires.
    pub fn new(shutdown: ShutdownListener) -> Self {
        Self { shutdown }
    }

    /// Run the [`Invocation`] to completion.
    ///
    /// `on_line` is called once for every line written to stdout, in the order the lines were
    /// produced. Stderr is logged and only its tail is kept, to explain a failure. This returns
    /// once both streams are closed and the process has exited, or as soon as a shutdown is
    /// requested, in which case the process is killed.
    pub async fn run<F>(&mut self, invocation: &Invocation, mut on_line: F) -> RunOutcome
    where
        F: FnMut(&str),
    {
        let artifact_path = invocation.artifact_path.clone();
        let program = invocation.program.display().to_string();

        log::debug!("Running '{}'", invocation.command_line());
        let mut child = match Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                return RunOutcome::failed(artifact_path, format!("Failed to start '{program}': {e}"))
            }
        };

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return RunOutcome::failed(
                artifact_path,
                format!("Failed to capture the output of '{program}'"),
            );
        };

        let stderr_reader = tokio::spawn(drain_stderr(stderr));
        let stdout_reader = read_lines(stdout, &mut on_line);

        let completion = async {
            let (stdout_result, stderr_tail) = tokio::join!(stdout_reader, stderr_reader);
            if let Err(e) = &stdout_result {
                // Nobody is reading stdout any more, so the process must not be left to block on it
                log::error!("Failed to read stdout of '{program}': {e}");
                if let Err(e) = child.start_kill() {
                    log::warn!("Failed to kill '{program}': {e}");
                }
            }
            let status = child.wait().await;
            (stdout_result, stderr_tail, status)
        };

        let finished = tokio::select! {
            finished = completion => Some(finished),
            _ = self.shutdown.wait_for_shutdown() => None,
        };

        let Some((stdout_result, stderr_tail, status)) = finished else {
            log::warn!("Shutdown requested, stopping '{program}'");
            if let Err(e) = child.start_kill() {
                log::warn!("Failed to kill '{program}': {e}");
            }
            if let Err(e) = child.wait().await {
                log::warn!("Failed to wait for '{program}' to exit: {e}");
            }
            return RunOutcome::failed(artifact_path, "interrupted");
        };

        if let Ok(lines) = stdout_result {
            log::trace!("Read {lines} lines from the stdout of '{program}'");
        }

        let stderr_tail = stderr_tail.unwrap_or_else(|e| {
            log::warn!("Stderr reader for '{program}' failed: {e}");
            VecDeque::new()
        });

        let status = match status {
            Ok(status) => status,
            Err(e) => {
                return RunOutcome::failed(
                    artifact_path,
                    format!("Failed to wait for '{program}' to exit: {e}"),
                )
            }
        };

        if !status.success() {
            let mut diagnostic = format!("'{program}' exited with {status}");
            if !stderr_tail.is_empty() {
                diagnostic.push_str(":\n");
                diagnostic.push_str(&stderr_tail.iter().join("\n"));
            }
            return RunOutcome::failed(artifact_path, diagnostic);
        }

        if let Some(path) = &artifact_path {
            if let Err(e) = tokio::fs::File::open(path).await {
                let diagnostic = format!(
                    "'{program}' succeeded but its result '{}' could not be opened: {e}",
                    path.display()
                );
                return RunOutcome::failed(artifact_path, diagnostic);
            }
        }

        RunOutcome::succeeded(artifact_path)
    }
}

/// Drain stderr to the log, keeping the last [`STDERR_TAIL_LINES`] lines.
async fn drain_stderr(stderr: ChildStderr) -> VecDeque<String> {
    let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
    let mut keep = |line: &str| {
        log::debug!(target: "fio::stderr", "{line}");
        if tail.len() == STDERR_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line.to_string());
    };

    if let Err(e) = read_lines(stderr, &mut keep).await {
        log::warn!("Failed to read stderr: {e}");
    }

    tail
}

/// Read `reader` to the end, calling `on_line` for every line. Returns the number of lines.
async fn read_lines<R, F>(mut reader: R, on_line: &mut F) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
    F: FnMut(&str),
{
    let mut splitter = LineSplitter::default();
    let mut buf = vec![0u8; READ_CHUNK_SIZE];
    let mut lines = 0;
    loop {
        let read = reader.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        lines += splitter.feed(&buf[..read], on_line);
    }
    lines += splitter.flush(on_line);

    Ok(lines)
}

/// Splits a byte stream into lines on `\n`, `\r\n` or a lone `\r`.
///
/// fio redraws its status line with carriage returns, so a lone `\r` ends a line too. Empty lines
/// are dropped and invalid UTF-8 is replaced rather than rejected. Only the current partial line is
/// buffered.
#[derive(Debug, Default)]
struct LineSplitter {
    partial: Vec<u8>,
}

impl LineSplitter {
    fn feed<F>(&mut self, chunk: &[u8], on_line: &mut F) -> usize
    where
        F: FnMut(&str),
    {
        let mut lines = 0;
        for &byte in chunk {
            if byte == b'\n' || byte == b'\r' {
                lines += self.flush(on_line);
            } else {
                self.partial.push(byte);
            }
        }
        lines
    }

    fn flush<F>(&mut self, on_line: &mut F) -> usize
    where
        F: FnMut(&str),
    {
        if self.partial.is_empty() {
            return 0;
        }
        {
            let line = String::from_utf8_lossy(&self.partial);
            on_line(&line);
        }
        self.partial.clear();
        1
    }
}
