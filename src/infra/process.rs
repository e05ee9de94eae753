//! External process execution
//!
//! Runs a command synchronously in a working directory with stderr merged
//! into stdout. A non-zero exit is reported in [`ProcessOutput`], never as
//! an error; callers decide whether it is fatal.

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

use crate::error::ProcessError;

/// Captured result of a finished process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, absent when the process was terminated by a signal
    pub status: Option<i32>,
    /// Combined stdout and stderr, one entry per line, in arrival order
    pub lines: Vec<String>,
}

impl ProcessOutput {
    /// Whether the process exited with status 0
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Convert a non-zero exit into [`ProcessError::Failed`]
    pub fn check(self, command: &str) -> Result<Self, ProcessError> {
        if self.success() {
            Ok(self)
        } else {
            Err(ProcessError::Failed {
                command: command.to_string(),
                status: self.status,
            })
        }
    }
}

/// Synchronous process runner
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    /// Extra environment variables applied to every child
    env: Vec<(String, String)>,
}

impl ProcessRunner {
    /// Create a runner that inherits the current environment unchanged
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an environment variable for every spawned process
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Locate `tool` on the `PATH` children of this runner would see
    pub fn find_tool(&self, tool: &str) -> Option<PathBuf> {
        match self.env.iter().rev().find(|(k, _)| k == "PATH") {
            Some((_, path)) => which::which_in(tool, Some(path), ".").ok(),
            None => find_in_path(tool),
        }
    }

    /// Run `argv` in `dir` and collect its output
    pub fn run(&self, dir: &Path, argv: &[String]) -> Result<ProcessOutput, ProcessError> {
        self.run_streaming(dir, argv, |_| {})
    }

    /// Run `argv` in `dir`, handing each output line to `on_line` as it arrives
    pub fn run_streaming<F>(
        &self,
        dir: &Path,
        argv: &[String],
        mut on_line: F,
    ) -> Result<ProcessOutput, ProcessError>
    where
        F: FnMut(&str),
    {
        let (program, args) = argv.split_first().ok_or(ProcessError::EmptyCommand)?;
        let command = command_line(argv);
        tracing::debug!(dir = %dir.display(), "exec {command}");

        let spawn_error = |e: std::io::Error| ProcessError::Spawn {
            command: command.clone(),
            dir: dir.to_path_buf(),
            error: e.to_string(),
        };

        let mut child = Command::new(program)
            .args(args)
            .current_dir(dir)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        let (tx, rx) = mpsc::channel();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(forward_lines(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(forward_lines(stderr, tx.clone()));
        }
        drop(tx);

        let mut lines = Vec::new();
        for line in rx {
            on_line(&line);
            lines.push(line);
        }
        for reader in readers {
            let _ = reader.join();
        }

        let status = child.wait().map_err(spawn_error)?;
        tracing::debug!(status = ?status.code(), "exit {command}");

        Ok(ProcessOutput {
            status: status.code(),
            lines,
        })
    }
}

fn forward_lines<R>(reader: R, tx: Sender<String>) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    while matches!(buf.last(), Some(b'\n' | b'\r')) {
                        buf.pop();
                    }
                    if tx.send(String::from_utf8_lossy(&buf).into_owned()).is_err() {
                        break;
                    }
                }
            }
        }
    })
}

/// Render an argument vector the way it is echoed to the user
pub fn command_line(argv: &[String]) -> String {
    argv.join(" ")
}

/// Locate `tool` on the PATH
pub fn find_in_path(tool: &str) -> Option<PathBuf> {
    which::which(tool).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_find_tool_honours_runner_path() {
        let dir = TempDir::new().unwrap();
        let runner = ProcessRunner::new().with_env("PATH", dir.path().display().to_string());
        assert!(runner.find_tool("cmake").is_none());
    }

    #[test]
    fn test_empty_argv_is_rejected() {
        let dir = TempDir::new().unwrap();
        let err = ProcessRunner::new().run(dir.path(), &[]).unwrap_err();
        assert!(matches!(err, ProcessError::EmptyCommand));
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let dir = TempDir::new().unwrap();
        let err = ProcessRunner::new()
            .run(dir.path(), &argv(&["definitely-not-a-real-program-bld"]))
            .unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_merges_stderr_and_keeps_exit_status() {
        let dir = TempDir::new().unwrap();
        let output = ProcessRunner::new()
            .run(
                dir.path(),
                &argv(&["sh", "-c", "echo out; echo err 1>&2; exit 3"]),
            )
            .unwrap();

        assert_eq!(output.status, Some(3));
        assert!(!output.success());
        assert!(output.lines.contains(&"out".to_string()));
        assert!(output.lines.contains(&"err".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_runs_in_working_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "x").unwrap();
        let output = ProcessRunner::new()
            .run(dir.path(), &argv(&["ls"]))
            .unwrap();
        assert!(output.success());
        assert_eq!(output.lines, vec!["marker.txt".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn test_streaming_sees_every_line() {
        let dir = TempDir::new().unwrap();
        let mut seen = Vec::new();
        let output = ProcessRunner::new()
            .with_env("BLD_TEST_VALUE", "42")
            .run_streaming(
                dir.path(),
                &argv(&["sh", "-c", "echo $BLD_TEST_VALUE; echo done"]),
                |line| seen.push(line.to_string()),
            )
            .unwrap();
        assert_eq!(seen, output.lines);
        assert_eq!(seen, vec!["42".to_string(), "done".to_string()]);
    }

    #[test]
    fn test_check_converts_failure() {
        let output = ProcessOutput {
            status: Some(1),
            lines: vec![],
        };
        let err = output.check("cmake --build x").unwrap_err();
        assert!(matches!(err, ProcessError::Failed { status: Some(1), .. }));
    }
}
