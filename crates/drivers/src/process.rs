// Copyright 2025 Inference Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Child process execution for benchmark tools.

use crate::error::{DriverError, Result};
use inference_bench_core::outcome::truncate_chars;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Number of characters of captured output shown in failure logs.
pub const PREVIEW_CHARS: usize = 1000;

/// How the child's stdout/stderr are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Pipe both streams and keep them for the outcome.
    Capture,
    /// Stream directly to this process's terminal.
    Inherit,
}

/// A fully resolved tool invocation.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    /// Program to execute.
    pub program: String,
    /// Arguments, in order.
    pub args: Vec<String>,
    /// Working directory for the child.
    pub working_dir: Option<PathBuf>,
    /// Variables always set on the child.
    pub env: Vec<(String, String)>,
    /// Variables set only when absent from the parent environment.
    pub env_defaults: Vec<(String, String)>,
    /// Output handling.
    pub output: OutputMode,
    /// Shown when the program cannot be found.
    pub install_hint: &'static str,
}

impl ToolCommand {
    /// Create a command with captured output and no extra environment.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: None,
            env: Vec::new(),
            env_defaults: Vec::new(),
            output: OutputMode::Capture,
            install_hint: "",
        }
    }

    /// Render the command line for logging.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the command to completion.
    ///
    /// The child is killed if the returned future is dropped before it exits.
    pub async fn run(&self) -> Result<ProcessExit> {
        let mut command = Command::new(&self.program);
        command.args(&self.args).stdin(Stdio::null()).kill_on_drop(true);

        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        for (key, value) in &self.env_defaults {
            if std::env::var_os(key).is_none() {
                command.env(key, value);
            }
        }
        for (key, value) in &self.env {
            command.env(key, value);
        }

        let mode = self.output;
        match mode {
            OutputMode::Capture => command.stdout(Stdio::piped()).stderr(Stdio::piped()),
            OutputMode::Inherit => command.stdout(Stdio::inherit()).stderr(Stdio::inherit()),
        };

        info!(command = %self.display(), "Running command");
        let mut child = command.spawn().map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                DriverError::ToolNotInstalled {
                    tool: self.program.clone(),
                    hint: self.install_hint,
                }
            } else {
                DriverError::Io(e)
            }
        })?;

        let exit = match mode {
            OutputMode::Capture => {
                let output = child.wait_with_output().await?;
                ProcessExit {
                    code: output.status.code(),
                    stdout: Some(String::from_utf8_lossy(&output.stdout).into_owned()),
                    stderr: Some(String::from_utf8_lossy(&output.stderr).into_owned()),
                }
            }
            OutputMode::Inherit => {
                let status = child.wait().await?;
                ProcessExit {
                    code: status.code(),
                    stdout: None,
                    stderr: None,
                }
            }
        };
        debug!(code = ?exit.code, "Process exited");
        Ok(exit)
    }
}

/// How a child process finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessExit {
    /// Exit code, `None` when terminated by a signal.
    pub code: Option<i32>,
    /// Captured stdout ([`OutputMode::Capture`] only).
    pub stdout: Option<String>,
    /// Captured stderr ([`OutputMode::Capture`] only).
    pub stderr: Option<String>,
}

impl ProcessExit {
    /// Whether the process exited with code 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Whether captured output mentions a timeout.
    pub fn mentions_timeout(&self) -> bool {
        [&self.stdout, &self.stderr]
            .into_iter()
            .flatten()
            .any(|s| s.contains("TimeoutError") || s.to_lowercase().contains("timeout"))
    }

    /// Log the first [`PREVIEW_CHARS`] characters of captured output.
    pub fn log_preview(&self) {
        let preview = |s: &Option<String>| match s.as_deref() {
            Some(s) if !s.is_empty() => truncate_chars(s, PREVIEW_CHARS),
            _ => "(empty)".to_string(),
        };
        warn!(
            stdout = %preview(&self.stdout),
            "Stdout preview (first {} chars)", PREVIEW_CHARS
        );
        if self.stderr.is_some() && self.stderr != self.stdout {
            warn!(
                stderr = %preview(&self.stderr),
                "Stderr preview (first {} chars)", PREVIEW_CHARS
            );
        }
    }
}

/// Split free-form extra arguments with shell quoting rules.
pub fn split_extra_args(raw: Option<&str>) -> Result<Vec<String>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(Vec::new()),
        Some(raw) => shell_words::split(raw).map_err(|e| DriverError::InvalidArgs(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sh(script: &str) -> ToolCommand {
        ToolCommand::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_output_and_exit_code() {
        let exit = sh("echo out; echo err >&2; exit 3").run().await.unwrap();
        assert_eq!(exit.code, Some(3));
        assert!(!exit.success());
        assert_eq!(exit.stdout.as_deref(), Some("out\n"));
        assert_eq!(exit.stderr.as_deref(), Some("err\n"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_inherit_mode_captures_nothing() {
        let mut cmd = sh("exit 0");
        cmd.output = OutputMode::Inherit;
        let exit = cmd.run().await.unwrap();
        assert!(exit.success());
        assert!(exit.stdout.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_env_overrides_and_defaults() {
        let mut cmd = sh("echo \"$TERM|$INFERENCE_BENCH_TEST_DEFAULT\"");
        cmd.env.push(("TERM".into(), "dumb".into()));
        cmd.env_defaults
            .push(("INFERENCE_BENCH_TEST_DEFAULT".into(), "600.0".into()));
        let exit = cmd.run().await.unwrap();
        assert_eq!(exit.stdout.as_deref(), Some("dumb|600.0\n"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_working_dir_is_applied() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut cmd = sh("pwd");
        cmd.working_dir = Some(dir.path().to_path_buf());
        let exit = cmd.run().await.unwrap();
        let printed = exit.stdout.unwrap();
        let expected = dir.path().canonicalize().unwrap();
        assert_eq!(
            std::path::Path::new(printed.trim()).canonicalize().unwrap(),
            expected
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dropped_run_kills_child() {
        let dir = tempfile::TempDir::new().unwrap();
        let marker = dir.path().join("late");
        let script = format!("sleep 1; touch {}", marker.display());
        let cmd = sh(&script);

        let run = cmd.run();
        let timed_out = tokio::time::timeout(Duration::from_millis(100), run)
            .await
            .is_err();
        assert!(timed_out);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_missing_binary_is_not_installed() {
        let mut cmd = ToolCommand::new("inference-bench-no-such-tool", vec![]);
        cmd.install_hint = "install it";
        let err = cmd.run().await.unwrap_err();
        match err {
            DriverError::ToolNotInstalled { tool, hint } => {
                assert_eq!(tool, "inference-bench-no-such-tool");
                assert_eq!(hint, "install it");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_mentions_timeout() {
        let exit = ProcessExit {
            code: Some(1),
            stdout: Some("asyncio.TimeoutError: configure".into()),
            stderr: None,
        };
        assert!(exit.mentions_timeout());

        let exit = ProcessExit {
            code: Some(1),
            stdout: Some("connection refused".into()),
            stderr: Some("".into()),
        };
        assert!(!exit.mentions_timeout());
    }

    #[test]
    fn test_split_extra_args() {
        assert!(split_extra_args(None).unwrap().is_empty());
        assert!(split_extra_args(Some("  ")).unwrap().is_empty());
        assert_eq!(
            split_extra_args(Some("--sleep_after_execution 3 --note 'two words'")).unwrap(),
            vec!["--sleep_after_execution", "3", "--note", "two words"]
        );
        assert!(matches!(
            split_extra_args(Some("--note 'unterminated")),
            Err(DriverError::InvalidArgs(_))
        ));
    }

    #[test]
    fn test_display() {
        let cmd = ToolCommand::new("aiperf", vec!["profile".into(), "--model".into(), "m".into()]);
        assert_eq!(cmd.display(), "aiperf profile --model m");
    }
}
