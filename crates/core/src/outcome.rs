// Copyright 2025 Inference Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Benchmark run outcome types.
//!
//! A [`RunOutcome`] is built exactly once by a driver after the external
//! tool exits, and is never mutated afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Maximum number of characters of stdout/stderr kept on an outcome.
pub const CAPTURE_LIMIT: usize = 64 * 1024;

/// Status of a finished benchmark run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Tool exited with code 0.
    Success,
    /// Tool exited non-zero or was killed by a signal.
    Error,
}

/// Result of a single external tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Name of the tool that was run (e.g. `aiperf`).
    pub tool: String,
    /// Final status.
    pub status: RunStatus,
    /// Process exit code, `None` when terminated by a signal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Captured stdout, truncated to [`CAPTURE_LIMIT`] characters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    /// Captured stderr, truncated to [`CAPTURE_LIMIT`] characters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    /// When the outcome was recorded.
    pub timestamp: DateTime<Utc>,
    /// Directory the tool wrote its artifacts to.
    pub output_dir: PathBuf,
    /// Result artifacts discovered in `output_dir` after the run.
    #[serde(default)]
    pub result_files: Vec<PathBuf>,
}

impl RunOutcome {
    /// Build an outcome from a process exit.
    ///
    /// `exit_code == Some(0)` is a success; anything else is an error.
    pub fn from_exit(
        tool: impl Into<String>,
        exit_code: Option<i32>,
        output_dir: impl Into<PathBuf>,
        result_files: Vec<PathBuf>,
    ) -> Self {
        let status = match exit_code {
            Some(0) => RunStatus::Success,
            _ => RunStatus::Error,
        };
        Self {
            tool: tool.into(),
            status,
            exit_code,
            stdout: None,
            stderr: None,
            timestamp: Utc::now(),
            output_dir: output_dir.into(),
            result_files,
        }
    }

    /// Attach captured output, truncating each stream to [`CAPTURE_LIMIT`].
    pub fn with_output(mut self, stdout: Option<String>, stderr: Option<String>) -> Self {
        self.stdout = stdout.map(|s| truncate_chars(&s, CAPTURE_LIMIT));
        self.stderr = stderr.map(|s| truncate_chars(&s, CAPTURE_LIMIT));
        self
    }

    /// Whether the run exited cleanly.
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    /// Non-zero exit, but result artifacts were produced anyway.
    pub fn is_degraded(&self) -> bool {
        self.status == RunStatus::Error && !self.result_files.is_empty()
    }

    /// Non-zero exit with nothing produced.
    pub fn is_hard_failure(&self) -> bool {
        self.status == RunStatus::Error && self.result_files.is_empty()
    }

    /// Whether extraction should be attempted for this outcome.
    pub fn has_artifacts(&self) -> bool {
        !self.result_files.is_empty()
    }
}

/// Truncate `s` to at most `limit` characters, on a char boundary.
pub fn truncate_chars(s: &str, limit: usize) -> String {
    match s.char_indices().nth(limit) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
