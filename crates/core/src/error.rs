// Copyright 2025 Inference Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Pipeline-level failure taxonomy.
//!
//! Each variant maps onto a process exit code. Telemetry delivery failures
//! are deliberately absent: they never affect the exit code.

use thiserror::Error;

/// Exit code for generic failures.
pub const EXIT_FAILURE: i32 = 1;

/// Exit code used when the run is interrupted (SIGINT).
pub const EXIT_INTERRUPTED: i32 = 130;

/// Reasons a benchmark run is classified as failed.
#[derive(Debug, Error)]
pub enum BenchError {
    /// The external tool binary could not be found.
    #[error("{tool} not found: {hint}")]
    ToolNotInstalled {
        /// Binary that failed to spawn
        tool: String,
        /// Installation hint
        hint: String,
    },

    /// The external tool exited with a non-zero code.
    #[error("{tool} exited with code {code}")]
    ToolExited {
        /// Tool name
        tool: String,
        /// Exit code reported by the tool
        code: i32,
    },

    /// The external tool was terminated by a signal.
    #[error("{tool} was terminated by a signal")]
    ToolKilled {
        /// Tool name
        tool: String,
    },

    /// The tool ran but produced nothing usable.
    #[error("no parseable output: {0}")]
    NoParseableOutput(String),

    /// The evaluation ran but no task succeeded.
    #[error("evaluation failed: {0}")]
    EvaluationFailed(String),

    /// The run was interrupted by the user.
    #[error("interrupted")]
    Interrupted,

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Local I/O failure outside the tool itself.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BenchError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ToolExited { code, .. } if *code != 0 => *code,
            Self::Interrupted => EXIT_INTERRUPTED,
            _ => EXIT_FAILURE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let not_installed = BenchError::ToolNotInstalled {
            tool: "aiperf".into(),
            hint: "pip install aiperf".into(),
        };
        assert_eq!(not_installed.exit_code(), 1);

        let exited = BenchError::ToolExited {
            tool: "osworld".into(),
            code: 3,
        };
        assert_eq!(exited.exit_code(), 3);

        assert_eq!(BenchError::Interrupted.exit_code(), 130);
        assert_eq!(
            BenchError::NoParseableOutput("no metrics extracted".into()).exit_code(),
            1
        );
        assert_eq!(
            BenchError::EvaluationFailed("all tasks failed".into()).exit_code(),
            1
        );
    }

    #[test]
    fn test_failure_kinds_are_distinct() {
        let kinds = [
            BenchError::ToolNotInstalled {
                tool: "aiperf".into(),
                hint: String::new(),
            }
            .to_string(),
            BenchError::ToolExited {
                tool: "aiperf".into(),
                code: 2,
            }
            .to_string(),
            BenchError::NoParseableOutput("empty".into()).to_string(),
        ];
        assert!(kinds[0].contains("not found"));
        assert!(kinds[1].contains("exited with code 2"));
        assert!(kinds[2].contains("no parseable output"));
    }
}
