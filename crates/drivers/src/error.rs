// Copyright 2025 Inference Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Driver errors.

use inference_bench_core::BenchError;
use thiserror::Error;

/// Errors that prevent a driver from producing a [`RunOutcome`].
///
/// A tool that runs and exits non-zero is *not* an error here; that is
/// reported through the outcome's status.
///
/// [`RunOutcome`]: inference_bench_core::RunOutcome
#[derive(Debug, Error)]
pub enum DriverError {
    /// The tool binary could not be found on `PATH`.
    #[error("{tool} not found")]
    ToolNotInstalled {
        /// Program that failed to spawn
        tool: String,
        /// How to install it
        hint: &'static str,
    },

    /// Free-form extra arguments could not be split.
    #[error("invalid extra arguments: {0}")]
    InvalidArgs(String),

    /// Spawn, wait, or filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for driver operations.
pub type Result<T> = std::result::Result<T, DriverError>;

impl From<DriverError> for BenchError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::ToolNotInstalled { tool, hint } => BenchError::ToolNotInstalled {
                tool,
                hint: hint.to_string(),
            },
            DriverError::InvalidArgs(msg) => BenchError::Config(msg),
            DriverError::Io(e) => BenchError::Io(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_installed_maps_to_generic_failure() {
        let err: BenchError = DriverError::ToolNotInstalled {
            tool: "aiperf".into(),
            hint: "pip install aiperf",
        }
        .into();
        assert!(matches!(err, BenchError::ToolNotInstalled { .. }));
        assert_eq!(err.exit_code(), 1);
    }
}
