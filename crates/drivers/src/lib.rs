// Copyright 2025 Inference Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Benchmark tool drivers.
//!
//! Each driver turns a run configuration into an external tool invocation
//! and maps the process exit into a [`RunOutcome`]:
//!
//! - [`aiperf`] - `aiperf profile` load generation, output captured
//! - [`osworld`] - the OSWorld evaluation harness, output streamed
//! - [`process`] - child process execution shared by both

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod aiperf;
pub mod error;
pub mod osworld;
pub mod process;

use async_trait::async_trait;
use inference_bench_core::RunOutcome;

pub use aiperf::{AccessCredentials, AiperfConfig, AiperfDriver, RunLength};
pub use error::{DriverError, Result};
pub use osworld::{OsworldConfig, OsworldDriver};
pub use process::{OutputMode, ProcessExit, ToolCommand};

/// A benchmark tool that can be run once to completion.
///
/// A tool that runs and exits non-zero still yields `Ok`; only failures to
/// run it at all are errors.
#[async_trait]
pub trait BenchmarkDriver: Send + Sync {
    /// Short tool name, used in logs and on the outcome.
    fn id(&self) -> &str;

    /// Run the tool and describe how it finished.
    async fn run(&self) -> Result<RunOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_ids() {
        let drivers: Vec<Box<dyn BenchmarkDriver>> = vec![
            Box::new(AiperfDriver::new(AiperfConfig::default())),
            Box::new(OsworldDriver::new(OsworldConfig::default())),
        ];
        let ids: Vec<_> = drivers.iter().map(|d| d.id()).collect();
        assert_eq!(ids, vec!["aiperf", "osworld"]);
    }
}
