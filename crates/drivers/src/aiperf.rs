// Copyright 2025 Inference Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! aiperf load-generation driver.
//!
//! Builds an `aiperf profile` invocation from an [`AiperfConfig`], runs it
//! non-interactively, and maps the exit into a [`RunOutcome`].
//!
//! # Example
//!
//! ```ignore
//! use inference_bench_drivers::{AiperfConfig, AiperfDriver, BenchmarkDriver};
//!
//! let driver = AiperfDriver::new(AiperfConfig::default());
//! let outcome = driver.run().await?;
//! if outcome.is_degraded() {
//!     // non-zero exit but artifacts were written
//! }
//! ```

use crate::error::Result;
use crate::process::{split_extra_args, OutputMode, ProcessExit, ToolCommand};
use crate::BenchmarkDriver;
use async_trait::async_trait;
use inference_bench_benchmarks::io;
use inference_bench_core::RunOutcome;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Startup timeouts aiperf reads from the environment; applied only when
/// the parent environment does not set them.
pub const AIPERF_TIMEOUT_DEFAULTS: &[(&str, &str)] = &[
    ("AIPERF_SERVICE_PROFILE_CONFIGURE_TIMEOUT", "600.0"),
    ("AIPERF_SERVICE_PROFILE_START_TIMEOUT", "300.0"),
    ("AIPERF_DATASET_CONFIGURATION_TIMEOUT", "600.0"),
];

/// Variables that turn off TUI and color output in the child.
pub const NON_INTERACTIVE_ENV: &[(&str, &str)] = &[
    ("TERM", "dumb"),
    ("CI", "true"),
    ("NO_COLOR", "1"),
    ("PYTHONUNBUFFERED", "1"),
];

/// Cloudflare Access service-token pair sent as request headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessCredentials {
    /// `CF-Access-Client-Id`
    pub client_id: String,
    /// `CF-Access-Client-Secret`
    pub client_secret: String,
}

impl AccessCredentials {
    /// Build a pair only if both halves are present and non-empty.
    pub fn from_parts(client_id: Option<String>, client_secret: Option<String>) -> Option<Self> {
        match (client_id, client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => Some(Self {
                client_id: id,
                client_secret: secret,
            }),
            _ => None,
        }
    }
}

/// Run length: a fixed number of requests, or a wall-clock duration.
#[derive(Debug, Clone, PartialEq)]
pub enum RunLength {
    /// `--request-count N`
    Requests(u64),
    /// `--benchmark-duration S [--benchmark-grace-period G]`
    Duration {
        /// Benchmark duration in seconds
        seconds: f64,
        /// Grace period in seconds
        grace_period: Option<f64>,
    },
}

impl RunLength {
    /// Resolve the two mutually exclusive settings; a duration wins over a
    /// request count.
    pub fn resolve(request_count: u64, duration: Option<f64>, grace_period: Option<f64>) -> Self {
        match duration {
            Some(seconds) => Self::Duration {
                seconds,
                grace_period,
            },
            None => Self::Requests(request_count),
        }
    }
}

/// Configuration for one aiperf run.
#[derive(Debug, Clone)]
pub struct AiperfConfig {
    /// aiperf executable.
    pub binary: String,
    /// Model identifier.
    pub model: String,
    /// Inference endpoint URL.
    pub endpoint_url: String,
    /// Endpoint type (`chat`, `completions`, `embeddings`).
    pub endpoint_type: String,
    /// Concurrent requests.
    pub concurrency: u32,
    /// Request count or duration.
    pub run_length: RunLength,
    /// Enable streaming responses.
    pub streaming: bool,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: Option<f64>,
    /// Target mean output tokens per response.
    pub output_tokens_mean: Option<u32>,
    /// Artifact directory.
    pub output_dir: PathBuf,
    /// Optional access-header credentials.
    pub access: Option<AccessCredentials>,
    /// Extra arguments appended verbatim.
    pub extra_args: Option<String>,
}

impl Default for AiperfConfig {
    fn default() -> Self {
        Self {
            binary: "aiperf".to_string(),
            model: "Qwen/Qwen3-VL-32B-Thinking".to_string(),
            endpoint_url: "https://inference.hyperbolic.ai".to_string(),
            endpoint_type: "chat".to_string(),
            concurrency: 10,
            run_length: RunLength::Requests(100),
            streaming: true,
            request_timeout_secs: None,
            output_tokens_mean: None,
            output_dir: PathBuf::from("/tmp/aiperf-results"),
            access: None,
            extra_args: None,
        }
    }
}

impl AiperfConfig {
    /// Arguments for `aiperf`, starting with the `profile` subcommand.
    pub fn command_args(&self) -> Result<Vec<String>> {
        let mut args: Vec<String> = vec![
            "profile".into(),
            "--model".into(),
            self.model.clone(),
            "--url".into(),
            self.endpoint_url.clone(),
            "--endpoint-type".into(),
            self.endpoint_type.clone(),
            "--concurrency".into(),
            self.concurrency.to_string(),
            "--output-artifact-dir".into(),
            self.output_dir.display().to_string(),
            // No TUI in containers.
            "--ui-type".into(),
            "none".into(),
            // Unreachable Prometheus endpoints otherwise stall startup.
            "--no-server-metrics".into(),
        ];

        match &self.run_length {
            RunLength::Duration {
                seconds,
                grace_period,
            } => {
                args.extend(["--benchmark-duration".into(), seconds.to_string()]);
                if let Some(grace) = grace_period {
                    args.extend(["--benchmark-grace-period".into(), grace.to_string()]);
                }
            }
            RunLength::Requests(count) => {
                args.extend(["--request-count".into(), count.to_string()]);
            }
        }

        if self.streaming {
            args.push("--streaming".into());
        }
        if let Some(timeout) = self.request_timeout_secs {
            args.extend(["--request-timeout-seconds".into(), timeout.to_string()]);
        }
        if let Some(tokens) = self.output_tokens_mean {
            args.extend(["--output-tokens-mean".into(), tokens.to_string()]);
        }
        if let Some(access) = &self.access {
            args.extend([
                "--header".into(),
                format!("CF-Access-Client-Id: {}", access.client_id),
                "--header".into(),
                format!("CF-Access-Client-Secret: {}", access.client_secret),
            ]);
        }

        args.extend(split_extra_args(self.extra_args.as_deref())?);
        Ok(args)
    }

    /// Full command with the non-interactive environment applied.
    pub fn tool_command(&self) -> Result<ToolCommand> {
        let mut command = ToolCommand::new(&self.binary, self.command_args()?);
        command.output = OutputMode::Capture;
        command.install_hint = "install it with: pip install aiperf";
        command.env = pairs(NON_INTERACTIVE_ENV);
        command.env_defaults = pairs(AIPERF_TIMEOUT_DEFAULTS);
        Ok(command)
    }

    fn log_banner(&self) {
        info!(
            model = %self.model,
            endpoint = %self.endpoint_url,
            endpoint_type = %self.endpoint_type,
            concurrency = self.concurrency,
            streaming = self.streaming,
            output_dir = %self.output_dir.display(),
            "aiperf benchmark"
        );
        match &self.run_length {
            RunLength::Duration {
                seconds,
                grace_period,
            } => info!(duration_secs = seconds, grace_period_secs = ?grace_period, "Run length"),
            RunLength::Requests(count) => info!(request_count = count, "Run length"),
        }
        if let Some(tokens) = self.output_tokens_mean {
            info!(output_tokens_mean = tokens, "Output token target");
        }
        if let Some(access) = &self.access {
            let shown: String = access.client_id.chars().take(20).collect();
            info!(client_id = %format!("{shown}..."), "Cloudflare Access enabled");
        }
    }
}

/// Driver for `aiperf profile`.
pub struct AiperfDriver {
    config: AiperfConfig,
}

impl AiperfDriver {
    /// Create a driver for the given configuration.
    pub fn new(config: AiperfConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BenchmarkDriver for AiperfDriver {
    fn id(&self) -> &str {
        "aiperf"
    }

    async fn run(&self) -> Result<RunOutcome> {
        self.config.log_banner();
        io::ensure_output_dir(&self.config.output_dir)?;

        let command = self.config.tool_command()?;
        let exit = command.run().await?;
        Ok(outcome_from_exit(self.id(), exit, &self.config.output_dir))
    }
}

/// Map a finished aiperf process onto a [`RunOutcome`].
///
/// Artifacts are scanned for whether or not the process succeeded.
pub fn outcome_from_exit(tool: &str, exit: ProcessExit, output_dir: &Path) -> RunOutcome {
    let result_files = io::discover_result_artifacts(output_dir).unwrap_or_else(|e| {
        warn!(dir = %output_dir.display(), error = %e, "Failed to scan output directory");
        Vec::new()
    });

    if exit.success() {
        info!(dir = %output_dir.display(), "Benchmark completed successfully");
    } else {
        error!(code = ?exit.code, "Benchmark failed");
        if !result_files.is_empty() {
            warn!(
                code = ?exit.code,
                files = ?result_files,
                "Result files found despite failure; this may indicate a non-fatal error (e.g. timeout during cleanup)"
            );
        }
        exit.log_preview();
        if exit.mentions_timeout() {
            warn!(
                "If you see timeout errors, try increasing AIPERF_SERVICE_PROFILE_START_TIMEOUT, \
                 AIPERF_SERVICE_PROFILE_CONFIGURE_TIMEOUT, or AIPERF_DATASET_CONFIGURATION_TIMEOUT"
            );
        }
    }

    RunOutcome::from_exit(tool, exit.code, output_dir, result_files)
        .with_output(exit.stdout, exit.stderr)
}

fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
