//! CLI for inference-bench.
//!
//! Each subcommand runs one external benchmark tool, extracts its results,
//! and forwards them to Datadog. Every option can also be set through the
//! environment variable named in `--help`; a `.env` file in the working
//! directory is loaded first.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod args;
pub mod logging;
pub mod pipeline;

use args::{AiperfArgs, LogFormat, OsworldArgs};
use clap::{Parser, Subcommand};
use inference_bench_core::BenchError;
use std::future::Future;
use tracing::{debug, warn};

/// inference-bench CLI.
#[derive(Parser, Debug)]
#[command(name = "inference-bench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log output format.
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormat,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load-test an inference endpoint with `aiperf profile`.
    ///
    /// Results are read from the artifact directory and sent as
    /// `inference.benchmark.aiperf.*` gauges.
    Aiperf(AiperfArgs),

    /// Run the OSWorld evaluation harness.
    ///
    /// Per-task scores are aggregated overall and per domain and sent as
    /// `inference.benchmark.osworld.*` gauges.
    Osworld(OsworldArgs),
}

/// Run the CLI and return the process exit code.
pub async fn run() -> anyhow::Result<i32> {
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();
    logging::init(cli.log_format);

    if let Ok(path) = dotenv {
        debug!(path = %path.display(), "Loaded environment file");
    }

    let pipeline = async move {
        match cli.command {
            Commands::Aiperf(args) => pipeline::run_aiperf(args).await,
            Commands::Osworld(args) => pipeline::run_osworld(args).await,
        }
    };
    until_interrupted(pipeline, ctrl_c()).await
}

/// Drive `pipeline` to completion unless `interrupt` resolves first.
///
/// On interrupt the pipeline is dropped, which kills a running tool process,
/// and the interrupt exit code is returned.
pub async fn until_interrupted<P, I>(pipeline: P, interrupt: I) -> anyhow::Result<i32>
where
    P: Future<Output = anyhow::Result<i32>>,
    I: Future<Output = ()>,
{
    tokio::select! {
        code = pipeline => code,
        () = interrupt => {
            warn!("Interrupted by user");
            Ok(BenchError::Interrupted.exit_code())
        }
    }
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        debug!(error = %e, "Interrupt handler unavailable");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use inference_bench_drivers::{RunLength, ToolCommand};
    use std::time::{Duration, Instant};

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_aiperf_flags_build_config() {
        let cli = Cli::try_parse_from([
            "inference-bench",
            "aiperf",
            "--model",
            "m",
            "--endpoint-url",
            "http://localhost:8000",
            "--benchmark-duration",
            "120",
            "--streaming",
            "false",
            "--cf-access-client-id",
            "id",
            "--cf-access-client-secret",
            "secret",
            "--cluster-name",
            "test-cluster",
        ])
        .unwrap();

        let Commands::Aiperf(args) = cli.command else {
            panic!("expected aiperf subcommand");
        };
        let config = args.to_config();
        assert_eq!(config.model, "m");
        assert!(!config.streaming);
        assert!(matches!(
            config.run_length,
            RunLength::Duration { seconds, .. } if seconds == 120.0
        ));
        assert!(config.access.is_some());

        let tags = args.base_tags();
        assert_eq!(tags.get("endpoint"), Some("http://localhost:8000"));
        assert_eq!(tags.get("benchmark"), Some("aiperf"));
        assert_eq!(tags.get("cluster_name"), Some("test-cluster"));
    }

    #[test]
    fn test_osworld_flags_build_config() {
        let cli = Cli::try_parse_from([
            "inference-bench",
            "osworld",
            "--domain",
            "chrome",
            "--api-backend",
            "openai",
            "--additional-args",
            "--sleep_after_execution 3",
            "--batch-size",
            "0",
        ])
        .unwrap();

        let Commands::Osworld(args) = cli.command else {
            panic!("expected osworld subcommand");
        };
        let config = args.to_config();
        assert_eq!(config.api_backend.as_deref(), Some("openai"));
        assert_eq!(
            config.extra_args.as_deref(),
            Some("--sleep_after_execution 3")
        );
        assert_eq!(args.base_tags().get("domain"), Some("chrome"));
        assert_eq!(args.report.policy().batch_size, 1);
    }

    #[test]
    fn test_llmobs_disabled_without_flag() {
        let cli = Cli::try_parse_from([
            "inference-bench",
            "aiperf",
            "--llmobs-enabled",
            "false",
        ])
        .unwrap();
        let Commands::Aiperf(args) = cli.command else {
            panic!("expected aiperf subcommand");
        };
        assert!(args.report.llmobs_config().is_none());
    }

    #[tokio::test]
    async fn test_interrupt_exits_130() {
        let pipeline = std::future::pending::<anyhow::Result<i32>>();
        let code = until_interrupted(pipeline, async {}).await.unwrap();
        assert_eq!(code, 130);
    }

    #[tokio::test]
    async fn test_pipeline_code_without_interrupt() {
        let pipeline = async { Ok::<_, anyhow::Error>(2) };
        let code = until_interrupted(pipeline, std::future::pending::<()>())
            .await
            .unwrap();
        assert_eq!(code, 2);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_interrupt_during_tool_run_stops_it() {
        let tool = ToolCommand::new("sh", vec!["-c".into(), "sleep 30".into()]);
        let pipeline = async {
            let exit = tool.run().await?;
            Ok::<_, anyhow::Error>(exit.code.unwrap_or(1))
        };
        let interrupt = tokio::time::sleep(Duration::from_millis(100));

        let started = Instant::now();
        let code = until_interrupted(pipeline, interrupt).await.unwrap();
        assert_eq!(code, 130);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
