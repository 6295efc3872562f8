//! Run, extract, report.
//!
//! Each benchmark runs once. Extraction is attempted whenever the run
//! succeeded or left artifacts behind; delivery failures are logged and never
//! change the exit code.

use crate::args::{AiperfArgs, OsworldArgs, ReportArgs};
use chrono::{DateTime, Utc};
use inference_bench_benchmarks::{extract_profile_metrics, io, summarize_results, EvaluationStatus};
use inference_bench_core::{BenchError, MetricMap, RunOutcome, Tags};
use inference_bench_drivers::{AiperfDriver, BenchmarkDriver, DriverError, OsworldDriver};
use inference_bench_reporter::{
    build_points, DatadogClient, DeliveryHandle, DeliveryOutcome, LlmObsClient, MetricReporter,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Metric name prefix for aiperf results.
pub const AIPERF_PREFIX: &str = "inference.benchmark.aiperf";

/// Metric name prefix for OSWorld results.
pub const OSWORLD_PREFIX: &str = "inference.benchmark.osworld";

/// Run aiperf end to end and return the process exit code.
pub async fn run_aiperf(args: AiperfArgs) -> anyhow::Result<i32> {
    let started = Utc::now();
    let driver = AiperfDriver::new(args.to_config());
    let outcome = match driver.run().await {
        Ok(outcome) => outcome,
        Err(e) => return Ok(driver_failure(e)),
    };

    let metrics = if should_extract(&outcome) {
        extract_profile_metrics(&outcome.output_dir)
    } else {
        MetricMap::new()
    };
    publish_summary(&outcome, &metrics)?;

    if metrics.is_empty() {
        warn!("No metrics extracted, skipping Datadog export");
    } else {
        let tags = args.base_tags();
        report(&args.report, &metrics, AIPERF_PREFIX, &tags, Some(started)).await;
    }

    Ok(exit_code(aiperf_verdict(&outcome, &metrics)))
}

/// Run the OSWorld harness end to end and return the process exit code.
pub async fn run_osworld(args: OsworldArgs) -> anyhow::Result<i32> {
    let driver = OsworldDriver::new(args.to_config());
    let outcome = match driver.run().await {
        Ok(outcome) => outcome,
        Err(e) => return Ok(driver_failure(e)),
    };

    let summary = summarize_results(&outcome.output_dir);
    let metrics = summary.to_metrics();
    publish_summary(&outcome, &metrics)?;

    if metrics.is_empty() {
        warn!("No results to report");
    } else {
        report(&args.report, &metrics, OSWORLD_PREFIX, &args.base_tags(), None).await;
    }

    Ok(exit_code(osworld_verdict(&outcome, summary.status())))
}

fn should_extract(outcome: &RunOutcome) -> bool {
    outcome.is_success() || outcome.has_artifacts()
}

fn driver_failure(err: DriverError) -> i32 {
    let err = BenchError::from(err);
    match &err {
        BenchError::ToolNotInstalled { tool, hint } => {
            error!(tool = %tool, "{} not found, {}", tool, hint)
        }
        other => error!(error = %other, "Benchmark could not be run"),
    }
    err.exit_code()
}

/// Write `summary.md` and print the outcome as JSON on stdout.
fn publish_summary(outcome: &RunOutcome, metrics: &MetricMap) -> anyhow::Result<()> {
    match io::write_summary(outcome, metrics) {
        Ok(path) => info!(path = %path.display(), "Wrote run summary"),
        Err(e) => warn!(error = %e, "Failed to write run summary"),
    }
    println!("{}", serde_json::to_string_pretty(outcome)?);
    Ok(())
}

fn tool_failure(outcome: &RunOutcome) -> Option<BenchError> {
    if outcome.is_success() {
        return None;
    }
    Some(match outcome.exit_code {
        Some(code) => BenchError::ToolExited {
            tool: outcome.tool.clone(),
            code,
        },
        None => BenchError::ToolKilled {
            tool: outcome.tool.clone(),
        },
    })
}

/// A failed tool wins over missing metrics.
pub fn aiperf_verdict(outcome: &RunOutcome, metrics: &MetricMap) -> Result<(), BenchError> {
    if let Some(err) = tool_failure(outcome) {
        return Err(err);
    }
    if metrics.is_empty() {
        return Err(BenchError::NoParseableOutput(format!(
            "no metrics extracted from {}",
            outcome.output_dir.display()
        )));
    }
    Ok(())
}

/// A failed tool wins over the evaluation status.
pub fn osworld_verdict(outcome: &RunOutcome, status: EvaluationStatus) -> Result<(), BenchError> {
    if let Some(err) = tool_failure(outcome) {
        return Err(err);
    }
    match status {
        EvaluationStatus::Completed { total, successful } => {
            info!(total, successful, "Evaluation results");
            Ok(())
        }
        EvaluationStatus::AllFailed {
            total,
            parse_errors,
        } => Err(BenchError::EvaluationFailed(format!(
            "all tasks failed ({total} scored, {parse_errors} unparseable)"
        ))),
        EvaluationStatus::PartialOnly(n) => Err(BenchError::EvaluationFailed(format!(
            "no tasks completed, {n} partial trajectories"
        ))),
        EvaluationStatus::NoTasks => Err(BenchError::EvaluationFailed(
            "zero tasks completed and no prior results".to_string(),
        )),
    }
}

fn exit_code(verdict: Result<(), BenchError>) -> i32 {
    match verdict {
        Ok(()) => 0,
        Err(err) => {
            error!(error = %err, "Benchmark failed");
            err.exit_code()
        }
    }
}

/// Deliver metrics (and the LLM Observability span when `llmobs_start` is
/// set and export is enabled), waiting up to the configured timeout.
async fn report(
    args: &ReportArgs,
    metrics: &MetricMap,
    prefix: &str,
    tags: &Tags,
    llmobs_start: Option<DateTime<Utc>>,
) {
    let policy = args.policy();

    let series = match args.datadog_config() {
        None => {
            warn!("DD_API_KEY not set, skipping Datadog export");
            None
        }
        Some(config) => match DatadogClient::new(&config, policy.request_timeout) {
            Ok(client) => {
                let reporter = MetricReporter::new(Arc::new(client), policy.clone());
                let points = build_points(metrics, prefix, tags);
                info!(count = points.len(), prefix, "Sending results to Datadog");
                Some(reporter.dispatch(points))
            }
            Err(e) => {
                warn!(error = %e, "Failed to create Datadog client");
                None
            }
        },
    };

    let spans = match (llmobs_start, args.llmobs_config()) {
        (Some(started), Some(config)) => match LlmObsClient::new(config, &policy) {
            Ok(client) => {
                let metrics = metrics.clone();
                let tags = tags.clone();
                let policy = policy.clone();
                Some(DeliveryHandle::spawn(async move {
                    client.export(&metrics, &tags, started, &policy).await
                }))
            }
            Err(e) => {
                warn!(error = %e, "Skipping LLM Observability export");
                None
            }
        },
        _ => None,
    };

    let timeout = policy.wait_timeout;
    let (series, spans) = tokio::join!(
        wait_for("Datadog metrics", series, timeout),
        wait_for("LLM Observability", spans, timeout)
    );
    debug!(?series, ?spans, "Delivery finished");
}

async fn wait_for(
    what: &str,
    handle: Option<DeliveryHandle>,
    timeout: Duration,
) -> Option<DeliveryOutcome> {
    let outcome = handle?.wait(timeout).await;
    if let DeliveryOutcome::Completed(false) = outcome {
        warn!("{} delivery failed", what);
    }
    Some(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn outcome(code: Option<i32>, files: usize) -> RunOutcome {
        let files = (0..files)
            .map(|i| PathBuf::from(format!("/tmp/out/{i}.json")))
            .collect();
        RunOutcome::from_exit("aiperf", code, "/tmp/out", files)
    }

    fn some_metrics() -> MetricMap {
        let mut metrics = MetricMap::new();
        metrics.insert("request_latency_avg".into(), 10.0);
        metrics
    }

    #[test]
    fn test_aiperf_success_with_metrics() {
        assert!(aiperf_verdict(&outcome(Some(0), 1), &some_metrics()).is_ok());
    }

    #[test]
    fn test_aiperf_no_metrics_is_generic_failure() {
        let err = aiperf_verdict(&outcome(Some(0), 1), &MetricMap::new()).unwrap_err();
        assert!(matches!(err, BenchError::NoParseableOutput(_)));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_degraded_run_keeps_tool_exit_code() {
        let degraded = outcome(Some(2), 1);
        assert!(should_extract(&degraded));
        let err = aiperf_verdict(&degraded, &some_metrics()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_hard_failure_is_not_extracted() {
        let failed = outcome(Some(1), 0);
        assert!(!should_extract(&failed));
        assert_eq!(aiperf_verdict(&failed, &MetricMap::new()).unwrap_err().exit_code(), 1);
    }

    #[test]
    fn test_killed_tool_is_generic_failure() {
        let err = aiperf_verdict(&outcome(None, 0), &MetricMap::new()).unwrap_err();
        assert!(matches!(err, BenchError::ToolKilled { .. }));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_osworld_statuses() {
        let ok = outcome(Some(0), 1);
        assert!(osworld_verdict(
            &ok,
            EvaluationStatus::Completed {
                total: 2,
                successful: 1
            }
        )
        .is_ok());

        for status in [
            EvaluationStatus::AllFailed {
                total: 3,
                parse_errors: 0,
            },
            EvaluationStatus::PartialOnly(4),
            EvaluationStatus::NoTasks,
        ] {
            let err = osworld_verdict(&ok, status).unwrap_err();
            assert!(matches!(err, BenchError::EvaluationFailed(_)));
            assert_eq!(err.exit_code(), 1);
        }
    }

    #[test]
    fn test_osworld_tool_code_propagates() {
        let failed = outcome(Some(137), 2);
        let err = osworld_verdict(
            &failed,
            EvaluationStatus::Completed {
                total: 2,
                successful: 2,
            },
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 137);
    }

    #[test]
    fn test_publish_summary_writes_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = RunOutcome::from_exit("aiperf", Some(0), dir.path(), Vec::new());
        publish_summary(&outcome, &some_metrics()).unwrap();

        let summary = std::fs::read_to_string(dir.path().join(io::SUMMARY_FILE)).unwrap();
        assert!(summary.contains("request_latency_avg"));
    }

    #[test]
    fn test_driver_failure_codes() {
        assert_eq!(
            driver_failure(DriverError::InvalidArgs("unterminated quote".into())),
            1
        );
        assert_eq!(
            driver_failure(DriverError::ToolNotInstalled {
                tool: "aiperf".into(),
                hint: "install it with: pip install aiperf",
            }),
            1
        );
    }
}
