//! Markdown output generation for benchmark runs.
//!
//! This module renders a run outcome and its extracted metrics into the
//! `summary.md` written next to the tool's artifacts.

use inference_bench_core::{MetricMap, RunOutcome, RunStatus};
use std::fmt::Write;

/// Generate a markdown summary from a run outcome and its metrics.
pub fn generate_summary(outcome: &RunOutcome, metrics: &MetricMap) -> String {
    let mut output = String::new();

    let status = match outcome.status {
        RunStatus::Success => "success",
        RunStatus::Error if outcome.is_degraded() => "error (degraded, artifacts present)",
        RunStatus::Error => "error",
    };
    let exit_code = outcome
        .exit_code
        .map(|c| c.to_string())
        .unwrap_or_else(|| "signal".to_string());

    writeln!(output, "# {} Benchmark Summary", outcome.tool).unwrap();
    writeln!(output).unwrap();
    writeln!(output, "Generated: {}", outcome.timestamp.to_rfc3339()).unwrap();
    writeln!(output).unwrap();
    writeln!(output, "- **Status:** {status}").unwrap();
    writeln!(output, "- **Exit code:** {exit_code}").unwrap();
    writeln!(output, "- **Output directory:** {}", outcome.output_dir.display()).unwrap();
    writeln!(output, "- **Result files:** {}", outcome.result_files.len()).unwrap();
    writeln!(output).unwrap();
    writeln!(output, "## Metrics").unwrap();
    writeln!(output).unwrap();

    if metrics.is_empty() {
        writeln!(output, "_No metrics extracted._").unwrap();
    } else {
        writeln!(output, "| Metric | Value |").unwrap();
        writeln!(output, "|--------|-------|").unwrap();
        for (name, value) in metrics {
            writeln!(output, "| {name} | {value:.4} |").unwrap();
        }
    }

    writeln!(output).unwrap();
    writeln!(output, "---").unwrap();
    writeln!(output, "Total metrics: {}", metrics.len()).unwrap();

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_summary_lists_metrics_in_order() {
        let outcome = RunOutcome::from_exit("aiperf", Some(0), "/tmp/out", vec![]);
        let mut metrics = MetricMap::new();
        metrics.insert("b_metric".into(), 2.0);
        metrics.insert("a_metric".into(), 1.0);

        let md = generate_summary(&outcome, &metrics);
        let a = md.find("a_metric").unwrap();
        let b = md.find("b_metric").unwrap();
        assert!(a < b);
        assert!(md.contains("**Status:** success"));
        assert!(md.contains("Total metrics: 2"));
    }

    #[test]
    fn test_summary_marks_degraded_runs() {
        let outcome = RunOutcome::from_exit(
            "aiperf",
            Some(1),
            "/tmp/out",
            vec![PathBuf::from("/tmp/out/profile_export_aiperf.json")],
        );
        let md = generate_summary(&outcome, &MetricMap::new());
        assert!(md.contains("degraded"));
        assert!(md.contains("_No metrics extracted._"));
    }
}
