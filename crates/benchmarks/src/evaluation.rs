//! Evaluation-harness score aggregation.
//!
//! Every task writes a single scalar score to its own `result.txt`. Scores
//! are aggregated overall and per task domain. A score above zero counts as
//! a success; negative scores are error sentinels and contribute zero to
//! the average. Leftover score files from an earlier run count as completed
//! work, so re-running over the same result directory resumes instead of
//! starting over.

use crate::domain::infer_domain;
use crate::io::{find_files_named, SCORE_FILE, TRACE_FILE};
use inference_bench_core::MetricMap;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Aggregates over a set of task scores.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreStats {
    /// Tasks with a parseable score.
    pub total: u64,
    /// Tasks with score > 0.
    pub successful: u64,
    /// Score files that were empty, unreadable, or not a number.
    pub parse_errors: u64,
    /// Sum of all parsed scores, negatives counted as zero.
    pub score_sum: f64,
}

impl ScoreStats {
    fn record(&mut self, score: f64) {
        self.total += 1;
        self.score_sum += score.max(0.0);
        if score > 0.0 {
            self.successful += 1;
        }
    }

    /// Tasks with a parseable score that did not succeed.
    pub fn failed(&self) -> u64 {
        self.total - self.successful
    }

    /// `successful / total * 100`, or `None` with no parsed tasks.
    pub fn success_rate(&self) -> Option<f64> {
        (self.total > 0).then(|| self.successful as f64 / self.total as f64 * 100.0)
    }

    /// Mean score, or `None` with no parsed tasks.
    pub fn average_score(&self) -> Option<f64> {
        (self.total > 0).then(|| self.score_sum / self.total as f64)
    }

    fn write_metrics(&self, prefix: &str, out: &mut MetricMap) {
        let key = |name: &str| format!("{prefix}{name}");
        if let (Some(rate), Some(avg)) = (self.success_rate(), self.average_score()) {
            out.insert(key("success_rate"), rate);
            out.insert(key("average_score"), avg);
            out.insert(key("total_tasks"), self.total as f64);
            out.insert(key("successful_tasks"), self.successful as f64);
            out.insert(key("failed_tasks"), self.failed() as f64);
        }
        if self.parse_errors > 0 {
            out.insert(key("parse_errors"), self.parse_errors as f64);
        }
    }
}

/// How an evaluation run ended, judged from the files on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationStatus {
    /// At least one task succeeded.
    Completed {
        /// Tasks with a parseable score
        total: u64,
        /// Tasks with score > 0
        successful: u64,
    },
    /// Score files exist but no task succeeded (or none parsed).
    AllFailed {
        /// Tasks with a parseable score
        total: u64,
        /// Unparseable score files
        parse_errors: u64,
    },
    /// No score files, but trajectories show the harness made progress.
    PartialOnly(usize),
    /// Nothing at all: no tasks completed and no partial results.
    NoTasks,
}

impl EvaluationStatus {
    /// Whether this status counts as a passing run.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Score aggregates for a result directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationSummary {
    /// Aggregates over every task.
    pub overall: ScoreStats,
    /// Aggregates per inferred domain.
    pub domains: BTreeMap<String, ScoreStats>,
    /// Number of score files discovered.
    pub score_files: usize,
    /// Trajectory files counted when no score files exist.
    pub partial_results: usize,
}

impl EvaluationSummary {
    /// Classify the run.
    pub fn status(&self) -> EvaluationStatus {
        if self.score_files == 0 {
            return match self.partial_results {
                0 => EvaluationStatus::NoTasks,
                n => EvaluationStatus::PartialOnly(n),
            };
        }
        if self.overall.successful == 0 {
            return EvaluationStatus::AllFailed {
                total: self.overall.total,
                parse_errors: self.overall.parse_errors,
            };
        }
        EvaluationStatus::Completed {
            total: self.overall.total,
            successful: self.overall.successful,
        }
    }

    /// Flatten into a metric mapping.
    ///
    /// Per-domain aggregates are keyed `domain.<label>.<aggregate>`.
    pub fn to_metrics(&self) -> MetricMap {
        let mut metrics = MetricMap::new();
        if self.score_files == 0 {
            if self.partial_results > 0 {
                metrics.insert("partial_results".to_string(), self.partial_results as f64);
            }
            return metrics;
        }

        self.overall.write_metrics("", &mut metrics);
        for (domain, stats) in &self.domains {
            stats.write_metrics(&format!("domain.{domain}."), &mut metrics);
        }
        metrics
    }
}

/// Parse the content of a score file.
pub fn parse_score(content: &str) -> Option<f64> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|s| s.is_finite())
}

/// Walk `result_dir` and aggregate every score file found.
pub fn summarize_results(result_dir: impl AsRef<Path>) -> EvaluationSummary {
    let root = result_dir.as_ref();
    let score_files = find_files_named(root, SCORE_FILE);
    let mut summary = EvaluationSummary {
        score_files: score_files.len(),
        ..Default::default()
    };

    if score_files.is_empty() {
        warn!(dir = %root.display(), "No {} files found", SCORE_FILE);
        summary.partial_results = find_files_named(root, TRACE_FILE).len();
        if summary.partial_results > 0 {
            info!(
                count = summary.partial_results,
                "Found trajectory files (partial results)"
            );
        }
        return summary;
    }

    for path in &score_files {
        let domain = infer_domain(root, path);
        let score = match fs::read_to_string(path) {
            Ok(content) => {
                let parsed = parse_score(&content);
                if parsed.is_none() {
                    warn!(file = %path.display(), "Empty or invalid score");
                }
                parsed
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Failed to read score file");
                None
            }
        };

        let domain_stats = summary.domains.entry(domain).or_default();
        match score {
            Some(score) => {
                summary.overall.record(score);
                domain_stats.record(score);
            }
            None => {
                summary.overall.parse_errors += 1;
                domain_stats.parse_errors += 1;
            }
        }
    }

    summary
}

/// Aggregate `result_dir` straight into a metric mapping.
pub fn extract_evaluation_metrics(result_dir: impl AsRef<Path>) -> MetricMap {
    summarize_results(result_dir).to_metrics()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_score(root: &Path, domain: &str, task: &str, content: &str) {
        let dir = root.join("pyautogui/screenshot/qwen").join(domain).join(task);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(SCORE_FILE), content).unwrap();
    }

    #[test]
    fn test_aggregates_scores() {
        let dir = TempDir::new().unwrap();
        write_score(dir.path(), "chrome", "t1", "-1");
        write_score(dir.path(), "chrome", "t2", "0");
        write_score(dir.path(), "gimp", "t3", "0.5\n");
        write_score(dir.path(), "gimp", "t4", "1");

        let metrics = extract_evaluation_metrics(dir.path());
        assert_eq!(metrics["success_rate"], 50.0);
        assert_eq!(metrics["average_score"], 0.375);
        assert_eq!(metrics["total_tasks"], 4.0);
        assert_eq!(metrics["successful_tasks"], 2.0);
        assert_eq!(metrics["failed_tasks"], 2.0);
        assert!(!metrics.contains_key("parse_errors"));
    }

    #[test]
    fn test_per_domain_buckets() {
        let dir = TempDir::new().unwrap();
        write_score(dir.path(), "chrome", "t1", "-1");
        write_score(dir.path(), "chrome", "t2", "0");
        write_score(dir.path(), "gimp", "t3", "0.5");
        write_score(dir.path(), "gimp", "t4", "1");

        let metrics = extract_evaluation_metrics(dir.path());
        assert_eq!(metrics["domain.chrome.success_rate"], 0.0);
        assert_eq!(metrics["domain.chrome.total_tasks"], 2.0);
        assert_eq!(metrics["domain.gimp.success_rate"], 100.0);
        assert_eq!(metrics["domain.gimp.average_score"], 0.75);
    }

    #[test]
    fn test_unparseable_scores_are_counted() {
        let dir = TempDir::new().unwrap();
        write_score(dir.path(), "os", "t1", "1");
        write_score(dir.path(), "os", "t2", "");
        write_score(dir.path(), "os", "t3", "not-a-number");

        let summary = summarize_results(dir.path());
        assert_eq!(summary.overall.total, 1);
        assert_eq!(summary.overall.parse_errors, 2);

        let metrics = summary.to_metrics();
        assert_eq!(metrics["parse_errors"], 2.0);
        assert_eq!(metrics["domain.os.parse_errors"], 2.0);
        assert_eq!(metrics["success_rate"], 100.0);
    }

    #[test]
    fn test_empty_directory_is_no_tasks() {
        let dir = TempDir::new().unwrap();
        let summary = summarize_results(dir.path());
        assert!(summary.to_metrics().is_empty());
        assert_eq!(summary.status(), EvaluationStatus::NoTasks);
        assert!(!summary.status().is_success());
    }

    #[test]
    fn test_partial_results_from_trajectories() {
        let dir = TempDir::new().unwrap();
        for task in ["t1", "t2"] {
            let task_dir = dir.path().join("chrome").join(task);
            fs::create_dir_all(&task_dir).unwrap();
            fs::write(task_dir.join(TRACE_FILE), "{}\n").unwrap();
        }

        let summary = summarize_results(dir.path());
        let metrics = summary.to_metrics();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics["partial_results"], 2.0);
        assert_eq!(summary.status(), EvaluationStatus::PartialOnly(2));
    }

    #[test]
    fn test_all_failed_status() {
        let dir = TempDir::new().unwrap();
        write_score(dir.path(), "vlc", "t1", "0");
        write_score(dir.path(), "vlc", "t2", "garbage");

        let status = summarize_results(dir.path()).status();
        assert_eq!(
            status,
            EvaluationStatus::AllFailed {
                total: 1,
                parse_errors: 1
            }
        );
        assert!(!status.is_success());
    }

    #[test]
    fn test_completed_status() {
        let dir = TempDir::new().unwrap();
        write_score(dir.path(), "vlc", "t1", "1");
        let status = summarize_results(dir.path()).status();
        assert!(status.is_success());
    }

    #[test]
    fn test_repeated_extraction_is_identical() {
        let dir = TempDir::new().unwrap();
        write_score(dir.path(), "chrome", "t1", "1");
        write_score(dir.path(), "custom", "t2", "0.25");
        assert_eq!(
            extract_evaluation_metrics(dir.path()),
            extract_evaluation_metrics(dir.path())
        );
    }

    #[test]
    fn test_parse_score() {
        assert_eq!(parse_score(" 1.0\n"), Some(1.0));
        assert_eq!(parse_score("-1"), Some(-1.0));
        assert_eq!(parse_score(""), None);
        assert_eq!(parse_score("   "), None);
        assert_eq!(parse_score("inf"), None);
        assert_eq!(parse_score("abc"), None);
    }
}
