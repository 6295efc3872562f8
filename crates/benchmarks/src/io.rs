//! I/O operations for benchmark artifacts.
//!
//! This module locates the files external tools leave behind and writes the
//! run summary next to them.

use crate::error::{ExtractError, Result};
use crate::markdown;
use inference_bench_core::{MetricMap, RunOutcome};
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Canonical aggregated-statistics file written by aiperf.
pub const CANONICAL_RESULT_FILE: &str = "profile_export_aiperf.json";

/// Per-task score file written by the evaluation harness.
pub const SCORE_FILE: &str = "result.txt";

/// Per-task trajectory file; only its presence is used.
pub const TRACE_FILE: &str = "traj.jsonl";

/// Summary file name, relative to the output directory.
pub const SUMMARY_FILE: &str = "summary.md";

/// Ensure the output directory exists (recursive, idempotent).
pub fn ensure_output_dir(dir: impl AsRef<Path>) -> io::Result<()> {
    fs::create_dir_all(dir)
}

/// List JSON-ish result artifacts (`*.json`, `*.jsonl`, ...) at the top level
/// of `dir`, sorted by path.
///
/// A missing directory yields an empty list.
pub fn discover_result_artifacts(dir: impl AsRef<Path>) -> io::Result<Vec<PathBuf>> {
    list_files(dir.as_ref(), |name| name.contains(".json"))
}

/// Pick the artifact to parse: the canonical file if present, otherwise the
/// single `*.json` file in `dir`.
pub fn locate_profile_export(dir: impl AsRef<Path>) -> Result<PathBuf> {
    let dir = dir.as_ref();
    let canonical = dir.join(CANONICAL_RESULT_FILE);
    if canonical.is_file() {
        return Ok(canonical);
    }

    let mut candidates = list_files(dir, |name| name.ends_with(".json")).map_err(|source| {
        ExtractError::Unreadable {
            path: dir.to_path_buf(),
            source,
        }
    })?;

    match candidates.len() {
        0 => Err(ExtractError::NoArtifact(dir.to_path_buf())),
        1 => Ok(candidates.remove(0)),
        count => Err(ExtractError::Ambiguous {
            dir: dir.to_path_buf(),
            count,
        }),
    }
}

/// Read and parse a JSON artifact.
pub fn read_json(path: impl AsRef<Path>) -> Result<Value> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ExtractError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ExtractError::InvalidJson {
        path: path.to_path_buf(),
        source,
    })
}

/// Recursively find every file named `file_name` under `root`, sorted.
///
/// Unreadable entries are skipped.
pub fn find_files_named(root: impl AsRef<Path>, file_name: &str) -> Vec<PathBuf> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Vec::new();
    }
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == file_name)
        .map(|entry| entry.into_path())
        .collect()
}

/// Write the markdown run summary into the outcome's output directory.
pub fn write_summary(outcome: &RunOutcome, metrics: &MetricMap) -> io::Result<PathBuf> {
    ensure_output_dir(&outcome.output_dir)?;
    let path = outcome.output_dir.join(SUMMARY_FILE);
    fs::write(&path, markdown::generate_summary(outcome, metrics))?;
    Ok(path)
}

fn list_files(dir: &Path, keep: impl Fn(&str) -> bool) -> io::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if entry.file_name().to_str().is_some_and(&keep) {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}
