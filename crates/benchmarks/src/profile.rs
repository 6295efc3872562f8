//! aiperf profile export parsing.
//!
//! aiperf has written its aggregate statistics in several shapes across
//! releases. Each known shape is a [`SchemaShape`]; shapes are probed in
//! priority order and every shape whose structural test matches contributes
//! entries to the flat mapping. A field that matches no shape is simply
//! absent from the result.
//!
//! Only unreadable or non-JSON input is an error. Individual values that do
//! not coerce to a finite number are dropped.

use crate::error::{ExtractError, Result};
use crate::io;
use inference_bench_core::MetricMap;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, info, warn};

/// Statistics read from gauge-shaped fields, including the extended
/// percentiles added in later aiperf releases.
pub const GAUGE_STATS: &[&str] = &[
    "avg", "p1", "p5", "p10", "p25", "p50", "p75", "p90", "p95", "p99", "min", "max", "std",
];

/// Statistics read from entries of a nested `metrics` object.
pub const NESTED_STATS: &[&str] = &[
    "mean", "avg", "p1", "p5", "p10", "p25", "p50", "p75", "p90", "p95", "p99", "min", "max",
    "std",
];

/// Metric-bearing top-level fields of exports that predate the `unit` marker.
pub const LEGACY_METRIC_FIELDS: &[&str] = &[
    "request_latency",
    "time_to_first_token",
    "time_to_second_token",
    "inter_token_latency",
    "inter_chunk_latency",
    "request_throughput",
    "output_token_throughput",
    "output_token_throughput_per_user",
    "request_count",
    "good_request_count",
    "error_request_count",
    "output_sequence_length",
    "input_sequence_length",
    "output_token_count",
    "reasoning_token_count",
    "goodput",
    "total_output_tokens",
    "total_reasoning_tokens",
    "benchmark_duration",
    "total_isl",
    "total_osl",
    "error_isl",
    "total_error_isl",
];

/// Flat scalar keys from the oldest export format.
pub const LEGACY_SCALAR_KEYS: &[&str] = &[
    "latency_p50",
    "latency_p95",
    "latency_p99",
    "ttft",
    "ttft_ms",
    "tokens_per_sec",
    "requests_per_sec",
    "throughput_tokens_per_sec",
    "throughput_requests_per_sec",
];

const NESTED_KEY: &str = "metrics";
const UNIT_KEY: &str = "unit";
const STATS_KEY: &str = "stats";

/// Known layouts of an aiperf profile export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaShape {
    /// Top-level fields holding `{ "unit": .., "avg": .., "p99": .. }`.
    Gauge,
    /// `metrics.<name>` entries with either a nested `stats` object or
    /// direct stat fields.
    Nested,
    /// Flat scalars plus `latency` / `throughput` sub-objects.
    Legacy,
}

impl SchemaShape {
    /// Probe order. Later shapes overwrite keys written by earlier ones.
    pub const PRIORITY: [SchemaShape; 3] =
        [SchemaShape::Gauge, SchemaShape::Nested, SchemaShape::Legacy];

    /// Structural shape test.
    pub fn matches(self, data: &Map<String, Value>) -> bool {
        match self {
            Self::Gauge => data.iter().any(|(k, v)| is_gauge_field(k, v)),
            Self::Nested => data.get(NESTED_KEY).is_some_and(Value::is_object),
            Self::Legacy => {
                LEGACY_SCALAR_KEYS.iter().any(|k| data.contains_key(*k))
                    || data.get("latency").is_some_and(Value::is_object)
                    || data.get("throughput").is_some_and(Value::is_object)
            }
        }
    }

    /// Write every coercible value this shape knows about into `out`.
    pub fn extract(self, data: &Map<String, Value>, out: &mut MetricMap) {
        match self {
            Self::Gauge => {
                for (field, value) in data {
                    if !is_gauge_field(field, value) {
                        continue;
                    }
                    if let Some(obj) = value.as_object() {
                        collect_stats(field, obj, GAUGE_STATS, out);
                    }
                }
            }
            Self::Nested => {
                let Some(metrics) = data.get(NESTED_KEY).and_then(Value::as_object) else {
                    return;
                };
                for (name, entry) in metrics {
                    let Some(entry) = entry.as_object() else {
                        continue;
                    };
                    match entry.get(STATS_KEY).and_then(Value::as_object) {
                        Some(stats) => collect_stats(name, stats, NESTED_STATS, out),
                        None => collect_stats(name, entry, NESTED_STATS, out),
                    }
                }
            }
            Self::Legacy => {
                for key in LEGACY_SCALAR_KEYS {
                    insert_coerced(out, key, data.get(*key));
                }
                if let Some(latency) = data.get("latency").and_then(Value::as_object) {
                    for key in ["latency_p50", "latency_p95", "latency_p99"] {
                        insert_coerced(out, key, latency.get(key));
                    }
                }
                if let Some(throughput) = data.get("throughput").and_then(Value::as_object) {
                    insert_coerced(
                        out,
                        "throughput_tokens_per_sec",
                        throughput.get("tokens_per_sec"),
                    );
                    insert_coerced(
                        out,
                        "throughput_requests_per_sec",
                        throughput.get("requests_per_sec"),
                    );
                }
            }
        }
    }
}

/// Coerce a JSON value to a finite `f64`.
///
/// Numbers and numeric strings coerce; null, booleans, containers,
/// unparseable strings and non-finite results do not.
pub fn coerce_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

/// Flatten a parsed export into `metric_field[_stat] -> value`.
pub fn parse_profile(data: &Map<String, Value>) -> MetricMap {
    let mut metrics = MetricMap::new();
    for shape in SchemaShape::PRIORITY {
        if shape.matches(data) {
            debug!(?shape, "Profile export shape matched");
            shape.extract(data, &mut metrics);
        }
    }
    metrics
}

/// Parse a single export file.
pub fn parse_profile_file(path: impl AsRef<Path>) -> Result<MetricMap> {
    let path = path.as_ref();
    let obj = match io::read_json(path)? {
        Value::Object(obj) => obj,
        other => {
            return Err(ExtractError::NotAnObject {
                path: path.to_path_buf(),
                found: json_type_name(&other),
            })
        }
    };

    let metrics = parse_profile(&obj);
    if metrics.is_empty() {
        let keys: Vec<&str> = obj.keys().take(10).map(String::as_str).collect();
        debug!(file = %path.display(), ?keys, "File structure keys");
    }
    Ok(metrics)
}

/// Locate and parse the export in `dir`, surfacing every failure.
pub fn try_extract_profile_metrics(dir: impl AsRef<Path>) -> Result<MetricMap> {
    let path = io::locate_profile_export(dir)?;
    let metrics = parse_profile_file(&path)?;
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if metrics.is_empty() {
        warn!(file = %file, "No metrics extracted");
    } else {
        info!(file = %file, count = metrics.len(), "Parsed metrics");
    }
    Ok(metrics)
}

/// Locate and parse the export in `dir`.
///
/// Failures are logged as warnings and yield an empty mapping.
pub fn extract_profile_metrics(dir: impl AsRef<Path>) -> MetricMap {
    match try_extract_profile_metrics(dir) {
        Ok(metrics) => metrics,
        Err(e) => {
            warn!(error = %e, "Failed to extract profile metrics");
            MetricMap::new()
        }
    }
}

fn is_gauge_field(field: &str, value: &Value) -> bool {
    match value.as_object() {
        Some(obj) if field != NESTED_KEY => {
            obj.contains_key(UNIT_KEY) || LEGACY_METRIC_FIELDS.contains(&field)
        }
        _ => false,
    }
}

fn collect_stats(prefix: &str, obj: &Map<String, Value>, stats: &[&str], out: &mut MetricMap) {
    for stat in stats {
        if let Some(v) = obj.get(*stat).and_then(coerce_f64) {
            out.insert(format!("{prefix}_{stat}"), v);
        }
    }
}

fn insert_coerced(out: &mut MetricMap, key: &str, value: Option<&Value>) {
    if let Some(v) = value.and_then(coerce_f64) {
        out.insert(key.to_string(), v);
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
