// Copyright 2025 Inference Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Metric types shared between extraction and delivery.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Flat mapping from metric name to value.
///
/// Ordered so that repeated extraction over the same artifacts yields an
/// identical mapping.
pub type MetricMap = BTreeMap<String, f64>;

/// Ordered, append-only set of `key:value` tags.
///
/// Duplicate keys are allowed; no uniqueness is enforced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(Vec<String>);

impl Tags {
    /// Create an empty tag set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a `key:value` tag.
    pub fn push(&mut self, key: &str, value: impl fmt::Display) {
        self.0.push(format!("{key}:{value}"));
    }

    /// Builder-style variant of [`Tags::push`].
    pub fn with(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.push(key, value);
        self
    }

    /// Value of the first tag with the given key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// Iterate over tags split into `(key, value)`.
    ///
    /// Tags without a `:` separator are skipped.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().filter_map(|t| t.split_once(':'))
    }

    /// Raw tag strings.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// Kind of metric point submitted to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    /// Point-in-time measurement.
    Gauge,
}

/// A single timestamped metric measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    /// Dot-namespaced metric name (e.g. `inference.benchmark.aiperf.request_latency_p99`).
    pub name: String,
    /// Measured value; always finite.
    pub value: f64,
    /// Unix timestamp in seconds.
    pub timestamp: i64,
    /// Tags attached to the point.
    pub tags: Tags,
    /// Metric kind.
    pub metric_type: MetricType,
}

impl MetricPoint {
    /// Create a gauge point, rejecting non-finite values.
    pub fn gauge(name: impl Into<String>, value: f64, timestamp: i64, tags: Tags) -> Option<Self> {
        value.is_finite().then(|| Self {
            name: name.into(),
            value,
            timestamp,
            tags,
            metric_type: MetricType::Gauge,
        })
    }
}

/// Points grouped for a single submission call.
pub type MetricBatch = Vec<MetricPoint>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_preserve_order_and_duplicates() {
        let tags = Tags::new()
            .with("model", "qwen")
            .with("benchmark", "aiperf")
            .with("model", "other");
        assert_eq!(
            tags.as_slice(),
            &["model:qwen", "benchmark:aiperf", "model:other"]
        );
        assert_eq!(tags.get("model"), Some("qwen"));
        assert_eq!(tags.get("missing"), None);
    }

    #[test]
    fn test_tag_value_may_contain_colons() {
        let tags = Tags::new().with("endpoint", "https://host:8443/v1");
        assert_eq!(tags.get("endpoint"), Some("https://host:8443/v1"));
    }

    #[test]
    fn test_gauge_rejects_non_finite() {
        assert!(MetricPoint::gauge("a", f64::NAN, 0, Tags::new()).is_none());
        assert!(MetricPoint::gauge("a", f64::INFINITY, 0, Tags::new()).is_none());
        let point = MetricPoint::gauge("a", 1.5, 10, Tags::new()).unwrap();
        assert_eq!(point.metric_type, MetricType::Gauge);
        assert_eq!(point.value, 1.5);
    }
}
