// Copyright 2025 Inference Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! LLM Observability export.
//!
//! A benchmark run is recorded as a single `workflow` span. Metrics with a
//! standard LLM Observability name are set on the span; the rest travel in
//! the span output as custom benchmark metrics.

use crate::config::{DeliveryPolicy, LlmObsConfig};
use crate::delivery::with_retries;
use crate::error::{ReporterError, Result};
use chrono::{DateTime, Utc};
use inference_bench_core::{MetricMap, Tags};
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{debug, info};
use uuid::Uuid;

/// Span name for a benchmark run.
pub const SPAN_NAME: &str = "llm.benchmark";

/// Extracted metric name to standard LLM Observability metric name.
pub const STANDARD_METRICS: &[(&str, &str)] = &[
    ("request_latency_avg", "ml_obs.span.duration"),
    ("input_sequence_length_avg", "ml_obs.span.llm.input.tokens"),
    ("output_sequence_length_avg", "ml_obs.span.llm.output.tokens"),
    ("output_token_count_avg", "ml_obs.span.llm.output.tokens"),
    ("total_output_tokens_avg", "ml_obs.span.llm.total.tokens"),
    ("reasoning_token_count_avg", "ml_obs.span.llm.output.reasoning.tokens"),
    ("error_request_count_avg", "ml_obs.span.error"),
];

/// Standard name for `metric`, if it has one.
pub fn standard_metric_name(metric: &str) -> Option<&'static str> {
    STANDARD_METRICS
        .iter()
        .find(|(name, _)| *name == metric)
        .map(|(_, standard)| *standard)
}

/// Unit conversion applied before a metric is set under its standard name.
fn conversion_factor(metric: &str) -> f64 {
    match metric {
        // ms -> s
        "request_latency_avg" => 0.001,
        _ => 1.0,
    }
}

/// Metrics split into standard (averaged) and custom sets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpanMetrics {
    /// Standard name to value; several sources for one name are averaged.
    pub standard: BTreeMap<String, f64>,
    /// Everything without a standard name, unchanged.
    pub custom: MetricMap,
}

impl SpanMetrics {
    /// Partition `metrics`.
    pub fn from_metrics(metrics: &MetricMap) -> Self {
        let mut grouped: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        let mut custom = MetricMap::new();

        for (name, value) in metrics {
            if !value.is_finite() {
                continue;
            }
            match standard_metric_name(name) {
                Some(standard) => grouped
                    .entry(standard)
                    .or_default()
                    .push(value * conversion_factor(name)),
                None => {
                    custom.insert(name.clone(), *value);
                }
            }
        }

        let standard = grouped
            .into_iter()
            .map(|(name, values)| {
                let avg = values.iter().sum::<f64>() / values.len() as f64;
                (name.to_string(), avg)
            })
            .collect();

        Self { standard, custom }
    }
}

/// Span tags: fixed benchmark tags plus every base tag, with `model` renamed
/// to `model_name` and `cluster_name` to `env`. Later keys overwrite earlier.
pub fn span_tags(ml_app: &str, base_tags: &Tags) -> Vec<String> {
    let mut tags: BTreeMap<String, String> = BTreeMap::new();
    let mut set = |k: &str, v: &str| {
        tags.insert(k.to_string(), v.to_string());
    };

    set("ml_app", ml_app);
    set("span_kind", "workflow");
    set("model_name", base_tags.get("model").unwrap_or("unknown"));
    set("model_provider", "custom");
    set("benchmark.type", "aiperf");
    set("endpoint.url", base_tags.get("endpoint").unwrap_or("unknown"));

    for (key, value) in base_tags.pairs() {
        match key {
            "model" => set("model_name", value),
            "cluster_name" => set("env", value),
            other => set(other, value),
        }
    }

    tags.into_iter().map(|(k, v)| format!("{k}:{v}")).collect()
}

/// Build the intake payload for one benchmark span.
pub fn span_payload(
    ml_app: &str,
    metrics: &MetricMap,
    base_tags: &Tags,
    start: DateTime<Utc>,
    duration_ns: i64,
) -> Value {
    let split = SpanMetrics::from_metrics(metrics);
    let model = base_tags.get("model");
    let endpoint = base_tags.get("endpoint");

    let input = json!({
        "benchmark_type": "aiperf",
        "model": model,
        "endpoint": endpoint,
    });
    let output = json!({
        "benchmark_metrics": split.custom,
        "standard_metrics": split.standard,
        "metric_count": metrics.len(),
    });

    let span = json!({
        "trace_id": random_id(),
        "span_id": random_id(),
        "parent_id": "undefined",
        "name": SPAN_NAME,
        "start_ns": start.timestamp_nanos_opt().unwrap_or_default(),
        "duration": duration_ns,
        "status": "ok",
        "ml_app": ml_app,
        "tags": span_tags(ml_app, base_tags),
        "meta": {
            "span.kind": "workflow",
            "input": { "value": input.to_string() },
            "output": { "value": output.to_string() },
        },
        "metrics": split.standard,
    });

    json!({
        "_dd.stage": "raw",
        "event_type": "span",
        "spans": [span],
    })
}

fn random_id() -> String {
    Uuid::new_v4().as_u64_pair().0.to_string()
}

/// Submits benchmark spans to the LLM Observability intake.
pub struct LlmObsClient {
    client: Client,
    config: LlmObsConfig,
    url: String,
}

impl LlmObsClient {
    /// Create a client; agentless mode requires an API key.
    pub fn new(config: LlmObsConfig, policy: &DeliveryPolicy) -> Result<Self> {
        if config.agentless && config.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(ReporterError::MissingApiKey("DD_API_KEY"));
        }
        let client = Client::builder().timeout(policy.request_timeout).build()?;
        let url = config.intake_url();
        Ok(Self {
            client,
            config,
            url,
        })
    }

    async fn submit(&self, payload: &Value) -> Result<()> {
        let mut request = self.client.post(&self.url).json(payload);
        if self.config.agentless {
            if let Some(key) = &self.config.api_key {
                request = request.header("DD-API-KEY", key);
            }
        } else {
            request = request.header("X-Datadog-EVP-Subdomain", "llmobs-intake");
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReporterError::status(status.as_u16(), &body));
        }
        debug!(status = status.as_u16(), "LLM Observability span accepted");
        Ok(())
    }

    /// Export `metrics` as one span, retrying per `policy`.
    pub async fn export(
        &self,
        metrics: &MetricMap,
        base_tags: &Tags,
        started: DateTime<Utc>,
        policy: &DeliveryPolicy,
    ) -> bool {
        let duration_ns = (Utc::now() - started).num_nanoseconds().unwrap_or_default();
        let payload = span_payload(&self.config.ml_app, metrics, base_tags, started, duration_ns);
        let split = SpanMetrics::from_metrics(metrics);

        let sent = with_retries(policy, "LLM Observability export", || self.submit(&payload)).await;
        if sent {
            info!(
                metrics = metrics.len(),
                standard = split.standard.len(),
                custom = split.custom.len(),
                "Sent benchmark metrics to Datadog LLM Observability"
            );
        }
        sent
    }
}
