// Copyright 2025 Inference Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Datadog v1 series submission.

use crate::config::DatadogConfig;
use crate::error::{ReporterError, Result};
use async_trait::async_trait;
use inference_bench_core::{MetricPoint, MetricType};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Destination for metric batches.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Submit one batch; `Ok` only if the backend accepted all of it.
    async fn submit(&self, batch: &[MetricPoint]) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct SeriesPayload<'a> {
    series: Vec<Series<'a>>,
}

#[derive(Debug, Serialize)]
struct Series<'a> {
    metric: &'a str,
    points: [(i64, f64); 1],
    #[serde(rename = "type")]
    metric_type: MetricType,
    tags: &'a [String],
}

/// Request body for `POST /api/v1/series`.
pub fn series_payload(batch: &[MetricPoint]) -> Result<Value> {
    let payload = SeriesPayload {
        series: batch
            .iter()
            .map(|p| Series {
                metric: &p.name,
                points: [(p.timestamp, p.value)],
                metric_type: p.metric_type,
                tags: p.tags.as_slice(),
            })
            .collect(),
    };
    Ok(serde_json::to_value(payload)?)
}

/// Check a 2xx series response body for `"status": "ok"`.
fn check_series_response(body: &str) -> Result<()> {
    let parsed: Value = serde_json::from_str(body)
        .map_err(|_| ReporterError::Rejected(crate::error::excerpt(body)))?;
    match parsed.get("status").and_then(Value::as_str) {
        Some("ok") => Ok(()),
        _ => Err(ReporterError::Rejected(crate::error::excerpt(body))),
    }
}

/// [`MetricsSink`] backed by the Datadog HTTP API.
pub struct DatadogClient {
    client: Client,
    series_url: String,
    api_key: String,
    app_key: Option<String>,
}

impl DatadogClient {
    /// Create a client for the given config.
    pub fn new(config: &DatadogConfig, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            client,
            series_url: config.series_url(),
            api_key: config.api_key.clone(),
            app_key: config.app_key.clone(),
        })
    }
}

#[async_trait]
impl MetricsSink for DatadogClient {
    async fn submit(&self, batch: &[MetricPoint]) -> Result<()> {
        let mut request = self
            .client
            .post(&self.series_url)
            .header("DD-API-KEY", &self.api_key)
            .json(&series_payload(batch)?);
        if let Some(app_key) = &self.app_key {
            request = request.header("DD-APPLICATION-KEY", app_key);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), points = batch.len(), "Series response");

        if !status.is_success() {
            return Err(ReporterError::status(status.as_u16(), &body));
        }
        check_series_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inference_bench_core::Tags;
    use serde_json::json;

    #[test]
    fn test_series_payload_shape() {
        let tags = Tags::new().with("model", "qwen").with("benchmark", "aiperf");
        let point =
            MetricPoint::gauge("inference.benchmark.aiperf.ttft_avg", 12.5, 1700000000, tags)
                .unwrap();

        let payload = series_payload(&[point]).unwrap();
        assert_eq!(
            payload,
            json!({
                "series": [{
                    "metric": "inference.benchmark.aiperf.ttft_avg",
                    "points": [[1700000000, 12.5]],
                    "type": "gauge",
                    "tags": ["model:qwen", "benchmark:aiperf"]
                }]
            })
        );
    }

    #[test]
    fn test_check_series_response() {
        assert!(check_series_response(r#"{"status":"ok"}"#).is_ok());
        assert!(matches!(
            check_series_response(r#"{"status":"error","errors":["bad"]}"#),
            Err(ReporterError::Rejected(_))
        ));
        assert!(matches!(
            check_series_response("<html>"),
            Err(ReporterError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_http_error() {
        let mut config = DatadogConfig::new("key");
        config.metrics_url = Some("http://127.0.0.1:9".into());
        let client = DatadogClient::new(&config, Duration::from_secs(2)).unwrap();
        let point = MetricPoint::gauge("m", 1.0, 0, Tags::new()).unwrap();
        assert!(matches!(
            client.submit(&[point]).await,
            Err(ReporterError::Http(_))
        ));
    }
}
