// Copyright 2025 Inference Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Delivery configuration.

use std::time::Duration;

/// Default Datadog site.
pub const DEFAULT_SITE: &str = "datadoghq.com";

/// Default local agent address for the EVP proxy.
pub const DEFAULT_AGENT_URL: &str = "http://localhost:8126";

/// Default LLM Observability application name.
pub const DEFAULT_ML_APP: &str = "aiperf-benchmark";

/// Batching, retry, and wait settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryPolicy {
    /// Points per submission call.
    pub batch_size: usize,
    /// Attempts over the whole batch set.
    pub max_attempts: u32,
    /// Wait after the first failed attempt; doubles each time.
    pub base_backoff: Duration,
    /// How long the caller waits for background delivery.
    pub wait_timeout: Duration,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            batch_size: 20,
            max_attempts: 3,
            base_backoff: Duration::from_secs(1),
            wait_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl DeliveryPolicy {
    /// Wait after failed attempt `attempt` (0-based): `base_backoff * 2^attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_backoff.saturating_mul(1u32 << attempt.min(16))
    }
}

/// Datadog metrics API settings.
#[derive(Debug, Clone)]
pub struct DatadogConfig {
    /// `DD-API-KEY`
    pub api_key: String,
    /// `DD-APPLICATION-KEY`, optional.
    pub app_key: Option<String>,
    /// Datadog site, e.g. `datadoghq.eu`.
    pub site: String,
    /// Full API base overriding the site-derived one.
    pub metrics_url: Option<String>,
}

impl DatadogConfig {
    /// Config for the default site.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            app_key: None,
            site: DEFAULT_SITE.to_string(),
            metrics_url: None,
        }
    }

    /// Build from optional parts: `None` when no API key is available.
    pub fn from_parts(
        api_key: Option<String>,
        app_key: Option<String>,
        site: Option<String>,
        metrics_url: Option<String>,
    ) -> Option<Self> {
        let api_key = api_key.filter(|k| !k.is_empty())?;
        Some(Self {
            api_key,
            app_key: app_key.filter(|k| !k.is_empty()),
            site: site
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_SITE.to_string()),
            metrics_url: metrics_url.filter(|u| !u.is_empty()),
        })
    }

    /// API base URL without a trailing slash.
    pub fn api_base(&self) -> String {
        match &self.metrics_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://api.{}", self.site),
        }
    }

    /// v1 series endpoint.
    pub fn series_url(&self) -> String {
        format!("{}/api/v1/series", self.api_base())
    }
}

/// LLM Observability export settings.
#[derive(Debug, Clone)]
pub struct LlmObsConfig {
    /// `ml_app` attached to every span.
    pub ml_app: String,
    /// Submit straight to the intake instead of through the local agent.
    pub agentless: bool,
    /// Required in agentless mode.
    pub api_key: Option<String>,
    /// Datadog site.
    pub site: String,
    /// Local agent base URL.
    pub agent_url: String,
}

impl Default for LlmObsConfig {
    fn default() -> Self {
        Self {
            ml_app: DEFAULT_ML_APP.to_string(),
            agentless: false,
            api_key: None,
            site: DEFAULT_SITE.to_string(),
            agent_url: DEFAULT_AGENT_URL.to_string(),
        }
    }
}

impl LlmObsConfig {
    /// Span intake endpoint for the configured mode.
    pub fn intake_url(&self) -> String {
        if self.agentless {
            format!("https://llmobs-intake.{}/api/v2/llmobs", self.site)
        } else {
            format!(
                "{}/evp_proxy/v2/api/v2/llmobs",
                self.agent_url.trim_end_matches('/')
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let policy = DeliveryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_secs(1));
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
    }

    #[test]
    fn test_series_url() {
        let mut config = DatadogConfig::new("key");
        assert_eq!(
            config.series_url(),
            "https://api.datadoghq.com/api/v1/series"
        );

        config.site = "datadoghq.eu".into();
        assert_eq!(config.series_url(), "https://api.datadoghq.eu/api/v1/series");

        config.metrics_url = Some("http://localhost:9000/".into());
        assert_eq!(config.series_url(), "http://localhost:9000/api/v1/series");
    }

    #[test]
    fn test_from_parts_requires_api_key() {
        assert!(DatadogConfig::from_parts(None, None, None, None).is_none());
        assert!(DatadogConfig::from_parts(Some(String::new()), None, None, None).is_none());

        let config =
            DatadogConfig::from_parts(Some("k".into()), Some(String::new()), None, None).unwrap();
        assert_eq!(config.site, DEFAULT_SITE);
        assert!(config.app_key.is_none());
    }

    #[test]
    fn test_llmobs_intake_url() {
        let mut config = LlmObsConfig::default();
        assert_eq!(
            config.intake_url(),
            "http://localhost:8126/evp_proxy/v2/api/v2/llmobs"
        );
        config.agentless = true;
        assert_eq!(
            config.intake_url(),
            "https://llmobs-intake.datadoghq.com/api/v2/llmobs"
        );
    }
}
