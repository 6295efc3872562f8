//! Command-line and environment configuration.

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args, ValueEnum};
use inference_bench_core::Tags;
use inference_bench_drivers::{AccessCredentials, AiperfConfig, OsworldConfig, RunLength};
use inference_bench_reporter::config::{DEFAULT_AGENT_URL, DEFAULT_ML_APP, DEFAULT_SITE};
use inference_bench_reporter::{DatadogConfig, DeliveryPolicy, LlmObsConfig};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_MODEL: &str = "Qwen/Qwen3-VL-32B-Thinking";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Metric delivery settings shared by both benchmarks.
#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    /// Datadog API key; delivery is skipped without it.
    #[arg(long, env = "DD_API_KEY", hide_env_values = true)]
    pub dd_api_key: Option<String>,

    /// Datadog application key.
    #[arg(long, env = "DD_APP_KEY", hide_env_values = true)]
    pub dd_app_key: Option<String>,

    /// Datadog site.
    #[arg(long, env = "DD_SITE", default_value = DEFAULT_SITE)]
    pub dd_site: String,

    /// Override for the metrics API base URL.
    #[arg(long, env = "DD_METRICS_URL")]
    pub dd_metrics_url: Option<String>,

    /// Value of the `cluster_name` tag.
    #[arg(long, env = "CLUSTER_NAME", default_value = "inference-cluster")]
    pub cluster_name: String,

    /// Points per submission.
    #[arg(long, env = "DD_METRIC_BATCH_SIZE", default_value_t = 20)]
    pub batch_size: usize,

    /// Delivery attempts.
    #[arg(long, env = "DD_MAX_RETRIES", default_value_t = 3)]
    pub max_retries: u32,

    /// Seconds to wait for delivery before exiting.
    #[arg(long, env = "DD_SEND_TIMEOUT_SECS", default_value_t = 30)]
    pub send_timeout_secs: u64,

    /// Also export an LLM Observability span (aiperf only).
    #[arg(
        long,
        env = "DD_LLMOBS_ENABLED",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        default_value_t = false
    )]
    pub llmobs_enabled: bool,

    /// Send spans straight to the intake instead of the local agent.
    #[arg(
        long,
        env = "DD_LLMOBS_AGENTLESS_ENABLED",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        default_value_t = false
    )]
    pub llmobs_agentless: bool,

    /// LLM Observability application name.
    #[arg(long, env = "DD_LLMOBS_ML_APP", default_value = DEFAULT_ML_APP)]
    pub llmobs_ml_app: String,

    /// Local Datadog agent URL.
    #[arg(long, env = "DD_TRACE_AGENT_URL", default_value = DEFAULT_AGENT_URL)]
    pub trace_agent_url: String,
}

impl ReportArgs {
    /// Batching and retry settings.
    pub fn policy(&self) -> DeliveryPolicy {
        DeliveryPolicy {
            batch_size: self.batch_size.max(1),
            max_attempts: self.max_retries.max(1),
            wait_timeout: Duration::from_secs(self.send_timeout_secs),
            ..Default::default()
        }
    }

    /// Metrics API settings, `None` without an API key.
    pub fn datadog_config(&self) -> Option<DatadogConfig> {
        DatadogConfig::from_parts(
            self.dd_api_key.clone(),
            self.dd_app_key.clone(),
            Some(self.dd_site.clone()),
            self.dd_metrics_url.clone(),
        )
    }

    /// LLM Observability settings, `None` unless enabled.
    pub fn llmobs_config(&self) -> Option<LlmObsConfig> {
        self.llmobs_enabled.then(|| LlmObsConfig {
            ml_app: self.llmobs_ml_app.clone(),
            agentless: self.llmobs_agentless,
            api_key: self.dd_api_key.clone(),
            site: self.dd_site.clone(),
            agent_url: self.trace_agent_url.clone(),
        })
    }
}

/// `inference-bench aiperf`
#[derive(Args, Debug, Clone)]
pub struct AiperfArgs {
    /// Model identifier.
    #[arg(long, env = "MODEL_NAME", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Inference endpoint URL.
    #[arg(long, env = "ENDPOINT_URL", default_value = "https://inference.hyperbolic.ai")]
    pub endpoint_url: String,

    /// Endpoint type.
    #[arg(long, env = "ENDPOINT_TYPE", default_value = "chat")]
    pub endpoint_type: String,

    /// Concurrent requests.
    #[arg(long, env = "CONCURRENCY", default_value_t = 10)]
    pub concurrency: u32,

    /// Requests to send; ignored when a duration is set.
    #[arg(long, env = "REQUEST_COUNT", default_value_t = 100)]
    pub request_count: u64,

    /// Benchmark duration in seconds.
    #[arg(long, env = "BENCHMARK_DURATION")]
    pub benchmark_duration: Option<f64>,

    /// Grace period after the duration, in seconds.
    #[arg(long, env = "BENCHMARK_GRACE_PERIOD")]
    pub benchmark_grace_period: Option<f64>,

    /// Streaming responses.
    #[arg(
        long,
        env = "STREAMING",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        default_value_t = true
    )]
    pub streaming: bool,

    /// Per-request timeout in seconds.
    #[arg(long, env = "REQUEST_TIMEOUT")]
    pub request_timeout: Option<f64>,

    /// Target mean output tokens.
    #[arg(long, env = "OUTPUT_TOKENS_MEAN")]
    pub output_tokens_mean: Option<u32>,

    /// Artifact directory.
    #[arg(long, env = "OUTPUT_DIR", default_value = "/tmp/aiperf-results")]
    pub output_dir: PathBuf,

    /// Cloudflare Access client id.
    #[arg(long, env = "CF_ACCESS_CLIENT_ID")]
    pub cf_access_client_id: Option<String>,

    /// Cloudflare Access client secret.
    #[arg(long, env = "CF_ACCESS_CLIENT_SECRET", hide_env_values = true)]
    pub cf_access_client_secret: Option<String>,

    /// aiperf executable.
    #[arg(long, env = "AIPERF_BIN", default_value = "aiperf")]
    pub aiperf_bin: String,

    /// Extra arguments for aiperf, shell-quoted.
    #[arg(long, env = "AIPERF_EXTRA_ARGS", allow_hyphen_values = true)]
    pub extra_args: Option<String>,

    /// Delivery settings.
    #[command(flatten)]
    pub report: ReportArgs,
}

impl AiperfArgs {
    /// Driver configuration.
    pub fn to_config(&self) -> AiperfConfig {
        AiperfConfig {
            binary: self.aiperf_bin.clone(),
            model: self.model.clone(),
            endpoint_url: self.endpoint_url.clone(),
            endpoint_type: self.endpoint_type.clone(),
            concurrency: self.concurrency,
            run_length: RunLength::resolve(
                self.request_count,
                self.benchmark_duration,
                self.benchmark_grace_period,
            ),
            streaming: self.streaming,
            request_timeout_secs: self.request_timeout,
            output_tokens_mean: self.output_tokens_mean,
            output_dir: self.output_dir.clone(),
            access: AccessCredentials::from_parts(
                self.cf_access_client_id.clone(),
                self.cf_access_client_secret.clone(),
            ),
            extra_args: self.extra_args.clone(),
        }
    }

    /// Tags attached to every aiperf metric.
    pub fn base_tags(&self) -> Tags {
        Tags::new()
            .with("model", &self.model)
            .with("endpoint", &self.endpoint_url)
            .with("benchmark", "aiperf")
            .with("cluster_name", &self.report.cluster_name)
    }
}

/// `inference-bench osworld`
#[derive(Args, Debug, Clone)]
pub struct OsworldArgs {
    /// Model identifier.
    #[arg(long, env = "MODEL_NAME", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// VM provider.
    #[arg(long, env = "PROVIDER_NAME", default_value = "docker")]
    pub provider: String,

    /// Parallel environments.
    #[arg(long, env = "NUM_ENVS", default_value_t = 1)]
    pub num_envs: u32,

    /// Step budget per task.
    #[arg(long, env = "MAX_STEPS", default_value_t = 15)]
    pub max_steps: u32,

    /// Token budget per model call.
    #[arg(long, env = "MAX_TOKENS", default_value_t = 32768)]
    pub max_tokens: u32,

    /// Domain filter.
    #[arg(long, env = "DOMAIN", default_value = "all")]
    pub domain: String,

    /// Task metadata file.
    #[arg(long, env = "TEST_META_PATH", default_value = "evaluation_examples/test_nogdrive.json")]
    pub test_meta_path: String,

    /// Result directory.
    #[arg(long, env = "RESULT_DIR", default_value = "/osworld/results")]
    pub result_dir: PathBuf,

    /// Action space.
    #[arg(long, env = "ACTION_SPACE", default_value = "pyautogui")]
    pub action_space: String,

    /// Observation type.
    #[arg(long, env = "OBSERVATION_TYPE", default_value = "screenshot")]
    pub observation_type: String,

    /// Extra arguments for the harness, shell-quoted.
    #[arg(long, env = "ADDITIONAL_ARGS", allow_hyphen_values = true)]
    pub additional_args: Option<String>,

    /// OpenAI-compatible endpoint for the agent.
    #[arg(
        long,
        env = "OPENAI_BASE_URL",
        default_value = "http://infra-inference-scheduling-inference-gateway.llm-d.svc.cluster.local/v1"
    )]
    pub openai_base_url: String,

    /// API key for the agent endpoint.
    #[arg(long, env = "OPENAI_API_KEY", default_value = "dummy-key", hide_env_values = true)]
    pub openai_api_key: String,

    /// Harness checkout directory.
    #[arg(long, env = "OSWORLD_DIR", default_value = "/osworld")]
    pub osworld_dir: PathBuf,

    /// Interpreter for the harness script.
    #[arg(long, env = "OSWORLD_LAUNCHER", default_value = "python3")]
    pub launcher: String,

    /// Harness entry script.
    #[arg(long, env = "OSWORLD_SCRIPT", default_value = "run_multienv_qwen3vl.py")]
    pub script: String,

    /// Agent backend passed as `--api_backend`.
    #[arg(long, env = "OSWORLD_API_BACKEND")]
    pub api_backend: Option<String>,

    /// Delivery settings.
    #[command(flatten)]
    pub report: ReportArgs,
}

impl OsworldArgs {
    /// Driver configuration.
    pub fn to_config(&self) -> OsworldConfig {
        OsworldConfig {
            launcher: self.launcher.clone(),
            script: self.script.clone(),
            osworld_dir: self.osworld_dir.clone(),
            model: self.model.clone(),
            provider: self.provider.clone(),
            num_envs: self.num_envs,
            max_steps: self.max_steps,
            max_tokens: self.max_tokens,
            domain: self.domain.clone(),
            test_meta_path: self.test_meta_path.clone(),
            result_dir: self.result_dir.clone(),
            action_space: self.action_space.clone(),
            observation_type: self.observation_type.clone(),
            api_backend: self.api_backend.clone(),
            extra_args: self.additional_args.clone(),
            openai_base_url: self.openai_base_url.clone(),
            openai_api_key: self.openai_api_key.clone(),
        }
    }

    /// Tags attached to every OSWorld metric.
    pub fn base_tags(&self) -> Tags {
        Tags::new()
            .with("model", &self.model)
            .with("domain", &self.domain)
            .with("benchmark", "osworld")
            .with("cluster_name", &self.report.cluster_name)
    }
}
