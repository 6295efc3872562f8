// Copyright 2025 Inference Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! OSWorld evaluation harness driver.
//!
//! The harness reads its model endpoint from `<osworld_dir>/.env`, so that
//! file is written before every run. Harness output is streamed to the
//! terminal rather than captured. The agent backend is chosen with an
//! explicit `--api_backend` argument.

use crate::error::Result;
use crate::process::{split_extra_args, OutputMode, ProcessExit, ToolCommand};
use crate::BenchmarkDriver;
use async_trait::async_trait;
use inference_bench_benchmarks::io::{self, SCORE_FILE};
use inference_bench_core::RunOutcome;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Name of the env-file written into the harness directory.
pub const ENV_FILE: &str = ".env";

/// Configuration for one OSWorld evaluation.
#[derive(Debug, Clone)]
pub struct OsworldConfig {
    /// Interpreter used to launch the harness script.
    pub launcher: String,
    /// Harness entry script, relative to `osworld_dir`.
    pub script: String,
    /// Harness checkout; the child runs here.
    pub osworld_dir: PathBuf,
    /// Model identifier.
    pub model: String,
    /// VM provider (`docker`, ...).
    pub provider: String,
    /// Parallel environments.
    pub num_envs: u32,
    /// Step budget per task.
    pub max_steps: u32,
    /// Token budget per model call.
    pub max_tokens: u32,
    /// Domain filter, `all` for every domain.
    pub domain: String,
    /// Task metadata file.
    pub test_meta_path: String,
    /// Directory the harness writes per-task results to.
    pub result_dir: PathBuf,
    /// Agent action space.
    pub action_space: String,
    /// Agent observation type.
    pub observation_type: String,
    /// Agent backend, passed as `--api_backend`.
    pub api_backend: Option<String>,
    /// Extra arguments appended verbatim.
    pub extra_args: Option<String>,
    /// OpenAI-compatible endpoint written to the env-file.
    pub openai_base_url: String,
    /// API key written to the env-file.
    pub openai_api_key: String,
}

impl Default for OsworldConfig {
    fn default() -> Self {
        Self {
            launcher: "python3".to_string(),
            script: "run_multienv_qwen3vl.py".to_string(),
            osworld_dir: PathBuf::from("/osworld"),
            model: "Qwen/Qwen3-VL-32B-Thinking".to_string(),
            provider: "docker".to_string(),
            num_envs: 1,
            max_steps: 15,
            max_tokens: 32768,
            domain: "all".to_string(),
            test_meta_path: "evaluation_examples/test_nogdrive.json".to_string(),
            result_dir: PathBuf::from("/osworld/results"),
            action_space: "pyautogui".to_string(),
            observation_type: "screenshot".to_string(),
            api_backend: None,
            extra_args: None,
            openai_base_url:
                "http://infra-inference-scheduling-inference-gateway.llm-d.svc.cluster.local/v1"
                    .to_string(),
            openai_api_key: "dummy-key".to_string(),
        }
    }
}

impl OsworldConfig {
    /// Arguments passed to the launcher, script first.
    pub fn command_args(&self) -> Result<Vec<String>> {
        let mut args: Vec<String> = vec![
            self.script.clone(),
            "--model".into(),
            self.model.clone(),
            "--provider_name".into(),
            self.provider.clone(),
            "--num_envs".into(),
            self.num_envs.to_string(),
            "--max_steps".into(),
            self.max_steps.to_string(),
            "--max_tokens".into(),
            self.max_tokens.to_string(),
            "--domain".into(),
            self.domain.clone(),
            "--test_all_meta_path".into(),
            self.test_meta_path.clone(),
            "--result_dir".into(),
            self.result_dir.display().to_string(),
            "--headless".into(),
            "--action_space".into(),
            self.action_space.clone(),
            "--observation_type".into(),
            self.observation_type.clone(),
        ];
        if let Some(backend) = self.api_backend.as_deref().filter(|b| !b.is_empty()) {
            args.extend(["--api_backend".into(), backend.to_string()]);
        }
        args.extend(split_extra_args(self.extra_args.as_deref())?);
        Ok(args)
    }

    /// Full command, run inside `osworld_dir` with inherited output.
    pub fn tool_command(&self) -> Result<ToolCommand> {
        let mut command = ToolCommand::new(&self.launcher, self.command_args()?);
        command.working_dir = Some(self.osworld_dir.clone());
        command.output = OutputMode::Inherit;
        command.install_hint = "the OSWorld harness must be checked out in OSWORLD_DIR";
        Ok(command)
    }

    /// Env-file contents for the harness.
    pub fn env_file_contents(&self) -> String {
        format!(
            "OPENAI_BASE_URL={}\nOPENAI_API_KEY={}\nOPENAI_MODEL={}\n",
            self.openai_base_url, self.openai_api_key, self.model
        )
    }

    /// Write `<osworld_dir>/.env`, creating parent directories.
    pub fn write_env_file(&self) -> Result<PathBuf> {
        let path = self.osworld_dir.join(ENV_FILE);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, self.env_file_contents())?;
        Ok(path)
    }

    fn log_banner(&self) {
        info!(
            model = %self.model,
            endpoint = %self.openai_base_url,
            provider = %self.provider,
            domain = %self.domain,
            result_dir = %self.result_dir.display(),
            api_backend = self.api_backend.as_deref().unwrap_or("default"),
            "OSWorld evaluation"
        );
    }
}

/// Driver for the OSWorld harness.
pub struct OsworldDriver {
    config: OsworldConfig,
}

impl OsworldDriver {
    /// Create a driver for the given configuration.
    pub fn new(config: OsworldConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BenchmarkDriver for OsworldDriver {
    fn id(&self) -> &str {
        "osworld"
    }

    async fn run(&self) -> Result<RunOutcome> {
        let env_file = self.config.write_env_file()?;
        info!(path = %env_file.display(), "Wrote harness env-file");
        self.config.log_banner();
        io::ensure_output_dir(&self.config.result_dir)?;

        let command = self.config.tool_command()?;
        let exit = command.run().await?;
        Ok(outcome_from_exit(self.id(), exit, &self.config.result_dir))
    }
}

/// Map a finished harness process onto a [`RunOutcome`].
///
/// Artifacts are the per-task score files under `result_dir`, including any
/// left by an earlier run.
pub fn outcome_from_exit(tool: &str, exit: ProcessExit, result_dir: &Path) -> RunOutcome {
    let score_files = io::find_files_named(result_dir, SCORE_FILE);
    if exit.success() {
        info!(score_files = score_files.len(), "Evaluation complete");
    } else {
        error!(code = ?exit.code, "Evaluation failed");
        if !score_files.is_empty() {
            warn!(
                score_files = score_files.len(),
                "Score files found despite failure; reporting completed tasks"
            );
        }
    }
    RunOutcome::from_exit(tool, exit.code, result_dir, score_files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_command_args() {
        let args = OsworldConfig::default().command_args().unwrap();
        assert_eq!(args[0], "run_multienv_qwen3vl.py");
        assert!(args.contains(&"--headless".to_string()));
        let domain = args.iter().position(|a| a == "--domain").unwrap();
        assert_eq!(args[domain + 1], "all");
        assert!(!args.contains(&"--api_backend".to_string()));
    }

    #[test]
    fn test_api_backend_is_explicit_argument() {
        let config = OsworldConfig {
            api_backend: Some("openai".into()),
            extra_args: Some("--sleep_after_execution 3".into()),
            ..Default::default()
        };
        let args = config.command_args().unwrap();
        let n = args.len();
        assert_eq!(
            &args[n - 4..],
            ["--api_backend", "openai", "--sleep_after_execution", "3"]
        );
    }

    #[test]
    fn test_empty_api_backend_is_ignored() {
        let config = OsworldConfig {
            api_backend: Some(String::new()),
            ..Default::default()
        };
        assert!(!config
            .command_args()
            .unwrap()
            .contains(&"--api_backend".to_string()));
    }

    #[test]
    fn test_tool_command_runs_in_harness_dir() {
        let command = OsworldConfig::default().tool_command().unwrap();
        assert_eq!(command.program, "python3");
        assert_eq!(command.output, OutputMode::Inherit);
        assert_eq!(command.working_dir, Some(PathBuf::from("/osworld")));
    }

    #[test]
    fn test_write_env_file_creates_parents() {
        let dir = TempDir::new().unwrap();
        let config = OsworldConfig {
            osworld_dir: dir.path().join("missing/osworld"),
            openai_base_url: "http://gateway/v1".into(),
            openai_api_key: "k".into(),
            model: "m".into(),
            ..Default::default()
        };
        let path = config.write_env_file().unwrap();
        assert_eq!(
            fs::read_to_string(path).unwrap(),
            "OPENAI_BASE_URL=http://gateway/v1\nOPENAI_API_KEY=k\nOPENAI_MODEL=m\n"
        );
    }

    #[test]
    fn test_failed_exit_with_prior_scores_is_degraded() {
        let dir = TempDir::new().unwrap();
        let task = dir.path().join("chrome/t1");
        fs::create_dir_all(&task).unwrap();
        fs::write(task.join(SCORE_FILE), "1").unwrap();

        let exit = ProcessExit {
            code: Some(2),
            stdout: None,
            stderr: None,
        };
        let outcome = outcome_from_exit("osworld", exit, dir.path());
        assert!(outcome.is_degraded());
        assert_eq!(outcome.exit_code, Some(2));
        assert!(outcome.stdout.is_none());
    }

    #[test]
    fn test_failed_exit_without_scores_is_hard_failure() {
        let dir = TempDir::new().unwrap();
        let exit = ProcessExit {
            code: Some(1),
            stdout: None,
            stderr: None,
        };
        assert!(outcome_from_exit("osworld", exit, dir.path()).is_hard_failure());
    }
}
