//! Configuration types for the engagement service.
//!
//! Configuration lives in `vibe.json` (camelCase keys). Every field has a
//! default, so a missing file or an empty object yields a working setup.

use std::path::Path;

use serde::{Deserialize, Serialize};
use vibe_llm::OpenAiModel;

use crate::error::{Result, VibeError};

/// The default config file name.
const CONFIG_FILE_NAME: &str = "vibe.json";

/// Default seconds between simulation ticks.
const fn default_tick_interval() -> u64 {
    5
}

/// Default task storage file.
fn default_tasks_file() -> String {
    ".vibe/tasks.json".to_string()
}

/// Default directory holding the book's `Chapter_NN` folders.
fn default_snippets_dir() -> String {
    "book".to_string()
}

/// Default output directory for session reports.
fn default_report_dir() -> String {
    ".vibe/reports".to_string()
}

const fn default_code_interaction_probability() -> f64 {
    0.3
}

const fn default_ai_prompt_probability() -> f64 {
    0.1
}

const fn default_execution_success_probability() -> f64 {
    0.2
}

const fn default_execution_failure_probability() -> f64 {
    0.1
}

const fn default_confidence_step_min() -> f64 {
    -0.01
}

const fn default_confidence_step_max() -> f64 {
    0.04
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_base_url() -> String {
    vibe_llm::DEFAULT_BASE_URL.to_string()
}

const fn default_temperature() -> f64 {
    vibe_llm::DEFAULT_TEMPERATURE
}

const fn default_llm_timeout() -> u64 {
    60
}

/// Main configuration for the engagement service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Seconds between simulation ticks.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,

    /// Demo metrics simulation settings.
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Structured-output LLM settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// JSON file the to-do list is persisted to.
    #[serde(default = "default_tasks_file")]
    pub tasks_file: String,

    /// Directory containing the book's chapter folders.
    #[serde(default = "default_snippets_dir")]
    pub snippets_dir: String,

    /// Output directory for session reports.
    #[serde(default = "default_report_dir")]
    pub report_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval(),
            simulation: SimulationConfig::default(),
            llm: LlmConfig::default(),
            tasks_file: default_tasks_file(),
            snippets_dir: default_snippets_dir(),
            report_dir: default_report_dir(),
        }
    }
}

impl Config {
    /// Loads configuration from the current working directory.
    ///
    /// Looks for `vibe.json` in the current directory and falls back to
    /// defaults when it is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON.
    pub fn load() -> Result<Self> {
        let current_dir = std::env::current_dir().map_err(|e| {
            VibeError::config_parse(
                "<current directory>",
                format!("cannot determine current directory: {e}"),
            )
        })?;
        Self::load_from_dir(&current_dir)
    }

    /// Loads configuration from `vibe.json` in a specific directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::load_from_file(&dir.join(CONFIG_FILE_NAME))
    }

    /// Loads configuration from a specific file path.
    ///
    /// If the file does not exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns `VibeError::ConfigParseError` if the file cannot be read or
    /// parsed, and `VibeError::ConfigValidationError` if a value is out of
    /// range.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(e) => {
                return Err(VibeError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| VibeError::config_parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `VibeError::ConfigValidationError` if any check fails.
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_secs == 0 {
            return Err(VibeError::config_validation(
                "tickIntervalSecs must be greater than 0",
                "Set tickIntervalSecs to at least 1 in your vibe.json",
            ));
        }

        self.simulation.validate()?;
        self.llm.validate()?;

        if self.tasks_file.trim().is_empty() {
            return Err(VibeError::config_validation(
                "tasksFile must not be empty",
                "Provide a file path for the to-do list in your vibe.json",
            ));
        }

        if self.report_dir.trim().is_empty() {
            return Err(VibeError::config_validation(
                "reportDir must not be empty",
                "Provide a valid report directory in your vibe.json (use '.' for current directory)",
            ));
        }

        Ok(())
    }
}

/// Settings for the demo metrics simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationConfig {
    /// Chance per tick of a code interaction.
    #[serde(default = "default_code_interaction_probability")]
    pub code_interaction_probability: f64,

    /// Chance per tick of an AI prompt.
    #[serde(default = "default_ai_prompt_probability")]
    pub ai_prompt_probability: f64,

    /// Chance per tick of a successful execution.
    #[serde(default = "default_execution_success_probability")]
    pub execution_success_probability: f64,

    /// Chance per tick of a failed execution.
    #[serde(default = "default_execution_failure_probability")]
    pub execution_failure_probability: f64,

    /// Lower bound of the per-tick confidence change.
    #[serde(default = "default_confidence_step_min")]
    pub confidence_step_min: f64,

    /// Upper bound of the per-tick confidence change.
    #[serde(default = "default_confidence_step_max")]
    pub confidence_step_max: f64,

    /// Fixed RNG seed for reproducible runs.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            code_interaction_probability: default_code_interaction_probability(),
            ai_prompt_probability: default_ai_prompt_probability(),
            execution_success_probability: default_execution_success_probability(),
            execution_failure_probability: default_execution_failure_probability(),
            confidence_step_min: default_confidence_step_min(),
            confidence_step_max: default_confidence_step_max(),
            seed: None,
        }
    }
}

impl SimulationConfig {
    fn validate(&self) -> Result<()> {
        let probabilities = [
            ("codeInteractionProbability", self.code_interaction_probability),
            ("aiPromptProbability", self.ai_prompt_probability),
            ("executionSuccessProbability", self.execution_success_probability),
            ("executionFailureProbability", self.execution_failure_probability),
        ];
        for (name, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(VibeError::config_validation(
                    format!("simulation.{name} must be between 0 and 1 (got {value})"),
                    format!("Set simulation.{name} to a probability such as 0.2"),
                ));
            }
        }

        let steps = [self.confidence_step_min, self.confidence_step_max];
        if steps.iter().any(|s| !(-1.0..=1.0).contains(s)) {
            return Err(VibeError::config_validation(
                "simulation confidence steps must be between -1 and 1",
                "Use small steps such as confidenceStepMin -0.01 and confidenceStepMax 0.04",
            ));
        }

        if self.confidence_step_min > self.confidence_step_max {
            return Err(VibeError::config_validation(
                "simulation.confidenceStepMin must not exceed simulation.confidenceStepMax",
                "Swap the two values in your vibe.json",
            ));
        }

        Ok(())
    }
}

/// Settings for structured-output LLM calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmConfig {
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Provider endpoint.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model used when a request does not name one.
    #[serde(default)]
    pub default_model: OpenAiModel,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Optional completion token cap.
    #[serde(default)]
    pub max_tokens: Option<u32>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            default_model: OpenAiModel::default(),
            temperature: default_temperature(),
            max_tokens: None,
            timeout_secs: default_llm_timeout(),
        }
    }
}

impl LlmConfig {
    /// Reads the API key from the configured environment variable.
    ///
    /// Returns `None` when the variable is unset or blank.
    #[must_use]
    pub fn api_key_from_env(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    fn validate(&self) -> Result<()> {
        if self.api_key_env.trim().is_empty() {
            return Err(VibeError::config_validation(
                "llm.apiKeyEnv must not be empty",
                "Name the environment variable holding your API key, e.g. OPENAI_API_KEY",
            ));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(VibeError::config_validation(
                format!("llm.baseUrl must be an http(s) URL (got '{}')", self.base_url),
                "Use https://api.openai.com/v1 or the URL of a compatible endpoint",
            ));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(VibeError::config_validation(
                format!("llm.temperature must be between 0 and 2 (got {})", self.temperature),
                "Set llm.temperature to 0.7 or another value in range",
            ));
        }

        if self.timeout_secs == 0 {
            return Err(VibeError::config_validation(
                "llm.timeoutSecs must be greater than 0",
                "Set llm.timeoutSecs to at least 1 in your vibe.json",
            ));
        }

        Ok(())
    }
}
