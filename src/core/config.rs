//! Bridge configuration loaded from TOML with environment overrides
//!
//! Every deployment-specific value lives here: the wake phrase, the drone
//! config path, the leader tag, the completion provider and the execution
//! agent's address and scripts. Missing sections and keys fall back to the
//! reference deployment defaults.

use crate::core::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings for the command interpreter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Phrase a transcript must start with to count as a command
    pub wake_phrase: String,
    /// Drone configuration file handed to the flight and reset scripts
    pub drone_config: String,
    /// Letter tag prepended to spoken drone numbers ("7" -> "E7")
    pub leader_prefix: String,
    /// Connection URI base for single-drone resets
    pub uri_prefix: String,
    /// Location generated code is asked to live in
    pub namespace: String,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            wake_phrase: "hey hero".to_string(),
            drone_config: "scripted_flight/config/drones.json".to_string(),
            leader_prefix: "E".to_string(),
            uri_prefix: "radio://0/80/2M/".to_string(),
            namespace: "scripted_flight/".to_string(),
        }
    }
}

/// Settings for the code synthesis client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// OpenAI-compatible chat completions endpoint
    pub api_url: String,
    pub model: String,
    /// Provider credential; usually supplied through the environment
    pub api_key: Option<String>,
    /// Network timeout for a single synthesis request
    pub timeout_secs: u64,
    /// Token budget for fallback code generation
    pub max_tokens: u32,
    /// Sampling temperature for fallback code generation
    pub temperature: f32,
    /// Applied when a request leaves `max_tokens` unset
    pub default_max_tokens: u32,
    /// Applied when a request leaves `temperature` unset
    pub default_temperature: f32,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.cerebras.ai/v1/chat/completions".to_string(),
            model: "llama-4-scout-17b-16e-instruct".to_string(),
            api_key: None,
            timeout_secs: 30,
            max_tokens: 300,
            temperature: 0.7,
            default_max_tokens: 200,
            default_temperature: 0.5,
        }
    }
}

impl SynthesisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Settings for the execution agent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub host: String,
    pub port: u16,
    /// Overrides `http://{host}:{port}` on the interpreter side
    pub base_url: Option<String>,
    /// Program used to run every script
    pub interpreter: String,
    /// Flight entry point used by `runMain`
    pub entry_script: PathBuf,
    /// Script used by `reset`
    pub reset_script: PathBuf,
    /// Directory spawned processes run in (agent's cwd when unset)
    pub working_dir: Option<PathBuf>,
    /// Where generated code is written (OS temp dir when unset)
    pub temp_dir: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3031,
            base_url: None,
            interpreter: "python".to_string(),
            entry_script: PathBuf::from("scripted_flight/main.py"),
            reset_script: PathBuf::from("scripted_flight/reset.py"),
            working_dir: None,
            temp_dir: None,
        }
    }
}

impl AgentConfig {
    /// Base URL the interpreter uses to reach the agent
    pub fn base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}:{}", self.host, self.port),
        }
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Complete bridge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub interpreter: InterpreterConfig,
    #[serde(default)]
    pub synthesis: SynthesisConfig,
    #[serde(default)]
    pub agent: AgentConfig,
}

impl BridgeConfig {
    /// Parse configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| BridgeError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            BridgeError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&contents)
    }

    /// Load from `path` when given, otherwise start from defaults; then
    /// apply environment overrides and validate
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Override values from environment variables
    ///
    /// HERO_WAKE_PHRASE, HERO_AGENT_URL, HERO_AGENT_PORT,
    /// CEREBRAS_API_KEY (or LLM_API_KEY), LLM_API_URL, LLM_MODEL
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(phrase) = var("HERO_WAKE_PHRASE") {
            self.interpreter.wake_phrase = phrase;
        }
        if let Some(url) = var("HERO_AGENT_URL") {
            self.agent.base_url = Some(url);
        }
        if let Some(port) = var("HERO_AGENT_PORT").and_then(|p| p.parse().ok()) {
            self.agent.port = port;
        }
        if let Some(key) = var("CEREBRAS_API_KEY").or_else(|| var("LLM_API_KEY")) {
            self.synthesis.api_key = Some(key);
        }
        if let Some(url) = var("LLM_API_URL") {
            self.synthesis.api_url = url;
        }
        if let Some(model) = var("LLM_MODEL") {
            self.synthesis.model = model;
        }
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.interpreter.wake_phrase.trim().is_empty() {
            return Err(BridgeError::Config("wake_phrase must not be empty".into()));
        }
        if self.interpreter.leader_prefix.is_empty() {
            return Err(BridgeError::Config("leader_prefix must not be empty".into()));
        }
        if self.synthesis.timeout_secs == 0 {
            return Err(BridgeError::Config("timeout_secs must be positive".into()));
        }
        if self.synthesis.max_tokens == 0 || self.synthesis.default_max_tokens == 0 {
            return Err(BridgeError::Config("max_tokens must be positive".into()));
        }
        for temperature in [self.synthesis.temperature, self.synthesis.default_temperature] {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(BridgeError::Config(format!(
                    "temperature ({}) must be within 0.0..=2.0",
                    temperature
                )));
            }
        }
        if self.agent.interpreter.trim().is_empty() {
            return Err(BridgeError::Config("agent interpreter must not be empty".into()));
        }
        Ok(())
    }
}
