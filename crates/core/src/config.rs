use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "ticketflow.toml";
pub const NESTED_CONFIG_FILE: &str = "config/ticketflow.toml";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub agents: AgentsConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
}

/// Sampling settings for one agent. `model` falls back to `llm.model`.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentTuning {
    pub model: Option<String>,
    pub temperature: f32,
    pub top_p: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AgentsConfig {
    pub summarizer: AgentTuning,
    pub action_extractor: AgentTuning,
    pub resolver: AgentTuning,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    pub greeting_shortcut: bool,
    pub instant_resolution_threshold: u8,
    /// Most recent chat turns replayed to the agents as context.
    pub context_turns: usize,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    Groq,
    #[serde(rename = "openai", alias = "open_ai")]
    OpenAi,
    Ollama,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Groq => "groq",
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Groq => "https://api.groq.com/openai/v1",
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Ollama => "http://localhost:11434/v1",
        }
    }

    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::Groq | Self::OpenAi)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub greeting_shortcut: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AgentTuning {
    fn default() -> Self {
        Self { model: None, temperature: 0.7, top_p: 0.9 }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                provider: LlmProvider::Groq,
                api_key: None,
                base_url: None,
                model: "llama-3.3-70b-versatile".to_string(),
                timeout_secs: 60,
                max_tokens: 2048,
            },
            agents: AgentsConfig {
                summarizer: AgentTuning::default(),
                action_extractor: AgentTuning::default(),
                resolver: AgentTuning::default(),
            },
            pipeline: PipelineConfig {
                greeting_shortcut: true,
                instant_resolution_threshold: 95,
                context_turns: 5,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl LlmConfig {
    pub fn endpoint(&self) -> &str {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| self.provider.default_base_url())
    }
}

impl AgentTuning {
    pub fn model_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.model.as_deref().unwrap_or(fallback)
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "groq" => Ok(Self::Groq),
            "openai" | "open_ai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected groq|openai|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_tokens) = llm.max_tokens {
                self.llm.max_tokens = max_tokens;
            }
        }

        if let Some(agents) = patch.agents {
            if let Some(summarizer) = agents.summarizer {
                summarizer.apply_to(&mut self.agents.summarizer);
            }
            if let Some(action_extractor) = agents.action_extractor {
                action_extractor.apply_to(&mut self.agents.action_extractor);
            }
            if let Some(resolver) = agents.resolver {
                resolver.apply_to(&mut self.agents.resolver);
            }
        }

        if let Some(pipeline) = patch.pipeline {
            if let Some(greeting_shortcut) = pipeline.greeting_shortcut {
                self.pipeline.greeting_shortcut = greeting_shortcut;
            }
            if let Some(threshold) = pipeline.instant_resolution_threshold {
                self.pipeline.instant_resolution_threshold = threshold;
            }
            if let Some(context_turns) = pipeline.context_turns {
                self.pipeline.context_turns = context_turns;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("TICKETFLOW_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        let api_key =
            read_env("TICKETFLOW_LLM_API_KEY").or_else(|| read_provider_key(self.llm.provider));
        if let Some(value) = api_key {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("TICKETFLOW_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("TICKETFLOW_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("TICKETFLOW_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("TICKETFLOW_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("TICKETFLOW_LLM_MAX_TOKENS") {
            self.llm.max_tokens = parse_u32("TICKETFLOW_LLM_MAX_TOKENS", &value)?;
        }

        if let Some(value) = read_env("TICKETFLOW_PIPELINE_GREETING_SHORTCUT") {
            self.pipeline.greeting_shortcut =
                parse_bool("TICKETFLOW_PIPELINE_GREETING_SHORTCUT", &value)?;
        }
        if let Some(value) = read_env("TICKETFLOW_PIPELINE_INSTANT_RESOLUTION_THRESHOLD") {
            self.pipeline.instant_resolution_threshold =
                parse_u8("TICKETFLOW_PIPELINE_INSTANT_RESOLUTION_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("TICKETFLOW_PIPELINE_CONTEXT_TURNS") {
            self.pipeline.context_turns =
                parse_u32("TICKETFLOW_PIPELINE_CONTEXT_TURNS", &value)? as usize;
        }

        let log_level =
            read_env("TICKETFLOW_LOGGING_LEVEL").or_else(|| read_env("TICKETFLOW_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("TICKETFLOW_LOGGING_FORMAT").or_else(|| read_env("TICKETFLOW_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key));
        }
        if let Some(llm_base_url) = overrides.llm_base_url {
            self.llm.base_url = Some(llm_base_url);
        }
        if let Some(greeting_shortcut) = overrides.greeting_shortcut {
            self.pipeline.greeting_shortcut = greeting_shortcut;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_llm(&self.llm)?;
        validate_agents(&self.agents)?;
        validate_pipeline(&self.pipeline)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// Checks the configured path first, then `ticketflow.toml` and
/// `config/ticketflow.toml` relative to the working directory.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from(NESTED_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if llm.max_tokens == 0 {
        return Err(ConfigError::Validation(
            "llm.max_tokens must be greater than zero".to_string(),
        ));
    }

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    if llm.provider.requires_api_key() {
        let missing = llm
            .api_key
            .as_ref()
            .map(|value| value.expose_secret().trim().is_empty())
            .unwrap_or(true);
        if missing {
            return Err(ConfigError::Validation(
                "llm.api_key is required for groq/openai providers (set TICKETFLOW_LLM_API_KEY or GROQ_API_KEY)"
                    .to_string(),
            ));
        }
    }

    let endpoint = llm.endpoint();
    if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
        return Err(ConfigError::Validation(
            "llm.base_url must start with http:// or https://".to_string(),
        ));
    }

    Ok(())
}

fn validate_agents(agents: &AgentsConfig) -> Result<(), ConfigError> {
    let named = [
        ("summarizer", &agents.summarizer),
        ("action_extractor", &agents.action_extractor),
        ("resolver", &agents.resolver),
    ];

    for (name, tuning) in named {
        if !(0.0..=2.0).contains(&tuning.temperature) {
            return Err(ConfigError::Validation(format!(
                "agents.{name}.temperature must be in range 0.0..=2.0"
            )));
        }
        if tuning.top_p <= 0.0 || tuning.top_p > 1.0 {
            return Err(ConfigError::Validation(format!(
                "agents.{name}.top_p must be in range (0.0, 1.0]"
            )));
        }
        if tuning.model.as_deref().is_some_and(|model| model.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "agents.{name}.model must not be empty when set"
            )));
        }
    }

    Ok(())
}

fn validate_pipeline(pipeline: &PipelineConfig) -> Result<(), ConfigError> {
    if pipeline.instant_resolution_threshold > 100 {
        return Err(ConfigError::Validation(
            "pipeline.instant_resolution_threshold must be in range 0..=100".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn read_provider_key(provider: LlmProvider) -> Option<String> {
    match provider {
        LlmProvider::Groq => read_env("GROQ_API_KEY"),
        LlmProvider::OpenAi => read_env("OPENAI_API_KEY"),
        LlmProvider::Ollama => None,
    }
}

fn parse_u8(key: &str, value: &str) -> Result<u8, ConfigError> {
    value.parse::<u8>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    llm: Option<LlmPatch>,
    agents: Option<AgentsPatch>,
    pipeline: Option<PipelinePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_tokens: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct AgentsPatch {
    summarizer: Option<AgentTuningPatch>,
    action_extractor: Option<AgentTuningPatch>,
    resolver: Option<AgentTuningPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct AgentTuningPatch {
    model: Option<String>,
    temperature: Option<f32>,
    top_p: Option<f32>,
}

impl AgentTuningPatch {
    fn apply_to(self, tuning: &mut AgentTuning) {
        if let Some(model) = self.model {
            tuning.model = Some(model);
        }
        if let Some(temperature) = self.temperature {
            tuning.temperature = temperature;
        }
        if let Some(top_p) = self.top_p {
            tuning.top_p = top_p;
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PipelinePatch {
    greeting_shortcut: Option<bool>,
    instant_resolution_threshold: Option<u8>,
    context_turns: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
