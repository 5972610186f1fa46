use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use toml::Value;

use ticketflow_core::config::{
    resolve_config_path, AgentTuning, AppConfig, LlmProvider, LoadOptions,
};

struct Field {
    key: String,
    env_keys: Vec<&'static str>,
    value: String,
}

impl Field {
    fn new(key: impl Into<String>, env_keys: &[&'static str], value: impl Into<String>) -> Self {
        Self { key: key.into(), env_keys: env_keys.to_vec(), value: value.into() }
    }
}

pub fn run(options: &LoadOptions) -> String {
    let config = match AppConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(options.config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(
            &field.key,
            &field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(format!("- {} = {} (source: {source})", field.key, field.value));
    }

    lines.join("\n")
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let llm = &config.llm;
    let api_key = llm
        .api_key
        .as_ref()
        .map(|key| redact_token(key.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());

    let mut fields = vec![
        Field::new("llm.provider", &["TICKETFLOW_LLM_PROVIDER"], llm.provider.as_str()),
        Field::new("llm.model", &["TICKETFLOW_LLM_MODEL"], llm.model.clone()),
        Field::new("llm.base_url", &["TICKETFLOW_LLM_BASE_URL"], llm.endpoint()),
        Field::new("llm.api_key", &["TICKETFLOW_LLM_API_KEY", provider_key_var(llm.provider)], api_key),
        Field::new("llm.timeout_secs", &["TICKETFLOW_LLM_TIMEOUT_SECS"], llm.timeout_secs.to_string()),
        Field::new("llm.max_tokens", &["TICKETFLOW_LLM_MAX_TOKENS"], llm.max_tokens.to_string()),
    ];

    for (name, tuning) in [
        ("summarizer", &config.agents.summarizer),
        ("action_extractor", &config.agents.action_extractor),
        ("resolver", &config.agents.resolver),
    ] {
        fields.extend(agent_fields(name, tuning, &llm.model));
    }

    fields.extend([
        Field::new(
            "pipeline.greeting_shortcut",
            &["TICKETFLOW_PIPELINE_GREETING_SHORTCUT"],
            config.pipeline.greeting_shortcut.to_string(),
        ),
        Field::new(
            "pipeline.instant_resolution_threshold",
            &["TICKETFLOW_PIPELINE_INSTANT_RESOLUTION_THRESHOLD"],
            config.pipeline.instant_resolution_threshold.to_string(),
        ),
        Field::new(
            "pipeline.context_turns",
            &["TICKETFLOW_PIPELINE_CONTEXT_TURNS"],
            config.pipeline.context_turns.to_string(),
        ),
        Field::new(
            "logging.level",
            &["TICKETFLOW_LOGGING_LEVEL", "TICKETFLOW_LOG_LEVEL"],
            config.logging.level.clone(),
        ),
        Field::new(
            "logging.format",
            &["TICKETFLOW_LOGGING_FORMAT", "TICKETFLOW_LOG_FORMAT"],
            format!("{:?}", config.logging.format).to_lowercase(),
        ),
    ]);

    fields
}

fn agent_fields(name: &str, tuning: &AgentTuning, fallback_model: &str) -> [Field; 3] {
    [
        Field::new(format!("agents.{name}.model"), &[], tuning.model_or(fallback_model)),
        Field::new(format!("agents.{name}.temperature"), &[], tuning.temperature.to_string()),
        Field::new(format!("agents.{name}.top_p"), &[], tuning.top_p.to_string()),
    ]
}

fn provider_key_var(provider: LlmProvider) -> &'static str {
    match provider {
        LlmProvider::Groq => "GROQ_API_KEY",
        LlmProvider::OpenAi => "OPENAI_API_KEY",
        LlmProvider::Ollama => "TICKETFLOW_LLM_API_KEY",
    }
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("config file"));
            return format!("file ({})", file_path.display());
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

/// Keeps a recognizable provider prefix (`gsk_`, `sk-`) and hides the rest.
pub fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    match trimmed.find(['_', '-']) {
        Some(index) if index <= 4 => format!("{}***", &trimmed[..=index]),
        _ => "<redacted>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::redact_token;

    #[test]
    fn tokens_keep_only_their_prefix() {
        assert_eq!(redact_token("gsk_abcdef123"), "gsk_***");
        assert_eq!(redact_token("sk-proj-secret"), "sk-***");
        assert_eq!(redact_token("plainsecretvalue"), "<redacted>");
        assert_eq!(redact_token("averylongprefix_secret"), "<redacted>");
        assert_eq!(redact_token("   "), "<empty>");
    }
}
