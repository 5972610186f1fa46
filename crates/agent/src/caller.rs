use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm::{ChatMessage, CompletionRequest, LlmClient, LlmError};
use crate::prompts::{system_message, user_message};

pub const INVALID_JSON_ERROR: &str = "Invalid JSON response format";
pub const PROCESSING_ERROR: &str = "Processing error";
pub const RETRY_SUGGESTION: &str = "Please retry with a different query";

/// One prompted model call. Implementations never fail past this boundary:
/// failures come back as an error mapping in the returned value.
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;
    async fn process(&self, content: &str, context: &str) -> Value;
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sampling {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl Default for Sampling {
    fn default() -> Self {
        Self { temperature: 0.7, top_p: 0.9, max_tokens: 2048 }
    }
}

#[derive(Debug, Error)]
pub enum AgentFailure {
    #[error("{details}")]
    MalformedJson { original_response: String, details: String },
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("expected a JSON object from the model, got {0}")]
    NotAnObject(&'static str),
}

impl AgentFailure {
    /// The error mapping handed back to the normalizer in place of a reply.
    pub fn into_payload(self) -> Value {
        match self {
            Self::MalformedJson { original_response, details } => json!({
                "error": INVALID_JSON_ERROR,
                "original_response": original_response,
                "details": details,
            }),
            other => json!({
                "error": PROCESSING_ERROR,
                "details": other.to_string(),
                "suggestion": RETRY_SUGGESTION,
            }),
        }
    }
}

pub struct AgentCaller {
    name: String,
    prompt_template: String,
    model: String,
    sampling: Sampling,
    client: Arc<dyn LlmClient>,
}

impl AgentCaller {
    pub fn new(
        name: impl Into<String>,
        prompt_template: impl Into<String>,
        model: impl Into<String>,
        client: Arc<dyn LlmClient>,
    ) -> Self {
        Self {
            name: name.into(),
            prompt_template: prompt_template.into(),
            model: model.into(),
            sampling: Sampling::default(),
            client,
        }
    }

    pub fn with_sampling(mut self, sampling: Sampling) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn sampling(&self) -> Sampling {
        self.sampling
    }

    fn request(&self, content: &str, context: &str) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(system_message(&self.prompt_template)),
                ChatMessage::user(user_message(content, context)),
            ],
            temperature: self.sampling.temperature,
            top_p: self.sampling.top_p,
            max_tokens: self.sampling.max_tokens,
            stream: false,
        }
    }

    async fn call(&self, content: &str, context: &str) -> Result<Map<String, Value>, AgentFailure> {
        let completion = self.client.complete(&self.request(content, context)).await?;
        debug!(
            event_name = "agent.completion.received",
            agent = %self.name,
            model = %self.model,
            chars = completion.len(),
            "agent completion received"
        );
        parse_completion(&completion)
    }
}

#[async_trait]
impl Agent for AgentCaller {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, content: &str, context: &str) -> Value {
        match self.call(content, context).await {
            Ok(reply) => Value::Object(reply),
            Err(failure) => {
                warn!(
                    event_name = "agent.call.degraded",
                    agent = %self.name,
                    error = %failure,
                    "agent call returned an error mapping"
                );
                failure.into_payload()
            }
        }
    }
}

/// Parses completion text into an object, decoding a second time when the
/// model wrapped its JSON in a JSON string.
fn parse_completion(raw: &str) -> Result<Map<String, Value>, AgentFailure> {
    let malformed = |error: serde_json::Error| AgentFailure::MalformedJson {
        original_response: raw.to_string(),
        details: error.to_string(),
    };

    let mut value: Value = serde_json::from_str(raw.trim()).map_err(malformed)?;
    if let Value::String(inner) = &value {
        value = serde_json::from_str(inner.trim()).map_err(malformed)?;
    }

    match value {
        Value::Object(reply) => Ok(reply),
        other => Err(AgentFailure::NotAnObject(kind(&other))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use super::{Agent, AgentCaller, Sampling, INVALID_JSON_ERROR, PROCESSING_ERROR};
    use crate::llm::{ChatRole, CompletionRequest, LlmClient, LlmError};

    enum Reply {
        Text(&'static str),
        RateLimited,
    }

    struct ScriptedClient {
        reply: Reply,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedClient {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self { reply, seen: Mutex::new(Vec::new()) })
        }

        fn requests(&self) -> Vec<CompletionRequest> {
            self.seen.lock().expect("requests lock").clone()
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
            self.seen.lock().expect("requests lock").push(request.clone());
            match self.reply {
                Reply::Text(text) => Ok(text.to_string()),
                Reply::RateLimited => {
                    Err(LlmError::Api { status: 429, message: "rate limit reached".to_string() })
                }
            }
        }
    }

    fn caller(client: Arc<ScriptedClient>) -> AgentCaller {
        AgentCaller::new("summarizer", "Summarize the issue.", "llama-3.3-70b-versatile", client)
    }

    #[tokio::test]
    async fn object_replies_pass_through_and_request_is_templated() {
        let client = ScriptedClient::new(Reply::Text(" {\"summary\": \"Login failure\"} \n"));
        let agent = caller(client.clone());

        let reply = agent.process("I can't log in", "[]").await;
        assert_eq!(reply, json!({ "summary": "Login failure" }));
        assert_eq!(agent.name(), "summarizer");

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.model, "llama-3.3-70b-versatile");
        assert_eq!(request.messages[0].role, ChatRole::System);
        assert!(request.messages[0].content.starts_with("Summarize the issue.\nImportant:"));
        assert_eq!(request.messages[1].role, ChatRole::User);
        assert_eq!(request.messages[1].content, "Content: I can't log in\nContext: []");
        assert_eq!(request.temperature, 0.7);
        assert_eq!(request.top_p, 0.9);
        assert_eq!(request.max_tokens, 2048);
        assert!(!request.stream);
    }

    #[tokio::test]
    async fn custom_sampling_is_forwarded() {
        let client = ScriptedClient::new(Reply::Text("{}"));
        let agent = caller(client.clone())
            .with_sampling(Sampling { temperature: 0.2, top_p: 0.5, max_tokens: 256 });

        agent.process("x", "[]").await;
        let request = &client.requests()[0];
        assert_eq!((request.temperature, request.top_p, request.max_tokens), (0.2, 0.5, 256));
    }

    #[tokio::test]
    async fn double_encoded_reply_is_decoded() {
        let client = ScriptedClient::new(Reply::Text(r#""{\"actions\": []}""#));
        let reply = caller(client).process("x", "[]").await;
        assert_eq!(reply, json!({ "actions": [] }));
    }

    #[tokio::test]
    async fn malformed_json_becomes_invalid_format_mapping() {
        let client = ScriptedClient::new(Reply::Text("Sure! Here is the summary: login broken"));
        let reply = caller(client).process("x", "[]").await;

        assert_eq!(reply["error"], INVALID_JSON_ERROR);
        assert_eq!(reply["original_response"], "Sure! Here is the summary: login broken");
        assert!(reply["details"].as_str().is_some_and(|details| !details.is_empty()));
    }

    #[tokio::test]
    async fn malformed_inner_layer_is_also_invalid_format() {
        let client = ScriptedClient::new(Reply::Text(r#""not json inside""#));
        let reply = caller(client).process("x", "[]").await;
        assert_eq!(reply["error"], INVALID_JSON_ERROR);
    }

    #[tokio::test]
    async fn transport_and_shape_failures_become_processing_errors() {
        let limited = caller(ScriptedClient::new(Reply::RateLimited)).process("x", "[]").await;
        assert_eq!(limited["error"], PROCESSING_ERROR);
        assert_eq!(limited["suggestion"], "Please retry with a different query");
        assert!(limited["details"].as_str().is_some_and(|details| details.contains("429")));

        let array = caller(ScriptedClient::new(Reply::Text("[1, 2]"))).process("x", "[]").await;
        assert_eq!(array["error"], PROCESSING_ERROR);
        assert_eq!(array["details"], Value::from("expected a JSON object from the model, got an array"));
    }
}
