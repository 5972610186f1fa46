//! Ticket handler: runs the three agents over an issue and folds whatever they
//! return into a [`NormalizedResponse`].
//!
//! Each agent may independently ignore its prompt, so every reply is first
//! coerced into an object and then read field by field through the defaulting
//! accessors in [`crate::shape`]. Only a failure outside that defensive layer
//! (an agent task that panics, or a context that cannot be serialized)
//! produces a [`SystemFailure`].

use std::sync::Arc;

use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error};

use ticketflow_core::domain::conversation::{ContextTurn, ConversationId};
use ticketflow_core::domain::response::{
    ActionItem, NormalizedResponse, Priority, Recommendation, ResponseMetadata, Sentiment,
    Summary, SystemFailure, TicketOutcome,
};

use crate::agents::AgentSet;
use crate::caller::Agent;
use crate::shape::{
    as_text, coerce_confidence, coerce_object, decode_layers, object_field, string_list,
    text_field, JsonObject, DEFAULT_CONFIDENCE,
};

pub const DEFAULT_SUMMARY: &str = "Issue processed";
pub const DEFAULT_SOLUTION: &str = "Default solution";
pub const DEFAULT_ACTION_TYPE: &str = "General";
pub const DEFAULT_ACTION_PRIORITY: &str = "Medium";

const GREETING_MARKERS: [&str; 2] = ["hello", "hi"];

#[derive(Debug, Error)]
pub enum TicketError {
    #[error("could not serialize conversation context: {0}")]
    Context(#[source] serde_json::Error),
    #[error("{agent} agent task failed: {source}")]
    AgentTask {
        agent: String,
        #[source]
        source: tokio::task::JoinError,
    },
}

#[derive(Clone)]
pub struct TicketHandler {
    agents: AgentSet,
    greeting_shortcut: bool,
}

impl TicketHandler {
    pub fn new(agents: AgentSet) -> Self {
        Self { agents, greeting_shortcut: true }
    }

    pub fn with_greeting_shortcut(mut self, enabled: bool) -> Self {
        self.greeting_shortcut = enabled;
        self
    }

    pub async fn handle(&self, issue_text: &str, context: &[ContextTurn]) -> TicketOutcome {
        if self.greeting_shortcut && is_greeting(issue_text) {
            debug!(event_name = "ticket.greeting.short_circuit", "greeting answered without agents");
            return greeting_response().into();
        }

        match self.normalize(issue_text, context).await {
            Ok(response) => response.into(),
            Err(failure) => {
                error!(
                    event_name = "ticket.normalize.failed",
                    error = %failure,
                    "ticket normalization failed"
                );
                SystemFailure::new(failure.to_string()).into()
            }
        }
    }

    async fn normalize(
        &self,
        issue_text: &str,
        context: &[ContextTurn],
    ) -> Result<NormalizedResponse, TicketError> {
        let context = serde_json::to_string(context).map_err(TicketError::Context)?;
        debug!(
            event_name = "ticket.normalize.started",
            context_bytes = context.len(),
            "running support agents"
        );

        let summary = run_agent(&self.agents.summarizer, issue_text, &context).await?;
        let actions = run_agent(&self.agents.action_extractor, issue_text, &context).await?;
        let resolution = run_agent(&self.agents.resolver, issue_text, &context).await?;

        Ok(assemble(summary, actions, resolution))
    }
}

/// Runs one agent on its own task so a panicking implementation surfaces as a
/// `JoinError` instead of unwinding through the handler. Calls stay
/// sequential: each task is awaited before the next is spawned.
async fn run_agent(
    agent: &Arc<dyn Agent>,
    content: &str,
    context: &str,
) -> Result<Value, TicketError> {
    let agent = Arc::clone(agent);
    let name = agent.name().to_string();
    let content = content.to_string();
    let context = context.to_string();

    tokio::spawn(async move { agent.process(&content, &context).await })
        .await
        .map_err(|source| TicketError::AgentTask { agent: name, source })
}

pub fn is_greeting(issue_text: &str) -> bool {
    let lowered = issue_text.to_lowercase();
    GREETING_MARKERS.iter().any(|marker| lowered.contains(marker))
}

pub fn greeting_response() -> NormalizedResponse {
    NormalizedResponse {
        summary: Summary::text("Customer greeting received"),
        metadata: ResponseMetadata {
            sentiment: Sentiment::Positive,
            priority: Priority::Low,
            category: "greeting".to_string(),
            conversation_id: Some(ConversationId::generate().0),
        },
        actions: vec![ActionItem {
            action_type: "GreetingResponse".to_string(),
            description: "Provide welcome message".to_string(),
            priority: "high".to_string(),
        }],
        recommendation: Recommendation {
            solution: "Welcome to support! How can I help you today?".to_string(),
            confidence: 95,
            steps: vec!["Ask user to describe their issue".to_string()],
            resources: Vec::new(),
        },
        similar_cases: Vec::new(),
    }
}

fn summarizer_skeleton() -> JsonObject {
    into_object(json!({ "summary": "", "metadata": {} }))
}

fn actions_skeleton() -> JsonObject {
    into_object(json!({ "actions": [] }))
}

fn resolver_skeleton() -> JsonObject {
    into_object(json!({ "recommendation": {}, "similar_cases": [] }))
}

fn into_object(value: Value) -> JsonObject {
    match value {
        Value::Object(map) => map,
        _ => JsonObject::new(),
    }
}

/// Folds the three raw agent replies into the fixed response shape.
pub fn assemble(summary: Value, actions: Value, resolution: Value) -> NormalizedResponse {
    let summary = coerce_object(summary, "summary", summarizer_skeleton);
    let actions = coerce_object(actions, "actions", actions_skeleton);
    let resolution = coerce_object(resolution, "recommendation", resolver_skeleton);

    NormalizedResponse {
        summary: read_summary(summary.get("summary")),
        metadata: read_metadata(&summary),
        actions: read_actions(actions.get("actions")),
        recommendation: read_recommendation(&resolution),
        similar_cases: string_list(resolution.get("similar_cases")),
    }
}

fn read_summary(value: Option<&Value>) -> Summary {
    match value {
        None | Some(Value::Null) => Summary::text(DEFAULT_SUMMARY),
        Some(Value::Object(fields)) => Summary {
            text: text_field(fields, "text")
                .or_else(|| text_field(fields, "summary"))
                .unwrap_or_default(),
            category: text_field(fields, "category"),
        },
        Some(other) => Summary::text(as_text(other)),
    }
}

fn read_metadata(summary: &JsonObject) -> ResponseMetadata {
    let defaults = ResponseMetadata::default();
    let Some(fields) = object_field(summary, "metadata") else {
        return defaults;
    };

    ResponseMetadata {
        sentiment: text_field(&fields, "sentiment")
            .and_then(|label| Sentiment::from_label(&label))
            .unwrap_or(defaults.sentiment),
        priority: text_field(&fields, "priority")
            .and_then(|label| Priority::from_label(&label))
            .unwrap_or(defaults.priority),
        category: text_field(&fields, "category")
            .filter(|category| !category.trim().is_empty())
            .unwrap_or(defaults.category),
        conversation_id: text_field(&fields, "conversation_id"),
    }
}

fn read_actions(value: Option<&Value>) -> Vec<ActionItem> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().filter_map(read_action).collect(),
        Some(Value::String(raw)) => match decode_layers(raw) {
            Some(decoded @ (Value::Array(_) | Value::Object(_))) => read_actions(Some(&decoded)),
            _ => read_action(&Value::String(raw.clone())).into_iter().collect(),
        },
        Some(other) => read_action(other).into_iter().collect(),
    }
}

fn read_action(item: &Value) -> Option<ActionItem> {
    match item {
        Value::Null => None,
        Value::String(text) if text.trim().is_empty() => None,
        Value::Object(fields) => Some(ActionItem {
            action_type: text_field(fields, "type")
                .unwrap_or_else(|| DEFAULT_ACTION_TYPE.to_string()),
            description: text_field(fields, "description").unwrap_or_else(|| item.to_string()),
            priority: text_field(fields, "priority")
                .unwrap_or_else(|| DEFAULT_ACTION_PRIORITY.to_string()),
        }),
        other => Some(ActionItem {
            action_type: DEFAULT_ACTION_TYPE.to_string(),
            description: as_text(other),
            priority: DEFAULT_ACTION_PRIORITY.to_string(),
        }),
    }
}

fn read_recommendation(resolution: &JsonObject) -> Recommendation {
    if let Some(fields) = object_field(resolution, "recommendation") {
        return Recommendation {
            solution: text_field(&fields, "solution")
                .unwrap_or_else(|| DEFAULT_SOLUTION.to_string()),
            confidence: coerce_confidence(fields.get("confidence")),
            steps: string_list(fields.get("steps")),
            resources: string_list(fields.get("resources")),
        };
    }

    let solution = resolution
        .get("recommendation")
        .map(as_text)
        .filter(|text| !text.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SOLUTION.to_string());

    Recommendation {
        solution,
        confidence: DEFAULT_CONFIDENCE,
        steps: Vec::new(),
        resources: Vec::new(),
    }
}
