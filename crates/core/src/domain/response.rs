//! The normalized response contract shared by the ticket handler, the record
//! store and every display surface.
//!
//! Model output arrives as loosely shaped JSON; by the time it is turned into
//! a [`NormalizedResponse`] every field has a concrete type, so consumers never
//! need to re-check shapes.

use serde::{Deserialize, Serialize};

pub const MAX_CONFIDENCE: u8 = 100;

pub const SYSTEM_FAILURE_ERROR: &str = "System failure";
pub const SYSTEM_FAILURE_RESPONSE: &str = "I'm experiencing technical difficulties. Your issue has been logged and our team will investigate.";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl Sentiment {
    /// Lenient, case-insensitive match against a model-supplied label.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(Self::Positive),
            "negative" => Some(Self::Negative),
            "neutral" => Some(Self::Neutral),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    #[default]
    Low,
}

impl Priority {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "critical" | "urgent" | "high" => Some(Self::High),
            "medium" | "normal" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Summary {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), category: None }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub sentiment: Sentiment,
    pub priority: Priority,
    pub category: String,
    pub conversation_id: Option<String>,
}

impl Default for ResponseMetadata {
    fn default() -> Self {
        Self {
            sentiment: Sentiment::Neutral,
            priority: Priority::Low,
            category: "general inquiry".to_string(),
            conversation_id: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionItem {
    #[serde(rename = "type")]
    pub action_type: String,
    pub description: String,
    pub priority: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub solution: String,
    pub confidence: u8,
    pub steps: Vec<String>,
    pub resources: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedResponse {
    pub summary: Summary,
    pub metadata: ResponseMetadata,
    pub actions: Vec<ActionItem>,
    pub recommendation: Recommendation,
    pub similar_cases: Vec<String>,
}

/// Returned only when normalization itself broke down. Serializes with a
/// top-level `error` key so callers can tell it apart from a normal response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemFailure {
    pub error: String,
    pub details: String,
    pub response: String,
}

impl SystemFailure {
    pub fn new(details: impl Into<String>) -> Self {
        Self {
            error: SYSTEM_FAILURE_ERROR.to_string(),
            details: details.into(),
            response: SYSTEM_FAILURE_RESPONSE.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TicketOutcome {
    Failed(SystemFailure),
    Normalized(NormalizedResponse),
}

impl TicketOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn response(&self) -> Option<&NormalizedResponse> {
        match self {
            Self::Normalized(response) => Some(response),
            Self::Failed(_) => None,
        }
    }

    pub fn confidence(&self) -> Option<u8> {
        self.response().map(|response| response.recommendation.confidence)
    }
}

impl From<NormalizedResponse> for TicketOutcome {
    fn from(value: NormalizedResponse) -> Self {
        Self::Normalized(value)
    }
}

impl From<SystemFailure> for TicketOutcome {
    fn from(value: SystemFailure) -> Self {
        Self::Failed(value)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        NormalizedResponse, Priority, Recommendation, ResponseMetadata, Sentiment, Summary,
        SystemFailure, TicketOutcome,
    };

    fn response_fixture() -> NormalizedResponse {
        NormalizedResponse {
            summary: Summary::text("Login failure"),
            metadata: ResponseMetadata::default(),
            actions: Vec::new(),
            recommendation: Recommendation {
                solution: "Reset password".to_string(),
                confidence: 80,
                steps: vec!["Click reset link".to_string()],
                resources: Vec::new(),
            },
            similar_cases: Vec::new(),
        }
    }

    #[test]
    fn labels_are_matched_case_insensitively() {
        assert_eq!(Sentiment::from_label(" Negative "), Some(Sentiment::Negative));
        assert_eq!(Sentiment::from_label("furious"), None);
        assert_eq!(Priority::from_label("CRITICAL"), Some(Priority::High));
        assert_eq!(Priority::from_label("Medium"), Some(Priority::Medium));
        assert_eq!(Priority::from_label("whenever"), None);
    }

    #[test]
    fn summary_category_is_omitted_when_absent() {
        let value = serde_json::to_value(Summary::text("hi")).expect("serialize summary");
        assert_eq!(value, json!({ "text": "hi" }));
    }

    #[test]
    fn failure_outcome_serializes_with_error_key() {
        let outcome = TicketOutcome::from(SystemFailure::new("agent task aborted"));
        let value = serde_json::to_value(&outcome).expect("serialize outcome");

        assert_eq!(value["error"], "System failure");
        assert_eq!(value["details"], "agent task aborted");
        assert!(value["response"].as_str().unwrap_or_default().contains("technical difficulties"));
        assert!(outcome.is_failure());
        assert_eq!(outcome.confidence(), None);
    }

    #[test]
    fn outcome_deserializes_back_into_the_matching_variant() {
        let normalized = TicketOutcome::from(response_fixture());
        let encoded = serde_json::to_string(&normalized).expect("serialize");
        let decoded: TicketOutcome = serde_json::from_str(&encoded).expect("deserialize");
        assert_eq!(decoded, normalized);
        assert_eq!(decoded.confidence(), Some(80));

        let failed = TicketOutcome::from(SystemFailure::new("boom"));
        let encoded = serde_json::to_string(&failed).expect("serialize");
        let decoded: TicketOutcome = serde_json::from_str(&encoded).expect("deserialize");
        assert!(decoded.is_failure());
    }

    #[test]
    fn metadata_serializes_lowercase_enums_and_null_conversation() {
        let value = serde_json::to_value(ResponseMetadata::default()).expect("serialize");
        assert_eq!(
            value,
            json!({
                "sentiment": "neutral",
                "priority": "low",
                "category": "general inquiry",
                "conversation_id": null
            })
        );
    }
}
