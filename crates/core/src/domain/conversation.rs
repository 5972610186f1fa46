use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    /// `conv_` followed by eight lowercase hex digits.
    pub fn generate() -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        Self(format!("conv_{}", &hex[..8]))
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Bot,
    Analysis,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Bot => "bot",
            Self::Analysis => "analysis",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub text: String,
    pub role: MessageRole,
    pub sent_at: DateTime<Utc>,
}

/// One prior turn handed to the ticket handler as context.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextTurn {
    pub role: String,
    pub content: String,
}

impl ContextTurn {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self { role: role.into(), content: content.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub customer_name: String,
    pub messages: Vec<ConversationMessage>,
    pub last_updated: DateTime<Utc>,
}

impl Conversation {
    pub fn start(customer_name: impl Into<String>) -> Self {
        Self {
            id: ConversationId::generate(),
            customer_name: customer_name.into(),
            messages: Vec::new(),
            last_updated: Utc::now(),
        }
    }

    pub fn append(&mut self, role: MessageRole, text: impl Into<String>) {
        let sent_at = Utc::now();
        self.messages.push(ConversationMessage { text: text.into(), role, sent_at });
        self.last_updated = sent_at;
    }

    /// The last `limit` user and bot turns, oldest first. Analysis records
    /// are internal and are not replayed to the agents.
    pub fn context(&self, limit: usize) -> Vec<ContextTurn> {
        let turns: Vec<&ConversationMessage> = self
            .messages
            .iter()
            .filter(|message| message.role != MessageRole::Analysis)
            .collect();
        let skip = turns.len().saturating_sub(limit);

        turns
            .into_iter()
            .skip(skip)
            .map(|message| ContextTurn::new(message.role.as_str(), message.text.clone()))
            .collect()
    }
}
