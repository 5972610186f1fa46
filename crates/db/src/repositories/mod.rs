use async_trait::async_trait;
use thiserror::Error;

use ticketflow_core::domain::conversation::{Conversation, ConversationId};
use ticketflow_core::domain::ticket::{Ticket, TicketId};
use ticketflow_core::errors::ApplicationError;

pub mod memory;

pub use memory::{InMemoryConversationRepository, InMemoryTicketRepository};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("encode error: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("decode error for record `{key}`: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        ApplicationError::Persistence(value.to_string())
    }
}

#[async_trait]
pub trait TicketRepository: Send + Sync {
    async fn find_by_id(&self, id: &TicketId) -> Result<Option<Ticket>, RepositoryError>;
    async fn save(&self, ticket: Ticket) -> Result<(), RepositoryError>;
    /// All tickets, oldest first.
    async fn list(&self) -> Result<Vec<Ticket>, RepositoryError>;
}

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn find_by_id(
        &self,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError>;
    async fn find_latest_for_customer(
        &self,
        customer_name: &str,
    ) -> Result<Option<Conversation>, RepositoryError>;
    async fn save(&self, conversation: Conversation) -> Result<(), RepositoryError>;
}
