use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;

use ticketflow_core::domain::conversation::{Conversation, ConversationId};
use ticketflow_core::domain::ticket::{Ticket, TicketId};

use super::{ConversationRepository, RepositoryError, TicketRepository};

/// Serialized JSON documents keyed by record id.
#[derive(Default)]
struct JsonRecords {
    records: RwLock<HashMap<String, String>>,
}

impl JsonRecords {
    async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, RepositoryError> {
        let records = self.records.read().await;
        records.get(key).map(|raw| decode(key, raw)).transpose()
    }

    async fn put<T: Serialize>(&self, key: &str, record: &T) -> Result<(), RepositoryError> {
        let raw = serde_json::to_string(record).map_err(RepositoryError::Encode)?;
        let mut records = self.records.write().await;
        records.insert(key.to_string(), raw);
        Ok(())
    }

    async fn all<T: DeserializeOwned>(&self) -> Result<Vec<T>, RepositoryError> {
        let records = self.records.read().await;
        records.iter().map(|(key, raw)| decode(key, raw)).collect()
    }

    #[cfg(test)]
    async fn put_raw(&self, key: &str, raw: &str) {
        self.records.write().await.insert(key.to_string(), raw.to_string());
    }
}

fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> Result<T, RepositoryError> {
    serde_json::from_str(raw)
        .map_err(|source| RepositoryError::Decode { key: key.to_string(), source })
}

#[derive(Default)]
pub struct InMemoryTicketRepository {
    records: JsonRecords,
}

#[async_trait::async_trait]
impl TicketRepository for InMemoryTicketRepository {
    async fn find_by_id(&self, id: &TicketId) -> Result<Option<Ticket>, RepositoryError> {
        self.records.get(&id.0).await
    }

    async fn save(&self, ticket: Ticket) -> Result<(), RepositoryError> {
        self.records.put(&ticket.id.0, &ticket).await
    }

    async fn list(&self) -> Result<Vec<Ticket>, RepositoryError> {
        let mut tickets: Vec<Ticket> = self.records.all().await?;
        tickets.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(tickets)
    }
}

#[derive(Default)]
pub struct InMemoryConversationRepository {
    records: JsonRecords,
}

#[async_trait::async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn find_by_id(
        &self,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        self.records.get(&id.0).await
    }

    async fn find_latest_for_customer(
        &self,
        customer_name: &str,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let conversations: Vec<Conversation> = self.records.all().await?;
        Ok(conversations
            .into_iter()
            .filter(|conversation| conversation.customer_name == customer_name)
            .max_by(|a, b| a.last_updated.cmp(&b.last_updated)))
    }

    async fn save(&self, conversation: Conversation) -> Result<(), RepositoryError> {
        self.records.put(&conversation.id.0, &conversation).await
    }
}
