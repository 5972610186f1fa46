//! Record store for tickets and conversations.
//!
//! The pipeline treats storage as opaque: records are written as serialized
//! JSON documents keyed by identifier. The in-memory implementations here back
//! the CLI and the test suites; a durable backend only needs to implement the
//! repository traits.

pub mod repositories;

pub use repositories::{
    ConversationRepository, InMemoryConversationRepository, InMemoryTicketRepository,
    RepositoryError, TicketRepository,
};
