pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;

pub use audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink};
pub use domain::conversation::{
    ContextTurn, Conversation, ConversationId, ConversationMessage, MessageRole,
};
pub use domain::response::{
    ActionItem, NormalizedResponse, Priority, Recommendation, ResponseMetadata, Sentiment,
    Summary, SystemFailure, TicketOutcome,
};
pub use domain::ticket::{Ticket, TicketId, TicketStatus};
pub use errors::{ApplicationError, DomainError, InterfaceError};
