//! Support agents and the ticket pipeline built on them.
//!
//! An issue flows through three prompted model calls (summarizer, action
//! extractor, resolver). Their replies are untrusted JSON; the ticket handler
//! folds them into a fixed-shape [`NormalizedResponse`] no matter what the
//! models return.
//!
//! # Modules
//!
//! - `llm` / `client` - completion request types and the HTTP client for
//!   OpenAI-compatible endpoints
//! - `caller` - one prompted agent call, with JSON parsing and error mappings
//! - `handler` - greeting short-circuit, agent sequencing and normalization
//! - `format` - plain-text rendering of a response
//! - `runtime` - `SupportDesk`, the ticket and conversation service
//!
//! [`NormalizedResponse`]: ticketflow_core::NormalizedResponse

pub mod agents;
pub mod caller;
pub mod client;
pub mod format;
pub mod handler;
pub mod llm;
pub mod prompts;
pub mod runtime;
pub mod shape;

pub use agents::AgentSet;
pub use caller::{Agent, AgentCaller, AgentFailure, Sampling};
pub use client::ChatCompletionClient;
pub use format::{format_outcome, format_response};
pub use handler::{TicketError, TicketHandler};
pub use llm::{ChatMessage, ChatRole, CompletionRequest, LlmClient, LlmError};
pub use runtime::{ChatTurn, DeskMetrics, Disposition, Submission, SupportDesk, TicketSuggestion};
