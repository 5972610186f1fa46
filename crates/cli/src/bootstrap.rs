use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use ticketflow_agent::{AgentSet, ChatCompletionClient, LlmClient, LlmError, SupportDesk, TicketHandler};
use ticketflow_core::audit::InMemoryAuditSink;
use ticketflow_core::config::{AppConfig, ConfigError, LoadOptions};
use ticketflow_db::repositories::{InMemoryConversationRepository, InMemoryTicketRepository};

pub struct Application {
    pub config: AppConfig,
    pub desk: SupportDesk,
    pub audit: InMemoryAuditSink,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to build llm client: {0}")]
    Client(#[source] LlmError),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let client = ChatCompletionClient::from_config(&config.llm).map_err(BootstrapError::Client)?;
    info!(
        event_name = "system.bootstrap.llm_client_ready",
        correlation_id = "bootstrap",
        provider = config.llm.provider.as_str(),
        endpoint = client.base_url(),
        model = %config.llm.model,
        "completion client initialized"
    );
    Ok(bootstrap_with_client(config, Arc::new(client)))
}

impl Application {
    /// Emits the audit trail collected during this run as tracing events.
    pub fn flush_audit(&self) {
        for event in self.audit.events() {
            info!(
                event_name = "audit.event",
                correlation_id = %event.correlation_id,
                audit_event = %event.event_type,
                category = ?event.category,
                outcome = ?event.outcome,
                ticket_id = event.ticket_id.as_ref().map(|id| id.0.as_str()).unwrap_or("none"),
                conversation_id =
                    event.conversation_id.as_ref().map(|id| id.0.as_str()).unwrap_or("none"),
                metadata = ?event.metadata,
                "audit event recorded"
            );
        }
    }
}

/// Wires the support desk over in-memory stores and the given client.
pub fn bootstrap_with_client(config: AppConfig, client: Arc<dyn LlmClient>) -> Application {
    let agents = AgentSet::from_config(&config, client);
    let handler =
        TicketHandler::new(agents).with_greeting_shortcut(config.pipeline.greeting_shortcut);
    let audit = InMemoryAuditSink::default();
    let desk = SupportDesk::new(
        handler,
        Arc::new(InMemoryTicketRepository::default()),
        Arc::new(InMemoryConversationRepository::default()),
        Arc::new(audit.clone()),
    )
    .with_instant_resolution_threshold(config.pipeline.instant_resolution_threshold)
    .with_context_turns(config.pipeline.context_turns);

    Application { config, desk, audit }
}
