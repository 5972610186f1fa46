use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use ticketflow_core::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink};
use ticketflow_core::domain::conversation::{Conversation, ConversationId, MessageRole};
use ticketflow_core::domain::response::TicketOutcome;
use ticketflow_core::domain::ticket::{Ticket, TicketId, TicketStatus};
use ticketflow_core::errors::ApplicationError;
use ticketflow_db::repositories::{ConversationRepository, TicketRepository};

use crate::format::format_outcome;
use crate::handler::TicketHandler;

pub const NO_VALID_INPUT: &str = "No valid input provided";
pub const DEFAULT_INSTANT_RESOLUTION_THRESHOLD: u8 = 95;
pub const DEFAULT_CONTEXT_TURNS: usize = 5;

const ACTOR: &str = "support-desk";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    ResolvedInstantly,
    QueuedForReview,
}

impl Disposition {
    pub fn for_outcome(outcome: &TicketOutcome, threshold: u8) -> Self {
        match outcome.confidence() {
            Some(confidence) if confidence >= threshold => Self::ResolvedInstantly,
            _ => Self::QueuedForReview,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::ResolvedInstantly => "Resolved instantly",
            Self::QueuedForReview => "Ticket submitted for further review",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Submission {
    pub ticket: Ticket,
    pub outcome: TicketOutcome,
    pub disposition: Disposition,
}

#[derive(Clone, Debug, Serialize)]
pub struct ChatTurn {
    pub conversation_id: ConversationId,
    pub outcome: TicketOutcome,
    pub reply: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DeskMetrics {
    pub total_tickets: usize,
    pub active_tickets: usize,
    pub resolution_rate: f64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TicketSuggestion {
    pub ticket_id: TicketId,
    pub customer_name: String,
    pub suggestion: String,
}

/// Ticket and conversation service over the ticket handler and the record
/// store.
pub struct SupportDesk {
    handler: TicketHandler,
    tickets: Arc<dyn TicketRepository>,
    conversations: Arc<dyn ConversationRepository>,
    audit: Arc<dyn AuditSink>,
    instant_resolution_threshold: u8,
    context_turns: usize,
}

impl SupportDesk {
    pub fn new(
        handler: TicketHandler,
        tickets: Arc<dyn TicketRepository>,
        conversations: Arc<dyn ConversationRepository>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            handler,
            tickets,
            conversations,
            audit,
            instant_resolution_threshold: DEFAULT_INSTANT_RESOLUTION_THRESHOLD,
            context_turns: DEFAULT_CONTEXT_TURNS,
        }
    }

    pub fn with_instant_resolution_threshold(mut self, threshold: u8) -> Self {
        self.instant_resolution_threshold = threshold;
        self
    }

    pub fn with_context_turns(mut self, turns: usize) -> Self {
        self.context_turns = turns;
        self
    }

    pub async fn submit_ticket(
        &self,
        customer_name: &str,
        issue_text: &str,
    ) -> Result<Submission, ApplicationError> {
        let correlation_id = new_correlation_id();
        let customer_name = customer_name.trim();
        if customer_name.is_empty() || issue_text.trim().is_empty() {
            self.audit.emit(
                AuditEvent::new(
                    &correlation_id,
                    "ticket.submit.rejected",
                    AuditCategory::Intake,
                    ACTOR,
                    AuditOutcome::Rejected,
                )
                .with_metadata("reason", NO_VALID_INPUT),
            );
            return Err(ApplicationError::InvalidInput(NO_VALID_INPUT.to_string()));
        }

        let mut ticket = Ticket::new(customer_name, issue_text);
        self.tickets.save(ticket.clone()).await?;
        self.audit.emit(
            AuditEvent::new(
                &correlation_id,
                "ticket.submitted",
                AuditCategory::Intake,
                ACTOR,
                AuditOutcome::Success,
            )
            .for_ticket(&ticket.id)
            .with_metadata("customer_name", customer_name),
        );

        let outcome = self.handler.handle(issue_text, &[]).await;
        self.record_outcome(&mut ticket, outcome.clone(), &correlation_id).await?;

        let disposition = Disposition::for_outcome(&outcome, self.instant_resolution_threshold);
        info!(
            event_name = "ticket.submitted",
            correlation_id = %correlation_id,
            ticket_id = %ticket.id,
            status = ticket.status.as_str(),
            disposition = disposition.message(),
            "ticket submitted"
        );
        Ok(Submission { ticket, outcome, disposition })
    }

    /// Re-runs normalization for a stored ticket.
    pub async fn process_ticket(&self, id: &TicketId) -> Result<Submission, ApplicationError> {
        let correlation_id = new_correlation_id();
        let mut ticket = self.require_ticket(id).await?;

        let outcome = self.handler.handle(&ticket.issue_text, &[]).await;
        self.record_outcome(&mut ticket, outcome.clone(), &correlation_id).await?;

        let disposition = Disposition::for_outcome(&outcome, self.instant_resolution_threshold);
        info!(
            event_name = "ticket.processed",
            correlation_id = %correlation_id,
            ticket_id = %ticket.id,
            status = ticket.status.as_str(),
            "ticket reprocessed"
        );
        Ok(Submission { ticket, outcome, disposition })
    }

    /// One chat turn. The customer's latest conversation is continued, or a
    /// new one is started; its most recent turns are the context for this
    /// one. The analysis is tagged with the conversation it belongs to.
    pub async fn chat(
        &self,
        customer_name: &str,
        message: &str,
    ) -> Result<ChatTurn, ApplicationError> {
        let correlation_id = new_correlation_id();
        let customer_name = customer_name.trim();
        if customer_name.is_empty() || message.trim().is_empty() {
            return Err(ApplicationError::InvalidInput(
                "Missing required fields: message or customer_name".to_string(),
            ));
        }

        let mut conversation = match self.conversations.find_latest_for_customer(customer_name).await? {
            Some(conversation) => conversation,
            None => {
                let conversation = Conversation::start(customer_name);
                self.audit.emit(
                    AuditEvent::new(
                        &correlation_id,
                        "conversation.started",
                        AuditCategory::Conversation,
                        ACTOR,
                        AuditOutcome::Success,
                    )
                    .for_conversation(&conversation.id),
                );
                conversation
            }
        };

        let context = conversation.context(self.context_turns);
        let mut outcome = self.handler.handle(message, &context).await;
        if let TicketOutcome::Normalized(response) = &mut outcome {
            response.metadata.conversation_id = Some(conversation.id.0.clone());
        }
        let reply = format_outcome(&outcome);
        let analysis = serde_json::to_string(&outcome)
            .map_err(|error| ApplicationError::Persistence(error.to_string()))?;

        conversation.append(MessageRole::User, message);
        conversation.append(MessageRole::Bot, reply.clone());
        conversation.append(MessageRole::Analysis, analysis);
        self.conversations.save(conversation.clone()).await?;

        if let TicketOutcome::Failed(failure) = &outcome {
            self.audit.emit(
                AuditEvent::new(
                    &correlation_id,
                    "conversation.normalize.failed",
                    AuditCategory::Normalization,
                    ACTOR,
                    AuditOutcome::Failed,
                )
                .for_conversation(&conversation.id)
                .with_metadata("details", failure.details.clone()),
            );
        }

        info!(
            event_name = "conversation.turn.completed",
            correlation_id = %correlation_id,
            conversation_id = %conversation.id,
            context_turns = context.len(),
            "chat turn completed"
        );
        Ok(ChatTurn { conversation_id: conversation.id, outcome, reply })
    }

    /// Tickets whose issue text contains `query`, ignoring case. A blank
    /// query returns every ticket. Oldest first.
    pub async fn search_tickets(&self, query: Option<&str>) -> Result<Vec<Ticket>, ApplicationError> {
        let tickets = self.tickets.list().await?;
        let Some(needle) = query.map(str::trim).filter(|query| !query.is_empty()) else {
            return Ok(tickets);
        };

        let needle = needle.to_lowercase();
        Ok(tickets
            .into_iter()
            .filter(|ticket| ticket.issue_text.to_lowercase().contains(&needle))
            .collect())
    }

    pub async fn update_status(
        &self,
        id: &TicketId,
        status: TicketStatus,
    ) -> Result<Ticket, ApplicationError> {
        let correlation_id = new_correlation_id();
        let mut ticket = self.require_ticket(id).await?;
        let previous = ticket.status;

        if let Err(error) = ticket.transition_to(status) {
            self.audit.emit(
                AuditEvent::new(
                    &correlation_id,
                    "ticket.status.rejected",
                    AuditCategory::Intake,
                    ACTOR,
                    AuditOutcome::Rejected,
                )
                .for_ticket(id)
                .with_metadata("from", previous.as_str())
                .with_metadata("to", status.as_str()),
            );
            return Err(error.into());
        }

        self.tickets.save(ticket.clone()).await?;
        self.audit.emit(
            AuditEvent::new(
                &correlation_id,
                "ticket.status.updated",
                AuditCategory::Intake,
                ACTOR,
                AuditOutcome::Success,
            )
            .for_ticket(id)
            .with_metadata("from", previous.as_str())
            .with_metadata("to", status.as_str()),
        );
        Ok(ticket)
    }

    pub async fn metrics(&self) -> Result<DeskMetrics, ApplicationError> {
        let tickets = self.tickets.list().await?;
        let total = tickets.len();
        let resolved = tickets.iter().filter(|ticket| ticket.status == TicketStatus::Resolved).count();
        let rate = resolved as f64 / total.max(1) as f64 * 100.0;

        Ok(DeskMetrics {
            total_tickets: total,
            active_tickets: total - resolved,
            resolution_rate: (rate * 100.0).round() / 100.0,
        })
    }

    /// Routing hints for tickets still waiting on a first response.
    pub async fn suggestions(&self) -> Result<Vec<TicketSuggestion>, ApplicationError> {
        let tickets = self.tickets.list().await?;
        Ok(tickets
            .into_iter()
            .filter(|ticket| ticket.status == TicketStatus::Pending)
            .map(|ticket| TicketSuggestion {
                suggestion: routing_suggestion(&ticket.issue_text).to_string(),
                ticket_id: ticket.id,
                customer_name: ticket.customer_name,
            })
            .collect())
    }

    async fn require_ticket(&self, id: &TicketId) -> Result<Ticket, ApplicationError> {
        self.tickets
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApplicationError::NotFound(format!("ticket {id}")))
    }

    async fn record_outcome(
        &self,
        ticket: &mut Ticket,
        outcome: TicketOutcome,
        correlation_id: &str,
    ) -> Result<(), ApplicationError> {
        if let TicketOutcome::Failed(failure) = &outcome {
            warn!(
                event_name = "ticket.normalize.failed",
                correlation_id = %correlation_id,
                ticket_id = %ticket.id,
                details = %failure.details,
                "ticket left pending after normalization failure"
            );
            self.audit.emit(
                AuditEvent::new(
                    correlation_id,
                    "ticket.normalize.failed",
                    AuditCategory::Normalization,
                    ACTOR,
                    AuditOutcome::Failed,
                )
                .for_ticket(&ticket.id)
                .with_metadata("details", failure.details.clone()),
            );
        }

        ticket.apply_outcome(outcome, self.instant_resolution_threshold);
        self.tickets.save(ticket.clone()).await?;
        Ok(())
    }
}

pub fn routing_suggestion(issue_text: &str) -> &'static str {
    if issue_text.to_lowercase().contains("technical") {
        "Escalate to technical team"
    } else {
        "Assign to general support"
    }
}

fn new_correlation_id() -> String {
    format!("req_{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use ticketflow_core::audit::{AuditOutcome, InMemoryAuditSink};
    use ticketflow_core::domain::response::TicketOutcome;
    use ticketflow_core::domain::ticket::{Ticket, TicketId, TicketStatus};
    use ticketflow_core::errors::{ApplicationError, DomainError};
    use ticketflow_db::repositories::{
        ConversationRepository, InMemoryConversationRepository, InMemoryTicketRepository,
        TicketRepository,
    };

    use super::{routing_suggestion, Disposition, SupportDesk};
    use crate::agents::AgentSet;
    use crate::caller::Agent;
    use crate::handler::TicketHandler;

    struct ScriptedAgent {
        name: &'static str,
        reply: Value,
        contexts: Mutex<Vec<String>>,
    }

    impl ScriptedAgent {
        fn new(name: &'static str, reply: Value) -> Arc<Self> {
            Arc::new(Self { name, reply, contexts: Mutex::new(Vec::new()) })
        }
    }

    #[async_trait]
    impl Agent for ScriptedAgent {
        fn name(&self) -> &str {
            self.name
        }

        async fn process(&self, _content: &str, context: &str) -> Value {
            self.contexts.lock().expect("context lock").push(context.to_string());
            self.reply.clone()
        }
    }

    struct BrokenAgent;

    #[async_trait]
    impl Agent for BrokenAgent {
        fn name(&self) -> &str {
            "resolver"
        }

        async fn process(&self, _content: &str, _context: &str) -> Value {
            panic!("resolver crashed")
        }
    }

    struct Fixture {
        desk: SupportDesk,
        tickets: Arc<InMemoryTicketRepository>,
        conversations: Arc<InMemoryConversationRepository>,
        audit: InMemoryAuditSink,
        summarizer: Arc<ScriptedAgent>,
    }

    fn fixture_with(resolver: Arc<dyn Agent>, priority: &str) -> Fixture {
        let summarizer = ScriptedAgent::new(
            "summarizer",
            json!({ "summary": "Printer jams", "metadata": { "priority": priority } }),
        );
        let agents = AgentSet::new(
            summarizer.clone(),
            ScriptedAgent::new("action_extractor", json!({ "actions": ["Clear the tray"] })),
            resolver,
        );
        let tickets = Arc::new(InMemoryTicketRepository::default());
        let conversations = Arc::new(InMemoryConversationRepository::default());
        let audit = InMemoryAuditSink::default();
        let desk = SupportDesk::new(
            TicketHandler::new(agents),
            tickets.clone(),
            conversations.clone(),
            Arc::new(audit.clone()),
        );
        Fixture { desk, tickets, conversations, audit, summarizer }
    }

    fn fixture(confidence: u8, priority: &str) -> Fixture {
        let resolver = ScriptedAgent::new(
            "resolver",
            json!({ "recommendation": { "solution": "Clear the paper path", "confidence": confidence } }),
        );
        fixture_with(resolver, priority)
    }

    #[tokio::test]
    async fn confident_submission_resolves_instantly() {
        let fixture = fixture(97, "low");

        let submission = fixture
            .desk
            .submit_ticket("ada", "Printer jams on every page")
            .await
            .expect("submit ticket");

        assert_eq!(submission.disposition, Disposition::ResolvedInstantly);
        assert_eq!(submission.disposition.message(), "Resolved instantly");
        assert_eq!(submission.ticket.status, TicketStatus::Resolved);
        let stored = fixture
            .tickets
            .find_by_id(&submission.ticket.id)
            .await
            .expect("lookup")
            .expect("stored ticket");
        assert_eq!(stored.ai_response, Some(submission.outcome.clone()));
        assert_eq!(stored.status, TicketStatus::Resolved);
    }

    #[tokio::test]
    async fn uncertain_high_priority_submission_is_urgent_and_queued() {
        let urgent = fixture(40, "high");

        let submission =
            urgent.desk.submit_ticket("ada", "Printer jams on every page").await.expect("submit");

        assert_eq!(submission.disposition, Disposition::QueuedForReview);
        assert_eq!(submission.ticket.status, TicketStatus::Urgent);

        let medium = fixture(40, "medium");
        let queued = medium.desk.submit_ticket("ada", "Printer jams again").await.expect("submit");
        assert_eq!(queued.ticket.status, TicketStatus::InProgress);
    }

    #[tokio::test]
    async fn threshold_is_configurable() {
        let mut fixture = fixture(90, "low");
        fixture.desk = fixture.desk.with_instant_resolution_threshold(90);

        let submission = fixture.desk.submit_ticket("ada", "Printer jams").await.expect("submit");
        assert_eq!(submission.disposition, Disposition::ResolvedInstantly);
    }

    #[tokio::test]
    async fn blank_input_is_rejected_and_audited() {
        let fixture = fixture(97, "low");

        let error = fixture.desk.submit_ticket("ada", "   ").await.expect_err("blank text");
        assert_eq!(error, ApplicationError::InvalidInput("No valid input provided".to_string()));
        let error = fixture.desk.submit_ticket("", "Printer jams").await.expect_err("no customer");
        assert!(matches!(error, ApplicationError::InvalidInput(_)));

        assert!(fixture.tickets.list().await.expect("list").is_empty());
        let events = fixture.audit.events();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|event| event.outcome == AuditOutcome::Rejected));
    }

    #[tokio::test]
    async fn normalization_failure_leaves_ticket_pending_and_logs_failure() {
        let fixture = fixture_with(Arc::new(BrokenAgent), "low");

        let submission =
            fixture.desk.submit_ticket("ada", "Printer jams on every page").await.expect("submit");

        assert!(submission.outcome.is_failure());
        assert_eq!(submission.ticket.status, TicketStatus::Pending);
        assert_eq!(submission.disposition, Disposition::QueuedForReview);

        let failures = fixture.audit.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].event_type, "ticket.normalize.failed");
        assert_eq!(failures[0].ticket_id.as_ref(), Some(&submission.ticket.id));
        assert!(failures[0].metadata.get("details").is_some_and(|details| details.contains("resolver")));
    }

    #[tokio::test]
    async fn chat_reuses_conversation_and_grows_context() {
        let fixture = fixture(60, "low");

        let first = fixture.desk.chat("grace", "Printer jams").await.expect("first turn");
        let second = fixture.desk.chat("grace", "Still jammed").await.expect("second turn");

        assert_eq!(first.conversation_id, second.conversation_id);
        assert!(first.conversation_id.0.starts_with("conv_"));
        assert!(first.reply.contains("📝 Summary: Printer jams"));
        assert!(first.reply.contains("✅ Solution: Clear the paper path (Confidence: 60%)"));

        let contexts = fixture.summarizer.contexts.lock().expect("context lock").clone();
        assert_eq!(contexts[0], "[]");
        let replayed: Value = serde_json::from_str(&contexts[1]).expect("context json");
        assert_eq!(replayed.as_array().map(Vec::len), Some(2));
        assert_eq!(replayed[0], json!({ "role": "user", "content": "Printer jams" }));
        assert_eq!(replayed[1]["role"], "bot");
        assert_eq!(replayed[1]["content"], Value::from(first.reply.clone()));

        let stored = fixture
            .conversations
            .find_by_id(&first.conversation_id)
            .await
            .expect("lookup")
            .expect("conversation stored");
        assert_eq!(stored.messages.len(), 6);
        let analysis: TicketOutcome =
            serde_json::from_str(&stored.messages[2].text).expect("analysis json");
        assert_eq!(analysis, first.outcome);
        let tagged = first
            .outcome
            .response()
            .and_then(|response| response.metadata.conversation_id.clone());
        assert_eq!(tagged, Some(first.conversation_id.0.clone()));
    }

    #[tokio::test]
    async fn chat_replays_only_the_most_recent_turns() {
        let fixture = fixture(60, "low");
        let desk = fixture.desk.with_context_turns(3);

        for turn in 1..=5 {
            desk.chat("grace", &format!("Printer jam number {turn}")).await.expect("chat turn");
        }

        let contexts = fixture.summarizer.contexts.lock().expect("context lock").clone();
        assert_eq!(contexts.len(), 5);
        let last: Value = serde_json::from_str(&contexts[4]).expect("context json");
        let turns = last.as_array().cloned().unwrap_or_default();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0]["role"], "bot");
        assert_eq!(turns[1], json!({ "role": "user", "content": "Printer jam number 4" }));
        assert_eq!(turns[2]["role"], "bot");
    }

    #[tokio::test]
    async fn greeting_in_chat_carries_the_real_conversation_id() {
        let fixture = fixture(60, "low");

        let turn = fixture.desk.chat("grace", "hello").await.expect("greeting turn");

        let response = turn.outcome.response().expect("normalized greeting");
        assert_eq!(response.metadata.category, "greeting");
        assert_eq!(
            response.metadata.conversation_id.as_deref(),
            Some(turn.conversation_id.0.as_str())
        );
    }

    #[tokio::test]
    async fn chat_requires_customer_and_message() {
        let fixture = fixture(60, "low");
        assert!(matches!(
            fixture.desk.chat("", "Printer jams").await,
            Err(ApplicationError::InvalidInput(_))
        ));
        assert!(matches!(
            fixture.desk.chat("grace", "").await,
            Err(ApplicationError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn search_matches_issue_text_case_insensitively() {
        let fixture = fixture(60, "low");
        fixture.desk.submit_ticket("ada", "Printer jams on page two").await.expect("submit");
        fixture.desk.submit_ticket("grace", "VPN drops every hour").await.expect("submit");

        let found = fixture.desk.search_tickets(Some("PRINTER")).await.expect("search");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].customer_name, "ada");

        assert_eq!(fixture.desk.search_tickets(None).await.expect("search").len(), 2);
        assert_eq!(fixture.desk.search_tickets(Some("  ")).await.expect("search").len(), 2);
        assert!(fixture.desk.search_tickets(Some("refund")).await.expect("search").is_empty());
    }

    #[tokio::test]
    async fn status_updates_follow_transition_rules() {
        let fixture = fixture(60, "low");
        let ticket = Ticket::new("ada", "VPN drops");
        fixture.tickets.save(ticket.clone()).await.expect("save");

        let urgent = fixture.desk.update_status(&ticket.id, TicketStatus::Urgent).await.expect("urgent");
        assert_eq!(urgent.status, TicketStatus::Urgent);
        let resolved =
            fixture.desk.update_status(&ticket.id, TicketStatus::Resolved).await.expect("resolve");
        assert_eq!(resolved.status, TicketStatus::Resolved);

        let error = fixture
            .desk
            .update_status(&ticket.id, TicketStatus::Urgent)
            .await
            .expect_err("resolved tickets cannot jump to urgent");
        assert_eq!(
            error,
            ApplicationError::Domain(DomainError::InvalidTicketTransition {
                from: TicketStatus::Resolved,
                to: TicketStatus::Urgent,
            })
        );

        let reopened =
            fixture.desk.update_status(&ticket.id, TicketStatus::InProgress).await.expect("reopen");
        assert_eq!(reopened.status, TicketStatus::InProgress);

        let missing = fixture
            .desk
            .update_status(&TicketId("TKT-missing".to_string()), TicketStatus::Resolved)
            .await
            .expect_err("unknown ticket");
        assert!(matches!(missing, ApplicationError::NotFound(_)));
    }

    #[tokio::test]
    async fn process_ticket_reruns_normalization_for_stored_ticket() {
        let fixture = fixture(97, "low");
        let ticket = Ticket::new("ada", "Printer jams");
        fixture.tickets.save(ticket.clone()).await.expect("save");

        let processed = fixture.desk.process_ticket(&ticket.id).await.expect("process");
        assert_eq!(processed.ticket.status, TicketStatus::Resolved);
        assert_eq!(processed.outcome.confidence(), Some(97));

        let missing = fixture.desk.process_ticket(&TicketId("TKT-nope".to_string())).await;
        assert!(matches!(missing, Err(ApplicationError::NotFound(_))));
    }

    #[tokio::test]
    async fn reprocessing_resolved_ticket_keeps_new_analysis_and_reopens() {
        let fixture = fixture(40, "high");
        let mut ticket = Ticket::new("ada", "Printer jams");
        ticket.status = TicketStatus::Resolved;
        fixture.tickets.save(ticket.clone()).await.expect("save");

        let processed = fixture.desk.process_ticket(&ticket.id).await.expect("process");
        assert_eq!(processed.ticket.status, TicketStatus::InProgress);
        assert_eq!(processed.disposition, Disposition::QueuedForReview);

        let stored = fixture
            .tickets
            .find_by_id(&ticket.id)
            .await
            .expect("lookup")
            .expect("stored ticket");
        assert_eq!(stored.status, TicketStatus::InProgress);
        assert_eq!(stored.ai_response, Some(processed.outcome));
    }

    #[tokio::test]
    async fn metrics_count_active_tickets_and_resolution_rate() {
        let fixture = fixture(60, "low");
        let empty = fixture.desk.metrics().await.expect("metrics");
        assert_eq!((empty.total_tickets, empty.active_tickets, empty.resolution_rate), (0, 0, 0.0));

        for (name, status) in [
            ("ada", TicketStatus::Resolved),
            ("grace", TicketStatus::Pending),
            ("linus", TicketStatus::Urgent),
        ] {
            let mut ticket = Ticket::new(name, "VPN drops");
            ticket.status = status;
            fixture.tickets.save(ticket).await.expect("save");
        }

        let metrics = fixture.desk.metrics().await.expect("metrics");
        assert_eq!(metrics.total_tickets, 3);
        assert_eq!(metrics.active_tickets, 2);
        assert_eq!(metrics.resolution_rate, 33.33);
    }

    #[tokio::test]
    async fn suggestions_cover_pending_tickets_only() {
        let fixture = fixture(60, "low");
        let technical = Ticket::new("ada", "Technical fault in the export job");
        let general = Ticket::new("grace", "Refund request for order 12");
        let mut resolved = Ticket::new("linus", "technical question");
        resolved.status = TicketStatus::Resolved;
        for ticket in [technical.clone(), general.clone(), resolved] {
            fixture.tickets.save(ticket).await.expect("save");
        }

        let suggestions = fixture.desk.suggestions().await.expect("suggestions");
        assert_eq!(suggestions.len(), 2);
        let for_ticket = |id: &TicketId| {
            suggestions
                .iter()
                .find(|suggestion| &suggestion.ticket_id == id)
                .map(|suggestion| suggestion.suggestion.as_str())
        };
        assert_eq!(for_ticket(&technical.id), Some("Escalate to technical team"));
        assert_eq!(for_ticket(&general.id), Some("Assign to general support"));
        assert_eq!(routing_suggestion("TECHNICAL glitch"), "Escalate to technical team");
    }
}
