use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::response::{Priority, TicketOutcome};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TicketId(pub String);

impl TicketId {
    pub fn generate() -> Self {
        Self(format!("TKT-{}", Uuid::new_v4().simple()))
    }
}

impl std::fmt::Display for TicketId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketStatus {
    Pending,
    InProgress,
    Resolved,
    Urgent,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Urgent => "urgent",
        }
    }
}

impl std::str::FromStr for TicketStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "pending" => Ok(Self::Pending),
            "in_progress" | "inprogress" => Ok(Self::InProgress),
            "resolved" => Ok(Self::Resolved),
            "urgent" => Ok(Self::Urgent),
            other => Err(DomainError::InvariantViolation(format!("unknown ticket status `{other}`"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub customer_name: String,
    pub issue_text: String,
    pub ai_response: Option<TicketOutcome>,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
}

impl Ticket {
    pub fn new(customer_name: impl Into<String>, issue_text: impl Into<String>) -> Self {
        Self {
            id: TicketId::generate(),
            customer_name: customer_name.into(),
            issue_text: issue_text.into(),
            ai_response: None,
            status: TicketStatus::Pending,
            created_at: Utc::now(),
        }
    }

    pub fn can_transition_to(&self, next: TicketStatus) -> bool {
        use TicketStatus::*;

        self.status == next
            || matches!(
                (self.status, next),
                (Pending, _)
                    | (InProgress, Urgent)
                    | (InProgress, Resolved)
                    | (Urgent, InProgress)
                    | (Urgent, Resolved)
                    | (Resolved, InProgress)
            )
    }

    pub fn transition_to(&mut self, next: TicketStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.status = next;
            return Ok(());
        }

        Err(DomainError::InvalidTicketTransition { from: self.status, to: next })
    }

    /// Records the handler outcome and moves the ticket to the status it
    /// implies. A failed outcome is kept for diagnostics but leaves the
    /// status untouched. When the implied status is not reachable (a resolved
    /// ticket whose new analysis is urgent) the ticket is reopened instead.
    pub fn apply_outcome(&mut self, outcome: TicketOutcome, instant_resolution_threshold: u8) {
        let next = match &outcome {
            TicketOutcome::Failed(_) => None,
            TicketOutcome::Normalized(response) => {
                if response.recommendation.confidence >= instant_resolution_threshold {
                    Some(TicketStatus::Resolved)
                } else if response.metadata.priority == Priority::High {
                    Some(TicketStatus::Urgent)
                } else {
                    Some(TicketStatus::InProgress)
                }
            }
        };

        if let Some(next) = next {
            self.status = if self.can_transition_to(next) { next } else { TicketStatus::InProgress };
        }
        self.ai_response = Some(outcome);
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::response::{
        NormalizedResponse, Priority, Recommendation, ResponseMetadata, Summary, SystemFailure,
        TicketOutcome,
    };
    use crate::errors::DomainError;

    use super::{Ticket, TicketStatus};

    fn outcome(confidence: u8, priority: Priority) -> TicketOutcome {
        TicketOutcome::Normalized(NormalizedResponse {
            summary: Summary::text("Printer offline"),
            metadata: ResponseMetadata { priority, ..ResponseMetadata::default() },
            actions: Vec::new(),
            recommendation: Recommendation {
                solution: "Power cycle the printer".to_string(),
                confidence,
                steps: Vec::new(),
                resources: Vec::new(),
            },
            similar_cases: Vec::new(),
        })
    }

    #[test]
    fn new_ticket_starts_pending_with_generated_id() {
        let ticket = Ticket::new("ada", "printer offline");
        assert_eq!(ticket.status, TicketStatus::Pending);
        assert!(ticket.id.0.starts_with("TKT-"));
        assert!(ticket.ai_response.is_none());
    }

    #[test]
    fn high_confidence_outcome_resolves_ticket() {
        let mut ticket = Ticket::new("ada", "printer offline");
        ticket.apply_outcome(outcome(95, Priority::Low), 95);
        assert_eq!(ticket.status, TicketStatus::Resolved);
    }

    #[test]
    fn high_priority_outcome_marks_ticket_urgent() {
        let mut ticket = Ticket::new("ada", "server down");
        ticket.apply_outcome(outcome(80, Priority::High), 95);
        assert_eq!(ticket.status, TicketStatus::Urgent);
    }

    #[test]
    fn ordinary_outcome_moves_ticket_in_progress() {
        let mut ticket = Ticket::new("ada", "slow page");
        ticket.apply_outcome(outcome(50, Priority::Medium), 95);
        assert_eq!(ticket.status, TicketStatus::InProgress);
    }

    #[test]
    fn failed_outcome_keeps_ticket_pending() {
        let mut ticket = Ticket::new("ada", "slow page");
        ticket.apply_outcome(SystemFailure::new("boom").into(), 95);
        assert_eq!(ticket.status, TicketStatus::Pending);
        assert!(ticket.ai_response.as_ref().is_some_and(TicketOutcome::is_failure));
    }

    #[test]
    fn resolved_ticket_cannot_jump_to_urgent() {
        let mut ticket = Ticket::new("ada", "slow page");
        ticket.transition_to(TicketStatus::Resolved).expect("pending -> resolved");

        let error = ticket.transition_to(TicketStatus::Urgent).expect_err("should reject");
        assert_eq!(
            error,
            DomainError::InvalidTicketTransition {
                from: TicketStatus::Resolved,
                to: TicketStatus::Urgent
            }
        );

        ticket.transition_to(TicketStatus::InProgress).expect("reopen");
        assert_eq!(ticket.status, TicketStatus::InProgress);
    }

    #[test]
    fn urgent_analysis_reopens_resolved_ticket_and_keeps_outcome() {
        let mut ticket = Ticket::new("ada", "server down");
        ticket.transition_to(TicketStatus::Resolved).expect("pending -> resolved");

        let analysis = outcome(40, Priority::High);
        ticket.apply_outcome(analysis.clone(), 95);

        assert_eq!(ticket.status, TicketStatus::InProgress);
        assert_eq!(ticket.ai_response, Some(analysis));
    }

    #[test]
    fn status_parses_from_loose_labels() {
        assert_eq!("In Progress".parse::<TicketStatus>(), Ok(TicketStatus::InProgress));
        assert_eq!("urgent".parse::<TicketStatus>(), Ok(TicketStatus::Urgent));
        assert!("archived".parse::<TicketStatus>().is_err());
    }
}
