//! System prompt templates for the three support agents.

pub const SUMMARIZER_NAME: &str = "summarizer";
pub const ACTION_EXTRACTOR_NAME: &str = "action_extractor";
pub const RESOLVER_NAME: &str = "resolver";

/// Appended to every template before the request is sent.
pub const JSON_REMINDER: &str =
    "\nImportant: Always respond with valid JSON format and provide contextually relevant responses.";

pub const SUMMARIZER_PROMPT: &str = r#"You read customer support messages and write a short summary of the customer's problem.
Look for concrete problems first (login failures, technical faults, billing or account trouble). A message that describes any problem is not a greeting.
Reply with a single JSON object shaped like this:

{
    "summary": "One or two sentences describing the specific issue",
    "metadata": {
        "sentiment": "positive | negative | neutral",
        "priority": "high | medium | low, based on how severe the issue is",
        "category": "Short category such as login issue, technical, account, billing",
        "conversation_id": "A unique identifier for this conversation"
    }
}"#;

pub const ACTION_EXTRACTOR_PROMPT: &str = r#"You decide which concrete actions the support team must take to resolve the customer's issue.
Reply with a single JSON object shaped like this:

{
    "actions": [
        {
            "type": "Authentication | Password Reset | Account Recovery | Technical Fix | other short label",
            "description": "What needs to be done, specific to this issue",
            "priority": "Critical | High | Medium | Low"
        }
    ]
}"#;

pub const RESOLVER_PROMPT: &str = r#"You recommend a resolution for the customer's issue.
Reply with a single JSON object shaped like this:

{
    "recommendation": {
        "solution": "The specific fix for the identified problem",
        "confidence": "Integer from 0 to 100, or high | medium | low",
        "steps": ["Ordered steps the customer or agent should follow"],
        "resources": ["Relevant guides or documentation"]
    },
    "similar_cases": ["Identifiers of related tickets, if any"]
}"#;

/// Full system message for an agent template.
pub fn system_message(template: &str) -> String {
    format!("{template}{JSON_REMINDER}")
}

/// User message carrying the issue text and the serialized prior turns.
pub fn user_message(content: &str, context: &str) -> String {
    format!("Content: {content}\nContext: {context}")
}

#[cfg(test)]
mod tests {
    use super::{system_message, user_message, RESOLVER_PROMPT};

    #[test]
    fn system_message_ends_with_json_reminder() {
        let message = system_message(RESOLVER_PROMPT);
        assert!(message.starts_with("You recommend a resolution"));
        assert!(message.ends_with(
            "\nImportant: Always respond with valid JSON format and provide contextually relevant responses."
        ));
    }

    #[test]
    fn user_message_carries_content_and_context() {
        assert_eq!(
            user_message("I can't log in", "[]"),
            "Content: I can't log in\nContext: []"
        );
    }
}
