//! Plain-text rendering of a normalized response for chat replies and the CLI.

use serde_json::Value;

use ticketflow_core::domain::response::TicketOutcome;

use crate::shape::as_text;

pub const FALLBACK_REPLY: &str = "I'm still learning how to help with that. Please try rephrasing.";

/// Renders any response-like JSON value. Unknown or missing fields are
/// skipped, so this never fails whatever the input shape.
pub fn format_response(response: &Value) -> String {
    let mut lines = Vec::new();

    if let Some(summary) = summary_text(response.get("summary")) {
        lines.push(format!("📝 Summary: {summary}"));
    }

    let actions = action_lines(response.get("actions"));
    if !actions.is_empty() {
        lines.push("🔧 Recommended Actions:".to_string());
        lines.extend(actions);
    }

    match response.get("recommendation") {
        Some(Value::Object(recommendation)) => {
            let solution = recommendation.get("solution").map(as_text).unwrap_or_default();
            if !solution.is_empty() {
                let confidence = recommendation
                    .get("confidence")
                    .filter(|value| !value.is_null())
                    .map(as_text)
                    .unwrap_or_else(|| "0".to_string());
                lines.push(format!("✅ Solution: {solution} (Confidence: {confidence}%)"));
            }
        }
        Some(Value::String(solution)) if !solution.is_empty() => {
            lines.push(format!("✅ Solution: {solution}"));
        }
        _ => {}
    }

    if lines.is_empty() {
        FALLBACK_REPLY.to_string()
    } else {
        lines.join("\n")
    }
}

/// Reply text for a handler outcome. A system failure is answered with its
/// apology message.
pub fn format_outcome(outcome: &TicketOutcome) -> String {
    match outcome {
        TicketOutcome::Failed(failure) => failure.response.clone(),
        TicketOutcome::Normalized(response) => {
            format_response(&serde_json::to_value(response).unwrap_or(Value::Null))
        }
    }
}

fn summary_text(summary: Option<&Value>) -> Option<String> {
    let text = match summary? {
        Value::Object(fields) => ["text", "summary"]
            .iter()
            .filter_map(|key| fields.get(*key))
            .map(as_text)
            .find(|text| !text.is_empty())
            .unwrap_or_default(),
        Value::Array(_) => String::new(),
        other => as_text(other),
    };
    (!text.is_empty()).then_some(text)
}

fn action_lines(actions: Option<&Value>) -> Vec<String> {
    let line = |action: &Value| match action {
        Value::Object(fields) => match fields.get("description") {
            Some(description) => format!("- {}", as_text(description)),
            None => format!("- {action}"),
        },
        other => format!("- {}", as_text(other)),
    };

    match actions {
        Some(Value::Array(items)) => items.iter().map(line).collect(),
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(text)) if text.is_empty() => Vec::new(),
        Some(Value::Bool(false)) => Vec::new(),
        Some(other) => vec![line(other)],
    }
}
