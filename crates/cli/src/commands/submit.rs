use ticketflow_agent::{format_outcome, Submission};
use ticketflow_core::config::LoadOptions;

use crate::bootstrap::bootstrap;
use crate::commands::{block_on, CommandResult, EXIT_RUNTIME};

const COMMAND: &str = "submit";

pub fn run(options: &LoadOptions, customer: &str, issue_text: &str, json: bool) -> CommandResult {
    let app = match bootstrap(options.clone()) {
        Ok(app) => app,
        Err(error) => return CommandResult::from_bootstrap_error(COMMAND, error),
    };

    let submitted = match block_on(app.desk.submit_ticket(customer, issue_text)) {
        Ok(submitted) => submitted,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "runtime",
                format!("failed to start async runtime: {error}"),
                EXIT_RUNTIME,
            )
        }
    };
    app.flush_audit();

    match submitted {
        Ok(submission) if json => match serde_json::to_string_pretty(&submission) {
            Ok(output) => CommandResult::plain(output),
            Err(error) => {
                CommandResult::failure(COMMAND, "serialization", error.to_string(), EXIT_RUNTIME)
            }
        },
        Ok(submission) => CommandResult::plain(render_human(&submission)),
        Err(error) => CommandResult::from_application_error(COMMAND, error),
    }
}

fn render_human(submission: &Submission) -> String {
    format!(
        "{}\nticket: {} ({})\n\n{}",
        submission.disposition.message(),
        submission.ticket.id,
        submission.ticket.status.as_str(),
        format_outcome(&submission.outcome)
    )
}
