use std::io::{BufRead, Write};

use anyhow::Context;

use ticketflow_agent::SupportDesk;
use ticketflow_core::config::LoadOptions;
use ticketflow_core::domain::conversation::ConversationId;
use ticketflow_core::errors::ApplicationError;

use crate::bootstrap::bootstrap;
use crate::commands::{block_on, CommandResult, EXIT_RUNTIME};

const COMMAND: &str = "chat";

#[derive(Debug, Default)]
struct ChatSession {
    conversation_id: Option<ConversationId>,
    turns: usize,
}

/// Reads one message per line from `input` until EOF or `/quit`, writing each
/// reply to `output` as soon as it is ready.
pub fn run(
    options: &LoadOptions,
    customer: &str,
    input: impl BufRead,
    output: &mut impl Write,
) -> CommandResult {
    let app = match bootstrap(options.clone()) {
        Ok(app) => app,
        Err(error) => return CommandResult::from_bootstrap_error(COMMAND, error),
    };

    let session = match block_on(converse(&app.desk, customer, input, output)) {
        Ok(session) => session,
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

    match session {
        Ok(ChatSession { conversation_id: Some(id), turns }) => {
            CommandResult::success(COMMAND, format!("conversation {id} finished after {turns} turn(s)"))
        }
        Ok(ChatSession { conversation_id: None, .. }) => {
            CommandResult::success(COMMAND, "no messages received")
        }
        Err(error) => match error.downcast::<ApplicationError>() {
            Ok(error) => CommandResult::from_application_error(COMMAND, error),
            Err(error) => CommandResult::failure(COMMAND, "io", format!("{error:#}"), EXIT_RUNTIME),
        },
    }
}

async fn converse(
    desk: &SupportDesk,
    customer: &str,
    input: impl BufRead,
    output: &mut impl Write,
) -> anyhow::Result<ChatSession> {
    let mut session = ChatSession::default();

    for line in input.lines() {
        let line = line.context("failed to read chat input")?;
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if message == "/quit" {
            break;
        }

        let turn = desk.chat(customer, message).await?;
        writeln!(output, "{}\n", turn.reply).context("failed to write chat reply")?;
        output.flush().context("failed to flush chat reply")?;

        session.conversation_id = Some(turn.conversation_id);
        session.turns += 1;
    }

    Ok(session)
}
