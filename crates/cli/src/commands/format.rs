use std::fs;
use std::io::{self, Read};

use anyhow::Context;
use serde_json::Value;

use ticketflow_agent::format_response;

use crate::commands::{CommandResult, EXIT_INPUT};

const COMMAND: &str = "format";

pub fn run(path: &str) -> CommandResult {
    run_with_stdin(path, io::stdin().lock())
}

/// Formats a stored response. Ticket records and `submit --json` output are
/// accepted too; their embedded response is rendered.
pub fn run_with_stdin(path: &str, stdin: impl Read) -> CommandResult {
    let raw = match read_source(path, stdin) {
        Ok(raw) => raw,
        Err(error) => return CommandResult::failure(COMMAND, "io", format!("{error:#}"), EXIT_INPUT),
    };

    let document: Value = match serde_json::from_str(&raw) {
        Ok(document) => document,
        Err(error) => {
            return CommandResult::failure(COMMAND, "invalid_json", error.to_string(), EXIT_INPUT)
        }
    };

    let response = ["outcome", "ai_response"]
        .iter()
        .find_map(|key| document.get(*key).filter(|value| value.is_object()))
        .unwrap_or(&document);

    CommandResult::plain(format_response(response))
}

fn read_source(path: &str, mut stdin: impl Read) -> anyhow::Result<String> {
    if path == "-" {
        let mut raw = String::new();
        stdin.read_to_string(&mut raw).context("failed to read response from stdin")?;
        return Ok(raw);
    }

    fs::read_to_string(path).with_context(|| format!("failed to read `{path}`"))
}
