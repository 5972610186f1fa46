pub mod chat;
pub mod config;
pub mod doctor;
pub mod format;
pub mod submit;

use serde::Serialize;

use ticketflow_core::errors::{ApplicationError, InterfaceError};

use crate::bootstrap::BootstrapError;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_INPUT: u8 = 3;
pub const EXIT_RUNTIME: u8 = 4;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn plain(output: impl Into<String>) -> Self {
        Self { exit_code: 0, output: output.into() }
    }

    pub(crate) fn from_bootstrap_error(command: &str, error: BootstrapError) -> Self {
        match error {
            BootstrapError::Config(error) => {
                Self::failure(command, "config_validation", error.to_string(), EXIT_CONFIG)
            }
            BootstrapError::Client(error) => {
                Self::failure(command, "llm_client", error.to_string(), EXIT_RUNTIME)
            }
        }
    }

    pub(crate) fn from_application_error(command: &str, error: ApplicationError) -> Self {
        let error_class = match &error {
            ApplicationError::InvalidInput(_) => "invalid_input",
            ApplicationError::NotFound(_) => "not_found",
            ApplicationError::Domain(_) => "domain",
            ApplicationError::Configuration(_) => "config_validation",
            ApplicationError::Persistence(_) | ApplicationError::Integration(_) => "runtime",
        };
        let message = error.to_string();
        let exit_code = match InterfaceError::from(error) {
            InterfaceError::BadRequest { .. } | InterfaceError::NotFound { .. } => EXIT_INPUT,
            InterfaceError::ServiceUnavailable { .. } => EXIT_RUNTIME,
            InterfaceError::Internal { .. } => EXIT_CONFIG,
        };
        Self::failure(command, error_class, message, exit_code)
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Current-thread runtime for commands that drive async services.
pub(crate) fn block_on<F: std::future::Future>(future: F) -> Result<F::Output, std::io::Error> {
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    Ok(runtime.block_on(future))
}
