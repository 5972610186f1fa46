pub mod bootstrap;
pub mod commands;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use ticketflow_core::config::{AppConfig, LoadOptions, LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "ticketflow",
    about = "Ticketflow support pipeline CLI",
    long_about = "Run support tickets and chat turns through the summarizer, action-extractor and resolver agents, and inspect configuration.",
    after_help = "Examples:\n  ticketflow submit --customer ada \"I can't log into my account\"\n  ticketflow chat --customer ada\n  ticketflow format response.json\n  ticketflow doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a ticketflow.toml config file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Submit one ticket and print the normalized agent response")]
    Submit {
        #[arg(long, help = "Customer name recorded on the ticket")]
        customer: String,
        #[arg(long, help = "Emit the full submission as JSON")]
        json: bool,
        #[arg(required = true, help = "Issue description")]
        text: Vec<String>,
    },
    #[command(about = "Chat interactively; each stdin line is one turn")]
    Chat {
        #[arg(long, help = "Customer name the conversation belongs to")]
        customer: String,
    },
    #[command(about = "Render a stored response (or ticket) JSON file as plain text; `-` reads stdin")]
    Format { path: String },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, LLM credential readiness and agent tuning")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = LoadOptions { config_path: cli.config, ..LoadOptions::default() };

    let result = match cli.command {
        Command::Submit { customer, json, text } => {
            init_logging_from(&options);
            commands::submit::run(&options, &customer, &text.join(" "), json)
        }
        Command::Chat { customer } => {
            init_logging_from(&options);
            commands::chat::run(&options, &customer, io::stdin().lock(), &mut io::stdout())
        }
        Command::Format { path } => commands::format::run(&path),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(&options) }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(&options, json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

fn init_logging_from(options: &LoadOptions) {
    if let Ok(config) = AppConfig::load(options.clone()) {
        init_logging(&config.logging);
    }
}

/// Installs the fmt subscriber on stderr so command output on stdout stays
/// machine-readable. `RUST_LOG` overrides `logging.level`. Later calls are
/// no-ops.
pub fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(io::stderr);

    let _ = match logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
