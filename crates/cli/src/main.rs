use std::process::ExitCode;

fn main() -> ExitCode {
    ticketflow_cli::run()
}
