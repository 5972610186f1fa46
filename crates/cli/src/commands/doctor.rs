use secrecy::ExposeSecret;
use serde::Serialize;

use ticketflow_agent::ChatCompletionClient;
use ticketflow_core::config::{AppConfig, LoadOptions};

use crate::commands::config::redact_token;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

const DEPENDENT_CHECKS: [&str; 3] = ["llm_credentials", "llm_client", "agent_tuning"];

pub fn run(options: &LoadOptions, json_output: bool) -> String {
    let report = build_report(options);

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report(options: &LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options.clone()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_llm_credentials(&config));
            checks.push(check_llm_client(&config));
            checks.push(check_agent_tuning(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.extend(DEPENDENT_CHECKS.into_iter().map(|name| DoctorCheck {
                name,
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            }));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_llm_credentials(config: &AppConfig) -> DoctorCheck {
    let provider = config.llm.provider;
    let key = config.llm.api_key.as_ref().map(|key| key.expose_secret().trim().to_string());

    match key.filter(|key| !key.is_empty()) {
        Some(key) => DoctorCheck {
            name: "llm_credentials",
            status: CheckStatus::Pass,
            details: format!("api key {} configured for {}", redact_token(&key), provider.as_str()),
        },
        None if provider.requires_api_key() => DoctorCheck {
            name: "llm_credentials",
            status: CheckStatus::Fail,
            details: format!("{} requires llm.api_key", provider.as_str()),
        },
        None => DoctorCheck {
            name: "llm_credentials",
            status: CheckStatus::Pass,
            details: format!("{} does not require an api key", provider.as_str()),
        },
    }
}

fn check_llm_client(config: &AppConfig) -> DoctorCheck {
    match ChatCompletionClient::from_config(&config.llm) {
        Ok(client) => DoctorCheck {
            name: "llm_client",
            status: CheckStatus::Pass,
            details: format!(
                "requests go to `{}/chat/completions` with a {}s timeout",
                client.base_url(),
                config.llm.timeout_secs
            ),
        },
        Err(error) => DoctorCheck {
            name: "llm_client",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn check_agent_tuning(config: &AppConfig) -> DoctorCheck {
    let agents = [
        ("summarizer", &config.agents.summarizer),
        ("action_extractor", &config.agents.action_extractor),
        ("resolver", &config.agents.resolver),
    ];
    let details = agents
        .iter()
        .map(|(name, tuning)| {
            format!(
                "{name}: model={} temperature={} top_p={}",
                tuning.model_or(&config.llm.model),
                tuning.temperature,
                tuning.top_p
            )
        })
        .collect::<Vec<_>>()
        .join("; ");

    DoctorCheck { name: "agent_tuning", status: CheckStatus::Pass, details }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
