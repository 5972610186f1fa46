use std::sync::Arc;

use ticketflow_core::config::{AgentTuning, AppConfig};

use crate::caller::{Agent, AgentCaller, Sampling};
use crate::llm::LlmClient;
use crate::prompts::{
    ACTION_EXTRACTOR_NAME, ACTION_EXTRACTOR_PROMPT, RESOLVER_NAME, RESOLVER_PROMPT,
    SUMMARIZER_NAME, SUMMARIZER_PROMPT,
};

/// The three agents the ticket handler consults, built once and shared.
#[derive(Clone)]
pub struct AgentSet {
    pub summarizer: Arc<dyn Agent>,
    pub action_extractor: Arc<dyn Agent>,
    pub resolver: Arc<dyn Agent>,
}

impl AgentSet {
    pub fn new(
        summarizer: Arc<dyn Agent>,
        action_extractor: Arc<dyn Agent>,
        resolver: Arc<dyn Agent>,
    ) -> Self {
        Self { summarizer, action_extractor, resolver }
    }

    pub fn from_config(config: &AppConfig, client: Arc<dyn LlmClient>) -> Self {
        let build = |name: &str, prompt: &str, tuning: &AgentTuning| -> Arc<dyn Agent> {
            let sampling = Sampling {
                temperature: tuning.temperature,
                top_p: tuning.top_p,
                max_tokens: config.llm.max_tokens,
            };
            Arc::new(
                AgentCaller::new(name, prompt, tuning.model_or(&config.llm.model), client.clone())
                    .with_sampling(sampling),
            )
        };

        Self {
            summarizer: build(SUMMARIZER_NAME, SUMMARIZER_PROMPT, &config.agents.summarizer),
            action_extractor: build(
                ACTION_EXTRACTOR_NAME,
                ACTION_EXTRACTOR_PROMPT,
                &config.agents.action_extractor,
            ),
            resolver: build(RESOLVER_NAME, RESOLVER_PROMPT, &config.agents.resolver),
        }
    }
}
