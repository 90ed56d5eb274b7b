//! External resolver backed by a language model
//!
//! The audit pipeline is synchronous, so each lookup drives the async LLM
//! client on a private current-thread runtime. Must not be called from
//! inside another tokio runtime.

use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::{LLMConfig, LLMProvider};
use crate::domain::resolver::ExternalResolver;
use crate::infrastructure::llm_clients::LLMClient;
use crate::infrastructure::response::clean_llm_response;

/// Answer the model gives when nothing in the list fits
pub const NO_MATCH: &str = "NO_MATCH";

const SYSTEM_PROMPT: &str = "You correct spelling and formatting mistakes in spreadsheet values. \
Reply with exactly one option copied verbatim from the list, or NO_MATCH.";

pub struct LlmResolver {
    client: Arc<dyn LLMClient>,
    config: LLMConfig,
    runtime: Runtime,
}

impl LlmResolver {
    pub fn new(client: Arc<dyn LLMClient>, config: LLMConfig) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to start async runtime: {}", e)))?;

        Ok(Self {
            client,
            config,
            runtime,
        })
    }

    pub fn build_prompt(value: &str, reference: &[String], field: &str) -> String {
        let options = reference
            .iter()
            .map(|option| format!("- {}", option))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "Field: {}\n\
             Current value: \"{}\"\n\n\
             Valid options:\n{}\n\n\
             Instructions:\n\
             1. Find the valid option closest to the current value\n\
             2. Consider spelling, accents, letter case and spacing\n\
             3. Reply ONLY with the exact valid option, no explanation\n\
             4. If no option is a reasonable match, reply \"{}\"\n\n\
             Answer:",
            field, value, options, NO_MATCH
        )
    }

    /// Cleaned answer, or None for an explicit or empty no-match
    pub fn interpret(answer: &str) -> Option<String> {
        let cleaned = clean_llm_response(answer);
        if cleaned.is_empty() || cleaned.eq_ignore_ascii_case(NO_MATCH) {
            None
        } else {
            Some(cleaned)
        }
    }
}

impl ExternalResolver for LlmResolver {
    fn resolve(&self, value: &str, reference: &[String], field: &str) -> Result<Option<String>> {
        let prompt = Self::build_prompt(value, reference, field);
        let answer = self
            .runtime
            .block_on(self.client.generate(&self.config, SYSTEM_PROMPT, &prompt))?;

        debug!(field, value, answer = %answer.trim(), "LLM answer");
        Ok(Self::interpret(&answer))
    }

    fn name(&self) -> &str {
        match self.config.provider {
            LLMProvider::Google => "gemini",
            LLMProvider::OpenAI => "openai",
        }
    }
}
