//! Rebuttal generator using LLM
//!
//! Turns an extracted analysis into a persuasive counter-argument styled as
//! a forum reply. The model's free-text output is returned verbatim; there
//! is no parsing and no fallback, so a transport failure here is fatal for
//! the operation.

use std::sync::Arc;

use crate::model::Analysis;
use crate::service::llm::{LlmError, TextGenerator};

/// Environment variable for the rebuttal model (defaults to gpt-4o-2024-08-06)
const ENV_REBUTTAL_MODEL: &str = "REBUTTAL_MODEL";

const DEFAULT_MODEL: &str = "gpt-4o-2024-08-06";

/// System prompt for persuasive counter-argument writing
const REBUTTAL_SYSTEM_PROMPT: &str = r#"You are a helpful assistant.
You will be presented with an argument from the subreddit r/changemyview along
with the central rationale presented to support that argument.
Your task is to be extremely persuasive and argue against that position.
Be polite but make sure to address each point of rationale to counter the main argument.
Use evidence-based arguments as much as possible and provide realistic alternatives.
Structure and style your response like it is a post for the r/changemyview subreddit."#;

/// Service drafting counter-arguments from an analysis
pub struct RebuttalGenerator {
    generator: Arc<dyn TextGenerator>,
    model: String,
}

impl RebuttalGenerator {
    /// Create a new rebuttal generator.
    /// Optionally uses REBUTTAL_MODEL env var (defaults to gpt-4o-2024-08-06).
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        let model = std::env::var(ENV_REBUTTAL_MODEL).unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Self { generator, model }
    }

    /// Draft a counter-argument addressing every rationale point
    pub async fn rebut(&self, analysis: &Analysis) -> Result<String, LlmError> {
        let rationale_str = analysis
            .rationale
            .iter()
            .enumerate()
            .map(|(i, r)| format!("{}. {}", i + 1, r))
            .collect::<Vec<_>>()
            .join("\n");

        let user_content = format!(
            "MAIN ARGUMENT: {}.\nRATIONALE: {}",
            analysis.main_position, rationale_str
        );

        let start_time = std::time::Instant::now();

        let rebuttal = self
            .generator
            .complete(&self.model, REBUTTAL_SYSTEM_PROMPT, &user_content)
            .await?;

        tracing::debug!(
            model = %self.model,
            elapsed_ms = start_time.elapsed().as_millis(),
            rebuttal_length = rebuttal.len(),
            "Rebuttal completion finished"
        );

        Ok(rebuttal)
    }
}
