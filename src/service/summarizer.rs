//! Thread summarizer using LLM
//!
//! Extracts the main position argued by a thread's author and the distinct
//! supporting reasons, as a constrained-JSON completion parsed into
//! [`Analysis`].

use std::sync::Arc;

use crate::model::Analysis;
use crate::service::llm::{LlmError, TextGenerator};

/// Environment variable for the summary model (defaults to gpt-4o-2024-08-06)
const ENV_SUMMARY_MODEL: &str = "SUMMARY_MODEL";

/// Pinned model for argument extraction; dated snapshot keeps the output
/// as reproducible as temperature 0 allows
const DEFAULT_MODEL: &str = "gpt-4o-2024-08-06";

/// System prompt for argument extraction
const SUMMARY_SYSTEM_PROMPT: &str = r#"You are a helpful assistant.
You will be presented with a post from the subreddit r/changemyview and your
task is to extract the main argument of the poster, as well as the key rationale
that they feel supports their position.
Return your response in the following JSON format:
{
    "main_position": "The main argument of the poster",
    "rationale": ["Point 1", "Point 2", "Point 3"]
}"#;

/// Summarize result: the analysis plus whether the model reply had to be
/// replaced with the sentinel because it was not valid JSON
pub struct SummaryOutcome {
    pub analysis: Analysis,
    pub parse_failed: bool,
}

/// Service extracting the main argument of a thread
pub struct Summarizer {
    generator: Arc<dyn TextGenerator>,
    model: String,
}

impl Summarizer {
    /// Create a new summarizer.
    /// Optionally uses SUMMARY_MODEL env var (defaults to gpt-4o-2024-08-06).
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        let model = std::env::var(ENV_SUMMARY_MODEL).unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Self { generator, model }
    }

    /// Extract the main position and rationale from a thread.
    ///
    /// Transport failures propagate. A reply that is not valid JSON does
    /// not: the sentinel analysis is returned with `parse_failed` set so
    /// the caller can surface a warning and continue.
    pub async fn summarize(&self, title: &str, selftext: &str) -> Result<SummaryOutcome, LlmError> {
        let user_content = format!("TITLE: {}.\nTEXT: {}", title, selftext);

        let start_time = std::time::Instant::now();

        let raw = self
            .generator
            .complete(&self.model, SUMMARY_SYSTEM_PROMPT, &user_content)
            .await?;

        tracing::debug!(
            model = %self.model,
            elapsed_ms = start_time.elapsed().as_millis(),
            reply_length = raw.len(),
            "Summary completion finished"
        );

        match serde_json::from_str::<Analysis>(&raw) {
            Ok(analysis) => Ok(SummaryOutcome {
                analysis,
                parse_failed: false,
            }),
            Err(e) => {
                tracing::warn!(
                    model = %self.model,
                    error = %e,
                    "Summary reply was not valid JSON, using fallback analysis"
                );
                Ok(SummaryOutcome {
                    analysis: Analysis::fallback(),
                    parse_failed: true,
                })
            }
        }
    }
}
