//! Per-thread analysis pipeline
//!
//! Composes the summarizer and rebuttal generator into a single operation.
//! The pipeline itself is idempotent but not cached: calling it twice costs
//! two full round-trips. At-most-once execution per thread per session is
//! enforced by the session store's `analyzed` flag, not here.

use std::sync::Arc;

use crate::model::{Analysis, Thread};
use crate::service::llm::{LlmError, TextGenerator};
use crate::service::rebuttal::RebuttalGenerator;
use crate::service::summarizer::Summarizer;

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("text generation failed: {0}")]
    GenerationFailed(String),
}

impl From<LlmError> for AnalysisError {
    fn from(err: LlmError) -> Self {
        AnalysisError::GenerationFailed(err.to_string())
    }
}

/// Result of analyzing one thread
pub struct ThreadAnalysis {
    pub analysis: Analysis,
    pub rebuttal: String,
    /// True when the summary reply was malformed and the sentinel analysis
    /// was used; the rebuttal is then drafted against the sentinel.
    pub parse_failed: bool,
}

/// Summarize-then-rebut pipeline for one thread
pub struct AnalysisPipeline {
    summarizer: Summarizer,
    rebuttal: RebuttalGenerator,
}

impl AnalysisPipeline {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            summarizer: Summarizer::new(generator.clone()),
            rebuttal: RebuttalGenerator::new(generator),
        }
    }

    pub async fn analyze(&self, thread: &Thread) -> Result<ThreadAnalysis, AnalysisError> {
        let start_time = std::time::Instant::now();

        let summary = self
            .summarizer
            .summarize(&thread.title, &thread.selftext)
            .await?;
        let rebuttal = self.rebuttal.rebut(&summary.analysis).await?;

        tracing::info!(
            thread = %thread.id,
            elapsed_ms = start_time.elapsed().as_millis(),
            rationale_count = summary.analysis.rationale.len(),
            parse_failed = summary.parse_failed,
            "Thread analysis complete"
        );

        Ok(ThreadAnalysis {
            analysis: summary.analysis,
            rebuttal,
            parse_failed: summary.parse_failed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forum::test_support::thread;
    use crate::service::llm::test_support::FakeGenerator;

    #[tokio::test]
    async fn pipeline_runs_summarize_then_rebut() {
        let generator = Arc::new(FakeGenerator::with_replies(vec![
            Ok(r#"{"main_position": "p", "rationale": ["a", "b"]}"#.to_string()),
            Ok("counter-argument text".to_string()),
        ]));
        let pipeline = AnalysisPipeline::new(generator.clone());

        let result = pipeline.analyze(&thread("abc", "CMV: p")).await.unwrap();

        assert_eq!(generator.call_count(), 2);
        assert_eq!(result.analysis.main_position, "p");
        assert_eq!(result.rebuttal, "counter-argument text");
        assert!(!result.parse_failed);
    }

    #[tokio::test]
    async fn sentinel_analysis_still_reaches_the_rebuttal_step() {
        let generator = Arc::new(FakeGenerator::with_replies(vec![
            Ok("not json at all".to_string()),
            Ok("rebuttal of the fallback".to_string()),
        ]));
        let pipeline = AnalysisPipeline::new(generator.clone());

        let result = pipeline.analyze(&thread("abc", "CMV: p")).await.unwrap();

        assert!(result.parse_failed);
        assert_eq!(result.analysis, Analysis::fallback());
        assert_eq!(result.rebuttal, "rebuttal of the fallback");
        assert_eq!(generator.call_count(), 2);

        // The rebuttal prompt was built from the sentinel values
        let prompts = generator.prompts.lock().unwrap();
        assert!(prompts[1].1.contains("Could not extract main position"));
    }

    #[tokio::test]
    async fn rebuttal_transport_failure_fails_the_pipeline() {
        let generator = Arc::new(FakeGenerator::with_replies(vec![
            Ok(r#"{"main_position": "p", "rationale": ["a"]}"#.to_string()),
            Err("gateway timeout".to_string()),
        ]));
        let pipeline = AnalysisPipeline::new(generator);

        let result = pipeline.analyze(&thread("abc", "CMV: p")).await;
        assert!(matches!(result, Err(AnalysisError::GenerationFailed(_))));
    }
}
