//! Shared LLM client and interaction utilities
//!
//! Provides a common interface for OpenAI API interactions used by the
//! summarizer and rebuttal generator, behind a trait so tests can substitute
//! scripted fakes and count calls.

use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers::openai;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("completion request failed: {0}")]
    Completion(String),
}

/// Text-generation boundary.
///
/// One call = one completion with a system instruction and user content.
/// Temperature is pinned to zero by implementations.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, model: &str, system: &str, user: &str) -> Result<String, LlmError>;
}

/// OpenAI-backed generator built from an operator-supplied API key
pub struct OpenAiGenerator {
    client: openai::Client,
}

impl OpenAiGenerator {
    /// Create a new generator with the provided API key.
    /// The key is only validated when the first completion runs.
    pub fn new(api_key: &str) -> Self {
        Self {
            client: openai::Client::new(api_key),
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn complete(&self, model: &str, system: &str, user: &str) -> Result<String, LlmError> {
        let agent = self
            .client
            .agent(model)
            .preamble(system)
            .temperature(0.0)
            .build();

        agent
            .prompt(user)
            .await
            .map_err(|e| LlmError::Completion(e.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Scripted generator: returns queued replies in order and records the
    /// prompts it was called with.
    pub struct FakeGenerator {
        replies: Mutex<Vec<Result<String, String>>>,
        pub calls: AtomicUsize,
        pub prompts: Mutex<Vec<(String, String)>>,
    }

    impl FakeGenerator {
        pub fn with_replies(replies: Vec<Result<String, String>>) -> Self {
            Self {
                replies: Mutex::new(replies),
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TextGenerator for FakeGenerator {
        async fn complete(
            &self,
            _model: &str,
            system: &str,
            user: &str,
        ) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts
                .lock()
                .unwrap()
                .push((system.to_string(), user.to_string()));

            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                return Err(LlmError::Completion("no scripted reply left".to_string()));
            }
            replies.remove(0).map_err(LlmError::Completion)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_builds_without_validating_the_key() {
        // No network round-trip at construction time
        let _generator = OpenAiGenerator::new("sk-not-a-real-key");
    }
}
