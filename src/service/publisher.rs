//! Publisher for posting rebuttals back to the forum
//!
//! Catches every failure from the forum's write path and converts it to a
//! success flag plus a human-readable message. A failed post must never
//! crash the interactive session, so nothing propagates from here.

use std::sync::Arc;

use crate::forum::ForumClient;

/// Outcome of a publish attempt
#[derive(Debug, Clone)]
pub struct PublishOutcome {
    pub success: bool,
    pub message: String,
}

/// Posts rebuttal text as a reply to the original thread
pub struct Publisher {
    forum: Arc<dyn ForumClient>,
}

impl Publisher {
    pub fn new(forum: Arc<dyn ForumClient>) -> Self {
        Self { forum }
    }

    pub async fn publish(&self, thread_id: &str, rebuttal_text: &str) -> PublishOutcome {
        match self.forum.reply(thread_id, rebuttal_text).await {
            Ok(()) => {
                tracing::info!(thread = %thread_id, "Rebuttal published");
                PublishOutcome {
                    success: true,
                    message: "Comment posted successfully".to_string(),
                }
            }
            Err(e) => {
                tracing::warn!(thread = %thread_id, error = %e, "Failed to publish rebuttal");
                PublishOutcome {
                    success: false,
                    message: format!("Failed to post comment: {}", e),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forum::test_support::FakeForum;

    #[tokio::test]
    async fn successful_reply_reports_success() {
        let forum = Arc::new(FakeForum::with_threads(vec![]));
        let publisher = Publisher::new(forum.clone());

        let outcome = publisher.publish("abc", "my rebuttal").await;

        assert!(outcome.success);
        assert_eq!(forum.reply_count(), 1);
    }

    #[tokio::test]
    async fn forum_failure_becomes_false_plus_message() {
        let forum = Arc::new(FakeForum::with_threads(vec![]).failing_replies());
        let publisher = Publisher::new(forum.clone());

        let outcome = publisher.publish("abc", "my rebuttal").await;

        assert!(!outcome.success);
        assert!(outcome.message.starts_with("Failed to post comment:"));
        assert_eq!(forum.reply_count(), 1);
    }
}
