//! Forum client boundary
//!
//! Read path fetches bounded thread listings by sort order; write path posts
//! a reply to a thread. The trait seam lets tests substitute fakes for the
//! real Reddit client.

mod reddit;

use async_trait::async_trait;

use crate::model::{SortOrder, Thread, TimeWindow};

pub use reddit::RedditClient;

#[derive(Debug, thiserror::Error)]
pub enum ForumError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("forum authentication failed: {0}")]
    Auth(String),

    #[error("failed to parse forum response: {0}")]
    Parse(String),

    #[error("forum rejected the request: {0}")]
    Rejected(String),
}

/// Client for a single forum community.
#[async_trait]
pub trait ForumClient: Send + Sync {
    /// Fetch up to `limit` threads in the requested sort order.
    ///
    /// `window` is only meaningful for `SortOrder::Top`; other sort orders
    /// ignore it. Result ordering follows the forum's own ranking.
    async fn fetch(
        &self,
        sort: SortOrder,
        window: TimeWindow,
        limit: u32,
    ) -> Result<Vec<Thread>, ForumError>;

    /// Post `text` as a reply to the thread with the given id.
    async fn reply(&self, thread_id: &str, text: &str) -> Result<(), ForumError>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// In-memory forum with call counters for cache and publish assertions.
    pub struct FakeForum {
        pub threads: Mutex<Vec<Thread>>,
        pub fetch_calls: AtomicUsize,
        pub reply_calls: AtomicUsize,
        pub fail_replies: bool,
    }

    impl FakeForum {
        pub fn with_threads(threads: Vec<Thread>) -> Self {
            Self {
                threads: Mutex::new(threads),
                fetch_calls: AtomicUsize::new(0),
                reply_calls: AtomicUsize::new(0),
                fail_replies: false,
            }
        }

        pub fn failing_replies(mut self) -> Self {
            self.fail_replies = true;
            self
        }

        pub fn fetch_count(&self) -> usize {
            self.fetch_calls.load(Ordering::SeqCst)
        }

        pub fn reply_count(&self) -> usize {
            self.reply_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ForumClient for FakeForum {
        async fn fetch(
            &self,
            _sort: SortOrder,
            _window: TimeWindow,
            limit: u32,
        ) -> Result<Vec<Thread>, ForumError> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            let threads = self.threads.lock().unwrap();
            Ok(threads.iter().take(limit as usize).cloned().collect())
        }

        async fn reply(&self, thread_id: &str, _text: &str) -> Result<(), ForumError> {
            self.reply_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_replies {
                return Err(ForumError::Rejected(format!(
                    "RATELIMIT on thread {}",
                    thread_id
                )));
            }
            Ok(())
        }
    }

    pub fn thread(id: &str, title: &str) -> Thread {
        Thread {
            id: id.to_string(),
            title: title.to_string(),
            selftext: format!("Body of {}", id),
        }
    }
}
