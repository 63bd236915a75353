//! Companion orchestration service
//!
//! Ties the forum client, fetch cache, session store, analysis pipeline and
//! publisher together into the three user-triggered actions: fetch, toggle
//! (analyze on first toggle), and publish. Each action runs to completion
//! under its session's lock, so actions within one session are serialized.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::forum::{ForumClient, ForumError};
use crate::model::{CompanionConfig, SortOrder, Thread, ThreadSessionEntry, TimeWindow};
use crate::service::analysis::{AnalysisError, AnalysisPipeline};
use crate::service::cache::{FetchCache, FetchKey};
use crate::service::llm::TextGenerator;
use crate::service::publisher::{PublishOutcome, Publisher};
use crate::service::session::{SessionError, SessionStore};

/// Warning surfaced when the summarizer fell back to the sentinel analysis
const PARSE_FAILURE_WARNING: &str =
    "Failed to parse the analysis response. Using a default structure.";

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("please wait {remaining} seconds before fetching again")]
    CooldownActive { remaining: u64 },

    #[error("limit must be a positive integer")]
    InvalidLimit,

    #[error("forum unavailable: {0}")]
    Forum(#[from] ForumError),
}

#[derive(Debug, thiserror::Error)]
pub enum ToggleError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("unknown thread: {0}")]
    UnknownThread(String),

    #[error("no text-generation API key configured for this session")]
    MissingApiKey,

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("thread has not been analyzed yet: {0}")]
    NotAnalyzed(String),
}

/// Result of a toggle action
pub struct ToggleOutcome {
    pub entry: ThreadSessionEntry,
    /// True when this toggle ran the analysis pipeline (first toggle only)
    pub ran_pipeline: bool,
    /// Warning for the client when the summary fell back to the sentinel
    pub parse_warning: Option<&'static str>,
}

/// Orchestrates the fetch/analyze/publish actions over session state
pub struct CompanionService {
    forum: Arc<dyn ForumClient>,
    cache: FetchCache,
    sessions: SessionStore,
    publisher: Publisher,
    cooldown: Duration,
}

impl CompanionService {
    pub fn new(forum: Arc<dyn ForumClient>, config: &CompanionConfig) -> Self {
        Self {
            cache: FetchCache::new(Duration::from_secs(config.fetch_cache_ttl_secs)),
            sessions: SessionStore::new(),
            publisher: Publisher::new(forum.clone()),
            forum,
            cooldown: Duration::from_secs(config.fetch_cooldown_secs),
        }
    }

    /// Create a new session, optionally with a ready text-generation handle
    pub fn create_session(&self, generator: Option<Arc<dyn TextGenerator>>) -> Uuid {
        self.sessions.create(generator)
    }

    /// Attach a text-generation handle to an existing session
    pub async fn set_generator(
        &self,
        session_id: &Uuid,
        generator: Arc<dyn TextGenerator>,
    ) -> Result<(), SessionError> {
        let session = self.sessions.get(session_id)?;
        let mut state = session.lock().await;
        state.set_generator(generator);
        tracing::info!(session = %session_id, "Text-generation key configured");
        Ok(())
    }

    /// Fetch a thread listing for the session.
    ///
    /// Gated by the per-session cooldown; identical `(sort, window, limit)`
    /// requests are served from the TTL cache without a forum call.
    pub async fn fetch_threads(
        &self,
        session_id: &Uuid,
        sort: SortOrder,
        window: TimeWindow,
        limit: u32,
    ) -> Result<Vec<Thread>, FetchError> {
        if limit == 0 {
            return Err(FetchError::InvalidLimit);
        }

        let session = self.sessions.get(session_id)?;
        let mut state = session.lock().await;

        if let Some(remaining) = state.cooldown_remaining(self.cooldown) {
            tracing::debug!(session = %session_id, remaining = remaining, "Fetch blocked by cooldown");
            return Err(FetchError::CooldownActive { remaining });
        }

        let key = FetchKey {
            sort,
            window,
            limit,
        };

        let threads = match self.cache.get(&key) {
            Some(threads) => threads,
            None => {
                let threads = self.forum.fetch(sort, window, limit).await?;
                tracing::info!(
                    session = %session_id,
                    sort = %sort.as_str(),
                    window = %window.as_str(),
                    thread_count = threads.len(),
                    "Fetched threads from forum"
                );
                self.cache.insert(key, threads.clone());
                threads
            }
        };

        state.mark_fetched(threads.clone());
        Ok(threads)
    }

    /// Current threads with their per-session entry state, for re-render
    pub async fn session_threads(
        &self,
        session_id: &Uuid,
    ) -> Result<Vec<(Thread, ThreadSessionEntry)>, SessionError> {
        let session = self.sessions.get(session_id)?;
        let state = session.lock().await;

        Ok(state
            .threads()
            .iter()
            .map(|thread| {
                let entry = state.entry(&thread.id).cloned().unwrap_or_default();
                (thread.clone(), entry)
            })
            .collect())
    }

    /// Toggle a thread's visibility, running the analysis pipeline the
    /// first time the thread is toggled. Later toggles only flip the flag.
    pub async fn toggle_thread(
        &self,
        session_id: &Uuid,
        thread_id: &str,
    ) -> Result<ToggleOutcome, ToggleError> {
        let session = self.sessions.get(session_id)?;
        let mut state = session.lock().await;

        let thread = state
            .find_thread(thread_id)
            .cloned()
            .ok_or_else(|| ToggleError::UnknownThread(thread_id.to_string()))?;

        let already_analyzed = state.get_or_create_entry(thread_id).analyzed;
        let mut ran_pipeline = false;
        let mut parse_warning = None;

        if !already_analyzed {
            let generator = state.generator().ok_or(ToggleError::MissingApiKey)?;

            let pipeline = AnalysisPipeline::new(generator);
            let result = pipeline.analyze(&thread).await?;

            if result.parse_failed {
                parse_warning = Some(PARSE_FAILURE_WARNING);
            }
            state.record_analysis(thread_id, result.analysis, result.rebuttal);
            ran_pipeline = true;
        }

        state.toggle_visibility(thread_id);
        let entry = state.entry(thread_id).cloned().unwrap_or_default();

        tracing::debug!(
            session = %session_id,
            thread = %thread_id,
            visible = entry.visible,
            ran_pipeline = ran_pipeline,
            "Thread toggled"
        );

        Ok(ToggleOutcome {
            entry,
            ran_pipeline,
            parse_warning,
        })
    }

    /// Publish a thread's rebuttal back to the forum.
    ///
    /// Forum failures never propagate; they come back as an unsuccessful
    /// outcome with a message.
    pub async fn publish_rebuttal(
        &self,
        session_id: &Uuid,
        thread_id: &str,
    ) -> Result<PublishOutcome, PublishError> {
        let session = self.sessions.get(session_id)?;

        let rebuttal = {
            let state = session.lock().await;
            state
                .entry(thread_id)
                .and_then(|e| e.rebuttal.clone())
                .ok_or_else(|| PublishError::NotAnalyzed(thread_id.to_string()))?
        };

        // Lock released before the network call
        Ok(self.publisher.publish(thread_id, &rebuttal).await)
    }

    #[cfg(test)]
    pub(crate) fn sessions(&self) -> &SessionStore {
        &self.sessions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    use crate::forum::test_support::{FakeForum, thread};
    use crate::service::llm::test_support::FakeGenerator;

    fn config() -> CompanionConfig {
        CompanionConfig::default()
    }

    fn five_threads() -> Vec<Thread> {
        (1..=5)
            .map(|i| thread(&format!("t{}", i), &format!("CMV: topic {}", i)))
            .collect()
    }

    fn scripted_generator(pipelines: usize) -> Arc<FakeGenerator> {
        let mut replies = Vec::new();
        for i in 0..pipelines {
            replies.push(Ok(format!(
                r#"{{"main_position": "position {}", "rationale": ["reason a", "reason b"]}}"#,
                i
            )));
            replies.push(Ok(format!("rebuttal {}", i)));
        }
        Arc::new(FakeGenerator::with_replies(replies))
    }

    async fn backdate_last_fetch(service: &CompanionService, sid: &Uuid, secs_ago: Duration) {
        let session = service.sessions().get(sid).unwrap();
        let mut state = session.lock().await;
        state.last_fetch = Instant::now().checked_sub(secs_ago);
    }

    #[tokio::test]
    async fn identical_fetches_share_one_forum_call() {
        let forum = Arc::new(FakeForum::with_threads(five_threads()));
        let service = CompanionService::new(forum.clone(), &config());

        let sid_a = service.create_session(None);
        let sid_b = service.create_session(None);

        let first = service
            .fetch_threads(&sid_a, SortOrder::Top, TimeWindow::All, 5)
            .await
            .unwrap();
        let second = service
            .fetch_threads(&sid_b, SortOrder::Top, TimeWindow::All, 5)
            .await
            .unwrap();

        assert_eq!(forum.fetch_count(), 1, "second fetch must hit the cache");
        assert_eq!(first.len(), 5);
        assert_eq!(
            first.iter().map(|t| &t.id).collect::<Vec<_>>(),
            second.iter().map(|t| &t.id).collect::<Vec<_>>()
        );

        // A different key goes back to the forum (cooldown cleared first,
        // the fetch above armed it)
        backdate_last_fetch(&service, &sid_b, Duration::from_secs(61)).await;
        service
            .fetch_threads(&sid_b, SortOrder::New, TimeWindow::All, 5)
            .await
            .unwrap();
        assert_eq!(forum.fetch_count(), 2);
    }

    #[tokio::test]
    async fn second_fetch_within_cooldown_is_rejected() {
        let forum = Arc::new(FakeForum::with_threads(five_threads()));
        let service = CompanionService::new(forum.clone(), &config());
        let sid = service.create_session(None);

        service
            .fetch_threads(&sid, SortOrder::Top, TimeWindow::All, 5)
            .await
            .unwrap();

        let result = service
            .fetch_threads(&sid, SortOrder::Top, TimeWindow::All, 5)
            .await;
        assert!(matches!(result, Err(FetchError::CooldownActive { .. })));
        assert_eq!(forum.fetch_count(), 1);

        // 30.5s into the window: 29 whole seconds left
        backdate_last_fetch(&service, &sid, Duration::from_millis(30_500)).await;
        match service
            .fetch_threads(&sid, SortOrder::Top, TimeWindow::All, 5)
            .await
        {
            Err(FetchError::CooldownActive { remaining }) => assert_eq!(remaining, 29),
            other => panic!("expected cooldown rejection, got {:?}", other.map(|t| t.len())),
        }

        // Past the window the fetch runs again (cache still serves it)
        backdate_last_fetch(&service, &sid, Duration::from_secs(61)).await;
        service
            .fetch_threads(&sid, SortOrder::Top, TimeWindow::All, 5)
            .await
            .unwrap();
        assert_eq!(forum.fetch_count(), 1);
    }

    #[tokio::test]
    async fn zero_limit_is_invalid() {
        let forum = Arc::new(FakeForum::with_threads(five_threads()));
        let service = CompanionService::new(forum, &config());
        let sid = service.create_session(None);

        let result = service
            .fetch_threads(&sid, SortOrder::Top, TimeWindow::All, 0)
            .await;
        assert!(matches!(result, Err(FetchError::InvalidLimit)));
    }

    #[tokio::test]
    async fn toggle_analyzes_once_then_only_flips_visibility() {
        let forum = Arc::new(FakeForum::with_threads(five_threads()));
        let service = CompanionService::new(forum, &config());
        let generator = scripted_generator(1);
        let sid = service.create_session(Some(generator.clone()));

        service
            .fetch_threads(&sid, SortOrder::Top, TimeWindow::All, 5)
            .await
            .unwrap();

        // First toggle: one summarize + one rebut, visible flips on
        let outcome = service.toggle_thread(&sid, "t3").await.unwrap();
        assert!(outcome.ran_pipeline);
        assert!(outcome.entry.visible);
        assert!(outcome.entry.analyzed);
        let analysis = outcome.entry.analysis.clone().unwrap();
        assert!(!analysis.main_position.is_empty());
        assert!(!analysis.rationale.is_empty());
        assert!(!outcome.entry.rebuttal.clone().unwrap().is_empty());
        assert_eq!(generator.call_count(), 2);

        // Second toggle: hide, zero further model calls, results kept
        let outcome = service.toggle_thread(&sid, "t3").await.unwrap();
        assert!(!outcome.ran_pipeline);
        assert!(!outcome.entry.visible);
        assert_eq!(outcome.entry.analysis, Some(analysis));
        assert_eq!(generator.call_count(), 2);

        // Third toggle: show again, still no new calls
        let outcome = service.toggle_thread(&sid, "t3").await.unwrap();
        assert!(outcome.entry.visible);
        assert_eq!(generator.call_count(), 2);
    }

    #[tokio::test]
    async fn toggle_without_generator_is_refused() {
        let forum = Arc::new(FakeForum::with_threads(five_threads()));
        let service = CompanionService::new(forum, &config());
        let sid = service.create_session(None);

        service
            .fetch_threads(&sid, SortOrder::Top, TimeWindow::All, 5)
            .await
            .unwrap();

        let result = service.toggle_thread(&sid, "t1").await;
        assert!(matches!(result, Err(ToggleError::MissingApiKey)));

        // Supplying the key afterwards unblocks the analysis
        service
            .set_generator(&sid, scripted_generator(1))
            .await
            .unwrap();
        assert!(service.toggle_thread(&sid, "t1").await.is_ok());
    }

    #[tokio::test]
    async fn toggle_unknown_thread_is_an_error() {
        let forum = Arc::new(FakeForum::with_threads(five_threads()));
        let service = CompanionService::new(forum, &config());
        let sid = service.create_session(Some(scripted_generator(1)));

        service
            .fetch_threads(&sid, SortOrder::Top, TimeWindow::All, 5)
            .await
            .unwrap();

        let result = service.toggle_thread(&sid, "nope").await;
        assert!(matches!(result, Err(ToggleError::UnknownThread(_))));
    }

    #[tokio::test]
    async fn malformed_summary_carries_a_warning_through_toggle() {
        let forum = Arc::new(FakeForum::with_threads(five_threads()));
        let service = CompanionService::new(forum, &config());
        let generator = Arc::new(FakeGenerator::with_replies(vec![
            Ok("{ broken".to_string()),
            Ok("rebuttal anyway".to_string()),
        ]));
        let sid = service.create_session(Some(generator));

        service
            .fetch_threads(&sid, SortOrder::Top, TimeWindow::All, 5)
            .await
            .unwrap();

        let outcome = service.toggle_thread(&sid, "t1").await.unwrap();
        assert_eq!(
            outcome.parse_warning,
            Some("Failed to parse the analysis response. Using a default structure.")
        );
        assert!(outcome.entry.analyzed);
    }

    #[tokio::test]
    async fn publish_requires_an_analysis() {
        let forum = Arc::new(FakeForum::with_threads(five_threads()));
        let service = CompanionService::new(forum.clone(), &config());
        let sid = service.create_session(Some(scripted_generator(1)));

        service
            .fetch_threads(&sid, SortOrder::Top, TimeWindow::All, 5)
            .await
            .unwrap();

        let result = service.publish_rebuttal(&sid, "t1").await;
        assert!(matches!(result, Err(PublishError::NotAnalyzed(_))));

        service.toggle_thread(&sid, "t1").await.unwrap();
        let outcome = service.publish_rebuttal(&sid, "t1").await.unwrap();
        assert!(outcome.success);
        assert_eq!(forum.reply_count(), 1);
    }

    #[tokio::test]
    async fn publish_failure_is_reported_not_raised() {
        let forum = Arc::new(FakeForum::with_threads(five_threads()).failing_replies());
        let service = CompanionService::new(forum, &config());
        let sid = service.create_session(Some(scripted_generator(1)));

        service
            .fetch_threads(&sid, SortOrder::Top, TimeWindow::All, 5)
            .await
            .unwrap();
        service.toggle_thread(&sid, "t1").await.unwrap();

        let outcome = service.publish_rebuttal(&sid, "t1").await.unwrap();
        assert!(!outcome.success);
        assert!(outcome.message.contains("Failed to post comment"));
    }
}
