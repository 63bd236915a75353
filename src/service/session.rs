//! Session state store
//!
//! Process-local key/value state scoped to one interactive session: fetched
//! threads, per-thread entries, the cooldown timestamp, and the session's
//! text-generation handle. Survives re-renders within a session, dies with
//! the process, and is never shared between sessions.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::model::{Analysis, Thread, ThreadSessionEntry};
use crate::service::llm::TextGenerator;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(Uuid),
}

/// All mutable state for one session
pub struct SessionState {
    threads: Vec<Thread>,
    entries: HashMap<String, ThreadSessionEntry>,
    pub(crate) last_fetch: Option<Instant>,
    generator: Option<Arc<dyn TextGenerator>>,
}

impl SessionState {
    fn new(generator: Option<Arc<dyn TextGenerator>>) -> Self {
        Self {
            threads: Vec::new(),
            entries: HashMap::new(),
            last_fetch: None,
            generator,
        }
    }

    /// Threads from the most recent successful fetch
    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    pub fn find_thread(&self, thread_id: &str) -> Option<&Thread> {
        self.threads.iter().find(|t| t.id == thread_id)
    }

    pub fn generator(&self) -> Option<Arc<dyn TextGenerator>> {
        self.generator.clone()
    }

    pub fn set_generator(&mut self, generator: Arc<dyn TextGenerator>) {
        self.generator = Some(generator);
    }

    /// Get the entry for a thread, creating it with defaults on first access
    pub fn get_or_create_entry(&mut self, thread_id: &str) -> &mut ThreadSessionEntry {
        self.entries.entry(thread_id.to_string()).or_default()
    }

    pub fn entry(&self, thread_id: &str) -> Option<&ThreadSessionEntry> {
        self.entries.get(thread_id)
    }

    /// Flip the visibility flag for a thread
    pub fn toggle_visibility(&mut self, thread_id: &str) {
        let entry = self.get_or_create_entry(thread_id);
        entry.visible = !entry.visible;
    }

    /// Store the pipeline result for a thread.
    ///
    /// Taking both values together keeps the invariant that `analysis` and
    /// `rebuttal` are never independently set.
    pub fn record_analysis(&mut self, thread_id: &str, analysis: Analysis, rebuttal: String) {
        let entry = self.get_or_create_entry(thread_id);
        entry.analysis = Some(analysis);
        entry.rebuttal = Some(rebuttal);
        entry.analyzed = true;
    }

    /// Seconds left on the fetch cooldown, or `None` when a fetch may run.
    /// Remaining time is `cooldown - elapsed`, rounded down to whole seconds.
    pub fn cooldown_remaining(&self, cooldown: Duration) -> Option<u64> {
        let last = self.last_fetch?;
        let elapsed = last.elapsed();
        if elapsed >= cooldown {
            None
        } else {
            Some((cooldown - elapsed).as_secs())
        }
    }

    /// Record a successful fetch: stores the threads and arms the cooldown
    pub fn mark_fetched(&mut self, threads: Vec<Thread>) {
        self.threads = threads;
        self.last_fetch = Some(Instant::now());
    }
}

/// Store of all live sessions, keyed by session id.
///
/// Each session sits behind its own async mutex, so actions within one
/// session are serialized while separate sessions never contend.
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<SessionState>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn create(&self, generator: Option<Arc<dyn TextGenerator>>) -> Uuid {
        let id = Uuid::new_v4();
        let mut sessions = self.sessions.write().unwrap();
        sessions.insert(id, Arc::new(Mutex::new(SessionState::new(generator))));
        tracing::info!(session = %id, "Session created");
        id
    }

    pub fn get(&self, id: &Uuid) -> Result<Arc<Mutex<SessionState>>, SessionError> {
        let sessions = self.sessions.read().unwrap();
        sessions
            .get(id)
            .cloned()
            .ok_or(SessionError::NotFound(*id))
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
