//! In-process watch source backed by shared tables.
//!
//! `MemorySource` plays the role of the remote document store: producers
//! publish agent documents and evaluation lists, and every open watch is
//! invoked synchronously with the new state. Cancel removes the watcher
//! under the delivery lock, so once cancel returns no callback can fire.

use super::{AgentCallback, ErrorCallback, EvalCallback, WatchHandle, WatchSource};
use crate::error::Result;
use crate::types::AgentId;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Identifier for one open watch.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
struct WatchId(u64);

struct AgentWatcher {
    agent: AgentId,
    on_update: AgentCallback,
}

struct EvalWatcher {
    on_next: EvalCallback,
    on_error: ErrorCallback,
}

struct Inner {
    /// Current agent documents.
    agents: RwLock<HashMap<AgentId, serde_json::Value>>,
    /// Evaluation list; `None` until the first publish (nothing to deliver).
    evaluations: RwLock<Option<Vec<serde_json::Value>>>,
    /// Open entity watches. Delivery and cancel both take this lock.
    agent_watchers: Mutex<HashMap<WatchId, AgentWatcher>>,
    /// Open collection watches.
    eval_watchers: Mutex<HashMap<WatchId, EvalWatcher>>,
    next_id: AtomicU64,
}

/// In-process implementation of [`WatchSource`].
///
/// Cloning is cheap and yields another handle to the same store, so one
/// clone can act as the producer while another is handed to the feed.
#[derive(Clone)]
pub struct MemorySource {
    inner: Arc<Inner>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                agents: RwLock::new(HashMap::new()),
                evaluations: RwLock::new(None),
                agent_watchers: Mutex::new(HashMap::new()),
                eval_watchers: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    fn next_id(&self) -> WatchId {
        WatchId(self.inner.next_id.fetch_add(1, Ordering::SeqCst))
    }

    // --- Producer side ---

    /// Store an agent document and deliver it to every watcher of that agent.
    pub fn publish_agent(&self, agent: impl Into<AgentId>, document: serde_json::Value) {
        let agent = agent.into();
        self.inner
            .agents
            .write()
            .insert(agent.clone(), document.clone());

        let watchers = self.inner.agent_watchers.lock();
        for watcher in watchers.values().filter(|w| w.agent == agent) {
            (watcher.on_update)(Some(document.clone()));
        }
    }

    /// Remove an agent document and report its absence to every watcher.
    pub fn remove_agent(&self, agent: impl Into<AgentId>) {
        let agent = agent.into();
        self.inner.agents.write().remove(&agent);

        let watchers = self.inner.agent_watchers.lock();
        for watcher in watchers.values().filter(|w| w.agent == agent) {
            (watcher.on_update)(None);
        }
    }

    /// Replace the evaluation list and deliver it to every collection watcher.
    pub fn publish_evaluations(&self, documents: Vec<serde_json::Value>) {
        *self.inner.evaluations.write() = Some(documents.clone());

        let watchers = self.inner.eval_watchers.lock();
        for watcher in watchers.values() {
            (watcher.on_next)(documents.clone());
        }
    }

    /// Report a watch-level failure to every collection watcher. The watches
    /// stay open; a later publish resumes normal delivery.
    pub fn fail_evaluations(&self, message: impl Into<String>) {
        let message = message.into();
        let watchers = self.inner.eval_watchers.lock();
        for watcher in watchers.values() {
            (watcher.on_error)(message.clone());
        }
    }

    // --- Introspection ---

    /// Number of open entity watches.
    pub fn agent_watch_count(&self) -> usize {
        self.inner.agent_watchers.lock().len()
    }

    /// Number of open collection watches.
    pub fn evaluation_watch_count(&self) -> usize {
        self.inner.eval_watchers.lock().len()
    }

    /// Total open watches of both kinds.
    pub fn open_watch_count(&self) -> usize {
        self.agent_watch_count() + self.evaluation_watch_count()
    }
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchSource for MemorySource {
    fn watch_agent(&self, agent: &AgentId, on_update: AgentCallback) -> Result<WatchHandle> {
        let id = self.next_id();
        let initial = self.inner.agents.read().get(agent).cloned();

        {
            let mut watchers = self.inner.agent_watchers.lock();
            // Initial delivery happens under the watcher lock, like every
            // later one, so cancel cannot race it.
            on_update(initial);
            watchers.insert(
                id,
                AgentWatcher {
                    agent: agent.clone(),
                    on_update,
                },
            );
        }

        let inner = Arc::clone(&self.inner);
        Ok(WatchHandle::new(move || {
            inner.agent_watchers.lock().remove(&id);
        }))
    }

    fn watch_evaluations(
        &self,
        on_next: EvalCallback,
        on_error: ErrorCallback,
    ) -> Result<WatchHandle> {
        let id = self.next_id();
        let initial = self.inner.evaluations.read().clone();

        {
            let mut watchers = self.inner.eval_watchers.lock();
            if let Some(documents) = initial {
                on_next(documents);
            }
            watchers.insert(id, EvalWatcher { on_next, on_error });
        }

        let inner = Arc::clone(&self.inner);
        Ok(WatchHandle::new(move || {
            inner.eval_watchers.lock().remove(&id);
        }))
    }
}
