//! Watch primitive abstraction.
//!
//! The feed core never talks to a concrete data store. It depends on a
//! [`WatchSource`]: something that can open a push-based watch on a single
//! agent entity or on the evaluation collection and hand back a cancelable
//! [`WatchHandle`]. Production sources wrap a remote document store;
//! [`MemorySource`] provides the same contract in-process.

mod memory;

pub use memory::MemorySource;

use crate::error::Result;
use crate::types::AgentId;
use std::fmt;

/// Callback for entity watches: the current document, or `None` when the
/// entity does not exist.
pub type AgentCallback = Box<dyn Fn(Option<serde_json::Value>) + Send + Sync>;

/// Callback for collection watches: the full evaluation list, wholesale.
pub type EvalCallback = Box<dyn Fn(Vec<serde_json::Value>) + Send + Sync>;

/// Callback for collection watch failures.
pub type ErrorCallback = Box<dyn Fn(String) + Send + Sync>;

/// A push-based data source the feed can open watches against.
///
/// Implementations must guarantee that once a handle's cancel has returned,
/// no further callbacks fire for that handle.
pub trait WatchSource: Send + Sync {
    /// Open a watch on one agent entity. The callback fires on every update,
    /// including one initial delivery of the entity's current state.
    fn watch_agent(&self, agent: &AgentId, on_update: AgentCallback) -> Result<WatchHandle>;

    /// Open a watch on the evaluation collection. `on_next` receives the
    /// full list on every change; `on_error` reports watch-level failures
    /// without closing the watch.
    fn watch_evaluations(
        &self,
        on_next: EvalCallback,
        on_error: ErrorCallback,
    ) -> Result<WatchHandle>;
}

/// Cancelable subscription handle.
///
/// The cancel function runs exactly once: either explicitly via
/// [`WatchHandle::cancel`], or when the handle is dropped. Holding the handle
/// is what keeps the watch alive.
pub struct WatchHandle {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl WatchHandle {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Cancel the watch now. Equivalent to dropping the handle.
    pub fn cancel(mut self) {
        self.run();
    }

    fn run(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.run();
    }
}

impl fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchHandle")
            .field("canceled", &self.cancel.is_none())
            .finish()
    }
}
