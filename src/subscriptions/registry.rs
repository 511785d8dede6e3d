//! Per-agent watch handle registry.

use crate::types::AgentId;
use crate::watch::WatchHandle;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Tracks the open watch handle for each subscribed agent.
///
/// Enforces at-most-one handle per agent. Handles cancel on drop, so
/// removing an entry is what cancels its watch; every handle that enters the
/// registry is canceled exactly once, on whichever path removes it.
pub struct SubscriptionRegistry {
    entries: Mutex<HashMap<AgentId, WatchHandle>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// True iff a watch is currently open for this agent.
    pub fn has(&self, agent: &AgentId) -> bool {
        self.entries.lock().contains_key(agent)
    }

    /// Store a handle for the agent. Refuses if one is already open: the
    /// incoming handle is dropped (canceling the duplicate watch) and
    /// `false` is returned.
    pub fn open(&self, agent: AgentId, handle: WatchHandle) -> bool {
        use std::collections::hash_map::Entry;

        let duplicate = {
            let mut entries = self.entries.lock();
            match entries.entry(agent) {
                Entry::Vacant(slot) => {
                    slot.insert(handle);
                    None
                }
                Entry::Occupied(_) => Some(handle),
            }
        };

        match duplicate {
            // Cancel the duplicate outside the registry lock.
            Some(handle) => {
                drop(handle);
                false
            }
            None => true,
        }
    }

    /// Cancel and remove the agent's watch. No-op if not open.
    pub fn close(&self, agent: &AgentId) {
        let handle = self.entries.lock().remove(agent);
        // Dropping outside the lock; cancel may call back into the source.
        drop(handle);
    }

    /// Cancel and remove every entry. Safe to interleave with `close`.
    pub fn close_all(&self) {
        let drained: Vec<WatchHandle> = {
            let mut entries = self.entries.lock();
            entries.drain().map(|(_, handle)| handle).collect()
        };
        drop(drained);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
