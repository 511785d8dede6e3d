//! Shared per-agent metrics table.

use crate::notify::{ChangeEvent, ChangeNotifier};
use crate::types::{AgentId, MetricsSnapshot};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Latest known metrics snapshot per agent.
///
/// Written only by subscription-driven callbacks; each write replaces the
/// agent's snapshot wholesale under the table lock, so readers never observe
/// a partially written snapshot. Entries survive unsubscribe — the table is
/// stale-retaining by default and pruned only through [`MetricsStore::forget`].
pub struct MetricsStore {
    table: RwLock<HashMap<AgentId, MetricsSnapshot>>,
    notifier: Arc<ChangeNotifier>,
}

impl MetricsStore {
    pub fn new(notifier: Arc<ChangeNotifier>) -> Self {
        Self {
            table: RwLock::new(HashMap::new()),
            notifier,
        }
    }

    /// Latest snapshot for one agent, if any update has ever arrived.
    pub fn get(&self, agent: &AgentId) -> Option<MetricsSnapshot> {
        self.table.read().get(agent).cloned()
    }

    /// The whole table, for consumers that re-read on change notification.
    pub fn all(&self) -> HashMap<AgentId, MetricsSnapshot> {
        self.table.read().clone()
    }

    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.read().is_empty()
    }

    /// Replace the agent's snapshot wholesale.
    pub(crate) fn set(&self, agent: AgentId, snapshot: MetricsSnapshot) {
        self.table.write().insert(agent.clone(), snapshot);
        self.notifier.emit(ChangeEvent::Metrics(agent));
    }

    /// Drop the agent's snapshot. Returns whether an entry existed.
    pub(crate) fn forget(&self, agent: &AgentId) -> bool {
        let removed = self.table.write().remove(agent).is_some();
        if removed {
            self.notifier.emit(ChangeEvent::Metrics(agent.clone()));
        }
        removed
    }
}
