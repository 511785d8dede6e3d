//! Per-agent real-time subscription manager.

use super::registry::SubscriptionRegistry;
use crate::metrics::MetricsStore;
use crate::notify::ChangeNotifier;
use crate::types::{AgentDocument, AgentId, MetricsSnapshot};
use crate::watch::{AgentCallback, WatchSource};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Owns the per-agent watches and the metrics table they feed.
///
/// Subscribe is idempotent: at most one watch is ever open per agent, and a
/// second call while subscribed is a no-op. Failures never reach the caller;
/// a watch that cannot be opened is logged and the agent stays unsubscribed
/// until the next explicit subscribe. Dropping the manager cancels every
/// remaining watch exactly once.
pub struct SubscriptionManager {
    source: Arc<dyn WatchSource>,
    registry: SubscriptionRegistry,
    metrics: Arc<MetricsStore>,
    shut_down: AtomicBool,
}

impl SubscriptionManager {
    pub fn new(source: Arc<dyn WatchSource>, notifier: Arc<ChangeNotifier>) -> Self {
        Self {
            source,
            registry: SubscriptionRegistry::new(),
            metrics: Arc::new(MetricsStore::new(notifier)),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Open a live watch on the agent's entity. Idempotent; infallible from
    /// the caller's perspective.
    pub fn subscribe_to_agent(&self, agent: &AgentId) {
        if self.shut_down.load(Ordering::SeqCst) {
            warn!(%agent, "subscribe after shutdown ignored");
            return;
        }
        if self.registry.has(agent) {
            debug!(%agent, "already subscribed");
            return;
        }

        let on_update = self.update_callback(agent.clone());
        match self.source.watch_agent(agent, on_update) {
            Ok(handle) => {
                if self.registry.open(agent.clone(), handle) {
                    // Shutdown may have drained the registry between the
                    // entry check and this insert; close the straggler so
                    // no watch survives close_all.
                    if self.shut_down.load(Ordering::SeqCst) {
                        self.registry.close(agent);
                        warn!(%agent, "subscribe lost race with shutdown");
                        return;
                    }
                    debug!(%agent, "subscribed");
                } else {
                    // Raced with a concurrent subscribe; the loser's handle
                    // was canceled by the registry.
                    debug!(%agent, "duplicate watch discarded");
                }
            }
            Err(e) => {
                warn!(%agent, error = %e, "failed to open agent watch");
            }
        }
    }

    /// Cancel the agent's watch. No-op if not subscribed. The agent's last
    /// snapshot stays in the metrics table.
    pub fn unsubscribe_from_agent(&self, agent: &AgentId) {
        self.registry.close(agent);
        debug!(%agent, "unsubscribed");
    }

    /// The shared metrics table this manager's watches write into.
    pub fn metrics(&self) -> &MetricsStore {
        &self.metrics
    }

    pub fn is_subscribed(&self, agent: &AgentId) -> bool {
        self.registry.has(agent)
    }

    pub fn subscription_count(&self) -> usize {
        self.registry.len()
    }

    /// Cancel every remaining watch. Runs at most once; later subscribe
    /// calls are refused. Also invoked on drop.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        let open = self.registry.len();
        self.registry.close_all();
        debug!(closed = open, "subscription manager shut down");
    }

    /// Builds the callback that routes one agent's updates into the table.
    fn update_callback(&self, agent: AgentId) -> AgentCallback {
        let metrics = Arc::clone(&self.metrics);
        Box::new(move |document| {
            // Absent entity: the prior snapshot, if any, stays untouched.
            let Some(document) = document else {
                return;
            };
            let doc: AgentDocument = match serde_json::from_value(document) {
                Ok(doc) => doc,
                Err(e) => {
                    warn!(agent = %agent, error = %e, "ignoring malformed agent document");
                    return;
                }
            };

            // Extract the metrics sub-object field by field; anything the
            // update doesn't carry becomes None in the new snapshot.
            let m = doc.metrics.unwrap_or_default();
            let snapshot = MetricsSnapshot {
                slavko_score: m.slavko_score,
                score_change: m.score_change,
                autonomy_level: m.autonomy_level,
                code_quality: m.code_quality,
                performance: m.performance,
            };
            metrics.set(agent.clone(), snapshot);
        })
    }
}

impl Drop for SubscriptionManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FeedError, Result};
    use crate::watch::{ErrorCallback, EvalCallback, MemorySource, WatchHandle};
    use serde_json::json;

    fn manager_over(source: &MemorySource) -> SubscriptionManager {
        SubscriptionManager::new(
            Arc::new(source.clone()),
            Arc::new(ChangeNotifier::new()),
        )
    }

    #[test]
    fn test_subscribe_is_idempotent() {
        let source = MemorySource::new();
        let manager = manager_over(&source);
        let agent = AgentId::from("a");

        manager.subscribe_to_agent(&agent);
        manager.subscribe_to_agent(&agent);

        assert_eq!(source.agent_watch_count(), 1);
        assert_eq!(manager.subscription_count(), 1);
    }

    #[test]
    fn test_update_flows_into_metrics() {
        let source = MemorySource::new();
        let manager = manager_over(&source);
        let agent = AgentId::from("a");

        manager.subscribe_to_agent(&agent);
        source.publish_agent("a", json!({"metrics": {"slavkoScore": 42.0}}));

        let snapshot = manager.metrics().get(&agent).unwrap();
        assert_eq!(snapshot.slavko_score, Some(42.0));
        assert_eq!(snapshot.performance, None);
    }

    #[test]
    fn test_initial_state_delivered_on_subscribe() {
        let source = MemorySource::new();
        source.publish_agent("a", json!({"metrics": {"performance": 0.8}}));
        let manager = manager_over(&source);

        manager.subscribe_to_agent(&AgentId::from("a"));

        let snapshot = manager.metrics().get(&AgentId::from("a")).unwrap();
        assert_eq!(snapshot.performance, Some(0.8));
    }

    #[test]
    fn test_absent_entity_leaves_snapshot() {
        let source = MemorySource::new();
        let manager = manager_over(&source);
        let agent = AgentId::from("a");

        manager.subscribe_to_agent(&agent);
        assert!(manager.metrics().get(&agent).is_none());

        source.publish_agent("a", json!({"metrics": {"slavkoScore": 1.0}}));
        source.remove_agent("a");

        let snapshot = manager.metrics().get(&agent).unwrap();
        assert_eq!(snapshot.slavko_score, Some(1.0));
    }

    #[test]
    fn test_malformed_document_ignored() {
        let source = MemorySource::new();
        let manager = manager_over(&source);
        let agent = AgentId::from("a");

        manager.subscribe_to_agent(&agent);
        source.publish_agent("a", json!({"metrics": {"slavkoScore": 2.0}}));
        source.publish_agent("a", json!({"metrics": "not-an-object"}));

        let snapshot = manager.metrics().get(&agent).unwrap();
        assert_eq!(snapshot.slavko_score, Some(2.0));
    }

    #[test]
    fn test_unsubscribe_keeps_stale_snapshot() {
        let source = MemorySource::new();
        let manager = manager_over(&source);
        let agent = AgentId::from("a");

        manager.subscribe_to_agent(&agent);
        source.publish_agent("a", json!({"metrics": {"slavkoScore": 5.0}}));
        manager.unsubscribe_from_agent(&agent);

        assert_eq!(source.agent_watch_count(), 0);
        // Stale by design: unsubscribe never prunes the table.
        assert!(manager.metrics().get(&agent).is_some());
    }

    #[test]
    fn test_shutdown_closes_everything_once() {
        let source = MemorySource::new();
        let manager = manager_over(&source);
        for name in ["a", "b", "c"] {
            manager.subscribe_to_agent(&AgentId::from(name));
        }
        assert_eq!(source.agent_watch_count(), 3);

        manager.shutdown();
        assert_eq!(source.agent_watch_count(), 0);

        // Late publish mutates nothing.
        source.publish_agent("a", json!({"metrics": {"slavkoScore": 9.0}}));
        assert!(manager.metrics().get(&AgentId::from("a")).is_none());

        // Subscribe after shutdown is refused.
        manager.subscribe_to_agent(&AgentId::from("d"));
        assert_eq!(source.agent_watch_count(), 0);
    }

    #[test]
    fn test_drop_cancels_watches() {
        let source = MemorySource::new();
        {
            let manager = manager_over(&source);
            manager.subscribe_to_agent(&AgentId::from("a"));
            assert_eq!(source.agent_watch_count(), 1);
        }
        assert_eq!(source.agent_watch_count(), 0);
    }

    /// Source that runs a one-shot hook while an agent watch is opening,
    /// before the handle reaches the registry.
    struct HookedSource {
        inner: MemorySource,
        on_open: parking_lot::Mutex<Option<Box<dyn FnOnce() + Send>>>,
    }

    impl WatchSource for HookedSource {
        fn watch_agent(&self, agent: &AgentId, on_update: AgentCallback) -> Result<WatchHandle> {
            let handle = self.inner.watch_agent(agent, on_update)?;
            if let Some(hook) = self.on_open.lock().take() {
                hook();
            }
            Ok(handle)
        }

        fn watch_evaluations(
            &self,
            on_next: EvalCallback,
            on_error: ErrorCallback,
        ) -> Result<WatchHandle> {
            self.inner.watch_evaluations(on_next, on_error)
        }
    }

    #[test]
    fn test_shutdown_during_watch_open_closes_straggler() {
        let source = Arc::new(HookedSource {
            inner: MemorySource::new(),
            on_open: parking_lot::Mutex::new(None),
        });
        let manager = Arc::new(SubscriptionManager::new(
            Arc::clone(&source) as Arc<dyn WatchSource>,
            Arc::new(ChangeNotifier::new()),
        ));

        // Shutdown completes while the watch is mid-open; the handle must
        // not outlive close_all.
        let racer = Arc::clone(&manager);
        *source.on_open.lock() = Some(Box::new(move || racer.shutdown()));

        manager.subscribe_to_agent(&AgentId::from("a"));

        assert_eq!(source.inner.agent_watch_count(), 0);
        assert_eq!(manager.subscription_count(), 0);

        // Late publish mutates nothing.
        source.inner.publish_agent("a", json!({"metrics": {"slavkoScore": 1.0}}));
        assert!(manager.metrics().is_empty());
    }

    /// Source whose agent watches always fail to open.
    struct FailingSource;

    impl WatchSource for FailingSource {
        fn watch_agent(&self, _: &AgentId, _: AgentCallback) -> Result<WatchHandle> {
            Err(FeedError::WatchOpen("connection refused".into()))
        }

        fn watch_evaluations(&self, _: EvalCallback, _: ErrorCallback) -> Result<WatchHandle> {
            Err(FeedError::WatchOpen("connection refused".into()))
        }
    }

    #[test]
    fn test_open_failure_leaves_agent_unsubscribed() {
        let manager = SubscriptionManager::new(
            Arc::new(FailingSource),
            Arc::new(ChangeNotifier::new()),
        );
        let agent = AgentId::from("a");

        manager.subscribe_to_agent(&agent);
        assert!(!manager.is_subscribed(&agent));
        assert!(manager.metrics().is_empty());
    }
}
