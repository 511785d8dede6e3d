//! Top-level live view tying the snapshot feed and the subscription manager
//! together.

use crate::evaluations::{EvaluationFeed, FeedStatus};
use crate::notify::{ChangeListener, ChangeNotifier};
use crate::subscriptions::SubscriptionManager;
use crate::types::{AgentId, EvaluationRecord, MetricsSnapshot};
use crate::watch::WatchSource;
use std::collections::HashMap;
use std::sync::Arc;

/// A continuously refreshed view of evaluations and per-agent metrics.
///
/// Owns one collection feed, one subscription manager, and the notifier both
/// report through. The read surface is always consistent per table; the
/// evaluation list and the metrics table are independent and never wait on
/// each other. Dropping the view tears both down.
pub struct EvaluationView {
    notifier: Arc<ChangeNotifier>,
    feed: EvaluationFeed,
    manager: SubscriptionManager,
}

impl EvaluationView {
    /// Open the view over a watch source. Infallible: a feed that cannot be
    /// opened reports through [`EvaluationView::error`] instead.
    pub fn open(source: Arc<dyn WatchSource>) -> Self {
        let notifier = Arc::new(ChangeNotifier::new());
        let feed = EvaluationFeed::open(source.as_ref(), Arc::clone(&notifier));
        let manager = SubscriptionManager::new(source, Arc::clone(&notifier));
        Self {
            notifier,
            feed,
            manager,
        }
    }

    // --- Read surface ---

    /// The full evaluation list.
    pub fn evaluations(&self) -> Vec<EvaluationRecord> {
        self.feed.evaluations()
    }

    /// True until the feed's first delivery or failure.
    pub fn loading(&self) -> bool {
        self.feed.loading()
    }

    /// Feed failure message, if any.
    pub fn error(&self) -> Option<String> {
        self.feed.error()
    }

    pub fn feed_status(&self) -> FeedStatus {
        self.feed.status()
    }

    /// The whole per-agent metrics table, re-read wholesale.
    pub fn real_time_metrics(&self) -> HashMap<AgentId, MetricsSnapshot> {
        self.manager.metrics().all()
    }

    /// Latest snapshot for one agent.
    pub fn agent_metrics(&self, agent: &AgentId) -> Option<MetricsSnapshot> {
        self.manager.metrics().get(agent)
    }

    // --- Subscriptions ---

    pub fn subscribe_to_agent(&self, agent: &AgentId) {
        self.manager.subscribe_to_agent(agent);
    }

    pub fn unsubscribe_from_agent(&self, agent: &AgentId) {
        self.manager.unsubscribe_from_agent(agent);
    }

    pub fn is_subscribed(&self, agent: &AgentId) -> bool {
        self.manager.is_subscribed(agent)
    }

    /// Explicitly prune a stale snapshot. Unsubscribe never does this;
    /// forgetting is always an explicit consumer decision.
    pub fn forget_agent(&self, agent: &AgentId) -> bool {
        self.manager.metrics().forget(agent)
    }

    /// Register for change events; the listener tells the consumer when to
    /// re-read one of the surfaces above.
    pub fn changes(&self) -> ChangeListener {
        self.notifier.subscribe()
    }

    /// Tear down both the feed and every agent watch. Dropping the view is
    /// equivalent.
    pub fn shutdown(&self) {
        self.manager.shutdown();
        self.feed.close();
    }
}
