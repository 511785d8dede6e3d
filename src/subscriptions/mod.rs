//! Per-agent live subscriptions.
//!
//! The registry tracks at most one open watch handle per agent; the manager
//! composes it with the metrics table and owns teardown:
//!
//! ```ignore
//! let manager = SubscriptionManager::new(source, notifier);
//!
//! manager.subscribe_to_agent(&"agent-1".into());
//! // ... updates flow into manager.metrics() ...
//! manager.unsubscribe_from_agent(&"agent-1".into());
//! // Dropping the manager cancels whatever is still open.
//! ```

mod manager;
mod registry;

pub use manager::SubscriptionManager;
pub use registry::SubscriptionRegistry;
