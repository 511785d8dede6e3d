//! # Evaluation Feed
//!
//! A live view of evaluation records for a set of monitored agents: one
//! collection-level snapshot feed, plus opt-in per-agent metric
//! subscriptions merged into a shared table.
//!
//! ## Core Concepts
//!
//! - **Watch**: abstract push-based subscription on an entity or collection,
//!   returning a cancel-on-drop handle
//! - **Subscriptions**: at most one live watch per agent, torn down exactly
//!   once on unsubscribe or shutdown
//! - **Metrics**: last-write-wins snapshot per agent, replaced wholesale
//! - **Evaluations**: the full record list, replaced on every change event
//!
//! ## Example
//!
//! ```ignore
//! use evalfeed::{AgentId, EvaluationView, MemorySource};
//! use std::sync::Arc;
//!
//! let source = MemorySource::new();
//! let view = EvaluationView::open(Arc::new(source.clone()));
//!
//! view.subscribe_to_agent(&AgentId::from("agent-1"));
//! source.publish_agent("agent-1", serde_json::json!({
//!     "metrics": { "slavkoScore": 42.0, "performance": 0.9 }
//! }));
//!
//! let metrics = view.real_time_metrics();
//! assert_eq!(metrics[&AgentId::from("agent-1")].slavko_score, Some(42.0));
//! ```

pub mod error;
pub mod evaluations;
pub mod metrics;
pub mod notify;
pub mod quality;
pub mod subscriptions;
pub mod types;
pub mod view;
pub mod watch;

// Re-exports
pub use error::{FeedError, Result};
pub use evaluations::{EvaluationFeed, FeedStatus};
pub use metrics::MetricsStore;
pub use notify::{ChangeEvent, ChangeListener, ChangeNotifier, ListenerId};
pub use quality::{
    CodeQualityAnalysis, HttpBackend, QualityAnalyzer, QualityConfig, ScoreBackend,
};
pub use subscriptions::{SubscriptionManager, SubscriptionRegistry};
pub use types::*;
pub use view::EvaluationView;
pub use watch::{AgentCallback, ErrorCallback, EvalCallback, MemorySource, WatchHandle, WatchSource};
