//! Collection-level evaluation snapshot feed.

use crate::notify::{ChangeEvent, ChangeNotifier};
use crate::types::{EvaluationDocument, EvaluationRecord};
use crate::watch::{ErrorCallback, EvalCallback, WatchHandle, WatchSource};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Feed lifecycle status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeedStatus {
    /// Watch opened, no data delivered yet.
    Loading,
    /// At least one snapshot delivered.
    Ready,
    /// The watch reported a failure. Not terminal: the watch stays open and
    /// a later successful delivery returns the feed to `Ready`.
    Error(String),
}

struct FeedState {
    evaluations: RwLock<Vec<EvaluationRecord>>,
    status: RwLock<FeedStatus>,
    notifier: Arc<ChangeNotifier>,
}

/// Maintains the full evaluation list from a single collection watch.
pub struct EvaluationFeed {
    state: Arc<FeedState>,
    watch: Mutex<Option<WatchHandle>>,
}

impl EvaluationFeed {
    /// Open the collection watch. Infallible by design: an open failure is
    /// surfaced through [`FeedStatus::Error`], never returned to the caller.
    pub fn open(source: &dyn WatchSource, notifier: Arc<ChangeNotifier>) -> Self {
        let state = Arc::new(FeedState {
            evaluations: RwLock::new(Vec::new()),
            status: RwLock::new(FeedStatus::Loading),
            notifier,
        });

        let on_next: EvalCallback = {
            let state = Arc::clone(&state);
            Box::new(move |documents| {
                let mut records = Vec::with_capacity(documents.len());
                for document in documents {
                    match serde_json::from_value::<EvaluationDocument>(document) {
                        Ok(doc) => records.push(doc.decode()),
                        // Malformed records are skipped, not fatal.
                        Err(e) => warn!(error = %e, "skipping malformed evaluation document"),
                    }
                }
                debug!(count = records.len(), "evaluation list replaced");
                *state.evaluations.write() = records;
                *state.status.write() = FeedStatus::Ready;
                state.notifier.emit(ChangeEvent::Evaluations);
                state.notifier.emit(ChangeEvent::FeedStatus);
            })
        };

        let on_error: ErrorCallback = {
            let state = Arc::clone(&state);
            Box::new(move |message| {
                error!(%message, "evaluation watch reported a failure");
                *state.status.write() = FeedStatus::Error(message);
                state.notifier.emit(ChangeEvent::FeedStatus);
            })
        };

        let watch = match source.watch_evaluations(on_next, on_error) {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!(error = %e, "failed to open evaluation watch");
                *state.status.write() = FeedStatus::Error("Failed to initialize evaluations".into());
                state.notifier.emit(ChangeEvent::FeedStatus);
                None
            }
        };

        Self {
            state,
            watch: Mutex::new(watch),
        }
    }

    /// The current evaluation list, cloned out.
    pub fn evaluations(&self) -> Vec<EvaluationRecord> {
        self.state.evaluations.read().clone()
    }

    pub fn status(&self) -> FeedStatus {
        self.state.status.read().clone()
    }

    /// True until the first delivery or failure.
    pub fn loading(&self) -> bool {
        *self.state.status.read() == FeedStatus::Loading
    }

    /// Failure message, if the last watch event was an error.
    pub fn error(&self) -> Option<String> {
        match &*self.state.status.read() {
            FeedStatus::Error(message) => Some(message.clone()),
            _ => None,
        }
    }

    /// Cancel the collection watch. Normal cleanup, not an error path;
    /// dropping the feed does the same.
    pub fn close(&self) {
        // Take the handle out first so cancel runs without the feed lock held.
        let handle = self.watch.lock().take();
        drop(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watch::MemorySource;
    use serde_json::json;

    fn eval_doc(id: &str, agent: &str, score: f64) -> serde_json::Value {
        json!({
            "id": id,
            "agentId": agent,
            "metrics": {
                "slavkoScore": score,
                "scoreChange": 0.0,
                "autonomyLevel": 1.0,
                "codeQuality": { "score": 80.0, "change": 0.0 },
                "performance": 0.9
            },
            "createdAt": { "seconds": 1_700_000_000, "nanos": 0 },
            "updatedAt": { "seconds": 1_700_000_100, "nanos": 0 }
        })
    }

    fn open_feed(source: &MemorySource) -> EvaluationFeed {
        EvaluationFeed::open(source, Arc::new(ChangeNotifier::new()))
    }

    #[test]
    fn test_starts_loading() {
        let source = MemorySource::new();
        let feed = open_feed(&source);

        assert!(feed.loading());
        assert!(feed.error().is_none());
        assert!(feed.evaluations().is_empty());
    }

    #[test]
    fn test_delivery_replaces_list() {
        let source = MemorySource::new();
        let feed = open_feed(&source);

        source.publish_evaluations(vec![eval_doc("e1", "a", 50.0), eval_doc("e2", "b", 60.0)]);
        assert_eq!(feed.status(), FeedStatus::Ready);
        assert_eq!(feed.evaluations().len(), 2);

        source.publish_evaluations(vec![eval_doc("e3", "c", 70.0)]);
        let evaluations = feed.evaluations();
        assert_eq!(evaluations.len(), 1);
        assert_eq!(evaluations[0].id, "e3");
        assert_eq!(evaluations[0].metrics.slavko_score, 70.0);
    }

    #[test]
    fn test_malformed_document_skipped() {
        let source = MemorySource::new();
        let feed = open_feed(&source);

        source.publish_evaluations(vec![eval_doc("e1", "a", 50.0), json!({"id": "broken"})]);

        assert_eq!(feed.status(), FeedStatus::Ready);
        assert_eq!(feed.evaluations().len(), 1);
    }

    #[test]
    fn test_error_is_not_terminal() {
        let source = MemorySource::new();
        let feed = open_feed(&source);

        source.fail_evaluations("backend unavailable");
        assert!(!feed.loading());
        assert_eq!(feed.error(), Some("backend unavailable".to_string()));

        // The watch survived the error; a later delivery recovers.
        source.publish_evaluations(vec![eval_doc("e1", "a", 50.0)]);
        assert_eq!(feed.status(), FeedStatus::Ready);
        assert!(feed.error().is_none());
    }

    #[test]
    fn test_close_cancels_watch() {
        let source = MemorySource::new();
        let feed = open_feed(&source);
        assert_eq!(source.evaluation_watch_count(), 1);

        feed.close();
        assert_eq!(source.evaluation_watch_count(), 0);

        source.publish_evaluations(vec![eval_doc("e1", "a", 50.0)]);
        assert!(feed.loading());
        assert!(feed.evaluations().is_empty());
    }
}
