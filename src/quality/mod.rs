//! Code-quality analysis via an external scoring service.
//!
//! Unrelated to subscription lifecycle: a stateless request/response call
//! with an independent TTL-bounded result cache. Kept behind the
//! [`ScoreBackend`] trait so the cache path is testable without a network.

mod analyzer;
mod cache;

pub use analyzer::{
    CodeQualityAnalysis, HttpBackend, QualityAnalyzer, QualityConfig, ScoreBackend,
};
