//! Core types for the evaluation feed.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a monitored agent.
///
/// Opaque, stable, and unique per agent; the key type for both the
/// subscription registry and the metrics table.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        AgentId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AgentId({})", self.0)
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        AgentId(s.to_string())
    }
}

impl From<String> for AgentId {
    fn from(s: String) -> Self {
        AgentId(s)
    }
}

/// Microseconds since Unix epoch.
///
/// Never produced locally: every timestamp in this crate is decoded from
/// the backing store's [`RawTimestamp`] representation.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Timestamp(pub i64);

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// Native time representation of the backing store (seconds + nanos).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTimestamp {
    pub seconds: i64,
    pub nanos: u32,
}

impl From<RawTimestamp> for Timestamp {
    fn from(raw: RawTimestamp) -> Self {
        Timestamp(raw.seconds * 1_000_000 + i64::from(raw.nanos / 1_000))
    }
}

/// Optional code-quality sub-metrics, carried through as a unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeQualityMetrics {
    pub score: Option<f64>,
    pub change: Option<f64>,
}

/// Latest known metrics for one agent, as reported by its live feed.
///
/// All fields are optional: an update may report only a subset, and the
/// snapshot is replaced wholesale on every update (never deep-merged).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub slavko_score: Option<f64>,
    pub score_change: Option<f64>,
    pub autonomy_level: Option<f64>,
    pub code_quality: Option<CodeQualityMetrics>,
    pub performance: Option<f64>,
}

/// Code-quality component of a full evaluation record.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CodeQualityScore {
    pub score: f64,
    pub change: f64,
}

/// Full metrics as stored on an evaluation record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationMetrics {
    pub slavko_score: f64,
    pub score_change: f64,
    pub autonomy_level: f64,
    pub code_quality: CodeQualityScore,
    pub performance: f64,
}

/// Wire form of an evaluation as the collection watch delivers it.
///
/// Timestamps arrive in the store's native representation and are decoded
/// into [`Timestamp`] by [`EvaluationDocument::decode`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationDocument {
    pub id: String,
    pub agent_id: String,
    pub metrics: EvaluationMetrics,
    pub created_at: Option<RawTimestamp>,
    pub updated_at: Option<RawTimestamp>,
}

impl EvaluationDocument {
    /// Decode into the domain record form.
    pub fn decode(self) -> EvaluationRecord {
        EvaluationRecord {
            id: self.id,
            agent_id: AgentId(self.agent_id),
            metrics: self.metrics,
            created_at: self.created_at.map(Timestamp::from),
            updated_at: self.updated_at.map(Timestamp::from),
        }
    }
}

/// One evaluation of one agent.
///
/// Immutable snapshot value; the feed replaces the entire list on every
/// collection change event rather than patching records in place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub id: String,
    pub agent_id: AgentId,
    pub metrics: EvaluationMetrics,
    pub created_at: Option<Timestamp>,
    pub updated_at: Option<Timestamp>,
}

/// Wire form of an agent entity delivered by the entity watch.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AgentDocument {
    pub metrics: Option<AgentMetricsDocument>,
}

/// Metrics sub-object of an agent entity; every field optional upstream.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMetricsDocument {
    pub slavko_score: Option<f64>,
    pub score_change: Option<f64>,
    pub autonomy_level: Option<f64>,
    pub code_quality: Option<CodeQualityMetrics>,
    pub performance: Option<f64>,
}
