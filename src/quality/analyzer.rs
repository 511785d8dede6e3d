//! Client for the external code-quality scoring service.

use super::cache::{CacheKey, QualityCache};
use crate::error::{FeedError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::debug;

/// Configuration for the scoring service client.
#[derive(Debug, Clone)]
pub struct QualityConfig {
    /// Scoring endpoint.
    pub api_url: String,

    /// Bearer token; defaults to the `DEEPSEEK_API_KEY` env var.
    pub api_key: String,

    /// Request timeout.
    pub timeout: Duration,

    /// Reject code longer than this many bytes (~10KB).
    pub max_code_len: usize,

    /// Result cache capacity (entries).
    pub cache_capacity: usize,

    /// Result cache TTL.
    pub cache_ttl: Duration,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.deepseek.com/v1/coder/analyze".to_string(),
            api_key: env::var("DEEPSEEK_API_KEY").unwrap_or_default(),
            timeout: Duration::from_secs(30),
            max_code_len: 10_000,
            cache_capacity: 256,
            cache_ttl: Duration::from_secs(3600),
        }
    }
}

/// Result of analyzing one piece of code.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CodeQualityAnalysis {
    pub score: f64,
    pub bug_density: f64,
    pub optimization_level: f64,
    pub maintainability: f64,
    pub security_issues: f64,
    pub efficiency: f64,
}

#[derive(Serialize)]
struct ScoreRequest<'a> {
    code: &'a str,
    language: &'a str,
}

/// Upstream response; field names differ from ours.
#[derive(Deserialize)]
struct ScoreResponse {
    score: f64,
    bug_density: f64,
    optimization_level: f64,
    maintainability_index: f64,
    security_issues: f64,
    efficiency_score: f64,
}

impl From<ScoreResponse> for CodeQualityAnalysis {
    fn from(r: ScoreResponse) -> Self {
        Self {
            score: r.score,
            bug_density: r.bug_density,
            optimization_level: r.optimization_level,
            maintainability: r.maintainability_index,
            security_issues: r.security_issues,
            efficiency: r.efficiency_score,
        }
    }
}

/// Something that can score a piece of code.
pub trait ScoreBackend: Send + Sync {
    fn score(&self, code: &str, language: &str) -> Result<CodeQualityAnalysis>;
}

/// HTTP backend talking to the real scoring service.
pub struct HttpBackend {
    api_url: String,
    api_key: String,
    client: reqwest::blocking::Client,
}

impl HttpBackend {
    pub fn new(config: &QualityConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            client,
        })
    }
}

impl ScoreBackend for HttpBackend {
    fn score(&self, code: &str, language: &str) -> Result<CodeQualityAnalysis> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&ScoreRequest { code, language })
            .send()?
            .error_for_status()?;

        let body = response.text()?;
        let parsed: ScoreResponse = serde_json::from_str(&body)?;
        Ok(parsed.into())
    }
}

/// Analyzes code via a [`ScoreBackend`], caching results by content hash.
pub struct QualityAnalyzer {
    backend: Box<dyn ScoreBackend>,
    cache: QualityCache,
    max_code_len: usize,
}

impl QualityAnalyzer {
    /// Analyzer over the real HTTP backend.
    pub fn new(config: QualityConfig) -> Result<Self> {
        let backend = HttpBackend::new(&config)?;
        Ok(Self::with_backend(config, Box::new(backend)))
    }

    /// Analyzer over an arbitrary backend.
    pub fn with_backend(config: QualityConfig, backend: Box<dyn ScoreBackend>) -> Self {
        Self {
            backend,
            cache: QualityCache::new(config.cache_capacity, config.cache_ttl),
            max_code_len: config.max_code_len,
        }
    }

    /// Score a piece of code, hitting the cache first.
    pub fn analyze(&self, code: &str, language: &str) -> Result<CodeQualityAnalysis> {
        if code.is_empty() {
            return Err(FeedError::EmptyCode);
        }
        if code.len() > self.max_code_len {
            return Err(FeedError::CodeTooLong {
                len: code.len(),
                max: self.max_code_len,
            });
        }

        let key = CacheKey::for_request(language, code);
        if let Some(hit) = self.cache.get(&key) {
            debug!(key = %key.to_hex(), "code quality cache hit");
            return Ok(hit);
        }

        let analysis = self.backend.score(code, language)?;
        self.cache.put(key, analysis.clone());
        Ok(analysis)
    }
}
