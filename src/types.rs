//! Core types shared across the sweep engine

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by the sweep pipeline.
///
/// Every variant is fatal to the whole sweep: nothing is retried, and no
/// output artifact is produced once any of these surfaces.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("target weights do not match return series assets (missing: {missing:?}, extra: {extra:?})")]
    SchemaMismatch {
        /// Assets present in the return series but absent from the weights.
        missing: Vec<String>,
        /// Assets named by the weights but absent from the return series.
        extra: Vec<String>,
    },

    #[error("weight {weight} for {ticker} must be finite and >= 0")]
    InvalidWeight { ticker: String, weight: f64 },

    #[error("invalid {axis} axis: min ({min}) must be < max ({max}) and step ({step}) > 0")]
    InvalidRange {
        axis: &'static str,
        min: f64,
        max: f64,
        step: f64,
    },

    /// A strategy-evaluation run failed. The cause is opaque to the sweep.
    #[error("strategy run failed at grid cell (p={p}, tol={tol})")]
    Run {
        p: i64,
        tol: f64,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to write {artifact} artifact")]
    Persistence {
        artifact: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

/// Asset identifier using `Arc<str>` for cheap cloning
///
/// Tickers are cloned into every per-cell run context; `Arc<str>` keeps that
/// at one refcount bump instead of a heap allocation per clone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticker(std::sync::Arc<str>);

impl Ticker {
    pub fn new(s: impl AsRef<str>) -> Self {
        Ticker(std::sync::Arc::from(s.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Ticker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Ticker {
    fn from(s: &str) -> Self {
        Ticker::new(s)
    }
}
