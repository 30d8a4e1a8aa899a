//! Sweep configuration
//!
//! Fixed sweep constants with JSON file loading. Every field has a default,
//! so a config file only needs to override what differs.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::grid::GridConfig;
use crate::types::Ticker;

/// Canonical target allocation for the fixed eight-asset universe, paired
/// positionally with the return table's columns.
pub const DEFAULT_TARGET_WEIGHTS: [f64; 8] = [0.25, 0.25, 0.125, 0.125, 0.04, 0.035, 0.125, 0.05];

/// Full configuration for one sensitivity sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Cash each run starts with, in the currency of the return data.
    pub starting_cash: f64,
    /// Per-trade commission rate.
    pub commission: f64,
    pub grid: GridConfig,
    /// Target allocation per asset; keys must match the return table's
    /// columns exactly.
    pub target_weights: BTreeMap<String, f64>,
    /// Input artifact: date-indexed daily fractional returns.
    pub returns_path: PathBuf,
    /// Output artifact: the persisted result matrix.
    pub matrix_path: PathBuf,
    /// Output artifact: the rendered heatmap.
    pub heatmap_path: PathBuf,
    /// Draw a progress bar while sweeping.
    pub show_progress: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        SweepConfig {
            starting_cash: 100_000.0,
            commission: 0.005,
            grid: GridConfig::default(),
            target_weights: BTreeMap::new(),
            returns_path: PathBuf::from("portfolio_returns.csv"),
            matrix_path: PathBuf::from("datasets/sharpe.csv"),
            heatmap_path: PathBuf::from("images/heatmap.png"),
            show_progress: true,
        }
    }
}

impl SweepConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("failed to read config file")?;
        serde_json::from_str(&contents).context("failed to parse config JSON")
    }

    /// Pair the canonical weight vector with an eight-asset universe, in the
    /// universe's order.
    pub fn weights_for_universe(tickers: &[Ticker]) -> Result<BTreeMap<String, f64>> {
        if tickers.len() != DEFAULT_TARGET_WEIGHTS.len() {
            anyhow::bail!(
                "canonical weights cover {} assets, universe has {}",
                DEFAULT_TARGET_WEIGHTS.len(),
                tickers.len()
            );
        }
        Ok(tickers
            .iter()
            .zip(DEFAULT_TARGET_WEIGHTS)
            .map(|(t, w)| (t.to_string(), w))
            .collect())
    }
}
