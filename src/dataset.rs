//! Return series preparation and target weight alignment
//!
//! Loads the daily-return table from CSV, derives cumulative growth factors,
//! and aligns a caller-supplied weight specification to the table's asset
//! ordering.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::info;

use crate::types::{SweepError, Ticker};

// =============================================================================
// Return Series
// =============================================================================

/// Time-indexed table of periodic fractional returns, one column per asset,
/// plus the derived cumulative growth factors.
///
/// The cumulative series is a pure function of the daily returns: it is
/// computed once at construction and the struct exposes no mutation, so the
/// two can never drift apart.
#[derive(Debug, Clone)]
pub struct ReturnSeries {
    dates: Vec<NaiveDate>,
    tickers: Vec<Ticker>,
    daily: Vec<Vec<f64>>,
    cumulative: Vec<Vec<f64>>,
}

impl ReturnSeries {
    /// Build a validated return series.
    ///
    /// Requires a strictly increasing date index, one return row per date,
    /// and a finite value for every asset on every date.
    pub fn new(dates: Vec<NaiveDate>, tickers: Vec<Ticker>, daily: Vec<Vec<f64>>) -> Result<Self> {
        if tickers.is_empty() {
            anyhow::bail!("return series must have at least one asset column");
        }
        if dates.len() != daily.len() {
            anyhow::bail!(
                "date index has {} entries but {} return rows were given",
                dates.len(),
                daily.len()
            );
        }
        for pair in dates.windows(2) {
            if pair[1] <= pair[0] {
                anyhow::bail!(
                    "date index must be strictly increasing: {} follows {}",
                    pair[1],
                    pair[0]
                );
            }
        }
        for (row_idx, row) in daily.iter().enumerate() {
            if row.len() != tickers.len() {
                anyhow::bail!(
                    "row {} has {} values, expected {}",
                    row_idx + 1,
                    row.len(),
                    tickers.len()
                );
            }
            if let Some(col) = row.iter().position(|v| !v.is_finite()) {
                anyhow::bail!(
                    "missing or non-finite return for {} on {}",
                    tickers[col],
                    dates[row_idx]
                );
            }
        }

        let cumulative = cumulative_growth(&daily, tickers.len());

        Ok(ReturnSeries {
            dates,
            tickers,
            daily,
            cumulative,
        })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn tickers(&self) -> &[Ticker] {
        &self.tickers
    }

    /// Daily fractional returns, row-major by date.
    pub fn daily(&self) -> &[Vec<f64>] {
        &self.daily
    }

    /// Cumulative growth factors, row-major by date.
    ///
    /// Value at row t = product of (1 + r) over all periods up to and
    /// including t, seeded at 1.0 before the first period.
    pub fn cumulative(&self) -> &[Vec<f64>] {
        &self.cumulative
    }

    /// Number of periods in the series.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

fn cumulative_growth(daily: &[Vec<f64>], assets: usize) -> Vec<Vec<f64>> {
    let mut running = vec![1.0; assets];
    let mut out = Vec::with_capacity(daily.len());
    for row in daily {
        for (acc, r) in running.iter_mut().zip(row) {
            *acc *= 1.0 + r;
        }
        out.push(running.clone());
    }
    out
}

// =============================================================================
// CSV Loading
// =============================================================================

/// Load a return series from a CSV file.
///
/// Expects a header row naming the date column followed by one column per
/// asset, then one row per period with a parseable date and fractional
/// returns.
pub fn load_returns_csv(path: impl AsRef<Path>) -> Result<ReturnSeries> {
    let mut reader =
        csv::Reader::from_path(path.as_ref()).context("failed to open returns CSV")?;

    let headers = reader.headers().context("failed to read CSV header")?.clone();
    if headers.len() < 2 {
        anyhow::bail!("returns CSV needs a date column and at least one asset column");
    }
    let tickers: Vec<Ticker> = headers.iter().skip(1).map(Ticker::new).collect();

    let mut dates = Vec::new();
    let mut daily = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("failed to read row {}", row_idx + 1))?;

        let date_str = record.get(0).context("missing date column")?;
        let date = parse_date(date_str)
            .with_context(|| format!("failed to parse date: {}", date_str))?;

        let mut row = Vec::with_capacity(tickers.len());
        for (col, field) in record.iter().skip(1).enumerate() {
            let value: f64 = field.parse().with_context(|| {
                format!("failed to parse return for {} on {}", tickers[col], date_str)
            })?;
            row.push(value);
        }
        dates.push(date);
        daily.push(row);
    }

    let series = ReturnSeries::new(dates, tickers, daily)?;
    info!(
        "loaded {} periods x {} assets from {}",
        series.len(),
        series.tickers().len(),
        path.as_ref().display()
    );
    Ok(series)
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| {
            // Accept a datetime index and keep the date part
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.date())
        })
        .map_err(Into::into)
}

// =============================================================================
// Target Weights
// =============================================================================

/// Target allocation per asset, aligned to a return series' column order.
#[derive(Debug, Clone)]
pub struct TargetWeights {
    tickers: Vec<Ticker>,
    weights: Vec<f64>,
}

impl TargetWeights {
    /// Align a weight specification to the series' asset ordering.
    ///
    /// The specification must name exactly the assets present in the series;
    /// any difference is a [`SweepError::SchemaMismatch`]. Weights must be
    /// finite and non-negative (they are not required to sum to 1).
    pub fn aligned(
        spec: &BTreeMap<String, f64>,
        series: &ReturnSeries,
    ) -> Result<Self, SweepError> {
        let assets: BTreeSet<&str> = series.tickers().iter().map(|t| t.as_str()).collect();
        let named: BTreeSet<&str> = spec.keys().map(|k| k.as_str()).collect();

        let missing: Vec<String> = assets.difference(&named).map(|s| s.to_string()).collect();
        let extra: Vec<String> = named.difference(&assets).map(|s| s.to_string()).collect();
        if !missing.is_empty() || !extra.is_empty() {
            return Err(SweepError::SchemaMismatch { missing, extra });
        }

        let mut weights = Vec::with_capacity(series.tickers().len());
        for ticker in series.tickers() {
            let w = spec[ticker.as_str()];
            if !w.is_finite() || w < 0.0 {
                return Err(SweepError::InvalidWeight {
                    ticker: ticker.to_string(),
                    weight: w,
                });
            }
            weights.push(w);
        }

        Ok(TargetWeights {
            tickers: series.tickers().to_vec(),
            weights,
        })
    }

    pub fn tickers(&self) -> &[Ticker] {
        &self.tickers
    }

    /// Weights in the same order as `tickers()`.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn get(&self, ticker: &Ticker) -> Option<f64> {
        self.tickers
            .iter()
            .position(|t| t == ticker)
            .map(|i| self.weights[i])
    }
}

// =============================================================================
// Tests
// =============================================================================
