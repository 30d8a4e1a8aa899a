//! Strategy-evaluation boundary
//!
//! The sweep never implements rebalancing mathematics itself. Each grid cell
//! is handed to an externally supplied run, built fresh per cell so no trade
//! history or cash balance can leak between cells.

use anyhow::Result;

use crate::dataset::{ReturnSeries, TargetWeights};

/// Everything a single evaluation run is constructed from.
///
/// Borrowed, not owned: the same prepared dataset backs every cell while each
/// run keeps its own mutable state.
#[derive(Clone, Copy)]
pub struct RunContext<'a> {
    pub name: &'a str,
    /// Daily returns with their derived cumulative growth factors.
    pub series: &'a ReturnSeries,
    pub weights: &'a TargetWeights,
    pub starting_cash: f64,
    pub commission: f64,
}

/// One isolated strategy-evaluation run.
///
/// Implementors are constructed by a factory per grid cell (see
/// [`crate::sweep::SweepDriver`]), execute exactly one `trade` call, and then
/// report summary statistics.
pub trait StrategyRun {
    /// Execute the simulated rebalancing run.
    ///
    /// `p` is the order of the Minkowski-style deviation metric the strategy
    /// uses to measure drift from the target weights; `tol` is the drift
    /// threshold that triggers a rebalance.
    fn trade(&mut self, p: i64, tol: f64) -> Result<()>;

    /// Summary scalars for the completed run.
    ///
    /// The sweep consumes only the third element (the risk-adjusted
    /// performance metric, e.g. a Sharpe ratio) and discards the first two.
    fn summary_stats(&self) -> (f64, f64, f64);
}
