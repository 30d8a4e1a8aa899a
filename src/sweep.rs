//! Sweep driver
//!
//! Drives one isolated strategy-evaluation run per grid cell and assembles
//! the extracted risk-adjusted metric into a [`ResultMatrix`]. Cells are
//! independent, so the default driver partitions them across a rayon worker
//! pool; a sequential variant is kept for debugging. Any single cell failure
//! aborts the whole sweep.

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::dataset::{ReturnSeries, TargetWeights};
use crate::grid::ParameterGrid;
use crate::matrix::ResultMatrix;
use crate::strategy::{RunContext, StrategyRun};
use crate::types::SweepError;

/// Name handed to every per-cell run.
pub const RUN_NAME: &str = "Rebalanced";

/// Per-sweep constants bound into every run context.
pub struct SweepDriver {
    starting_cash: f64,
    commission: f64,
}

impl SweepDriver {
    pub fn new(starting_cash: f64, commission: f64) -> Self {
        SweepDriver {
            starting_cash,
            commission,
        }
    }

    /// Run the sweep across the worker pool without visible progress.
    pub fn run<F>(
        &self,
        series: &ReturnSeries,
        weights: &TargetWeights,
        grid: &ParameterGrid,
        factory: F,
    ) -> Result<ResultMatrix, SweepError>
    where
        F: Fn(RunContext<'_>) -> Box<dyn StrategyRun> + Send + Sync,
    {
        self.run_with_progress(series, weights, grid, factory, ProgressBar::hidden())
    }

    /// Run the sweep across the worker pool, ticking `progress` once per
    /// completed cell.
    ///
    /// Each worker owns disjoint cells; results are assembled in row-major
    /// order with no shared mutable state beyond the progress counter.
    pub fn run_with_progress<F>(
        &self,
        series: &ReturnSeries,
        weights: &TargetWeights,
        grid: &ParameterGrid,
        factory: F,
        progress: ProgressBar,
    ) -> Result<ResultMatrix, SweepError>
    where
        F: Fn(RunContext<'_>) -> Box<dyn StrategyRun> + Send + Sync,
    {
        info!(
            "sweeping {} grid cells ({} p values x {} tolerances)",
            grid.len(),
            grid.p_values().len(),
            grid.tol_values().len()
        );

        let cells: Vec<(i64, Decimal)> = grid.cells().map(|c| (c.p, c.tol)).collect();
        let result: Result<Vec<f64>, SweepError> = cells
            .par_iter()
            .map(|&(p, tol)| {
                let value = self.run_cell(series, weights, &factory, p, tol)?;
                progress.inc(1);
                Ok(value)
            })
            .collect();
        progress.finish_and_clear();

        Ok(ResultMatrix::new(
            grid.p_values().to_vec(),
            grid.tol_values().to_vec(),
            result?,
        ))
    }

    /// Baseline single-threaded sweep: two nested loops, one cell fully to
    /// completion before the next, progress observable per axis via tracing.
    pub fn run_sequential<F>(
        &self,
        series: &ReturnSeries,
        weights: &TargetWeights,
        grid: &ParameterGrid,
        factory: F,
    ) -> Result<ResultMatrix, SweepError>
    where
        F: Fn(RunContext<'_>) -> Box<dyn StrategyRun>,
    {
        info!("sweeping {} grid cells sequentially", grid.len());

        let mut values = Vec::with_capacity(grid.len());
        for (row, &p) in grid.p_values().iter().enumerate() {
            debug!("p axis {}/{}", row + 1, grid.p_values().len());
            for (col, &tol) in grid.tol_values().iter().enumerate() {
                debug!("tolerance {}/{}", col + 1, grid.tol_values().len());
                values.push(self.run_cell(series, weights, &factory, p, tol)?);
            }
        }

        Ok(ResultMatrix::new(
            grid.p_values().to_vec(),
            grid.tol_values().to_vec(),
            values,
        ))
    }

    fn run_cell<F>(
        &self,
        series: &ReturnSeries,
        weights: &TargetWeights,
        factory: &F,
        p: i64,
        tol: Decimal,
    ) -> Result<f64, SweepError>
    where
        F: Fn(RunContext<'_>) -> Box<dyn StrategyRun>,
    {
        let tol_f = tol.to_f64().unwrap_or(0.0);

        // A fresh run per cell: no trade history or cash balance survives
        // from one cell to the next.
        let mut run = factory(RunContext {
            name: RUN_NAME,
            series,
            weights,
            starting_cash: self.starting_cash,
            commission: self.commission,
        });
        run.trade(p, tol_f)
            .map_err(|source| SweepError::Run { p, tol: tol_f, source })?;

        let (_, _, risk_adjusted) = run.summary_stats();
        debug!(p, tol = tol_f, value = risk_adjusted, "grid cell complete");
        Ok(risk_adjusted)
    }
}

/// Progress bar styled for the sweep's nested loops.
pub fn sweep_progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{percent:>3}%|{bar:40}| {pos}/{len} [{elapsed}<{eta}, {per_sec}]")
            .unwrap()
            .progress_chars("█░ "),
    );
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridConfig;
    use crate::types::Ticker;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    struct StubRun {
        p: i64,
        tol: f64,
    }

    impl StrategyRun for StubRun {
        fn trade(&mut self, p: i64, tol: f64) -> anyhow::Result<()> {
            self.p = p;
            self.tol = tol;
            Ok(())
        }

        fn summary_stats(&self) -> (f64, f64, f64) {
            (0.0, 0.0, self.p as f64 * 10.0 + self.tol)
        }
    }

    fn stub_factory(_ctx: RunContext<'_>) -> Box<dyn StrategyRun> {
        Box::new(StubRun { p: 0, tol: 0.0 })
    }

    fn fixture() -> (ReturnSeries, TargetWeights, ParameterGrid) {
        let series = ReturnSeries::new(
            vec![
                NaiveDate::from_ymd_opt(2021, 6, 1).unwrap(),
                NaiveDate::from_ymd_opt(2021, 6, 2).unwrap(),
            ],
            vec![Ticker::new("AAA"), Ticker::new("BBB")],
            vec![vec![0.01, 0.02], vec![-0.01, 0.00]],
        )
        .unwrap();
        let mut spec = BTreeMap::new();
        spec.insert("AAA".to_string(), 0.5);
        spec.insert("BBB".to_string(), 0.5);
        let weights = TargetWeights::aligned(&spec, &series).unwrap();
        let grid = ParameterGrid::new(&GridConfig {
            min_p: 1,
            max_p: 3,
            step_p: 1,
            min_tol: 0.01,
            max_tol: 0.03,
            step_tol: 0.01,
        })
        .unwrap();
        (series, weights, grid)
    }

    #[test]
    fn test_parallel_matches_sequential_row_major() {
        let (series, weights, grid) = fixture();
        let driver = SweepDriver::new(100_000.0, 0.005);

        let parallel = driver.run(&series, &weights, &grid, stub_factory).unwrap();
        let sequential = driver
            .run_sequential(&series, &weights, &grid, stub_factory)
            .unwrap();

        assert_eq!(parallel.values(), sequential.values());
        assert_eq!(parallel.values(), &[10.01, 10.02, 20.01, 20.02]);
    }

    #[test]
    fn test_failing_cell_aborts_whole_sweep() {
        let (series, weights, grid) = fixture();
        let driver = SweepDriver::new(100_000.0, 0.005);

        struct FailingRun;
        impl StrategyRun for FailingRun {
            fn trade(&mut self, p: i64, _tol: f64) -> anyhow::Result<()> {
                if p == 2 {
                    anyhow::bail!("collaborator exploded");
                }
                Ok(())
            }
            fn summary_stats(&self) -> (f64, f64, f64) {
                (0.0, 0.0, 1.0)
            }
        }

        let result = driver.run_sequential(&series, &weights, &grid, |_ctx| {
            Box::new(FailingRun) as Box<dyn StrategyRun>
        });
        match result {
            Err(SweepError::Run { p, .. }) => assert_eq!(p, 2),
            other => panic!("expected Run error, got {:?}", other.map(|_| ())),
        }
    }
}
