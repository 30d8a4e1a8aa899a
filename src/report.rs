//! Report generation pipeline
//!
//! Ties the components together: weight alignment, grid construction, the
//! sweep itself, matrix persistence, and heatmap rendering. Persistence and
//! rendering only start once the matrix is complete, and the pipeline either
//! produces both output artifacts or neither.

use indicatif::ProgressBar;
use std::fs;
use tracing::{info, warn};

use crate::config::SweepConfig;
use crate::dataset::{ReturnSeries, TargetWeights};
use crate::grid::ParameterGrid;
use crate::heatmap;
use crate::matrix::ResultMatrix;
use crate::strategy::{RunContext, StrategyRun};
use crate::sweep::{sweep_progress_bar, SweepDriver};
use crate::types::SweepError;

/// Run the full sensitivity sweep and write both artifacts.
///
/// Weight alignment happens before any strategy run is constructed, so a
/// schema mismatch aborts with zero collaborator invocations. Any failure
/// discards the in-progress sweep and leaves no artifact behind.
pub fn generate_sensitivity_report<F>(
    config: &SweepConfig,
    series: &ReturnSeries,
    factory: F,
) -> Result<ResultMatrix, SweepError>
where
    F: Fn(RunContext<'_>) -> Box<dyn StrategyRun> + Send + Sync,
{
    let weights = TargetWeights::aligned(&config.target_weights, series)?;
    let grid = ParameterGrid::new(&config.grid)?;

    let progress = if config.show_progress {
        sweep_progress_bar(grid.len() as u64)
    } else {
        ProgressBar::hidden()
    };

    let driver = SweepDriver::new(config.starting_cash, config.commission);
    let matrix = driver.run_with_progress(series, &weights, &grid, factory, progress)?;

    matrix.write_csv(&config.matrix_path)?;
    if let Err(err) = heatmap::render(&matrix, &config.heatmap_path) {
        // Both artifacts or neither: retract the matrix CSV if the image
        // could not be produced.
        if let Err(remove_err) = fs::remove_file(&config.matrix_path) {
            warn!(
                "could not remove {}: {}",
                config.matrix_path.display(),
                remove_err
            );
        }
        return Err(err);
    }

    info!(
        "sensitivity report complete: {} and {}",
        config.matrix_path.display(),
        config.heatmap_path.display()
    );
    Ok(matrix)
}
