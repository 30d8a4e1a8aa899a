//! Parameter grid construction
//!
//! Generates the two sweep axes from start/stop/step bounds. Tolerance ticks
//! are produced in `Decimal` space and rounded at generation time, so a tick
//! like 0.10 is exactly 0.10 rather than an accumulated 0.09999…

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::SweepError;

/// Decimal places kept on tolerance-axis ticks.
pub const TOL_DECIMALS: u32 = 2;

/// Start/stop/step bounds for both axes. Minimums are inclusive, maximums
/// exclusive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub min_p: i64,
    pub max_p: i64,
    pub step_p: i64,
    pub min_tol: f64,
    pub max_tol: f64,
    pub step_tol: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            min_p: 1,
            max_p: 10,
            step_p: 1,
            min_tol: 0.01,
            max_tol: 0.20,
            step_tol: 0.01,
        }
    }
}

/// One cell of the sweep's Cartesian product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCell {
    pub row: usize,
    pub col: usize,
    pub p: i64,
    pub tol: Decimal,
}

/// The two ordered axis sequences whose Cartesian product defines the sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterGrid {
    p_values: Vec<i64>,
    tol_values: Vec<Decimal>,
}

impl ParameterGrid {
    pub fn new(config: &GridConfig) -> Result<Self, SweepError> {
        if config.min_p >= config.max_p || config.step_p <= 0 {
            return Err(SweepError::InvalidRange {
                axis: "p",
                min: config.min_p as f64,
                max: config.max_p as f64,
                step: config.step_p as f64,
            });
        }
        if !(config.min_tol < config.max_tol) || !(config.step_tol > 0.0) {
            return Err(tol_range_error(config));
        }

        let mut p_values = Vec::new();
        let mut p = config.min_p;
        while p < config.max_p {
            p_values.push(p);
            p += config.step_p;
        }

        let start = Decimal::from_f64(config.min_tol).ok_or_else(|| tol_range_error(config))?;
        let stop = Decimal::from_f64(config.max_tol).ok_or_else(|| tol_range_error(config))?;
        let step = Decimal::from_f64(config.step_tol).ok_or_else(|| tol_range_error(config))?;

        let mut tol_values = Vec::new();
        let mut i = 0i64;
        loop {
            let tick = start + step * Decimal::from(i);
            if tick >= stop {
                break;
            }
            tol_values.push(tick.round_dp(TOL_DECIMALS));
            i += 1;
        }

        Ok(ParameterGrid { p_values, tol_values })
    }

    pub fn p_values(&self) -> &[i64] {
        &self.p_values
    }

    pub fn tol_values(&self) -> &[Decimal] {
        &self.tol_values
    }

    /// Total number of grid cells.
    pub fn len(&self) -> usize {
        self.p_values.len() * self.tol_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Enumerate all cells in row-major order (outer loop over the P axis).
    pub fn cells(&self) -> impl Iterator<Item = GridCell> + '_ {
        itertools::iproduct!(
            self.p_values.iter().enumerate(),
            self.tol_values.iter().enumerate()
        )
        .map(|((row, &p), (col, &tol))| GridCell { row, col, p, tol })
    }
}

fn tol_range_error(config: &GridConfig) -> SweepError {
    SweepError::InvalidRange {
        axis: "tolerance",
        min: config.min_tol,
        max: config.max_tol,
        step: config.step_tol,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_grid_dimensions() {
        let grid = ParameterGrid::new(&GridConfig::default()).unwrap();
        assert_eq!(grid.p_values(), &[1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(grid.tol_values().len(), 19);
        assert_eq!(grid.len(), 9 * 19);
    }

    #[test]
    fn test_tolerance_ticks_are_exact() {
        let grid = ParameterGrid::new(&GridConfig::default()).unwrap();
        let ticks = grid.tol_values();

        assert_eq!(ticks[0], dec!(0.01));
        assert_eq!(ticks[9], dec!(0.10));
        assert_eq!(ticks[18], dec!(0.19));
        // Every tick is an exact multiple of the step at 2 decimal places.
        for (i, tick) in ticks.iter().enumerate() {
            assert_eq!(*tick, dec!(0.01) * Decimal::from(i as i64 + 1));
        }
    }

    #[test]
    fn test_cells_enumerate_row_major() {
        let config = GridConfig {
            min_p: 1,
            max_p: 3,
            step_p: 1,
            min_tol: 0.01,
            max_tol: 0.03,
            step_tol: 0.01,
        };
        let grid = ParameterGrid::new(&config).unwrap();
        let cells: Vec<(i64, Decimal)> = grid.cells().map(|c| (c.p, c.tol)).collect();
        assert_eq!(
            cells,
            vec![
                (1, dec!(0.01)),
                (1, dec!(0.02)),
                (2, dec!(0.01)),
                (2, dec!(0.02)),
            ]
        );
    }

    #[test]
    fn test_identical_bounds_produce_identical_axes() {
        let config = GridConfig::default();
        let a = ParameterGrid::new(&config).unwrap();
        let b = ParameterGrid::new(&config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_ranges_rejected() {
        let bad = [
            GridConfig { min_p: 5, max_p: 5, ..GridConfig::default() },
            GridConfig { min_p: 9, max_p: 1, ..GridConfig::default() },
            GridConfig { step_p: 0, ..GridConfig::default() },
            GridConfig { step_p: -1, ..GridConfig::default() },
            GridConfig { min_tol: 0.2, max_tol: 0.1, ..GridConfig::default() },
            GridConfig { step_tol: 0.0, ..GridConfig::default() },
            GridConfig { step_tol: -0.01, ..GridConfig::default() },
            GridConfig { min_tol: f64::NAN, ..GridConfig::default() },
        ];
        for config in bad {
            assert!(matches!(
                ParameterGrid::new(&config),
                Err(SweepError::InvalidRange { .. })
            ));
        }
    }
}
