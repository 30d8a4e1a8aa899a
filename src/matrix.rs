//! Result matrix, suppression mask, and CSV persistence

use anyhow::{Context, Result};
use ordered_float::OrderedFloat;
use rust_decimal::Decimal;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::types::SweepError;

/// Header label for the row axis in the persisted artifact.
pub const P_AXIS_LABEL: &str = "Minkowski p";
/// Name of the column axis (tolerance thresholds).
pub const TOL_AXIS_LABEL: &str = "Threshold";

/// Rectangular matrix of per-cell performance scalars.
///
/// Rows ascend by P value, columns by tolerance. A matrix is only ever
/// constructed from a complete value set, so readers never observe a
/// partially populated state.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultMatrix {
    p_values: Vec<i64>,
    tol_values: Vec<Decimal>,
    values: Vec<f64>,
}

impl ResultMatrix {
    /// Assemble a fully populated matrix from row-major values.
    pub fn new(p_values: Vec<i64>, tol_values: Vec<Decimal>, values: Vec<f64>) -> Self {
        assert_eq!(
            values.len(),
            p_values.len() * tol_values.len(),
            "matrix must be fully populated before use"
        );
        ResultMatrix {
            p_values,
            tol_values,
            values,
        }
    }

    pub fn nrows(&self) -> usize {
        self.p_values.len()
    }

    pub fn ncols(&self) -> usize {
        self.tol_values.len()
    }

    pub fn p_values(&self) -> &[i64] {
        &self.p_values
    }

    pub fn tol_values(&self) -> &[Decimal] {
        &self.tol_values
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.ncols() + col]
    }

    /// Row-major view of all cell values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Minimum scalar over all cells.
    pub fn global_min(&self) -> f64 {
        self.values
            .iter()
            .copied()
            .map(OrderedFloat)
            .min()
            .map_or(f64::NAN, |m| m.0)
    }

    /// Mask marking every cell that equals the global minimum (ties included).
    pub fn suppression_mask(&self) -> SuppressionMask {
        let min = self.global_min();
        SuppressionMask {
            ncols: self.ncols(),
            cells: self.values.iter().map(|v| *v == min).collect(),
        }
    }

    /// Persist the matrix as a labeled CSV artifact.
    ///
    /// The write goes through a temporary file renamed into place, so either
    /// the complete artifact exists afterwards or nothing does.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), SweepError> {
        self.write_csv_inner(path.as_ref())
            .map_err(|source| SweepError::Persistence {
                artifact: "matrix",
                source,
            })
    }

    fn write_csv_inner(&self, path: &Path) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(Vec::new());

        let mut header = Vec::with_capacity(self.ncols() + 1);
        header.push(P_AXIS_LABEL.to_string());
        header.extend(self.tol_values.iter().map(|t| t.to_string()));
        wtr.write_record(&header)?;

        for (row, p) in self.p_values.iter().enumerate() {
            let mut record = Vec::with_capacity(self.ncols() + 1);
            record.push(p.to_string());
            // `{}` on f64 prints the shortest representation that
            // round-trips, so no precision is lost in the artifact.
            record.extend((0..self.ncols()).map(|col| self.get(row, col).to_string()));
            wtr.write_record(&record)?;
        }

        let buf = wtr
            .into_inner()
            .map_err(|e| anyhow::anyhow!("failed to flush CSV writer: {}", e))?;

        let tmp = path.with_extension("csv.tmp");
        fs::write(&tmp, &buf).with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("failed to move artifact into {}", path.display()))?;

        info!(
            "wrote {} ({} x {} cells)",
            path.display(),
            self.nrows(),
            self.ncols()
        );
        Ok(())
    }

    /// Read a matrix back from a persisted CSV artifact.
    pub fn read_csv(path: impl AsRef<Path>) -> Result<Self> {
        let mut reader =
            csv::Reader::from_path(path.as_ref()).context("failed to open matrix CSV")?;

        let headers = reader.headers().context("failed to read header")?.clone();
        if headers.len() < 2 {
            anyhow::bail!("matrix CSV needs a label column and at least one value column");
        }
        let tol_values: Vec<Decimal> = headers
            .iter()
            .skip(1)
            .map(|s| s.parse().with_context(|| format!("bad column label: {}", s)))
            .collect::<Result<_>>()?;

        let mut p_values = Vec::new();
        let mut values = Vec::new();
        for (row_idx, result) in reader.records().enumerate() {
            let record = result.with_context(|| format!("failed to read row {}", row_idx + 1))?;
            if record.len() != tol_values.len() + 1 {
                anyhow::bail!(
                    "row {} has {} fields, expected {}",
                    row_idx + 1,
                    record.len(),
                    tol_values.len() + 1
                );
            }
            let p: i64 = record
                .get(0)
                .context("missing row label")?
                .parse()
                .with_context(|| format!("bad row label on row {}", row_idx + 1))?;
            p_values.push(p);
            for field in record.iter().skip(1) {
                let v: f64 = field
                    .parse()
                    .with_context(|| format!("bad value on row {}", row_idx + 1))?;
                values.push(v);
            }
        }

        Ok(ResultMatrix::new(p_values, tol_values, values))
    }
}

/// Boolean overlay marking the globally minimal cell(s).
#[derive(Debug, Clone)]
pub struct SuppressionMask {
    ncols: usize,
    cells: Vec<bool>,
}

impl SuppressionMask {
    pub fn is_suppressed(&self, row: usize, col: usize) -> bool {
        self.cells[row * self.ncols + col]
    }

    /// Number of suppressed cells. At least 1 for any non-empty matrix.
    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&s| s).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn small_matrix(values: Vec<f64>) -> ResultMatrix {
        ResultMatrix::new(vec![1, 2], vec![dec!(0.01), dec!(0.02)], values)
    }

    #[test]
    fn test_global_min_and_single_suppression() {
        let m = small_matrix(vec![10.01, 10.02, 20.01, 20.02]);
        assert_eq!(m.global_min(), 10.01);

        let mask = m.suppression_mask();
        assert_eq!(mask.count(), 1);
        assert!(mask.is_suppressed(0, 0));
        assert!(!mask.is_suppressed(0, 1));
        assert!(!mask.is_suppressed(1, 0));
    }

    #[test]
    fn test_tied_minima_all_suppressed() {
        let m = small_matrix(vec![5.0, 5.0, 7.0, 9.0]);
        let mask = m.suppression_mask();
        assert_eq!(mask.count(), 2);
        assert!(mask.is_suppressed(0, 0));
        assert!(mask.is_suppressed(0, 1));
        assert!(!mask.is_suppressed(1, 0));
        assert!(!mask.is_suppressed(1, 1));
    }

    #[test]
    fn test_mask_never_empty() {
        let m = small_matrix(vec![3.0, 3.0, 3.0, 3.0]);
        assert_eq!(m.suppression_mask().count(), 4);
    }

    #[test]
    fn test_csv_round_trip_preserves_values_and_labels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sharpe.csv");

        let m = small_matrix(vec![0.123456789012345, -1.5, 2.0 / 3.0, 1e-9]);
        m.write_csv(&path).unwrap();

        let back = ResultMatrix::read_csv(&path).unwrap();
        assert_eq!(back.p_values(), m.p_values());
        assert_eq!(back.tol_values(), m.tol_values());
        assert_eq!(back.values(), m.values());
    }

    #[test]
    fn test_write_to_missing_directory_is_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-such-dir").join("sharpe.csv");

        let m = small_matrix(vec![1.0, 2.0, 3.0, 4.0]);
        match m.write_csv(&path) {
            Err(SweepError::Persistence { artifact, .. }) => assert_eq!(artifact, "matrix"),
            other => panic!("expected Persistence error, got {:?}", other),
        }
        assert!(!path.exists());
    }

    #[test]
    #[should_panic(expected = "fully populated")]
    fn test_incomplete_matrix_rejected() {
        let _ = small_matrix(vec![1.0, 2.0, 3.0]);
    }
}
