//! Heatmap rendering
//!
//! Renders the completed result matrix as an annotated PNG heatmap. The
//! globally minimal cell(s) are suppressed: no fill, no annotation. The color
//! scale is a reversed monochrome gradient, darker = higher value.

use anyhow::{Context, Result};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{FontTransform, TextStyle};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::matrix::{ResultMatrix, P_AXIS_LABEL, TOL_AXIS_LABEL};
use crate::types::SweepError;

const CANVAS: (u32, u32) = (1200, 600);
/// Tick labels are drawn on every second row and column to avoid crowding on
/// dense grids.
const LABEL_STRIDE: usize = 2;

/// Render the heatmap artifact for a completed matrix.
///
/// The drawing backend is scope-bound, so canvas resources are released when
/// this returns whether it succeeds or fails. A failed render leaves no
/// partial artifact behind.
pub fn render(matrix: &ResultMatrix, path: impl AsRef<Path>) -> Result<(), SweepError> {
    let path = path.as_ref();
    render_inner(matrix, path).map_err(|source| {
        let _ = fs::remove_file(path);
        SweepError::Persistence {
            artifact: "heatmap",
            source,
        }
    })
}

fn render_inner(matrix: &ResultMatrix, path: &Path) -> Result<()> {
    // Probe the destination up front: the bitmap backend only touches the
    // filesystem when the finished canvas is presented.
    fs::File::create(path).with_context(|| format!("cannot write {}", path.display()))?;

    let nrows = matrix.nrows();
    let ncols = matrix.ncols();
    let mask = matrix.suppression_mask();

    // Color scale spans the surviving cells only.
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for (row, col) in cell_indices(nrows, ncols) {
        if mask.is_suppressed(row, col) {
            continue;
        }
        let v = matrix.get(row, col);
        lo = lo.min(v);
        hi = hi.max(v);
    }
    let span = if hi > lo { hi - lo } else { 1.0 };
    let shade_of = |v: f64| (v - lo) / span;

    let root = BitMapBackend::new(path, CANVAS).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(12)
        .x_label_area_size(48)
        .y_label_area_size(64)
        .build_cartesian_2d(0f64..ncols as f64, nrows as f64..0f64)?;

    // Filled cells. Suppressed cells are skipped entirely and stay blank.
    chart.draw_series(
        cell_indices(nrows, ncols)
            .filter(|&(row, col)| !mask.is_suppressed(row, col))
            .map(|(row, col)| {
                let t = shade_of(matrix.get(row, col));
                let gray = (255.0 * (1.0 - t)).round() as u8;
                Rectangle::new(cell_bounds(row, col), RGBColor(gray, gray, gray).filled())
            }),
    )?;

    // Thin separators between surviving cells.
    chart.draw_series(
        cell_indices(nrows, ncols)
            .filter(|&(row, col)| !mask.is_suppressed(row, col))
            .map(|(row, col)| Rectangle::new(cell_bounds(row, col), WHITE.stroke_width(1))),
    )?;

    // Per-cell annotations at 3 significant digits, light-on-dark as needed.
    chart.draw_series(
        cell_indices(nrows, ncols)
            .filter(|&(row, col)| !mask.is_suppressed(row, col))
            .map(|(row, col)| {
                let v = matrix.get(row, col);
                let color = if shade_of(v) > 0.5 { &WHITE } else { &BLACK };
                let style = TextStyle::from(("sans-serif", 13).into_font())
                    .color(color)
                    .pos(Pos::new(HPos::Center, VPos::Center));
                Text::new(
                    format_sig(v, 3),
                    (col as f64 + 0.5, row as f64 + 0.5),
                    style,
                )
            }),
    )?;

    // Tick labels at a fixed stride, placed at cell centers.
    let tick_font = TextStyle::from(("sans-serif", 14).into_font()).color(&BLACK);
    let x_tick = tick_font.pos(Pos::new(HPos::Center, VPos::Top));
    for (col, tol) in matrix.tol_values().iter().enumerate() {
        if col % LABEL_STRIDE != 0 {
            continue;
        }
        let (x, y) = chart.backend_coord(&(col as f64 + 0.5, nrows as f64));
        root.draw(&Text::new(tol.to_string(), (x, y + 6), x_tick.clone()))?;
    }
    let y_tick = tick_font.pos(Pos::new(HPos::Right, VPos::Center));
    for (row, p) in matrix.p_values().iter().enumerate() {
        if row % LABEL_STRIDE != 0 {
            continue;
        }
        let (x, y) = chart.backend_coord(&(0.0, row as f64 + 0.5));
        root.draw(&Text::new(p.to_string(), (x - 8, y), y_tick.clone()))?;
    }

    // Axis names.
    let (width, height) = root.dim_in_pixel();
    let title = TextStyle::from(("sans-serif", 16).into_font())
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Center));
    root.draw(&Text::new(
        TOL_AXIS_LABEL,
        ((width / 2) as i32, height as i32 - 14),
        title.clone(),
    ))?;
    let rotated = TextStyle::from(
        ("sans-serif", 16)
            .into_font()
            .transform(FontTransform::Rotate270),
    )
    .color(&BLACK)
    .pos(Pos::new(HPos::Center, VPos::Center));
    root.draw(&Text::new(P_AXIS_LABEL, (16, (height / 2) as i32), rotated))?;

    root.present()?;
    info!("wrote {}", path.display());
    Ok(())
}

fn cell_indices(nrows: usize, ncols: usize) -> impl Iterator<Item = (usize, usize)> {
    itertools::iproduct!(0..nrows, 0..ncols)
}

fn cell_bounds(row: usize, col: usize) -> [(f64, f64); 2] {
    [
        (col as f64, row as f64),
        (col as f64 + 1.0, row as f64 + 1.0),
    ]
}

/// Format with the given number of significant digits, trailing zeros
/// trimmed, matching a printf-style `%.3g` for the value ranges the sweep
/// produces.
fn format_sig(value: f64, digits: i32) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = (digits - 1 - magnitude).max(0) as usize;
    let s = format!("{:.*}", decimals, value);
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}
