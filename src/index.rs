//! Normalized-difference band indices.
//!
//! Every index has the form `(X - Y) / (X + Y)`. Pixels where either input is
//! its no-data value, either input is not finite, or the sum is zero or overflows are
//! masked and hold [`INDEX_NODATA`] in the output.

use crate::error::{IndexError, Result};
use log::{debug, info};
use ndarray::Array2;
use rayon::prelude::*;
use serde::Serialize;

/// Sentinel written to every masked output pixel
pub const INDEX_NODATA: f32 = -9999.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IndexKind {
    /// `(NIR - Red) / (NIR + Red)`; called as `(red, nir)`
    Ndvi,
    /// `(Green - NIR) / (Green + NIR)`; called as `(green, nir)`
    Ndwi,
    /// `(SWIR - NIR) / (SWIR + NIR)`; called as `(nir, swir)`
    Ndbi,
}

impl IndexKind {
    pub fn name(&self) -> &'static str {
        match self {
            IndexKind::Ndvi => "NDVI",
            IndexKind::Ndwi => "NDWI",
            IndexKind::Ndbi => "NDBI",
        }
    }

    /// Output file name prefix
    pub fn file_prefix(&self) -> &'static str {
        match self {
            IndexKind::Ndvi => "ndvi",
            IndexKind::Ndwi => "ndwi",
            IndexKind::Ndbi => "ndbi",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            IndexKind::Ndvi => "Normalized Difference Vegetation Index",
            IndexKind::Ndwi => "Normalized Difference Water Index",
            IndexKind::Ndbi => "Normalized Difference Built-up Index",
        }
    }

    pub fn formula(&self) -> &'static str {
        match self {
            IndexKind::Ndvi => "(NIR - Red) / (NIR + Red)",
            IndexKind::Ndwi => "(Green - NIR) / (Green + NIR)",
            IndexKind::Ndbi => "(SWIR - NIR) / (SWIR + NIR)",
        }
    }

    /// Band names in calling order `(first, second)`
    pub fn band_names(&self) -> (&'static str, &'static str) {
        match self {
            IndexKind::Ndvi => ("red", "nir"),
            IndexKind::Ndwi => ("green", "nir"),
            IndexKind::Ndbi => ("nir", "swir"),
        }
    }

    /// Whether the first band in calling order is `X` in `(X - Y) / (X + Y)`
    fn first_is_x(&self) -> bool {
        matches!(self, IndexKind::Ndwi)
    }

    /// Reorder `(first, second)` into `(X, Y)`
    pub fn operands<T>(&self, first: T, second: T) -> (T, T) {
        if self.first_is_x() {
            (first, second)
        } else {
            (second, first)
        }
    }
}

impl std::fmt::Display for IndexKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Index values and the mask of excluded pixels (`true` = masked)
#[derive(Debug, Clone, PartialEq)]
pub struct IndexResult {
    pub values: Array2<f32>,
    pub mask: Array2<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStats {
    pub total_pixels: usize,
    pub valid_pixels: usize,
    pub percent_valid: f64,
    pub min: Option<f32>,
    pub max: Option<f32>,
    pub mean: Option<f64>,
}

impl IndexResult {
    pub fn stats(&self) -> IndexStats {
        let total_pixels = self.values.len();
        let mut valid_pixels = 0usize;
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        let mut sum = 0.0f64;

        for (&value, &masked) in self.values.iter().zip(self.mask.iter()) {
            if masked {
                continue;
            }
            valid_pixels += 1;
            min = min.min(value);
            max = max.max(value);
            sum += value as f64;
        }

        let percent_valid = if total_pixels > 0 {
            valid_pixels as f64 / total_pixels as f64 * 100.0
        } else {
            0.0
        };

        let has_valid = valid_pixels > 0;
        IndexStats {
            total_pixels,
            valid_pixels,
            percent_valid,
            min: has_valid.then_some(min),
            max: has_valid.then_some(max),
            mean: has_valid.then(|| sum / valid_pixels as f64),
        }
    }
}

fn is_nodata(value: f32, nodata: Option<f32>) -> bool {
    nodata.is_some_and(|nd| value == nd)
}

/// Masking and ratio for one pixel; `None` when the pixel is excluded
fn normalized_difference(
    a: f32,
    b: f32,
    nodata_a: Option<f32>,
    nodata_b: Option<f32>,
) -> Option<f32> {
    if is_nodata(a, nodata_a) || is_nodata(b, nodata_b) || !a.is_finite() || !b.is_finite() {
        return None;
    }

    let sum = a + b;
    if sum == 0.0 || !sum.is_finite() {
        return None;
    }

    let ratio = (a - b) / sum;
    ratio.is_finite().then_some(ratio)
}

/// Compute `(band_a - band_b) / (band_a + band_b)` over two aligned bands.
///
/// No-data values are compared in float32, the precision the bands are held in.
pub fn compute_index(
    band_a: &Array2<f32>,
    band_b: &Array2<f32>,
    nodata_a: Option<f64>,
    nodata_b: Option<f64>,
    kind: IndexKind,
) -> Result<IndexResult> {
    if band_a.dim() != band_b.dim() {
        return Err(IndexError::ShapeMismatch {
            expected: band_a.dim(),
            found: band_b.dim(),
        });
    }

    let (nrows, ncols) = band_a.dim();
    let nodata_a = nodata_a.map(|v| v as f32);
    let nodata_b = nodata_b.map(|v| v as f32);

    info!("Calculating {} over {}x{} pixels", kind, ncols, nrows);
    debug!("{} nodata: a={:?}, b={:?}", kind, nodata_a, nodata_b);

    let rows: Vec<Vec<Option<f32>>> = (0..nrows)
        .into_par_iter()
        .map(|row| {
            (0..ncols)
                .map(|col| {
                    normalized_difference(
                        band_a[[row, col]],
                        band_b[[row, col]],
                        nodata_a,
                        nodata_b,
                    )
                })
                .collect()
        })
        .collect();

    let cells: Vec<Option<f32>> = rows.into_iter().flatten().collect();
    let mask_vec: Vec<bool> = cells.iter().map(Option::is_none).collect();
    let values_vec: Vec<f32> = cells.iter().map(|c| c.unwrap_or(INDEX_NODATA)).collect();

    let values = Array2::from_shape_vec((nrows, ncols), values_vec)?;
    let mask = Array2::from_shape_vec((nrows, ncols), mask_vec)?;

    Ok(IndexResult { values, mask })
}
