//! Band alignment.
//!
//! Two single-band rasters are brought onto one grid before any pixel-wise
//! arithmetic. The raster with the finer x pixel size supplies the grid, the
//! other one is resampled onto it with bilinear interpolation. When both have
//! the same pixel size the first argument supplies the grid.

use crate::crs;
use crate::error::{IndexError, Result};
use crate::grid::GridDescriptor;
use crate::io::{in_memory_dataset, read_band, read_band_data, BandRaster};
use gdal::raster::reproject;
use log::{debug, info};
use ndarray::Array2;
use serde::Serialize;
use std::path::Path;

/// Which input supplied the reference grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceRole {
    First,
    Second,
}

/// Both bands on the reference grid, in calling order
#[derive(Debug, Clone)]
pub struct AlignedPair {
    pub first: Array2<f32>,
    pub second: Array2<f32>,
    pub first_nodata: Option<f64>,
    pub second_nodata: Option<f64>,
    pub grid: GridDescriptor,
    pub reference: ReferenceRole,
}

impl AlignedPair {
    /// The band read as-is
    pub fn reference_band(&self) -> &Array2<f32> {
        match self.reference {
            ReferenceRole::First => &self.first,
            ReferenceRole::Second => &self.second,
        }
    }

    /// The band resampled onto the reference grid
    pub fn resampled_band(&self) -> &Array2<f32> {
        match self.reference {
            ReferenceRole::First => &self.second,
            ReferenceRole::Second => &self.first,
        }
    }
}

/// Finer x resolution wins; ties go to `first`
pub fn select_reference(first: &GridDescriptor, second: &GridDescriptor) -> ReferenceRole {
    if second.resolution() < first.resolution() {
        ReferenceRole::Second
    } else {
        ReferenceRole::First
    }
}

/// Read two single-band rasters and align them
pub fn align(first_path: &Path, second_path: &Path) -> Result<AlignedPair> {
    info!(
        "Aligning {} and {}",
        first_path.display(),
        second_path.display()
    );
    let first = read_band(first_path)?;
    let second = read_band(second_path)?;
    align_rasters(first, second)
}

/// Align two in-memory rasters
pub fn align_rasters(first: BandRaster, second: BandRaster) -> Result<AlignedPair> {
    let reference = select_reference(first.grid(), second.grid());
    debug!(
        "Resolution first={:.6}, second={:.6}, reference={:?}",
        first.grid().resolution(),
        second.grid().resolution(),
        reference
    );

    let first_nodata = first.nodata();
    let second_nodata = second.nodata();

    let (first_data, second_data, grid) = match reference {
        ReferenceRole::First => {
            let grid = first.metadata.grid.clone();
            let resampled = resample_bilinear(&second, &grid)?;
            (first.data, resampled, grid)
        }
        ReferenceRole::Second => {
            let grid = second.metadata.grid.clone();
            let resampled = resample_bilinear(&first, &grid)?;
            (resampled, second.data, grid)
        }
    };

    info!(
        "Reference grid: {}x{} at {:.6} ({:?} input)",
        grid.width,
        grid.height,
        grid.resolution(),
        reference
    );

    Ok(AlignedPair {
        first: first_data,
        second: second_data,
        first_nodata,
        second_nodata,
        grid,
        reference,
    })
}

/// Resample `source` onto `target` with GDAL's bilinear warp.
///
/// Target pixels not covered by valid source pixels keep the source no-data
/// value (NaN when the source has none). No-data source pixels are left out of
/// the interpolation weights.
pub fn resample_bilinear(source: &BandRaster, target: &GridDescriptor) -> Result<Array2<f32>> {
    if source.grid() == target {
        debug!("Source already on target grid, no resampling needed");
        return Ok(source.data.clone());
    }

    if source.grid().geotransform.invert(0.0, 0.0).is_none() {
        return Err(IndexError::Alignment(
            "source geotransform is not invertible".to_string(),
        ));
    }
    crs::needs_reprojection(&target.projection, &source.grid().projection)?;

    let nodata = source.nodata();
    let fill = nodata.map(|v| v as f32).unwrap_or(f32::NAN);

    debug!(
        "Resampling {}x{} onto {}x{}",
        source.grid().width,
        source.grid().height,
        target.width,
        target.height
    );

    let src_ds = in_memory_dataset(source.grid(), &source.data, nodata)?;
    let dst_ds = in_memory_dataset(target, &Array2::from_elem(target.shape(), fill), nodata)?;
    reproject(&src_ds, &dst_ds)
        .map_err(|e| IndexError::Alignment(format!("reprojection failed: {}", e)))?;

    read_band_data(&dst_ds, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GeoTransform;
    use crate::io::RasterMetadata;
    use approx::assert_relative_eq;

    fn grid(
        origin_x: f64,
        origin_y: f64,
        pixel: f64,
        width: usize,
        height: usize,
    ) -> GridDescriptor {
        GridDescriptor {
            geotransform: GeoTransform::north_up(origin_x, origin_y, pixel, -pixel),
            projection: String::new(),
            width,
            height,
        }
    }

    fn raster(
        grid: GridDescriptor,
        nodata: Option<f64>,
        f: impl Fn(usize, usize) -> f32,
    ) -> BandRaster {
        let data = Array2::from_shape_fn(grid.shape(), |(r, c)| f(r, c));
        BandRaster {
            data,
            metadata: RasterMetadata { grid, nodata },
        }
    }

    #[test]
    fn test_finer_second_becomes_reference() {
        let coarse = grid(0.0, 0.0, 20.0, 2, 2);
        let fine = grid(0.0, 0.0, 10.0, 4, 4);
        assert_eq!(select_reference(&coarse, &fine), ReferenceRole::Second);
        assert_eq!(select_reference(&fine, &coarse), ReferenceRole::First);
    }

    #[test]
    fn test_equal_resolution_first_wins() {
        let a = grid(0.0, 0.0, 10.0, 4, 4);
        let b = grid(100.0, 0.0, 10.0, 8, 8);
        assert_eq!(select_reference(&a, &b), ReferenceRole::First);
        assert_eq!(select_reference(&b, &a), ReferenceRole::First);
    }

    #[test]
    fn test_same_grid_is_noop() {
        let g = grid(300.0, 900.0, 30.0, 5, 3);
        let source = raster(g.clone(), None, |r, c| (r * 7 + c) as f32 * 0.1);
        let resampled = resample_bilinear(&source, &g).unwrap();
        assert_eq!(resampled, source.data);
    }

    #[test]
    fn test_shifted_by_whole_pixels_copies_values() {
        // Target starts one pixel to the right of the source
        let source = raster(grid(0.0, 0.0, 10.0, 4, 1), None, |_, c| c as f32);
        let target = grid(10.0, 0.0, 10.0, 2, 1);
        let resampled = resample_bilinear(&source, &target).unwrap();
        assert_relative_eq!(resampled[[0, 0]], 1.0, epsilon = 1e-6);
        assert_relative_eq!(resampled[[0, 1]], 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_upsampling_reproduces_linear_ramp() {
        let source = raster(grid(0.0, 80.0, 20.0, 4, 4), None, |r, c| {
            (c * 10 + r * 100) as f32
        });
        let target = grid(0.0, 80.0, 10.0, 8, 8);
        let resampled = resample_bilinear(&source, &target).unwrap();

        for row in 0..8 {
            for col in 0..8 {
                let x = (col as f64 / 2.0 - 0.25).clamp(0.0, 3.0);
                let y = (row as f64 / 2.0 - 0.25).clamp(0.0, 3.0);
                let expected = 10.0 * x + 100.0 * y;
                assert_relative_eq!(resampled[[row, col]] as f64, expected, epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn test_outside_extent_takes_nodata() {
        let target = grid(10_000.0, 0.0, 10.0, 3, 3);

        let with_nodata = raster(grid(0.0, 0.0, 10.0, 3, 3), Some(-1.0), |_, _| 5.0);
        let resampled = resample_bilinear(&with_nodata, &target).unwrap();
        assert!(resampled.iter().all(|&v| v == -1.0));

        let without_nodata = raster(grid(0.0, 0.0, 10.0, 3, 3), None, |_, _| 5.0);
        let resampled = resample_bilinear(&without_nodata, &target).unwrap();
        assert!(resampled.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_nodata_does_not_spread_past_its_footprint() {
        let source = raster(grid(0.0, 0.0, 20.0, 4, 4), Some(0.0), |r, c| {
            if r == 0 && c == 0 {
                0.0
            } else {
                1.0
            }
        });
        let target = grid(0.0, 0.0, 10.0, 8, 8);
        let resampled = resample_bilinear(&source, &target).unwrap();

        // Only the four target pixels inside the no-data source pixel stay masked
        let masked: Vec<(usize, usize)> = resampled
            .indexed_iter()
            .filter(|&(_, &v)| v == 0.0)
            .map(|(idx, _)| idx)
            .collect();
        assert_eq!(masked, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);

        // Valid neighbours are re-weighted around the hole
        assert_relative_eq!(resampled[[2, 2]], 1.0, epsilon = 1e-6);
        assert_relative_eq!(resampled[[0, 2]], 1.0, epsilon = 1e-6);
        assert_relative_eq!(resampled[[6, 6]], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_align_rasters_uses_finer_grid() {
        let coarse = raster(grid(0.0, 0.0, 20.0, 2, 2), Some(-5.0), |_, _| 2.0);
        let fine = raster(grid(0.0, 0.0, 10.0, 4, 4), None, |_, _| 1.0);

        let pair = align_rasters(coarse, fine).unwrap();
        assert_eq!(pair.reference, ReferenceRole::Second);
        assert_eq!(pair.grid.shape(), (4, 4));
        assert_eq!(pair.first.dim(), (4, 4));
        assert_eq!(pair.second.dim(), (4, 4));
        assert_eq!(pair.first_nodata, Some(-5.0));
        assert_eq!(pair.second_nodata, None);
        assert!(pair.resampled_band().iter().all(|&v| (v - 2.0).abs() < 1e-6));
        assert!(pair.reference_band().iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_align_rasters_tie_keeps_first_grid() {
        let first = raster(grid(0.0, 0.0, 10.0, 3, 3), None, |_, _| 1.0);
        let second = raster(grid(-10.0, 10.0, 10.0, 5, 5), None, |_, _| 2.0);

        let pair = align_rasters(first.clone(), second).unwrap();
        assert_eq!(pair.reference, ReferenceRole::First);
        assert_eq!(pair.grid, *first.grid());
        assert_eq!(pair.first, first.data);
        assert!(pair.second.iter().all(|&v| (v - 2.0).abs() < 1e-6));
    }

    #[test]
    fn test_one_sided_crs_fails_alignment() {
        let mut with_crs = grid(0.0, 0.0, 10.0, 2, 2);
        with_crs.projection = "GEOGCS[\"WGS 84\"]".to_string();
        let first = raster(with_crs, None, |_, _| 1.0);
        let second = raster(grid(0.0, 0.0, 20.0, 1, 1), None, |_, _| 1.0);

        assert!(matches!(
            align_rasters(first, second),
            Err(IndexError::Alignment(_))
        ));
    }

    #[test]
    fn test_align_missing_file() {
        let err = align(
            Path::new("/nonexistent/a.tif"),
            Path::new("/nonexistent/b.tif"),
        )
        .unwrap_err();
        assert!(matches!(err, IndexError::InvalidRaster { .. }));
    }
}
