//! Elevation lookups on a DEM by WGS84 longitude/latitude.

use crate::crs;
use crate::error::{IndexError, Result};
use crate::grid::GridDescriptor;
use crate::io::{extract_metadata, open_raster, read_pixel};
use gdal::spatial_ref::SpatialRef;
use log::{debug, info};
use serde::Serialize;
use std::path::Path;

pub const DEFAULT_PROFILE_SAMPLES: usize = 50;
pub const MAX_PROFILE_SAMPLES: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PointElevation {
    pub lon: f64,
    pub lat: f64,
    /// `None` on a no-data pixel
    pub elevation: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProfilePoint {
    /// Distance from the start point in DEM CRS units
    pub distance: f64,
    pub elevation: Option<f64>,
    pub longitude: f64,
    pub latitude: f64,
}

/// Pixel containing `(x, y)`, or `None` outside the grid
pub fn pixel_index(grid: &GridDescriptor, x: f64, y: f64) -> Option<(usize, usize)> {
    let (col, row) = grid.geotransform.invert(x, y)?;
    let (col, row) = (col.floor(), row.floor());
    if !grid.contains_pixel(col, row) {
        return None;
    }
    Some((col as usize, row as usize))
}

fn elevation_value(value: f64, nodata: Option<f64>) -> Option<f64> {
    if !value.is_finite() || nodata == Some(value) {
        None
    } else {
        Some(value)
    }
}

fn dem_spatial_ref(grid: &GridDescriptor, dem_path: &Path) -> Result<SpatialRef> {
    if grid.projection.trim().is_empty() {
        return Err(IndexError::invalid_raster(
            &dem_path.display().to_string(),
            "DEM has no CRS",
        ));
    }
    crs::parse_projection(&grid.projection)
}

/// Elevation of the DEM pixel under a WGS84 point
pub fn point_elevation(dem_path: &Path, lon: f64, lat: f64) -> Result<PointElevation> {
    let dataset = open_raster(dem_path)?;
    let metadata = extract_metadata(&dataset, dem_path)?;
    let grid = &metadata.grid;

    let wgs84 = crs::wgs84()?;
    let dem_srs = dem_spatial_ref(grid, dem_path)?;
    let to_dem = crs::transform_between(&wgs84, &dem_srs)?;

    let (x, y) = crs::transform_point(to_dem.as_ref(), lon, lat)?;
    let (col, row) = pixel_index(grid, x, y).ok_or(IndexError::PointOutOfExtent { lon, lat })?;
    debug!("({}, {}) -> DEM ({:.3}, {:.3}) -> pixel ({}, {})", lon, lat, x, y, col, row);

    let value = read_pixel(&dataset, col, row)?;
    Ok(PointElevation {
        lon,
        lat,
        elevation: elevation_value(value, metadata.nodata),
    })
}

/// Sample `samples + 1` evenly spaced points on the straight DEM-CRS line
/// from `start` to `end` (both `(lon, lat)`). Points off the DEM are skipped.
///
/// Band 1 is read whatever the DEM's band count.
pub fn elevation_profile(
    dem_path: &Path,
    start: (f64, f64),
    end: (f64, f64),
    samples: usize,
) -> Result<Vec<ProfilePoint>> {
    if samples == 0 || samples > MAX_PROFILE_SAMPLES {
        return Err(IndexError::InvalidSamples(samples));
    }

    let dataset = open_raster(dem_path)?;
    let metadata = extract_metadata(&dataset, dem_path)?;
    let grid = &metadata.grid;

    let wgs84 = crs::wgs84()?;
    let dem_srs = dem_spatial_ref(grid, dem_path)?;
    let to_dem = crs::transform_between(&wgs84, &dem_srs)?;
    let to_wgs84 = crs::transform_between(&dem_srs, &wgs84)?;

    let (x1, y1) = crs::transform_point(to_dem.as_ref(), start.0, start.1)?;
    let (x2, y2) = crs::transform_point(to_dem.as_ref(), end.0, end.1)?;
    let total_distance = (x2 - x1).hypot(y2 - y1);

    info!(
        "Profile of {} samples over {:.3} DEM units",
        samples + 1,
        total_distance
    );

    let mut profile = Vec::new();
    for i in 0..=samples {
        let t = i as f64 / samples as f64;
        let x = x1 + t * (x2 - x1);
        let y = y1 + t * (y2 - y1);

        let Some((col, row)) = pixel_index(grid, x, y) else {
            debug!("Sample {} at ({:.3}, {:.3}) is off the DEM", i, x, y);
            continue;
        };

        let value = read_pixel(&dataset, col, row)?;
        let (longitude, latitude) = crs::transform_point(to_wgs84.as_ref(), x, y)?;
        profile.push(ProfilePoint {
            distance: total_distance * t,
            elevation: elevation_value(value, metadata.nodata),
            longitude,
            latitude,
        });
    }

    Ok(profile)
}
