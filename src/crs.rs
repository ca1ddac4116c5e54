use crate::error::{IndexError, Result};
use gdal::spatial_ref::{AxisMappingStrategy, CoordTransform, SpatialRef};
use log::{debug, info, warn};

/// Parse a WKT projection with x = easting/longitude and y = northing/latitude
pub fn parse_projection(wkt: &str) -> Result<SpatialRef> {
    let mut srs = SpatialRef::from_wkt(wkt)
        .map_err(|e| IndexError::Alignment(format!("cannot parse CRS: {}", e)))?;
    srs.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
    Ok(srs)
}

/// WGS84 in lon/lat order
pub fn wgs84() -> Result<SpatialRef> {
    let mut srs = SpatialRef::from_epsg(4326)?;
    srs.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
    Ok(srs)
}

/// Whether source pixels need reprojecting into the reference CRS.
///
/// Two rasters without any CRS are assumed to share a coordinate space. A CRS
/// on only one side cannot be reconciled.
pub fn needs_reprojection(reference_wkt: &str, source_wkt: &str) -> Result<bool> {
    match (reference_wkt.trim().is_empty(), source_wkt.trim().is_empty()) {
        (true, true) => {
            warn!("Neither raster has a CRS, assuming a shared coordinate space");
            return Ok(false);
        }
        (true, false) => {
            return Err(IndexError::Alignment(
                "reference raster has no CRS".to_string(),
            ))
        }
        (false, true) => {
            return Err(IndexError::Alignment("source raster has no CRS".to_string()))
        }
        (false, false) => {}
    }

    let reference = parse_projection(reference_wkt)?;
    let source = parse_projection(source_wkt)?;
    if reference == source {
        debug!("CRS are identical, no reprojection needed");
        return Ok(false);
    }

    info!("Source CRS differs from reference, reprojecting");
    Ok(true)
}

/// `None` when both spatial references describe the same CRS
pub fn transform_between(from: &SpatialRef, to: &SpatialRef) -> Result<Option<CoordTransform>> {
    if from == to {
        debug!("CRS are identical, no transform needed");
        return Ok(None);
    }

    let transform = CoordTransform::new(from, to)
        .map_err(|e| IndexError::Alignment(format!("cannot build CRS transform: {}", e)))?;
    Ok(Some(transform))
}

/// Transform a single point, passing it through unchanged without a transform
pub fn transform_point(transform: Option<&CoordTransform>, x: f64, y: f64) -> Result<(f64, f64)> {
    let Some(transform) = transform else {
        return Ok((x, y));
    };

    let mut xs = [x];
    let mut ys = [y];
    let mut zs = [0.0];
    transform
        .transform_coords(&mut xs, &mut ys, &mut zs)
        .map_err(|e| IndexError::Alignment(format!("coordinate transform failed: {}", e)))?;
    Ok((xs[0], ys[0]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn epsg_wkt(code: u32) -> String {
        SpatialRef::from_epsg(code).unwrap().to_wkt().unwrap()
    }

    #[test]
    fn test_identical_crs_needs_no_reprojection() {
        let wkt = epsg_wkt(32633);
        assert!(!needs_reprojection(&wkt, &wkt).unwrap());
    }

    #[test]
    fn test_different_crs_needs_reprojection() {
        assert!(needs_reprojection(&epsg_wkt(32633), &epsg_wkt(4326)).unwrap());
    }

    #[test]
    fn test_both_missing_crs_needs_no_reprojection() {
        assert!(!needs_reprojection("", "").unwrap());
    }

    #[test]
    fn test_one_missing_crs_is_alignment_error() {
        let wkt = epsg_wkt(4326);
        assert!(matches!(
            needs_reprojection(&wkt, ""),
            Err(IndexError::Alignment(_))
        ));
        assert!(matches!(
            needs_reprojection("", &wkt),
            Err(IndexError::Alignment(_))
        ));
    }

    #[test]
    fn test_garbage_wkt_is_alignment_error() {
        assert!(matches!(
            needs_reprojection("not a crs", "also not a crs"),
            Err(IndexError::Alignment(_))
        ));
    }

    #[test]
    fn test_utm_to_wgs84_transform() {
        // UTM 33N central meridian is 15E
        let utm = parse_projection(&epsg_wkt(32633)).unwrap();
        let transform = transform_between(&utm, &wgs84().unwrap()).unwrap();
        let (lon, lat) = transform_point(transform.as_ref(), 500_000.0, 0.0).unwrap();
        assert_relative_eq!(lon, 15.0, epsilon = 1e-6);
        assert_relative_eq!(lat, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_no_transform_passes_point_through() {
        assert_eq!(transform_point(None, 3.5, -2.0).unwrap(), (3.5, -2.0));
    }
}
