use crate::align::{align, ReferenceRole};
use crate::creation::CreationOptions;
use crate::error::Result;
use crate::index::{compute_index, IndexKind, IndexStats, INDEX_NODATA};
use crate::io::{ensure_output_dir, index_output_path, write_index_raster};
use log::info;
use serde::Serialize;
use std::path::PathBuf;

/// One index calculation; band paths are in the index's calling order
/// (`red, nir` for NDVI, `green, nir` for NDWI, `nir, swir` for NDBI)
#[derive(Debug, Clone)]
pub struct IndexRequest {
    pub kind: IndexKind,
    pub first_band: PathBuf,
    pub second_band: PathBuf,
    pub output_folder: PathBuf,
    pub creation: CreationOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexMetadata {
    pub index: IndexKind,
    pub formula: &'static str,
    pub range: &'static str,
    pub description: &'static str,
    pub nodata_value: f32,
    /// X pixel size of the reference grid
    pub resolution: f64,
    /// Reference grid CRS as WKT
    pub crs: String,
    pub reference: ReferenceRole,
    pub stats: IndexStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexOutput {
    pub output_path: PathBuf,
    pub metadata: IndexMetadata,
}

/// Align, compute, and write one index raster.
///
/// Nothing is written unless alignment and computation succeed.
pub fn run_index(request: &IndexRequest) -> Result<IndexOutput> {
    let kind = request.kind;
    let (first_name, second_name) = kind.band_names();
    info!(
        "{}: {}={}, {}={}",
        kind,
        first_name,
        request.first_band.display(),
        second_name,
        request.second_band.display()
    );

    let pair = align(&request.first_band, &request.second_band)?;

    let (band_a, band_b) = kind.operands(&pair.first, &pair.second);
    let (nodata_a, nodata_b) = kind.operands(pair.first_nodata, pair.second_nodata);
    let result = compute_index(band_a, band_b, nodata_a, nodata_b, kind)?;
    let stats = result.stats();
    info!(
        "{}: {} of {} pixels valid ({:.2}%)",
        kind, stats.valid_pixels, stats.total_pixels, stats.percent_valid
    );

    ensure_output_dir(&request.output_folder)?;
    let output_path = index_output_path(&request.output_folder, kind, &request.first_band)?;
    write_index_raster(
        &output_path,
        &result.values,
        &pair.grid,
        INDEX_NODATA,
        kind.name(),
        &request.creation,
    )?;

    Ok(IndexOutput {
        output_path,
        metadata: IndexMetadata {
            index: kind,
            formula: kind.formula(),
            range: "[-1, 1]",
            description: kind.description(),
            nodata_value: INDEX_NODATA,
            resolution: pair.grid.geotransform.pixel_width(),
            crs: pair.grid.projection.clone(),
            reference: pair.reference,
            stats,
        },
    })
}
