use crate::creation::CreationOptions;
use crate::error::{IndexError, Result};
use crate::grid::{GeoTransform, GridDescriptor};
use crate::index::IndexKind;
use gdal::cpl::CslStringList;
use gdal::raster::{Buffer, RasterBand};
use gdal::{Dataset, DriverManager, Metadata};
use log::{debug, info, warn};
use ndarray::Array2;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct RasterMetadata {
    pub grid: GridDescriptor,
    pub nodata: Option<f64>,
}

/// Band 1 of a raster read into memory as float32
#[derive(Debug, Clone)]
pub struct BandRaster {
    pub data: Array2<f32>,
    pub metadata: RasterMetadata,
}

impl BandRaster {
    pub fn grid(&self) -> &GridDescriptor {
        &self.metadata.grid
    }

    pub fn nodata(&self) -> Option<f64> {
        self.metadata.nodata
    }
}

/// Open a raster, reporting a missing or unreadable file as an invalid raster
pub fn open_raster(path: &Path) -> Result<Dataset> {
    let display = path.display().to_string();
    if !path.exists() {
        return Err(IndexError::invalid_raster(&display, "file not found"));
    }
    debug!("Opening raster: {}", display);
    Dataset::open(path).map_err(|e| IndexError::invalid_raster(&display, e))
}

/// Reject rasters carrying anything other than exactly one band
pub fn require_single_band(dataset: &Dataset, path: &Path) -> Result<()> {
    let band_count = dataset.raster_count();
    if band_count != 1 {
        return Err(IndexError::invalid_raster(
            &path.display().to_string(),
            format!("expected a single band, found {}", band_count),
        ));
    }
    Ok(())
}

/// Read grid and band 1 nodata without loading pixels
pub fn extract_metadata(dataset: &Dataset, path: &Path) -> Result<RasterMetadata> {
    let display = path.display().to_string();

    if dataset.raster_count() == 0 {
        return Err(IndexError::invalid_raster(&display, "raster has no bands"));
    }

    let rasterband: RasterBand = dataset.rasterband(1)?;
    let (width, height) = rasterband.size();
    if width == 0 || height == 0 {
        return Err(IndexError::invalid_raster(
            &display,
            format!("invalid dimensions {}x{}", width, height),
        ));
    }

    let coeffs = dataset
        .geo_transform()
        .map_err(|e| IndexError::invalid_raster(&display, format!("no geotransform: {}", e)))?;
    let geotransform = GeoTransform::new(coeffs);
    if geotransform.pixel_width() == 0.0 || geotransform.pixel_height() == 0.0 {
        return Err(IndexError::invalid_raster(&display, "zero pixel size"));
    }

    if (geotransform.pixel_width().abs() - geotransform.pixel_height().abs()).abs() > 1e-9 {
        warn!(
            "{}: non-square pixels ({:.6} x {:.6})",
            display,
            geotransform.pixel_width(),
            geotransform.pixel_height()
        );
    }

    Ok(RasterMetadata {
        grid: GridDescriptor {
            geotransform,
            projection: dataset.projection(),
            width,
            height,
        },
        nodata: rasterband.no_data_value(),
    })
}

/// Read band 1 of a single-band raster and its metadata
pub fn read_band(path: &Path) -> Result<BandRaster> {
    let dataset = open_raster(path)?;
    require_single_band(&dataset, path)?;
    let metadata = extract_metadata(&dataset, path)?;

    debug!(
        "{}: {}x{}, pixel size {:.6}, nodata {:?}",
        path.display(),
        metadata.grid.width,
        metadata.grid.height,
        metadata.grid.resolution(),
        metadata.nodata
    );

    let data = read_band_data(&dataset, &metadata.grid)?;
    Ok(BandRaster { data, metadata })
}

/// Band 1 of `dataset` as a `(height, width)` float32 array
pub fn read_band_data(dataset: &Dataset, grid: &GridDescriptor) -> Result<Array2<f32>> {
    let (width, height) = (grid.width, grid.height);
    let rasterband = dataset.rasterband(1)?;
    let buffer = rasterband.read_as::<f32>((0, 0), (width, height), (width, height), None)?;
    let data_vec: Vec<f32> = buffer.into_iter().collect();
    Ok(Array2::from_shape_vec((height, width), data_vec)?)
}

/// Single-band float32 dataset in GDAL's MEM driver holding `values` on `grid`
pub fn in_memory_dataset(
    grid: &GridDescriptor,
    values: &Array2<f32>,
    nodata: Option<f64>,
) -> Result<Dataset> {
    let found = values.dim();
    if found != grid.shape() {
        return Err(IndexError::ShapeMismatch {
            expected: grid.shape(),
            found,
        });
    }

    let driver = DriverManager::get_driver_by_name("MEM")?;
    let mut dataset = driver.create_with_band_type::<f32, _>("", grid.width, grid.height, 1)?;
    dataset.set_geo_transform(&grid.geotransform.coeffs())?;
    if !grid.projection.is_empty() {
        dataset.set_projection(&grid.projection)?;
    }

    let mut raster_band = dataset.rasterband(1)?;
    let pixels: Vec<f32> = values.iter().copied().collect();
    let mut buffer = Buffer::new((grid.width, grid.height), pixels);
    raster_band.write((0, 0), (grid.width, grid.height), &mut buffer)?;
    if nodata.is_some() {
        raster_band.set_no_data_value(nodata)?;
    }

    Ok(dataset)
}

/// Read one pixel of band 1 as f64
pub fn read_pixel(dataset: &Dataset, col: usize, row: usize) -> Result<f64> {
    let rasterband = dataset.rasterband(1)?;
    let buffer = rasterband.read_as::<f64>((col as isize, row as isize), (1, 1), (1, 1), None)?;
    buffer
        .data()
        .first()
        .copied()
        .ok_or_else(|| IndexError::Computation(format!("empty read at pixel ({}, {})", col, row)))
}

/// `{folder}/{index}_{file name of first input}`
pub fn index_output_path(folder: &Path, kind: IndexKind, first_input: &Path) -> Result<PathBuf> {
    let file_name = first_input
        .file_name()
        .ok_or_else(|| {
            IndexError::invalid_raster(&first_input.display().to_string(), "path has no file name")
        })?
        .to_string_lossy();
    Ok(folder.join(format!("{}_{}", kind.file_prefix(), file_name)))
}

pub fn ensure_output_dir(folder: &Path) -> Result<()> {
    std::fs::create_dir_all(folder)?;
    Ok(())
}

/// Create a single-band float32 GeoTIFF
pub fn create_output_dataset(
    path: &Path,
    grid: &GridDescriptor,
    creation: &CreationOptions,
) -> Result<Dataset> {
    info!("Creating output dataset: {}", path.display());

    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let options = creation.to_gdal_options();

    let dataset = if options.is_empty() {
        driver.create_with_band_type::<f32, _>(path, grid.width, grid.height, 1)?
    } else {
        let mut gdal_options = CslStringList::new();
        for opt in options {
            gdal_options.add_string(&opt)?;
        }
        driver.create_with_band_type_with_options::<f32, _>(
            path,
            grid.width,
            grid.height,
            1,
            &gdal_options,
        )?
    };

    Ok(dataset)
}

/// Persist an index raster on `grid`, tagging band 1 with `description`.
///
/// A partially written file is removed when writing fails.
pub fn write_index_raster(
    path: &Path,
    values: &Array2<f32>,
    grid: &GridDescriptor,
    nodata: f32,
    description: &str,
    creation: &CreationOptions,
) -> Result<()> {
    let found = values.dim();
    if found != grid.shape() {
        return Err(IndexError::ShapeMismatch {
            expected: grid.shape(),
            found,
        });
    }

    let result = write_single_band(path, values, grid, nodata, description, creation);

    if result.is_err() && path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            warn!("Could not remove partial output {}: {}", path.display(), e);
        }
    }

    result
}

fn write_single_band(
    path: &Path,
    values: &Array2<f32>,
    grid: &GridDescriptor,
    nodata: f32,
    description: &str,
    creation: &CreationOptions,
) -> Result<()> {
    let mut dataset = create_output_dataset(path, grid, creation)?;
    dataset.set_geo_transform(&grid.geotransform.coeffs())?;
    if !grid.projection.is_empty() {
        dataset.set_projection(&grid.projection)?;
    }

    let mut raster_band = dataset.rasterband(1)?;

    // Row-major, which is what GDAL expects
    let pixels: Vec<f32> = values.iter().copied().collect();
    let mut buffer = Buffer::new((grid.width, grid.height), pixels);
    raster_band.write((0, 0), (grid.width, grid.height), &mut buffer)?;

    raster_band.set_description(description)?;
    raster_band.set_no_data_value(Some(nodata as f64))?;

    info!("Wrote {} ({}x{})", path.display(), grid.width, grid.height);
    Ok(())
}
