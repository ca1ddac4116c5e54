// Library exports for testing and reuse

pub mod align;
pub mod cli;
pub mod creation;
pub mod crs;
pub mod elevation;
pub mod error;
pub mod grid;
pub mod index;
pub mod io;
pub mod pipeline;

// Re-export commonly used types
pub use align::{align, align_rasters, AlignedPair, ReferenceRole};
pub use error::{IndexError, Result};
pub use grid::{GeoTransform, GridDescriptor};
pub use index::{compute_index, IndexKind, IndexResult, IndexStats, INDEX_NODATA};
pub use io::{read_band, write_index_raster, BandRaster, RasterMetadata};
pub use pipeline::{run_index, IndexOutput, IndexRequest};
