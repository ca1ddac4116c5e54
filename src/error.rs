use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Invalid raster {path}: {reason}")]
    InvalidRaster { path: String, reason: String },

    #[error("Band alignment failed: {0}")]
    Alignment(String),

    #[error("Band shapes differ: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Index computation failed: {0}")]
    Computation(String),

    #[error("Point ({lon}, {lat}) is outside the DEM extent")]
    PointOutOfExtent { lon: f64, lat: f64 },

    #[error("Invalid sample count: {0} (must be between 1 and 10000)")]
    InvalidSamples(usize),

    #[error("Invalid compression type: {0}")]
    InvalidCompression(String),

    #[error("Invalid tile size: {0} (must be multiple of 16)")]
    InvalidTileSize(usize),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Array shape error: {0}")]
    ShapeError(#[from] ndarray::ShapeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl IndexError {
    pub fn invalid_raster(path: &str, reason: impl ToString) -> Self {
        IndexError::InvalidRaster {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Status code a request boundary should answer with for this error.
    ///
    /// Bad or missing caller input maps to 400, everything raised while
    /// processing valid input maps to 500.
    pub fn http_status(&self) -> u16 {
        match self {
            IndexError::InvalidRaster { .. }
            | IndexError::PointOutOfExtent { .. }
            | IndexError::InvalidSamples(_)
            | IndexError::InvalidCompression(_)
            | IndexError::InvalidTileSize(_) => 400,
            _ => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, IndexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_errors_are_client_errors() {
        assert_eq!(IndexError::invalid_raster("a.tif", "missing").http_status(), 400);
        assert_eq!(IndexError::PointOutOfExtent { lon: 0.0, lat: 0.0 }.http_status(), 400);
        assert_eq!(IndexError::InvalidSamples(0).http_status(), 400);
        assert_eq!(IndexError::InvalidTileSize(100).http_status(), 400);
    }

    #[test]
    fn test_processing_errors_are_server_errors() {
        assert_eq!(IndexError::Alignment("no CRS".into()).http_status(), 500);
        assert_eq!(IndexError::Computation("overflow".into()).http_status(), 500);
        let err = IndexError::ShapeMismatch {
            expected: (2, 2),
            found: (2, 3),
        };
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn test_invalid_raster_message() {
        let err = IndexError::invalid_raster("red.tif", "file not found");
        assert_eq!(err.to_string(), "Invalid raster red.tif: file not found");
    }
}
