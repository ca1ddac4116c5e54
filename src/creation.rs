use crate::error::{IndexError, Result};

const VALID_COMPRESSION: [&str; 4] = ["DEFLATE", "LZW", "ZSTD", "NONE"];

/// GeoTIFF creation options for index output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreationOptions {
    pub compression: Option<String>,
    /// Tiled output with square blocks of this size; striped when `None`
    pub tile_size: Option<usize>,
}

impl CreationOptions {
    /// Validated options, compression names are case-insensitive
    pub fn new(compression: Option<&str>, tile_size: Option<usize>) -> Result<Self> {
        let compression = match compression {
            Some(c) => {
                let upper = c.to_ascii_uppercase();
                validate_compression(&upper)?;
                Some(upper)
            }
            None => None,
        };
        if let Some(size) = tile_size {
            validate_tile_size(size)?;
        }
        Ok(Self {
            compression,
            tile_size,
        })
    }

    /// GDAL `KEY=VALUE` creation strings
    pub fn to_gdal_options(&self) -> Vec<String> {
        let mut options = Vec::new();
        if let Some(compression) = &self.compression {
            options.push(format!("COMPRESS={}", compression));
        }
        if let Some(size) = self.tile_size {
            options.push("TILED=YES".to_string());
            options.push(format!("BLOCKXSIZE={}", size));
            options.push(format!("BLOCKYSIZE={}", size));
        }
        if !options.is_empty() {
            options.push("BIGTIFF=IF_SAFER".to_string());
        }
        options
    }
}

pub fn validate_compression(compression: &str) -> Result<()> {
    if !VALID_COMPRESSION.contains(&compression) {
        return Err(IndexError::InvalidCompression(compression.to_string()));
    }
    Ok(())
}

/// Block sizes must be a positive multiple of 16
pub fn validate_tile_size(tile_size: usize) -> Result<()> {
    if tile_size == 0 || tile_size % 16 != 0 {
        return Err(IndexError::InvalidTileSize(tile_size));
    }
    Ok(())
}
