/// GDAL-ordered affine coefficients:
/// `[origin_x, pixel_width, row_rotation, origin_y, col_rotation, pixel_height]`.
///
/// Pixel `(col, row)` maps to
/// `x = c0 + col * c1 + row * c2`, `y = c3 + col * c4 + row * c5`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform([f64; 6]);

impl GeoTransform {
    pub fn new(coeffs: [f64; 6]) -> Self {
        Self(coeffs)
    }

    /// North-up transform without rotation
    pub fn north_up(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self([origin_x, pixel_width, 0.0, origin_y, 0.0, pixel_height])
    }

    pub fn coeffs(&self) -> [f64; 6] {
        self.0
    }

    /// X scale (`c1`); negative for east-to-west grids
    pub fn pixel_width(&self) -> f64 {
        self.0[1]
    }

    pub fn pixel_height(&self) -> f64 {
        self.0[5]
    }

    /// Map fractional pixel coordinates to georeferenced coordinates
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        let c = &self.0;
        (
            c[0] + col * c[1] + row * c[2],
            c[3] + col * c[4] + row * c[5],
        )
    }

    /// Inverse mapping to fractional `(col, row)`; `None` for a degenerate transform
    pub fn invert(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let c = &self.0;
        let det = c[1] * c[5] - c[2] * c[4];
        if det == 0.0 || !det.is_finite() {
            return None;
        }

        let dx = x - c[0];
        let dy = y - c[3];
        let col = (c[5] * dx - c[2] * dy) / det;
        let row = (c[1] * dy - c[4] * dx) / det;
        Some((col, row))
    }
}

/// Output grid shared by both bands of an index calculation
#[derive(Debug, Clone, PartialEq)]
pub struct GridDescriptor {
    pub geotransform: GeoTransform,
    /// WKT, empty when the raster carries no CRS
    pub projection: String,
    pub width: usize,
    pub height: usize,
}

impl GridDescriptor {
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Absolute x pixel size, used to rank resolution
    pub fn resolution(&self) -> f64 {
        self.geotransform.pixel_width().abs()
    }

    pub fn contains_pixel(&self, col: f64, row: f64) -> bool {
        col >= 0.0 && row >= 0.0 && col < self.width as f64 && row < self.height as f64
    }
}
