use ndarray::Array2;

/// Real-valued raster sample (height in meters, or hit count)
pub type RasterValue = f32;

/// 2D real raster grid (rows x cols)
pub type RasterGrid = Array2<RasterValue>;

/// Pixel spacing in meters along rows (azimuth) and columns (range)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelSpacing {
    /// Spacing between consecutive rows
    pub row: f64,
    /// Spacing between consecutive columns
    pub col: f64,
}

impl PixelSpacing {
    pub fn new(row: f64, col: f64) -> Self {
        Self { row, col }
    }

    /// Spacing after scaling each axis by the given zoom factors
    pub fn scaled(&self, scale_factors: (f64, f64)) -> Self {
        Self {
            row: self.row / scale_factors.0,
            col: self.col / scale_factors.1,
        }
    }
}

/// Side from which the sensor illuminates the scene, assuming a
/// north-to-south flight line at aspect angle 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    /// Sensor looks from west to east
    #[default]
    West,
    /// Sensor looks from east to west
    East,
}

impl Direction {
    /// Rotation (degrees) that turns this viewing direction into a
    /// left-to-right scan of the working raster
    pub fn baseline_rotation(&self) -> f64 {
        match self {
            Direction::West => 0.0,
            Direction::East => 180.0,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::West => write!(f, "west"),
            Direction::East => write!(f, "east"),
        }
    }
}

/// Single-band raster with its pixel spacing and optional no-data sentinel
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub data: RasterGrid,
    pub pixel_spacing: PixelSpacing,
    pub no_data: Option<RasterValue>,
}

impl Raster {
    pub fn new(data: RasterGrid, pixel_spacing: PixelSpacing, no_data: Option<RasterValue>) -> Self {
        Self {
            data,
            pixel_spacing,
            no_data,
        }
    }

    /// Raster of the given size with every cell set to `value`
    pub fn filled(
        size: (usize, usize),
        pixel_spacing: PixelSpacing,
        value: RasterValue,
        no_data: Option<RasterValue>,
    ) -> Self {
        Self::new(Array2::from_elem(size, value), pixel_spacing, no_data)
    }

    /// (rows, cols)
    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn is_empty(&self) -> bool {
        let (rows, cols) = self.dim();
        rows == 0 || cols == 0
    }
}

/// True when `value` equals the no-data sentinel (NaN sentinels match NaN)
pub(crate) fn is_no_data(value: RasterValue, no_data: Option<RasterValue>) -> bool {
    match no_data {
        Some(nd) if nd.is_nan() => value.is_nan(),
        Some(nd) => value == nd,
        None => false,
    }
}

/// Coarse classification of failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Io,
    Transform,
    Simulation,
}

/// Error types for pseudo-SAR simulation
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("Invalid raster: {0}")]
    InvalidRaster(String),

    #[error("Transform error: {0}")]
    Transform(String),

    #[error("Simulation error: {0}")]
    Simulation(String),
}

impl SimError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SimError::Configuration(_) => ErrorKind::Configuration,
            SimError::Io(_) | SimError::Gdal(_) | SimError::InvalidRaster(_) => ErrorKind::Io,
            SimError::Transform(_) => ErrorKind::Transform,
            SimError::Simulation(_) => ErrorKind::Simulation,
        }
    }
}

/// Result type for simulation operations
pub type SimResult<T> = Result<T, SimError>;
