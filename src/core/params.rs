use crate::types::{is_no_data, PixelSpacing, RasterValue, SimError, SimResult};

/// Incidence angle with its trigonometric values, always computed together
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IncidenceAngle {
    pub degrees: f64,
    pub radians: f64,
    pub sin: f64,
    pub cos: f64,
    pub tan: f64,
}

impl IncidenceAngle {
    /// Build from degrees; valid domain is the open interval (0, 90)
    pub fn from_degrees(degrees: f64) -> SimResult<Self> {
        if !degrees.is_finite() || degrees <= 0.0 || degrees >= 90.0 {
            return Err(SimError::Configuration(format!(
                "Incidence angle must lie in (0, 90) degrees, got {}",
                degrees
            )));
        }
        let radians = degrees.to_radians();
        Ok(Self {
            degrees,
            radians,
            sin: radians.sin(),
            cos: radians.cos(),
            tan: radians.tan(),
        })
    }
}

/// Geometry constants shared read-only by every row of one simulation run
#[derive(Debug, Clone, PartialEq)]
pub struct RowSimParams {
    incidence: IncidenceAngle,
    /// Working input raster size (rows, cols)
    pub input_size: (usize, usize),
    /// Working output raster size (rows, cols)
    pub output_size: (usize, usize),
    pub input_pixel_spacing: PixelSpacing,
    /// Row spacing unchanged, column spacing projected to slant range
    pub output_pixel_spacing: PixelSpacing,
    /// Column offset (pixels) that centers the most frequent height
    pub output_offset: i64,
    pub no_data: Option<RasterValue>,
    /// Fraction of a pixel tolerated before a column counts as lit
    pub shadow_tolerance: f64,
    /// Height drop per ground pixel along the grazing ray
    pub shadow_angular_factor: f64,
    /// Smallest height step between neighbours that produces layover
    pub min_layover_height_delta: f64,
}

impl RowSimParams {
    pub fn new(incidence_angle_deg: f64, shadow_tolerance: f64) -> SimResult<Self> {
        Ok(Self {
            incidence: IncidenceAngle::from_degrees(incidence_angle_deg)?,
            input_size: (0, 0),
            output_size: (0, 0),
            input_pixel_spacing: PixelSpacing::new(0.0, 0.0),
            output_pixel_spacing: PixelSpacing::new(0.0, 0.0),
            output_offset: 0,
            no_data: None,
            shadow_tolerance,
            shadow_angular_factor: 0.0,
            min_layover_height_delta: 0.0,
        })
    }

    pub fn incidence(&self) -> &IncidenceAngle {
        &self.incidence
    }

    /// Update the incidence angle. Returns `Ok(false)` without touching any
    /// field when the angle is unchanged. Size-derived fields must be
    /// refreshed with [`derive_from_working_raster`](Self::derive_from_working_raster)
    /// afterwards.
    pub fn set_incidence_angle(&mut self, degrees: f64) -> SimResult<bool> {
        if degrees == self.incidence.degrees {
            return Ok(false);
        }
        self.incidence = IncidenceAngle::from_degrees(degrees)?;
        Ok(true)
    }

    /// Derive sizes, output spacing and angular constants from the current
    /// working raster
    pub fn derive_from_working_raster(
        &mut self,
        size: (usize, usize),
        pixel_spacing: PixelSpacing,
        layover_tolerance: f64,
    ) {
        let ia = &self.incidence;
        self.input_size = size;
        self.output_size = size;
        self.input_pixel_spacing = pixel_spacing;
        self.output_pixel_spacing = PixelSpacing::new(pixel_spacing.row, pixel_spacing.col * ia.sin);
        self.shadow_angular_factor = pixel_spacing.col / ia.tan;
        self.min_layover_height_delta = pixel_spacing.col * ia.tan * (1.0 - layover_tolerance);
    }

    pub fn is_no_data(&self, value: RasterValue) -> bool {
        is_no_data(value, self.no_data)
    }

    /// Slant-range distance of a point at `height`
    pub fn slant_distance(&self, height: f64) -> f64 {
        height * self.incidence.cos
    }

    /// Output column of input column `col` at `height`
    pub fn project(&self, col: usize, height: f64) -> i64 {
        let out_ps = self.output_pixel_spacing.col;
        let ground = col as f64 * self.input_pixel_spacing.col * self.incidence.sin / out_ps;
        (ground - self.slant_distance(height) / out_ps - self.output_offset as f64).round_ties_even() as i64
    }

    /// Output column where a layover cut at `height` ends. The offset is
    /// applied after rounding here.
    pub fn project_layover_end(&self, col: usize, height: f64) -> i64 {
        let ground = col as f64 * self.input_pixel_spacing.col * self.incidence.sin;
        ((ground - self.slant_distance(height)) / self.output_pixel_spacing.col).round_ties_even() as i64
            - self.output_offset
    }
}
