use crate::core::offset::{compute_output_offset, DEFAULT_HISTOGRAM_BINS};
use crate::core::params::{IncidenceAngle, RowSimParams};
use crate::core::row_sim::simulate_row;
use crate::core::transform::{self, Interpolation};
use crate::types::{Direction, Raster, RasterGrid, SimError, SimResult};
use ndarray::{Array1, Array2};

/// Viewing geometry and processing options of a simulation
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Incidence angle in degrees, in (0, 90)
    pub incidence_angle: f64,
    /// Flight line angle w.r.t. north-south in degrees, clockwise positive
    pub aspect_angle: f64,
    pub direction: Direction,
    /// Requested (azimuth, slant range) output spacing in meters; 0 keeps
    /// the natural spacing of that axis
    pub output_pixel_spacing: (f64, f64),
    /// Shadow tolerance in pixels
    pub shadow_tolerance: f64,
    /// Fraction of the flat-terrain height step ignored for layover
    pub layover_tolerance: f64,
    pub histogram_bins: usize,
    /// Number of worker threads (1 = sequential)
    pub workers: usize,
    /// Rotate the output back by -aspect angle and crop to the input size
    pub rotate_back: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            incidence_angle: 30.0,
            aspect_angle: 0.0,
            direction: Direction::West,
            output_pixel_spacing: (0.0, 0.0),
            shadow_tolerance: 0.25,
            layover_tolerance: 0.25,
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
            workers: 1,
            rotate_back: false,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> SimResult<()> {
        IncidenceAngle::from_degrees(self.incidence_angle)?;
        if !self.aspect_angle.is_finite() {
            return Err(SimError::Configuration(format!(
                "Invalid aspect angle: {}",
                self.aspect_angle
            )));
        }
        let (az, sr) = self.output_pixel_spacing;
        if !(az.is_finite() && sr.is_finite() && az >= 0.0 && sr >= 0.0) {
            return Err(SimError::Configuration(format!(
                "Output pixel spacing must be >= 0, got ({}, {})",
                az, sr
            )));
        }
        for (name, value) in [
            ("shadow", self.shadow_tolerance),
            ("layover", self.layover_tolerance),
        ] {
            if !(0.0..1.0).contains(&value) {
                return Err(SimError::Configuration(format!(
                    "{} tolerance must lie in [0, 1), got {}",
                    name, value
                )));
            }
        }
        if self.histogram_bins == 0 {
            return Err(SimError::Configuration("Histogram needs at least one bin".to_string()));
        }
        if self.workers == 0 {
            return Err(SimError::Configuration("Worker count must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Pseudo-SAR simulator: rotates the DEM so the sensor looks along the rows,
/// traces every row and maps the result back to the requested geometry
pub struct Simulator {
    config: SimulationConfig,
    params: RowSimParams,
    input: Option<Raster>,
    working: Option<Raster>,
    output: Option<Raster>,
    output_offset: Option<i64>,
}

impl Simulator {
    pub fn new(config: SimulationConfig) -> SimResult<Self> {
        config.validate()?;
        let params = RowSimParams::new(config.incidence_angle, config.shadow_tolerance)?;
        Ok(Self {
            config,
            params,
            input: None,
            working: None,
            output: None,
            output_offset: None,
        })
    }

    /// Simulator with an input raster already set
    pub fn with_input(config: SimulationConfig, input: Raster) -> SimResult<Self> {
        let mut simulator = Self::new(config)?;
        simulator.set_input(input)?;
        Ok(simulator)
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Parameters of the latest run (or of the input raster before any run)
    pub fn params(&self) -> &RowSimParams {
        &self.params
    }

    /// Change the viewing geometry; the cached output is dropped only when
    /// something actually changes
    pub fn set_angles(
        &mut self,
        incidence_angle: f64,
        aspect_angle: f64,
        direction: Direction,
    ) -> SimResult<()> {
        if !aspect_angle.is_finite() {
            return Err(SimError::Configuration(format!(
                "Invalid aspect angle: {}",
                aspect_angle
            )));
        }
        if self.config.direction == direction
            && self.config.aspect_angle == aspect_angle
            && self.config.incidence_angle == incidence_angle
        {
            return Ok(());
        }

        self.params.set_incidence_angle(incidence_angle)?;
        self.config.incidence_angle = incidence_angle;
        self.config.aspect_angle = aspect_angle;
        self.config.direction = direction;
        if let Some(input) = &self.input {
            self.params.derive_from_working_raster(
                input.dim(),
                input.pixel_spacing,
                self.config.layover_tolerance,
            );
        }
        self.reset_output();
        Ok(())
    }

    /// Set the DEM/DSM to simulate from
    pub fn set_input(&mut self, input: Raster) -> SimResult<()> {
        if input.is_empty() {
            return Err(SimError::Configuration("Input raster is empty".to_string()));
        }
        let ps = input.pixel_spacing;
        if !(ps.row > 0.0 && ps.col > 0.0 && ps.row.is_finite() && ps.col.is_finite()) {
            return Err(SimError::Configuration(format!(
                "Input pixel spacing must be positive, got {:?}",
                ps
            )));
        }

        self.reset_output();
        self.params
            .derive_from_working_raster(input.dim(), ps, self.config.layover_tolerance);
        self.params.no_data = input.no_data;
        self.working = Some(input.clone());
        self.input = Some(input);
        Ok(())
    }

    pub fn reset_output(&mut self) {
        self.output = None;
        self.output_offset = None;
    }

    pub fn input(&self) -> Option<&Raster> {
        self.input.as_ref()
    }

    /// Rotated raster the latest run scanned
    pub fn working(&self) -> Option<&Raster> {
        self.working.as_ref()
    }

    pub fn output(&self) -> Option<&Raster> {
        self.output.as_ref()
    }

    pub fn into_output(self) -> Option<Raster> {
        self.output
    }

    /// Run the simulation and return the output raster
    pub fn simulate(&mut self) -> SimResult<&Raster> {
        let input = self
            .input
            .as_ref()
            .ok_or_else(|| SimError::Simulation("No input image has been selected".to_string()))?;
        let config = &self.config;

        log::info!(
            "Simulating with incidence angle {}°, aspect angle {}°, direction {}",
            config.incidence_angle,
            config.aspect_angle,
            config.direction
        );

        let mut working = input.clone();
        if config.aspect_angle != 0.0 || config.direction != Direction::West {
            pre_rotate(&mut working, config);
        }

        let mut params = self.params.clone();
        params.derive_from_working_raster(
            working.dim(),
            input.pixel_spacing,
            config.layover_tolerance,
        );
        params.no_data = working.no_data;
        let offset = match self.output_offset {
            Some(offset) if self.output.is_some() => offset,
            _ => compute_output_offset(&working.data, &params, config.histogram_bins),
        };
        params.output_offset = offset;

        log::debug!("Creating output working image of size {:?}", params.output_size);
        let rows = simulate_rows(&working.data, &params, config.workers);

        log::debug!("Reassembling results into one single image");
        let mut data = Array2::<f32>::zeros(params.output_size);
        for (iy, row) in rows.into_iter().enumerate() {
            data.row_mut(iy).assign(&row);
        }
        let mut output = Raster::new(data, params.output_pixel_spacing, None);

        post_process(&mut output, input.dim(), config);

        self.params = params;
        self.output_offset = Some(offset);
        self.working = Some(working);
        Ok(self.output.insert(output))
    }
}

/// Rotate the working raster so that the sensor looks along increasing
/// column index. Falls back to the unrotated raster on failure.
fn pre_rotate(working: &mut Raster, config: &SimulationConfig) {
    let angle = config.direction.baseline_rotation() + config.aspect_angle;
    let fill = working.no_data.unwrap_or(f32::NAN);
    log::info!(
        "Rotating input DEM by {} degrees to simulate aspect angle and direction",
        angle
    );
    match transform::rotate(&working.data, angle, true, fill, Interpolation::Bilinear) {
        Ok(rotated) => {
            working.data = rotated;
            if working.no_data.is_none() {
                working.no_data = Some(fill);
            }
        }
        Err(e) => {
            log::warn!(
                "Problem during DEM rotation ({}). Using not rotated DEM, and thus aspect angle = 0 degrees.",
                e
            );
        }
    }
}

/// Trace every row; results keep the row order of the input
pub fn simulate_rows(heights: &RasterGrid, params: &RowSimParams, workers: usize) -> Vec<Array1<f32>> {
    if workers > 1 {
        match simulate_rows_parallel(heights, params, workers) {
            Ok(rows) => return rows,
            Err(e) => log::warn!(
                "Parallel processing not possible ({}). Simulating with 1 worker.",
                e
            ),
        }
    }

    (0..heights.nrows())
        .map(|iy| simulate_row(heights.row(iy), params))
        .collect()
}

#[cfg(feature = "parallel")]
fn simulate_rows_parallel(
    heights: &RasterGrid,
    params: &RowSimParams,
    workers: usize,
) -> SimResult<Vec<Array1<f32>>> {
    use rayon::prelude::*;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| SimError::Simulation(format!("Failed to build worker pool: {}", e)))?;

    log::info!("Simulating with {} workers", workers);
    Ok(pool.install(|| {
        (0..heights.nrows())
            .into_par_iter()
            .map(|iy| simulate_row(heights.row(iy), params))
            .collect()
    }))
}

#[cfg(not(feature = "parallel"))]
fn simulate_rows_parallel(
    _heights: &RasterGrid,
    _params: &RowSimParams,
    _workers: usize,
) -> SimResult<Vec<Array1<f32>>> {
    Err(SimError::Simulation(
        "built without the `parallel` feature".to_string(),
    ))
}

/// Map the working output to the requested geometry. Every step keeps the
/// previous raster when it fails.
fn post_process(output: &mut Raster, input_size: (usize, usize), config: &SimulationConfig) {
    let (az, sr) = config.output_pixel_spacing;
    if az != 0.0 || sr != 0.0 {
        let natural = output.pixel_spacing;
        let factor = |natural: f64, requested: f64| if requested != 0.0 { natural / requested } else { 1.0 };
        let scale_factors = (factor(natural.row, az), factor(natural.col, sr));

        log::info!("Resizing output image by {:?} to match the requested pixel spacing", scale_factors);
        match transform::resize(&output.data, scale_factors) {
            Ok(resized) => {
                output.data = resized;
                output.pixel_spacing = natural.scaled(scale_factors);
            }
            Err(e) => log::error!("Problem during image resizing ({}). Using not resized image.", e),
        }
    }

    if config.direction == Direction::East {
        log::info!("Rotating by 180 degrees to restore North position");
        rotate_output(output, 180.0);
    }

    if config.rotate_back && config.aspect_angle != 0.0 {
        log::info!("Rotating back output image by {} degrees", -config.aspect_angle);
        rotate_output(output, -config.aspect_angle);

        let top_left = transform::centered_top_left(output.dim(), input_size);
        log::debug!("Cropping output image to {:?} at {:?}", input_size, top_left);
        match transform::crop(&output.data, top_left, input_size) {
            Ok(cropped) => output.data = cropped,
            Err(e) => log::error!("Problem during output image cropping ({}). Using not cropped output.", e),
        }
    }
}

fn rotate_output(output: &mut Raster, angle: f64) {
    match transform::rotate(&output.data, angle, true, 0.0, Interpolation::Nearest) {
        Ok(rotated) => output.data = rotated,
        Err(e) => log::error!("Problem during output image rotation ({}). Using not rotated output.", e),
    }
}
