//! Command line pseudo-SAR simulator.
//!
//! Reads a DTM/DSM GeoTIFF, simulates shadow and layover for the requested
//! viewing geometry and writes the hit-count image as a GeoTIFF.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use sarsim::{Direction, RasterFile, SimulationConfig, Simulator};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ViewDirection {
    /// Sensor looks from west to east
    #[value(alias = "w")]
    West,
    /// Sensor looks from east to west
    #[value(alias = "e")]
    East,
}

impl From<ViewDirection> for Direction {
    fn from(d: ViewDirection) -> Self {
        match d {
            ViewDirection::West => Direction::West,
            ViewDirection::East => Direction::East,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "sarsim", version)]
#[command(about = "Generates a pseudo-SAR image starting from a DTM/DSM")]
struct Args {
    /// Input DTM/DSM (32 bit floating-point GeoTIFF)
    #[arg(short, long)]
    input: PathBuf,

    /// Output image (same format as input)
    #[arg(short, long)]
    output: PathBuf,

    /// SAR incidence angle in degrees
    #[arg(short = 'a', long, default_value_t = 30.0)]
    incidence_angle: f64,

    /// Angle w.r.t. the north-south axis in degrees, clockwise positive
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    aspect_angle: f64,

    /// Output azimuth pixel spacing in meters (0 = same as input)
    #[arg(long, default_value_t = 0.0)]
    azimuth_pixel_spacing: f64,

    /// Output slant range pixel spacing in meters (0 = flat-terrain ground range)
    #[arg(long, default_value_t = 0.0)]
    slant_range_pixel_spacing: f64,

    /// Viewing direction, assuming a north-to-south flight at aspect angle 0
    #[arg(short, long, value_enum, default_value_t = ViewDirection::West)]
    direction: ViewDirection,

    /// No-data value used in the DTM/DSM
    #[arg(short, long, default_value_t = -9999.0, allow_negative_numbers = true)]
    no_data_value: f32,

    /// Rotate the output back by -aspect angle and crop it to the input size
    #[arg(short, long)]
    rotate_back: bool,

    /// Number of worker threads
    #[arg(short = 's', long, visible_alias = "subprocesses", default_value_t = 1)]
    workers: usize,

    /// Shadow tolerance in pixels
    #[arg(long, default_value_t = 0.25)]
    shadow_tolerance: f64,

    /// Fraction of the flat-terrain height step ignored for layover
    #[arg(long, default_value_t = 0.25)]
    layover_tolerance: f64,

    /// Bins of the height histogram used to center the output
    #[arg(long, default_value_t = 100)]
    histogram_bins: usize,

    /// Verbose output
    #[arg(long)]
    debug: bool,
}

impl Args {
    fn config(&self) -> SimulationConfig {
        SimulationConfig {
            incidence_angle: self.incidence_angle,
            aspect_angle: self.aspect_angle,
            direction: self.direction.into(),
            output_pixel_spacing: (self.azimuth_pixel_spacing, self.slant_range_pixel_spacing),
            shadow_tolerance: self.shadow_tolerance,
            layover_tolerance: self.layover_tolerance,
            histogram_bins: self.histogram_bins,
            workers: self.workers,
            rotate_back: self.rotate_back,
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let config = args.config();
    let mut simulator = Simulator::new(config).context("Invalid simulation parameters")?;

    let input = RasterFile::read(&args.input, args.no_data_value)
        .with_context(|| format!("Input image reading problem: {}", args.input.display()))?;
    log::debug!(
        "Input image size [pixels] and pixel spacing [m]: {:?}, {:?}",
        input.dim(),
        input.pixel_spacing
    );

    simulator.set_input(input)?;
    let output = simulator.simulate().context("Problem during simulation")?;
    log::debug!("Simulation successful");

    RasterFile::write(&args.output, output)
        .with_context(|| format!("Problem during output writing: {}", args.output.display()))?;
    log::debug!("Output written");
    Ok(())
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let level = if args.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
