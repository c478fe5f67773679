//! sarsim: pseudo-SAR simulation from a DTM/DSM
//!
//! Models the two geometric effects of side-looking radar: shadow (terrain
//! hidden behind nearer, taller terrain) and layover (slopes whose top is
//! closer in slant range than their base). The output is a hit-count image
//! in slant-range geometry.

pub mod types;
pub mod io;
pub mod core;

// Re-export main types and functions for easier access
pub use types::{
    Direction, ErrorKind, PixelSpacing, Raster, RasterGrid, SimError, SimResult
};

pub use crate::io::RasterFile;
pub use crate::core::{SimulationConfig, Simulator};
