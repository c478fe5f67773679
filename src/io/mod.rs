//! Raster input/output

pub mod raster;

pub use raster::RasterFile;
