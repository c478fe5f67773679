//! Core pseudo-SAR simulation modules

pub mod params;
pub mod offset;
pub mod row_sim;
pub mod transform;
pub mod simulator;

// Re-export main types
pub use params::{IncidenceAngle, RowSimParams};
pub use offset::{compute_output_offset, HeightHistogram, DEFAULT_HISTOGRAM_BINS};
pub use row_sim::{simulate_row, trace_row, Horizon, RowTrace};
pub use transform::{crop, resize, rotate, Interpolation};
pub use simulator::{simulate_rows, SimulationConfig, Simulator};
