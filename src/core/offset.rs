use crate::core::params::RowSimParams;
use crate::types::{is_no_data, RasterGrid, RasterValue};

/// Default number of histogram bins used to find the reference height
pub const DEFAULT_HISTOGRAM_BINS: usize = 100;

/// Equal-width histogram of valid heights. Edges are kept in the raster's
/// sample precision so bin boundaries match the heights they split.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightHistogram {
    pub counts: Vec<usize>,
    /// `counts.len() + 1` bin edges; the last bin is closed on the right
    pub edges: Vec<RasterValue>,
}

impl HeightHistogram {
    /// Histogram over every finite cell that is not no-data.
    /// Returns `None` when no valid cell exists or `bins` is zero.
    pub fn from_grid(grid: &RasterGrid, no_data: Option<RasterValue>, bins: usize) -> Option<Self> {
        if bins == 0 {
            return None;
        }

        let values: Vec<RasterValue> = grid
            .iter()
            .copied()
            .filter(|&v| v.is_finite() && !is_no_data(v, no_data))
            .collect();
        if values.is_empty() {
            return None;
        }

        let mut first = values.iter().copied().fold(f32::INFINITY, f32::min) as f64;
        let mut last = values.iter().copied().fold(f32::NEG_INFINITY, f32::max) as f64;
        if first == last {
            first -= 0.5;
            last += 0.5;
        }

        let step = (last - first) / bins as f64;
        let mut edges: Vec<RasterValue> = (0..=bins)
            .map(|i| (first + i as f64 * step) as RasterValue)
            .collect();
        edges[bins] = last as RasterValue;

        let norm = bins as f64 / (last - first);
        let mut counts = vec![0usize; bins];
        for v in values {
            let mut idx = (((f64::from(v) - first) * norm) as usize).min(bins - 1);
            // Correct for rounding so edges stay authoritative
            if idx > 0 && v < edges[idx] {
                idx -= 1;
            } else if idx < bins - 1 && v >= edges[idx + 1] {
                idx += 1;
            }
            counts[idx] += 1;
        }

        Some(Self { counts, edges })
    }

    /// Index of the most populated bin; ties go to the lowest index
    pub fn mode_bin(&self) -> usize {
        let mut best = 0;
        for (i, &count) in self.counts.iter().enumerate() {
            if count > self.counts[best] {
                best = i;
            }
        }
        best
    }

    /// Midpoint of the most populated bin
    pub fn mode_height(&self) -> f64 {
        let bin = self.mode_bin();
        f64::from((self.edges[bin] + self.edges[bin + 1]) / 2.0)
    }
}

/// Height around which the bulk of the scene lies. Falls back to 0 when the
/// raster holds no valid cell.
pub fn reference_height(grid: &RasterGrid, no_data: Option<RasterValue>, bins: usize) -> f64 {
    match HeightHistogram::from_grid(grid, no_data, bins) {
        Some(histogram) => histogram.mode_height(),
        None => {
            log::warn!("No valid heights for the offset histogram, using reference height 0");
            0.0
        }
    }
}

/// Output column offset that centers returns from the reference height
pub fn output_offset(reference_height: f64, params: &RowSimParams) -> i64 {
    let d = params.slant_distance(reference_height);
    -((d / params.output_pixel_spacing.col).round_ties_even() as i64)
}

/// Compute the centering offset for a working raster
pub fn compute_output_offset(
    grid: &RasterGrid,
    params: &RowSimParams,
    bins: usize,
) -> i64 {
    log::info!("Calculating working output image offset");

    let h_ref = reference_height(grid, params.no_data, bins);
    let offset = output_offset(h_ref, params);

    log::debug!("Reference height [m]: {}", h_ref);
    log::debug!("Output image offset [pixels]: {}", offset);
    log::debug!("Working output slant range pixel size [m]: {}", params.output_pixel_spacing.col);
    offset
}
