//! Shadow and layover tracing along one ground-range line.
//!
//! The sensor is always assumed to look from the left (column 0) towards
//! increasing column indices; viewing direction and aspect angle are handled
//! by rotating the raster before and after this stage. Rows share no state,
//! so any number of them can be traced concurrently with the same
//! [`RowSimParams`].

use crate::core::params::RowSimParams;
use ndarray::{Array1, ArrayView1};

/// Shadow state of an input column, written by nearer columns
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Horizon {
    /// No nearer point casts a shadow here
    Unshadowed,
    /// Completely hidden by a nearer point; never projected
    FullyShadowed,
    /// Visible, but everything below `min_visible_height` is hidden
    Partial { min_visible_height: f64 },
}

impl Horizon {
    /// Height below which a partially shadowed column is hidden
    fn cut_height(&self) -> Option<f64> {
        match *self {
            Horizon::Partial { min_visible_height } => Some(min_visible_height),
            Horizon::Unshadowed | Horizon::FullyShadowed => None,
        }
    }
}

/// Per-row scan state together with the accumulated output line
#[derive(Debug, Clone)]
pub struct RowTrace {
    /// Hit counts per output column
    pub output: Array1<f32>,
    /// Final shadow state of every input column
    pub horizon: Vec<Horizon>,
    /// Unclamped output column each lit input column projected to
    pub projected: Vec<Option<i64>>,
}

impl RowTrace {
    fn new(input_width: usize, output_width: usize) -> Self {
        Self {
            output: Array1::zeros(output_width),
            horizon: vec![Horizon::Unshadowed; input_width],
            projected: vec![None; input_width],
        }
    }

    /// Number of input columns left completely in shadow
    pub fn shadowed_count(&self) -> usize {
        self.horizon
            .iter()
            .filter(|h| **h == Horizon::FullyShadowed)
            .count()
    }

    /// Add one hit to every output column in `[start, end]`, clamping an
    /// overflowing end to the second to last column
    fn fill_layover(&mut self, start: i64, mut end: i64) {
        let width = self.output.len() as i64;
        if end >= width {
            end = width - 2;
        }
        for col in start.max(0)..=end {
            self.output[col as usize] += 1.0;
        }
    }
}

/// Simulate one row, returning the hit counts per output column
pub fn simulate_row(row: ArrayView1<f32>, params: &RowSimParams) -> Array1<f32> {
    trace_row(row, params).output
}

/// Simulate one row keeping the shadow and projection state
pub fn trace_row(row: ArrayView1<f32>, params: &RowSimParams) -> RowTrace {
    let width = row.len();
    let out_width = params.output_size.1 as i64;
    let mut trace = RowTrace::new(width, params.output_size.1);

    for ix in 0..width {
        let value = row[ix];
        // Non-finite heights carry no terrain, whatever the no-data sentinel
        if !value.is_finite()
            || params.is_no_data(value)
            || trace.horizon[ix] == Horizon::FullyShadowed
        {
            continue;
        }
        let h = f64::from(value);

        let x = params.project(ix, h);
        trace.projected[ix] = Some(x);

        // Start of a possible layover span
        let x_start = if (0..out_width).contains(&x) {
            trace.output[x as usize] += 1.0;
            Some(x)
        } else if x < 0 {
            Some(0)
        } else {
            None
        };

        cast_shadow(row, ix, h, params, &mut trace.horizon);

        if let Some(x_start) = x_start {
            if ix > 0 {
                apply_layover(row, ix, h, x_start, params, &mut trace);
            }
        }
    }

    trace
}

/// Walk forward from `ix` marking columns hidden behind height `h`. The first
/// column that stays visible records the height it is hidden up to.
fn cast_shadow(
    row: ArrayView1<f32>,
    ix: usize,
    h: f64,
    params: &RowSimParams,
    horizon: &mut [Horizon],
) {
    for ish in ix + 1..row.len() {
        let d_h = h - f64::from(row[ish]);
        let d_h_min = params.shadow_angular_factor * ((ish - ix) as f64 - params.shadow_tolerance);
        if d_h >= d_h_min {
            horizon[ish] = Horizon::FullyShadowed;
        } else {
            horizon[ish] = Horizon::Partial {
                min_visible_height: h - d_h_min,
            };
            break;
        }
    }
}

/// Spread returns of the slope between `ix - 1` and `ix` over the output
/// columns they overlap
fn apply_layover(
    row: ArrayView1<f32>,
    ix: usize,
    h: f64,
    x_start: i64,
    params: &RowSimParams,
    trace: &mut RowTrace,
) {
    let ilo = ix - 1;
    let h_prev = f64::from(row[ilo]);

    match trace.horizon[ix].cut_height() {
        // Cut layover: the lower part of the slope is in shadow
        Some(h_cut) if h_cut > h_prev => {
            if h - h_cut >= params.min_layover_height_delta {
                let x_end = params.project_layover_end(ix, h_cut);
                if x_end >= x_start {
                    trace.fill_layover(x_start, x_end);
                }
            }
        }
        // Full layover: the whole slope folds onto the previous column
        _ => {
            if h - h_prev >= params.min_layover_height_delta {
                if let Some(x_end) = trace.projected[ilo] {
                    if x_end >= x_start {
                        trace.fill_layover(x_start, x_end);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PixelSpacing;
    use ndarray::{arr1, Array1};

    fn params(ia: f64, width: usize) -> RowSimParams {
        let mut p = RowSimParams::new(ia, 0.25).unwrap();
        p.derive_from_working_raster((1, width), PixelSpacing::new(1.0, 1.0), 0.25);
        p.no_data = Some(-9999.0);
        p
    }

    #[test]
    fn test_flat_row_hits_every_column_once() {
        for ia in [10.0, 30.0, 45.0, 60.0, 85.0] {
            let p = params(ia, 12);
            let row = Array1::<f32>::zeros(12);
            let trace = trace_row(row.view(), &p);
            assert_eq!(trace.shadowed_count(), 0, "ia = {}", ia);
            assert!(trace.output.iter().all(|&v| v == 1.0), "ia = {}", ia);
        }
    }

    #[test]
    fn test_no_data_columns_are_skipped() {
        let p = params(30.0, 5);
        let row = arr1(&[0.0f32, 0.0, 0.0, 0.0, -9999.0]);
        let trace = trace_row(row.view(), &p);
        assert_eq!(trace.projected[4], None);
        assert_eq!(trace.output.to_vec(), vec![1.0, 1.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_nan_heights_are_skipped_without_sentinel() {
        let p = params(30.0, 8);
        let row = arr1(&[f32::NAN, f32::NAN, f32::NAN, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let trace = trace_row(row.view(), &p);
        assert!(trace.projected[..3].iter().all(Option::is_none));
        assert_eq!(trace.horizon[3], Horizon::Unshadowed);
        assert_eq!(
            trace.output.to_vec(),
            vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0]
        );
    }

    #[test]
    fn test_projection_past_far_edge_adds_nothing() {
        let mut p = params(30.0, 8);
        p.output_offset = -3;
        let mut row = Array1::<f32>::zeros(8);
        // Steep enough for layover, but it projects beyond the frame
        row[7] = 0.5;
        let trace = trace_row(row.view(), &p);
        assert_eq!(trace.projected[5], Some(8));
        assert_eq!(trace.projected[7], Some(9));
        assert_eq!(
            trace.output.to_vec(),
            vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0]
        );
    }

    #[test]
    fn test_layover_past_far_edge_is_clamped() {
        let mut p = params(30.0, 8);
        p.output_offset = -3;
        let mut row = Array1::<f32>::zeros(8);
        row[7] = 4.0;
        let trace = trace_row(row.view(), &p);

        // The span runs from the wall top to the foot at column 9
        assert_eq!(trace.projected[6], Some(9));
        assert_eq!(trace.projected[7], Some(3));
        assert_eq!(
            trace.output.to_vec(),
            vec![0.0, 0.0, 0.0, 3.0, 2.0, 2.0, 2.0, 1.0]
        );
    }

    #[test]
    fn test_ascending_slope_is_never_shadowed() {
        let p = params(30.0, 20);
        let row: Array1<f32> = (0..20).map(|i| i as f32 * 0.2).collect();
        let trace = trace_row(row.view(), &p);
        assert_eq!(trace.shadowed_count(), 0);
    }

    #[test]
    fn test_wall_casts_shadow_of_expected_length() {
        // 30 degrees: angular factor = 1/tan(30) = 1.732 m per pixel
        let p = params(30.0, 30);
        let mut row = Array1::<f32>::zeros(30);
        row[5] = 10.0;
        let trace = trace_row(row.view(), &p);

        // dH = 10 >= 1.732 * (k - 0.25) holds for k = 1..=6
        let expected: Vec<usize> = (6..12).collect();
        let shadowed: Vec<usize> = trace
            .horizon
            .iter()
            .enumerate()
            .filter(|(_, h)| **h == Horizon::FullyShadowed)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(shadowed, expected);
        for col in expected {
            assert_eq!(trace.projected[col], None);
        }
        match trace.horizon[12] {
            Horizon::Partial { min_visible_height } => {
                let d_h_min = p.shadow_angular_factor * (7.0 - 0.25);
                assert!((min_visible_height - (10.0 - d_h_min)).abs() < 1e-9);
            }
            other => panic!("unexpected horizon {:?}", other),
        }
    }

    #[test]
    fn test_wall_produces_full_layover_span() {
        let p = params(30.0, 30);
        let mut row = Array1::<f32>::zeros(30);
        row[5] = 10.0;
        let trace = trace_row(row.view(), &p);

        // The top of the wall projects 17 columns towards the sensor, below
        // the frame, so the span starts at column 0 and runs to column 4
        assert_eq!(trace.projected[5], Some(5 - 17));
        assert_eq!(trace.projected[4], Some(4));
        let expected = [2.0f32, 2.0, 2.0, 2.0, 2.0, 0.0, 0.0];
        assert_eq!(trace.output.slice(ndarray::s![0..7]).to_vec(), expected.to_vec());
        // Behind the shadow every column is lit once again
        assert!(trace.output.slice(ndarray::s![12..]).iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_layover_span_width_from_projection() {
        let mut p = params(30.0, 60);
        p.output_offset = 0;
        let mut row = Array1::<f32>::zeros(60);
        row[40] = 5.0;
        let trace = trace_row(row.view(), &p);

        // 5 m at 30 degrees: 4.33 m slant over 0.5 m columns = 8.66 -> 9
        let top = trace.projected[40].unwrap();
        assert_eq!(top, 31);
        // Column 31 also receives the flat return of input column 31
        assert_eq!(trace.output[31], 3.0);
        for col in 32..=39 {
            assert_eq!(trace.output[col], 2.0, "column {}", col);
        }
        assert_eq!(trace.output[30], 1.0);
        assert_eq!(trace.output[40], 0.0);
    }

    #[test]
    fn test_cut_layover_behind_shadow() {
        // A 6 m block hides the foot of a 20 m wall three columns behind it
        let p = params(30.0, 80);
        let mut row = Array1::<f32>::zeros(80);
        row[50] = 6.0;
        row[53] = 20.0;
        let trace = trace_row(row.view(), &p);

        assert_eq!(trace.horizon[51], Horizon::FullyShadowed);
        assert_eq!(trace.horizon[52], Horizon::FullyShadowed);
        assert_eq!(trace.projected[52], None);
        let h_cut = match trace.horizon[53] {
            Horizon::Partial { min_visible_height } => min_visible_height,
            other => panic!("unexpected horizon {:?}", other),
        };
        assert!(h_cut > 1.2 && h_cut < 1.3);

        let x_start = trace.projected[53].unwrap();
        let x_end = p.project_layover_end(53, h_cut);
        assert_eq!((x_start, x_end), (18, 51));
        for col in x_start..=x_end {
            assert!(trace.output[col as usize] >= 1.0, "column {}", col);
        }
        // Only the cut span reaches these columns
        assert_eq!(trace.output[50], 1.0);
        assert_eq!(trace.output[51], 1.0);
        assert_eq!(trace.output[52], 0.0);
    }

    #[test]
    fn test_overflowing_span_clamps_to_second_last_column() {
        let mut trace = RowTrace::new(5, 5);
        trace.fill_layover(2, 10);
        assert_eq!(trace.output.to_vec(), vec![0.0, 0.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_rows_are_independent() {
        let p = params(45.0, 16);
        let row: Array1<f32> = (0..16).map(|i| ((i * 7) % 5) as f32 * 3.0).collect();
        let first = simulate_row(row.view(), &p);
        let second = simulate_row(row.view(), &p);
        assert_eq!(first, second);
    }
}
