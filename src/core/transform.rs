use crate::types::{is_no_data, RasterGrid, RasterValue, SimError, SimResult};
use ndarray::{s, Array2};

/// Resampling kernel used by [`rotate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    /// Nearest neighbour (keeps hit counts integral)
    Nearest,
    /// Bilinear; falls back to nearest next to fill-valued cells
    Bilinear,
}

/// Exact sine/cosine for multiples of 90 degrees
fn sin_cos_degrees(angle_deg: f64) -> (f64, f64) {
    let a = angle_deg.rem_euclid(360.0);
    if a == 0.0 {
        (0.0, 1.0)
    } else if a == 90.0 {
        (1.0, 0.0)
    } else if a == 180.0 {
        (0.0, -1.0)
    } else if a == 270.0 {
        (-1.0, 0.0)
    } else {
        a.to_radians().sin_cos()
    }
}

/// Rotate a grid counter-clockwise (as displayed) by `angle_deg` around its
/// center. With `expand` the canvas grows to hold the whole rotated grid;
/// uncovered cells get `fill`.
pub fn rotate(
    grid: &RasterGrid,
    angle_deg: f64,
    expand: bool,
    fill: RasterValue,
    interpolation: Interpolation,
) -> SimResult<RasterGrid> {
    if !angle_deg.is_finite() {
        return Err(SimError::Transform(format!("Invalid rotation angle: {}", angle_deg)));
    }
    let (rows, cols) = grid.dim();
    if rows == 0 || cols == 0 {
        return Err(SimError::Transform("Cannot rotate an empty grid".to_string()));
    }

    let (sin, cos) = sin_cos_degrees(angle_deg);
    let (out_rows, out_cols) = if expand {
        let h = rows as f64;
        let w = cols as f64;
        (
            (h * cos.abs() + w * sin.abs() + 0.5) as usize,
            (h * sin.abs() + w * cos.abs() + 0.5) as usize,
        )
    } else {
        (rows, cols)
    };
    if out_rows == 0 || out_cols == 0 {
        return Err(SimError::Transform(format!(
            "Rotation by {} degrees yields an empty grid",
            angle_deg
        )));
    }

    let in_center = ((rows as f64 - 1.0) / 2.0, (cols as f64 - 1.0) / 2.0);
    let out_center = ((out_rows as f64 - 1.0) / 2.0, (out_cols as f64 - 1.0) / 2.0);

    let rotated = Array2::from_shape_fn((out_rows, out_cols), |(r, c)| {
        let dy = r as f64 - out_center.0;
        let dx = c as f64 - out_center.1;
        let src_row = in_center.0 + dx * sin + dy * cos;
        let src_col = in_center.1 + dx * cos - dy * sin;
        match interpolation {
            Interpolation::Nearest => sample_nearest(grid, src_row, src_col).unwrap_or(fill),
            Interpolation::Bilinear => sample_bilinear(grid, src_row, src_col, fill),
        }
    });

    Ok(rotated)
}

fn sample_nearest(grid: &RasterGrid, row: f64, col: f64) -> Option<RasterValue> {
    let (rows, cols) = grid.dim();
    let r = row.round();
    let c = col.round();
    if r < 0.0 || c < 0.0 || r >= rows as f64 || c >= cols as f64 {
        return None;
    }
    Some(grid[[r as usize, c as usize]])
}

fn sample_bilinear(grid: &RasterGrid, row: f64, col: f64, fill: RasterValue) -> RasterValue {
    let (rows, cols) = grid.dim();
    let nearest = match sample_nearest(grid, row, col) {
        Some(v) => v,
        None => return fill,
    };

    let row = row.clamp(0.0, (rows - 1) as f64);
    let col = col.clamp(0.0, (cols - 1) as f64);
    let y1 = row.floor() as usize;
    let x1 = col.floor() as usize;
    let y2 = (y1 + 1).min(rows - 1);
    let x2 = (x1 + 1).min(cols - 1);

    let v11 = grid[[y1, x1]];
    let v12 = grid[[y2, x1]];
    let v21 = grid[[y1, x2]];
    let v22 = grid[[y2, x2]];
    if [v11, v12, v21, v22].iter().any(|&v| is_no_data(v, Some(fill))) {
        return nearest;
    }

    let dx = col - x1 as f64;
    let dy = row - y1 as f64;
    let interpolated = v11 as f64 * (1.0 - dx) * (1.0 - dy)
        + v21 as f64 * dx * (1.0 - dy)
        + v12 as f64 * (1.0 - dx) * dy
        + v22 as f64 * dx * dy;

    interpolated as f32
}

/// Output size of a zoom by `scale_factors` (rows, cols)
pub fn zoomed_size(size: (usize, usize), scale_factors: (f64, f64)) -> (usize, usize) {
    (
        (size.0 as f64 * scale_factors.0).round() as usize,
        (size.1 as f64 * scale_factors.1).round() as usize,
    )
}

/// Nearest-neighbour zoom. Corner samples of input and output coincide.
pub fn resize(grid: &RasterGrid, scale_factors: (f64, f64)) -> SimResult<RasterGrid> {
    let (sr, sc) = scale_factors;
    if !(sr.is_finite() && sc.is_finite() && sr > 0.0 && sc > 0.0) {
        return Err(SimError::Transform(format!(
            "Invalid scale factors: ({}, {})",
            sr, sc
        )));
    }
    let (rows, cols) = grid.dim();
    if rows == 0 || cols == 0 {
        return Err(SimError::Transform("Cannot resize an empty grid".to_string()));
    }
    let (out_rows, out_cols) = zoomed_size((rows, cols), scale_factors);
    if out_rows == 0 || out_cols == 0 {
        return Err(SimError::Transform(format!(
            "Resizing {}x{} by ({}, {}) yields an empty grid",
            rows, cols, sr, sc
        )));
    }

    let ratio = |n_in: usize, n_out: usize| {
        if n_out > 1 {
            (n_in - 1) as f64 / (n_out - 1) as f64
        } else {
            0.0
        }
    };
    let row_ratio = ratio(rows, out_rows);
    let col_ratio = ratio(cols, out_cols);

    Ok(Array2::from_shape_fn((out_rows, out_cols), |(r, c)| {
        let src_r = ((r as f64 * row_ratio).round() as usize).min(rows - 1);
        let src_c = ((c as f64 * col_ratio).round() as usize).min(cols - 1);
        grid[[src_r, src_c]]
    }))
}

/// Extract `size` cells starting at `top_left` (row, col)
pub fn crop(grid: &RasterGrid, top_left: (i64, i64), size: (usize, usize)) -> SimResult<RasterGrid> {
    let (rows, cols) = grid.dim();
    let (top, left) = top_left;
    let fits = |start: i64, len: usize, total: usize| {
        start >= 0 && (start as usize).checked_add(len).map_or(false, |end| end <= total)
    };
    if !fits(top, size.0, rows) || !fits(left, size.1, cols) {
        return Err(SimError::Transform(format!(
            "Crop of {:?} at {:?} exceeds grid of {}x{}",
            size, top_left, rows, cols
        )));
    }
    let (top, left) = (top as usize, left as usize);
    Ok(grid
        .slice(s![top..top + size.0, left..left + size.1])
        .to_owned())
}

/// Top-left corner that centers a `size` window inside `outer`
pub fn centered_top_left(outer: (usize, usize), size: (usize, usize)) -> (i64, i64) {
    (
        (outer.0 / 2) as i64 - (size.0 / 2) as i64,
        (outer.1 / 2) as i64 - (size.1 / 2) as i64,
    )
}
