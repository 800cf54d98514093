use crate::types::{VolumeError, VolumeResult};
use ndarray::Array2;

/// Sampling kernel used to read elevations between grid nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpolationKernel {
    Nearest,
    Bilinear,
    Bicubic,
}

/// Keys cubic convolution parameter
const CUBIC_A: f64 = -0.5;

impl InterpolationKernel {
    /// Pick the highest-order kernel a `width x height` window can support.
    ///
    /// Returns `None` for an empty window.
    pub fn select(width: usize, height: usize) -> Option<Self> {
        if width < 1 || height < 1 {
            None
        } else if width < 2 || height < 2 {
            Some(InterpolationKernel::Nearest)
        } else if width < 4 || height < 4 {
            Some(InterpolationKernel::Bilinear)
        } else {
            Some(InterpolationKernel::Bicubic)
        }
    }

    /// Sample `data` (indexed `[row, col]`) at grid position `(x, y)`,
    /// where integer positions are cell corners.
    ///
    /// Positions outside the grid replicate the border. NaN samples
    /// propagate to the result.
    pub fn interpolate(&self, data: &Array2<f64>, x: f64, y: f64) -> VolumeResult<f64> {
        let (rows, cols) = data.dim();
        if rows == 0 || cols == 0 {
            return Err(VolumeError::Interpolation("empty grid".to_string()));
        }
        if !x.is_finite() || !y.is_finite() {
            return Err(VolumeError::Interpolation(format!(
                "non-finite sample position ({}, {})",
                x, y
            )));
        }

        let value = match self {
            InterpolationKernel::Nearest => {
                let col = clamp_index(x.floor(), cols);
                let row = clamp_index(y.floor(), rows);
                data[[row, col]]
            }
            InterpolationKernel::Bilinear => bilinear(data, x - 0.5, y - 0.5),
            InterpolationKernel::Bicubic => bicubic(data, x - 0.5, y - 0.5),
        };
        Ok(value)
    }
}

#[inline]
fn clamp_index(i: f64, len: usize) -> usize {
    if i <= 0.0 {
        0
    } else if i >= (len - 1) as f64 {
        len - 1
    } else {
        i as usize
    }
}

#[inline]
fn at(data: &Array2<f64>, row: f64, col: f64) -> f64 {
    let (rows, cols) = data.dim();
    data[[clamp_index(row, rows), clamp_index(col, cols)]]
}

/// Bilinear on pixel centres, `(u, v)` in centre-based coordinates
fn bilinear(data: &Array2<f64>, u: f64, v: f64) -> f64 {
    let c0 = u.floor();
    let r0 = v.floor();
    let fx = u - c0;
    let fy = v - r0;

    let v00 = at(data, r0, c0);
    let v01 = at(data, r0, c0 + 1.0);
    let v10 = at(data, r0 + 1.0, c0);
    let v11 = at(data, r0 + 1.0, c0 + 1.0);

    let top = v00 * (1.0 - fx) + v01 * fx;
    let bottom = v10 * (1.0 - fx) + v11 * fx;
    top * (1.0 - fy) + bottom * fy
}

#[inline]
fn cubic_weight(t: f64) -> f64 {
    let t = t.abs();
    if t <= 1.0 {
        (CUBIC_A + 2.0) * t * t * t - (CUBIC_A + 3.0) * t * t + 1.0
    } else if t < 2.0 {
        CUBIC_A * t * t * t - 5.0 * CUBIC_A * t * t + 8.0 * CUBIC_A * t - 4.0 * CUBIC_A
    } else {
        0.0
    }
}

/// Keys cubic convolution over the 4x4 neighbourhood
fn bicubic(data: &Array2<f64>, u: f64, v: f64) -> f64 {
    let c0 = u.floor();
    let r0 = v.floor();
    let fx = u - c0;
    let fy = v - r0;

    let weights = |t: f64| {
        [
            cubic_weight(1.0 + t),
            cubic_weight(t),
            cubic_weight(1.0 - t),
            cubic_weight(2.0 - t),
        ]
    };
    let wx = weights(fx);
    let wy = weights(fy);

    let mut sum = 0.0;
    for (j, wyj) in wy.iter().enumerate() {
        let row = r0 - 1.0 + j as f64;
        let mut row_sum = 0.0;
        for (i, wxi) in wx.iter().enumerate() {
            row_sum += wxi * at(data, row, c0 - 1.0 + i as f64);
        }
        sum += wyj * row_sum;
    }
    sum
}
