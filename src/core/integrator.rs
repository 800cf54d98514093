use super::area::AreaCalculator;
use super::containment::ContainmentFilter;
use super::interpolation::InterpolationKernel;
use super::pipeline::CoordinatePipeline;
use crate::io::ElevationGrid;
use crate::types::{ElevationTransform, LengthUnit, VolumeError, VolumeResult};
use serde::{Deserialize, Serialize};

/// Samples per cell along each grid axis
pub const SUB_STEPS_PER_CELL: usize = 4;

/// Sampling interval in grid units
pub const SUB_STEP: f64 = 1.0 / SUB_STEPS_PER_CELL as f64;

/// Vertical slab between the ground reference and the ceiling, in metres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VerticalWindow {
    pub ground_altitude: f64,
    pub z_ceiling: f64,
}

impl VerticalWindow {
    pub fn new(ground_altitude: f64, z_ceiling: f64) -> Self {
        Self {
            ground_altitude,
            z_ceiling,
        }
    }

    /// Sign of `z_ceiling - ground_altitude`: 1, -1 or 0
    pub fn direction(&self) -> f64 {
        if self.z_ceiling > self.ground_altitude {
            1.0
        } else if self.z_ceiling < self.ground_altitude {
            -1.0
        } else {
            0.0
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.z_ceiling == self.ground_altitude
    }

    pub fn thickness(&self) -> f64 {
        (self.z_ceiling - self.ground_altitude).abs()
    }

    /// Height of the column above (or below) a sample at `elevation`, capped
    /// at the slab thickness. `None` if the terrain is on the wrong side of
    /// the ground reference.
    #[inline]
    pub fn contribution(&self, elevation: f64) -> Option<f64> {
        let direction = self.direction();
        if (direction > 0.0 && elevation > self.ground_altitude)
            || (direction < 0.0 && elevation < self.ground_altitude)
        {
            Some((elevation - self.ground_altitude).abs().min(self.thickness()))
        } else {
            None
        }
    }
}

/// Sub-cell sampling of one elevation window
pub struct VolumeIntegrator<'a> {
    grid: &'a ElevationGrid,
    kernel: InterpolationKernel,
    elevation: ElevationTransform,
    unit: LengthUnit,
    pipeline: &'a CoordinatePipeline,
    containment: ContainmentFilter<'a>,
    area: AreaCalculator,
    window: VerticalWindow,
}

impl<'a> VolumeIntegrator<'a> {
    pub fn new(
        grid: &'a ElevationGrid,
        elevation: ElevationTransform,
        unit: LengthUnit,
        pipeline: &'a CoordinatePipeline,
        containment: ContainmentFilter<'a>,
        area: AreaCalculator,
        window: VerticalWindow,
    ) -> VolumeResult<Self> {
        let (width, height) = grid.size();
        let kernel = InterpolationKernel::select(width, height).ok_or_else(|| {
            VolumeError::InvalidParameter(format!(
                "cannot integrate an empty {}x{} window",
                width, height
            ))
        })?;
        log::debug!("Interpolation kernel for {}x{} window: {:?}", width, height, kernel);

        Ok(Self {
            grid,
            kernel,
            elevation,
            unit,
            pipeline,
            containment,
            area,
            window,
        })
    }

    pub fn kernel(&self) -> InterpolationKernel {
        self.kernel
    }

    /// Integrate the volume over the whole window.
    ///
    /// Rows are summed independently and then added in row order, so the
    /// parallel and sequential paths return identical results.
    pub fn integrate(&self, parallel: bool) -> VolumeResult<f64> {
        if self.window.is_degenerate() {
            return Ok(0.0);
        }
        let (width, height) = self.grid.size();
        let cols = width * SUB_STEPS_PER_CELL;
        let rows = height * SUB_STEPS_PER_CELL;

        let row_sums = self.row_sums(rows, cols, parallel)?;
        Ok(row_sums.iter().fold(0.0, |acc, row| acc + row))
    }

    #[cfg(feature = "parallel")]
    fn row_sums(&self, rows: usize, cols: usize, parallel: bool) -> VolumeResult<Vec<f64>> {
        use rayon::prelude::*;

        if parallel {
            log::debug!("Integrating {} sample rows in parallel", rows);
            (0..rows)
                .into_par_iter()
                .map(|j| self.integrate_row(j, cols))
                .collect()
        } else {
            self.row_sums_sequential(rows, cols)
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn row_sums(&self, rows: usize, cols: usize, _parallel: bool) -> VolumeResult<Vec<f64>> {
        self.row_sums_sequential(rows, cols)
    }

    fn row_sums_sequential(&self, rows: usize, cols: usize) -> VolumeResult<Vec<f64>> {
        (0..rows).map(|j| self.integrate_row(j, cols)).collect()
    }

    /// Raw value at grid position `(x, y)`.
    ///
    /// When a no-data cell falls inside the kernel support the value of the
    /// containing cell is used instead, so a void only removes its own
    /// footprint.
    #[inline]
    fn sample(&self, x: f64, y: f64) -> VolumeResult<f64> {
        let value = self.kernel.interpolate(&self.grid.data, x, y)?;
        if value.is_finite() || self.kernel == InterpolationKernel::Nearest {
            Ok(value)
        } else {
            InterpolationKernel::Nearest.interpolate(&self.grid.data, x, y)
        }
    }

    /// Sum of one row of samples, accumulated left to right
    fn integrate_row(&self, j: usize, cols: usize) -> VolumeResult<f64> {
        let y = (j as f64 + 0.5) * SUB_STEP;
        let mut sum = 0.0;

        for i in 0..cols {
            let x = (i as f64 + 0.5) * SUB_STEP;
            let point = self.pipeline.project(x, y)?;
            if !self.containment.contains(point) {
                continue;
            }

            let raw = self.sample(x, y)?;
            let elevation = self.unit.to_metres(self.elevation.apply(raw));
            // containing cell is no-data
            if !elevation.is_finite() {
                continue;
            }

            if let Some(delta) = self.window.contribution(elevation) {
                sum += delta * self.area.compute_step_area(x, y)?;
            }
        }

        Ok(sum)
    }
}
