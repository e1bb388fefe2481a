//! The batch of ray states carried through a column.

use crate::constant::{HOMOGENEOUS, SLOPE_X, SLOPE_Y, X, Y};
use nalgebra::Matrix5xX;
use serde::{Deserialize, Serialize};

/// Ray states at every z plane of a column.
///
/// Conceptually a `(steps, 5, num_rays)` array: one `5 × num_rays` slice per
/// z position, from the source plane (step 0) to the detector plane (last step).
/// Each column of a slice is a ray state vector `[x, slope_x, y, slope_y, 1]`.
///
/// The homogeneous row is 1 for every step and ray. Only matrices with a last
/// row of `[0, 0, 0, 0, 1]` are ever applied to a slice, which preserves it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RayBatch {
    steps: Vec<Matrix5xX<f64>>,
}

impl RayBatch {
    /// Creates a batch with every ray on axis and parallel to it, at every step.
    pub fn new(num_steps: usize, num_rays: usize) -> Self {
        let mut slice = Matrix5xX::zeros(num_rays);
        slice.row_mut(HOMOGENEOUS).fill(1.0);
        RayBatch {
            steps: vec![slice; num_steps],
        }
    }

    pub fn num_steps(&self) -> usize {
        self.steps.len()
    }

    pub fn num_rays(&self) -> usize {
        self.steps.first().map_or(0, |s| s.ncols())
    }

    /// The `5 × num_rays` slice of ray states at z position `step`.
    pub fn step(&self, step: usize) -> &Matrix5xX<f64> {
        &self.steps[step]
    }

    pub fn step_mut(&mut self, step: usize) -> &mut Matrix5xX<f64> {
        &mut self.steps[step]
    }

    /// Element `(step, row, ray)` of the conceptual 3-axis array.
    pub fn get(&self, step: usize, row: usize, ray: usize) -> f64 {
        self.steps[step][(row, ray)]
    }

    pub fn x(&self, step: usize, ray: usize) -> f64 {
        self.get(step, X, ray)
    }

    pub fn y(&self, step: usize, ray: usize) -> f64 {
        self.get(step, Y, ray)
    }

    pub fn slope_x(&self, step: usize, ray: usize) -> f64 {
        self.get(step, SLOPE_X, ray)
    }

    pub fn slope_y(&self, step: usize, ray: usize) -> f64 {
        self.get(step, SLOPE_Y, ray)
    }

    /// The `(x, y)` coordinates of every ray at `step`, in ray order.
    pub fn positions(&self, step: usize) -> (Vec<f64>, Vec<f64>) {
        let slice = &self.steps[step];
        (
            slice.row(X).iter().copied().collect(),
            slice.row(Y).iter().copied().collect(),
        )
    }

    /// Adds a constant tilt to the slopes of every ray, at every step.
    pub fn add_tilt(&mut self, tilt_x: f64, tilt_y: f64) {
        for slice in self.steps.iter_mut() {
            slice.row_mut(SLOPE_X).add_scalar_mut(tilt_x);
            slice.row_mut(SLOPE_Y).add_scalar_mut(tilt_y);
        }
    }

    /// True when the homogeneous coordinate is exactly 1 everywhere.
    pub fn is_homogeneous(&self) -> bool {
        self.steps
            .iter()
            .all(|slice| slice.row(HOMOGENEOUS).iter().all(|&w| w == 1.0))
    }
}
