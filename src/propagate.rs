//! Stepwise propagation of a ray batch through a column.
//!
//! Step 0 of the batch holds the beam at the source. Each later step holds the
//! rays at the next z position, after the component acting there. Blocking is
//! reported, not enforced: every ray is carried through to the detector.

use crate::column::Column;
use crate::error::ColumnError;
use crate::matrix;
use crate::ray::RayBatch;
use log::debug;

/// Result of one propagation pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Propagation {
    /// Indices of the rays blocked by each component, in column order.
    /// Each set is ascending; a double deflector never blocks.
    pub blocked: Vec<Vec<usize>>,
}

impl Propagation {
    /// Rays blocked by the component at `index`.
    pub fn blocked_by(&self, index: usize) -> &[usize] {
        self.blocked.get(index).map(|b| b.as_slice()).unwrap_or(&[])
    }

    /// Rays, out of `num_rays`, that no component blocks.
    pub fn allowed(&self, num_rays: usize) -> Vec<usize> {
        let mut allowed = vec![true; num_rays];
        for &ray in self.blocked.iter().flatten() {
            if ray < num_rays {
                allowed[ray] = false;
            }
        }
        (0..num_rays).filter(|&i| allowed[i]).collect()
    }

    pub fn total_blocked(&self) -> usize {
        self.blocked.iter().map(|b| b.len()).sum()
    }
}

/// Propagates the beam in step 0 of `rays` through `column` to the detector,
/// overwriting every later step.
///
/// Fails without touching `rays` if the batch does not match the column.
pub fn propagate(column: &Column, rays: &mut RayBatch) -> Result<Propagation, ColumnError> {
    if rays.num_steps() != column.num_steps() {
        return Err(ColumnError::StepCountMismatch {
            expected: column.num_steps(),
            found: rays.num_steps(),
        });
    }
    for component in column.components() {
        for element in 0..component.num_elements() {
            component.matrix(element)?;
        }
    }

    let distances = column.z_distances();
    let mut step = 0;
    drift(rays, step, distances[step]);
    step += 1;

    let mut blocked = Vec::with_capacity(column.len());
    for component in column.components() {
        let mut component_blocked = Vec::new();
        for element in 0..component.num_elements() {
            component_blocked.extend(component.interact(element, rays.step_mut(step))?);
            drift(rays, step, distances[step]);
            step += 1;
        }
        blocked.push(component_blocked);
    }

    let propagation = Propagation { blocked };
    debug!(
        "Propagated {} rays over {} steps, {} blocked.",
        rays.num_rays(),
        rays.num_steps(),
        propagation.total_blocked()
    );
    Ok(propagation)
}

/// Writes the rays of `step` drifted by `distance` into the next step.
fn drift(rays: &mut RayBatch, step: usize, distance: f64) {
    let next = matrix::drift(distance) * rays.step(step);
    *rays.step_mut(step + 1) = next;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::beam::{generate, BeamParameters, BeamType};
    use crate::component::{Aperture, Biprism, Component, Deflector, Lens};
    use crate::constant::{PI, SLOPE_X, X};
    use assert_approx_eq::assert_approx_eq;

    fn parallel(num_rays: usize, width: f64, num_steps: usize) -> RayBatch {
        let params = BeamParameters {
            beam_type: BeamType::Parallel,
            num_rays,
            width,
            ..Default::default()
        };
        generate(&params, num_steps).unwrap().0
    }

    #[test]
    fn test_lens_sets_slope_after_component() {
        let column = Column::new(vec![Component::Lens(Lens::new("Lens", 0.5, -0.1).unwrap())], 1.0)
            .unwrap();
        let mut rays = parallel(5, 0.2, column.num_steps());
        propagate(&column, &mut rays).unwrap();
        for ray in 0..5 {
            let x0 = rays.x(0, ray);
            assert_approx_eq!(rays.x(1, ray), x0);
            assert_approx_eq!(rays.slope_x(1, ray), -x0 / -0.1);
        }
    }

    #[test]
    fn test_deflector_kick_carries_to_detector() {
        let column = Column::new(
            vec![Component::Deflector(Deflector::new("Deflector", 0.5, 0.1, 0.0).unwrap())],
            1.0,
        )
        .unwrap();
        let mut rays = parallel(1, 0.0, column.num_steps());
        propagate(&column, &mut rays).unwrap();
        assert_approx_eq!(rays.slope_x(2, 0), 0.1);
        assert_approx_eq!(rays.x(2, 0), 0.1 * -0.5);
        assert!(rays.is_homogeneous());
    }

    #[test]
    fn test_blocked_rays_are_still_propagated() {
        let column = Column::new(
            vec![
                Component::Aperture(Aperture::new("Aperture", 0.5, 0.05, 0.25).unwrap()),
                Component::Lens(Lens::new("Lens", 0.4, -0.2).unwrap()),
            ],
            1.0,
        )
        .unwrap();
        let mut rays = parallel(32, 0.2, column.num_steps());
        let propagation = propagate(&column, &mut rays).unwrap();
        assert_eq!(propagation.blocked.len(), 2);
        assert!(propagation.blocked_by(1).is_empty());
        assert_eq!(propagation.allowed(32), vec![0]);
        for ray in propagation.blocked_by(0) {
            assert_approx_eq!(rays.x(3, *ray), -rays.x(0, *ray));
        }
    }

    #[test]
    fn test_biprism_blocks_and_kicks() {
        let biprism = Biprism::new("Biprism", 0.5, 0.01, PI / 2.0, 0.01, 1.0).unwrap();
        let column = Column::new(vec![Component::Biprism(biprism)], 1.0).unwrap();
        let mut rays = RayBatch::new(column.num_steps(), 3);
        for (i, x) in [-0.1, 0.0, 0.1].iter().enumerate() {
            rays.step_mut(0)[(X, i)] = *x;
        }
        let propagation = propagate(&column, &mut rays).unwrap();
        assert_eq!(propagation.blocked_by(0), &[1]);
        assert_approx_eq!(rays.get(1, SLOPE_X, 0), -0.01);
        assert_eq!(rays.get(1, SLOPE_X, 1), 0.0);
        assert_approx_eq!(rays.get(1, SLOPE_X, 2), 0.01);
    }

    #[test]
    fn test_mismatched_batch_rejected() {
        let column = Column::new(Vec::new(), 1.0).unwrap();
        let mut rays = RayBatch::new(5, 4);
        let before = rays.clone();
        let result = propagate(&column, &mut rays);
        assert_eq!(
            result.unwrap_err(),
            ColumnError::StepCountMismatch {
                expected: 2,
                found: 5
            }
        );
        assert_eq!(rays, before);
    }
}
