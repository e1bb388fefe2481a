//! Assembly of components into a column.

use crate::component::{Component, ComponentUpdate, Sample};
use crate::constant::DETECTOR_Z;
use crate::error::{ensure_finite, ColumnError};

/// An ordered stack of components between the source and the detector.
///
/// The z geometry is fixed at assembly: `z_positions` runs from the source at
/// `beam_z`, through every component element, to the detector at `z = 0`.
/// Only the parameters of components that do not move them along the axis may
/// be updated afterwards.
#[derive(Clone, Debug)]
pub struct Column {
    components: Vec<Component>,
    z_positions: Vec<f64>,
    z_distances: Vec<f64>,
    /// Ray batch step of each element of each component.
    element_steps: Vec<Vec<usize>>,
}

impl Column {
    /// Validates every component and the ordering of their z positions.
    pub fn new(components: Vec<Component>, beam_z: f64) -> Result<Self, ColumnError> {
        ensure_finite("beam", "beam_z", beam_z)?;
        for component in components.iter() {
            component.validate()?;
        }

        let mut z_positions = vec![beam_z];
        let mut element_steps = Vec::with_capacity(components.len());
        let mut previous = beam_z;
        for component in components.iter() {
            let mut steps = Vec::with_capacity(component.num_elements());
            for z in component.z_positions() {
                check_below(component.name(), z, previous)?;
                steps.push(z_positions.len());
                z_positions.push(z);
                previous = z;
            }
            element_steps.push(steps);
        }
        check_below("detector", DETECTOR_Z, previous)?;
        z_positions.push(DETECTOR_Z);

        let z_distances = z_positions.windows(2).map(|w| w[1] - w[0]).collect();

        Ok(Column {
            components,
            z_positions,
            z_distances,
            element_steps,
        })
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn component(&self, index: usize) -> Result<&Component, ColumnError> {
        self.components.get(index).ok_or(ColumnError::ComponentIndex {
            index,
            len: self.components.len(),
        })
    }

    /// Applies `update` to the component at `index`.
    ///
    /// A rejected update leaves the column unchanged.
    pub fn update(&mut self, index: usize, update: &ComponentUpdate) -> Result<(), ColumnError> {
        let len = self.components.len();
        self.components
            .get_mut(index)
            .ok_or(ColumnError::ComponentIndex { index, len })?
            .apply(update)
    }

    /// z of the source, every component element and the detector, in beam order.
    pub fn z_positions(&self) -> &[f64] {
        &self.z_positions
    }

    /// Signed drift lengths between consecutive z positions. All are negative.
    pub fn z_distances(&self) -> &[f64] {
        &self.z_distances
    }

    /// Number of ray batch steps needed to propagate through the column.
    pub fn num_steps(&self) -> usize {
        self.z_positions.len()
    }

    /// Ray batch steps at which the elements of component `index` act.
    pub fn element_steps(&self, index: usize) -> Result<&[usize], ColumnError> {
        self.element_steps
            .get(index)
            .map(|steps| steps.as_slice())
            .ok_or(ColumnError::ComponentIndex {
                index,
                len: self.components.len(),
            })
    }

    /// The first sample in the column and its ray batch step.
    pub fn sample(&self) -> Option<(usize, &Sample)> {
        self.components
            .iter()
            .zip(self.element_steps.iter())
            .find_map(|(component, steps)| match component {
                Component::Sample(sample) => Some((steps[0], sample)),
                _ => None,
            })
    }

    /// Index of the first component with the given name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.components.iter().position(|c| c.name() == name)
    }
}

fn check_below(name: &str, z: f64, previous: f64) -> Result<(), ColumnError> {
    if z < previous {
        Ok(())
    } else {
        Err(ColumnError::NonDecreasingZ {
            name: name.to_string(),
            z,
            previous,
        })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::component::{Aperture, DoubleDeflector, Lens, LensUpdate};
    use assert_approx_eq::assert_approx_eq;
    use nalgebra::DMatrix;

    fn stem_column() -> Column {
        Column::new(
            vec![
                Component::DoubleDeflector(DoubleDeflector::new("Scan Coils", 0.8, 0.7).unwrap()),
                Component::Lens(Lens::new("Lens", 0.6, -0.1).unwrap()),
                Component::Sample(
                    Sample::new("Sample", 0.5, 0.1, DMatrix::zeros(4, 4)).unwrap(),
                ),
                Component::Aperture(Aperture::new("Aperture", 0.3, 0.05, 0.25).unwrap()),
            ],
            1.0,
        )
        .unwrap()
    }

    #[test]
    fn test_z_positions_include_both_deflector_elements() {
        let column = stem_column();
        assert_eq!(column.z_positions(), &[1.0, 0.8, 0.7, 0.6, 0.5, 0.3, 0.0]);
        assert_eq!(column.num_steps(), column.len() + 3);
        assert_eq!(column.element_steps(0).unwrap(), &[1, 2]);
        assert_eq!(column.element_steps(3).unwrap(), &[5]);
    }

    #[test]
    fn test_distances_are_signed_differences() {
        let column = stem_column();
        let distances = column.z_distances();
        assert_eq!(distances.len(), column.num_steps() - 1);
        assert!(distances.iter().all(|&d| d < 0.0));
        assert_approx_eq!(distances[0], -0.2);
        assert_approx_eq!(distances.iter().sum::<f64>(), -1.0);
    }

    #[test]
    fn test_sample_step_is_reported() {
        let column = stem_column();
        let (step, sample) = column.sample().unwrap();
        assert_eq!(step, 4);
        assert_eq!(sample.name, "Sample");
        assert_eq!(column.position("Lens"), Some(1));
    }

    #[test]
    fn test_out_of_order_components_rejected() {
        let result = Column::new(
            vec![
                Component::Lens(Lens::new("Upper", 0.4, -0.1).unwrap()),
                Component::Lens(Lens::new("Lower", 0.5, -0.1).unwrap()),
            ],
            1.0,
        );
        assert_eq!(
            result.unwrap_err(),
            ColumnError::NonDecreasingZ {
                name: "Lower".to_string(),
                z: 0.5,
                previous: 0.4
            }
        );
    }

    #[test]
    fn test_component_below_detector_rejected() {
        let result = Column::new(vec![Component::Lens(Lens::new("Lens", -0.1, -0.1).unwrap())], 1.0);
        assert!(matches!(result, Err(ColumnError::NonDecreasingZ { .. })));
        let result = Column::new(vec![Component::Lens(Lens::new("Lens", 1.0, -0.1).unwrap())], 1.0);
        assert!(matches!(result, Err(ColumnError::NonDecreasingZ { .. })));
    }

    #[test]
    fn test_update_out_of_range() {
        let mut column = stem_column();
        let result = column.update(9, &ComponentUpdate::Lens(LensUpdate { f: Some(-0.2) }));
        assert_eq!(result.unwrap_err(), ColumnError::ComponentIndex { index: 9, len: 4 });
        column
            .update(1, &ComponentUpdate::Lens(LensUpdate { f: Some(-0.2) }))
            .unwrap();
        assert_eq!(column.component(1).unwrap(), &Component::Lens(Lens::new("Lens", 0.6, -0.2).unwrap()));
    }
}
