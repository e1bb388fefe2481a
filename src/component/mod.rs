//! The optical components that make up a column.
//!
//! A [Component] is a closed set of variants, one per kind of instrument. Each
//! variant carries only its own parameters; the effect on a ray batch and the
//! blocking predicate are dispatched through [Component::interact].

pub mod aperture;
pub mod biprism;
pub mod deflector;
pub mod lens;
pub mod sample;

pub use aperture::{Aperture, ApertureUpdate};
pub use biprism::{Biprism, BiprismUpdate, WireOrientation};
pub use deflector::{Deflector, DeflectorUpdate, DoubleDeflector, DoubleDeflectorUpdate};
pub use lens::{AstigmaticLens, AstigmaticLensUpdate, Lens, LensUpdate};
pub use sample::{Sample, SampleUpdate};

use crate::error::ColumnError;
use nalgebra::{Matrix5, Matrix5xX};

/// An optical component positioned on the axis of the column.
#[derive(Clone, Debug, PartialEq)]
pub enum Component {
    Lens(Lens),
    AstigmaticLens(AstigmaticLens),
    /// Same matrix law as an astigmatic lens, used to shape the beam.
    Quadrupole(AstigmaticLens),
    Deflector(Deflector),
    DoubleDeflector(DoubleDeflector),
    Biprism(Biprism),
    Aperture(Aperture),
    Sample(Sample),
}

impl Component {
    pub fn name(&self) -> &str {
        match self {
            Component::Lens(c) => &c.name,
            Component::AstigmaticLens(c) | Component::Quadrupole(c) => &c.name,
            Component::Deflector(c) => &c.name,
            Component::DoubleDeflector(c) => &c.name,
            Component::Biprism(c) => &c.name,
            Component::Aperture(c) => &c.name,
            Component::Sample(c) => &c.name,
        }
    }

    /// Human readable kind of the component.
    pub fn kind(&self) -> &'static str {
        match self {
            Component::Lens(_) => "Lens",
            Component::AstigmaticLens(_) => "Astigmatic Lens",
            Component::Quadrupole(_) => "Quadrupole",
            Component::Deflector(_) => "Deflector",
            Component::DoubleDeflector(_) => "Double Deflector",
            Component::Biprism(_) => "Biprism",
            Component::Aperture(_) => "Aperture",
            Component::Sample(_) => "Sample",
        }
    }

    /// z positions of the component's elements, from the source side.
    pub fn z_positions(&self) -> Vec<f64> {
        match self {
            Component::Lens(c) => vec![c.z],
            Component::AstigmaticLens(c) | Component::Quadrupole(c) => vec![c.z],
            Component::Deflector(c) => vec![c.z],
            Component::DoubleDeflector(c) => vec![c.z_up, c.z_low],
            Component::Biprism(c) => vec![c.z],
            Component::Aperture(c) => vec![c.z],
            Component::Sample(c) => vec![c.z],
        }
    }

    /// Number of z planes occupied by the component.
    pub fn num_elements(&self) -> usize {
        match self {
            Component::DoubleDeflector(_) => 2,
            _ => 1,
        }
    }

    pub fn validate(&self) -> Result<(), ColumnError> {
        match self {
            Component::Lens(c) => c.validate(),
            Component::AstigmaticLens(c) | Component::Quadrupole(c) => c.validate(),
            Component::Deflector(c) => c.validate(),
            Component::DoubleDeflector(c) => c.validate(),
            Component::Biprism(c) => c.validate(),
            Component::Aperture(c) => c.validate(),
            Component::Sample(c) => c.validate(),
        }
    }

    /// Transfer matrix of one element of the component.
    ///
    /// `element` is 0 for single components; 0 (upper) or 1 (lower) for a
    /// double deflector. For a biprism the matrix only stores kick magnitudes.
    pub fn matrix(&self, element: usize) -> Result<Matrix5<f64>, ColumnError> {
        match self {
            Component::Lens(c) => c.matrix(),
            Component::AstigmaticLens(c) | Component::Quadrupole(c) => c.matrix(),
            Component::Deflector(c) => Ok(c.matrix()),
            Component::DoubleDeflector(c) => Ok(if element == 0 {
                c.upper_matrix()
            } else {
                c.lower_matrix()
            }),
            Component::Biprism(c) => Ok(c.matrix()),
            Component::Aperture(c) => Ok(c.matrix()),
            Component::Sample(c) => Ok(c.matrix()),
        }
    }

    /// Applies one element of the component to a slice of ray states in place,
    /// returning the indices of the rays it blocks.
    ///
    /// Blocking is evaluated on the ray states after the component's own effect.
    /// It never removes rays from the batch.
    pub fn interact(
        &self,
        element: usize,
        rays: &mut Matrix5xX<f64>,
    ) -> Result<Vec<usize>, ColumnError> {
        match self {
            Component::Biprism(biprism) => {
                let blocked = biprism.blocked(rays);
                biprism.deflect(rays);
                Ok(blocked)
            }
            Component::Aperture(aperture) => Ok(aperture.blocked(rays)),
            Component::Sample(_) => Ok(Vec::new()),
            _ => {
                let matrix = self.matrix(element)?;
                *rays = matrix * &*rays;
                Ok(Vec::new())
            }
        }
    }

    /// Applies a parameter update, leaving the component untouched on error.
    pub fn apply(&mut self, update: &ComponentUpdate) -> Result<(), ColumnError> {
        match (self, update) {
            (Component::Lens(c), ComponentUpdate::Lens(u)) => c.update(u),
            (Component::AstigmaticLens(c), ComponentUpdate::AstigmaticLens(u))
            | (Component::Quadrupole(c), ComponentUpdate::AstigmaticLens(u)) => c.update(u),
            (Component::Deflector(c), ComponentUpdate::Deflector(u)) => c.update(u),
            (Component::DoubleDeflector(c), ComponentUpdate::DoubleDeflector(u)) => c.update(u),
            (Component::Biprism(c), ComponentUpdate::Biprism(u)) => c.update(u),
            (Component::Aperture(c), ComponentUpdate::Aperture(u)) => c.update(u),
            (Component::Sample(c), ComponentUpdate::Sample(u)) => c.update(u),
            (component, _) => Err(ColumnError::UpdateMismatch {
                name: component.name().to_string(),
                kind: component.kind(),
            }),
        }
    }
}

/// New parameters for one component, applied through [Component::apply].
///
/// Positions along the axis are fixed once a column is assembled and cannot be
/// updated.
#[derive(Clone, Debug, PartialEq)]
pub enum ComponentUpdate {
    Lens(LensUpdate),
    /// Updates an astigmatic lens or a quadrupole.
    AstigmaticLens(AstigmaticLensUpdate),
    Deflector(DeflectorUpdate),
    DoubleDeflector(DoubleDeflectorUpdate),
    Biprism(BiprismUpdate),
    Aperture(ApertureUpdate),
    Sample(SampleUpdate),
}
