//! Thin lenses: round, astigmatic and quadrupole.

use crate::error::{ensure_finite, ColumnError};
use crate::matrix;
use nalgebra::Matrix5;

/// A round thin lens.
///
/// In the column's sign convention (slopes are `dx/dz`, the beam travels towards
/// decreasing z) a negative focal length converges the beam.
#[derive(Clone, Debug, PartialEq)]
pub struct Lens {
    pub name: String,
    /// Position on the optical axis, m.
    pub z: f64,
    /// Focal length, m. Never zero.
    pub f: f64,
}

impl Lens {
    pub fn new(name: impl Into<String>, z: f64, f: f64) -> Result<Self, ColumnError> {
        let lens = Lens {
            name: name.into(),
            z,
            f,
        };
        lens.validate()?;
        Ok(lens)
    }

    pub fn validate(&self) -> Result<(), ColumnError> {
        ensure_finite(&self.name, "z", self.z)?;
        validate_focal_length(&self.name, "f", self.f)
    }

    pub fn matrix(&self) -> Result<Matrix5<f64>, ColumnError> {
        matrix::lens(self.f)
    }

    pub fn update(&mut self, update: &LensUpdate) -> Result<(), ColumnError> {
        let mut updated = self.clone();
        if let Some(f) = update.f {
            updated.f = f;
        }
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}

/// A thin lens with independent focal lengths along x and y.
///
/// Used both for astigmatic lenses and quadrupoles; the two share a matrix law
/// and differ only in their role in the column.
#[derive(Clone, Debug, PartialEq)]
pub struct AstigmaticLens {
    pub name: String,
    pub z: f64,
    pub fx: f64,
    pub fy: f64,
}

impl AstigmaticLens {
    pub fn new(name: impl Into<String>, z: f64, fx: f64, fy: f64) -> Result<Self, ColumnError> {
        let lens = AstigmaticLens {
            name: name.into(),
            z,
            fx,
            fy,
        };
        lens.validate()?;
        Ok(lens)
    }

    pub fn validate(&self) -> Result<(), ColumnError> {
        ensure_finite(&self.name, "z", self.z)?;
        validate_focal_length(&self.name, "fx", self.fx)?;
        validate_focal_length(&self.name, "fy", self.fy)
    }

    pub fn matrix(&self) -> Result<Matrix5<f64>, ColumnError> {
        matrix::astigmatic_lens(self.fx, self.fy)
    }

    pub fn update(&mut self, update: &AstigmaticLensUpdate) -> Result<(), ColumnError> {
        let mut updated = self.clone();
        if let Some(fx) = update.fx {
            updated.fx = fx;
        }
        if let Some(fy) = update.fy {
            updated.fy = fy;
        }
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}

/// New parameters for a [Lens]; `None` leaves a field unchanged.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LensUpdate {
    pub f: Option<f64>,
}

/// New parameters for an [AstigmaticLens] or quadrupole.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AstigmaticLensUpdate {
    pub fx: Option<f64>,
    pub fy: Option<f64>,
}

fn validate_focal_length(name: &str, field: &'static str, f: f64) -> Result<(), ColumnError> {
    ensure_finite(name, field, f)?;
    if f == 0.0 {
        return Err(ColumnError::ZeroFocalLength {
            name: name.to_string(),
        });
    }
    Ok(())
}
