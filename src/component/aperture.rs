//! Annular apertures.

use crate::constant::{X, Y};
use crate::error::{ensure_finite, ensure_non_negative, ColumnError};
use crate::maths::distance;
use crate::matrix;
use nalgebra::{Matrix5, Matrix5xX};
use rayon::prelude::*;

/// An aperture plate with a circular hole.
///
/// The plate material is the annulus `inner_radius <= r < outer_radius` about
/// `(x, y)`. The outer radius bounds the modelled extent of the plate: rays
/// passing outside it are not blocked.
#[derive(Clone, Debug, PartialEq)]
pub struct Aperture {
    pub name: String,
    pub z: f64,
    pub x: f64,
    pub y: f64,
    pub inner_radius: f64,
    pub outer_radius: f64,
}

impl Aperture {
    pub fn new(
        name: impl Into<String>,
        z: f64,
        inner_radius: f64,
        outer_radius: f64,
    ) -> Result<Self, ColumnError> {
        let aperture = Aperture {
            name: name.into(),
            z,
            x: 0.0,
            y: 0.0,
            inner_radius,
            outer_radius,
        };
        aperture.validate()?;
        Ok(aperture)
    }

    /// Moves the centre of the hole off axis.
    pub fn centred_at(mut self, x: f64, y: f64) -> Result<Self, ColumnError> {
        self.x = x;
        self.y = y;
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ColumnError> {
        ensure_finite(&self.name, "z", self.z)?;
        ensure_finite(&self.name, "x", self.x)?;
        ensure_finite(&self.name, "y", self.y)?;
        ensure_non_negative(&self.name, "inner_radius", self.inner_radius)?;
        ensure_non_negative(&self.name, "outer_radius", self.outer_radius)?;
        if self.inner_radius >= self.outer_radius {
            return Err(ColumnError::InvalidApertureRadii {
                name: self.name.clone(),
                inner: self.inner_radius,
                outer: self.outer_radius,
            });
        }
        Ok(())
    }

    pub fn matrix(&self) -> Matrix5<f64> {
        matrix::identity()
    }

    /// True if a ray at `(x, y)` hits the plate.
    pub fn blocks(&self, x: f64, y: f64) -> bool {
        let r = distance(x, y, self.x, self.y);
        r >= self.inner_radius && r < self.outer_radius
    }

    /// Indices of the rays that hit the plate, in ascending order.
    pub fn blocked(&self, rays: &Matrix5xX<f64>) -> Vec<usize> {
        (0..rays.ncols())
            .into_par_iter()
            .filter(|&i| self.blocks(rays[(X, i)], rays[(Y, i)]))
            .collect()
    }

    pub fn update(&mut self, update: &ApertureUpdate) -> Result<(), ColumnError> {
        let mut updated = self.clone();
        if let Some(x) = update.x {
            updated.x = x;
        }
        if let Some(y) = update.y {
            updated.y = y;
        }
        if let Some(inner) = update.inner_radius {
            updated.inner_radius = inner;
        }
        if let Some(outer) = update.outer_radius {
            updated.outer_radius = outer;
        }
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}

/// New parameters for an [Aperture].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ApertureUpdate {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub inner_radius: Option<f64>,
    pub outer_radius: Option<f64>,
}
