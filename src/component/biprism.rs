//! Electrostatic biprism.

use crate::constant::{PI, SLOPE_X, SLOPE_Y, X, Y};
use crate::error::{ensure_finite, ensure_non_negative, ColumnError};
use crate::maths::sign;
use crate::matrix;
use nalgebra::{Matrix5, Matrix5xX};
use rayon::prelude::*;

/// Direction of the biprism wire in the transverse plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WireOrientation {
    /// `theta = 0`: the wire lies along x and rays are deflected in y.
    AlongX,
    /// `theta = pi/2`: the wire lies along y and rays are deflected in x.
    AlongY,
}

impl WireOrientation {
    /// Parses a wire angle, accepting only `0` and `pi/2` radians.
    pub fn from_theta(name: &str, theta: f64) -> Result<Self, ColumnError> {
        if theta == 0.0 {
            Ok(WireOrientation::AlongX)
        } else if (theta - PI / 2.0).abs() < 1e-12 {
            Ok(WireOrientation::AlongY)
        } else {
            Err(ColumnError::InvalidWireOrientation {
                name: name.to_string(),
                theta,
            })
        }
    }

    /// `(sin(theta), cos(theta))`, exact for both orientations.
    fn sin_cos(&self) -> (f64, f64) {
        match self {
            WireOrientation::AlongX => (0.0, 1.0),
            WireOrientation::AlongY => (1.0, 0.0),
        }
    }
}

/// A biprism wire that kicks rays away from (or towards) the wire depending on
/// which side of the axis they pass.
///
/// The kick depends on the sign of the ray position, so it cannot be written as
/// a fixed linear matrix; [Biprism::matrix] only stores the kick magnitudes.
#[derive(Clone, Debug, PartialEq)]
pub struct Biprism {
    pub name: String,
    pub z: f64,
    /// Kick magnitude in slope units. Positive values bend rays away from the wire.
    pub deflection: f64,
    pub orientation: WireOrientation,
    /// Half-width of the wire, m.
    pub width: f64,
    /// Extent of the wire along its length, m.
    pub radius: f64,
}

impl Biprism {
    pub fn new(
        name: impl Into<String>,
        z: f64,
        deflection: f64,
        theta: f64,
        width: f64,
        radius: f64,
    ) -> Result<Self, ColumnError> {
        let name = name.into();
        let orientation = WireOrientation::from_theta(&name, theta)?;
        let biprism = Biprism {
            name,
            z,
            deflection,
            orientation,
            width,
            radius,
        };
        biprism.validate()?;
        Ok(biprism)
    }

    pub fn validate(&self) -> Result<(), ColumnError> {
        ensure_finite(&self.name, "z", self.z)?;
        ensure_finite(&self.name, "deflection", self.deflection)?;
        ensure_non_negative(&self.name, "width", self.width)?;
        ensure_non_negative(&self.name, "radius", self.radius)
    }

    pub fn matrix(&self) -> Matrix5<f64> {
        let (sin, cos) = self.orientation.sin_cos();
        matrix::biprism(self.deflection * sin, self.deflection * cos)
    }

    /// Indices of the rays intercepted by the wire.
    ///
    /// A ray is blocked when it is within `width` of the wire across it and
    /// within `radius` of the axis along it.
    pub fn blocked(&self, rays: &Matrix5xX<f64>) -> Vec<usize> {
        let (across, along) = match self.orientation {
            WireOrientation::AlongX => (Y, X),
            WireOrientation::AlongY => (X, Y),
        };
        (0..rays.ncols())
            .into_par_iter()
            .filter(|&i| {
                rays[(across, i)].abs() < self.width && rays[(along, i)].abs() < self.radius
            })
            .collect()
    }

    /// Adds the sign dependent kick to every ray in place.
    pub fn deflect(&self, rays: &mut Matrix5xX<f64>) {
        let kicks = self.matrix();
        let (kick_x, kick_y) = (kicks[(SLOPE_X, 4)], kicks[(SLOPE_Y, 4)]);
        for mut ray in rays.column_iter_mut() {
            ray[SLOPE_X] += sign(ray[X]) * kick_x;
            ray[SLOPE_Y] += sign(ray[Y]) * kick_y;
        }
    }

    pub fn update(&mut self, update: &BiprismUpdate) -> Result<(), ColumnError> {
        let mut updated = self.clone();
        if let Some(deflection) = update.deflection {
            updated.deflection = deflection;
        }
        if let Some(theta) = update.theta {
            updated.orientation = WireOrientation::from_theta(&updated.name, theta)?;
        }
        if let Some(width) = update.width {
            updated.width = width;
        }
        if let Some(radius) = update.radius {
            updated.radius = radius;
        }
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}

/// New parameters for a [Biprism].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BiprismUpdate {
    pub deflection: Option<f64>,
    pub theta: Option<f64>,
    pub width: Option<f64>,
    pub radius: Option<f64>,
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use nalgebra::Vector5;

    fn rays(states: &[[f64; 4]]) -> Matrix5xX<f64> {
        Matrix5xX::from_columns(
            &states
                .iter()
                .map(|s| Vector5::new(s[0], s[1], s[2], s[3], 1.0))
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn test_symmetric_rays_get_opposite_kicks() {
        let biprism = Biprism::new("Biprism", 0.5, 0.1, PI / 2.0, 0.01, 0.25).unwrap();
        let mut states = rays(&[[0.05, 0.0, 0.0, 0.0], [-0.05, 0.0, 0.0, 0.0]]);
        biprism.deflect(&mut states);
        assert_eq!(states[(SLOPE_X, 0)], 0.1);
        assert_eq!(states[(SLOPE_X, 1)], -0.1);
        assert_eq!(states[(SLOPE_Y, 0)], 0.0);
        assert_eq!(states[(SLOPE_Y, 1)], 0.0);
    }

    #[test]
    fn test_ray_on_axis_is_not_kicked() {
        let biprism = Biprism::new("Biprism", 0.5, 0.1, 0.0, 0.01, 0.25).unwrap();
        let mut states = rays(&[[0.2, 0.0, 0.0, 0.0]]);
        biprism.deflect(&mut states);
        assert_eq!(states[(SLOPE_Y, 0)], 0.0);
        assert_eq!(states[(SLOPE_X, 0)], 0.0);
    }

    #[test]
    fn test_blocking_band_swaps_with_orientation() {
        let states = rays(&[
            [0.005, 0.0, 0.1, 0.0],
            [0.1, 0.0, 0.005, 0.0],
            [0.005, 0.0, 0.3, 0.0],
        ]);
        let along_y = Biprism::new("Biprism", 0.5, 0.1, PI / 2.0, 0.01, 0.25).unwrap();
        assert_eq!(along_y.blocked(&states), vec![0]);
        let along_x = Biprism::new("Biprism", 0.5, 0.1, 0.0, 0.01, 0.25).unwrap();
        assert_eq!(along_x.blocked(&states), vec![1]);
    }

    #[test]
    fn test_oblique_wire_is_rejected() {
        let result = Biprism::new("Biprism", 0.5, 0.1, 0.3, 0.01, 0.25);
        assert!(matches!(
            result,
            Err(ColumnError::InvalidWireOrientation { .. })
        ));
    }
}
