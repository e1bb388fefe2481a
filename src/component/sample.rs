//! The specimen plane.

use crate::constant::PI;
use crate::error::{ensure_finite, ColumnError};
use crate::matrix;
use nalgebra::{DMatrix, Matrix5};
use num_complex::Complex64;

/// A square specimen with an intensity image.
///
/// The sample does not change ray states; its image is only read when forming
/// detector images. `image[(row, col)]` is the intensity at pixel `(x = col, y = row)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub name: String,
    pub z: f64,
    pub x: f64,
    pub y: f64,
    /// Physical edge length of the sample, m.
    pub width: f64,
    pub image: DMatrix<f64>,
}

impl Sample {
    pub fn new(
        name: impl Into<String>,
        z: f64,
        width: f64,
        image: DMatrix<f64>,
    ) -> Result<Self, ColumnError> {
        let sample = Sample {
            name: name.into(),
            z,
            x: 0.0,
            y: 0.0,
            width,
            image,
        };
        sample.validate()?;
        Ok(sample)
    }

    pub fn validate(&self) -> Result<(), ColumnError> {
        ensure_finite(&self.name, "z", self.z)?;
        ensure_finite(&self.name, "x", self.x)?;
        ensure_finite(&self.name, "y", self.y)?;
        ensure_finite(&self.name, "width", self.width)?;
        if self.width <= 0.0 {
            return Err(ColumnError::NegativeDimension {
                name: self.name.clone(),
                field: "width",
                value: self.width,
            });
        }
        if self.image.is_empty() || !self.image.is_square() {
            return Err(ColumnError::InvalidImage(format!(
                "sample '{}' image must be square and non-empty, got {}x{}",
                self.name,
                self.image.nrows(),
                self.image.ncols()
            )));
        }
        Ok(())
    }

    /// Pixel resolution along each edge of the sample image.
    pub fn pixels(&self) -> usize {
        self.image.nrows()
    }

    pub fn matrix(&self) -> Matrix5<f64> {
        matrix::identity()
    }

    pub fn update(&mut self, update: &SampleUpdate) -> Result<(), ColumnError> {
        let mut updated = self.clone();
        if let Some(x) = update.x {
            updated.x = x;
        }
        if let Some(y) = update.y {
            updated.y = y;
        }
        if let Some(width) = update.width {
            updated.width = width;
        }
        if let Some(image) = &update.image {
            updated.image = image.clone();
        }
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}

/// New parameters for a [Sample].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleUpdate {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub image: Option<DMatrix<f64>>,
}

/// Synthesises a `size × size` test object: a face with a ring outline, two eyes,
/// a nose carrying a phase ramp, a mouth and a tongue, modulated by a plane wave
/// whose signature in diffraction fixes scale and orientation.
pub fn test_pattern(size: usize) -> DMatrix<f64> {
    let s = size as f64;
    let scale = s / 256.0;
    let half = (size / 2) as f64;
    DMatrix::from_fn(size, size, |row, col| {
        let y = row as f64 - half;
        let x = col as f64 - half;
        let r2 = x * x + y * y;

        let mut obj = Complex64::new(1.0, 0.0);

        let outline_r2 = (y * 1.2).powi(2) + x * x;
        if outline_r2 > (110.0 * scale).powi(2) && outline_r2 < (120.0 * scale).powi(2) {
            obj = Complex64::new(0.0, 0.0);
        }
        if (y + 40.0 * scale).powi(2) + (x + 40.0 * scale).powi(2) < (20.0 * scale).powi(2) {
            obj = Complex64::new(0.0, 0.0);
        }
        if (y + 40.0 * scale).abs() < 15.0 * scale && (x - 40.0 * scale).abs() < 30.0 * scale {
            obj = Complex64::new(0.0, 0.0);
        }
        if y + 20.0 * scale + x > 0.0 && x < 0.0 && y < 10.0 * scale {
            obj = Complex64::new(0.0, 0.05 * (x + y));
        }
        if r2 > (50.0 * scale).powi(2) && r2 < (70.0 * scale).powi(2) && y > 20.0 * scale {
            obj = Complex64::new(0.0, 0.0);
        }
        if (y - 50.0 * scale).powi(2) + (x - 50.0 * scale).powi(2) < (20.0 * scale).powi(2)
            && r2 > (70.0 * scale).powi(2)
        {
            obj = Complex64::new(0.0, 0.0);
        }

        let phase = (3.0 * y + 7.0 * x) * 2.0 * PI / s;
        let signature = Complex64::from_polar(1.0, phase);
        (obj + signature * 0.3 - 0.3).norm()
    })
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn test_pattern_shape_and_range() {
        let pattern = test_pattern(64);
        assert_eq!(pattern.shape(), (64, 64));
        assert!(pattern.iter().all(|v| v.is_finite() && *v >= 0.0));
        // features are dark relative to the face
        assert!(pattern.max() > 0.9 && pattern.max() <= 1.0 + 1e-12);
        assert!(pattern.min() < 0.6);
    }

    #[test]
    fn test_non_square_image_rejected() {
        let result = Sample::new("Sample", 0.15, 1e-4, DMatrix::zeros(4, 3));
        assert!(matches!(result, Err(ColumnError::InvalidImage(_))));
    }

    #[test]
    fn test_zero_width_rejected() {
        let result = Sample::new("Sample", 0.15, 0.0, DMatrix::zeros(4, 4));
        assert!(matches!(
            result,
            Err(ColumnError::NegativeDimension { field: "width", .. })
        ));
    }
}
