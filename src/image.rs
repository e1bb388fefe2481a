//! Formation of pixel images from ray hit positions.

use crate::constant::{DEFAULT_DETECTOR_PIXELS, DEFAULT_DETECTOR_SIZE};
use crate::error::ColumnError;
use crate::maths::rotate_deg;
use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// A square pixel grid centred on the optical axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PixelGrid {
    /// Physical edge length, m.
    pub size: f64,
    pub pixels: usize,
}

impl PixelGrid {
    pub fn new(size: f64, pixels: usize) -> Result<Self, ColumnError> {
        let grid = PixelGrid { size, pixels };
        grid.validate()?;
        Ok(grid)
    }

    pub fn validate(&self) -> Result<(), ColumnError> {
        if !(self.size.is_finite() && self.size > 0.0) || self.pixels == 0 {
            return Err(ColumnError::InvalidImage(format!(
                "pixel grid needs a positive size and pixel count, got {} m over {} pixels",
                self.size, self.pixels
            )));
        }
        Ok(())
    }

    /// Pixel index of a physical coordinate along one axis.
    pub fn pixel(&self, physical: f64) -> i64 {
        let n = self.pixels as f64;
        (physical / self.size * n + n / 2.0 - 1.0).round() as i64
    }

    /// True if the pixel lies strictly inside the grid. Index 0 is excluded.
    pub fn contains(&self, (px, py): (i64, i64)) -> bool {
        let n = self.pixels as i64;
        px > 0 && px < n && py > 0 && py < n
    }
}

impl Default for PixelGrid {
    fn default() -> Self {
        PixelGrid {
            size: DEFAULT_DETECTOR_SIZE,
            pixels: DEFAULT_DETECTOR_PIXELS,
        }
    }
}

/// Rotation (degrees) and optional flip applied to physical coordinates
/// before pixel mapping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinateTransform {
    pub rotation: f64,
    /// Negates y after rotating.
    pub flip_y: bool,
}

impl CoordinateTransform {
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let (x, y) = rotate_deg(x, y, -self.rotation);
        if self.flip_y {
            (x, -y)
        } else {
            (x, y)
        }
    }
}

/// Pixel coordinates `(px, py)` of every ray.
pub fn pixel_coords(
    xs: &[f64],
    ys: &[f64],
    grid: &PixelGrid,
    transform: &CoordinateTransform,
) -> Result<Vec<(i64, i64)>, ColumnError> {
    if xs.len() != ys.len() {
        return Err(ColumnError::CoordinateMismatch(xs.len(), ys.len()));
    }
    grid.validate()?;
    Ok(xs
        .par_iter()
        .zip(ys.par_iter())
        .map(|(&x, &y)| {
            let (x, y) = transform.apply(x, y);
            (grid.pixel(x), grid.pixel(y))
        })
        .collect())
}

/// Images formed on the detector by one propagation pass.
///
/// Images are indexed `[(row, col)] = [(py, px)]`.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectorImages {
    /// Number of rays reaching each detector pixel without passing through the sample.
    pub hit_count: DMatrix<u32>,
    /// Sample intensity carried to the detector by rays passing through the sample.
    pub intensity: DMatrix<f64>,
    pub sample_pixels: Vec<(i64, i64)>,
    pub detector_pixels: Vec<(i64, i64)>,
}

/// Forms detector images from the hit positions of every ray at the sample and
/// at the detector, in the same ray order.
///
/// A ray inside both grids copies the sample intensity at its sample pixel to
/// its detector pixel. A ray inside the detector grid only adds to the hit
/// count and forces the intensity at its detector pixel to zero. Rays outside
/// the detector grid contribute nothing.
pub fn form_image(
    sample_hits: (&[f64], &[f64]),
    detector_hits: (&[f64], &[f64]),
    sample_image: &DMatrix<f64>,
    sample_size: f64,
    detector: &PixelGrid,
    transform: &CoordinateTransform,
) -> Result<DetectorImages, ColumnError> {
    if sample_image.is_empty() || !sample_image.is_square() {
        return Err(ColumnError::InvalidImage(format!(
            "sample image must be square and non-empty, got {}x{}",
            sample_image.nrows(),
            sample_image.ncols()
        )));
    }
    if sample_hits.0.len() != detector_hits.0.len() {
        return Err(ColumnError::CoordinateMismatch(
            sample_hits.0.len(),
            detector_hits.0.len(),
        ));
    }
    let sample = PixelGrid::new(sample_size, sample_image.nrows())?;
    let sample_pixels = pixel_coords(sample_hits.0, sample_hits.1, &sample, transform)?;
    let detector_pixels = pixel_coords(detector_hits.0, detector_hits.1, detector, transform)?;

    let (through_sample, missed_sample): (Vec<usize>, Vec<usize>) = (0..detector_pixels.len())
        .filter(|&i| detector.contains(detector_pixels[i]))
        .partition(|&i| sample.contains(sample_pixels[i]));

    let mut hit_count = DMatrix::<u32>::zeros(detector.pixels, detector.pixels);
    let mut intensity = DMatrix::<f64>::zeros(detector.pixels, detector.pixels);
    for &i in through_sample.iter() {
        let (sx, sy) = sample_pixels[i];
        let (dx, dy) = detector_pixels[i];
        intensity[(dy as usize, dx as usize)] = sample_image[(sy as usize, sx as usize)];
    }
    for &i in missed_sample.iter() {
        let (dx, dy) = detector_pixels[i];
        hit_count[(dy as usize, dx as usize)] += 1;
        intensity[(dy as usize, dx as usize)] = 0.0;
    }

    Ok(DetectorImages {
        hit_count,
        intensity,
        sample_pixels,
        detector_pixels,
    })
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_pixel_mapping() {
        let grid = PixelGrid::new(0.5, 128).unwrap();
        assert_eq!(grid.pixel(0.0), 63);
        assert_eq!(grid.pixel(0.25), 127);
        assert_eq!(grid.pixel(-0.25), -1);
        assert!(grid.contains((63, 63)));
        assert!(!grid.contains((0, 63)));
        assert!(!grid.contains((63, 128)));
    }

    #[test]
    fn test_rotation_then_flip() {
        let transform = CoordinateTransform {
            rotation: 90.0,
            flip_y: true,
        };
        let (x, y) = transform.apply(1.0, 0.0);
        assert_approx_eq!(x, 0.0);
        assert_approx_eq!(y, 1.0);
        let (x, y) = transform.apply(0.0, 1.0);
        assert_approx_eq!(x, 1.0);
        assert_approx_eq!(y, 0.0);
    }

    #[test]
    fn test_intensity_copied_exactly() {
        let sample_image = DMatrix::from_fn(8, 8, |row, col| (row * 8 + col) as f64 * 0.1);
        let detector = PixelGrid::new(1.0, 16).unwrap();
        let images = form_image(
            (&[0.0, 0.1], &[0.0, -0.2]),
            (&[0.0, 0.3], &[0.0, 0.1]),
            &sample_image,
            1.0,
            &detector,
            &CoordinateTransform::default(),
        )
        .unwrap();
        assert_eq!(images.sample_pixels, vec![(3, 3), (4, 1)]);
        assert_eq!(images.detector_pixels, vec![(7, 7), (12, 9)]);
        assert_eq!(images.intensity[(7, 7)], sample_image[(3, 3)]);
        assert_eq!(images.intensity[(9, 12)], sample_image[(1, 4)]);
        assert_eq!(images.hit_count.iter().sum::<u32>(), 0);
    }

    #[test]
    fn test_rays_missing_sample_count_hits_and_clear_intensity() {
        let sample_image = DMatrix::from_element(4, 4, 0.7);
        let detector = PixelGrid::new(1.0, 16).unwrap();
        let images = form_image(
            (&[0.0, 5.0, 5.0, 0.0], &[0.0, 0.0, 0.0, 0.0]),
            (&[0.0, 0.0, 0.0, 9.0], &[0.0, 0.0, 0.0, 0.0]),
            &sample_image,
            1.0,
            &detector,
            &CoordinateTransform::default(),
        )
        .unwrap();
        assert_eq!(images.hit_count[(7, 7)], 2);
        assert_eq!(images.intensity[(7, 7)], 0.0);
        assert_eq!(images.hit_count.iter().sum::<u32>(), 2);
    }

    #[test]
    fn test_mismatched_coordinates_rejected() {
        let result = form_image(
            (&[0.0], &[0.0]),
            (&[0.0, 1.0], &[0.0, 1.0]),
            &DMatrix::zeros(4, 4),
            1.0,
            &PixelGrid::new(1.0, 4).unwrap(),
            &CoordinateTransform::default(),
        );
        assert_eq!(result.unwrap_err(), ColumnError::CoordinateMismatch(1, 2));
    }
}
