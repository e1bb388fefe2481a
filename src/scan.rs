//! Scan and descan coil settings for raster acquisition.
//!
//! A pair of scan coils above a lens tilts the beam about a pivot at the lens's
//! front focal plane, so the lens turns the tilt into a pure lateral shift at
//! the sample. A pair of descan coils below the sample returns the shifted beam
//! to the optical axis.

use crate::component::{DoubleDeflector, DoubleDeflectorUpdate};
use crate::error::{ensure_finite, ColumnError};

/// Geometry constants of a scan / lens / descan arrangement.
///
/// All distances are signed z differences taken in the direction of travel, so
/// they are negative for elements further down the column.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScanDescanGeometry {
    /// Lower scan element minus upper scan element.
    dist: f64,
    /// Lens minus lower scan element.
    dist_to_lens: f64,
    /// Front focal plane minus lower scan element.
    dist_to_ffp: f64,
    /// Lower descan element minus upper descan element.
    descan_dist: f64,
}

impl ScanDescanGeometry {
    /// Builds the geometry for scan coils, a lens of focal length `lens_f` at
    /// `lens_z`, and descan coils.
    pub fn new(
        scan: &DoubleDeflector,
        lens_z: f64,
        lens_f: f64,
        descan: &DoubleDeflector,
    ) -> Result<Self, ColumnError> {
        ensure_finite("scan lens", "z", lens_z)?;
        ensure_finite("scan lens", "f", lens_f)?;
        let ffp_z = lens_z - lens_f;
        let geometry = ScanDescanGeometry {
            dist: -scan.separation(),
            dist_to_lens: lens_z - scan.z_low,
            dist_to_ffp: ffp_z - scan.z_low,
            descan_dist: -descan.separation(),
        };
        if geometry.dist_to_ffp == 0.0 {
            return Err(ColumnError::DegenerateGeometry(format!(
                "lower element of '{}' sits at the front focal plane, z = {}",
                scan.name, ffp_z
            )));
        }
        if geometry.denominator() == 0.0 || !geometry.denominator().is_finite() {
            return Err(ColumnError::DegenerateGeometry(format!(
                "scan coils '{}' cannot shift the beam at the lens",
                scan.name
            )));
        }
        if geometry.descan_dist == 0.0 {
            return Err(ColumnError::DegenerateGeometry(format!(
                "descan coils '{}' have coincident elements",
                descan.name
            )));
        }
        Ok(geometry)
    }

    /// Ratio of lower to upper scan deflection that pivots the beam at the
    /// front focal plane.
    pub fn ratio(&self) -> f64 {
        -1.0 - self.dist / self.dist_to_ffp
    }

    /// Lateral shift at the lens per unit of upper scan deflection.
    fn denominator(&self) -> f64 {
        self.dist + self.dist_to_lens * self.ratio() + self.dist_to_lens
    }

    /// Upper and lower scan deflections for a shift `s` along one axis.
    pub fn scan_deflections(&self, s: f64) -> (f64, f64) {
        let updef = s / self.denominator();
        (updef, self.ratio() * updef)
    }

    /// Upper and lower descan deflections that undo a shift `s` along one axis.
    pub fn descan_deflections(&self, s: f64) -> (f64, f64) {
        let updef = -s / self.descan_dist;
        (updef, -updef)
    }

    /// Coil settings that shift the beam by `(sx, sy)` at the sample.
    pub fn solve(&self, sx: f64, sy: f64) -> ScanSettings {
        let (scan_upx, scan_lowx) = self.scan_deflections(sx);
        let (scan_upy, scan_lowy) = self.scan_deflections(sy);
        let (descan_upx, descan_lowx) = self.descan_deflections(sx);
        let (descan_upy, descan_lowy) = self.descan_deflections(sy);
        ScanSettings {
            ratio: self.ratio(),
            scan: CoilSettings {
                updefx: scan_upx,
                updefy: scan_upy,
                lowdefx: scan_lowx,
                lowdefy: scan_lowy,
            },
            descan: CoilSettings {
                updefx: descan_upx,
                updefy: descan_upy,
                lowdefx: descan_lowx,
                lowdefy: descan_lowy,
            },
        }
    }
}

/// Deflections of both elements of a double deflector.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CoilSettings {
    pub updefx: f64,
    pub updefy: f64,
    pub lowdefx: f64,
    pub lowdefy: f64,
}

/// Settings for the scan and descan coils at one scan position.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScanSettings {
    /// Pivot ratio, recorded on the scan coils.
    pub ratio: f64,
    pub scan: CoilSettings,
    pub descan: CoilSettings,
}

impl ScanSettings {
    pub fn scan_update(&self) -> DoubleDeflectorUpdate {
        DoubleDeflectorUpdate {
            updefx: Some(self.scan.updefx),
            updefy: Some(self.scan.updefy),
            lowdefx: Some(self.scan.lowdefx),
            lowdefy: Some(self.scan.lowdefy),
            defratiox: Some(self.ratio),
            defratioy: Some(self.ratio),
            ..Default::default()
        }
    }

    pub fn descan_update(&self) -> DoubleDeflectorUpdate {
        DoubleDeflectorUpdate {
            updefx: Some(self.descan.updefx),
            updefy: Some(self.descan.updefy),
            lowdefx: Some(self.descan.lowdefx),
            lowdefy: Some(self.descan.lowdefy),
            ..Default::default()
        }
    }
}

/// Position of the beam in a square raster over the sample.
#[derive(Clone, Debug, PartialEq)]
pub struct ScanRaster {
    pub scan_pixels: usize,
    pub pixel_x: usize,
    pub pixel_y: usize,
    /// Physical edge length of the scanned area, m.
    pub width: f64,
}

impl ScanRaster {
    pub fn new(scan_pixels: usize, width: f64) -> Result<Self, ColumnError> {
        if scan_pixels == 0 {
            return Err(ColumnError::InvalidImage(
                "scan raster needs at least one pixel".to_string(),
            ));
        }
        ensure_finite("scan raster", "width", width)?;
        Ok(ScanRaster {
            scan_pixels,
            pixel_x: 0,
            pixel_y: 0,
            width,
        })
    }

    pub fn num_positions(&self) -> usize {
        self.scan_pixels * self.scan_pixels
    }

    /// Moves to the given pixel.
    pub fn set_position(&mut self, pixel_x: usize, pixel_y: usize) -> Result<(), ColumnError> {
        if pixel_x >= self.scan_pixels || pixel_y >= self.scan_pixels {
            return Err(ColumnError::InvalidImage(format!(
                "scan position ({}, {}) outside a {} pixel raster",
                pixel_x, pixel_y, self.scan_pixels
            )));
        }
        self.pixel_x = pixel_x;
        self.pixel_y = pixel_y;
        Ok(())
    }

    /// Physical offset of the centre of the current pixel from the raster centre.
    pub fn offset(&self) -> (f64, f64) {
        let n = self.scan_pixels as f64;
        let to_offset = |p: usize| ((p as f64 + 0.5) / n - 0.5) * self.width;
        (to_offset(self.pixel_x), to_offset(self.pixel_y))
    }

    /// Moves to the next pixel, x fastest.
    ///
    /// Returns `true` once the last pixel has been passed; the raster is then
    /// back at the first pixel.
    pub fn advance(&mut self) -> bool {
        self.pixel_x += 1;
        if self.pixel_x < self.scan_pixels {
            return false;
        }
        self.pixel_x = 0;
        self.pixel_y += 1;
        if self.pixel_y < self.scan_pixels {
            return false;
        }
        self.pixel_y = 0;
        true
    }

    pub fn reset(&mut self) {
        self.pixel_x = 0;
        self.pixel_y = 0;
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::matrix;
    use assert_approx_eq::assert_approx_eq;
    use nalgebra::Vector5;

    fn geometry() -> (DoubleDeflector, f64, f64, DoubleDeflector) {
        let scan = DoubleDeflector::new("Scan Coils", 0.9, 0.8).unwrap();
        let descan = DoubleDeflector::new("Descan Coils", 0.4, 0.3).unwrap();
        (scan, 0.6, -0.15, descan)
    }

    #[test]
    fn test_zero_offset_gives_zero_deflections() {
        let (scan, lens_z, lens_f, descan) = geometry();
        let settings = ScanDescanGeometry::new(&scan, lens_z, lens_f, &descan)
            .unwrap()
            .solve(0.0, 0.0);
        for coils in &[settings.scan, settings.descan] {
            assert_eq!(coils.updefx, 0.0);
            assert_eq!(coils.updefy, 0.0);
            assert_eq!(coils.lowdefx, 0.0);
            assert_eq!(coils.lowdefy, 0.0);
        }
    }

    #[test]
    fn test_beam_leaves_lens_parallel_and_shifted() {
        let (scan, lens_z, lens_f, descan) = geometry();
        let geometry = ScanDescanGeometry::new(&scan, lens_z, lens_f, &descan).unwrap();
        let settings = geometry.solve(0.01, -0.02);

        let mut ray = Vector5::new(0.0, 0.0, 0.0, 0.0, 1.0);
        ray = matrix::deflector(settings.scan.updefx, settings.scan.updefy) * ray;
        ray = matrix::drift(scan.z_low - scan.z_up) * ray;
        ray = matrix::deflector(settings.scan.lowdefx, settings.scan.lowdefy) * ray;
        ray = matrix::drift(lens_z - scan.z_low) * ray;
        assert_approx_eq!(ray[0], 0.01);
        assert_approx_eq!(ray[2], -0.02);
        ray = matrix::lens(lens_f).unwrap() * ray;
        assert_approx_eq!(ray[1], 0.0);
        assert_approx_eq!(ray[3], 0.0);

        ray = matrix::drift(descan.z_up - lens_z) * ray;
        ray = matrix::deflector(settings.descan.updefx, settings.descan.updefy) * ray;
        ray = matrix::drift(descan.z_low - descan.z_up) * ray;
        ray = matrix::deflector(settings.descan.lowdefx, settings.descan.lowdefy) * ray;
        for i in 0..4 {
            assert_approx_eq!(ray[i], 0.0);
        }
    }

    #[test]
    fn test_ratio_matches_pivot_formula() {
        let (scan, lens_z, lens_f, descan) = geometry();
        let geometry = ScanDescanGeometry::new(&scan, lens_z, lens_f, &descan).unwrap();
        // ffp at 0.75, so dist = -0.1 and dist_to_ffp = -0.05
        assert_approx_eq!(geometry.ratio(), -1.0 - (-0.1 / -0.05));
    }

    #[test]
    fn test_coils_at_focal_plane_are_degenerate() {
        let (_, _, _, descan) = geometry();
        let scan = DoubleDeflector::new("Scan Coils", 0.75, 0.5).unwrap();
        let result = ScanDescanGeometry::new(&scan, 0.25, -0.25, &descan);
        assert!(matches!(result, Err(ColumnError::DegenerateGeometry(_))));
    }

    #[test]
    fn test_raster_visits_every_pixel_once() {
        let mut raster = ScanRaster::new(3, 0.3).unwrap();
        let mut visited = vec![(raster.pixel_x, raster.pixel_y)];
        while !raster.advance() {
            visited.push((raster.pixel_x, raster.pixel_y));
        }
        assert_eq!(visited.len(), 9);
        assert_eq!(visited[1], (1, 0));
        assert_eq!(visited[3], (0, 1));
        assert_eq!((raster.pixel_x, raster.pixel_y), (0, 0));
    }

    #[test]
    fn test_raster_offsets_are_pixel_centres() {
        let mut raster = ScanRaster::new(4, 0.4).unwrap();
        let (x, y) = raster.offset();
        assert_approx_eq!(x, -0.15);
        assert_approx_eq!(y, -0.15);
        raster.set_position(3, 1).unwrap();
        let (x, y) = raster.offset();
        assert_approx_eq!(x, 0.15);
        assert_approx_eq!(y, -0.05);
        assert!(raster.set_position(4, 0).is_err());
    }
}
