//! The model of a microscope column: components, beam and rays.

use crate::beam::{self, BeamParameters, BeamType, BeamUpdate, RingLayout};
use crate::column::Column;
use crate::component::{Component, ComponentUpdate, DoubleDeflector, Lens, LensUpdate, Sample};
use crate::constant::{X, Y};
use crate::error::{ensure_finite, ColumnError};
use crate::image::{form_image, CoordinateTransform, DetectorImages, PixelGrid};
use crate::propagate::{propagate, Propagation};
use crate::ray::RayBatch;
use crate::scan::{ScanDescanGeometry, ScanRaster, ScanSettings};
use log::{debug, info, warn};
use nalgebra::DMatrix;

/// Indices of the components taking part in a scan, and the raster resolution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScanSetup {
    pub scan_coils: usize,
    pub lens: usize,
    pub descan_coils: usize,
    pub scan_pixels: usize,
}

#[derive(Clone, Debug)]
struct ScanState {
    setup: ScanSetup,
    raster: ScanRaster,
}

/// A column, the beam entering it and the rays traced through it.
///
/// The ray batch is regenerated when the beam changes and overwritten by
/// every call to [Model::step]. Results read between an update and the next
/// step describe the previous pass.
#[derive(Clone, Debug)]
pub struct Model {
    column: Column,
    beam: BeamParameters,
    detector: PixelGrid,
    transform: CoordinateTransform,
    rays: RayBatch,
    layout: Option<RingLayout>,
    propagation: Propagation,
    scan: Option<ScanState>,
}

impl Model {
    pub fn new(
        column: Column,
        beam: BeamParameters,
        detector: PixelGrid,
    ) -> Result<Self, ColumnError> {
        detector.validate()?;
        let (rays, layout) = beam::generate(&beam, column.num_steps())?;
        info!(
            "Created model of {} components with a {:?} beam of {} rays.",
            column.len(),
            beam.beam_type,
            beam.num_rays
        );
        Ok(Model {
            column,
            beam,
            detector,
            transform: CoordinateTransform::default(),
            rays,
            layout,
            propagation: Propagation::default(),
            scan: None,
        })
    }

    /// Sets the rotation and flip applied when forming images.
    pub fn with_transform(mut self, transform: CoordinateTransform) -> Self {
        self.transform = transform;
        self
    }

    /// Configures raster scanning over the sample.
    ///
    /// The scan and descan coils must be double deflectors and the lens a
    /// simple lens. The raster spans the width of the sample.
    pub fn with_scan(mut self, setup: ScanSetup) -> Result<Self, ColumnError> {
        double_deflector(&self.column, setup.scan_coils)?;
        double_deflector(&self.column, setup.descan_coils)?;
        lens(&self.column, setup.lens)?;
        let width = self.sample()?.1.width;
        let raster = ScanRaster::new(setup.scan_pixels, width)?;
        self.scan = Some(ScanState { setup, raster });
        Ok(self)
    }

    pub fn column(&self) -> &Column {
        &self.column
    }

    pub fn beam(&self) -> &BeamParameters {
        &self.beam
    }

    pub fn detector(&self) -> &PixelGrid {
        &self.detector
    }

    pub fn rays(&self) -> &RayBatch {
        &self.rays
    }

    pub fn z_positions(&self) -> &[f64] {
        self.column.z_positions()
    }

    /// Rays per ring of a parallel or point beam.
    pub fn ring_layout(&self) -> Option<&RingLayout> {
        self.layout.as_ref()
    }

    /// Blocked rays of the last pass.
    pub fn propagation(&self) -> &Propagation {
        &self.propagation
    }

    /// Rebuilds the ray batch from the beam parameters.
    pub fn generate_rays(&mut self) -> Result<(), ColumnError> {
        let (rays, layout) = beam::generate(&self.beam, self.column.num_steps())?;
        self.rays = rays;
        self.layout = layout;
        Ok(())
    }

    /// Propagates the beam through the column to the detector.
    pub fn step(&mut self) -> Result<&RayBatch, ColumnError> {
        self.propagation = propagate(&self.column, &mut self.rays)?;
        Ok(&self.rays)
    }

    pub fn update_component(
        &mut self,
        index: usize,
        update: &ComponentUpdate,
    ) -> Result<(), ColumnError> {
        self.column.update(index, update)?;
        // the raster spans the sample, so it follows any change of width
        let width = self.column.sample().map(|(_, sample)| sample.width);
        if let (Some(width), Some(scan)) = (width, self.scan.as_mut()) {
            scan.raster.width = width;
        }
        debug!("Updated component {} ({}).", index, self.column.component(index)?.name());
        Ok(())
    }

    /// Changes the beam and regenerates the rays.
    pub fn update_beam(&mut self, update: &BeamUpdate) -> Result<(), ColumnError> {
        let beam = self.beam.updated(update)?;
        let (rays, layout) = beam::generate(&beam, self.column.num_steps())?;
        self.beam = beam;
        self.rays = rays;
        self.layout = layout;
        Ok(())
    }

    fn sample(&self) -> Result<(usize, &Sample), ColumnError> {
        self.column.sample().ok_or(ColumnError::MissingComponent("sample"))
    }

    /// Ray positions at the sample plane, relative to the sample centre.
    pub fn sample_rays(&self) -> Result<(Vec<f64>, Vec<f64>), ColumnError> {
        let (step, sample) = self.sample()?;
        let rays = self.rays.step(step);
        let x = rays.row(X).iter().map(|x| x - sample.x).collect();
        let y = rays.row(Y).iter().map(|y| y - sample.y).collect();
        Ok((x, y))
    }

    /// Ray positions at the detector plane.
    pub fn detector_rays(&self) -> (Vec<f64>, Vec<f64>) {
        self.rays.positions(self.rays.num_steps() - 1)
    }

    /// Forms the detector images of the last pass.
    pub fn detector_image(&self) -> Result<DetectorImages, ColumnError> {
        let (_, sample) = self.sample()?;
        let (sample_x, sample_y) = self.sample_rays()?;
        let (detector_x, detector_y) = self.detector_rays();
        form_image(
            (&sample_x, &sample_y),
            (&detector_x, &detector_y),
            &sample.image,
            sample.width,
            &self.detector,
            &self.transform,
        )
    }

    pub fn scan_raster(&self) -> Option<&ScanRaster> {
        self.scan.as_ref().map(|scan| &scan.raster)
    }

    pub fn scan_raster_mut(&mut self) -> Option<&mut ScanRaster> {
        self.scan.as_mut().map(|scan| &mut scan.raster)
    }

    fn scan_setup(&self) -> Result<&ScanState, ColumnError> {
        self.scan
            .as_ref()
            .ok_or(ColumnError::MissingComponent("scan configuration"))
    }

    /// Sets the scan lens so the beam crosses over `overfocus` above the sample.
    ///
    /// Returns the new focal length.
    pub fn set_lens_f_from_overfocus(&mut self, overfocus: f64) -> Result<f64, ColumnError> {
        ensure_finite("model", "overfocus", overfocus)?;
        let index = self.scan_setup()?.setup.lens;
        let lens_z = lens(&self.column, index)?.z;
        let sample_z = self.sample()?.1.z;
        let f = -(lens_z - sample_z - overfocus);
        self.update_component(index, &ComponentUpdate::Lens(LensUpdate { f: Some(f) }))?;
        Ok(f)
    }

    /// Sets the parallel beam radius that the scan lens converges with a
    /// half angle of `semiconv`.
    ///
    /// Returns the new beam radius.
    pub fn set_beam_radius_from_semiconv(&mut self, semiconv: f64) -> Result<f64, ColumnError> {
        ensure_finite("model", "semiconv", semiconv)?;
        let index = self.scan_setup()?.setup.lens;
        let f = lens(&self.column, index)?.f;
        let width = f.abs() * semiconv.tan();
        if self.beam.beam_type != BeamType::Parallel {
            warn!(
                "Beam width set from semi-convergence angle has no effect on a {:?} beam.",
                self.beam.beam_type
            );
        }
        self.update_beam(&BeamUpdate {
            width: Some(width),
            ..Default::default()
        })?;
        Ok(width)
    }

    /// Sets the scan and descan coils for the current raster position.
    pub fn update_scan_coils(&mut self) -> Result<ScanSettings, ColumnError> {
        let state = self.scan_setup()?;
        let setup = state.setup;
        let (sx, sy) = state.raster.offset();
        let scan = double_deflector(&self.column, setup.scan_coils)?;
        let descan = double_deflector(&self.column, setup.descan_coils)?;
        let scan_lens = lens(&self.column, setup.lens)?;
        let settings =
            ScanDescanGeometry::new(scan, scan_lens.z, scan_lens.f, descan)?.solve(sx, sy);

        let (scan_update, descan_update) = (settings.scan_update(), settings.descan_update());
        scan.clone().update(&scan_update)?;
        descan.clone().update(&descan_update)?;
        self.column
            .update(setup.scan_coils, &ComponentUpdate::DoubleDeflector(scan_update))?;
        self.column
            .update(setup.descan_coils, &ComponentUpdate::DoubleDeflector(descan_update))?;
        Ok(settings)
    }

    /// Runs a full raster, returning the detector intensity image at every
    /// scan position in raster order.
    pub fn scan_images(&mut self) -> Result<Vec<DMatrix<f64>>, ColumnError> {
        let positions = match self.scan_raster_mut() {
            Some(raster) => {
                raster.reset();
                raster.num_positions()
            }
            None => return Err(ColumnError::MissingComponent("scan configuration")),
        };
        let mut images = Vec::with_capacity(positions);
        loop {
            self.update_scan_coils()?;
            self.step()?;
            images.push(self.detector_image()?.intensity);
            let finished = self.scan_raster_mut().map_or(true, |raster| raster.advance());
            if finished {
                break;
            }
        }
        info!("Scanned {} positions.", images.len());
        Ok(images)
    }
}

fn double_deflector(column: &Column, index: usize) -> Result<&DoubleDeflector, ColumnError> {
    match column.component(index)? {
        Component::DoubleDeflector(deflector) => Ok(deflector),
        _ => Err(ColumnError::ComponentMismatch {
            index,
            expected: "Double Deflector",
        }),
    }
}

fn lens(column: &Column, index: usize) -> Result<&Lens, ColumnError> {
    match column.component(index)? {
        Component::Lens(lens) => Ok(lens),
        _ => Err(ColumnError::ComponentMismatch {
            index,
            expected: "Lens",
        }),
    }
}
