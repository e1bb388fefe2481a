//! Integration tests for 4D-STEM raster scanning
//!
//! Scan coils shift the probe across the sample; the descan coils must undo the
//! shift so the pattern on the detector does not move with the scan position.

#[cfg(test)]
pub mod tests {
    use crate::configuration::ModelConfig;
    use crate::model::Model;
    use assert_approx_eq::assert_approx_eq;

    fn stem_model() -> Model {
        ModelConfig::from_yaml_str(include_str!("../../demos/4dstem.yaml"))
            .unwrap()
            .build()
            .unwrap()
    }

    fn scan_to(model: &mut Model, pixel_x: usize, pixel_y: usize) -> (f64, f64) {
        let raster = model.scan_raster_mut().unwrap();
        raster.set_position(pixel_x, pixel_y).unwrap();
        let offset = raster.offset();
        model.update_scan_coils().unwrap();
        model.step().unwrap();
        offset
    }

    #[test]
    fn centre_of_raster_leaves_coils_off() {
        let mut model = stem_model();
        model.scan_raster_mut().unwrap().width = 0.0;
        let settings = model.update_scan_coils().unwrap();
        assert_eq!(settings.scan.updefx, 0.0);
        assert_eq!(settings.scan.lowdefy, 0.0);
        assert_eq!(settings.descan.updefx, 0.0);
        assert_eq!(settings.descan.lowdefy, 0.0);
    }

    #[test]
    fn probe_follows_raster_offset() {
        let mut model = stem_model();
        for &(px, py) in [(0, 0), (7, 2), (3, 5)].iter() {
            let (sx, sy) = scan_to(&mut model, px, py);
            let (x, y) = model.sample_rays().unwrap();
            // ray 0 is the chief ray of the parallel beam
            assert_approx_eq!(x[0], sx);
            assert_approx_eq!(y[0], sy);
        }
    }

    #[test]
    fn descan_recentres_detector_pattern() {
        let mut model = stem_model();
        scan_to(&mut model, 0, 0);
        let (x_first, y_first) = model.detector_rays();
        scan_to(&mut model, 7, 3);
        let (x_second, y_second) = model.detector_rays();
        assert_eq!(x_first.len(), x_second.len());
        for ray in 0..x_first.len() {
            assert_approx_eq!(x_first[ray], x_second[ray]);
            assert_approx_eq!(y_first[ray], y_second[ray]);
        }
    }

    #[test]
    fn full_scan_returns_one_image_per_position() {
        let mut model = stem_model();
        let images = model.scan_images().unwrap();
        assert_eq!(images.len(), 64);
        assert!(images.iter().all(|image| image.shape() == (128, 128)));
        assert_eq!(model.scan_raster().unwrap().pixel_x, 0);
        assert!(images.iter().any(|image| image.sum() > 0.0));
    }
}
