//! Integration tests for propagation through simple columns
//!
//! These tests compare the ray positions at the detector with the exact results of
//! paraxial ray optics for drifts, a single thin lens and an aperture.

#[cfg(test)]
pub mod tests {
    use crate::beam::{BeamParameters, BeamType};
    use crate::column::Column;
    use crate::component::{Aperture, Component, Lens, Sample};
    use crate::image::PixelGrid;
    use crate::model::Model;
    use crate::propagate::propagate;
    use crate::ray::RayBatch;
    use assert_approx_eq::assert_approx_eq;
    use nalgebra::DMatrix;
    use rand::Rng;

    fn lens_column() -> Column {
        Column::new(vec![Component::Lens(Lens::new("Lens", 0.5, -0.1).unwrap())], 1.0).unwrap()
    }

    #[test]
    fn parallel_beam_is_focused_and_inverted() {
        let beam = BeamParameters {
            beam_type: BeamType::Parallel,
            num_rays: 5,
            width: 0.2,
            ..Default::default()
        };
        let mut model = Model::new(lens_column(), beam, PixelGrid::default()).unwrap();
        let rays = model.step().unwrap().clone();
        assert_eq!(rays.num_rays(), 5);

        // on-axis ray is untouched
        for step in 0..rays.num_steps() {
            assert_eq!(rays.x(step, 0), 0.0);
            assert_eq!(rays.y(step, 0), 0.0);
            assert_eq!(rays.slope_x(step, 0), 0.0);
            assert_eq!(rays.slope_y(step, 0), 0.0);
        }

        for ray in 0..rays.num_rays() {
            let (x0, y0) = (rays.x(0, ray), rays.y(0, ray));
            assert_approx_eq!(rays.x(2, ray), -4.0 * x0);
            assert_approx_eq!(rays.y(2, ray), -4.0 * y0);

            // rays cross the axis one focal length below the lens
            let crossover_x = rays.x(1, ray) + rays.slope_x(1, ray) * (0.4 - 0.5);
            let crossover_y = rays.y(1, ray) + rays.slope_y(1, ray) * (0.4 - 0.5);
            assert_approx_eq!(crossover_x, 0.0);
            assert_approx_eq!(crossover_y, 0.0);
        }
    }

    #[test]
    fn aperture_blocks_rays_on_the_plate_only() {
        let column = Column::new(
            vec![Component::Aperture(Aperture::new("Aperture", 0.5, 0.1, 0.2).unwrap())],
            1.0,
        )
        .unwrap();
        let mut rays = RayBatch::new(column.num_steps(), 4);
        for (ray, x) in [0.0, 0.05, 0.15, 0.3].iter().enumerate() {
            rays.step_mut(0)[(0, ray)] = *x;
        }
        let propagation = propagate(&column, &mut rays).unwrap();
        assert_eq!(propagation.blocked_by(0), &[2]);
        assert_eq!(propagation.allowed(4), vec![0, 1, 3]);
        assert_eq!(rays.x(2, 2), 0.15);
    }

    #[test]
    fn aperture_inner_edge_is_part_of_the_plate() {
        let column = Column::new(
            vec![Component::Aperture(Aperture::new("Aperture", 0.5, 0.05, 0.25).unwrap())],
            1.0,
        )
        .unwrap();
        let mut rays = RayBatch::new(column.num_steps(), 4);
        for (ray, x) in [0.0, 0.05, 0.15, 0.3].iter().enumerate() {
            rays.step_mut(0)[(0, ray)] = *x;
        }
        let propagation = propagate(&column, &mut rays).unwrap();
        assert_eq!(propagation.blocked_by(0), &[1, 2]);
        assert_eq!(propagation.allowed(4), vec![0, 3]);
    }

    #[test]
    fn empty_column_is_a_single_drift() {
        let column = Column::new(Vec::new(), 1.0).unwrap();
        let mut rays = RayBatch::new(column.num_steps(), 100);
        let mut rng = rand::thread_rng();
        for ray in 0..100 {
            let slice = rays.step_mut(0);
            slice[(0, ray)] = rng.gen_range(-0.1..0.1);
            slice[(1, ray)] = rng.gen_range(-0.01..0.01);
            slice[(2, ray)] = rng.gen_range(-0.1..0.1);
            slice[(3, ray)] = rng.gen_range(-0.01..0.01);
        }
        let propagation = propagate(&column, &mut rays).unwrap();
        assert_eq!(propagation.total_blocked(), 0);
        assert!(rays.is_homogeneous());
        for ray in 0..100 {
            assert_approx_eq!(rays.x(1, ray), rays.x(0, ray) - rays.slope_x(0, ray));
            assert_approx_eq!(rays.y(1, ray), rays.y(0, ray) - rays.slope_y(0, ray));
            assert_eq!(rays.slope_x(1, ray), rays.slope_x(0, ray));
            assert_eq!(rays.slope_y(1, ray), rays.slope_y(0, ray));
        }
    }

    #[test]
    fn sample_image_is_carried_to_matching_detector() {
        let image = DMatrix::from_fn(8, 8, |row, col| (row * 8 + col) as f64);
        let column = Column::new(
            vec![Component::Sample(Sample::new("Sample", 0.5, 1.0, image.clone()).unwrap())],
            1.0,
        )
        .unwrap();
        let beam = BeamParameters {
            beam_type: BeamType::Parallel,
            num_rays: 19,
            width: 0.5,
            ..Default::default()
        };
        let detector = PixelGrid::new(1.0, 8).unwrap();
        let mut model = Model::new(column, beam, detector).unwrap();
        model.step().unwrap();
        let images = model.detector_image().unwrap();

        assert_eq!(images.sample_pixels, images.detector_pixels);
        assert_eq!(images.hit_count.iter().sum::<u32>(), 0);
        let mut hits = 0;
        for &(px, py) in images.detector_pixels.iter() {
            if detector.contains((px, py)) {
                let (row, col) = (py as usize, px as usize);
                assert_eq!(images.intensity[(row, col)], image[(row, col)]);
                hits += 1;
            }
        }
        assert!(hits > 0);
    }
}
