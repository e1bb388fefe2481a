//! Generation of the initial ray batch.
//!
//! Parallel and point beams fill a disc with concentric rings of rays; axial
//! beams sweep the rays along one or both transverse axes. Every beam finishes
//! by adding a constant tilt to all slopes.

use crate::constant::{
    DEFAULT_BEAM_WIDTH, DEFAULT_NUM_RAYS, DEFAULT_SEMI_ANGLE, PI, SLOPE_X, SLOPE_Y, X, Y,
};
use crate::error::{ensure_finite, ensure_non_negative, ColumnError};
use crate::maths::linspace;
use crate::ray::RayBatch;
use nalgebra::Matrix5xX;
use serde::{Deserialize, Serialize};

/// Shape of the generated beam.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeamType {
    /// A disc of rays parallel to the axis, of radius `width`.
    Parallel,
    /// A cone of rays diverging from the origin with half angle `semi_angle`.
    Point,
    /// A cross of rays diverging along the x and y axes.
    Axial,
    /// Rays diverging along the x axis only, for side-view diagrams.
    XAxial,
}

/// Parameters of the beam leaving the source plane.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeamParameters {
    pub beam_type: BeamType,
    pub num_rays: usize,
    /// Half angle of point and axial beams, radians.
    pub semi_angle: f64,
    /// Radius of a parallel beam, m.
    pub width: f64,
    /// Constant slope added to every ray along x.
    pub tilt_x: f64,
    /// Constant slope added to every ray along y.
    pub tilt_y: f64,
}

impl Default for BeamParameters {
    fn default() -> Self {
        BeamParameters {
            beam_type: BeamType::Point,
            num_rays: DEFAULT_NUM_RAYS,
            semi_angle: DEFAULT_SEMI_ANGLE,
            width: DEFAULT_BEAM_WIDTH,
            tilt_x: 0.0,
            tilt_y: 0.0,
        }
    }
}

impl BeamParameters {
    pub fn validate(&self) -> Result<(), ColumnError> {
        if self.num_rays < 1 {
            return Err(ColumnError::InvalidRayCount(self.num_rays));
        }
        ensure_non_negative("beam", "semi_angle", self.semi_angle)?;
        ensure_non_negative("beam", "width", self.width)?;
        ensure_finite("beam", "tilt_x", self.tilt_x)?;
        ensure_finite("beam", "tilt_y", self.tilt_y)
    }
}

/// New beam parameters; `None` leaves a field unchanged.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BeamUpdate {
    pub beam_type: Option<BeamType>,
    pub num_rays: Option<usize>,
    pub semi_angle: Option<f64>,
    pub width: Option<f64>,
    pub tilt_x: Option<f64>,
    pub tilt_y: Option<f64>,
}

impl BeamParameters {
    /// Returns the parameters with `update` applied, validated.
    pub fn updated(&self, update: &BeamUpdate) -> Result<BeamParameters, ColumnError> {
        let mut params = self.clone();
        if let Some(beam_type) = update.beam_type {
            params.beam_type = beam_type;
        }
        if let Some(num_rays) = update.num_rays {
            params.num_rays = num_rays;
        }
        if let Some(semi_angle) = update.semi_angle {
            params.semi_angle = semi_angle;
        }
        if let Some(width) = update.width {
            params.width = width;
        }
        if let Some(tilt_x) = update.tilt_x {
            params.tilt_x = tilt_x;
        }
        if let Some(tilt_y) = update.tilt_y {
            params.tilt_y = tilt_y;
        }
        params.validate()?;
        Ok(params)
    }
}

/// Distribution of the rays of a ring-filled beam.
#[derive(Clone, Debug, PartialEq)]
pub struct RingLayout {
    /// Number of rays on each ring, innermost first. Ring 0 is the single central ray.
    pub counts: Vec<usize>,
    /// Radius fraction of each ring, evenly spaced over `[0, 1]`.
    pub fractions: Vec<f64>,
}

impl RingLayout {
    /// Distributes `num_rays` over concentric rings.
    ///
    /// Ring `i` nominally holds `round(2 pi i)` rays. The number of rings is the
    /// largest that fits within `num_rays`; the remaining rays are shared out
    /// from the outermost ring inwards in proportion to the nominal occupancy.
    /// Ring 0 then holds the central ray, taken from the outermost ring.
    ///
    /// Fewer rays than the first ring holds (2 to 5) are placed on a single ring
    /// around the central ray.
    pub fn new(num_rays: usize) -> Result<Self, ColumnError> {
        if num_rays < 1 {
            return Err(ColumnError::InvalidRayCount(num_rays));
        }
        let counts = ring_counts(num_rays);
        let fractions = linspace(0.0, 1.0, counts.len());
        Ok(RingLayout { counts, fractions })
    }

    pub fn num_rays(&self) -> usize {
        self.counts.iter().sum()
    }

    /// `(radius fraction, angle)` of every ray, in ray order.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.counts
            .iter()
            .zip(self.fractions.iter())
            .flat_map(|(&count, &fraction)| {
                (0..count).map(move |j| (fraction, j as f64 * 2.0 * PI / count as f64))
            })
    }
}

fn nominal_ring_occupancy(ring: usize) -> usize {
    (2.0 * PI * ring as f64).round() as usize
}

fn ring_counts(num_rays: usize) -> Vec<usize> {
    let mut counts = vec![0];
    let mut total = 0;
    loop {
        let next = nominal_ring_occupancy(counts.len());
        if total + next > num_rays {
            break;
        }
        counts.push(next);
        total += next;
    }

    if counts.len() == 1 {
        return if num_rays == 1 {
            vec![1]
        } else {
            vec![1, num_rays - 1]
        };
    }

    let remainder = num_rays - total;
    let mut added = 0;
    for ring in (0..counts.len()).rev() {
        if added >= remainder {
            break;
        }
        let share = (counts[ring] as f64 / total as f64 * remainder as f64).ceil() as usize;
        let share = share.min(remainder - added);
        counts[ring] += share;
        added += share;
    }

    let last = counts.len() - 1;
    counts[0] = 1;
    counts[last] -= 1;
    counts
}

/// Fills `rays` with a disc of parallel rays of radius `outer_radius`.
pub fn parallel_beam(rays: &mut Matrix5xX<f64>, outer_radius: f64) -> Result<RingLayout, ColumnError> {
    let layout = RingLayout::new(rays.ncols())?;
    for (i, (fraction, angle)) in layout.points().enumerate() {
        let radius = outer_radius * fraction;
        rays[(X, i)] = radius * angle.cos();
        rays[(Y, i)] = radius * angle.sin();
    }
    Ok(layout)
}

/// Fills `rays` with a cone diverging from the origin with half angle `semi_angle`.
pub fn point_beam(rays: &mut Matrix5xX<f64>, semi_angle: f64) -> Result<RingLayout, ColumnError> {
    let layout = RingLayout::new(rays.ncols())?;
    for (i, (fraction, angle)) in layout.points().enumerate() {
        let slope = (semi_angle * fraction).tan();
        rays[(SLOPE_X, i)] = slope * angle.cos();
        rays[(SLOPE_Y, i)] = slope * angle.sin();
    }
    Ok(layout)
}

/// Fills `rays` with a cross: the first half sweeps the x slope, the second
/// half the y slope, both over `[-semi_angle, semi_angle]`.
///
/// The x half takes `ceil(N / 2)` rays, so an odd count puts the extra ray on
/// the x sweep. This is not round-half-even: N = 5 gives 3 x rays, not 2.
pub fn axial_beam(rays: &mut Matrix5xX<f64>, semi_angle: f64) {
    let num_rays = rays.ncols();
    let x_rays = (num_rays + 1) / 2;
    for (i, angle) in linspace(-semi_angle, semi_angle, x_rays).into_iter().enumerate() {
        rays[(SLOPE_X, i)] = angle.tan();
    }
    for (i, angle) in linspace(-semi_angle, semi_angle, num_rays - x_rays)
        .into_iter()
        .enumerate()
    {
        rays[(SLOPE_Y, x_rays + i)] = angle.tan();
    }
}

/// Fills `rays` with a sweep of the x slope over `[-semi_angle, semi_angle]`.
pub fn x_axial_beam(rays: &mut Matrix5xX<f64>, semi_angle: f64) {
    let num_rays = rays.ncols();
    for (i, angle) in linspace(-semi_angle, semi_angle, num_rays).into_iter().enumerate() {
        rays[(SLOPE_X, i)] = angle.tan();
    }
}

/// Creates a ray batch of `num_steps` z planes whose first step holds the beam.
///
/// Returns the ring layout for ring-filled beams.
pub fn generate(
    params: &BeamParameters,
    num_steps: usize,
) -> Result<(RayBatch, Option<RingLayout>), ColumnError> {
    params.validate()?;
    let mut batch = RayBatch::new(num_steps, params.num_rays);
    let source = batch.step_mut(0);
    let layout = match params.beam_type {
        BeamType::Parallel => Some(parallel_beam(source, params.width)?),
        BeamType::Point => Some(point_beam(source, params.semi_angle)?),
        BeamType::Axial => {
            axial_beam(source, params.semi_angle);
            None
        }
        BeamType::XAxial => {
            x_axial_beam(source, params.semi_angle);
            None
        }
    };
    batch.add_tilt(params.tilt_x, params.tilt_y);
    Ok((batch, layout))
}
