//! Line segments tracing each ray through the column, for plotting.

use crate::column::Column;
use crate::error::ColumnError;
use crate::propagate::Propagation;
use crate::ray::RayBatch;

/// Vertices of the line segments traced by a propagated ray batch.
///
/// Each ray contributes `2 * (steps - 1)` consecutive `[x, y, z]` vertices,
/// one pair per segment between neighbouring z positions. A ray blocked by a
/// component stops at that component: all of its later vertices repeat the
/// point where it was blocked.
#[derive(Clone, Debug, PartialEq)]
pub struct LineVertices {
    pub vertices: Vec<[f64; 3]>,
    /// Rays that no component blocks.
    pub allowed: Vec<usize>,
}

impl LineVertices {
    pub fn vertices_per_ray(num_steps: usize) -> usize {
        2 * num_steps.saturating_sub(1)
    }

    /// The vertices of a single ray.
    pub fn ray(&self, ray: usize, num_steps: usize) -> &[[f64; 3]] {
        let n = Self::vertices_per_ray(num_steps);
        &self.vertices[ray * n..(ray + 1) * n]
    }
}

pub fn ray_segments(
    rays: &RayBatch,
    column: &Column,
    propagation: &Propagation,
) -> Result<LineVertices, ColumnError> {
    if rays.num_steps() != column.num_steps() {
        return Err(ColumnError::StepCountMismatch {
            expected: column.num_steps(),
            found: rays.num_steps(),
        });
    }
    let num_rays = rays.num_rays();
    let num_steps = rays.num_steps();
    let z_positions = column.z_positions();

    // Step at which each ray was first stopped, if any.
    let mut stopped_at: Vec<Option<usize>> = vec![None; num_rays];
    for index in 0..column.len() {
        let blocked = propagation.blocked_by(index);
        if blocked.is_empty() {
            continue;
        }
        let step = column.element_steps(index)?[0];
        for &ray in blocked.iter().filter(|&&ray| ray < num_rays) {
            let stop = stopped_at[ray].get_or_insert(step);
            *stop = (*stop).min(step);
        }
    }

    let mut vertices = Vec::with_capacity(num_rays * LineVertices::vertices_per_ray(num_steps));
    for (ray, stop) in stopped_at.iter().enumerate() {
        let point = |step: usize| {
            let step = stop.map_or(step, |s| step.min(s));
            [rays.x(step, ray), rays.y(step, ray), z_positions[step]]
        };
        for step in 1..num_steps {
            vertices.push(point(step - 1));
            vertices.push(point(step));
        }
    }

    Ok(LineVertices {
        vertices,
        allowed: propagation.allowed(num_rays),
    })
}
