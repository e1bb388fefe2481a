//! Errors raised while building or running a column.
//!
//! Every variant is recoverable: the caller corrects the offending input and
//! invokes the operation again. Nothing is mutated by a call that fails.

use thiserror::Error;

/// Errors that can occur while configuring or propagating a column.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ColumnError {
    #[error("component '{name}': focal length must be non-zero")]
    ZeroFocalLength { name: String },

    #[error("component '{name}': parameter `{field}` must be finite, got {value}")]
    NonFiniteParameter {
        name: String,
        field: &'static str,
        value: f64,
    },

    #[error("'{name}': `{field}` must not be negative, got {value}")]
    NegativeDimension {
        name: String,
        field: &'static str,
        value: f64,
    },

    #[error("aperture '{name}': inner radius {inner} must be smaller than outer radius {outer}")]
    InvalidApertureRadii { name: String, inner: f64, outer: f64 },

    #[error("ray count must be at least 1, got {0}")]
    InvalidRayCount(usize),

    #[error("biprism '{name}': wire orientation must be 0 or pi/2, got {theta}")]
    InvalidWireOrientation { name: String, theta: f64 },

    #[error("z positions must strictly decrease towards the detector: '{name}' at z = {z} is not below {previous}")]
    NonDecreasingZ { name: String, z: f64, previous: f64 },

    #[error("double deflector '{name}': upper element z = {z_up} must be above lower element z = {z_low}")]
    DoubleDeflectorOrder { name: String, z_up: f64, z_low: f64 },

    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("component {index} is not a {expected}")]
    ComponentMismatch { index: usize, expected: &'static str },

    #[error("update does not apply to {kind} '{name}'")]
    UpdateMismatch { name: String, kind: &'static str },

    #[error("column has no {0}")]
    MissingComponent(&'static str),

    #[error("component index {index} out of range for a column of {len} components")]
    ComponentIndex { index: usize, len: usize },

    #[error("ray batch has {found} steps but the column needs {expected}")]
    StepCountMismatch { expected: usize, found: usize },

    #[error("coordinate arrays differ in length: {0} and {1}")]
    CoordinateMismatch(usize, usize),

    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Checks that `value` is finite, naming the component and field otherwise.
pub(crate) fn ensure_finite(name: &str, field: &'static str, value: f64) -> Result<(), ColumnError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ColumnError::NonFiniteParameter {
            name: name.to_string(),
            field,
            value,
        })
    }
}

/// Checks that `value` is finite and not negative.
pub(crate) fn ensure_non_negative(
    name: &str,
    field: &'static str,
    value: f64,
) -> Result<(), ColumnError> {
    ensure_finite(name, field, value)?;
    if value < 0.0 {
        return Err(ColumnError::NegativeDimension {
            name: name.to_string(),
            field,
            value,
        });
    }
    Ok(())
}
