//! Ray-transfer matrices of the idealised column components.
//!
//! Every matrix acts on the homogeneous ray state `[x, slope_x, y, slope_y, 1]`.
//! Slope offsets (deflections) live in the last column so that they are applied
//! by the same matrix multiply as the linear terms. All matrices keep the last
//! row at `[0, 0, 0, 0, 1]`.

use crate::constant::{DEG_TO_RAD, HOMOGENEOUS, SLOPE_X, SLOPE_Y, X, Y};
use crate::error::ColumnError;
use nalgebra::Matrix5;

/// Free-space propagation over a signed distance `d` along the optical axis.
///
/// `x += d * slope_x` and `y += d * slope_y`; slopes are unchanged.
pub fn drift(d: f64) -> Matrix5<f64> {
    let mut matrix = Matrix5::identity();
    matrix[(X, SLOPE_X)] = d;
    matrix[(Y, SLOPE_Y)] = d;
    matrix
}

/// Thin lens of focal length `f`, shared between both axes.
pub fn lens(f: f64) -> Result<Matrix5<f64>, ColumnError> {
    astigmatic_lens(f, f)
}

/// Thin lens with independent focal lengths `fx` and `fy`.
///
/// `slope_x += -x / fx` and `slope_y += -y / fy`. A focal length of exactly
/// zero has no meaning and is rejected.
pub fn astigmatic_lens(fx: f64, fy: f64) -> Result<Matrix5<f64>, ColumnError> {
    if fx == 0.0 || fy == 0.0 {
        return Err(ColumnError::ZeroFocalLength {
            name: String::from("lens matrix"),
        });
    }
    let mut matrix = Matrix5::identity();
    matrix[(SLOPE_X, X)] = -1.0 / fx;
    matrix[(SLOPE_Y, Y)] = -1.0 / fy;
    Ok(matrix)
}

/// Position independent slope kick.
pub fn deflector(defx: f64, defy: f64) -> Matrix5<f64> {
    let mut matrix = Matrix5::identity();
    matrix[(SLOPE_X, HOMOGENEOUS)] = defx;
    matrix[(SLOPE_Y, HOMOGENEOUS)] = defy;
    matrix
}

/// Rotation of the transverse positions about the optical axis by `degrees`.
///
/// Slopes are left untouched; this emulates the rotation of a coil relative to
/// the scan reference frame.
pub fn rotation(degrees: f64) -> Matrix5<f64> {
    let (sin, cos) = (degrees * DEG_TO_RAD).sin_cos();
    let mut matrix = Matrix5::identity();
    matrix[(X, X)] = cos;
    matrix[(X, Y)] = -sin;
    matrix[(Y, X)] = sin;
    matrix[(Y, Y)] = cos;
    matrix
}

/// Lower element of a double deflector: a deflection followed by the scan rotation.
pub fn rotated_deflector(defx: f64, defy: f64, scan_rotation: f64) -> Matrix5<f64> {
    rotation(scan_rotation) * deflector(defx, defy)
}

/// Bookkeeping matrix of a biprism.
///
/// Stores `deflection * sin(theta)` and `deflection * cos(theta)` as slope offsets.
/// These are never multiplied in directly: propagation scales them by the sign of
/// the ray's x and y position respectively.
pub fn biprism(deflection_x: f64, deflection_y: f64) -> Matrix5<f64> {
    deflector(deflection_x, deflection_y)
}

/// Components with no effect on the ray state (apertures, samples).
pub fn identity() -> Matrix5<f64> {
    Matrix5::identity()
}
