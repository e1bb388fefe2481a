//! Mathematical utilities

use crate::constant::DEG_TO_RAD;

/// Sign of a value, with `sign(0) == 0`.
///
/// Unlike [f64::signum], a ray sitting exactly on an axis is assigned neither side.
pub fn sign(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Evenly spaced samples over `[start, stop]`, endpoints included.
///
/// A single sample sits at `start`; zero samples gives an empty vector.
pub fn linspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (num - 1) as f64;
            (0..num)
                .map(|i| if i == num - 1 { stop } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Rotates the point `(x, y)` about the origin by `degrees`, anticlockwise.
pub fn rotate_deg(x: f64, y: f64, degrees: f64) -> (f64, f64) {
    let (sin, cos) = (degrees * DEG_TO_RAD).sin_cos();
    (x * cos - y * sin, x * sin + y * cos)
}

/// Euclidean distance between the points `(x, y)` and `(xc, yc)`.
pub fn distance(x: f64, y: f64, xc: f64, yc: f64) -> f64 {
    (x - xc).hypot(y - yc)
}
