//! Tests that run whole columns and compare against analytic ray optics.

pub mod column_optics;
pub mod scanning;
