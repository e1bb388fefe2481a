pub mod beam;
pub mod column;
pub mod component;
pub mod configuration;
pub mod constant;
pub mod error;
pub mod image;
pub mod maths;
pub mod matrix;
pub mod model;
pub mod output;
pub mod propagate;
pub mod ray;
pub mod scan;

#[cfg(test)]
mod integration_tests;
