//! Create output from the simulation, such as ray trajectories and detector images.

pub mod file;
pub mod image_csv;
pub mod lines;
