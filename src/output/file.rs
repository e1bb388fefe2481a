//! Writes output files containing ray trajectories.

use crate::ray::RayBatch;
use byteorder::{LittleEndian, WriteBytesExt};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

type Endianness = LittleEndian;

/// A trait implemented for each file output format.
///
/// A trajectory file holds one frame per z position of the column, from the
/// source to the detector.
pub trait Format<W: Write> {
    /// Writes data indicating the start of a frame.
    fn write_frame_header(writer: &mut W, step: usize, z: f64, ray_number: usize)
        -> io::Result<()>;

    /// Writes the state `[x, slope_x, y, slope_y]` of one ray.
    fn write_ray(writer: &mut W, ray: usize, state: [f64; 4]) -> io::Result<()>;
}

/// Prints files in a [Format] that is human readable.
///
/// Each frame begins with the line `step n, z, rayNumber`, followed by one
/// line `id: x,slope_x,y,slope_y` per ray.
pub struct Text;

impl<W: Write> Format<W> for Text {
    fn write_frame_header(
        writer: &mut W,
        step: usize,
        z: f64,
        ray_number: usize,
    ) -> io::Result<()> {
        writeln!(writer, "step {}, {:?}, {}", step, z, ray_number)
    }

    fn write_ray(writer: &mut W, ray: usize, state: [f64; 4]) -> io::Result<()> {
        writeln!(
            writer,
            "{}: {:?},{:?},{:?},{:?}",
            ray, state[0], state[1], state[2], state[3]
        )
    }
}

/// Writes frames as little endian binary.
///
/// A frame header is `u64` step, `f64` z and `u64` ray number; each ray is a
/// `u64` id followed by four `f64`.
pub struct Binary;

impl<W: Write> Format<W> for Binary {
    fn write_frame_header(
        writer: &mut W,
        step: usize,
        z: f64,
        ray_number: usize,
    ) -> io::Result<()> {
        writer.write_u64::<Endianness>(step as u64)?;
        writer.write_f64::<Endianness>(z)?;
        writer.write_u64::<Endianness>(ray_number as u64)
    }

    fn write_ray(writer: &mut W, ray: usize, state: [f64; 4]) -> io::Result<()> {
        writer.write_u64::<Endianness>(ray as u64)?;
        for element in state.iter() {
            writer.write_f64::<Endianness>(*element)?;
        }
        Ok(())
    }
}

/// Writes every step of `rays` to `writer` in format `F`.
pub fn write_trajectories<F, W>(writer: &mut W, rays: &RayBatch, z_positions: &[f64]) -> io::Result<()>
where
    F: Format<W>,
    W: Write,
{
    if z_positions.len() != rays.num_steps() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "{} z positions for a ray batch of {} steps",
                z_positions.len(),
                rays.num_steps()
            ),
        ));
    }
    for (step, z) in z_positions.iter().enumerate() {
        let slice = rays.step(step);
        F::write_frame_header(writer, step, *z, slice.ncols())?;
        for (ray, state) in slice.column_iter().enumerate() {
            F::write_ray(writer, ray, [state[0], state[1], state[2], state[3]])?;
        }
    }
    writer.flush()
}

/// Creates `path` and writes the trajectories to it in format `F`.
///
/// For example, `write_file::<Text, _>("rays.txt", ...)`.
pub fn write_file<F, P>(path: P, rays: &RayBatch, z_positions: &[f64]) -> io::Result<()>
where
    F: Format<BufWriter<File>>,
    P: AsRef<Path>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    write_trajectories::<F, _>(&mut writer, rays, z_positions)
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use byteorder::ReadBytesExt;
    use std::io::Cursor;

    fn batch() -> RayBatch {
        let mut rays = RayBatch::new(2, 2);
        rays.step_mut(0)[(0, 1)] = 0.5;
        rays.step_mut(1)[(3, 0)] = -0.25;
        rays
    }

    #[test]
    fn test_text_frames() {
        let mut buffer = Vec::new();
        write_trajectories::<Text, _>(&mut buffer, &batch(), &[1.0, 0.0]).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "step 0, 1.0, 2");
        assert_eq!(lines[2], "1: 0.5,0.0,0.0,0.0");
        assert_eq!(lines[4], "0: 0.0,0.0,0.0,-0.25");
    }

    #[test]
    fn test_binary_frames() {
        let mut buffer = Vec::new();
        write_trajectories::<Binary, _>(&mut buffer, &batch(), &[1.0, 0.0]).unwrap();
        assert_eq!(buffer.len(), 2 * (24 + 2 * 40));
        let mut reader = Cursor::new(buffer);
        assert_eq!(reader.read_u64::<Endianness>().unwrap(), 0);
        assert_eq!(reader.read_f64::<Endianness>().unwrap(), 1.0);
        assert_eq!(reader.read_u64::<Endianness>().unwrap(), 2);
        assert_eq!(reader.read_u64::<Endianness>().unwrap(), 0);
    }

    #[test]
    fn test_mismatched_z_positions_rejected() {
        let mut buffer = Vec::new();
        let result = write_trajectories::<Text, _>(&mut buffer, &batch(), &[1.0]);
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::InvalidInput);
    }
}
