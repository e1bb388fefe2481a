//! CSV export of detector images and ray pixel coordinates.

use crate::image::DetectorImages;
use nalgebra::DMatrix;
use serde::Serialize;
use std::io::Write;

/// Writes `image` with one record per row.
pub fn write_image<W, T>(writer: W, image: &DMatrix<T>) -> Result<(), csv::Error>
where
    W: Write,
    T: nalgebra::Scalar + Serialize,
{
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    for row in image.row_iter() {
        let record: Vec<&T> = row.iter().collect();
        wtr.serialize(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes the sample and detector pixel of every ray.
pub fn write_pixel_coords<W: Write>(writer: W, images: &DetectorImages) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(&["ray", "sample_x", "sample_y", "detector_x", "detector_y"])?;
    for (ray, (sample, detector)) in images
        .sample_pixels
        .iter()
        .zip(images.detector_pixels.iter())
        .enumerate()
    {
        wtr.serialize((ray, sample.0, sample.1, detector.0, detector.1))?;
    }
    wtr.flush()?;
    Ok(())
}
