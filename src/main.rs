use beamcolumn::configuration::ModelConfig;
use beamcolumn::output::file::{write_file, Binary, Text};
use beamcolumn::output::image_csv::{write_image, write_pixel_coords};
use clap::Parser;
use log::info;
use std::fs::File;
use std::path::PathBuf;

/// Propagates a beam through the column described by a configuration file.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Column configuration, YAML or JSON.
    config: PathBuf,

    /// Write the ray trajectories to this file.
    #[arg(short, long)]
    trajectories: Option<PathBuf>,

    /// Write trajectories as little endian binary instead of text.
    #[arg(long)]
    binary: bool,

    /// Write the detector intensity image to this CSV file.
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// Write the sample and detector pixel of every ray to this CSV file.
    #[arg(long)]
    pixels: Option<PathBuf>,

    /// Run a full 4D-STEM raster scan.
    #[arg(long)]
    scan: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut model = ModelConfig::load_file(&args.config)?.build()?;
    model.step()?;
    let propagation = model.propagation();
    info!(
        "{} of {} rays reached the detector unblocked.",
        propagation.allowed(model.rays().num_rays()).len(),
        model.rays().num_rays()
    );

    if let Some(path) = &args.trajectories {
        if args.binary {
            write_file::<Binary, _>(path, model.rays(), model.z_positions())?;
        } else {
            write_file::<Text, _>(path, model.rays(), model.z_positions())?;
        }
        info!("Wrote trajectories to {}.", path.display());
    }

    if args.image.is_some() || args.pixels.is_some() {
        let images = model.detector_image()?;
        if let Some(path) = &args.image {
            write_image(File::create(path)?, &images.intensity)?;
            info!("Wrote detector image to {}.", path.display());
        }
        if let Some(path) = &args.pixels {
            write_pixel_coords(File::create(path)?, &images)?;
            info!("Wrote pixel coordinates to {}.", path.display());
        }
    }

    if args.scan {
        let images = model.scan_images()?;
        for (position, image) in images.iter().enumerate() {
            info!("Scan position {}: total intensity {}", position, image.sum());
        }
    }

    Ok(())
}
