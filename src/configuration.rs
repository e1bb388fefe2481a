//! Configuration documents describing a model.
//!
//! A document lists the components of the column from the source down, the
//! beam entering it, the detector, and optionally the components taking part
//! in a raster scan. Documents are YAML or JSON; see the files in `demos/`.

use crate::beam::BeamParameters;
use crate::column::Column;
use crate::component::sample::test_pattern;
use crate::component::{
    Aperture, AstigmaticLens, Biprism, Component, Deflector, DoubleDeflector,
    DoubleDeflectorUpdate, Lens, Sample, SampleUpdate,
};
use crate::constant::{DEFAULT_BEAM_Z, DEFAULT_DETECTOR_PIXELS, DEFAULT_DETECTOR_SIZE};
use crate::error::ColumnError;
use crate::image::{CoordinateTransform, PixelGrid};
use crate::model::{Model, ScanSetup};
use log::info;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading a configuration document.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unrecognised configuration format '{0}', expected .yaml, .yml or .json")]
    UnknownFormat(String),
    #[error("scan refers to unknown component '{0}'")]
    UnknownComponent(String),
    #[error("sample image rows must all have the same length")]
    RaggedImage,
    #[error(transparent)]
    Column(#[from] ColumnError),
}

fn default_ratio() -> f64 {
    -1.0
}

fn default_beam_z() -> f64 {
    DEFAULT_BEAM_Z
}

/// Intensity image of a sample.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleImageConfig {
    /// The synthetic test object at the given resolution.
    TestPattern(usize),
    /// Intensities listed row by row, top row first.
    Rows(Vec<Vec<f64>>),
}

impl SampleImageConfig {
    pub fn build(&self) -> Result<DMatrix<f64>, ConfigError> {
        match self {
            SampleImageConfig::TestPattern(size) => Ok(test_pattern(*size)),
            SampleImageConfig::Rows(rows) => {
                let ncols = rows.first().map_or(0, |row| row.len());
                if rows.iter().any(|row| row.len() != ncols) {
                    return Err(ConfigError::RaggedImage);
                }
                Ok(DMatrix::from_fn(rows.len(), ncols, |r, c| rows[r][c]))
            }
        }
    }
}

/// One component of the column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComponentConfig {
    Lens {
        name: String,
        z: f64,
        f: f64,
    },
    AstigmaticLens {
        name: String,
        z: f64,
        fx: f64,
        fy: f64,
    },
    Quadrupole {
        name: String,
        z: f64,
        fx: f64,
        fy: f64,
    },
    Deflector {
        name: String,
        z: f64,
        #[serde(default)]
        defx: f64,
        #[serde(default)]
        defy: f64,
    },
    DoubleDeflector {
        name: String,
        z_up: f64,
        z_low: f64,
        #[serde(default)]
        updefx: f64,
        #[serde(default)]
        updefy: f64,
        #[serde(default)]
        lowdefx: f64,
        #[serde(default)]
        lowdefy: f64,
        /// Degrees.
        #[serde(default)]
        scan_rotation: f64,
        #[serde(default = "default_ratio")]
        defratiox: f64,
        #[serde(default = "default_ratio")]
        defratioy: f64,
        #[serde(default)]
        use_ratio: bool,
    },
    Biprism {
        name: String,
        z: f64,
        deflection: f64,
        /// 0 for a wire along x, pi/2 for a wire along y.
        #[serde(default)]
        theta: f64,
        width: f64,
        radius: f64,
    },
    Aperture {
        name: String,
        z: f64,
        #[serde(default)]
        x: f64,
        #[serde(default)]
        y: f64,
        inner_radius: f64,
        outer_radius: f64,
    },
    Sample {
        name: String,
        z: f64,
        #[serde(default)]
        x: f64,
        #[serde(default)]
        y: f64,
        width: f64,
        image: SampleImageConfig,
    },
}

impl ComponentConfig {
    pub fn build(&self) -> Result<Component, ConfigError> {
        let component = match self {
            ComponentConfig::Lens { name, z, f } => Component::Lens(Lens::new(name.clone(), *z, *f)?),
            ComponentConfig::AstigmaticLens { name, z, fx, fy } => {
                Component::AstigmaticLens(AstigmaticLens::new(name.clone(), *z, *fx, *fy)?)
            }
            ComponentConfig::Quadrupole { name, z, fx, fy } => {
                Component::Quadrupole(AstigmaticLens::new(name.clone(), *z, *fx, *fy)?)
            }
            ComponentConfig::Deflector { name, z, defx, defy } => {
                Component::Deflector(Deflector::new(name.clone(), *z, *defx, *defy)?)
            }
            ComponentConfig::DoubleDeflector {
                name,
                z_up,
                z_low,
                updefx,
                updefy,
                lowdefx,
                lowdefy,
                scan_rotation,
                defratiox,
                defratioy,
                use_ratio,
            } => {
                let mut deflector = DoubleDeflector::new(name.clone(), *z_up, *z_low)?;
                deflector.update(&DoubleDeflectorUpdate {
                    updefx: Some(*updefx),
                    updefy: Some(*updefy),
                    lowdefx: Some(*lowdefx),
                    lowdefy: Some(*lowdefy),
                    scan_rotation: Some(*scan_rotation),
                    defratiox: Some(*defratiox),
                    defratioy: Some(*defratioy),
                    use_ratio: Some(*use_ratio),
                })?;
                Component::DoubleDeflector(deflector)
            }
            ComponentConfig::Biprism {
                name,
                z,
                deflection,
                theta,
                width,
                radius,
            } => Component::Biprism(Biprism::new(
                name.clone(),
                *z,
                *deflection,
                *theta,
                *width,
                *radius,
            )?),
            ComponentConfig::Aperture {
                name,
                z,
                x,
                y,
                inner_radius,
                outer_radius,
            } => Component::Aperture(
                Aperture::new(name.clone(), *z, *inner_radius, *outer_radius)?.centred_at(*x, *y)?,
            ),
            ComponentConfig::Sample {
                name,
                z,
                x,
                y,
                width,
                image,
            } => {
                let mut sample = Sample::new(name.clone(), *z, *width, image.build()?)?;
                sample.update(&SampleUpdate {
                    x: Some(*x),
                    y: Some(*y),
                    ..Default::default()
                })?;
                Component::Sample(sample)
            }
        };
        Ok(component)
    }
}

/// The detector grid and the transform applied when forming images.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Physical edge length, m.
    pub size: f64,
    pub pixels: usize,
    /// Degrees.
    pub rotation: f64,
    pub flip_y: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            size: DEFAULT_DETECTOR_SIZE,
            pixels: DEFAULT_DETECTOR_PIXELS,
            rotation: 0.0,
            flip_y: false,
        }
    }
}

/// Components taking part in a raster scan, referred to by name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    pub scan_coils: String,
    pub lens: String,
    pub descan_coils: String,
    pub scan_pixels: usize,
    /// Height of the crossover above the sample; sets the scan lens focal length.
    #[serde(default)]
    pub overfocus: Option<f64>,
    /// Semi-convergence angle at the crossover; sets the parallel beam radius.
    #[serde(default)]
    pub semiconv: Option<f64>,
}

/// A complete model description.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_beam_z")]
    pub beam_z: f64,
    #[serde(default)]
    pub beam: BeamParameters,
    #[serde(default)]
    pub detector: DetectorConfig,
    pub components: Vec<ComponentConfig>,
    #[serde(default)]
    pub scan: Option<ScanConfig>,
}

impl ModelConfig {
    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(source)?)
    }

    /// Reads a document, choosing the format from the file extension.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        let reader = || -> Result<BufReader<File>, ConfigError> { Ok(BufReader::new(File::open(path)?)) };
        let config = match extension.as_str() {
            "yaml" | "yml" => serde_yaml::from_reader(reader()?)?,
            "json" => serde_json::from_reader(reader()?)?,
            _ => return Err(ConfigError::UnknownFormat(path.display().to_string())),
        };
        info!("Loaded configuration from {}.", path.display());
        Ok(config)
    }

    /// Builds the model, applying the derived scan parameters if given.
    pub fn build(&self) -> Result<Model, ConfigError> {
        let components = self
            .components
            .iter()
            .map(|c| c.build())
            .collect::<Result<Vec<_>, _>>()?;
        let column = Column::new(components, self.beam_z)?;
        let detector = PixelGrid::new(self.detector.size, self.detector.pixels)?;
        let transform = CoordinateTransform {
            rotation: self.detector.rotation,
            flip_y: self.detector.flip_y,
        };
        let mut model = Model::new(column, self.beam.clone(), detector)?.with_transform(transform);

        if let Some(scan) = &self.scan {
            let find = |name: &str| {
                model
                    .column()
                    .position(name)
                    .ok_or_else(|| ConfigError::UnknownComponent(name.to_string()))
            };
            let setup = ScanSetup {
                scan_coils: find(&scan.scan_coils)?,
                lens: find(&scan.lens)?,
                descan_coils: find(&scan.descan_coils)?,
                scan_pixels: scan.scan_pixels,
            };
            model = model.with_scan(setup)?;
            if let Some(overfocus) = scan.overfocus {
                model.set_lens_f_from_overfocus(overfocus)?;
            }
            if let Some(semiconv) = scan.semiconv {
                model.set_beam_radius_from_semiconv(semiconv)?;
            }
        }
        Ok(model)
    }
}
