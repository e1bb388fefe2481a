//! Single and double deflectors.

use crate::error::{ensure_finite, ColumnError};
use crate::matrix;
use nalgebra::Matrix5;

/// A single deflector applying a constant slope kick.
#[derive(Clone, Debug, PartialEq)]
pub struct Deflector {
    pub name: String,
    pub z: f64,
    pub defx: f64,
    pub defy: f64,
}

impl Deflector {
    pub fn new(name: impl Into<String>, z: f64, defx: f64, defy: f64) -> Result<Self, ColumnError> {
        let deflector = Deflector {
            name: name.into(),
            z,
            defx,
            defy,
        };
        deflector.validate()?;
        Ok(deflector)
    }

    pub fn validate(&self) -> Result<(), ColumnError> {
        ensure_finite(&self.name, "z", self.z)?;
        ensure_finite(&self.name, "defx", self.defx)?;
        ensure_finite(&self.name, "defy", self.defy)
    }

    pub fn matrix(&self) -> Matrix5<f64> {
        matrix::deflector(self.defx, self.defy)
    }

    pub fn update(&mut self, update: &DeflectorUpdate) -> Result<(), ColumnError> {
        let mut updated = self.clone();
        if let Some(defx) = update.defx {
            updated.defx = defx;
        }
        if let Some(defy) = update.defy {
            updated.defy = defy;
        }
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}

/// A pair of deflectors at two z positions, used for beam tilt/shift and scanning.
///
/// The lower element is rotated by `scan_rotation` degrees about the optical axis.
/// When `use_ratio` is set, the lower kicks follow the upper kicks through
/// `defratiox` and `defratioy` instead of their own values.
#[derive(Clone, Debug, PartialEq)]
pub struct DoubleDeflector {
    pub name: String,
    pub z_up: f64,
    pub z_low: f64,
    pub updefx: f64,
    pub updefy: f64,
    pub lowdefx: f64,
    pub lowdefy: f64,
    /// Rotation of the lower element, degrees.
    pub scan_rotation: f64,
    pub defratiox: f64,
    pub defratioy: f64,
    pub use_ratio: bool,
}

impl DoubleDeflector {
    /// Creates a double deflector with no deflection.
    pub fn new(name: impl Into<String>, z_up: f64, z_low: f64) -> Result<Self, ColumnError> {
        let deflector = DoubleDeflector {
            name: name.into(),
            z_up,
            z_low,
            updefx: 0.0,
            updefy: 0.0,
            lowdefx: 0.0,
            lowdefy: 0.0,
            scan_rotation: 0.0,
            defratiox: -1.0,
            defratioy: -1.0,
            use_ratio: false,
        };
        deflector.validate()?;
        Ok(deflector)
    }

    pub fn with_scan_rotation(mut self, degrees: f64) -> Result<Self, ColumnError> {
        self.scan_rotation = degrees;
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ColumnError> {
        ensure_finite(&self.name, "z_up", self.z_up)?;
        ensure_finite(&self.name, "z_low", self.z_low)?;
        ensure_finite(&self.name, "updefx", self.updefx)?;
        ensure_finite(&self.name, "updefy", self.updefy)?;
        ensure_finite(&self.name, "lowdefx", self.lowdefx)?;
        ensure_finite(&self.name, "lowdefy", self.lowdefy)?;
        ensure_finite(&self.name, "scan_rotation", self.scan_rotation)?;
        ensure_finite(&self.name, "defratiox", self.defratiox)?;
        ensure_finite(&self.name, "defratioy", self.defratioy)?;
        if self.z_up <= self.z_low {
            return Err(ColumnError::DoubleDeflectorOrder {
                name: self.name.clone(),
                z_up: self.z_up,
                z_low: self.z_low,
            });
        }
        Ok(())
    }

    /// Separation between the two elements along the axis.
    pub fn separation(&self) -> f64 {
        self.z_up - self.z_low
    }

    /// The kicks applied by the lower element, honouring ratio mode.
    pub fn lower_kicks(&self) -> (f64, f64) {
        if self.use_ratio {
            (self.updefx * self.defratiox, self.updefy * self.defratioy)
        } else {
            (self.lowdefx, self.lowdefy)
        }
    }

    pub fn upper_matrix(&self) -> Matrix5<f64> {
        matrix::deflector(self.updefx, self.updefy)
    }

    pub fn lower_matrix(&self) -> Matrix5<f64> {
        let (lowdefx, lowdefy) = self.lower_kicks();
        matrix::rotated_deflector(lowdefx, lowdefy, self.scan_rotation)
    }

    pub fn update(&mut self, update: &DoubleDeflectorUpdate) -> Result<(), ColumnError> {
        let mut updated = self.clone();
        let fields = [
            (&mut updated.updefx, update.updefx),
            (&mut updated.updefy, update.updefy),
            (&mut updated.lowdefx, update.lowdefx),
            (&mut updated.lowdefy, update.lowdefy),
            (&mut updated.scan_rotation, update.scan_rotation),
            (&mut updated.defratiox, update.defratiox),
            (&mut updated.defratioy, update.defratioy),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                *field = value;
            }
        }
        if let Some(use_ratio) = update.use_ratio {
            updated.use_ratio = use_ratio;
        }
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}

/// New parameters for a [Deflector].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeflectorUpdate {
    pub defx: Option<f64>,
    pub defy: Option<f64>,
}

/// New parameters for a [DoubleDeflector].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DoubleDeflectorUpdate {
    pub updefx: Option<f64>,
    pub updefy: Option<f64>,
    pub lowdefx: Option<f64>,
    pub lowdefy: Option<f64>,
    pub scan_rotation: Option<f64>,
    pub defratiox: Option<f64>,
    pub defratioy: Option<f64>,
    pub use_ratio: Option<bool>,
}
