// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::time::SystemTime;

use canonical_error::CanonicalError;

use crate::align_error::PolarAlignError;
use crate::astro_util::wrap_360;

// A position on the celestial sphere in equatorial coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquatorialCoordinates {
    // Right ascension (degrees), 0..360.
    pub ra: f64,

    // Declination (degrees), -90..90.
    pub dec: f64,
}

impl EquatorialCoordinates {
    /// Checks the coordinates and wraps `ra` into [0, 360).
    pub fn new(ra: f64, dec: f64) -> Result<Self, PolarAlignError> {
        if !ra.is_finite() {
            return Err(PolarAlignError::InvalidInput(
                format!("right ascension must be finite; got {}", ra)));
        }
        if !(-90.0..=90.0).contains(&dec) {
            return Err(PolarAlignError::InvalidInput(
                format!("declination must be within [-90, 90]; got {}", dec)));
        }
        Ok(EquatorialCoordinates{ra: wrap_360(ra), dec})
    }

    /// The north celestial pole.
    pub fn north_pole() -> Self {
        EquatorialCoordinates{ra: 0.0, dec: 90.0}
    }
}

// A position relative to an observer's local horizon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HorizonCoordinates {
    // Azimuth (degrees, positive clockwise from north), 0..360.
    pub azimuth: f64,

    // Altitude (degrees, relative to the local horizon).
    pub altitude: f64,
}

// Where the observer is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObserverLocation {
    // Degrees, positive north.
    pub latitude: f64,

    // Degrees, positive east.
    pub longitude: f64,

    // Meters above sea level.
    pub elevation: f64,
}

impl ObserverLocation {
    pub fn new(latitude: f64, longitude: f64, elevation: f64)
               -> Result<Self, PolarAlignError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(PolarAlignError::InvalidInput(
                format!("latitude must be within [-90, 90]; got {}", latitude)));
        }
        if !longitude.is_finite() || !elevation.is_finite() {
            return Err(PolarAlignError::InvalidInput(
                format!("longitude and elevation must be finite; got {} {}",
                        longitude, elevation)));
        }
        Ok(ObserverLocation{latitude, longitude, elevation})
    }
}

// Converts equatorial coordinates to the observer's horizon coordinates.
// Implementations hold whatever Earth orientation state they need; it is
// passed in at construction rather than discovered.
pub trait HorizonTransformTrait {
    // Both the true pole and the fitted pole are transformed with the same
    // `location` and `time`, so implementations must be deterministic in
    // their arguments.
    // Errors are reported to callers unchanged.
    fn to_horizon(&self,
                  equatorial: &EquatorialCoordinates,
                  location: &ObserverLocation,
                  time: &SystemTime)
                  -> Result<HorizonCoordinates, CanonicalError>;
}

// mod tests.
