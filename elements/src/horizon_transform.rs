// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::time::SystemTime;

use canonical_error::{CanonicalError, invalid_argument_error,
                      unavailable_error};
use chrono::{DateTime, Datelike, Utc};
use log::debug;

use crate::astro_util::{alt_az_from_equatorial, greenwich_mean_sidereal_time,
                        julian_centuries, julian_day_from_system_time,
                        nutation, precession_matrix, refraction,
                        rotate_equatorial};
use crate::horizon_trait::{EquatorialCoordinates, HorizonCoordinates,
                           HorizonTransformTrait, ObserverLocation};

// Years over which the precession and nutation series are usable.
const MIN_YEAR: i32 = 1800;
const MAX_YEAR: i32 = 2200;

// What the equatorial coordinates given to ApparentHorizonTransform are
// referred to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEpoch {
    // Mean equator and equinox of J2000.0 (catalog and plate solver
    // positions). Precession and nutation are applied.
    J2000,

    // True equator and equinox of the observing instant ("JNow").
    OfDate,
}

// Earth orientation parameters in effect at the observing instant.
#[derive(Debug, Clone, Copy, Default)]
pub struct EarthOrientation {
    // UT1-UTC, seconds. Bounded by +/-0.9s by leap second insertion.
    pub dut1: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct Atmosphere {
    pub pressure_hpa: f64,
    pub temperature_celsius: f64,
}

impl Atmosphere {
    /// Standard atmosphere pressure at the given elevation (meters).
    pub fn standard(elevation: f64, temperature_celsius: f64) -> Self {
        let pressure_hpa =
            1013.25 * (1.0 - 2.25577e-5 * elevation).max(0.0).powf(5.25588);
        Atmosphere{pressure_hpa, temperature_celsius}
    }
}

// Equatorial to apparent horizon coordinates: precession and nutation to
// date (when given J2000 positions), apparent sidereal time, then the
// spherical triangle to altitude/azimuth, with optional refraction.
// Annual aberration and polar motion are not modeled; both shift the fitted
// pole and the true pole nearly equally.
#[derive(Debug, Clone)]
pub struct ApparentHorizonTransform {
    earth_orientation: EarthOrientation,
    epoch: InputEpoch,
    atmosphere: Option<Atmosphere>,
}

impl Default for ApparentHorizonTransform {
    fn default() -> Self {
        ApparentHorizonTransform{
            earth_orientation: EarthOrientation::default(),
            epoch: InputEpoch::J2000,
            atmosphere: None,
        }
    }
}

impl ApparentHorizonTransform {
    pub fn new(earth_orientation: EarthOrientation, epoch: InputEpoch)
               -> Result<Self, CanonicalError> {
        if !(earth_orientation.dut1.abs() <= 0.9) {
            return Err(invalid_argument_error(
                format!("dut1 must be within +/-0.9s; got {}",
                        earth_orientation.dut1).as_str()));
        }
        Ok(ApparentHorizonTransform{earth_orientation, epoch, atmosphere: None})
    }

    pub fn with_refraction(mut self, atmosphere: Atmosphere) -> Self {
        self.atmosphere = Some(atmosphere);
        self
    }
}

impl HorizonTransformTrait for ApparentHorizonTransform {
    fn to_horizon(&self,
                  equatorial: &EquatorialCoordinates,
                  location: &ObserverLocation,
                  time: &SystemTime)
                  -> Result<HorizonCoordinates, CanonicalError> {
        let year = DateTime::<Utc>::from(*time).year();
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(unavailable_error(
                format!("no Earth orientation model for year {}", year)
                    .as_str()));
        }
        let t = julian_centuries(julian_day_from_system_time(time));
        let nut = nutation(t);
        let sidereal_time =
            greenwich_mean_sidereal_time(time, self.earth_orientation.dut1)
            + nut.equation_of_equinoxes();

        let (mut ra, mut dec) =
            (equatorial.ra.to_radians(), equatorial.dec.to_radians());
        if self.epoch == InputEpoch::J2000 {
            let matrix = nut.matrix() * precession_matrix(t);
            (ra, dec) = rotate_equatorial(&matrix, ra, dec);
        }
        let (mut alt, az, ha) = alt_az_from_equatorial(
            ra, dec, location.latitude.to_radians(),
            location.longitude.to_radians(), sidereal_time);
        if let Some(atmosphere) = &self.atmosphere {
            alt += refraction(alt, atmosphere.pressure_hpa,
                              atmosphere.temperature_celsius);
        }
        debug!("ra/dec {:.5}/{:.5} -> of date {:.5}/{:.5}, ha {:.5}h",
               equatorial.ra, equatorial.dec, ra.to_degrees(),
               dec.to_degrees(), ha.to_degrees() / 15.0);

        Ok(HorizonCoordinates{azimuth: az.to_degrees(),
                              altitude: alt.to_degrees()})
    }
}

// Treats right ascension/declination as directions fixed to the Earth
// (longitude/latitude of the ITRS sphere) rather than to the sky. The result
// does not depend on time. Polar motion is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerrestrialHorizonTransform;

impl HorizonTransformTrait for TerrestrialHorizonTransform {
    fn to_horizon(&self,
                  equatorial: &EquatorialCoordinates,
                  location: &ObserverLocation,
                  _time: &SystemTime)
                  -> Result<HorizonCoordinates, CanonicalError> {
        let (alt, az, _ha) = alt_az_from_equatorial(
            equatorial.ra.to_radians(), equatorial.dec.to_radians(),
            location.latitude.to_radians(), location.longitude.to_radians(),
            /*sidereal_time=*/0.0);
        Ok(HorizonCoordinates{azimuth: az.to_degrees(),
                              altitude: alt.to_degrees()})
    }
}

// mod tests.
