// Copyright (c) 2024 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::f64::consts::{FRAC_PI_2, PI};
use std::time::SystemTime;

use astro::{
    angle::{anglr_sepr, limit_to_two_PI},
    coords::{alt_frm_eq, az_frm_eq},
    time::{julian_day, mn_sidr, CalType, Date},
};
use chrono::{DateTime, Datelike, Timelike, Utc};

extern crate nalgebra as na;

const ARCSEC_TO_RAD: f64 = PI / (180.0 * 3600.0);
const J2000_JD: f64 = 2451545.0;

/// Convert ra/dec (radians) to x/y/z on unit sphere.
pub fn to_unit_vector(ra: f64, dec: f64) -> [f64; 3] {
    [
        (ra.cos() * dec.cos()), // x
        (ra.sin() * dec.cos()), // y
        dec.sin(),
    ] // z
}

/// Convert x/y/z on unitsphere to ra/dec (radians).
pub fn from_unit_vector(v: &[f64; 3]) -> (f64, f64) {
    let x = v[0];
    let y = v[1];
    // Rotated vectors can land a hair outside the unit sphere.
    let z = v[2].clamp(-1.0, 1.0);
    let dec = z.asin();
    let mut ra = y.atan2(x);
    if ra < 0.0 {
        ra += 2.0 * PI;
    }
    (ra, dec)
}

/// Returns the separation, in radians, between the given celestial coordinates
/// (in radians).
pub fn angular_separation(
    p0_ra: f64,
    p0_dec: f64,
    p1_ra: f64,
    p1_dec: f64,
) -> f64 {
    anglr_sepr(p0_ra, p0_dec, p1_ra, p1_dec)
}

/// Wraps an angle in degrees into [0, 360).
pub fn wrap_360(deg: f64) -> f64 {
    let wrapped = deg.rem_euclid(360.0);
    // rem_euclid() of a tiny negative value rounds to exactly 360.
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Maps an angle in degrees into [-180, 180).
pub fn normalize_180(deg: f64) -> f64 {
    (deg + 180.0).rem_euclid(360.0) - 180.0
}

/// Returns (alt, az, ha) in radians. Returned azimuth is clockwise from north.
/// Returned hour angle is -PI..PI.
/// ra: right ascension in radians.
/// dec: declination in radians.
/// lat: observer latitude in radians.
/// long: observer longitude in radians.
/// sidereal_time: Greenwich sidereal time in radians. Pass zero when ra is
///   already an Earth-fixed longitude.
pub fn alt_az_from_equatorial(
    ra: f64,
    dec: f64,
    lat: f64,
    long: f64,
    sidereal_time: f64,
) -> (/* alt */ f64, /* az */ f64, /* ha */ f64) {
    // Note that astro::coords::hr_angl_frm_observer_long() has a bug.
    // Fortunately the correct relation is trivial.
    let hour_angle = sidereal_time + long - ra;

    let meeus_az = az_frm_eq(hour_angle, dec, lat);
    let az = limit_to_two_PI(meeus_az + PI);
    let mut ha = limit_to_two_PI(hour_angle);
    if ha > PI {
        ha -= 2.0 * PI;
    }

    (alt_frm_eq(hour_angle, dec, lat), az, ha)
}

/// Julian day (UTC) of the given time, including the fraction of day.
pub fn julian_day_from_system_time(time: &SystemTime) -> f64 {
    let dt_utc = DateTime::<Utc>::from(*time);
    let date = Date {
        year: dt_utc.date_naive().year() as i16,
        month: dt_utc.date_naive().month() as u8,
        decimal_day: dt_utc.date_naive().day() as f64
            + seconds_from_midnight(&dt_utc) / 86400.0,
        cal_type: CalType::Gregorian,
    };
    julian_day(&date)
}

/// Julian centuries elapsed since J2000.0.
pub fn julian_centuries(jd: f64) -> f64 {
    (jd - J2000_JD) / 36525.0
}

/// Greenwich mean sidereal time, radians 0..2PI.
/// dut1: UT1-UTC in seconds.
pub fn greenwich_mean_sidereal_time(time: &SystemTime, dut1: f64) -> f64 {
    let dt_utc = DateTime::<Utc>::from(*time);
    let date = Date {
        year: dt_utc.date_naive().year() as i16,
        month: dt_utc.date_naive().month() as u8,
        decimal_day: dt_utc.date_naive().day() as f64,
        cal_type: CalType::Gregorian,
    };
    let jd = julian_day(&date);

    let ut1_hours = (seconds_from_midnight(&dt_utc) + dut1) / 3600.0;
    let gmst_hours =
        mn_sidr(jd).to_degrees() / 15.0 + ut1_hours * 1.00273790935;

    limit_to_two_PI((gmst_hours * 15.0).to_radians())
}

fn seconds_from_midnight(dt_utc: &DateTime<Utc>) -> f64 {
    dt_utc.time().num_seconds_from_midnight() as f64
        + dt_utc.time().nanosecond() as f64 * 1e-9
}

/// Rotation matrix taking a mean J2000 unit vector to the mean equator and
/// equinox of date. `t` is Julian centuries since J2000.0.
/// IAU 1976 precession angles (Meeus, Astronomical Algorithms, 21.2).
pub fn precession_matrix(t: f64) -> na::Matrix3<f64> {
    let t2 = t * t;
    let t3 = t2 * t;
    let zeta = (2306.2181 * t + 0.30188 * t2 + 0.017998 * t3) * ARCSEC_TO_RAD;
    let z = (2306.2181 * t + 1.09468 * t2 + 0.018203 * t3) * ARCSEC_TO_RAD;
    let theta = (2004.3109 * t - 0.42665 * t2 - 0.041833 * t3) * ARCSEC_TO_RAD;

    rotation_z(z) * rotation_y(theta) * rotation_z(zeta)
}

/// Nutation angles, all radians.
#[derive(Debug, Clone, Copy)]
pub struct Nutation {
    // Nutation in longitude.
    pub longitude: f64,

    // Nutation in obliquity.
    pub obliquity: f64,

    // Mean obliquity of the ecliptic.
    pub mean_obliquity: f64,
}

impl Nutation {
    pub fn true_obliquity(&self) -> f64 {
        self.mean_obliquity + self.obliquity
    }

    /// Difference between apparent and mean sidereal time, radians.
    pub fn equation_of_equinoxes(&self) -> f64 {
        self.longitude * self.true_obliquity().cos()
    }

    /// Rotation matrix taking a mean-of-date unit vector to true-of-date.
    pub fn matrix(&self) -> na::Matrix3<f64> {
        // Equatorial -> ecliptic, shift ecliptic longitude, ecliptic ->
        // equatorial on the true equator.
        rotation_x(self.true_obliquity())
            * rotation_z(self.longitude)
            * rotation_x(-self.mean_obliquity)
    }
}

/// Nutation for `t` Julian centuries since J2000.0. Uses the principal terms
/// of the IAU 1980 series (Meeus 22, accurate to 0.5" in longitude and 0.1"
/// in obliquity).
pub fn nutation(t: f64) -> Nutation {
    let omega = (125.04452 - 1934.136261 * t).to_radians();
    let sun_long = (280.4665 + 36000.7698 * t).to_radians();
    let moon_long = (218.3165 + 481267.8813 * t).to_radians();

    let d_psi = -17.20 * omega.sin() - 1.32 * (2.0 * sun_long).sin()
        - 0.23 * (2.0 * moon_long).sin()
        + 0.21 * (2.0 * omega).sin();
    let d_eps = 9.20 * omega.cos()
        + 0.57 * (2.0 * sun_long).cos()
        + 0.10 * (2.0 * moon_long).cos()
        - 0.09 * (2.0 * omega).cos();
    let mean_obliquity =
        84381.448 - 46.8150 * t - 0.00059 * t * t + 0.001813 * t * t * t;

    Nutation {
        longitude: d_psi * ARCSEC_TO_RAD,
        obliquity: d_eps * ARCSEC_TO_RAD,
        mean_obliquity: mean_obliquity * ARCSEC_TO_RAD,
    }
}

// Rotations of a vector (not of the frame) by `angle` radians.
fn rotation_x(angle: f64) -> na::Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    na::Matrix3::new(1.0, 0.0, 0.0, 0.0, c, -s, 0.0, s, c)
}

fn rotation_y(angle: f64) -> na::Matrix3<f64> {
    // Sense chosen so that a positive angle tilts +x towards +z, as in
    // Meeus' precession formulae.
    let (s, c) = angle.sin_cos();
    na::Matrix3::new(c, 0.0, -s, 0.0, 1.0, 0.0, s, 0.0, c)
}

fn rotation_z(angle: f64) -> na::Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    na::Matrix3::new(c, -s, 0.0, s, c, 0.0, 0.0, 0.0, 1.0)
}

/// Applies `matrix` to the given ra/dec (radians), returning the rotated
/// ra/dec (radians).
pub fn rotate_equatorial(
    matrix: &na::Matrix3<f64>,
    ra: f64,
    dec: f64,
) -> (f64, f64) {
    let v = to_unit_vector(ra, dec);
    let rotated = matrix * na::Vector3::new(v[0], v[1], v[2]);
    from_unit_vector(&[rotated.x, rotated.y, rotated.z])
}

// The A tan(z) + B tan^3(z) model loses accuracy beyond this zenith distance.
const MAX_REFRACTION_ZENITH: f64 = 87.0 * PI / 180.0;

/// Optical refraction (radians) to add to a true altitude (radians) to get
/// the apparent altitude. Dry air, 0.574um. Zero pressure means no
/// refraction.
pub fn refraction(altitude: f64, pressure_hpa: f64, temperature_celsius: f64)
                  -> f64 {
    if pressure_hpa <= 0.0 {
        return 0.0;
    }
    let temp_kelvin = temperature_celsius + 273.15;
    let wl_sq = 0.574 * 0.574;
    let gamma = (77.53484e-6 + (4.39108e-7 + 3.666e-9 / wl_sq) / wl_sq)
        * pressure_hpa / temp_kelvin;
    let beta = 4.4474e-6 * temp_kelvin;
    let refa = gamma * (1.0 - beta);
    let refb = -gamma * (beta - gamma / 2.0);

    let zenith = (FRAC_PI_2 - altitude).min(MAX_REFRACTION_ZENITH);
    let tan_z = zenith.tan();
    refa * tan_z + refb * tan_z.powi(3)
}

/// Formats an angle in degrees as hours, e.g. "02h31m49.09s".
pub fn format_hms(deg: f64) -> String {
    let hundredths = (wrap_360(deg) / 15.0 * 360000.0).round() as i64;
    let hours = (hundredths / 360000) % 24;
    let minutes = (hundredths / 6000) % 60;
    let centiseconds = hundredths % 6000;
    format!("{:02}h{:02}m{:02}.{:02}s",
            hours, minutes, centiseconds / 100, centiseconds % 100)
}

/// Formats an angle in degrees as signed degrees, e.g. "+89d15m50.78s".
pub fn format_dms(deg: f64) -> String {
    let sign = if deg.is_sign_negative() { "-" } else { "+" };
    let hundredths = (deg.abs() * 360000.0).round() as i64;
    let degrees = hundredths / 360000;
    let minutes = (hundredths / 6000) % 60;
    let centiseconds = hundredths % 6000;
    format!("{}{:02}d{:02}m{:02}.{:02}s",
            sign, degrees, minutes, centiseconds / 100, centiseconds % 100)
}

// mod tests.
