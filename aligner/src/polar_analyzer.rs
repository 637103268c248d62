// Copyright (c) 2024 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

// Module to estimate polar axis (mis)alignment from three star positions
// observed while rotating the mount's RA axis. The stars trace a circle
// around the mount's axis; the circle's center is where that axis points.

use std::time::SystemTime;

use log::debug;

use autopa_elements::align_error::PolarAlignError;
use autopa_elements::astro_util::{angular_separation, normalize_180};
use autopa_elements::circle_fit::fit_circle_center;
use autopa_elements::horizon_trait::{EquatorialCoordinates,
                                     HorizonCoordinates,
                                     HorizonTransformTrait, ObserverLocation};
use autopa_elements::polar_projection::{project, unproject};

// Correction to apply to the mount, arcminutes. Positive azimuth is
// clockwise looking down at the mount from above; positive altitude raises
// the polar axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentError {
    pub azimuth_arcmin: f64,
    pub altitude_arcmin: f64,
}

// Everything computed along the way, for presentation.
#[derive(Debug, Clone, Copy)]
pub struct PolarAlignment {
    // Where the mount's axis points, in the stars' frame.
    pub current_pole: EquatorialCoordinates,

    pub true_pole_horizon: HorizonCoordinates,
    pub current_pole_horizon: HorizonCoordinates,

    // Angle between current_pole and the true pole.
    pub separation_arcmin: f64,

    pub error: AlignmentError,
}

/// Azimuth correction (arcminutes) taking `current_az` to `true_az` (both
/// degrees), by the short way around.
pub fn azimuth_error_arcmin(true_az: f64, current_az: f64) -> f64 {
    normalize_180(normalize_180(true_az) - normalize_180(current_az)) * 60.0
}

pub fn altitude_error_arcmin(true_alt: f64, current_alt: f64) -> f64 {
    (true_alt - current_alt) * 60.0
}

pub struct PolarAnalyzer {
    transform: Box<dyn HorizonTransformTrait + Send + Sync>,
}

impl PolarAnalyzer {
    pub fn new(transform: Box<dyn HorizonTransformTrait + Send + Sync>)
               -> Self {
        PolarAnalyzer{transform}
    }

    // Computes the alignment error from three star positions. `stars` are
    // the positions (taken in any order) of the same field at three RA axis
    // rotations; they must be distinct and not colinear in the polar plane.
    // No state is kept between calls.
    pub fn compute_alignment_error(&self,
                                   location: &ObserverLocation,
                                   time: &SystemTime,
                                   stars: &[EquatorialCoordinates; 3])
                                   -> Result<PolarAlignment, PolarAlignError> {
        let location = ObserverLocation::new(
            location.latitude, location.longitude, location.elevation)?;
        let mut points = Vec::with_capacity(3);
        for star in stars {
            let star = EquatorialCoordinates::new(star.ra, star.dec)?;
            points.push(project(&star));
        }
        let center = fit_circle_center(&points[0], &points[1], &points[2])?;
        let current_pole = unproject(&center)?;
        debug!("Fitted pole plane ({:.6}, {:.6}) ra/dec {:.6}/{:.6}",
               center.x, center.y, current_pole.ra, current_pole.dec);

        let true_pole = EquatorialCoordinates::north_pole();
        let true_pole_horizon = self.transform
            .to_horizon(&true_pole, &location, time)
            .map_err(PolarAlignError::TransformFailure)?;
        let current_pole_horizon = self.transform
            .to_horizon(&current_pole, &location, time)
            .map_err(PolarAlignError::TransformFailure)?;
        debug!("True pole az/alt {:.6}/{:.6}; current pole az/alt {:.6}/{:.6}",
               true_pole_horizon.azimuth, true_pole_horizon.altitude,
               current_pole_horizon.azimuth, current_pole_horizon.altitude);

        let separation = angular_separation(
            current_pole.ra.to_radians(), current_pole.dec.to_radians(),
            true_pole.ra.to_radians(), true_pole.dec.to_radians());

        Ok(PolarAlignment{
            current_pole,
            true_pole_horizon,
            current_pole_horizon,
            separation_arcmin: separation.to_degrees() * 60.0,
            error: AlignmentError{
                azimuth_arcmin: azimuth_error_arcmin(
                    true_pole_horizon.azimuth, current_pole_horizon.azimuth),
                altitude_arcmin: altitude_error_arcmin(
                    true_pole_horizon.altitude, current_pole_horizon.altitude),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    extern crate approx;
    use std::sync::Arc;
    use std::thread;

    use approx::assert_abs_diff_eq;
    use canonical_error::{CanonicalError, CanonicalErrorCode,
                          unavailable_error};
    use chrono::{TimeZone, Utc};

    use autopa_elements::horizon_transform::{
        ApparentHorizonTransform, EarthOrientation, InputEpoch,
        TerrestrialHorizonTransform};
    use autopa_elements::polar_projection::PlanePoint;

    use super::*;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> SystemTime {
        SystemTime::from(Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap())
    }

    // Star positions on a circle about the given plane center.
    fn stars_around(cx: f64, cy: f64, radius: f64, angles: [f64; 3])
                    -> [EquatorialCoordinates; 3] {
        angles.map(|angle| {
            let a = angle.to_radians();
            unproject(&PlanePoint{x: cx + radius * a.cos(),
                                  y: cy + radius * a.sin()}).unwrap()
        })
    }

    // Stars circling a pole at ra=30 dec=89.5.
    fn offset_stars() -> [EquatorialCoordinates; 3] {
        let a = 30_f64.to_radians();
        stars_around(0.5 * a.cos(), 0.5 * a.sin(), 1.2, [10.0, 130.0, 250.0])
    }

    fn philadelphia() -> ObserverLocation {
        ObserverLocation{latitude: 40.0, longitude: -75.0, elevation: 100.0}
    }

    struct FailingTransform;

    impl HorizonTransformTrait for FailingTransform {
        fn to_horizon(&self, _equatorial: &EquatorialCoordinates,
                      _location: &ObserverLocation, _time: &SystemTime)
                      -> Result<HorizonCoordinates, CanonicalError> {
            Err(unavailable_error("Earth orientation data not loaded"))
        }
    }

    #[test]
    fn test_azimuth_wraparound() {
        assert_abs_diff_eq!(azimuth_error_arcmin(359.0, 1.0), -120.0,
                            epsilon = 1e-9);
        assert_abs_diff_eq!(azimuth_error_arcmin(1.0, 359.0), 120.0,
                            epsilon = 1e-9);
        // Straddling due south.
        assert_abs_diff_eq!(azimuth_error_arcmin(179.0, 181.0), -120.0,
                            epsilon = 1e-9);
        assert_abs_diff_eq!(altitude_error_arcmin(40.0, 39.5), 30.0,
                            epsilon = 1e-9);
    }

    #[test]
    fn test_perfect_alignment() {
        let stars = stars_around(0.0, 0.0, 1.5, [15.0, 140.0, 260.0]);
        let analyzer =
            PolarAnalyzer::new(Box::new(ApparentHorizonTransform::default()));
        for (location, time) in [
            (philadelphia(), utc(2024, 1, 1, 0, 0, 0)),
            (ObserverLocation{latitude: 51.5, longitude: 0.1, elevation: 0.0},
             utc(2026, 10, 16, 21, 30, 0)),
            (ObserverLocation{latitude: 10.0, longitude: 140.0,
                              elevation: 2000.0},
             utc(1999, 12, 31, 23, 59, 59)),
        ] {
            let alignment =
                analyzer.compute_alignment_error(&location, &time, &stars)
                .unwrap();
            assert_abs_diff_eq!(alignment.current_pole.dec, 90.0,
                                epsilon = 1e-9);
            assert_abs_diff_eq!(alignment.error.azimuth_arcmin, 0.0,
                                epsilon = 1e-6);
            assert_abs_diff_eq!(alignment.error.altitude_arcmin, 0.0,
                                epsilon = 1e-6);
            assert_abs_diff_eq!(alignment.separation_arcmin, 0.0,
                                epsilon = 1e-6);
        }
    }

    #[test]
    fn test_end_to_end() {
        let analyzer =
            PolarAnalyzer::new(Box::new(ApparentHorizonTransform::default()));
        let alignment = analyzer.compute_alignment_error(
            &philadelphia(), &utc(2024, 1, 1, 0, 0, 0), &offset_stars())
            .unwrap();
        assert_abs_diff_eq!(alignment.current_pole.ra, 30.0, epsilon = 1e-9);
        assert_abs_diff_eq!(alignment.current_pole.dec, 89.5, epsilon = 1e-9);
        assert_abs_diff_eq!(alignment.separation_arcmin, 30.0, epsilon = 1e-6);
        assert_abs_diff_eq!(alignment.error.azimuth_arcmin, -3.5692,
                            epsilon = 0.01);
        assert_abs_diff_eq!(alignment.error.altitude_arcmin, -29.8756,
                            epsilon = 0.01);
    }

    #[test]
    fn test_end_to_end_of_date() {
        let analyzer = PolarAnalyzer::new(Box::new(
            ApparentHorizonTransform::new(EarthOrientation::default(),
                                          InputEpoch::OfDate).unwrap()));
        let alignment = analyzer.compute_alignment_error(
            &philadelphia(), &utc(2024, 1, 1, 0, 0, 0), &offset_stars())
            .unwrap();
        assert_abs_diff_eq!(alignment.true_pole_horizon.altitude, 40.0,
                            epsilon = 1e-9);
        assert_abs_diff_eq!(alignment.error.azimuth_arcmin, -3.3346,
                            epsilon = 0.01);
        assert_abs_diff_eq!(alignment.error.altitude_arcmin, -29.8918,
                            epsilon = 0.01);
    }

    #[test]
    fn test_end_to_end_terrestrial() {
        let analyzer =
            PolarAnalyzer::new(Box::new(TerrestrialHorizonTransform));
        let alignment = analyzer.compute_alignment_error(
            &philadelphia(), &utc(2024, 1, 1, 0, 0, 0), &offset_stars())
            .unwrap();
        assert_abs_diff_eq!(alignment.error.azimuth_arcmin, -37.7557,
                            epsilon = 0.01);
        assert_abs_diff_eq!(alignment.error.altitude_arcmin, 7.8668,
                            epsilon = 0.01);
    }

    #[test]
    fn test_star_order_does_not_matter() {
        let analyzer =
            PolarAnalyzer::new(Box::new(ApparentHorizonTransform::default()));
        let [a, b, c] = offset_stars();
        let time = utc(2024, 1, 1, 0, 0, 0);
        let forward = analyzer.compute_alignment_error(
            &philadelphia(), &time, &[a, b, c]).unwrap();
        let reversed = analyzer.compute_alignment_error(
            &philadelphia(), &time, &[c, b, a]).unwrap();
        assert_abs_diff_eq!(forward.error.azimuth_arcmin,
                            reversed.error.azimuth_arcmin, epsilon = 1e-9);
        assert_abs_diff_eq!(forward.error.altitude_arcmin,
                            reversed.error.altitude_arcmin, epsilon = 1e-9);
    }

    #[test]
    fn test_degenerate_stars() {
        let analyzer =
            PolarAnalyzer::new(Box::new(ApparentHorizonTransform::default()));
        // Same RA: colinear through the pole.
        let stars = [EquatorialCoordinates{ra: 0.0, dec: 88.0},
                     EquatorialCoordinates{ra: 0.0, dec: 89.0},
                     EquatorialCoordinates{ra: 0.0, dec: 89.5}];
        let result = analyzer.compute_alignment_error(
            &philadelphia(), &utc(2024, 1, 1, 0, 0, 0), &stars);
        assert!(matches!(result, Err(PolarAlignError::DegenerateInput(_))));

        // Repeated star.
        let star = EquatorialCoordinates{ra: 10.0, dec: 88.0};
        let other = EquatorialCoordinates{ra: 100.0, dec: 88.5};
        let result = analyzer.compute_alignment_error(
            &philadelphia(), &utc(2024, 1, 1, 0, 0, 0), &[star, star, other]);
        assert!(matches!(result, Err(PolarAlignError::DegenerateInput(_))));
    }

    #[test]
    fn test_invalid_input() {
        let analyzer =
            PolarAnalyzer::new(Box::new(ApparentHorizonTransform::default()));
        let mut stars = offset_stars();
        stars[1].dec = 95.0;
        let result = analyzer.compute_alignment_error(
            &philadelphia(), &utc(2024, 1, 1, 0, 0, 0), &stars);
        assert!(matches!(result, Err(PolarAlignError::InvalidInput(_))));

        let location = ObserverLocation{latitude: 100.0, ..philadelphia()};
        let result = analyzer.compute_alignment_error(
            &location, &utc(2024, 1, 1, 0, 0, 0), &offset_stars());
        assert!(matches!(result, Err(PolarAlignError::InvalidInput(_))));
    }

    #[test]
    fn test_transform_failure_propagates() {
        let analyzer = PolarAnalyzer::new(Box::new(FailingTransform));
        let result = analyzer.compute_alignment_error(
            &philadelphia(), &utc(2024, 1, 1, 0, 0, 0), &offset_stars());
        match result {
            Err(PolarAlignError::TransformFailure(e)) => {
                assert!(e.code == CanonicalErrorCode::Unavailable);
                assert_eq!(e.message, "Earth orientation data not loaded");
            },
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_parallel_calls() {
        let analyzer = Arc::new(
            PolarAnalyzer::new(Box::new(ApparentHorizonTransform::default())));
        let time = utc(2024, 1, 1, 0, 0, 0);
        let expected = analyzer.compute_alignment_error(
            &philadelphia(), &time, &offset_stars()).unwrap().error;
        let workers: Vec<_> = (0..4).map(|_| {
            let analyzer = analyzer.clone();
            thread::spawn(move || {
                analyzer.compute_alignment_error(
                    &philadelphia(), &time, &offset_stars()).unwrap().error
            })
        }).collect();
        for worker in workers {
            assert_eq!(worker.join().unwrap(), expected);
        }
    }
}  // mod tests.
