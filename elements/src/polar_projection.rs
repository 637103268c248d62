// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

// Maps sky positions near the north celestial pole onto a plane centered on
// the pole, and back.
//
// The mapping is polar-to-Cartesian: radius is the polar distance 90-dec
// (degrees, used as a plain number) and the angle is the right ascension.
// Circles around the pole stay circles, but other circles on the sky are
// only approximately circular in the plane, so the circle fit built on this
// projection degrades for stars far from the pole.

use crate::align_error::PolarAlignError;
use crate::astro_util::wrap_360;
use crate::horizon_trait::EquatorialCoordinates;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanePoint {
    pub x: f64,
    pub y: f64,
}

pub fn project(equatorial: &EquatorialCoordinates) -> PlanePoint {
    let radius = 90.0 - equatorial.dec;
    let angle = equatorial.ra.to_radians();
    PlanePoint{x: radius * angle.cos(), y: radius * angle.sin()}
}

/// Inverse of project(). Fails if the point is not finite or is farther
/// than 180 from the origin (beyond the south pole).
pub fn unproject(point: &PlanePoint)
                 -> Result<EquatorialCoordinates, PolarAlignError> {
    if !point.x.is_finite() || !point.y.is_finite() {
        return Err(PolarAlignError::DegenerateInput(
            format!("plane point ({}, {}) is not finite", point.x, point.y)));
    }
    let radius = point.x.hypot(point.y);
    if radius > 180.0 {
        return Err(PolarAlignError::DegenerateInput(
            format!("plane point ({}, {}) is {} from the pole", point.x,
                    point.y, radius)));
    }
    // atan2() is -180..180; negative angles wrap to 180..360.
    let ra = wrap_360(point.y.atan2(point.x).to_degrees());
    Ok(EquatorialCoordinates{ra, dec: 90.0 - radius})
}

#[cfg(test)]
mod tests {
    extern crate approx;
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_pole_projects_to_origin() {
        for ra in [0.0, 45.0, 123.4, 270.0, 359.9] {
            let p = project(&EquatorialCoordinates{ra, dec: 90.0});
            assert_abs_diff_eq!(p.x, 0.0, epsilon = 1e-12);
            assert_abs_diff_eq!(p.y, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_project() {
        let p = project(&EquatorialCoordinates{ra: 90.0, dec: 88.0});
        assert_abs_diff_eq!(p.x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.y, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_unproject_all_quadrants() {
        let cases = [
            (PlanePoint{x: 1.0, y: 1.0}, 45.0),
            (PlanePoint{x: -1.0, y: 1.0}, 135.0),
            (PlanePoint{x: -1.0, y: -1.0}, 225.0),
            (PlanePoint{x: 1.0, y: -1.0}, 315.0),
            (PlanePoint{x: 1.0, y: 0.0}, 0.0),
            (PlanePoint{x: -1.0, y: 0.0}, 180.0),
            (PlanePoint{x: 0.0, y: -1.0}, 270.0),
        ];
        for (point, expected_ra) in cases {
            let eq = unproject(&point).unwrap();
            assert_abs_diff_eq!(eq.ra, expected_ra, epsilon = 1e-9);
            assert_abs_diff_eq!(eq.dec, 90.0 - point.x.hypot(point.y),
                                epsilon = 1e-12);
            let back = project(&eq);
            assert_abs_diff_eq!(back.x, point.x, epsilon = 1e-9);
            assert_abs_diff_eq!(back.y, point.y, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_unproject_rejects_off_sphere() {
        assert!(matches!(unproject(&PlanePoint{x: 181.0, y: 0.0}),
                         Err(PolarAlignError::DegenerateInput(_))));
        assert!(matches!(unproject(&PlanePoint{x: f64::NAN, y: 0.0}),
                         Err(PolarAlignError::DegenerateInput(_))));
    }
}  // mod tests.
