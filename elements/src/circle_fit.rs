// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use nalgebra::Complex;

use crate::align_error::PolarAlignError;
use crate::polar_projection::PlanePoint;

// Relative size of Im(w) below which the three points are taken as colinear.
const COLINEAR_TOLERANCE: f64 = 1e-12;

/// Returns the center of the unique circle through the three points.
///
/// With the points as complex numbers x, y, z and w = (z-x)/(y-x), the
/// circle is |p + c| = |x + c| where
///   c = (x-y)(w-|w|^2) / (2i Im(w)) - x
/// so the center is -c. Im(w) is zero exactly when the points are colinear;
/// that case, and coincident points, are reported as DegenerateInput.
pub fn fit_circle_center(p1: &PlanePoint, p2: &PlanePoint, p3: &PlanePoint)
                         -> Result<PlanePoint, PolarAlignError> {
    let x = Complex::new(p1.x, p1.y);
    let y = Complex::new(p2.x, p2.y);
    let z = Complex::new(p3.x, p3.y);

    let chord = y - x;
    if chord.norm_sqr() == 0.0 {
        return Err(PolarAlignError::DegenerateInput(
            format!("first and second points coincide at ({}, {})",
                    p1.x, p1.y)));
    }
    let w = (z - x) / chord;
    // Also rejects z == x (w is zero) and non-finite inputs.
    if !(w.im.abs() > COLINEAR_TOLERANCE * w.norm()) {
        return Err(PolarAlignError::DegenerateInput(
            format!("points ({}, {}), ({}, {}), ({}, {}) are colinear",
                    p1.x, p1.y, p2.x, p2.y, p3.x, p3.y)));
    }
    let c = (x - y) * (w - w.norm_sqr()) / Complex::new(0.0, 2.0 * w.im) - x;

    let center = PlanePoint{x: -c.re, y: -c.im};
    if !center.x.is_finite() || !center.y.is_finite() {
        return Err(PolarAlignError::DegenerateInput(
            format!("circle center ({}, {}) is not finite",
                    center.x, center.y)));
    }
    Ok(center)
}

// mod tests.
