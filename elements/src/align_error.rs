// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::fmt;

use canonical_error::{CanonicalError, failed_precondition_error,
                      invalid_argument_error};

// Ways in which a polar alignment computation can fail. All of them are
// terminal for that computation; the caller decides whether to re-observe.
#[derive(Debug)]
pub enum PolarAlignError {
    // A coordinate is out of range or not finite.
    InvalidInput(String),

    // The three stars do not determine a circle (colinear or coincident in
    // the projected plane), or the fitted center is not a sky position.
    DegenerateInput(String),

    // The horizon transform failed. Passed through unchanged.
    TransformFailure(CanonicalError),
}

impl fmt::Display for PolarAlignError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolarAlignError::InvalidInput(msg) =>
                write!(f, "invalid input: {}", msg),
            PolarAlignError::DegenerateInput(msg) =>
                write!(f, "degenerate input: {}", msg),
            PolarAlignError::TransformFailure(e) =>
                write!(f, "horizon transform failed: {:?}", e),
        }
    }
}

impl std::error::Error for PolarAlignError {}

impl From<PolarAlignError> for CanonicalError {
    fn from(e: PolarAlignError) -> Self {
        match e {
            PolarAlignError::InvalidInput(msg) =>
                invalid_argument_error(msg.as_str()),
            PolarAlignError::DegenerateInput(msg) =>
                failed_precondition_error(msg.as_str()),
            PolarAlignError::TransformFailure(e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use canonical_error::{CanonicalErrorCode, unavailable_error};

    use super::*;

    #[test]
    fn test_canonical_mapping() {
        let e: CanonicalError =
            PolarAlignError::InvalidInput("dec 91".to_string()).into();
        assert!(e.code == CanonicalErrorCode::InvalidArgument);
        assert_eq!(e.message, "dec 91");

        let e: CanonicalError =
            PolarAlignError::DegenerateInput("colinear".to_string()).into();
        assert!(e.code == CanonicalErrorCode::FailedPrecondition);

        let e: CanonicalError = PolarAlignError::TransformFailure(
            unavailable_error("no EOP")).into();
        assert!(e.code == CanonicalErrorCode::Unavailable);
        assert_eq!(e.message, "no EOP");
    }

    #[test]
    fn test_display() {
        let e = PolarAlignError::DegenerateInput("colinear".to_string());
        assert_eq!(e.to_string(), "degenerate input: colinear");
    }
}  // mod tests.
