//! Aspect ratio parsing and the supported ratio set.
//!
//! Ratios are written as `"RW:RH"` tokens (e.g. `"4:5"`). The crop
//! rectangle maintains `width / height == rw / rh` at all times, so the
//! parsed ratio is the single source of truth for all geometry derivation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ratio tokens offered by the selection surface.
pub const SUPPORTED_RATIOS: [&str; 5] = ["1:1", "4:5", "3:4", "9:16", "16:9"];

/// Errors that can occur while parsing a ratio token.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RatioParseError {
    /// The token is not of the form `RW:RH`.
    #[error("Invalid ratio token: {0:?} (expected \"RW:RH\")")]
    Malformed(String),

    /// One of the two components is not a positive number.
    #[error("Ratio components must be positive: {0:?}")]
    NonPositive(String),
}

/// A target width:height ratio for the crop rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AspectRatio {
    /// Ratio width component (positive).
    pub rw: f64,
    /// Ratio height component (positive).
    pub rh: f64,
}

impl AspectRatio {
    /// Create a ratio from its two components.
    ///
    /// Callers must pass positive components; parsing via [`FromStr`]
    /// enforces this for untrusted input.
    pub fn new(rw: f64, rh: f64) -> Self {
        debug_assert!(rw > 0.0 && rh > 0.0, "ratio components must be positive");
        Self { rw, rh }
    }

    /// The scalar aspect value `rw / rh`.
    pub fn value(&self) -> f64 {
        self.rw / self.rh
    }
}

impl Default for AspectRatio {
    /// Square, matching the initial selection in the ratio surface.
    fn default() -> Self {
        Self { rw: 1.0, rh: 1.0 }
    }
}

impl FromStr for AspectRatio {
    type Err = RatioParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (rw, rh) = s
            .split_once(':')
            .ok_or_else(|| RatioParseError::Malformed(s.to_string()))?;

        let rw: f64 = rw
            .trim()
            .parse()
            .map_err(|_| RatioParseError::Malformed(s.to_string()))?;
        let rh: f64 = rh
            .trim()
            .parse()
            .map_err(|_| RatioParseError::Malformed(s.to_string()))?;

        if !rw.is_finite() || !rh.is_finite() || rw <= 0.0 || rh <= 0.0 {
            return Err(RatioParseError::NonPositive(s.to_string()));
        }

        Ok(Self { rw, rh })
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Integer-valued components render without a fractional part,
        // so the supported tokens round-trip exactly.
        if self.rw.fract() == 0.0 && self.rh.fract() == 0.0 {
            write!(f, "{}:{}", self.rw as i64, self.rh as i64)
        } else {
            write!(f, "{}:{}", self.rw, self.rh)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_supported_tokens() {
        for token in SUPPORTED_RATIOS {
            let ratio: AspectRatio = token.parse().unwrap();
            assert!(ratio.value() > 0.0);
            assert_eq!(ratio.to_string(), token);
        }
    }

    #[test]
    fn test_parse_values() {
        let ratio: AspectRatio = "4:5".parse().unwrap();
        assert_eq!(ratio.rw, 4.0);
        assert_eq!(ratio.rh, 5.0);
        assert!((ratio.value() - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            "16x9".parse::<AspectRatio>(),
            Err(RatioParseError::Malformed(_))
        ));
        assert!(matches!(
            "".parse::<AspectRatio>(),
            Err(RatioParseError::Malformed(_))
        ));
        assert!(matches!(
            "a:b".parse::<AspectRatio>(),
            Err(RatioParseError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_rejects_non_positive() {
        assert!(matches!(
            "0:1".parse::<AspectRatio>(),
            Err(RatioParseError::NonPositive(_))
        ));
        assert!(matches!(
            "-4:5".parse::<AspectRatio>(),
            Err(RatioParseError::NonPositive(_))
        ));
        assert!(matches!(
            "inf:1".parse::<AspectRatio>(),
            Err(RatioParseError::NonPositive(_))
        ));
    }

    #[test]
    fn test_parse_tolerates_whitespace() {
        let ratio: AspectRatio = " 16 : 9 ".parse().unwrap();
        assert_eq!(ratio.rw, 16.0);
        assert_eq!(ratio.rh, 9.0);
    }

    #[test]
    fn test_default_is_square() {
        assert_eq!(AspectRatio::default().value(), 1.0);
    }
}
