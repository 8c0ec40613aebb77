//! Match score and the strong-match threshold.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::ValidationError;

/// Threshold separating a strong match from a weak one.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.65;

/// Item-to-intention compatibility in [0, 1], kept at 4 decimal places.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct MatchScore(f64);

impl MatchScore {
    /// Rounds to 4 decimals and rejects non-finite or out-of-range input.
    pub fn new(raw: f64) -> Result<Self, ValidationError> {
        if !raw.is_finite() || !(0.0..=1.0).contains(&raw) {
            return Err(ValidationError::invalid_format(
                "score",
                format!("{} is not a number in [0, 1]", raw),
            ));
        }
        Ok(Self((raw * 10_000.0).round() / 10_000.0))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn is_strong(&self, threshold: MatchThreshold) -> bool {
        self.0 >= threshold.value()
    }
}

impl TryFrom<f64> for MatchScore {
    type Error = ValidationError;

    fn try_from(raw: f64) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<MatchScore> for f64 {
    fn from(score: MatchScore) -> Self {
        score.0
    }
}

impl fmt::Display for MatchScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}

/// Configured cut-off for a strong match.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct MatchThreshold(f64);

impl MatchThreshold {
    pub fn new(value: f64) -> Result<Self, ValidationError> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(ValidationError::invalid_format(
                "match_threshold",
                format!("{} is not a number in [0, 1]", value),
            ));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl Default for MatchThreshold {
    fn default() -> Self {
        Self(DEFAULT_MATCH_THRESHOLD)
    }
}

impl TryFrom<f64> for MatchThreshold {
    type Error = ValidationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MatchThreshold> for f64 {
    fn from(threshold: MatchThreshold) -> Self {
        threshold.0
    }
}
