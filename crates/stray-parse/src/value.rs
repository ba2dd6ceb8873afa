//! Primitive value parsing for command arguments.

use crate::error::ValueError;

/// Words accepted as boolean `true`, matched case-insensitively.
pub const TRUE_WORDS: &[&str] = &["yes", "y", "true", "t", "1", "enable", "on"];

/// Words accepted as boolean `false`, matched case-insensitively.
pub const FALSE_WORDS: &[&str] = &["no", "n", "false", "f", "0", "disable", "off"];

/// Which side of a bounds check was violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// Value was below the minimum.
    Min,
    /// Value was above the maximum.
    Max,
}

impl std::fmt::Display for Bound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Min => write!(f, "minimum"),
            Self::Max => write!(f, "maximum"),
        }
    }
}

/// What to do with a number that violates a bound.
///
/// Canonical behavior is to clamp; reject is available for callers that
/// prefer a hard error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundsPolicy {
    /// Pull the value back to the violated bound.
    #[default]
    Clamp,
    /// Fail with [`ValueError::OutOfRange`].
    Reject,
}

/// Optional numeric bounds and the policy applied when they are exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bounds {
    /// Inclusive lower bound.
    pub min: Option<i64>,
    /// Inclusive upper bound.
    pub max: Option<i64>,
    /// Clamp or reject on violation.
    pub policy: BoundsPolicy,
}

impl Bounds {
    /// Bounds with the given limits and the default (clamp) policy.
    pub fn new(min: Option<i64>, max: Option<i64>) -> Self {
        Self {
            min,
            max,
            policy: BoundsPolicy::default(),
        }
    }

    /// Replace the violation policy.
    pub fn with_policy(mut self, policy: BoundsPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Apply the bounds to a parsed value.
    pub fn apply(&self, value: i64) -> Result<i64, ValueError> {
        if let Some(min) = self.min {
            if value < min {
                return match self.policy {
                    BoundsPolicy::Clamp => Ok(min),
                    BoundsPolicy::Reject => Err(ValueError::OutOfRange {
                        value,
                        bound: Bound::Min,
                        limit: min,
                    }),
                };
            }
        }
        if let Some(max) = self.max {
            if value > max {
                return match self.policy {
                    BoundsPolicy::Clamp => Ok(max),
                    BoundsPolicy::Reject => Err(ValueError::OutOfRange {
                        value,
                        bound: Bound::Max,
                        limit: max,
                    }),
                };
            }
        }
        Ok(value)
    }
}

/// Parse a base-10 signed integer token.
pub fn parse_i64(token: &str) -> Result<i64, ValueError> {
    token
        .trim()
        .parse::<i64>()
        .map_err(|_| ValueError::InvalidNumber(token.to_string()))
}

/// Parse a boolean word token, case-insensitively.
pub fn parse_bool(token: &str) -> Result<bool, ValueError> {
    let lowered = token.to_lowercase();
    if TRUE_WORDS.contains(&lowered.as_str()) {
        Ok(true)
    } else if FALSE_WORDS.contains(&lowered.as_str()) {
        Ok(false)
    } else {
        Err(ValueError::InvalidBool(token.to_string()))
    }
}
