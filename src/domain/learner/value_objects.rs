use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::errors::LearnerError;
use super::rules::{MAX_AVERAGE, MIN_AVERAGE};

// ============================================================================
// Learner Value Objects
// ============================================================================

/// Externally assigned learner identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LearnerId(pub i64);

impl LearnerId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for LearnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ----------------------------------------------------------------------------
// Threshold ladders
// ----------------------------------------------------------------------------

/// One rung of an ordered first-match ladder over averages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Threshold {
    /// value >= bound
    AtLeast(f64),
    /// value > bound
    Above(f64),
}

impl Threshold {
    pub fn admits(&self, value: f64) -> bool {
        match *self {
            Threshold::AtLeast(bound) => value >= bound,
            Threshold::Above(bound) => value > bound,
        }
    }
}

/// Evaluate `ladder` top-down and return the result of the first admitting rung.
pub fn first_match<T: Copy>(ladder: &[(Threshold, T)], value: f64) -> Option<T> {
    ladder
        .iter()
        .find(|(threshold, _)| threshold.admits(value))
        .map(|(_, result)| *result)
}

// ----------------------------------------------------------------------------
// Average
// ----------------------------------------------------------------------------

/// Performance classification of a course average, best first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PerformanceLevel {
    Excellent,
    VeryGood,
    Good,
    Average,
    BelowAverage,
}

const PERFORMANCE_LADDER: [(Threshold, PerformanceLevel); 4] = [
    (Threshold::AtLeast(9.0), PerformanceLevel::Excellent),
    (Threshold::AtLeast(8.0), PerformanceLevel::VeryGood),
    (Threshold::Above(7.0), PerformanceLevel::Good),
    (Threshold::AtLeast(6.0), PerformanceLevel::Average),
];

/// Course score in [0.0, 10.0], rounded half-up to two decimals on construction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Average(f64);

impl Average {
    pub fn of(value: f64) -> Result<Self, LearnerError> {
        // NaN fails `contains` as well
        if !(MIN_AVERAGE..=MAX_AVERAGE).contains(&value) {
            return Err(LearnerError::AverageOutOfRange(value));
        }
        Ok(Self(round_half_up_2dp(value)))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn is_above(&self, threshold: f64) -> bool {
        self.0 > threshold
    }

    pub fn is_below(&self, threshold: f64) -> bool {
        self.0 < threshold
    }

    pub fn is_exactly(&self, threshold: f64) -> bool {
        self.0.total_cmp(&threshold) == Ordering::Equal
    }

    pub fn classify(&self) -> PerformanceLevel {
        first_match(&PERFORMANCE_LADDER, self.0).unwrap_or(PerformanceLevel::BelowAverage)
    }
}

/// Rounds on the shortest decimal representation of `value`, so 8.445 rounds
/// to 8.45 even though its binary form sits just below 8.445.
fn round_half_up_2dp(value: f64) -> f64 {
    Decimal::from_str(&value.to_string())
        .ok()
        .map(|d| d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
        // mantissa / 10^scale are both exact in f64 here, so the quotient is the nearest double
        .map(|d| d.mantissa() as f64 / 10f64.powi(d.scale() as i32))
        .unwrap_or_else(|| (value * 100.0).round() / 100.0)
}

impl PartialEq for Average {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Average {}

impl PartialOrd for Average {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Average {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl TryFrom<f64> for Average {
    type Error = LearnerError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::of(value)
    }
}

impl From<Average> for f64 {
    fn from(average: Average) -> Self {
        average.0
    }
}

impl fmt::Display for Average {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

// ----------------------------------------------------------------------------
// Credits
// ----------------------------------------------------------------------------

/// Non-negative credit balance. Arithmetic returns new values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credits(u32);

impl Credits {
    pub fn of(amount: i64) -> Result<Self, LearnerError> {
        if amount < 0 {
            return Err(LearnerError::NegativeCredits(amount));
        }
        u32::try_from(amount)
            .map(Self)
            .map_err(|_| LearnerError::CreditsOverflow {
                current: u32::MAX,
                added: 0,
            })
    }

    pub fn zero() -> Self {
        Self(0)
    }

    pub fn amount(&self) -> u32 {
        self.0
    }

    pub fn add(&self, amount: u32) -> Result<Self, LearnerError> {
        self.0
            .checked_add(amount)
            .map(Self)
            .ok_or(LearnerError::CreditsOverflow {
                current: self.0,
                added: amount,
            })
    }

    pub fn subtract(&self, amount: u32) -> Result<Self, LearnerError> {
        if self.0 < amount {
            return Err(LearnerError::InsufficientCredits {
                available: self.0,
                requested: amount,
            });
        }
        Ok(Self(self.0 - amount))
    }

    pub fn has_at_least(&self, required: u32) -> bool {
        self.0 >= required
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Credits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} credits", self.0)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
