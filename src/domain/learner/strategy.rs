use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::LearnerError;
use super::rules::{CREDITS_PER_PASSED_COURSE, PASSING_THRESHOLD};
use super::value_objects::{first_match, Average, Threshold};

// ============================================================================
// Credit Award Strategies
// ============================================================================

/// Maps a course average to the number of credits it earns.
pub trait CreditStrategy: Send + Sync {
    fn calculate_credits(&self, average: &Average) -> u32;

    fn name(&self) -> &'static str;
}

/// Flat award above the passing threshold (strict).
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardCreditStrategy;

impl CreditStrategy for StandardCreditStrategy {
    fn calculate_credits(&self, average: &Average) -> u32 {
        if average.is_above(PASSING_THRESHOLD) {
            CREDITS_PER_PASSED_COURSE
        } else {
            0
        }
    }

    fn name(&self) -> &'static str {
        "Standard"
    }
}

const PREMIUM_TIERS: [(Threshold, u32); 3] = [
    (Threshold::AtLeast(9.0), 5),
    (Threshold::AtLeast(8.0), 4),
    (Threshold::Above(PASSING_THRESHOLD), 3),
];

/// Tiered award, never below Standard where Standard pays out.
#[derive(Debug, Clone, Copy, Default)]
pub struct PremiumCreditStrategy;

impl CreditStrategy for PremiumCreditStrategy {
    fn calculate_credits(&self, average: &Average) -> u32 {
        first_match(&PREMIUM_TIERS, average.value()).unwrap_or(0)
    }

    fn name(&self) -> &'static str {
        "Premium"
    }
}

static STANDARD: StandardCreditStrategy = StandardCreditStrategy;
static PREMIUM: PremiumCreditStrategy = PremiumCreditStrategy;

// ============================================================================
// Strategy Registry
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyType {
    Standard,
    Premium,
}

impl fmt::Display for StrategyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyType::Standard => write!(f, "STANDARD"),
            StrategyType::Premium => write!(f, "PREMIUM"),
        }
    }
}

impl FromStr for StrategyType {
    type Err = LearnerError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag.trim().to_ascii_uppercase().as_str() {
            "STANDARD" => Ok(StrategyType::Standard),
            "PREMIUM" => Ok(StrategyType::Premium),
            _ => Err(LearnerError::StrategyNotFound(tag.to_string())),
        }
    }
}

/// Fixed lookup from strategy tag to a process-wide strategy instance.
pub struct CreditStrategyRegistry {
    strategies: HashMap<StrategyType, &'static dyn CreditStrategy>,
}

impl CreditStrategyRegistry {
    pub fn new() -> Self {
        let mut strategies: HashMap<StrategyType, &'static dyn CreditStrategy> = HashMap::new();
        strategies.insert(StrategyType::Standard, &STANDARD);
        strategies.insert(StrategyType::Premium, &PREMIUM);
        Self { strategies }
    }

    pub fn get(&self, strategy_type: StrategyType) -> Result<&'static dyn CreditStrategy, LearnerError> {
        self.strategies
            .get(&strategy_type)
            .copied()
            .ok_or_else(|| LearnerError::StrategyNotFound(strategy_type.to_string()))
    }

    /// Resolve a free-form tag such as `"premium"`.
    pub fn get_by_tag(&self, tag: &str) -> Result<&'static dyn CreditStrategy, LearnerError> {
        self.get(tag.parse()?)
    }

    pub fn default_strategy(&self) -> &'static dyn CreditStrategy {
        &STANDARD
    }
}

impl Default for CreditStrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn avg(v: f64) -> Average {
        Average::of(v).unwrap()
    }

    #[test]
    fn test_standard_threshold_is_strict() {
        let strategy = StandardCreditStrategy;
        assert_eq!(strategy.calculate_credits(&avg(7.0)), 0);
        assert_eq!(strategy.calculate_credits(&avg(7.1)), 3);
        assert_eq!(strategy.calculate_credits(&avg(10.0)), 3);
        assert_eq!(strategy.calculate_credits(&avg(0.0)), 0);
        assert_eq!(strategy.name(), "Standard");
    }

    #[test]
    fn test_premium_tiers() {
        let strategy = PremiumCreditStrategy;
        assert_eq!(strategy.calculate_credits(&avg(9.0)), 5);
        assert_eq!(strategy.calculate_credits(&avg(8.5)), 4);
        assert_eq!(strategy.calculate_credits(&avg(8.0)), 4);
        assert_eq!(strategy.calculate_credits(&avg(7.5)), 3);
        assert_eq!(strategy.calculate_credits(&avg(7.0)), 0);
        assert_eq!(strategy.calculate_credits(&avg(3.0)), 0);
        assert_eq!(strategy.name(), "Premium");
    }

    #[test]
    fn test_premium_never_pays_less_than_standard() {
        for hundredth in 0u32..=1000 {
            let a = avg(f64::from(hundredth) / 100.0);
            assert!(PremiumCreditStrategy.calculate_credits(&a) >= StandardCreditStrategy.calculate_credits(&a));
        }
    }

    #[test]
    fn test_registry_lookup() {
        let registry = CreditStrategyRegistry::new();
        assert_eq!(registry.get(StrategyType::Standard).unwrap().name(), "Standard");
        assert_eq!(registry.get(StrategyType::Premium).unwrap().name(), "Premium");
        assert_eq!(registry.default_strategy().name(), "Standard");
    }

    #[test]
    fn test_registry_by_tag() {
        let registry = CreditStrategyRegistry::default();
        assert_eq!(registry.get_by_tag("premium").unwrap().name(), "Premium");

        let err = registry.get_by_tag("GOLD").err().unwrap();
        assert!(matches!(err, LearnerError::StrategyNotFound(ref tag) if tag == "GOLD"));
    }

    #[test]
    fn test_registry_returns_singletons() {
        let registry = CreditStrategyRegistry::new();
        let a = registry.get(StrategyType::Premium).unwrap();
        let b = registry.get(StrategyType::Premium).unwrap();
        assert!(std::ptr::addr_eq(a as *const dyn CreditStrategy, b as *const dyn CreditStrategy));
    }
}
