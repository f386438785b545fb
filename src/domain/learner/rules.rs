// ============================================================================
// Learner Business Rules
// ============================================================================

/// Credits awarded by the standard rule for a course passed above the threshold.
pub const CREDITS_PER_PASSED_COURSE: u32 = 3;

/// Averages strictly above this value earn credits. Certificates use `>=`.
pub const PASSING_THRESHOLD: f64 = 7.0;

/// Inclusive certificate bar for course completions.
pub const CERTIFICATE_THRESHOLD: f64 = 7.0;

pub const MIN_AVERAGE: f64 = 0.0;
pub const MAX_AVERAGE: f64 = 10.0;

/// Every N-th completed course is a milestone.
pub const MILESTONE_INTERVAL: u32 = 5;
