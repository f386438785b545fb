use super::errors::LearnerError;
use super::strategy::{CreditStrategy, StandardCreditStrategy};
use super::value_objects::{Average, Credits, LearnerId};

// ============================================================================
// Learner Aggregate - Domain Logic
// ============================================================================
//
// Invariants:
// 1. completed_courses never decreases
// 2. credits never go negative (enforced by Credits)
// 3. name is never empty
//
// The aggregate does not publish anything. Building and publishing the
// CourseCompletedEvent is the application layer's job.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Learner {
    // Identity, assigned by the repository on first save
    id: Option<LearnerId>,

    name: String,
    completed_courses: u32,
    credits: Credits,
}

/// Input accepted by [`Learner::complete_course`]: a validated average or a
/// raw score that still has to pass `Average::of`.
pub trait IntoAverage {
    fn into_average(self) -> Result<Average, LearnerError>;
}

impl IntoAverage for Average {
    fn into_average(self) -> Result<Average, LearnerError> {
        Ok(self)
    }
}

impl IntoAverage for f64 {
    fn into_average(self) -> Result<Average, LearnerError> {
        Average::of(self)
    }
}

impl Learner {
    pub fn new(name: impl Into<String>) -> Result<Self, LearnerError> {
        Self::with_credits(name, Credits::zero())
    }

    pub fn with_credits(name: impl Into<String>, credits: Credits) -> Result<Self, LearnerError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(LearnerError::EmptyName);
        }

        Ok(Self {
            id: None,
            name,
            completed_courses: 0,
            credits,
        })
    }

    pub fn assign_id(&mut self, id: LearnerId) {
        self.id = Some(id);
    }

    /// Record a completed course and award credits with the standard rule.
    pub fn complete_course(&mut self, average: impl IntoAverage) -> Result<u32, LearnerError> {
        self.complete_course_with(average, &StandardCreditStrategy)
    }

    /// Record a completed course and award whatever `strategy` grants.
    /// Returns the number of credits awarded.
    pub fn complete_course_with(
        &mut self,
        average: impl IntoAverage,
        strategy: &dyn CreditStrategy,
    ) -> Result<u32, LearnerError> {
        let average = average.into_average()?;
        let award = strategy.calculate_credits(&average);
        // Compute the new balance before touching state so a failure leaves us unchanged
        let credits = self.credits.add(award)?;

        self.completed_courses = self.completed_courses.saturating_add(1);
        self.credits = credits;

        tracing::debug!(
            learner_id = ?self.id,
            average = %average,
            award = award,
            strategy = strategy.name(),
            completed_courses = self.completed_courses,
            "Course completed"
        );

        Ok(award)
    }

    pub fn add_credits(&mut self, amount: u32) -> Result<(), LearnerError> {
        self.credits = self.credits.add(amount)?;
        Ok(())
    }

    pub fn deduct_credits(&mut self, amount: u32) -> Result<(), LearnerError> {
        self.credits = self.credits.subtract(amount)?;
        Ok(())
    }

    pub fn has_enough_credits(&self, required: u32) -> bool {
        self.credits.has_at_least(required)
    }

    pub fn id(&self) -> Option<LearnerId> {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn completed_courses(&self) -> u32 {
        self.completed_courses
    }

    pub fn credits(&self) -> Credits {
        self.credits
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
