use std::sync::Arc;

use crate::domain::learner::rules::PASSING_THRESHOLD;
use crate::domain::learner::{
    Average, CourseCompletedEvent, CreditStrategy, CreditStrategyRegistry, Credits, Learner, LearnerError,
    LearnerId,
};
use crate::messaging::{EventPublisher, PublishReport};

use super::repository::LearnerRepository;

// ============================================================================
// Progress Service - learner use cases
// ============================================================================
//
// Orchestrates: validate → load → Learner → save → CourseCompletedEvent → publish
//
// The save and the publish are two separate writes. A crash between them
// loses the event; there is no outbox behind this service.
//
// ============================================================================

/// Result of a course completion.
#[derive(Debug, Clone)]
pub struct CourseCompletion {
    pub learner: Learner,
    pub credits_awarded: u32,
    pub event: CourseCompletedEvent,
    pub publish: PublishReport,
}

pub struct ProgressService {
    repository: Arc<dyn LearnerRepository>,
    publisher: EventPublisher,
    strategy: &'static dyn CreditStrategy,
}

impl ProgressService {
    pub fn new(repository: Arc<dyn LearnerRepository>, publisher: EventPublisher) -> Self {
        Self {
            repository,
            publisher,
            strategy: CreditStrategyRegistry::new().default_strategy(),
        }
    }

    /// Award credits with `strategy` instead of the standard rule.
    pub fn with_strategy(mut self, strategy: &'static dyn CreditStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub async fn register_learner(&self, name: &str, initial_credits: i64) -> Result<Learner, LearnerError> {
        let learner = Learner::with_credits(name, Credits::of(initial_credits)?)?;
        let saved = self.repository.save(learner).await?;

        tracing::info!(learner_id = ?saved.id(), name = %saved.name(), "Learner registered");
        Ok(saved)
    }

    pub async fn get_learner(&self, id: LearnerId) -> Result<Learner, LearnerError> {
        self.repository.load(id).await
    }

    pub async fn list_learners(&self) -> Result<Vec<Learner>, LearnerError> {
        self.repository.list().await
    }

    /// Record a completed course and publish the resulting event.
    ///
    /// The average is validated before the learner is loaded. Publishing
    /// never fails the call.
    pub async fn complete_course(&self, id: LearnerId, raw_average: f64) -> Result<CourseCompletion, LearnerError> {
        let average = Average::of(raw_average)?;

        let mut learner = self.repository.load(id).await?;
        let credits_awarded = learner.complete_course_with(average, self.strategy)?;
        let learner = self.repository.save(learner).await?;

        let passed = average.is_above(PASSING_THRESHOLD);
        let event = CourseCompletedEvent::of(
            id,
            learner.name(),
            learner.completed_courses(),
            learner.credits().amount(),
            average.value(),
            passed,
        );

        let publish = self.publisher.publish(&event).await;

        tracing::info!(
            learner_id = %id,
            average = %average,
            passed,
            credits_awarded,
            "Course completed"
        );

        Ok(CourseCompletion {
            learner,
            credits_awarded,
            event,
            publish,
        })
    }

    pub async fn add_credits(&self, id: LearnerId, amount: u32) -> Result<Learner, LearnerError> {
        let mut learner = self.repository.load(id).await?;
        learner.add_credits(amount)?;
        self.repository.save(learner).await
    }

    pub async fn deduct_credits(&self, id: LearnerId, amount: u32) -> Result<Learner, LearnerError> {
        let mut learner = self.repository.load(id).await?;
        learner.deduct_credits(amount)?;
        self.repository.save(learner).await
    }
}
