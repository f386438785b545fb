use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::event::DomainEvent;
use super::rules::{CERTIFICATE_THRESHOLD, MILESTONE_INTERVAL};
use super::value_objects::LearnerId;

// ============================================================================
// Learner Domain Events
// ============================================================================

pub const COURSE_COMPLETED: &str = "COURSE_COMPLETED";

/// Snapshot of a learner right after a course completion.
///
/// Wire shape (camelCase JSON):
/// `learnerId, learnerName, completedCourses, currentCredits, courseAverage,
/// passed, occurredAt (ISO-8601), eventType`.
///
/// Equality covers every field, `occurred_at` included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseCompletedEvent {
    learner_id: LearnerId,
    learner_name: String,
    completed_courses: u32,
    current_credits: u32,
    course_average: f64,
    passed: bool,
    occurred_at: DateTime<Utc>,
    event_type: String,
}

impl CourseCompletedEvent {
    pub fn of(
        learner_id: LearnerId,
        learner_name: impl Into<String>,
        completed_courses: u32,
        current_credits: u32,
        course_average: f64,
        passed: bool,
    ) -> Self {
        Self {
            learner_id,
            learner_name: learner_name.into(),
            completed_courses,
            current_credits,
            course_average,
            passed,
            occurred_at: Utc::now(),
            event_type: COURSE_COMPLETED.to_string(),
        }
    }

    /// Passed with an average of at least 7.0. Inclusive, unlike the credit award.
    pub fn deserves_certificate(&self) -> bool {
        self.passed && self.course_average >= CERTIFICATE_THRESHOLD
    }

    /// Every fifth completed course. Zero counts as a milestone too.
    pub fn is_milestone(&self) -> bool {
        self.completed_courses % MILESTONE_INTERVAL == 0
    }

    pub fn learner_id(&self) -> LearnerId {
        self.learner_id
    }

    pub fn learner_name(&self) -> &str {
        &self.learner_name
    }

    pub fn completed_courses(&self) -> u32 {
        self.completed_courses
    }

    pub fn current_credits(&self) -> u32 {
        self.current_credits
    }

    pub fn course_average(&self) -> f64 {
        self.course_average
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn event_type_tag(&self) -> &str {
        &self.event_type
    }
}

impl DomainEvent for CourseCompletedEvent {
    fn event_type() -> &'static str {
        COURSE_COMPLETED
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}
