// ============================================================================
// Application Layer - use cases over the Learner domain
// ============================================================================
//
// - repository     - LearnerRepository port + in-memory adapter
// - progress_service - registration, course completion, credit adjustments
// - recommendation - course suggestions through a TextGenerator port
//
// ============================================================================

pub mod progress_service;
pub mod recommendation;
pub mod repository;

pub use progress_service::{CourseCompletion, ProgressService};
pub use recommendation::{RecommendationError, RecommendationService, TextGenerator};
pub use repository::{InMemoryLearnerRepository, LearnerRepository};
