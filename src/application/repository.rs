use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::learner::{Learner, LearnerError, LearnerId};

// ============================================================================
// Learner Repository - persistence port
// ============================================================================
//
// `save` is atomic per call and returns the stored learner (with its id).
// There is no version check: two load-modify-save sequences on the same
// learner race, and the last save wins.
//
// ============================================================================

#[async_trait]
pub trait LearnerRepository: Send + Sync {
    async fn load(&self, id: LearnerId) -> Result<Learner, LearnerError>;

    async fn save(&self, learner: Learner) -> Result<Learner, LearnerError>;

    async fn list(&self) -> Result<Vec<Learner>, LearnerError>;
}

/// Process-local store, ids start at 1.
pub struct InMemoryLearnerRepository {
    learners: RwLock<BTreeMap<LearnerId, Learner>>,
    next_id: AtomicI64,
}

impl InMemoryLearnerRepository {
    pub fn new() -> Self {
        Self {
            learners: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for InMemoryLearnerRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LearnerRepository for InMemoryLearnerRepository {
    async fn load(&self, id: LearnerId) -> Result<Learner, LearnerError> {
        self.learners
            .read()
            .get(&id)
            .cloned()
            .ok_or(LearnerError::LearnerNotFound(id.value()))
    }

    async fn save(&self, mut learner: Learner) -> Result<Learner, LearnerError> {
        let id = match learner.id() {
            Some(id) => id,
            None => {
                let id = LearnerId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
                learner.assign_id(id);
                id
            }
        };

        self.learners.write().insert(id, learner.clone());
        Ok(learner)
    }

    async fn list(&self) -> Result<Vec<Learner>, LearnerError> {
        Ok(self.learners.read().values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::learner::Credits;

    #[tokio::test]
    async fn test_save_assigns_sequential_ids() {
        let repo = InMemoryLearnerRepository::new();

        let ada = repo.save(Learner::new("Ada").unwrap()).await.unwrap();
        let lin = repo.save(Learner::new("Lin").unwrap()).await.unwrap();

        assert_eq!(ada.id(), Some(LearnerId::new(1)));
        assert_eq!(lin.id(), Some(LearnerId::new(2)));
        assert_eq!(repo.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_save_existing_overwrites() {
        let repo = InMemoryLearnerRepository::new();
        let mut ada = repo.save(Learner::new("Ada").unwrap()).await.unwrap();

        ada.complete_course(9.0).unwrap();
        repo.save(ada.clone()).await.unwrap();

        let loaded = repo.load(LearnerId::new(1)).await.unwrap();
        assert_eq!(loaded.completed_courses(), 1);
        assert_eq!(loaded.credits(), Credits::of(3).unwrap());
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_load_missing() {
        let repo = InMemoryLearnerRepository::new();
        let err = repo.load(LearnerId::new(42)).await.unwrap_err();
        assert!(matches!(err, LearnerError::LearnerNotFound(42)));
    }
}
