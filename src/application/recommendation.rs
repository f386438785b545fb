use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::learner::{Learner, LearnerError, LearnerId};

use super::repository::LearnerRepository;

// ============================================================================
// Course Recommendations
// ============================================================================
//
// Builds a prompt from the learner's profile and hands it to an opaque text
// generator. The generated text is returned untouched.
//
// ============================================================================

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}

#[derive(Debug, thiserror::Error)]
pub enum RecommendationError {
    #[error(transparent)]
    Learner(#[from] LearnerError),

    #[error(transparent)]
    Generation(#[from] anyhow::Error),
}

pub struct RecommendationService {
    repository: Arc<dyn LearnerRepository>,
    generator: Arc<dyn TextGenerator>,
}

impl RecommendationService {
    pub fn new(repository: Arc<dyn LearnerRepository>, generator: Arc<dyn TextGenerator>) -> Self {
        Self { repository, generator }
    }

    /// Suggest next courses, optionally steered by the learner's stated interests.
    pub async fn recommend(&self, id: LearnerId, context: Option<&str>) -> Result<String, RecommendationError> {
        let learner = self.repository.load(id).await?;
        let prompt = build_prompt(&learner, context);

        tracing::debug!(learner_id = %id, prompt_len = prompt.len(), "Requesting recommendations");
        let text = self.generator.generate(&prompt).await?;
        tracing::info!(learner_id = %id, "Recommendations generated");

        Ok(text)
    }
}

pub fn build_prompt(learner: &Learner, context: Option<&str>) -> String {
    let mut prompt = format!(
        "You are an educational assistant who recommends courses.\n\
         \n\
         ## Learner profile\n\
         - Name: {}\n\
         - Completed courses: {}\n\
         - Accumulated credits: {}\n",
        learner.name(),
        learner.completed_courses(),
        learner.credits().amount(),
    );

    let task = match context {
        Some(context) => {
            prompt.push_str(&format!("\n## Interests\n{}\n", context.trim()));
            "Based on the profile and interests above, recommend 3 specific courses \
             that match the learner's interests and help them progress."
        }
        None => {
            "Based on the profile above, recommend 3 courses the learner should take \
             next to progress along their learning path."
        }
    };

    prompt.push_str(&format!(
        "\n## Task\n{}\n\
         \n\
         ## Answer format\n\
         For each course give:\n\
         1. Course name\n\
         2. Why it is relevant for this learner\n\
         3. Estimated difficulty (Beginner/Intermediate/Advanced)\n\
         \n\
         Be concise.\n",
        task
    ));

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::repository::InMemoryLearnerRepository;
    use crate::domain::learner::Credits;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct CannedGenerator {
        prompts: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl TextGenerator for CannedGenerator {
        async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
            if self.fail {
                anyhow::bail!("model offline");
            }
            self.prompts.lock().push(prompt.to_string());
            Ok("1. Rust for Beginners".to_string())
        }
    }

    async fn repository_with_ada() -> (Arc<InMemoryLearnerRepository>, LearnerId) {
        let repo = Arc::new(InMemoryLearnerRepository::new());
        let mut ada = Learner::with_credits("Ada", Credits::of(12).unwrap()).unwrap();
        ada.complete_course(8.0).unwrap();
        let id = repo.save(ada).await.unwrap().id().unwrap();
        (repo, id)
    }

    #[tokio::test]
    async fn test_recommend_returns_generated_text() {
        let (repo, id) = repository_with_ada().await;
        let generator = Arc::new(CannedGenerator::default());
        let service = RecommendationService::new(repo, generator.clone());

        let text = service.recommend(id, Some("systems programming")).await.unwrap();

        assert_eq!(text, "1. Rust for Beginners");
        let prompts = generator.prompts.lock();
        assert!(prompts[0].contains("- Name: Ada"));
        assert!(prompts[0].contains("- Completed courses: 1"));
        assert!(prompts[0].contains("- Accumulated credits: 15"));
        assert!(prompts[0].contains("systems programming"));
    }

    #[test]
    fn test_prompt_without_context() {
        let learner = Learner::new("Lin").unwrap();
        let prompt = build_prompt(&learner, None);

        assert!(!prompt.contains("## Interests"));
        assert!(prompt.contains("learning path"));
    }

    #[tokio::test]
    async fn test_errors() {
        let (repo, id) = repository_with_ada().await;
        let service = RecommendationService::new(
            repo,
            Arc::new(CannedGenerator {
                fail: true,
                ..Default::default()
            }),
        );

        assert!(matches!(
            service.recommend(LearnerId::new(404), None).await,
            Err(RecommendationError::Learner(LearnerError::LearnerNotFound(404)))
        ));
        assert!(matches!(
            service.recommend(id, None).await,
            Err(RecommendationError::Generation(_))
        ));
    }
}
