// ============================================================================
// Learner Business Rule Errors
// ============================================================================

/// Broad category of a [`LearnerError`], used by callers that map errors to
/// transport responses without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Infrastructure,
}

#[derive(Debug, thiserror::Error)]
pub enum LearnerError {
    #[error("Average must be a value between 0.0 and 10.0, got {0}")]
    AverageOutOfRange(f64),

    #[error("Credits cannot be negative: {0}")]
    NegativeCredits(i64),

    #[error("Credits balance overflow: {current} + {added}")]
    CreditsOverflow { current: u32, added: u32 },

    #[error("Insufficient credits: has {available}, needs {requested}")]
    InsufficientCredits { available: u32, requested: u32 },

    #[error("Learner name cannot be empty")]
    EmptyName,

    #[error("Learner not found: {0}")]
    LearnerNotFound(i64),

    #[error("Strategy not found for type: {0}")]
    StrategyNotFound(String),

    #[error("Repository failure: {message}")]
    Repository {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl LearnerError {
    /// Stable machine-readable code, safe to expose to clients.
    pub fn code(&self) -> &'static str {
        match self {
            LearnerError::AverageOutOfRange(_) => "INVALID_AVERAGE",
            LearnerError::NegativeCredits(_) => "NEGATIVE_CREDITS",
            LearnerError::CreditsOverflow { .. } => "CREDITS_OVERFLOW",
            LearnerError::InsufficientCredits { .. } => "INSUFFICIENT_CREDITS",
            LearnerError::EmptyName => "INVALID_NAME",
            LearnerError::LearnerNotFound(_) => "LEARNER_NOT_FOUND",
            LearnerError::StrategyNotFound(_) => "STRATEGY_NOT_FOUND",
            LearnerError::Repository { .. } => "REPOSITORY_FAILURE",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LearnerError::AverageOutOfRange(_)
            | LearnerError::NegativeCredits(_)
            | LearnerError::CreditsOverflow { .. }
            | LearnerError::InsufficientCredits { .. }
            | LearnerError::EmptyName => ErrorKind::Validation,
            LearnerError::LearnerNotFound(_) | LearnerError::StrategyNotFound(_) => {
                ErrorKind::NotFound
            }
            LearnerError::Repository { .. } => ErrorKind::Infrastructure,
        }
    }

    pub fn repository(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        LearnerError::Repository {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(
            LearnerError::InsufficientCredits { available: 1, requested: 2 }.code(),
            "INSUFFICIENT_CREDITS"
        );
        assert_eq!(LearnerError::LearnerNotFound(7).code(), "LEARNER_NOT_FOUND");
        assert_eq!(
            LearnerError::StrategyNotFound("GOLD".into()).code(),
            "STRATEGY_NOT_FOUND"
        );
    }

    #[test]
    fn test_kinds() {
        assert_eq!(LearnerError::AverageOutOfRange(11.0).kind(), ErrorKind::Validation);
        assert_eq!(LearnerError::LearnerNotFound(1).kind(), ErrorKind::NotFound);
        assert_eq!(
            LearnerError::StrategyNotFound("x".into()).kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_repository_error_keeps_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err = LearnerError::repository("save failed", io);

        assert_eq!(err.kind(), ErrorKind::Infrastructure);
        assert_eq!(err.to_string(), "Repository failure: save failed");
        assert_eq!(err.source().map(|s| s.to_string()), Some("disk gone".to_string()));
    }

    #[test]
    fn test_insufficient_credits_message() {
        let err = LearnerError::InsufficientCredits { available: 5, requested: 10 };
        assert_eq!(err.to_string(), "Insufficient credits: has 5, needs 10");
    }
}
