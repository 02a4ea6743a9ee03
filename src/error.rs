use thiserror::Error;
use validator::ValidationErrors;

/// Why a session cannot start yet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotReadyReason {
    /// No usable content was loaded.
    #[error("content not loaded")]
    ContentMissing,
    /// The content provider could not deliver the collection.
    #[error("content unavailable: {0}")]
    ContentUnavailable(String),
    /// The game needs a category filter before it can start.
    #[error("no content filter selected")]
    FilterMissing,
    /// Turn-based games need several teams.
    #[error("at least {required} teams are required (got {actual})")]
    NotEnoughTeams {
        /// Minimum number of teams.
        required: usize,
        /// Teams currently registered.
        actual: usize,
    },
}

/// Errors surfaced by session operations.
///
/// Actions sent in the wrong phase are not errors: they are ignored so that
/// late UI events stay harmless.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The session cannot start yet; retry once the precondition holds.
    #[error("session not ready: {0}")]
    NotReady(#[from] NotReadyReason),
    /// A settings update failed validation and was discarded.
    #[error("invalid settings: {0}")]
    InvalidSettings(#[from] ValidationErrors),
    /// Invalid input provided by the caller.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The task driving the session has stopped.
    #[error("session driver stopped")]
    DriverClosed,
}

impl EngineError {
    /// Whether the caller may simply retry later (content or setup pending).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, EngineError::NotReady(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_ready_messages_are_descriptive() {
        let err: EngineError = NotReadyReason::NotEnoughTeams {
            required: 2,
            actual: 1,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "session not ready: at least 2 teams are required (got 1)"
        );
        assert!(err.is_recoverable());
        assert!(!EngineError::InvalidInput("empty".into()).is_recoverable());
    }

    #[test]
    fn unavailable_content_is_a_recoverable_not_ready() {
        let err: EngineError = NotReadyReason::ContentUnavailable("disk offline".into()).into();
        assert_eq!(err.to_string(), "session not ready: content unavailable: disk offline");
        assert!(err.is_recoverable());
    }
}
