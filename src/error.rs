use thiserror::Error;

/// Error surface of the orchestration façade.
///
/// Every failure is local to the single action attempted and leaves no
/// partial state behind. None of these are fatal to the process; callers
/// recover by choosing a legal action, resubmitting a corrected payload,
/// or reloading fresh state and retrying.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OrchestratorError {
    #[error("action '{action}' is not allowed from state '{state}'")]
    InvalidTransition { state: String, action: String },

    #[error("validation failed: {reason}")]
    Validation { reason: String },

    #[error("stale version for {entity} {id}: expected {expected}, found {found}")]
    Conflict {
        entity: &'static str,
        id: String,
        expected: u64,
        found: u64,
    },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
}

impl OrchestratorError {
    pub fn invalid_transition(state: impl ToString, action: impl ToString) -> Self {
        Self::InvalidTransition {
            state: state.to_string(),
            action: action.to_string(),
        }
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// True when the caller should reload state and retry the same action.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
