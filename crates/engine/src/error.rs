//! Error types for workflow runs
//!
//! Every error aborts the run. There is no local recovery, retry or
//! fallback ability anywhere in the engine.

use thiserror::Error;

use crate::ability::AbilityError;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that abort a workflow run
#[derive(Debug, Error)]
pub enum EngineError {
    /// A stage names an ability that has no registered implementation
    #[error("stage '{stage}': unknown ability '{ability}'")]
    UnknownAbility { stage: String, ability: String },

    /// A stage declares a mode other than deterministic/nondeterministic
    #[error("stage '{stage}': unsupported mode '{mode}'")]
    UnsupportedMode { stage: String, mode: String },

    /// Workflow configuration is missing required fields or is inconsistent
    #[error("malformed workflow config: {0}")]
    MalformedConfig(String),

    /// Payload is not a record or lacks `ticket_id`
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// An ability returned an error
    #[error("stage '{stage}': ability '{ability}' failed: {source}")]
    AbilityFailed {
        stage: String,
        ability: String,
        #[source]
        source: AbilityError,
    },

    /// The run already completed; no stages are left to execute
    #[error("workflow run already completed")]
    RunFinished,

    /// The run failed earlier and cannot be resumed
    #[error("workflow run failed at stage {0} and cannot continue")]
    RunFailed(usize),
}

impl EngineError {
    /// Create a malformed config error
    pub fn config(msg: impl Into<String>) -> Self {
        EngineError::MalformedConfig(msg.into())
    }

    /// Create a malformed payload error
    pub fn payload(msg: impl Into<String>) -> Self {
        EngineError::MalformedPayload(msg.into())
    }

    /// Create an unknown ability error
    pub fn unknown_ability(stage: impl Into<String>, ability: impl Into<String>) -> Self {
        EngineError::UnknownAbility {
            stage: stage.into(),
            ability: ability.into(),
        }
    }

    /// Stage the error is attributed to, if any
    pub fn stage(&self) -> Option<&str> {
        match self {
            EngineError::UnknownAbility { stage, .. }
            | EngineError::UnsupportedMode { stage, .. }
            | EngineError::AbilityFailed { stage, .. } => Some(stage),
            _ => None,
        }
    }
}
