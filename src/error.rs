use thiserror::Error;

/// Errors that can occur in the sequential thinking service
#[derive(Error, Debug)]
pub enum ThinkingError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Revision parent not found: thought {parent} in process {process_id}")]
    ParentNotFound { process_id: String, parent: String },

    #[error("Process capacity exceeded: {max} live processes and none eligible for eviction")]
    CapacityExceeded { max: usize },

    #[error("Validation error: {field} - {reason}")]
    Validation { field: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

/// Convert ValidationError to ThinkingError
impl From<crate::validation::ValidationError> for ThinkingError {
    fn from(err: crate::validation::ValidationError) -> Self {
        use crate::validation::ValidationError;

        ThinkingError::Validation {
            field: match &err {
                ValidationError::EmptyProblem | ValidationError::ProblemTooLong { .. } => "problem",
                ValidationError::EmptyThought | ValidationError::ThoughtTooLong { .. } => "thought",
                ValidationError::InvalidThoughtNumber { .. } => "thought_number",
                ValidationError::InvalidTotalThoughts { .. } => "total_thoughts",
                ValidationError::InvalidConfidence { .. } => "confidence",
                ValidationError::InvalidProcessId => "process_id",
            }
            .to_string(),
            reason: err.to_string(),
        }
    }
}

/// Convert ThinkingError to MCP-compatible ErrorData
impl From<ThinkingError> for rmcp::model::ErrorData {
    fn from(err: ThinkingError) -> Self {
        match err {
            ThinkingError::Validation { .. }
            | ThinkingError::InvalidState(_)
            | ThinkingError::ParentNotFound { .. } => {
                rmcp::model::ErrorData::invalid_params(err.to_string(), None)
            }
            ThinkingError::NotFound(_) => {
                rmcp::model::ErrorData::invalid_request(err.to_string(), None)
            }
            _ => rmcp::model::ErrorData::internal_error(err.to_string(), None),
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ThinkingError>;
