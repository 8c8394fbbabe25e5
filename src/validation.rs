use thiserror::Error;

use crate::config::ValidationConfig;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Problem statement cannot be empty")]
    EmptyProblem,

    #[error("Problem statement too long: {actual} chars (max: {max})")]
    ProblemTooLong { actual: usize, max: usize },

    #[error("Thought content cannot be empty")]
    EmptyThought,

    #[error("Thought content too long: {actual} chars (max: {max})")]
    ThoughtTooLong { actual: usize, max: usize },

    #[error("Invalid thought number: {number} (must be at least 1)")]
    InvalidThoughtNumber { number: u32 },

    #[error("Invalid total thoughts: {total} (must be 1-{max})")]
    InvalidTotalThoughts { total: u32, max: u32 },

    #[error("Invalid confidence: {value} (must be between 0.0 and 1.0)")]
    InvalidConfidence { value: f64 },

    #[error("Process ID cannot be empty")]
    InvalidProcessId,
}

/// Checks tool input before it reaches the store
#[derive(Debug, Clone)]
pub struct InputValidator {
    max_problem_length: usize,
    max_thought_length: usize,
    max_total_thoughts: u32,
}

impl InputValidator {
    pub fn new(config: &ValidationConfig) -> Self {
        Self {
            max_problem_length: config.max_problem_length,
            max_thought_length: config.max_thought_length,
            max_total_thoughts: config.max_total_thoughts,
        }
    }

    pub fn validate_problem(&self, problem: &str) -> Result<(), ValidationError> {
        let trimmed = problem.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyProblem);
        }

        let length = trimmed.chars().count();
        if length > self.max_problem_length {
            return Err(ValidationError::ProblemTooLong {
                actual: length,
                max: self.max_problem_length,
            });
        }

        Ok(())
    }

    pub fn validate_thought_content(&self, content: &str) -> Result<(), ValidationError> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyThought);
        }

        let length = trimmed.chars().count();
        if length > self.max_thought_length {
            return Err(ValidationError::ThoughtTooLong {
                actual: length,
                max: self.max_thought_length,
            });
        }

        Ok(())
    }

    /// The thought number may run past the declared total; callers revise
    /// their estimate as they go.
    pub fn validate_thought_numbers(&self, number: u32, total: u32) -> Result<(), ValidationError> {
        if total < 1 || total > self.max_total_thoughts {
            return Err(ValidationError::InvalidTotalThoughts {
                total,
                max: self.max_total_thoughts,
            });
        }

        if number < 1 {
            return Err(ValidationError::InvalidThoughtNumber { number });
        }

        Ok(())
    }

    pub fn validate_confidence(&self, confidence: Option<f64>) -> Result<(), ValidationError> {
        match confidence {
            Some(value) if !value.is_finite() || !(0.0..=1.0).contains(&value) => {
                Err(ValidationError::InvalidConfidence { value })
            }
            _ => Ok(()),
        }
    }

    pub fn validate_process_id(&self, process_id: &str) -> Result<(), ValidationError> {
        if process_id.trim().is_empty() {
            Err(ValidationError::InvalidProcessId)
        } else {
            Ok(())
        }
    }
}

impl Default for InputValidator {
    fn default() -> Self {
        Self::new(&ValidationConfig::default())
    }
}
