//! Error types for labeled segmentation.

use thiserror::Error;

use crate::piecewise::RunState;

/// Result type for segmentation operations.
pub type Result<T> = std::result::Result<T, FlopartError>;

/// Error types for segmentation operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlopartError {
    /// Every count maps to the same log-mean, so the search domain is empty.
    #[error("Degenerate input: all counts are identical (log-mean {log_mean})")]
    DegenerateInput { log_mean: f64 },

    /// A cost function had no feasible piece where one was required.
    ///
    /// `state` is `None` when neither the up nor the down cost is feasible.
    #[error(
        "Infeasible labeling: no feasible {} cost at data index {index}",
        state_name(.state)
    )]
    InfeasibleLabeling {
        index: usize,
        state: Option<RunState>,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid parameter '{param}' = '{value}': {reason}")]
    InvalidParameter {
        param: String,
        value: String,
        reason: String,
    },

    #[error("Invalid label {index}: {reason}")]
    InvalidLabel { index: usize, reason: String },
}

fn state_name(state: &Option<RunState>) -> &'static str {
    match state {
        Some(RunState::Up) => "up",
        Some(RunState::Down) => "down",
        None => "up or down",
    }
}

impl FlopartError {
    /// Convert to the error code reported across the C boundary.
    ///
    /// Zero is success and 1 is a null pointer, both raised only by the FFI layer.
    pub fn to_code(&self) -> i32 {
        match self {
            FlopartError::InvalidInput(_) => 2,
            FlopartError::DegenerateInput { .. } => 3,
            FlopartError::InfeasibleLabeling { .. } => 4,
            FlopartError::InvalidParameter { .. } => 5,
            FlopartError::InvalidLabel { .. } => 6,
        }
    }

    pub(crate) fn invalid_parameter(
        param: &str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        FlopartError::InvalidParameter {
            param: param.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}
