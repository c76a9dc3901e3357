//! Error types for fundsim.

use thiserror::Error;

/// Result type alias for fundsim operations.
pub type Result<T> = std::result::Result<T, SimError>;

/// Error types for the simulation engine and aggregator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    /// Invalid request parameter (non-positive counts, out-of-range values).
    #[error("Invalid parameter: {message}")]
    InvalidParameter { message: String },

    /// Malformed asset profile.
    #[error("Invalid profile for asset '{asset}': {message}")]
    InvalidProfile { asset: String, message: String },

    /// Empty outcome sample handed to the aggregator.
    #[error("Empty sample provided for {context}")]
    EmptySample { context: String },

    /// Run aborted through the cancellation flag. Partial progress is
    /// discarded, never returned.
    #[error("Simulation cancelled")]
    Cancelled,

    /// Failure caught at the run boundary (e.g. a panic in a worker).
    #[error("Unexpected simulation failure: {message}")]
    Unexpected { message: String },
}

impl SimError {
    /// Create an invalid parameter error.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    /// Create an invalid profile error.
    pub fn invalid_profile(asset: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidProfile {
            asset: asset.into(),
            message: message.into(),
        }
    }

    /// Create an empty sample error.
    pub fn empty_sample(context: impl Into<String>) -> Self {
        Self::EmptySample {
            context: context.into(),
        }
    }

    /// Create an unexpected failure error.
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected {
            message: message.into(),
        }
    }
}
