//! Error types for the scenario harness.

use thiserror::Error;
use vdsmatch_core::MatchError;
use vdsmatch_io::IoError;

/// Errors that abort a scenario before its checks run.
#[derive(Debug, Error)]
pub enum SimError {
    /// A sampling distribution rejected its parameters
    #[error("Invalid distribution: {0}")]
    Distribution(String),

    /// The generated records could not be turned into a network
    #[error(transparent)]
    Io(#[from] IoError),

    /// A matcher failed to run
    #[error(transparent)]
    Match(#[from] MatchError),
}

impl SimError {
    /// Creates a distribution error.
    pub fn distribution(msg: impl std::fmt::Display) -> Self {
        Self::Distribution(msg.to_string())
    }
}
