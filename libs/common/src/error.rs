//! Custom error types for the common library
//!
//! This module defines the error kinds raised by the generation flow and by
//! the remote generative API client.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by the remote generative API layer
#[derive(Error, Debug)]
pub enum RemoteError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.)
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote API answered with a non-2xx status code
    #[error("Remote API error ({status}): {body}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Raw response body for debugging
        body: String,
    },

    /// No API key is available for the call
    #[error("No API credential available")]
    MissingCredential,

    /// The remote answered with a payload we could not interpret
    #[error("Unexpected remote payload: {0}")]
    Decode(String),
}

/// Errors raised while validating, submitting or awaiting a generation job
#[derive(Error, Debug)]
pub enum GenerationError {
    /// The request failed validation before anything was reserved
    #[error("Invalid generation request: {0}")]
    InvalidRequest(String),

    /// No usable credential at call time
    #[error("No usable API credential has been selected")]
    Capability,

    /// The balance cannot cover the requested job
    #[error("Insufficient credits: {required} required, {available} available")]
    InsufficientCredits { required: u64, available: i64 },

    /// Another job is already pending or running
    #[error("A generation job is already in progress")]
    JobInFlight,

    /// The remote rejected job creation
    #[error("Job submission failed: {0}")]
    Submission(#[source] RemoteError),

    /// Polling the remote operation failed at the transport level
    #[error("Polling the remote operation failed: {0}")]
    Poll(#[source] RemoteError),

    /// The remote operation completed with an error payload
    #[error("Remote generation failed: {message}")]
    RemoteGeneration { message: String },

    /// The remote operation completed without a usable media reference
    #[error("No video URI returned")]
    MissingResult,

    /// The operation did not finish within the configured ceiling
    #[error("Generation did not complete within {0:?}")]
    Timeout(Duration),

    /// The caller stopped waiting for the job
    #[error("Generation was cancelled")]
    Cancelled,
}

impl GenerationError {
    /// Whether a reservation taken for this job must be handed back.
    ///
    /// Guard failures (`InvalidRequest`, `Capability`, `InsufficientCredits`,
    /// `JobInFlight`) happen before anything is reserved.
    pub fn refunds_reservation(&self) -> bool {
        matches!(
            self,
            GenerationError::Submission(_)
                | GenerationError::Poll(_)
                | GenerationError::RemoteGeneration { .. }
                | GenerationError::MissingResult
                | GenerationError::Timeout(_)
                | GenerationError::Cancelled
        )
    }
}

/// Type alias for Result with GenerationError
pub type GenerationResult<T> = Result<T, GenerationError>;
