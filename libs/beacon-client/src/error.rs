//! Error types for platform client operations.
//!
//! Every public operation either returns a validated result or exactly one
//! of these variants. Transport implementations map a missing remote record
//! to [`ClientError::NotFound`] and every other failure to
//! [`ClientError::Transport`].

use thiserror::Error;

/// Top-level error type for the beacon-client crate.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Caller-supplied input or a remote result violates an invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// A remove/unsubscribe targeted a record the platform does not have.
    #[error("not found: {0}")]
    NotFound(String),

    /// Orchestration returned nothing usable after the retry budget was spent.
    #[error("orchestration unavailable after {attempts} attempt(s)")]
    Unavailable { attempts: u32 },

    /// Network failure or platform-side rejection reported by the transport.
    #[error("transport error: {0}")]
    Transport(String),

    /// Missing or unusable client-side configuration (e.g. key material).
    #[error("configuration error: {0}")]
    Config(String),

    /// Local network interfaces could not be enumerated.
    #[error("interface lookup failed: {0}")]
    Interfaces(String),
}

impl ClientError {
    /// Returns true if the platform reported the targeted record as absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }

    /// Returns true for input or result validation failures.
    pub fn is_validation(&self) -> bool {
        matches!(self, ClientError::Validation(_))
    }

    /// Returns true if orchestration exhausted its retry budget.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ClientError::Unavailable { .. })
    }
}

/// Shorthand result alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
