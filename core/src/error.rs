//! Error types for the Prompt Pilot client.
//!
//! # Design
//! Callers branch on `ErrorKind`: authentication and rate-limit failures get
//! dedicated variants because they ask for different reactions (fix the key,
//! back off) than everything else. All remaining non-2xx responses land in
//! `Api`, and failures that never produced a response (timeout, refused
//! connection, anything else the transport reports) have their own variants
//! so no status code is invented for them.
//!
//! `Display` output is the short, user-facing message; nothing else from the
//! response or the transport leaks through except the `Request` details.

use thiserror::Error;

/// Coarse classification of a `PromptPilotError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Authentication,
    RateLimit,
    Validation,
    Generic,
}

/// Errors returned by every client and resource operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromptPilotError {
    /// The server returned 401.
    #[error("{0}")]
    Authentication(String),

    /// The server returned 429.
    #[error("{0}")]
    RateLimit(String),

    /// The request could not be validated. Raised locally by
    /// `ClientConfig::from_env`; no server status maps onto it.
    #[error("{0}")]
    Validation(String),

    /// The server returned a status >= 400 other than 401 and 429.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// No response arrived before the configured timeout.
    #[error("Request timeout")]
    Timeout,

    /// DNS lookup failed or the connection was refused or reset.
    #[error("Connection error")]
    Connection,

    /// Any other transport-level failure.
    #[error("Request failed: {0}")]
    Request(String),
}

impl PromptPilotError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PromptPilotError::Authentication(_) => ErrorKind::Authentication,
            PromptPilotError::RateLimit(_) => ErrorKind::RateLimit,
            PromptPilotError::Validation(_) => ErrorKind::Validation,
            PromptPilotError::Api { .. }
            | PromptPilotError::Timeout
            | PromptPilotError::Connection
            | PromptPilotError::Request(_) => ErrorKind::Generic,
        }
    }

    /// HTTP status that produced this error, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            PromptPilotError::Authentication(_) => Some(401),
            PromptPilotError::RateLimit(_) => Some(429),
            PromptPilotError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, PromptPilotError>;
