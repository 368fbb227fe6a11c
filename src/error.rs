//! Error types for the LiveSplit client.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```no_run
//! use livesplit_client::{Client, Result};
//!
//! fn example(client: &Client) -> Result<()> {
//!     let _index = client.get_split_index()?;
//!     client.split()?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidArgument`] |
//! | Connection | [`Error::Connection`] |
//! | Transfer | [`Error::Timeout`], [`Error::Io`] |
//! | Protocol | [`Error::Protocol`], [`Error::InvalidDuration`] |
//!
//! Failures inside event handlers never show up here; they are logged and
//! dropped (see [`HandlerError`]).

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;

use crate::protocol::ParseDurationError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

/// Error type returned by event handlers.
///
/// Handler errors are logged and discarded; they never reach the caller of
/// the command that raised the event.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Return type of event handlers.
pub type HandlerResult = StdResult<(), HandlerError>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned by [`ClientBuilder::build`](crate::ClientBuilder::build) when
    /// options are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Invalid command argument.
    ///
    /// Returned before any I/O when an argument cannot be framed.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Endpoint unreachable.
    ///
    /// Returned when the socket or pipe cannot be opened.
    #[error("Connection to {endpoint} failed: {source}")]
    Connection {
        /// Endpoint that was dialled.
        endpoint: String,
        /// Underlying I/O error.
        #[source]
        source: IoError,
    },

    // ========================================================================
    // Transfer Errors
    // ========================================================================
    /// Deadline exceeded while sending or receiving.
    ///
    /// Never retried: the command may already have run on the server.
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout {
        /// Operation that timed out.
        operation: &'static str,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// I/O error that persisted through one reconnect.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Response could not be decoded.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// Response was not a valid duration.
    #[error(transparent)]
    InvalidDuration(#[from] ParseDurationError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(endpoint: impl Into<String>, source: IoError) -> Self {
        Self::Connection {
            endpoint: endpoint.into(),
            source,
        }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(operation: &'static str, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation,
            timeout_ms,
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    /// Returns `true` if the server answered with something undecodable.
    #[inline]
    #[must_use]
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, Self::Protocol { .. } | Self::InvalidDuration(_))
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// The transport is left disconnected after these; the next call dials
    /// the endpoint again.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::Timeout { .. } | Self::Io(_)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
