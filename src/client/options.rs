//! Connection timeouts and retry policy.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use livesplit_client::ClientOptions;
//!
//! let options = ClientOptions::new()
//!     .with_connect_timeout(Duration::from_millis(500))
//!     .with_io_timeout(Duration::from_secs(1));
//!
//! assert!(options.validate().is_ok());
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Default connect and I/O timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

// ============================================================================
// ClientOptions
// ============================================================================

/// Timeouts and retry policy for a client's transport.
///
/// A call that has to reconnect can take up to roughly twice the I/O timeout
/// plus the connect timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    /// Time allowed to open a connection.
    pub connect_timeout: Duration,

    /// Deadline for each line written or read.
    pub io_timeout: Duration,

    /// Retry a failed read once on a fresh connection.
    pub read_retry: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl ClientOptions {
    /// Creates options with the default two-second timeouts and no read
    /// retry.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            connect_timeout: DEFAULT_TIMEOUT,
            io_timeout: DEFAULT_TIMEOUT,
            read_retry: false,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ClientOptions {
    /// Sets the connect timeout.
    #[inline]
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the per-line I/O deadline.
    #[inline]
    #[must_use]
    pub const fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Sets both the connect timeout and the I/O deadline.
    #[inline]
    #[must_use]
    pub const fn with_timeout(self, timeout: Duration) -> Self {
        self.with_connect_timeout(timeout).with_io_timeout(timeout)
    }

    /// Enables or disables the single read retry after a reconnect.
    ///
    /// Off by default. A retried read cannot tell whether the command
    /// already ran on the server.
    #[inline]
    #[must_use]
    pub const fn with_read_retry(mut self, enabled: bool) -> Self {
        self.read_retry = enabled;
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ClientOptions {
    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns an error message if a timeout is zero; sockets reject a zero
    /// deadline.
    pub fn validate(&self) -> Result<(), String> {
        if self.connect_timeout.is_zero() {
            return Err("Connect timeout must be greater than zero".to_string());
        }
        if self.io_timeout.is_zero() {
            return Err("I/O timeout must be greater than zero".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_creates_default() {
        let options = ClientOptions::new();
        assert_eq!(options.connect_timeout, Duration::from_secs(2));
        assert_eq!(options.io_timeout, Duration::from_secs(2));
        assert!(!options.read_retry);
        assert_eq!(options, ClientOptions::default());
    }

    #[test]
    fn test_builder_chain() {
        let options = ClientOptions::new()
            .with_timeout(Duration::from_millis(250))
            .with_read_retry(true);

        assert_eq!(options.connect_timeout, Duration::from_millis(250));
        assert_eq!(options.io_timeout, Duration::from_millis(250));
        assert!(options.read_retry);
    }

    #[test]
    fn test_validate_valid() {
        assert!(ClientOptions::new().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_connect_timeout() {
        let options = ClientOptions::new().with_connect_timeout(Duration::ZERO);
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_validate_zero_io_timeout() {
        let options = ClientOptions::new().with_io_timeout(Duration::ZERO);
        assert!(options.validate().is_err());
    }
}
