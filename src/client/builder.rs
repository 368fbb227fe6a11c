//! Builder pattern for client configuration.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use livesplit_client::Client;
//!
//! # fn example() -> livesplit_client::Result<()> {
//! let client = Client::builder()
//!     .port(16835)
//!     .timeout(Duration::from_millis(500))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::net::SocketAddr;
#[cfg(windows)]
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::transport::{Connector, Endpoint, Transport};

use super::core::Client;
use super::options::ClientOptions;

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`Client`] instance.
///
/// Use [`Client::builder()`] to create a new builder. Building never touches
/// the network; the client connects on its first command.
#[derive(Default)]
pub struct ClientBuilder {
    /// Where to connect when no custom connector is set.
    endpoint: Endpoint,
    /// Custom connector, overrides `endpoint`.
    connector: Option<Box<dyn Connector>>,
    /// Timeouts and retry policy.
    options: ClientOptions,
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = match &self.connector {
            Some(connector) => connector.to_string(),
            None => self.endpoint.to_string(),
        };
        f.debug_struct("ClientBuilder")
            .field("endpoint", &target)
            .field("options", &self.options)
            .finish()
    }
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a builder targeting the default endpoint.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the endpoint.
    #[inline]
    #[must_use]
    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Connects over TCP to `127.0.0.1:port`.
    #[inline]
    #[must_use]
    pub fn port(self, port: u16) -> Self {
        self.endpoint(Endpoint::tcp(port))
    }

    /// Connects over TCP to an arbitrary address.
    #[inline]
    #[must_use]
    pub fn address(self, addr: SocketAddr) -> Self {
        self.endpoint(Endpoint::Tcp(addr))
    }

    /// Connects to a named pipe.
    #[cfg(windows)]
    #[inline]
    #[must_use]
    pub fn pipe(self, path: impl Into<PathBuf>) -> Self {
        self.endpoint(Endpoint::pipe(path))
    }

    /// Uses a custom connector instead of an [`Endpoint`].
    #[inline]
    #[must_use]
    pub fn connector(mut self, connector: impl Connector + 'static) -> Self {
        self.connector = Some(Box::new(connector));
        self
    }

    /// Replaces all options at once.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the connect timeout.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options = self.options.with_connect_timeout(timeout);
        self
    }

    /// Sets the per-line I/O deadline.
    #[inline]
    #[must_use]
    pub fn io_timeout(mut self, timeout: Duration) -> Self {
        self.options = self.options.with_io_timeout(timeout);
        self
    }

    /// Sets both timeouts.
    #[inline]
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options = self.options.with_timeout(timeout);
        self
    }

    /// Enables the single read retry after a reconnect.
    #[inline]
    #[must_use]
    pub fn read_retry(mut self, enabled: bool) -> Self {
        self.options = self.options.with_read_retry(enabled);
        self
    }

    /// Builds the client with validation.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if a timeout is zero.
    pub fn build(self) -> Result<Client> {
        self.options.validate().map_err(Error::config)?;

        let connector: Box<dyn Connector> = match self.connector {
            Some(connector) => connector,
            None => Box::new(self.endpoint),
        };

        Ok(Client::from_transport(Transport::new(connector, self.options)))
    }
}

// ============================================================================
// Tests
// ============================================================================
