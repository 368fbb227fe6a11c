//! Line-framed connection with lazy connect and single-retry reconnection.
//!
//! # Lifecycle
//!
//! ```text
//!  Disconnected ──connect──► Connected
//!       ▲                        │
//!       ├──── I/O error ─────────┤──► reconnect + one retry ──► Connected
//!       └──── timeout / close ───┘
//! ```
//!
//! A connection is opened on first use and reopened whenever the previous
//! one was dropped or the server hung up. Writes that fail for any reason
//! other than a timeout are retried once on a fresh connection. Timeouts
//! are never retried: the server may already have acted on the command, and
//! sending it again could split twice.
//!
//! After a timeout the connection is dropped, since a late answer would
//! otherwise be read as the response to the next query.
//!
//! # Deadlines
//!
//! The I/O timeout bounds a whole line, not a single system call. Each write
//! or read computes one deadline up front and hands the stream only the time
//! left before every call, so a server that trickles its answer byte by byte
//! still times out on schedule.
//!
//! # Read Retries
//!
//! A reconnect cannot tell "the server never got the command" from "the
//! server ran it and the answer was lost", and the server only answers
//! commands it receives, so a retried read on a fresh connection usually
//! just waits for the deadline. Read retries are therefore opt-in via
//! [`ClientOptions::with_read_retry`].

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::io::{self, BufRead, BufReader, ErrorKind, Write};
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::client::ClientOptions;
use crate::error::{Error, Result};
use crate::protocol::Command;

use super::{Connector, Stream};

// ============================================================================
// Constants
// ============================================================================

/// Longest response line accepted, terminator included.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

// ============================================================================
// Types
// ============================================================================

type Connection = BufReader<Box<dyn Stream>>;

// ============================================================================
// Transport
// ============================================================================

/// Owns at most one connection to the timer application.
///
/// # Thread Safety
///
/// `Transport` is `Send` but takes `&mut self` everywhere; callers
/// serialize access (the [`Client`](crate::Client) holds it behind a mutex).
pub struct Transport {
    /// Opens new streams.
    connector: Box<dyn Connector>,
    /// Timeouts and retry policy.
    options: ClientOptions,
    /// Live connection, if any.
    connection: Option<Connection>,
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("endpoint", &self.connector.to_string())
            .field("options", &self.options)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl Transport {
    /// Creates a disconnected transport.
    #[must_use]
    pub fn new(connector: Box<dyn Connector>, options: ClientOptions) -> Self {
        Self {
            connector,
            options,
            connection: None,
        }
    }

    /// Returns the endpoint description.
    #[must_use]
    pub fn endpoint(&self) -> String {
        self.connector.to_string()
    }

    /// Returns the options in use.
    #[inline]
    #[must_use]
    pub const fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Returns `true` if a connection is currently held.
    ///
    /// The server may have hung up since; that is only noticed on next use.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Opens a connection unless a live one is already held.
    ///
    /// # Errors
    ///
    /// [`Error::Connection`] if the endpoint cannot be reached. The transport
    /// stays disconnected.
    pub fn ensure_connected(&mut self) -> Result<()> {
        if let Some(connection) = &self.connection
            && connection.get_ref().peer_closed()
        {
            debug!(endpoint = %self.connector, "Server hung up, dropping connection");
            self.connection = None;
        }

        if self.connection.is_none() {
            self.connect()
                .map_err(|e| Error::connection(self.connector.to_string(), e))?;
        }

        Ok(())
    }

    /// Writes one command line.
    ///
    /// # Errors
    ///
    /// - [`Error::Connection`] if no connection can be opened
    /// - [`Error::Timeout`] if the write deadline passes (not retried)
    /// - [`Error::Io`] with the first failure if the retry also fails
    pub fn send(&mut self, command: &Command) -> Result<()> {
        let line = command.to_line();
        self.ensure_connected()?;

        trace!(command = %command, "Sending command");

        let Err(err) = self.write_line(&line) else {
            return Ok(());
        };

        if is_timeout(&err) {
            warn!(command = %command, "Send timed out");
            self.disconnect();
            return Err(self.timeout_error("send"));
        }

        warn!(error = %err, command = %command, "Send failed, reconnecting");

        if let Err(reconnect_err) = self.reconnect() {
            debug!(error = %reconnect_err, "Reconnect failed");
            return Err(Error::Io(err));
        }

        if let Err(retry_err) = self.write_line(&line) {
            warn!(error = %retry_err, command = %command, "Resend failed");
            self.disconnect();
            return Err(Error::Io(err));
        }

        debug!(command = %command, "Command resent after reconnect");
        Ok(())
    }

    /// Reads one response line, without its line terminator.
    ///
    /// # Errors
    ///
    /// - [`Error::Connection`] if no connection can be opened
    /// - [`Error::Timeout`] if the read deadline passes (not retried)
    /// - [`Error::Protocol`] if the line is not valid UTF-8 or is longer
    ///   than [`MAX_LINE_BYTES`]
    /// - [`Error::Io`] for other failures, including the server closing the
    ///   connection
    pub fn recv(&mut self) -> Result<String> {
        self.ensure_connected()?;

        let err = match self.read_line() {
            Ok(line) => {
                trace!(response = %line, "Received response");
                return Ok(line);
            }
            Err(err) => err,
        };

        if err.kind() == ErrorKind::InvalidData {
            warn!(error = %err, "Malformed response");
            self.disconnect();
            return Err(Error::protocol(err.to_string()));
        }

        if is_timeout(&err) {
            warn!("Receive timed out");
            self.disconnect();
            return Err(self.timeout_error("recv"));
        }

        if !self.options.read_retry {
            warn!(error = %err, "Receive failed");
            self.disconnect();
            return Err(Error::Io(err));
        }

        warn!(error = %err, "Receive failed, reconnecting");

        if let Err(reconnect_err) = self.reconnect() {
            debug!(error = %reconnect_err, "Reconnect failed");
            return Err(Error::Io(err));
        }

        match self.read_line() {
            Ok(line) => {
                trace!(response = %line, "Received response after reconnect");
                Ok(line)
            }
            Err(retry_err) => {
                warn!(error = %retry_err, "Receive retry failed");
                self.disconnect();
                Err(Error::Io(err))
            }
        }
    }

    /// Drops the connection if one is held. Safe to call repeatedly.
    pub fn close(&mut self) {
        if self.connection.take().is_some() {
            debug!(endpoint = %self.connector, "Connection closed");
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn connect(&mut self) -> io::Result<()> {
        debug!(endpoint = %self.connector, "Connecting");

        let stream = self
            .connector
            .connect(self.options.connect_timeout)
            .inspect_err(|e| debug!(endpoint = %self.connector, error = %e, "Connect failed"))?;

        debug!(endpoint = %self.connector, "Connected");
        self.connection = Some(BufReader::new(stream));
        Ok(())
    }

    fn reconnect(&mut self) -> io::Result<()> {
        self.connection = None;
        self.connect()
    }

    fn disconnect(&mut self) {
        if self.connection.take().is_some() {
            debug!(endpoint = %self.connector, "Dropped connection");
        }
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let deadline = Instant::now() + self.options.io_timeout;
        let connection = self.connection.as_mut().ok_or(ErrorKind::NotConnected)?;
        let stream = connection.get_mut().as_mut();

        let result = write_all_before(stream, line.as_bytes(), deadline);
        if let Err(e) = stream.set_deadline(None) {
            trace!(error = %e, "Failed to clear write deadline");
        }

        result
    }

    fn read_line(&mut self) -> io::Result<String> {
        let deadline = Instant::now() + self.options.io_timeout;
        let connection = self.connection.as_mut().ok_or(ErrorKind::NotConnected)?;

        let result = read_line_before(connection, deadline);
        if let Err(e) = connection.get_ref().set_deadline(None) {
            trace!(error = %e, "Failed to clear read deadline");
        }

        let bytes = result?;
        let line = String::from_utf8(bytes)
            .map_err(|_| io::Error::new(ErrorKind::InvalidData, "response is not valid UTF-8"))?;

        let trimmed = line.strip_suffix('\n').unwrap_or(&line);
        let trimmed = trimmed.strip_suffix('\r').unwrap_or(trimmed);
        Ok(trimmed.to_string())
    }

    fn timeout_error(&self, operation: &'static str) -> Error {
        let timeout_ms = u64::try_from(self.options.io_timeout.as_millis()).unwrap_or(u64::MAX);
        Error::timeout(operation, timeout_ms)
    }
}

/// `WouldBlock` is what Unix reports when a socket timeout expires.
fn is_timeout(err: &io::Error) -> bool {
    matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

/// Time left before `deadline`, or `TimedOut` once it has passed.
fn remaining(deadline: Instant) -> io::Result<Duration> {
    let left = deadline.saturating_duration_since(Instant::now());
    if left.is_zero() {
        return Err(io::Error::new(ErrorKind::TimedOut, "deadline exceeded"));
    }
    Ok(left)
}

/// Writes all of `buf`, re-arming the stream timeout before every call.
fn write_all_before(stream: &mut dyn Stream, mut buf: &[u8], deadline: Instant) -> io::Result<()> {
    while !buf.is_empty() {
        stream.set_deadline(Some(remaining(deadline)?))?;
        match stream.write(buf) {
            Ok(0) => return Err(ErrorKind::WriteZero.into()),
            Ok(n) => buf = &buf[n..],
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }

    stream.set_deadline(Some(remaining(deadline)?))?;
    stream.flush()
}

/// Reads up to and including `\n`, re-arming the stream timeout before every
/// fill of the buffer.
///
/// Fails with `UnexpectedEof` if the server closes the connection first and
/// with `InvalidData` once the line passes [`MAX_LINE_BYTES`].
fn read_line_before(reader: &mut Connection, deadline: Instant) -> io::Result<Vec<u8>> {
    let mut line = Vec::new();

    loop {
        reader.get_ref().set_deadline(Some(remaining(deadline)?))?;

        let (used, done) = {
            let available = match reader.fill_buf() {
                Ok(available) => available,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };

            if available.is_empty() {
                return Err(io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "connection closed by server",
                ));
            }

            let (chunk, done) = match available.iter().position(|&b| b == b'\n') {
                Some(end) => (&available[..=end], true),
                None => (available, false),
            };

            if line.len() + chunk.len() > MAX_LINE_BYTES {
                return Err(io::Error::new(
                    ErrorKind::InvalidData,
                    format!("response line exceeds {MAX_LINE_BYTES} bytes"),
                ));
            }

            line.extend_from_slice(chunk);
            (chunk.len(), done)
        };

        reader.consume(used);
        if done {
            return Ok(line);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
