//! Scripted in-memory connector for tests.
//!
//! Each call to [`Connector::connect`] consumes the next queued [`Script`]
//! (or a refusal). Everything written through any stream is recorded per
//! connection so tests can assert on the exact wire bytes.

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, Cursor, ErrorKind, Read, Write};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::{Connector, Stream};

// ============================================================================
// Script
// ============================================================================

/// Behaviour of one scripted connection.
#[derive(Debug, Clone, Default)]
pub(crate) struct Script {
    response: Vec<u8>,
    write_error: Option<ErrorKind>,
    read_error: Option<ErrorKind>,
    peer_closed: bool,
}

impl Script {
    /// Connection that accepts writes and has nothing to read.
    pub(crate) fn ok() -> Self {
        Self::default()
    }

    /// Connection that serves `response` to reads.
    pub(crate) fn responding(response: &str) -> Self {
        Self {
            response: response.as_bytes().to_vec(),
            ..Self::default()
        }
    }

    /// Connection that serves raw bytes to reads.
    pub(crate) fn responding_bytes(response: &[u8]) -> Self {
        Self {
            response: response.to_vec(),
            ..Self::default()
        }
    }

    /// Connection whose writes fail with `kind`.
    pub(crate) fn failing_writes(kind: ErrorKind) -> Self {
        Self {
            write_error: Some(kind),
            ..Self::default()
        }
    }

    /// Connection whose reads fail with `kind`.
    pub(crate) fn failing_reads(kind: ErrorKind) -> Self {
        Self {
            read_error: Some(kind),
            ..Self::default()
        }
    }

    /// Connection that reports the peer as gone.
    pub(crate) fn closed() -> Self {
        Self {
            peer_closed: true,
            ..Self::default()
        }
    }
}

// ============================================================================
// MockConnector
// ============================================================================

#[derive(Default)]
struct State {
    /// `None` refuses the connection attempt.
    scripts: VecDeque<Option<Script>>,
    connects: usize,
    written: Vec<String>,
    deadlines: Vec<Option<Duration>>,
}

/// Connector handing out scripted streams. Clones share state.
#[derive(Clone, Default)]
pub(crate) struct MockConnector {
    state: Arc<Mutex<State>>,
}

impl MockConnector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queues a connection.
    pub(crate) fn push(&self, script: Script) -> &Self {
        self.state.lock().scripts.push_back(Some(script));
        self
    }

    /// Queues a refused connection attempt.
    pub(crate) fn refuse(&self) -> &Self {
        self.state.lock().scripts.push_back(None);
        self
    }

    /// Number of connection attempts so far.
    pub(crate) fn connects(&self) -> usize {
        self.state.lock().connects
    }

    /// Bytes written, one entry per successful connection.
    pub(crate) fn written(&self) -> Vec<String> {
        self.state.lock().written.clone()
    }

    /// Every deadline set on any stream, in order.
    pub(crate) fn deadlines(&self) -> Vec<Option<Duration>> {
        self.state.lock().deadlines.clone()
    }
}

impl fmt::Display for MockConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("mock")
    }
}

impl Connector for MockConnector {
    fn connect(&self, _timeout: Duration) -> io::Result<Box<dyn Stream>> {
        let mut state = self.state.lock();
        state.connects += 1;

        let Some(Some(script)) = state.scripts.pop_front() else {
            return Err(ErrorKind::ConnectionRefused.into());
        };

        let index = state.written.len();
        state.written.push(String::new());

        Ok(Box::new(MockStream {
            index,
            state: Arc::clone(&self.state),
            input: Cursor::new(script.response),
            write_error: script.write_error,
            read_error: script.read_error,
            peer_closed: script.peer_closed,
        }))
    }
}

// ============================================================================
// MockStream
// ============================================================================

struct MockStream {
    index: usize,
    state: Arc<Mutex<State>>,
    input: Cursor<Vec<u8>>,
    write_error: Option<ErrorKind>,
    read_error: Option<ErrorKind>,
    peer_closed: bool,
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.read_error {
            Some(kind) => Err(kind.into()),
            None => self.input.read(buf),
        }
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(kind) = self.write_error {
            return Err(kind.into());
        }
        self.state.lock().written[self.index].push_str(&String::from_utf8_lossy(buf));
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Stream for MockStream {
    fn set_deadline(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.state.lock().deadlines.push(timeout);
        Ok(())
    }

    fn peer_closed(&self) -> bool {
        self.peer_closed
    }
}
