//! Endpoints and the stream seam.
//!
//! The transport never touches sockets directly. It asks a [`Connector`] for
//! a fresh [`Stream`] whenever it needs one. [`Endpoint`] is the connector
//! for the two endpoints the timer application exposes: a loopback TCP port
//! and, on Windows, a named pipe.
//!
//! Both honour deadlines: TCP through socket timeouts, the pipe through
//! overlapped I/O that is cancelled when its wait expires.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::io::{self, ErrorKind, Read, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpStream};
#[cfg(windows)]
use std::path::PathBuf;
use std::time::Duration;

use tracing::trace;

// ============================================================================
// Constants
// ============================================================================

/// Port the timer's TCP server listens on by default.
pub const DEFAULT_PORT: u16 = 16834;

/// Named pipe the timer application opens on Windows.
#[cfg(windows)]
pub const DEFAULT_PIPE: &str = r"\\.\pipe\LiveSplit";

// ============================================================================
// Traits
// ============================================================================

/// A connected byte stream to the timer application.
pub trait Stream: Read + Write + Send {
    /// Sets the deadline for subsequent reads and writes.
    ///
    /// `None` clears it. Streams without timeout support may ignore this.
    fn set_deadline(&self, timeout: Option<Duration>) -> io::Result<()>;

    /// Returns `true` if the remote end has hung up.
    ///
    /// Checked before reusing an idle connection. The default assumes the
    /// stream is alive.
    fn peer_closed(&self) -> bool {
        false
    }
}

/// Opens streams to an endpoint.
///
/// `Display` names the endpoint in logs and in
/// [`Error::Connection`](crate::Error::Connection).
pub trait Connector: fmt::Display + Send {
    /// Opens a new stream, giving up after `timeout` where supported.
    fn connect(&self, timeout: Duration) -> io::Result<Box<dyn Stream>>;
}

// ============================================================================
// Endpoint
// ============================================================================

/// Local address of the timer application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// TCP socket, normally on the loopback interface.
    Tcp(SocketAddr),

    /// Named pipe path.
    #[cfg(windows)]
    Pipe(PathBuf),
}

impl Endpoint {
    /// Loopback TCP endpoint on the given port.
    #[inline]
    #[must_use]
    pub fn tcp(port: u16) -> Self {
        Self::Tcp(SocketAddr::new(Ipv4Addr::LOCALHOST.into(), port))
    }

    /// Named pipe endpoint.
    #[cfg(windows)]
    #[inline]
    #[must_use]
    pub fn pipe(path: impl Into<PathBuf>) -> Self {
        Self::Pipe(path.into())
    }
}

impl Default for Endpoint {
    /// The timer's named pipe on Windows, loopback port 16834 elsewhere.
    fn default() -> Self {
        #[cfg(windows)]
        {
            Self::pipe(DEFAULT_PIPE)
        }
        #[cfg(not(windows))]
        {
            Self::tcp(DEFAULT_PORT)
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp(addr) => write!(f, "{addr}"),
            #[cfg(windows)]
            Self::Pipe(path) => write!(f, "{}", path.display()),
        }
    }
}

impl Connector for Endpoint {
    fn connect(&self, timeout: Duration) -> io::Result<Box<dyn Stream>> {
        match self {
            Self::Tcp(addr) => {
                let stream = TcpStream::connect_timeout(addr, timeout)?;
                stream.set_nodelay(true)?;
                Ok(Box::new(stream))
            }
            // Opening a pipe does not block, so the timeout has nothing to bound.
            #[cfg(windows)]
            Self::Pipe(path) => Ok(Box::new(pipe::PipeStream::open(path)?)),
        }
    }
}

// ============================================================================
// Stream Implementations
// ============================================================================

impl Stream for TcpStream {
    fn set_deadline(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.set_read_timeout(timeout)?;
        self.set_write_timeout(timeout)
    }

    fn peer_closed(&self) -> bool {
        if self.set_nonblocking(true).is_err() {
            return true;
        }

        let mut probe = [0_u8; 1];
        let closed = match self.peek(&mut probe) {
            Ok(0) => true,
            Ok(_) => false,
            Err(e) if e.kind() == ErrorKind::WouldBlock => false,
            Err(e) => {
                trace!(error = %e, "Liveness probe failed");
                true
            }
        };

        // A socket stuck in non-blocking mode is useless to us; drop it.
        closed || self.set_nonblocking(false).is_err()
    }
}

#[cfg(windows)]
mod pipe {
    //! Named pipe client with deadlines.
    //!
    //! The pipe is opened for overlapped I/O. Every read or write starts the
    //! operation, waits for it up to the current deadline and cancels it when
    //! the wait expires.

    use std::cell::Cell;
    use std::fs::{File, OpenOptions};
    use std::io::{self, ErrorKind, Read, Write};
    use std::os::windows::fs::OpenOptionsExt;
    use std::os::windows::io::{AsRawHandle, FromRawHandle, OwnedHandle};
    use std::path::Path;
    use std::ptr;
    use std::time::Duration;

    use windows_sys::Win32::Foundation::{
        BOOL, ERROR_BROKEN_PIPE, ERROR_IO_PENDING, GetLastError, HANDLE, WAIT_TIMEOUT,
    };
    use windows_sys::Win32::Storage::FileSystem::{FILE_FLAG_OVERLAPPED, ReadFile, WriteFile};
    use windows_sys::Win32::System::IO::{
        CancelIoEx, GetOverlappedResult, GetOverlappedResultEx, OVERLAPPED,
    };
    use windows_sys::Win32::System::Threading::{CreateEventW, INFINITE};

    use super::Stream;

    /// Client end of a named pipe opened for overlapped I/O.
    pub(super) struct PipeStream {
        file: File,
        /// Manual-reset event signalled when an operation completes.
        event: OwnedHandle,
        timeout: Cell<Option<Duration>>,
    }

    impl PipeStream {
        pub(super) fn open(path: &Path) -> io::Result<Self> {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .custom_flags(FILE_FLAG_OVERLAPPED)
                .open(path)?;

            // SAFETY: null attributes and name are valid; failure returns null.
            let event = unsafe { CreateEventW(ptr::null(), 1, 0, ptr::null()) };
            if event.is_null() {
                return Err(io::Error::last_os_error());
            }
            // SAFETY: `event` is a fresh handle owned by nobody else.
            let event = unsafe { OwnedHandle::from_raw_handle(event) };

            Ok(Self {
                file,
                event,
                timeout: Cell::new(None),
            })
        }

        fn wait_millis(&self) -> u32 {
            match self.timeout.get() {
                // Round up so a sub-millisecond remainder still waits.
                Some(timeout) => u32::try_from(timeout.as_micros().div_ceil(1_000))
                    .unwrap_or(INFINITE - 1)
                    .clamp(1, INFINITE - 1),
                None => INFINITE,
            }
        }

        /// Runs one overlapped operation to completion or until the deadline.
        fn run(&self, start: impl FnOnce(HANDLE, *mut OVERLAPPED) -> BOOL) -> io::Result<usize> {
            let handle = self.file.as_raw_handle();
            // SAFETY: all-zero is a valid OVERLAPPED.
            let mut overlapped: OVERLAPPED = unsafe { std::mem::zeroed() };
            overlapped.hEvent = self.event.as_raw_handle();

            if start(handle, &mut overlapped) == 0 {
                // SAFETY: reads thread-local error state only.
                let code = unsafe { GetLastError() };
                if code != ERROR_IO_PENDING {
                    return Err(os_error(code));
                }
            }

            let mut transferred = 0_u32;
            // SAFETY: `overlapped` outlives the operation; on timeout we
            // cancel and wait for completion before returning.
            let done = unsafe {
                GetOverlappedResultEx(handle, &overlapped, &mut transferred, self.wait_millis(), 0)
            };
            if done != 0 {
                return Ok(transferred as usize);
            }

            // SAFETY: as above.
            let code = unsafe { GetLastError() };
            if code == WAIT_TIMEOUT {
                // SAFETY: cancels only this operation, then blocks until the
                // kernel has released `overlapped`.
                unsafe {
                    CancelIoEx(handle, &overlapped);
                    GetOverlappedResult(handle, &overlapped, &mut transferred, 1);
                }
                return Err(io::Error::new(
                    ErrorKind::TimedOut,
                    "named pipe operation timed out",
                ));
            }

            Err(os_error(code))
        }
    }

    fn os_error(code: u32) -> io::Error {
        io::Error::from_raw_os_error(code as i32)
    }

    impl Read for PipeStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let len = u32::try_from(buf.len()).unwrap_or(u32::MAX);
            let ptr = buf.as_mut_ptr();
            let result = self.run(|handle, overlapped| {
                // SAFETY: `buf` stays borrowed until `run` returns, which is
                // after the operation has completed or been cancelled.
                unsafe { ReadFile(handle, ptr, len, ptr::null_mut(), overlapped) }
            });

            match result {
                Err(e) if e.raw_os_error() == Some(ERROR_BROKEN_PIPE as i32) => Ok(0),
                other => other,
            }
        }
    }

    impl Write for PipeStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let len = u32::try_from(buf.len()).unwrap_or(u32::MAX);
            let ptr = buf.as_ptr();
            self.run(|handle, overlapped| {
                // SAFETY: as in `read`.
                unsafe { WriteFile(handle, ptr, len, ptr::null_mut(), overlapped) }
            })
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Stream for PipeStream {
        fn set_deadline(&self, timeout: Option<Duration>) -> io::Result<()> {
            self.timeout.set(timeout);
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        use std::iter;
        use std::time::Instant;

        use windows_sys::Win32::Foundation::INVALID_HANDLE_VALUE;
        use windows_sys::Win32::Storage::FileSystem::PIPE_ACCESS_DUPLEX;
        use windows_sys::Win32::System::Pipes::{CreateNamedPipeW, PIPE_TYPE_BYTE};

        /// Creates a pipe instance the test keeps open but never serves.
        fn silent_server(name: &str) -> OwnedHandle {
            let wide: Vec<u16> = name.encode_utf16().chain(iter::once(0)).collect();
            // SAFETY: `wide` is NUL-terminated and outlives the call.
            let handle = unsafe {
                CreateNamedPipeW(
                    wide.as_ptr(),
                    PIPE_ACCESS_DUPLEX,
                    PIPE_TYPE_BYTE,
                    1,
                    4096,
                    4096,
                    0,
                    ptr::null(),
                )
            };
            assert_ne!(handle, INVALID_HANDLE_VALUE, "CreateNamedPipeW failed");
            // SAFETY: fresh handle owned by the test.
            unsafe { OwnedHandle::from_raw_handle(handle) }
        }

        #[test]
        fn test_pipe_read_times_out() {
            let name = format!(r"\\.\pipe\livesplit-client-test-{}", std::process::id());
            let _server = silent_server(&name);

            let mut stream = PipeStream::open(Path::new(&name)).expect("open pipe");
            stream
                .set_deadline(Some(Duration::from_millis(200)))
                .expect("deadline");

            let started = Instant::now();
            let mut buf = [0_u8; 16];
            let err = stream.read(&mut buf).expect_err("server is silent");

            assert_eq!(err.kind(), ErrorKind::TimedOut);
            assert!(started.elapsed() < Duration::from_secs(2));
        }

        #[test]
        fn test_wait_millis_rounds_up() {
            let name = format!(r"\\.\pipe\livesplit-client-wait-{}", std::process::id());
            let _server = silent_server(&name);
            let stream = PipeStream::open(Path::new(&name)).expect("open pipe");

            assert_eq!(stream.wait_millis(), INFINITE);
            stream.timeout.set(Some(Duration::from_micros(10)));
            assert_eq!(stream.wait_millis(), 1);
            stream.timeout.set(Some(Duration::from_millis(1500)));
            assert_eq!(stream.wait_millis(), 1500);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::TcpListener;
    use std::thread;

    fn listener() -> (TcpListener, Endpoint) {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).expect("bind should succeed");
        let port = listener.local_addr().expect("local addr").port();
        (listener, Endpoint::tcp(port))
    }

    #[cfg(not(windows))]
    #[test]
    fn test_default_endpoint() {
        let endpoint = Endpoint::default();
        assert_eq!(endpoint, Endpoint::tcp(DEFAULT_PORT));
        assert_eq!(endpoint.to_string(), "127.0.0.1:16834");
    }

    #[test]
    fn test_tcp_connect() {
        let (listener, endpoint) = listener();

        let stream = endpoint
            .connect(Duration::from_secs(2))
            .expect("connect should succeed");
        let (_server, _) = listener.accept().expect("accept");

        assert!(!stream.peer_closed());
    }

    #[test]
    fn test_tcp_connect_refused() {
        let (listener, endpoint) = listener();
        drop(listener);

        let result = endpoint.connect(Duration::from_millis(500));
        assert!(result.is_err());
    }

    #[test]
    fn test_peer_closed_after_server_drop() {
        let (listener, endpoint) = listener();

        let stream = endpoint.connect(Duration::from_secs(2)).expect("connect");
        let (server, _) = listener.accept().expect("accept");
        drop(server);
        thread::sleep(Duration::from_millis(100));

        assert!(stream.peer_closed());
    }

    #[test]
    fn test_peer_closed_keeps_blocking_mode() {
        let (listener, endpoint) = listener();

        let mut stream = endpoint.connect(Duration::from_secs(2)).expect("connect");
        let (mut server, _) = listener.accept().expect("accept");
        assert!(!stream.peer_closed());

        let writer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            server.write_all(b"x").expect("write");
            server
        });

        // Blocks until the byte arrives; would fail with WouldBlock otherwise.
        stream
            .set_deadline(Some(Duration::from_secs(2)))
            .expect("deadline");
        let mut buf = [0_u8; 1];
        stream.read_exact(&mut buf).expect("read");
        assert_eq!(&buf, b"x");

        drop(writer.join().expect("writer thread"));
    }
}
