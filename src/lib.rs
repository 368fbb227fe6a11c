//! LiveSplit Client - Drive a LiveSplit timer over its line protocol.
//!
//! This library sends timer commands to a running LiveSplit (or any server
//! speaking the same protocol) and reads back timer state.
//!
//! # Architecture
//!
//! The client follows a simple request/response model:
//!
//! - **Local End (Rust)**: Sends one CRLF-terminated command line per call
//! - **Remote End (Timer)**: Acts on the command and, for queries, answers
//!   with one line
//!
//! Key design principles:
//!
//! - Each [`Client`] owns at most one connection, opened lazily
//! - Calls block the caller's thread; no background threads are started
//! - One lock per client serializes round trips
//! - Handlers registered with [`Client::on`] observe successful commands
//!
//! # Quick Start
//!
//! ```no_run
//! use chrono::TimeDelta;
//! use livesplit_client::{Client, Result};
//!
//! fn main() -> Result<()> {
//!     let client = Client::new();
//!
//!     client.start_timer()?;
//!     client.set_game_time(TimeDelta::seconds(90))?;
//!     client.split()?;
//!
//!     println!("phase: {}", client.get_current_timer_phase()?);
//!     println!("time:  {}", livesplit_client::format_duration(client.get_current_time()?));
//!
//!     client.close()
//! }
//! ```
//!
//! # Durations
//!
//! Times travel as `[-][[HH:]MM:]SS[.ff]` text:
//!
//! ```
//! use chrono::TimeDelta;
//! use livesplit_client::{format_duration, parse_duration};
//!
//! assert_eq!(format_duration(TimeDelta::milliseconds(83_450)), "01:23.45");
//! assert_eq!(parse_duration("02:01:01").unwrap(), TimeDelta::seconds(7261));
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`Client`], builder, options and event handlers |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`protocol`] | Verbs, events, timer phases and the duration codec |
//! | [`transport`] | Blocking line transport (internal) |

// ============================================================================
// Modules
// ============================================================================

/// Timer client.
///
/// Use [`Client::new()`] for the default endpoint or [`Client::builder()`]
/// to configure one.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Protocol vocabulary.
///
/// Verbs, command lines, events, timer phases and the duration codec.
pub mod protocol;

/// Blocking line transport.
///
/// Internal module handling connection, deadlines and reconnection.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{CallbackRegistry, Client, ClientBuilder, ClientOptions, EventHandler};

// Error types
pub use error::{Error, HandlerError, HandlerResult, Result};

// Protocol types
pub use protocol::{Event, ParseDurationError, TimerPhase, format_duration, parse_duration};

// Transport types
pub use transport::{Connector, DEFAULT_PORT, Endpoint, Stream};
