//! Blocking line transport.
//!
//! This module carries command lines to the timer application and response
//! lines back.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Client (Rust)  │        TCP / named pipe      │  Timer          │
//! │                 │◄────────────────────────────►│  application    │
//! │  Transport      │   127.0.0.1:16834            │                 │
//! │  → Connector    │   \\.\pipe\LiveSplit         │  Server         │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Transport::new` - Store the connector, no I/O yet
//! 2. `Transport::send` / `recv` - Connect on first use
//! 3. On write failure - Reconnect once and resend
//! 4. `Transport::close` - Drop the connection; the next call reconnects
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Framing, deadlines, reconnection |
//! | `endpoint` | Endpoints and the stream seam |

// ============================================================================
// Submodules
// ============================================================================

/// Framing, deadlines and reconnection.
pub mod connection;

/// Endpoints and the stream seam.
pub mod endpoint;

#[cfg(test)]
pub(crate) mod mock;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{MAX_LINE_BYTES, Transport};
#[cfg(windows)]
pub use endpoint::DEFAULT_PIPE;
pub use endpoint::{Connector, DEFAULT_PORT, Endpoint, Stream};
