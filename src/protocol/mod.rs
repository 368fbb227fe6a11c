//! Line protocol vocabulary.
//!
//! This module defines what travels over the wire and what the client
//! raises locally around it.
//!
//! # Protocol Overview
//!
//! | Item | Direction | Purpose |
//! |------|-----------|---------|
//! | [`Command`] | Client → Server | One request line |
//! | response line | Server → Client | Answer to a query verb |
//! | [`Event`] | local | Raised after a control command succeeds |
//!
//! Only query verbs ([`Verb::is_query`]) produce a response line; control
//! verbs are fire-and-forget.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Verbs and request lines |
//! | `duration` | Duration wire format |
//! | `event` | Event tags |
//! | `phase` | Timer phase values |

// ============================================================================
// Submodules
// ============================================================================

/// Verbs and request lines.
pub mod command;

/// Duration wire format.
pub mod duration;

/// Event tags.
pub mod event;

/// Timer phase values.
pub mod phase;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{Command, Verb};
pub use duration::{ParseDurationError, format_duration, parse_duration};
pub use event::Event;
pub use phase::TimerPhase;
