//! Timer client.
//!
//! This module provides the main entry point for driving the timer.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Client`] | One method per protocol verb |
//! | [`ClientBuilder`] | Fluent configuration builder |
//! | [`ClientOptions`] | Timeouts and retry policy |
//! | [`CallbackRegistry`] | Event handlers fired after commands |
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use livesplit_client::{Client, Result};
//!
//! # fn example() -> Result<()> {
//! let client = Client::builder()
//!     .port(16834)
//!     .timeout(Duration::from_secs(1))
//!     .build()?;
//!
//! client.on_reset(|_| {
//!     println!("run reset");
//!     Ok(())
//! });
//!
//! client.reset()?;
//! client.start_timer()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for client configuration.
pub mod builder;

/// Event handler registry.
pub mod callbacks;

/// Core client implementation.
pub mod core;

/// Timeouts and retry policy.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ClientBuilder;
pub use callbacks::{CallbackRegistry, EventHandler};
pub use core::Client;
pub use options::{ClientOptions, DEFAULT_TIMEOUT};
