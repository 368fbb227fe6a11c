//! Event handler registry.
//!
//! Handlers are observers: they run after a command succeeded, in
//! registration order, and nothing they do changes the command's result. A
//! handler that returns an error or panics is logged and skipped.

// ============================================================================
// Imports
// ============================================================================

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use rustc_hash::FxHashMap;
use tracing::warn;

use crate::error::HandlerResult;
use crate::protocol::Event;

// ============================================================================
// Types
// ============================================================================

/// Event handler callback type.
///
/// Receives the tokens of the command that raised the event (empty for
/// [`Event::Close`]).
pub type EventHandler = Box<dyn Fn(&[String]) -> HandlerResult + Send + Sync>;

// ============================================================================
// CallbackRegistry
// ============================================================================

/// Ordered handler lists keyed by [`Event`].
#[derive(Default)]
pub struct CallbackRegistry {
    handlers: FxHashMap<Event, Vec<EventHandler>>,
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: FxHashMap<_, _> = self
            .handlers
            .iter()
            .map(|(event, list)| (*event, list.len()))
            .collect();
        f.debug_struct("CallbackRegistry")
            .field("handlers", &counts)
            .finish()
    }
}

impl CallbackRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler for `event`. Handlers cannot be removed.
    pub fn on(&mut self, event: Event, handler: EventHandler) {
        self.handlers.entry(event).or_default().push(handler);
    }

    /// Returns the number of handlers registered for `event`.
    #[inline]
    #[must_use]
    pub fn handler_count(&self, event: Event) -> usize {
        self.handlers.get(&event).map_or(0, Vec::len)
    }

    /// Runs every handler for `event` in registration order.
    ///
    /// Returns the number of handlers that failed.
    pub fn fire(&self, event: Event, tokens: &[String]) -> usize {
        let Some(handlers) = self.handlers.get(&event) else {
            return 0;
        };

        let mut failures = 0;
        for (index, handler) in handlers.iter().enumerate() {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(tokens))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failures += 1;
                    warn!(%event, index, error = %e, "Event handler failed");
                }
                Err(payload) => {
                    failures += 1;
                    warn!(%event, index, panic = panic_message(&*payload), "Event handler panicked");
                }
            }
        }
        failures
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

// ============================================================================
// Tests
// ============================================================================
