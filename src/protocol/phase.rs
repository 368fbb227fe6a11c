//! Timer phase reported by `getcurrenttimerphase`.

// ============================================================================
// Imports
// ============================================================================

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// TimerPhase
// ============================================================================

/// Coarse run state of the timer.
///
/// The server is expected to answer with one of the four named phases. Any
/// other text is kept verbatim in [`TimerPhase::Other`] rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimerPhase {
    /// No run in progress.
    NotRunning,
    /// Run in progress.
    Running,
    /// Run paused.
    Paused,
    /// Last split done, run finished.
    Ended,
    /// Unrecognised phase string.
    Other(String),
}

impl TimerPhase {
    /// Returns the wire literal for this phase.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::NotRunning => "NotRunning",
            Self::Running => "Running",
            Self::Paused => "Paused",
            Self::Ended => "Ended",
            Self::Other(raw) => raw,
        }
    }

    /// Returns `true` if a run is in progress, paused or not.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }
}

impl From<&str> for TimerPhase {
    fn from(raw: &str) -> Self {
        match raw {
            "NotRunning" => Self::NotRunning,
            "Running" => Self::Running,
            "Paused" => Self::Paused,
            "Ended" => Self::Ended,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for TimerPhase {
    fn from(raw: String) -> Self {
        match Self::from(raw.as_str()) {
            Self::Other(_) => Self::Other(raw),
            known => known,
        }
    }
}

impl FromStr for TimerPhase {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for TimerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================
