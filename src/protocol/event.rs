//! Client-side events.
//!
//! Events are raised locally after a command has been written to the server
//! without error. They carry no data of their own; handlers receive the
//! tokens of the command that triggered them.
//!
//! | Event | Raised by |
//! |-------|-----------|
//! | `StartTimer` | `start_timer`, `start_or_split` |
//! | `Split` | `split`, `start_or_split` |
//! | `StartOrSplit` | `start_or_split`, after `StartTimer` or `Split` |
//! | `SetGameTime` | `set_game_time` |
//! | `Close` | `close` |
//! | ... | one per remaining control verb |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// Event
// ============================================================================

/// Tag identifying a list of registered handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// Timer started.
    StartTimer,
    /// Split recorded.
    Split,
    /// Last split undone.
    Unsplit,
    /// Split skipped.
    SkipSplit,
    /// Timer paused.
    Pause,
    /// Timer resumed.
    Resume,
    /// Run reset.
    Reset,
    /// Game time initialised.
    InitGameTime,
    /// Game time set.
    SetGameTime,
    /// Loading times set.
    SetLoadingTimes,
    /// Game time paused.
    PauseGameTime,
    /// Game time unpaused.
    UnpauseGameTime,
    /// Comparison switched.
    SetComparison,
    /// `start_or_split` succeeded. Fires after the `StartTimer` or `Split`
    /// event it chose.
    StartOrSplit,
    /// Client closed. Not tied to a wire command; handlers get no tokens.
    Close,
}

impl Event {
    /// Returns a stable name for logging.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::StartTimer => "start",
            Self::Split => "split",
            Self::Unsplit => "unsplit",
            Self::SkipSplit => "skipsplit",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Reset => "reset",
            Self::InitGameTime => "initgametime",
            Self::SetGameTime => "setgametime",
            Self::SetLoadingTimes => "setloadingtimes",
            Self::PauseGameTime => "pausegametime",
            Self::UnpauseGameTime => "unpausegametime",
            Self::SetComparison => "setcomparison",
            Self::StartOrSplit => "startorsplit",
            Self::Close => "close",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
