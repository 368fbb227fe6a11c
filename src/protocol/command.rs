//! Protocol verbs and command lines.
//!
//! A command is a verb followed by at most one argument, sent as a single
//! CRLF-terminated line:
//!
//! ```text
//! setgametime 01:23.45\r\n
//! getfinaltime Personal Best\r\n
//! ```
//!
//! The server splits the line on the first space only, so arguments may
//! contain spaces. They may not contain line breaks.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use crate::error::{Error, Result};

use super::Event;

// ============================================================================
// Verb
// ============================================================================

/// Every verb understood by the timer server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    // ========================================================================
    // Timer Control
    // ========================================================================
    /// Start the timer.
    StartTimer,
    /// Start the timer, or split if it is already running.
    StartOrSplit,
    /// Split.
    Split,
    /// Undo the last split.
    Unsplit,
    /// Skip the current split.
    SkipSplit,
    /// Pause the timer.
    Pause,
    /// Resume a paused timer.
    Resume,
    /// Reset the run.
    Reset,

    // ========================================================================
    // Game Time
    // ========================================================================
    /// Initialise game time.
    InitGameTime,
    /// Set game time.
    SetGameTime,
    /// Set loading times.
    SetLoadingTimes,
    /// Pause game time.
    PauseGameTime,
    /// Unpause game time.
    UnpauseGameTime,

    // ========================================================================
    // Comparison
    // ========================================================================
    /// Switch the current comparison.
    SetComparison,

    // ========================================================================
    // Queries
    // ========================================================================
    /// Delta against a comparison, as display text.
    GetDelta,
    /// Time of the last split.
    GetLastSplitTime,
    /// Comparison time of the current split.
    GetComparisonSplitTime,
    /// Current timer value.
    GetCurrentTime,
    /// Final time of a comparison.
    GetFinalTime,
    /// Predicted final time against a comparison.
    GetPredictedTime,
    /// Best possible final time.
    GetBestPossibleTime,
    /// Index of the current split.
    GetSplitIndex,
    /// Name of the current split.
    GetCurrentSplitName,
    /// Name of the previous split.
    GetPreviousSplitName,
    /// Current timer phase.
    GetCurrentTimerPhase,
}

impl Verb {
    /// Returns the wire name of the verb.
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::StartTimer => "starttimer",
            Self::StartOrSplit => "startorsplit",
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
            Self::GetDelta => "getdelta",
            Self::GetLastSplitTime => "getlastsplittime",
            Self::GetComparisonSplitTime => "getcomparisonsplittime",
            Self::GetCurrentTime => "getcurrenttime",
            Self::GetFinalTime => "getfinaltime",
            Self::GetPredictedTime => "getpredictedtime",
            Self::GetBestPossibleTime => "getbestpossibletime",
            Self::GetSplitIndex => "getsplitindex",
            Self::GetCurrentSplitName => "getcurrentsplitname",
            Self::GetPreviousSplitName => "getprevioussplitname",
            Self::GetCurrentTimerPhase => "getcurrenttimerphase",
        }
    }

    /// Returns `true` if the server answers this verb with a response line.
    #[must_use]
    pub const fn is_query(self) -> bool {
        matches!(
            self,
            Self::GetDelta
                | Self::GetLastSplitTime
                | Self::GetComparisonSplitTime
                | Self::GetCurrentTime
                | Self::GetFinalTime
                | Self::GetPredictedTime
                | Self::GetBestPossibleTime
                | Self::GetSplitIndex
                | Self::GetCurrentSplitName
                | Self::GetPreviousSplitName
                | Self::GetCurrentTimerPhase
        )
    }

    /// Returns the event fired after this verb succeeds.
    ///
    /// Queries fire nothing. `StartOrSplit` fires more than one event, so it
    /// has no single mapping here; the client picks `StartTimer` or `Split`
    /// and then fires [`Event::StartOrSplit`].
    #[must_use]
    pub const fn event(self) -> Option<Event> {
        let event = match self {
            Self::StartTimer => Event::StartTimer,
            Self::Split => Event::Split,
            Self::Unsplit => Event::Unsplit,
            Self::SkipSplit => Event::SkipSplit,
            Self::Pause => Event::Pause,
            Self::Resume => Event::Resume,
            Self::Reset => Event::Reset,
            Self::InitGameTime => Event::InitGameTime,
            Self::SetGameTime => Event::SetGameTime,
            Self::SetLoadingTimes => Event::SetLoadingTimes,
            Self::PauseGameTime => Event::PauseGameTime,
            Self::UnpauseGameTime => Event::UnpauseGameTime,
            Self::SetComparison => Event::SetComparison,
            _ => return None,
        };
        Some(event)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

// ============================================================================
// Command
// ============================================================================

/// A verb and its arguments, ready to be written as one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    verb: Verb,
    /// Verb wire name followed by the arguments.
    tokens: Vec<String>,
}

impl Command {
    /// Creates a command with no arguments.
    #[must_use]
    pub fn new(verb: Verb) -> Self {
        Self {
            verb,
            tokens: vec![verb.wire_name().to_string()],
        }
    }

    /// Appends an argument.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the argument contains a CR or LF,
    /// which would end the request line early.
    pub fn with_arg(mut self, arg: impl Into<String>) -> Result<Self> {
        let arg = arg.into();
        if arg.contains(['\r', '\n']) {
            return Err(Error::invalid_argument(format!(
                "{} argument contains a line break: {arg:?}",
                self.verb
            )));
        }
        self.tokens.push(arg);
        Ok(self)
    }

    /// Appends an argument if one is given.
    ///
    /// # Errors
    ///
    /// Same as [`Command::with_arg`].
    pub fn with_optional_arg(self, arg: Option<&str>) -> Result<Self> {
        match arg {
            Some(arg) => self.with_arg(arg),
            None => Ok(self),
        }
    }

    /// Returns the verb.
    #[inline]
    #[must_use]
    pub const fn verb(&self) -> Verb {
        self.verb
    }

    /// Returns the tokens: wire name first, then the arguments.
    #[inline]
    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Renders the CRLF-terminated request line.
    #[must_use]
    pub fn to_line(&self) -> String {
        format!("{self}\r\n")
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tokens.join(" "))
    }
}

// ============================================================================
// Tests
// ============================================================================
