//! Client type and command dispatch.
//!
//! Every operation takes the client's lock for its whole round trip: send,
//! optional receive, decode and handler firing. Calls from different threads
//! are therefore never interleaved on the wire.

// ============================================================================
// Imports
// ============================================================================

use chrono::TimeDelta;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::error::{Error, HandlerResult, Result};
use crate::protocol::{Command, Event, TimerPhase, Verb, format_duration, parse_duration};
use crate::transport::{Endpoint, Transport};

use super::builder::ClientBuilder;
use super::callbacks::CallbackRegistry;
use super::options::ClientOptions;

// ============================================================================
// Client
// ============================================================================

/// Connection to a running timer application.
///
/// The client connects lazily on its first command and reconnects on its
/// own after the server goes away. It is `Send + Sync`; share it behind an
/// [`Arc`](std::sync::Arc) to drive one timer from several threads.
///
/// Two `Client` values pointed at the same endpoint do not share a lock and
/// may interleave their commands at the server.
///
/// # Example
///
/// ```no_run
/// use livesplit_client::{Client, Result};
///
/// fn main() -> Result<()> {
///     let client = Client::new();
///
///     client.on_split(|tokens| {
///         println!("sent {tokens:?}");
///         Ok(())
///     });
///
///     client.start_timer()?;
///     client.split()?;
///     println!("now at split {}", client.get_split_index()?);
///
///     client.close()
/// }
/// ```
pub struct Client {
    /// Connection state, also the round-trip lock.
    transport: Mutex<Transport>,
    /// Registered event handlers.
    callbacks: RwLock<CallbackRegistry>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("transport", &*self.transport.lock())
            .field("callbacks", &*self.callbacks.read())
            .finish()
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Construction
// ============================================================================

impl Client {
    /// Creates a client for the default endpoint with default options.
    ///
    /// Does not connect.
    #[must_use]
    pub fn new() -> Self {
        Self::with_endpoint(Endpoint::default())
    }

    /// Creates a client for `127.0.0.1:port` with default options.
    #[must_use]
    pub fn with_port(port: u16) -> Self {
        Self::with_endpoint(Endpoint::tcp(port))
    }

    /// Creates a client for `endpoint` with default options.
    #[must_use]
    pub fn with_endpoint(endpoint: Endpoint) -> Self {
        Self::from_transport(Transport::new(Box::new(endpoint), ClientOptions::new()))
    }

    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub(crate) fn from_transport(transport: Transport) -> Self {
        Self {
            transport: Mutex::new(transport),
            callbacks: RwLock::new(CallbackRegistry::new()),
        }
    }
}

// ============================================================================
// Connection
// ============================================================================

impl Client {
    /// Returns a description of the endpoint.
    #[must_use]
    pub fn endpoint(&self) -> String {
        self.transport.lock().endpoint()
    }

    /// Returns `true` if a connection is currently held.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.transport.lock().is_connected()
    }

    /// Connects now instead of on the first command.
    ///
    /// # Errors
    ///
    /// [`Error::Connection`] if the endpoint cannot be reached.
    pub fn connect(&self) -> Result<()> {
        self.transport.lock().ensure_connected()
    }

    /// Drops the connection and fires [`Event::Close`].
    ///
    /// Safe to call repeatedly; the client reconnects if used again.
    ///
    /// # Errors
    ///
    /// Currently never fails.
    pub fn close(&self) -> Result<()> {
        let mut transport = self.transport.lock();
        transport.close();
        self.fire(Event::Close, &[]);
        drop(transport);
        Ok(())
    }
}

// ============================================================================
// Event Subscription
// ============================================================================

impl Client {
    /// Registers a handler for `event`.
    ///
    /// Handlers run on the calling thread after the command succeeded, in
    /// registration order, while the client's lock is held. A handler must
    /// not call back into the same client; doing so deadlocks. Errors and
    /// panics from a handler are logged and otherwise ignored.
    pub fn on<F>(&self, event: Event, handler: F)
    where
        F: Fn(&[String]) -> HandlerResult + Send + Sync + 'static,
    {
        self.callbacks.write().on(event, Box::new(handler));
    }

    /// Registers a handler fired after [`start_timer`](Self::start_timer).
    pub fn on_start_timer<F>(&self, handler: F)
    where
        F: Fn(&[String]) -> HandlerResult + Send + Sync + 'static,
    {
        self.on(Event::StartTimer, handler);
    }

    /// Registers a handler fired after
    /// [`start_or_split`](Self::start_or_split), and only after it.
    pub fn on_start_or_split<F>(&self, handler: F)
    where
        F: Fn(&[String]) -> HandlerResult + Send + Sync + 'static,
    {
        self.on(Event::StartOrSplit, handler);
    }

    /// Registers a handler fired after [`split`](Self::split).
    pub fn on_split<F>(&self, handler: F)
    where
        F: Fn(&[String]) -> HandlerResult + Send + Sync + 'static,
    {
        self.on(Event::Split, handler);
    }

    /// Registers a handler fired after [`unsplit`](Self::unsplit).
    pub fn on_unsplit<F>(&self, handler: F)
    where
        F: Fn(&[String]) -> HandlerResult + Send + Sync + 'static,
    {
        self.on(Event::Unsplit, handler);
    }

    /// Registers a handler fired after [`skip_split`](Self::skip_split).
    pub fn on_skip_split<F>(&self, handler: F)
    where
        F: Fn(&[String]) -> HandlerResult + Send + Sync + 'static,
    {
        self.on(Event::SkipSplit, handler);
    }

    /// Registers a handler fired after [`pause`](Self::pause).
    pub fn on_pause<F>(&self, handler: F)
    where
        F: Fn(&[String]) -> HandlerResult + Send + Sync + 'static,
    {
        self.on(Event::Pause, handler);
    }

    /// Registers a handler fired after [`resume`](Self::resume).
    pub fn on_resume<F>(&self, handler: F)
    where
        F: Fn(&[String]) -> HandlerResult + Send + Sync + 'static,
    {
        self.on(Event::Resume, handler);
    }

    /// Registers a handler fired after [`reset`](Self::reset).
    pub fn on_reset<F>(&self, handler: F)
    where
        F: Fn(&[String]) -> HandlerResult + Send + Sync + 'static,
    {
        self.on(Event::Reset, handler);
    }

    /// Registers a handler fired after [`init_game_time`](Self::init_game_time).
    pub fn on_init_game_time<F>(&self, handler: F)
    where
        F: Fn(&[String]) -> HandlerResult + Send + Sync + 'static,
    {
        self.on(Event::InitGameTime, handler);
    }

    /// Registers a handler fired after [`set_game_time`](Self::set_game_time).
    pub fn on_set_game_time<F>(&self, handler: F)
    where
        F: Fn(&[String]) -> HandlerResult + Send + Sync + 'static,
    {
        self.on(Event::SetGameTime, handler);
    }

    /// Registers a handler fired after
    /// [`set_loading_times`](Self::set_loading_times).
    pub fn on_set_loading_times<F>(&self, handler: F)
    where
        F: Fn(&[String]) -> HandlerResult + Send + Sync + 'static,
    {
        self.on(Event::SetLoadingTimes, handler);
    }

    /// Registers a handler fired after
    /// [`pause_game_time`](Self::pause_game_time).
    pub fn on_pause_game_time<F>(&self, handler: F)
    where
        F: Fn(&[String]) -> HandlerResult + Send + Sync + 'static,
    {
        self.on(Event::PauseGameTime, handler);
    }

    /// Registers a handler fired after
    /// [`unpause_game_time`](Self::unpause_game_time).
    pub fn on_unpause_game_time<F>(&self, handler: F)
    where
        F: Fn(&[String]) -> HandlerResult + Send + Sync + 'static,
    {
        self.on(Event::UnpauseGameTime, handler);
    }

    /// Registers a handler fired after [`set_comparison`](Self::set_comparison).
    pub fn on_set_comparison<F>(&self, handler: F)
    where
        F: Fn(&[String]) -> HandlerResult + Send + Sync + 'static,
    {
        self.on(Event::SetComparison, handler);
    }

    /// Registers a handler fired by [`close`](Self::close). It receives no
    /// tokens.
    pub fn on_close<F>(&self, handler: F)
    where
        F: Fn(&[String]) -> HandlerResult + Send + Sync + 'static,
    {
        self.on(Event::Close, handler);
    }
}

// ============================================================================
// Timer Control
// ============================================================================

impl Client {
    /// Starts the timer.
    ///
    /// # Errors
    ///
    /// Any transport error; handlers do not fire.
    pub fn start_timer(&self) -> Result<()> {
        self.execute_verb(Verb::StartTimer)
    }

    /// Starts the timer, or splits if it is running.
    ///
    /// The phase is queried first in its own round trip. Fires
    /// [`Event::StartTimer`] if that phase was [`TimerPhase::Running`] and
    /// [`Event::Split`] otherwise, then [`Event::StartOrSplit`]. This pairing looks inverted but is kept
    /// as is for compatibility with existing handlers. The phase may be
    /// stale by the time the server acts on the command.
    ///
    /// # Errors
    ///
    /// Any transport error from either round trip; handlers do not fire.
    pub fn start_or_split(&self) -> Result<()> {
        let phase = self.get_current_timer_phase()?;
        let event = if phase == TimerPhase::Running {
            Event::StartTimer
        } else {
            Event::Split
        };

        debug!(%phase, %event, "Start or split");
        self.execute(&Command::new(Verb::StartOrSplit), &[event, Event::StartOrSplit])
    }

    /// Splits.
    ///
    /// # Errors
    ///
    /// Any transport error; handlers do not fire.
    pub fn split(&self) -> Result<()> {
        self.execute_verb(Verb::Split)
    }

    /// Undoes the last split.
    ///
    /// # Errors
    ///
    /// Any transport error; handlers do not fire.
    pub fn unsplit(&self) -> Result<()> {
        self.execute_verb(Verb::Unsplit)
    }

    /// Skips the current split.
    ///
    /// # Errors
    ///
    /// Any transport error; handlers do not fire.
    pub fn skip_split(&self) -> Result<()> {
        self.execute_verb(Verb::SkipSplit)
    }

    /// Pauses the timer.
    ///
    /// # Errors
    ///
    /// Any transport error; handlers do not fire.
    pub fn pause(&self) -> Result<()> {
        self.execute_verb(Verb::Pause)
    }

    /// Resumes a paused timer.
    ///
    /// # Errors
    ///
    /// Any transport error; handlers do not fire.
    pub fn resume(&self) -> Result<()> {
        self.execute_verb(Verb::Resume)
    }

    /// Resets the run.
    ///
    /// # Errors
    ///
    /// Any transport error; handlers do not fire.
    pub fn reset(&self) -> Result<()> {
        self.execute_verb(Verb::Reset)
    }
}

// ============================================================================
// Game Time
// ============================================================================

impl Client {
    /// Initialises game time.
    ///
    /// # Errors
    ///
    /// Any transport error; handlers do not fire.
    pub fn init_game_time(&self) -> Result<()> {
        self.execute_verb(Verb::InitGameTime)
    }

    /// Sets game time.
    ///
    /// # Errors
    ///
    /// Any transport error; handlers do not fire.
    pub fn set_game_time(&self, time: TimeDelta) -> Result<()> {
        let command = Command::new(Verb::SetGameTime).with_arg(format_duration(time))?;
        self.execute(&command, Verb::SetGameTime.event().as_slice())
    }

    /// Sets loading times.
    ///
    /// # Errors
    ///
    /// Any transport error; handlers do not fire.
    pub fn set_loading_times(&self, time: TimeDelta) -> Result<()> {
        let command = Command::new(Verb::SetLoadingTimes).with_arg(format_duration(time))?;
        self.execute(&command, Verb::SetLoadingTimes.event().as_slice())
    }

    /// Pauses game time.
    ///
    /// # Errors
    ///
    /// Any transport error; handlers do not fire.
    pub fn pause_game_time(&self) -> Result<()> {
        self.execute_verb(Verb::PauseGameTime)
    }

    /// Unpauses game time.
    ///
    /// # Errors
    ///
    /// Any transport error; handlers do not fire.
    pub fn unpause_game_time(&self) -> Result<()> {
        self.execute_verb(Verb::UnpauseGameTime)
    }

    /// Switches the current comparison.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `comparison` contains a line break
    /// - Any transport error; handlers do not fire
    pub fn set_comparison(&self, comparison: &str) -> Result<()> {
        let command = Command::new(Verb::SetComparison).with_arg(comparison)?;
        self.execute(&command, Verb::SetComparison.event().as_slice())
    }
}

// ============================================================================
// Queries
// ============================================================================

impl Client {
    /// Returns the delta against `comparison` (or the current comparison) as
    /// display text, e.g. `"+1.23"` or `"-"`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `comparison` contains a line break
    /// - Any transport error
    pub fn get_delta(&self, comparison: Option<&str>) -> Result<String> {
        let command = Command::new(Verb::GetDelta).with_optional_arg(comparison)?;
        self.query_with(&command, |line| Ok(line.to_string()))
    }

    /// Returns the time of the last split.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidDuration`] if the server answers something that is
    ///   not a time, such as `"-"` before the first split
    /// - Any transport error
    pub fn get_last_split_time(&self) -> Result<TimeDelta> {
        self.query_duration(&Command::new(Verb::GetLastSplitTime))
    }

    /// Returns the comparison time of the current split.
    ///
    /// Always uses the current comparison. The server accepts a comparison
    /// name here, but this call does not forward one; switch with
    /// [`set_comparison`](Self::set_comparison) first to query another.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidDuration`] if the answer is not a time
    /// - Any transport error
    pub fn get_comparison_split_time(&self) -> Result<TimeDelta> {
        self.query_duration(&Command::new(Verb::GetComparisonSplitTime))
    }

    /// Returns the current timer value.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidDuration`] if the answer is not a time
    /// - Any transport error
    pub fn get_current_time(&self) -> Result<TimeDelta> {
        self.query_duration(&Command::new(Verb::GetCurrentTime))
    }

    /// Returns the final time of `comparison`, or of the current comparison.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `comparison` contains a line break
    /// - [`Error::InvalidDuration`] if the answer is not a time
    /// - Any transport error
    pub fn get_final_time(&self, comparison: Option<&str>) -> Result<TimeDelta> {
        let command = Command::new(Verb::GetFinalTime).with_optional_arg(comparison)?;
        self.query_duration(&command)
    }

    /// Returns the predicted final time against `comparison`, or against the
    /// current comparison.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `comparison` contains a line break
    /// - [`Error::InvalidDuration`] if the answer is not a time
    /// - Any transport error
    pub fn get_predicted_time(&self, comparison: Option<&str>) -> Result<TimeDelta> {
        let command = Command::new(Verb::GetPredictedTime).with_optional_arg(comparison)?;
        self.query_duration(&command)
    }

    /// Returns the best possible final time.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidDuration`] if the answer is not a time
    /// - Any transport error
    pub fn get_best_possible_time(&self) -> Result<TimeDelta> {
        self.query_duration(&Command::new(Verb::GetBestPossibleTime))
    }

    /// Returns the index of the current split, `-1` when not running.
    ///
    /// # Errors
    ///
    /// - [`Error::Protocol`] if the answer is not an integer
    /// - Any transport error
    pub fn get_split_index(&self) -> Result<i32> {
        self.query_with(&Command::new(Verb::GetSplitIndex), |line| {
            line.trim()
                .parse()
                .map_err(|e| Error::protocol(format!("invalid split index {line:?}: {e}")))
        })
    }

    /// Returns the name of the current split.
    ///
    /// # Errors
    ///
    /// Any transport error.
    pub fn get_current_split_name(&self) -> Result<String> {
        self.query_with(&Command::new(Verb::GetCurrentSplitName), |line| {
            Ok(line.to_string())
        })
    }

    /// Returns the name of the previous split.
    ///
    /// # Errors
    ///
    /// Any transport error.
    pub fn get_previous_split_name(&self) -> Result<String> {
        self.query_with(&Command::new(Verb::GetPreviousSplitName), |line| {
            Ok(line.to_string())
        })
    }

    /// Returns the current timer phase.
    ///
    /// Unknown phase names are returned as [`TimerPhase::Other`].
    ///
    /// # Errors
    ///
    /// Any transport error.
    pub fn get_current_timer_phase(&self) -> Result<TimerPhase> {
        self.query_with(&Command::new(Verb::GetCurrentTimerPhase), |line| {
            Ok(TimerPhase::from(line))
        })
    }
}

// ============================================================================
// Internals
// ============================================================================

impl Client {
    /// Sends an argument-less verb and fires its event, if any.
    fn execute_verb(&self, verb: Verb) -> Result<()> {
        self.execute(&Command::new(verb), verb.event().as_slice())
    }

    /// Sends `command` and fires `events` in order on success, all under the
    /// lock.
    fn execute(&self, command: &Command, events: &[Event]) -> Result<()> {
        let mut transport = self.transport.lock();
        transport.send(command)?;

        for &event in events {
            self.fire(event, command.tokens());
        }

        drop(transport);
        Ok(())
    }

    /// Sends `command`, reads one line and decodes it, all under the lock.
    fn query_with<T>(
        &self,
        command: &Command,
        decode: impl FnOnce(&str) -> Result<T>,
    ) -> Result<T> {
        let mut transport = self.transport.lock();
        transport.send(command)?;
        let line = transport.recv()?;
        decode(&line)
    }

    fn query_duration(&self, command: &Command) -> Result<TimeDelta> {
        self.query_with(command, |line| Ok(parse_duration(line)?))
    }

    fn fire(&self, event: Event, tokens: &[String]) {
        let failures = self.callbacks.read().fire(event, tokens);
        if failures > 0 {
            debug!(%event, failures, "Some event handlers failed");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::{BufRead, BufReader, ErrorKind, Write};
    use std::net::TcpListener;
    use std::sync::Arc;
    use std::sync::mpsc;
    use std::thread;

    use crate::transport::mock::{MockConnector, Script};

    fn mock_client(mock: &MockConnector) -> Client {
        Client::builder()
            .connector(mock.clone())
            .build()
            .expect("valid options")
    }

    fn record(client: &Client, event: Event) -> Arc<Mutex<Vec<String>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        client.on(event, move |tokens| {
            sink.lock().push(tokens.join(" "));
            Ok(())
        });
        log
    }

    #[test]
    fn test_client_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Client>();
    }

    #[test]
    fn test_new_does_not_connect() {
        let client = Client::with_port(1);
        assert!(!client.is_connected());
        assert_eq!(client.endpoint(), "127.0.0.1:1");
    }

    #[test]
    fn test_control_verbs_wire_lines() {
        let mock = MockConnector::new();
        mock.push(Script::ok());
        let client = mock_client(&mock);

        client.start_timer().expect("start");
        client.split().expect("split");
        client.unsplit().expect("unsplit");
        client.skip_split().expect("skip");
        client.pause().expect("pause");
        client.resume().expect("resume");
        client.reset().expect("reset");
        client.init_game_time().expect("init");
        client.pause_game_time().expect("pause game time");
        client.unpause_game_time().expect("unpause game time");

        assert_eq!(
            mock.written(),
            ["starttimer\r\nsplit\r\nunsplit\r\nskipsplit\r\npause\r\nresume\r\nreset\r\n\
              initgametime\r\npausegametime\r\nunpausegametime\r\n"]
        );
        assert_eq!(mock.connects(), 1);
    }

    #[test]
    fn test_argument_verbs_wire_lines() {
        let mock = MockConnector::new();
        mock.push(Script::ok());
        let client = mock_client(&mock);

        client
            .set_game_time(TimeDelta::milliseconds(83_450))
            .expect("set game time");
        client
            .set_loading_times(TimeDelta::milliseconds(1_500))
            .expect("set loading times");
        client.set_comparison("Best Segments").expect("set comparison");

        assert_eq!(
            mock.written(),
            ["setgametime 01:23.45\r\nsetloadingtimes 1.50\r\nsetcomparison Best Segments\r\n"]
        );
    }

    #[test]
    fn test_line_break_in_argument_rejected_before_io() {
        let mock = MockConnector::new();
        let client = mock_client(&mock);

        let err = client
            .set_comparison("Personal Best\r\nreset")
            .expect_err("line break");

        assert!(matches!(err, Error::InvalidArgument { .. }));
        assert_eq!(mock.connects(), 0);
    }

    #[test]
    fn test_duration_queries() {
        let mock = MockConnector::new();
        mock.push(Script::responding("1:23.45\r\n0.50\r\n1:00:00\r\n"));
        let client = mock_client(&mock);

        assert_eq!(
            client.get_current_time().expect("current"),
            TimeDelta::milliseconds(83_450)
        );
        assert_eq!(
            client.get_last_split_time().expect("last split"),
            TimeDelta::milliseconds(500)
        );
        assert_eq!(
            client.get_best_possible_time().expect("best possible"),
            TimeDelta::hours(1)
        );
        assert_eq!(
            mock.written(),
            ["getcurrenttime\r\ngetlastsplittime\r\ngetbestpossibletime\r\n"]
        );
    }

    #[test]
    fn test_comparison_argument_forwarding() {
        let mock = MockConnector::new();
        mock.push(Script::responding("10\r\n20\r\n30\r\n40\r\n+1.5\r\n"));
        let client = mock_client(&mock);

        client.get_final_time(None).expect("final");
        client
            .get_final_time(Some("Personal Best"))
            .expect("final with comparison");
        client
            .get_predicted_time(Some("Best Segments"))
            .expect("predicted");
        client.get_comparison_split_time().expect("comparison split");
        assert_eq!(client.get_delta(None).expect("delta"), "+1.5");

        assert_eq!(
            mock.written(),
            ["getfinaltime\r\ngetfinaltime Personal Best\r\n\
              getpredictedtime Best Segments\r\ngetcomparisonsplittime\r\ngetdelta\r\n"]
        );
    }

    #[test]
    fn test_text_queries() {
        let mock = MockConnector::new();
        mock.push(Script::responding("Forest Temple\r\nDeku Tree\r\n-\r\n"));
        let client = mock_client(&mock);

        assert_eq!(client.get_current_split_name().expect("current"), "Forest Temple");
        assert_eq!(client.get_previous_split_name().expect("previous"), "Deku Tree");
        assert_eq!(client.get_delta(Some("Personal Best")).expect("delta"), "-");
    }

    #[test]
    fn test_split_index() {
        let mock = MockConnector::new();
        mock.push(Script::responding("3\r\n-1\r\n"));
        let client = mock_client(&mock);

        assert_eq!(client.get_split_index().expect("index"), 3);
        assert_eq!(client.get_split_index().expect("not running"), -1);
    }

    #[test]
    fn test_split_index_garbage_is_protocol_error() {
        let mock = MockConnector::new();
        mock.push(Script::responding("three\r\n"));
        let client = mock_client(&mock);

        let err = client.get_split_index().expect_err("not an integer");
        assert!(err.is_protocol_error());
    }

    #[test]
    fn test_duration_garbage_is_invalid_duration() {
        let mock = MockConnector::new();
        mock.push(Script::responding("-\r\n"));
        let client = mock_client(&mock);

        let err = client.get_last_split_time().expect_err("not a time");
        assert!(matches!(err, Error::InvalidDuration(_)));
    }

    #[test]
    fn test_timer_phase() {
        let mock = MockConnector::new();
        mock.push(Script::responding("Paused\r\nWarmup\r\n"));
        let client = mock_client(&mock);

        assert_eq!(client.get_current_timer_phase().expect("phase"), TimerPhase::Paused);
        assert_eq!(
            client.get_current_timer_phase().expect("unknown phase"),
            TimerPhase::Other("Warmup".to_string())
        );
    }

    #[test]
    fn test_handlers_receive_sent_tokens() {
        let mock = MockConnector::new();
        mock.push(Script::ok());
        let client = mock_client(&mock);
        let log = record(&client, Event::SetGameTime);

        client
            .set_game_time(TimeDelta::seconds(61))
            .expect("set game time");

        assert_eq!(*log.lock(), ["setgametime 01:01"]);
    }

    #[test]
    fn test_on_helpers_register_matching_events() {
        let mock = MockConnector::new();
        mock.push(Script::ok());
        let client = mock_client(&mock);
        let log = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&log);
        client.on_pause(move |tokens| {
            sink.lock().push(format!("pause handler: {}", tokens.join(" ")));
            Ok(())
        });
        let sink = Arc::clone(&log);
        client.on_reset(move |tokens| {
            sink.lock().push(format!("reset handler: {}", tokens.join(" ")));
            Ok(())
        });

        client.pause().expect("pause");
        client.resume().expect("resume");
        client.reset().expect("reset");

        assert_eq!(*log.lock(), ["pause handler: pause", "reset handler: reset"]);
    }

    #[test]
    fn test_queries_fire_no_events() {
        let mock = MockConnector::new();
        mock.push(Script::responding("Running\r\n"));
        let client = mock_client(&mock);
        let starts = record(&client, Event::StartTimer);
        let splits = record(&client, Event::Split);

        client.get_current_timer_phase().expect("phase");

        assert!(starts.lock().is_empty());
        assert!(splits.lock().is_empty());
    }

    #[test]
    fn test_transport_error_suppresses_handlers() {
        let mock = MockConnector::new();
        mock.refuse();
        let client = mock_client(&mock);
        let log = record(&client, Event::Split);

        let err = client.split().expect_err("refused");

        assert!(err.is_connection_error());
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_failing_handler_does_not_change_result() {
        let mock = MockConnector::new();
        mock.push(Script::ok());
        let client = mock_client(&mock);
        client.on_split(|_| Err("handler failed".into()));
        let log = record(&client, Event::Split);

        client.split().expect("split still succeeds");

        assert_eq!(*log.lock(), ["split"]);
    }

    #[test]
    fn test_start_or_split_while_running_fires_start() {
        let mock = MockConnector::new();
        mock.push(Script::responding("Running\r\n"));
        let client = mock_client(&mock);
        let starts = record(&client, Event::StartTimer);
        let splits = record(&client, Event::Split);

        client.start_or_split().expect("start or split");

        assert_eq!(mock.written(), ["getcurrenttimerphase\r\nstartorsplit\r\n"]);
        assert_eq!(*starts.lock(), ["startorsplit"]);
        assert!(splits.lock().is_empty());
    }

    #[test]
    fn test_start_or_split_when_idle_fires_split() {
        let mock = MockConnector::new();
        mock.push(Script::responding("NotRunning\r\n"));
        let client = mock_client(&mock);
        let starts = record(&client, Event::StartTimer);
        let splits = record(&client, Event::Split);

        client.start_or_split().expect("start or split");

        assert!(starts.lock().is_empty());
        assert_eq!(*splits.lock(), ["startorsplit"]);
    }

    #[test]
    fn test_on_start_or_split_fires_only_for_start_or_split() {
        let mock = MockConnector::new();
        mock.push(Script::responding("Running\r\nEnded\r\n"));
        let client = mock_client(&mock);
        let log = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&log);
        client.on_split(move |_| {
            sink.lock().push("split");
            Ok(())
        });
        let sink = Arc::clone(&log);
        client.on_start_or_split(move |tokens| {
            assert_eq!(tokens, ["startorsplit"]);
            sink.lock().push("start or split");
            Ok(())
        });

        client.start_timer().expect("start");
        client.split().expect("split");
        client.start_or_split().expect("while running");
        client.start_or_split().expect("after the run ended");

        assert_eq!(
            *log.lock(),
            ["split", "start or split", "split", "start or split"]
        );
    }

    #[test]
    fn test_start_or_split_phase_failure_sends_nothing_else() {
        let mock = MockConnector::new();
        mock.push(Script::ok());
        let client = mock_client(&mock);
        let splits = record(&client, Event::Split);

        let err = client.start_or_split().expect_err("no phase answer");

        assert!(matches!(err, Error::Io(ref e) if e.kind() == ErrorKind::UnexpectedEof));
        assert_eq!(mock.written(), ["getcurrenttimerphase\r\n"]);
        assert!(splits.lock().is_empty());
    }

    #[test]
    fn test_close_twice_fires_close_each_time() {
        let mock = MockConnector::new();
        mock.push(Script::ok());
        let client = mock_client(&mock);
        let log = record(&client, Event::Close);

        client.connect().expect("connect");
        assert!(client.is_connected());

        client.close().expect("first close");
        client.close().expect("second close");

        assert!(!client.is_connected());
        assert_eq!(*log.lock(), ["", ""]);
    }

    #[test]
    fn test_reuse_after_close_reconnects() {
        let mock = MockConnector::new();
        mock.push(Script::ok()).push(Script::ok());
        let client = mock_client(&mock);

        client.split().expect("split");
        client.close().expect("close");
        client.reset().expect("reset");

        assert_eq!(mock.connects(), 2);
        assert_eq!(mock.written(), ["split\r\n", "reset\r\n"]);
    }

    #[test]
    fn test_concurrent_commands_are_not_interleaved() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 25;

        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let (tx, rx) = mpsc::channel();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream);
            let mut lines = Vec::new();
            while lines.len() < THREADS * PER_THREAD {
                let mut line = String::new();
                if reader.read_line(&mut line).expect("read") == 0 {
                    break;
                }
                lines.push(line);
            }
            tx.send(lines).expect("report");
        });

        let client = Client::with_port(port);
        client.connect().expect("connect");

        thread::scope(|scope| {
            for id in 0..THREADS {
                let client = &client;
                scope.spawn(move || {
                    let name = format!("thread {id} {}", "x".repeat(512));
                    for _ in 0..PER_THREAD {
                        client.set_comparison(&name).expect("set comparison");
                    }
                });
            }
        });

        let lines = rx.recv().expect("server lines");
        server.join().expect("server thread");

        assert_eq!(lines.len(), THREADS * PER_THREAD);
        let padding = "x".repeat(512);
        for line in &lines {
            let body = line
                .strip_prefix("setcomparison thread ")
                .and_then(|rest| rest.strip_suffix("\r\n"))
                .unwrap_or_else(|| panic!("malformed line {line:?}"));
            let (id, rest) = body.split_once(' ').expect("thread id");
            assert!(id.parse::<usize>().is_ok_and(|id| id < THREADS));
            assert_eq!(rest, padding);
        }
    }

    #[test]
    fn test_query_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            let mut writer = stream.try_clone().expect("clone");
            let mut reader = BufReader::new(stream);
            let mut line = String::new();
            reader.read_line(&mut line).expect("read");
            assert_eq!(line, "getcurrenttime\r\n");
            writer.write_all(b"12:34.56\r\n").expect("write");
        });

        let client = Client::with_port(port);
        let time = client.get_current_time().expect("current time");
        server.join().expect("server thread");

        assert_eq!(time, TimeDelta::milliseconds(12 * 60_000 + 34_560));
    }

    #[test]
    fn test_trickled_answer_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            let mut writer = stream.try_clone().expect("clone");
            let mut reader = BufReader::new(stream);
            let mut line = String::new();
            reader.read_line(&mut line).expect("read");

            for _ in 0..10 {
                thread::sleep(std::time::Duration::from_millis(150));
                if writer.write_all(b"1").is_err() {
                    return;
                }
            }
            let _ = writer.write_all(b"\r\n");
        });

        let io_timeout = std::time::Duration::from_millis(200);
        let client = Client::builder()
            .port(port)
            .io_timeout(io_timeout)
            .build()
            .expect("build");

        let started = std::time::Instant::now();
        let err = client.get_split_index().expect_err("answer is too slow");
        let elapsed = started.elapsed();

        assert!(matches!(err, Error::Timeout { operation: "recv", .. }), "got {err:?}");
        assert!(elapsed < io_timeout * 3, "took {elapsed:?}");

        server.join().expect("server thread");
    }
}
