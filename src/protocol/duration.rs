//! Duration wire format.
//!
//! The server exchanges times as decimal seconds below one minute and as
//! colon-separated `HH:MM:SS.ss` above it. A leading `-` marks a negative
//! value (deltas ahead of a comparison).
//!
//! # Grammar
//!
//! | Value | Wire |
//! |-------|------|
//! | 0 | `0` |
//! | 1.5s | `1.50` |
//! | 1ms | `0.001` |
//! | 60s | `01:00` |
//! | 2h 1m 1s | `02:01:01` |
//! | -60s | `-01:00` |
//!
//! Fractions are written with two digits, or three when the value carries a
//! millisecond below centisecond precision. Parsing accepts any number of
//! fractional digits and keeps nanosecond resolution.

// ============================================================================
// Imports
// ============================================================================

use chrono::TimeDelta;
use thiserror::Error;

// ============================================================================
// Constants
// ============================================================================

const NANOS_PER_SECOND: i128 = 1_000_000_000;

/// Fractional digits kept when parsing (nanosecond resolution).
const MAX_FRACTION_DIGITS: usize = 9;

// ============================================================================
// ParseDurationError
// ============================================================================

/// Error returned when wire text is not a valid duration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid duration {input:?}: {reason}")]
pub struct ParseDurationError {
    input: String,
    reason: &'static str,
}

impl ParseDurationError {
    fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.to_string(),
            reason,
        }
    }

    /// Returns the text that failed to parse.
    #[inline]
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }
}

// ============================================================================
// Encoding
// ============================================================================

/// Formats a duration in the server's wire format.
///
/// The value is rounded to the nearest millisecond first. Values under one
/// hour drop the hour field (`MM:SS`), values under one minute are plain
/// seconds.
///
/// # Example
///
/// ```
/// use chrono::TimeDelta;
/// use livesplit_client::format_duration;
///
/// assert_eq!(format_duration(TimeDelta::seconds(90)), "01:30");
/// assert_eq!(format_duration(TimeDelta::milliseconds(-1500)), "-1.50");
/// ```
#[must_use]
pub fn format_duration(duration: TimeDelta) -> String {
    let negative = duration < TimeDelta::zero();

    // num_microseconds only overflows past ~292k years
    let micros = duration
        .num_microseconds()
        .unwrap_or_else(|| duration.num_milliseconds().saturating_mul(1_000));
    let millis = micros.unsigned_abs().saturating_add(500) / 1_000;

    let body = format_millis(millis);
    if negative && millis > 0 {
        format!("-{body}")
    } else {
        body
    }
}

/// Formats an unsigned millisecond count.
fn format_millis(millis: u64) -> String {
    let whole_seconds = millis / 1_000;
    let fraction = format_fraction(millis % 1_000);

    if whole_seconds < 60 {
        return format!("{whole_seconds}{fraction}");
    }

    let seconds = whole_seconds % 60;
    let minutes = (whole_seconds / 60) % 60;
    let hours = whole_seconds / 3_600;

    if hours == 0 {
        format!("{minutes:02}:{seconds:02}{fraction}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}{fraction}")
    }
}

/// Formats the sub-second part, empty when it would read `.00`.
fn format_fraction(millis: u64) -> String {
    match millis {
        0 => String::new(),
        m if m % 10 == 0 => format!(".{:02}", m / 10),
        m => format!(".{m:03}"),
    }
}

// ============================================================================
// Decoding
// ============================================================================

/// Parses a duration from the server's wire format.
///
/// Each `:`-separated segment is a decimal number; the rightmost counts
/// seconds and every segment to its left is worth sixty times more. A leading
/// `-` negates the composed value.
///
/// # Errors
///
/// Returns [`ParseDurationError`] if a segment is empty or not a decimal
/// number, or if the value does not fit a [`TimeDelta`].
///
/// # Example
///
/// ```
/// use chrono::TimeDelta;
/// use livesplit_client::parse_duration;
///
/// assert_eq!(parse_duration("02:01:01")?, TimeDelta::seconds(7261));
/// assert_eq!(parse_duration("-0.001")?, TimeDelta::milliseconds(-1));
/// # Ok::<(), livesplit_client::ParseDurationError>(())
/// ```
pub fn parse_duration(input: &str) -> Result<TimeDelta, ParseDurationError> {
    let (negative, body) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };

    let segment_count = body.split(':').count();
    let mut total: i128 = 0;

    for (index, segment) in body.split(':').enumerate() {
        let nanos = parse_segment(segment)
            .ok_or_else(|| ParseDurationError::new(input, "segment is not a decimal number"))?;

        let exponent = u32::try_from(segment_count - 1 - index)
            .map_err(|_| ParseDurationError::new(input, "too many segments"))?;

        total = 60_i128
            .checked_pow(exponent)
            .and_then(|scale| nanos.checked_mul(scale))
            .and_then(|value| total.checked_add(value))
            .ok_or_else(|| ParseDurationError::new(input, "value out of range"))?;
    }

    if negative {
        total = -total;
    }

    let nanos =
        i64::try_from(total).map_err(|_| ParseDurationError::new(input, "value out of range"))?;

    Ok(TimeDelta::nanoseconds(nanos))
}

/// Parses one unsigned decimal segment into nanoseconds.
///
/// Accepts `5`, `5.25`, `.25` and `5.`; rejects empty input, signs and
/// exponents.
fn parse_segment(segment: &str) -> Option<i128> {
    let (whole, fraction) = match segment.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (segment, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return None;
    }

    if !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    let mut seconds: i128 = 0;
    for digit in whole.bytes() {
        seconds = seconds
            .checked_mul(10)?
            .checked_add(i128::from(digit - b'0'))?;
    }

    let mut fraction_nanos: i128 = 0;
    for position in 0..MAX_FRACTION_DIGITS {
        let digit = fraction.as_bytes().get(position).map_or(0, |b| b - b'0');
        fraction_nanos = fraction_nanos * 10 + i128::from(digit);
    }

    seconds
        .checked_mul(NANOS_PER_SECOND)?
        .checked_add(fraction_nanos)
}

// ============================================================================
// Tests
// ============================================================================
