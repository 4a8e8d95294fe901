//! Time representation for the presentation timeline.
//! All timeline positions are integer nanoseconds so interval boundaries are
//! exact and the interactive and batch paths agree bit for bit.

/// Time in nanoseconds since timeline start
pub type Time = i64;

/// Time constants for conversions
pub mod constants {
    use super::Time;

    pub const NANOS_PER_SECOND: Time = 1_000_000_000;
    pub const NANOS_PER_MILLI: Time = 1_000_000;
}

/// Time zero constant
pub const ZERO: Time = 0;

/// Convert seconds (f64) to nanoseconds.
/// Non-finite input maps to zero; values saturate at the `i64` range.
#[inline]
pub fn from_seconds(seconds: f64) -> Time {
    if !seconds.is_finite() {
        return ZERO;
    }
    (seconds * constants::NANOS_PER_SECOND as f64).round() as Time
}

/// Convert nanoseconds to seconds (f64)
#[inline]
pub fn to_seconds(nanos: Time) -> f64 {
    nanos as f64 / constants::NANOS_PER_SECOND as f64
}

/// Convert milliseconds to nanoseconds
#[inline]
pub fn from_millis(millis: i64) -> Time {
    millis * constants::NANOS_PER_MILLI
}

/// Convert nanoseconds to milliseconds
#[inline]
pub fn to_millis(nanos: Time) -> i64 {
    nanos / constants::NANOS_PER_MILLI
}

/// Number of whole frames covering `nanos` at `fps`, rounded to nearest.
#[inline]
pub fn frames_for(nanos: Time, fps: f64) -> u64 {
    (to_seconds(nanos) * fps).round().max(0.0) as u64
}

/// Timeline position of the first instant of `frame_index`.
#[inline]
pub fn from_frame_index(frame_index: u64, fps: f64) -> Time {
    from_seconds(frame_index as f64 / fps)
}

/// Format time as HH:MM:SS.mmm
pub fn format_time(nanos: Time) -> String {
    let nanos = nanos.max(0);
    let total_millis = to_millis(nanos);
    let hours = total_millis / 3_600_000;
    let minutes = (total_millis / 60_000) % 60;
    let seconds = (total_millis / 1000) % 60;
    let millis = total_millis % 1000;

    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
}

/// Format time as M:SS, the preview counter format.
pub fn format_clock(nanos: Time) -> String {
    let secs = nanos.max(0) / constants::NANOS_PER_SECOND;
    format!("{}:{:02}", secs / 60, secs % 60)
}
