//! Conversion of W3C trace ids into the X-Ray trace id format.
//!
//! An X-Ray trace id has three hyphen-separated parts, e.g.
//! `1-58406520-a006649127e371903a2de979`:
//!
//! - the version number, `1`;
//! - the time of the original request as Unix epoch seconds, in 8 hex digits;
//! - a 96-bit identifier for the trace, in 24 hex digits.
//!
//! A 128-bit OpenTelemetry trace id maps onto this layout by treating its
//! first four bytes as the epoch. X-Ray rejects traces older than 30 days, so
//! ids whose embedded time falls outside the accepted window (28 days back,
//! 5 minutes ahead) are refused rather than silently re-stamped. This is what
//! happens when a span was produced with a random, non-X-Ray id generator.

use crate::constants::trace_id::{LENGTH, MAX_AGE_SECS, MAX_SKEW_SECS};
use crate::TranslatorError;

/// Converts a trace id into the X-Ray format, validating it against the
/// current time.
pub fn convert_to_xray_trace_id(trace_id: &[u8; 16]) -> Result<String, TranslatorError> {
    convert_to_xray_trace_id_at(trace_id, chrono::Utc::now().timestamp())
}

/// Converts a trace id into the X-Ray format, validating it against `now`
/// (Unix epoch seconds).
pub fn convert_to_xray_trace_id_at(
    trace_id: &[u8; 16],
    now: i64,
) -> Result<String, TranslatorError> {
    let epoch = i64::from(u32::from_be_bytes([
        trace_id[0],
        trace_id[1],
        trace_id[2],
        trace_id[3],
    ]));

    let delta = now - epoch;
    if delta > MAX_AGE_SECS || delta < -MAX_SKEW_SECS {
        return Err(TranslatorError::InvalidIdentifier(hex::encode(trace_id)));
    }

    let mut xray_id = String::with_capacity(LENGTH);
    xray_id.push_str("1-");
    xray_id.push_str(&hex::encode(&trace_id[0..4]));
    xray_id.push('-');
    xray_id.push_str(&hex::encode(&trace_id[4..16]));
    Ok(xray_id)
}
