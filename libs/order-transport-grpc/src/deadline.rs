//! `grpc-timeout` header handling.
//!
//! Wire format: an ASCII integer of at most 8 digits followed by a unit:
//! `H` hours, `M` minutes, `S` seconds, `m` milliseconds, `u` microseconds,
//! `n` nanoseconds.

use std::time::Duration;

use tonic::metadata::MetadataMap;

/// Metadata key the caller's deadline travels in.
pub const GRPC_TIMEOUT_HEADER: &str = "grpc-timeout";

const MAX_DIGITS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeoutParseError {
    #[error("empty grpc-timeout value")]
    Empty,
    #[error("grpc-timeout value '{0}' has an invalid amount")]
    InvalidAmount(String),
    #[error("grpc-timeout value '{0}' has an unknown unit")]
    UnknownUnit(String),
}

/// Parse a `grpc-timeout` header value.
///
/// # Errors
/// Returns [`TimeoutParseError`] when the value does not follow the wire format.
pub fn parse_grpc_timeout(raw: &str) -> Result<Duration, TimeoutParseError> {
    let Some(unit) = raw.chars().last() else {
        return Err(TimeoutParseError::Empty);
    };
    let digits = &raw[..raw.len() - unit.len_utf8()];
    if digits.is_empty() || digits.len() > MAX_DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TimeoutParseError::InvalidAmount(raw.to_owned()));
    }
    let amount: u64 = digits
        .parse()
        .map_err(|_| TimeoutParseError::InvalidAmount(raw.to_owned()))?;

    let duration = match unit {
        'H' => Duration::from_secs(amount * 3600),
        'M' => Duration::from_secs(amount * 60),
        'S' => Duration::from_secs(amount),
        'm' => Duration::from_millis(amount),
        'u' => Duration::from_micros(amount),
        'n' => Duration::from_nanos(amount),
        _ => return Err(TimeoutParseError::UnknownUnit(raw.to_owned())),
    };
    Ok(duration)
}

/// Deadline requested by the caller, if any.
///
/// A malformed header is logged and ignored; the call then runs under the
/// server's own limit.
#[must_use]
pub fn request_timeout(metadata: &MetadataMap) -> Option<Duration> {
    let value = metadata.get(GRPC_TIMEOUT_HEADER)?;
    let raw = value.to_str().ok()?;
    match parse_grpc_timeout(raw) {
        Ok(timeout) => Some(timeout),
        Err(e) => {
            tracing::warn!(error = %e, "ignoring malformed grpc-timeout header");
            None
        }
    }
}
