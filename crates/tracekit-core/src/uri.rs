//! `format:location` trace locators.

use std::fmt;
use std::str::FromStr;

use crate::error::TraceError;

/// A trace locator split into its format identifier and location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceUri {
    pub format: String,
    /// Everything after the first `:`, passed to the provider untouched.
    pub location: String,
}

/// Split a locator on its first `:`.
///
/// # Examples
/// ```
/// use tracekit_core::parse_uri;
///
/// let uri = parse_uri("rtclient:relay.example:3435").unwrap();
/// assert_eq!(uri.format, "rtclient");
/// assert_eq!(uri.location, "relay.example:3435");
/// assert!(parse_uri("trace.pcap").is_err());
/// ```
///
/// # Errors
/// `BadFormat` when there is no `:` or the format part is empty.
pub fn parse_uri(uri: &str) -> Result<TraceUri, TraceError> {
    match uri.split_once(':') {
        Some((format, location)) if !format.is_empty() => Ok(TraceUri {
            format: format.to_string(),
            location: location.to_string(),
        }),
        Some(_) => Err(TraceError::BadFormat(format!("no format in '{uri}'"))),
        None => Err(TraceError::BadFormat(format!(
            "'{uri}' is not of the form format:location"
        ))),
    }
}

impl FromStr for TraceUri {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_uri(s)
    }
}

impl fmt::Display for TraceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.format, self.location)
    }
}
