//! Error taxonomy and the per-handle sticky error slot.
//!
//! Every fallible handle operation returns `Result<_, TraceError>` and also
//! records the same error in the handle's [`ErrorState`], so callers can use
//! either style. Decode functions never touch this machinery: a missing or
//! truncated layer is reported as `None`.

use std::io::{self, Write};

use thiserror::Error;

/// Closed set of failure kinds a handle can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The locator is malformed or names no registered format.
    BadFormat,
    /// The provider could not open its resource.
    InitFailed,
    /// The option is not known to this provider family.
    UnknownOption,
    /// The option is known but this provider does not implement it.
    OptionUnavailable,
    /// The output format cannot represent this packet.
    NoConversion,
    /// The packet is corrupt or unusable for the requested action.
    BadPacket,
    /// The operation is not supported here or in the current state.
    Unsupported,
}

impl ErrorKind {
    /// Stable numeric code, negative like the classic C error numbers.
    ///
    /// # Examples
    /// ```
    /// use tracekit_core::ErrorKind;
    ///
    /// assert_eq!(ErrorKind::BadFormat.code(), -1);
    /// assert_eq!(ErrorKind::Unsupported.code(), -7);
    /// ```
    pub fn code(self) -> i32 {
        match self {
            ErrorKind::BadFormat => -1,
            ErrorKind::InitFailed => -2,
            ErrorKind::UnknownOption => -3,
            ErrorKind::NoConversion => -4,
            ErrorKind::BadPacket => -5,
            ErrorKind::OptionUnavailable => -6,
            ErrorKind::Unsupported => -7,
        }
    }
}

/// A failure reported by a trace handle or provider.
///
/// The payload is a short context string (a URI, an option name, the
/// offending format) meant for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraceError {
    #[error("bad format: {0}")]
    BadFormat(String),
    #[error("initialisation failed: {0}")]
    InitFailed(String),
    #[error("unknown option: {0}")]
    UnknownOption(String),
    #[error("option unavailable: {0}")]
    OptionUnavailable(String),
    #[error("no conversion: {0}")]
    NoConversion(String),
    #[error("bad packet: {0}")]
    BadPacket(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl TraceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TraceError::BadFormat(_) => ErrorKind::BadFormat,
            TraceError::InitFailed(_) => ErrorKind::InitFailed,
            TraceError::UnknownOption(_) => ErrorKind::UnknownOption,
            TraceError::OptionUnavailable(_) => ErrorKind::OptionUnavailable,
            TraceError::NoConversion(_) => ErrorKind::NoConversion,
            TraceError::BadPacket(_) => ErrorKind::BadPacket,
            TraceError::Unsupported(_) => ErrorKind::Unsupported,
        }
    }

    /// Numeric code of [`TraceError::kind`].
    pub fn code(&self) -> i32 {
        self.kind().code()
    }

    /// The context string carried by the error.
    pub fn problem(&self) -> &str {
        match self {
            TraceError::BadFormat(p)
            | TraceError::InitFailed(p)
            | TraceError::UnknownOption(p)
            | TraceError::OptionUnavailable(p)
            | TraceError::NoConversion(p)
            | TraceError::BadPacket(p)
            | TraceError::Unsupported(p) => p,
        }
    }

    pub(crate) fn init(context: impl std::fmt::Display, err: impl std::fmt::Display) -> Self {
        TraceError::InitFailed(format!("{context}: {err}"))
    }

    pub(crate) fn bad_packet(context: impl std::fmt::Display, err: impl std::fmt::Display) -> Self {
        TraceError::BadPacket(format!("{context}: {err}"))
    }
}

/// Sticky error slot owned by one trace or output trace.
///
/// Set on failure, kept until [`ErrorState::take`] (or a report) clears it.
/// A newer failure overwrites an older one.
#[derive(Debug, Default, Clone)]
pub struct ErrorState {
    current: Option<TraceError>,
}

impl ErrorState {
    pub fn set(&mut self, err: TraceError) {
        self.current = Some(err);
    }

    pub fn is_err(&self) -> bool {
        self.current.is_some()
    }

    pub fn peek(&self) -> Option<&TraceError> {
        self.current.as_ref()
    }

    /// Return the current error and reset the slot to "no error".
    pub fn take(&mut self) -> Option<TraceError> {
        self.current.take()
    }

    /// Store the error of a failed result, passing the result through.
    pub(crate) fn record<T>(&mut self, result: Result<T, TraceError>) -> Result<T, TraceError> {
        if let Err(err) = &result {
            tracing::debug!(code = err.code(), "{err}");
            self.current = Some(err.clone());
        }
        result
    }

    /// Write `context: message` for the current error and clear it.
    ///
    /// # Examples
    /// ```
    /// use tracekit_core::{ErrorState, TraceError};
    ///
    /// let mut state = ErrorState::default();
    /// state.set(TraceError::BadFormat("nope:".to_string()));
    /// let mut out = Vec::new();
    /// state.report(&mut out, "open").unwrap();
    /// assert_eq!(String::from_utf8(out).unwrap(), "open: bad format: nope:\n");
    /// assert!(!state.is_err());
    /// ```
    pub fn report<W: Write>(&mut self, out: &mut W, context: &str) -> io::Result<()> {
        match self.current.take() {
            Some(err) => writeln!(out, "{context}: {err}"),
            None => writeln!(out, "{context}: no error"),
        }
    }
}
