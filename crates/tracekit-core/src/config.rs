//! Trace and output options, in typed and textual form.
//!
//! Textual options are `key=value` pairs, the form the CLI passes through
//! with `--option`. Keys are case-insensitive; values are not.

use std::fs::OpenOptions;

use crate::error::TraceError;
use crate::filter::Filter;

/// Option for an input trace.
#[derive(Debug, Clone)]
pub enum TraceOption {
    /// Keep at most this many captured bytes per packet.
    Snaplen(u32),
    /// Capture traffic not addressed to this host.
    Promisc(bool),
    /// Deliver only packets the filter accepts.
    Filter(Filter),
}

impl TraceOption {
    pub fn name(&self) -> &'static str {
        match self {
            TraceOption::Snaplen(_) => "snaplen",
            TraceOption::Promisc(_) => "promisc",
            TraceOption::Filter(_) => "filter",
        }
    }

    /// Parse a `key=value` option.
    ///
    /// # Examples
    /// ```
    /// use tracekit_core::{ErrorKind, TraceOption};
    ///
    /// assert!(matches!(TraceOption::parse("snaplen=64"), Ok(TraceOption::Snaplen(64))));
    /// assert!(matches!(TraceOption::parse("promisc=on"), Ok(TraceOption::Promisc(true))));
    /// let err = TraceOption::parse("bogus=1").unwrap_err();
    /// assert_eq!(err.kind(), ErrorKind::UnknownOption);
    /// ```
    ///
    /// # Errors
    /// `UnknownOption` for an unknown key, `BadFormat` for a missing `=` or
    /// an unparsable value.
    pub fn parse(text: &str) -> Result<Self, TraceError> {
        let (key, value) = split_option(text)?;
        match key.as_str() {
            "snaplen" => Ok(TraceOption::Snaplen(parse_number(&key, value)?)),
            "promisc" => Ok(TraceOption::Promisc(parse_bool(&key, value)?)),
            "filter" => Ok(TraceOption::Filter(Filter::new(value))),
            _ => Err(TraceError::UnknownOption(key)),
        }
    }
}

/// Accepted input options, as handed to a provider at start.
#[derive(Debug, Clone, Default)]
pub struct InputConfig {
    pub snaplen: Option<u32>,
    pub promisc: bool,
    pub filter: Option<Filter>,
}

impl InputConfig {
    pub(crate) fn apply(&mut self, option: TraceOption) {
        match option {
            TraceOption::Snaplen(len) => self.snaplen = Some(len),
            TraceOption::Promisc(on) => self.promisc = on,
            TraceOption::Filter(filter) => self.filter = Some(filter),
        }
    }
}

/// How an output file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenFlags {
    /// Add to the end of an existing file instead of truncating it.
    pub append: bool,
    /// Fail when the file already exists.
    pub exclusive: bool,
}

impl OpenFlags {
    /// Parse `|`- or `,`-separated flag names: `append`, `truncate`,
    /// `exclusive`.
    ///
    /// # Examples
    /// ```
    /// use tracekit_core::OpenFlags;
    ///
    /// let flags = OpenFlags::parse("append|exclusive").unwrap();
    /// assert!(flags.append && flags.exclusive);
    /// assert_eq!(OpenFlags::parse("truncate").unwrap(), OpenFlags::default());
    /// ```
    pub fn parse(text: &str) -> Result<Self, TraceError> {
        let mut flags = OpenFlags::default();
        for name in text.split(['|', ',']).map(str::trim) {
            match name.to_ascii_lowercase().as_str() {
                "append" => flags.append = true,
                "truncate" => flags.append = false,
                "exclusive" => flags.exclusive = true,
                _ => {
                    return Err(TraceError::BadFormat(format!(
                        "unknown file flag '{name}' in 'fileflags={text}'"
                    )));
                }
            }
        }
        Ok(flags)
    }

    pub(crate) fn open_options(&self) -> OpenOptions {
        let mut options = OpenOptions::new();
        options.write(true);
        if self.exclusive {
            options.create_new(true);
        } else {
            options.create(true);
        }
        if self.append {
            options.append(true);
        } else {
            options.truncate(true);
        }
        options
    }
}

/// Option for an output trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputOption {
    FileFlags(OpenFlags),
    /// Gzip level, 0 meaning uncompressed.
    Compress(u32),
}

impl OutputOption {
    pub fn name(&self) -> &'static str {
        match self {
            OutputOption::FileFlags(_) => "fileflags",
            OutputOption::Compress(_) => "compress",
        }
    }

    /// Parse a `key=value` output option (`fileflags=...`, `compress=N`).
    pub fn parse(text: &str) -> Result<Self, TraceError> {
        let (key, value) = split_option(text)?;
        match key.as_str() {
            "fileflags" => Ok(OutputOption::FileFlags(OpenFlags::parse(value)?)),
            "compress" => Ok(OutputOption::Compress(parse_number(&key, value)?)),
            _ => Err(TraceError::UnknownOption(key)),
        }
    }
}

/// Accepted output options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutputConfig {
    pub flags: OpenFlags,
    pub compress: u32,
}

impl OutputConfig {
    pub(crate) fn apply(&mut self, option: OutputOption) {
        match option {
            OutputOption::FileFlags(flags) => self.flags = flags,
            OutputOption::Compress(level) => self.compress = level,
        }
    }
}

/// Largest gzip level.
pub const MAX_COMPRESSION: u32 = 9;

/// Shared check for file sinks.
pub(crate) fn check_compression(level: u32) -> Result<(), TraceError> {
    if level > MAX_COMPRESSION {
        return Err(TraceError::OptionUnavailable(format!(
            "compression level {level} (supported: 0-{MAX_COMPRESSION})"
        )));
    }
    Ok(())
}

fn split_option(text: &str) -> Result<(String, &str), TraceError> {
    let (key, value) = text
        .split_once('=')
        .ok_or_else(|| TraceError::BadFormat(format!("expected key=value, got '{text}'")))?;
    Ok((key.trim().to_ascii_lowercase(), value.trim()))
}

fn parse_number(key: &str, value: &str) -> Result<u32, TraceError> {
    value
        .parse()
        .map_err(|_| TraceError::BadFormat(format!("{key}: '{value}' is not a number")))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, TraceError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(TraceError::BadFormat(format!(
            "{key}: '{value}' is not a boolean"
        ))),
    }
}
