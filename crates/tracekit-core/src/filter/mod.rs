//! Packet filters.
//!
//! A [`Filter`] holds the expression text it was created with and compiles
//! it on first use. The language is a subset of pcap-filter syntax:
//!
//! ```text
//! tcp and port 80
//! not (udp or icmp)
//! src net 10.0.0.0/8 && greater 100
//! ether dst host ff:ff:ff:ff:ff:ff
//! ```

mod expr;
pub mod parser;

use crate::error::TraceError;
use crate::packet::Packet;

pub use parser::FilterError;

use expr::Expr;

/// A lazily compiled packet filter.
///
/// # Examples
/// ```
/// use tracekit_core::{ErrorKind, Filter, Packet};
///
/// let mut filter = Filter::new("tcp and");
/// assert!(!filter.is_compiled());
/// let err = filter.matches(&Packet::new()).unwrap_err();
/// assert_eq!(err.kind(), ErrorKind::BadFormat);
/// // the failure repeats and nothing is compiled
/// assert_eq!(filter.matches(&Packet::new()).unwrap_err(), err);
/// assert!(!filter.is_compiled());
/// ```
#[derive(Debug, Clone)]
pub struct Filter {
    source: String,
    compiled: Option<Expr>,
    failure: Option<TraceError>,
}

impl Filter {
    /// Wrap an expression without checking it.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            compiled: None,
            failure: None,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled.is_some()
    }

    /// Compile the expression if that has not happened yet.
    ///
    /// # Errors
    /// `BadFormat` when the expression does not parse. The error is kept and
    /// returned again by every later call.
    pub fn compile(&mut self) -> Result<(), TraceError> {
        if self.compiled.is_some() {
            return Ok(());
        }
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        match parser::parse(&self.source) {
            Ok(expr) => {
                tracing::debug!(filter = %self.source, "filter compiled");
                self.compiled = Some(expr);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(filter = %self.source, %err, "filter failed to compile");
                let err = TraceError::BadFormat(format!("filter `{}`: {err}", self.source));
                self.failure = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Whether the packet passes the filter, compiling it first if needed.
    ///
    /// # Errors
    /// `BadFormat` when the expression does not compile.
    pub fn matches(&mut self, packet: &Packet) -> Result<bool, TraceError> {
        self.compile()?;
        Ok(self
            .compiled
            .as_ref()
            .is_some_and(|expr| expr.matches(packet)))
    }
}
