//! Error types and diagnostics for document building.
//!
//! Two channels live here. [`BuildError`] is the synchronous failure returned
//! to the caller of a violating operation. [`ErrorSink`] is the passive,
//! read-only diagnostics feed: it accumulates [`Diagnostic`] records in order
//! and never takes part in control flow.

use std::fmt;

use thiserror::Error;

use crate::encoding::EncodingError;

/// Result alias used by every fallible builder operation.
pub type BuildResult<T> = Result<T, BuildError>;

/// The error type returned by node-model, serialization, and stream operations.
#[derive(Error, Debug)]
pub enum BuildError {
    /// An element or attribute name is empty or not a valid XML `Name`.
    #[error("invalid XML name '{name}'")]
    InvalidName {
        /// The rejected name.
        name: String,
    },

    /// CDATA content contains `]]>`, a character XML forbids, or bytes that
    /// cannot be converted between the input and output encodings.
    #[error("invalid CDATA content: {message}")]
    InvalidCdataContent {
        /// What is wrong with the content.
        message: String,
    },

    /// A charset label is unknown or a conversion between encodings failed.
    #[error("encoding error: {message}")]
    Encoding {
        /// A human-readable description of the failure.
        message: String,
    },

    /// `append_to_stream` was called while no stream was open.
    #[error("no stream is open (state: {state})")]
    StreamNotStarted {
        /// The stream state at the time of the call.
        state: crate::stream::StreamState,
    },

    /// An illegal tree mutation or stream request.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Why the operation was refused.
        message: String,
    },

    /// A sink write or file creation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    pub(crate) fn invalid_name(name: impl Into<String>) -> Self {
        Self::InvalidName { name: name.into() }
    }

    pub(crate) fn invalid_cdata(message: impl Into<String>) -> Self {
        Self::InvalidCdataContent {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }
}

impl From<EncodingError> for BuildError {
    fn from(err: EncodingError) -> Self {
        Self::Encoding {
            message: err.message,
        }
    }
}

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorSeverity {
    /// Output is still well-formed, but a value was altered on the way out.
    Warning,
    /// An operation failed and the tree was left untouched.
    Error,
    /// The output sink is in an unknown state (e.g. a failed stream write).
    Fatal,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
            Self::Fatal => write!(f, "fatal error"),
        }
    }
}

/// A position inside produced output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number (in characters, not bytes).
    pub column: u32,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A single diagnostic record.
///
/// Diagnostics recorded by the builder itself never carry a location: the
/// builder reports on values and operations, not on positions in parsed
/// input. `location` is only set on diagnostics a caller builds with
/// [`Diagnostic::at`] and feeds into an [`ErrorSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// The severity of this diagnostic.
    pub severity: ErrorSeverity,
    /// Human-readable message.
    pub message: String,
    /// Where the issue occurred. Always `None` for builder diagnostics.
    pub location: Option<SourceLocation>,
}

impl Diagnostic {
    /// Creates a diagnostic without a location.
    #[must_use]
    pub fn new(severity: ErrorSeverity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            location: None,
        }
    }

    /// Attaches a location to this diagnostic.
    #[must_use]
    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(f, "{}: {} at {}", self.severity, self.message, loc),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

/// Ordered, append-only collector of diagnostics.
#[derive(Debug, Clone, Default)]
pub struct ErrorSink {
    diagnostics: Vec<Diagnostic>,
}

impl ErrorSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a diagnostic.
    pub fn record(&mut self, diagnostic: Diagnostic) {
        if diagnostic.severity == ErrorSeverity::Warning {
            tracing::warn!(message = %diagnostic.message, "diagnostic recorded");
        }
        self.diagnostics.push(diagnostic);
    }

    /// Records a failed operation at `Error` severity (or `Fatal` for I/O)
    /// and hands the error back for propagation.
    pub fn record_failure(&mut self, err: BuildError) -> BuildError {
        let severity = match err {
            BuildError::Io(_) => ErrorSeverity::Fatal,
            _ => ErrorSeverity::Error,
        };
        self.record(Diagnostic::new(severity, err.to_string()));
        err
    }

    /// Returns the diagnostics collected so far, oldest first.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Returns `true` if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Discards every collected diagnostic.
    pub fn clear(&mut self) {
        self.diagnostics.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_location_display() {
        let loc = SourceLocation {
            line: 10,
            column: 5,
        };
        assert_eq!(loc.to_string(), "10:5");
    }

    #[test]
    fn test_diagnostic_display_with_location() {
        let diag = Diagnostic::new(ErrorSeverity::Warning, "character replaced").at(
            SourceLocation {
                line: 3,
                column: 10,
            },
        );
        assert_eq!(diag.to_string(), "warning: character replaced at 3:10");
    }

    #[test]
    fn test_diagnostic_display_without_location() {
        let diag = Diagnostic::new(ErrorSeverity::Error, "bad name");
        assert_eq!(diag.to_string(), "error: bad name");
    }

    #[test]
    fn test_error_severity_display() {
        assert_eq!(ErrorSeverity::Warning.to_string(), "warning");
        assert_eq!(ErrorSeverity::Error.to_string(), "error");
        assert_eq!(ErrorSeverity::Fatal.to_string(), "fatal error");
    }

    #[test]
    fn test_build_error_display() {
        assert_eq!(
            BuildError::invalid_name("1abc").to_string(),
            "invalid XML name '1abc'"
        );
        assert_eq!(
            BuildError::invalid_operation("cannot detach the root element").to_string(),
            "invalid operation: cannot detach the root element"
        );
    }

    #[test]
    fn test_build_error_from_encoding_error() {
        let err: BuildError = EncodingError::new("unsupported encoding: nope").into();
        assert!(matches!(err, BuildError::Encoding { ref message } if message.contains("nope")));
    }

    #[test]
    fn test_build_error_is_error_trait() {
        let err = BuildError::invalid_cdata("contains ]]>");
        let _: &dyn std::error::Error = &err;
    }

    #[test]
    fn test_sink_keeps_insertion_order() {
        let mut sink = ErrorSink::new();
        assert!(sink.is_empty());
        sink.record(Diagnostic::new(ErrorSeverity::Warning, "first"));
        sink.record(Diagnostic::new(ErrorSeverity::Error, "second"));
        let messages: Vec<&str> = sink
            .diagnostics()
            .iter()
            .map(|d| d.message.as_str())
            .collect();
        assert_eq!(messages, vec!["first", "second"]);
        sink.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn test_record_failure_severity() {
        let mut sink = ErrorSink::new();
        let err = sink.record_failure(BuildError::invalid_name(""));
        assert!(matches!(err, BuildError::InvalidName { .. }));
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let _ = sink.record_failure(BuildError::Io(io));
        assert_eq!(sink.diagnostics()[0].severity, ErrorSeverity::Error);
        assert_eq!(sink.diagnostics()[1].severity, ErrorSeverity::Fatal);
    }
}
