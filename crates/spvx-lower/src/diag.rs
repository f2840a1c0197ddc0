//! Diagnostics collected during lowering.

use std::fmt;

use spvx_ast::SourceLocation;

use crate::LowerError;

/// Severity of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Lowering cannot continue.
    Fatal,
    /// Lowering continues but no binary may be emitted.
    Error,
    Warning,
    /// Extra context for the diagnostic before it.
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fatal => "fatal error",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Note => "note",
        })
    }
}

/// A single diagnostic record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub loc: SourceLocation,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.loc, self.severity, self.message)
    }
}

/// The diagnostics sink for one compile.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    list: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, severity: Severity, message: String, loc: SourceLocation) {
        self.list.push(Diagnostic {
            severity,
            message,
            loc,
        });
    }

    /// Records a fatal diagnostic and returns the matching error to
    /// propagate.
    pub fn fatal(&mut self, message: impl Into<String>, loc: SourceLocation) -> LowerError {
        let message = message.into();
        log::error!("{loc}: {message}");
        self.push(Severity::Fatal, message.clone(), loc);
        LowerError::Fatal { message, loc }
    }

    pub fn error(&mut self, message: impl Into<String>, loc: SourceLocation) {
        let message = message.into();
        log::debug!("{loc}: error: {message}");
        self.push(Severity::Error, message, loc);
    }

    pub fn warning(&mut self, message: impl Into<String>, loc: SourceLocation) {
        let message = message.into();
        log::warn!("{loc}: {message}");
        self.push(Severity::Warning, message, loc);
    }

    pub fn note(&mut self, message: impl Into<String>, loc: SourceLocation) {
        self.push(Severity::Note, message.into(), loc);
    }

    /// True if any fatal or error diagnostic was recorded.
    pub fn has_errors(&self) -> bool {
        self.list.iter().any(|d| d.severity <= Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.list
            .iter()
            .filter(|d| d.severity <= Severity::Error)
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.list.iter()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Messages of every diagnostic with the given severity.
    pub fn messages(&self, severity: Severity) -> Vec<&str> {
        self.list
            .iter()
            .filter(|d| d.severity == severity)
            .map(|d| d.message.as_str())
            .collect()
    }
}
