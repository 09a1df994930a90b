//! Structured diagnostic messages with severity, codes, subjects and notes.

use crate::code::DiagnosticCode;
use crate::severity::Severity;
use serde::{Deserialize, Serialize};

/// A structured diagnostic message emitted by a packing pass.
///
/// Each diagnostic includes:
/// - A severity level and pass-scoped code
/// - A primary message
/// - An optional subject: the name of the cell (or net) it is about
/// - Optional notes and help text
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity level of this diagnostic.
    pub severity: Severity,
    /// The code identifying the kind of diagnostic.
    pub code: DiagnosticCode,
    /// The main diagnostic message.
    pub message: String,
    /// Name of the netlist object the diagnostic is about, if any.
    pub subject: Option<String>,
    /// Explanatory footnotes (e.g., "note: ...").
    pub notes: Vec<String>,
    /// Actionable suggestions (e.g., "help: ...").
    pub help: Vec<String>,
}

impl Diagnostic {
    fn with_severity(severity: Severity, code: DiagnosticCode, message: String) -> Self {
        Self {
            severity,
            code,
            message,
            subject: None,
            notes: Vec::new(),
            help: Vec::new(),
        }
    }

    /// Creates a new error diagnostic with the given code and message.
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Error, code, message.into())
    }

    /// Creates a new warning diagnostic with the given code and message.
    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Warning, code, message.into())
    }

    /// Creates a new informational diagnostic with the given code and message.
    pub fn note(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Note, code, message.into())
    }

    /// Sets the netlist object this diagnostic is about.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Adds a note to this diagnostic.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Adds a help message to this diagnostic.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help.push(help.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::Category;

    #[test]
    fn create_error() {
        let code = DiagnosticCode::new(Category::Legalize, 1);
        let diag = Diagnostic::error(code, "chain cannot be split");
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.message, "chain cannot be split");
        assert_eq!(format!("{}", diag.code), "N401");
        assert!(diag.subject.is_none());
    }

    #[test]
    fn create_note() {
        let code = DiagnosticCode::new(Category::Chain, 1);
        let diag = Diagnostic::note(code, "found chain of 10 cells");
        assert_eq!(diag.severity, Severity::Note);
    }

    #[test]
    fn builder_methods() {
        let code = DiagnosticCode::new(Category::Legalize, 2);
        let diag = Diagnostic::warning(code, "chain-in is undriven")
            .with_subject("carry[3]")
            .with_note("no feed-in cell was inserted")
            .with_help("tie the carry input to a constant");
        assert_eq!(diag.subject.as_deref(), Some("carry[3]"));
        assert_eq!(diag.notes.len(), 1);
        assert_eq!(diag.help.len(), 1);
    }

    #[test]
    fn serde_roundtrip() {
        let code = DiagnosticCode::new(Category::Cluster, 1);
        let diag = Diagnostic::note(code, "built cluster").with_subject("r0");
        let json = serde_json::to_string(&diag).unwrap();
        let back: Diagnostic = serde_json::from_str(&json).unwrap();
        assert_eq!(back.message, "built cluster");
        assert_eq!(back.subject.as_deref(), Some("r0"));
        assert_eq!(back.code, code);
    }
}
