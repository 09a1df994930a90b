//! Diagnostic creation, severity management, and terminal rendering for the packer.
//!
//! Every packing pass reports progress and suspicious input as structured
//! [`Diagnostic`] messages with a severity, a pass-scoped code and an optional
//! subject cell. The thread-safe [`DiagnosticSink`] accumulates them while the
//! pipeline runs, and [`TerminalRenderer`] formats them for a log.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use renderer::{DiagnosticRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::DiagnosticSink;
