//! Collects diagnostics from every pass of a packing run.

use crate::diagnostic::Diagnostic;
use crate::severity::Severity;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Shared diagnostic accumulator.
///
/// Passes hold it by `&` and call [`emit`](Self::emit). Per-severity totals
/// are kept in atomics so [`has_errors`](Self::has_errors) never takes the
/// lock, and they survive [`take_all`](Self::take_all).
pub struct DiagnosticSink {
    pending: Mutex<Vec<Diagnostic>>,
    totals: [AtomicUsize; 3],
}

impl DiagnosticSink {
    /// An empty sink.
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
            totals: [AtomicUsize::new(0), AtomicUsize::new(0), AtomicUsize::new(0)],
        }
    }

    fn pending(&self) -> MutexGuard<'_, Vec<Diagnostic>> {
        // A poisoned lock still holds a valid vector.
        self.pending.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Records `diag`.
    pub fn emit(&self, diag: Diagnostic) {
        self.totals[diag.severity.index()].fetch_add(1, Ordering::Relaxed);
        self.pending().push(diag);
    }

    /// Number of diagnostics of `severity` emitted over the sink's lifetime.
    pub fn count(&self, severity: Severity) -> usize {
        self.totals[severity.index()].load(Ordering::Relaxed)
    }

    /// Number of errors emitted over the sink's lifetime.
    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    /// Whether any error was ever emitted.
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Drains the pending diagnostics in emission order.
    pub fn take_all(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.pending())
    }

    /// Copies the pending diagnostics without draining them.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.pending().clone()
    }
}

impl Default for DiagnosticSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{Category, DiagnosticCode};

    fn too_long() -> Diagnostic {
        Diagnostic::error(
            DiagnosticCode::new(Category::Legalize, 1),
            "chain segment cannot fit in one tile",
        )
    }

    fn found_chain() -> Diagnostic {
        Diagnostic::note(
            DiagnosticCode::new(Category::Chain, 1),
            "Found chain of 3 cells starting at c0",
        )
    }

    #[test]
    fn fresh_sink_is_clean() {
        let sink = DiagnosticSink::default();
        assert!(!sink.has_errors());
        assert!(Severity::ALL.iter().all(|&s| sink.count(s) == 0));
        assert!(sink.diagnostics().is_empty());
    }

    #[test]
    fn notes_do_not_count_as_errors() {
        let sink = DiagnosticSink::new();
        sink.emit(found_chain());
        sink.emit(found_chain());
        assert!(!sink.has_errors());
        assert_eq!(sink.count(Severity::Note), 2);
    }

    #[test]
    fn totals_survive_draining() {
        let sink = DiagnosticSink::new();
        sink.emit(found_chain());
        sink.emit(too_long());
        let drained = sink.take_all();
        assert_eq!(drained[0].severity, Severity::Note);
        assert_eq!(drained[1].severity, Severity::Error);
        assert!(sink.take_all().is_empty());
        assert_eq!(sink.error_count(), 1);
    }

    #[test]
    fn concurrent_emitters() {
        use std::sync::Arc;

        let sink = Arc::new(DiagnosticSink::new());
        let workers: Vec<_> = (0..4)
            .map(|w| {
                let sink = Arc::clone(&sink);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        sink.emit(if w % 2 == 0 { too_long() } else { found_chain() });
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }
        assert_eq!(sink.error_count(), 50);
        assert_eq!(sink.count(Severity::Note), 50);
        assert_eq!(sink.take_all().len(), 100);
    }
}
