//! Per-phase diagnostic collection.
//!
//! Features:
//! - error limit to avoid flooding the log
//! - deduplication of identical errors at the same position
//! - `ErrorGuaranteed` proof once an error is recorded

use sdsl_ir::Span;

use crate::{Diagnostic, ErrorGuaranteed};

/// Default number of errors kept per compilation.
const DEFAULT_ERROR_LIMIT: usize = 20;

/// Collects diagnostics for one compilation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DiagnosticBag {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    /// Maximum number of errors kept (0 = unlimited).
    error_limit: usize,
}

impl Default for DiagnosticBag {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticBag {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_ERROR_LIMIT)
    }

    pub fn with_limit(error_limit: usize) -> Self {
        DiagnosticBag {
            diagnostics: Vec::new(),
            error_count: 0,
            error_limit,
        }
    }

    /// Record a diagnostic.
    ///
    /// Returns `false` if it was dropped as a duplicate or past the limit.
    pub fn push(&mut self, diag: Diagnostic) -> bool {
        if diag.is_error() && self.limit_reached() {
            return false;
        }
        if self.is_duplicate(&diag) {
            return false;
        }
        if diag.is_error() {
            self.error_count += 1;
        }
        self.diagnostics.push(diag);
        true
    }

    /// Record an error and return proof of it.
    pub fn emit_error(&mut self, diag: Diagnostic) -> ErrorGuaranteed {
        debug_assert!(diag.is_error());
        self.push(diag);
        ErrorGuaranteed::new()
    }

    pub fn extend(&mut self, diags: impl IntoIterator<Item = Diagnostic>) {
        for diag in diags {
            self.push(diag);
        }
    }

    fn is_duplicate(&self, diag: &Diagnostic) -> bool {
        let key = (diag.source, diag.code, primary_start(diag));
        self.diagnostics
            .iter()
            .rev()
            .take(8)
            .any(|d| (d.source, d.code, primary_start(d)) == key && d.message == diag.message)
    }

    pub fn limit_reached(&self) -> bool {
        self.error_limit > 0 && self.error_count >= self.error_limit
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    /// Proof of failure if any error was recorded.
    pub fn error_guarantee(&self) -> Option<ErrorGuaranteed> {
        ErrorGuaranteed::from_error_count(self.error_count)
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Diagnostic> {
        self.diagnostics.iter_mut()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

fn primary_start(diag: &Diagnostic) -> Option<u32> {
    diag.primary_span().map(|s: Span| s.start)
}

#[cfg(test)]
mod tests;
