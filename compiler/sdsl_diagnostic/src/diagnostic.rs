//! Core diagnostic types.

use std::fmt;

use sdsl_ir::{SourceId, Span};

use crate::{ErrorCode, SourceLocation};

/// Severity level for diagnostics.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

/// A labeled span with a message.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Label {
    pub span: Span,
    pub message: String,
    pub is_primary: bool,
}

impl Label {
    pub fn primary(span: Span, message: impl Into<String>) -> Self {
        Label {
            span,
            message: message.into(),
            is_primary: true,
        }
    }

    pub fn secondary(span: Span, message: impl Into<String>) -> Self {
        Label {
            span,
            message: message.into(),
            is_primary: false,
        }
    }
}

/// A compiler diagnostic.
///
/// `source` names the preprocessed unit the label spans point into. It is
/// `None` for diagnostics without a position (cancellation, missing sources).
/// `location` is filled in by the driver after mapping the primary span back
/// through the unit's text links.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
#[must_use = "diagnostics should be reported or returned, not silently dropped"]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub severity: Severity,
    pub message: String,
    pub source: Option<SourceId>,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
    pub location: Option<SourceLocation>,
}

impl Diagnostic {
    fn new_with_severity(code: ErrorCode, severity: Severity) -> Self {
        Diagnostic {
            code,
            severity,
            message: String::new(),
            source: None,
            labels: Vec::new(),
            notes: Vec::new(),
            location: None,
        }
    }

    /// Create a new error diagnostic.
    #[cold]
    pub fn error(code: ErrorCode) -> Self {
        Self::new_with_severity(code, Severity::Error)
    }

    /// Create a new warning diagnostic.
    #[cold]
    pub fn warning(code: ErrorCode) -> Self {
        Self::new_with_severity(code, Severity::Warning)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Set the unit the spans point into.
    pub fn with_source(mut self, source: SourceId) -> Self {
        self.source = Some(source);
        self
    }

    /// Add a primary label at the error location.
    pub fn with_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(Label::primary(span, message));
        self
    }

    /// Add a secondary label for context.
    pub fn with_secondary_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(Label::secondary(span, message));
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Attach a resolved original-source location.
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// The primary label's span, if any.
    pub fn primary_span(&self) -> Option<Span> {
        self.labels
            .iter()
            .find(|l| l.is_primary)
            .or_else(|| self.labels.first())
            .map(|l| l.span)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(location) = &self.location {
            write!(f, "{location}: ")?;
        }
        write!(f, "{}[{}]: {}", self.severity, self.code, self.message)
    }
}

/// "unexpected token" error.
#[cold]
pub fn unexpected_token(span: Span, expected: &str, found: &str) -> Diagnostic {
    Diagnostic::error(ErrorCode::E2001)
        .with_message(format!("expected {expected}, found {found}"))
        .with_label(span, format!("expected {expected}"))
}

/// "expected X" error for a missing token.
#[cold]
pub fn expected_token(span: Span, expected: &str) -> Diagnostic {
    Diagnostic::error(ErrorCode::E2001)
        .with_message(format!("expected {expected}"))
        .with_label(span, format!("expected {expected} here"))
}

/// "type mismatch" error.
#[cold]
pub fn type_mismatch(span: Span, expected: &str, found: &str) -> Diagnostic {
    Diagnostic::error(ErrorCode::E3001)
        .with_message(format!("type mismatch: expected `{expected}`, found `{found}`"))
        .with_label(span, format!("expected `{expected}`"))
}

/// "unknown identifier" error.
#[cold]
pub fn unknown_identifier(span: Span, name: &str) -> Diagnostic {
    Diagnostic::error(ErrorCode::E3003)
        .with_message(format!("unknown identifier `{name}`"))
        .with_label(span, "not found in this scope")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_chain() {
        let diag = Diagnostic::error(ErrorCode::E3005)
            .with_message("duplicate definition of `Color`")
            .with_source(SourceId::new(2))
            .with_label(Span::new(10, 15), "redefined here")
            .with_secondary_label(Span::new(0, 5), "first defined here")
            .with_note("fields share one namespace per mixin");

        assert!(diag.is_error());
        assert_eq!(diag.primary_span(), Some(Span::new(10, 15)));
        assert_eq!(diag.source, Some(SourceId::new(2)));
        assert_eq!(diag.labels.len(), 2);
        assert_eq!(diag.notes.len(), 1);
    }

    #[test]
    fn test_display_with_location() {
        let diag = type_mismatch(Span::new(0, 1), "float3", "bool").with_location(
            SourceLocation::new("Base.sdsl", 3, 9),
        );
        assert_eq!(
            diag.to_string(),
            "Base.sdsl:3:9: error[E3001]: type mismatch: expected `float3`, found `bool`"
        );
    }

    #[test]
    fn test_primary_span_falls_back_to_first_label() {
        let diag = Diagnostic::error(ErrorCode::E2001).with_secondary_label(Span::new(4, 8), "x");
        assert_eq!(diag.primary_span(), Some(Span::new(4, 8)));
    }
}
