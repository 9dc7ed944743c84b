//! Parse error type.

use sdsl_diagnostic::{Diagnostic, ErrorCode};
use sdsl_ir::{Span, TokenKind};

/// Parse error with error code for rich diagnostics.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct ParseError {
    pub code: ErrorCode,
    pub message: String,
    pub span: Span,
    /// "while parsing X" context, attached once by the enclosing production.
    pub context: Option<String>,
}

impl ParseError {
    #[cold]
    pub fn new(code: ErrorCode, message: impl Into<String>, span: Span) -> Self {
        ParseError {
            code,
            message: message.into(),
            span,
            context: None,
        }
    }

    #[cold]
    pub fn unexpected(expected: &str, found: TokenKind, span: Span) -> Self {
        let code = if found == TokenKind::Eof {
            ErrorCode::E2003
        } else {
            ErrorCode::E2001
        };
        ParseError::new(
            code,
            format!("expected {expected}, found {}", found.display_name()),
            span,
        )
    }

    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        if self.context.is_none() {
            self.context = Some(context.into());
        }
        self
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.code)
            .with_message(&self.message)
            .with_label(self.span, self.context.as_deref().unwrap_or("here"))
    }
}
