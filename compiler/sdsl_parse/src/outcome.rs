//! Four-way parse outcome.
//!
//! | Progress | Result | Variant | Meaning |
//! |----------|--------|---------|---------|
//! | Consumed | Ok | `ConsumedOk` | Committed to the production and succeeded |
//! | Empty | Ok | `EmptyOk` | Optional content absent |
//! | Consumed | Err | `ConsumedErr` | Failed past a commit point; report, don't backtrack |
//! | Empty | Err | `EmptyErr` | Production does not start here; try the next one |

use sdsl_ir::Span;

use crate::ParseError;

#[derive(Debug)]
pub enum ParseOutcome<T> {
    ConsumedOk { value: T },
    EmptyOk { value: T },
    ConsumedErr { error: ParseError, consumed_span: Span },
    EmptyErr { expected: &'static str, position: usize },
}

impl<T> ParseOutcome<T> {
    #[inline]
    pub fn consumed_ok(value: T) -> Self {
        Self::ConsumedOk { value }
    }

    #[inline]
    pub fn empty_ok(value: T) -> Self {
        Self::EmptyOk { value }
    }

    #[inline]
    pub fn consumed_err(error: ParseError, consumed_span: Span) -> Self {
        Self::ConsumedErr {
            error,
            consumed_span,
        }
    }

    #[inline]
    pub fn empty_err(expected: &'static str, position: usize) -> Self {
        Self::EmptyErr { expected, position }
    }

    /// Wrap the result of the part of a production after its commit point.
    pub fn committed(result: Result<T, ParseError>, consumed_span: Span) -> Self {
        match result {
            Ok(value) => Self::consumed_ok(value),
            Err(error) => Self::consumed_err(error, consumed_span),
        }
    }

    #[inline]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::ConsumedOk { .. } | Self::EmptyOk { .. })
    }

    /// `true` once input was consumed; the caller is committed.
    #[inline]
    pub fn made_progress(&self) -> bool {
        matches!(self, Self::ConsumedOk { .. } | Self::ConsumedErr { .. })
    }

    #[inline]
    pub fn failed_without_progress(&self) -> bool {
        matches!(self, Self::EmptyErr { .. })
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ParseOutcome<U> {
        match self {
            Self::ConsumedOk { value } => ParseOutcome::ConsumedOk { value: f(value) },
            Self::EmptyOk { value } => ParseOutcome::EmptyOk { value: f(value) },
            Self::ConsumedErr {
                error,
                consumed_span,
            } => ParseOutcome::ConsumedErr {
                error,
                consumed_span,
            },
            Self::EmptyErr { expected, position } => ParseOutcome::EmptyErr { expected, position },
        }
    }

    /// Attach "while parsing X" to hard errors only.
    #[must_use]
    pub fn with_error_context(self, context: &str) -> Self {
        match self {
            Self::ConsumedErr {
                error,
                consumed_span,
            } => Self::ConsumedErr {
                error: error.with_context(format!("while parsing {context}")),
                consumed_span,
            },
            other => other,
        }
    }

    /// Collapse into a `Result`. A soft failure becomes an "expected X"
    /// error at `span`.
    pub fn into_result(self, span: Span) -> Result<T, ParseError> {
        match self {
            Self::ConsumedOk { value } | Self::EmptyOk { value } => Ok(value),
            Self::ConsumedErr { error, .. } => Err(error),
            Self::EmptyErr { expected, .. } => Err(ParseError::new(
                sdsl_diagnostic::ErrorCode::E2001,
                format!("expected {expected}"),
                span,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdsl_diagnostic::ErrorCode;

    #[test]
    fn test_progress_predicates() {
        let ok: ParseOutcome<u32> = ParseOutcome::consumed_ok(1);
        assert!(ok.is_ok() && ok.made_progress());

        let empty: ParseOutcome<u32> = ParseOutcome::empty_ok(0);
        assert!(empty.is_ok() && !empty.made_progress());

        let soft: ParseOutcome<u32> = ParseOutcome::empty_err("type", 3);
        assert!(soft.failed_without_progress());

        let hard: ParseOutcome<u32> = ParseOutcome::consumed_err(
            ParseError::new(ErrorCode::E2001, "bad", Span::new(0, 1)),
            Span::new(0, 1),
        );
        assert!(hard.made_progress() && !hard.is_ok());
    }

    #[test]
    fn test_context_only_on_hard_errors() {
        let hard: ParseOutcome<u32> = ParseOutcome::consumed_err(
            ParseError::new(ErrorCode::E2001, "bad", Span::new(0, 1)),
            Span::new(0, 1),
        )
        .with_error_context("shader");
        match hard {
            ParseOutcome::ConsumedErr { error, .. } => {
                assert_eq!(error.context.as_deref(), Some("while parsing shader"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_soft_failure_into_result() {
        let soft: ParseOutcome<u32> = ParseOutcome::empty_err("`shader` or `effect`", 0);
        let err = soft.into_result(Span::new(4, 5));
        assert_eq!(
            err.map_err(|e| e.message),
            Err("expected `shader` or `effect`".to_string())
        );
    }
}
