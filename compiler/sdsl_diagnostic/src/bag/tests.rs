use pretty_assertions::assert_eq;
use sdsl_ir::{SourceId, Span};

use super::*;
use crate::ErrorCode;

fn err(code: ErrorCode, start: u32, msg: &str) -> Diagnostic {
    Diagnostic::error(code)
        .with_message(msg)
        .with_source(SourceId::new(0))
        .with_label(Span::new(start, start + 1), "here")
}

#[test]
fn push_counts_errors() {
    let mut bag = DiagnosticBag::new();
    assert!(bag.error_guarantee().is_none());
    assert!(bag.push(err(ErrorCode::E3003, 0, "unknown identifier `a`")));
    assert!(bag.push(err(ErrorCode::E3003, 5, "unknown identifier `b`")));
    assert_eq!(bag.error_count(), 2);
    assert!(bag.error_guarantee().is_some());
}

#[test]
fn identical_errors_are_deduplicated() {
    let mut bag = DiagnosticBag::new();
    assert!(bag.push(err(ErrorCode::E3001, 4, "type mismatch")));
    assert!(!bag.push(err(ErrorCode::E3001, 4, "type mismatch")));
    assert_eq!(bag.len(), 1);
}

#[test]
fn same_position_different_message_is_kept() {
    let mut bag = DiagnosticBag::new();
    bag.push(err(ErrorCode::E3001, 4, "a"));
    bag.push(err(ErrorCode::E3001, 4, "b"));
    assert_eq!(bag.len(), 2);
}

#[test]
fn error_limit_stops_collection() {
    let mut bag = DiagnosticBag::with_limit(2);
    for i in 0..5 {
        bag.push(err(ErrorCode::E2001, i * 10, &format!("e{i}")));
    }
    assert_eq!(bag.error_count(), 2);
    assert!(bag.limit_reached());
}

#[test]
fn emit_error_returns_guarantee() {
    let mut bag = DiagnosticBag::with_limit(0);
    let _proof: ErrorGuaranteed = bag.emit_error(err(ErrorCode::E5001, 0, "missing return"));
    assert!(bag.has_errors());
    assert!(!bag.limit_reached());
}
