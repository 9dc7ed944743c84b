use pretty_assertions::assert_eq;
use sdsl_diagnostic::ErrorCode;
use sdsl_ir::{SourceId, StringInterner, TokenFlags, TokenKind};

use crate::lex;

fn kinds(text: &str, interner: &StringInterner) -> Vec<TokenKind> {
    lex(text, SourceId::new(0), interner)
        .tokens
        .iter()
        .map(|t| t.kind)
        .collect()
}

#[test]
fn test_lex_shader_header() {
    let interner = StringInterner::new();
    let child = interner.intern("Child");
    let base = interner.intern("Base");
    assert_eq!(
        kinds("shader Child : Base {}", &interner),
        vec![
            TokenKind::Shader,
            TokenKind::Ident(child),
            TokenKind::Colon,
            TokenKind::Ident(base),
            TokenKind::LBrace,
            TokenKind::RBrace,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_lex_numbers() {
    let interner = StringInterner::new();
    assert_eq!(
        kinds("3 4u 0x10 1.5f", &interner),
        vec![
            TokenKind::Int(3),
            TokenKind::UInt(4),
            TokenKind::Int(16),
            TokenKind::Float(1.5f64.to_bits()),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_lex_string_is_unescaped() {
    let interner = StringInterner::new();
    let vertex = interner.intern("vertex");
    assert_eq!(
        kinds(r#"[shader("vertex")]"#, &interner),
        vec![
            TokenKind::LBracket,
            TokenKind::Shader,
            TokenKind::LParen,
            TokenKind::Str(vertex),
            TokenKind::RParen,
            TokenKind::RBracket,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_flags_track_layout() {
    let interner = StringInterner::new();
    let out = lex("a b\n  c", SourceId::new(0), &interner);
    assert_eq!(out.tokens.flag(0), TokenFlags::LINE_START);
    assert_eq!(out.tokens.flag(1), TokenFlags::SPACE_BEFORE);
    assert_eq!(
        out.tokens.flag(2),
        TokenFlags::LINE_START | TokenFlags::SPACE_BEFORE
    );
}

#[test]
fn test_spans_index_source() {
    let interner = StringInterner::new();
    let text = "float3 Color;";
    let out = lex(text, SourceId::new(0), &interner);
    let spans: Vec<&str> = out
        .tokens
        .iter()
        .map(|t| &text[t.span.to_range()])
        .collect();
    assert_eq!(spans, vec!["float3", "Color", ";", ""]);
}

#[test]
fn test_errors_continue_lexing() {
    let interner = StringInterner::new();
    let out = lex("a @ \"open\n b 99999999999", SourceId::new(3), &interner);
    let codes: Vec<ErrorCode> = out.errors.iter().map(|d| d.code).collect();
    assert_eq!(codes, vec![ErrorCode::E0002, ErrorCode::E0001, ErrorCode::E0003]);
    assert!(out.errors.iter().all(|d| d.source == Some(SourceId::new(3))));
    assert_eq!(out.tokens.len(), 6);
}

#[test]
fn test_unterminated_comment() {
    let interner = StringInterner::new();
    let out = lex("x /* open", SourceId::new(0), &interner);
    assert_eq!(out.errors.len(), 1);
    assert_eq!(out.errors[0].code, ErrorCode::E0004);
}
