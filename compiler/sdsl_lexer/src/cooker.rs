//! Token cooking: raw tags to `TokenKind`.
//!
//! Each raw category has one cooking path:
//! - **Punctuation**: direct 1:1 mapping
//! - **Identifiers**: keyword lookup, then intern
//! - **Numbers**: parse value, report overflow or bad digits
//! - **Strings**: unescape, then intern
//! - **Errors**: record a diagnostic, return `TokenKind::Error`

use sdsl_diagnostic::{Diagnostic, ErrorCode};
use sdsl_ir::{SourceId, Span, StringInterner, TokenKind};
use sdsl_lexer_core::RawTag;

pub(crate) struct TokenCooker<'src> {
    text: &'src str,
    source: SourceId,
    interner: &'src StringInterner,
    errors: Vec<Diagnostic>,
}

impl<'src> TokenCooker<'src> {
    pub(crate) fn new(text: &'src str, source: SourceId, interner: &'src StringInterner) -> Self {
        TokenCooker {
            text,
            source,
            interner,
            errors: Vec::new(),
        }
    }

    pub(crate) fn into_errors(self) -> Vec<Diagnostic> {
        self.errors
    }

    fn slice(&self, span: Span) -> &'src str {
        self.text.get(span.to_range()).unwrap_or("")
    }

    #[cold]
    fn error(&mut self, code: ErrorCode, span: Span, message: String, label: &str) {
        self.errors.push(
            Diagnostic::error(code)
                .with_message(message)
                .with_source(self.source)
                .with_label(span, label),
        );
    }

    pub(crate) fn unterminated_comment(&mut self, span: Span) {
        self.error(
            ErrorCode::E0004,
            Span::new(span.start, span.start + 2),
            "unterminated block comment".to_string(),
            "comment starts here",
        );
    }

    pub(crate) fn cook(&mut self, tag: RawTag, span: Span) -> TokenKind {
        let text = self.slice(span);
        match tag {
            RawTag::Ident => TokenKind::keyword(text)
                .unwrap_or_else(|| TokenKind::Ident(self.interner.intern(text))),
            RawTag::Int => self.cook_int(text, span),
            RawTag::Float => self.cook_float(text, span),
            RawTag::Str => {
                let inner = text.get(1..text.len().saturating_sub(1)).unwrap_or("");
                TokenKind::Str(self.interner.intern(&unescape(inner)))
            }
            RawTag::UnterminatedStr => {
                self.error(
                    ErrorCode::E0001,
                    span,
                    "unterminated string literal".to_string(),
                    "missing closing `\"`",
                );
                TokenKind::Error
            }
            RawTag::Hash | RawTag::HashHash | RawTag::Backslash | RawTag::Unknown => {
                self.error(
                    ErrorCode::E0002,
                    span,
                    format!("unexpected character `{text}`"),
                    "not valid here",
                );
                TokenKind::Error
            }
            RawTag::LParen => TokenKind::LParen,
            RawTag::RParen => TokenKind::RParen,
            RawTag::LBrace => TokenKind::LBrace,
            RawTag::RBrace => TokenKind::RBrace,
            RawTag::LBracket => TokenKind::LBracket,
            RawTag::RBracket => TokenKind::RBracket,
            RawTag::Semi => TokenKind::Semi,
            RawTag::Comma => TokenKind::Comma,
            RawTag::Dot => TokenKind::Dot,
            RawTag::Colon => TokenKind::Colon,
            RawTag::Question => TokenKind::Question,
            RawTag::Plus => TokenKind::Plus,
            RawTag::Minus => TokenKind::Minus,
            RawTag::Star => TokenKind::Star,
            RawTag::Slash => TokenKind::Slash,
            RawTag::Percent => TokenKind::Percent,
            RawTag::Amp => TokenKind::Amp,
            RawTag::Pipe => TokenKind::Pipe,
            RawTag::Caret => TokenKind::Caret,
            RawTag::Tilde => TokenKind::Tilde,
            RawTag::Bang => TokenKind::Bang,
            RawTag::Eq => TokenKind::Eq,
            RawTag::EqEq => TokenKind::EqEq,
            RawTag::BangEq => TokenKind::BangEq,
            RawTag::Lt => TokenKind::Lt,
            RawTag::Gt => TokenKind::Gt,
            RawTag::LtEq => TokenKind::LtEq,
            RawTag::GtEq => TokenKind::GtEq,
            RawTag::Shl => TokenKind::Shl,
            RawTag::Shr => TokenKind::Shr,
            RawTag::AmpAmp => TokenKind::AmpAmp,
            RawTag::PipePipe => TokenKind::PipePipe,
            RawTag::PlusPlus => TokenKind::PlusPlus,
            RawTag::MinusMinus => TokenKind::MinusMinus,
            RawTag::PlusEq => TokenKind::PlusEq,
            RawTag::MinusEq => TokenKind::MinusEq,
            RawTag::StarEq => TokenKind::StarEq,
            RawTag::SlashEq => TokenKind::SlashEq,
            RawTag::PercentEq => TokenKind::PercentEq,
            RawTag::AmpEq => TokenKind::AmpEq,
            RawTag::PipeEq => TokenKind::PipeEq,
            RawTag::CaretEq => TokenKind::CaretEq,
            RawTag::ShlEq => TokenKind::ShlEq,
            RawTag::ShrEq => TokenKind::ShrEq,
            // Trivia and Eof never reach the cooker.
            RawTag::Whitespace
            | RawTag::Newline
            | RawTag::LineComment
            | RawTag::BlockComment
            | RawTag::UnterminatedBlockComment
            | RawTag::Eof => TokenKind::Error,
        }
    }

    fn cook_int(&mut self, text: &str, span: Span) -> TokenKind {
        let unsigned = text.contains(['u', 'U']);
        let digits = text.trim_end_matches(['u', 'U', 'l', 'L']);
        let parsed = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => digits.parse::<u64>(),
        };
        match parsed {
            Ok(value) if value <= u64::from(u32::MAX) => {
                if unsigned {
                    TokenKind::UInt(value)
                } else {
                    TokenKind::Int(value)
                }
            }
            _ => {
                self.error(
                    ErrorCode::E0003,
                    span,
                    format!("invalid integer literal `{text}`"),
                    "does not fit in 32 bits",
                );
                TokenKind::Error
            }
        }
    }

    fn cook_float(&mut self, text: &str, span: Span) -> TokenKind {
        let digits = text.trim_end_matches(['f', 'F', 'h', 'H', 'l', 'L']);
        match digits.parse::<f64>() {
            Ok(value) if value.is_finite() => TokenKind::Float(value.to_bits()),
            _ => {
                self.error(
                    ErrorCode::E0003,
                    span,
                    format!("invalid float literal `{text}`"),
                    "not a finite number",
                );
                TokenKind::Error
            }
        }
    }
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
