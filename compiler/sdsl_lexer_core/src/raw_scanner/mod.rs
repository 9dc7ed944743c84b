//! Raw token classification.
//!
//! [`scan_token`] consumes exactly one raw token from a [`Scanner`] and
//! reports its [`RawTag`]. Raw tokens carry no values; the lexer cooks them
//! (keywords, numbers, interning) and the preprocessor uses them to find
//! identifiers and directive punctuation without caring about the rest.
//!
//! Trivia (whitespace, newlines, comments) is reported as tokens too, so a
//! caller can copy text through verbatim.

use crate::{is_horizontal_space, is_ident_continue, is_ident_start, Scanner};

/// Raw token categories.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RawTag {
    Ident,
    /// Decimal or hex integer, with optional `u`/`l` suffixes.
    Int,
    /// Float with a fraction, exponent, or `f`/`h` suffix.
    Float,
    Str,
    UnterminatedStr,
    LineComment,
    BlockComment,
    UnterminatedBlockComment,
    /// Horizontal whitespace run.
    Whitespace,
    Newline,
    /// `\` (line continuation inside directives).
    Backslash,
    Hash,
    HashHash,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semi,
    Comma,
    Dot,
    Colon,
    Question,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Bang,
    Eq,
    EqEq,
    BangEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Shl,
    Shr,
    AmpAmp,
    PipePipe,
    PlusPlus,
    MinusMinus,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,
    AmpEq,
    PipeEq,
    CaretEq,
    ShlEq,
    ShrEq,
    /// A character that starts no token.
    Unknown,
    Eof,
}

impl RawTag {
    /// Whitespace, newlines and comments.
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            RawTag::Whitespace
                | RawTag::Newline
                | RawTag::LineComment
                | RawTag::BlockComment
                | RawTag::UnterminatedBlockComment
        )
    }
}

/// Consume one raw token starting at the scanner's position.
pub fn scan_token(scanner: &mut Scanner<'_>) -> RawTag {
    let c = scanner.current();
    if scanner.is_eof() {
        return RawTag::Eof;
    }
    if c == '\n' {
        scanner.advance(1);
        return RawTag::Newline;
    }
    if is_horizontal_space(c) {
        scanner.eat_while(is_horizontal_space);
        return RawTag::Whitespace;
    }
    if is_ident_start(c) {
        scanner.eat_while(is_ident_continue);
        return RawTag::Ident;
    }
    if c.is_ascii_digit() || (c == '.' && scanner.peek(1).is_ascii_digit()) {
        return scan_number(scanner);
    }
    if c == '"' {
        return scan_string(scanner);
    }
    if c == '/' && scanner.peek(1) == '/' {
        scanner.skip_to_line_end();
        return RawTag::LineComment;
    }
    if c == '/' && scanner.peek(1) == '*' {
        scanner.advance(2);
        return if scanner.skip_past("*/") {
            RawTag::BlockComment
        } else {
            RawTag::UnterminatedBlockComment
        };
    }
    scan_punct(scanner)
}

fn scan_number(scanner: &mut Scanner<'_>) -> RawTag {
    if scanner.current() == '0' && matches!(scanner.peek(1), 'x' | 'X') {
        scanner.advance(2);
        scanner.eat_while(|c| c.is_ascii_hexdigit());
        scanner.eat_while(|c| matches!(c, 'u' | 'U' | 'l' | 'L'));
        return RawTag::Int;
    }

    let mut is_float = false;
    scanner.eat_while(|c| c.is_ascii_digit());
    if scanner.current() == '.' {
        is_float = true;
        scanner.advance(1);
        scanner.eat_while(|c| c.is_ascii_digit());
    }
    if matches!(scanner.current(), 'e' | 'E') {
        let sign = usize::from(matches!(scanner.peek(1), '+' | '-'));
        if scanner.peek(1 + sign).is_ascii_digit() {
            is_float = true;
            scanner.advance(1 + sign);
            scanner.eat_while(|c| c.is_ascii_digit());
        }
    }
    match scanner.current() {
        'f' | 'F' | 'h' | 'H' => {
            scanner.advance(1);
            RawTag::Float
        }
        'l' | 'L' if is_float => {
            scanner.advance(1);
            RawTag::Float
        }
        'u' | 'U' | 'l' | 'L' if !is_float => {
            scanner.eat_while(|c| matches!(c, 'u' | 'U' | 'l' | 'L'));
            RawTag::Int
        }
        _ if is_float => RawTag::Float,
        _ => RawTag::Int,
    }
}

fn scan_string(scanner: &mut Scanner<'_>) -> RawTag {
    scanner.advance(1);
    loop {
        match scanner.current() {
            '"' => {
                scanner.advance(1);
                return RawTag::Str;
            }
            '\\' if scanner.peek(1) != '\n' && scanner.peek(1) != crate::EOF_CHAR => {
                scanner.advance(2);
            }
            '\n' => return RawTag::UnterminatedStr,
            _ if scanner.is_eof() => return RawTag::UnterminatedStr,
            _ => scanner.advance(1),
        }
    }
}

fn scan_punct(scanner: &mut Scanner<'_>) -> RawTag {
    // Longest match first.
    const TABLE: &[(&str, RawTag)] = &[
        ("<<=", RawTag::ShlEq),
        (">>=", RawTag::ShrEq),
        ("##", RawTag::HashHash),
        ("==", RawTag::EqEq),
        ("!=", RawTag::BangEq),
        ("<=", RawTag::LtEq),
        (">=", RawTag::GtEq),
        ("<<", RawTag::Shl),
        (">>", RawTag::Shr),
        ("&&", RawTag::AmpAmp),
        ("||", RawTag::PipePipe),
        ("++", RawTag::PlusPlus),
        ("--", RawTag::MinusMinus),
        ("+=", RawTag::PlusEq),
        ("-=", RawTag::MinusEq),
        ("*=", RawTag::StarEq),
        ("/=", RawTag::SlashEq),
        ("%=", RawTag::PercentEq),
        ("&=", RawTag::AmpEq),
        ("|=", RawTag::PipeEq),
        ("^=", RawTag::CaretEq),
        ("#", RawTag::Hash),
        ("\\", RawTag::Backslash),
        ("(", RawTag::LParen),
        (")", RawTag::RParen),
        ("{", RawTag::LBrace),
        ("}", RawTag::RBrace),
        ("[", RawTag::LBracket),
        ("]", RawTag::RBracket),
        (";", RawTag::Semi),
        (",", RawTag::Comma),
        (".", RawTag::Dot),
        (":", RawTag::Colon),
        ("?", RawTag::Question),
        ("+", RawTag::Plus),
        ("-", RawTag::Minus),
        ("*", RawTag::Star),
        ("/", RawTag::Slash),
        ("%", RawTag::Percent),
        ("&", RawTag::Amp),
        ("|", RawTag::Pipe),
        ("^", RawTag::Caret),
        ("~", RawTag::Tilde),
        ("!", RawTag::Bang),
        ("=", RawTag::Eq),
        ("<", RawTag::Lt),
        (">", RawTag::Gt),
    ];

    for (text, tag) in TABLE {
        if scanner.read_literal(text, true) {
            return *tag;
        }
    }
    scanner.advance(1);
    RawTag::Unknown
}

#[cfg(test)]
mod tests;
