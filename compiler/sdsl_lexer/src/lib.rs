//! Lexer for SDSL.
//!
//! Runs the raw scanner from `sdsl_lexer_core` over preprocessed text and
//! cooks each raw token into a parser-ready [`TokenKind`]:
//!
//! ```text
//! text → scan_token → RawTag → TokenCooker → Token
//! ```
//!
//! Trivia is dropped; its presence survives as [`TokenFlags`] on the next
//! token. Problems (bad characters, malformed numbers, unterminated strings)
//! become `E0xxx` diagnostics and an `Error` token, and lexing continues.

mod cooker;

use sdsl_diagnostic::Diagnostic;
use sdsl_ir::{SourceId, Span, StringInterner, Token, TokenFlags, TokenKind, TokenList};
use sdsl_lexer_core::{scan_token, RawTag, Scanner};

use crate::cooker::TokenCooker;

/// Lexer result: tokens ending in `Eof`, plus any lexical errors.
#[derive(Debug)]
pub struct LexOutput {
    pub tokens: TokenList,
    pub errors: Vec<Diagnostic>,
}

/// Tokenize `text`.
///
/// `source` tags the diagnostics so their spans can be mapped back.
#[tracing::instrument(level = "debug", skip_all, fields(len = text.len()))]
pub fn lex(text: &str, source: SourceId, interner: &StringInterner) -> LexOutput {
    let mut tokens = TokenList::with_capacity(text.len() / 4);
    let mut cooker = TokenCooker::new(text, source, interner);
    let mut scanner = Scanner::new(text);
    let mut flags = TokenFlags::LINE_START;

    loop {
        let start = scanner.pos();
        let tag = scan_token(&mut scanner);
        let span = Span::new(start, scanner.pos());
        match tag {
            RawTag::Eof => break,
            RawTag::Newline => flags |= TokenFlags::LINE_START,
            RawTag::Whitespace | RawTag::LineComment | RawTag::BlockComment => {
                flags |= TokenFlags::SPACE_BEFORE;
            }
            RawTag::UnterminatedBlockComment => {
                cooker.unterminated_comment(span);
                flags |= TokenFlags::SPACE_BEFORE;
            }
            _ => {
                let kind = cooker.cook(tag, span);
                tokens.push(Token::new(kind, span), flags);
                flags = TokenFlags::empty();
            }
        }
    }

    let end = Span::point(scanner.pos());
    tokens.push(Token::new(TokenKind::Eof, end), flags);
    tracing::trace!(count = tokens.len(), "lexed");

    LexOutput {
        tokens,
        errors: cooker.into_errors(),
    }
}

#[cfg(test)]
mod tests;
