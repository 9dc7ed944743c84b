//! Token cursor for navigating the token stream.

use std::mem;

use sdsl_diagnostic::ErrorCode;
use sdsl_ir::{Name, Span, StringInterner, Token, TokenKind, TokenList};

use crate::ParseError;

static EOF: Token = Token {
    kind: TokenKind::Eof,
    span: Span::DUMMY,
};

/// Cursor over a lexed token list.
///
/// The lexer always ends the list with `Eof`; reads past the end return an
/// `Eof` token as well, so lookahead never fails.
pub struct Cursor<'a> {
    tokens: &'a [Token],
    interner: &'a StringInterner,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(tokens: &'a TokenList, interner: &'a StringInterner) -> Self {
        Cursor {
            tokens: tokens.as_slice(),
            interner,
            pos: 0,
        }
    }

    pub fn interner(&self) -> &'a StringInterner {
        self.interner
    }

    /// Resolve a name to its text.
    #[inline]
    pub fn text(&self, name: Name) -> &'static str {
        self.interner.lookup(name)
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn set_position(&mut self, pos: usize) {
        debug_assert!(pos <= self.tokens.len(), "cursor position {pos} out of bounds");
        self.pos = pos;
    }

    #[inline]
    pub fn current(&self) -> &'a Token {
        self.tokens.get(self.pos).unwrap_or(&EOF)
    }

    #[inline]
    pub fn current_kind(&self) -> TokenKind {
        self.current().kind
    }

    #[inline]
    pub fn current_span(&self) -> Span {
        self.current().span
    }

    /// Span of the last consumed token.
    #[inline]
    pub fn previous_span(&self) -> Span {
        match self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)) {
            Some(token) => token.span,
            None => Span::DUMMY,
        }
    }

    /// Kind `n` tokens ahead; `peek_kind(0)` is the current token.
    #[inline]
    pub fn peek_kind(&self, n: usize) -> TokenKind {
        self.tokens.get(self.pos + n).unwrap_or(&EOF).kind
    }

    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.current_kind() == TokenKind::Eof
    }

    /// Compare kinds by variant, ignoring payloads.
    #[inline]
    pub fn check(&self, kind: TokenKind) -> bool {
        mem::discriminant(&self.current_kind()) == mem::discriminant(&kind)
    }

    #[inline]
    pub fn check_ident(&self) -> bool {
        matches!(self.current_kind(), TokenKind::Ident(_))
    }

    /// Consume the current token. Never moves past `Eof`.
    pub fn advance(&mut self) -> &'a Token {
        let token = self.current();
        if self.pos < self.tokens.len() && token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    /// Consume the current token if it matches.
    pub fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn expect(&mut self, kind: TokenKind) -> Result<&'a Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(ParseError::unexpected(
                kind.display_name(),
                self.current_kind(),
                self.current_span(),
            ))
        }
    }

    pub fn expect_ident(&mut self) -> Result<(Name, Span), ParseError> {
        match self.current_kind() {
            TokenKind::Ident(name) => {
                let span = self.advance().span;
                Ok((name, span))
            }
            found => Err(ParseError::new(
                ErrorCode::E2004,
                format!("expected identifier, found {}", found.display_name()),
                self.current_span(),
            )),
        }
    }

    /// The current identifier's text, if the current token is one.
    pub fn ident_text(&self) -> Option<&'static str> {
        match self.current_kind() {
            TokenKind::Ident(name) => Some(self.text(name)),
            _ => None,
        }
    }
}
