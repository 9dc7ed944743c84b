//! Types, modifiers, attributes and semantics.

use sdsl_diagnostic::ErrorCode;
use sdsl_ir::{Attribute, ExprId, Modifiers, Semantic, TokenKind, TypeExpr};

use crate::{ParseError, ParseOutcome, Parser};

/// Whether `text` names a builtin scalar, vector or matrix type
/// (`float`, `int3`, `float4x4`, ...). Used to recognise casts.
pub fn is_builtin_type_name(text: &str) -> bool {
    const SCALARS: [&str; 7] = ["bool", "int", "uint", "float", "half", "double", "dword"];
    let Some(scalar) = SCALARS.iter().find(|s| text.starts_with(**s)) else {
        return false;
    };
    let dims = text[scalar.len()..].as_bytes();
    let is_dim = |b: u8| (b'1'..=b'4').contains(&b);
    match dims {
        [] => true,
        [n] => is_dim(*n),
        [r, b'x', c] => is_dim(*r) && is_dim(*c),
        _ => false,
    }
}

fn modifier_flag(kind: TokenKind) -> Option<Modifiers> {
    Some(match kind {
        TokenKind::Stage => Modifiers::STAGE,
        TokenKind::Stream => Modifiers::STREAM,
        TokenKind::Static => Modifiers::STATIC,
        TokenKind::Const => Modifiers::CONST,
        TokenKind::Override => Modifiers::OVERRIDE,
        TokenKind::Abstract => Modifiers::ABSTRACT,
        TokenKind::Clone => Modifiers::CLONE,
        TokenKind::In => Modifiers::IN,
        TokenKind::Out => Modifiers::OUT,
        TokenKind::InOut => Modifiers::INOUT,
        _ => return None,
    })
}

impl Parser<'_> {
    /// `('stage' | 'stream' | ... )*`
    pub(crate) fn parse_modifiers(&mut self) -> Modifiers {
        let mut modifiers = Modifiers::empty();
        while let Some(flag) = modifier_flag(self.cursor.current_kind()) {
            modifiers |= flag;
            self.cursor.advance();
        }
        modifiers
    }

    /// `Ident ('<' Ident '>')?`
    pub(crate) fn parse_type(&mut self) -> ParseOutcome<TypeExpr> {
        let TokenKind::Ident(name) = self.cursor.current_kind() else {
            return ParseOutcome::empty_err("type", self.cursor.position());
        };
        let start = self.cursor.advance().span;
        if !self.cursor.eat(TokenKind::Lt) {
            return ParseOutcome::consumed_ok(TypeExpr {
                name,
                arg: None,
                span: start,
            });
        }
        let result = self.parse_type_argument().map(|arg| TypeExpr {
            name,
            arg: Some(arg),
            span: start.merge(self.cursor.previous_span()),
        });
        ParseOutcome::committed(result, start)
    }

    fn parse_type_argument(&mut self) -> Result<sdsl_ir::Name, ParseError> {
        let (arg, _) = self.cursor.expect_ident().map_err(|e| ParseError {
            code: ErrorCode::E2005,
            ..e
        })?;
        self.cursor.expect(TokenKind::Gt)?;
        Ok(arg)
    }

    /// A type where one is required.
    pub(crate) fn expect_type(&mut self) -> Result<TypeExpr, ParseError> {
        let span = self.cursor.current_span();
        let found = self.cursor.current_kind();
        match self.parse_type() {
            ParseOutcome::ConsumedOk { value } | ParseOutcome::EmptyOk { value } => Ok(value),
            ParseOutcome::ConsumedErr { error, .. } => Err(error),
            ParseOutcome::EmptyErr { .. } => Err(ParseError::new(
                ErrorCode::E2005,
                format!("expected type, found {}", found.display_name()),
                span,
            )),
        }
    }

    /// `attribute*` where `attribute := '[' Ident ('(' args? ')')? ']'`.
    /// Keywords are accepted as attribute names, as in `[shader("pixel")]`.
    pub(crate) fn parse_attributes(&mut self) -> Result<Vec<Attribute>, ParseError> {
        let mut attributes = Vec::new();
        while self.cursor.check(TokenKind::LBracket) {
            let start = self.cursor.advance().span;
            let name = match self.cursor.current_kind().keyword_text() {
                Some(keyword) => {
                    self.cursor.advance();
                    self.cursor.interner().intern(keyword)
                }
                None => self.cursor.expect_ident()?.0,
            };
            let mut args = Vec::new();
            if self.cursor.eat(TokenKind::LParen) && !self.cursor.eat(TokenKind::RParen) {
                loop {
                    args.push(self.parse_expr()?);
                    if !self.cursor.eat(TokenKind::Comma) {
                        break;
                    }
                }
                self.cursor.expect(TokenKind::RParen)?;
            }
            self.cursor.expect(TokenKind::RBracket)?;
            attributes.push(Attribute {
                name,
                args,
                span: start.merge(self.cursor.previous_span()),
            });
        }
        Ok(attributes)
    }

    /// `(':' Ident)?`
    pub(crate) fn parse_semantic(&mut self) -> Result<Option<Semantic>, ParseError> {
        if !self.cursor.eat(TokenKind::Colon) {
            return Ok(None);
        }
        let (name, span) = self.cursor.expect_ident()?;
        Ok(Some(Semantic { name, span }))
    }

    /// `('[' expr ']')?`
    pub(crate) fn parse_array_suffix(&mut self) -> Result<Option<ExprId>, ParseError> {
        if !self.cursor.eat(TokenKind::LBracket) {
            return Ok(None);
        }
        let size = self.parse_expr()?;
        self.cursor.expect(TokenKind::RBracket)?;
        Ok(Some(size))
    }
}
