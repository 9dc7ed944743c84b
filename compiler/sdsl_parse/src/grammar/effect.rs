//! Effect declarations.

use sdsl_ir::{EffectDecl, EffectStmt, EffectStmtKind, MixinTarget, Span, TokenKind};

use crate::{ParseError, ParseOutcome, Parser};

impl Parser<'_> {
    /// `'effect' Ident base_list? '{' effect_stmt* '}' ';'?`
    pub(crate) fn parse_effect_decl(&mut self) -> ParseOutcome<EffectDecl> {
        if !self.cursor.check(TokenKind::Effect) {
            return ParseOutcome::empty_err("`effect`", self.cursor.position());
        }
        let start = self.cursor.advance().span;
        let result = self.effect_after_keyword(start);
        ParseOutcome::committed(result, start)
    }

    fn effect_after_keyword(&mut self, start: Span) -> Result<EffectDecl, ParseError> {
        let (name, name_span) = self.cursor.expect_ident()?;
        let bases = self.parse_base_list()?;
        let open = self.cursor.expect(TokenKind::LBrace)?.span;

        let mut body = Vec::new();
        while !self.cursor.check(TokenKind::RBrace) && !self.cursor.is_at_end() {
            let before = self.cursor.position();
            match self.parse_effect_stmt() {
                Ok(stmt) => body.push(stmt),
                Err(error) => {
                    self.errors.push(error);
                    self.synchronize();
                    if self.cursor.position() == before {
                        self.cursor.advance();
                    }
                }
            }
        }
        self.expect_close_brace(open)?;
        self.cursor.eat(TokenKind::Semi);

        Ok(EffectDecl {
            name,
            name_span,
            bases,
            body,
            span: start.merge(self.cursor.previous_span()),
        })
    }

    fn parse_effect_stmt(&mut self) -> Result<EffectStmt, ParseError> {
        sdsl_stack::ensure_sufficient_stack(|| self.parse_effect_stmt_inner())
    }

    fn parse_effect_stmt_inner(&mut self) -> Result<EffectStmt, ParseError> {
        let start = self.cursor.current_span();
        let kind = match self.cursor.current_kind() {
            TokenKind::Mixin => {
                self.cursor.advance();
                let target = if self.cursor.eat(TokenKind::LParen) {
                    let (name, span) = self.cursor.expect_ident()?;
                    self.cursor.expect(TokenKind::RParen)?;
                    MixinTarget::Parameter(name, span)
                } else {
                    // `mixin compose X;` is accepted as a plain mixin.
                    self.cursor.eat(TokenKind::Compose);
                    let (name, span) = self.cursor.expect_ident()?;
                    MixinTarget::Named(name, span)
                };
                self.cursor.expect(TokenKind::Semi)?;
                EffectStmtKind::Mixin(target)
            }
            TokenKind::Compose => {
                self.cursor.advance();
                let (name, span) = self.cursor.expect_ident()?;
                self.cursor.expect(TokenKind::Semi)?;
                EffectStmtKind::Mixin(MixinTarget::Named(name, span))
            }
            TokenKind::Macro => {
                self.cursor.advance();
                let (name, _) = self.cursor.expect_ident()?;
                self.cursor.expect(TokenKind::Eq)?;
                let value = self.parse_expr()?;
                self.cursor.expect(TokenKind::Semi)?;
                EffectStmtKind::Macro { name, value }
            }
            TokenKind::If => {
                self.cursor.advance();
                self.cursor.expect(TokenKind::LParen)?;
                let cond = self.parse_expr()?;
                self.cursor.expect(TokenKind::RParen)?;
                let then = Box::new(self.parse_effect_stmt()?);
                let otherwise = if self.cursor.eat(TokenKind::Else) {
                    Some(Box::new(self.parse_effect_stmt()?))
                } else {
                    None
                };
                EffectStmtKind::If {
                    cond,
                    then,
                    otherwise,
                }
            }
            TokenKind::LBrace => {
                let open = self.cursor.advance().span;
                let mut stmts = Vec::new();
                while !self.cursor.check(TokenKind::RBrace) && !self.cursor.is_at_end() {
                    stmts.push(self.parse_effect_stmt()?);
                }
                self.expect_close_brace(open)?;
                EffectStmtKind::Block(stmts)
            }
            found => {
                return Err(ParseError::unexpected(
                    "`mixin`, `compose`, `macro`, `if` or `{`",
                    found,
                    start,
                ));
            }
        };
        Ok(EffectStmt {
            kind,
            span: start.merge(self.cursor.previous_span()),
        })
    }
}
