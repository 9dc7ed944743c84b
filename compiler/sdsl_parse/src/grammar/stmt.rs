//! Statements.

use sdsl_ir::{ControlHint, Stmt, StmtId, StmtKind, TokenKind, VarDecl};

use crate::{ParseError, ParseOutcome, Parser};

impl Parser<'_> {
    /// `'{' stmt* '}'` with per-statement recovery.
    pub(crate) fn parse_block(&mut self) -> Result<StmtId, ParseError> {
        let open = self.cursor.expect(TokenKind::LBrace)?.span;
        let mut stmts = Vec::new();
        while !self.cursor.check(TokenKind::RBrace) && !self.cursor.is_at_end() {
            let before = self.cursor.position();
            match self.parse_stmt() {
                Ok(stmt) => stmts.push(stmt),
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
        let span = open.merge(self.cursor.previous_span());
        Ok(self.arena.alloc_stmt(Stmt::new(StmtKind::Block(stmts), span)))
    }

    pub(crate) fn parse_stmt(&mut self) -> Result<StmtId, ParseError> {
        sdsl_stack::ensure_sufficient_stack(|| self.parse_stmt_inner())
    }

    fn parse_stmt_inner(&mut self) -> Result<StmtId, ParseError> {
        let start = self.cursor.current_span();
        let hint = self.parse_control_hint()?;

        let kind = match self.cursor.current_kind() {
            TokenKind::LBrace => {
                let block = self.parse_block()?;
                if hint != ControlHint::None {
                    self.arena.stmt_mut(block).hint = hint;
                }
                return Ok(block);
            }
            TokenKind::If => {
                self.cursor.advance();
                self.cursor.expect(TokenKind::LParen)?;
                let cond = self.parse_expr()?;
                self.cursor.expect(TokenKind::RParen)?;
                let then = self.parse_stmt()?;
                let otherwise = if self.cursor.eat(TokenKind::Else) {
                    Some(self.parse_stmt()?)
                } else {
                    None
                };
                StmtKind::If {
                    cond,
                    then,
                    otherwise,
                }
            }
            TokenKind::For => {
                self.cursor.advance();
                self.cursor.expect(TokenKind::LParen)?;
                let init = if self.cursor.eat(TokenKind::Semi) {
                    None
                } else {
                    Some(self.parse_simple_stmt()?)
                };
                let cond = if self.cursor.check(TokenKind::Semi) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.cursor.expect(TokenKind::Semi)?;
                let step = if self.cursor.check(TokenKind::RParen) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.cursor.expect(TokenKind::RParen)?;
                let body = self.parse_stmt()?;
                StmtKind::For {
                    init,
                    cond,
                    step,
                    body,
                }
            }
            TokenKind::While => {
                self.cursor.advance();
                self.cursor.expect(TokenKind::LParen)?;
                let cond = self.parse_expr()?;
                self.cursor.expect(TokenKind::RParen)?;
                let body = self.parse_stmt()?;
                StmtKind::While { cond, body }
            }
            TokenKind::Do => {
                self.cursor.advance();
                let body = self.parse_stmt()?;
                self.cursor.expect(TokenKind::While)?;
                self.cursor.expect(TokenKind::LParen)?;
                let cond = self.parse_expr()?;
                self.cursor.expect(TokenKind::RParen)?;
                self.cursor.expect(TokenKind::Semi)?;
                StmtKind::DoWhile { body, cond }
            }
            TokenKind::Return => {
                self.cursor.advance();
                let value = if self.cursor.check(TokenKind::Semi) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.cursor.expect(TokenKind::Semi)?;
                StmtKind::Return(value)
            }
            TokenKind::Break | TokenKind::Continue | TokenKind::Discard => {
                let kind = match self.cursor.advance().kind {
                    TokenKind::Break => StmtKind::Break,
                    TokenKind::Continue => StmtKind::Continue,
                    _ => StmtKind::Discard,
                };
                self.cursor.expect(TokenKind::Semi)?;
                kind
            }
            TokenKind::Semi => {
                self.cursor.advance();
                StmtKind::Empty
            }
            _ => return self.parse_simple_stmt_with_hint(hint),
        };

        let span = start.merge(self.cursor.previous_span());
        let mut stmt = Stmt::new(kind, span);
        stmt.hint = hint;
        Ok(self.arena.alloc_stmt(stmt))
    }

    fn parse_simple_stmt_with_hint(&mut self, hint: ControlHint) -> Result<StmtId, ParseError> {
        let id = self.parse_simple_stmt()?;
        if hint != ControlHint::None {
            self.arena.stmt_mut(id).hint = hint;
        }
        Ok(id)
    }

    /// A local declaration or an expression statement, both ending in `;`.
    fn parse_simple_stmt(&mut self) -> Result<StmtId, ParseError> {
        let start = self.cursor.current_span();
        match self.try_local_decl() {
            ParseOutcome::ConsumedOk { value } | ParseOutcome::EmptyOk { value } => {
                let span = start.merge(self.cursor.previous_span());
                Ok(self.arena.alloc_stmt(Stmt::new(StmtKind::Var(value), span)))
            }
            ParseOutcome::ConsumedErr { error, .. } => Err(error),
            ParseOutcome::EmptyErr { .. } => {
                let expr = self.parse_expr()?;
                self.cursor.expect(TokenKind::Semi)?;
                let span = start.merge(self.cursor.previous_span());
                Ok(self.arena.alloc_stmt(Stmt::new(StmtKind::Expr(expr), span)))
            }
        }
    }

    /// `'static'? 'const'? type declarator (',' declarator)* ';'`
    ///
    /// Declarations are recognised by `Ident Ident` or `Ident '<' Ident '>'
    /// Ident`; anything else is left for expression parsing.
    fn try_local_decl(&mut self) -> ParseOutcome<Vec<VarDecl>> {
        let starts_with_modifier = matches!(
            self.cursor.current_kind(),
            TokenKind::Const | TokenKind::Static
        );
        if !starts_with_modifier && !self.looks_like_local_decl() {
            return ParseOutcome::empty_err("declaration", self.cursor.position());
        }
        let start = self.cursor.current_span();
        let result = self.local_decl_rest();
        ParseOutcome::committed(result, start)
    }

    fn looks_like_local_decl(&mut self) -> bool {
        self.look_ahead(|p| {
            if !p.cursor.check_ident() {
                return false;
            }
            p.cursor.advance();
            if p.cursor.eat(TokenKind::Lt) {
                if !p.cursor.check_ident() {
                    return false;
                }
                p.cursor.advance();
                if !p.cursor.eat(TokenKind::Gt) {
                    return false;
                }
            }
            p.cursor.check_ident()
        })
    }

    fn local_decl_rest(&mut self) -> Result<Vec<VarDecl>, ParseError> {
        let start = self.cursor.current_span();
        let mut is_const = false;
        while matches!(
            self.cursor.current_kind(),
            TokenKind::Const | TokenKind::Static
        ) {
            is_const |= self.cursor.advance().kind == TokenKind::Const;
        }
        let ty = self.expect_type()?;
        let mut decls = Vec::new();
        loop {
            let (name, name_span) = self.cursor.expect_ident()?;
            let array = self.parse_array_suffix()?;
            let init = if self.cursor.eat(TokenKind::Eq) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            decls.push(VarDecl {
                is_const,
                ty,
                name,
                name_span,
                array,
                init,
                span: start.merge(self.cursor.previous_span()),
            });
            if !self.cursor.eat(TokenKind::Comma) {
                break;
            }
        }
        self.cursor.expect(TokenKind::Semi)?;
        Ok(decls)
    }

    /// Statement attributes such as `[unroll]` or `[branch]`. Unknown
    /// attributes are accepted and ignored.
    fn parse_control_hint(&mut self) -> Result<ControlHint, ParseError> {
        let mut hint = ControlHint::None;
        for attribute in self.parse_attributes()? {
            hint = match self.cursor.text(attribute.name) {
                "unroll" => ControlHint::Unroll,
                "loop" => ControlHint::Loop,
                "branch" => ControlHint::Branch,
                "flatten" => ControlHint::Flatten,
                _ => hint,
            };
        }
        Ok(hint)
    }
}
