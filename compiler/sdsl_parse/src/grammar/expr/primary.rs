//! Unary operators, casts, postfix operators and primary expressions.

use sdsl_diagnostic::ErrorCode;
use sdsl_ir::{ExprId, ExprKind, Literal, TokenKind, TypeExpr, UnaryOp};
use sdsl_stack::ensure_sufficient_stack;

use crate::grammar::is_builtin_type_name;
use crate::{ParseError, Parser};

impl Parser<'_> {
    pub(super) fn parse_unary(&mut self) -> Result<ExprId, ParseError> {
        let start = self.cursor.current_span();
        if let Some(op) = self.match_prefix_op() {
            self.cursor.advance();
            let operand = ensure_sufficient_stack(|| self.parse_unary())?;
            let span = start.merge(self.span_of(operand));
            return Ok(self.alloc(ExprKind::Unary { op, operand }, span));
        }
        if let Some(ty) = self.try_cast_prefix() {
            let operand = ensure_sufficient_stack(|| self.parse_unary())?;
            let span = start.merge(self.span_of(operand));
            return Ok(self.alloc(ExprKind::Cast { ty, operand }, span));
        }
        self.parse_postfix()
    }

    /// `'(' BuiltinType ')'`; only builtin type names form casts.
    fn try_cast_prefix(&mut self) -> Option<TypeExpr> {
        if !self.cursor.check(TokenKind::LParen) {
            return None;
        }
        let TokenKind::Ident(name) = self.cursor.peek_kind(1) else {
            return None;
        };
        if self.cursor.peek_kind(2) != TokenKind::RParen
            || !is_builtin_type_name(self.cursor.text(name))
        {
            return None;
        }
        self.cursor.advance();
        let span = self.cursor.advance().span;
        self.cursor.advance();
        Some(TypeExpr {
            name,
            arg: None,
            span,
        })
    }

    fn parse_postfix(&mut self) -> Result<ExprId, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            let start = self.span_of(expr);
            match self.cursor.current_kind() {
                TokenKind::LParen => {
                    self.cursor.advance();
                    let args = self.parse_call_args()?;
                    let span = start.merge(self.cursor.previous_span());
                    expr = self.alloc(ExprKind::Call { callee: expr, args }, span);
                }
                TokenKind::Dot => {
                    self.cursor.advance();
                    let (member, member_span) = self.cursor.expect_ident()?;
                    expr = self.alloc(
                        ExprKind::Member {
                            object: expr,
                            member,
                            member_span,
                        },
                        start.merge(member_span),
                    );
                }
                TokenKind::LBracket => {
                    self.cursor.advance();
                    let index = self.parse_expr()?;
                    self.cursor.expect(TokenKind::RBracket)?;
                    let span = start.merge(self.cursor.previous_span());
                    expr = self.alloc(ExprKind::Index { object: expr, index }, span);
                }
                TokenKind::PlusPlus | TokenKind::MinusMinus => {
                    let op = if self.cursor.advance().kind == TokenKind::PlusPlus {
                        UnaryOp::PostInc
                    } else {
                        UnaryOp::PostDec
                    };
                    let span = start.merge(self.cursor.previous_span());
                    expr = self.alloc(ExprKind::Unary { op, operand: expr }, span);
                }
                _ => return Ok(expr),
            }
        }
    }

    /// Arguments after an opening `(`, through the closing `)`.
    fn parse_call_args(&mut self) -> Result<Vec<ExprId>, ParseError> {
        let mut args = Vec::new();
        if self.cursor.eat(TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            if !self.cursor.eat(TokenKind::Comma) {
                break;
            }
        }
        self.cursor.expect(TokenKind::RParen)?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<ExprId, ParseError> {
        let span = self.cursor.current_span();
        let kind = match self.cursor.current_kind() {
            TokenKind::Int(v) => ExprKind::Literal(Literal::Int(v)),
            TokenKind::UInt(v) => ExprKind::Literal(Literal::UInt(v)),
            TokenKind::Float(bits) => ExprKind::Literal(Literal::Float(bits)),
            TokenKind::Str(name) => ExprKind::Literal(Literal::Str(name)),
            TokenKind::True => ExprKind::Literal(Literal::Bool(true)),
            TokenKind::False => ExprKind::Literal(Literal::Bool(false)),
            TokenKind::Ident(name) => ExprKind::Ident(name),
            TokenKind::LParen => {
                self.cursor.advance();
                let inner = self.parse_expr()?;
                self.cursor.expect(TokenKind::RParen)?;
                return Ok(inner);
            }
            TokenKind::Base | TokenKind::Streams | TokenKind::This => {
                let keyword = self.cursor.advance().kind;
                self.cursor.expect(TokenKind::Dot)?;
                let (name, name_span) = self.cursor.expect_ident()?;
                let kind = match keyword {
                    TokenKind::Base => ExprKind::Base(name),
                    TokenKind::Streams => ExprKind::Stream(name),
                    _ => ExprKind::Ident(name),
                };
                return Ok(self.alloc(kind, span.merge(name_span)));
            }
            found => {
                return Err(ParseError::new(
                    if found == TokenKind::Eof {
                        ErrorCode::E2003
                    } else {
                        ErrorCode::E2002
                    },
                    format!("expected expression, found {}", found.display_name()),
                    span,
                ));
            }
        };
        self.cursor.advance();
        Ok(self.alloc(kind, span))
    }
}
