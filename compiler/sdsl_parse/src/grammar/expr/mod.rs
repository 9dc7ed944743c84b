//! Expression parsing.
//!
//! - `mod.rs`: entry point, assignment, ternary, binary precedence climbing
//! - `operators.rs`: operator matching helpers
//! - `primary.rs`: unary, casts, postfix operators and primaries

mod operators;
mod primary;

use sdsl_ir::{Expr, ExprId, ExprKind, TokenKind};
use sdsl_stack::ensure_sufficient_stack;

use crate::{ParseError, Parser};
use operators::MIN_BINARY_PREC;

impl Parser<'_> {
    /// Parse an expression, including assignment.
    pub(crate) fn parse_expr(&mut self) -> Result<ExprId, ParseError> {
        ensure_sufficient_stack(|| self.parse_assignment())
    }

    /// Assignment is right associative.
    fn parse_assignment(&mut self) -> Result<ExprId, ParseError> {
        let target = self.parse_ternary()?;
        let Some(op) = self.match_assign_op() else {
            return Ok(target);
        };
        self.cursor.advance();
        let value = self.parse_expr()?;
        let span = self.span_of(target).merge(self.span_of(value));
        Ok(self.alloc(ExprKind::Assign { op, target, value }, span))
    }

    fn parse_ternary(&mut self) -> Result<ExprId, ParseError> {
        let cond = self.parse_binary(MIN_BINARY_PREC)?;
        if !self.cursor.eat(TokenKind::Question) {
            return Ok(cond);
        }
        let then = self.parse_expr()?;
        self.cursor.expect(TokenKind::Colon)?;
        let otherwise = ensure_sufficient_stack(|| self.parse_ternary())?;
        let span = self.span_of(cond).merge(self.span_of(otherwise));
        Ok(self.alloc(
            ExprKind::Ternary {
                cond,
                then,
                otherwise,
            },
            span,
        ))
    }

    /// Precedence climbing over left-associative binary operators.
    fn parse_binary(&mut self, min_prec: u8) -> Result<ExprId, ParseError> {
        let mut lhs = self.parse_unary()?;
        while let Some((op, prec)) = self.match_binary_op() {
            if prec < min_prec {
                break;
            }
            self.cursor.advance();
            let rhs = ensure_sufficient_stack(|| self.parse_binary(prec + 1))?;
            let span = self.span_of(lhs).merge(self.span_of(rhs));
            lhs = self.alloc(ExprKind::Binary { op, lhs, rhs }, span);
        }
        Ok(lhs)
    }

    #[inline]
    pub(crate) fn span_of(&self, id: ExprId) -> sdsl_ir::Span {
        self.arena.expr(id).span
    }

    #[inline]
    pub(crate) fn alloc(&mut self, kind: ExprKind, span: sdsl_ir::Span) -> ExprId {
        self.arena.alloc_expr(Expr::new(kind, span))
    }
}
