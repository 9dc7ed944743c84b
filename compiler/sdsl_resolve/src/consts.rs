//! Integer constant expressions, used for array sizes.
//!
//! Operands are integer literals and `static const` fields; operators are
//! the integer arithmetic, shift and bitwise operators plus unary minus.

use sdsl_ir::{BinaryOp, ExprArena, ExprId, ExprKind, Literal, Name, Span, UnaryOp};

/// Nesting limit for constants defined in terms of other constants.
const MAX_DEPTH: u32 = 64;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) enum ConstError {
    /// The expression at this span is not an integer constant.
    NotConstant(Span),
    DivisionByZero(Span),
    /// Constants refer to each other in a loop.
    TooDeep(Span),
}

/// Looks up the initializer of a `static const` field by name.
pub(crate) trait ConstSource {
    fn constant(&self, name: Name) -> Option<(&ExprArena, ExprId)>;
}

pub(crate) fn eval_int(
    source: &dyn ConstSource,
    arena: &ExprArena,
    id: ExprId,
) -> Result<i64, ConstError> {
    eval(source, arena, id, 0)
}

fn eval(
    source: &dyn ConstSource,
    arena: &ExprArena,
    id: ExprId,
    depth: u32,
) -> Result<i64, ConstError> {
    let expr = arena.expr(id);
    if depth > MAX_DEPTH {
        return Err(ConstError::TooDeep(expr.span));
    }
    match &expr.kind {
        ExprKind::Literal(Literal::Int(v) | Literal::UInt(v)) => {
            i64::try_from(*v).map_err(|_| ConstError::NotConstant(expr.span))
        }
        ExprKind::Literal(Literal::Bool(b)) => Ok(i64::from(*b)),
        ExprKind::Ident(name) => {
            let (field_arena, init) = source
                .constant(*name)
                .ok_or(ConstError::NotConstant(expr.span))?;
            eval(source, field_arena, init, depth + 1)
        }
        ExprKind::Unary { op, operand } => {
            let value = eval(source, arena, *operand, depth + 1)?;
            match op {
                UnaryOp::Neg => Ok(value.wrapping_neg()),
                UnaryOp::Plus => Ok(value),
                UnaryOp::BitNot => Ok(!value),
                UnaryOp::Not => Ok(i64::from(value == 0)),
                _ => Err(ConstError::NotConstant(expr.span)),
            }
        }
        ExprKind::Binary { op, lhs, rhs } => {
            let l = eval(source, arena, *lhs, depth + 1)?;
            let r = eval(source, arena, *rhs, depth + 1)?;
            let value = match op {
                BinaryOp::Add => l.wrapping_add(r),
                BinaryOp::Sub => l.wrapping_sub(r),
                BinaryOp::Mul => l.wrapping_mul(r),
                BinaryOp::Div | BinaryOp::Rem if r == 0 => {
                    return Err(ConstError::DivisionByZero(expr.span));
                }
                BinaryOp::Div => l.wrapping_div(r),
                BinaryOp::Rem => l.wrapping_rem(r),
                BinaryOp::Shl => l.wrapping_shl(r as u32),
                BinaryOp::Shr => l.wrapping_shr(r as u32),
                BinaryOp::BitAnd => l & r,
                BinaryOp::BitOr => l | r,
                BinaryOp::BitXor => l ^ r,
                _ => return Err(ConstError::NotConstant(expr.span)),
            };
            Ok(value)
        }
        ExprKind::Ternary {
            cond,
            then,
            otherwise,
        } => {
            if eval(source, arena, *cond, depth + 1)? != 0 {
                eval(source, arena, *then, depth + 1)
            } else {
                eval(source, arena, *otherwise, depth + 1)
            }
        }
        _ => Err(ConstError::NotConstant(expr.span)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdsl_ir::{Expr, StringInterner};

    struct NoConstants;

    impl ConstSource for NoConstants {
        fn constant(&self, _: Name) -> Option<(&ExprArena, ExprId)> {
            None
        }
    }

    struct One<'a> {
        name: Name,
        arena: &'a ExprArena,
        init: ExprId,
    }

    impl ConstSource for One<'_> {
        fn constant(&self, name: Name) -> Option<(&ExprArena, ExprId)> {
            (name == self.name).then_some((self.arena, self.init))
        }
    }

    fn int(arena: &mut ExprArena, v: u64) -> ExprId {
        arena.alloc_expr(Expr::new(ExprKind::Literal(Literal::Int(v)), Span::DUMMY))
    }

    #[test]
    fn test_arithmetic() {
        let mut arena = ExprArena::new();
        let (a, b) = (int(&mut arena, 3), int(&mut arena, 4));
        let mul = arena.alloc_expr(Expr::new(
            ExprKind::Binary {
                op: BinaryOp::Mul,
                lhs: a,
                rhs: b,
            },
            Span::DUMMY,
        ));
        assert_eq!(eval_int(&NoConstants, &arena, mul), Ok(12));
    }

    #[test]
    fn test_named_constant() {
        let interner = StringInterner::new();
        let count = interner.intern("Count");
        let mut arena = ExprArena::new();
        let init = int(&mut arena, 8);
        let reference = arena.alloc_expr(Expr::new(ExprKind::Ident(count), Span::new(5, 10)));
        let source = One {
            name: count,
            arena: &arena,
            init,
        };
        assert_eq!(eval_int(&source, &arena, reference), Ok(8));

        let other = arena.alloc_expr(Expr::new(
            ExprKind::Ident(interner.intern("Other")),
            Span::new(1, 2),
        ));
        let source = One {
            name: count,
            arena: &arena,
            init,
        };
        assert_eq!(
            eval_int(&source, &arena, other),
            Err(ConstError::NotConstant(Span::new(1, 2)))
        );
    }

    #[test]
    fn test_self_reference_is_too_deep() {
        let interner = StringInterner::new();
        let n = interner.intern("N");
        let mut arena = ExprArena::new();
        let reference = arena.alloc_expr(Expr::new(ExprKind::Ident(n), Span::new(0, 1)));
        let source = One {
            name: n,
            arena: &arena,
            init: reference,
        };
        assert_eq!(
            eval_int(&source, &arena, reference),
            Err(ConstError::TooDeep(Span::new(0, 1)))
        );
    }

    #[test]
    fn test_division_by_zero() {
        let mut arena = ExprArena::new();
        let (a, b) = (int(&mut arena, 1), int(&mut arena, 0));
        let div = arena.alloc_expr(Expr::new(
            ExprKind::Binary {
                op: BinaryOp::Div,
                lhs: a,
                rhs: b,
            },
            Span::new(0, 5),
        ));
        assert_eq!(
            eval_int(&NoConstants, &arena, div),
            Err(ConstError::DivisionByZero(Span::new(0, 5)))
        );
    }
}
