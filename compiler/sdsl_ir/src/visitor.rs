//! AST visitor.
//!
//! Default `visit_*` implementations call the matching `walk_*` function,
//! which visits children in source order. Override `visit_*` to observe a
//! node and call `walk_*` to keep descending.
//!
//! ```text
//! struct CountCalls { count: usize }
//!
//! impl<'ast> Visitor<'ast> for CountCalls {
//!     fn visit_expr(&mut self, id: ExprId, arena: &'ast ExprArena) {
//!         if matches!(arena.expr(id).kind, ExprKind::Call { .. }) {
//!             self.count += 1;
//!         }
//!         walk_expr(self, id, arena);
//!     }
//! }
//! ```

use crate::{ExprArena, ExprId, ExprKind, StmtId, StmtKind};

pub trait Visitor<'ast> {
    fn visit_expr(&mut self, id: ExprId, arena: &'ast ExprArena) {
        walk_expr(self, id, arena);
    }

    fn visit_stmt(&mut self, id: StmtId, arena: &'ast ExprArena) {
        walk_stmt(self, id, arena);
    }
}

/// Visit every child expression of `id`.
pub fn walk_expr<'ast, V: Visitor<'ast> + ?Sized>(
    visitor: &mut V,
    id: ExprId,
    arena: &'ast ExprArena,
) {
    match &arena.expr(id).kind {
        ExprKind::Literal(_)
        | ExprKind::Ident(_)
        | ExprKind::Stream(_)
        | ExprKind::Base(_)
        | ExprKind::Error => {}
        ExprKind::Member { object, .. } => visitor.visit_expr(*object, arena),
        ExprKind::Index { object, index } => {
            visitor.visit_expr(*object, arena);
            visitor.visit_expr(*index, arena);
        }
        ExprKind::Call { callee, args } => {
            visitor.visit_expr(*callee, arena);
            for arg in args {
                visitor.visit_expr(*arg, arena);
            }
        }
        ExprKind::Cast { operand, .. } | ExprKind::Unary { operand, .. } => {
            visitor.visit_expr(*operand, arena);
        }
        ExprKind::Binary { lhs, rhs, .. } => {
            visitor.visit_expr(*lhs, arena);
            visitor.visit_expr(*rhs, arena);
        }
        ExprKind::Ternary {
            cond,
            then,
            otherwise,
        } => {
            visitor.visit_expr(*cond, arena);
            visitor.visit_expr(*then, arena);
            visitor.visit_expr(*otherwise, arena);
        }
        ExprKind::Assign { target, value, .. } => {
            visitor.visit_expr(*target, arena);
            visitor.visit_expr(*value, arena);
        }
    }
}

/// Visit every child statement and expression of `id`.
pub fn walk_stmt<'ast, V: Visitor<'ast> + ?Sized>(
    visitor: &mut V,
    id: StmtId,
    arena: &'ast ExprArena,
) {
    match &arena.stmt(id).kind {
        StmtKind::Block(stmts) => {
            for stmt in stmts {
                visitor.visit_stmt(*stmt, arena);
            }
        }
        StmtKind::Expr(expr) => visitor.visit_expr(*expr, arena),
        StmtKind::Var(decls) => {
            for decl in decls {
                if let Some(array) = decl.array {
                    visitor.visit_expr(array, arena);
                }
                if let Some(init) = decl.init {
                    visitor.visit_expr(init, arena);
                }
            }
        }
        StmtKind::If {
            cond,
            then,
            otherwise,
        } => {
            visitor.visit_expr(*cond, arena);
            visitor.visit_stmt(*then, arena);
            if let Some(otherwise) = otherwise {
                visitor.visit_stmt(*otherwise, arena);
            }
        }
        StmtKind::For {
            init,
            cond,
            step,
            body,
        } => {
            if let Some(init) = init {
                visitor.visit_stmt(*init, arena);
            }
            if let Some(cond) = cond {
                visitor.visit_expr(*cond, arena);
            }
            if let Some(step) = step {
                visitor.visit_expr(*step, arena);
            }
            visitor.visit_stmt(*body, arena);
        }
        StmtKind::While { cond, body } => {
            visitor.visit_expr(*cond, arena);
            visitor.visit_stmt(*body, arena);
        }
        StmtKind::DoWhile { body, cond } => {
            visitor.visit_stmt(*body, arena);
            visitor.visit_expr(*cond, arena);
        }
        StmtKind::Return(value) => {
            if let Some(value) = value {
                visitor.visit_expr(*value, arena);
            }
        }
        StmtKind::Break | StmtKind::Continue | StmtKind::Discard | StmtKind::Empty => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BinaryOp, Expr, Literal, Span, Stmt};

    struct CountLiterals {
        count: usize,
    }

    impl<'ast> Visitor<'ast> for CountLiterals {
        fn visit_expr(&mut self, id: ExprId, arena: &'ast ExprArena) {
            if matches!(arena.expr(id).kind, ExprKind::Literal(_)) {
                self.count += 1;
            }
            walk_expr(self, id, arena);
        }
    }

    #[test]
    fn test_walk_reaches_nested_literals() {
        let mut arena = ExprArena::new();
        let one = arena.alloc_expr(Expr::new(ExprKind::Literal(Literal::Int(1)), Span::DUMMY));
        let two = arena.alloc_expr(Expr::new(ExprKind::Literal(Literal::Int(2)), Span::DUMMY));
        let sum = arena.alloc_expr(Expr::new(
            ExprKind::Binary {
                op: BinaryOp::Add,
                lhs: one,
                rhs: two,
            },
            Span::DUMMY,
        ));
        let ret = arena.alloc_stmt(Stmt::new(StmtKind::Return(Some(sum)), Span::DUMMY));
        let block = arena.alloc_stmt(Stmt::new(StmtKind::Block(vec![ret]), Span::DUMMY));

        let mut counter = CountLiterals { count: 0 };
        counter.visit_stmt(block, &arena);
        assert_eq!(counter.count, 2);
    }
}
