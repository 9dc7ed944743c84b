//! Statement checking.

use rustc_hash::FxHashSet;
use sdsl_diagnostic::ErrorCode;
use sdsl_ir::{ExprArena, ExprId, Name, Span, StmtId, StmtKind, VarDecl};
use sdsl_stack::ensure_sufficient_stack;
use sdsl_types::Type;

use super::MixinChecker;
use crate::{Binding, LocalId, LocalInfo};

/// Collect the name of every local declared in `stmt` and its children.
pub(super) fn collect_declared(arena: &ExprArena, stmt: StmtId, out: &mut FxHashSet<Name>) {
    ensure_sufficient_stack(|| match &arena.stmt(stmt).kind {
        StmtKind::Var(decls) => out.extend(decls.iter().map(|d| d.name)),
        StmtKind::Block(stmts) => {
            for s in stmts {
                collect_declared(arena, *s, out);
            }
        }
        StmtKind::If {
            then, otherwise, ..
        } => {
            collect_declared(arena, *then, out);
            if let Some(otherwise) = otherwise {
                collect_declared(arena, *otherwise, out);
            }
        }
        StmtKind::For { init, body, .. } => {
            if let Some(init) = init {
                collect_declared(arena, *init, out);
            }
            collect_declared(arena, *body, out);
        }
        StmtKind::While { body, .. } | StmtKind::DoWhile { body, .. } => {
            collect_declared(arena, *body, out);
        }
        StmtKind::Expr(_)
        | StmtKind::Return(_)
        | StmtKind::Break
        | StmtKind::Continue
        | StmtKind::Discard
        | StmtKind::Empty => {}
    });
}

impl MixinChecker<'_> {
    pub(super) fn check_stmt(&mut self, id: StmtId) {
        ensure_sufficient_stack(|| self.check_stmt_inner(id));
    }

    fn check_stmt_inner(&mut self, id: StmtId) {
        let stmt = self.arena.stmt(id);
        match &stmt.kind {
            StmtKind::Block(stmts) => {
                self.push_scope();
                for s in stmts {
                    self.check_stmt(*s);
                }
                self.pop_scope();
            }
            StmtKind::Expr(expr) => {
                self.check_expr(*expr);
            }
            StmtKind::Var(decls) => {
                for (index, decl) in decls.iter().enumerate() {
                    self.check_var(id, index as u32, decl);
                }
            }
            StmtKind::If {
                cond,
                then,
                otherwise,
            } => {
                self.check_condition(*cond);
                self.check_nested(*then);
                if let Some(otherwise) = otherwise {
                    self.check_nested(*otherwise);
                }
            }
            StmtKind::For {
                init,
                cond,
                step,
                body,
            } => {
                self.push_scope();
                if let Some(init) = init {
                    self.check_stmt(*init);
                }
                if let Some(cond) = cond {
                    self.check_condition(*cond);
                }
                if let Some(step) = step {
                    self.check_expr(*step);
                }
                self.check_loop_body(*body);
                self.pop_scope();
            }
            StmtKind::While { cond, body } => {
                self.check_condition(*cond);
                self.check_loop_body(*body);
            }
            StmtKind::DoWhile { body, cond } => {
                self.check_loop_body(*body);
                self.check_condition(*cond);
            }
            StmtKind::Return(value) => self.check_return(stmt.span, *value),
            StmtKind::Break | StmtKind::Continue => {
                let in_loop = self.func.as_ref().is_some_and(|f| f.loop_depth > 0);
                if !in_loop {
                    let keyword = if matches!(stmt.kind, StmtKind::Break) {
                        "break"
                    } else {
                        "continue"
                    };
                    self.error(
                        ErrorCode::E3013,
                        stmt.span,
                        format!("`{keyword}` outside of a loop"),
                        "not inside a loop",
                    );
                }
            }
            StmtKind::Discard | StmtKind::Empty => {}
        }
    }

    fn push_scope(&mut self) {
        if let Some(func) = &mut self.func {
            func.scopes.push();
        }
    }

    fn pop_scope(&mut self) {
        if let Some(func) = &mut self.func {
            func.scopes.pop();
        }
    }

    /// A branch or loop body gets its own scope even without braces.
    fn check_nested(&mut self, id: StmtId) {
        self.push_scope();
        self.check_stmt(id);
        self.pop_scope();
    }

    fn check_loop_body(&mut self, body: StmtId) {
        if let Some(func) = &mut self.func {
            func.loop_depth += 1;
        }
        self.check_nested(body);
        if let Some(func) = &mut self.func {
            func.loop_depth -= 1;
        }
    }

    pub(super) fn check_condition(&mut self, cond: ExprId) {
        let ty = self.check_expr(cond);
        if !ty.is_scalar() && !ty.is_error() {
            let message = format!("condition must be a scalar, found `{}`", self.show(&ty));
            let span = self.arena.expr(cond).span;
            self.error(ErrorCode::E3001, span, message, "expected a scalar");
        }
    }

    fn check_var(&mut self, stmt: StmtId, index: u32, decl: &VarDecl) {
        let ty = self.resolve_type(&decl.ty, decl.array);
        if ty == Type::Void {
            self.error(
                ErrorCode::E3001,
                decl.ty.span,
                format!("variable `{}` cannot be void", self.name(decl.name)),
                "void variable",
            );
        }
        // The initializer sees the scope before the declaration.
        if let Some(init) = decl.init {
            let found = self.check_expr(init);
            self.expect_convertible(init, &found, &ty);
        }

        let Some(func) = &mut self.func else {
            return;
        };
        let local = LocalId(func.locals.len() as u32);
        func.locals.push(LocalInfo {
            name: decl.name,
            ty,
            is_const: decl.is_const,
            span: decl.name_span,
        });
        func.declarators.insert((stmt, index), local);
        if !func.scopes.declare(decl.name, Binding::Local(local)) {
            self.error(
                ErrorCode::E3005,
                decl.name_span,
                format!(
                    "`{}` is already declared in this scope",
                    self.name(decl.name)
                ),
                "declared again here",
            );
        }
    }

    fn check_return(&mut self, span: Span, value: Option<ExprId>) {
        let Some(expected) = self.func.as_ref().map(|f| f.return_ty.clone()) else {
            return;
        };
        match value {
            Some(value) => {
                let found = self.check_expr(value);
                if expected == Type::Void {
                    let span = self.arena.expr(value).span;
                    self.error(
                        ErrorCode::E3001,
                        span,
                        "a void method cannot return a value",
                        "unexpected value",
                    );
                } else {
                    self.expect_convertible(value, &found, &expected);
                }
            }
            None if expected != Type::Void && !expected.is_error() => {
                let message = format!("expected a return value of type `{}`", self.show(&expected));
                self.error(ErrorCode::E3001, span, message, "missing value");
            }
            None => {}
        }
    }
}
