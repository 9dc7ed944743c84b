//! Statements and structured control flow.
//!
//! Every construct gets an explicit merge block:
//!
//! ```text
//! if:        SelectionMerge; BranchConditional then else
//! for/while: header (LoopMerge) -> condition -> body -> continue -> header
//! do/while:  header (LoopMerge) -> body -> continue (BranchConditional)
//! ```

use sdsl_diagnostic::ErrorCode;
use sdsl_ir::{ControlHint, ExprId, StmtId, StmtKind};
use sdsl_types::Type;

use super::function::{FunctionLowerer, LoopTargets};
use crate::builder::ConstValue;
use crate::instruction::{operands, Id};
use crate::op::{self, Op};

fn selection_control(hint: ControlHint) -> u32 {
    match hint {
        ControlHint::Flatten => op::SELECTION_CONTROL_FLATTEN,
        ControlHint::Branch => op::SELECTION_CONTROL_DONT_FLATTEN,
        _ => 0,
    }
}

fn loop_control(hint: ControlHint) -> u32 {
    match hint {
        ControlHint::Unroll => op::LOOP_CONTROL_UNROLL,
        ControlHint::Loop => op::LOOP_CONTROL_DONT_UNROLL,
        _ => 0,
    }
}

impl FunctionLowerer<'_, '_> {
    pub(super) fn lower_stmt(&mut self, id: StmtId) {
        let arena = self.arena();
        let stmt = arena.stmt(id);
        match &stmt.kind {
            StmtKind::Block(stmts) => self.lower_block(stmts),
            StmtKind::Expr(expr) => {
                self.eval(*expr);
            }
            StmtKind::Var(decls) => {
                for (index, decl) in decls.iter().enumerate() {
                    self.lower_declarator(id, index as u32, decl.init);
                }
            }
            StmtKind::If {
                cond,
                then,
                otherwise,
            } => self.lower_if(*cond, *then, *otherwise, stmt.hint),
            StmtKind::For {
                init,
                cond,
                step,
                body,
            } => {
                if let Some(init) = init {
                    self.lower_stmt(*init);
                }
                self.lower_loop(*cond, *step, *body, stmt.hint);
            }
            StmtKind::While { cond, body } => self.lower_loop(Some(*cond), None, *body, stmt.hint),
            StmtKind::DoWhile { body, cond } => self.lower_do_while(*body, *cond, stmt.hint),
            StmtKind::Return(value) => {
                let value = value.map(|v| {
                    let ty = self.return_ty.clone();
                    self.eval_as(v, &ty)
                });
                self.return_value(value);
            }
            StmtKind::Break | StmtKind::Continue => {
                let Some(targets) = self.loops.last().copied() else {
                    self.error(ErrorCode::E5003, stmt.span, "jump outside of a loop", "no enclosing loop");
                    return;
                };
                if matches!(stmt.kind, StmtKind::Break) {
                    self.branch(targets.merge);
                } else {
                    self.branch(targets.continue_target);
                }
            }
            StmtKind::Discard => self.kill(),
            StmtKind::Empty => {}
        }
    }

    /// Statements after a jump in the same list are rejected.
    fn lower_block(&mut self, stmts: &[StmtId]) {
        let arena = self.arena();
        let mut jumped = false;
        for &id in stmts {
            let stmt = arena.stmt(id);
            if matches!(stmt.kind, StmtKind::Empty) {
                continue;
            }
            if jumped {
                self.error(
                    ErrorCode::E5002,
                    stmt.span,
                    "unreachable code",
                    "statement follows a jump",
                );
                return;
            }
            self.lower_stmt(id);
            jumped = matches!(
                stmt.kind,
                StmtKind::Return(_) | StmtKind::Break | StmtKind::Continue | StmtKind::Discard
            );
        }
    }

    fn lower_declarator(&mut self, stmt: StmtId, index: u32, init: Option<ExprId>) {
        let Some(method) = self.method else {
            return;
        };
        let Some(&local) = method.declarators.get(&(stmt, index)) else {
            return;
        };
        let Some(info) = method.locals.get(local.0 as usize) else {
            return;
        };
        let name = self.em.name(info.name);
        let var = self.variable(&info.ty, Some(name));
        self.locals.insert(local, var);
        if let Some(init) = init {
            let value = self.eval_as(init, &info.ty);
            self.store_pointer(var, value);
        }
    }

    fn lower_if(&mut self, cond: ExprId, then: StmtId, otherwise: Option<StmtId>, hint: ControlHint) {
        let cond = self.eval_as(cond, &Type::BOOL);
        let merge = self.new_label();
        let then_label = self.new_label();
        let else_label = match otherwise {
            Some(_) => self.new_label(),
            None => merge,
        };
        self.emit_void(
            Op::SelectionMerge,
            operands![id merge, lit selection_control(hint)],
        );
        self.branch_conditional(cond, then_label, else_label);

        self.start_block(then_label);
        self.lower_stmt(then);
        if self.is_open() {
            self.branch(merge);
        }
        if let Some(otherwise) = otherwise {
            self.start_block(else_label);
            self.lower_stmt(otherwise);
            if self.is_open() {
                self.branch(merge);
            }
        }
        self.start_block(merge);
    }

    fn lower_loop(&mut self, cond: Option<ExprId>, step: Option<ExprId>, body: StmtId, hint: ControlHint) {
        let header = self.new_label();
        let check = self.new_label();
        let body_label = self.new_label();
        let continue_target = self.new_label();
        let merge = self.new_label();

        self.branch(header);
        self.start_block(header);
        self.emit_void(
            Op::LoopMerge,
            operands![id merge, id continue_target, lit loop_control(hint)],
        );
        self.branch(check);

        self.start_block(check);
        match cond.map(|c| self.eval_as(c, &Type::BOOL)) {
            Some(cond) if !self.is_true(cond) => self.branch_conditional(cond, body_label, merge),
            _ => self.branch(body_label),
        }

        self.start_block(body_label);
        self.loops.push(LoopTargets {
            merge,
            continue_target,
        });
        self.lower_stmt(body);
        self.loops.pop();
        if self.is_open() {
            self.branch(continue_target);
        }

        self.start_block(continue_target);
        if let Some(step) = step {
            self.eval(step);
        }
        self.branch(header);
        self.start_block(merge);
    }

    fn lower_do_while(&mut self, body: StmtId, cond: ExprId, hint: ControlHint) {
        let header = self.new_label();
        let body_label = self.new_label();
        let continue_target = self.new_label();
        let merge = self.new_label();

        self.branch(header);
        self.start_block(header);
        self.emit_void(
            Op::LoopMerge,
            operands![id merge, id continue_target, lit loop_control(hint)],
        );
        self.branch(body_label);

        self.start_block(body_label);
        self.loops.push(LoopTargets {
            merge,
            continue_target,
        });
        self.lower_stmt(body);
        self.loops.pop();
        if self.is_open() {
            self.branch(continue_target);
        }

        self.start_block(continue_target);
        let cond = self.eval_as(cond, &Type::BOOL);
        self.branch_conditional(cond, header, merge);
        self.start_block(merge);
    }

    /// Whether `value` is the constant `true`.
    fn is_true(&self, value: Id) -> bool {
        matches!(
            self.em.builder.const_value(value),
            Some((_, ConstValue::Bool(true)))
        )
    }
}
