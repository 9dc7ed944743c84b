//! Expression lowering.

use sdsl_diagnostic::ErrorCode;
use sdsl_ir::{AssignOp, BinaryOp, ExprId, ExprKind, Literal, Span, UnaryOp};
use sdsl_resolve::Callee;
use sdsl_stack::ensure_sufficient_stack;
use sdsl_types::{ops, ScalarType, Type};
use smallvec::SmallVec;

use super::function::FunctionLowerer;
use crate::instruction::{operands, Id, Operand};
use crate::op::Op;

impl<'a> FunctionLowerer<'_, 'a> {
    #[inline]
    pub(super) fn ty(&self, id: ExprId) -> &'a Type {
        self.mixin().info.ty(id)
    }

    fn span(&self, id: ExprId) -> Span {
        self.arena().expr(id).span
    }

    /// Evaluate an expression and convert it to `target`.
    pub(super) fn eval_as(&mut self, id: ExprId, target: &Type) -> Id {
        let value = self.eval(id);
        let from = self.ty(id).clone();
        self.convert(value, &from, target)
    }

    /// Evaluate an expression to a value of its own type.
    pub(super) fn eval(&mut self, id: ExprId) -> Id {
        ensure_sufficient_stack(|| self.eval_inner(id))
    }

    fn eval_inner(&mut self, id: ExprId) -> Id {
        let arena = self.arena();
        let expr = arena.expr(id);
        match &expr.kind {
            ExprKind::Literal(literal) => self.literal(id, *literal),
            ExprKind::Ident(_)
            | ExprKind::Stream(_)
            | ExprKind::Member { .. }
            | ExprKind::Index { .. } => {
                let place = self.place(id);
                self.load(place)
            }
            ExprKind::Call { callee, args } => self.lower_call(id, *callee, args),
            ExprKind::Cast { operand, .. } => {
                let value = self.eval(*operand);
                let from = self.ty(*operand).clone();
                let to = self.ty(id).clone();
                self.cast(value, &from, &to, expr.span)
            }
            ExprKind::Unary { op, operand } => self.lower_unary(id, *op, *operand),
            ExprKind::Binary { op, lhs, rhs } => self.lower_binary(id, *op, *lhs, *rhs),
            ExprKind::Ternary {
                cond,
                then,
                otherwise,
            } => self.lower_ternary(id, *cond, *then, *otherwise),
            ExprKind::Assign { op, target, value } => self.lower_assign(*op, *target, *value, expr.span),
            ExprKind::Base(_) | ExprKind::Error => {
                self.error(
                    ErrorCode::E9002,
                    expr.span,
                    "expression has no value",
                    "here",
                );
                Id::NONE
            }
        }
    }

    fn literal(&mut self, id: ExprId, literal: Literal) -> Id {
        let ty = self.ty(id).clone();
        let scalar = ty.scalar().unwrap_or(ScalarType::Int);
        let value = match literal {
            Literal::Bool(value) => self.em.const_bool(value),
            Literal::Int(value) | Literal::UInt(value) => match scalar {
                ScalarType::Float => self.em.const_float(value as f32),
                ScalarType::UInt => self.em.const_uint(value as u32),
                ScalarType::Bool => self.em.const_bool(value != 0),
                ScalarType::Int => self.em.const_int(value as i32),
            },
            Literal::Float(bits) => {
                let value = f64::from_bits(bits);
                match scalar {
                    ScalarType::Int => self.em.const_int(value as i32),
                    ScalarType::UInt => self.em.const_uint(value as u32),
                    ScalarType::Bool => self.em.const_bool(value != 0.0),
                    ScalarType::Float => self.em.const_float(value as f32),
                }
            }
            Literal::Str(_) => {
                let span = self.span(id);
                self.error(
                    ErrorCode::E5003,
                    span,
                    "string literals cannot appear in shader code",
                    "string literal",
                );
                return Id::NONE;
            }
        };
        self.em.const_splat(value, &ty)
    }

    fn lower_unary(&mut self, id: ExprId, op: UnaryOp, operand: ExprId) -> Id {
        let operand_ty = self.ty(operand).clone();
        let Some(typing) = ops::unary(op, &operand_ty) else {
            let span = self.span(id);
            self.error(ErrorCode::E9002, span, "operator was not type checked", "here");
            return Id::NONE;
        };
        if op.is_mutating() {
            let span = self.span(id);
            let place = self.place(operand);
            let old = self.load(place.clone());
            let one = self.em.one(&operand_ty);
            let binary = match op {
                UnaryOp::PreInc | UnaryOp::PostInc => BinaryOp::Add,
                _ => BinaryOp::Sub,
            };
            let new = self.binary_op(binary, &operand_ty, old, one);
            self.store(place, new, span);
            return match op {
                UnaryOp::PreInc | UnaryOp::PreDec => new,
                _ => old,
            };
        }

        let value = self.eval_as(operand, &typing.operand);
        let ty = typing.result.clone();
        match op {
            UnaryOp::Plus => value,
            UnaryOp::Neg => self.map_columns(&ty, &[value], |this, column_ty, args| {
                let ty_id = this.em.lower_type(column_ty);
                let negate = if column_ty.scalar() == Some(ScalarType::Float) {
                    Op::FNegate
                } else {
                    Op::SNegate
                };
                this.emit(negate, ty_id, operands![id args[0]])
            }),
            UnaryOp::Not => {
                let ty_id = self.em.lower_type(&ty);
                self.emit(Op::LogicalNot, ty_id, operands![id value])
            }
            UnaryOp::BitNot => {
                let ty_id = self.em.lower_type(&ty);
                self.emit(Op::Not, ty_id, operands![id value])
            }
            UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec => value,
        }
    }

    fn lower_binary(&mut self, id: ExprId, op: BinaryOp, lhs: ExprId, rhs: ExprId) -> Id {
        let lhs_ty = self.ty(lhs).clone();
        let rhs_ty = self.ty(rhs).clone();
        let Some(typing) = ops::binary(op, &lhs_ty, &rhs_ty) else {
            let span = self.span(id);
            self.error(ErrorCode::E9002, span, "operator was not type checked", "here");
            return Id::NONE;
        };

        // Float vector or matrix scaled by a scalar.
        if op == BinaryOp::Mul && typing.operand.scalar() == Some(ScalarType::Float) {
            let scalar_left = match (&lhs_ty, &rhs_ty) {
                (Type::Scalar(_), Type::Vector(..) | Type::Matrix { .. }) => Some(true),
                (Type::Vector(..) | Type::Matrix { .. }, Type::Scalar(_)) => Some(false),
                _ => None,
            };
            if let Some(scalar_left) = scalar_left {
                let float = Type::FLOAT;
                let (lhs_target, rhs_target) = if scalar_left {
                    (&float, &typing.operand)
                } else {
                    (&typing.operand, &float)
                };
                let l = self.eval_as(lhs, lhs_target);
                let r = self.eval_as(rhs, rhs_target);
                let (composite, scalar) = if scalar_left { (r, l) } else { (l, r) };
                let op = if matches!(typing.operand, Type::Matrix { .. }) {
                    Op::MatrixTimesScalar
                } else {
                    Op::VectorTimesScalar
                };
                let ty_id = self.em.lower_type(&typing.result);
                return self.emit(op, ty_id, operands![id composite, id scalar]);
            }
        }

        let l = self.eval_as(lhs, &typing.operand);
        let r = self.eval_as(rhs, &typing.operand);
        if matches!(typing.operand, Type::Matrix { .. }) && typing.result.scalar() == Some(ScalarType::Bool) {
            let span = self.span(id);
            self.error(
                ErrorCode::E5003,
                span,
                format!("operator `{}` on matrices is not supported", op.as_str()),
                "matrix comparison",
            );
            return Id::NONE;
        }
        self.binary_op(op, &typing.operand, l, r)
    }

    /// Apply `op` to two values of type `operand`. Relational operators on
    /// booleans compare them as integers.
    pub(super) fn binary_op(&mut self, op: BinaryOp, operand: &Type, l: Id, r: Id) -> Id {
        if matches!(operand, Type::Matrix { .. }) {
            return self.map_columns(operand, &[l, r], |this, column_ty, args| {
                this.binary_op(op, column_ty, args[0], args[1])
            });
        }
        let scalar = operand.scalar().unwrap_or(ScalarType::Float);
        let relational = matches!(op, BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq);
        if scalar == ScalarType::Bool && relational {
            let int = operand.with_scalar(ScalarType::Int);
            let l = self.convert(l, operand, &int);
            let r = self.convert(r, operand, &int);
            return self.binary_op(op, &int, l, r);
        }

        let result = if op.is_comparison() {
            operand.with_scalar(ScalarType::Bool)
        } else {
            operand.clone()
        };
        let instruction = binary_instruction(op, scalar);
        let ty_id = self.em.lower_type(&result);
        self.emit(instruction, ty_id, operands![id l, id r])
    }

    /// Apply `f` column by column to matrix operands, or once to anything
    /// else.
    pub(super) fn map_columns(
        &mut self,
        ty: &Type,
        args: &[Id],
        mut f: impl FnMut(&mut Self, &Type, &[Id]) -> Id,
    ) -> Id {
        let Type::Matrix { scalar, rows, cols } = *ty else {
            return f(self, ty, args);
        };
        let column_ty = Type::vector(scalar, rows);
        let column_id = self.em.lower_type(&column_ty);
        let mut columns = SmallVec::<[Operand; 4]>::new();
        for c in 0..u32::from(cols) {
            let parts: SmallVec<[Id; 4]> = args
                .iter()
                .map(|&a| self.emit(Op::CompositeExtract, column_id, operands![id a, lit c]))
                .collect();
            columns.push(Operand::Id(f(self, &column_ty, &parts)));
        }
        let ty_id = self.em.lower_type(ty);
        self.emit(Op::CompositeConstruct, ty_id, columns)
    }

    /// `cond ? a : b` selects component-wise; both sides are evaluated.
    fn lower_ternary(&mut self, id: ExprId, cond: ExprId, then: ExprId, otherwise: ExprId) -> Id {
        let ty = self.ty(id).clone();
        if !ty.is_numeric() {
            let span = self.span(id);
            let message = format!(
                "conditional expression of type `{}` is not supported",
                ty.display(self.em.interner)
            );
            self.error(ErrorCode::E5003, span, message, "non-numeric select");
            return Id::NONE;
        }
        let cond_ty = self.ty(cond).clone();
        let shape = match &ty {
            Type::Matrix { rows, .. } => Type::vector(ScalarType::Bool, *rows),
            _ => ty.with_scalar(ScalarType::Bool),
        };
        let cond = if cond_ty.is_scalar() {
            let scalar = self.eval_as(cond, &Type::BOOL);
            self.splat(scalar, &shape)
        } else {
            self.eval_as(cond, &shape)
        };
        let then = self.eval_as(then, &ty);
        let otherwise = self.eval_as(otherwise, &ty);
        self.map_columns(&ty, &[then, otherwise], |this, column_ty, args| {
            let ty_id = this.em.lower_type(column_ty);
            this.emit(Op::Select, ty_id, operands![id cond, id args[0], id args[1]])
        })
    }

    fn lower_assign(&mut self, op: AssignOp, target: ExprId, value: ExprId, span: Span) -> Id {
        let target_ty = self.ty(target).clone();
        let place = self.place(target);
        let stored = match op {
            AssignOp::Assign => self.eval_as(value, &target_ty),
            AssignOp::Compound(binary) => {
                let value_ty = self.ty(value).clone();
                let Some(typing) = ops::binary(binary, &target_ty, &value_ty) else {
                    self.error(ErrorCode::E9002, span, "operator was not type checked", "here");
                    return Id::NONE;
                };
                let current = self.load(place.clone());
                let l = self.convert(current, &target_ty, &typing.operand);
                let r = self.eval_as(value, &typing.operand);
                let result = self.binary_op(binary, &typing.operand, l, r);
                self.convert(result, &typing.result, &target_ty)
            }
        };
        self.store(place, stored, span);
        stored
    }

    fn lower_call(&mut self, id: ExprId, callee: ExprId, args: &[ExprId]) -> Id {
        let span = self.span(id);
        let Some(target) = self.mixin().info.calls.get(&id).cloned() else {
            self.error(ErrorCode::E9002, span, "call was not resolved", "here");
            return Id::NONE;
        };
        match target {
            Callee::Method(_) | Callee::Base(_) => self.call_method(&target, args, span),
            Callee::Intrinsic(intrinsic) => self.lower_intrinsic(intrinsic, args, span),
            Callee::Constructor(ty) => self.construct(&ty, args),
            Callee::Texture(method) => {
                let ExprKind::Member { object, .. } = self.arena().expr(callee).kind else {
                    self.error(ErrorCode::E9002, span, "texture call without an object", "here");
                    return Id::NONE;
                };
                self.sample(method, object, args, span)
            }
        }
    }

    fn call_method(&mut self, target: &Callee, args: &[ExprId], span: Span) -> Id {
        let program = self.em.program;
        let Some(decl) = program
            .resolve_call(self.mixin, target)
            .and_then(|method| self.em.function(method).cloned())
        else {
            self.error(
                ErrorCode::E5003,
                span,
                "called method has no implementation",
                "abstract method called",
            );
            return Id::NONE;
        };
        let mut list = operands![id decl.id];
        for (arg, param) in args.iter().zip(&decl.params) {
            list.push(Operand::Id(self.eval_as(*arg, param)));
        }
        let ret = self.em.lower_type(&decl.ret);
        self.emit(Op::FunctionCall, ret, list)
    }

    /// `float4(a, b)`: single scalars splat, otherwise components are taken
    /// in order, matrices row by row.
    fn construct(&mut self, ty: &Type, args: &[ExprId]) -> Id {
        let Some(scalar) = ty.scalar() else {
            return Id::NONE;
        };
        if let [single] = args {
            if self.ty(*single).is_scalar() || self.ty(*single) == ty {
                return self.eval_as(*single, ty);
            }
        }
        let mut components = Vec::new();
        for &arg in args {
            let arg_ty = self.ty(arg).clone();
            let value = self.eval(arg);
            let converted = arg_ty.with_scalar(scalar);
            let value = self.convert_components(value, &arg_ty, scalar);
            components.extend(self.components(value, &converted));
        }
        self.assemble(&components, ty)
    }
}

/// The instruction for a non-matrix binary operator on `scalar` operands.
fn binary_instruction(op: BinaryOp, scalar: ScalarType) -> Op {
    use ScalarType::{Bool, Float, UInt};
    match (op, scalar) {
        (BinaryOp::Add, Float) => Op::FAdd,
        (BinaryOp::Add, _) => Op::IAdd,
        (BinaryOp::Sub, Float) => Op::FSub,
        (BinaryOp::Sub, _) => Op::ISub,
        (BinaryOp::Mul, Float) => Op::FMul,
        (BinaryOp::Mul, _) => Op::IMul,
        (BinaryOp::Div, Float) => Op::FDiv,
        (BinaryOp::Div, UInt) => Op::UDiv,
        (BinaryOp::Div, _) => Op::SDiv,
        (BinaryOp::Rem, Float) => Op::FRem,
        (BinaryOp::Rem, UInt) => Op::UMod,
        (BinaryOp::Rem, _) => Op::SRem,
        (BinaryOp::Shl, _) => Op::ShiftLeftLogical,
        (BinaryOp::Shr, UInt) => Op::ShiftRightLogical,
        (BinaryOp::Shr, _) => Op::ShiftRightArithmetic,
        (BinaryOp::BitAnd, _) => Op::BitwiseAnd,
        (BinaryOp::BitOr, _) => Op::BitwiseOr,
        (BinaryOp::BitXor, _) => Op::BitwiseXor,
        (BinaryOp::And, _) => Op::LogicalAnd,
        (BinaryOp::Or, _) => Op::LogicalOr,
        (BinaryOp::Eq, Bool) => Op::LogicalEqual,
        (BinaryOp::Eq, Float) => Op::FOrdEqual,
        (BinaryOp::Eq, _) => Op::IEqual,
        (BinaryOp::NotEq, Bool) => Op::LogicalNotEqual,
        (BinaryOp::NotEq, Float) => Op::FOrdNotEqual,
        (BinaryOp::NotEq, _) => Op::INotEqual,
        (BinaryOp::Lt, Float) => Op::FOrdLessThan,
        (BinaryOp::Lt, UInt) => Op::ULessThan,
        (BinaryOp::Lt, _) => Op::SLessThan,
        (BinaryOp::LtEq, Float) => Op::FOrdLessThanEqual,
        (BinaryOp::LtEq, UInt) => Op::ULessThanEqual,
        (BinaryOp::LtEq, _) => Op::SLessThanEqual,
        (BinaryOp::Gt, Float) => Op::FOrdGreaterThan,
        (BinaryOp::Gt, UInt) => Op::UGreaterThan,
        (BinaryOp::Gt, _) => Op::SGreaterThan,
        (BinaryOp::GtEq, Float) => Op::FOrdGreaterThanEqual,
        (BinaryOp::GtEq, UInt) => Op::UGreaterThanEqual,
        (BinaryOp::GtEq, _) => Op::SGreaterThanEqual,
    }
}
