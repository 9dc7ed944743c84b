//! Expression typing.
//!
//! Every expression's type is recorded in [`ExprInfo::types`](crate::ExprInfo);
//! after an error the expression is typed [`Type::Error`], which converts to
//! anything so a single mistake is reported once.

use sdsl_diagnostic::{unknown_identifier, ErrorCode};
use sdsl_ir::{AssignOp, BinaryOp, ExprId, ExprKind, Literal, Name, Span, UnaryOp};
use sdsl_stack::ensure_sufficient_stack;
use sdsl_types::{ops, Intrinsic, IntrinsicError, IntrinsicTyping, TextureMethod, Type};

use super::MixinChecker;
use crate::{Binding, Callee, FieldStorage, MemberAccess};

/// Parameter and return types of a callable shader method.
struct MethodSig {
    params: Vec<Type>,
    result: Type,
}

fn unary_str(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Neg => "-",
        UnaryOp::Plus => "+",
        UnaryOp::Not => "!",
        UnaryOp::BitNot => "~",
        UnaryOp::PreInc | UnaryOp::PostInc => "++",
        UnaryOp::PreDec | UnaryOp::PostDec => "--",
    }
}

impl MixinChecker<'_> {
    /// Type an expression and record the result.
    pub(super) fn check_expr(&mut self, id: ExprId) -> Type {
        let ty = ensure_sufficient_stack(|| self.check_expr_inner(id));
        if let Some(slot) = self.info.types.get_mut(id.index()) {
            slot.clone_from(&ty);
        }
        ty
    }

    fn check_expr_inner(&mut self, id: ExprId) -> Type {
        let expr = self.arena.expr(id);
        let span = expr.span;
        match &expr.kind {
            ExprKind::Literal(literal) => match literal {
                Literal::Bool(_) => Type::BOOL,
                Literal::Int(_) => Type::INT,
                Literal::UInt(_) => Type::UINT,
                Literal::Float(_) => Type::FLOAT,
                Literal::Str(_) => {
                    self.error(
                        ErrorCode::E3001,
                        span,
                        "string literals are only allowed in attributes",
                        "string literal",
                    );
                    Type::Error
                }
            },
            ExprKind::Ident(name) => self.check_ident(id, *name, span),
            ExprKind::Stream(name) => self.check_stream(id, *name, span),
            ExprKind::Base(name) => {
                self.error(
                    ErrorCode::E3014,
                    span,
                    format!("`base.{}` can only be called", self.name(*name)),
                    "not a call",
                );
                Type::Error
            }
            ExprKind::Member {
                object,
                member,
                member_span,
            } => self.check_member(id, *object, *member, *member_span),
            ExprKind::Index { object, index } => self.check_index(*object, *index, span),
            ExprKind::Call { callee, args } => self.check_call(id, *callee, args, span),
            ExprKind::Cast { ty, operand } => {
                let target = self.resolve_type(ty, None);
                let found = self.check_expr(*operand);
                let numeric_reshape = target.is_numeric()
                    && found.is_numeric()
                    && (found.is_scalar() || target.component_count() == found.component_count());
                if !(numeric_reshape || ops::can_convert(&found, &target)) {
                    self.error(
                        ErrorCode::E3001,
                        span,
                        format!(
                            "cannot cast `{}` to `{}`",
                            self.show(&found),
                            self.show(&target)
                        ),
                        "invalid cast",
                    );
                    return Type::Error;
                }
                target
            }
            ExprKind::Unary { op, operand } => {
                let found = self.check_expr(*operand);
                if op.is_mutating() {
                    self.check_lvalue(*operand);
                }
                match ops::unary(*op, &found) {
                    Some(typing) => typing.result,
                    None => {
                        let code = if found.is_numeric() {
                            ErrorCode::E3001
                        } else {
                            ErrorCode::E3015
                        };
                        self.error(
                            code,
                            span,
                            format!(
                                "operator `{}` cannot be applied to `{}`",
                                unary_str(*op),
                                self.show(&found)
                            ),
                            "invalid operand",
                        );
                        Type::Error
                    }
                }
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let left = self.check_expr(*lhs);
                let right = self.check_expr(*rhs);
                self.binary_result(*op, &left, &right, span)
            }
            ExprKind::Ternary {
                cond,
                then,
                otherwise,
            } => {
                self.check_condition(*cond);
                let a = self.check_expr(*then);
                let b = self.check_expr(*otherwise);
                if a == b {
                    return a;
                }
                match ops::binary(BinaryOp::Eq, &a, &b) {
                    Some(typing) => typing.operand,
                    None => {
                        self.error(
                            ErrorCode::E3001,
                            span,
                            format!(
                                "conditional branches have incompatible types `{}` and `{}`",
                                self.show(&a),
                                self.show(&b)
                            ),
                            "branches differ",
                        );
                        Type::Error
                    }
                }
            }
            ExprKind::Assign { op, target, value } => {
                let target_ty = self.check_expr(*target);
                self.check_lvalue(*target);
                let found = self.check_expr(*value);
                match op {
                    AssignOp::Assign => {
                        self.expect_convertible(*value, &found, &target_ty);
                    }
                    AssignOp::Compound(op) => {
                        let result = self.binary_result(*op, &target_ty, &found, span);
                        if !ops::can_convert(&result, &target_ty) {
                            self.error(
                                ErrorCode::E3001,
                                span,
                                format!(
                                    "`{}=` produces `{}`, which does not fit `{}`",
                                    op.as_str(),
                                    self.show(&result),
                                    self.show(&target_ty)
                                ),
                                "result type mismatch",
                            );
                        }
                    }
                }
                target_ty
            }
            ExprKind::Error => Type::Error,
        }
    }

    fn binary_result(&mut self, op: BinaryOp, left: &Type, right: &Type, span: Span) -> Type {
        if let Some(typing) = ops::binary(op, left, right) {
            return typing.result;
        }
        let (code, message) = if left.is_numeric() && right.is_numeric() {
            (
                ErrorCode::E3001,
                format!(
                    "mismatched operand types `{}` and `{}` for `{}`",
                    self.show(left),
                    self.show(right),
                    op.as_str()
                ),
            )
        } else {
            (
                ErrorCode::E3015,
                format!(
                    "operator `{}` cannot be applied to `{}` and `{}`",
                    op.as_str(),
                    self.show(left),
                    self.show(right)
                ),
            )
        };
        self.error(code, span, message, "invalid operands");
        Type::Error
    }

    fn field_type(&self, name: Name) -> Option<(Type, FieldStorage)> {
        if let Some(field) = self.fields.iter().find(|f| f.name == name) {
            return Some((field.ty.clone(), field.storage));
        }
        self.visible
            .iter()
            .rev()
            .find_map(|m| m.field(name))
            .map(|f| (f.ty.clone(), f.storage))
    }

    fn binding_type(&self, binding: Binding) -> Type {
        let from_func = self.func.as_ref().and_then(|func| match binding {
            Binding::Local(local) => func.locals.get(local.0 as usize).map(|l| l.ty.clone()),
            Binding::Param(index) => func.params.get(index as usize).map(|p| p.ty.clone()),
            Binding::Field(_) => None,
        });
        match (from_func, binding) {
            (Some(ty), _) => ty,
            (None, Binding::Field(name)) => self.field_type(name).map_or(Type::Error, |(ty, _)| ty),
            (None, _) => Type::Error,
        }
    }

    fn check_ident(&mut self, id: ExprId, name: Name, span: Span) -> Type {
        let scoped = self.func.as_ref().and_then(|f| f.scopes.lookup(name));
        let binding = match scoped {
            Some(binding) => binding,
            None if self.field_type(name).is_some() => Binding::Field(name),
            None => {
                let declared_later = self.func.as_ref().is_some_and(|f| f.declared.contains(&name));
                if declared_later {
                    self.error(
                        ErrorCode::E3006,
                        span,
                        format!("`{}` is used before its declaration", self.name(name)),
                        "used here before being declared",
                    );
                } else {
                    let diagnostic = unknown_identifier(span, self.name(name));
                    self.errors.push(diagnostic.with_source(self.unit.id));
                }
                return Type::Error;
            }
        };
        self.info.bindings.insert(id, binding);
        self.binding_type(binding)
    }

    fn check_stream(&mut self, id: ExprId, name: Name, span: Span) -> Type {
        match self.field_type(name) {
            Some((ty, FieldStorage::Stream)) => {
                self.info.bindings.insert(id, Binding::Field(name));
                ty
            }
            _ => {
                self.error(
                    ErrorCode::E3011,
                    span,
                    format!("no stream named `{}`", self.name(name)),
                    "not a stream field",
                );
                Type::Error
            }
        }
    }

    fn check_member(&mut self, id: ExprId, object: ExprId, member: Name, span: Span) -> Type {
        let object_ty = self.check_expr(object);
        let text = self.name(member);
        match &object_ty {
            Type::Error => Type::Error,
            Type::Struct(struct_name) => {
                let found = self
                    .structs
                    .get(*struct_name)
                    .and_then(|def| def.member(member))
                    .map(|(index, m)| (index, m.ty.clone()));
                if let Some((index, ty)) = found {
                    self.info
                        .members
                        .insert(id, MemberAccess::StructField(index as u32));
                    return ty;
                }
                self.no_member(&object_ty, text, span)
            }
            Type::Scalar(_) | Type::Vector(..) => {
                let swizzled = ops::swizzle(&object_ty, text).zip(ops::swizzle_components(text));
                if let Some((ty, components)) = swizzled {
                    self.info.members.insert(id, MemberAccess::Swizzle(components));
                    return ty;
                }
                self.no_member(&object_ty, text, span)
            }
            Type::Texture { .. } if TextureMethod::from_name(text).is_some() => {
                self.error(
                    ErrorCode::E3011,
                    span,
                    format!("texture method `{text}` must be called"),
                    "not a call",
                );
                Type::Error
            }
            _ => self.no_member(&object_ty, text, span),
        }
    }

    fn no_member(&mut self, ty: &Type, member: &str, span: Span) -> Type {
        let message = format!("type `{}` has no member `{member}`", self.show(ty));
        self.error(ErrorCode::E3011, span, message, "unknown member");
        Type::Error
    }

    fn check_index(&mut self, object: ExprId, index: ExprId, span: Span) -> Type {
        let object_ty = self.check_expr(object);
        let index_ty = self.check_expr(index);
        if !index_ty.is_scalar() && !index_ty.is_error() {
            let message = format!("index must be a scalar, found `{}`", self.show(&index_ty));
            let index_span = self.arena.expr(index).span;
            self.error(ErrorCode::E3001, index_span, message, "expected a scalar");
        }
        match object_ty {
            Type::Array(element, _) => *element,
            Type::Vector(scalar, _) => Type::Scalar(scalar),
            Type::Matrix { scalar, cols, .. } => Type::vector(scalar, cols),
            Type::Error => Type::Error,
            other => {
                let message = format!("cannot index into a value of type `{}`", self.show(&other));
                self.error(ErrorCode::E3015, span, message, "not indexable");
                Type::Error
            }
        }
    }

    fn own_or_visible_method(&self, name: Name) -> Option<MethodSig> {
        let own = self.methods.iter().find(|m| m.name() == name);
        let method = own.or_else(|| self.visible.iter().rev().find_map(|m| m.method(name)))?;
        Some(MethodSig {
            params: method.params.iter().map(|p| p.ty.clone()).collect(),
            result: method.return_ty.clone(),
        })
    }

    /// `base.Name`: a method of a strictly composed mixin. The nearest
    /// concrete definition wins; an abstract one is used only if no concrete
    /// one exists, and is rejected later when composed.
    fn base_method(&self, name: Name) -> Option<MethodSig> {
        let candidates = || self.visible.iter().rev().filter_map(|m| m.method(name));
        let method = candidates()
            .find(|m| !m.is_abstract())
            .or_else(|| candidates().next())?;
        Some(MethodSig {
            params: method.params.iter().map(|p| p.ty.clone()).collect(),
            result: method.return_ty.clone(),
        })
    }

    fn check_call(&mut self, id: ExprId, callee: ExprId, args: &[ExprId], span: Span) -> Type {
        let callee_expr = self.arena.expr(callee);
        match &callee_expr.kind {
            ExprKind::Ident(name) => {
                let name = *name;
                let arg_types = self.check_args(args);
                if let Some(sig) = self.own_or_visible_method(name) {
                    self.info.calls.insert(id, Callee::Method(name));
                    return self.apply_method(name, &sig, args, &arg_types, span);
                }
                let text = self.name(name);
                if let Some(intrinsic) = Intrinsic::from_name(text) {
                    self.info.calls.insert(id, Callee::Intrinsic(intrinsic));
                    let typing = intrinsic.signature(&arg_types);
                    return self.intrinsic_result(text, typing, &arg_types, span);
                }
                if let Some(target) = Type::from_builtin_name(text, None) {
                    if target.is_numeric() {
                        if ops::constructor_accepts(&target, &arg_types) {
                            self.info.calls.insert(id, Callee::Constructor(target.clone()));
                            return target;
                        }
                        if arg_types.iter().any(Type::is_error) {
                            return target;
                        }
                        let message = format!(
                            "no constructor `{text}` accepts ({})",
                            self.show_list(&arg_types)
                        );
                        self.error(ErrorCode::E3012, span, message, "no matching constructor");
                        return Type::Error;
                    }
                }
                let diagnostic = unknown_identifier(callee_expr.span, text);
                self.errors.push(diagnostic.with_source(self.unit.id));
                Type::Error
            }
            ExprKind::Base(name) => {
                let name = *name;
                let arg_types = self.check_args(args);
                match self.base_method(name) {
                    Some(sig) => {
                        self.info.calls.insert(id, Callee::Base(name));
                        self.apply_method(name, &sig, args, &arg_types, span)
                    }
                    None => {
                        self.error(
                            ErrorCode::E3014,
                            callee_expr.span,
                            format!(
                                "no composed mixin defines a base method `{}`",
                                self.name(name)
                            ),
                            "no base method",
                        );
                        Type::Error
                    }
                }
            }
            ExprKind::Member {
                object,
                member,
                member_span,
            } => {
                let (object, member, member_span) = (*object, *member, *member_span);
                let object_ty = self.check_expr(object);
                let arg_types = self.check_args(args);
                if object_ty.is_error() {
                    return Type::Error;
                }
                let text = self.name(member);
                if !matches!(object_ty, Type::Texture { .. }) {
                    let message = format!(
                        "type `{}` has no method `{text}`",
                        self.show(&object_ty)
                    );
                    self.error(ErrorCode::E3012, member_span, message, "not callable");
                    return Type::Error;
                }
                let Some(method) = TextureMethod::from_name(text) else {
                    return self.no_member(&object_ty, text, member_span);
                };
                self.info.members.insert(callee, MemberAccess::Method);
                self.info.calls.insert(id, Callee::Texture(method));
                let typing = method.signature(&object_ty, &arg_types);
                self.intrinsic_result(text, typing, &arg_types, span)
            }
            _ => {
                self.check_expr(callee);
                self.check_args(args);
                self.error(
                    ErrorCode::E3012,
                    callee_expr.span,
                    "expression is not callable",
                    "not a method or function",
                );
                Type::Error
            }
        }
    }

    fn check_args(&mut self, args: &[ExprId]) -> Vec<Type> {
        args.iter().map(|arg| self.check_expr(*arg)).collect()
    }

    fn show_list(&self, types: &[Type]) -> String {
        types
            .iter()
            .map(|t| self.show(t))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn apply_method(
        &mut self,
        name: Name,
        sig: &MethodSig,
        args: &[ExprId],
        arg_types: &[Type],
        span: Span,
    ) -> Type {
        if sig.params.len() != args.len() {
            self.error(
                ErrorCode::E3004,
                span,
                format!(
                    "`{}` takes {} argument(s) but {} were supplied",
                    self.name(name),
                    sig.params.len(),
                    args.len()
                ),
                "wrong number of arguments",
            );
            return sig.result.clone();
        }
        for ((arg, found), expected) in args.iter().zip(arg_types).zip(&sig.params) {
            self.expect_convertible(*arg, found, expected);
        }
        sig.result.clone()
    }

    fn intrinsic_result(
        &mut self,
        name: &str,
        typing: Result<IntrinsicTyping, IntrinsicError>,
        arg_types: &[Type],
        span: Span,
    ) -> Type {
        match typing {
            Ok(typing) => typing.result,
            Err(IntrinsicError::ArgumentCount { expected, found }) => {
                self.error(
                    ErrorCode::E3004,
                    span,
                    format!("`{name}` takes {expected} argument(s) but {found} were supplied"),
                    "wrong number of arguments",
                );
                Type::Error
            }
            Err(IntrinsicError::NoOverload) => {
                let message = format!(
                    "no overload of `{name}` accepts ({})",
                    self.show_list(arg_types)
                );
                self.error(ErrorCode::E3012, span, message, "no matching overload");
                Type::Error
            }
        }
    }

    /// Report E3009 unless `target` names writable storage.
    fn check_lvalue(&mut self, target: ExprId) {
        let expr = self.arena.expr(target);
        let problem = match &expr.kind {
            ExprKind::Ident(name) => match self.info.bindings.get(&target) {
                None | Some(Binding::Param(_)) => None,
                Some(Binding::Local(local)) => {
                    let is_const = self
                        .func
                        .as_ref()
                        .and_then(|f| f.locals.get(local.0 as usize))
                        .is_some_and(|l| l.is_const);
                    is_const.then(|| format!("cannot assign to constant `{}`", self.name(*name)))
                }
                Some(Binding::Field(field)) => match self.field_type(*field) {
                    Some((_, storage)) if !storage.is_writable() => Some(format!(
                        "cannot assign to field `{}`; only stream and static fields are writable",
                        self.name(*name)
                    )),
                    _ => None,
                },
            },
            ExprKind::Stream(_) | ExprKind::Error => None,
            ExprKind::Member { object, .. } | ExprKind::Index { object, .. } => {
                return self.check_lvalue(*object);
            }
            _ => Some("invalid assignment target".to_string()),
        };
        if let Some(message) = problem {
            self.error(ErrorCode::E3009, expr.span, message, "not assignable");
        }
    }
}
