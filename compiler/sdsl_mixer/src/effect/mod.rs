//! Effect evaluation.
//!
//! An effect body is a small program over the request's parameters. It is
//! run once per request to produce the ordered list of root mixins and the
//! macro bindings for this permutation. Parameters the request does not set
//! read as `false`, `0` or `""`, whichever the comparison they appear in
//! expects.

mod value;

use std::collections::BTreeMap;
use std::sync::Arc;

use sdsl_diagnostic::{Diagnostic, ErrorCode};
use sdsl_ir::{
    BinaryOp, ContentHash, EffectStmt, EffectStmtKind, ExprId, ExprKind, Literal, MixinTarget,
    Name, SourceId, Span, StringInterner, UnaryOp,
};
use sdsl_resolve::{LoadError, MixinLoader, MixinRef, SourceUnit};

use crate::ParameterBag;
use value::Value;

/// The outcome of evaluating an effect.
#[derive(Clone, Debug, PartialEq)]
pub struct EffectPlan {
    pub effect: Name,
    /// Root mixins in composition order, without duplicates.
    pub mixins: Vec<MixinRef>,
    /// `macro` bindings, rendered as replacement text.
    pub macros: BTreeMap<String, String>,
    /// Effects consulted, with the hash of the unit declaring each.
    pub sources: Vec<(Name, ContentHash)>,
}

/// Evaluate effect `name` against `parameters`.
///
/// A plain shader requested as an effect yields a plan composing just that
/// shader.
#[tracing::instrument(level = "debug", skip_all, fields(effect = interner.lookup(name)))]
pub fn evaluate_effect(
    name: Name,
    parameters: &ParameterBag,
    loader: &dyn MixinLoader,
    interner: &StringInterner,
) -> Result<EffectPlan, Vec<Diagnostic>> {
    let text = interner.lookup(name);
    let unit = match loader.load(name) {
        Ok(unit) => unit,
        Err(LoadError::NotFound) => {
            return Err(vec![Diagnostic::error(ErrorCode::E4004)
                .with_message(format!("unknown effect `{text}`"))]);
        }
        Err(LoadError::Invalid(diagnostics)) => return Err(diagnostics),
    };

    let mut evaluator = Evaluator {
        parameters,
        loader,
        interner,
        plan: EffectPlan {
            effect: name,
            mixins: Vec::new(),
            macros: BTreeMap::new(),
            sources: Vec::new(),
        },
        stack: Vec::new(),
        errors: Vec::new(),
    };

    if unit.effect(name).is_some() {
        evaluator.effect(name, &unit, None);
    } else if unit.shader(name).is_some() {
        evaluator.plan.sources.push((name, unit.hash));
        evaluator.push_mixin(MixinRef::root(name));
    } else {
        return Err(vec![Diagnostic::error(ErrorCode::E4004).with_message(format!(
            "`{}` does not declare effect `{text}`",
            unit.file
        ))]);
    }

    if evaluator.errors.is_empty() {
        tracing::debug!(
            mixins = evaluator.plan.mixins.len(),
            macros = evaluator.plan.macros.len(),
            "effect evaluated"
        );
        Ok(evaluator.plan)
    } else {
        Err(evaluator.errors)
    }
}

/// Marker for a failed evaluation; the diagnostic is already recorded.
struct EvalFailed;

type Eval<T> = Result<T, EvalFailed>;

struct Evaluator<'a> {
    parameters: &'a ParameterBag,
    loader: &'a dyn MixinLoader,
    interner: &'a StringInterner,
    plan: EffectPlan,
    /// Effects being evaluated, outermost first.
    stack: Vec<Name>,
    errors: Vec<Diagnostic>,
}

impl Evaluator<'_> {
    fn error(&mut self, code: ErrorCode, source: SourceId, span: Span, message: String) {
        self.errors.push(
            Diagnostic::error(code)
                .with_message(message)
                .with_source(source)
                .with_label(span, "here"),
        );
    }

    fn push_mixin(&mut self, mixin: MixinRef) {
        if !self.plan.mixins.iter().any(|m| m.name == mixin.name) {
            self.plan.mixins.push(mixin);
        }
    }

    fn effect(&mut self, name: Name, unit: &Arc<SourceUnit>, origin: Option<(SourceId, Span)>) {
        if self.stack.contains(&name) {
            let start = self.stack.iter().position(|n| *n == name).unwrap_or(0);
            let mut path: Vec<&str> = self.stack[start..]
                .iter()
                .map(|n| self.interner.lookup(*n))
                .collect();
            path.push(self.interner.lookup(name));
            let mut diagnostic = Diagnostic::error(ErrorCode::E4006).with_message(format!(
                "effect `{}` includes itself: {}",
                self.interner.lookup(name),
                path.join(" -> ")
            ));
            if let Some((source, span)) = origin {
                diagnostic = diagnostic
                    .with_source(source)
                    .with_label(span, "included again here");
            }
            self.errors.push(diagnostic);
            return;
        }
        let Some(decl) = unit.effect(name) else {
            return;
        };
        if !self.plan.sources.iter().any(|(n, _)| *n == name) {
            self.plan.sources.push((name, unit.hash));
        }

        self.stack.push(name);
        for base in &decl.bases {
            self.include(base.name, base.span, unit);
        }
        for stmt in &decl.body {
            self.stmt(stmt, unit);
        }
        self.stack.pop();
    }

    /// `mixin X`: a nested effect is evaluated in place, anything else is a
    /// root mixin. Unknown names are left for the resolver to report.
    fn include(&mut self, name: Name, span: Span, unit: &Arc<SourceUnit>) {
        let origin = Some((unit.id, span));
        match self.loader.load(name) {
            Ok(target) if target.effect(name).is_some() => self.effect(name, &target, origin),
            Ok(_) | Err(LoadError::NotFound) => self.push_mixin(MixinRef { name, origin }),
            Err(LoadError::Invalid(diagnostics)) => self.errors.extend(diagnostics),
        }
    }

    fn stmt(&mut self, stmt: &EffectStmt, unit: &Arc<SourceUnit>) {
        match &stmt.kind {
            EffectStmtKind::Mixin(MixinTarget::Named(name, span)) => {
                self.include(*name, *span, unit);
            }
            EffectStmtKind::Mixin(MixinTarget::Parameter(param, span)) => {
                let text = self.interner.lookup(*param);
                match self.parameters.get(text) {
                    Some(crate::ParameterValue::Str(mixin)) if !mixin.is_empty() => {
                        let name = self.interner.intern(mixin);
                        self.include(name, *span, unit);
                    }
                    Some(other) => {
                        let message = format!(
                            "parameter `{text}` must be a string naming a mixin, found {}",
                            other.type_name()
                        );
                        self.error(ErrorCode::E4005, unit.id, *span, message);
                    }
                    None => {
                        let message = format!("parameter `{text}` names a mixin but is not set");
                        self.error(ErrorCode::E4005, unit.id, *span, message);
                    }
                }
            }
            EffectStmtKind::Macro { name, value } => {
                if let Ok(value) = self.eval(*value, unit) {
                    let name = self.interner.lookup(*name).to_string();
                    self.plan.macros.insert(name, value.to_macro_text());
                }
            }
            EffectStmtKind::If {
                cond,
                then,
                otherwise,
            } => {
                let Ok(value) = self.eval(*cond, unit) else {
                    return;
                };
                let span = unit.arena.expr(*cond).span;
                match self.truthy(&value, unit.id, span) {
                    Ok(true) => self.stmt(then, unit),
                    Ok(false) => {
                        if let Some(otherwise) = otherwise {
                            self.stmt(otherwise, unit);
                        }
                    }
                    Err(EvalFailed) => {}
                }
            }
            EffectStmtKind::Block(stmts) => {
                for stmt in stmts {
                    self.stmt(stmt, unit);
                }
            }
        }
    }

    fn truthy(&mut self, value: &Value, source: SourceId, span: Span) -> Eval<bool> {
        match value {
            Value::Missing => Ok(false),
            Value::Bool(b) => Ok(*b),
            Value::Int(i) => Ok(*i != 0),
            Value::Float(f) => Ok(*f != 0.0),
            Value::Str(_) => {
                let message = "a string cannot be used as a condition".to_string();
                self.error(ErrorCode::E4005, source, span, message);
                Err(EvalFailed)
            }
        }
    }

    fn eval(&mut self, id: ExprId, unit: &SourceUnit) -> Eval<Value> {
        let expr = unit.arena.expr(id);
        let span = expr.span;
        match &expr.kind {
            ExprKind::Literal(literal) => Ok(match *literal {
                Literal::Bool(b) => Value::Bool(b),
                Literal::Int(i) | Literal::UInt(i) => Value::Int(i as i64),
                Literal::Float(bits) => Value::Float(f64::from_bits(bits)),
                Literal::Str(s) => Value::Str(self.interner.lookup(s).to_string()),
            }),
            ExprKind::Ident(name) => Ok(self
                .parameters
                .get(self.interner.lookup(*name))
                .map_or(Value::Missing, Value::from)),
            ExprKind::Unary { op, operand } => {
                let value = self.eval(*operand, unit)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!self.truthy(&value, unit.id, span)?)),
                    UnaryOp::Plus => Ok(value),
                    UnaryOp::Neg => match value.adapt_numeric() {
                        Some(Value::Int(i)) => Ok(Value::Int(i.wrapping_neg())),
                        Some(Value::Float(f)) => Ok(Value::Float(-f)),
                        _ => self.mismatch(unit.id, span, "cannot negate a non-numeric value"),
                    },
                    _ => self.mismatch(unit.id, span, "unsupported operator in effect expression"),
                }
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let left = self.eval(*lhs, unit)?;
                let right = self.eval(*rhs, unit)?;
                self.binary(*op, left, right, unit.id, span)
            }
            ExprKind::Ternary {
                cond,
                then,
                otherwise,
            } => {
                let cond_value = self.eval(*cond, unit)?;
                if self.truthy(&cond_value, unit.id, span)? {
                    self.eval(*then, unit)
                } else {
                    self.eval(*otherwise, unit)
                }
            }
            ExprKind::Error => Err(EvalFailed),
            _ => self.mismatch(
                unit.id,
                span,
                "only parameters, literals and operators are allowed in effects",
            ),
        }
    }

    fn mismatch<T>(&mut self, source: SourceId, span: Span, message: &str) -> Eval<T> {
        self.error(ErrorCode::E4005, source, span, message.to_string());
        Err(EvalFailed)
    }

    fn binary(
        &mut self,
        op: BinaryOp,
        left: Value,
        right: Value,
        source: SourceId,
        span: Span,
    ) -> Eval<Value> {
        if op.is_logical() {
            let l = self.truthy(&left, source, span)?;
            let r = self.truthy(&right, source, span)?;
            let result = if op == BinaryOp::And { l && r } else { l || r };
            return Ok(Value::Bool(result));
        }
        let (left, right) = Value::adapt_pair(left, right);
        if op.is_comparison() {
            return match left.compare(&right) {
                Some(ordering) => Ok(Value::Bool(match op {
                    BinaryOp::Eq => ordering.is_eq(),
                    BinaryOp::NotEq => ordering.is_ne(),
                    BinaryOp::Lt => ordering.is_lt(),
                    BinaryOp::LtEq => ordering.is_le(),
                    BinaryOp::Gt => ordering.is_gt(),
                    _ => ordering.is_ge(),
                })),
                None => {
                    let message = format!(
                        "cannot compare {} with {} using `{}`",
                        left.type_name(),
                        right.type_name(),
                        op.as_str()
                    );
                    self.mismatch(source, span, &message)
                }
            };
        }
        match left.arithmetic(op, &right) {
            Ok(value) => Ok(value),
            Err(message) => self.mismatch(source, span, &message),
        }
    }
}

#[cfg(test)]
mod tests;
