//! Conversions between numeric types.
//!
//! Implicit conversions follow the typing rules: scalars splat, vectors
//! truncate, component types change in place. Casts additionally reshape
//! between any numeric types with enough components, reading and writing
//! matrices row by row.

use sdsl_diagnostic::ErrorCode;
use sdsl_ir::Span;
use sdsl_types::{ops, ScalarType, Type};
use smallvec::SmallVec;

use super::function::FunctionLowerer;
use crate::instruction::{operands, Id, Operand};
use crate::op::Op;

impl FunctionLowerer<'_, '_> {
    /// Implicit conversion of `value` from `from` to `to`.
    pub(super) fn convert(&mut self, value: Id, from: &Type, to: &Type) -> Id {
        if from == to || from.is_error() || to.is_error() || value.is_none() {
            return value;
        }
        match (from, to) {
            (Type::Scalar(_), Type::Scalar(target)) => self.convert_components(value, from, *target),
            (Type::Scalar(_), Type::Vector(target, _) | Type::Matrix { scalar: target, .. }) => {
                let scalar = self.convert_components(value, from, *target);
                self.splat(scalar, to)
            }
            (Type::Vector(scalar, n), Type::Vector(target, m)) => {
                let truncated = if m < n {
                    let narrow = Type::Vector(*scalar, *m);
                    let ty_id = self.em.lower_type(&narrow);
                    let mut list = operands![id value, id value];
                    list.extend((0..u32::from(*m)).map(Operand::Literal));
                    self.emit(Op::VectorShuffle, ty_id, list)
                } else {
                    value
                };
                self.convert_components(truncated, &Type::Vector(*scalar, *m), *target)
            }
            (Type::Vector(scalar, _), Type::Scalar(target)) => {
                let ty_id = self.scalar_id(*scalar);
                let first = self.emit(Op::CompositeExtract, ty_id, operands![id value, lit 0]);
                self.convert_components(first, &Type::Scalar(*scalar), *target)
            }
            (Type::Matrix { .. }, Type::Matrix { scalar: target, .. }) => {
                self.convert_components(value, from, *target)
            }
            _ => value,
        }
    }

    /// Explicit cast. Beyond the implicit conversions, any numeric value
    /// with at least as many components as the target can be reshaped.
    pub(super) fn cast(&mut self, value: Id, from: &Type, to: &Type, span: Span) -> Id {
        if ops::can_convert(from, to) {
            return self.convert(value, from, to);
        }
        match (from.component_count(), to.component_count(), to.scalar()) {
            (Some(have), Some(need), Some(scalar)) if have >= need => {
                let converted = self.convert_components(value, from, scalar);
                let parts = self.components(converted, &from.with_scalar(scalar));
                self.assemble(&parts, to)
            }
            _ => {
                let message = format!(
                    "cannot cast `{}` to `{}`",
                    from.display(self.em.interner),
                    to.display(self.em.interner)
                );
                self.error(ErrorCode::E5003, span, message, "unsupported cast");
                Id::NONE
            }
        }
    }

    fn scalar_id(&mut self, scalar: ScalarType) -> Id {
        self.em.scalar_type(scalar)
    }

    /// Change the component type of `value`, keeping its shape.
    pub(super) fn convert_components(&mut self, value: Id, from: &Type, to: ScalarType) -> Id {
        let Some(scalar) = from.scalar() else {
            return value;
        };
        if scalar == to {
            return value;
        }
        if let Type::Matrix { rows, cols, .. } = *from {
            let column_from = Type::vector(scalar, rows);
            let from_id = self.em.lower_type(&column_from);
            let mut columns = SmallVec::<[Operand; 4]>::new();
            for c in 0..u32::from(cols) {
                let column = self.emit(Op::CompositeExtract, from_id, operands![id value, lit c]);
                columns.push(Operand::Id(self.convert_components(column, &column_from, to)));
            }
            let ty_id = self.em.lower_type(&from.with_scalar(to));
            return self.emit(Op::CompositeConstruct, ty_id, columns);
        }

        let target = from.with_scalar(to);
        let ty_id = self.em.lower_type(&target);
        match (scalar, to) {
            (ScalarType::Bool, _) => {
                let one = self.em.one(&target);
                let zero = self.em.zero(&target);
                self.emit(Op::Select, ty_id, operands![id value, id one, id zero])
            }
            (_, ScalarType::Bool) => {
                let zero = self.em.zero(from);
                let op = if scalar == ScalarType::Float {
                    Op::FOrdNotEqual
                } else {
                    Op::INotEqual
                };
                self.emit(op, ty_id, operands![id value, id zero])
            }
            (ScalarType::Int, ScalarType::UInt) | (ScalarType::UInt, ScalarType::Int) => {
                self.emit(Op::Bitcast, ty_id, operands![id value])
            }
            (ScalarType::Int, _) => self.emit(Op::ConvertSToF, ty_id, operands![id value]),
            (ScalarType::UInt, _) => self.emit(Op::ConvertUToF, ty_id, operands![id value]),
            (ScalarType::Float, ScalarType::Int) => {
                self.emit(Op::ConvertFToS, ty_id, operands![id value])
            }
            (ScalarType::Float, _) => self.emit(Op::ConvertFToU, ty_id, operands![id value]),
        }
    }

    /// Replicate a scalar value across a vector or matrix.
    pub(super) fn splat(&mut self, scalar: Id, to: &Type) -> Id {
        match *to {
            Type::Vector(_, n) => {
                let ty_id = self.em.lower_type(to);
                let parts = (0..n).map(|_| Operand::Id(scalar)).collect();
                self.emit(Op::CompositeConstruct, ty_id, parts)
            }
            Type::Matrix {
                scalar: component,
                rows,
                cols,
            } => {
                let column = self.splat(scalar, &Type::vector(component, rows));
                let ty_id = self.em.lower_type(to);
                let parts = (0..cols).map(|_| Operand::Id(column)).collect();
                self.emit(Op::CompositeConstruct, ty_id, parts)
            }
            _ => scalar,
        }
    }

    /// Scalar components of a numeric value; matrices row by row.
    pub(super) fn components(&mut self, value: Id, ty: &Type) -> Vec<Id> {
        match *ty {
            Type::Vector(scalar, n) => {
                let ty_id = self.scalar_id(scalar);
                (0..u32::from(n))
                    .map(|i| self.emit(Op::CompositeExtract, ty_id, operands![id value, lit i]))
                    .collect()
            }
            Type::Matrix { scalar, rows, cols } => {
                let ty_id = self.scalar_id(scalar);
                let mut parts = Vec::with_capacity(usize::from(rows) * usize::from(cols));
                for r in 0..u32::from(rows) {
                    for c in 0..u32::from(cols) {
                        parts.push(self.emit(
                            Op::CompositeExtract,
                            ty_id,
                            operands![id value, lit c, lit r],
                        ));
                    }
                }
                parts
            }
            _ => vec![value],
        }
    }

    /// Build a numeric value from its leading scalar components; matrices
    /// are filled row by row.
    pub(super) fn assemble(&mut self, parts: &[Id], ty: &Type) -> Id {
        let part = |i: usize| Operand::Id(parts.get(i).copied().unwrap_or(Id::NONE));
        match *ty {
            Type::Scalar(_) => parts.first().copied().unwrap_or(Id::NONE),
            Type::Vector(_, n) => {
                let ty_id = self.em.lower_type(ty);
                let list = (0..usize::from(n)).map(part).collect();
                self.emit(Op::CompositeConstruct, ty_id, list)
            }
            Type::Matrix { scalar, rows, cols } => {
                let column_ty = self.em.lower_type(&Type::vector(scalar, rows));
                let (rows, cols) = (usize::from(rows), usize::from(cols));
                let mut columns = SmallVec::<[Operand; 4]>::new();
                for c in 0..cols {
                    let list = (0..rows).map(|r| part(r * cols + c)).collect();
                    columns.push(Operand::Id(self.emit(Op::CompositeConstruct, column_ty, list)));
                }
                let ty_id = self.em.lower_type(ty);
                self.emit(Op::CompositeConstruct, ty_id, columns)
            }
            _ => Id::NONE,
        }
    }
}
