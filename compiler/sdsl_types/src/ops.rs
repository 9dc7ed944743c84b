//! Conversion and operator typing rules.
//!
//! Scalars rank `bool < int < uint < float` and convert implicitly. Scalars
//! splat to any vector or matrix. Vectors truncate to narrower vectors (and
//! scalars) but never widen. Binary operands must agree in shape after
//! splatting; two vectors of different sizes are a mismatch.

use sdsl_ir::{BinaryOp, UnaryOp};

use crate::{ScalarType, Type};

/// Whether a value of type `from` implicitly converts to `to`.
pub fn can_convert(from: &Type, to: &Type) -> bool {
    if from == to || from.is_error() || to.is_error() {
        return true;
    }
    match (from, to) {
        (Type::Scalar(_), Type::Scalar(_) | Type::Vector(..) | Type::Matrix { .. }) => true,
        (Type::Vector(_, n), Type::Vector(_, m)) => m <= n,
        (Type::Vector(..), Type::Scalar(_)) => true,
        (
            Type::Matrix { rows, cols, .. },
            Type::Matrix {
                rows: to_rows,
                cols: to_cols,
                ..
            },
        ) => rows == to_rows && cols == to_cols,
        _ => false,
    }
}

/// Operand and result types of an operator application.
///
/// Both operands convert to `operand` before the operation; the value
/// produced has type `result`.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct OpTyping {
    pub operand: Type,
    pub result: Type,
}

impl OpTyping {
    fn same(ty: Type) -> Self {
        OpTyping {
            operand: ty.clone(),
            result: ty,
        }
    }

    fn error() -> Self {
        Self::same(Type::Error)
    }
}

/// The shape both operands of a binary operator are brought to.
pub(crate) fn common_shape(lhs: &Type, rhs: &Type) -> Option<Type> {
    let scalar = lhs.scalar()?.max(rhs.scalar()?);
    let shape = match (lhs, rhs) {
        (Type::Scalar(_), Type::Scalar(_)) => Type::Scalar(scalar),
        (Type::Scalar(_), Type::Vector(_, n)) | (Type::Vector(_, n), Type::Scalar(_)) => {
            Type::Vector(scalar, *n)
        }
        (Type::Vector(_, n), Type::Vector(_, m)) if n == m => Type::Vector(scalar, *n),
        (Type::Scalar(_), Type::Matrix { rows, cols, .. })
        | (Type::Matrix { rows, cols, .. }, Type::Scalar(_)) => Type::Matrix {
            scalar,
            rows: *rows,
            cols: *cols,
        },
        (Type::Matrix { rows, cols, .. }, Type::Matrix { rows: r, cols: c, .. })
            if rows == r && cols == c =>
        {
            Type::Matrix {
                scalar,
                rows: *rows,
                cols: *cols,
            }
        }
        _ => return None,
    };
    Some(shape)
}

pub(crate) fn promote_bool(ty: Type) -> Type {
    match ty.scalar() {
        Some(ScalarType::Bool) => ty.with_scalar(ScalarType::Int),
        _ => ty,
    }
}

/// Type a binary operator. `None` means the operands are incompatible.
pub fn binary(op: BinaryOp, lhs: &Type, rhs: &Type) -> Option<OpTyping> {
    if lhs.is_error() || rhs.is_error() {
        return Some(OpTyping::error());
    }
    let shape = common_shape(lhs, rhs)?;
    let typing = match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            OpTyping::same(promote_bool(shape))
        }
        BinaryOp::Shl
        | BinaryOp::Shr
        | BinaryOp::BitAnd
        | BinaryOp::BitOr
        | BinaryOp::BitXor => {
            let shape = promote_bool(shape);
            if shape.scalar() == Some(ScalarType::Float) {
                return None;
            }
            OpTyping::same(shape)
        }
        BinaryOp::And | BinaryOp::Or => OpTyping::same(shape.with_scalar(ScalarType::Bool)),
        BinaryOp::Eq
        | BinaryOp::NotEq
        | BinaryOp::Lt
        | BinaryOp::LtEq
        | BinaryOp::Gt
        | BinaryOp::GtEq => OpTyping {
            result: shape.with_scalar(ScalarType::Bool),
            operand: shape,
        },
    };
    Some(typing)
}

/// Type a unary operator. `None` means the operand is not valid for it.
pub fn unary(op: UnaryOp, operand: &Type) -> Option<OpTyping> {
    if operand.is_error() {
        return Some(OpTyping::error());
    }
    if !operand.is_numeric() {
        return None;
    }
    let typing = match op {
        UnaryOp::Neg | UnaryOp::Plus => OpTyping::same(promote_bool(operand.clone())),
        UnaryOp::Not => OpTyping::same(operand.with_scalar(ScalarType::Bool)),
        UnaryOp::BitNot => {
            let ty = promote_bool(operand.clone());
            if ty.scalar() == Some(ScalarType::Float) {
                return None;
            }
            OpTyping::same(ty)
        }
        UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec => {
            if operand.scalar() == Some(ScalarType::Bool) {
                return None;
            }
            OpTyping::same(operand.clone())
        }
    };
    Some(typing)
}

/// Component indices of a swizzle such as `xyz` or `bgra`.
///
/// Mixing the `xyzw` and `rgba` sets is rejected.
pub fn swizzle_components(text: &str) -> Option<Vec<u32>> {
    const SETS: [&[u8; 4]; 2] = [b"xyzw", b"rgba"];
    if text.is_empty() || text.len() > 4 {
        return None;
    }
    SETS.iter().find_map(|set| {
        text.bytes()
            .map(|c| set.iter().position(|&s| s == c).map(|i| i as u32))
            .collect()
    })
}

/// Result type of swizzling `base` with `text`.
pub fn swizzle(base: &Type, text: &str) -> Option<Type> {
    let (scalar, size) = match *base {
        Type::Scalar(s) => (s, 1),
        Type::Vector(s, n) => (s, u32::from(n)),
        _ => return None,
    };
    let components = swizzle_components(text)?;
    if components.iter().any(|&c| c >= size) {
        return None;
    }
    Some(Type::vector(scalar, components.len() as u8))
}

/// Whether `target(args...)` is a valid constructor call: a single scalar
/// splats, otherwise the argument components must add up exactly.
pub fn constructor_accepts(target: &Type, args: &[Type]) -> bool {
    let Some(expected) = target.component_count() else {
        return false;
    };
    if args.iter().any(Type::is_error) {
        return true;
    }
    if let [single] = args {
        if single.is_scalar() {
            return true;
        }
    }
    let mut total = 0;
    for arg in args {
        match arg.component_count() {
            Some(count) => total += count,
            None => return false,
        }
    }
    total == expected
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FLOAT3: Type = Type::Vector(ScalarType::Float, 3);
    const FLOAT4: Type = Type::Vector(ScalarType::Float, 4);

    #[test]
    fn test_conversions() {
        assert!(can_convert(&Type::INT, &Type::FLOAT));
        assert!(can_convert(&Type::FLOAT, &FLOAT4));
        assert!(can_convert(&FLOAT4, &FLOAT3));
        assert!(can_convert(&FLOAT4, &Type::FLOAT));
        assert!(!can_convert(&FLOAT3, &FLOAT4));
        assert!(!can_convert(&Type::Sampler, &Type::FLOAT));
        assert!(can_convert(&Type::Error, &Type::Sampler));
    }

    #[test]
    fn test_arithmetic_promotes_rank() {
        let typing = binary(BinaryOp::Add, &Type::INT, &FLOAT3);
        assert_eq!(typing, Some(OpTyping::same(FLOAT3)));
        let typing = binary(BinaryOp::Mul, &Type::BOOL, &Type::BOOL);
        assert_eq!(typing, Some(OpTyping::same(Type::INT)));
    }

    #[test]
    fn test_vector_size_mismatch() {
        assert_eq!(binary(BinaryOp::Add, &FLOAT3, &FLOAT4), None);
    }

    #[test]
    fn test_comparison_yields_bool_shape() {
        let typing = binary(BinaryOp::Lt, &FLOAT3, &Type::FLOAT);
        assert_eq!(
            typing,
            Some(OpTyping {
                operand: FLOAT3,
                result: Type::Vector(ScalarType::Bool, 3)
            })
        );
    }

    #[test]
    fn test_bitwise_rejects_float() {
        assert_eq!(binary(BinaryOp::BitAnd, &Type::FLOAT, &Type::INT), None);
        assert_eq!(
            binary(BinaryOp::Shl, &Type::UINT, &Type::INT),
            Some(OpTyping::same(Type::UINT))
        );
    }

    #[test]
    fn test_unary() {
        assert_eq!(
            unary(UnaryOp::Not, &FLOAT3).map(|t| t.result),
            Some(Type::Vector(ScalarType::Bool, 3))
        );
        assert_eq!(unary(UnaryOp::BitNot, &Type::FLOAT), None);
        assert_eq!(unary(UnaryOp::Neg, &Type::Sampler), None);
    }

    #[test]
    fn test_swizzles() {
        assert_eq!(swizzle_components("bgra"), Some(vec![2, 1, 0, 3]));
        assert_eq!(swizzle_components("xg"), None);
        assert_eq!(swizzle(&FLOAT3, "xy"), Some(Type::Vector(ScalarType::Float, 2)));
        assert_eq!(swizzle(&FLOAT3, "w"), None);
        assert_eq!(swizzle(&Type::FLOAT, "xxxx"), Some(FLOAT4));
        assert_eq!(swizzle(&FLOAT4, "xyzwx"), None);
    }

    #[test]
    fn test_constructors() {
        assert!(constructor_accepts(&FLOAT4, &[FLOAT3, Type::INT]));
        assert!(constructor_accepts(&FLOAT4, &[Type::FLOAT]));
        assert!(!constructor_accepts(&FLOAT4, &[FLOAT3]));
        assert!(!constructor_accepts(&FLOAT4, &[Type::Sampler]));
    }
}
