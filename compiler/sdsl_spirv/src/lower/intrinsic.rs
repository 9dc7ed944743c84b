//! Builtin functions and texture sampling.

use sdsl_diagnostic::ErrorCode;
use sdsl_ir::{BinaryOp, ExprId, Span};
use sdsl_types::{Intrinsic, ScalarType, TextureMethod, Type};

use super::function::FunctionLowerer;
use crate::builder::TypeKey;
use crate::instruction::{operands, Id};
use crate::op::{self, glsl, Op};

/// Pick the float, signed or unsigned variant of an extended instruction.
fn by_scalar(scalar: ScalarType, float: u32, signed: u32, unsigned: u32) -> u32 {
    match scalar {
        ScalarType::Float => float,
        ScalarType::UInt => unsigned,
        ScalarType::Int | ScalarType::Bool => signed,
    }
}

impl FunctionLowerer<'_, '_> {
    pub(super) fn lower_intrinsic(&mut self, intrinsic: Intrinsic, args: &[ExprId], span: Span) -> Id {
        let arg_tys: Vec<Type> = args.iter().map(|&a| self.ty(a).clone()).collect();
        let typing = match intrinsic.signature(&arg_tys) {
            Ok(typing) if !typing.result.is_error() => typing,
            Ok(_) => return Id::NONE,
            Err(_) => {
                let message = format!("call to `{}` was not type checked", intrinsic.name());
                self.error(ErrorCode::E9002, span, message, "here");
                return Id::NONE;
            }
        };
        let values: Vec<Id> = args
            .iter()
            .zip(&typing.params)
            .map(|(&arg, param)| self.eval_as(arg, param))
            .collect();
        let param = typing.params.first().cloned().unwrap_or(Type::FLOAT);
        let scalar = param.scalar().unwrap_or(ScalarType::Float);
        let result = self.em.lower_type(&typing.result);

        match intrinsic {
            Intrinsic::Abs if scalar == ScalarType::UInt => values[0],
            Intrinsic::Abs => self.ext(result, by_scalar(scalar, glsl::F_ABS, glsl::S_ABS, 0), &values),
            Intrinsic::Sign if scalar == ScalarType::UInt => {
                let one = self.em.one(&param);
                self.ext(result, glsl::U_MIN, &[values[0], one])
            }
            Intrinsic::Sign => self.ext(result, by_scalar(scalar, glsl::F_SIGN, glsl::S_SIGN, 0), &values),
            Intrinsic::Sin => self.ext(result, glsl::SIN, &values),
            Intrinsic::Cos => self.ext(result, glsl::COS, &values),
            Intrinsic::Tan => self.ext(result, glsl::TAN, &values),
            Intrinsic::Asin => self.ext(result, glsl::ASIN, &values),
            Intrinsic::Acos => self.ext(result, glsl::ACOS, &values),
            Intrinsic::Atan => self.ext(result, glsl::ATAN, &values),
            Intrinsic::Exp => self.ext(result, glsl::EXP, &values),
            Intrinsic::Exp2 => self.ext(result, glsl::EXP2, &values),
            Intrinsic::Log => self.ext(result, glsl::LOG, &values),
            Intrinsic::Log2 => self.ext(result, glsl::LOG2, &values),
            Intrinsic::Sqrt => self.ext(result, glsl::SQRT, &values),
            Intrinsic::Rsqrt => self.ext(result, glsl::INVERSE_SQRT, &values),
            Intrinsic::Floor => self.ext(result, glsl::FLOOR, &values),
            Intrinsic::Ceil => self.ext(result, glsl::CEIL, &values),
            Intrinsic::Frac => self.ext(result, glsl::FRACT, &values),
            Intrinsic::Round => self.ext(result, glsl::ROUND, &values),
            Intrinsic::Trunc => self.ext(result, glsl::TRUNC, &values),
            Intrinsic::Normalize => self.ext(result, glsl::NORMALIZE, &values),
            Intrinsic::Saturate => {
                let zero = self.em.zero(&param);
                let one = self.em.one(&param);
                self.ext(result, glsl::F_CLAMP, &[values[0], zero, one])
            }
            Intrinsic::Ddx => self.emit(Op::DPdx, result, operands![id values[0]]),
            Intrinsic::Ddy => self.emit(Op::DPdy, result, operands![id values[0]]),
            Intrinsic::Length => self.ext(result, glsl::LENGTH, &values),
            Intrinsic::Distance => self.ext(result, glsl::DISTANCE, &values),
            Intrinsic::Any | Intrinsic::All if param.is_scalar() => values[0],
            Intrinsic::Any => self.emit(Op::Any, result, operands![id values[0]]),
            Intrinsic::All => self.emit(Op::All, result, operands![id values[0]]),
            Intrinsic::Min => {
                self.ext(result, by_scalar(scalar, glsl::F_MIN, glsl::S_MIN, glsl::U_MIN), &values)
            }
            Intrinsic::Max => {
                self.ext(result, by_scalar(scalar, glsl::F_MAX, glsl::S_MAX, glsl::U_MAX), &values)
            }
            Intrinsic::Clamp => self.ext(
                result,
                by_scalar(scalar, glsl::F_CLAMP, glsl::S_CLAMP, glsl::U_CLAMP),
                &values,
            ),
            Intrinsic::Atan2 => self.ext(result, glsl::ATAN2, &values),
            Intrinsic::Pow => self.ext(result, glsl::POW, &values),
            Intrinsic::Step => self.ext(result, glsl::STEP, &values),
            Intrinsic::Reflect => self.ext(result, glsl::REFLECT, &values),
            Intrinsic::Cross => self.ext(result, glsl::CROSS, &values),
            Intrinsic::Lerp => self.ext(result, glsl::F_MIX, &values),
            Intrinsic::Smoothstep => self.ext(result, glsl::SMOOTH_STEP, &values),
            Intrinsic::Fmod => self.emit(Op::FRem, result, operands![id values[0], id values[1]]),
            Intrinsic::Dot => self.dot(&param, values[0], values[1]),
            Intrinsic::Mad => {
                let product = self.binary_op(BinaryOp::Mul, &param, values[0], values[1]);
                self.binary_op(BinaryOp::Add, &param, product, values[2])
            }
            Intrinsic::Mul => {
                let rhs = typing.params.get(1).cloned().unwrap_or(Type::FLOAT);
                self.mul(&param, &rhs, &typing.result, values[0], values[1], span)
            }
        }
    }

    /// Dot product of two values of type `operand`. Only float vectors
    /// have a native instruction; the rest multiply and sum.
    fn dot(&mut self, operand: &Type, l: Id, r: Id) -> Id {
        let scalar = operand.scalar().unwrap_or(ScalarType::Float);
        let scalar_ty = Type::Scalar(scalar);
        if scalar == ScalarType::Float && matches!(operand, Type::Vector(..)) {
            let ty_id = self.em.lower_type(&scalar_ty);
            return self.emit(Op::Dot, ty_id, operands![id l, id r]);
        }
        let product = self.binary_op(BinaryOp::Mul, operand, l, r);
        let parts = self.components(product, operand);
        let mut parts = parts.into_iter();
        let first = parts.next().unwrap_or(Id::NONE);
        parts.fold(first, |sum, part| {
            self.binary_op(BinaryOp::Add, &scalar_ty, sum, part)
        })
    }

    /// `mul(a, b)`. Vectors on the left are rows, on the right columns.
    fn mul(&mut self, lhs: &Type, rhs: &Type, result: &Type, l: Id, r: Id, span: Span) -> Id {
        let float = lhs.scalar() == Some(ScalarType::Float);
        let result_id = self.em.lower_type(result);
        match (lhs, rhs) {
            (Type::Scalar(_), Type::Scalar(_)) => self.binary_op(BinaryOp::Mul, lhs, l, r),
            (Type::Scalar(_), Type::Vector(..)) if float => {
                self.emit(Op::VectorTimesScalar, result_id, operands![id r, id l])
            }
            (Type::Vector(..), Type::Scalar(_)) if float => {
                self.emit(Op::VectorTimesScalar, result_id, operands![id l, id r])
            }
            (Type::Scalar(_), Type::Matrix { .. }) if float => {
                self.emit(Op::MatrixTimesScalar, result_id, operands![id r, id l])
            }
            (Type::Matrix { .. }, Type::Scalar(_)) if float => {
                self.emit(Op::MatrixTimesScalar, result_id, operands![id l, id r])
            }
            (Type::Scalar(_), Type::Vector(..)) => {
                let splat = self.splat(l, rhs);
                self.binary_op(BinaryOp::Mul, rhs, splat, r)
            }
            (Type::Vector(..), Type::Scalar(_)) => {
                let splat = self.splat(r, lhs);
                self.binary_op(BinaryOp::Mul, lhs, l, splat)
            }
            (Type::Vector(..), Type::Vector(..)) => self.dot(lhs, l, r),
            (Type::Vector(..), Type::Matrix { .. }) if float => {
                self.emit(Op::VectorTimesMatrix, result_id, operands![id l, id r])
            }
            (Type::Matrix { .. }, Type::Vector(..)) if float => {
                self.emit(Op::MatrixTimesVector, result_id, operands![id l, id r])
            }
            (Type::Matrix { .. }, Type::Matrix { .. }) if float => {
                self.emit(Op::MatrixTimesMatrix, result_id, operands![id l, id r])
            }
            _ => {
                self.error(
                    ErrorCode::E5003,
                    span,
                    "`mul` on integer matrices is not supported",
                    "integer matrix",
                );
                Id::NONE
            }
        }
    }

    /// `texture.Sample(sampler, uv)` and `texture.SampleLevel(sampler, uv, lod)`.
    pub(super) fn sample(
        &mut self,
        method: TextureMethod,
        object: ExprId,
        args: &[ExprId],
        span: Span,
    ) -> Id {
        let texture = self.ty(object).clone();
        let arg_tys: Vec<Type> = args.iter().map(|&a| self.ty(a).clone()).collect();
        let typing = match method.signature(&texture, &arg_tys) {
            Ok(typing) => typing,
            Err(_) => {
                self.error(ErrorCode::E9002, span, "texture call was not type checked", "here");
                return Id::NONE;
            }
        };
        let Type::Texture { sample, .. } = texture else {
            return Id::NONE;
        };

        let image = self.eval(object);
        let values: Vec<Id> = args
            .iter()
            .zip(&typing.params)
            .map(|(&arg, param)| self.eval_as(arg, param))
            .collect();

        let image_ty = self.em.lower_type(&texture);
        let sampled_ty = self.em.builder.type_id(TypeKey::SampledImage(image_ty));
        let sampled = self.emit(Op::SampledImage, sampled_ty, operands![id image, id values[0]]);

        let texel_ty = Type::Vector(sample, 4);
        let texel_id = self.em.lower_type(&texel_ty);
        let texel = match method {
            TextureMethod::Sample => self.emit(
                Op::ImageSampleImplicitLod,
                texel_id,
                operands![id sampled, id values[1]],
            ),
            TextureMethod::SampleLevel => self.emit(
                Op::ImageSampleExplicitLod,
                texel_id,
                operands![id sampled, id values[1], lit op::IMAGE_OPERANDS_LOD, id values[2]],
            ),
        };
        self.convert(texel, &texel_ty, &typing.result)
    }
}
