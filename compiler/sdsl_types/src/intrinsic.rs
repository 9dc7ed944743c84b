//! Builtin intrinsic functions and texture methods.
//!
//! Every intrinsic is typed by its argument types: the table picks the
//! common shape of the arguments and reports the parameter types each
//! argument converts to plus the result type.

use crate::ops::{common_shape, promote_bool};
use crate::{ScalarType, Type};

#[derive(Clone, Eq, PartialEq, Debug)]
pub enum IntrinsicError {
    ArgumentCount { expected: usize, found: usize },
    NoOverload,
}

/// Parameter and result types for one call.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct IntrinsicTyping {
    pub params: Vec<Type>,
    pub result: Type,
}

impl IntrinsicTyping {
    fn uniform(param: &Type, count: usize, result: Type) -> Self {
        IntrinsicTyping {
            params: vec![param.clone(); count],
            result,
        }
    }
}

/// How an intrinsic's arguments combine.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum Shape {
    /// Component-wise over floats; the result has the argument shape.
    Float,
    /// Component-wise over any numeric type.
    Numeric,
    /// Reduces a vector to a float scalar (`length`, `distance`).
    FloatReduce,
    /// `dot`: reduces to the component type.
    Dot,
    /// `any`/`all`: reduces to `bool`.
    BoolReduce,
    /// `cross`: `float3 x float3`.
    Cross,
    /// `mul`: matrix algebra.
    Mul,
}

macro_rules! intrinsics {
    ($($variant:ident => $name:literal, $arity:literal, $shape:ident;)*) => {
        /// A builtin function callable from shader code.
        #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
        pub enum Intrinsic {
            $($variant,)*
        }

        impl Intrinsic {
            pub const ALL: &'static [Intrinsic] = &[$(Intrinsic::$variant,)*];

            pub fn from_name(name: &str) -> Option<Intrinsic> {
                match name {
                    $($name => Some(Intrinsic::$variant),)*
                    _ => None,
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $(Intrinsic::$variant => $name,)*
                }
            }

            pub fn arity(self) -> usize {
                match self {
                    $(Intrinsic::$variant => $arity,)*
                }
            }

            fn shape(self) -> Shape {
                match self {
                    $(Intrinsic::$variant => Shape::$shape,)*
                }
            }
        }
    };
}

intrinsics! {
    Abs => "abs", 1, Numeric;
    Sign => "sign", 1, Numeric;
    Sin => "sin", 1, Float;
    Cos => "cos", 1, Float;
    Tan => "tan", 1, Float;
    Asin => "asin", 1, Float;
    Acos => "acos", 1, Float;
    Atan => "atan", 1, Float;
    Exp => "exp", 1, Float;
    Exp2 => "exp2", 1, Float;
    Log => "log", 1, Float;
    Log2 => "log2", 1, Float;
    Sqrt => "sqrt", 1, Float;
    Rsqrt => "rsqrt", 1, Float;
    Floor => "floor", 1, Float;
    Ceil => "ceil", 1, Float;
    Frac => "frac", 1, Float;
    Round => "round", 1, Float;
    Trunc => "trunc", 1, Float;
    Saturate => "saturate", 1, Float;
    Normalize => "normalize", 1, Float;
    Ddx => "ddx", 1, Float;
    Ddy => "ddy", 1, Float;
    Length => "length", 1, FloatReduce;
    Any => "any", 1, BoolReduce;
    All => "all", 1, BoolReduce;
    Min => "min", 2, Numeric;
    Max => "max", 2, Numeric;
    Atan2 => "atan2", 2, Float;
    Pow => "pow", 2, Float;
    Step => "step", 2, Float;
    Fmod => "fmod", 2, Float;
    Reflect => "reflect", 2, Float;
    Distance => "distance", 2, FloatReduce;
    Dot => "dot", 2, Dot;
    Cross => "cross", 2, Cross;
    Mul => "mul", 2, Mul;
    Clamp => "clamp", 3, Numeric;
    Mad => "mad", 3, Numeric;
    Lerp => "lerp", 3, Float;
    Smoothstep => "smoothstep", 3, Float;
}

/// Scalar or vector: the shapes component-wise intrinsics accept.
fn is_elementwise(ty: &Type) -> bool {
    matches!(ty, Type::Scalar(_) | Type::Vector(..))
}

/// The common shape of every argument.
fn fold_shape(args: &[Type]) -> Option<Type> {
    let (first, rest) = args.split_first()?;
    if !is_elementwise(first) {
        return None;
    }
    rest.iter().try_fold(first.clone(), |acc, arg| {
        is_elementwise(arg).then(|| common_shape(&acc, arg)).flatten()
    })
}

impl Intrinsic {
    /// Type a call with the given argument types.
    pub fn signature(self, args: &[Type]) -> Result<IntrinsicTyping, IntrinsicError> {
        if args.len() != self.arity() {
            return Err(IntrinsicError::ArgumentCount {
                expected: self.arity(),
                found: args.len(),
            });
        }
        if args.iter().any(Type::is_error) {
            return Ok(IntrinsicTyping::uniform(&Type::Error, args.len(), Type::Error));
        }
        let n = args.len();
        let typing = match self.shape() {
            Shape::Float => {
                let shape = fold_shape(args).ok_or(IntrinsicError::NoOverload)?;
                let shape = shape.with_scalar(ScalarType::Float);
                IntrinsicTyping::uniform(&shape, n, shape.clone())
            }
            Shape::Numeric => {
                let shape = promote_bool(fold_shape(args).ok_or(IntrinsicError::NoOverload)?);
                IntrinsicTyping::uniform(&shape, n, shape.clone())
            }
            Shape::FloatReduce => {
                let shape = fold_shape(args).ok_or(IntrinsicError::NoOverload)?;
                IntrinsicTyping::uniform(&shape.with_scalar(ScalarType::Float), n, Type::FLOAT)
            }
            Shape::Dot => {
                let shape = promote_bool(fold_shape(args).ok_or(IntrinsicError::NoOverload)?);
                let scalar = shape.scalar().ok_or(IntrinsicError::NoOverload)?;
                IntrinsicTyping::uniform(&shape, n, Type::Scalar(scalar))
            }
            Shape::BoolReduce => {
                let shape = fold_shape(args).ok_or(IntrinsicError::NoOverload)?;
                IntrinsicTyping::uniform(&shape.with_scalar(ScalarType::Bool), n, Type::BOOL)
            }
            Shape::Cross => {
                let float3 = Type::Vector(ScalarType::Float, 3);
                let ok = args
                    .iter()
                    .all(|a| matches!(a, Type::Vector(_, 3)));
                if !ok {
                    return Err(IntrinsicError::NoOverload);
                }
                IntrinsicTyping::uniform(&float3, n, float3.clone())
            }
            Shape::Mul => mul_signature(&args[0], &args[1])?,
        };
        Ok(typing)
    }
}

/// `mul(a, b)`: scalar scaling, row vector times matrix, matrix times
/// column vector, matrix product, or a dot product of two vectors.
fn mul_signature(lhs: &Type, rhs: &Type) -> Result<IntrinsicTyping, IntrinsicError> {
    let scalar = lhs
        .scalar()
        .zip(rhs.scalar())
        .map(|(a, b)| a.max(b).max(ScalarType::Int))
        .ok_or(IntrinsicError::NoOverload)?;
    let (lhs, rhs) = (lhs.with_scalar(scalar), rhs.with_scalar(scalar));
    let result = match (&lhs, &rhs) {
        (Type::Scalar(_), other) | (other, Type::Scalar(_)) => other.clone(),
        (Type::Vector(_, n), Type::Matrix { rows, cols, .. }) if n == rows => {
            Type::Vector(scalar, *cols)
        }
        (Type::Matrix { rows, cols, .. }, Type::Vector(_, n)) if n == cols => {
            Type::Vector(scalar, *rows)
        }
        (
            Type::Matrix { rows, cols, .. },
            Type::Matrix {
                rows: inner,
                cols: out_cols,
                ..
            },
        ) if cols == inner => Type::Matrix {
            scalar,
            rows: *rows,
            cols: *out_cols,
        },
        (Type::Vector(_, n), Type::Vector(_, m)) if n == m => Type::Scalar(scalar),
        _ => return Err(IntrinsicError::NoOverload),
    };
    Ok(IntrinsicTyping {
        params: vec![lhs, rhs],
        result,
    })
}

/// Methods callable on a texture object.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum TextureMethod {
    /// `Sample(sampler, uv)`
    Sample,
    /// `SampleLevel(sampler, uv, lod)`
    SampleLevel,
}

impl TextureMethod {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Sample" => Some(TextureMethod::Sample),
            "SampleLevel" => Some(TextureMethod::SampleLevel),
            _ => None,
        }
    }

    pub fn arity(self) -> usize {
        match self {
            TextureMethod::Sample => 2,
            TextureMethod::SampleLevel => 3,
        }
    }

    /// Type a call on a texture of type `texture`.
    pub fn signature(
        self,
        texture: &Type,
        args: &[Type],
    ) -> Result<IntrinsicTyping, IntrinsicError> {
        let Type::Texture { kind, sample, size } = *texture else {
            return Err(IntrinsicError::NoOverload);
        };
        if args.len() != self.arity() {
            return Err(IntrinsicError::ArgumentCount {
                expected: self.arity(),
                found: args.len(),
            });
        }
        if !matches!(args[0], Type::Sampler | Type::Error) {
            return Err(IntrinsicError::NoOverload);
        }
        let coord = Type::vector(ScalarType::Float, kind.coordinate_size());
        let mut params = vec![Type::Sampler, coord];
        if self == TextureMethod::SampleLevel {
            params.push(Type::FLOAT);
        }
        let convertible = args
            .iter()
            .zip(&params)
            .skip(1)
            .all(|(arg, param)| crate::ops::can_convert(arg, param));
        if !convertible {
            return Err(IntrinsicError::NoOverload);
        }
        Ok(IntrinsicTyping {
            params,
            result: Type::vector(sample, size),
        })
    }
}
