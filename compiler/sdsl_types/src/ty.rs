//! Core type representation.

use std::fmt;

use sdsl_ir::{Name, StringInterner};

/// Scalar component type, ordered by conversion rank.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub enum ScalarType {
    Bool,
    Int,
    UInt,
    Float,
}

impl ScalarType {
    pub fn name(self) -> &'static str {
        match self {
            ScalarType::Bool => "bool",
            ScalarType::Int => "int",
            ScalarType::UInt => "uint",
            ScalarType::Float => "float",
        }
    }

    #[inline]
    pub fn is_integer(self) -> bool {
        matches!(self, ScalarType::Int | ScalarType::UInt)
    }

    /// Size in bytes inside a constant buffer. Booleans occupy a full word.
    #[inline]
    pub const fn byte_size(self) -> u32 {
        4
    }
}

/// Resource texture kinds.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum TextureKind {
    Texture1D,
    Texture2D,
    Texture3D,
    TextureCube,
    Texture2DArray,
}

impl TextureKind {
    pub fn name(self) -> &'static str {
        match self {
            TextureKind::Texture1D => "Texture1D",
            TextureKind::Texture2D => "Texture2D",
            TextureKind::Texture3D => "Texture3D",
            TextureKind::TextureCube => "TextureCube",
            TextureKind::Texture2DArray => "Texture2DArray",
        }
    }

    fn from_name(text: &str) -> Option<Self> {
        Some(match text {
            "Texture1D" => TextureKind::Texture1D,
            "Texture2D" => TextureKind::Texture2D,
            "Texture3D" => TextureKind::Texture3D,
            "TextureCube" => TextureKind::TextureCube,
            "Texture2DArray" => TextureKind::Texture2DArray,
            _ => return None,
        })
    }

    /// Components of the sampling coordinate.
    pub fn coordinate_size(self) -> u8 {
        match self {
            TextureKind::Texture1D => 1,
            TextureKind::Texture2D => 2,
            TextureKind::Texture3D | TextureKind::TextureCube | TextureKind::Texture2DArray => 3,
        }
    }
}

/// A resolved SDSL type.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum Type {
    Void,
    Scalar(ScalarType),
    /// `floatN`, 2 to 4 components.
    Vector(ScalarType, u8),
    /// `floatRxC`; stored column-major.
    Matrix { scalar: ScalarType, rows: u8, cols: u8 },
    Array(Box<Type>, u32),
    Struct(Name),
    /// `Texture2D<float4>`; the sample type is always a 4-component vector
    /// or narrower.
    Texture { kind: TextureKind, sample: ScalarType, size: u8 },
    Sampler,
    /// Poison produced after a reported error.
    Error,
}

impl Type {
    pub const BOOL: Type = Type::Scalar(ScalarType::Bool);
    pub const INT: Type = Type::Scalar(ScalarType::Int);
    pub const UINT: Type = Type::Scalar(ScalarType::UInt);
    pub const FLOAT: Type = Type::Scalar(ScalarType::Float);

    /// A vector, collapsing one-component vectors to scalars.
    pub fn vector(scalar: ScalarType, size: u8) -> Type {
        if size <= 1 {
            Type::Scalar(scalar)
        } else {
            Type::Vector(scalar, size)
        }
    }

    /// Same shape, different component type.
    #[must_use]
    pub fn with_scalar(&self, scalar: ScalarType) -> Type {
        match *self {
            Type::Scalar(_) => Type::Scalar(scalar),
            Type::Vector(_, n) => Type::Vector(scalar, n),
            Type::Matrix { rows, cols, .. } => Type::Matrix { scalar, rows, cols },
            _ => self.clone(),
        }
    }

    /// Component type of a scalar, vector or matrix.
    pub fn scalar(&self) -> Option<ScalarType> {
        match *self {
            Type::Scalar(s) | Type::Vector(s, _) | Type::Matrix { scalar: s, .. } => Some(s),
            _ => None,
        }
    }

    /// Number of scalar components, for numeric types.
    pub fn component_count(&self) -> Option<u32> {
        match *self {
            Type::Scalar(_) => Some(1),
            Type::Vector(_, n) => Some(u32::from(n)),
            Type::Matrix { rows, cols, .. } => Some(u32::from(rows) * u32::from(cols)),
            _ => None,
        }
    }

    #[inline]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Scalar(_) | Type::Vector(..) | Type::Matrix { .. })
    }

    #[inline]
    pub fn is_scalar(&self) -> bool {
        matches!(self, Type::Scalar(_))
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error)
    }

    /// Textures and samplers live outside constant buffers.
    #[inline]
    pub fn is_resource(&self) -> bool {
        matches!(self, Type::Texture { .. } | Type::Sampler)
    }

    /// Array element type.
    pub fn element(&self) -> Option<&Type> {
        match self {
            Type::Array(element, _) => Some(element),
            _ => None,
        }
    }

    /// Resolve a builtin type name. `half` and `double` are treated as
    /// `float`, `dword` as `uint`. Struct names are not builtins.
    pub fn from_builtin_name(text: &str, arg: Option<&str>) -> Option<Type> {
        const SCALARS: [(&str, ScalarType); 7] = [
            ("bool", ScalarType::Bool),
            ("int", ScalarType::Int),
            ("uint", ScalarType::UInt),
            ("dword", ScalarType::UInt),
            ("float", ScalarType::Float),
            ("half", ScalarType::Float),
            ("double", ScalarType::Float),
        ];
        match text {
            "void" => return Some(Type::Void),
            "SamplerState" | "SamplerComparisonState" => return Some(Type::Sampler),
            _ => {}
        }
        if let Some(kind) = TextureKind::from_name(text) {
            let sample = match arg {
                None => Type::Vector(ScalarType::Float, 4),
                Some(arg) => Type::from_builtin_name(arg, None)?,
            };
            let (Some(scalar), Some(size)) = (sample.scalar(), sample.component_count()) else {
                return None;
            };
            if matches!(sample, Type::Matrix { .. }) {
                return None;
            }
            return Some(Type::Texture {
                kind,
                sample: scalar,
                size: size as u8,
            });
        }

        let (prefix, scalar) = SCALARS.iter().find(|(p, _)| text.starts_with(p))?;
        let dim = |b: u8| (b'1'..=b'4').contains(&b).then(|| b - b'0');
        match text[prefix.len()..].as_bytes() {
            [] => Some(Type::Scalar(*scalar)),
            [n] => dim(*n).map(|n| Type::vector(*scalar, n)),
            [r, b'x', c] => Some(Type::Matrix {
                scalar: *scalar,
                rows: dim(*r)?,
                cols: dim(*c)?,
            }),
            _ => None,
        }
    }

    /// Display with struct names resolved.
    pub fn display<'a>(&'a self, interner: &'a StringInterner) -> TypeDisplay<'a> {
        TypeDisplay { ty: self, interner }
    }
}

/// [`Type`] formatter returned by [`Type::display`].
pub struct TypeDisplay<'a> {
    ty: &'a Type,
    interner: &'a StringInterner,
}

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ty {
            Type::Void => f.write_str("void"),
            Type::Scalar(s) => f.write_str(s.name()),
            Type::Vector(s, n) => write!(f, "{}{n}", s.name()),
            Type::Matrix { scalar, rows, cols } => write!(f, "{}{rows}x{cols}", scalar.name()),
            Type::Array(element, len) => {
                write!(f, "{}[{len}]", element.display(self.interner))
            }
            Type::Struct(name) => f.write_str(self.interner.lookup(*name)),
            Type::Texture { kind, sample, size } => {
                write!(f, "{}<{}", kind.name(), sample.name())?;
                if *size > 1 {
                    write!(f, "{size}")?;
                }
                f.write_str(">")
            }
            Type::Sampler => f.write_str("SamplerState"),
            Type::Error => f.write_str("<error>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builtin_names() {
        assert_eq!(Type::from_builtin_name("float", None), Some(Type::FLOAT));
        assert_eq!(
            Type::from_builtin_name("half3", None),
            Some(Type::Vector(ScalarType::Float, 3))
        );
        assert_eq!(Type::from_builtin_name("int1", None), Some(Type::INT));
        assert_eq!(
            Type::from_builtin_name("float4x3", None),
            Some(Type::Matrix {
                scalar: ScalarType::Float,
                rows: 4,
                cols: 3
            })
        );
        assert_eq!(Type::from_builtin_name("float5", None), None);
        assert_eq!(Type::from_builtin_name("Light", None), None);
    }

    #[test]
    fn test_texture_names() {
        assert_eq!(
            Type::from_builtin_name("Texture2D", Some("uint2")),
            Some(Type::Texture {
                kind: TextureKind::Texture2D,
                sample: ScalarType::UInt,
                size: 2
            })
        );
        assert_eq!(Type::from_builtin_name("Texture2D", Some("float4x4")), None);
        assert_eq!(
            Type::from_builtin_name("SamplerComparisonState", None),
            Some(Type::Sampler)
        );
    }

    #[test]
    fn test_display() {
        let interner = StringInterner::new();
        let light = Type::Struct(interner.intern("Light"));
        let array = Type::Array(Box::new(light), 4);
        assert_eq!(array.display(&interner).to_string(), "Light[4]");
        let texture = Type::from_builtin_name("TextureCube", None);
        assert_eq!(
            texture.map(|t| t.display(&interner).to_string()),
            Some("TextureCube<float4>".to_string())
        );
    }

    #[test]
    fn test_scalar_rank_order() {
        assert!(ScalarType::Bool < ScalarType::Int);
        assert!(ScalarType::Int < ScalarType::UInt);
        assert!(ScalarType::UInt < ScalarType::Float);
    }
}
