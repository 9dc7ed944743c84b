//! Type lowering and constant construction.

use sdsl_diagnostic::ErrorCode;
use sdsl_ir::{Name, SourceId, Span};
use sdsl_types::{layout, ScalarType, TextureKind, Type};

use super::Emitter;
use crate::builder::{ConstValue, StructKey, TypeKey};
use crate::instruction::Id;
use crate::op::{Capability, Decoration, Dim, StorageClass};

impl Emitter<'_> {
    pub(crate) fn scalar_type(&mut self, scalar: ScalarType) -> Id {
        self.builder.type_id(match scalar {
            ScalarType::Bool => TypeKey::Bool,
            ScalarType::Int => TypeKey::Int { signed: true },
            ScalarType::UInt => TypeKey::Int { signed: false },
            ScalarType::Float => TypeKey::Float,
        })
    }

    /// The SPIR-V type of a value of type `ty`.
    pub(crate) fn lower_type(&mut self, ty: &Type) -> Id {
        match ty {
            Type::Void => self.builder.type_id(TypeKey::Void),
            Type::Scalar(scalar) => self.scalar_type(*scalar),
            Type::Vector(scalar, n) => {
                let component = self.scalar_type(*scalar);
                self.builder
                    .type_id(TypeKey::Vector(component, u32::from(*n)))
            }
            Type::Matrix { scalar, rows, cols } => {
                let column = self.lower_type(&Type::vector(*scalar, *rows));
                self.builder
                    .type_id(TypeKey::Matrix(column, u32::from(*cols)))
            }
            Type::Array(element, len) => {
                let element_id = self.lower_type(element);
                let id = self.builder.type_id(TypeKey::Array(element_id, *len));
                self.decorate_array(id, element);
                id
            }
            Type::Struct(name) => self.lower_struct(*name),
            Type::Texture { kind, sample, .. } => {
                let sampled = self.scalar_type(*sample);
                let dim = match kind {
                    TextureKind::Texture1D => {
                        self.builder.capability(Capability::Sampled1D);
                        Dim::Dim1D
                    }
                    TextureKind::Texture2D | TextureKind::Texture2DArray => Dim::Dim2D,
                    TextureKind::Texture3D => Dim::Dim3D,
                    TextureKind::TextureCube => Dim::Cube,
                };
                self.builder.type_id(TypeKey::Image {
                    sampled,
                    dim: dim as u32,
                    arrayed: *kind == TextureKind::Texture2DArray,
                })
            }
            Type::Sampler => self.builder.type_id(TypeKey::Sampler),
            // Only reachable after a reported error; any type will do.
            Type::Error => self.builder.type_id(TypeKey::Float),
        }
    }

    /// Storage type inside a constant buffer: booleans are stored as
    /// `uint`, which is also how they are laid out.
    pub(crate) fn uniform_type(&mut self, ty: &Type) -> Id {
        match ty {
            Type::Scalar(ScalarType::Bool) | Type::Vector(ScalarType::Bool, _) => {
                self.lower_type(&ty.with_scalar(ScalarType::UInt))
            }
            Type::Array(element, len) => {
                let element_id = self.uniform_type(element);
                let id = self.builder.type_id(TypeKey::Array(element_id, *len));
                self.decorate_array(id, element);
                id
            }
            _ => self.lower_type(ty),
        }
    }

    pub(crate) fn pointer_type(&mut self, class: StorageClass, ty: &Type, packed: bool) -> Id {
        let pointee = if packed {
            self.uniform_type(ty)
        } else {
            self.lower_type(ty)
        };
        self.builder.pointer(class, pointee)
    }

    fn decorate_array(&mut self, id: Id, element: &Type) {
        if element.is_resource() || !self.decorated.insert(id) {
            return;
        }
        let stride = layout::array_stride(element, &self.program.structs);
        self.builder.decorate(id, Decoration::ArrayStride, &[stride]);
    }

    fn lower_struct(&mut self, name: Name) -> Id {
        let key = StructKey::Shader(name);
        if let Some(id) = self.builder.struct_id(key) {
            return id;
        }
        let program = self.program;
        let structs = &program.structs;
        let Some(def) = structs.get(name) else {
            return self.builder.type_id(TypeKey::Float);
        };
        let members: Vec<Id> = def.members.iter().map(|m| self.lower_type(&m.ty)).collect();
        let id = self.builder.struct_type(key, &members);
        let struct_layout = layout::struct_layout(def, structs);
        self.builder.name(id, self.interner.lookup(name));
        for (index, member) in struct_layout.members.iter().enumerate() {
            let index = index as u32;
            self.builder
                .member_decorate(id, index, Decoration::Offset, &[member.offset]);
            self.decorate_matrix_member(id, index, &member.ty);
            self.builder
                .member_name(id, index, self.interner.lookup(member.name));
        }
        id
    }

    /// Column-major layout with one register per column, for matrices
    /// directly inside a struct or behind arrays.
    pub(super) fn decorate_matrix_member(&mut self, target: Id, member: u32, ty: &Type) {
        let mut ty = ty;
        while let Type::Array(element, _) = ty {
            ty = element;
        }
        if matches!(ty, Type::Matrix { .. }) {
            self.builder
                .member_decorate(target, member, Decoration::ColMajor, &[]);
            self.builder.member_decorate(
                target,
                member,
                Decoration::MatrixStride,
                &[layout::MATRIX_STRIDE],
            );
        }
    }

    /// Report types that have no SPIR-V mapping.
    pub(super) fn check_supported(&mut self, ty: &Type, source: SourceId, span: Span) {
        let problem = match ty {
            Type::Matrix { scalar, .. } if *scalar != ScalarType::Float => {
                Some("only float matrices are supported".to_string())
            }
            Type::Matrix { rows, cols, .. } if *rows < 2 || *cols < 2 => {
                Some("matrices need at least two rows and two columns".to_string())
            }
            Type::Texture {
                sample: ScalarType::Bool,
                ..
            } => Some("textures cannot hold booleans".to_string()),
            Type::Array(element, _) => {
                self.check_supported(element, source, span);
                None
            }
            Type::Struct(name) => {
                let members: Vec<Type> = self
                    .program
                    .structs
                    .get(*name)
                    .map(|def| def.members.iter().map(|m| m.ty.clone()).collect())
                    .unwrap_or_default();
                for member in &members {
                    self.check_supported(member, source, span);
                }
                None
            }
            _ => None,
        };
        if let Some(problem) = problem {
            let message = format!(
                "type `{}` is not supported: {problem}",
                ty.display(self.interner)
            );
            self.error(ErrorCode::E5003, source, span, message, "unsupported type");
        }
    }

    /// Whether `ty` is or contains a struct with a boolean member.
    pub(super) fn struct_has_bool(&self, ty: &Type) -> bool {
        match ty {
            Type::Array(element, _) => self.struct_has_bool(element),
            Type::Struct(name) => self.program.structs.get(*name).is_some_and(|def| {
                def.members.iter().any(|m| {
                    m.ty.scalar() == Some(ScalarType::Bool) || self.struct_has_bool(&m.ty)
                })
            }),
            _ => false,
        }
    }

    // Constants

    pub(crate) fn const_bool(&mut self, value: bool) -> Id {
        let ty = self.scalar_type(ScalarType::Bool);
        self.builder.constant(ty, ConstValue::Bool(value))
    }

    pub(crate) fn const_int(&mut self, value: i32) -> Id {
        let ty = self.scalar_type(ScalarType::Int);
        self.builder.constant(ty, ConstValue::Word(value as u32))
    }

    pub(crate) fn const_uint(&mut self, value: u32) -> Id {
        let ty = self.scalar_type(ScalarType::UInt);
        self.builder.constant(ty, ConstValue::Word(value))
    }

    pub(crate) fn const_float(&mut self, value: f32) -> Id {
        let ty = self.scalar_type(ScalarType::Float);
        self.builder.constant(ty, ConstValue::Word(value.to_bits()))
    }

    /// A constant of numeric type `ty` with every component equal to the
    /// scalar `small` (0 or 1), converted to the component type.
    fn const_filled(&mut self, ty: &Type, small: u8) -> Id {
        let Some(scalar) = ty.scalar() else {
            let ty = self.lower_type(ty);
            return self.builder.constant(ty, ConstValue::Null);
        };
        let component = match scalar {
            ScalarType::Bool => self.const_bool(small != 0),
            ScalarType::Int => self.const_int(i32::from(small)),
            ScalarType::UInt => self.const_uint(u32::from(small)),
            ScalarType::Float => self.const_float(f32::from(small)),
        };
        self.const_splat(component, ty)
    }

    /// A composite constant repeating `component` to fill `ty`.
    pub(crate) fn const_splat(&mut self, component: Id, ty: &Type) -> Id {
        match *ty {
            Type::Vector(_, n) => {
                let ty_id = self.lower_type(ty);
                let parts = std::iter::repeat(component).take(usize::from(n)).collect();
                self.builder.constant(ty_id, ConstValue::Composite(parts))
            }
            Type::Matrix { scalar, rows, cols } => {
                let column = self.const_splat(component, &Type::vector(scalar, rows));
                let ty_id = self.lower_type(ty);
                let parts = std::iter::repeat(column).take(usize::from(cols)).collect();
                self.builder.constant(ty_id, ConstValue::Composite(parts))
            }
            _ => component,
        }
    }

    pub(crate) fn zero(&mut self, ty: &Type) -> Id {
        self.const_filled(ty, 0)
    }

    pub(crate) fn one(&mut self, ty: &Type) -> Id {
        self.const_filled(ty, 1)
    }
}
