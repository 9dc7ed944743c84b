//! Constant-buffer packing.
//!
//! Members are packed into 16-byte registers in declaration order:
//! - a scalar or vector never straddles a register boundary
//! - arrays, matrices and structs always start a new register
//! - array elements each start a register, so the stride is the element
//!   size rounded up to 16
//! - matrices are column-major: one register per column
//! - struct and buffer sizes round up to 16

use sdsl_ir::Name;

use crate::{StructDef, StructTable, Type};

/// Size of one constant register.
pub const REGISTER_SIZE: u32 = 16;

/// Stride between matrix columns.
pub const MATRIX_STRIDE: u32 = REGISTER_SIZE;

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct MemberLayout {
    pub name: Name,
    pub offset: u32,
    pub size: u32,
    pub ty: Type,
}

/// Layout of a constant buffer or struct.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct BufferLayout {
    pub size: u32,
    pub members: Vec<MemberLayout>,
}

#[inline]
fn round_up(value: u32, align: u32) -> u32 {
    value.div_ceil(align) * align
}

/// Packed size of a type, excluding trailing padding of the last register.
pub fn type_size(ty: &Type, structs: &StructTable) -> u32 {
    match ty {
        Type::Scalar(s) => s.byte_size(),
        Type::Vector(s, n) => s.byte_size() * u32::from(*n),
        Type::Matrix { scalar, rows, cols } => {
            MATRIX_STRIDE * (u32::from(*cols) - 1) + scalar.byte_size() * u32::from(*rows)
        }
        Type::Array(element, len) => {
            let size = type_size(element, structs);
            match len.checked_sub(1) {
                Some(rest) => round_up(size, REGISTER_SIZE) * rest + size,
                None => 0,
            }
        }
        Type::Struct(name) => structs
            .get(*name)
            .map_or(0, |def| struct_layout(def, structs).size),
        Type::Void | Type::Texture { .. } | Type::Sampler | Type::Error => 0,
    }
}

/// Distance between consecutive array elements.
pub fn array_stride(element: &Type, structs: &StructTable) -> u32 {
    round_up(type_size(element, structs), REGISTER_SIZE)
}

fn starts_register(ty: &Type) -> bool {
    matches!(ty, Type::Array(..) | Type::Matrix { .. } | Type::Struct(_))
}

/// Pack members in order.
pub fn layout_members<'a>(
    members: impl IntoIterator<Item = (Name, &'a Type)>,
    structs: &StructTable,
) -> BufferLayout {
    let mut offset = 0;
    let mut layout = BufferLayout::default();
    for (name, ty) in members {
        let size = type_size(ty, structs);
        let straddles = offset % REGISTER_SIZE + size > REGISTER_SIZE;
        if starts_register(ty) || straddles {
            offset = round_up(offset, REGISTER_SIZE);
        }
        layout.members.push(MemberLayout {
            name,
            offset,
            size,
            ty: ty.clone(),
        });
        offset += size;
    }
    layout.size = round_up(offset, REGISTER_SIZE);
    layout
}

pub fn struct_layout(def: &StructDef, structs: &StructTable) -> BufferLayout {
    layout_members(def.members.iter().map(|m| (m.name, &m.ty)), structs)
}
