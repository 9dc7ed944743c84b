//! Type model for SDSL.
//!
//! - [`Type`]: scalars, vectors, matrices, arrays, structs and resources
//! - [`ops`]: HLSL conversion and operator typing rules
//! - [`Intrinsic`]: the builtin function table
//! - [`layout`]: constant-buffer packing
//!
//! Types are small closed enums compared structurally. `Type::Error` is a
//! poison value: every rule accepts it silently so one bad expression does
//! not cascade into a wall of mismatches.

mod intrinsic;
pub mod layout;
pub mod ops;
mod structs;
mod ty;

pub use intrinsic::{Intrinsic, IntrinsicError, IntrinsicTyping, TextureMethod};
pub use ops::OpTyping;
pub use layout::{BufferLayout, MemberLayout};
pub use structs::{StructDef, StructMember, StructTable};
pub use ty::{ScalarType, TextureKind, Type, TypeDisplay};
