//! AST for SDSL source files.
//!
//! A file holds `shader` mixins and `effect` declarations. Declarations and
//! members are plain owned structs; expressions and statements live in the
//! [`ExprArena`](crate::ExprArena) and are referenced by id.

mod effect;
mod expr;
mod stmt;

pub use effect::{EffectDecl, EffectStmt, EffectStmtKind, MixinTarget};
pub use expr::{AssignOp, BinaryOp, Expr, ExprKind, Literal, UnaryOp};
pub use stmt::{ControlHint, Stmt, StmtKind, VarDecl};

use bitflags::bitflags;

use crate::{ExprId, Name, Span, StmtId};

/// A parsed source file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Module {
    pub decls: Vec<Decl>,
}

impl Module {
    /// Find a shader declaration by name.
    pub fn shader(&self, name: Name) -> Option<&ShaderDecl> {
        self.decls.iter().find_map(|d| match d {
            Decl::Shader(s) if s.name == name => Some(s),
            _ => None,
        })
    }

    /// Find an effect declaration by name.
    pub fn effect(&self, name: Name) -> Option<&EffectDecl> {
        self.decls.iter().find_map(|d| match d {
            Decl::Effect(e) if e.name == name => Some(e),
            _ => None,
        })
    }
}

/// Top-level declaration.
#[derive(Clone, Debug, PartialEq)]
pub enum Decl {
    Shader(ShaderDecl),
    Effect(EffectDecl),
}

impl Decl {
    pub fn name(&self) -> Name {
        match self {
            Decl::Shader(shader) => shader.name,
            Decl::Effect(effect) => effect.name,
        }
    }
}

/// `shader Name : Base, compose Other { ... }`
#[derive(Clone, Debug, PartialEq)]
pub struct ShaderDecl {
    pub name: Name,
    pub name_span: Span,
    /// Bases from the header, in declaration order.
    pub bases: Vec<BaseRef>,
    pub members: Vec<Member>,
    pub span: Span,
}

impl ShaderDecl {
    /// Every composed mixin: header bases followed by in-body `compose` directives.
    pub fn composed(&self) -> impl Iterator<Item = &BaseRef> {
        self.bases.iter().chain(self.members.iter().filter_map(|m| match m {
            Member::Compose(base) => Some(base),
            _ => None,
        }))
    }
}

/// A reference to a composed mixin.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BaseRef {
    pub name: Name,
    pub span: Span,
}

/// A member of a shader body.
#[derive(Clone, Debug, PartialEq)]
pub enum Member {
    Compose(BaseRef),
    Struct(StructDecl),
    CBuffer(CBufferDecl),
    Field(FieldDecl),
    Method(MethodDecl),
}

bitflags! {
    /// Declaration modifiers.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Modifiers: u16 {
        const STAGE = 1 << 0;
        const STREAM = 1 << 1;
        const STATIC = 1 << 2;
        const CONST = 1 << 3;
        const OVERRIDE = 1 << 4;
        const ABSTRACT = 1 << 5;
        const CLONE = 1 << 6;
        const IN = 1 << 7;
        const OUT = 1 << 8;
        const INOUT = Self::IN.bits() | Self::OUT.bits();
    }
}

/// `[name(args)]`
#[derive(Clone, Debug, PartialEq)]
pub struct Attribute {
    pub name: Name,
    pub args: Vec<ExprId>,
    pub span: Span,
}

/// `: SV_Position`
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Semantic {
    pub name: Name,
    pub span: Span,
}

/// A type as written: `float4`, `MyStruct`, `Texture2D<float4>`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeExpr {
    pub name: Name,
    /// Template argument, only meaningful for resource types.
    pub arg: Option<Name>,
    pub span: Span,
}

/// `struct Name { float3 a; float b[2]; };`
#[derive(Clone, Debug, PartialEq)]
pub struct StructDecl {
    pub name: Name,
    pub name_span: Span,
    pub fields: Vec<StructField>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StructField {
    pub ty: TypeExpr,
    pub name: Name,
    pub name_span: Span,
    pub array: Option<ExprId>,
    pub span: Span,
}

/// `cbuffer PerDraw { ... }` or `rgroup Textures { ... }`
#[derive(Clone, Debug, PartialEq)]
pub struct CBufferDecl {
    pub name: Name,
    pub name_span: Span,
    pub is_rgroup: bool,
    pub fields: Vec<FieldDecl>,
    pub span: Span,
}

/// A shader field (or cbuffer member).
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDecl {
    pub attributes: Vec<Attribute>,
    pub modifiers: Modifiers,
    pub ty: TypeExpr,
    pub name: Name,
    pub name_span: Span,
    pub array: Option<ExprId>,
    pub semantic: Option<Semantic>,
    pub init: Option<ExprId>,
    pub span: Span,
}

/// A method parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub modifiers: Modifiers,
    pub ty: TypeExpr,
    pub name: Name,
    pub name_span: Span,
    pub array: Option<ExprId>,
    pub semantic: Option<Semantic>,
    pub span: Span,
}

/// A method; `body` is `None` for `abstract` declarations.
#[derive(Clone, Debug, PartialEq)]
pub struct MethodDecl {
    pub attributes: Vec<Attribute>,
    pub modifiers: Modifiers,
    pub return_ty: TypeExpr,
    pub name: Name,
    pub name_span: Span,
    pub params: Vec<Param>,
    pub semantic: Option<Semantic>,
    pub body: Option<StmtId>,
    pub span: Span,
}

impl MethodDecl {
    pub fn attribute(&self, name: Name) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}
