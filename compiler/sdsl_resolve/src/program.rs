//! Resolver output.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use sdsl_ir::{
    Attribute, ContentHash, ExprId, MethodDecl, Modifiers, Name, Span, StmtId,
};
use sdsl_types::{Intrinsic, StructTable, TextureMethod, Type};

use crate::SourceUnit;

/// Index of a local variable within its method.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct LocalId(pub u32);

/// Where a shader field is stored.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum FieldStorage {
    /// Member of a constant buffer; loose uniform fields belong to `Globals`.
    Uniform { buffer: Name },
    /// Texture or sampler.
    Resource,
    /// `stream` field: per-invocation data passed between stages.
    Stream,
    /// `static` mutable field.
    Static,
    /// `static const` field with a constant initializer.
    Constant,
}

impl FieldStorage {
    /// Whether shader code may assign the field.
    pub fn is_writable(self) -> bool {
        matches!(self, FieldStorage::Stream | FieldStorage::Static)
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedField {
    pub name: Name,
    pub ty: Type,
    pub storage: FieldStorage,
    pub modifiers: Modifiers,
    pub semantic: Option<Name>,
    pub init: Option<ExprId>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct ResolvedParam {
    pub name: Name,
    pub ty: Type,
    pub modifiers: Modifiers,
    pub semantic: Option<Name>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct LocalInfo {
    pub name: Name,
    pub ty: Type,
    pub is_const: bool,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct ResolvedMethod {
    pub decl: MethodDecl,
    pub return_ty: Type,
    pub params: Vec<ResolvedParam>,
    pub locals: Vec<LocalInfo>,
    /// Local declared by each declarator of a `Var` statement.
    pub declarators: FxHashMap<(StmtId, u32), LocalId>,
}

impl ResolvedMethod {
    #[inline]
    pub fn name(&self) -> Name {
        self.decl.name
    }

    #[inline]
    pub fn is_abstract(&self) -> bool {
        self.decl.body.is_none()
    }

    pub fn attribute(&self, name: Name) -> Option<&Attribute> {
        self.decl.attribute(name)
    }

    /// Parameter and return types, for override compatibility checks.
    pub fn signature(&self) -> (Vec<&Type>, &Type) {
        (self.params.iter().map(|p| &p.ty).collect(), &self.return_ty)
    }
}

/// What an identifier expression refers to.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Binding {
    Local(LocalId),
    Param(u32),
    Field(Name),
}

/// What a call expression invokes.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Callee {
    /// A shader method; dispatched to the final override after composition.
    Method(Name),
    /// `base.Name(...)`: the version this mixin's method replaced.
    Base(Name),
    Intrinsic(Intrinsic),
    /// `float4(...)`
    Constructor(Type),
    /// `texture.Sample(...)`; the texture is the callee's object.
    Texture(TextureMethod),
}

/// What a member expression selects.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum MemberAccess {
    Swizzle(Vec<u32>),
    StructField(u32),
    /// The method name of a `texture.Method` callee.
    Method,
}

/// Side tables for one mixin's arena.
#[derive(Clone, Debug, Default)]
pub struct ExprInfo {
    /// Type of every expression, indexed by `ExprId`.
    pub types: Vec<Type>,
    pub bindings: FxHashMap<ExprId, Binding>,
    pub calls: FxHashMap<ExprId, Callee>,
    pub members: FxHashMap<ExprId, MemberAccess>,
}

impl ExprInfo {
    pub(crate) fn with_capacity(exprs: usize) -> Self {
        ExprInfo {
            types: vec![Type::Error; exprs],
            ..ExprInfo::default()
        }
    }

    pub fn ty(&self, id: ExprId) -> &Type {
        self.types.get(id.index()).unwrap_or(&Type::Error)
    }
}

/// A constant buffer declared by a mixin.
#[derive(Clone, Debug)]
pub struct CBufferInfo {
    pub name: Name,
    pub span: Span,
}

/// A fully resolved mixin.
#[derive(Debug)]
pub struct ResolvedMixin {
    pub name: Name,
    pub unit: Arc<SourceUnit>,
    /// Directly composed mixins, header bases first.
    pub bases: Vec<Name>,
    pub fields: Vec<ResolvedField>,
    pub methods: Vec<ResolvedMethod>,
    pub cbuffers: Vec<CBufferInfo>,
    pub structs: Vec<Name>,
    pub info: ExprInfo,
}

impl ResolvedMixin {
    pub fn field(&self, name: Name) -> Option<&ResolvedField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn method(&self, name: Name) -> Option<&ResolvedMethod> {
        self.methods.iter().find(|m| m.name() == name)
    }

    #[inline]
    pub fn source_hash(&self) -> ContentHash {
        self.unit.hash
    }
}

/// Every mixin reachable from the requested roots, bases before dependents.
#[derive(Debug)]
pub struct ResolvedProgram {
    pub mixins: Vec<Arc<ResolvedMixin>>,
    pub structs: StructTable,
    by_name: FxHashMap<Name, usize>,
}

impl ResolvedProgram {
    pub(crate) fn new(mixins: Vec<Arc<ResolvedMixin>>, structs: StructTable) -> Self {
        let by_name = mixins
            .iter()
            .enumerate()
            .map(|(i, m)| (m.name, i))
            .collect();
        ResolvedProgram {
            mixins,
            structs,
            by_name,
        }
    }

    pub fn mixin(&self, name: Name) -> Option<&Arc<ResolvedMixin>> {
        self.by_name.get(&name).map(|&i| &self.mixins[i])
    }
}
