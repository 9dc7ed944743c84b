//! Effect (permutation) declarations.
//!
//! An effect lists mixins to compose, optionally guarded by conditions over
//! the compile request's parameters:
//!
//! ```text
//! effect Lighting : compose Base {
//!     mixin ShadingBase;
//!     if (UseNormalMap)
//!         mixin NormalFromMap;
//!     else
//!         mixin NormalFromMesh;
//!     mixin (MaterialMixin);
//!     macro MAX_LIGHTS = LightCount;
//! }
//! ```

use crate::{BaseRef, ExprId, Name, Span};

#[derive(Clone, Debug, PartialEq)]
pub struct EffectDecl {
    pub name: Name,
    pub name_span: Span,
    pub bases: Vec<BaseRef>,
    pub body: Vec<EffectStmt>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EffectStmt {
    pub kind: EffectStmtKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum EffectStmtKind {
    /// `mixin X;` / `compose X;` / `mixin (Param);`
    Mixin(MixinTarget),
    /// `macro NAME = expr;`
    Macro { name: Name, value: ExprId },
    If {
        cond: ExprId,
        then: Box<EffectStmt>,
        otherwise: Option<Box<EffectStmt>>,
    },
    Block(Vec<EffectStmt>),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MixinTarget {
    /// A mixin or effect referenced by name.
    Named(Name, Span),
    /// A string parameter holding the mixin name.
    Parameter(Name, Span),
}
