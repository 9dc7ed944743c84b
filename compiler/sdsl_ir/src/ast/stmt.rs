//! Statement nodes.

use crate::{ExprId, Name, Span, StmtId, TypeExpr};

#[derive(Clone, Debug, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
    /// Control hint from a leading attribute such as `[unroll]`.
    pub hint: ControlHint,
}

impl Stmt {
    #[inline]
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Stmt {
            kind,
            span,
            hint: ControlHint::None,
        }
    }
}

/// Loop and branch hints (`[unroll]`, `[loop]`, `[branch]`, `[flatten]`).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ControlHint {
    #[default]
    None,
    Unroll,
    Loop,
    Branch,
    Flatten,
}

/// One declarator of a local declaration: `float a[3] = ...`.
#[derive(Clone, Debug, PartialEq)]
pub struct VarDecl {
    pub is_const: bool,
    pub ty: TypeExpr,
    pub name: Name,
    pub name_span: Span,
    pub array: Option<ExprId>,
    pub init: Option<ExprId>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    Block(Vec<StmtId>),
    Expr(ExprId),
    /// `float a = 1, b;`
    Var(Vec<VarDecl>),
    If {
        cond: ExprId,
        then: StmtId,
        otherwise: Option<StmtId>,
    },
    For {
        init: Option<StmtId>,
        cond: Option<ExprId>,
        step: Option<ExprId>,
        body: StmtId,
    },
    While {
        cond: ExprId,
        body: StmtId,
    },
    DoWhile {
        body: StmtId,
        cond: ExprId,
    },
    Return(Option<ExprId>),
    Break,
    Continue,
    Discard,
    Empty,
}
