//! SDSL IR - shared data types for the shader compiler.
//!
//! This crate contains the data structures every phase agrees on:
//! - Spans and source identifiers
//! - Names for interned identifiers
//! - Tokens and `TokenList` for lexer output
//! - Text links from preprocessed text back to original files
//! - AST nodes (declarations, members, statements, expressions)
//! - Arena allocation for expressions and statements
//! - Content hashes shared by the composer, emitter and cache
//!
//! # Design Philosophy
//!
//! - **Intern Everything**: identifiers become `Name(u32)`
//! - **Flatten Everything**: no `Box<Expr>`, use `ExprId(u32)` indices
//! - **Closed sums**: every node kind is an enum matched exhaustively
//!
//! Floats are stored as `u64` bits so literal types stay `Eq + Hash`.

/// Compile-time assertion that a type has a specific size.
///
/// Used to prevent accidental size regressions in frequently-allocated types.
#[macro_export]
macro_rules! static_assert_size {
    ($ty:ty, $size:expr) => {
        const _: [(); $size] = [(); ::std::mem::size_of::<$ty>()];
    };
}

mod arena;
pub mod ast;
mod hash;
mod interner;
mod name;
mod span;
mod text_link;
mod token;
pub mod visitor;

pub use arena::{ExprArena, ExprId, StmtId};
pub use ast::{
    AssignOp, Attribute, BaseRef, BinaryOp, CBufferDecl, ControlHint, Decl, EffectDecl,
    EffectStmt, EffectStmtKind, Expr, ExprKind, FieldDecl, Literal, Member, MethodDecl, MixinTarget,
    Modifiers, Module, Param, Semantic, ShaderDecl, Stmt, StmtKind, StructDecl, StructField,
    TypeExpr, UnaryOp, VarDecl,
};
pub use hash::ContentHash;
pub use interner::{SharedInterner, StringInterner};
pub use name::Name;
pub use span::{FileIndex, SourceId, Span, SpanError};
pub use text_link::{FileSpan, LinkKind, TextLink};
pub use token::{Token, TokenFlags, TokenKind, TokenList};
