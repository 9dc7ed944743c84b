//! Recursive descent parser for SDSL.
//!
//! Produces a [`Module`] of shader and effect declarations with expressions
//! and statements in a flat [`ExprArena`]. Leading keywords (`shader`,
//! `effect`, `struct`, `cbuffer`, `compose`, `mixin`, `macro`, `if`, `for`,
//! `while`, `do`, `return`) are commit points: once one is consumed a failure
//! is a hard error for that production, which is reported before parsing
//! resumes at the next `;` or `}`.

mod cursor;
mod error;
mod grammar;
mod outcome;
mod recovery;
mod snapshot;

pub use cursor::Cursor;
pub use error::ParseError;
pub use grammar::is_builtin_type_name;
pub use outcome::ParseOutcome;
pub use snapshot::ParserSnapshot;

use sdsl_ir::{ExprArena, Module, StringInterner, TokenList};

/// Parser state.
pub struct Parser<'a> {
    cursor: Cursor<'a>,
    arena: ExprArena,
    errors: Vec<ParseError>,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a TokenList, interner: &'a StringInterner) -> Self {
        Parser {
            cursor: Cursor::new(tokens, interner),
            arena: ExprArena::new(),
            errors: Vec::new(),
        }
    }
}

/// Parsed module, its arena, and every error reported along the way.
#[derive(Clone, Debug, PartialEq)]
pub struct ParseOutput {
    pub module: Module,
    pub arena: ExprArena,
    pub errors: Vec<ParseError>,
}

impl ParseOutput {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Parse a lexed token list into a module.
#[tracing::instrument(level = "debug", skip_all, fields(tokens = tokens.len()))]
pub fn parse(tokens: &TokenList, interner: &StringInterner) -> ParseOutput {
    let output = Parser::new(tokens, interner).parse_module();
    tracing::debug!(
        decls = output.module.decls.len(),
        exprs = output.arena.expr_count(),
        errors = output.errors.len(),
        "parsed"
    );
    output
}

#[cfg(test)]
mod tests;
