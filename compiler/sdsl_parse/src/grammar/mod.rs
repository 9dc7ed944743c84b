//! Grammar productions.
//!
//! - `mod.rs`: module and top-level declarations
//! - `shader.rs`: shader bodies, members, structs, constant buffers
//! - `effect.rs`: effect bodies
//! - `ty.rs`: types, modifiers, attributes, semantics
//! - `stmt.rs`: statements
//! - `expr/`: expressions

mod effect;
mod expr;
mod shader;
mod stmt;
mod ty;

pub use ty::is_builtin_type_name;

use sdsl_diagnostic::ErrorCode;
use sdsl_ir::{BaseRef, Decl, Module, TokenKind};

use crate::{ParseError, ParseOutcome, ParseOutput, Parser};

impl Parser<'_> {
    /// Parse declarations until end of input.
    pub(crate) fn parse_module(mut self) -> ParseOutput {
        let mut module = Module::default();
        while !self.cursor.is_at_end() {
            let start = self.cursor.position();
            match self.parse_top_decl() {
                ParseOutcome::ConsumedOk { value } | ParseOutcome::EmptyOk { value } => {
                    module.decls.push(value);
                }
                ParseOutcome::ConsumedErr { error, .. } => {
                    self.errors.push(error);
                    self.synchronize_decl();
                }
                ParseOutcome::EmptyErr { expected, .. } => {
                    let found = self.cursor.current_kind();
                    self.errors.push(ParseError::new(
                        ErrorCode::E2006,
                        format!("expected {expected}, found {}", found.display_name()),
                        self.cursor.current_span(),
                    ));
                    self.cursor.advance();
                    self.synchronize_decl();
                }
            }
            if self.cursor.position() == start {
                // Guarantee progress on malformed input.
                self.cursor.advance();
            }
        }
        ParseOutput {
            module,
            arena: self.arena,
            errors: self.errors,
        }
    }

    fn parse_top_decl(&mut self) -> ParseOutcome<Decl> {
        match self.cursor.current_kind() {
            TokenKind::Shader => self
                .parse_shader_decl()
                .map(Decl::Shader)
                .with_error_context("shader declaration"),
            TokenKind::Effect => self
                .parse_effect_decl()
                .map(Decl::Effect)
                .with_error_context("effect declaration"),
            _ => ParseOutcome::empty_err("`shader` or `effect`", self.cursor.position()),
        }
    }

    /// `(':' 'compose'? Ident (',' 'compose'? Ident)*)?`
    pub(crate) fn parse_base_list(&mut self) -> Result<Vec<BaseRef>, ParseError> {
        let mut bases = Vec::new();
        if !self.cursor.eat(TokenKind::Colon) {
            return Ok(bases);
        }
        loop {
            self.cursor.eat(TokenKind::Compose);
            let (name, span) = self.cursor.expect_ident()?;
            bases.push(BaseRef { name, span });
            if !self.cursor.eat(TokenKind::Comma) {
                return Ok(bases);
            }
        }
    }

    /// Expect a closing `}`; reaching the end of input reports the unclosed
    /// opening brace instead.
    pub(crate) fn expect_close_brace(&mut self, open: sdsl_ir::Span) -> Result<(), ParseError> {
        if self.cursor.eat(TokenKind::RBrace) {
            return Ok(());
        }
        if self.cursor.is_at_end() {
            return Err(ParseError::new(
                ErrorCode::E2003,
                "unclosed `{`",
                open,
            ));
        }
        Err(ParseError::unexpected(
            "`}`",
            self.cursor.current_kind(),
            self.cursor.current_span(),
        ))
    }
}
