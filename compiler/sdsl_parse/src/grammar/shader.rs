//! Shader declarations and their members.

use sdsl_diagnostic::ErrorCode;
use sdsl_ir::{
    Attribute, BaseRef, CBufferDecl, FieldDecl, Member, MethodDecl, Modifiers, Name, Param,
    ShaderDecl, Span, StructDecl, StructField, TokenKind, TypeExpr,
};

use crate::{ParseError, ParseOutcome, Parser};

impl Parser<'_> {
    /// `'shader' Ident base_list? '{' member* '}' ';'?`
    pub(crate) fn parse_shader_decl(&mut self) -> ParseOutcome<ShaderDecl> {
        if !self.cursor.check(TokenKind::Shader) {
            return ParseOutcome::empty_err("`shader`", self.cursor.position());
        }
        let start = self.cursor.advance().span;
        let result = self.shader_after_keyword(start);
        ParseOutcome::committed(result, start)
    }

    fn shader_after_keyword(&mut self, start: Span) -> Result<ShaderDecl, ParseError> {
        let (name, name_span) = self.cursor.expect_ident()?;
        let bases = self.parse_base_list()?;
        let open = self.cursor.expect(TokenKind::LBrace)?.span;

        let mut members = Vec::new();
        while !self.cursor.check(TokenKind::RBrace) && !self.cursor.is_at_end() {
            let before = self.cursor.position();
            match self.parse_member() {
                Ok(parsed) => members.extend(parsed),
                Err(error) => {
                    self.errors.push(error);
                    self.synchronize();
                    if self.cursor.position() == before {
                        self.cursor.advance();
                    }
                }
            }
        }
        self.expect_close_brace(open)?;
        self.cursor.eat(TokenKind::Semi);

        Ok(ShaderDecl {
            name,
            name_span,
            bases,
            members,
            span: start.merge(self.cursor.previous_span()),
        })
    }

    /// One member; a multi-declarator field yields several members.
    fn parse_member(&mut self) -> Result<Vec<Member>, ParseError> {
        let start = self.cursor.current_span();
        let attributes = self.parse_attributes()?;

        match self.cursor.current_kind() {
            TokenKind::Compose => {
                self.cursor.advance();
                let (name, span) = self.cursor.expect_ident()?;
                self.cursor.expect(TokenKind::Semi)?;
                return Ok(vec![Member::Compose(BaseRef { name, span })]);
            }
            TokenKind::Struct => return Ok(vec![Member::Struct(self.parse_struct_decl()?)]),
            TokenKind::CBuffer | TokenKind::RGroup => {
                return Ok(vec![Member::CBuffer(self.parse_cbuffer_decl()?)]);
            }
            _ => {}
        }

        let modifiers = self.parse_modifiers();
        let ty = self.expect_type()?;
        let (name, name_span) = self.cursor.expect_ident()?;

        if self.cursor.check(TokenKind::LParen) {
            let method = self.parse_method_rest(start, attributes, modifiers, ty, name, name_span)?;
            return Ok(vec![Member::Method(method)]);
        }

        let fields = self.parse_field_declarators(start, &attributes, modifiers, ty, name, name_span)?;
        Ok(fields.into_iter().map(Member::Field).collect())
    }

    /// `declarator (',' declarator)* ';'` with the first name already read.
    fn parse_field_declarators(
        &mut self,
        start: Span,
        attributes: &[Attribute],
        modifiers: Modifiers,
        ty: TypeExpr,
        first_name: Name,
        first_span: Span,
    ) -> Result<Vec<FieldDecl>, ParseError> {
        let mut fields = Vec::new();
        let (mut name, mut name_span) = (first_name, first_span);
        loop {
            let array = self.parse_array_suffix()?;
            let semantic = self.parse_semantic()?;
            let init = if self.cursor.eat(TokenKind::Eq) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            fields.push(FieldDecl {
                attributes: attributes.to_vec(),
                modifiers,
                ty,
                name,
                name_span,
                array,
                semantic,
                init,
                span: start.merge(self.cursor.previous_span()),
            });
            if !self.cursor.eat(TokenKind::Comma) {
                break;
            }
            (name, name_span) = self.cursor.expect_ident()?;
        }
        self.cursor.expect(TokenKind::Semi)?;
        Ok(fields)
    }

    fn parse_method_rest(
        &mut self,
        start: Span,
        attributes: Vec<Attribute>,
        modifiers: Modifiers,
        return_ty: TypeExpr,
        name: Name,
        name_span: Span,
    ) -> Result<MethodDecl, ParseError> {
        self.cursor.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.cursor.eat(TokenKind::RParen) {
            loop {
                params.push(self.parse_param()?);
                if !self.cursor.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.cursor.expect(TokenKind::RParen)?;
        }
        let semantic = self.parse_semantic()?;

        let body = if self.cursor.eat(TokenKind::Semi) {
            None
        } else if self.cursor.check(TokenKind::LBrace) {
            Some(self.parse_block()?)
        } else {
            return Err(ParseError::unexpected(
                "method body or `;`",
                self.cursor.current_kind(),
                self.cursor.current_span(),
            ));
        };

        if body.is_none() && !modifiers.contains(Modifiers::ABSTRACT) {
            return Err(ParseError::new(
                ErrorCode::E2006,
                "a method without a body must be declared `abstract`",
                name_span,
            ));
        }

        Ok(MethodDecl {
            attributes,
            modifiers,
            return_ty,
            name,
            name_span,
            params,
            semantic,
            body,
            span: start.merge(self.cursor.previous_span()),
        })
    }

    fn parse_param(&mut self) -> Result<Param, ParseError> {
        let start = self.cursor.current_span();
        let modifiers = self.parse_modifiers();
        let ty = self.expect_type()?;
        let (name, name_span) = self.cursor.expect_ident()?;
        let array = self.parse_array_suffix()?;
        let semantic = self.parse_semantic()?;
        Ok(Param {
            modifiers,
            ty,
            name,
            name_span,
            array,
            semantic,
            span: start.merge(self.cursor.previous_span()),
        })
    }

    /// `'struct' Ident '{' (type Ident array? ';')* '}' ';'`
    fn parse_struct_decl(&mut self) -> Result<StructDecl, ParseError> {
        let start = self.cursor.expect(TokenKind::Struct)?.span;
        let (name, name_span) = self.cursor.expect_ident()?;
        let open = self.cursor.expect(TokenKind::LBrace)?.span;

        let mut fields = Vec::new();
        while !self.cursor.check(TokenKind::RBrace) && !self.cursor.is_at_end() {
            let field_start = self.cursor.current_span();
            let ty = self.expect_type()?;
            let (field_name, field_span) = self.cursor.expect_ident()?;
            let array = self.parse_array_suffix()?;
            // Member semantics are accepted and ignored.
            self.parse_semantic()?;
            self.cursor.expect(TokenKind::Semi)?;
            fields.push(StructField {
                ty,
                name: field_name,
                name_span: field_span,
                array,
                span: field_start.merge(self.cursor.previous_span()),
            });
        }
        self.expect_close_brace(open)?;
        self.cursor.expect(TokenKind::Semi)?;

        Ok(StructDecl {
            name,
            name_span,
            fields,
            span: start.merge(self.cursor.previous_span()),
        })
    }

    /// `('cbuffer' | 'rgroup') Ident '{' (attribute* modifiers type declarator ';')* '}' ';'?`
    fn parse_cbuffer_decl(&mut self) -> Result<CBufferDecl, ParseError> {
        let is_rgroup = self.cursor.check(TokenKind::RGroup);
        let start = self.cursor.advance().span;
        let (name, name_span) = self.cursor.expect_ident()?;
        let open = self.cursor.expect(TokenKind::LBrace)?.span;

        let mut fields = Vec::new();
        while !self.cursor.check(TokenKind::RBrace) && !self.cursor.is_at_end() {
            let field_start = self.cursor.current_span();
            let attributes = self.parse_attributes()?;
            let modifiers = self.parse_modifiers();
            let ty = self.expect_type()?;
            let (field_name, field_span) = self.cursor.expect_ident()?;
            fields.extend(self.parse_field_declarators(
                field_start,
                &attributes,
                modifiers,
                ty,
                field_name,
                field_span,
            )?);
        }
        self.expect_close_brace(open)?;
        self.cursor.eat(TokenKind::Semi);

        Ok(CBufferDecl {
            name,
            name_span,
            is_rgroup,
            fields,
            span: start.merge(self.cursor.previous_span()),
        })
    }
}
