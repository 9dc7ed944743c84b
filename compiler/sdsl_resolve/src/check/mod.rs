//! Checking one mixin.
//!
//! A mixin is checked in passes so declaration order inside the body does
//! not matter for fields and methods:
//! 1. struct declarations, registered program-wide
//! 2. fields, with their storage class
//! 3. method signatures
//! 4. field initializers
//! 5. method bodies
//!
//! Everything the mixin composes is resolved before it and is passed in as
//! `visible`, in compose-graph order.

mod expr;
mod stmt;

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use sdsl_diagnostic::{type_mismatch, Diagnostic, ErrorCode};
use sdsl_ir::{
    ExprArena, ExprId, FieldDecl, Member, Modifiers, Name, ShaderDecl, Span, StmtId,
    StringInterner, TypeExpr,
};
use sdsl_types::{ops, StructDef, StructMember, StructTable, Type};

use crate::consts::{eval_int, ConstError, ConstSource};
use crate::scope::Scopes;
use crate::{
    Binding, CBufferInfo, ExprInfo, FieldStorage, GraphNode, LocalId, LocalInfo, ResolvedField,
    ResolvedMethod, ResolvedMixin, ResolvedParam, SourceUnit,
};

/// Name of the implicit constant buffer holding loose uniform fields.
pub(crate) const GLOBALS: &str = "Globals";

pub(crate) fn check_mixin(
    node: &GraphNode,
    decl: &ShaderDecl,
    visible: &[Arc<ResolvedMixin>],
    structs: &mut StructTable,
    interner: &StringInterner,
) -> (ResolvedMixin, Vec<Diagnostic>) {
    let unit: &SourceUnit = &node.unit;
    let mut checker = MixinChecker {
        interner,
        unit,
        arena: &unit.arena,
        decl,
        visible,
        structs,
        own_structs: Vec::new(),
        fields: Vec::new(),
        methods: Vec::new(),
        cbuffers: Vec::new(),
        info: ExprInfo::with_capacity(unit.arena.expr_count()),
        func: None,
        errors: Vec::new(),
    };
    checker.register_structs();
    checker.register_fields();
    checker.register_methods();
    checker.check_field_inits();
    checker.check_method_bodies();

    let mixin = ResolvedMixin {
        name: node.name,
        unit: Arc::clone(&node.unit),
        bases: node.bases.iter().map(|b| b.name).collect(),
        fields: checker.fields,
        methods: checker.methods,
        cbuffers: checker.cbuffers,
        structs: checker.own_structs,
        info: checker.info,
    };
    (mixin, checker.errors)
}

/// State of the method body being checked.
struct FnState {
    scopes: Scopes,
    params: Vec<ResolvedParam>,
    locals: Vec<LocalInfo>,
    declarators: FxHashMap<(StmtId, u32), LocalId>,
    /// Every local name declared anywhere in the body.
    declared: FxHashSet<Name>,
    return_ty: Type,
    loop_depth: u32,
}

pub(crate) struct MixinChecker<'a> {
    interner: &'a StringInterner,
    unit: &'a SourceUnit,
    arena: &'a ExprArena,
    decl: &'a ShaderDecl,
    visible: &'a [Arc<ResolvedMixin>],
    structs: &'a mut StructTable,
    own_structs: Vec<Name>,
    fields: Vec<ResolvedField>,
    methods: Vec<ResolvedMethod>,
    cbuffers: Vec<CBufferInfo>,
    info: ExprInfo,
    /// `None` while checking field initializers.
    func: Option<FnState>,
    errors: Vec<Diagnostic>,
}

/// `static const` fields usable in array sizes.
struct Constants<'c> {
    decl: &'c ShaderDecl,
    arena: &'c ExprArena,
    visible: &'c [Arc<ResolvedMixin>],
}

impl ConstSource for Constants<'_> {
    fn constant(&self, name: Name) -> Option<(&ExprArena, ExprId)> {
        let own = self.decl.members.iter().find_map(|m| match m {
            Member::Field(f)
                if f.name == name && f.modifiers.contains(Modifiers::STATIC | Modifiers::CONST) =>
            {
                f.init
            }
            _ => None,
        });
        if let Some(init) = own {
            return Some((self.arena, init));
        }
        self.visible.iter().rev().find_map(|m| {
            let field = m.field(name)?;
            if field.storage != FieldStorage::Constant {
                return None;
            }
            Some((&m.unit.arena, field.init?))
        })
    }
}

impl MixinChecker<'_> {
    fn error(
        &mut self,
        code: ErrorCode,
        span: Span,
        message: impl Into<String>,
        label: impl Into<String>,
    ) {
        self.errors.push(
            Diagnostic::error(code)
                .with_message(message)
                .with_source(self.unit.id)
                .with_label(span, label),
        );
    }

    #[inline]
    fn name(&self, name: Name) -> &'static str {
        self.interner.lookup(name)
    }

    fn show(&self, ty: &Type) -> String {
        ty.display(self.interner).to_string()
    }

    /// Report E3001 unless `found` converts to `expected`.
    fn expect_convertible(&mut self, id: ExprId, found: &Type, expected: &Type) -> bool {
        if ops::can_convert(found, expected) {
            return true;
        }
        let span = self.arena.expr(id).span;
        let diagnostic = type_mismatch(span, &self.show(expected), &self.show(found));
        self.errors.push(diagnostic.with_source(self.unit.id));
        false
    }

    fn struct_visible(&self, name: Name) -> bool {
        self.own_structs.contains(&name) || self.visible.iter().any(|m| m.structs.contains(&name))
    }

    /// Resolve a written type, with an optional array size.
    fn resolve_type(&mut self, ty: &TypeExpr, array: Option<ExprId>) -> Type {
        let text = self.name(ty.name);
        let arg = ty.arg.map(|a| self.name(a));
        let base = if let Some(builtin) = Type::from_builtin_name(text, arg) {
            builtin
        } else if arg.is_none() && self.struct_visible(ty.name) {
            Type::Struct(ty.name)
        } else {
            self.error(
                ErrorCode::E3002,
                ty.span,
                format!("unknown type `{text}`"),
                "not a builtin type or a visible struct",
            );
            return Type::Error;
        };
        match array {
            None => base,
            Some(size) => match self.array_size(size) {
                Some(len) => Type::Array(Box::new(base), len),
                None => Type::Error,
            },
        }
    }

    fn array_size(&mut self, size: ExprId) -> Option<u32> {
        let constants = Constants {
            decl: self.decl,
            arena: self.arena,
            visible: self.visible,
        };
        let (span, message) = match eval_int(&constants, self.arena, size) {
            Ok(len) if len > 0 => match u32::try_from(len) {
                Ok(len) => return Some(len),
                Err(_) => (self.arena.expr(size).span, format!("array size {len} is too large")),
            },
            Ok(len) => (
                self.arena.expr(size).span,
                format!("array size must be positive, found {len}"),
            ),
            Err(ConstError::NotConstant(span)) => {
                (span, "array size is not an integer constant".to_string())
            }
            Err(ConstError::DivisionByZero(span)) => {
                (span, "division by zero in array size".to_string())
            }
            Err(ConstError::TooDeep(span)) => (
                span,
                "array size constants are defined in terms of each other".to_string(),
            ),
        };
        self.error(ErrorCode::E3010, span, message, "invalid array size");
        None
    }

    fn register_structs(&mut self) {
        let decl = self.decl;
        for member in &decl.members {
            let Member::Struct(def) = member else {
                continue;
            };
            let mut members: Vec<StructMember> = Vec::with_capacity(def.fields.len());
            for field in &def.fields {
                let ty = self.resolve_type(&field.ty, field.array);
                if ty == Type::Void {
                    self.error(
                        ErrorCode::E3001,
                        field.ty.span,
                        format!("struct member `{}` cannot be void", self.name(field.name)),
                        "void member",
                    );
                }
                if members.iter().any(|m| m.name == field.name) {
                    self.error(
                        ErrorCode::E3005,
                        field.name_span,
                        format!("duplicate struct member `{}`", self.name(field.name)),
                        "declared again here",
                    );
                    continue;
                }
                members.push(StructMember {
                    name: field.name,
                    ty,
                });
            }
            let inserted = self
                .structs
                .insert(StructDef {
                    name: def.name,
                    members,
                })
                .is_ok();
            if inserted {
                self.own_structs.push(def.name);
            } else {
                self.error(
                    ErrorCode::E3005,
                    def.name_span,
                    format!("struct `{}` is already defined", self.name(def.name)),
                    "defined again here",
                );
            }
        }
    }

    fn register_fields(&mut self) {
        let decl = self.decl;
        let globals = self.interner.intern(GLOBALS);
        for member in &decl.members {
            match member {
                Member::Field(field) => {
                    let ty = self.resolve_type(&field.ty, field.array);
                    let storage = self.loose_storage(field, &ty, globals);
                    self.add_field(field, ty, storage);
                }
                Member::CBuffer(buffer) => {
                    if self.cbuffers.iter().any(|c| c.name == buffer.name) {
                        self.error(
                            ErrorCode::E3005,
                            buffer.name_span,
                            format!("buffer `{}` is already declared", self.name(buffer.name)),
                            "declared again here",
                        );
                    }
                    self.cbuffers.push(CBufferInfo {
                        name: buffer.name,
                        span: buffer.name_span,
                    });
                    for field in &buffer.fields {
                        let ty = self.resolve_type(&field.ty, field.array);
                        let storage = if ty.is_resource() {
                            FieldStorage::Resource
                        } else if buffer.is_rgroup {
                            if !ty.is_error() {
                                self.error(
                                    ErrorCode::E3001,
                                    field.ty.span,
                                    format!(
                                        "rgroup `{}` may only hold textures and samplers",
                                        self.name(buffer.name)
                                    ),
                                    "not a resource type",
                                );
                            }
                            FieldStorage::Resource
                        } else {
                            FieldStorage::Uniform {
                                buffer: buffer.name,
                            }
                        };
                        self.add_field(field, ty, storage);
                    }
                }
                Member::Compose(_) | Member::Struct(_) | Member::Method(_) => {}
            }
        }
    }

    fn loose_storage(&mut self, field: &FieldDecl, ty: &Type, globals: Name) -> FieldStorage {
        let modifiers = field.modifiers;
        if modifiers.contains(Modifiers::STREAM) {
            if ty.is_resource() {
                self.error(
                    ErrorCode::E3001,
                    field.ty.span,
                    format!("stream `{}` cannot hold a resource", self.name(field.name)),
                    "resource type",
                );
            }
            return FieldStorage::Stream;
        }
        if ty.is_resource() {
            FieldStorage::Resource
        } else if modifiers.contains(Modifiers::STATIC | Modifiers::CONST) {
            FieldStorage::Constant
        } else if modifiers.contains(Modifiers::STATIC) {
            FieldStorage::Static
        } else {
            FieldStorage::Uniform { buffer: globals }
        }
    }

    fn add_field(&mut self, field: &FieldDecl, ty: Type, storage: FieldStorage) {
        if ty == Type::Void {
            self.error(
                ErrorCode::E3001,
                field.ty.span,
                format!("field `{}` cannot be void", self.name(field.name)),
                "void field",
            );
        }
        if self.fields.iter().any(|f| f.name == field.name) {
            self.error(
                ErrorCode::E3005,
                field.name_span,
                format!("field `{}` is already declared", self.name(field.name)),
                "declared again here",
            );
            return;
        }
        self.fields.push(ResolvedField {
            name: field.name,
            ty,
            storage,
            modifiers: field.modifiers,
            semantic: field.semantic.map(|s| s.name),
            init: field.init,
            span: field.name_span,
        });
    }

    fn register_methods(&mut self) {
        let decl = self.decl;
        for member in &decl.members {
            let Member::Method(method) = member else {
                continue;
            };
            let return_ty = self.resolve_type(&method.return_ty, None);
            let mut params: Vec<ResolvedParam> = Vec::with_capacity(method.params.len());
            for param in &method.params {
                let ty = self.resolve_type(&param.ty, param.array);
                if ty == Type::Void {
                    self.error(
                        ErrorCode::E3001,
                        param.ty.span,
                        format!("parameter `{}` cannot be void", self.name(param.name)),
                        "void parameter",
                    );
                }
                if params.iter().any(|p| p.name == param.name) {
                    self.error(
                        ErrorCode::E3005,
                        param.name_span,
                        format!("duplicate parameter `{}`", self.name(param.name)),
                        "declared again here",
                    );
                }
                params.push(ResolvedParam {
                    name: param.name,
                    ty,
                    modifiers: param.modifiers,
                    semantic: param.semantic.map(|s| s.name),
                    span: param.name_span,
                });
            }
            if self.methods.iter().any(|m| m.name() == method.name) {
                self.error(
                    ErrorCode::E3005,
                    method.name_span,
                    format!(
                        "method `{}` is already defined in this mixin",
                        self.name(method.name)
                    ),
                    "defined again here",
                );
                continue;
            }
            self.methods.push(ResolvedMethod {
                decl: method.clone(),
                return_ty,
                params,
                locals: Vec::new(),
                declarators: FxHashMap::default(),
            });
        }
    }

    fn check_field_inits(&mut self) {
        for index in 0..self.fields.len() {
            let Some(init) = self.fields[index].init else {
                continue;
            };
            let expected = self.fields[index].ty.clone();
            let found = self.check_expr(init);
            self.expect_convertible(init, &found, &expected);
        }
    }

    fn check_method_bodies(&mut self) {
        for index in 0..self.methods.len() {
            let method = &self.methods[index];
            let Some(body) = method.decl.body else {
                continue;
            };
            let mut scopes = Scopes::new();
            for (i, param) in method.params.iter().enumerate() {
                scopes.declare(param.name, Binding::Param(i as u32));
            }
            let mut declared = FxHashSet::default();
            stmt::collect_declared(self.arena, body, &mut declared);
            self.func = Some(FnState {
                scopes,
                params: method.params.clone(),
                locals: Vec::new(),
                declarators: FxHashMap::default(),
                declared,
                return_ty: method.return_ty.clone(),
                loop_depth: 0,
            });

            self.check_stmt(body);

            if let Some(state) = self.func.take() {
                let method = &mut self.methods[index];
                method.locals = state.locals;
                method.declarators = state.declarators;
            }
        }
    }
}
