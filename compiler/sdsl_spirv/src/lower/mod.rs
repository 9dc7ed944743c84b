//! Lowering of a composed program to a SPIR-V module.
//!
//! [`Emitter`] owns program-level state: global variables for fields and
//! constant buffers, function declarations and reflection. Method bodies
//! are lowered by [`FunctionLowerer`](function::FunctionLowerer), split over
//! the sibling modules by concern:
//!
//! - `stmt`: statements and structured control flow
//! - `expr` / `place`: expressions, loads and stores
//! - `convert`: implicit conversions and reshaping
//! - `intrinsic`: builtin functions
//! - `entry`: entry point wrappers and stage interfaces

mod convert;
mod entry;
mod expr;
mod function;
mod intrinsic;
mod place;
mod stmt;
mod types;
mod usage;

use rustc_hash::{FxHashMap, FxHashSet};
use sdsl_diagnostic::{Diagnostic, ErrorCode};
use sdsl_ir::{Modifiers, Name, SourceId, Span, StringInterner};
use sdsl_mixer::{ComposedProgram, MethodRef};
use sdsl_resolve::FieldStorage;
use sdsl_types::{layout, Type};
use smallvec::SmallVec;

use crate::builder::{ModuleBuilder, StructKey, TypeKey};
use crate::instruction::Id;
use crate::module::Module;
use crate::op::{Decoration, StorageClass};
use crate::reflect::{
    BindingClass, ConstantBufferMember, ConstantBufferReflection, EffectReflection,
    ResourceBinding,
};
use crate::EmitOptions;

use function::FunctionLowerer;
use usage::ProgramUsage;

/// Where a composed field lives in the module.
#[derive(Copy, Clone, Debug)]
pub(crate) enum FieldSlot {
    /// Member `member` of the block struct of buffer `buffer`.
    Uniform { buffer: usize, member: u32 },
    /// A global variable.
    Variable { var: Id, class: StorageClass },
    /// A `static const` field, lowered inline at each use.
    Constant,
}

/// A declared SPIR-V function for a reachable method.
#[derive(Clone, Debug)]
pub(crate) struct FunctionDecl {
    pub id: Id,
    pub ty: Id,
    pub params: Vec<Type>,
    pub ret: Type,
}

/// What a binding in the reflection refers to, for stage usage.
#[derive(Copy, Clone)]
enum BindingSource {
    Buffer(usize),
    Field(usize),
}

pub(crate) struct Emitter<'a> {
    pub(crate) builder: ModuleBuilder,
    pub(crate) program: &'a ComposedProgram,
    pub(crate) interner: &'a StringInterner,
    pub(crate) errors: Vec<Diagnostic>,
    slots: Vec<FieldSlot>,
    buffer_vars: Vec<Id>,
    functions: FxHashMap<MethodRef, FunctionDecl>,
    /// Types whose layout decorations were already added.
    decorated: FxHashSet<Id>,
    reflection: EffectReflection,
    binding_sources: Vec<BindingSource>,
    next_binding: u32,
}

impl<'a> Emitter<'a> {
    pub(crate) fn new(
        program: &'a ComposedProgram,
        options: &EmitOptions,
        interner: &'a StringInterner,
    ) -> Self {
        Emitter {
            builder: ModuleBuilder::new(options.debug_names),
            program,
            interner,
            errors: Vec::new(),
            slots: Vec::new(),
            buffer_vars: Vec::new(),
            functions: FxHashMap::default(),
            decorated: FxHashSet::default(),
            reflection: EffectReflection::default(),
            binding_sources: Vec::new(),
            next_binding: 0,
        }
    }

    #[inline]
    pub(crate) fn name(&self, name: Name) -> &'static str {
        self.interner.lookup(name)
    }

    pub(crate) fn error(
        &mut self,
        code: ErrorCode,
        source: SourceId,
        span: Span,
        message: impl Into<String>,
        label: &str,
    ) {
        self.errors.push(
            Diagnostic::error(code)
                .with_message(message)
                .with_source(source)
                .with_label(span, label),
        );
    }

    /// Lower the whole program. Returns `None` when `should_stop` asked to
    /// abandon the work.
    pub(crate) fn run(
        mut self,
        should_stop: &dyn Fn() -> bool,
    ) -> Option<Result<(Module, EffectReflection), Vec<Diagnostic>>> {
        self.check_fields();
        self.declare_buffers();
        self.declare_field_variables();
        self.declare_functions();

        let program = self.program;
        for &method in &program.reachable {
            if should_stop() {
                return None;
            }
            if let Some(function) = FunctionLowerer::lower_method(&mut self, method) {
                self.builder.functions.push(function);
            }
        }

        let usage = ProgramUsage::collect(program);
        if program.is_library() {
            self.export_library();
        } else {
            for entry in &program.entry_points {
                if should_stop() {
                    return None;
                }
                entry::lower_entry_point(&mut self, entry, &usage);
            }
        }
        self.record_binding_stages(&usage);

        if !self.errors.is_empty() {
            return Some(Err(self.errors));
        }
        crate::passes::run(&mut self.builder);
        Some(Ok((self.builder.finish(), self.reflection)))
    }

    pub(crate) fn slot(&self, field: usize) -> FieldSlot {
        self.slots.get(field).copied().unwrap_or(FieldSlot::Constant)
    }

    pub(crate) fn buffer_var(&self, buffer: usize) -> Id {
        self.buffer_vars.get(buffer).copied().unwrap_or(Id::NONE)
    }

    pub(crate) fn function(&self, method: MethodRef) -> Option<&FunctionDecl> {
        self.functions.get(&method)
    }

    /// Reject fields the emitter has no mapping for.
    fn check_fields(&mut self) {
        let program = self.program;
        for composed in &program.fields {
            let field = &composed.field;
            let source = program.mixin(composed.owner).unit.id;
            if field.modifiers.contains(Modifiers::STAGE) {
                let message = format!("`stage` field `{}` is not supported", self.name(field.name));
                self.error(ErrorCode::E5003, source, field.span, message, "stage field");
            }
            self.check_supported(&field.ty, source, field.span);
        }
    }

    fn declare_buffers(&mut self) {
        let program = self.program;
        self.slots = vec![FieldSlot::Constant; program.fields.len()];
        let mut binding = 0;
        for (index, buffer) in program.buffers.iter().enumerate() {
            let fields: Vec<(Name, &Type)> = buffer
                .members
                .iter()
                .map(|&i| (program.fields[i].field.name, &program.fields[i].field.ty))
                .collect();
            let buffer_layout = layout::layout_members(fields.iter().copied(), &program.structs);
            for &field in &buffer.members {
                let composed = &program.fields[field];
                if self.struct_has_bool(&composed.field.ty) {
                    let source = program.mixin(composed.owner).unit.id;
                    let message = format!(
                        "struct with a `bool` member cannot be stored in constant buffer `{}`",
                        self.name(buffer.name)
                    );
                    self.error(ErrorCode::E5003, source, composed.field.span, message, "here");
                }
            }

            let member_types: Vec<Id> = fields.iter().map(|(_, ty)| self.uniform_type(ty)).collect();
            let block = self
                .builder
                .struct_type(StructKey::Block(buffer.name), &member_types);
            self.builder.decorate(block, Decoration::Block, &[]);
            self.builder.name(block, self.name(buffer.name));
            let placed = buffer_layout.members.iter().zip(&buffer.members);
            for (member, (placement, &field)) in placed.enumerate() {
                let member = member as u32;
                self.builder
                    .member_decorate(block, member, Decoration::Offset, &[placement.offset]);
                self.decorate_matrix_member(block, member, &placement.ty);
                self.builder.member_name(block, member, self.name(placement.name));
                self.slots[field] = FieldSlot::Uniform {
                    buffer: index,
                    member,
                };
            }

            let var = self.builder.global_variable(block, StorageClass::Uniform);
            self.builder.decorate(var, Decoration::DescriptorSet, &[0]);
            self.builder.decorate(var, Decoration::Binding, &[binding]);
            self.builder.name(var, self.name(buffer.name));
            self.buffer_vars.push(var);

            self.reflection.bindings.push(ResourceBinding {
                name: self.name(buffer.name).to_string(),
                class: BindingClass::ConstantBuffer,
                type_name: "cbuffer".to_string(),
                stages: Vec::new(),
                slot: index as u32,
                count: 1,
                binding,
            });
            self.binding_sources.push(BindingSource::Buffer(index));
            binding += 1;

            self.reflection.constant_buffers.push(ConstantBufferReflection {
                name: self.name(buffer.name).to_string(),
                size: buffer_layout.size,
                members: buffer_layout
                    .members
                    .iter()
                    .map(|m| ConstantBufferMember {
                        name: self.name(m.name).to_string(),
                        offset: m.offset,
                        size: m.size,
                        type_name: m.ty.display(self.interner).to_string(),
                    })
                    .collect(),
            });
        }
        self.next_binding = binding;
    }

    /// Resources, stream and static fields become global variables.
    fn declare_field_variables(&mut self) {
        let program = self.program;
        let mut srv_slot = 0;
        let mut sampler_slot = 0;
        for (index, composed) in program.fields.iter().enumerate() {
            let field = &composed.field;
            let class = match field.storage {
                FieldStorage::Resource => StorageClass::UniformConstant,
                FieldStorage::Stream | FieldStorage::Static => StorageClass::Private,
                FieldStorage::Uniform { .. } | FieldStorage::Constant => continue,
            };
            let ty = self.lower_type(&field.ty);
            let var = self.builder.global_variable(ty, class);
            self.builder.name(var, self.name(field.name));
            self.slots[index] = FieldSlot::Variable { var, class };

            if class == StorageClass::UniformConstant {
                let (element, count) = match &field.ty {
                    Type::Array(element, len) => (&**element, *len),
                    other => (other, 1),
                };
                let (class, slot) = if matches!(element, Type::Sampler) {
                    (BindingClass::Sampler, &mut sampler_slot)
                } else {
                    (BindingClass::ShaderResourceView, &mut srv_slot)
                };
                let binding = self.next_binding;
                self.next_binding += 1;
                self.builder.decorate(var, Decoration::DescriptorSet, &[0]);
                self.builder.decorate(var, Decoration::Binding, &[binding]);
                self.reflection.bindings.push(ResourceBinding {
                    name: self.name(field.name).to_string(),
                    class,
                    type_name: field.ty.display(self.interner).to_string(),
                    stages: Vec::new(),
                    slot: *slot,
                    count,
                    binding,
                });
                *slot += count;
                self.binding_sources.push(BindingSource::Field(index));
            }
        }
    }

    fn declare_functions(&mut self) {
        let program = self.program;
        for &method_ref in &program.reachable {
            let mixin = program.mixin(method_ref.mixin);
            let method = program.method(method_ref);
            let source = mixin.unit.id;
            self.check_supported(&method.return_ty, source, method.decl.return_ty.span);
            for param in &method.params {
                if param.modifiers.intersects(Modifiers::OUT) {
                    let message = format!(
                        "`out` parameter `{}` is not supported",
                        self.name(param.name)
                    );
                    self.error(ErrorCode::E5003, source, param.span, message, "out parameter");
                }
                self.check_supported(&param.ty, source, param.span);
            }

            let ret = self.lower_type(&method.return_ty);
            let params: SmallVec<[Id; 4]> =
                method.params.iter().map(|p| self.lower_type(&p.ty)).collect();
            let ty = self.builder.type_id(TypeKey::Function(ret, params));
            let id = self.builder.fresh();
            let label = format!("{}.{}", self.name(mixin.name), self.name(method.name()));
            self.builder.name(id, &label);
            self.functions.insert(
                method_ref,
                FunctionDecl {
                    id,
                    ty,
                    params: method.params.iter().map(|p| p.ty.clone()).collect(),
                    ret: method.return_ty.clone(),
                },
            );
        }
    }

    /// Export the final implementation of every method by name.
    fn export_library(&mut self) {
        let program = self.program;
        let mut exported: Vec<(Name, Id)> = program
            .chains
            .iter()
            .filter_map(|chain| {
                let target = program.final_impl(chain.name)?;
                Some((chain.name, self.functions.get(&target)?.id))
            })
            .collect();
        exported.sort_by_key(|(name, _)| self.name(*name));
        for (name, id) in exported {
            self.builder.export(id, self.name(name));
        }
    }

    fn record_binding_stages(&mut self, usage: &ProgramUsage) {
        let program = self.program;
        for (binding, source) in self.reflection.bindings.iter_mut().zip(&self.binding_sources) {
            for entry in &program.entry_points {
                let stage_usage = usage.entry(entry.method);
                let used = match *source {
                    BindingSource::Buffer(buffer) => program.buffers[buffer]
                        .members
                        .iter()
                        .any(|&f| stage_usage.uses(program.fields[f].field.name)),
                    BindingSource::Field(field) => {
                        stage_usage.uses(program.fields[field].field.name)
                    }
                };
                let stage = entry.stage.into();
                if used && !binding.stages.contains(&stage) {
                    binding.stages.push(stage);
                }
            }
        }
    }
}
