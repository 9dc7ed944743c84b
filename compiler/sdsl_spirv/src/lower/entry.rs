//! Entry point wrappers and stage interfaces.
//!
//! Shader code talks to the pipeline through `stream` fields. For each entry
//! point a `main` wrapper runs the field initializers, loads the stage
//! inputs into the stream variables, calls the entry method and stores the
//! stream outputs:
//!
//! ```text
//! main:
//!     Position = streams.Position initializers...
//!     streams.TexCoord = Load(in_TexCoord)
//!     call PSMain
//!     Store(out_Target0, streams.ColorTarget)
//! ```
//!
//! A stream is an input when the entry's call closure reads it and an
//! output when the closure writes it. System-value semantics map to
//! builtins; user semantics share one location table across stages so a
//! vertex output meets the pixel input of the same name.

use std::collections::BTreeSet;

use sdsl_diagnostic::ErrorCode;
use sdsl_ir::{SourceId, Span};
use sdsl_mixer::{EntryPoint, Stage};
use sdsl_resolve::FieldStorage;
use sdsl_types::{ScalarType, Type};
use smallvec::SmallVec;

use super::function::FunctionLowerer;
use super::usage::ProgramUsage;
use super::{Emitter, FieldSlot};
use crate::builder::TypeKey;
use crate::instruction::{operands, Id, Instruction, Operand};
use crate::op::{BuiltIn, Decoration, ExecutionMode, ExecutionModel, Op, StorageClass};
use crate::reflect::{EntryPointReflection, InputAttribute};

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum Direction {
    Input,
    Output,
}

/// How one interface variable is bound to the pipeline.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum Binding {
    BuiltIn(BuiltIn),
    Location(u32),
}

/// The builtin a system-value semantic denotes in `stage`.
fn builtin(semantic: &str, stage: Stage, direction: Direction) -> Option<BuiltIn> {
    let upper = semantic.to_ascii_uppercase();
    let builtin = match (upper.as_str(), stage, direction) {
        ("SV_POSITION", Stage::Vertex, Direction::Output) => BuiltIn::Position,
        ("SV_POSITION", Stage::Pixel, Direction::Input) => BuiltIn::FragCoord,
        ("SV_VERTEXID", Stage::Vertex, Direction::Input) => BuiltIn::VertexIndex,
        ("SV_INSTANCEID", Stage::Vertex, Direction::Input) => BuiltIn::InstanceIndex,
        ("SV_ISFRONTFACE", Stage::Pixel, Direction::Input) => BuiltIn::FrontFacing,
        ("SV_DEPTH", Stage::Pixel, Direction::Output) => BuiltIn::FragDepth,
        ("SV_DISPATCHTHREADID", Stage::Compute, Direction::Input) => BuiltIn::GlobalInvocationId,
        ("SV_GROUPTHREADID", Stage::Compute, Direction::Input) => BuiltIn::LocalInvocationId,
        ("SV_GROUPID", Stage::Compute, Direction::Input) => BuiltIn::WorkgroupId,
        ("SV_GROUPINDEX", Stage::Compute, Direction::Input) => BuiltIn::LocalInvocationIndex,
        _ => return None,
    };
    Some(builtin)
}

/// `SV_Target` is render target 0; `SV_TargetN` is N.
fn render_target(semantic: &str) -> Option<u32> {
    let upper = semantic.to_ascii_uppercase();
    let index = upper.strip_prefix("SV_TARGET")?;
    if index.is_empty() {
        Some(0)
    } else {
        index.parse().ok().filter(|n| *n < 8)
    }
}

fn is_system_value(semantic: &str) -> bool {
    semantic.len() > 3 && semantic[..3].eq_ignore_ascii_case("SV_")
}

/// Whether a stream of type `ty` can carry `builtin`.
fn builtin_accepts(builtin: BuiltIn, ty: &Type) -> bool {
    let integer = |s: ScalarType| matches!(s, ScalarType::Int | ScalarType::UInt);
    match builtin {
        BuiltIn::Position | BuiltIn::FragCoord => *ty == Type::Vector(ScalarType::Float, 4),
        BuiltIn::FrontFacing => *ty == Type::BOOL,
        BuiltIn::FragDepth => *ty == Type::FLOAT,
        BuiltIn::VertexIndex | BuiltIn::InstanceIndex | BuiltIn::LocalInvocationIndex => {
            matches!(ty, Type::Scalar(s) if integer(*s))
        }
        BuiltIn::GlobalInvocationId | BuiltIn::LocalInvocationId | BuiltIn::WorkgroupId => {
            matches!(ty, Type::Vector(s, 3) if integer(*s))
        }
    }
}

/// Types a location-bound interface variable may have.
fn location_accepts(ty: &Type) -> bool {
    match ty {
        Type::Scalar(s) | Type::Vector(s, _) => *s != ScalarType::Bool,
        Type::Matrix { .. } => true,
        _ => false,
    }
}

/// One stage interface variable.
struct Interface {
    var: Id,
    /// Stream field the value is copied from or to; `None` for the entry's
    /// return value.
    field: Option<usize>,
    ty: Type,
}

struct EntryLowering<'e, 'a> {
    em: &'e mut Emitter<'a>,
    entry: &'e EntryPoint,
    source: SourceId,
    /// Sorted user semantics; the index is the location.
    locations: Vec<String>,
    inputs: Vec<Interface>,
    outputs: Vec<Interface>,
    /// Whether the wrapper writes `FragDepth`.
    depth_replacing: bool,
}

/// Emit the wrapper, interface variables and `OpEntryPoint` for `entry`.
pub(super) fn lower_entry_point(em: &mut Emitter<'_>, entry: &EntryPoint, usage: &ProgramUsage) {
    let program = em.program;
    let source = program.mixin(entry.method.mixin).unit.id;
    let locations = user_semantics(em);
    let mut lowering = EntryLowering {
        em,
        entry,
        source,
        locations,
        inputs: Vec::new(),
        outputs: Vec::new(),
        depth_replacing: false,
    };
    if !lowering.check_signature() {
        return;
    }

    let usage = usage.entry(entry.method);
    for (index, composed) in program.fields.iter().enumerate() {
        if composed.field.storage != FieldStorage::Stream {
            continue;
        }
        if usage.reads.contains(&composed.field.name) {
            lowering.stream(index, Direction::Input);
        }
        if usage.writes.contains(&composed.field.name) {
            lowering.stream(index, Direction::Output);
        }
    }
    lowering.return_value();
    lowering.finish();
}

/// Every user semantic attached to a stream field, sorted and deduplicated
/// case-insensitively.
fn user_semantics(em: &Emitter<'_>) -> Vec<String> {
    let semantics: BTreeSet<String> = em
        .program
        .fields
        .iter()
        .filter(|c| c.field.storage == FieldStorage::Stream)
        .filter_map(|c| c.field.semantic)
        .map(|s| em.name(s))
        .filter(|s| !is_system_value(s))
        .map(str::to_ascii_uppercase)
        .collect();
    semantics.into_iter().collect()
}

impl EntryLowering<'_, '_> {
    fn error(&mut self, code: ErrorCode, span: Span, message: String, label: &str) {
        self.em.error(code, self.source, span, message, label);
    }

    /// Entry points take no parameters; stage data flows through streams.
    fn check_signature(&mut self) -> bool {
        let program = self.em.program;
        let method = program.method(self.entry.method);
        let name = self.em.name(method.name());
        let mut ok = true;
        if let Some(param) = method.params.first() {
            let message = format!(
                "{} entry point `{name}` cannot take parameters; use stream variables",
                self.entry.stage
            );
            self.error(ErrorCode::E5004, param.span, message, "parameter on entry point");
            ok = false;
        }
        if self.entry.stage == Stage::Compute && method.return_ty != Type::Void {
            let message = format!("compute entry point `{name}` must return `void`");
            self.error(ErrorCode::E5004, method.decl.name_span, message, "returns a value");
            ok = false;
        }
        ok
    }

    /// How a stream with `semantic` is bound in this stage and direction,
    /// if it is part of the interface at all.
    fn binding(&self, semantic: &str, direction: Direction) -> Option<Binding> {
        let stage = self.entry.stage;
        if is_system_value(semantic) {
            if let Some(builtin) = builtin(semantic, stage, direction) {
                return Some(Binding::BuiltIn(builtin));
            }
            return match (stage, direction) {
                (Stage::Pixel, Direction::Output) => render_target(semantic).map(Binding::Location),
                _ => None,
            };
        }
        let user_facing = matches!(
            (stage, direction),
            (Stage::Vertex, _) | (Stage::Pixel, Direction::Input)
        );
        if !user_facing {
            return None;
        }
        let upper = semantic.to_ascii_uppercase();
        let location = self.locations.iter().position(|s| *s == upper)?;
        Some(Binding::Location(location as u32))
    }

    fn stream(&mut self, index: usize, direction: Direction) {
        let program = self.em.program;
        let composed = &program.fields[index];
        let Some(semantic) = composed.field.semantic else {
            return;
        };
        let semantic = self.em.name(semantic);
        let Some(binding) = self.binding(semantic, direction) else {
            return;
        };
        let source = program.mixin(composed.owner).unit.id;
        let ty = composed.field.ty.clone();
        if let Some(var) = self.interface_variable(semantic, binding, direction, &ty, source, composed.field.span) {
            let interface = Interface {
                var,
                field: Some(index),
                ty,
            };
            match direction {
                Direction::Input => self.inputs.push(interface),
                Direction::Output => self.outputs.push(interface),
            }
        }
    }

    /// A non-void entry's result goes to the output its semantic names.
    fn return_value(&mut self) {
        let program = self.em.program;
        let method = program.method(self.entry.method);
        if method.return_ty == Type::Void {
            return;
        }
        let name = self.em.name(method.name());
        let binding = method
            .decl
            .semantic
            .map(|s| self.em.name(s.name))
            .and_then(|s| self.binding(s, Direction::Output).map(|b| (s, b)));
        let Some((semantic, binding)) = binding else {
            let message = format!(
                "{} entry point `{name}` returns a value without an output semantic",
                self.entry.stage
            );
            self.error(ErrorCode::E5004, method.decl.name_span, message, "needs e.g. `: SV_Target`");
            return;
        };
        let ty = method.return_ty.clone();
        if let Some(var) = self.interface_variable(
            semantic,
            binding,
            Direction::Output,
            &ty,
            self.source,
            method.decl.name_span,
        ) {
            self.outputs.push(Interface {
                var,
                field: None,
                ty,
            });
        }
    }

    fn interface_variable(
        &mut self,
        semantic: &str,
        binding: Binding,
        direction: Direction,
        ty: &Type,
        source: SourceId,
        span: Span,
    ) -> Option<Id> {
        let accepted = match binding {
            Binding::BuiltIn(builtin) => builtin_accepts(builtin, ty),
            Binding::Location(_) => location_accepts(ty),
        };
        if !accepted {
            let message = format!(
                "semantic `{semantic}` cannot carry a value of type `{}`",
                ty.display(self.em.interner)
            );
            self.em
                .error(ErrorCode::E5004, source, span, message, "invalid stage interface type");
            return None;
        }

        let class = match direction {
            Direction::Input => StorageClass::Input,
            Direction::Output => StorageClass::Output,
        };
        let pointee = self.em.lower_type(ty);
        let pointer = self.em.builder.pointer(class, pointee);
        let var = self.em.builder.global_variable(pointer, class);
        let prefix = match direction {
            Direction::Input => "in",
            Direction::Output => "out",
        };
        self.em.builder.name(var, &format!("{prefix}.{semantic}"));
        match binding {
            Binding::BuiltIn(builtin) => {
                self.em
                    .builder
                    .decorate(var, Decoration::BuiltIn, &[builtin as u32]);
                self.depth_replacing |= builtin == BuiltIn::FragDepth;
            }
            Binding::Location(location) => {
                self.em
                    .builder
                    .decorate(var, Decoration::Location, &[location]);
                let integer = ty.scalar().is_some_and(|s| s != ScalarType::Float);
                if integer && self.entry.stage == Stage::Pixel && direction == Direction::Input {
                    self.em.builder.decorate(var, Decoration::Flat, &[]);
                }
                if self.entry.stage == Stage::Vertex && direction == Direction::Input {
                    self.em.reflection.input_attributes.push(InputAttribute {
                        semantic: semantic.to_string(),
                        location,
                        type_name: ty.display(self.em.interner).to_string(),
                    });
                }
            }
        }
        Some(var)
    }

    /// Build the wrapper and the `OpEntryPoint`.
    fn finish(self) {
        let EntryLowering {
            em,
            entry,
            inputs,
            outputs,
            depth_replacing,
            ..
        } = self;
        let program = em.program;
        let Some(decl) = em.function(entry.method).cloned() else {
            return;
        };
        let void = em.lower_type(&Type::Void);
        let fn_ty = em.builder.type_id(TypeKey::Function(void, SmallVec::new()));
        let wrapper = em.builder.fresh();
        em.builder.name(wrapper, "main");

        {
            let mut lowerer =
                FunctionLowerer::new(&mut *em, entry.method.mixin, None, wrapper, fn_ty, Type::Void);

            for (index, composed) in program.fields.iter().enumerate() {
                let field = &composed.field;
                let (Some(init), FieldStorage::Static | FieldStorage::Stream) =
                    (field.init, field.storage)
                else {
                    continue;
                };
                let FieldSlot::Variable { var, .. } = lowerer.em.slot(index) else {
                    continue;
                };
                lowerer.mixin = composed.owner;
                let value = lowerer.eval_as(init, &field.ty);
                lowerer.store_pointer(var, value);
            }
            lowerer.mixin = entry.method.mixin;

            for input in &inputs {
                let Some(FieldSlot::Variable { var, .. }) = input.field.map(|f| lowerer.em.slot(f)) else {
                    continue;
                };
                let ty_id = lowerer.em.lower_type(&input.ty);
                let value = lowerer.emit(Op::Load, ty_id, operands![id input.var]);
                lowerer.store_pointer(var, value);
            }

            let ret = lowerer.em.lower_type(&decl.ret);
            let result = lowerer.emit(Op::FunctionCall, ret, operands![id decl.id]);

            for output in &outputs {
                let value = match output.field {
                    None => result,
                    Some(field) => {
                        let FieldSlot::Variable { var, .. } = lowerer.em.slot(field) else {
                            continue;
                        };
                        let ty_id = lowerer.em.lower_type(&output.ty);
                        lowerer.emit(Op::Load, ty_id, operands![id var])
                    }
                };
                lowerer.store_pointer(output.var, value);
            }

            lowerer.return_value(None);
            let span = program.method(entry.method).decl.name_span;
            let function = lowerer.finish(span);
            em.builder.functions.push(function);
        }

        let name = em.name(entry.name);
        let model = match entry.stage {
            Stage::Vertex => ExecutionModel::Vertex,
            Stage::Pixel => ExecutionModel::Fragment,
            Stage::Compute => ExecutionModel::GLCompute,
        };
        let mut list = operands![lit model as u32, id wrapper, str name];
        list.extend(inputs.iter().chain(&outputs).map(|i| Operand::Id(i.var)));
        em.builder
            .entry_point(Instruction::plain(Op::EntryPoint, list));
        match entry.stage {
            Stage::Pixel => {
                em.builder
                    .execution_mode(wrapper, ExecutionMode::OriginUpperLeft, &[]);
                if depth_replacing {
                    em.builder
                        .execution_mode(wrapper, ExecutionMode::DepthReplacing, &[]);
                }
            }
            Stage::Compute => {
                em.builder
                    .execution_mode(wrapper, ExecutionMode::LocalSize, &entry.workgroup);
            }
            Stage::Vertex => {}
        }

        em.reflection.entry_points.push(EntryPointReflection {
            name: name.to_string(),
            stage: entry.stage.into(),
            workgroup: entry.workgroup,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_position_depends_on_stage() {
        assert_eq!(
            builtin("SV_Position", Stage::Vertex, Direction::Output),
            Some(BuiltIn::Position)
        );
        assert_eq!(
            builtin("SV_POSITION", Stage::Pixel, Direction::Input),
            Some(BuiltIn::FragCoord)
        );
        assert_eq!(builtin("SV_Position", Stage::Vertex, Direction::Input), None);
    }

    #[test]
    fn test_render_targets() {
        assert_eq!(render_target("SV_Target"), Some(0));
        assert_eq!(render_target("SV_Target3"), Some(3));
        assert_eq!(render_target("SV_Target9"), None);
        assert_eq!(render_target("COLOR"), None);
    }

    #[test]
    fn test_builtin_types() {
        let float4 = Type::Vector(ScalarType::Float, 4);
        assert!(builtin_accepts(BuiltIn::Position, &float4));
        assert!(!builtin_accepts(BuiltIn::Position, &Type::FLOAT));
        assert!(builtin_accepts(BuiltIn::VertexIndex, &Type::UINT));
        assert!(builtin_accepts(
            BuiltIn::GlobalInvocationId,
            &Type::Vector(ScalarType::UInt, 3)
        ));
        assert!(!location_accepts(&Type::BOOL));
    }
}
