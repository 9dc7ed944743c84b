//! Module builder: id allocation plus structural dedup of types and
//! constants.
//!
//! Types and constants are interned by key, so asking twice for `float4` or
//! for the constant `1.0f` yields the same id. Their instructions are
//! appended to the globals section in creation order, which keeps every
//! operand defined before its use.

use std::collections::BTreeSet;

use rustc_hash::{FxHashMap, FxHashSet};
use sdsl_ir::Name;
use smallvec::SmallVec;

use crate::instruction::{operands, Id, Instruction, Operand};
use crate::module::{Function, Module};
use crate::op::{self, Capability, Decoration, Op, StorageClass};

/// Structural identity of a type.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum TypeKey {
    Void,
    Bool,
    Int { signed: bool },
    Float,
    Vector(Id, u32),
    /// Column type and column count.
    Matrix(Id, u32),
    Image { sampled: Id, dim: u32, arrayed: bool },
    Sampler,
    SampledImage(Id),
    /// Element type and length.
    Array(Id, u32),
    Struct(StructKey),
    Pointer(StorageClass, Id),
    Function(Id, SmallVec<[Id; 4]>),
}

/// Structs are nominal: a shader struct by name, or the block struct of a
/// constant buffer.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum StructKey {
    Shader(Name),
    Block(Name),
}

/// A constant's value. Scalars are stored as their 32-bit pattern.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum ConstValue {
    Bool(bool),
    Word(u32),
    Composite(SmallVec<[Id; 4]>),
    Null,
}

#[derive(Default)]
pub struct ModuleBuilder {
    next_id: u32,
    capabilities: BTreeSet<Capability>,
    glsl: Id,
    entry_points: Vec<Instruction>,
    execution_modes: Vec<Instruction>,
    debug_names: Vec<Instruction>,
    annotations: Vec<Instruction>,
    globals: Vec<Instruction>,
    pub(crate) functions: Vec<Function>,
    types: FxHashMap<TypeKey, Id>,
    type_keys: FxHashMap<Id, TypeKey>,
    constants: FxHashMap<(Id, ConstValue), Id>,
    const_values: FxHashMap<Id, (Id, ConstValue)>,
    emit_names: bool,
}

impl ModuleBuilder {
    pub fn new(emit_names: bool) -> Self {
        let mut builder = ModuleBuilder {
            next_id: 1,
            emit_names,
            ..ModuleBuilder::default()
        };
        builder.capability(Capability::Shader);
        builder.glsl = builder.fresh();
        builder
    }

    /// Allocate a new result id.
    pub fn fresh(&mut self) -> Id {
        let id = Id::new(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn capability(&mut self, capability: Capability) {
        self.capabilities.insert(capability);
    }

    /// The `GLSL.std.450` import.
    #[inline]
    pub fn glsl(&self) -> Id {
        self.glsl
    }

    pub fn type_id(&mut self, key: TypeKey) -> Id {
        if let Some(&id) = self.types.get(&key) {
            return id;
        }
        let id = self.fresh();
        let inst = match &key {
            TypeKey::Void => Instruction::new(Op::TypeVoid, None, Some(id), operands![]),
            TypeKey::Bool => Instruction::new(Op::TypeBool, None, Some(id), operands![]),
            TypeKey::Int { signed } => Instruction::new(
                Op::TypeInt,
                None,
                Some(id),
                operands![lit 32, lit u32::from(*signed)],
            ),
            TypeKey::Float => Instruction::new(Op::TypeFloat, None, Some(id), operands![lit 32]),
            TypeKey::Vector(component, count) => Instruction::new(
                Op::TypeVector,
                None,
                Some(id),
                operands![id *component, lit *count],
            ),
            TypeKey::Matrix(column, count) => Instruction::new(
                Op::TypeMatrix,
                None,
                Some(id),
                operands![id *column, lit *count],
            ),
            TypeKey::Image {
                sampled,
                dim,
                arrayed,
            } => Instruction::new(
                Op::TypeImage,
                None,
                Some(id),
                // depth 0, arrayed, single-sampled, sampled 1, format Unknown
                operands![id *sampled, lit *dim, lit 0, lit u32::from(*arrayed), lit 0, lit 1, lit 0],
            ),
            TypeKey::Sampler => Instruction::new(Op::TypeSampler, None, Some(id), operands![]),
            TypeKey::SampledImage(image) => Instruction::new(
                Op::TypeSampledImage,
                None,
                Some(id),
                operands![id *image],
            ),
            TypeKey::Array(element, len) => {
                let uint = self.type_id(TypeKey::Int { signed: false });
                let len = self.constant(uint, ConstValue::Word(*len));
                Instruction::new(
                    Op::TypeArray,
                    None,
                    Some(id),
                    operands![id *element, id len],
                )
            }
            TypeKey::Struct(_) => {
                // Structs are created through `struct_type`.
                Instruction::new(Op::TypeStruct, None, Some(id), operands![])
            }
            TypeKey::Pointer(class, pointee) => Instruction::new(
                Op::TypePointer,
                None,
                Some(id),
                operands![lit *class as u32, id *pointee],
            ),
            TypeKey::Function(ret, params) => {
                let mut list = operands![id *ret];
                list.extend(params.iter().map(|p| Operand::Id(*p)));
                Instruction::new(Op::TypeFunction, None, Some(id), list)
            }
        };
        self.globals.push(inst);
        self.types.insert(key.clone(), id);
        self.type_keys.insert(id, key);
        id
    }

    /// The id of an already declared struct.
    pub fn struct_id(&self, key: StructKey) -> Option<Id> {
        self.types.get(&TypeKey::Struct(key)).copied()
    }

    /// Declare a struct with the given member types. The caller adds member
    /// decorations.
    pub fn struct_type(&mut self, key: StructKey, members: &[Id]) -> Id {
        if let Some(id) = self.struct_id(key) {
            return id;
        }
        let id = self.fresh();
        let list = members.iter().map(|m| Operand::Id(*m)).collect();
        self.globals
            .push(Instruction::new(Op::TypeStruct, None, Some(id), list));
        self.types.insert(TypeKey::Struct(key), id);
        self.type_keys.insert(id, TypeKey::Struct(key));
        id
    }

    pub fn type_key(&self, id: Id) -> Option<&TypeKey> {
        self.type_keys.get(&id)
    }

    pub fn pointer(&mut self, class: StorageClass, pointee: Id) -> Id {
        self.type_id(TypeKey::Pointer(class, pointee))
    }

    pub fn constant(&mut self, ty: Id, value: ConstValue) -> Id {
        let key = (ty, value);
        if let Some(&id) = self.constants.get(&key) {
            return id;
        }
        let id = self.fresh();
        let inst = match &key.1 {
            ConstValue::Bool(true) => {
                Instruction::new(Op::ConstantTrue, Some(ty), Some(id), operands![])
            }
            ConstValue::Bool(false) => {
                Instruction::new(Op::ConstantFalse, Some(ty), Some(id), operands![])
            }
            ConstValue::Word(word) => {
                Instruction::new(Op::Constant, Some(ty), Some(id), operands![lit *word])
            }
            ConstValue::Composite(parts) => Instruction::new(
                Op::ConstantComposite,
                Some(ty),
                Some(id),
                parts.iter().map(|p| Operand::Id(*p)).collect(),
            ),
            ConstValue::Null => Instruction::new(Op::ConstantNull, Some(ty), Some(id), operands![]),
        };
        self.globals.push(inst);
        self.const_values.insert(id, key.clone());
        self.constants.insert(key, id);
        id
    }

    /// Type and value of a constant id.
    pub fn const_value(&self, id: Id) -> Option<&(Id, ConstValue)> {
        self.const_values.get(&id)
    }

    pub fn global_variable(&mut self, ty: Id, class: StorageClass) -> Id {
        let pointer = self.pointer(class, ty);
        let id = self.fresh();
        self.globals.push(Instruction::new(
            Op::Variable,
            Some(pointer),
            Some(id),
            operands![lit class as u32],
        ));
        id
    }

    pub fn decorate(&mut self, target: Id, decoration: Decoration, args: &[u32]) {
        let mut list = operands![id target, lit decoration as u32];
        list.extend(args.iter().map(|a| Operand::Literal(*a)));
        self.annotations.push(Instruction::plain(Op::Decorate, list));
    }

    pub fn member_decorate(&mut self, target: Id, member: u32, decoration: Decoration, args: &[u32]) {
        let mut list = operands![id target, lit member, lit decoration as u32];
        list.extend(args.iter().map(|a| Operand::Literal(*a)));
        self.annotations
            .push(Instruction::plain(Op::MemberDecorate, list));
    }

    /// `LinkageAttributes "name" Export`.
    pub fn export(&mut self, target: Id, name: &str) {
        self.capability(Capability::Linkage);
        self.annotations.push(Instruction::plain(
            Op::Decorate,
            operands![
                id target,
                lit Decoration::LinkageAttributes as u32,
                str name,
                lit op::LINKAGE_EXPORT
            ],
        ));
    }

    pub fn name(&mut self, target: Id, name: &str) {
        if self.emit_names {
            self.debug_names
                .push(Instruction::plain(Op::Name, operands![id target, str name]));
        }
    }

    pub fn member_name(&mut self, target: Id, member: u32, name: &str) {
        if self.emit_names {
            self.debug_names.push(Instruction::plain(
                Op::MemberName,
                operands![id target, lit member, str name],
            ));
        }
    }

    pub fn entry_point(&mut self, inst: Instruction) {
        self.entry_points.push(inst);
    }

    pub fn execution_mode(&mut self, target: Id, mode: op::ExecutionMode, args: &[u32]) {
        let mut list = operands![id target, lit mode as u32];
        list.extend(args.iter().map(|a| Operand::Literal(*a)));
        self.execution_modes
            .push(Instruction::plain(Op::ExecutionMode, list));
    }

    /// Declarations of types, constants and global variables.
    pub(crate) fn globals(&self) -> &[Instruction] {
        &self.globals
    }

    /// Instructions whose operands keep declarations alive: entry points,
    /// execution modes and function bodies. Names and decorations do not.
    pub(crate) fn uses(&self) -> impl Iterator<Item = &Instruction> {
        let bodies = self.functions.iter().flat_map(|f| {
            std::iter::once(&f.def)
                .chain(&f.params)
                .chain(f.blocks.iter().flat_map(|b| &b.instructions))
        });
        self.entry_points
            .iter()
            .chain(&self.execution_modes)
            .chain(bodies)
    }

    /// Remove the declarations of `dead` along with their names and
    /// decorations; they can no longer be handed out by `type_id` or
    /// `constant`.
    pub(crate) fn remove_declarations(&mut self, dead: &FxHashSet<Id>) {
        let targets_dead = |inst: &Instruction| {
            inst.operands
                .first()
                .and_then(Operand::as_id)
                .is_some_and(|id| dead.contains(&id))
        };
        self.globals
            .retain(|inst| !inst.result.is_some_and(|id| dead.contains(&id)));
        self.debug_names.retain(|inst| !targets_dead(inst));
        self.annotations.retain(|inst| !targets_dead(inst));
        self.types.retain(|_, id| !dead.contains(id));
        self.type_keys.retain(|id, _| !dead.contains(id));
        self.constants.retain(|_, id| !dead.contains(id));
        self.const_values.retain(|id, _| !dead.contains(id));
    }

    pub fn finish(self) -> Module {
        let capabilities = self
            .capabilities
            .iter()
            .map(|c| Instruction::plain(Op::Capability, operands![lit *c as u32]))
            .collect();
        Module {
            bound: self.next_id,
            capabilities,
            ext_imports: vec![Instruction::new(
                Op::ExtInstImport,
                None,
                Some(self.glsl),
                operands![str "GLSL.std.450"],
            )],
            memory_model: vec![Instruction::plain(
                Op::MemoryModel,
                operands![lit op::ADDRESSING_LOGICAL, lit op::MEMORY_MODEL_GLSL450],
            )],
            entry_points: self.entry_points,
            execution_modes: self.execution_modes,
            debug_names: self.debug_names,
            annotations: self.annotations,
            globals: self.globals,
            functions: self.functions,
        }
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_types_are_interned() {
        let mut builder = ModuleBuilder::new(true);
        let float = builder.type_id(TypeKey::Float);
        let vec4 = builder.type_id(TypeKey::Vector(float, 4));
        assert_eq!(builder.type_id(TypeKey::Float), float);
        assert_eq!(builder.type_id(TypeKey::Vector(float, 4)), vec4);
        assert_ne!(builder.type_id(TypeKey::Vector(float, 3)), vec4);
        assert_eq!(builder.type_key(vec4), Some(&TypeKey::Vector(float, 4)));
    }

    #[test]
    fn test_constants_keyed_by_bits() {
        let mut builder = ModuleBuilder::new(true);
        let float = builder.type_id(TypeKey::Float);
        let uint = builder.type_id(TypeKey::Int { signed: false });
        let one = builder.constant(float, ConstValue::Word(1.0f32.to_bits()));
        assert_eq!(
            builder.constant(float, ConstValue::Word(1.0f32.to_bits())),
            one
        );
        // Same bits, different type.
        assert_ne!(
            builder.constant(uint, ConstValue::Word(1.0f32.to_bits())),
            one
        );
        let zero = builder.constant(float, ConstValue::Word(0.0f32.to_bits()));
        let negative_zero = builder.constant(float, ConstValue::Word((-0.0f32).to_bits()));
        assert_ne!(zero, negative_zero);
    }

    #[test]
    fn test_array_length_precedes_array() {
        let mut builder = ModuleBuilder::new(true);
        let float = builder.type_id(TypeKey::Float);
        let array = builder.type_id(TypeKey::Array(float, 3));
        let module = builder.finish();
        let position = |id: Id| module.globals.iter().position(|i| i.result == Some(id));
        let length = module.globals[position(array).unwrap()].operands[1]
            .as_id()
            .unwrap();
        assert!(position(length).unwrap() < position(array).unwrap());
    }

    #[test]
    fn test_debug_names_optional() {
        let mut builder = ModuleBuilder::new(false);
        let float = builder.type_id(TypeKey::Float);
        builder.name(float, "unused");
        assert!(builder.finish().debug_names.is_empty());
    }
}
