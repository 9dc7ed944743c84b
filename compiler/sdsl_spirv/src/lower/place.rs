//! Assignable locations: pointers with an access chain, swizzled
//! pointers, and plain values for everything else.

use sdsl_diagnostic::ErrorCode;
use sdsl_ir::{ExprId, ExprKind, Span};
use sdsl_resolve::{Binding, MemberAccess};
use sdsl_types::{ScalarType, Type};
use smallvec::SmallVec;

use super::function::FunctionLowerer;
use super::FieldSlot;
use crate::instruction::{operands, Id, Operand};
use crate::op::{Op, StorageClass};

#[derive(Clone, Debug)]
pub(super) struct Pointer {
    pub root: Id,
    pub indices: SmallVec<[Id; 4]>,
    pub class: StorageClass,
    /// Type of the value the chain points at.
    pub ty: Type,
    /// Booleans behind this pointer are stored as `uint`.
    pub packed: bool,
}

impl Pointer {
    fn root(root: Id, class: StorageClass, ty: Type) -> Self {
        Pointer {
            root,
            indices: SmallVec::new(),
            class,
            ty,
            packed: false,
        }
    }

    fn index(mut self, index: Id, ty: Type) -> Self {
        self.indices.push(index);
        self.ty = ty;
        self
    }
}

#[derive(Clone, Debug)]
pub(super) enum Place {
    Pointer(Pointer),
    /// A multi-component swizzle of a vector behind a pointer.
    Swizzle(Pointer, Vec<u32>),
    Value(Id),
}

impl FunctionLowerer<'_, '_> {
    /// The location an lvalue-shaped expression denotes. Anything else is
    /// evaluated to a value.
    pub(super) fn place(&mut self, id: ExprId) -> Place {
        let mixin = self.mixin();
        let expr = self.arena().expr(id);
        let ty = mixin.info.ty(id).clone();
        match &expr.kind {
            ExprKind::Ident(_) | ExprKind::Stream(_) => match mixin.info.bindings.get(&id) {
                Some(Binding::Local(local)) => match self.locals.get(local) {
                    Some(&var) => Place::Pointer(Pointer::root(var, StorageClass::Function, ty)),
                    None => self.internal(id, "local used before its declaration"),
                },
                Some(Binding::Param(index)) => match self.param_vars.get(*index as usize) {
                    Some(&var) => Place::Pointer(Pointer::root(var, StorageClass::Function, ty)),
                    None => self.internal(id, "parameter has no variable"),
                },
                Some(Binding::Field(name)) => {
                    let program = self.em.program;
                    match program.field_index(*name) {
                        Some(field) => self.field_place(field, ty),
                        None => self.internal(id, "field missing from the composed program"),
                    }
                }
                None => self.internal(id, "identifier was not resolved"),
            },
            ExprKind::Member { object, .. } => match mixin.info.members.get(&id) {
                Some(MemberAccess::Swizzle(components)) => {
                    let base = self.place(*object);
                    let base_ty = mixin.info.ty(*object).clone();
                    self.swizzle_place(base, &base_ty, components, ty)
                }
                Some(MemberAccess::StructField(index)) => match self.place(*object) {
                    Place::Pointer(pointer) => {
                        let index = self.em.const_int(*index as i32);
                        Place::Pointer(pointer.index(index, ty))
                    }
                    other => {
                        let value = self.load(other);
                        let ty_id = self.em.lower_type(&ty);
                        Place::Value(self.emit(
                            Op::CompositeExtract,
                            ty_id,
                            operands![id value, lit *index],
                        ))
                    }
                },
                Some(MemberAccess::Method) | None => {
                    self.error(
                        ErrorCode::E5003,
                        expr.span,
                        "method reference used as a value",
                        "not a value",
                    );
                    Place::Value(Id::NONE)
                }
            },
            ExprKind::Index { object, index } => {
                let object_ty = mixin.info.ty(*object).clone();
                self.index_place(id, *object, *index, &object_ty, ty)
            }
            _ => Place::Value(self.eval(id)),
        }
    }

    fn internal(&mut self, id: ExprId, message: &str) -> Place {
        let span = self.arena().expr(id).span;
        self.error(ErrorCode::E9002, span, message, "here");
        Place::Value(Id::NONE)
    }

    fn field_place(&mut self, field: usize, ty: Type) -> Place {
        match self.em.slot(field) {
            FieldSlot::Uniform { buffer, member } => {
                let root = self.em.buffer_var(buffer);
                let member = self.em.const_int(member as i32);
                let packed = ty.scalar() == Some(ScalarType::Bool)
                    || matches!(&ty, Type::Array(element, _) if element.scalar() == Some(ScalarType::Bool));
                let mut pointer = Pointer::root(root, StorageClass::Uniform, ty.clone()).index(member, ty);
                pointer.packed = packed;
                Place::Pointer(pointer)
            }
            FieldSlot::Variable { var, class } => Place::Pointer(Pointer::root(var, class, ty)),
            FieldSlot::Constant => Place::Value(self.constant_field(field)),
        }
    }

    /// Lower a `static const` field's initializer in its owner's context.
    pub(super) fn constant_field(&mut self, field: usize) -> Id {
        let program = self.em.program;
        let composed = &program.fields[field];
        if self.constants.contains(&field) {
            let source = program.mixin(composed.owner).unit.id;
            let message = format!(
                "constant `{}` is defined in terms of itself",
                self.em.name(composed.field.name)
            );
            self.em
                .error(ErrorCode::E5003, source, composed.field.span, message, "recursive constant");
            return Id::NONE;
        }
        let Some(init) = composed.field.init else {
            return self.em.zero(&composed.field.ty);
        };
        self.constants.push(field);
        let saved = std::mem::replace(&mut self.mixin, composed.owner);
        let value = self.eval_as(init, &composed.field.ty);
        self.mixin = saved;
        self.constants.pop();
        value
    }

    fn swizzle_place(&mut self, base: Place, base_ty: &Type, components: &[u32], ty: Type) -> Place {
        match base {
            Place::Pointer(pointer) if matches!(base_ty, Type::Vector(..)) => {
                if let [component] = components {
                    let index = self.em.const_int(*component as i32);
                    Place::Pointer(pointer.index(index, ty))
                } else {
                    Place::Swizzle(pointer, components.to_vec())
                }
            }
            Place::Swizzle(pointer, inner) => {
                let mapped: Vec<u32> = components
                    .iter()
                    .map(|&c| inner.get(c as usize).copied().unwrap_or(c))
                    .collect();
                if let [component] = mapped[..] {
                    let index = self.em.const_int(component as i32);
                    Place::Pointer(pointer.index(index, ty))
                } else {
                    Place::Swizzle(pointer, mapped)
                }
            }
            other => {
                let value = self.load(other);
                Place::Value(self.swizzle_value(value, base_ty, components, &ty))
            }
        }
    }

    /// Select components of a scalar or vector value.
    pub(super) fn swizzle_value(&mut self, value: Id, base_ty: &Type, components: &[u32], ty: &Type) -> Id {
        let ty_id = self.em.lower_type(ty);
        match (base_ty, components) {
            (Type::Scalar(_), _) if components.len() == 1 => value,
            (Type::Scalar(_), _) => {
                let parts: SmallVec<[Operand; 4]> =
                    components.iter().map(|_| Operand::Id(value)).collect();
                self.emit(Op::CompositeConstruct, ty_id, parts)
            }
            (_, [component]) => self.emit(
                Op::CompositeExtract,
                ty_id,
                operands![id value, lit *component],
            ),
            _ => {
                let mut list = operands![id value, id value];
                list.extend(components.iter().map(|&c| Operand::Literal(c)));
                self.emit(Op::VectorShuffle, ty_id, list)
            }
        }
    }

    fn index_place(&mut self, id: ExprId, object: ExprId, index: ExprId, object_ty: &Type, ty: Type) -> Place {
        match object_ty {
            Type::Array(..) => {
                let base = self.place(object);
                let index = self.eval_as(index, &Type::INT);
                match base {
                    Place::Pointer(pointer) => Place::Pointer(pointer.index(index, ty)),
                    other => {
                        // Dynamic indexing needs memory: spill the array.
                        let value = self.load(other);
                        let temp = self.variable(object_ty, None);
                        self.store_pointer(temp, value);
                        let spilled = Pointer::root(temp, StorageClass::Function, object_ty.clone());
                        Place::Pointer(spilled.index(index, ty))
                    }
                }
            }
            Type::Vector(..) => {
                let base = self.place(object);
                let index = self.eval_as(index, &Type::INT);
                match base {
                    Place::Pointer(pointer) => Place::Pointer(pointer.index(index, ty)),
                    other => {
                        let value = self.load(other);
                        let ty_id = self.em.lower_type(&ty);
                        Place::Value(self.emit(
                            Op::VectorExtractDynamic,
                            ty_id,
                            operands![id value, id index],
                        ))
                    }
                }
            }
            _ => {
                let span = self.arena().expr(id).span;
                let message = format!(
                    "indexing `{}` is not supported",
                    object_ty.display(self.em.interner)
                );
                self.error(ErrorCode::E5003, span, message, "unsupported index");
                Place::Value(Id::NONE)
            }
        }
    }

    fn access_chain(&mut self, pointer: &Pointer) -> Id {
        if pointer.indices.is_empty() {
            return pointer.root;
        }
        let ty = self.em.pointer_type(pointer.class, &pointer.ty, pointer.packed);
        let mut list = operands![id pointer.root];
        list.extend(pointer.indices.iter().map(|i| Operand::Id(*i)));
        self.emit(Op::AccessChain, ty, list)
    }

    pub(super) fn load(&mut self, place: Place) -> Id {
        match place {
            Place::Pointer(pointer) => {
                let address = self.access_chain(&pointer);
                if pointer.packed {
                    let stored = self.em.uniform_type(&pointer.ty);
                    let raw = self.emit(Op::Load, stored, operands![id address]);
                    self.unpack_bool(raw, &pointer.ty)
                } else {
                    let ty = self.em.lower_type(&pointer.ty);
                    self.emit(Op::Load, ty, operands![id address])
                }
            }
            Place::Swizzle(pointer, components) => {
                let base_ty = pointer.ty.clone();
                let scalar = base_ty.scalar().unwrap_or(ScalarType::Float);
                let ty = Type::vector(scalar, components.len() as u8);
                let value = self.load(Place::Pointer(pointer));
                self.swizzle_value(value, &base_ty, &components, &ty)
            }
            Place::Value(value) => value,
        }
    }

    pub(super) fn store(&mut self, place: Place, value: Id, span: Span) {
        match place {
            Place::Pointer(pointer) => {
                let address = self.access_chain(&pointer);
                let value = if pointer.packed {
                    self.pack_bool(value, &pointer.ty)
                } else {
                    value
                };
                self.store_pointer(address, value);
            }
            Place::Swizzle(pointer, components) => {
                let Type::Vector(_, size) = pointer.ty else {
                    self.error(ErrorCode::E5003, span, "swizzle store into a non-vector", "here");
                    return;
                };
                let ty_id = self.em.lower_type(&pointer.ty);
                let current = self.load(Place::Pointer(pointer.clone()));
                // Components come from `value` where written, else from the
                // current contents.
                let mut list = operands![id current, id value];
                for slot in 0..u32::from(size) {
                    let source = components
                        .iter()
                        .position(|&c| c == slot)
                        .map_or(slot, |j| u32::from(size) + j as u32);
                    list.push(Operand::Literal(source));
                }
                let merged = self.emit(Op::VectorShuffle, ty_id, list);
                let address = self.access_chain(&pointer);
                self.store_pointer(address, merged);
            }
            Place::Value(_) => {
                self.error(ErrorCode::E5003, span, "expression is not assignable", "not an lvalue");
            }
        }
    }

    /// `uint` storage to `bool` values.
    fn unpack_bool(&mut self, raw: Id, ty: &Type) -> Id {
        match ty {
            Type::Array(element, len) => {
                let stored = self.em.uniform_type(element);
                let mut parts = SmallVec::<[Operand; 4]>::new();
                for i in 0..*len {
                    let item = self.emit(Op::CompositeExtract, stored, operands![id raw, lit i]);
                    parts.push(Operand::Id(self.unpack_bool(item, element)));
                }
                let ty_id = self.em.lower_type(ty);
                self.emit(Op::CompositeConstruct, ty_id, parts)
            }
            _ => {
                let stored = ty.with_scalar(ScalarType::UInt);
                let zero = self.em.zero(&stored);
                let ty_id = self.em.lower_type(ty);
                self.emit(Op::INotEqual, ty_id, operands![id raw, id zero])
            }
        }
    }

    /// `bool` values to `uint` storage.
    fn pack_bool(&mut self, value: Id, ty: &Type) -> Id {
        match ty {
            Type::Array(element, len) => {
                let element_ty = self.em.lower_type(element);
                let mut parts = SmallVec::<[Operand; 4]>::new();
                for i in 0..*len {
                    let item = self.emit(Op::CompositeExtract, element_ty, operands![id value, lit i]);
                    parts.push(Operand::Id(self.pack_bool(item, element)));
                }
                let stored = self.em.uniform_type(ty);
                self.emit(Op::CompositeConstruct, stored, parts)
            }
            _ => {
                let stored = ty.with_scalar(ScalarType::UInt);
                let one = self.em.one(&stored);
                let zero = self.em.zero(&stored);
                let ty_id = self.em.lower_type(&stored);
                self.emit(Op::Select, ty_id, operands![id value, id one, id zero])
            }
        }
    }
}
