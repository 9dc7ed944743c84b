//! Removal of types and constants nothing refers to.
//!
//! Folding and conversions leave behind the operands they replaced, and a
//! dead constant can be the only user of its type. Declarations are freed
//! from their use counts, so chains of them go in one pass.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::builder::ModuleBuilder;
use crate::instruction::{Id, Instruction, Operand};
use crate::op::Op;

fn is_declaration(op: Op) -> bool {
    matches!(
        op,
        Op::TypeVoid
            | Op::TypeBool
            | Op::TypeInt
            | Op::TypeFloat
            | Op::TypeVector
            | Op::TypeMatrix
            | Op::TypeImage
            | Op::TypeSampler
            | Op::TypeSampledImage
            | Op::TypeArray
            | Op::TypeStruct
            | Op::TypePointer
            | Op::TypeFunction
            | Op::ConstantTrue
            | Op::ConstantFalse
            | Op::Constant
            | Op::ConstantComposite
            | Op::ConstantNull
    )
}

fn referenced(inst: &Instruction) -> impl Iterator<Item = Id> + '_ {
    inst.ty
        .into_iter()
        .chain(inst.operands.iter().filter_map(Operand::as_id))
}

/// Drop every unreferenced type and constant. Returns how many went.
pub(super) fn sweep_declarations(builder: &mut ModuleBuilder) -> usize {
    let mut uses: FxHashMap<Id, usize> = FxHashMap::default();
    for inst in builder.uses().chain(builder.globals()) {
        for id in referenced(inst) {
            *uses.entry(id).or_default() += 1;
        }
    }

    let declarations: FxHashMap<Id, &Instruction> = builder
        .globals()
        .iter()
        .filter(|inst| is_declaration(inst.op))
        .filter_map(|inst| Some((inst.result?, inst)))
        .collect();
    let mut pending: Vec<Id> = declarations
        .keys()
        .copied()
        .filter(|id| !uses.contains_key(id))
        .collect();
    let mut dead = FxHashSet::default();
    while let Some(id) = pending.pop() {
        if !dead.insert(id) {
            continue;
        }
        let Some(inst) = declarations.get(&id) else {
            continue;
        };
        for operand in referenced(inst) {
            if let Some(count) = uses.get_mut(&operand) {
                *count -= 1;
                if *count == 0 && declarations.contains_key(&operand) {
                    pending.push(operand);
                }
            }
        }
    }

    builder.remove_declarations(&dead);
    dead.len()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::builder::{ConstValue, TypeKey};
    use crate::instruction::operands;
    use crate::module::{Block, Function};

    #[test]
    fn test_orphaned_constant_takes_its_type_along() {
        let mut builder = ModuleBuilder::new(true);
        let void = builder.type_id(TypeKey::Void);
        let fn_ty = builder.type_id(TypeKey::Function(void, Default::default()));
        let float = builder.type_id(TypeKey::Float);
        let int = builder.type_id(TypeKey::Int { signed: true });
        let one = builder.constant(int, ConstValue::Word(1));
        builder.name(one, "one");
        let half = builder.constant(float, ConstValue::Word(0.5f32.to_bits()));
        let pointer = builder.type_id(TypeKey::Pointer(crate::op::StorageClass::Private, float));
        let var = builder.global_variable(float, crate::op::StorageClass::Private);

        let id = builder.fresh();
        let mut block = Block::new(builder.fresh());
        block.instructions = vec![
            Instruction::plain(Op::Store, operands![id var, id half]),
            Instruction::plain(Op::Return, operands![]),
        ];
        builder.functions.push(Function {
            def: Instruction::new(Op::Function, Some(void), Some(id), operands![lit 0, id fn_ty]),
            params: Vec::new(),
            blocks: vec![block],
        });

        assert_eq!(sweep_declarations(&mut builder), 2);
        let declared: Vec<Id> = builder.globals().iter().filter_map(|i| i.result).collect();
        assert_eq!(declared, vec![void, fn_ty, float, half, pointer, var]);
        assert_eq!(builder.const_value(one), None);
        assert_ne!(builder.constant(int, ConstValue::Word(1)), one);
        assert!(builder.finish().debug_names.is_empty());
    }
}
