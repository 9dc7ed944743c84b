//! Move every `Function` variable to the top of its function's first block,
//! where SPIR-V requires them.

use crate::instruction::Operand;
use crate::module::Function;
use crate::op::{Op, StorageClass};

/// Hoist the variables of every function. Returns how many moved.
pub(super) fn hoist_variables(functions: &mut [Function]) -> usize {
    let mut moved = 0;
    for function in functions {
        let mut variables = Vec::new();
        for block in &mut function.blocks {
            let (vars, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut block.instructions)
                .into_iter()
                .partition(|inst| {
                    inst.op == Op::Variable
                        && inst.operands.first()
                            == Some(&Operand::Literal(StorageClass::Function as u32))
                });
            block.instructions = rest;
            variables.extend(vars);
        }
        let Some(entry) = function.blocks.first_mut() else {
            continue;
        };
        moved += variables.len();
        entry.instructions.splice(0..0, variables);
    }
    moved
}
