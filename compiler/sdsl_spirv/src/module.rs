//! Module layout and serialization.

use crate::instruction::{operands, Id, Instruction};
use crate::op::{self, Op};

/// A basic block: a label followed by instructions, the last of which is a
/// terminator once the function is complete.
#[derive(Clone, Debug)]
pub struct Block {
    pub label: Id,
    pub instructions: Vec<Instruction>,
}

impl Block {
    pub fn new(label: Id) -> Self {
        Block {
            label,
            instructions: Vec::new(),
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.instructions.last().is_some_and(|i| i.op.is_terminator())
    }
}

#[derive(Clone, Debug)]
pub struct Function {
    /// The `OpFunction` instruction.
    pub def: Instruction,
    pub params: Vec<Instruction>,
    pub blocks: Vec<Block>,
}

/// A module in logical section order.
#[derive(Clone, Debug, Default)]
pub struct Module {
    /// One past the largest id.
    pub bound: u32,
    pub capabilities: Vec<Instruction>,
    pub ext_imports: Vec<Instruction>,
    pub memory_model: Vec<Instruction>,
    pub entry_points: Vec<Instruction>,
    pub execution_modes: Vec<Instruction>,
    pub debug_names: Vec<Instruction>,
    pub annotations: Vec<Instruction>,
    /// Types, constants and global variables, each after its operands.
    pub globals: Vec<Instruction>,
    pub functions: Vec<Function>,
}

impl Module {
    /// Serialize to a word stream: the five-word header, then every
    /// section in order.
    pub fn assemble(&self) -> Vec<u32> {
        let mut words = vec![op::MAGIC, op::VERSION, 0, self.bound, 0];
        let sections = [
            &self.capabilities,
            &self.ext_imports,
            &self.memory_model,
            &self.entry_points,
            &self.execution_modes,
            &self.debug_names,
            &self.annotations,
            &self.globals,
        ];
        for section in sections {
            for inst in section {
                inst.encode(&mut words);
            }
        }
        for function in &self.functions {
            function.def.encode(&mut words);
            for param in &function.params {
                param.encode(&mut words);
            }
            for block in &function.blocks {
                Instruction::new(Op::Label, None, Some(block.label), operands![])
                    .encode(&mut words);
                for inst in &block.instructions {
                    inst.encode(&mut words);
                }
            }
            Instruction::plain(Op::FunctionEnd, operands![]).encode(&mut words);
        }
        words
    }
}

/// Little-endian byte image of a word stream, as written to `.spv` files.
pub fn words_to_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

/// Inverse of [`words_to_bytes`]; `None` unless the length is a multiple of
/// four.
pub fn bytes_to_words(bytes: &[u8]) -> Option<Vec<u32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_module_header() {
        let module = Module {
            bound: 1,
            ..Module::default()
        };
        assert_eq!(module.assemble(), vec![op::MAGIC, op::VERSION, 0, 1, 0]);
    }

    #[test]
    fn test_function_framing() {
        let void = Id::new(1);
        let fn_ty = Id::new(2);
        let func = Id::new(3);
        let label = Id::new(4);
        let mut block = Block::new(label);
        block
            .instructions
            .push(Instruction::plain(Op::Return, operands![]));
        assert!(block.is_terminated());
        let module = Module {
            bound: 5,
            functions: vec![Function {
                def: Instruction::new(
                    Op::Function,
                    Some(void),
                    Some(func),
                    operands![lit 0, id fn_ty],
                ),
                params: Vec::new(),
                blocks: vec![block],
            }],
            ..Module::default()
        };
        let words = module.assemble();
        assert_eq!(
            &words[5..],
            &[
                (5 << 16) | 54,
                1,
                3,
                0,
                2,
                (2 << 16) | 248,
                4,
                (1 << 16) | 253,
                (1 << 16) | 56
            ]
        );
    }

    #[test]
    fn test_byte_conversion() {
        let words = vec![op::MAGIC, 7];
        let bytes = words_to_bytes(&words);
        assert_eq!(bytes[..4], [0x03, 0x02, 0x23, 0x07]);
        assert_eq!(bytes_to_words(&bytes), Some(words));
        assert_eq!(bytes_to_words(&[1, 2, 3]), None);
    }
}
