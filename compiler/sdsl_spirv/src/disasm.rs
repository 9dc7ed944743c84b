//! Text dump of a SPIR-V word stream, one instruction per line.
//!
//! Only opcodes the emitter produces are known; anything else is an error
//! rather than a guess.

use std::fmt::Write as _;

use crate::op::{self, Op};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DisasmError {
    #[error("module is shorter than its five-word header")]
    TruncatedHeader,
    #[error("bad magic number {0:#010x}")]
    BadMagic(u32),
    #[error("word {offset}: unknown opcode {code}")]
    UnknownOpcode { offset: usize, code: u16 },
    #[error("word {offset}: instruction runs past the end of the module")]
    Truncated { offset: usize },
    #[error("word {offset}: zero word count")]
    ZeroLength { offset: usize },
}

/// Disassemble `words`.
///
/// ```text
/// ; SPIR-V 1.0, bound 42
///          Capability 1
///     %1 = ExtInstImport "GLSL.std.450"
///     %7 = TypeFloat 32
/// ```
pub fn disassemble(words: &[u32]) -> Result<String, DisasmError> {
    if words.len() < 5 {
        return Err(DisasmError::TruncatedHeader);
    }
    if words[0] != op::MAGIC {
        return Err(DisasmError::BadMagic(words[0]));
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "; SPIR-V {}.{}, bound {}",
        (words[1] >> 16) & 0xff,
        (words[1] >> 8) & 0xff,
        words[3]
    );

    let mut offset = 5;
    while offset < words.len() {
        let header = words[offset];
        let count = (header >> 16) as usize;
        let code = (header & 0xffff) as u16;
        if count == 0 {
            return Err(DisasmError::ZeroLength { offset });
        }
        let Some(operands) = words.get(offset + 1..offset + count) else {
            return Err(DisasmError::Truncated { offset });
        };
        let op = Op::from_code(code).ok_or(DisasmError::UnknownOpcode { offset, code })?;
        write_instruction(&mut out, op, operands);
        offset += count;
    }
    Ok(out)
}

fn write_instruction(out: &mut String, op: Op, operands: &[u32]) {
    let mut layout = op.layout().chars();
    let mut words = operands.iter().copied().peekable();
    let mut result = None;
    let mut args = Vec::new();
    let mut last = None;
    let mut repeat = None;

    while words.peek().is_some() {
        let kind = match layout.next() {
            Some('*') => {
                repeat = last;
                repeat.unwrap_or('l')
            }
            Some(kind) => {
                last = Some(kind);
                kind
            }
            None => repeat.unwrap_or('l'),
        };
        match kind {
            'R' => result = words.next(),
            'T' | 'i' => {
                if let Some(word) = words.next() {
                    args.push(format!("%{word}"));
                }
            }
            's' => args.push(format!("{:?}", read_string(&mut words))),
            _ => {
                if let Some(word) = words.next() {
                    args.push(word.to_string());
                }
            }
        }
    }

    match result {
        Some(id) => {
            let _ = write!(out, "{:>8} = {}", format!("%{id}"), op.name());
        }
        None => {
            let _ = write!(out, "{:>11}{}", "", op.name());
        }
    }
    for arg in args {
        let _ = write!(out, " {arg}");
    }
    out.push('\n');
}

/// A NUL-terminated string packed four bytes per word, little-endian.
fn read_string(words: &mut impl Iterator<Item = u32>) -> String {
    let mut bytes = Vec::new();
    for word in words {
        let chunk = word.to_le_bytes();
        if let Some(end) = chunk.iter().position(|&b| b == 0) {
            bytes.extend_from_slice(&chunk[..end]);
            break;
        }
        bytes.extend_from_slice(&chunk);
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{operands, Id, Instruction};
    use pretty_assertions::assert_eq;

    fn module(instructions: &[Instruction]) -> Vec<u32> {
        let mut words = vec![op::MAGIC, op::VERSION, 0, 10, 0];
        for inst in instructions {
            inst.encode(&mut words);
        }
        words
    }

    #[test]
    fn test_layout_driven_operands() {
        let words = module(&[
            Instruction::plain(Op::Capability, operands![lit 1]),
            Instruction::new(Op::ExtInstImport, None, Some(Id::new(1)), operands![str "GLSL.std.450"]),
            Instruction::new(Op::TypeFloat, None, Some(Id::new(2)), operands![lit 32]),
            Instruction::plain(Op::Name, operands![id Id::new(2), str "f"]),
        ]);
        let text = disassemble(&words).unwrap_or_default();
        let lines: Vec<&str> = text.lines().map(str::trim).collect();
        assert_eq!(
            lines,
            vec![
                "; SPIR-V 1.0, bound 10",
                "Capability 1",
                "%1 = ExtInstImport \"GLSL.std.450\"",
                "%2 = TypeFloat 32",
                "Name %2 \"f\"",
            ]
        );
    }

    #[test]
    fn test_result_type_and_repeated_ids() {
        let words = module(&[Instruction::new(
            Op::CompositeConstruct,
            Some(Id::new(3)),
            Some(Id::new(9)),
            operands![id Id::new(4), id Id::new(5), id Id::new(6)],
        )]);
        let text = disassemble(&words).unwrap_or_default();
        assert_eq!(text.lines().nth(1).map(str::trim), Some("%9 = CompositeConstruct %3 %4 %5 %6"));
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(disassemble(&[1, 2]), Err(DisasmError::TruncatedHeader));
        assert_eq!(disassemble(&[0, 0, 0, 0, 0]), Err(DisasmError::BadMagic(0)));
        let unknown = vec![op::MAGIC, op::VERSION, 0, 1, 0, (1 << 16) | 9999];
        assert_eq!(
            disassemble(&unknown),
            Err(DisasmError::UnknownOpcode { offset: 5, code: 9999 })
        );
        let short = vec![op::MAGIC, op::VERSION, 0, 1, 0, (4 << 16) | 17];
        assert_eq!(disassemble(&short), Err(DisasmError::Truncated { offset: 5 }));
    }
}
