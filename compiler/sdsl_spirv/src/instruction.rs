//! Instructions and their word encoding.

use std::fmt;

use smallvec::SmallVec;

use crate::op::Op;

/// A SPIR-V result id. Ids start at 1; `Id::NONE` marks a value that was
/// never produced because lowering reported an error.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Default)]
pub struct Id(u32);

impl Id {
    pub const NONE: Self = Self(0);

    #[inline]
    pub(crate) const fn new(raw: u32) -> Self {
        Id(raw)
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum Operand {
    Id(Id),
    Literal(u32),
    Str(String),
}

impl Operand {
    /// Words this operand occupies: strings are NUL-terminated and padded to
    /// a word boundary.
    fn word_count(&self) -> usize {
        match self {
            Operand::Id(_) | Operand::Literal(_) => 1,
            Operand::Str(text) => text.len() / 4 + 1,
        }
    }

    fn encode(&self, out: &mut Vec<u32>) {
        match self {
            Operand::Id(id) => out.push(id.raw()),
            Operand::Literal(word) => out.push(*word),
            Operand::Str(text) => encode_string(text, out),
        }
    }

    #[inline]
    pub fn as_id(&self) -> Option<Id> {
        match self {
            Operand::Id(id) => Some(*id),
            _ => None,
        }
    }
}

pub(crate) fn encode_string(text: &str, out: &mut Vec<u32>) {
    let bytes = text.as_bytes();
    for chunk in bytes.chunks(4) {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        out.push(u32::from_le_bytes(word));
    }
    if bytes.len() % 4 == 0 {
        out.push(0);
    }
}

pub type Operands = SmallVec<[Operand; 4]>;

/// One instruction: opcode, optional result type and id, then operands.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Instruction {
    pub op: Op,
    pub ty: Option<Id>,
    pub result: Option<Id>,
    pub operands: Operands,
}

impl Instruction {
    pub fn new(op: Op, ty: Option<Id>, result: Option<Id>, operands: Operands) -> Self {
        Instruction {
            op,
            ty,
            result,
            operands,
        }
    }

    /// An instruction with neither result type nor result id.
    pub fn plain(op: Op, operands: Operands) -> Self {
        Self::new(op, None, None, operands)
    }

    pub fn word_count(&self) -> usize {
        1 + usize::from(self.ty.is_some())
            + usize::from(self.result.is_some())
            + self.operands.iter().map(Operand::word_count).sum::<usize>()
    }

    /// Append the encoded instruction; the first word is
    /// `(word_count << 16) | opcode`.
    pub fn encode(&self, out: &mut Vec<u32>) {
        let count = self.word_count() as u32;
        out.push((count << 16) | u32::from(self.op.code()));
        if let Some(ty) = self.ty {
            out.push(ty.raw());
        }
        if let Some(result) = self.result {
            out.push(result.raw());
        }
        for operand in &self.operands {
            operand.encode(out);
        }
    }

    /// Rewrite every id operand through `map`.
    pub fn map_ids(&mut self, mut map: impl FnMut(Id) -> Id) {
        for operand in &mut self.operands {
            if let Operand::Id(id) = operand {
                *id = map(*id);
            }
        }
    }
}

/// Operand list shorthand: `operands![id a, lit 3, str "main"]`.
macro_rules! operands {
    () => { $crate::instruction::Operands::new() };
    ($($kind:ident $value:expr),+ $(,)?) => {{
        let mut list = $crate::instruction::Operands::new();
        $(list.push($crate::instruction::operands!(@one $kind $value));)+
        list
    }};
    (@one id $value:expr) => { $crate::instruction::Operand::Id($value) };
    (@one lit $value:expr) => { $crate::instruction::Operand::Literal($value) };
    (@one str $value:expr) => { $crate::instruction::Operand::Str(String::from($value)) };
}

pub(crate) use operands;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_string_padding() {
        let mut out = Vec::new();
        encode_string("main", &mut out);
        assert_eq!(out, vec![u32::from_le_bytes(*b"main"), 0]);

        out.clear();
        encode_string("GLSL.std.450", &mut out);
        assert_eq!(out.len(), 4);

        out.clear();
        encode_string("abc", &mut out);
        assert_eq!(out, vec![u32::from_le_bytes([b'a', b'b', b'c', 0])]);
    }

    #[test]
    fn test_encode_header_word() {
        let inst = Instruction::new(
            Op::FAdd,
            Some(Id::new(1)),
            Some(Id::new(4)),
            operands![id Id::new(2), id Id::new(3)],
        );
        let mut out = Vec::new();
        inst.encode(&mut out);
        assert_eq!(out, vec![(5 << 16) | 129, 1, 4, 2, 3]);
        assert_eq!(inst.word_count(), out.len());
    }

    #[test]
    fn test_string_word_count_matches_encoding() {
        let inst = Instruction::plain(Op::Name, operands![id Id::new(7), str "PSMain"]);
        let mut out = Vec::new();
        inst.encode(&mut out);
        assert_eq!(inst.word_count(), out.len());
        assert_eq!(out[0] >> 16, out.len() as u32);
    }
}
