//! Constant folding over emitted instructions.
//!
//! Instructions whose id operands are all constants are evaluated and
//! replaced by a (deduplicated) constant; later uses of the result are
//! rewritten to the constant. Vectors fold component by component.
//!
//! # Scope
//!
//! - Integer and float arithmetic, negation
//! - Comparisons and boolean logic, `Select`
//! - Bitwise operations and shifts
//! - Numeric conversions and integer bitcasts
//! - `CompositeConstruct` / `CompositeExtract` of constants
//!
//! Operations that are undefined or trap at run time (division by zero,
//! `INT_MIN / -1`, over-wide shifts) are left in place.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::builder::{ConstValue, ModuleBuilder, TypeKey};
use crate::instruction::{Id, Operand};
use crate::op::Op;

/// A scalar constant with its type.
#[derive(Copy, Clone, PartialEq, Debug)]
enum Scalar {
    Bool(bool),
    Int(i32),
    UInt(u32),
    Float(f32),
}

impl Scalar {
    fn to_value(self) -> ConstValue {
        match self {
            Scalar::Bool(b) => ConstValue::Bool(b),
            Scalar::Int(i) => ConstValue::Word(i as u32),
            Scalar::UInt(u) => ConstValue::Word(u),
            Scalar::Float(f) => ConstValue::Word(f.to_bits()),
        }
    }

    fn bits(self) -> u32 {
        match self {
            Scalar::Bool(b) => u32::from(b),
            Scalar::Int(i) => i as u32,
            Scalar::UInt(u) => u,
            Scalar::Float(f) => f.to_bits(),
        }
    }
}

/// Fold every function of `builder`. Returns the number of instructions
/// replaced.
pub(super) fn fold_constants(builder: &mut ModuleBuilder) -> usize {
    let mut functions = std::mem::take(&mut builder.functions);
    let mut folded = 0;
    for function in &mut functions {
        let mut replaced: FxHashMap<Id, Id> = FxHashMap::default();
        for block in &mut function.blocks {
            block.instructions.retain_mut(|inst| {
                inst.map_ids(|id| replaced.get(&id).copied().unwrap_or(id));
                let (Some(ty), Some(result)) = (inst.ty, inst.result) else {
                    return true;
                };
                match fold(builder, inst.op, ty, &inst.operands) {
                    Some(constant) => {
                        replaced.insert(result, constant);
                        folded += 1;
                        false
                    }
                    None => true,
                }
            });
        }
        // Uses can precede their definition in block order across loop
        // back edges; rewrite once more now that every fold is known.
        if !replaced.is_empty() {
            for block in &mut function.blocks {
                for inst in &mut block.instructions {
                    inst.map_ids(|id| replaced.get(&id).copied().unwrap_or(id));
                }
            }
        }
    }
    builder.functions = functions;
    folded
}

fn scalar(builder: &ModuleBuilder, id: Id) -> Option<Scalar> {
    let (ty, value) = builder.const_value(id)?;
    match (builder.type_key(*ty)?, value) {
        (TypeKey::Bool, ConstValue::Bool(b)) => Some(Scalar::Bool(*b)),
        (TypeKey::Int { signed: true }, ConstValue::Word(w)) => Some(Scalar::Int(*w as i32)),
        (TypeKey::Int { signed: false }, ConstValue::Word(w)) => Some(Scalar::UInt(*w)),
        (TypeKey::Float, ConstValue::Word(w)) => Some(Scalar::Float(f32::from_bits(*w))),
        _ => None,
    }
}

/// Components of a scalar or vector constant.
fn components(builder: &ModuleBuilder, id: Id) -> Option<SmallVec<[Scalar; 4]>> {
    match builder.const_value(id)? {
        (_, ConstValue::Composite(parts)) => parts.iter().map(|p| scalar(builder, *p)).collect(),
        _ => scalar(builder, id).map(|s| SmallVec::from_elem(s, 1)),
    }
}

fn fold(builder: &mut ModuleBuilder, op: Op, ty: Id, operands: &[Operand]) -> Option<Id> {
    match op {
        Op::CompositeConstruct => {
            let parts: Option<SmallVec<[Id; 4]>> = operands
                .iter()
                .map(|o| o.as_id().filter(|id| builder.const_value(*id).is_some()))
                .collect();
            let parts = parts?;
            // Vector constants take one constituent per component.
            if let Some(TypeKey::Vector(_, n)) = builder.type_key(ty) {
                if parts.len() != *n as usize {
                    return None;
                }
            }
            Some(builder.constant(ty, ConstValue::Composite(parts)))
        }
        Op::CompositeExtract => {
            let (first, indices) = operands.split_first()?;
            let mut current = first.as_id()?;
            for index in indices {
                let Operand::Literal(index) = index else {
                    return None;
                };
                let (_, ConstValue::Composite(parts)) = builder.const_value(current)? else {
                    return None;
                };
                current = *parts.get(*index as usize)?;
            }
            Some(current)
        }
        _ if is_foldable(op) => fold_elementwise(builder, op, ty, operands),
        _ => None,
    }
}

fn is_foldable(op: Op) -> bool {
    matches!(
        op,
        Op::IAdd
            | Op::ISub
            | Op::IMul
            | Op::SDiv
            | Op::UDiv
            | Op::SRem
            | Op::UMod
            | Op::FAdd
            | Op::FSub
            | Op::FMul
            | Op::FDiv
            | Op::SNegate
            | Op::FNegate
            | Op::IEqual
            | Op::INotEqual
            | Op::SLessThan
            | Op::SLessThanEqual
            | Op::SGreaterThan
            | Op::SGreaterThanEqual
            | Op::ULessThan
            | Op::ULessThanEqual
            | Op::UGreaterThan
            | Op::UGreaterThanEqual
            | Op::FOrdEqual
            | Op::FOrdNotEqual
            | Op::FOrdLessThan
            | Op::FOrdLessThanEqual
            | Op::FOrdGreaterThan
            | Op::FOrdGreaterThanEqual
            | Op::LogicalAnd
            | Op::LogicalOr
            | Op::LogicalNot
            | Op::LogicalEqual
            | Op::LogicalNotEqual
            | Op::Select
            | Op::BitwiseAnd
            | Op::BitwiseOr
            | Op::BitwiseXor
            | Op::Not
            | Op::ShiftLeftLogical
            | Op::ShiftRightLogical
            | Op::ShiftRightArithmetic
            | Op::ConvertSToF
            | Op::ConvertUToF
            | Op::ConvertFToS
            | Op::ConvertFToU
            | Op::Bitcast
    )
}

fn fold_elementwise(builder: &mut ModuleBuilder, op: Op, ty: Id, operands: &[Operand]) -> Option<Id> {
    let (component_ty, width) = match builder.type_key(ty)? {
        TypeKey::Vector(component, n) => (*component, *n as usize),
        TypeKey::Bool | TypeKey::Int { .. } | TypeKey::Float => (ty, 1),
        _ => return None,
    };
    let target = builder.type_key(component_ty)?.clone();

    let mut args: SmallVec<[SmallVec<[Scalar; 4]>; 3]> = SmallVec::new();
    for operand in operands {
        let parts = components(builder, operand.as_id()?)?;
        // A scalar `Select` condition applies to every component.
        if parts.len() != width && parts.len() != 1 {
            return None;
        }
        args.push(parts);
    }

    let mut results: SmallVec<[Id; 4]> = SmallVec::new();
    for i in 0..width {
        let lane: SmallVec<[Scalar; 3]> = args
            .iter()
            .map(|a| if a.len() == 1 { a[0] } else { a[i] })
            .collect();
        let value = eval(op, &lane, &target)?;
        results.push(builder.constant(component_ty, value.to_value()));
    }
    if width == 1 {
        results.first().copied()
    } else {
        Some(builder.constant(ty, ConstValue::Composite(results)))
    }
}

/// Evaluate one lane. `target` is the result component type.
#[expect(
    clippy::too_many_lines,
    reason = "exhaustive (Op, Scalar, Scalar) fold dispatch"
)]
fn eval(op: Op, args: &[Scalar], target: &TypeKey) -> Option<Scalar> {
    use Scalar::{Bool, Float, Int, UInt};
    let result = match (op, args) {
        (Op::IAdd, [Int(a), Int(b)]) => Int(a.wrapping_add(*b)),
        (Op::IAdd, [UInt(a), UInt(b)]) => UInt(a.wrapping_add(*b)),
        (Op::ISub, [Int(a), Int(b)]) => Int(a.wrapping_sub(*b)),
        (Op::ISub, [UInt(a), UInt(b)]) => UInt(a.wrapping_sub(*b)),
        (Op::IMul, [Int(a), Int(b)]) => Int(a.wrapping_mul(*b)),
        (Op::IMul, [UInt(a), UInt(b)]) => UInt(a.wrapping_mul(*b)),
        (Op::SDiv, [Int(a), Int(b)]) => Int(a.checked_div(*b)?),
        (Op::SRem, [Int(a), Int(b)]) => Int(a.checked_rem(*b)?),
        (Op::UDiv, [UInt(a), UInt(b)]) => UInt(a.checked_div(*b)?),
        (Op::UMod, [UInt(a), UInt(b)]) => UInt(a.checked_rem(*b)?),
        (Op::SNegate, [Int(a)]) => Int(a.wrapping_neg()),

        (Op::FAdd, [Float(a), Float(b)]) => Float(a + b),
        (Op::FSub, [Float(a), Float(b)]) => Float(a - b),
        (Op::FMul, [Float(a), Float(b)]) => Float(a * b),
        // Division by zero: defer to run time.
        (Op::FDiv, [Float(_), Float(b)]) if *b == 0.0 => return None,
        (Op::FDiv, [Float(a), Float(b)]) => Float(a / b),
        (Op::FNegate, [Float(a)]) => Float(-a),

        (Op::IEqual, [a, b]) => Bool(a.bits() == b.bits()),
        (Op::INotEqual, [a, b]) => Bool(a.bits() != b.bits()),
        (Op::SLessThan, [Int(a), Int(b)]) => Bool(a < b),
        (Op::SLessThanEqual, [Int(a), Int(b)]) => Bool(a <= b),
        (Op::SGreaterThan, [Int(a), Int(b)]) => Bool(a > b),
        (Op::SGreaterThanEqual, [Int(a), Int(b)]) => Bool(a >= b),
        (Op::ULessThan, [UInt(a), UInt(b)]) => Bool(a < b),
        (Op::ULessThanEqual, [UInt(a), UInt(b)]) => Bool(a <= b),
        (Op::UGreaterThan, [UInt(a), UInt(b)]) => Bool(a > b),
        (Op::UGreaterThanEqual, [UInt(a), UInt(b)]) => Bool(a >= b),
        (Op::FOrdEqual, [Float(a), Float(b)]) => Bool(a == b),
        (Op::FOrdNotEqual, [Float(a), Float(b)]) => Bool(!a.is_nan() && !b.is_nan() && a != b),
        (Op::FOrdLessThan, [Float(a), Float(b)]) => Bool(a < b),
        (Op::FOrdLessThanEqual, [Float(a), Float(b)]) => Bool(a <= b),
        (Op::FOrdGreaterThan, [Float(a), Float(b)]) => Bool(a > b),
        (Op::FOrdGreaterThanEqual, [Float(a), Float(b)]) => Bool(a >= b),

        (Op::LogicalAnd, [Bool(a), Bool(b)]) => Bool(*a && *b),
        (Op::LogicalOr, [Bool(a), Bool(b)]) => Bool(*a || *b),
        (Op::LogicalEqual, [Bool(a), Bool(b)]) => Bool(a == b),
        (Op::LogicalNotEqual, [Bool(a), Bool(b)]) => Bool(a != b),
        (Op::LogicalNot, [Bool(a)]) => Bool(!a),
        (Op::Select, [Bool(c), a, b]) => {
            if *c {
                *a
            } else {
                *b
            }
        }

        (Op::BitwiseAnd, [Int(a), Int(b)]) => Int(a & b),
        (Op::BitwiseAnd, [UInt(a), UInt(b)]) => UInt(a & b),
        (Op::BitwiseOr, [Int(a), Int(b)]) => Int(a | b),
        (Op::BitwiseOr, [UInt(a), UInt(b)]) => UInt(a | b),
        (Op::BitwiseXor, [Int(a), Int(b)]) => Int(a ^ b),
        (Op::BitwiseXor, [UInt(a), UInt(b)]) => UInt(a ^ b),
        (Op::Not, [Int(a)]) => Int(!a),
        (Op::Not, [UInt(a)]) => UInt(!a),
        (Op::ShiftLeftLogical, [a, shift]) if shift.bits() < 32 => {
            from_bits(a.bits() << shift.bits(), target)?
        }
        (Op::ShiftRightLogical, [a, shift]) if shift.bits() < 32 => {
            from_bits(a.bits() >> shift.bits(), target)?
        }
        (Op::ShiftRightArithmetic, [a, shift]) if shift.bits() < 32 => {
            from_bits(((a.bits() as i32) >> shift.bits()) as u32, target)?
        }

        (Op::ConvertSToF, [Int(a)]) => Float(*a as f32),
        (Op::ConvertUToF, [UInt(a)]) => Float(*a as f32),
        (Op::ConvertFToS, [Float(a)]) if a.is_finite() => Int(*a as i32),
        (Op::ConvertFToU, [Float(a)]) if a.is_finite() && *a >= 0.0 => UInt(*a as u32),
        (Op::Bitcast, [a]) => from_bits(a.bits(), target)?,
        _ => return None,
    };
    Some(result)
}

fn from_bits(bits: u32, target: &TypeKey) -> Option<Scalar> {
    match target {
        TypeKey::Int { signed: true } => Some(Scalar::Int(bits as i32)),
        TypeKey::Int { signed: false } => Some(Scalar::UInt(bits)),
        TypeKey::Float => Some(Scalar::Float(f32::from_bits(bits))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{operands, Instruction};
    use crate::module::{Block, Function};
    use pretty_assertions::assert_eq;

    fn function_with(builder: &mut ModuleBuilder, body: Vec<Instruction>) {
        let void = builder.type_id(TypeKey::Void);
        let fn_ty = builder.type_id(TypeKey::Function(void, SmallVec::new()));
        let id = builder.fresh();
        let label = builder.fresh();
        let mut block = Block::new(label);
        block.instructions = body;
        builder.functions.push(Function {
            def: Instruction::new(Op::Function, Some(void), Some(id), operands![lit 0, id fn_ty]),
            params: Vec::new(),
            blocks: vec![block],
        });
    }

    #[test]
    fn test_chained_arithmetic_folds() {
        let mut builder = ModuleBuilder::new(false);
        let int = builder.type_id(TypeKey::Int { signed: true });
        let two = builder.constant(int, ConstValue::Word(2));
        let three = builder.constant(int, ConstValue::Word(3));
        let sum = builder.fresh();
        let product = builder.fresh();
        let ret = Instruction::plain(Op::ReturnValue, operands![id product]);
        function_with(
            &mut builder,
            vec![
                Instruction::new(Op::IAdd, Some(int), Some(sum), operands![id two, id three]),
                Instruction::new(Op::IMul, Some(int), Some(product), operands![id sum, id sum]),
                ret,
            ],
        );

        assert_eq!(fold_constants(&mut builder), 2);
        let twenty_five = builder.constant(int, ConstValue::Word(25));
        let block = &builder.functions[0].blocks[0];
        assert_eq!(block.instructions.len(), 1);
        assert_eq!(
            block.instructions[0].operands.as_slice(),
            &[Operand::Id(twenty_five)]
        );
    }

    #[test]
    fn test_vector_comparison_folds_per_lane() {
        let mut builder = ModuleBuilder::new(false);
        let float = builder.type_id(TypeKey::Float);
        let bool_ty = builder.type_id(TypeKey::Bool);
        let float2 = builder.type_id(TypeKey::Vector(float, 2));
        let bool2 = builder.type_id(TypeKey::Vector(bool_ty, 2));
        let one = builder.constant(float, ConstValue::Word(1.0f32.to_bits()));
        let two = builder.constant(float, ConstValue::Word(2.0f32.to_bits()));
        let a = builder.constant(float2, ConstValue::Composite(SmallVec::from_slice(&[one, two])));
        let b = builder.constant(float2, ConstValue::Composite(SmallVec::from_slice(&[two, two])));
        let folded = fold(
            &mut builder,
            Op::FOrdLessThan,
            bool2,
            &[Operand::Id(a), Operand::Id(b)],
        );
        let t = builder.constant(bool_ty, ConstValue::Bool(true));
        let f = builder.constant(bool_ty, ConstValue::Bool(false));
        let expected = builder.constant(bool2, ConstValue::Composite(SmallVec::from_slice(&[t, f])));
        assert_eq!(folded, Some(expected));
    }

    #[test]
    fn test_division_by_zero_is_left_alone() {
        assert_eq!(
            eval(Op::SDiv, &[Scalar::Int(1), Scalar::Int(0)], &TypeKey::Int { signed: true }),
            None
        );
        assert_eq!(
            eval(Op::FDiv, &[Scalar::Float(1.0), Scalar::Float(0.0)], &TypeKey::Float),
            None
        );
        assert_eq!(
            eval(Op::SDiv, &[Scalar::Int(i32::MIN), Scalar::Int(-1)], &TypeKey::Int { signed: true }),
            None
        );
    }

    #[test]
    fn test_runtime_operands_block_folding() {
        let mut builder = ModuleBuilder::new(false);
        let int = builder.type_id(TypeKey::Int { signed: true });
        let two = builder.constant(int, ConstValue::Word(2));
        let runtime = builder.fresh();
        assert_eq!(
            fold(&mut builder, Op::IAdd, int, &[Operand::Id(two), Operand::Id(runtime)]),
            None
        );
    }
}
