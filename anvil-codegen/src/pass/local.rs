//! Straight-line local passes: constant folding (plus the algebraic
//! identities that collapse to a constant), copy propagation (the
//! identities that collapse to an operand), and strength reduction.

use crate::ir::{Function, Opcode, Value, ValueData};
use crate::pass::rewrite_uses;

fn const_int_of(func: &Function, v: Value) -> Option<i64> {
    match func.value(v) {
        ValueData::ConstInt { bits, .. } => Some(*bits),
        _ => None,
    }
}

fn eval_int(op: Opcode, a: i64, b: i64) -> Option<i64> {
    match op {
        Opcode::Add => Some(a.wrapping_add(b)),
        Opcode::Sub => Some(a.wrapping_sub(b)),
        Opcode::Mul => Some(a.wrapping_mul(b)),
        Opcode::Sdiv => (b != 0).then(|| a.wrapping_div(b)),
        Opcode::Udiv => (b != 0).then(|| ((a as u64).wrapping_div(b as u64)) as i64),
        Opcode::Smod => (b != 0).then(|| a.wrapping_rem(b)),
        Opcode::Umod => (b != 0).then(|| ((a as u64).wrapping_rem(b as u64)) as i64),
        Opcode::And => Some(a & b),
        Opcode::Or => Some(a | b),
        Opcode::Xor => Some(a ^ b),
        Opcode::Shl => Some(a.wrapping_shl(b as u32)),
        Opcode::Shr => Some(((a as u64).wrapping_shr(b as u32)) as i64),
        Opcode::Sar => Some(a.wrapping_shr(b as u32)),
        Opcode::CmpEq => Some((a == b) as i64),
        Opcode::CmpNe => Some((a != b) as i64),
        Opcode::CmpLt => Some((a < b) as i64),
        Opcode::CmpLe => Some((a <= b) as i64),
        Opcode::CmpGt => Some((a > b) as i64),
        Opcode::CmpGe => Some((a >= b) as i64),
        Opcode::CmpUlt => Some(((a as u64) < (b as u64)) as i64),
        Opcode::CmpUle => Some(((a as u64) <= (b as u64)) as i64),
        Opcode::CmpUgt => Some(((a as u64) > (b as u64)) as i64),
        Opcode::CmpUge => Some(((a as u64) >= (b as u64)) as i64),
        _ => None,
    }
}

/// Evaluate fully-constant instructions and replace their uses with a
/// freshly minted constant; separately, collapse algebraic identities
/// that resolve to a known constant regardless of the other operand
/// (`x*0 → 0`, `x&0 → 0`). Folded/collapsed instructions are marked
/// `NOP`; DCE removes them once uses are gone.
pub(super) fn const_fold(func: &mut Function) -> bool {
    let mut changed = false;
    let insts: Vec<_> = func.blocks().flat_map(|b| func.block_insts(b).collect::<Vec<_>>()).collect();
    for inst in insts {
        let data = func.inst(inst);
        let op = data.opcode();
        let Some(result) = data.result() else { continue };
        let result_ty = func.value(result).ty().clone();
        let operands = data.operands().to_vec();

        let folded: Option<i64> = if op.is_binary_int() || op.is_int_compare() {
            if operands.len() != 2 {
                None
            } else {
                let a = const_int_of(func, operands[0]);
                let b = const_int_of(func, operands[1]);
                match (a, b) {
                    (Some(a), Some(b)) => eval_int(op, a, b),
                    // x*0 = 0, x&0 = 0 regardless of the other operand.
                    (Some(0), None) | (None, Some(0)) if op == Opcode::Mul || op == Opcode::And => Some(0),
                    _ => None,
                }
            }
        } else if op == Opcode::Neg {
            const_int_of(func, operands[0]).map(|a| a.wrapping_neg())
        } else if op == Opcode::Not {
            const_int_of(func, operands[0]).map(|a| !a)
        } else {
            None
        };

        if let Some(bits) = folded {
            if !result_ty.is_int() {
                continue;
            }
            let c = func.new_value(ValueData::ConstInt { ty: result_ty, bits });
            rewrite_uses(func, result, c);
            func.inst_mut(inst).make_nop();
            changed = true;
        }
    }
    changed
}

/// Rewrite uses of an identity-preserving instruction's result directly
/// to its source operand: `x+0`, `x-0`, `x*1`, `x|0`, `x&~0`, `x^0`,
/// `x<<0`, `x-x → 0`, `x^x → 0`, `x&x → x`. DCE cleans up the now-unused
/// original instruction.
pub(super) fn copy_prop(func: &mut Function) -> bool {
    let mut changed = false;
    let insts: Vec<_> = func.blocks().flat_map(|b| func.block_insts(b).collect::<Vec<_>>()).collect();
    for inst in insts {
        let data = func.inst(inst);
        let op = data.opcode();
        let Some(result) = data.result() else { continue };
        let operands = data.operands().to_vec();
        if operands.len() != 2 || !op.is_binary_int() {
            continue;
        }
        let lhs = operands[0];
        let rhs = operands[1];
        let rhs_const = const_int_of(func, rhs);
        let lhs_const = const_int_of(func, lhs);

        let identity_source: Option<Value> = match op {
            Opcode::Add if rhs_const == Some(0) => Some(lhs),
            Opcode::Add if lhs_const == Some(0) => Some(rhs),
            Opcode::Sub if rhs_const == Some(0) => Some(lhs),
            Opcode::Mul if rhs_const == Some(1) => Some(lhs),
            Opcode::Mul if lhs_const == Some(1) => Some(rhs),
            Opcode::Or if rhs_const == Some(0) => Some(lhs),
            Opcode::Or if lhs_const == Some(0) => Some(rhs),
            Opcode::Xor if rhs_const == Some(0) => Some(lhs),
            Opcode::And if rhs_const == Some(-1) => Some(lhs),
            Opcode::And if lhs_const == Some(-1) => Some(rhs),
            Opcode::Shl if rhs_const == Some(0) => Some(lhs),
            Opcode::Shr if rhs_const == Some(0) => Some(lhs),
            Opcode::Sar if rhs_const == Some(0) => Some(lhs),
            Opcode::And if lhs == rhs => Some(lhs),
            _ => None,
        };

        if let Some(source) = identity_source {
            rewrite_uses(func, result, source);
            func.inst_mut(inst).make_nop();
            changed = true;
            continue;
        }

        // x-x and x^x both collapse to the zero constant of the operand
        // type, not to either operand — handled here rather than in
        // `const_fold` since neither operand is itself constant.
        if lhs == rhs && matches!(op, Opcode::Sub | Opcode::Xor) {
            let ty = func.value(result).ty().clone();
            let zero = func.new_value(ValueData::ConstInt { ty, bits: 0 });
            rewrite_uses(func, result, zero);
            func.inst_mut(inst).make_nop();
            changed = true;
        }
    }
    changed
}

/// `x*2^n → x<<n`; for unsigned integer types, `x/2^n → x>>n` and
/// `x%2^n → x&(2^n-1)`.
pub(super) fn strength_reduce(func: &mut Function) -> bool {
    let mut changed = false;
    let insts: Vec<_> = func.blocks().flat_map(|b| func.block_insts(b).collect::<Vec<_>>()).collect();
    for inst in insts {
        let data = func.inst(inst);
        let op = data.opcode();
        let operands = data.operands().to_vec();
        if operands.len() != 2 {
            continue;
        }
        let Some(result) = data.result() else { continue };
        let ty = func.value(result).ty().clone();
        let lhs = operands[0];
        let rhs = operands[1];
        let Some(rhs_val) = const_int_of(func, rhs) else { continue };
        if rhs_val <= 0 || (rhs_val as u64).count_ones() != 1 {
            continue;
        }
        let shift = rhs_val.trailing_zeros() as i64;
        let unsigned = !ty.is_signed_int();

        let new_op = match op {
            Opcode::Mul => Some((Opcode::Shl, shift)),
            Opcode::Udiv if unsigned => Some((Opcode::Shr, shift)),
            Opcode::Umod if unsigned => Some((Opcode::And, rhs_val - 1)),
            _ => None,
        };
        let Some((replacement_op, imm)) = new_op else { continue };

        let imm_val = func.new_value(ValueData::ConstInt { ty, bits: imm });
        let data = func.inst_mut(inst);
        data.opcode = replacement_op;
        data.operands.clear();
        data.operands.push(lhs);
        data.operands.push(imm_val);
        changed = true;
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::FunctionBuilder;
    use crate::ir::{Linkage, Type, TypeKind};

    fn i32_() -> Type {
        Type::primitive(TypeKind::I32, 4)
    }

    fn u32_() -> Type {
        Type::primitive(TypeKind::U32, 4)
    }

    #[test]
    fn folds_fully_constant_add() {
        let sig = Type::func(i32_(), &[], false);
        let mut f = Function::new("f".to_string(), Linkage::External, sig, false);
        let entry = f.entry_block();
        let mut b = FunctionBuilder::new(&mut f, 8);
        b.set_insert_point(entry);
        let three = b.const_int(i32_(), 3).unwrap();
        let five = b.const_int(i32_(), 5).unwrap();
        let sum = b.build_add(three, five).unwrap();
        b.build_ret(Some(sum)).unwrap();

        assert!(const_fold(&mut f));
        // The add's defining instruction is now a NOP; the RET's operand
        // was rewired to a fresh constant 8.
        let entry_insts: Vec<_> = f.block_insts(entry).collect();
        let ret = *entry_insts.last().unwrap();
        let ret_operand = f.inst(ret).operands()[0];
        assert_eq!(const_int_of(&f, ret_operand), Some(8));
    }

    #[test]
    fn strength_reduction_turns_mul_by_8_into_shl_3() {
        let sig = Type::func(i32_(), &[i32_()], false);
        let mut f = Function::new("f".to_string(), Linkage::External, sig, false);
        let entry = f.entry_block();
        let mut b = FunctionBuilder::new(&mut f, 8);
        b.set_insert_point(entry);
        let x = b.param(0).unwrap();
        let eight = b.const_int(i32_(), 8).unwrap();
        let prod = b.build_mul(x, eight).unwrap();
        b.build_ret(Some(prod)).unwrap();

        assert!(strength_reduce(&mut f));
        let prod_inst = f.value(prod).defining_inst().unwrap();
        assert_eq!(f.inst(prod_inst).opcode(), Opcode::Shl);
        let shift_amount = f.inst(prod_inst).operands()[1];
        assert_eq!(const_int_of(&f, shift_amount), Some(3));
    }

    #[test]
    fn unsigned_mod_by_power_of_two_becomes_and() {
        let sig = Type::func(u32_(), &[u32_()], false);
        let mut f = Function::new("f".to_string(), Linkage::External, sig, false);
        let entry = f.entry_block();
        let mut b = FunctionBuilder::new(&mut f, 8);
        b.set_insert_point(entry);
        let x = b.param(0).unwrap();
        let sixteen = b.const_int(u32_(), 16).unwrap();
        let rem = b.build_umod(x, sixteen).unwrap();
        b.build_ret(Some(rem)).unwrap();

        assert!(strength_reduce(&mut f));
        let rem_inst = f.value(rem).defining_inst().unwrap();
        assert_eq!(f.inst(rem_inst).opcode(), Opcode::And);
        let mask = f.inst(rem_inst).operands()[1];
        assert_eq!(const_int_of(&f, mask), Some(15));
    }

    #[test]
    fn copy_propagation_rewires_add_zero_uses() {
        let sig = Type::func(i32_(), &[i32_()], false);
        let mut f = Function::new("f".to_string(), Linkage::External, sig, false);
        let entry = f.entry_block();
        let mut b = FunctionBuilder::new(&mut f, 8);
        b.set_insert_point(entry);
        let x = b.param(0).unwrap();
        let zero = b.const_int(i32_(), 0).unwrap();
        let sum = b.build_add(x, zero).unwrap();
        b.build_ret(Some(sum)).unwrap();

        assert!(copy_prop(&mut f));
        let ret_inst = *f.block_insts(entry).last().unwrap();
        assert_eq!(f.inst(ret_inst).operands()[0], x);
    }
}
