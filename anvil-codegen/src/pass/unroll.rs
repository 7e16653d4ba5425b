//! Loop unrolling: fully unroll small, constant-trip-count counted loops.
//!
//! Only the canonical shape produced by lowering a `for i = init; i < bound;
//! i += step` loop to a single-block body is recognized: one induction
//! variable `PHI` in the header, a `CMP_LT`/`CMP_ULT` against a constant
//! bound gating a `BR_COND` into the body or out to the exit block, and a
//! body that is exactly one block ending in an unconditional branch back to
//! the header. Anything else — an accumulator `PHI`, a multi-block body, an
//! early exit, a live-out `PHI` in the exit block — is left alone; this
//! engine does not attempt induction-variable analysis beyond that one
//! shape.

use crate::ir::{Block, Function, Inst, InstData, Opcode, Value, ValueData};
use std::collections::HashMap;

/// Loops with a larger trip count are left alone; unrolling them would
/// bloat the function for diminishing benefit without a real cost model.
const MAX_TRIP_COUNT: i64 = 16;
/// Loops with a bigger body are left alone for the same reason.
const MAX_BODY_INSNS: usize = 32;

fn const_int_of(func: &Function, v: Value) -> Option<i64> {
    match func.value(v) {
        ValueData::ConstInt { bits, .. } => Some(*bits),
        _ => None,
    }
}

struct LoopShape {
    header: Block,
    preheader: Block,
    body: Block,
    exit: Block,
    iv: Value,
    init: i64,
    step: i64,
    trip_count: i64,
}

fn detect_canonical_loop(func: &Function, header: Block) -> Option<LoopShape> {
    let phis: Vec<Inst> = func.block_insts(header).filter(|&i| func.inst(i).opcode() == Opcode::Phi).collect();
    if phis.len() != 1 {
        return None;
    }
    let phi_inst = phis[0];
    let iv = func.inst(phi_inst).result()?;

    let last = func.block(header).last()?;
    let term = func.inst(last);
    if term.opcode() != Opcode::BrCond {
        return None;
    }
    let cond = term.operands()[0];
    let then_block = term.true_block()?;
    let exit = term.false_block()?;

    let cmp_inst = func.value(cond).defining_inst()?;
    let cmp_data = func.inst(cmp_inst);
    if !matches!(cmp_data.opcode(), Opcode::CmpLt | Opcode::CmpUlt) || cmp_data.operands()[0] != iv {
        return None;
    }
    let bound = const_int_of(func, cmp_data.operands()[1])?;

    let then_preds = func.block(then_block).preds();
    if then_preds.len() != 1 || then_preds[0] != header {
        return None;
    }
    if func.block_insts(then_block).any(|i| func.inst(i).opcode() == Opcode::Phi) {
        return None;
    }
    let body_last = func.block(then_block).last()?;
    let body_term = func.inst(body_last);
    if body_term.opcode() != Opcode::Br || body_term.true_block() != Some(header) {
        return None;
    }

    let edges = func.inst(phi_inst).phi_edges();
    if edges.len() != 2 {
        return None;
    }
    let preheader_edge = edges.iter().find(|e| e.from != then_block)?;
    let latch_edge = edges.iter().find(|e| e.from == then_block)?;
    let preheader = preheader_edge.from;
    let init = const_int_of(func, preheader_edge.value)?;

    let header_preds = func.block(header).preds();
    if !(header_preds.len() == 2 && header_preds.contains(&preheader) && header_preds.contains(&then_block)) {
        return None;
    }

    let next_inst = func.value(latch_edge.value).defining_inst()?;
    if func.inst(next_inst).block() != Some(then_block) || func.inst(next_inst).opcode() != Opcode::Add {
        return None;
    }
    let step_operands = func.inst(next_inst).operands();
    let step = if step_operands[0] == iv {
        const_int_of(func, step_operands[1])?
    } else if step_operands[1] == iv {
        const_int_of(func, step_operands[0])?
    } else {
        return None;
    };
    if step <= 0 {
        return None;
    }

    if func.block_insts(exit).any(|i| func.inst(i).opcode() == Opcode::Phi) {
        return None;
    }

    let trip_count = if bound <= init { 0 } else { (bound - init + step - 1) / step };

    Some(LoopShape { header, preheader, body: then_block, exit, iv, init, step, trip_count })
}

fn unroll_loop(func: &mut Function, shape: &LoopShape) {
    let mut iter_blocks = Vec::with_capacity(shape.trip_count.max(0) as usize);
    let iv_ty = func.value(shape.iv).ty().clone();
    for k in 0..shape.trip_count {
        let iter_block = func.create_block(None);
        let iv_const = func.new_value(ValueData::ConstInt { ty: iv_ty.clone(), bits: shape.init + k * shape.step });
        let mut value_map: HashMap<Value, Value> = HashMap::new();
        value_map.insert(shape.iv, iv_const);

        for inst in func.block_insts(shape.body).collect::<Vec<_>>() {
            let data = func.inst(inst).clone();
            if data.opcode().is_terminator() {
                continue;
            }
            let mut new_data = InstData::new(data.opcode());
            new_data.operands = data.operands().iter().map(|v| *value_map.get(v).unwrap_or(v)).collect();
            new_data.aux_type = data.aux_type().cloned();
            new_data.callee = data.callee();
            new_data.imm = data.imm();
            let new_inst = func.append_inst(iter_block, new_data);
            if let Some(old_result) = data.result() {
                let ty = data.result_ty.clone().expect("a result-producing instruction carries its result type");
                let new_val = func.new_value(ValueData::InstResult { inst: new_inst, ty });
                func.inst_mut(new_inst).result = Some(new_val);
                value_map.insert(old_result, new_val);
            }
        }
        iter_blocks.push(iter_block);
    }

    for (i, &block) in iter_blocks.iter().enumerate() {
        let target = iter_blocks.get(i + 1).copied().unwrap_or(shape.exit);
        let mut br = InstData::new(Opcode::Br);
        br.true_block = Some(target);
        func.append_inst(block, br);
    }

    let entry_target = iter_blocks.first().copied().unwrap_or(shape.exit);
    let preterm = func.block(shape.preheader).last().expect("the preheader ends in a terminator");
    let pdata = func.inst_mut(preterm);
    if pdata.true_block == Some(shape.header) {
        pdata.true_block = Some(entry_target);
    }
    if pdata.false_block == Some(shape.header) {
        pdata.false_block = Some(entry_target);
    }

    func.mark_block_dead(shape.header);
    func.mark_block_dead(shape.body);
    func.refresh_cfg();
}

/// Find the first canonical counted loop within budget and fully unroll
/// it. Candidates outside the trip-count or body-size budget are logged at
/// `trace` and left in place; the pass manager will call this again next
/// sweep in case an earlier unroll exposed a new candidate.
pub(super) fn unroll(func: &mut Function) -> bool {
    for header in func.blocks().collect::<Vec<_>>() {
        let Some(shape) = detect_canonical_loop(func, header) else { continue };
        let body_len = func.block_insts(shape.body).count();
        if shape.trip_count > MAX_TRIP_COUNT || body_len > MAX_BODY_INSNS {
            log::trace!(
                "skipping loop unroll candidate at block {}: trip_count={} body_insns={}",
                shape.header,
                shape.trip_count,
                body_len
            );
            continue;
        }
        unroll_loop(func, &shape);
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::FunctionBuilder;
    use crate::ir::{Function as Func_, Linkage, Type, TypeKind};

    fn i32_() -> Type {
        Type::primitive(TypeKind::I32, 4)
    }

    /// Builds:
    /// ```text
    /// entry: br header
    /// header: iv = phi [0, entry], [iv2, body]; cond = iv < 4; br_cond cond, body, exit
    /// body: iv2 = iv + 1; br header
    /// exit: ret 0
    /// ```
    fn build_counted_loop() -> (Func_, Block, Block, i64) {
        let sig = Type::func(i32_(), &[], false);
        let mut f = Func_::new("f".to_string(), Linkage::External, sig, false);
        let entry = f.entry_block();
        let bound = 4;
        let (header, exit) = {
            let mut b = FunctionBuilder::new(&mut f, 8);
            let header = b.create_block();
            let body = b.create_block();
            let exit = b.create_block();

            b.set_insert_point(entry);
            b.build_br(header).unwrap();

            b.set_insert_point(header);
            let zero = b.const_int(i32_(), 0).unwrap();
            let n = b.const_int(i32_(), bound).unwrap();
            let iv = b.build_phi(i32_(), &[(zero, entry)]).unwrap();
            let cond = b.build_cmp_lt(iv, n).unwrap();
            b.build_br_cond(cond, body, exit).unwrap();

            b.set_insert_point(body);
            let one = b.const_int(i32_(), 1).unwrap();
            let iv2 = b.build_add(iv, one).unwrap();
            b.build_br(header).unwrap();
            b.add_phi_incoming(iv, iv2, body).unwrap();

            b.set_insert_point(exit);
            let zero2 = b.const_int(i32_(), 0).unwrap();
            b.build_ret(Some(zero2)).unwrap();

            (header, exit)
        };
        f.refresh_cfg();
        (f, header, exit, bound)
    }

    #[test]
    fn detects_and_unrolls_a_small_counted_loop() {
        let (mut f, header, exit, bound) = build_counted_loop();
        let shape = detect_canonical_loop(&f, header).expect("canonical loop shape detected");
        assert_eq!(shape.trip_count, bound);
        assert!(unroll(&mut f));
        assert!(!f.is_block_live(header));
        assert!(f.is_block_live(exit));
    }
}
