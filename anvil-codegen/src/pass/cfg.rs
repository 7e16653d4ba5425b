//! Control-flow simplification: fold constant branches, bypass trampoline
//! blocks, drop unreachable blocks, and merge single-predecessor chains.
//!
//! Unlike the straight-line passes, this one mutates the block graph itself
//! rather than just instruction operands, so it always leaves
//! [`Function::refresh_cfg`] to restore `preds`/`succs` before handing back
//! to the pass manager.

use crate::ir::{Block, Function, Opcode, Value, ValueData};
use std::collections::HashSet;

fn const_int_of(func: &Function, v: Value) -> Option<i64> {
    match func.value(v) {
        ValueData::ConstInt { bits, .. } => Some(*bits),
        _ => None,
    }
}

/// `BR_COND` on a constant condition becomes an unconditional `BR` to
/// whichever side the condition selects.
fn fold_constant_branches(func: &mut Function) -> bool {
    let mut changed = false;
    for block in func.blocks().collect::<Vec<_>>() {
        let Some(last) = func.block(block).last() else { continue };
        let data = func.inst(last);
        if data.opcode() != Opcode::BrCond {
            continue;
        }
        let cond = data.operands()[0];
        let Some(cond_val) = const_int_of(func, cond) else { continue };
        let taken = if cond_val != 0 { data.true_block().unwrap() } else { data.false_block().unwrap() };
        let inst = func.inst_mut(last);
        inst.opcode = Opcode::Br;
        inst.operands.clear();
        inst.true_block = Some(taken);
        inst.false_block = None;
        changed = true;
    }
    changed
}

/// A block whose only instruction is an unconditional `BR` is a pure
/// trampoline; any other block's terminator that targets it can jump
/// straight to its destination instead. Skipped when the destination has
/// any `PHI`, since bypassing would silently rewrite that `PHI`'s incoming
/// predecessor out from under it, and skipped for the entry block, which
/// has no jump-in to redirect.
fn bypass_empty_blocks(func: &mut Function) -> bool {
    let mut changed = false;
    let entry = func.entry_block();
    let mut redirects: Vec<(Block, Block)> = Vec::new();
    for block in func.blocks().collect::<Vec<_>>() {
        if block == entry {
            continue;
        }
        let first = func.block(block).first();
        let last = func.block(block).last();
        if first != last {
            continue;
        }
        let Some(only) = first else { continue };
        let data = func.inst(only);
        if data.opcode() != Opcode::Br {
            continue;
        }
        let target = data.true_block().unwrap();
        if target == block {
            continue;
        }
        let has_phi = func.block_insts(target).any(|i| func.inst(i).opcode() == Opcode::Phi);
        if has_phi {
            continue;
        }
        redirects.push((block, target));
    }
    for (from, to) in redirects {
        for block in func.blocks().collect::<Vec<_>>() {
            let Some(last) = func.block(block).last() else { continue };
            let inst = func.inst_mut(last);
            let mut touched = false;
            if inst.true_block == Some(from) {
                inst.true_block = Some(to);
                touched = true;
            }
            if inst.false_block == Some(from) {
                inst.false_block = Some(to);
                touched = true;
            }
            if inst.switch_default == Some(from) {
                inst.switch_default = Some(to);
                touched = true;
            }
            for case in inst.switch_cases.iter_mut() {
                if case.target == from {
                    case.target = to;
                    touched = true;
                }
            }
            changed |= touched;
        }
    }
    changed
}

/// Remove every live block unreachable from the entry block by a successor
/// walk.
fn remove_unreachable_blocks(func: &mut Function) -> bool {
    let entry = func.entry_block();
    let mut seen: HashSet<Block> = HashSet::new();
    let mut stack = vec![entry];
    while let Some(b) = stack.pop() {
        if !seen.insert(b) {
            continue;
        }
        for &s in func.block(b).succs() {
            if func.is_block_live(s) {
                stack.push(s);
            }
        }
    }
    let mut changed = false;
    for block in func.blocks().collect::<Vec<_>>() {
        if !seen.contains(&block) {
            func.mark_block_dead(block);
            changed = true;
        }
    }
    changed
}

/// When a live block `a` has exactly one successor `s`, reached through an
/// unconditional `BR`, and `s` has exactly one predecessor (`a`) and no
/// `PHI`, splice `s`'s instructions onto the end of `a` and retire `s`.
/// Any `PHI` elsewhere with an incoming edge `from: s` is rewritten to
/// `from: a`, since `a` is now the block that edge actually originates
/// from.
fn merge_single_pred_blocks(func: &mut Function) -> bool {
    let mut changed = false;
    loop {
        let mut candidate = None;
        for a in func.blocks().collect::<Vec<_>>() {
            let succs = func.block(a).succs();
            if succs.len() != 1 {
                continue;
            }
            let s = succs[0];
            if s == a {
                continue;
            }
            let s_preds = func.block(s).preds();
            if s_preds.len() != 1 || s_preds[0] != a {
                continue;
            }
            let Some(last) = func.block(a).last() else { continue };
            if func.inst(last).opcode() != Opcode::Br {
                continue;
            }
            if func.block_insts(s).any(|i| func.inst(i).opcode() == Opcode::Phi) {
                continue;
            }
            candidate = Some((a, s, last));
            break;
        }
        let Some((a, s, br_inst)) = candidate else { break };

        func.unlink_inst(br_inst);
        let moved: Vec<_> = func.block_insts(s).collect();
        for &inst in &moved {
            func.inst_mut(inst).block = Some(a);
        }
        let a_last = func.block(a).last();
        let s_first = func.block(s).first();
        let s_last = func.block(s).last();
        if let Some(first) = s_first {
            func.inst_mut(first).prev = a_last;
            if let Some(prev) = a_last {
                func.inst_mut(prev).next = Some(first);
            } else {
                func.block_mut(a).first = Some(first);
            }
            func.block_mut(a).last = s_last;
        }
        func.block_mut(s).first = None;
        func.block_mut(s).last = None;
        func.mark_block_dead(s);

        for block in func.blocks().collect::<Vec<_>>() {
            for inst in func.block_insts(block).collect::<Vec<_>>() {
                for edge in func.inst_mut(inst).phi_edges.iter_mut() {
                    if edge.from == s {
                        edge.from = a;
                    }
                }
            }
        }
        changed = true;
        func.refresh_cfg();
    }
    changed
}

/// Run the CFG-simplification sweep once; refreshes `preds`/`succs` as
/// needed between steps and again before returning.
pub(super) fn simplify(func: &mut Function) -> bool {
    let mut changed = false;
    changed |= fold_constant_branches(func);
    changed |= bypass_empty_blocks(func);
    func.refresh_cfg();
    changed |= remove_unreachable_blocks(func);
    changed |= merge_single_pred_blocks(func);
    func.refresh_cfg();
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

    #[test]
    fn constant_cond_branch_becomes_unconditional() {
        let sig = Type::func(i32_(), &[], false);
        let mut f = Function::new("f".to_string(), Linkage::External, sig, false);
        let entry = f.entry_block();
        let then_block;
        let else_block;
        {
            let mut b = FunctionBuilder::new(&mut f, 8);
            then_block = b.create_block();
            else_block = b.create_block();
            b.set_insert_point(entry);
            let one = b.const_int(i32_(), 1).unwrap();
            b.build_br_cond(one, then_block, else_block).unwrap();
            b.set_insert_point(then_block);
            let a = b.const_int(i32_(), 1).unwrap();
            b.build_ret(Some(a)).unwrap();
            b.set_insert_point(else_block);
            let z = b.const_int(i32_(), 0).unwrap();
            b.build_ret(Some(z)).unwrap();
        }
        assert!(fold_constant_branches(&mut f));
        let term = f.block(entry).last().unwrap();
        assert_eq!(f.inst(term).opcode(), Opcode::Br);
        assert_eq!(f.inst(term).true_block(), Some(then_block));
    }

    #[test]
    fn unreachable_block_is_dropped() {
        let sig = Type::func(i32_(), &[], false);
        let mut f = Function::new("f".to_string(), Linkage::External, sig, false);
        let entry = f.entry_block();
        let dead_block;
        {
            let mut b = FunctionBuilder::new(&mut f, 8);
            dead_block = b.create_block();
            b.set_insert_point(entry);
            let zero = b.const_int(i32_(), 0).unwrap();
            b.build_ret(Some(zero)).unwrap();
            b.set_insert_point(dead_block);
            let one = b.const_int(i32_(), 1).unwrap();
            b.build_ret(Some(one)).unwrap();
        }
        f.refresh_cfg();
        assert!(remove_unreachable_blocks(&mut f));
        assert!(!f.is_block_live(dead_block));
        assert!(f.is_block_live(entry));
    }

    #[test]
    fn single_pred_successor_is_merged_in() {
        let sig = Type::func(i32_(), &[], false);
        let mut f = Function::new("f".to_string(), Linkage::External, sig, false);
        let entry = f.entry_block();
        let tail;
        {
            let mut b = FunctionBuilder::new(&mut f, 8);
            tail = b.create_block();
            b.set_insert_point(entry);
            b.build_br(tail).unwrap();
            b.set_insert_point(tail);
            let v = b.const_int(i32_(), 9).unwrap();
            b.build_ret(Some(v)).unwrap();
        }
        f.refresh_cfg();
        assert!(merge_single_pred_blocks(&mut f));
        assert!(!f.is_block_live(tail));
        let entry_insts: Vec<_> = f.block_insts(entry).collect();
        assert_eq!(f.inst(*entry_insts.last().unwrap()).opcode(), Opcode::Ret);
    }
}
