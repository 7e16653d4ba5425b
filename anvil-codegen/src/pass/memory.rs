//! Per-block memory and expression-redundancy passes: local CSE,
//! redundant-load elimination, and store-load forwarding.
//!
//! All three share the same conservative memory model: a `STORE` or
//! `CALL` invalidates whatever they've learned so far about memory
//! contents, since either could write through an aliasing pointer this
//! port makes no attempt to disambiguate — except for the one case the
//! design calls out explicitly: "two `ALLOCA`-produced pointers that are
//! distinct instructions never alias".

use crate::ir::{Function, Inst, Opcode, Value};
use crate::pass::rewrite_uses;

fn same_pointer(func: &Function, a: Value, b: Value) -> bool {
    if a == b {
        return true;
    }
    // Two distinct ALLOCA results are always distinct storage; anything
    // else (a GEP off the same base, a global, a parameter) is treated
    // conservatively as potentially aliasing unless the values are
    // literally the same `Value`.
    let a_is_alloca = func.value(a).defining_inst().map(|i| func.inst(i).opcode() == Opcode::Alloca).unwrap_or(false);
    let b_is_alloca = func.value(b).defining_inst().map(|i| func.inst(i).opcode() == Opcode::Alloca).unwrap_or(false);
    !(a_is_alloca && b_is_alloca)
}

/// Per-block common subexpression elimination: a table of
/// `(opcode, operands)` to the first instruction that computed it,
/// cleared at every `STORE`/`CALL`. Commutative opcodes match against
/// swapped operands too.
pub(super) fn cse(func: &mut Function) -> bool {
    let mut changed = false;
    for block in func.blocks().collect::<Vec<_>>() {
        let mut table: Vec<(Opcode, Vec<Value>, Value)> = Vec::new();
        for inst in func.block_insts(block).collect::<Vec<_>>() {
            let data = func.inst(inst);
            let op = data.opcode();
            if op == Opcode::Store || op == Opcode::Call {
                table.clear();
                continue;
            }
            let Some(result) = data.result() else { continue };
            if op.has_side_effects() || matches!(op, Opcode::Alloca | Opcode::Load | Opcode::Phi) {
                // ALLOCA/LOAD/PHI are excluded: a repeated ALLOCA is a
                // distinct allocation, and repeated LOADs are the
                // redundant-load pass's job (it additionally requires no
                // intervening store, which a pure operand-identity match
                // here wouldn't check).
                continue;
            }
            let operands = data.operands().to_vec();
            let hit = table.iter().find(|(cached_op, cached_operands, _)| {
                *cached_op == op
                    && (*cached_operands == operands
                        || (op.is_commutative() && operands.len() == 2 && cached_operands.len() == 2 && cached_operands[0] == operands[1] && cached_operands[1] == operands[0]))
            });
            match hit {
                Some(&(_, _, cached_result)) => {
                    rewrite_uses(func, result, cached_result);
                    func.inst_mut(inst).make_nop();
                    changed = true;
                }
                None => table.push((op, operands, result)),
            }
        }
    }
    changed
}

/// For each `LOAD`, search backward within the same block for a prior
/// `LOAD` from the same pointer with no intervening `STORE`/`CALL`;
/// rewrite uses of the later load to the earlier one's result.
pub(super) fn redundant_load(func: &mut Function) -> bool {
    let mut changed = false;
    for block in func.blocks().collect::<Vec<_>>() {
        let insts: Vec<Inst> = func.block_insts(block).collect();
        let mut live_loads: Vec<(Value, Value)> = Vec::new(); // (pointer, result)
        for inst in insts {
            let data = func.inst(inst);
            match data.opcode() {
                Opcode::Store | Opcode::Call => live_loads.clear(),
                Opcode::Load => {
                    let ptr = data.operands()[0];
                    let result = data.result().unwrap();
                    if let Some(&(_, prior_result)) = live_loads.iter().find(|(p, _)| same_pointer(func, *p, ptr)) {
                        rewrite_uses(func, result, prior_result);
                        func.inst_mut(inst).make_nop();
                        changed = true;
                    } else {
                        live_loads.push((ptr, result));
                    }
                }
                _ => {}
            }
        }
    }
    changed
}

/// When a `LOAD` immediately follows a `STORE` to the same address (no
/// intervening instruction at all — the narrowest, always-safe case),
/// rewrite uses of the load to the stored value and `NOP` the load.
pub(super) fn store_load_forward(func: &mut Function) -> bool {
    let mut changed = false;
    for block in func.blocks().collect::<Vec<_>>() {
        let insts: Vec<Inst> = func.block_insts(block).collect();
        for pair in insts.windows(2) {
            let (store_inst, load_inst) = (pair[0], pair[1]);
            let store = func.inst(store_inst);
            if store.opcode() != Opcode::Store {
                continue;
            }
            let stored_value = store.operands()[0];
            let stored_ptr = store.operands()[1];
            let load = func.inst(load_inst);
            if load.opcode() != Opcode::Load {
                continue;
            }
            let load_ptr = load.operands()[0];
            if !same_pointer(func, stored_ptr, load_ptr) {
                continue;
            }
            let result = load.result().unwrap();
            rewrite_uses(func, result, stored_value);
            func.inst_mut(load_inst).make_nop();
            changed = true;
        }
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

    #[test]
    fn cse_matches_commutative_swapped_operands() {
        let sig = Type::func(i32_(), &[i32_(), i32_()], false);
        let mut f = Function::new("f".to_string(), Linkage::External, sig, false);
        let entry = f.entry_block();
        let mut b = FunctionBuilder::new(&mut f, 8);
        b.set_insert_point(entry);
        let x = b.param(0).unwrap();
        let y = b.param(1).unwrap();
        let a = b.build_add(x, y).unwrap();
        let bb = b.build_add(y, x).unwrap();
        let prod = b.build_mul(a, bb).unwrap();
        b.build_ret(Some(prod)).unwrap();

        assert!(cse(&mut f));
        let prod_inst = f.value(prod).defining_inst().unwrap();
        let operands = f.inst(prod_inst).operands();
        assert_eq!(operands[0], operands[1]);
    }

    #[test]
    fn redundant_load_forwards_to_the_first_load() {
        let sig = Type::func(i32_(), &[], false);
        let mut f = Function::new("f".to_string(), Linkage::External, sig, false);
        let entry = f.entry_block();
        let mut b = FunctionBuilder::new(&mut f, 8);
        b.set_insert_point(entry);
        let p = b.build_alloca(i32_()).unwrap();
        let t = b.build_load(i32_(), p).unwrap();
        let u = b.build_load(i32_(), p).unwrap();
        let sum = b.build_add(t, u).unwrap();
        b.build_ret(Some(sum)).unwrap();

        assert!(redundant_load(&mut f));
        let sum_inst = f.value(sum).defining_inst().unwrap();
        let operands = f.inst(sum_inst).operands();
        assert_eq!(operands[0], operands[1]);
    }

    #[test]
    fn store_then_load_forwards_the_stored_value() {
        let sig = Type::func(i32_(), &[], false);
        let mut f = Function::new("f".to_string(), Linkage::External, sig, false);
        let entry = f.entry_block();
        let mut b = FunctionBuilder::new(&mut f, 8);
        b.set_insert_point(entry);
        let slot = b.build_alloca(i32_()).unwrap();
        let c3 = b.const_int(i32_(), 3).unwrap();
        b.build_store(c3, slot).unwrap();
        let loaded = b.build_load(i32_(), slot).unwrap();
        b.build_ret(Some(loaded)).unwrap();

        assert!(store_load_forward(&mut f));
        let ret_inst = *f.block_insts(entry).last().unwrap();
        assert_eq!(f.inst(ret_inst).operands()[0], c3);
    }

    #[test]
    fn distinct_allocas_never_alias_for_redundant_load() {
        let sig = Type::func(i32_(), &[], false);
        let mut f = Function::new("f".to_string(), Linkage::External, sig, false);
        let entry = f.entry_block();
        let mut b = FunctionBuilder::new(&mut f, 8);
        b.set_insert_point(entry);
        let p = b.build_alloca(i32_()).unwrap();
        let q = b.build_alloca(i32_()).unwrap();
        let t = b.build_load(i32_(), p).unwrap();
        let u = b.build_load(i32_(), q).unwrap();
        let sum = b.build_add(t, u).unwrap();
        b.build_ret(Some(sum)).unwrap();

        assert!(!redundant_load(&mut f));
    }
}
