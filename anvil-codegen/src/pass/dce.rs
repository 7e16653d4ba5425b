//! Dead code elimination: remove instructions whose result has no uses
//! and whose opcode has no side effect.

use crate::ir::Function;
use crate::pass::use_count;

/// Remove every instruction with zero uses of its result and no side
/// effects.
/// Unlike the other passes, which mark an instruction `NOP` and leave it
/// linked for a later DCE sweep to physically remove, this pass unlinks
/// directly — it is the one pass responsible for shrinking the block's
/// instruction list.
pub(super) fn dce(func: &mut Function) -> bool {
    let mut changed = false;
    loop {
        let dead: Vec<_> = func
            .blocks()
            .flat_map(|b| func.block_insts(b).collect::<Vec<_>>())
            .filter(|&inst| {
                let data = func.inst(inst);
                if data.opcode() == crate::ir::Opcode::Nop {
                    return true;
                }
                match data.result() {
                    Some(result) => !data.opcode().has_side_effects() && use_count(func, result) == 0,
                    None => false,
                }
            })
            .collect();
        if dead.is_empty() {
            break;
        }
        for inst in dead {
            func.unlink_inst(inst);
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
    fn removes_exactly_one_unused_add_then_is_idempotent() {
        let sig = Type::func(i32_(), &[i32_(), i32_()], false);
        let mut f = Function::new("f".to_string(), Linkage::External, sig, false);
        let entry = f.entry_block();
        let mut b = FunctionBuilder::new(&mut f, 8);
        b.set_insert_point(entry);
        let a = b.param(0).unwrap();
        let c = b.param(1).unwrap();
        let _unused = b.build_add(a, c).unwrap();
        let zero = b.const_int(i32_(), 0).unwrap();
        b.build_ret(Some(zero)).unwrap();

        let before = f.block_insts(entry).count();
        assert!(dce(&mut f));
        let after = f.block_insts(entry).count();
        assert_eq!(before - after, 1);

        assert!(!dce(&mut f));
    }

    #[test]
    fn a_store_is_never_removed_even_with_no_uses() {
        let sig = Type::func(Type::void(), &[], false);
        let mut f = Function::new("f".to_string(), Linkage::External, sig, false);
        let entry = f.entry_block();
        let mut b = FunctionBuilder::new(&mut f, 8);
        b.set_insert_point(entry);
        let slot = b.build_alloca(i32_()).unwrap();
        let v = b.const_int(i32_(), 1).unwrap();
        b.build_store(v, slot).unwrap();
        b.build_ret(None).unwrap();

        let before = f.block_insts(entry).count();
        dce(&mut f);
        assert_eq!(f.block_insts(entry).count(), before);
    }
}
