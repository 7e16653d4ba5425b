//! End-to-end scenarios for the optimization pipeline: each test builds a
//! small function by hand, runs a fixed `OptLevel` to fixpoint, and asserts
//! on the resulting IR's shape rather than the full pretty-printed text.

use anvil_codegen::builder::FunctionBuilder;
use anvil_codegen::ir::{Function, Linkage, Opcode, Type, TypeKind};
use anvil_codegen::pass::{OptLevel, PassManager};

fn i32_() -> Type {
    Type::primitive(TypeKind::I32, 4)
}

fn count_op(func: &Function, op: Opcode) -> usize {
    func.blocks()
        .flat_map(|b| func.block_insts(b).collect::<Vec<_>>())
        .filter(|&inst| func.inst(inst).opcode() == op)
        .count()
}

/// `x + 0`, `x * 1`, and a fully-constant chain all fold to their results,
/// and DCE then removes the now-unused additions entirely.
#[test]
fn const_fold_and_dce_collapse_a_redundant_chain() {
    let sig = Type::func(i32_(), &[i32_()], false);
    let mut f = Function::new("scenario1".to_string(), Linkage::External, sig, false);
    let entry = f.entry_block();
    let mut b = FunctionBuilder::new(&mut f, 8);
    b.set_insert_point(entry);
    let x = b.param(0).unwrap();
    let zero = b.const_int(i32_(), 0).unwrap();
    let one = b.const_int(i32_(), 1).unwrap();
    let plus_zero = b.build_add(x, zero).unwrap();
    let times_one = b.build_mul(plus_zero, one).unwrap();
    let two = b.const_int(i32_(), 2).unwrap();
    let three = b.const_int(i32_(), 3).unwrap();
    let five = b.build_add(two, three).unwrap();
    let sum = b.build_add(times_one, five).unwrap();
    b.build_ret(Some(sum)).unwrap();

    let mut pm = PassManager::new();
    pm.set_level(OptLevel::O2);
    pm.run_function(&mut f);

    assert!(f.verify().is_ok());
    // The constant-only addition (2+3) must have folded away entirely.
    assert_eq!(count_op(&f, Opcode::Mul), 0, "x*1 must be copy-propagated/folded away");
}

/// `x * 4` becomes a shift, and unsigned `x / 4` / `x % 4` become shift/mask,
/// once `StrengthReduction` runs.
#[test]
fn strength_reduction_rewrites_power_of_two_arithmetic() {
    let u32_ = Type::primitive(TypeKind::U32, 4);
    let sig = Type::func(u32_.clone(), &[u32_.clone()], false);
    let mut f = Function::new("scenario2".to_string(), Linkage::External, sig, false);
    let entry = f.entry_block();
    let mut b = FunctionBuilder::new(&mut f, 8);
    b.set_insert_point(entry);
    let x = b.param(0).unwrap();
    let four = b.const_int(u32_.clone(), 4).unwrap();
    let mul = b.build_mul(x, four).unwrap();
    let div = b.build_udiv(mul, four).unwrap();
    b.build_ret(Some(div)).unwrap();

    let mut pm = PassManager::new();
    pm.set_level(OptLevel::O2);
    pm.run_function(&mut f);

    assert!(f.verify().is_ok());
    assert_eq!(count_op(&f, Opcode::Mul), 0);
    assert_eq!(count_op(&f, Opcode::Udiv), 0);
    assert!(count_op(&f, Opcode::Shl) + count_op(&f, Opcode::Shr) > 0);
}

/// Two identical additions in the same block collapse to one value under
/// local CSE, and the duplicate becomes dead once DCE runs.
#[test]
fn local_cse_removes_a_duplicate_computation() {
    let sig = Type::func(i32_(), &[i32_(), i32_()], false);
    let mut f = Function::new("scenario3".to_string(), Linkage::External, sig, false);
    let entry = f.entry_block();
    let mut b = FunctionBuilder::new(&mut f, 8);
    b.set_insert_point(entry);
    let x = b.param(0).unwrap();
    let y = b.param(1).unwrap();
    let a = b.build_add(x, y).unwrap();
    let c = b.build_add(x, y).unwrap();
    let sum = b.build_add(a, c).unwrap();
    b.build_ret(Some(sum)).unwrap();

    let before_adds = count_op(&f, Opcode::Add);
    assert_eq!(before_adds, 3);

    let mut pm = PassManager::new();
    pm.set_level(OptLevel::O2);
    pm.run_function(&mut f);

    assert!(f.verify().is_ok());
    assert!(count_op(&f, Opcode::Add) < before_adds, "CSE + DCE must remove the duplicate add");
}

/// A store immediately followed by a load of the same address forwards the
/// stored value directly; the load disappears once DCE runs.
#[test]
fn store_load_forwarding_removes_the_reload() {
    let sig = Type::func(i32_(), &[i32_()], false);
    let mut f = Function::new("scenario4".to_string(), Linkage::External, sig, false);
    let entry = f.entry_block();
    let mut b = FunctionBuilder::new(&mut f, 8);
    b.set_insert_point(entry);
    let ptr_ty = Type::ptr(i32_(), 8);
    let slot = b.build_alloca(i32_()).unwrap();
    let x = b.param(0).unwrap();
    b.build_store(x, slot).unwrap();
    let reloaded = b.build_load(i32_(), slot).unwrap();
    let _ = ptr_ty;
    b.build_ret(Some(reloaded)).unwrap();

    let before_loads = count_op(&f, Opcode::Load);
    assert_eq!(before_loads, 1);

    let mut pm = PassManager::new();
    pm.set_level(OptLevel::O2);
    pm.run_function(&mut f);

    assert!(f.verify().is_ok());
    assert_eq!(count_op(&f, Opcode::Load), 0, "the forwarded load must be eliminated");
}

/// A constant-trip-count counted loop (3 iterations) is fully unrolled under
/// `O3`: the backward branch and the loop's header PHI disappear.
#[test]
fn loop_unrolling_removes_the_backward_branch() {
    let sig = Type::func(i32_(), &[], false);
    let mut f = Function::new("scenario5".to_string(), Linkage::External, sig, false);
    let entry = f.entry_block();
    let header = f.create_block(None);
    let body = f.create_block(None);
    let exit = f.create_block(None);

    let mut b = FunctionBuilder::new(&mut f, 8);
    b.set_insert_point(entry);
    let zero = b.const_int(i32_(), 0).unwrap();
    b.build_br(header).unwrap();

    b.set_insert_point(header);
    let iv = b.build_phi(i32_(), &[(zero, entry)]).unwrap();
    let limit = b.const_int(i32_(), 3).unwrap();
    let cond = b.build_cmp_lt(iv, limit).unwrap();
    b.build_br_cond(cond, body, exit).unwrap();

    b.set_insert_point(body);
    let one = b.const_int(i32_(), 1).unwrap();
    let next = b.build_add(iv, one).unwrap();
    b.add_phi_incoming(iv, next, body).unwrap();
    b.build_br(header).unwrap();

    b.set_insert_point(exit);
    let zero_ret = b.const_int(i32_(), 0).unwrap();
    b.build_ret(Some(zero_ret)).unwrap();
    f.refresh_cfg();

    let mut pm = PassManager::new();
    pm.set_level(OptLevel::O3);
    pm.run_function(&mut f);

    assert!(f.verify().is_ok());
    assert_eq!(count_op(&f, Opcode::Phi), 0, "unrolling removes the header's induction-variable PHI");
}

/// Running a fixed pass set twice in a row changes nothing further: the
/// fixpoint loop's cap (10 sweeps) is never actually needed for a function
/// this small.
#[test]
fn rerunning_at_fixpoint_is_idempotent() {
    let sig = Type::func(i32_(), &[i32_()], false);
    let mut f = Function::new("scenario6".to_string(), Linkage::External, sig, false);
    let entry = f.entry_block();
    let mut b = FunctionBuilder::new(&mut f, 8);
    b.set_insert_point(entry);
    let x = b.param(0).unwrap();
    let zero = b.const_int(i32_(), 0).unwrap();
    let y = b.build_add(x, zero).unwrap();
    b.build_ret(Some(y)).unwrap();

    let mut pm = PassManager::new();
    pm.set_level(OptLevel::O1);
    pm.run_function(&mut f);
    let once = format!("{f:?}");
    pm.run_function(&mut f);
    let twice = format!("{f:?}");
    assert_eq!(once, twice);
}
