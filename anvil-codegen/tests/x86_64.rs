//! x86-64 (System V) codegen scenarios: prologue/epilogue shape, AT&T vs.
//! Intel dialect override, and the calling convention's register/stack
//! argument split.

use anvil_codegen::context::Context;
use anvil_codegen::ir::Linkage;
use anvil_codegen::isa::{Arch, Dialect};

#[test]
fn emits_att_syntax_by_default_and_accepts_an_intel_override() {
    let mut ctx = Context::new();
    ctx.set_target(Arch::X86_64).unwrap();

    let m = ctx.create_module("m");
    let i32_ = ctx.i32();
    let sig = ctx.type_func(i32_.clone(), &[i32_.clone()], false);
    let f = ctx.module_mut(m).add_function("identity", Linkage::External, sig);
    {
        let module = ctx.module_mut(m);
        let func = module.func_mut(f);
        let entry = func.entry_block();
        let mut b = anvil_codegen::builder::FunctionBuilder::new(func, 8);
        b.set_insert_point(entry);
        let x = b.param(0).unwrap();
        b.build_ret(Some(x)).unwrap();
    }

    let att = ctx.codegen(m).unwrap();
    assert!(att.contains("%rbp"), "AT&T registers are %-prefixed:\n{att}");
    assert!(att.contains(".globl identity"));
    assert!(att.contains("identity:"));

    ctx.set_syntax(Dialect::Intel).unwrap();
    let intel = ctx.codegen(m).unwrap();
    assert!(!intel.contains('%'), "Intel dialect must drop the %-register prefix:\n{intel}");
}

/// Seven integer arguments: the first six travel in `arg_regs`, the
/// seventh is called out as an outgoing stack argument.
#[test]
fn seventh_integer_argument_spills_to_the_stack() {
    let mut ctx = Context::new();
    ctx.set_target(Arch::X86_64).unwrap();
    let m = ctx.create_module("m");
    let i32_ = ctx.i32();
    let params = vec![i32_.clone(); 7];
    let sig = ctx.type_func(i32_.clone(), &params, false);
    let f = ctx.module_mut(m).add_function("seven_args", Linkage::External, sig);
    {
        let module = ctx.module_mut(m);
        let func = module.func_mut(f);
        let entry = func.entry_block();
        let mut b = anvil_codegen::builder::FunctionBuilder::new(func, 8);
        b.set_insert_point(entry);
        let last = b.param(6).unwrap();
        b.build_ret(Some(last)).unwrap();
    }
    let text = ctx.codegen(m).unwrap();
    assert!(text.contains("parameter 6 arrives on the stack"), "{text}");
}

/// A function that calls another: the callee's symbol appears as a `call`
/// target and the return value is moved out of `%rax`.
#[test]
fn call_sequencing_names_the_callee_and_moves_the_return_value() {
    let mut ctx = Context::new();
    ctx.set_target(Arch::X86_64).unwrap();
    let m = ctx.create_module("m");
    let i32_ = ctx.i32();
    let callee_sig = ctx.type_func(i32_.clone(), &[i32_.clone()], false);
    let callee = ctx.module_mut(m).add_extern("helper", callee_sig.clone());

    let caller_sig = ctx.type_func(i32_.clone(), &[i32_.clone()], false);
    let caller = ctx.module_mut(m).add_function("caller", Linkage::External, caller_sig);
    {
        let module = ctx.module_mut(m);
        let func = module.func_mut(caller);
        let entry = func.entry_block();
        let mut b = anvil_codegen::builder::FunctionBuilder::new(func, 8);
        b.set_insert_point(entry);
        let x = b.param(0).unwrap();
        let callee_ref = b.func_ref(callee, callee_sig.clone());
        let result = b.build_call(callee_ref, &callee_sig, &[x]).unwrap();
        b.build_ret(Some(result)).unwrap();
    }

    let text = ctx.codegen(m).unwrap();
    assert!(text.contains("call helper"), "{text}");
}

/// Every backend accepts the full opcode set without erroring; an ARM64
/// backend does not appear here since this file is x86-64-only, but the
/// x86-64 backend's own `fp_format`/`abi` overrides are exercised for
/// rejection on out-of-family inputs.
#[test]
fn fp_format_is_fixed_to_ieee754() {
    let mut ctx = Context::new();
    ctx.set_target(Arch::X86_64).unwrap();
    assert!(ctx.set_fp_format(anvil_codegen::isa::FpFormat::Hfp).is_err());
    assert!(ctx.set_fp_format(anvil_codegen::isa::FpFormat::Ieee754).is_ok());
}
