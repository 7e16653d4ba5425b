//! IBM mainframe family codegen scenarios: HLASM column formatting, the
//! chained-save-area/arg-list-pointer calling convention, and per-target
//! floating-point format support (S/370 and S/370-XA are HFP-only, S/390
//! adds IEEE-754 as an option, z/Architecture defaults to it).

use anvil_codegen::builder::FunctionBuilder;
use anvil_codegen::context::Context;
use anvil_codegen::ir::Linkage;
use anvil_codegen::isa::{Arch, Dialect, FpFormat};

fn build_add_one_module(ctx: &mut Context) -> usize {
    let m = ctx.create_module("demo");
    let i32_ = ctx.i32();
    let sig = ctx.type_func(i32_.clone(), &[i32_.clone()], false);
    let f = ctx.module_mut(m).add_function("addone", Linkage::External, sig);
    let module = ctx.module_mut(m);
    let func = module.func_mut(f);
    let entry = func.entry_block();
    let mut b = FunctionBuilder::new(func, 4);
    b.set_insert_point(entry);
    let x = b.param(0).unwrap();
    let one = b.const_int(i32_, 1).unwrap();
    let sum = b.build_add(x, one).unwrap();
    b.build_ret(Some(sum)).unwrap();
    m
}

#[test]
fn s370_emits_a_csect_header_and_uppercased_chained_save_area_prologue() {
    let mut ctx = Context::new();
    ctx.set_target(Arch::S370).unwrap();
    let m = build_add_one_module(&mut ctx);
    let text = ctx.codegen(m).unwrap();

    assert!(text.contains("DEMO     CSECT"), "module name uppercased in the CSECT header:\n{text}");
    assert!(text.contains("AMODE 24"), "{text}");
    assert!(text.contains("RMODE 24"), "{text}");
    assert!(text.contains("ADDONE"), "function name uppercased:\n{text}");
    assert!(text.contains("STM"), "chained save-area prologue uses STM:\n{text}");
    assert!(text.contains("BR") && text.contains("R14"), "returns via BR on the link register:\n{text}");
    assert!(text.contains("END"), "module ends with an END directive:\n{text}");
}

#[test]
fn mainframe_backends_have_a_fixed_hlasm_dialect() {
    let mut ctx = Context::new();
    ctx.set_target(Arch::S390).unwrap();
    assert!(ctx.set_syntax(Dialect::Att).is_err());
    assert!(ctx.set_syntax(Dialect::Hlasm).is_err(), "even re-selecting HLASM explicitly is rejected; the dialect is fixed, not merely defaulted");
}

/// S/370 and S/370-XA only ever had a hexadecimal floating-point unit;
/// asking either for IEEE-754 must fail.
#[test]
fn s370_family_rejects_ieee754() {
    for arch in [Arch::S370, Arch::S370xa] {
        let mut ctx = Context::new();
        ctx.set_target(arch).unwrap();
        assert_eq!(ctx.arch_info().unwrap().fp_format, FpFormat::Hfp);
        assert!(ctx.set_fp_format(FpFormat::Ieee754).is_err(), "{arch} has no IEEE-754 unit");
        assert!(ctx.set_fp_format(FpFormat::Hfp).is_ok());
    }
}

/// S/390 added a binary floating-point unit alongside the legacy
/// hexadecimal one; both formats are now selectable, defaulting to HFP.
#[test]
fn s390_supports_both_formats_defaulting_to_hfp() {
    let mut ctx = Context::new();
    ctx.set_target(Arch::S390).unwrap();
    assert_eq!(ctx.arch_info().unwrap().fp_format, FpFormat::Hfp);
    assert!(ctx.set_fp_format(FpFormat::Ieee754).is_ok());
    assert!(ctx.set_fp_format(FpFormat::Hfp).is_ok());
}

/// z/Architecture defaults to IEEE-754, matching modern Linux-on-Z/z-OS
/// toolchains, while still accepting HFP and `Both`.
#[test]
fn zarch_defaults_to_ieee754_but_accepts_hfp_and_both() {
    let mut ctx = Context::new();
    ctx.set_target(Arch::ZArch).unwrap();
    assert_eq!(ctx.arch_info().unwrap().fp_format, FpFormat::Ieee754);
    assert!(ctx.set_fp_format(FpFormat::Hfp).is_ok());
    assert!(ctx.set_fp_format(FpFormat::Both).is_ok());
}

/// 24-bit (S/370), 31-bit (S/370-XA, S/390), and 64-bit (z/Architecture)
/// addressing modes are each reflected in the emitted `AMODE`/`RMODE`
/// directives.
#[test]
fn addressing_mode_widens_across_the_family() {
    let cases = [
        (Arch::S370, "24"),
        (Arch::S370xa, "31"),
        (Arch::S390, "31"),
        (Arch::ZArch, "64"),
    ];
    for (arch, mode) in cases {
        let mut ctx = Context::new();
        ctx.set_target(arch).unwrap();
        let m = build_add_one_module(&mut ctx);
        let text = ctx.codegen(m).unwrap();
        assert!(text.contains(&format!("AMODE {mode}")), "{arch} should emit AMODE {mode}:\n{text}");
    }
}

/// A call through the arg-list-pointer convention: the callee's name is
/// uppercased, reached via `BAL`, and the argument travels as an address
/// rather than directly in a register.
#[test]
fn call_uses_the_arg_list_pointer_convention() {
    let mut ctx = Context::new();
    ctx.set_target(Arch::ZArch).unwrap();
    let m = ctx.create_module("demo");
    let i32_ = ctx.i32();
    let callee_sig = ctx.type_func(i32_.clone(), &[i32_.clone()], false);
    let callee = ctx.module_mut(m).add_extern("helper", callee_sig.clone());
    let caller_sig = ctx.type_func(i32_.clone(), &[i32_.clone()], false);
    let caller = ctx.module_mut(m).add_function("caller", Linkage::External, caller_sig);
    {
        let module = ctx.module_mut(m);
        let func = module.func_mut(caller);
        let entry = func.entry_block();
        let mut b = FunctionBuilder::new(func, 8);
        b.set_insert_point(entry);
        let x = b.param(0).unwrap();
        let callee_ref = b.func_ref(callee, callee_sig.clone());
        let result = b.build_call(callee_ref, &callee_sig, &[x]).unwrap();
        b.build_ret(Some(result)).unwrap();
    }
    let text = ctx.codegen(m).unwrap();
    assert!(text.contains("BAL"), "{text}");
    assert!(text.contains("HELPER"), "callee symbol is uppercased:\n{text}");
    assert!(text.contains("build 1-entry argument list"), "{text}");
}
