//! ARM64 codegen scenarios, across both Linux and Darwin targets: AAPCS64
//! register usage and Darwin's underscore-prefixed symbol convention are
//! the only things that differ between the two.

use anvil_codegen::builder::FunctionBuilder;
use anvil_codegen::context::Context;
use anvil_codegen::ir::Linkage;
use anvil_codegen::isa::Arch;

fn build_add_one_module(ctx: &mut Context) -> usize {
    let m = ctx.create_module("m");
    let i32_ = ctx.i32();
    let sig = ctx.type_func(i32_.clone(), &[i32_.clone()], false);
    let f = ctx.module_mut(m).add_function("add_one", Linkage::External, sig);
    let module = ctx.module_mut(m);
    let func = module.func_mut(f);
    let entry = func.entry_block();
    let mut b = FunctionBuilder::new(func, 8);
    b.set_insert_point(entry);
    let x = b.param(0).unwrap();
    let one = b.const_int(i32_, 1).unwrap();
    let sum = b.build_add(x, one).unwrap();
    b.build_ret(Some(sum)).unwrap();
    m
}

#[test]
fn linux_emits_bare_symbols_and_x_registers() {
    let mut ctx = Context::new();
    ctx.set_target(Arch::Arm64Linux).unwrap();
    let m = build_add_one_module(&mut ctx);
    let text = ctx.codegen(m).unwrap();
    assert!(text.contains(".globl add_one"), "{text}");
    assert!(text.contains("add_one:"), "{text}");
    assert!(text.contains("x9") || text.contains("x10"), "scratch registers should appear:\n{text}");
    assert!(!text.contains("_add_one"), "Linux must not underscore-prefix the symbol:\n{text}");
}

#[test]
fn darwin_underscore_prefixes_every_exported_symbol() {
    let mut ctx = Context::new();
    ctx.set_target(Arch::Arm64Darwin).unwrap();
    let m = build_add_one_module(&mut ctx);
    let text = ctx.codegen(m).unwrap();
    assert!(text.contains(".globl _add_one"), "{text}");
    assert!(text.contains("_add_one:"), "{text}");
}

/// Both ARM64 targets share the AAPCS64 calling convention and reject a
/// dialect override (ARM64 has no AT&T/Intel toggle, unlike the x86
/// family).
#[test]
fn arm64_backends_have_a_fixed_dialect() {
    use anvil_codegen::isa::Dialect;
    for arch in [Arch::Arm64Linux, Arch::Arm64Darwin] {
        let mut ctx = Context::new();
        ctx.set_target(arch).unwrap();
        assert!(ctx.set_syntax(Dialect::Att).is_err(), "{arch} must reject a dialect override");
    }
}

/// The same module, lowered for both Linux and Darwin, produces different
/// text only where the ABI says it should (the symbol name); the
/// instruction stream underneath is identical.
#[test]
fn linux_and_darwin_differ_only_in_symbol_naming() {
    let mut linux_ctx = Context::new();
    linux_ctx.set_target(Arch::Arm64Linux).unwrap();
    let lm = build_add_one_module(&mut linux_ctx);
    let linux_text = linux_ctx.codegen(lm).unwrap();

    let mut darwin_ctx = Context::new();
    darwin_ctx.set_target(Arch::Arm64Darwin).unwrap();
    let dm = build_add_one_module(&mut darwin_ctx);
    let darwin_text = darwin_ctx.codegen(dm).unwrap();

    let linux_lines = linux_text.lines().count();
    let darwin_lines = darwin_text.lines().count();
    assert_eq!(linux_lines, darwin_lines, "no structural difference beyond symbol naming is expected");
}
