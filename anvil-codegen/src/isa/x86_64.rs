//! x86-64, System V ABI, GAS/NASM-compatible output.

use crate::ir::Opcode;
use crate::isa::mnemonics::{self, Width};
use crate::isa::regwin::{Engine, MemSyntax, RegisterWindowTarget};
use crate::isa::{AbiVariant, ArchInfo, Dialect, Endian, FpFormat, StackDirection};

pub(super) struct X86_64;

impl RegisterWindowTarget for X86_64 {
    fn arch_info(&self) -> ArchInfo {
        ArchInfo {
            name: "x86-64",
            addr_bits: 64,
            ptr_size: 8,
            word_size: 8,
            num_gpr: 16,
            num_fpr: 16,
            endian: Endian::Little,
            stack_dir: StackDirection::Down,
            fp_format: FpFormat::Ieee754,
            has_cond_codes: true,
            has_delay_slots: false,
        }
    }

    fn native_dialect(&self) -> Dialect {
        Dialect::Att
    }

    fn allows_dialect_override(&self) -> bool {
        true
    }

    fn mem_syntax(&self, dialect: Dialect) -> MemSyntax {
        match dialect {
            Dialect::Att => MemSyntax::OffsetParen,
            _ => MemSyntax::X86Bracket,
        }
    }

    fn arg_regs(&self) -> &'static [&'static str] {
        &["rdi", "rsi", "rdx", "rcx", "r8", "r9"]
    }

    fn ret_reg(&self) -> &'static str {
        "rax"
    }

    fn scratch_regs(&self) -> (&'static str, &'static str) {
        ("rax", "r11")
    }

    fn frame_reg(&self) -> &'static str {
        "rbp"
    }

    fn stack_reg(&self) -> &'static str {
        "rsp"
    }

    fn callee_saved(&self) -> &'static [&'static str] {
        &["rbx", "r12", "r13", "r14", "r15"]
    }

    fn stack_alignment(&self) -> u32 {
        16
    }

    fn mnemonic(&self, op: Opcode) -> &'static str {
        mnemonics::x86(op, Width::W64)
    }

    fn load_imm_mnemonic(&self) -> &'static str {
        "movq"
    }

    fn lea_mnemonic(&self) -> &'static str {
        "leaq"
    }

    fn branch_mnemonic(&self) -> &'static str {
        "jmp"
    }

    fn branch_if_nonzero_mnemonic(&self) -> &'static str {
        "jnz"
    }

    fn call_mnemonic(&self) -> &'static str {
        "call"
    }

    fn return_mnemonic(&self) -> &'static str {
        "ret"
    }

    fn text_section(&self) -> &'static str {
        ".text"
    }

    fn data_section(&self) -> &'static str {
        ".data"
    }

    fn globl_directive(&self) -> &'static str {
        ".globl"
    }
}

pub(super) fn new() -> Engine<X86_64> {
    Engine::new(X86_64, AbiVariant::SystemV)
}
