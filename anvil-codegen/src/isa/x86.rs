//! 32-bit x86, cdecl calling convention, GAS/NASM-compatible output.

use crate::ir::Opcode;
use crate::isa::mnemonics::{self, Width};
use crate::isa::regwin::{Engine, MemSyntax, RegisterWindowTarget};
use crate::isa::{AbiVariant, ArchInfo, Dialect, Endian, FpFormat, StackDirection};

pub(super) struct X86;

impl RegisterWindowTarget for X86 {
    fn arch_info(&self) -> ArchInfo {
        ArchInfo {
            name: "x86",
            addr_bits: 32,
            ptr_size: 4,
            word_size: 4,
            num_gpr: 8,
            num_fpr: 8,
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
        // cdecl: every argument is passed on the stack.
        &[]
    }

    fn ret_reg(&self) -> &'static str {
        "eax"
    }

    fn scratch_regs(&self) -> (&'static str, &'static str) {
        ("ecx", "edx")
    }

    fn frame_reg(&self) -> &'static str {
        "ebp"
    }

    fn stack_reg(&self) -> &'static str {
        "esp"
    }

    fn callee_saved(&self) -> &'static [&'static str] {
        &["ebx", "esi", "edi"]
    }

    fn stack_alignment(&self) -> u32 {
        4
    }

    fn mnemonic(&self, op: Opcode) -> &'static str {
        mnemonics::x86(op, Width::W32)
    }

    fn load_imm_mnemonic(&self) -> &'static str {
        "movl"
    }

    fn lea_mnemonic(&self) -> &'static str {
        "leal"
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

pub(super) fn new() -> Engine<X86> {
    Engine::new(X86, AbiVariant::Cdecl)
}
