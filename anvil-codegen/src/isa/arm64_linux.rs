//! ARM64, Linux (AAPCS64), GAS-compatible output.

use crate::ir::Opcode;
use crate::isa::mnemonics;
use crate::isa::regwin::{Engine, MemSyntax, RegisterWindowTarget};
use crate::isa::{AbiVariant, ArchInfo, Dialect, Endian, FpFormat, StackDirection};

pub(super) struct Arm64Linux;

impl RegisterWindowTarget for Arm64Linux {
    fn arch_info(&self) -> ArchInfo {
        ArchInfo {
            name: "arm64-linux",
            addr_bits: 64,
            ptr_size: 8,
            word_size: 8,
            num_gpr: 31,
            num_fpr: 32,
            endian: Endian::Little,
            stack_dir: StackDirection::Down,
            fp_format: FpFormat::Ieee754,
            has_cond_codes: true,
            has_delay_slots: false,
        }
    }

    fn native_dialect(&self) -> Dialect {
        Dialect::Intel
    }

    fn mem_syntax(&self, _dialect: Dialect) -> MemSyntax {
        // ARM64 has exactly one memory-operand syntax; `Dialect::Intel`
        // here is just this target's way of reaching the shared engine's
        // non-AT&T register/immediate formatting, not a real dialect
        // choice the way it is for x86.
        MemSyntax::ArmBracket
    }

    fn arg_regs(&self) -> &'static [&'static str] {
        &["x0", "x1", "x2", "x3", "x4", "x5", "x6", "x7"]
    }

    fn ret_reg(&self) -> &'static str {
        "x0"
    }

    fn scratch_regs(&self) -> (&'static str, &'static str) {
        ("x9", "x10")
    }

    fn frame_reg(&self) -> &'static str {
        "x29"
    }

    fn stack_reg(&self) -> &'static str {
        "sp"
    }

    fn callee_saved(&self) -> &'static [&'static str] {
        &["x19", "x20", "x21", "x22", "x23", "x24", "x25", "x26", "x27", "x28"]
    }

    fn stack_alignment(&self) -> u32 {
        16
    }

    fn mnemonic(&self, op: Opcode) -> &'static str {
        mnemonics::arm64(op)
    }

    fn load_imm_mnemonic(&self) -> &'static str {
        "mov"
    }

    fn lea_mnemonic(&self) -> &'static str {
        "adr"
    }

    fn branch_mnemonic(&self) -> &'static str {
        "b"
    }

    fn branch_if_nonzero_mnemonic(&self) -> &'static str {
        "cbnz"
    }

    fn call_mnemonic(&self) -> &'static str {
        "bl"
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

pub(super) fn new() -> Engine<Arm64Linux> {
    Engine::new(Arm64Linux, AbiVariant::Aapcs64)
}
