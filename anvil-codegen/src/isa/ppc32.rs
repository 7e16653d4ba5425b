//! 32-bit PowerPC, big-endian, GAS-compatible output.

use crate::ir::Opcode;
use crate::isa::mnemonics;
use crate::isa::regwin::{Engine, RegisterWindowTarget};
use crate::isa::{AbiVariant, ArchInfo, Dialect, Endian, FpFormat, StackDirection};

pub(super) struct Ppc32;

impl RegisterWindowTarget for Ppc32 {
    fn arch_info(&self) -> ArchInfo {
        ArchInfo {
            name: "ppc32",
            addr_bits: 32,
            ptr_size: 4,
            word_size: 4,
            num_gpr: 32,
            num_fpr: 32,
            endian: Endian::Big,
            stack_dir: StackDirection::Down,
            fp_format: FpFormat::Ieee754,
            has_cond_codes: true,
            has_delay_slots: false,
        }
    }

    fn native_dialect(&self) -> Dialect {
        Dialect::Intel
    }

    fn arg_regs(&self) -> &'static [&'static str] {
        &["r3", "r4", "r5", "r6", "r7", "r8", "r9", "r10"]
    }

    fn ret_reg(&self) -> &'static str {
        "r3"
    }

    fn scratch_regs(&self) -> (&'static str, &'static str) {
        ("r11", "r12")
    }

    fn frame_reg(&self) -> &'static str {
        "r1"
    }

    fn stack_reg(&self) -> &'static str {
        "r1"
    }

    fn callee_saved(&self) -> &'static [&'static str] {
        &[
            "r14", "r15", "r16", "r17", "r18", "r19", "r20", "r21", "r22", "r23", "r24", "r25", "r26", "r27", "r28",
            "r29", "r30", "r31",
        ]
    }

    fn stack_alignment(&self) -> u32 {
        8
    }

    fn mnemonic(&self, op: Opcode) -> &'static str {
        mnemonics::ppc(op)
    }

    fn load_imm_mnemonic(&self) -> &'static str {
        "li"
    }

    fn lea_mnemonic(&self) -> &'static str {
        "addi"
    }

    fn branch_mnemonic(&self) -> &'static str {
        "b"
    }

    fn branch_if_nonzero_mnemonic(&self) -> &'static str {
        "bne"
    }

    fn call_mnemonic(&self) -> &'static str {
        "bl"
    }

    fn return_mnemonic(&self) -> &'static str {
        "blr"
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

pub(super) fn new() -> Engine<Ppc32> {
    Engine::new(Ppc32, AbiVariant::PowerOpen)
}
