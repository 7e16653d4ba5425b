//! IBM System/390: 31-bit addressing, HFP with optional IEEE-754, HLASM
//! output.
//!
//! The first mainframe generation in this family with a binary
//! floating-point unit alongside the legacy hexadecimal one; a context may
//! switch between them with `Context::set_fp_format`, but HFP remains the
//! default to match real S/390 toolchains that predate widespread IEEE-754
//! adoption.

use crate::isa::hlasm::{Engine, MainframeTarget};
use crate::isa::{AbiVariant, ArchInfo, Endian, FpFormat, StackDirection};

pub(super) struct S390;

impl MainframeTarget for S390 {
    fn arch_info(&self) -> ArchInfo {
        ArchInfo {
            name: "s390",
            addr_bits: 31,
            ptr_size: 4,
            word_size: 4,
            num_gpr: 16,
            num_fpr: 4,
            endian: Endian::Big,
            stack_dir: StackDirection::Up,
            fp_format: FpFormat::Hfp,
            has_cond_codes: true,
            has_delay_slots: false,
        }
    }

    fn addr_mode(&self) -> &'static str {
        "31"
    }

    fn save_area_size(&self) -> u32 {
        72
    }

    fn supported_fp_formats(&self) -> &'static [FpFormat] {
        &[FpFormat::Hfp, FpFormat::Ieee754]
    }

    fn default_fp_format(&self) -> FpFormat {
        FpFormat::Hfp
    }

    fn scratch_regs(&self) -> (&'static str, &'static str) {
        ("R2", "R3")
    }

    fn frame_reg(&self) -> &'static str {
        "R13"
    }

    fn arglist_reg(&self) -> &'static str {
        "R1"
    }

    fn ret_reg(&self) -> &'static str {
        "R15"
    }

    fn link_reg(&self) -> &'static str {
        "R14"
    }
}

pub(super) fn new() -> Engine<S390> {
    Engine::new(S390, AbiVariant::MainframeLinkage)
}
