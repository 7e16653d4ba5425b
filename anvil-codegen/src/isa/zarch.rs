//! IBM z/Architecture: 64-bit addressing, HFP and IEEE-754 both fully
//! supported, a 144-byte save area, HLASM output.
//!
//! The current IBM mainframe architecture: 64-bit general registers and
//! addressing widen every other family member's 31-bit (or 24-bit) reach,
//! and the save area grows from 72 to 144 bytes to hold the doubled
//! register width. Unlike S/390, where
//! IEEE-754 is the newer, secondary option, z/Architecture treats both
//! formats as first-class and defaults to IEEE-754 to match the format
//! most z/OS and Linux-on-Z toolchains emit by default today.

use crate::isa::hlasm::{Engine, MainframeTarget};
use crate::isa::{AbiVariant, ArchInfo, Endian, FpFormat, StackDirection};

pub(super) struct ZArch;

impl MainframeTarget for ZArch {
    fn arch_info(&self) -> ArchInfo {
        ArchInfo {
            name: "z/Architecture",
            addr_bits: 64,
            ptr_size: 8,
            word_size: 8,
            num_gpr: 16,
            num_fpr: 16,
            endian: Endian::Big,
            stack_dir: StackDirection::Up,
            fp_format: FpFormat::Ieee754,
            has_cond_codes: true,
            has_delay_slots: false,
        }
    }

    fn addr_mode(&self) -> &'static str {
        "64"
    }

    fn save_area_size(&self) -> u32 {
        144
    }

    fn supported_fp_formats(&self) -> &'static [FpFormat] {
        &[FpFormat::Hfp, FpFormat::Ieee754, FpFormat::Both]
    }

    fn default_fp_format(&self) -> FpFormat {
        FpFormat::Ieee754
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

pub(super) fn new() -> Engine<ZArch> {
    Engine::new(ZArch, AbiVariant::MainframeLinkage)
}
