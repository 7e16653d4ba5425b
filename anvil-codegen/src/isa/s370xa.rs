//! IBM System/370-XA: 31-bit addressing, IBM Hexadecimal Floating-Point
//! only, HLASM output.
//!
//! Extended Architecture widens addressing from 24 to 31 bits but keeps
//! S/370's save-area shape and HFP-only floating-point unit; only
//! [`MainframeTarget::addr_mode`] differs from [`super::s370::S370`].

use crate::isa::hlasm::{Engine, MainframeTarget};
use crate::isa::{AbiVariant, ArchInfo, Endian, FpFormat, StackDirection};

pub(super) struct S370xa;

impl MainframeTarget for S370xa {
    fn arch_info(&self) -> ArchInfo {
        ArchInfo {
            name: "s370xa",
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
        &[FpFormat::Hfp]
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

pub(super) fn new() -> Engine<S370xa> {
    Engine::new(S370xa, AbiVariant::MainframeLinkage)
}
