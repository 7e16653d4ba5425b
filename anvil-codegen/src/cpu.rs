//! CPU model selection and feature-bitset plumbing.
//!
//! This is the "CPU model sub-API (auxiliary, ... implemented in full in
//! this port rather than stubbed)" from `SPEC_FULL.md` §6: a target
//! architecture (`crate::isa::Arch`) fixes the instruction set; a
//! [`CpuModel`] within that architecture's family further fixes which
//! optional instruction-set extensions are on by default, and individual
//! bits can be overridden from that default with
//! [`crate::Context::enable_feature`]/[`crate::Context::disable_feature`].
//! Feature bits are partitioned into disjoint ranges of one `u64` mask,
//! one range per architecture family, so a feature bit is never
//! ambiguous between e.g. a PPC extension and an x86 one even though
//! both are plain `u64` values.

use std::fmt;

/// A CPU model: a named point within one architecture family that fixes a
/// default feature set. `Generic` is the `Context` default and names no
/// extensions beyond the architecture's mandatory baseline.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CpuModel {
    /// No model-specific extensions; the architecture's own baseline only.
    Generic,
    /// Generic x86/x86-64 with MMX/SSE2 (the universal x86-64 baseline).
    X86Generic,
    /// x86-64 with SSE4.2 and POPCNT.
    X86Nehalem,
    /// x86-64 with AVX2.
    X86Haswell,
    /// Generic 32/64-bit PowerPC.
    PpcGeneric,
    /// POWER8 and later: adds the VSX vector-scalar extension.
    Power8,
    /// IBM System/370 baseline (no optional facilities modeled).
    S370Generic,
    /// IBM System/390 with the IEEE Floating-Point Facility.
    S390G5,
    /// z/Architecture baseline (z900-class).
    ZArchGeneric,
    /// z/Architecture with the General-Instructions-Extension and
    /// Decimal-Floating-Point facilities (z10-class).
    ZArchZ10,
    /// Generic ARMv8-A (AAPCS64 baseline, NEON mandatory).
    Arm64Generic,
    /// ARMv8.1-A with the Large System Extensions (LSE atomics).
    Arm64Lse,
}

impl CpuModel {
    /// This model's human-readable name, matching `cpu_model_name`'s
    /// contract in §6.
    pub fn name(self) -> &'static str {
        match self {
            CpuModel::Generic => "generic",
            CpuModel::X86Generic => "x86-generic",
            CpuModel::X86Nehalem => "nehalem",
            CpuModel::X86Haswell => "haswell",
            CpuModel::PpcGeneric => "ppc-generic",
            CpuModel::Power8 => "power8",
            CpuModel::S370Generic => "s370-generic",
            CpuModel::S390G5 => "s390-g5",
            CpuModel::ZArchGeneric => "zarch-generic",
            CpuModel::ZArchZ10 => "z10",
            CpuModel::Arm64Generic => "arm64-generic",
            CpuModel::Arm64Lse => "arm64-lse",
        }
    }

    /// This model's default feature bitset.
    pub fn default_features(self) -> CpuFeatures {
        let bits = match self {
            CpuModel::Generic => 0,
            CpuModel::X86Generic => x86::SSE2,
            CpuModel::X86Nehalem => x86::SSE2 | x86::SSE4_2 | x86::POPCNT,
            CpuModel::X86Haswell => x86::SSE2 | x86::SSE4_2 | x86::POPCNT | x86::AVX2,
            CpuModel::PpcGeneric => 0,
            CpuModel::Power8 => ppc::VSX | ppc::ALTIVEC,
            CpuModel::S370Generic => 0,
            CpuModel::S390G5 => mainframe::IEEE_FP,
            CpuModel::ZArchGeneric => mainframe::IEEE_FP,
            CpuModel::ZArchZ10 => mainframe::IEEE_FP | mainframe::GENERAL_INSTR_EXT | mainframe::DECIMAL_FP,
            CpuModel::Arm64Generic => arm64::NEON,
            CpuModel::Arm64Lse => arm64::NEON | arm64::LSE,
        };
        CpuFeatures(bits)
    }
}

impl fmt::Display for CpuModel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Disjoint bit ranges, one per architecture family, so a raw `u64`
/// feature bit can never be mistaken for a different family's bit at the
/// same numeric position.
pub mod x86 {
    /// SSE2 (mandatory on every 64-bit x86 chip; optional on 32-bit x86).
    pub const SSE2: u64 = 1 << 0;
    /// SSE4.2.
    pub const SSE4_2: u64 = 1 << 1;
    /// POPCNT.
    pub const POPCNT: u64 = 1 << 2;
    /// AVX2.
    pub const AVX2: u64 = 1 << 3;
}

/// PowerPC family feature bits, offset into bits 16-31 of the mask.
pub mod ppc {
    /// AltiVec/VMX SIMD.
    pub const ALTIVEC: u64 = 1 << 16;
    /// Vector-Scalar Extension.
    pub const VSX: u64 = 1 << 17;
}

/// Mainframe family (S/370 through z/Architecture) feature bits, offset
/// into bits 32-47 of the mask.
pub mod mainframe {
    /// The IEEE Floating-Point Facility (alongside mandatory HFP).
    pub const IEEE_FP: u64 = 1 << 32;
    /// The General-Instructions-Extension facility.
    pub const GENERAL_INSTR_EXT: u64 = 1 << 33;
    /// The Decimal-Floating-Point facility.
    pub const DECIMAL_FP: u64 = 1 << 34;
}

/// ARM64 family feature bits, offset into bits 48-63 of the mask.
pub mod arm64 {
    /// NEON/AdvSIMD (mandatory on AAPCS64, modeled as a bit for symmetry
    /// with the other families' optional-extension bits).
    pub const NEON: u64 = 1 << 48;
    /// The Large System Extensions (atomic CAS/swap instructions).
    pub const LSE: u64 = 1 << 49;
}

/// A CPU feature bitset: which of a [`CpuModel`]'s optional instruction-set
/// extensions are currently enabled.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct CpuFeatures(u64);

impl CpuFeatures {
    /// Is `bit` currently set?
    pub fn has(self, bit: u64) -> bool {
        self.0 & bit != 0
    }

    /// Set `bit`, regardless of whether the originating model's defaults
    /// included it (`SPEC_FULL.md` §6, §9: always accepted at the API
    /// level).
    pub fn enable(&mut self, bit: u64) {
        self.0 |= bit;
    }

    /// Clear `bit`.
    pub fn disable(&mut self, bit: u64) {
        self.0 &= !bit;
    }

    /// The raw bitset, for callers that want to inspect or serialize it
    /// wholesale.
    pub fn bits(self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haswell_implies_its_whole_default_chain() {
        let f = CpuModel::X86Haswell.default_features();
        assert!(f.has(x86::SSE2));
        assert!(f.has(x86::SSE4_2));
        assert!(f.has(x86::AVX2));
    }

    #[test]
    fn disable_then_enable_round_trips() {
        let mut f = CpuModel::ZArchZ10.default_features();
        assert!(f.has(mainframe::DECIMAL_FP));
        f.disable(mainframe::DECIMAL_FP);
        assert!(!f.has(mainframe::DECIMAL_FP));
        f.enable(mainframe::DECIMAL_FP);
        assert!(f.has(mainframe::DECIMAL_FP));
    }

    #[test]
    fn families_occupy_disjoint_bit_ranges() {
        assert_eq!(x86::AVX2 & ppc::VSX, 0);
        assert_eq!(mainframe::DECIMAL_FP & arm64::LSE, 0);
    }
}
