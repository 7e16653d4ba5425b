//! Per-family opcode-to-mnemonic tables shared by the register-window
//! targets. Kept separate from `regwin.rs` since the engine itself is
//! architecture-neutral; only the text a mnemonic renders as varies.

use crate::ir::Opcode;
use crate::isa::FpFormat;

/// x86 operand width: 32-bit (`x86`) vs. 64-bit (`x86-64`). The two targets
/// share every mnemonic stem; only the AT&T size suffix differs.
#[derive(Copy, Clone)]
pub(super) enum Width {
    W32,
    W64,
}

/// x86 and x86-64 share the same AT&T mnemonic stems; only the operand-size
/// suffix differs (`l` for 32-bit operands, `q` for 64-bit).
pub(super) fn x86(op: Opcode, width: Width) -> &'static str {
    use Width::*;
    match (op, width) {
        (Opcode::Add, W32) => "addl",
        (Opcode::Add, W64) => "addq",
        (Opcode::Sub, W32) => "subl",
        (Opcode::Sub, W64) => "subq",
        (Opcode::Mul, W32) => "imull",
        (Opcode::Mul, W64) => "imulq",
        (Opcode::Sdiv, W32) | (Opcode::Smod, W32) => "idivl",
        (Opcode::Sdiv, W64) | (Opcode::Smod, W64) => "idivq",
        (Opcode::Udiv, W32) | (Opcode::Umod, W32) => "divl",
        (Opcode::Udiv, W64) | (Opcode::Umod, W64) => "divq",
        (Opcode::Neg, W32) => "negl",
        (Opcode::Neg, W64) => "negq",
        (Opcode::And, W32) => "andl",
        (Opcode::And, W64) => "andq",
        (Opcode::Or, W32) => "orl",
        (Opcode::Or, W64) => "orq",
        (Opcode::Xor, W32) => "xorl",
        (Opcode::Xor, W64) => "xorq",
        (Opcode::Not, W32) => "notl",
        (Opcode::Not, W64) => "notq",
        (Opcode::Shl, W32) => "shll",
        (Opcode::Shl, W64) => "shlq",
        (Opcode::Shr, W32) => "shrl",
        (Opcode::Shr, W64) => "shrq",
        (Opcode::Sar, W32) => "sarl",
        (Opcode::Sar, W64) => "sarq",
        (Opcode::CmpEq, _) => "sete",
        (Opcode::CmpNe, _) => "setne",
        (Opcode::CmpLt, _) => "setl",
        (Opcode::CmpLe, _) => "setle",
        (Opcode::CmpGt, _) => "setg",
        (Opcode::CmpGe, _) => "setge",
        (Opcode::CmpUlt, _) => "setb",
        (Opcode::CmpUle, _) => "setbe",
        (Opcode::CmpUgt, _) => "seta",
        (Opcode::CmpUge, _) => "setae",
        (Opcode::Load, W32) | (Opcode::Store, W32) | (Opcode::Ptrtoint, W32) | (Opcode::Inttoptr, W32) => "movl",
        (Opcode::Load, W64) | (Opcode::Store, W64) | (Opcode::Ptrtoint, W64) | (Opcode::Inttoptr, W64) => "movq",
        (Opcode::Trunc, W32) => "movl",
        (Opcode::Trunc, W64) => "movq",
        (Opcode::Zext, _) => "movzx",
        (Opcode::Sext, _) => "movsx",
        (Opcode::Fptrunc, _) => "cvtsd2ss",
        (Opcode::Fpext, _) => "cvtss2sd",
        (Opcode::Fptosi, _) | (Opcode::Fptoui, _) => "cvttsd2si",
        (Opcode::Sitofp, _) | (Opcode::Uitofp, _) => "cvtsi2sd",
        (Opcode::Fadd, _) => "addsd",
        (Opcode::Fsub, _) => "subsd",
        (Opcode::Fmul, _) => "mulsd",
        (Opcode::Fdiv, _) => "divsd",
        (Opcode::Fneg, _) => "negsd",
        (Opcode::Fabs, _) => "absd",
        (Opcode::Fcmp, _) => "ucomisd",
        (Opcode::Alloca, W32) | (Opcode::Gep, W32) | (Opcode::StructGep, W32) => "leal",
        (Opcode::Alloca, W64) | (Opcode::Gep, W64) | (Opcode::StructGep, W64) => "leaq",
        (Opcode::Br, _) | (Opcode::BrCond, _) | (Opcode::Call, _) | (Opcode::Ret, _) | (Opcode::Switch, _) => "<control-flow>",
        (Opcode::Phi, _) | (Opcode::Select, _) | (Opcode::Bitcast, _) | (Opcode::Nop, _) => "<no-op>",
    }
}

/// PowerPC's three variants (32-bit, 64-bit BE, 64-bit LE) emit identical
/// mnemonics; the difference between them is register width and
/// byte order, handled elsewhere.
pub(super) fn ppc(op: Opcode) -> &'static str {
    match op {
        Opcode::Add => "add",
        Opcode::Sub => "subf",
        Opcode::Mul => "mullw",
        Opcode::Sdiv => "divw",
        Opcode::Udiv => "divwu",
        Opcode::Smod => "modsw",
        Opcode::Umod => "moduw",
        Opcode::Neg => "neg",
        Opcode::And => "and",
        Opcode::Or => "or",
        Opcode::Xor => "xor",
        Opcode::Not => "nor",
        Opcode::Shl => "slw",
        Opcode::Shr => "srw",
        Opcode::Sar => "sraw",
        Opcode::CmpEq => "cmpw",
        Opcode::CmpNe => "cmpw",
        Opcode::CmpLt => "cmpw",
        Opcode::CmpLe => "cmpw",
        Opcode::CmpGt => "cmpw",
        Opcode::CmpGe => "cmpw",
        Opcode::CmpUlt | Opcode::CmpUle | Opcode::CmpUgt | Opcode::CmpUge => "cmplw",
        Opcode::Load | Opcode::Ptrtoint | Opcode::Inttoptr => "lwz",
        Opcode::Store => "stw",
        Opcode::Trunc => "rlwinm",
        Opcode::Zext => "rlwinm",
        Opcode::Sext => "extsw",
        Opcode::Fptrunc => "frsp",
        Opcode::Fpext => "fmr",
        Opcode::Fptosi | Opcode::Fptoui => "fctiwz",
        Opcode::Sitofp | Opcode::Uitofp => "fcfid",
        Opcode::Fadd => "fadd",
        Opcode::Fsub => "fsub",
        Opcode::Fmul => "fmul",
        Opcode::Fdiv => "fdiv",
        Opcode::Fneg => "fneg",
        Opcode::Fabs => "fabs",
        Opcode::Fcmp => "fcmpu",
        Opcode::Alloca | Opcode::Gep | Opcode::StructGep => "addi",
        Opcode::Br | Opcode::BrCond | Opcode::Call | Opcode::Ret | Opcode::Switch => "<control-flow>",
        Opcode::Phi | Opcode::Select | Opcode::Bitcast | Opcode::Nop => "<no-op>",
    }
}

/// The IBM mainframe family (S/370, S/370-XA, S/390, z/Architecture) shares
/// one integer mnemonic set; only the floating-point opcodes fork on the
/// context's configured [`FpFormat`], since HFP and IEEE-754 binary
/// floating point are distinct instruction sets on every mainframe that
/// offers both (`SPEC_FULL.md` §4.7: "Emitters must select HFP or IEEE
/// mnemonics ... from the context's configured FP format").
pub(super) fn mainframe(op: Opcode, fp: FpFormat) -> &'static str {
    let hfp = matches!(fp, FpFormat::Hfp);
    match op {
        Opcode::Add => "AR",
        Opcode::Sub => "SR",
        Opcode::Mul => "MR",
        Opcode::Sdiv | Opcode::Smod => "DR",
        Opcode::Udiv | Opcode::Umod => "DLR",
        Opcode::Neg => "LCR",
        Opcode::And => "NR",
        Opcode::Or => "OR",
        Opcode::Xor => "XR",
        Opcode::Not => "XR",
        Opcode::Shl => "SLL",
        Opcode::Shr => "SRL",
        Opcode::Sar => "SRA",
        Opcode::CmpEq | Opcode::CmpNe | Opcode::CmpLt | Opcode::CmpLe | Opcode::CmpGt | Opcode::CmpGe => "CR",
        Opcode::CmpUlt | Opcode::CmpUle | Opcode::CmpUgt | Opcode::CmpUge => "CLR",
        Opcode::Load | Opcode::Ptrtoint | Opcode::Inttoptr => "L",
        Opcode::Store => "ST",
        Opcode::Trunc => "LR",
        Opcode::Zext => "LLGFR",
        Opcode::Sext => "LGFR",
        Opcode::Fptrunc => {
            if hfp {
                "LEDR"
            } else {
                "LEDBR"
            }
        }
        Opcode::Fpext => {
            if hfp {
                "LDER"
            } else {
                "LDEBR"
            }
        }
        Opcode::Fptosi | Opcode::Fptoui => {
            if hfp {
                "CFDR"
            } else {
                "CFDBR"
            }
        }
        Opcode::Sitofp | Opcode::Uitofp => {
            if hfp {
                "CDFR"
            } else {
                "CDFBR"
            }
        }
        Opcode::Fadd => {
            if hfp {
                "ADR"
            } else {
                "ADBR"
            }
        }
        Opcode::Fsub => {
            if hfp {
                "SDR"
            } else {
                "SDBR"
            }
        }
        Opcode::Fmul => {
            if hfp {
                "MDR"
            } else {
                "MDBR"
            }
        }
        Opcode::Fdiv => {
            if hfp {
                "DDR"
            } else {
                "DDBR"
            }
        }
        Opcode::Fneg => {
            if hfp {
                "LCDR"
            } else {
                "LCDBR"
            }
        }
        Opcode::Fabs => {
            if hfp {
                "LPDR"
            } else {
                "LPDBR"
            }
        }
        Opcode::Fcmp => {
            if hfp {
                "CDR"
            } else {
                "CDBR"
            }
        }
        Opcode::Alloca | Opcode::Gep | Opcode::StructGep => "LA",
        Opcode::Br | Opcode::BrCond | Opcode::Call | Opcode::Ret | Opcode::Switch => "<control-flow>",
        Opcode::Phi | Opcode::Select | Opcode::Bitcast | Opcode::Nop => "<no-op>",
    }
}

/// ARM64, shared by the Linux and Darwin variants (the AAPCS64 calling
/// convention is identical; only symbol naming differs).
pub(super) fn arm64(op: Opcode) -> &'static str {
    match op {
        Opcode::Add => "add",
        Opcode::Sub => "sub",
        Opcode::Mul => "mul",
        Opcode::Sdiv => "sdiv",
        Opcode::Udiv => "udiv",
        Opcode::Smod => "msub",
        Opcode::Umod => "msub",
        Opcode::Neg => "neg",
        Opcode::And => "and",
        Opcode::Or => "orr",
        Opcode::Xor => "eor",
        Opcode::Not => "mvn",
        Opcode::Shl => "lsl",
        Opcode::Shr => "lsr",
        Opcode::Sar => "asr",
        Opcode::CmpEq => "cset eq,",
        Opcode::CmpNe => "cset ne,",
        Opcode::CmpLt => "cset lt,",
        Opcode::CmpLe => "cset le,",
        Opcode::CmpGt => "cset gt,",
        Opcode::CmpGe => "cset ge,",
        Opcode::CmpUlt => "cset lo,",
        Opcode::CmpUle => "cset ls,",
        Opcode::CmpUgt => "cset hi,",
        Opcode::CmpUge => "cset hs,",
        Opcode::Load | Opcode::Ptrtoint | Opcode::Inttoptr => "ldr",
        Opcode::Store => "str",
        Opcode::Trunc => "uxtw",
        Opcode::Zext => "uxtw",
        Opcode::Sext => "sxtw",
        Opcode::Fptrunc => "fcvt",
        Opcode::Fpext => "fcvt",
        Opcode::Fptosi | Opcode::Fptoui => "fcvtzs",
        Opcode::Sitofp | Opcode::Uitofp => "scvtf",
        Opcode::Fadd => "fadd",
        Opcode::Fsub => "fsub",
        Opcode::Fmul => "fmul",
        Opcode::Fdiv => "fdiv",
        Opcode::Fneg => "fneg",
        Opcode::Fabs => "fabs",
        Opcode::Fcmp => "fcmp",
        Opcode::Alloca | Opcode::Gep | Opcode::StructGep => "add",
        Opcode::Br | Opcode::BrCond | Opcode::Call | Opcode::Ret | Opcode::Switch => "<control-flow>",
        Opcode::Phi | Opcode::Select | Opcode::Bitcast | Opcode::Nop => "<no-op>",
    }
}
