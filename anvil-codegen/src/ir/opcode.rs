//! The closed instruction opcode set.

use std::fmt;

/// Every instruction a backend must be able to lower (or legally decline, by
/// emitting the `; unimplemented op` placeholder described in
/// `SPEC_FULL.md` §7).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Opcode {
    // -- Arithmetic --
    Add,
    Sub,
    Mul,
    Sdiv,
    Udiv,
    Smod,
    Umod,
    Neg,

    // -- Bitwise --
    And,
    Or,
    Xor,
    Not,
    Shl,
    /// Logical right shift.
    Shr,
    /// Arithmetic (sign-extending) right shift.
    Sar,

    // -- Comparison (signed) --
    CmpEq,
    CmpNe,
    CmpLt,
    CmpLe,
    CmpGt,
    CmpGe,

    // -- Comparison (unsigned) --
    CmpUlt,
    CmpUle,
    CmpUgt,
    CmpUge,

    // -- Memory --
    Alloca,
    Load,
    Store,
    Gep,
    StructGep,

    // -- Control flow --
    Br,
    BrCond,
    Call,
    Ret,
    Switch,

    // -- Conversion --
    Trunc,
    Zext,
    Sext,
    Fptrunc,
    Fpext,
    Fptosi,
    Fptoui,
    Sitofp,
    Uitofp,
    Ptrtoint,
    Inttoptr,
    Bitcast,

    // -- Floating point --
    Fadd,
    Fsub,
    Fmul,
    Fdiv,
    Fneg,
    Fabs,
    Fcmp,

    // -- Special --
    Phi,
    Select,
    Nop,
}

impl Opcode {
    /// Does this opcode produce a result value?
    pub fn has_result(self) -> bool {
        !matches!(self, Opcode::Store | Opcode::Br | Opcode::BrCond | Opcode::Ret | Opcode::Switch | Opcode::Nop)
    }

    /// Is this opcode a block terminator? Exactly one must end every
    /// non-empty block.
    pub fn is_terminator(self) -> bool {
        matches!(self, Opcode::Br | Opcode::BrCond | Opcode::Ret | Opcode::Switch)
    }

    /// Does this opcode have an observable side effect that forbids dead
    /// code elimination and blocks memory-optimizing passes from assuming
    /// nothing happened (`STORE`, `CALL`, every terminator)?
    pub fn has_side_effects(self) -> bool {
        matches!(self, Opcode::Store | Opcode::Call) || self.is_terminator()
    }

    /// Is this a binary integer/bitwise opcode whose operands must share a
    /// type (the arithmetic and bitwise groups)?
    pub fn is_binary_int(self) -> bool {
        matches!(
            self,
            Opcode::Add
                | Opcode::Sub
                | Opcode::Mul
                | Opcode::Sdiv
                | Opcode::Udiv
                | Opcode::Smod
                | Opcode::Umod
                | Opcode::And
                | Opcode::Or
                | Opcode::Xor
                | Opcode::Shl
                | Opcode::Shr
                | Opcode::Sar
        )
    }

    /// Is this opcode commutative, so CSE may match with swapped operands?
    pub fn is_commutative(self) -> bool {
        matches!(
            self,
            Opcode::Add
                | Opcode::Mul
                | Opcode::And
                | Opcode::Or
                | Opcode::Xor
                | Opcode::CmpEq
                | Opcode::CmpNe
                | Opcode::Fadd
                | Opcode::Fmul
        )
    }

    /// Is this one of the signed or unsigned integer comparisons?
    pub fn is_int_compare(self) -> bool {
        matches!(
            self,
            Opcode::CmpEq
                | Opcode::CmpNe
                | Opcode::CmpLt
                | Opcode::CmpLe
                | Opcode::CmpGt
                | Opcode::CmpGe
                | Opcode::CmpUlt
                | Opcode::CmpUle
                | Opcode::CmpUgt
                | Opcode::CmpUge
        )
    }

    /// Is this one of the floating-point binary arithmetic opcodes?
    pub fn is_binary_float(self) -> bool {
        matches!(self, Opcode::Fadd | Opcode::Fsub | Opcode::Fmul | Opcode::Fdiv)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Mul => "mul",
            Opcode::Sdiv => "sdiv",
            Opcode::Udiv => "udiv",
            Opcode::Smod => "smod",
            Opcode::Umod => "umod",
            Opcode::Neg => "neg",
            Opcode::And => "and",
            Opcode::Or => "or",
            Opcode::Xor => "xor",
            Opcode::Not => "not",
            Opcode::Shl => "shl",
            Opcode::Shr => "shr",
            Opcode::Sar => "sar",
            Opcode::CmpEq => "cmp_eq",
            Opcode::CmpNe => "cmp_ne",
            Opcode::CmpLt => "cmp_lt",
            Opcode::CmpLe => "cmp_le",
            Opcode::CmpGt => "cmp_gt",
            Opcode::CmpGe => "cmp_ge",
            Opcode::CmpUlt => "cmp_ult",
            Opcode::CmpUle => "cmp_ule",
            Opcode::CmpUgt => "cmp_ugt",
            Opcode::CmpUge => "cmp_uge",
            Opcode::Alloca => "alloca",
            Opcode::Load => "load",
            Opcode::Store => "store",
            Opcode::Gep => "gep",
            Opcode::StructGep => "struct_gep",
            Opcode::Br => "br",
            Opcode::BrCond => "br_cond",
            Opcode::Call => "call",
            Opcode::Ret => "ret",
            Opcode::Switch => "switch",
            Opcode::Trunc => "trunc",
            Opcode::Zext => "zext",
            Opcode::Sext => "sext",
            Opcode::Fptrunc => "fptrunc",
            Opcode::Fpext => "fpext",
            Opcode::Fptosi => "fptosi",
            Opcode::Fptoui => "fptoui",
            Opcode::Sitofp => "sitofp",
            Opcode::Uitofp => "uitofp",
            Opcode::Ptrtoint => "ptrtoint",
            Opcode::Inttoptr => "inttoptr",
            Opcode::Bitcast => "bitcast",
            Opcode::Fadd => "fadd",
            Opcode::Fsub => "fsub",
            Opcode::Fmul => "fmul",
            Opcode::Fdiv => "fdiv",
            Opcode::Fneg => "fneg",
            Opcode::Fabs => "fabs",
            Opcode::Fcmp => "fcmp",
            Opcode::Phi => "phi",
            Opcode::Select => "select",
            Opcode::Nop => "nop",
        };
        f.write_str(s)
    }
}
