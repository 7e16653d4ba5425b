//! The optimization pipeline: a pass manager that runs a configurable
//! sequence of IR-to-IR transformations to fixpoint.
//!
//! Every pass is a plain function over one [`Function`] returning whether
//! it changed anything; [`PassManager::run_module`] loops the enabled
//! passes, in the fixed order below, until a full sweep changes nothing,
//! bounded by [`MAX_SWEEPS`] (`SPEC_FULL.md` §4.5, §5: "typical cap: 10
//! iterations over all passes"). A pass that fails to make progress is
//! never treated as an error — "optimization pass failures are treated as
//! no-change" (§7) falls out for free here since every pass function
//! simply returns `false` rather than a `Result`.

mod cfg;
mod dce;
mod local;
mod memory;
mod unroll;

use crate::ir::{Function, Module};
use std::fmt;

/// `O0` through `O3`, plus the debug-friendly `Og`, mapping to the pass
/// sets fixed by `SPEC_FULL.md` §4.5.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OptLevel {
    /// No passes run.
    O0,
    /// Constant folding, DCE, copy propagation.
    O1,
    /// O1 plus CFG simplification, strength reduction, load/store
    /// forwarding, redundant-load elimination, local CSE.
    O2,
    /// O2 plus loop unrolling.
    O3,
    /// Copy propagation and store-load forwarding only — cheap passes
    /// that don't restructure control flow or rename away debuggable
    /// values, for a build that still wants to step through recognizable
    /// IR.
    Og,
}

/// One entry in the fixed pass order. `PassManager::enabled` is indexed by
/// this (via `PASS_ORDER`'s position), so enabling/disabling a pass by
/// name is O(1) without a `HashMap`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PassId {
    /// Evaluate fully-constant instructions and simplify algebraic
    /// identities (`x+0`, `x*1`, `x-x`, …), replacing uses and marking the
    /// original `NOP`.
    ConstFold,
    /// Rewrite uses of an identity-computing instruction's result to its
    /// source operand directly (`x+0 → x`), leaving DCE to clean up the
    /// now-dead instruction.
    CopyProp,
    /// `x*2^n → x<<n`; for unsigned operands, `x/2^n → x>>n` and
    /// `x%2^n → x&(2^n-1)`.
    StrengthReduction,
    /// Per-block common subexpression elimination.
    Cse,
    /// Per-block redundant-load elimination (two loads from the same
    /// pointer, no intervening store/call).
    RedundantLoad,
    /// Forward a store's value directly into an immediately following
    /// load of the same address.
    StoreLoadForward,
    /// Fold constant branches, bypass empty blocks, remove unreachable
    /// blocks, merge single-predecessor successors.
    CfgSimplify,
    /// Remove instructions with no uses and no side effects.
    Dce,
    /// Fully unroll small, constant-trip-count counted loops.
    LoopUnroll,
}

impl fmt::Display for PassId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            PassId::ConstFold => "const-fold",
            PassId::CopyProp => "copy-prop",
            PassId::StrengthReduction => "strength-reduction",
            PassId::Cse => "cse",
            PassId::RedundantLoad => "redundant-load",
            PassId::StoreLoadForward => "store-load-forward",
            PassId::CfgSimplify => "cfg-simplify",
            PassId::Dce => "dce",
            PassId::LoopUnroll => "loop-unroll",
        };
        f.write_str(s)
    }
}

/// The fixed run order. Listed roughly leaves-first: local simplification
/// before the memory passes that benefit from it, CFG simplification
/// before DCE so newly unreachable blocks' instructions stop counting as
/// uses, loop unrolling last since it multiplies the body other passes
/// have already simplified.
const PASS_ORDER: [PassId; 9] = [
    PassId::ConstFold,
    PassId::CopyProp,
    PassId::StrengthReduction,
    PassId::Cse,
    PassId::RedundantLoad,
    PassId::StoreLoadForward,
    PassId::CfgSimplify,
    PassId::Dce,
    PassId::LoopUnroll,
];

/// Bound on full sweeps over the enabled pass set per function
///.
const MAX_SWEEPS: u32 = 10;

fn index_of(id: PassId) -> usize {
    PASS_ORDER.iter().position(|p| *p == id).expect("PASS_ORDER lists every PassId")
}

/// Orders, enables/disables, and iterates the optimization passes to
/// fixpoint according to an [`OptLevel`] (`SPEC_FULL.md` §4.5, §6's
/// `pass_manager_*` surface).
#[derive(Debug, Clone)]
pub struct PassManager {
    enabled: [bool; PASS_ORDER.len()],
}

impl PassManager {
    /// A pass manager with every pass disabled (`OptLevel::O0`).
    pub fn new() -> Self {
        PassManager { enabled: [false; PASS_ORDER.len()] }
    }

    /// Enable a single pass, independent of the current optimization
    /// level.
    pub fn enable(&mut self, id: PassId) {
        self.enabled[index_of(id)] = true;
    }

    /// Disable a single pass, independent of the current optimization
    /// level.
    pub fn disable(&mut self, id: PassId) {
        self.enabled[index_of(id)] = false;
    }

    /// Is `id` currently enabled?
    pub fn is_enabled(&self, id: PassId) -> bool {
        self.enabled[index_of(id)]
    }

    /// Reset the enabled set to exactly what `level` selects
    ///.
    pub fn set_level(&mut self, level: OptLevel) {
        self.enabled = [false; PASS_ORDER.len()];
        let ids: &[PassId] = match level {
            OptLevel::O0 => &[],
            OptLevel::O1 => &[PassId::ConstFold, PassId::Dce, PassId::CopyProp],
            OptLevel::O2 => &[
                PassId::ConstFold,
                PassId::Dce,
                PassId::CopyProp,
                PassId::CfgSimplify,
                PassId::StrengthReduction,
                PassId::StoreLoadForward,
                PassId::RedundantLoad,
                PassId::Cse,
            ],
            OptLevel::O3 => &[
                PassId::ConstFold,
                PassId::Dce,
                PassId::CopyProp,
                PassId::CfgSimplify,
                PassId::StrengthReduction,
                PassId::StoreLoadForward,
                PassId::RedundantLoad,
                PassId::Cse,
                PassId::LoopUnroll,
            ],
            OptLevel::Og => &[PassId::CopyProp, PassId::StoreLoadForward],
        };
        for id in ids {
            self.enable(*id);
        }
    }

    fn run_pass(&self, id: PassId, func: &mut Function) -> bool {
        match id {
            PassId::ConstFold => local::const_fold(func),
            PassId::CopyProp => local::copy_prop(func),
            PassId::StrengthReduction => local::strength_reduce(func),
            PassId::Cse => memory::cse(func),
            PassId::RedundantLoad => memory::redundant_load(func),
            PassId::StoreLoadForward => memory::store_load_forward(func),
            PassId::CfgSimplify => cfg::simplify(func),
            PassId::Dce => dce::dce(func),
            PassId::LoopUnroll => unroll::unroll(func),
        }
    }

    /// Run every enabled pass over `func`, in [`PASS_ORDER`], repeating
    /// full sweeps until one changes nothing or [`MAX_SWEEPS`] is
    /// reached.
    pub fn run_function(&self, func: &mut Function) {
        for _ in 0..MAX_SWEEPS {
            let mut changed = false;
            for &id in &PASS_ORDER {
                if self.enabled[index_of(id)] && self.run_pass(id, func) {
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }

    /// Run the configured pipeline over every function in `module`.
    pub fn run_module(&self, module: &mut Module) {
        let func_ids: Vec<_> = module.functions().map(|(id, _)| id).collect();
        for id in func_ids {
            if !module.func(id).is_declaration {
                self.run_function(module.func_mut(id));
            }
        }
    }
}

impl Default for PassManager {
    fn default() -> Self {
        PassManager::new()
    }
}

/// Replace every occurrence of `old` as an instruction operand, PHI
/// incoming value, or `SWITCH` scrutinee with `new`, across the whole
/// function. Shared by every pass that rewires uses instead of mutating
/// the defining instruction in place (copy propagation, CSE, the memory
/// passes).
pub(crate) fn rewrite_uses(func: &mut Function, old: crate::ir::Value, new: crate::ir::Value) {
    for block in func.blocks().collect::<Vec<_>>() {
        for inst in func.block_insts(block).collect::<Vec<_>>() {
            let data = func.inst_mut(inst);
            for operand in data.operands.iter_mut() {
                if *operand == old {
                    *operand = new;
                }
            }
            for edge in data.phi_edges.iter_mut() {
                if edge.value == old {
                    edge.value = new;
                }
            }
        }
    }
}

/// Count how many instruction operands/PHI edges reference `v` across the
/// function. Used by DCE ("zero uses") and by passes that want to confirm
/// a rewrite left no dangling reference behind.
pub(crate) fn use_count(func: &Function, v: crate::ir::Value) -> usize {
    let mut n = 0;
    for block in func.blocks() {
        for inst in func.block_insts(block) {
            let data = func.inst(inst);
            n += data.operands().iter().filter(|&&o| o == v).count();
            n += data.phi_edges().iter().filter(|e| e.value == v).count();
        }
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::FunctionBuilder;
    use crate::ir::{Linkage, Type, TypeKind};

    fn i32_() -> Type {
        Type::primitive(TypeKind::I32, 4)
    }

    #[test]
    fn o1_enables_exactly_const_fold_dce_copy_prop() {
        let mut pm = PassManager::new();
        pm.set_level(OptLevel::O1);
        assert!(pm.is_enabled(PassId::ConstFold));
        assert!(pm.is_enabled(PassId::Dce));
        assert!(pm.is_enabled(PassId::CopyProp));
        assert!(!pm.is_enabled(PassId::Cse));
        assert!(!pm.is_enabled(PassId::LoopUnroll));
    }

    #[test]
    fn fixpoint_is_reached_within_the_sweep_cap() {
        // A function with a long chain of foldable additions exercises
        // several sweeps before const-fold + DCE settle.
        let sig = Type::func(i32_(), &[], false);
        let mut f = crate::ir::Function::new("f".to_string(), Linkage::External, sig, false);
        let entry = f.entry_block();
        let mut b = FunctionBuilder::new(&mut f, 8);
        b.set_insert_point(entry);
        let mut acc = b.const_int(i32_(), 1).unwrap();
        for _ in 0..20 {
            let one = b.const_int(i32_(), 1).unwrap();
            acc = b.build_add(acc, one).unwrap();
        }
        b.build_ret(Some(acc)).unwrap();

        let mut pm = PassManager::new();
        pm.set_level(OptLevel::O1);
        pm.run_function(&mut f);
        assert!(f.verify().is_ok());

        let before = format!("{f:?}");
        pm.run_function(&mut f);
        let after = format!("{f:?}");
        // A second run at fixpoint changes nothing further.
        assert_eq!(before, after);
    }
}
