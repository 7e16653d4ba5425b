//! Instruction and basic-block storage.

use crate::ir::{Block, Func, Inst, Opcode, Type, Value};
use smallvec::SmallVec;

/// One `(case value, target block)` arm of a `SWITCH`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchCase {
    /// The scrutinee value this arm matches.
    pub value: i64,
    /// Where control transfers if the scrutinee equals `value`.
    pub target: Block,
}

/// One incoming `(value, predecessor block)` pair of a `PHI`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhiEdge {
    /// The value to take when control arrived from `from`.
    pub value: Value,
    /// The predecessor block this edge corresponds to.
    pub from: Block,
}

/// An instruction node.
///
/// Operands, PHI edges, and switch cases are all plain, owned storage on the
/// node itself (an instruction owns its operand array, per the design); the
/// values and blocks *named inside* that storage are non-owning copies of
/// their entity references. `prev`/`next` thread the node into its block's
/// doubly linked list, and `block` is the back-pointer the design calls for
/// — all three are indices, so there is nothing here for a destructor to
/// walk recursively.
#[derive(Debug, Clone)]
pub struct InstData {
    pub(crate) opcode: Opcode,
    pub(crate) operands: SmallVec<[Value; 2]>,
    pub(crate) result: Option<Value>,
    pub(crate) result_ty: Option<Type>,
    /// `BR`'s target, or `BR_COND`'s "then" target.
    pub(crate) true_block: Option<Block>,
    /// `BR_COND`'s "else" target.
    pub(crate) false_block: Option<Block>,
    /// `ALLOCA`/`LOAD`/`GEP`/`STRUCT_GEP`'s pointee/element type, or a
    /// conversion's destination type.
    pub(crate) aux_type: Option<Type>,
    /// `CALL`'s callee function, when the callee is statically known.
    pub(crate) callee: Option<Func>,
    /// A small compile-time integer operand: `STRUCT_GEP`'s field index.
    pub(crate) imm: Option<i64>,
    /// `PHI`'s incoming edges.
    pub(crate) phi_edges: Vec<PhiEdge>,
    /// `SWITCH`'s arms.
    pub(crate) switch_cases: Vec<SwitchCase>,
    /// `SWITCH`'s mandatory default target.
    pub(crate) switch_default: Option<Block>,
    pub(crate) prev: Option<Inst>,
    pub(crate) next: Option<Inst>,
    pub(crate) block: Option<Block>,
}

impl InstData {
    pub(crate) fn new(opcode: Opcode) -> Self {
        InstData {
            opcode,
            operands: SmallVec::new(),
            result: None,
            result_ty: None,
            true_block: None,
            false_block: None,
            aux_type: None,
            callee: None,
            imm: None,
            phi_edges: Vec::new(),
            switch_cases: Vec::new(),
            switch_default: None,
            prev: None,
            next: None,
            block: None,
        }
    }

    /// This instruction's opcode.
    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    /// The operand array, in argument order.
    pub fn operands(&self) -> &[Value] {
        &self.operands
    }

    /// The value this instruction defines, if its opcode produces one.
    pub fn result(&self) -> Option<Value> {
        self.result
    }

    /// `BR`'s sole target, or `BR_COND`'s "then" target.
    pub fn true_block(&self) -> Option<Block> {
        self.true_block
    }

    /// `BR_COND`'s "else" target.
    pub fn false_block(&self) -> Option<Block> {
        self.false_block
    }

    /// The element/pointee/destination type carried alongside the opcode.
    pub fn aux_type(&self) -> Option<&Type> {
        self.aux_type.as_ref()
    }

    /// `CALL`'s statically known callee.
    pub fn callee(&self) -> Option<Func> {
        self.callee
    }

    /// `STRUCT_GEP`'s field index.
    pub fn imm(&self) -> Option<i64> {
        self.imm
    }

    /// `PHI`'s incoming edges.
    pub fn phi_edges(&self) -> &[PhiEdge] {
        &self.phi_edges
    }

    /// `SWITCH`'s arms, in the order they were added.
    pub fn switch_cases(&self) -> &[SwitchCase] {
        &self.switch_cases
    }

    /// `SWITCH`'s mandatory default target.
    pub fn switch_default(&self) -> Option<Block> {
        self.switch_default
    }

    /// The block that owns this instruction.
    pub fn block(&self) -> Option<Block> {
        self.block
    }

    /// Replace this instruction in place with a no-op, as the optimizer
    /// passes do instead of unlinking an arena slot (DCE still removes it
    /// from the block's linked list; CSE and the redundant-load/store-load
    /// passes leave it linked but inert until DCE runs).
    pub(crate) fn make_nop(&mut self) {
        self.opcode = Opcode::Nop;
        self.operands.clear();
        self.result = None;
        self.result_ty = None;
        self.true_block = None;
        self.false_block = None;
        self.aux_type = None;
        self.callee = None;
        self.imm = None;
        self.phi_edges.clear();
        self.switch_cases.clear();
        self.switch_default = None;
    }
}

/// A basic block node.
///
/// `first`/`last` thread the block's owned instructions into a doubly
/// linked list via each [`InstData`]'s `prev`/`next`; `preds`/`succs` are
/// maintained lazily (recomputed by [`crate::ir::Function::refresh_cfg`]
/// rather than incrementally, since the builder only ever appends and the
/// optimizer's CFG-simplification pass already has to rebuild them after
/// rewiring branches).
#[derive(Debug, Clone)]
pub struct BlockData {
    pub(crate) name: Option<String>,
    pub(crate) first: Option<Inst>,
    pub(crate) last: Option<Inst>,
    pub(crate) preds: Vec<Block>,
    pub(crate) succs: Vec<Block>,
}

impl BlockData {
    pub(crate) fn new(name: Option<String>) -> Self {
        BlockData { name, first: None, last: None, preds: Vec::new(), succs: Vec::new() }
    }

    /// The block's optional symbolic name (for the pretty-printer; the
    /// stable `Block` index is what IR operands actually carry).
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The first instruction in the block, if any.
    pub fn first(&self) -> Option<Inst> {
        self.first
    }

    /// The last instruction in the block (the terminator, for a
    /// well-formed block), if any.
    pub fn last(&self) -> Option<Inst> {
        self.last
    }

    /// This block's predecessors, as last computed by
    /// [`crate::ir::Function::refresh_cfg`].
    pub fn preds(&self) -> &[Block] {
        &self.preds
    }

    /// This block's successors, as last computed by
    /// [`crate::ir::Function::refresh_cfg`].
    pub fn succs(&self) -> &[Block] {
        &self.succs
    }
}
