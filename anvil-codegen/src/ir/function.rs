//! The `Function`: the textual unit of IR construction, optimization, and
//! lowering.

use crate::entity::{PrimaryMap, SecondaryMap};
use crate::error::{Error, Result};
use crate::ir::instruction::{BlockData, InstData};
use crate::ir::{Block, Inst, Opcode, Type, Value};
use crate::ir::value::ValueData;
use std::fmt;

/// Linkage of a function or global, matching the C-style storage-class
/// vocabulary the design borrows from.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Linkage {
    /// Visible only within its module.
    Internal,
    /// Visible to other modules (`.globl`).
    External,
    /// Visible, but may be overridden by a non-weak definition elsewhere.
    Weak,
    /// A tentative definition that may be merged with others of the same
    /// name (`.comm`).
    Common,
}

impl fmt::Display for Linkage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Linkage::Internal => "internal",
            Linkage::External => "external",
            Linkage::Weak => "weak",
            Linkage::Common => "common",
        })
    }
}

/// A function: its signature, parameters, and (unless it is a declaration)
/// its blocks and instructions.
///
/// Blocks are allocated into `blocks` and kept in declaration order in
/// `block_order`, which is the function's "linked list of blocks" from the
/// design; `block_dead` marks entries that CFG simplification has removed
/// without having to compact the arena (the same "mark it, don't unlink the
/// arena slot" discipline the optimizer passes use for individual
/// instructions via `NOP`).
#[derive(Debug, Clone)]
pub struct Function {
    /// The function's name, used for its assembly label.
    pub name: String,
    /// The function's linkage.
    pub linkage: Linkage,
    /// The function's signature (a [`crate::ir::TypeKind::Func`] type).
    pub sig: Type,
    /// `true` for an external declaration with no blocks.
    pub is_declaration: bool,
    /// Computed by the backend at emission time: total stack frame size in
    /// bytes (locals + max outgoing args + alignment padding).
    pub stack_frame_size: u32,
    /// Computed by the backend at emission time: the largest number of
    /// outgoing stack-passed argument slots any `CALL` in this function
    /// needs.
    pub max_outgoing_arg_slots: u32,

    pub(crate) values: PrimaryMap<Value, ValueData>,
    pub(crate) insts: PrimaryMap<Inst, InstData>,
    pub(crate) blocks: PrimaryMap<Block, BlockData>,
    pub(crate) block_order: Vec<Block>,
    pub(crate) block_dead: SecondaryMap<Block, bool>,
    pub(crate) params: Vec<Value>,
    /// The `Value::Func` that names this function as a `CALL` callee or
    /// function-pointer operand, filled in by
    /// [`crate::ir::Module::declare_function`] once the function's own
    /// `Func` key is known.
    pub(crate) value_view: Option<Value>,
}

impl Function {
    pub(crate) fn new(name: String, linkage: Linkage, sig: Type, is_declaration: bool) -> Self {
        let (param_types, _ret, _variadic) = sig.func_parts();
        let param_types = param_types.to_vec();
        let mut f = Function {
            name,
            linkage,
            sig,
            is_declaration,
            stack_frame_size: 0,
            max_outgoing_arg_slots: 0,
            values: PrimaryMap::new(),
            insts: PrimaryMap::new(),
            blocks: PrimaryMap::new(),
            block_order: Vec::new(),
            block_dead: SecondaryMap::new(),
            params: Vec::new(),
            value_view: None,
        };
        for (index, ty) in param_types.into_iter().enumerate() {
            let v = f.values.push(ValueData::Param { index: index as u32, ty });
            f.params.push(v);
        }
        if !is_declaration {
            f.create_block(Some("entry".to_string()));
        }
        f
    }

    /// The value used when this function is referenced as a `CALL` callee
    /// or a function-pointer operand.
    pub fn as_value(&self) -> Value {
        self.value_view.expect("Function::value_view set by Module::declare_function")
    }

    /// The `index`-th declared parameter.
    pub fn param(&self, index: usize) -> Option<Value> {
        self.params.get(index).copied()
    }

    /// All declared parameters, in order.
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Every value in this function's arena, keyed, in allocation order.
    /// Used by [`crate::ir::Module::intern_all_strings`] to find
    /// [`ValueData::ConstString`] literals without duplicating this
    /// function's knowledge of its own value arena.
    pub fn values(&self) -> impl Iterator<Item = (Value, &ValueData)> {
        self.values.iter()
    }

    /// The auto-created entry block. Panics if called on a declaration.
    pub fn entry_block(&self) -> Block {
        *self.block_order.first().expect("declarations have no blocks")
    }

    /// Create a new, empty block and append it to the function's block
    /// list. The builder's cursor is not moved; callers must
    /// `set_insert_point` explicitly (creating a block never implicitly
    /// repositions the cursor, per the design's determinism requirement).
    pub fn create_block(&mut self, name: Option<String>) -> Block {
        let b = self.blocks.push(BlockData::new(name));
        self.block_order.push(b);
        b
    }

    /// Blocks in emission order, skipping any removed by CFG
    /// simplification.
    pub fn blocks(&self) -> impl Iterator<Item = Block> + '_ {
        self.block_order.iter().copied().filter(move |b| !self.block_dead[*b])
    }

    /// Is this block still live (not removed by CFG simplification)?
    pub fn is_block_live(&self, block: Block) -> bool {
        !self.block_dead[block]
    }

    pub(crate) fn mark_block_dead(&mut self, block: Block) {
        self.block_dead[block] = true;
    }

    /// Borrow a block's data.
    pub fn block(&self, block: Block) -> &BlockData {
        &self.blocks[block]
    }

    /// Mutably borrow a block's data. Only `crate`-internal callers (the
    /// builder and the optimizer passes) may reach in this deeply; public
    /// mutation goes through the builder or a pass, never by poking at
    /// `BlockData` fields directly.
    pub(crate) fn block_mut(&mut self, block: Block) -> &mut BlockData {
        &mut self.blocks[block]
    }

    /// Borrow an instruction's data.
    pub fn inst(&self, inst: Inst) -> &InstData {
        &self.insts[inst]
    }

    pub(crate) fn inst_mut(&mut self, inst: Inst) -> &mut InstData {
        &mut self.insts[inst]
    }

    /// Borrow a value's definition.
    pub fn value(&self, value: Value) -> &ValueData {
        &self.values[value]
    }

    /// Iterate a block's instructions in order, following the doubly
    /// linked list threaded through each [`InstData`]'s `prev`/`next`.
    pub fn block_insts(&self, block: Block) -> BlockInstIter<'_> {
        BlockInstIter { func: self, next: self.blocks[block].first }
    }

    pub(crate) fn new_value(&mut self, data: ValueData) -> Value {
        self.values.push(data)
    }

    /// Append `data` as a new instruction at the end of `block`'s
    /// instruction list, linking it into the doubly linked list and
    /// returning its key. Used only by the builder, which is responsible
    /// for enforcing "no instruction may be appended after a terminator".
    pub(crate) fn append_inst(&mut self, block: Block, mut data: InstData) -> Inst {
        data.block = Some(block);
        let inst = self.insts.push(data);
        let last = self.blocks[block].last;
        self.insts[inst].prev = last;
        match last {
            Some(prev) => self.insts[prev].next = Some(inst),
            None => self.blocks[block].first = Some(inst),
        }
        self.blocks[block].last = Some(inst);
        inst
    }

    /// Unlink `inst` from its block's instruction list. Used by DCE to
    /// physically remove a dead instruction (as opposed to the `NOP`
    /// convention other passes use to mark one redundant without touching
    /// the list yet).
    pub(crate) fn unlink_inst(&mut self, inst: Inst) {
        let (prev, next, block) = {
            let data = &self.insts[inst];
            (data.prev, data.next, data.block)
        };
        if let Some(prev) = prev {
            self.insts[prev].next = next;
        } else if let Some(block) = block {
            self.blocks[block].first = next;
        }
        if let Some(next) = next {
            self.insts[next].prev = prev;
        } else if let Some(block) = block {
            self.blocks[block].last = prev;
        }
        let data = &mut self.insts[inst];
        data.prev = None;
        data.next = None;
        data.block = None;
    }

    /// Does `block` currently end in a terminator? True for empty blocks
    /// too (vacuously), matching "the last instruction, if present, must be
    /// a terminator".
    pub fn is_terminated(&self, block: Block) -> bool {
        match self.blocks[block].last {
            Some(inst) => self.insts[inst].opcode.is_terminator(),
            None => false,
        }
    }

    /// Recompute every live block's predecessor/successor lists from
    /// scratch by scanning terminators. Cheap relative to keeping them
    /// incrementally correct through every builder and pass rewrite, and
    /// exactly what CFG simplification needs to call after it finishes
    /// rewiring branches.
    pub fn refresh_cfg(&mut self) {
        for b in self.block_order.clone() {
            self.blocks[b].preds.clear();
            self.blocks[b].succs.clear();
        }
        let live_blocks: Vec<Block> = self.block_order.iter().copied().filter(|b| !self.block_dead[*b]).collect();
        for &b in &live_blocks {
            let Some(last) = self.blocks[b].last else { continue };
            let data = &self.insts[last];
            let mut targets: Vec<Block> = Vec::new();
            targets.extend(data.true_block);
            targets.extend(data.false_block);
            for case in &data.switch_cases {
                targets.push(case.target);
            }
            targets.extend(data.switch_default);
            for t in targets {
                if !self.blocks[b].succs.contains(&t) {
                    self.blocks[b].succs.push(t);
                }
            }
        }
        for &b in &live_blocks {
            let succs = self.blocks[b].succs.clone();
            for s in succs {
                if !self.blocks[s].preds.contains(&b) {
                    self.blocks[s].preds.push(b);
                }
            }
        }
    }

    /// Validate the invariants `SPEC_FULL.md` §8 requires to hold after any
    /// sequence of builder operations: exactly one terminator per
    /// non-empty block, in final position.
    pub fn verify(&self) -> Result<()> {
        for b in self.blocks() {
            let mut seen_terminator = false;
            for inst in self.block_insts(b) {
                let op = self.insts[inst].opcode;
                if op == Opcode::Nop {
                    continue;
                }
                if seen_terminator {
                    return Err(Error::internal(format!(
                        "block {b} has an instruction after its terminator"
                    )));
                }
                if op.is_terminator() {
                    seen_terminator = true;
                }
            }
            if !seen_terminator && self.blocks[b].first.is_some() {
                return Err(Error::internal(format!("block {b} does not end in a terminator")));
            }
        }
        Ok(())
    }
}

/// Iterator over a block's instructions, in linked-list order.
pub struct BlockInstIter<'f> {
    func: &'f Function,
    next: Option<Inst>,
}

impl<'f> Iterator for BlockInstIter<'f> {
    type Item = Inst;

    fn next(&mut self) -> Option<Inst> {
        let cur = self.next?;
        self.next = self.func.insts[cur].next;
        Some(cur)
    }
}
