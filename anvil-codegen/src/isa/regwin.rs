//! Shared lowering engine for the "register-window" target family: x86,
//! x86-64, the three PowerPC variants, and the two ARM64 variants.
//!
//! All seven share the same accumulator/scratch-register lowering shape
//!: every instruction operand is reloaded from its
//! defining instruction's dedicated stack slot, the operation writes a
//! primary scratch register, and the result is immediately spilled back to
//! its own slot — trivial to get right, at the declared cost of
//! competitive register allocation (§1's non-goal (d)). What differs
//! between these seven targets is register *names*, calling-convention
//! argument regs, operand order/prefix conventions, and mnemonics; this
//! module holds the one copy of the orchestration (stack-slot assignment,
//! block/instruction walk, switch-lowering heuristic, call sequencing) and
//! each target supplies a small [`RegisterWindowTarget`] of those
//! particulars. This mirrors the teacher's own `pulley_shared` module,
//! shared by its `pulley32`/`pulley64` backends.

use crate::error::{Error, Result};
use crate::ir::{Block, Function, Inst, Module, Opcode, Type, TypeKind, Value, ValueData};
use crate::isa::{AbiVariant, ArchInfo, Backend, Dialect, FpFormat, StackDirection};
use std::collections::HashMap;
use std::fmt::Write as _;

/// How a target renders a `base`+`offset` memory operand. This is not
/// purely a function of [`Dialect`]: x86's AT&T/Intel override actually
/// changes the operand's shape (`offset(reg)` vs. `[reg+offset]`), while
/// ARM64's bracket syntax (`[reg, #offset]`, with the `#` marker AT&T
/// lacks and Intel x86 brackets don't use either) is a third, unrelated
/// shape that has nothing to do with the x86 family's dialect choice.
/// PowerPC's GAS syntax has no bracket form at all, regardless of
/// `Dialect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MemSyntax {
    /// `offset(reg)` — AT&T x86/x86-64, and every PowerPC target.
    OffsetParen,
    /// `[reg+offset]`/`[reg-offset]`/`[reg]` — x86/x86-64 under
    /// `Dialect::Intel`. No `#` immediate marker.
    X86Bracket,
    /// `[reg, #offset]` — ARM64, Linux and Darwin alike.
    ArmBracket,
}

/// The target-specific particulars the shared engine needs: register
/// names, calling-convention slots, and text-formatting conventions.
/// Instruction *selection* (which opcode means what) lives in the engine;
/// these methods only ever supply names and mnemonics.
pub(crate) trait RegisterWindowTarget {
    /// This target's static descriptor.
    fn arch_info(&self) -> ArchInfo;
    /// The dialect this target emits by default.
    fn native_dialect(&self) -> Dialect;
    /// Only the x86 family accepts `Context::set_syntax` overrides
    ///.
    fn allows_dialect_override(&self) -> bool {
        false
    }
    /// This target's memory-operand shape for the engine's *currently
    /// configured* `dialect`. Defaults to [`MemSyntax::OffsetParen`],
    /// which is every target's answer except x86/x86-64 (dialect-
    /// dependent) and ARM64 (always bracketed, regardless of `dialect`).
    fn mem_syntax(&self, dialect: Dialect) -> MemSyntax {
        let _ = dialect;
        MemSyntax::OffsetParen
    }
    /// Integer argument registers, in calling-convention order.
    fn arg_regs(&self) -> &'static [&'static str];
    /// The register the return value is passed in.
    fn ret_reg(&self) -> &'static str;
    /// `(primary, secondary)` scratch registers used for the accumulator
    /// scheme.
    fn scratch_regs(&self) -> (&'static str, &'static str);
    /// The frame-pointer register.
    fn frame_reg(&self) -> &'static str;
    /// The stack-pointer register.
    fn stack_reg(&self) -> &'static str;
    /// Callee-saved registers the prologue/epilogue save and restore.
    fn callee_saved(&self) -> &'static [&'static str];
    /// Required stack alignment at a `CALL` instruction, in bytes.
    fn stack_alignment(&self) -> u32;
    /// Map an IR-level name to this target's assembly symbol (Darwin
    /// prefixes with `_`; everyone else uses the name as-is).
    fn symbol(&self, name: &str) -> String {
        name.to_string()
    }
    /// The mnemonic for a non-control-flow opcode.
    fn mnemonic(&self, op: Opcode) -> &'static str;
    /// Load-immediate mnemonic.
    fn load_imm_mnemonic(&self) -> &'static str;
    /// Load-effective-address mnemonic (used for `Global`/`Func` operands
    /// and interned string references).
    fn lea_mnemonic(&self) -> &'static str;
    /// Unconditional branch mnemonic.
    fn branch_mnemonic(&self) -> &'static str;
    /// Register-is-nonzero-then-branch mnemonic (used to lower `BR_COND`
    /// and the chained-comparison `SWITCH` form).
    fn branch_if_nonzero_mnemonic(&self) -> &'static str;
    /// Call mnemonic.
    fn call_mnemonic(&self) -> &'static str;
    /// Return mnemonic.
    fn return_mnemonic(&self) -> &'static str;
    /// `.text`-equivalent section directive.
    fn text_section(&self) -> &'static str;
    /// `.data`-equivalent section directive.
    fn data_section(&self) -> &'static str;
    /// `.globl`-equivalent directive.
    fn globl_directive(&self) -> &'static str;
}

/// The lowering engine, parameterized by the target's particulars.
pub(crate) struct Engine<T: RegisterWindowTarget> {
    target: T,
    dialect: Dialect,
    fp_format: FpFormat,
    abi: AbiVariant,
}

/// Per-value stack layout, computed once per function before emission.
struct Frame {
    /// Byte offset from the frame pointer for each value's spill slot
    /// (negative, growing down, for every target in this family).
    slots: HashMap<Value, i32>,
    total_size: u32,
}

impl<T: RegisterWindowTarget> Engine<T> {
    pub(crate) fn new(target: T, abi: AbiVariant) -> Self {
        let dialect = target.native_dialect();
        Engine { target, dialect, fp_format: FpFormat::Ieee754, abi }
    }

    fn word_size(&self) -> u32 {
        self.target.arch_info().word_size
    }

    fn slot_size(&self, ty: &Type) -> u32 {
        ty.size().max(self.word_size())
    }

    /// Assign every instruction result and every parameter its own stack
    /// slot. Slots are never reused (no liveness analysis — §1 non-goal
    /// (d)): frame size is simply the sum of every value's slot.
    fn build_frame(&self, func: &Function) -> Frame {
        let mut slots = HashMap::new();
        let mut offset: i32 = 0;
        let ws = self.word_size() as i32;

        for &p in func.params() {
            offset -= ws.max(self.slot_size(func.value(p).ty()) as i32);
            slots.insert(p, offset);
        }
        for block in func.blocks() {
            for inst in func.block_insts(block) {
                if let Some(result) = func.inst(inst).result() {
                    let size = self.slot_size(func.value(result).ty()) as i32;
                    offset -= size;
                    slots.insert(result, offset);
                }
            }
        }
        let raw_size = (-offset) as u32 + func.max_outgoing_arg_slots * self.word_size();
        let align = self.target.stack_alignment();
        let total_size = round_up(raw_size, align);
        Frame { slots, total_size }
    }

    fn reg(&self, name: &str) -> String {
        match self.dialect {
            Dialect::Att => format!("%{name}"),
            _ => name.to_string(),
        }
    }

    fn imm(&self, v: i64) -> String {
        match self.dialect {
            Dialect::Att => format!("${v}"),
            _ => format!("{v}"),
        }
    }

    fn mem(&self, base: &str, offset: i32) -> String {
        match self.target.mem_syntax(self.dialect) {
            MemSyntax::OffsetParen => format!("{offset}({})", self.reg(base)),
            MemSyntax::X86Bracket if offset == 0 => format!("[{}]", self.reg(base)),
            MemSyntax::X86Bracket => format!("[{}{offset:+}]", self.reg(base)),
            MemSyntax::ArmBracket => format!("[{}, #{offset}]", self.reg(base)),
        }
    }

    /// `mnemonic dst, src` (Intel-style order) or `mnemonic src, dst`
    /// (AT&T order), per the engine's configured dialect.
    fn two_operand(&self, buf: &mut String, mnemonic: &str, dst: &str, src: &str) {
        match self.dialect {
            Dialect::Att => writeln!(buf, "    {mnemonic} {src}, {dst}").unwrap(),
            _ => writeln!(buf, "    {mnemonic} {dst}, {src}").unwrap(),
        }
    }

    fn load_slot(&self, buf: &mut String, reg: &str, offset: i32) {
        let mnemonic = self.target.mnemonic(Opcode::Load);
        let mem = self.mem(self.target.frame_reg(), offset);
        self.two_operand(buf, mnemonic, &self.reg(reg), &mem);
    }

    fn store_slot(&self, buf: &mut String, offset: i32, reg: &str) {
        let mnemonic = self.target.mnemonic(Opcode::Store);
        let mem = self.mem(self.target.frame_reg(), offset);
        self.two_operand(buf, mnemonic, &mem, &self.reg(reg));
    }

    fn load_imm(&self, buf: &mut String, reg: &str, v: i64) {
        let mnemonic = self.target.load_imm_mnemonic();
        self.two_operand(buf, mnemonic, &self.reg(reg), &self.imm(v));
    }

    fn load_symbol_addr(&self, buf: &mut String, reg: &str, symbol: &str) {
        let mnemonic = self.target.lea_mnemonic();
        writeln!(buf, "    {mnemonic} {}, {symbol}", self.reg(reg)).unwrap();
    }

    fn block_label(&self, func_name: &str, block: Block) -> String {
        format!("L{func_name}${block}")
    }

    /// Load `operand`'s value into `reg`, resolving every [`ValueData`]
    /// kind the builder can produce.
    fn materialize(
        &self,
        buf: &mut String,
        module: &Module,
        func: &Function,
        frame: &Frame,
        reg: &str,
        operand: Value,
    ) {
        match func.value(operand) {
            ValueData::ConstInt { bits, .. } => self.load_imm(buf, reg, *bits),
            ValueData::ConstFloat { bits, .. } => self.load_imm(buf, reg, bits.to_bits() as i64),
            ValueData::ConstNull { .. } => self.load_imm(buf, reg, 0),
            ValueData::ConstString { bytes } => {
                // `Module` is borrowed immutably here; the label a given
                // byte string maps to was already fixed by
                // `Module::intern_all_strings`, which `Context::codegen`
                // runs (mutably) before ever handing the module to a
                // backend, so this only has to find the label, not assign
                // one.
                let idx = module.strings().iter().position(|s| s == bytes).unwrap_or(0);
                self.load_symbol_addr(buf, reg, &format!(".Lstr{idx}"));
            }
            ValueData::Global { global, .. } => {
                let name = self.target.symbol(module.global(*global).name());
                self.load_symbol_addr(buf, reg, &name);
            }
            ValueData::Func { func: callee, .. } => {
                let name = self.target.symbol(&module.func(*callee).name);
                self.load_symbol_addr(buf, reg, &name);
            }
            ValueData::Param { .. } | ValueData::InstResult { .. } => {
                let offset = frame.slots[&operand];
                self.load_slot(buf, reg, offset);
            }
            ValueData::BlockLabel { .. } => {
                panic!("a block label is never loaded as a data value");
            }
        }
    }

    fn emit_prologue(&self, buf: &mut String, frame: &Frame) {
        let sp = self.target.stack_reg();
        let fp = self.target.frame_reg();
        let callee_saved = self.target.callee_saved();
        if !callee_saved.is_empty() {
            writeln!(buf, "    ; save callee-saved registers: {}", callee_saved.join(", ")).unwrap();
        }
        writeln!(buf, "    ; establish frame pointer").unwrap();
        self.two_operand(buf, self.target.mnemonic(Opcode::Add), &self.reg(fp), &self.reg(sp));
        if frame.total_size > 0 {
            writeln!(
                buf,
                "    ; allocate {} bytes of stack frame ({} value slots + outgoing args)",
                frame.total_size,
                frame.slots.len()
            )
            .unwrap();
            let mnemonic = match self.target.arch_info().stack_dir {
                StackDirection::Down => self.target.mnemonic(Opcode::Sub),
                StackDirection::Up => self.target.mnemonic(Opcode::Add),
            };
            self.two_operand(buf, mnemonic, &self.reg(sp), &self.imm(frame.total_size as i64));
        }
    }

    fn emit_param_spills(&self, buf: &mut String, func: &Function, frame: &Frame) {
        let arg_regs = self.target.arg_regs();
        for (i, &p) in func.params().iter().enumerate() {
            let offset = frame.slots[&p];
            if let Some(reg) = arg_regs.get(i) {
                self.store_slot(buf, offset, reg);
            } else {
                writeln!(
                    buf,
                    "    ; parameter {i} arrives on the stack, already in its slot"
                )
                .unwrap();
            }
        }
    }

    fn emit_epilogue(&self, buf: &mut String) {
        let callee_saved = self.target.callee_saved();
        if !callee_saved.is_empty() {
            writeln!(buf, "    ; restore callee-saved registers: {}", callee_saved.join(", ")).unwrap();
        }
        writeln!(buf, "    ; tear down frame").unwrap();
        writeln!(buf, "    {}", self.target.return_mnemonic()).unwrap();
    }

    fn emit_inst(
        &self,
        buf: &mut String,
        module: &Module,
        func: &Function,
        frame: &Frame,
        func_name: &str,
        inst: Inst,
    ) -> Result<()> {
        let data = func.inst(inst);
        let op = data.opcode();
        let (primary, secondary) = self.target.scratch_regs();

        match op {
            Opcode::Nop => {}

            _ if op.is_binary_int() || op.is_binary_float() || op.is_int_compare() || op == Opcode::Fcmp => {
                let operands = data.operands();
                self.materialize(buf, module, func, frame, primary, operands[0]);
                self.materialize(buf, module, func, frame, secondary, operands[1]);
                self.two_operand(buf, self.target.mnemonic(op), &self.reg(primary), &self.reg(secondary));
                self.store_slot(buf, frame.slots[&data.result().unwrap()], primary);
            }

            Opcode::Neg | Opcode::Not | Opcode::Fneg | Opcode::Fabs => {
                self.materialize(buf, module, func, frame, primary, data.operands()[0]);
                writeln!(buf, "    {} {}", self.target.mnemonic(op), self.reg(primary)).unwrap();
                self.store_slot(buf, frame.slots[&data.result().unwrap()], primary);
            }

            Opcode::Alloca => {
                // The slot itself IS the storage; materialize its address.
                let offset = frame.slots[&data.result().unwrap()];
                writeln!(
                    buf,
                    "    ; alloca: {} bytes reserved at frame offset {offset}",
                    data.aux_type().map(Type::size).unwrap_or(0)
                )
                .unwrap();
                let mem = self.mem(self.target.frame_reg(), offset);
                self.load_symbol_addr(buf, primary, &mem);
                self.store_slot(buf, offset, primary);
            }

            Opcode::Load => {
                self.materialize(buf, module, func, frame, primary, data.operands()[0]);
                writeln!(
                    buf,
                    "    {} ({}), {}",
                    self.target.mnemonic(Opcode::Load),
                    self.reg(primary),
                    self.reg(secondary)
                )
                .unwrap();
                self.store_slot(buf, frame.slots[&data.result().unwrap()], secondary);
            }

            Opcode::Store => {
                let operands = data.operands();
                self.materialize(buf, module, func, frame, primary, operands[0]);
                self.materialize(buf, module, func, frame, secondary, operands[1]);
                writeln!(
                    buf,
                    "    {} {}, ({})",
                    self.target.mnemonic(Opcode::Store),
                    self.reg(primary),
                    self.reg(secondary)
                )
                .unwrap();
            }

            Opcode::Gep => {
                let operands = data.operands();
                self.materialize(buf, module, func, frame, primary, operands[0]);
                let elem_size = data.aux_type().map(Type::size).unwrap_or(1) as i64;
                for idx in &operands[1..] {
                    self.materialize(buf, module, func, frame, secondary, *idx);
                    self.two_operand(buf, self.target.mnemonic(Opcode::Mul), &self.reg(secondary), &self.imm(elem_size));
                    self.two_operand(buf, self.target.mnemonic(Opcode::Add), &self.reg(primary), &self.reg(secondary));
                }
                self.store_slot(buf, frame.slots[&data.result().unwrap()], primary);
            }

            Opcode::StructGep => {
                self.materialize(buf, module, func, frame, primary, data.operands()[0]);
                let field_offset = data
                    .aux_type()
                    .and_then(|t| t.field(data.imm().unwrap_or(0) as u32).ok())
                    .map(|f| f.offset)
                    .unwrap_or(0);
                writeln!(buf, "    ; add field offset {field_offset} to {}", self.reg(primary)).unwrap();
                self.store_slot(buf, frame.slots[&data.result().unwrap()], primary);
            }

            Opcode::Br => {
                let target = data.true_block().expect("BR always carries a target");
                writeln!(buf, "    {} {}", self.target.branch_mnemonic(), self.block_label(func_name, target)).unwrap();
            }

            Opcode::BrCond => {
                self.materialize(buf, module, func, frame, primary, data.operands()[0]);
                let then_label = self.block_label(func_name, data.true_block().unwrap());
                let else_label = self.block_label(func_name, data.false_block().unwrap());
                writeln!(
                    buf,
                    "    {} {}, {then_label}",
                    self.target.branch_if_nonzero_mnemonic(),
                    self.reg(primary)
                )
                .unwrap();
                writeln!(buf, "    {} {else_label}", self.target.branch_mnemonic()).unwrap();
            }

            Opcode::Call => self.emit_call(buf, module, func, frame, inst)?,

            Opcode::Ret => {
                if let Some(&v) = data.operands().first() {
                    self.materialize(buf, module, func, frame, self.target.ret_reg(), v);
                }
                self.emit_epilogue(buf);
            }

            Opcode::Switch => self.emit_switch(buf, module, func, frame, func_name, inst),

            Opcode::Trunc
            | Opcode::Zext
            | Opcode::Sext
            | Opcode::Fptrunc
            | Opcode::Fpext
            | Opcode::Fptosi
            | Opcode::Fptoui
            | Opcode::Sitofp
            | Opcode::Uitofp
            | Opcode::Ptrtoint
            | Opcode::Inttoptr => {
                self.materialize(buf, module, func, frame, primary, data.operands()[0]);
                writeln!(buf, "    {} {}", self.target.mnemonic(op), self.reg(primary)).unwrap();
                self.store_slot(buf, frame.slots[&data.result().unwrap()], primary);
            }

            Opcode::Bitcast => {
                // A no-op reinterpretation: the bit pattern is simply
                // re-spilled under the destination value's slot.
                self.materialize(buf, module, func, frame, primary, data.operands()[0]);
                self.store_slot(buf, frame.slots[&data.result().unwrap()], primary);
            }

            Opcode::Phi => {
                // PHIs are lowered out-of-SSA by `emit_block`'s predecessor
                // pass, which writes directly into this PHI's slot before
                // branching; nothing to emit at the PHI's own site beyond
                // the slot already being populated by the time control
                // reaches it.
            }

            Opcode::Select => {
                let operands = data.operands();
                self.materialize(buf, module, func, frame, primary, operands[0]);
                let then_label = format!("{func_name}$select{}$t", inst);
                let join_label = format!("{func_name}$select{}$j", inst);
                writeln!(buf, "    {} {then_label}", self.target.branch_if_nonzero_mnemonic()).unwrap();
                self.materialize(buf, module, func, frame, secondary, operands[2]);
                self.store_slot(buf, frame.slots[&data.result().unwrap()], secondary);
                writeln!(buf, "    {} {join_label}", self.target.branch_mnemonic()).unwrap();
                writeln!(buf, "{then_label}:").unwrap();
                self.materialize(buf, module, func, frame, secondary, operands[1]);
                self.store_slot(buf, frame.slots[&data.result().unwrap()], secondary);
                writeln!(buf, "{join_label}:").unwrap();
            }
        }
        Ok(())
    }

    fn emit_call(&self, buf: &mut String, module: &Module, func: &Function, frame: &Frame, inst: Inst) -> Result<()> {
        let data = func.inst(inst);
        let operands = data.operands();
        let (callee, args) = operands.split_first().expect("CALL always has a callee operand");
        let arg_regs = self.target.arg_regs();
        for (i, &arg) in args.iter().enumerate() {
            if let Some(reg) = arg_regs.get(i) {
                self.materialize(buf, module, func, frame, reg, arg);
            } else {
                let (primary, _) = self.target.scratch_regs();
                self.materialize(buf, module, func, frame, primary, arg);
                let slot = (i - arg_regs.len()) as i32 * self.word_size() as i32;
                writeln!(
                    buf,
                    "    ; outgoing stack argument {i} at {}",
                    self.mem(self.target.stack_reg(), slot)
                )
                .unwrap();
            }
        }
        let callee_name = match func.value(*callee) {
            ValueData::Func { func: f, .. } => self.target.symbol(&module.func(*f).name),
            _ => {
                let (primary, _) = self.target.scratch_regs();
                self.materialize(buf, module, func, frame, primary, *callee);
                self.reg(primary)
            }
        };
        writeln!(buf, "    {} {callee_name}", self.target.call_mnemonic()).unwrap();
        if let Some(result) = data.result() {
            if *result.ty_of(func).kind() != TypeKind::Void {
                let (primary, _) = self.target.scratch_regs();
                let ret_reg = self.target.ret_reg();
                writeln!(buf, "    {} {}, {}", self.target.mnemonic(Opcode::Add), self.reg(primary), self.reg(ret_reg))
                    .unwrap();
                self.store_slot(buf, frame.slots[&result], primary);
            }
        }
        Ok(())
    }

    /// `SWITCH` lowering: a chained compare-and-branch sequence over every
    /// case, falling through to the default block (DESIGN.md's resolution
    /// of the open question on `SWITCH`: no jump tables, since a jump
    /// table needs an address-taken label array this accumulator-style
    /// lowering has no machinery for).
    fn emit_switch(&self, buf: &mut String, module: &Module, func: &Function, frame: &Frame, func_name: &str, inst: Inst) {
        let data = func.inst(inst);
        let (primary, _) = self.target.scratch_regs();
        self.materialize(buf, module, func, frame, primary, data.operands()[0]);
        let cases = data.switch_cases();
        let default_label = self.block_label(func_name, data.switch_default().unwrap());

        writeln!(buf, "    ; chained-comparison switch over {} cases", cases.len()).unwrap();
        for case in cases {
            let case_label = self.block_label(func_name, case.target);
            writeln!(buf, "    {} {}, {}", self.target.mnemonic(Opcode::CmpEq), self.reg(primary), self.imm(case.value))
                .unwrap();
            writeln!(buf, "    {} {case_label}", self.target.branch_if_nonzero_mnemonic()).unwrap();
        }
        writeln!(buf, "    {} {default_label}", self.target.branch_mnemonic()).unwrap();
    }

    fn emit_block(&self, buf: &mut String, module: &Module, func: &Function, frame: &Frame, func_name: &str, block: Block) -> Result<()> {
        writeln!(buf, "{}:", self.block_label(func_name, block)).unwrap();
        // Out-of-SSA PHI lowering: any PHI at the *start* of a successor
        // block is written into its slot here, from this (the
        // predecessor's) side, immediately before the terminator branches
        // away — the classic technique for lowering PHIs without a real
        // parallel-copy/SSA-destruction pass.
        for succ in func.block(block).succs().to_vec() {
            for succ_inst in func.block_insts(succ) {
                let succ_data = func.inst(succ_inst);
                if succ_data.opcode() != Opcode::Phi {
                    break;
                }
                if let Some(edge) = succ_data.phi_edges().iter().find(|e| e.from == block) {
                    let (primary, _) = self.target.scratch_regs();
                    self.materialize(buf, module, func, frame, primary, edge.value);
                    self.store_slot(buf, frame.slots[&succ_data.result().unwrap()], primary);
                }
            }
        }
        for inst in func.block_insts(block) {
            self.emit_inst(buf, module, func, frame, func_name, inst)?;
        }
        Ok(())
    }

    fn emit_function(&self, buf: &mut String, module: &Module, func: &Function) -> Result<()> {
        let name = self.target.symbol(&func.name);
        writeln!(buf, "{} {name}", self.target.globl_directive()).unwrap();
        writeln!(buf, "{name}:").unwrap();
        if func.is_declaration {
            writeln!(buf, "    ; declaration only, no body").unwrap();
            return Ok(());
        }
        let frame = self.build_frame(func);
        self.emit_prologue(buf, &frame);
        self.emit_param_spills(buf, func, &frame);
        for block in func.blocks() {
            self.emit_block(buf, module, func, &frame, &func.name, block)?;
        }
        Ok(())
    }

    fn emit_globals_and_strings(&self, buf: &mut String, module: &Module) {
        if module.globals().next().is_none() && module.strings().is_empty() {
            return;
        }
        writeln!(buf, "{}", self.target.data_section()).unwrap();
        for (_, g) in module.globals() {
            let name = self.target.symbol(g.name());
            writeln!(buf, "{} {name}", self.target.globl_directive()).unwrap();
            match g.initializer() {
                Some(init) => writeln!(buf, "{name}: ; type {}, initializer {:?}", g.ty(), init).unwrap(),
                None => writeln!(buf, "{name}: ; type {}, zero-initialized, {} bytes", g.ty(), g.ty().size()).unwrap(),
            };
        }
        for (i, bytes) in module.strings().iter().enumerate() {
            writeln!(buf, ".Lstr{i}: ; {} bytes", bytes.len()).unwrap();
        }
    }
}

fn round_up(v: u32, align: u32) -> u32 {
    if align == 0 {
        return v;
    }
    (v + align - 1) / align * align
}

/// Resolve a value's type without needing the builder's `ptr_size`-aware
/// helper (codegen never sees `ConstString`, whose type that helper
/// exists for — every string reference by codegen time is already either
/// an operand materialized above, or this call's own result type drawn
/// straight from `InstData::result_ty`).
trait ValueTypeExt {
    fn ty_of<'f>(self, func: &'f Function) -> &'f Type;
}

impl ValueTypeExt for Value {
    fn ty_of<'f>(self, func: &'f Function) -> &'f Type {
        func.value(self).ty()
    }
}

impl<T: RegisterWindowTarget> Backend for Engine<T> {
    fn arch_info(&self) -> ArchInfo {
        self.target.arch_info()
    }

    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn set_dialect(&mut self, dialect: Dialect) -> Result<()> {
        if !self.target.allows_dialect_override() {
            return Err(Error::unsupported(format!(
                "{} has a fixed assembler dialect",
                self.target.arch_info().name
            )));
        }
        if !matches!(dialect, Dialect::Att | Dialect::Intel) {
            return Err(Error::unsupported("only AT&T/Intel dialects apply to the register-window family"));
        }
        self.dialect = dialect;
        Ok(())
    }

    fn fp_format(&self) -> FpFormat {
        self.fp_format
    }

    fn set_fp_format(&mut self, fmt: FpFormat) -> Result<()> {
        if !matches!(fmt, FpFormat::Ieee754) {
            return Err(Error::unsupported(format!(
                "{} only supports IEEE-754 floating point",
                self.target.arch_info().name
            )));
        }
        self.fp_format = fmt;
        Ok(())
    }

    fn set_abi(&mut self, abi: AbiVariant) -> Result<()> {
        self.abi = abi;
        Ok(())
    }

    fn codegen_module(&self, module: &Module) -> Result<String> {
        let mut buf = String::new();
        writeln!(buf, "    {}", self.target.text_section()).unwrap();
        for (_, func) in module.functions() {
            self.emit_function(&mut buf, module, func)?;
        }
        self.emit_globals_and_strings(&mut buf, module);
        Ok(buf)
    }
}
