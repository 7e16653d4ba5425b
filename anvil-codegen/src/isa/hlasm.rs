//! Shared lowering engine for the IBM mainframe target family: System/370,
//! System/370-XA, System/390, and z/Architecture.
//!
//! These four share a calling convention shape that the register-window
//! family does not: arguments travel as an address-list pointed to by a
//! single register rather than in a handful of argument registers, the
//! stack (a chain of linked save areas, not a flat frame) grows *up*, and
//! the assembler syntax is HLASM's fixed-column form rather than GAS/NASM's
//! free-form one. What still differs
//! between the four is addressing-mode width, save-area size, and which
//! floating-point instruction set (HFP, IEEE-754, or either) the target's
//! hardware offers — this module holds the one copy of the chained-save-area
//! prologue/epilogue, the arg-list call sequence, and the HLASM
//! column-formatting helper (`SPEC_FULL.md` §9: "keep a single helper for
//! HLASM lines; do not scatter column-counting across backends"), and each
//! target supplies a small [`MainframeTarget`] of the particulars. This
//! mirrors [`crate::isa::regwin`]'s split for the other seven targets, and
//! the teacher's own `pulley_shared`/per-width-backend shape.

use crate::error::{Error, Result};
use crate::ir::{Block, Function, Inst, Module, Opcode, Type, TypeKind, Value, ValueData};
use crate::isa::mnemonics;
use crate::isa::{AbiVariant, ArchInfo, Backend, Dialect, FpFormat};
use std::collections::HashMap;
use std::fmt::Write as _;

/// The target-specific particulars the shared mainframe engine needs.
/// Instruction *selection* lives in the engine; these methods only ever
/// supply register names, sizes, and addressing-mode strings.
pub(crate) trait MainframeTarget {
    /// This target's static descriptor.
    fn arch_info(&self) -> ArchInfo;
    /// `AMODE`/`RMODE` directive value: `"24"`, `"31"`, or `"64"`.
    fn addr_mode(&self) -> &'static str;
    /// Size in bytes of one chained save area: 72 for the three
    /// System/3x0 variants, 144 for z/Architecture (`SPEC_FULL.md` §4.7's
    /// ABI table).
    fn save_area_size(&self) -> u32;
    /// The floating-point formats this target's hardware actually offers.
    /// S/370 offers only HFP; S/390 offers HFP and IEEE-754; z/Architecture
    /// offers both, selectable per context.
    fn supported_fp_formats(&self) -> &'static [FpFormat];
    /// The format a fresh context targeting this backend starts in.
    fn default_fp_format(&self) -> FpFormat;
    /// General-purpose scratch register pair used for the accumulator
    /// scheme. Never `R1` (reserved for the arg-list pointer at a `CALL`)
    /// or `R13`/`R14`/`R15` (reserved for the save-area base, link, and
    /// return registers).
    fn scratch_regs(&self) -> (&'static str, &'static str);
    /// The save-area base register (conventionally `R13`).
    fn frame_reg(&self) -> &'static str;
    /// The argument-list pointer register (`R1`, per the ABI table).
    fn arglist_reg(&self) -> &'static str;
    /// The return-value register (`R15`, per the ABI table).
    fn ret_reg(&self) -> &'static str;
    /// The return-address (link) register (`R14`), used by `BR` to return.
    fn link_reg(&self) -> &'static str;
}

/// The lowering engine, parameterized by the target's particulars.
pub(crate) struct Engine<T: MainframeTarget> {
    target: T,
    fp_format: FpFormat,
    abi: AbiVariant,
}

/// Per-value stack layout, computed once per function before emission.
/// Offsets grow *up* from the end of this function's own save area, since
/// every mainframe target in this family grows its call stack upward
///.
struct Frame {
    slots: HashMap<Value, i32>,
    total_size: u32,
}

impl<T: MainframeTarget> Engine<T> {
    pub(crate) fn new(target: T, abi: AbiVariant) -> Self {
        let fp_format = target.default_fp_format();
        Engine { target, fp_format, abi }
    }

    fn word_size(&self) -> u32 {
        self.target.arch_info().word_size
    }

    fn slot_size(&self, ty: &Type) -> u32 {
        ty.size().max(self.word_size())
    }

    fn build_frame(&self, func: &Function) -> Frame {
        let mut slots = HashMap::new();
        let mut offset: i32 = self.target.save_area_size() as i32;
        for &p in func.params() {
            slots.insert(p, offset);
            offset += self.slot_size(p.ty_of(func)) as i32;
        }
        for block in func.blocks() {
            for inst in func.block_insts(block) {
                if let Some(result) = func.inst(inst).result() {
                    slots.insert(result, offset);
                    offset += self.slot_size(result.ty_of(func)) as i32;
                }
            }
        }
        let raw_size = offset as u32 + func.max_outgoing_arg_slots * self.word_size();
        let total_size = round_up(raw_size, 8);
        Frame { slots, total_size }
    }

    /// The single HLASM column-formatting helper every emission site in
    /// this module goes through: label in columns 1-8, opcode from column
    /// 10, operands from column 16.
    fn line(&self, buf: &mut String, label: Option<&str>, op: &str, operands: &str) {
        let label_field = format!("{:<8}", label.unwrap_or(""));
        let op_field = format!("{:<5}", op);
        if operands.is_empty() {
            writeln!(buf, "{label_field} {op_field}").unwrap();
        } else {
            writeln!(buf, "{label_field} {op_field} {operands}").unwrap();
        }
    }

    fn comment(&self, buf: &mut String, text: &str) {
        writeln!(buf, "*{text}").unwrap();
    }

    fn mem(&self, base: &str, offset: i32) -> String {
        format!("{offset}({base})")
    }

    fn block_label(&self, func_name: &str, block: Block) -> String {
        format!("L{}${block}", func_name.to_uppercase())
    }

    fn load_slot(&self, buf: &mut String, reg: &str, offset: i32) {
        self.line(buf, None, mnemonics::mainframe(Opcode::Load, self.fp_format), &format!("{reg},{}", self.mem(self.target.frame_reg(), offset)));
    }

    fn store_slot(&self, buf: &mut String, offset: i32, reg: &str) {
        self.line(buf, None, mnemonics::mainframe(Opcode::Store, self.fp_format), &format!("{reg},{}", self.mem(self.target.frame_reg(), offset)));
    }

    fn load_imm(&self, buf: &mut String, reg: &str, v: i64) {
        self.line(buf, None, "LA", &format!("{reg},{v}"));
    }

    fn load_symbol_addr(&self, buf: &mut String, reg: &str, symbol: &str) {
        self.line(buf, None, "LA", &format!("{reg},{symbol}"));
    }

    fn materialize(&self, buf: &mut String, module: &Module, func: &Function, frame: &Frame, reg: &str, operand: Value) {
        match func.value(operand) {
            ValueData::ConstInt { bits, .. } => self.load_imm(buf, reg, *bits),
            ValueData::ConstFloat { bits, .. } => self.load_imm(buf, reg, bits.to_bits() as i64),
            ValueData::ConstNull { .. } => self.load_imm(buf, reg, 0),
            ValueData::ConstString { bytes } => {
                let idx = module.strings().iter().position(|s| s == bytes).unwrap_or(0);
                self.load_symbol_addr(buf, reg, &format!("STR{idx}"));
            }
            ValueData::Global { global, .. } => {
                let name = module.global(*global).name().to_uppercase();
                self.load_symbol_addr(buf, reg, &name);
            }
            ValueData::Func { func: callee, .. } => {
                let name = module.func(*callee).name.to_uppercase();
                self.load_symbol_addr(buf, reg, &name);
            }
            ValueData::Param { .. } | ValueData::InstResult { .. } => {
                let offset = frame.slots[&operand];
                self.load_slot(buf, reg, offset);
            }
            ValueData::BlockLabel { .. } => panic!("a block label is never loaded as a data value"),
        }
    }

    /// Establish the chained-save-area prologue: the caller already
    /// allocated *our* save area and passed its address in the link-time
    /// base register; we save the caller's registers into it, point
    /// `R13` at it for the rest of this function, and chain it to the
    /// caller's own save area in both directions, per the classic
    /// System/370 linkage convention every target in this family inherits.
    fn emit_prologue(&self, buf: &mut String, func_name: &str, frame: &Frame) {
        let label = func_name.to_uppercase();
        self.comment(buf, format!(" {label}: chained-save-area prologue ({} byte save area)", self.target.save_area_size()).as_str());
        self.line(buf, Some(&label), "STM", &format!("R14,R12,12({})", self.target.frame_reg()));
        self.line(buf, None, "ST", &format!("{},8({})", self.target.frame_reg(), self.target.frame_reg()));
        self.line(buf, None, "ST", &format!("{},4({})", self.target.frame_reg(), self.target.frame_reg()));
        if frame.total_size > 0 {
            self.comment(
                buf,
                &format!(" allocate {} bytes of local storage ({} value slots)", frame.total_size, frame.slots.len()),
            );
        }
    }

    fn emit_param_spills(&self, buf: &mut String, func: &Function, frame: &Frame) {
        let (primary, _) = self.target.scratch_regs();
        for (i, &p) in func.params().iter().enumerate() {
            let offset = frame.slots[&p];
            self.comment(buf, &format!(" parameter {i}: load its address from the incoming arg list"));
            self.line(buf, None, "L", &format!("{primary},{}({})", i as u32 * self.word_size(), self.target.arglist_reg()));
            self.line(
                buf,
                None,
                mnemonics::mainframe(Opcode::Load, self.fp_format),
                &format!("{primary},0({primary})"),
            );
            self.store_slot(buf, offset, primary);
        }
    }

    fn emit_epilogue(&self, buf: &mut String) {
        self.comment(buf, " restore caller's registers and return");
        self.line(buf, None, "LM", &format!("R14,R12,12({})", self.target.frame_reg()));
        self.line(buf, None, "BR", self.target.link_reg());
    }

    fn emit_inst(&self, buf: &mut String, module: &Module, func: &Function, frame: &Frame, func_name: &str, inst: Inst) -> Result<()> {
        let data = func.inst(inst);
        let op = data.opcode();
        let (primary, secondary) = self.target.scratch_regs();

        match op {
            Opcode::Nop => {}

            _ if op.is_binary_int() || op.is_binary_float() || op.is_int_compare() || op == Opcode::Fcmp => {
                let operands = data.operands();
                self.materialize(buf, module, func, frame, primary, operands[0]);
                self.materialize(buf, module, func, frame, secondary, operands[1]);
                self.line(buf, None, mnemonics::mainframe(op, self.fp_format), &format!("{primary},{secondary}"));
                self.store_slot(buf, frame.slots[&data.result().unwrap()], primary);
            }

            Opcode::Neg | Opcode::Not | Opcode::Fneg | Opcode::Fabs => {
                self.materialize(buf, module, func, frame, primary, data.operands()[0]);
                self.line(buf, None, mnemonics::mainframe(op, self.fp_format), primary);
                self.store_slot(buf, frame.slots[&data.result().unwrap()], primary);
            }

            Opcode::Alloca => {
                let offset = frame.slots[&data.result().unwrap()];
                self.comment(
                    buf,
                    &format!(" alloca: {} bytes reserved at frame offset {offset}", data.aux_type().map(Type::size).unwrap_or(0)),
                );
                self.load_symbol_addr(buf, primary, &self.mem(self.target.frame_reg(), offset));
                self.store_slot(buf, offset, primary);
            }

            Opcode::Load => {
                self.materialize(buf, module, func, frame, primary, data.operands()[0]);
                self.line(buf, None, mnemonics::mainframe(Opcode::Load, self.fp_format), &format!("{secondary},0({primary})"));
                self.store_slot(buf, frame.slots[&data.result().unwrap()], secondary);
            }

            Opcode::Store => {
                let operands = data.operands();
                self.materialize(buf, module, func, frame, primary, operands[0]);
                self.materialize(buf, module, func, frame, secondary, operands[1]);
                self.line(buf, None, mnemonics::mainframe(Opcode::Store, self.fp_format), &format!("{primary},0({secondary})"));
            }

            Opcode::Gep => {
                let operands = data.operands();
                self.materialize(buf, module, func, frame, primary, operands[0]);
                let elem_size = data.aux_type().map(Type::size).unwrap_or(1) as i64;
                for idx in &operands[1..] {
                    self.materialize(buf, module, func, frame, secondary, *idx);
                    self.line(buf, None, "MHI", &format!("{secondary},{elem_size}"));
                    self.line(buf, None, "AR", &format!("{primary},{secondary}"));
                }
                self.store_slot(buf, frame.slots[&data.result().unwrap()], primary);
            }

            Opcode::StructGep => {
                self.materialize(buf, module, func, frame, primary, data.operands()[0]);
                let field_offset = data.aux_type().and_then(|t| t.field(data.imm().unwrap_or(0) as u32).ok()).map(|f| f.offset).unwrap_or(0);
                self.comment(buf, &format!(" add field offset {field_offset} to {primary}"));
                self.store_slot(buf, frame.slots[&data.result().unwrap()], primary);
            }

            Opcode::Br => {
                let target = data.true_block().expect("BR always carries a target");
                self.line(buf, None, "B", &self.block_label(func_name, target));
            }

            Opcode::BrCond => {
                self.materialize(buf, module, func, frame, primary, data.operands()[0]);
                self.line(buf, None, "LTR", &format!("{primary},{primary}"));
                let then_label = self.block_label(func_name, data.true_block().unwrap());
                let else_label = self.block_label(func_name, data.false_block().unwrap());
                self.line(buf, None, "BNZ", &then_label);
                self.line(buf, None, "B", &else_label);
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
                self.line(buf, None, mnemonics::mainframe(op, self.fp_format), primary);
                self.store_slot(buf, frame.slots[&data.result().unwrap()], primary);
            }

            Opcode::Bitcast => {
                self.materialize(buf, module, func, frame, primary, data.operands()[0]);
                self.store_slot(buf, frame.slots[&data.result().unwrap()], primary);
            }

            Opcode::Phi => {}

            Opcode::Select => {
                let operands = data.operands();
                self.materialize(buf, module, func, frame, primary, operands[0]);
                let then_label = format!("{}SEL{inst}T", func_name.to_uppercase());
                let join_label = format!("{}SEL{inst}J", func_name.to_uppercase());
                self.line(buf, None, "LTR", &format!("{primary},{primary}"));
                self.line(buf, None, "BNZ", &then_label);
                self.materialize(buf, module, func, frame, secondary, operands[2]);
                self.store_slot(buf, frame.slots[&data.result().unwrap()], secondary);
                self.line(buf, None, "B", &join_label);
                self.line(buf, Some(&then_label), "DS", "0H");
                self.materialize(buf, module, func, frame, secondary, operands[1]);
                self.store_slot(buf, frame.slots[&data.result().unwrap()], secondary);
                self.line(buf, Some(&join_label), "DS", "0H");
            }
        }
        Ok(())
    }

    /// `CALL` lowering: build the callee's argument list (one full-word
    /// *address* per argument, the System/370 family's indirection
    /// convention, `SPEC_FULL.md` §4.7) in this function's own outgoing-args
    /// area, point the arg-list register at it, and branch-and-link.
    fn emit_call(&self, buf: &mut String, module: &Module, func: &Function, frame: &Frame, inst: Inst) -> Result<()> {
        let data = func.inst(inst);
        let operands = data.operands();
        let (callee, args) = operands.split_first().expect("CALL always has a callee operand");
        let (primary, secondary) = self.target.scratch_regs();
        let base = frame.total_size as i32;

        self.comment(buf, &format!(" build {}-entry argument list at outgoing-args area", args.len()));
        for (i, &arg) in args.iter().enumerate() {
            let arg_value_slot = base + (args.len() as i32 + i as i32) * self.word_size() as i32;
            let arg_list_slot = base + i as i32 * self.word_size() as i32;
            self.materialize(buf, module, func, frame, primary, arg);
            self.store_slot(buf, arg_value_slot, primary);
            self.load_symbol_addr(buf, secondary, &self.mem(self.target.frame_reg(), arg_value_slot));
            self.store_slot(buf, arg_list_slot, secondary);
        }
        // Unlike x86-64 System V (which needs a vector-register count in
        // `%al` only for variadic calls), every mainframe call in this
        // family already goes through the arg-list-pointer convention, so
        // a variadic callee needs no extra marshaling beyond what every
        // other call already does.
        self.load_symbol_addr(buf, self.target.arglist_reg(), &self.mem(self.target.frame_reg(), base));

        let callee_name = match func.value(*callee) {
            ValueData::Func { func: f, .. } => module.func(*f).name.to_uppercase(),
            _ => {
                self.materialize(buf, module, func, frame, primary, *callee);
                primary.to_string()
            }
        };
        self.line(buf, None, "BAL", &format!("{},{callee_name}", self.target.link_reg()));
        if let Some(result) = data.result() {
            if *result.ty_of(func).kind() != TypeKind::Void {
                let (primary, _) = self.target.scratch_regs();
                self.line(buf, None, "LR", &format!("{primary},{}", self.target.ret_reg()));
                self.store_slot(buf, frame.slots[&result], primary);
            }
        }
        Ok(())
    }

    fn emit_switch(&self, buf: &mut String, module: &Module, func: &Function, frame: &Frame, func_name: &str, inst: Inst) {
        let data = func.inst(inst);
        let (primary, _) = self.target.scratch_regs();
        self.materialize(buf, module, func, frame, primary, data.operands()[0]);
        let cases = data.switch_cases();
        let default_label = self.block_label(func_name, data.switch_default().unwrap());

        self.comment(buf, &format!(" chained-comparison switch over {} cases", cases.len()));
        let (_, secondary) = self.target.scratch_regs();
        for case in cases {
            let case_label = self.block_label(func_name, case.target);
            self.load_imm(buf, secondary, case.value);
            self.line(buf, None, "CR", &format!("{primary},{secondary}"));
            self.line(buf, None, "BE", &case_label);
        }
        self.line(buf, None, "B", &default_label);
    }

    fn emit_block(&self, buf: &mut String, module: &Module, func: &Function, frame: &Frame, func_name: &str, block: Block) -> Result<()> {
        writeln!(buf, "{}  DS    0H", self.block_label(func_name, block)).unwrap();
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
        let name = func.name.to_uppercase();
        if func.is_declaration {
            self.comment(buf, &format!(" {name}: external declaration, no body"));
            return Ok(());
        }
        let frame = self.build_frame(func);
        self.emit_prologue(buf, &func.name, &frame);
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
        for (_, g) in module.globals() {
            let name = g.name().to_uppercase();
            match g.initializer() {
                Some(init) => self.line(buf, Some(&name), "DC", &format!("F'{:?}'", init)),
                None => self.line(buf, Some(&name), "DS", &format!("{}C", g.ty().size().max(1))),
            }
        }
        for (i, bytes) in module.strings().iter().enumerate() {
            self.line(buf, Some(&format!("STR{i}")), "DC", &format!("C'{}'", String::from_utf8_lossy(bytes)));
        }
    }
}

fn round_up(v: u32, align: u32) -> u32 {
    if align == 0 {
        return v;
    }
    (v + align - 1) / align * align
}

trait ValueTypeExt {
    fn ty_of<'f>(self, func: &'f Function) -> &'f Type;
}

impl ValueTypeExt for Value {
    fn ty_of<'f>(self, func: &'f Function) -> &'f Type {
        func.value(self).ty()
    }
}

impl<T: MainframeTarget> Backend for Engine<T> {
    fn arch_info(&self) -> ArchInfo {
        self.target.arch_info()
    }

    fn dialect(&self) -> Dialect {
        Dialect::Hlasm
    }

    fn set_dialect(&mut self, _dialect: Dialect) -> Result<()> {
        Err(Error::unsupported(format!("{} has a fixed HLASM assembler dialect", self.target.arch_info().name)))
    }

    fn fp_format(&self) -> FpFormat {
        self.fp_format
    }

    fn set_fp_format(&mut self, fmt: FpFormat) -> Result<()> {
        if !self.target.supported_fp_formats().contains(&fmt) {
            return Err(Error::unsupported(format!(
                "{} does not support floating-point format {fmt:?}",
                self.target.arch_info().name
            )));
        }
        self.fp_format = fmt;
        Ok(())
    }

    fn set_abi(&mut self, abi: AbiVariant) -> Result<()> {
        if !matches!(abi, AbiVariant::MainframeLinkage) {
            return Err(Error::unsupported(format!("{} only accepts the mainframe linkage ABI", self.target.arch_info().name)));
        }
        self.abi = abi;
        Ok(())
    }

    fn codegen_module(&self, module: &Module) -> Result<String> {
        let mut buf = String::new();
        writeln!(buf, "{:<8} CSECT", module.name.to_uppercase()).unwrap();
        writeln!(buf, "{:<8} AMODE {}", "", self.target.addr_mode()).unwrap();
        writeln!(buf, "{:<8} RMODE {}", "", self.target.addr_mode()).unwrap();
        for (_, func) in module.functions() {
            self.emit_function(&mut buf, module, func)?;
        }
        self.emit_globals_and_strings(&mut buf, module);
        writeln!(buf, "{:<8} END", "").unwrap();
        Ok(buf)
    }
}
