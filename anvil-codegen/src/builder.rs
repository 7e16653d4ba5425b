//! The positional instruction builder.
//!
//! `FunctionBuilder` is the Rust-native resolution of the "builder cursor as
//! process-wide state" design note: rather than a
//! `Context`-global current-block/current-instruction pair, it borrows the
//! [`Function`] it is positioned over and holds its own [`Position`]. Only
//! one builder can be alive over a function at a time (the borrow checker
//! enforces it), but the ergonomics are identical to the source's
//! `set_insert_point` + `build_*` sequence.

use crate::error::{Error, Result};
use crate::ir::{
    Block, ConstValue, Func, Function, Global, InstData, Inst, Opcode, PhiEdge, SwitchCase, Type, TypeKind, Value,
    ValueData,
};

/// The builder's insertion point: the block new instructions are appended
/// to. `None` until [`FunctionBuilder::set_insert_point`] is first called;
/// creating a block never moves it.
#[derive(Debug, Clone, Copy, Default)]
struct Position {
    block: Option<Block>,
}

/// A cursor bound to one [`Function`], appending instructions at its
/// current insertion point.
///
/// `ptr_size` is threaded in at construction (from the owning
/// [`crate::Context`]'s selected target) so the builder can size pointer
/// types and the implicit type of interned string constants without holding
/// a second borrow of the context alongside its mutable borrow of the
/// function.
pub struct FunctionBuilder<'f> {
    func: &'f mut Function,
    ptr_size: u32,
    pos: Position,
}

impl<'f> FunctionBuilder<'f> {
    /// Create a builder positioned over `func`. The cursor starts
    /// unpositioned; call [`Self::set_insert_point`] before building.
    pub fn new(func: &'f mut Function, ptr_size: u32) -> Self {
        FunctionBuilder { func, ptr_size, pos: Position::default() }
    }

    /// Create a new, empty block in the underlying function. Does not move
    /// the cursor.
    pub fn create_block(&mut self) -> Block {
        self.func.create_block(None)
    }

    /// Create a new, named block in the underlying function. Does not move
    /// the cursor.
    pub fn create_named_block(&mut self, name: impl Into<String>) -> Block {
        self.func.create_block(Some(name.into()))
    }

    /// The function's auto-created entry block.
    pub fn entry_block(&self) -> Block {
        self.func.entry_block()
    }

    /// Position the cursor at the end of `block`. All subsequent `build_*`
    /// calls append after whatever is already there.
    pub fn set_insert_point(&mut self, block: Block) {
        self.pos.block = Some(block);
    }

    /// The block the cursor currently points at, if positioned.
    pub fn current_block(&self) -> Option<Block> {
        self.pos.block
    }

    /// The `index`-th declared parameter of the function being built.
    pub fn param(&self, index: usize) -> Option<Value> {
        self.func.param(index)
    }

    /// This function's own value, usable as a `CALL` callee or
    /// function-pointer operand within its own instructions (self-recursive
    /// calls, or taking its own address).
    pub fn self_value(&self) -> Value {
        self.func.as_value()
    }

    /// The type a value carries, suitable for operand validation.
    /// `ConstString` values carry no stored type (they are interned, and
    /// typed, at emission time); this resolves one as a pointer to `i8`
    /// sized per the builder's target, matching the comment on
    /// `ValueData::ty`.
    pub fn value_type(&self, v: Value) -> Type {
        match self.func.value(v) {
            ValueData::ConstString { .. } => {
                Type::ptr(Type::primitive(TypeKind::I8, 1), self.ptr_size)
            }
            other => other.ty().clone(),
        }
    }

    fn require_open_block(&self) -> Result<Block> {
        let block = self.pos.block.ok_or_else(|| Error::invalid_argument("no insert point set"))?;
        if self.func.is_terminated(block) {
            return Err(Error::invalid_argument("cannot append after a block's terminator"));
        }
        Ok(block)
    }

    fn append_void(&mut self, data: InstData) -> Result<Inst> {
        let block = self.require_open_block()?;
        Ok(self.func.append_inst(block, data))
    }

    fn append_result(&mut self, mut data: InstData, ty: Type) -> Result<Value> {
        let block = self.require_open_block()?;
        data.result_ty = Some(ty.clone());
        let inst = self.func.append_inst(block, data);
        let value = self.func.new_value(ValueData::InstResult { inst, ty });
        self.func.inst_mut(inst).result = Some(value);
        Ok(value)
    }

    // -- Constants --

    /// Mint `c` as a fresh `Value` in this function's arena, usable as an
    /// instruction operand. Every call mints a distinct `Value`, even for
    /// two calls with identical content — deduplication is only guaranteed
    /// for `const_string` at emission time (`Module::intern_string`).
    pub fn use_const(&mut self, c: ConstValue) -> Value {
        self.func.new_value(c.into_value_data())
    }

    /// `const_int(ty, bits)`: an integer literal of integer type `ty`.
    pub fn const_int(&mut self, ty: Type, bits: i64) -> Result<Value> {
        if !ty.is_int() {
            return Err(Error::invalid_argument(format!("const_int requires an integer type, got {ty}")));
        }
        Ok(self.use_const(ConstValue::Int { ty, bits }))
    }

    /// `const_float(ty, bits)`: a float literal of float type `ty`.
    pub fn const_float(&mut self, ty: Type, bits: f64) -> Result<Value> {
        if !ty.is_float() {
            return Err(Error::invalid_argument(format!("const_float requires a float type, got {ty}")));
        }
        Ok(self.use_const(ConstValue::Float { ty, bits }))
    }

    /// `const_null(ptr_ty)`: the null pointer of `ptr_ty`.
    pub fn const_null(&mut self, ptr_ty: Type) -> Result<Value> {
        if !ptr_ty.is_ptr() {
            return Err(Error::invalid_argument(format!("const_null requires a pointer type, got {ptr_ty}")));
        }
        Ok(self.use_const(ConstValue::Null { ty: ptr_ty }))
    }

    /// `const_string(bytes)`: a byte-string literal.
    pub fn const_string(&mut self, bytes: impl Into<Vec<u8>>) -> Value {
        self.use_const(ConstValue::Bytes(bytes.into()))
    }

    /// Reference another function (or, for a self-recursive call from a
    /// different instruction than the one [`Self::self_value`] covers,
    /// this same function) as a `CALL` callee or function-pointer operand.
    /// Mints a fresh local `Value`; `sig` must be that function's type.
    pub fn func_ref(&mut self, func: Func, sig: Type) -> Value {
        self.func.new_value(ValueData::Func { func, ty: sig })
    }

    /// Reference a module global's address. `ptr_ty` must be `Ptr(global's
    /// own type)`.
    pub fn global_ref(&mut self, global: Global, ptr_ty: Type) -> Result<Value> {
        if !ptr_ty.is_ptr() {
            return Err(Error::invalid_argument("global_ref requires a pointer type"));
        }
        Ok(self.func.new_value(ValueData::Global { global, ty: ptr_ty }))
    }

    // -- Arithmetic / bitwise --

    fn binary_int(&mut self, op: Opcode, lhs: Value, rhs: Value) -> Result<Value> {
        let lty = self.value_type(lhs);
        let rty = self.value_type(rhs);
        if lty != rty {
            return Err(Error::invalid_argument(format!("{op} operands have mismatched types {lty} / {rty}")));
        }
        if !lty.is_int() {
            return Err(Error::invalid_argument(format!("{op} requires integer operands, got {lty}")));
        }
        let mut data = InstData::new(op);
        data.operands.push(lhs);
        data.operands.push(rhs);
        self.append_result(data, lty)
    }

    /// `ADD lhs, rhs`.
    pub fn build_add(&mut self, lhs: Value, rhs: Value) -> Result<Value> {
        self.binary_int(Opcode::Add, lhs, rhs)
    }
    /// `SUB lhs, rhs`.
    pub fn build_sub(&mut self, lhs: Value, rhs: Value) -> Result<Value> {
        self.binary_int(Opcode::Sub, lhs, rhs)
    }
    /// `MUL lhs, rhs`.
    pub fn build_mul(&mut self, lhs: Value, rhs: Value) -> Result<Value> {
        self.binary_int(Opcode::Mul, lhs, rhs)
    }
    /// `SDIV lhs, rhs`.
    pub fn build_sdiv(&mut self, lhs: Value, rhs: Value) -> Result<Value> {
        self.binary_int(Opcode::Sdiv, lhs, rhs)
    }
    /// `UDIV lhs, rhs`.
    pub fn build_udiv(&mut self, lhs: Value, rhs: Value) -> Result<Value> {
        self.binary_int(Opcode::Udiv, lhs, rhs)
    }
    /// `SMOD lhs, rhs`.
    pub fn build_smod(&mut self, lhs: Value, rhs: Value) -> Result<Value> {
        self.binary_int(Opcode::Smod, lhs, rhs)
    }
    /// `UMOD lhs, rhs`.
    pub fn build_umod(&mut self, lhs: Value, rhs: Value) -> Result<Value> {
        self.binary_int(Opcode::Umod, lhs, rhs)
    }
    /// `AND lhs, rhs`.
    pub fn build_and(&mut self, lhs: Value, rhs: Value) -> Result<Value> {
        self.binary_int(Opcode::And, lhs, rhs)
    }
    /// `OR lhs, rhs`.
    pub fn build_or(&mut self, lhs: Value, rhs: Value) -> Result<Value> {
        self.binary_int(Opcode::Or, lhs, rhs)
    }
    /// `XOR lhs, rhs`.
    pub fn build_xor(&mut self, lhs: Value, rhs: Value) -> Result<Value> {
        self.binary_int(Opcode::Xor, lhs, rhs)
    }
    /// `SHL lhs, rhs`.
    pub fn build_shl(&mut self, lhs: Value, rhs: Value) -> Result<Value> {
        self.binary_int(Opcode::Shl, lhs, rhs)
    }
    /// `SHR lhs, rhs` (logical).
    pub fn build_shr(&mut self, lhs: Value, rhs: Value) -> Result<Value> {
        self.binary_int(Opcode::Shr, lhs, rhs)
    }
    /// `SAR lhs, rhs` (arithmetic).
    pub fn build_sar(&mut self, lhs: Value, rhs: Value) -> Result<Value> {
        self.binary_int(Opcode::Sar, lhs, rhs)
    }

    fn unary_int(&mut self, op: Opcode, v: Value) -> Result<Value> {
        let ty = self.value_type(v);
        if !ty.is_int() {
            return Err(Error::invalid_argument(format!("{op} requires an integer operand, got {ty}")));
        }
        let mut data = InstData::new(op);
        data.operands.push(v);
        self.append_result(data, ty)
    }

    /// `NEG v`.
    pub fn build_neg(&mut self, v: Value) -> Result<Value> {
        self.unary_int(Opcode::Neg, v)
    }
    /// `NOT v`.
    pub fn build_not(&mut self, v: Value) -> Result<Value> {
        self.unary_int(Opcode::Not, v)
    }

    fn compare(&mut self, op: Opcode, lhs: Value, rhs: Value) -> Result<Value> {
        let lty = self.value_type(lhs);
        let rty = self.value_type(rhs);
        if lty != rty {
            return Err(Error::invalid_argument(format!("{op} operands have mismatched types {lty} / {rty}")));
        }
        if !lty.is_int() {
            return Err(Error::invalid_argument(format!("{op} requires integer operands, got {lty}")));
        }
        let mut data = InstData::new(op);
        data.operands.push(lhs);
        data.operands.push(rhs);
        self.append_result(data, lty)
    }

    /// `CMP_EQ lhs, rhs`.
    pub fn build_cmp_eq(&mut self, lhs: Value, rhs: Value) -> Result<Value> {
        self.compare(Opcode::CmpEq, lhs, rhs)
    }
    /// `CMP_NE lhs, rhs`.
    pub fn build_cmp_ne(&mut self, lhs: Value, rhs: Value) -> Result<Value> {
        self.compare(Opcode::CmpNe, lhs, rhs)
    }
    /// `CMP_LT lhs, rhs` (signed).
    pub fn build_cmp_lt(&mut self, lhs: Value, rhs: Value) -> Result<Value> {
        self.compare(Opcode::CmpLt, lhs, rhs)
    }
    /// `CMP_LE lhs, rhs` (signed).
    pub fn build_cmp_le(&mut self, lhs: Value, rhs: Value) -> Result<Value> {
        self.compare(Opcode::CmpLe, lhs, rhs)
    }
    /// `CMP_GT lhs, rhs` (signed).
    pub fn build_cmp_gt(&mut self, lhs: Value, rhs: Value) -> Result<Value> {
        self.compare(Opcode::CmpGt, lhs, rhs)
    }
    /// `CMP_GE lhs, rhs` (signed).
    pub fn build_cmp_ge(&mut self, lhs: Value, rhs: Value) -> Result<Value> {
        self.compare(Opcode::CmpGe, lhs, rhs)
    }
    /// `CMP_ULT lhs, rhs` (unsigned).
    pub fn build_cmp_ult(&mut self, lhs: Value, rhs: Value) -> Result<Value> {
        self.compare(Opcode::CmpUlt, lhs, rhs)
    }
    /// `CMP_ULE lhs, rhs` (unsigned).
    pub fn build_cmp_ule(&mut self, lhs: Value, rhs: Value) -> Result<Value> {
        self.compare(Opcode::CmpUle, lhs, rhs)
    }
    /// `CMP_UGT lhs, rhs` (unsigned).
    pub fn build_cmp_ugt(&mut self, lhs: Value, rhs: Value) -> Result<Value> {
        self.compare(Opcode::CmpUgt, lhs, rhs)
    }
    /// `CMP_UGE lhs, rhs` (unsigned).
    pub fn build_cmp_uge(&mut self, lhs: Value, rhs: Value) -> Result<Value> {
        self.compare(Opcode::CmpUge, lhs, rhs)
    }

    // -- Memory --

    /// `ALLOCA ty`: reserve stack storage sized `ty`, producing `Ptr(ty)`.
    pub fn build_alloca(&mut self, ty: Type) -> Result<Value> {
        let mut data = InstData::new(Opcode::Alloca);
        data.aux_type = Some(ty.clone());
        self.append_result(data, Type::ptr(ty, self.ptr_size))
    }

    /// `LOAD ty, ptr`.
    pub fn build_load(&mut self, ty: Type, ptr: Value) -> Result<Value> {
        let pty = self.value_type(ptr);
        if !pty.is_ptr() {
            return Err(Error::invalid_argument(format!("load requires a pointer operand, got {pty}")));
        }
        let mut data = InstData::new(Opcode::Load);
        data.operands.push(ptr);
        data.aux_type = Some(ty.clone());
        self.append_result(data, ty)
    }

    /// `STORE val, ptr`.
    pub fn build_store(&mut self, val: Value, ptr: Value) -> Result<()> {
        let pty = self.value_type(ptr);
        if !pty.is_ptr() {
            return Err(Error::invalid_argument(format!("store requires a pointer operand, got {pty}")));
        }
        let mut data = InstData::new(Opcode::Store);
        data.operands.push(val);
        data.operands.push(ptr);
        self.append_void(data)?;
        Ok(())
    }

    /// `GEP ty, base, [indices...]`: a one-level linear index into `base`
    /// treated as an array of `ty` (not a recursive typed walk).
    pub fn build_gep(&mut self, ty: Type, base: Value, indices: &[Value]) -> Result<Value> {
        let bty = self.value_type(base);
        if !bty.is_ptr() {
            return Err(Error::invalid_argument(format!("gep requires a pointer base, got {bty}")));
        }
        if indices.is_empty() {
            return Err(Error::invalid_argument("gep requires at least one index"));
        }
        for idx in indices {
            let ity = self.value_type(*idx);
            if !ity.is_int() {
                return Err(Error::invalid_argument(format!("gep index must be an integer, got {ity}")));
            }
        }
        let mut data = InstData::new(Opcode::Gep);
        data.operands.push(base);
        data.operands.extend(indices.iter().copied());
        data.aux_type = Some(ty.clone());
        self.append_result(data, Type::ptr(ty, self.ptr_size))
    }

    /// `STRUCT_GEP struct_ty, base, field_index`.
    pub fn build_struct_gep(&mut self, struct_ty: Type, base: Value, field_index: u32) -> Result<Value> {
        let bty = self.value_type(base);
        if !bty.is_ptr() {
            return Err(Error::invalid_argument(format!("struct_gep requires a pointer base, got {bty}")));
        }
        let field = struct_ty.field(field_index)?.clone();
        let mut data = InstData::new(Opcode::StructGep);
        data.operands.push(base);
        data.aux_type = Some(struct_ty);
        data.imm = Some(field_index as i64);
        self.append_result(data, Type::ptr(field.ty, self.ptr_size))
    }

    // -- Control flow --

    /// `BR target`.
    pub fn build_br(&mut self, target: Block) -> Result<()> {
        let mut data = InstData::new(Opcode::Br);
        data.true_block = Some(target);
        self.append_void(data)?;
        Ok(())
    }

    /// `BR_COND cond, then_block, else_block`.
    pub fn build_br_cond(&mut self, cond: Value, then_block: Block, else_block: Block) -> Result<()> {
        let cty = self.value_type(cond);
        if !cty.is_int() {
            return Err(Error::invalid_argument(format!("br_cond condition must be an integer, got {cty}")));
        }
        let mut data = InstData::new(Opcode::BrCond);
        data.operands.push(cond);
        data.true_block = Some(then_block);
        data.false_block = Some(else_block);
        self.append_void(data)?;
        Ok(())
    }

    /// `CALL callee(args...)`. `callee_sig` is the callee's function type
    /// (used to validate arity/types and to observe the variadic flag);
    /// `callee` is typically [`Self::func_ref`]/[`Self::self_value`]'s
    /// result, but any value of a `Func`-typed kind works, including one
    /// computed at runtime (an indirect call through a function pointer).
    pub fn build_call(&mut self, callee: Value, callee_sig: &Type, args: &[Value]) -> Result<Value> {
        let (params, ret, variadic) = callee_sig.func_parts();
        if variadic {
            if args.len() < params.len() {
                return Err(Error::invalid_argument("variadic call has fewer arguments than fixed parameters"));
            }
        } else if args.len() != params.len() {
            return Err(Error::invalid_argument(format!(
                "call expects {} arguments, got {}",
                params.len(),
                args.len()
            )));
        }
        for (i, p) in params.iter().enumerate() {
            let aty = self.value_type(args[i]);
            if aty != *p {
                return Err(Error::invalid_argument(format!(
                    "call argument {i} has type {aty}, expected {p}"
                )));
            }
        }
        let callee_func = match self.func.value(callee) {
            ValueData::Func { func, .. } => Some(*func),
            _ => None,
        };
        let ret = ret.clone();
        let mut data = InstData::new(Opcode::Call);
        data.operands.push(callee);
        data.operands.extend(args.iter().copied());
        data.callee = callee_func;
        self.append_result(data, ret)
    }

    /// `RET val` or, for a `void`-returning function, `RET` with no value.
    pub fn build_ret(&mut self, val: Option<Value>) -> Result<()> {
        let mut data = InstData::new(Opcode::Ret);
        data.operands.extend(val);
        self.append_void(data)?;
        Ok(())
    }

    /// `SWITCH scrutinee, [(case, target)...], default`. The default
    /// target is mandatory (§4.4: construction rejects a missing default).
    pub fn build_switch(&mut self, scrutinee: Value, cases: &[(i64, Block)], default: Block) -> Result<()> {
        let sty = self.value_type(scrutinee);
        if !sty.is_int() {
            return Err(Error::invalid_argument(format!("switch scrutinee must be an integer, got {sty}")));
        }
        let mut data = InstData::new(Opcode::Switch);
        data.operands.push(scrutinee);
        data.switch_cases = cases.iter().map(|(value, target)| SwitchCase { value: *value, target: *target }).collect();
        data.switch_default = Some(default);
        self.append_void(data)?;
        Ok(())
    }

    // -- Conversion --

    fn convert(&mut self, op: Opcode, v: Value, dest: Type) -> Result<Value> {
        let src = self.value_type(v);
        validate_conversion(op, &src, &dest)?;
        let mut data = InstData::new(op);
        data.operands.push(v);
        data.aux_type = Some(dest.clone());
        self.append_result(data, dest)
    }

    /// `TRUNC v -> dest` (dest narrower than `v`'s integer type).
    pub fn build_trunc(&mut self, v: Value, dest: Type) -> Result<Value> {
        self.convert(Opcode::Trunc, v, dest)
    }
    /// `ZEXT v -> dest` (dest wider than `v`'s unsigned integer type).
    pub fn build_zext(&mut self, v: Value, dest: Type) -> Result<Value> {
        self.convert(Opcode::Zext, v, dest)
    }
    /// `SEXT v -> dest` (dest wider than `v`'s signed integer type).
    pub fn build_sext(&mut self, v: Value, dest: Type) -> Result<Value> {
        self.convert(Opcode::Sext, v, dest)
    }
    /// `FPTRUNC v -> dest` (F64 to F32).
    pub fn build_fptrunc(&mut self, v: Value, dest: Type) -> Result<Value> {
        self.convert(Opcode::Fptrunc, v, dest)
    }
    /// `FPEXT v -> dest` (F32 to F64).
    pub fn build_fpext(&mut self, v: Value, dest: Type) -> Result<Value> {
        self.convert(Opcode::Fpext, v, dest)
    }
    /// `FPTOSI v -> dest` (float to signed integer).
    pub fn build_fptosi(&mut self, v: Value, dest: Type) -> Result<Value> {
        self.convert(Opcode::Fptosi, v, dest)
    }
    /// `FPTOUI v -> dest` (float to unsigned integer).
    pub fn build_fptoui(&mut self, v: Value, dest: Type) -> Result<Value> {
        self.convert(Opcode::Fptoui, v, dest)
    }
    /// `SITOFP v -> dest` (signed integer to float).
    pub fn build_sitofp(&mut self, v: Value, dest: Type) -> Result<Value> {
        self.convert(Opcode::Sitofp, v, dest)
    }
    /// `UITOFP v -> dest` (unsigned integer to float).
    pub fn build_uitofp(&mut self, v: Value, dest: Type) -> Result<Value> {
        self.convert(Opcode::Uitofp, v, dest)
    }
    /// `PTRTOINT v -> dest`.
    pub fn build_ptrtoint(&mut self, v: Value, dest: Type) -> Result<Value> {
        self.convert(Opcode::Ptrtoint, v, dest)
    }
    /// `INTTOPTR v -> dest`.
    pub fn build_inttoptr(&mut self, v: Value, dest: Type) -> Result<Value> {
        self.convert(Opcode::Inttoptr, v, dest)
    }
    /// `BITCAST v -> dest`. Per the resolved open question (`SPEC_FULL.md`
    /// §9): a no-op reinterpretation when `src.size() == dest.size()` and
    /// neither side is an aggregate, or when both sides are pointers
    /// (regardless of pointee); a construction error otherwise.
    pub fn build_bitcast(&mut self, v: Value, dest: Type) -> Result<Value> {
        self.convert(Opcode::Bitcast, v, dest)
    }

    // -- Floating point --

    fn binary_float(&mut self, op: Opcode, lhs: Value, rhs: Value) -> Result<Value> {
        let lty = self.value_type(lhs);
        let rty = self.value_type(rhs);
        if lty != rty {
            return Err(Error::invalid_argument(format!("{op} operands have mismatched types {lty} / {rty}")));
        }
        if !lty.is_float() {
            return Err(Error::invalid_argument(format!("{op} requires float operands, got {lty}")));
        }
        let mut data = InstData::new(op);
        data.operands.push(lhs);
        data.operands.push(rhs);
        self.append_result(data, lty)
    }

    /// `FADD lhs, rhs`.
    pub fn build_fadd(&mut self, lhs: Value, rhs: Value) -> Result<Value> {
        self.binary_float(Opcode::Fadd, lhs, rhs)
    }
    /// `FSUB lhs, rhs`.
    pub fn build_fsub(&mut self, lhs: Value, rhs: Value) -> Result<Value> {
        self.binary_float(Opcode::Fsub, lhs, rhs)
    }
    /// `FMUL lhs, rhs`.
    pub fn build_fmul(&mut self, lhs: Value, rhs: Value) -> Result<Value> {
        self.binary_float(Opcode::Fmul, lhs, rhs)
    }
    /// `FDIV lhs, rhs`.
    pub fn build_fdiv(&mut self, lhs: Value, rhs: Value) -> Result<Value> {
        self.binary_float(Opcode::Fdiv, lhs, rhs)
    }

    /// `FNEG v`.
    pub fn build_fneg(&mut self, v: Value) -> Result<Value> {
        let ty = self.value_type(v);
        if !ty.is_float() {
            return Err(Error::invalid_argument(format!("fneg requires a float operand, got {ty}")));
        }
        let mut data = InstData::new(Opcode::Fneg);
        data.operands.push(v);
        self.append_result(data, ty)
    }
    /// `FABS v`.
    pub fn build_fabs(&mut self, v: Value) -> Result<Value> {
        let ty = self.value_type(v);
        if !ty.is_float() {
            return Err(Error::invalid_argument(format!("fabs requires a float operand, got {ty}")));
        }
        let mut data = InstData::new(Opcode::Fabs);
        data.operands.push(v);
        self.append_result(data, ty)
    }
    /// `FCMP lhs, rhs`.
    pub fn build_fcmp(&mut self, lhs: Value, rhs: Value) -> Result<Value> {
        self.binary_float(Opcode::Fcmp, lhs, rhs)
    }

    // -- Special --

    /// `PHI ty, [(value, predecessor)...]`. Incoming arity is validated
    /// against the block's predecessor list by [`Function::verify`] (which
    /// requires an up-to-date CFG — call [`Function::refresh_cfg`] before
    /// verifying a function containing PHIs built before its predecessors
    /// were known).
    pub fn build_phi(&mut self, ty: Type, incoming: &[(Value, Block)]) -> Result<Value> {
        let mut data = InstData::new(Opcode::Phi);
        data.phi_edges = incoming.iter().map(|(value, from)| PhiEdge { value: *value, from: *from }).collect();
        self.append_result(data, ty)
    }

    /// Add one more incoming edge to an already-built `PHI` (used when a
    /// block's predecessors are only fully known after later blocks are
    /// built, e.g. loop headers).
    pub fn add_phi_incoming(&mut self, phi: Value, value: Value, from: Block) -> Result<()> {
        let inst = match self.func.value(phi) {
            ValueData::InstResult { inst, .. } => *inst,
            _ => return Err(Error::invalid_argument("add_phi_incoming requires a PHI result value")),
        };
        let data = self.func.inst_mut(inst);
        if data.opcode != Opcode::Phi {
            return Err(Error::invalid_argument("add_phi_incoming requires a PHI result value"));
        }
        data.phi_edges.push(PhiEdge { value, from });
        Ok(())
    }

    /// `SELECT cond, a, b`.
    pub fn build_select(&mut self, cond: Value, a: Value, b: Value) -> Result<Value> {
        let cty = self.value_type(cond);
        if !cty.is_int() {
            return Err(Error::invalid_argument(format!("select condition must be an integer, got {cty}")));
        }
        let aty = self.value_type(a);
        let bty = self.value_type(b);
        if aty != bty {
            return Err(Error::invalid_argument(format!("select arms have mismatched types {aty} / {bty}")));
        }
        let mut data = InstData::new(Opcode::Select);
        data.operands.push(cond);
        data.operands.push(a);
        data.operands.push(b);
        self.append_result(data, aty)
    }
}

fn validate_conversion(op: Opcode, src: &Type, dest: &Type) -> Result<()> {
    match op {
        Opcode::Trunc => {
            if !(src.is_int() && dest.is_int() && dest.size() < src.size()) {
                return Err(Error::invalid_argument(format!("trunc requires a narrower integer dest, got {src} -> {dest}")));
            }
        }
        Opcode::Zext | Opcode::Sext => {
            if !(src.is_int() && dest.is_int() && dest.size() > src.size()) {
                return Err(Error::invalid_argument(format!("{op} requires a wider integer dest, got {src} -> {dest}")));
            }
        }
        Opcode::Fptrunc => {
            if !(*src.kind() == TypeKind::F64 && *dest.kind() == TypeKind::F32) {
                return Err(Error::invalid_argument("fptrunc requires f64 -> f32"));
            }
        }
        Opcode::Fpext => {
            if !(*src.kind() == TypeKind::F32 && *dest.kind() == TypeKind::F64) {
                return Err(Error::invalid_argument("fpext requires f32 -> f64"));
            }
        }
        Opcode::Fptosi | Opcode::Fptoui => {
            if !(src.is_float() && dest.is_int()) {
                return Err(Error::invalid_argument(format!("{op} requires float -> integer, got {src} -> {dest}")));
            }
        }
        Opcode::Sitofp | Opcode::Uitofp => {
            if !(src.is_int() && dest.is_float()) {
                return Err(Error::invalid_argument(format!("{op} requires integer -> float, got {src} -> {dest}")));
            }
        }
        Opcode::Ptrtoint => {
            if !(src.is_ptr() && dest.is_int()) {
                return Err(Error::invalid_argument("ptrtoint requires a pointer source and integer dest"));
            }
        }
        Opcode::Inttoptr => {
            if !(src.is_int() && dest.is_ptr()) {
                return Err(Error::invalid_argument("inttoptr requires an integer source and pointer dest"));
            }
        }
        Opcode::Bitcast => {
            if src.is_ptr() && dest.is_ptr() {
                // Pointer-to-pointer bitcast is always legal regardless of
                // pointee type.
            } else if src.is_aggregate() || dest.is_aggregate() {
                return Err(Error::invalid_argument("bitcast does not support aggregate types"));
            } else if src.size() != dest.size() {
                return Err(Error::invalid_argument(format!(
                    "bitcast requires equal-size types, got {src} ({}) -> {dest} ({})",
                    src.size(),
                    dest.size()
                )));
            }
        }
        _ => unreachable!("validate_conversion called with a non-conversion opcode"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityRef;
    use crate::ir::Linkage;

    fn i32_() -> Type {
        Type::primitive(TypeKind::I32, 4)
    }

    fn make_func(name: &str, params: &[Type], ret: Type) -> Function {
        let sig = Type::func(ret, params, false);
        let mut f = Function::new(name.to_string(), Linkage::External, sig, false);
        // Self-recursive `CALL`/function-pointer uses need `value_view`
        // populated; `Module::declare_function` normally does this, but
        // these tests build a bare `Function` directly.
        let v = f.new_value(ValueData::Func { func: Func::new(0), ty: f.sig.clone() });
        f.value_view = Some(v);
        f
    }

    #[test]
    fn add_then_ret_builds_a_terminated_entry_block() {
        let mut f = make_func("f", &[i32_(), i32_()], i32_());
        let entry = f.entry_block();
        let mut b = FunctionBuilder::new(&mut f, 8);
        b.set_insert_point(entry);
        let a = b.param(0).unwrap();
        let c = b.param(1).unwrap();
        let sum = b.build_add(a, c).unwrap();
        b.build_ret(Some(sum)).unwrap();
        assert!(f.verify().is_ok());
    }

    #[test]
    fn mismatched_operand_types_are_rejected() {
        let mut f = make_func("f", &[i32_()], i32_());
        let entry = f.entry_block();
        let mut b = FunctionBuilder::new(&mut f, 8);
        b.set_insert_point(entry);
        let a = b.param(0).unwrap();
        let c64 = b.const_int(Type::primitive(TypeKind::I64, 8), 1).unwrap();
        assert!(b.build_add(a, c64).is_err());
    }

    #[test]
    fn cannot_append_after_a_terminator() {
        let mut f = make_func("f", &[], i32_());
        let entry = f.entry_block();
        let mut b = FunctionBuilder::new(&mut f, 8);
        b.set_insert_point(entry);
        let zero = b.const_int(i32_(), 0).unwrap();
        b.build_ret(Some(zero)).unwrap();
        assert!(b.build_ret(Some(zero)).is_err());
    }

    #[test]
    fn alloca_store_load_round_trips_through_memory() {
        let mut f = make_func("f", &[i32_()], i32_());
        let entry = f.entry_block();
        let mut b = FunctionBuilder::new(&mut f, 8);
        b.set_insert_point(entry);
        let slot = b.build_alloca(i32_()).unwrap();
        let p = b.param(0).unwrap();
        b.build_store(p, slot).unwrap();
        let loaded = b.build_load(i32_(), slot).unwrap();
        b.build_ret(Some(loaded)).unwrap();
        assert!(f.verify().is_ok());
    }

    #[test]
    fn struct_gep_out_of_range_field_is_rejected() {
        let struct_ty = Type::struct_(None, &[i32_()], false).unwrap();
        let mut f = make_func("f", &[], struct_ty.clone());
        let entry = f.entry_block();
        let mut b = FunctionBuilder::new(&mut f, 8);
        b.set_insert_point(entry);
        let base = b.build_alloca(struct_ty.clone()).unwrap();
        assert!(b.build_struct_gep(struct_ty, base, 5).is_err());
    }

    #[test]
    fn bitcast_requires_equal_size_non_aggregate_types() {
        let mut f = make_func("f", &[i32_()], i32_());
        let entry = f.entry_block();
        let mut b = FunctionBuilder::new(&mut f, 8);
        b.set_insert_point(entry);
        let p = b.param(0).unwrap();
        let u32_ = Type::primitive(TypeKind::U32, 4);
        assert!(b.build_bitcast(p, u32_).is_ok());
        let i64_ = Type::primitive(TypeKind::I64, 8);
        assert!(b.build_bitcast(p, i64_).is_err());
    }
}
