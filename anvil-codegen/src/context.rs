//! Process-level configuration and the owner of every IR object.
//!
//! A [`Context`] is the root of the arena-lifetime ownership story
//!: it owns a type cache for interned primitive
//! types, the modules built against it, the currently selected backend
//! (if any), and the pass manager. There is no explicit `ctx_destroy` in
//! this port; dropping a `Context` value recursively frees everything it
//! owns, the same way the teacher's own `Context`-adjacent owning types
//! (e.g. `Function`) rely on ordinary `Drop` rather than a manual
//! teardown routine.

use crate::cpu::{CpuFeatures, CpuModel};
use crate::error::{Error, Result};
use crate::ir::{Module, Type, TypeKind};
use crate::isa::{self, AbiVariant, Arch, ArchInfo, Backend, Dialect, FpFormat};
use crate::pass::{OptLevel, PassManager};

/// Interned primitive types for one [`Context`]. Pointer size is filled in
/// when a target is selected; re-selecting a target re-derives every
/// pointer type's size consistently, since [`Context::ptr_size`] always
/// reflects the currently selected target (`SPEC_FULL.md` §4.1: "sizes of
/// primitive types are fixed; pointer size depends on the target").
#[derive(Debug, Clone)]
struct TypeCache {
    void: Type,
    i8: Type,
    i16: Type,
    i32: Type,
    i64: Type,
    u8: Type,
    u16: Type,
    u32: Type,
    u64: Type,
    f32: Type,
    f64: Type,
}

impl TypeCache {
    fn new() -> Self {
        TypeCache {
            void: Type::void(),
            i8: Type::primitive(TypeKind::I8, 1),
            i16: Type::primitive(TypeKind::I16, 2),
            i32: Type::primitive(TypeKind::I32, 4),
            i64: Type::primitive(TypeKind::I64, 8),
            u8: Type::primitive(TypeKind::U8, 1),
            u16: Type::primitive(TypeKind::U16, 2),
            u32: Type::primitive(TypeKind::U32, 4),
            u64: Type::primitive(TypeKind::U64, 8),
            f32: Type::primitive(TypeKind::F32, 4),
            f64: Type::primitive(TypeKind::F64, 8),
        }
    }
}

/// Process-level configuration: target architecture, assembler dialect,
/// floating-point format, ABI variant, optimization level; owner of the
/// type cache, the modules built against it, the selected backend, and
/// the pass manager.
///
/// `Context` is intentionally neither `Send` nor `Sync`: "a context and
/// everything it owns must not be used concurrently from multiple
/// threads" is enforced by simply not asserting
/// either bound, rather than by wrapping fields in synchronization
/// primitives that would only get in the way of the single-threaded
/// cooperative model.
pub struct Context {
    types: TypeCache,
    arch: Option<Arch>,
    backend: Option<Box<dyn Backend>>,
    cpu_model: CpuModel,
    cpu_features: CpuFeatures,
    pass_manager: PassManager,
    modules: Vec<Module>,
    last_error: Option<Error>,
}

impl Context {
    /// Create a context with no target selected. Every `build_*` and
    /// `codegen_*` call that depends on a target (pointer sizing,
    /// lowering) requires [`Context::set_target`] first.
    pub fn new() -> Self {
        Context {
            types: TypeCache::new(),
            arch: None,
            backend: None,
            cpu_model: CpuModel::Generic,
            cpu_features: CpuFeatures::default(),
            pass_manager: PassManager::new(),
            modules: Vec::new(),
            last_error: None,
        }
    }

    fn remember(&mut self, result: Result<()>) -> Result<()> {
        match &result {
            Ok(()) => self.last_error = None,
            Err(e) => self.last_error = Some(clone_error(e)),
        }
        result
    }

    /// Select the target architecture, constructing and installing its
    /// backend. Re-selecting a target replaces the previous backend
    /// outright; pointer-typed values built against the old selection
    /// keep whatever size they were given at construction time (types are
    /// immutable once built), but any *new* `type_ptr`/`build_alloca`-style
    /// construction picks up the newly selected target's pointer size.
    pub fn set_target(&mut self, arch: Arch) -> Result<()> {
        let backend = match isa::backend_for(arch) {
            Ok(b) => b,
            Err(e) => return self.remember(Err(e)),
        };
        self.arch = Some(arch);
        self.backend = Some(backend);
        self.remember(Ok(()))
    }

    /// The currently selected architecture, if any.
    pub fn arch(&self) -> Option<Arch> {
        self.arch
    }

    fn backend(&self) -> Result<&dyn Backend> {
        self.backend.as_deref().ok_or_else(|| Error::invalid_argument("no target selected; call Context::set_target first"))
    }

    fn backend_mut(&mut self) -> Result<&mut Box<dyn Backend>> {
        self.backend.as_mut().ok_or_else(|| Error::invalid_argument("no target selected; call Context::set_target first"))
    }

    /// Pointer size in bytes for the currently selected target. Panics if
    /// no target has been selected, since every type-construction and
    /// builder entry point that needs this is itself only meaningful once
    /// a target exists.
    pub fn ptr_size(&self) -> u32 {
        self.backend
            .as_deref()
            .map(|b| b.arch_info().ptr_size)
            .expect("Context::ptr_size called before Context::set_target")
    }

    /// Override the assembler dialect (GAS&#8596;NASM on the x86 family;
    /// every other backend rejects any override, per §4.8).
    pub fn set_syntax(&mut self, dialect: Dialect) -> Result<()> {
        let r = self.backend_mut().and_then(|b| b.set_dialect(dialect));
        self.remember(r)
    }

    /// Override the floating-point format the backend emits, within what
    /// the selected target's hardware actually supports.
    pub fn set_fp_format(&mut self, fmt: FpFormat) -> Result<()> {
        let r = self.backend_mut().and_then(|b| b.set_fp_format(fmt));
        self.remember(r)
    }

    /// Override the ABI variant, within what the selected target's family
    /// accepts.
    pub fn set_abi(&mut self, abi: AbiVariant) -> Result<()> {
        let r = self.backend_mut().and_then(|b| b.set_abi(abi));
        self.remember(r)
    }

    /// Configure the pass pipeline the next [`Context::optimize`] call
    /// runs, per the level-to-pass mapping in §4.5.
    pub fn set_opt_level(&mut self, level: OptLevel) {
        self.pass_manager.set_level(level);
    }

    /// Direct access to the pass manager, for enabling/disabling
    /// individual passes beyond what a bare optimization level selects.
    pub fn pass_manager(&mut self) -> &mut PassManager {
        &mut self.pass_manager
    }

    /// The currently selected target's static descriptor.
    pub fn arch_info(&self) -> Result<ArchInfo> {
        self.backend().map(|b| b.arch_info())
    }

    /// The most recent failure recorded by a `&mut self` method on this
    /// context, mirroring the C-style `ctx_get_error()` contract
    ///. Cleared by the next successful call.
    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    /// The currently selected CPU model.
    pub fn cpu(&self) -> CpuModel {
        self.cpu_model
    }

    /// Select a CPU model, resetting the feature set to that model's
    /// defaults.
    pub fn set_cpu(&mut self, model: CpuModel) {
        self.cpu_model = model;
        self.cpu_features = model.default_features();
    }

    /// The current feature bitset (the selected model's defaults, as
    /// modified by any [`Context::enable_feature`]/[`Context::disable_feature`]
    /// calls since).
    pub fn cpu_features(&self) -> CpuFeatures {
        self.cpu_features
    }

    /// Is feature bit `bit` currently enabled?
    pub fn has_feature(&self, bit: u64) -> bool {
        self.cpu_features.has(bit)
    }

    /// Enable a feature bit. Always accepted, even for a bit outside the
    /// current model's default set: whether any
    /// backend's instruction selection actually consults it is a
    /// per-backend decision, not something this API gates.
    pub fn enable_feature(&mut self, bit: u64) {
        self.cpu_features.enable(bit);
    }

    /// Disable a feature bit.
    pub fn disable_feature(&mut self, bit: u64) {
        self.cpu_features.disable(bit);
    }

    // -- Type factories --

    /// The `void` type.
    pub fn void(&self) -> Type {
        self.types.void.clone()
    }
    /// The `i8` type.
    pub fn i8(&self) -> Type {
        self.types.i8.clone()
    }
    /// The `i16` type.
    pub fn i16(&self) -> Type {
        self.types.i16.clone()
    }
    /// The `i32` type.
    pub fn i32(&self) -> Type {
        self.types.i32.clone()
    }
    /// The `i64` type.
    pub fn i64(&self) -> Type {
        self.types.i64.clone()
    }
    /// The `u8` type.
    pub fn u8(&self) -> Type {
        self.types.u8.clone()
    }
    /// The `u16` type.
    pub fn u16(&self) -> Type {
        self.types.u16.clone()
    }
    /// The `u32` type.
    pub fn u32(&self) -> Type {
        self.types.u32.clone()
    }
    /// The `u64` type.
    pub fn u64(&self) -> Type {
        self.types.u64.clone()
    }
    /// The `f32` type.
    pub fn f32(&self) -> Type {
        self.types.f32.clone()
    }
    /// The `f64` type.
    pub fn f64(&self) -> Type {
        self.types.f64.clone()
    }

    /// A pointer to `pointee`, sized per the currently selected target.
    pub fn type_ptr(&self, pointee: Type) -> Type {
        Type::ptr(pointee, self.ptr_size())
    }

    /// A fixed-length array of `count` elements of `elem`.
    pub fn type_array(&self, elem: Type, count: u32) -> Result<Type> {
        Type::array(elem, count)
    }

    /// A struct with the given ordered field types.
    pub fn type_struct(&self, name: Option<&str>, fields: &[Type]) -> Result<Type> {
        Type::struct_(name.map(str::to_string), fields, false)
    }

    /// A packed struct (no inter-field padding) with the given ordered
    /// field types.
    pub fn type_struct_packed(&self, name: Option<&str>, fields: &[Type]) -> Result<Type> {
        Type::struct_(name.map(str::to_string), fields, true)
    }

    /// A function signature type.
    pub fn type_func(&self, ret: Type, params: &[Type], variadic: bool) -> Type {
        Type::func(ret, params, variadic)
    }

    // -- Modules --

    /// Create a new, empty module owned by this context.
    pub fn create_module(&mut self, name: &str) -> usize {
        self.modules.push(Module::new(name.to_string()));
        self.modules.len() - 1
    }

    /// Borrow a module by the index [`Context::create_module`] returned.
    pub fn module(&self, id: usize) -> &Module {
        &self.modules[id]
    }

    /// Mutably borrow a module by the index [`Context::create_module`]
    /// returned.
    pub fn module_mut(&mut self, id: usize) -> &mut Module {
        &mut self.modules[id]
    }

    /// Run the configured pass pipeline over every function in `module`
    /// to fixpoint.
    pub fn optimize(&mut self, module_id: usize) {
        self.pass_manager.run_module(&mut self.modules[module_id]);
    }

    /// Lower `module` to assembly text using the currently selected
    /// backend.
    pub fn codegen(&mut self, module_id: usize) -> Result<String> {
        self.modules[module_id].intern_all_strings();
        let backend = match self.backend.as_deref() {
            Some(b) => b,
            None => {
                let e = Error::invalid_argument("no target selected; call Context::set_target first");
                self.last_error = Some(clone_error(&e));
                return Err(e);
            }
        };
        match backend.codegen_module(&self.modules[module_id]) {
            Ok(text) => {
                self.last_error = None;
                Ok(text)
            }
            Err(e) => {
                self.last_error = Some(clone_error(&e));
                Err(e)
            }
        }
    }

    /// `module_write`: lower `module` to assembly text and synchronously
    /// write it to `path`. The only API entry point in this crate that
    /// performs I/O (§5: "no API operation blocks on I/O except
    /// `module_write`"). If `path` cannot be opened or written, the file
    /// "may or may not exist and is unspecified in content" per §7; this
    /// is exactly what `std::fs::write` already guarantees, so there is
    /// no cleanup-on-failure logic here to get wrong.
    pub fn write_to_file(&mut self, module_id: usize, path: impl AsRef<std::path::Path>) -> Result<()> {
        let text = self.codegen(module_id)?;
        match std::fs::write(path, text) {
            Ok(()) => {
                self.last_error = None;
                Ok(())
            }
            Err(io) => {
                let e = Error::Io(io);
                self.last_error = Some(clone_error(&e));
                Err(e)
            }
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new()
    }
}

/// `Error` does not derive `Clone` (its `Io` variant wraps
/// `std::io::Error`, which isn't `Clone`), but the error slot needs its
/// own owned copy independent of whatever `Result` the caller is holding.
/// Every variant's payload is itself `Display`-able, so re-rendering
/// through that is the straightforward way to mirror it without adding a
/// manual `Clone` impl that would have to special-case `Io`.
fn clone_error(e: &Error) -> Error {
    match e {
        Error::InvalidArgument(s) => Error::InvalidArgument(s.clone()),
        Error::OutOfMemory => Error::OutOfMemory,
        Error::NoBackend(a) => Error::NoBackend(*a),
        Error::UnsupportedFeature(s) => Error::UnsupportedFeature(s.clone()),
        Error::Io(io) => Error::Internal(format!("I/O error: {io}")),
        Error::Internal(s) => Error::Internal(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ptr_size_tracks_selected_target() {
        let mut ctx = Context::new();
        ctx.set_target(Arch::X86_64).unwrap();
        assert_eq!(ctx.ptr_size(), 8);
        ctx.set_target(Arch::X86).unwrap();
        assert_eq!(ctx.ptr_size(), 4);
    }

    #[test]
    fn error_slot_mirrors_last_failure_and_clears_on_success() {
        let mut ctx = Context::new();
        assert!(ctx.set_syntax(Dialect::Intel).is_err());
        assert!(ctx.last_error().is_some());
        ctx.set_target(Arch::X86_64).unwrap();
        assert!(ctx.last_error().is_none());
    }

    #[test]
    fn write_to_file_round_trips_codegen_output() {
        use crate::builder::FunctionBuilder;
        use crate::ir::Linkage;

        let mut ctx = Context::new();
        ctx.set_target(Arch::X86_64).unwrap();
        let m = ctx.create_module("m");
        let i32_ = ctx.i32();
        let sig = ctx.type_func(i32_.clone(), &[i32_.clone(), i32_.clone()], false);
        let f = ctx.module_mut(m).add_function("add", Linkage::External, sig);
        {
            let func = ctx.module_mut(m).func_mut(f);
            let entry = func.entry_block();
            let mut b = FunctionBuilder::new(func, 8);
            b.set_insert_point(entry);
            let a = b.param(0).unwrap();
            let c = b.param(1).unwrap();
            let sum = b.build_add(a, c).unwrap();
            b.build_ret(Some(sum)).unwrap();
        }
        let expected = ctx.codegen(m).unwrap();

        let dir = std::env::temp_dir();
        let path = dir.join(format!("anvil-write-to-file-test-{:p}.s", &ctx));
        ctx.write_to_file(m, &path).unwrap();
        let on_disk = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(on_disk, expected);
    }

    #[test]
    fn write_to_file_reports_io_errors() {
        let mut ctx = Context::new();
        ctx.set_target(Arch::X86_64).unwrap();
        let m = ctx.create_module("m");
        let err = ctx.write_to_file(m, "/nonexistent-dir/anvil-test/out.s").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(ctx.last_error().is_some());
    }

    #[test]
    fn feature_enable_accepts_bits_outside_model_defaults() {
        let mut ctx = Context::new();
        ctx.set_cpu(CpuModel::X86Generic);
        let exotic_bit = 1u64 << 40;
        assert!(!ctx.has_feature(exotic_bit));
        ctx.enable_feature(exotic_bit);
        assert!(ctx.has_feature(exotic_bit));
    }
}
