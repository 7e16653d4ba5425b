//! The `Module`: a collection of functions, globals, and interned string
//! literals.

use crate::entity::PrimaryMap;
use crate::error::{Error, Result};
use crate::ir::function::Linkage;
use crate::ir::value::ValueData;
use crate::ir::value::ConstValue;
use crate::ir::{Func, Function, Global, Type, Value};

/// A global variable: a typed storage location with an optional
/// initializer.
///
/// Unlike a function, a global has no arena of its own to mint a [`Value`]
/// into — `Value`s live in whichever [`Function`] arena references them
/// (§3.1: operands are indices into the *using* function's own value
/// arena, not a shared one). So a global does not carry a precomputed
/// `Value` naming its own address; instead
/// [`crate::builder::FunctionBuilder::global_ref`] mints a fresh local
/// `Value` of [`ValueData::Global`] kind in whatever function's arena wants
/// to reference it, each time it is referenced — the same way
/// [`crate::builder::FunctionBuilder::func_ref`] does for calling a
/// function other than the one currently being built. Its initializer, for
/// the same reason, is stored as a self-contained [`ConstValue`] rather
/// than as a `Value` (`SPEC_FULL.md` §3: "Constants are owned by whatever
/// instruction first refers to them (or by the global they initialize)").
#[derive(Debug, Clone)]
pub struct GlobalData {
    pub(crate) name: String,
    pub(crate) ty: Type,
    pub(crate) linkage: Linkage,
    pub(crate) initializer: Option<ConstValue>,
}

impl GlobalData {
    /// The global's name, used for its assembly label.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The type of the storage this global names (not a pointer to it —
    /// matching `module_add_global(name, type, linkage)`'s contract that
    /// `type` is the variable's own type).
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// The global's linkage.
    pub fn linkage(&self) -> Linkage {
        self.linkage
    }

    /// The global's initializer constant, if one was set via
    /// [`Module::set_initializer`].
    pub fn initializer(&self) -> Option<&ConstValue> {
        self.initializer.as_ref()
    }
}

/// A module: the owner of functions, globals, and the string-literal table
/// they reference.
///
/// Functions and globals are declared/defined through the methods below
/// rather than constructed directly, because each function needs a freshly
/// allocated [`Func`] key before its self-referential [`Value`] (the one
/// that names its own address, for self-recursive calls) can be built.
#[derive(Debug, Clone)]
pub struct Module {
    /// The module's name (used only for diagnostics and the pretty
    /// printer's header; it does not appear in emitted assembly).
    pub name: String,
    pub(crate) funcs: PrimaryMap<Func, Function>,
    pub(crate) globals: PrimaryMap<Global, GlobalData>,
    /// Deduplicated string-literal bytes, in first-use order. Interning
    /// happens here, at emission/const_string time, not when a `Value` of
    /// `ConstString` kind is first built by the builder — two `const_string`
    /// calls with identical contents are expected to each build their own
    /// `Value`, and only coalesce into one assembly label the first time
    /// `Module::intern_string` sees a given byte sequence. A linear scan is
    /// used deliberately (see the design's "String tables" note): modules
    /// rarely carry more than a few dozen literals.
    pub(crate) strings: Vec<Vec<u8>>,
}

impl Module {
    pub(crate) fn new(name: String) -> Self {
        Module { name, funcs: PrimaryMap::new(), globals: PrimaryMap::new(), strings: Vec::new() }
    }

    /// Declare (and, unless `is_declaration`, define with an `entry` block)
    /// a function with the given name, linkage, and signature.
    pub fn declare_function(&mut self, name: &str, linkage: Linkage, sig: Type, is_declaration: bool) -> Func {
        let key = self.funcs.next_key();
        let mut f = Function::new(name.to_string(), linkage, sig.clone(), is_declaration);
        let value = f.new_value(ValueData::Func { func: key, ty: sig });
        f.value_view = Some(value);
        self.funcs.push(f);
        key
    }

    /// Add an external function declaration (no blocks, no body).
    pub fn add_extern(&mut self, name: &str, sig: Type) -> Func {
        self.declare_function(name, Linkage::External, sig, true)
    }

    /// Add a function definition (auto-creates an `entry` block).
    pub fn add_function(&mut self, name: &str, linkage: Linkage, sig: Type) -> Func {
        self.declare_function(name, linkage, sig, false)
    }

    /// Borrow a function by key.
    pub fn func(&self, f: Func) -> &Function {
        &self.funcs[f]
    }

    /// Mutably borrow a function by key (used by the builder and the
    /// optimizer passes).
    pub fn func_mut(&mut self, f: Func) -> &mut Function {
        &mut self.funcs[f]
    }

    /// Iterate over all functions, keyed, in declaration order.
    pub fn functions(&self) -> impl Iterator<Item = (Func, &Function)> {
        self.funcs.iter()
    }

    /// Add a global of type `ty` with the given name and linkage.
    pub fn add_global(&mut self, name: &str, ty: Type, linkage: Linkage) -> Global {
        self.globals.push(GlobalData { name: name.to_string(), ty, linkage, initializer: None })
    }

    /// Borrow a global by key.
    pub fn global(&self, g: Global) -> &GlobalData {
        &self.globals[g]
    }

    /// Set (or replace) a global's initializer. The initializer must be a
    /// constant of the global's own type.
    pub fn set_initializer(&mut self, g: Global, init: ConstValue, init_ty: &Type) -> Result<()> {
        let expected = self.globals[g].ty.clone();
        if *init_ty != expected {
            return Err(Error::invalid_argument(format!(
                "initializer type {init_ty} does not match global type {expected}"
            )));
        }
        self.globals[g].initializer = Some(init);
        Ok(())
    }

    /// Iterate over all globals, keyed, in declaration order.
    pub fn globals(&self) -> impl Iterator<Item = (Global, &GlobalData)> {
        self.globals.iter()
    }

    /// Intern a string literal, returning the label index to use for it.
    /// Two calls with identical `bytes` return the same index (a linear
    /// scan over the small per-module table), per "two calls with
    /// identical contents must yield values that emit to the same label".
    pub fn intern_string(&mut self, bytes: &[u8]) -> usize {
        if let Some(i) = self.strings.iter().position(|s| s.as_slice() == bytes) {
            return i;
        }
        self.strings.push(bytes.to_vec());
        self.strings.len() - 1
    }

    /// The interned string table, in first-use order.
    pub fn strings(&self) -> &[Vec<u8>] {
        &self.strings
    }

    /// Walk every function's value arena and every global initializer,
    /// interning each [`ValueData::ConstString`]/[`ConstValue::Bytes`]
    /// literal found. A backend's `codegen_module` only ever borrows a
    /// `Module` immutably (§5: codegen has no business mutating the IR it
    /// lowers), so this mutable pre-pass is what [`crate::Context::codegen`]
    /// runs first — it is what makes "two `const_string` calls with
    /// identical contents emit to the same label" actually true end to
    /// end, instead of merely true of [`Module::intern_string`] in
    /// isolation.
    pub fn intern_all_strings(&mut self) {
        let mut literals: Vec<Vec<u8>> = Vec::new();
        for (_, func) in self.funcs.iter() {
            for (_, data) in func.values() {
                if let ValueData::ConstString { bytes } = data {
                    literals.push(bytes.clone());
                }
            }
        }
        for (_, global) in self.globals.iter() {
            if let Some(ConstValue::Bytes(bytes)) = &global.initializer {
                literals.push(bytes.clone());
            }
        }
        for bytes in literals {
            self.intern_string(&bytes);
        }
    }
}
