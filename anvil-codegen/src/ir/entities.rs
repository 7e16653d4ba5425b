//! IR entity references.
//!
//! Instructions need to reference other parts of the function: the block
//! they branch to, the values they operate on, the function a `CALL`
//! targets. These references are not Rust borrows, both because the
//! ownership graph they live in is cyclic (a block owns instructions that
//! back-reference the block) and because a 64-bit pointer is wasteful next
//! to a 32-bit dense index. Instead each reference is a newtype wrapping a
//! `u32` index into the relevant [`anvil_entity::PrimaryMap`] on the owning
//! [`crate::ir::Function`] or [`crate::ir::Module`]. There is a distinct
//! type per entity kind so the borrow checker (and the compiler, for
//! mismatched-argument bugs) can't confuse a `Value` with a `Block`.

use anvil_entity::entity_impl;

/// A reference to a basic block in a function.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Block(u32);
entity_impl!(Block, "block");

/// A reference to an SSA value: a constant, a global, a function, a
/// parameter, an instruction result, or a block label.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Value(u32);
entity_impl!(Value, "v");

/// A reference to an instruction in a function.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Inst(u32);
entity_impl!(Inst, "inst");

/// A reference to a function, either a definition or a declaration, scoped
/// to the [`crate::ir::Module`] that owns it.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Func(u32);
entity_impl!(Func, "fn");

/// A reference to a global variable, scoped to the [`crate::ir::Module`]
/// that owns it.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Global(u32);
entity_impl!(Global, "g");
