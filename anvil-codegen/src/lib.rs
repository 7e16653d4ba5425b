//! Anvil code generation library.
//!
//! Anvil is a retargetable compiler back-end: client code builds a typed,
//! SSA-style intermediate representation with [`builder::FunctionBuilder`],
//! optionally runs it through [`pass::PassManager`], and lowers it to
//! assembly text for one of a fixed set of target architectures via
//! [`isa::Backend`].
#![deny(missing_docs, unused_must_use)]
#![warn(unused_import_braces)]

pub use anvil_entity as entity;

pub mod builder;
pub mod context;
pub mod cpu;
pub mod error;
pub mod ir;
pub mod isa;
pub mod pass;
pub mod write;

pub use crate::context::Context;
pub use crate::error::{Error, Result};

/// Version number of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
