//! The typed, SSA-style intermediate representation.
//!
//! A [`Function`] owns dense arenas of [`Value`]s, [`Inst`]ructions and
//! [`Block`]s (see [`entities`] for the index types and [`anvil_entity`] for
//! the arena maps they key into). A [`Module`] owns a collection of
//! functions plus [`Global`]s and a string-literal table. Everything here is
//! architecture-independent; [`crate::isa`] is what turns it into text.

mod entities;
mod function;
mod instruction;
mod module;
mod opcode;
mod types;
mod value;

pub use crate::ir::entities::{Block, Func, Global, Inst, Value};
pub use crate::ir::function::{Function, Linkage};
pub use crate::ir::instruction::{BlockData, InstData, PhiEdge, SwitchCase};
pub use crate::ir::module::Module;
pub use crate::ir::opcode::Opcode;
pub use crate::ir::types::{Type, TypeKind};
pub use crate::ir::value::{ConstValue, ValueData};
