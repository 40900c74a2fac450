//! SSA intermediate representation as seen by the rewriting engines.
//!
//! This is the minimal view the engines depend on; constructing it from
//! bytecode is the job of a [`crate::lift::Lifter`].
//!
//! # Key Components
//!
//! - [`IrMethod`] - Ordered list of blocks, entry first
//! - [`IrBlock`] - Mutable ordered list of instructions
//! - [`IrInstruction`] - One instruction; see [`InstructionKind`] for the variants
//! - [`Value`] - Operand or result: a [`VirtualRegister`] or an inline [`Constant`]
//! - [`IrPass`] - Transformation over one method
//!
//! # Invariants
//!
//! Every [`VirtualRegister`] is defined by exactly one instruction, and the
//! instructions of a block are totally ordered. Removing or replacing an
//! instruction preserves the order of the others. Nothing here repairs
//! def-use links: callers must only remove or replace instructions whose
//! result has no remaining uses, or accept an IR that refers to an undefined
//! register.

mod instruction;
mod method;
mod pass;
mod value;

pub use instruction::{
    BinaryOpcode, BranchCondition, InstructionKind, InvokeKind, IrInstruction, TypeCheckKind,
    UnaryOpcode,
};
pub use method::{IrBlock, IrMethod};
pub use pass::{run_passes, IrPass};
pub use value::{Constant, Value, VirtualRegister};
