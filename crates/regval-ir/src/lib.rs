//! Program model for register value analysis.
//!
//! This crate provides pure input types with no analysis logic: the
//! architecture traits, registers, per-instruction effects, basic blocks,
//! edges, and the function partitioning of a disassembled program.

mod arch;
mod block;
mod edge;
mod effect;
mod instr;
mod program;
mod register;

pub use arch::*;
pub use block::*;
pub use edge::*;
pub use effect::*;
pub use instr::*;
pub use program::*;
pub use register::*;
