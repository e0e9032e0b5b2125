//! ARM instruction semantics.
//!
//! This crate turns disassembled instructions into the closed effect set the
//! analysis understands. Each architecture's semantics live in their own
//! model; models are chained by [`CompositeModel`] so callers can override
//! individual mnemonics.

mod arm32;
mod arm64;
mod model;
mod operand;
mod types;

pub use arm32::Arm32Model;
pub use arm64::Arm64Model;
pub use model::{CompositeModel, EffectModel};
pub use operand::{OperandError, parse_operands};
pub use types::*;

use regval_ir::{Arch, Arm32, Arm64, Instruction};

/// Architectures that ship a standard semantics model.
pub trait ModeledArch: Arch {
    /// The built-in model for this architecture.
    fn standard_model() -> CompositeModel<Self>;
}

impl ModeledArch for Arm32 {
    fn standard_model() -> CompositeModel<Self> {
        CompositeModel::empty().with_model(Arm32Model)
    }
}

impl ModeledArch for Arm64 {
    fn standard_model() -> CompositeModel<Self> {
        CompositeModel::empty().with_model(Arm64Model)
    }
}

/// Lift an instruction using the standard model.
///
/// This is a convenience wrapper around `A::standard_model().lift()`.
pub fn lift<A: ModeledArch>(instr: &DecodedInstr) -> Instruction {
    A::standard_model().lift(instr)
}
