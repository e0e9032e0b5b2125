//! Instruction semantics models.
//!
//! A model maps a decoded instruction to its closed set of register effects.
//! Models are chained; the first one that recognizes the mnemonic wins.

use regval_ir::{Arch, Effect, Instruction, Register, RegisterSet};
use tracing::trace;

use crate::types::{DecodedInstr, Operand};

/// Extension point for instruction semantics.
pub trait EffectModel<A: Arch>: Send + Sync {
    /// Model name for logging.
    fn name(&self) -> &'static str;

    /// Effects of `instr`, or `None` to fall through to the next model.
    fn effects(&self, instr: &DecodedInstr) -> Option<Vec<Effect>>;
}

/// Composite model that chains several models.
pub struct CompositeModel<A: Arch> {
    models: Vec<Box<dyn EffectModel<A>>>,
}

impl<A: Arch> CompositeModel<A> {
    /// Create a composite model from the given models.
    pub fn new(models: Vec<Box<dyn EffectModel<A>>>) -> Self {
        Self { models }
    }

    /// Create a composite model with no models; everything lifts as unmodeled.
    pub fn empty() -> Self {
        Self { models: Vec::new() }
    }

    /// Add a model that is consulted before the existing ones.
    #[must_use]
    pub fn with_override(mut self, model: impl EffectModel<A> + 'static) -> Self {
        self.models.insert(0, Box::new(model));
        self
    }

    /// Add a model that is consulted after the existing ones.
    #[must_use]
    pub fn with_model(mut self, model: impl EffectModel<A> + 'static) -> Self {
        self.models.push(Box::new(model));
        self
    }

    /// Lift a decoded instruction. Unrecognized instructions become a single
    /// [`Effect::Unmodeled`] over every register they may write.
    pub fn lift(&self, instr: &DecodedInstr) -> Instruction {
        for model in &self.models {
            if let Some(effects) = model.effects(instr) {
                trace!(
                    address = instr.address,
                    mnemonic = %instr.mnemonic,
                    model = model.name(),
                    effects = effects.len(),
                    "lifted"
                );
                return Instruction::new(instr.address, instr.size, &instr.mnemonic, effects);
            }
        }
        let written = possibly_written(instr);
        Instruction::new(
            instr.address,
            instr.size,
            &instr.mnemonic,
            vec![Effect::unmodeled(written)],
        )
    }
}

/// Clobber every register in `set`.
pub(crate) fn clobber_all(set: RegisterSet) -> Vec<Effect> {
    set.iter().map(Effect::clobber).collect()
}

/// Clobber the destination (first register operand) if there is one.
pub(crate) fn clobber_dest(instr: &DecodedInstr) -> Vec<Effect> {
    instr
        .first_register()
        .map(|view| Effect::clobber(view.reg))
        .into_iter()
        .collect()
}

/// Register operands ahead of the first operand of another kind.
/// Zero registers are skipped.
pub(crate) fn leading_registers(instr: &DecodedInstr) -> RegisterSet {
    let mut set = RegisterSet::EMPTY;
    for op in &instr.operands {
        match op {
            Operand::Reg(view) | Operand::WritebackReg(view) => set.insert(view.reg),
            Operand::Zero { .. } => {}
            _ => break,
        }
    }
    set
}

/// Every plain register operand, wherever it appears.
pub(crate) fn register_operands(instr: &DecodedInstr) -> RegisterSet {
    instr
        .operands
        .iter()
        .filter_map(Operand::as_reg)
        .fold(RegisterSet::EMPTY, |set, view| set.with(view.reg))
}

/// Registers an unknown instruction may write: its leading registers, any
/// register list and a written-back base.
pub(crate) fn possibly_written(instr: &DecodedInstr) -> RegisterSet {
    let mut set = leading_registers(instr);
    for op in &instr.operands {
        if let Operand::RegList(list) = op {
            set = set.union(*list);
        }
    }
    if let Some(base) = writeback_base(instr) {
        set.insert(base);
    }
    set
}

/// Registers loaded by a load instruction: register operands before the
/// memory operand, and any register list.
pub(crate) fn loaded_registers(instr: &DecodedInstr) -> RegisterSet {
    let mut set = RegisterSet::EMPTY;
    for op in &instr.operands {
        match op {
            Operand::Reg(view) => set.insert(view.reg),
            Operand::RegList(list) => set = set.union(*list),
            Operand::Mem(_) => break,
            _ => {}
        }
    }
    set
}

/// Base register updated by pre/post-indexed addressing or a `!` writeback.
pub(crate) fn writeback_base(instr: &DecodedInstr) -> Option<Register> {
    for (idx, op) in instr.operands.iter().enumerate() {
        match op {
            Operand::WritebackReg(view) => return Some(view.reg),
            Operand::Mem(mem) => {
                let post_indexed = instr.operands.len() > idx + 1;
                if mem.writeback || post_indexed {
                    return mem.base.map(|v| v.reg);
                }
            }
            _ => {}
        }
    }
    None
}

/// Effects of a load: loaded registers and written-back base become unknown.
pub(crate) fn load_effects(instr: &DecodedInstr) -> Vec<Effect> {
    let mut set = loaded_registers(instr);
    if let Some(base) = writeback_base(instr) {
        set.insert(base);
    }
    clobber_all(set)
}

/// Effects of a store: only a written-back base changes.
pub(crate) fn store_effects(instr: &DecodedInstr) -> Vec<Effect> {
    writeback_base(instr)
        .map(Effect::clobber)
        .into_iter()
        .collect()
}

/// Sign-extend/truncate an immediate to a raw pattern at `bits` width.
pub(crate) fn imm_bits(value: i64, bits: u8) -> u64 {
    (value as u64) & regval_ir::width_mask(bits)
}
