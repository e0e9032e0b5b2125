//! Single lifted instruction.

use crate::effect::Effect;
use crate::register::RegisterSet;

/// A decoded instruction with its register effects already resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    /// Raw address, possibly carrying a mode bit.
    pub address: u64,
    /// Instruction size in bytes.
    pub size: u8,
    /// Mnemonic, kept for diagnostics and display only.
    pub mnemonic: String,
    /// Effects in program order.
    pub effects: Vec<Effect>,
}

impl Instruction {
    /// Create a new instruction.
    pub fn new(address: u64, size: u8, mnemonic: &str, effects: Vec<Effect>) -> Self {
        Self {
            address,
            size,
            mnemonic: mnemonic.to_string(),
            effects,
        }
    }

    /// Instruction with no register effects (`nop`, stores, compares).
    pub fn inert(address: u64, size: u8, mnemonic: &str) -> Self {
        Self::new(address, size, mnemonic, Vec::new())
    }

    /// All registers written by this instruction.
    pub fn written(&self) -> RegisterSet {
        self.effects
            .iter()
            .fold(RegisterSet::EMPTY, |acc, e| acc.union(e.written()))
    }

    /// Check if any effect could not be modeled.
    pub fn has_decode_gap(&self) -> bool {
        self.effects.iter().any(Effect::is_unmodeled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::register::Register;

    #[test]
    fn test_instruction_written() {
        let r0 = Register::new(0).unwrap();
        let r2 = Register::new(2).unwrap();
        let instr = Instruction::new(
            0x1000,
            4,
            "ldrd",
            vec![Effect::clobber(r0), Effect::immediate(r2, 1)],
        );
        assert_eq!(instr.written().len(), 2);
        assert!(!instr.has_decode_gap());
        assert!(Instruction::inert(0x1004, 2, "nop").written().is_empty());
    }
}
