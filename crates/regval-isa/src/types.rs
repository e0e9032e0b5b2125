//! Decoded instruction types handed over by the disassembler.

use std::fmt;

use regval_ir::{RegisterSet, RegisterView};

/// Barrel shifter operation applied to the preceding register operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShiftKind {
    Lsl,
    Lsr,
    Asr,
    Ror,
    Rrx,
    /// Register extension (`uxtw`, `sxtb`, ...), A64 only.
    Extend,
}

impl ShiftKind {
    pub(crate) fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "lsl" => Self::Lsl,
            "lsr" => Self::Lsr,
            "asr" => Self::Asr,
            "ror" => Self::Ror,
            "rrx" => Self::Rrx,
            "uxtb" | "uxth" | "uxtw" | "uxtx" | "sxtb" | "sxth" | "sxtw" | "sxtx" => Self::Extend,
            _ => return None,
        })
    }
}

/// Memory operand. Only what affects registers is kept.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemOperand {
    /// Base register, if it parsed as one.
    pub base: Option<RegisterView>,
    /// Pre-indexed writeback (`[rn, #4]!`).
    pub writeback: bool,
}

/// One operand of a decoded instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operand {
    /// General purpose register.
    Reg(RegisterView),
    /// Register followed by `!` (block transfers with writeback).
    WritebackReg(RegisterView),
    /// Hardwired zero register of the given width.
    Zero { bits: u8 },
    /// Immediate (`#imm`).
    Imm(i64),
    /// Shift or extend modifier (`lsl #2`).
    Shift { kind: ShiftKind, amount: u8 },
    /// Memory reference.
    Mem(MemOperand),
    /// Register list (`{r4, r5, lr}`).
    RegList(RegisterSet),
    /// Bare code or data address (branch targets, `adr` labels).
    Target(u64),
    /// Anything else, kept verbatim.
    Other(String),
}

impl Operand {
    /// Register view if this is a plain register operand.
    pub const fn as_reg(&self) -> Option<RegisterView> {
        match *self {
            Self::Reg(view) | Self::WritebackReg(view) => Some(view),
            _ => None,
        }
    }

    /// Immediate value if this is an immediate.
    pub const fn as_imm(&self) -> Option<i64> {
        match *self {
            Self::Imm(v) => Some(v),
            _ => None,
        }
    }
}

/// Instruction as produced by the disassembly collaborator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedInstr {
    /// Raw address (may carry a mode bit).
    pub address: u64,
    /// Encoding size in bytes.
    pub size: u8,
    /// Lowercase mnemonic, width qualifiers (`.w`, `.n`) stripped.
    pub mnemonic: String,
    /// Operands in assembly order.
    pub operands: Vec<Operand>,
}

impl DecodedInstr {
    /// Create a decoded instruction, normalizing the mnemonic.
    pub fn new(address: u64, size: u8, mnemonic: &str, operands: Vec<Operand>) -> Self {
        let lower = mnemonic.to_ascii_lowercase();
        let mnemonic = lower
            .strip_suffix(".w")
            .or_else(|| lower.strip_suffix(".n"))
            .unwrap_or(&lower)
            .to_string();
        Self {
            address,
            size,
            mnemonic,
            operands,
        }
    }

    /// Operand at `idx`, if present.
    pub fn operand(&self, idx: usize) -> Option<&Operand> {
        self.operands.get(idx)
    }

    /// First operand when it is a register; by assembly convention the destination.
    pub fn first_register(&self) -> Option<RegisterView> {
        self.operands.first().and_then(Operand::as_reg)
    }
}

impl fmt::Display for DecodedInstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}: {}", self.address, self.mnemonic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regval_ir::Register;

    #[test]
    fn test_decoded_instr_normalizes_mnemonic() {
        let instr = DecodedInstr::new(0x10, 4, "MOV.W", Vec::new());
        assert_eq!(instr.mnemonic, "mov");
        assert_eq!(DecodedInstr::new(0x10, 2, "adds.n", Vec::new()).mnemonic, "adds");
        assert_eq!(instr.to_string(), "0x10: mov");
    }

    #[test]
    fn test_first_register() {
        let view = RegisterView {
            reg: Register::new(2).unwrap(),
            bits: 32,
        };
        let instr = DecodedInstr::new(0, 4, "mov", vec![Operand::Reg(view), Operand::Imm(1)]);
        assert_eq!(instr.first_register(), Some(view));
        assert_eq!(instr.operand(1).and_then(Operand::as_imm), Some(1));
        assert!(DecodedInstr::new(0, 4, "nop", Vec::new()).first_register().is_none());
    }
}
