//! Basic blocks.

use std::fmt;

use crate::instr::Instruction;

/// Stable index of a block within its [`crate::Program`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub u32);

impl BlockId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

/// Straight-line instruction sequence with a single entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BasicBlock {
    /// Entry address of the block.
    pub address: u64,
    /// Instructions in the block.
    pub instructions: Vec<Instruction>,
}

impl BasicBlock {
    /// Create an empty block at the given entry address.
    pub const fn new(address: u64) -> Self {
        Self {
            address,
            instructions: Vec::new(),
        }
    }

    /// Create a block from its instructions.
    pub fn with_instructions(address: u64, instructions: Vec<Instruction>) -> Self {
        Self {
            address,
            instructions,
        }
    }

    /// Add an instruction to the block.
    pub fn push(&mut self, instr: Instruction) {
        self.instructions.push(instr);
    }

    /// Get number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Check if block is empty.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}
