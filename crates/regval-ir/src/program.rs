//! Whole-program CFG input: blocks, edges and function partitions.

use std::marker::PhantomData;

use crate::arch::Arch;
use crate::block::{BasicBlock, BlockId};
use crate::edge::Edge;
use crate::register::Register;

/// A function: an entry block and the blocks that belong to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Function {
    /// Symbol name, used to scope diagnostics.
    pub name: String,
    /// Entry block.
    pub entry: BlockId,
    /// Member blocks, including the entry.
    pub blocks: Vec<BlockId>,
    /// Register values known to hold on entry.
    pub entry_values: Vec<(Register, u64)>,
}

impl Function {
    /// Create a function whose only member is its entry block.
    pub fn new(name: &str, entry: BlockId) -> Self {
        Self {
            name: name.to_string(),
            entry,
            blocks: vec![entry],
            entry_values: Vec::new(),
        }
    }

    /// Add member blocks (the entry is not duplicated).
    #[must_use]
    pub fn with_blocks(mut self, blocks: impl IntoIterator<Item = BlockId>) -> Self {
        for id in blocks {
            if !self.blocks.contains(&id) {
                self.blocks.push(id);
            }
        }
        self
    }

    /// Assume `reg` holds `value` on entry.
    #[must_use]
    pub fn with_entry_value(mut self, reg: Register, value: u64) -> Self {
        self.entry_values.push((reg, value));
        self
    }
}

/// Read-only analysis input.
#[derive(Clone, Debug)]
pub struct Program<A: Arch> {
    /// All blocks, indexed by [`BlockId`].
    pub blocks: Vec<BasicBlock>,
    /// All edges, including inter-procedural ones.
    pub edges: Vec<Edge>,
    /// Function partitions.
    pub functions: Vec<Function>,
    _marker: PhantomData<A>,
}

impl<A: Arch> Default for Program<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Arch> Program<A> {
    /// Create an empty program.
    pub const fn new() -> Self {
        Self {
            blocks: Vec::new(),
            edges: Vec::new(),
            functions: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Add a block and return its id.
    pub fn add_block(&mut self, block: BasicBlock) -> BlockId {
        let id = BlockId(u32::try_from(self.blocks.len()).unwrap_or(u32::MAX));
        self.blocks.push(block);
        id
    }

    pub fn add_edge(&mut self, edge: Edge) {
        self.edges.push(edge);
    }

    pub fn add_function(&mut self, function: Function) {
        self.functions.push(function);
    }

    /// Look up a block.
    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(id.index())
    }

    /// Check if a block id refers to an existing block.
    pub fn contains(&self, id: BlockId) -> bool {
        id.index() < self.blocks.len()
    }

    /// Look up a function by name.
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Total instruction count.
    pub fn instruction_count(&self) -> usize {
        self.blocks.iter().map(BasicBlock::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::Arm32;
    use crate::edge::EdgeKind;
    use crate::instr::Instruction;

    #[test]
    fn test_program_blocks_and_functions() {
        let mut program = Program::<Arm32>::new();
        let a = program.add_block(BasicBlock::with_instructions(
            0x100,
            vec![Instruction::inert(0x100, 4, "nop")],
        ));
        let b = program.add_block(BasicBlock::new(0x104));
        program.add_edge(Edge::fallthrough(a, b));
        program.add_function(Function::new("main", a).with_blocks([a, b]));

        assert_eq!(a, BlockId(0));
        assert_eq!(b, BlockId(1));
        assert!(program.contains(b));
        assert!(!program.contains(BlockId(2)));
        assert_eq!(program.block(a).map(|blk| blk.address), Some(0x100));
        assert_eq!(program.edges[0].kind, EdgeKind::Fallthrough);
        assert_eq!(program.function("main").map(|f| f.blocks.len()), Some(2));
        assert_eq!(program.instruction_count(), 1);
    }

    #[test]
    fn test_function_entry_values() {
        let r1 = Register::new(1).unwrap();
        let f = Function::new("f", BlockId(0)).with_entry_value(r1, 9);
        assert_eq!(f.entry_values, vec![(r1, 9)]);
        assert_eq!(f.blocks, vec![BlockId(0)]);
    }
}
