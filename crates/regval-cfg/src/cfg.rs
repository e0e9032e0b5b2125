//! Validated per-function view of the program CFG.

use regval_ir::{Arch, BlockId, EdgeKind, Function, Program};
use rustc_hash::FxHashMap;

use crate::error::{AnalysisError, Result};

/// Edges touching each block, built once per program.
#[derive(Clone, Debug, Default)]
pub struct EdgeIndex {
    outgoing: Vec<Vec<usize>>,
    incoming: Vec<Vec<usize>>,
}

impl EdgeIndex {
    pub fn new<A: Arch>(program: &Program<A>) -> Self {
        let mut outgoing = vec![Vec::new(); program.blocks.len()];
        let mut incoming = vec![Vec::new(); program.blocks.len()];
        for (idx, edge) in program.edges.iter().enumerate() {
            if let Some(list) = outgoing.get_mut(edge.from.index()) {
                list.push(idx);
            }
            if let Some(list) = incoming.get_mut(edge.to.index()) {
                list.push(idx);
            }
        }
        Self { outgoing, incoming }
    }

    fn outgoing(&self, block: BlockId) -> &[usize] {
        self.outgoing.get(block.index()).map_or(&[], Vec::as_slice)
    }

    fn incoming(&self, block: BlockId) -> &[usize] {
        self.incoming.get(block.index()).map_or(&[], Vec::as_slice)
    }
}

/// Successor of a block inside its function.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Successor {
    /// Local index of the target.
    pub target: usize,
    /// Return-site edge out of a call block; the call policy applies.
    pub after_call: bool,
}

/// One function's blocks under local indices, with intra-procedural successors.
#[derive(Clone, Debug)]
pub struct FunctionCfg {
    pub blocks: Vec<BlockId>,
    pub entry: usize,
    pub successors: Vec<Vec<Successor>>,
    pub call_sites: Vec<bool>,
    index: FxHashMap<BlockId, usize>,
}

impl FunctionCfg {
    /// Validate `function` against `program` and build its local view.
    pub fn build<A: Arch>(
        program: &Program<A>,
        edges: &EdgeIndex,
        function: &Function,
    ) -> Result<Self> {
        let name = function.name.as_str();
        let mut index = FxHashMap::default();
        let mut blocks = Vec::with_capacity(function.blocks.len());
        for &block in &function.blocks {
            if !program.contains(block) {
                return Err(AnalysisError::malformed(
                    name,
                    format!("member {block} does not exist"),
                ));
            }
            if !index.contains_key(&block) {
                index.insert(block, blocks.len());
                blocks.push(block);
            }
        }
        if !program.contains(function.entry) {
            return Err(AnalysisError::malformed(
                name,
                format!("entry {} does not exist", function.entry),
            ));
        }
        let Some(&entry) = index.get(&function.entry) else {
            return Err(AnalysisError::malformed(
                name,
                format!("entry {} is not a member", function.entry),
            ));
        };

        for &block in &blocks {
            for &edge_idx in edges.incoming(block) {
                let edge = &program.edges[edge_idx];
                if !program.contains(edge.from) {
                    return Err(AnalysisError::malformed(
                        name,
                        format!("{} edge into {block} from missing {}", edge.kind, edge.from),
                    ));
                }
            }
        }

        let mut successors = vec![Vec::new(); blocks.len()];
        let mut call_sites = vec![false; blocks.len()];
        for (local, &block) in blocks.iter().enumerate() {
            let out = edges.outgoing(block);
            for &edge_idx in out {
                let edge = &program.edges[edge_idx];
                if !program.contains(edge.to) {
                    return Err(AnalysisError::malformed(
                        name,
                        format!("{} edge from {block} to missing {}", edge.kind, edge.to),
                    ));
                }
                if edge.kind == EdgeKind::Call {
                    call_sites[local] = true;
                }
            }
            for &edge_idx in out {
                let edge = &program.edges[edge_idx];
                // tail jumps and edges into other functions do not propagate
                let Some(&target) = index.get(&edge.to) else {
                    continue;
                };
                if edge.kind.is_intraprocedural() {
                    let after_call = call_sites[local] && edge.kind == EdgeKind::Fallthrough;
                    successors[local].push(Successor { target, after_call });
                }
            }
        }

        Ok(Self {
            blocks,
            entry,
            successors,
            call_sites,
            index,
        })
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Local index of a member block.
    pub fn local(&self, block: BlockId) -> Option<usize> {
        self.index.get(&block).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regval_ir::{Arm32, BasicBlock, Edge};

    fn program(blocks: usize) -> Program<Arm32> {
        let mut program = Program::new();
        for i in 0..blocks {
            program.add_block(BasicBlock::new(0x1000 + 0x10 * i as u64));
        }
        program
    }

    #[test]
    fn test_build_local_view() {
        let mut program = program(4);
        program.add_edge(Edge::branch(BlockId(0), BlockId(1)));
        program.add_edge(Edge::call(BlockId(1), BlockId(3)));
        program.add_edge(Edge::fallthrough(BlockId(1), BlockId(2)));
        program.add_edge(Edge::ret(BlockId(3), BlockId(2)));
        let function = Function::new("f", BlockId(0)).with_blocks([BlockId(1), BlockId(2)]);
        let cfg = FunctionCfg::build(&program, &EdgeIndex::new(&program), &function).unwrap();

        assert_eq!(cfg.len(), 3);
        assert_eq!(cfg.entry, 0);
        assert_eq!(cfg.call_sites, vec![false, true, false]);
        assert_eq!(
            cfg.successors[0],
            vec![Successor {
                target: 1,
                after_call: false
            }]
        );
        // the call edge leaves the function; only the return site remains
        assert_eq!(
            cfg.successors[1],
            vec![Successor {
                target: 2,
                after_call: true
            }]
        );
        assert_eq!(cfg.local(BlockId(3)), None);
    }

    #[test]
    fn test_malformed_inputs_rejected() {
        let mut program = program(2);
        let edges = EdgeIndex::new(&program);
        let missing_member = Function::new("f", BlockId(0)).with_blocks([BlockId(7)]);
        assert!(matches!(
            FunctionCfg::build(&program, &edges, &missing_member),
            Err(AnalysisError::MalformedCfg { .. })
        ));

        let mut not_member = Function::new("g", BlockId(0));
        not_member.blocks = vec![BlockId(1)];
        assert!(FunctionCfg::build(&program, &edges, &not_member).is_err());

        program.add_edge(Edge::branch(BlockId(0), BlockId(9)));
        let edges = EdgeIndex::new(&program);
        let function = Function::new("h", BlockId(0));
        let err = FunctionCfg::build(&program, &edges, &function).unwrap_err();
        assert_eq!(err.function(), "h");
        assert!(err.to_string().contains("missing b9"));
    }
}
