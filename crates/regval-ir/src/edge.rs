//! Control flow edges.

use std::fmt;
use std::str::FromStr;

use crate::block::BlockId;

/// How control reaches an edge's destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Sequential flow into the next block (including a call's return site).
    Fallthrough,
    /// Taken conditional or unconditional jump.
    Branch,
    /// Transfer into a callee.
    Call,
    /// Return from a callee to a return site.
    Return,
}

impl EdgeKind {
    /// Check if values flow along this edge within one function.
    pub const fn is_intraprocedural(self) -> bool {
        matches!(self, Self::Fallthrough | Self::Branch)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fallthrough => "fallthrough",
            Self::Branch => "branch",
            Self::Call => "call",
            Self::Return => "return",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EdgeKind {
    type Err = UnknownEdgeKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fallthrough" | "fall" => Ok(Self::Fallthrough),
            "branch" | "jump" => Ok(Self::Branch),
            "call" => Ok(Self::Call),
            "return" | "ret" => Ok(Self::Return),
            _ => Err(UnknownEdgeKind(s.to_string())),
        }
    }
}

/// Edge kind name not recognized.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown edge kind: {0}")]
pub struct UnknownEdgeKind(pub String);

/// Directed edge between two blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: BlockId,
    pub to: BlockId,
    pub kind: EdgeKind,
}

impl Edge {
    pub const fn new(from: BlockId, to: BlockId, kind: EdgeKind) -> Self {
        Self { from, to, kind }
    }

    pub const fn fallthrough(from: BlockId, to: BlockId) -> Self {
        Self::new(from, to, EdgeKind::Fallthrough)
    }

    pub const fn branch(from: BlockId, to: BlockId) -> Self {
        Self::new(from, to, EdgeKind::Branch)
    }

    pub const fn call(from: BlockId, to: BlockId) -> Self {
        Self::new(from, to, EdgeKind::Call)
    }

    pub const fn ret(from: BlockId, to: BlockId) -> Self {
        Self::new(from, to, EdgeKind::Return)
    }
}
