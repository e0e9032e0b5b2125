//! Register value inference over disassembled control flow graphs.
//!
//! Each function is analyzed independently with a forward dataflow fixpoint
//! over a flat lattice. Values observed just before call instructions are
//! joined across mode-bit aliases and emitted as exact facts.

mod analyzer;
mod cfg;
mod config;
mod engine;
mod error;
mod facts;
mod lattice;
mod state;

pub use analyzer::*;
pub use cfg::*;
pub use config::*;
pub use engine::*;
pub use error::*;
pub use facts::*;
pub use lattice::*;
pub use state::*;
