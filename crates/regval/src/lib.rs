//! regval - static register value inference for ARM binaries
//!
//! Reads a disassembled CFG listing, runs a per-function dataflow fixpoint
//! and reports the registers whose values are provably exact at each call
//! site.
//!
//! # Example
//!
//! ```ignore
//! use regval::{AnalysisConfig, Pipeline, OutputFormat, render};
//!
//! let analysis = Pipeline::new(AnalysisConfig::default()).run_file("fun.lst".as_ref())?;
//! print!("{}", render(OutputFormat::Relation, &analysis.report.facts, &analysis.arch));
//! ```

// Re-export from sub-crates
pub use regval_cfg::{
    AnalysisConfig, AnalysisError, AnalysisReport, CallPolicy, Diagnostic, DiagnosticKind, Engine,
    Fact, FactTable, FunctionAnalysis, LatticeValue, ObservationPoints, ProgramAnalyzer,
    RegisterState, Severity,
};
pub use regval_ir::{
    Arch, ArchKind, Arm32, Arm64, BasicBlock, BlockId, Edge, EdgeKind, Effect, Function,
    Instruction, Program, Register, RegisterSet,
};
pub use regval_isa::{CompositeModel, DecodedInstr, EffectModel, ModeledArch, Operand};

mod error;
mod listing;
mod pipeline;
mod report;
mod verify;

pub use error::*;
pub use listing::{
    ListingError, ListingErrorKind, detect_arch, parse_listing, parse_listing_with,
};
pub use pipeline::*;
pub use report::*;
pub use verify::*;
