//! Listing-to-facts pipeline with runtime architecture dispatch.

use std::path::Path;

use regval_cfg::{AnalysisConfig, AnalysisReport, ProgramAnalyzer};
use regval_ir::{Arch, ArchKind, Arm32, Arm64, Register, RegisterSet, RegisterView};
use regval_isa::ModeledArch;
use tracing::{info, trace_span};

use crate::error::{Error, Result};
use crate::listing::{detect_arch, parse_listing};

/// Architecture hooks needed after the analysis is monomorphized away.
#[derive(Clone, Copy, Debug)]
pub struct ArchOps {
    pub kind: ArchKind,
    name: fn(Register) -> &'static str,
    parse: fn(&str) -> Option<RegisterView>,
    normalize: fn(u64) -> u64,
}

impl ArchOps {
    pub fn of<A: Arch>() -> Self {
        Self {
            kind: A::KIND,
            name: A::register_name,
            parse: A::parse_register,
            normalize: A::normalize,
        }
    }

    pub fn register_name(&self, reg: Register) -> &'static str {
        (self.name)(reg)
    }

    pub fn parse_register(&self, name: &str) -> Option<Register> {
        (self.parse)(name).map(|view| view.reg)
    }

    pub fn normalize(&self, addr: u64) -> u64 {
        (self.normalize)(addr)
    }
}

/// Result of running the pipeline on one listing.
#[derive(Clone, Debug)]
pub struct Analysis {
    pub arch: ArchOps,
    pub report: AnalysisReport,
}

/// Listing analysis pipeline.
#[derive(Clone, Debug, Default)]
pub struct Pipeline {
    config: AnalysisConfig,
    tracked: Vec<String>,
}

impl Pipeline {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            tracked: Vec::new(),
        }
    }

    /// Track registers by name, resolved once the listing's architecture is known.
    #[must_use]
    pub fn with_tracked_names(
        mut self,
        names: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.tracked = names.into_iter().map(Into::into).collect();
        self
    }

    pub const fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn run_file(&self, path: &Path) -> Result<Analysis> {
        let text = std::fs::read_to_string(path)?;
        self.run_source(&text)
    }

    /// Analyze a listing, dispatching on its `arch` directive.
    pub fn run_source(&self, text: &str) -> Result<Analysis> {
        match detect_arch(text)? {
            ArchKind::Arm32 => self.run_as::<Arm32>(text),
            ArchKind::Arm64 => self.run_as::<Arm64>(text),
        }
    }

    pub fn run_as<A: ModeledArch>(&self, text: &str) -> Result<Analysis> {
        let _span = trace_span!("pipeline", arch = A::NAME).entered();
        let program = parse_listing::<A>(text)?;
        let mut config = self.config.clone();
        if !self.tracked.is_empty() {
            config.tracked = Some(resolve_registers::<A>(&self.tracked)?);
        }
        let report = ProgramAnalyzer::analyze(&program, &config);
        info!(
            functions = program.functions.len(),
            facts = report.facts.len(),
            diagnostics = report.diagnostics.len(),
            "analysis complete"
        );
        Ok(Analysis {
            arch: ArchOps::of::<A>(),
            report,
        })
    }
}

/// Resolve register names against architecture `A`.
pub fn resolve_registers<A: Arch>(names: &[String]) -> Result<RegisterSet> {
    names
        .iter()
        .map(|name| {
            A::parse_register(name.trim())
                .map(|view| view.reg)
                .ok_or_else(|| Error::UnknownRegister {
                    arch: A::NAME,
                    name: name.clone(),
                })
        })
        .collect()
}
