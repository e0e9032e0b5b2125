//! Whole-program driver: one engine per function, facts merged afterwards.

use rayon::prelude::*;
use regval_ir::{Arch, Program};
use tracing::{debug, trace_span, warn};

use crate::cfg::EdgeIndex;
use crate::config::AnalysisConfig;
use crate::engine::{Engine, FunctionAnalysis};
use crate::error::{Diagnostic, DiagnosticKind, Result, Severity};
use crate::facts::{FactTable, extract_facts};

/// Best-effort result for a whole program.
#[derive(Clone, Debug, Default)]
pub struct AnalysisReport {
    pub facts: FactTable,
    pub diagnostics: Vec<Diagnostic>,
    /// Functions analyzed to a fixpoint.
    pub analyzed: usize,
    /// Functions whose analysis failed.
    pub failed: usize,
}

impl AnalysisReport {
    /// Diagnostics of at least `severity`.
    pub fn diagnostics_at(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(move |d| d.severity() >= severity)
    }
}

pub struct ProgramAnalyzer;

impl ProgramAnalyzer {
    pub fn analyze<A: Arch>(program: &Program<A>, config: &AnalysisConfig) -> AnalysisReport {
        let _span = trace_span!("analyze_program", arch = A::NAME).entered();
        let edges = {
            let _span = trace_span!("index_edges").entered();
            EdgeIndex::new(program)
        };
        let engine = Engine::new(program, &edges, config);

        let results: Vec<Result<FunctionAnalysis>> = if config.parallel {
            program
                .functions
                .par_iter()
                .map(|function| engine.analyze(function))
                .collect()
        } else {
            program
                .functions
                .iter()
                .map(|function| engine.analyze(function))
                .collect()
        };

        let mut diagnostics = Vec::new();
        let mut analyses = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(analysis) => {
                    diagnostics.extend(analysis.diagnostics.iter().cloned());
                    analyses.push(analysis);
                }
                Err(err) => {
                    warn!(function = err.function(), error = %err, "function analysis failed");
                    diagnostics.push(Diagnostic::new(
                        err.function(),
                        DiagnosticKind::FunctionFailed(err.clone()),
                    ));
                }
            }
        }

        let (facts, conflicts) = {
            let _span = trace_span!("extract_facts").entered();
            extract_facts::<A>(analyses.iter().flat_map(|analysis| {
                analysis
                    .observations
                    .iter()
                    .map(|obs| (analysis.function.as_str(), obs))
            }))
        };
        diagnostics.extend(conflicts);

        let analyzed = analyses.len();
        let failed = program.functions.len() - analyzed;
        debug!(
            functions = program.functions.len(),
            analyzed,
            failed,
            facts = facts.len(),
            diagnostics = diagnostics.len(),
            tracked = engine.tracked().len(),
            "program analyzed"
        );

        AnalysisReport {
            facts,
            diagnostics,
            analyzed,
            failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ObservationPoints;
    use crate::error::AnalysisError;
    use regval_ir::{Arm32, BasicBlock, BlockId, Edge, Effect, Function, Instruction, Register};

    fn r(idx: u8) -> Register {
        Register::new(idx).unwrap()
    }

    /// Functions `f1..f3`, each `r0 = k; bl callee`.
    fn program() -> Program<Arm32> {
        let mut program = Program::new();
        let callee = program.add_block(BasicBlock::with_instructions(
            0x9000,
            vec![Instruction::new(0x9000, 4, "bx", Vec::new())],
        ));
        program.add_function(Function::new("callee", callee));
        for k in 1..=3u64 {
            let base = 0x1000 * k;
            let block = program.add_block(BasicBlock::with_instructions(
                base,
                vec![
                    Instruction::new(base, 4, "mov", vec![Effect::immediate(r(0), k)]),
                    Instruction::new(base + 4, 4, "bl", vec![Effect::clobber(r(14))]),
                ],
            ));
            program.add_edge(Edge::call(block, callee));
            program.add_function(Function::new(&format!("f{k}"), block));
        }
        program
    }

    #[test]
    fn test_facts_from_every_function() {
        let report = ProgramAnalyzer::analyze(&program(), &AnalysisConfig::default());
        let facts: Vec<_> = report.facts.iter().map(|f| (f.address, f.value)).collect();
        assert_eq!(facts, vec![(0x1004, 1), (0x2004, 2), (0x3004, 3)]);
        assert_eq!(report.analyzed, 4);
        assert_eq!(report.failed, 0);
    }

    #[test]
    fn test_parallel_and_sequential_agree_and_are_idempotent() {
        let program = program();
        let config = AnalysisConfig::default().with_observe(ObservationPoints::BlockExits);
        let first = ProgramAnalyzer::analyze(&program, &config);
        let second = ProgramAnalyzer::analyze(&program, &config);
        let sequential = ProgramAnalyzer::analyze(&program, &config.clone().with_parallel(false));
        assert_eq!(first.facts, second.facts);
        assert_eq!(first.facts, sequential.facts);
        assert_eq!(first.diagnostics, sequential.diagnostics);
    }

    #[test]
    fn test_failed_function_does_not_stop_others() {
        let mut program = program();
        program.add_function(Function::new("broken", BlockId(1)).with_blocks([BlockId(99)]));
        let report = ProgramAnalyzer::analyze(&program, &AnalysisConfig::default());
        assert_eq!(report.failed, 1);
        assert_eq!(report.facts.len(), 3);
        let errors: Vec<_> = report.diagnostics_at(Severity::Error).collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].function, "broken");
        assert!(matches!(
            &errors[0].kind,
            DiagnosticKind::FunctionFailed(AnalysisError::MalformedCfg { .. })
        ));
    }

    #[test]
    fn test_divergence_reported_per_function() {
        let config = AnalysisConfig::default().with_visit_limit_multiplier(0);
        let report = ProgramAnalyzer::analyze(&program(), &config);
        assert_eq!(report.failed, 4);
        assert!(report.facts.is_empty());
        assert_eq!(report.diagnostics_at(Severity::Warning).count(), 4);
    }
}
