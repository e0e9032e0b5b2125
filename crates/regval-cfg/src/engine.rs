//! Forward dataflow fixpoint over one function.

use std::collections::VecDeque;

use regval_ir::{Arch, BlockId, Function, Program, Register, RegisterSet};
use tracing::{debug, trace, trace_span, warn};

use crate::cfg::{EdgeIndex, FunctionCfg};
use crate::config::{AnalysisConfig, ObservationPoints};
use crate::error::{AnalysisError, Diagnostic, DiagnosticKind, Result};
use crate::lattice::LatticeValue;
use crate::state::RegisterState;

/// Register values immediately before an observed instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Observation {
    /// Raw (unnormalized) instruction address.
    pub address: u64,
    /// Non-Bottom tracked registers.
    pub values: Vec<(Register, LatticeValue)>,
}

/// Result of analyzing one function to a fixpoint.
#[derive(Clone, Debug)]
pub struct FunctionAnalysis {
    pub function: String,
    pub observations: Vec<Observation>,
    pub diagnostics: Vec<Diagnostic>,
    /// Total block visits until the fixpoint.
    pub visits: usize,
    cfg: FunctionCfg,
    entry_states: Vec<Option<RegisterState>>,
    exit_states: Vec<Option<RegisterState>>,
}

impl FunctionAnalysis {
    /// Final entry state of a block, `None` if unreachable or not a member.
    pub fn entry_state(&self, block: BlockId) -> Option<&RegisterState> {
        self.cfg
            .local(block)
            .and_then(|idx| self.entry_states[idx].as_ref())
    }

    /// Final exit state of a block.
    pub fn exit_state(&self, block: BlockId) -> Option<&RegisterState> {
        self.cfg
            .local(block)
            .and_then(|idx| self.exit_states[idx].as_ref())
    }

    pub fn is_reachable(&self, block: BlockId) -> bool {
        self.entry_state(block).is_some()
    }

    pub fn block_count(&self) -> usize {
        self.cfg.len()
    }
}

struct Fixpoint {
    entry_states: Vec<Option<RegisterState>>,
    exit_states: Vec<Option<RegisterState>>,
    visits: usize,
}

/// Per-function propagation engine over a shared read-only program.
pub struct Engine<'a, A: Arch> {
    program: &'a Program<A>,
    edges: &'a EdgeIndex,
    config: &'a AnalysisConfig,
    tracked: RegisterSet,
}

impl<'a, A: Arch> Engine<'a, A> {
    pub fn new(program: &'a Program<A>, edges: &'a EdgeIndex, config: &'a AnalysisConfig) -> Self {
        Self {
            program,
            edges,
            config,
            tracked: config.tracked_for::<A>(),
        }
    }

    pub const fn tracked(&self) -> RegisterSet {
        self.tracked
    }

    pub fn analyze(&self, function: &Function) -> Result<FunctionAnalysis> {
        self.analyze_observed(function, |_, _| {})
    }

    /// Analyze, calling `on_visit` with each block's entry state as it is processed.
    pub fn analyze_observed(
        &self,
        function: &Function,
        mut on_visit: impl FnMut(BlockId, &RegisterState),
    ) -> Result<FunctionAnalysis> {
        let _span = trace_span!("analyze_function", function = %function.name).entered();

        let cfg = {
            let _span = trace_span!("validate").entered();
            FunctionCfg::build(self.program, self.edges, function)?
        };

        let Fixpoint {
            entry_states,
            exit_states,
            visits,
        } = {
            let _span = trace_span!("fixpoint").entered();
            self.fixpoint(function, &cfg, &mut on_visit)?
        };

        let mut analysis = FunctionAnalysis {
            function: function.name.clone(),
            observations: Vec::new(),
            diagnostics: Vec::new(),
            visits,
            cfg,
            entry_states,
            exit_states,
        };
        {
            let _span = trace_span!("observe").entered();
            self.collect(&mut analysis);
        }

        debug!(
            function = %analysis.function,
            blocks = analysis.cfg.len(),
            visits,
            observations = analysis.observations.len(),
            "function analyzed"
        );
        Ok(analysis)
    }

    fn initial_state(&self, function: &Function) -> RegisterState {
        let mut state = RegisterState::new(self.tracked);
        for &(reg, value) in &function.entry_values {
            state.set(reg, LatticeValue::exact(value, A::REG_BITS));
        }
        state
    }

    fn fixpoint(
        &self,
        function: &Function,
        cfg: &FunctionCfg,
        on_visit: &mut impl FnMut(BlockId, &RegisterState),
    ) -> Result<Fixpoint> {
        let n = cfg.len();
        let limit = self.config.visit_limit(self.tracked);
        let after_call = self.config.call_policy.clobbered::<A>(self.tracked);

        let mut entry_states: Vec<Option<RegisterState>> = vec![None; n];
        let mut exit_states: Vec<Option<RegisterState>> = vec![None; n];
        let mut visits = vec![0usize; n];
        let mut in_worklist = vec![false; n];
        let mut worklist = VecDeque::with_capacity(n);

        entry_states[cfg.entry] = Some(self.initial_state(function));
        in_worklist[cfg.entry] = true;
        worklist.push_back(cfg.entry);

        let mut total = 0;
        while let Some(idx) = worklist.pop_front() {
            in_worklist[idx] = false;
            let block_id = cfg.blocks[idx];
            visits[idx] += 1;
            total += 1;
            if visits[idx] > limit {
                return Err(AnalysisError::DivergenceLimitExceeded {
                    function: function.name.clone(),
                    block: block_id,
                    visits: visits[idx],
                    limit,
                });
            }

            let Some(mut state) = entry_states[idx].clone() else {
                continue;
            };
            on_visit(block_id, &state);
            trace!(block = %block_id, visit = visits[idx], state = %state, "visit");

            if let Some(block) = self.program.block(block_id) {
                state.apply_all(&block.instructions, A::REG_BITS);
            }

            for succ in &cfg.successors[idx] {
                let mut incoming = state.clone();
                if succ.after_call {
                    incoming.clobber(after_call);
                }
                let changed = match entry_states[succ.target].as_mut() {
                    Some(existing) => existing.join_from(&incoming),
                    None => {
                        entry_states[succ.target] = Some(incoming);
                        true
                    }
                };
                if changed && !in_worklist[succ.target] {
                    in_worklist[succ.target] = true;
                    worklist.push_back(succ.target);
                }
            }
            exit_states[idx] = Some(state);
        }

        trace!(visits = total, "fixpoint reached");
        Ok(Fixpoint {
            entry_states,
            exit_states,
            visits: total,
        })
    }

    fn collect(&self, analysis: &mut FunctionAnalysis) {
        let name = analysis.function.as_str();
        for (idx, &block_id) in analysis.cfg.blocks.iter().enumerate() {
            let Some(block) = self.program.block(block_id) else {
                continue;
            };
            let Some(entry) = analysis.entry_states[idx].as_ref() else {
                warn!(
                    function = name,
                    block = %block_id,
                    address = block.address,
                    "unreachable block"
                );
                analysis.diagnostics.push(Diagnostic::new(
                    name,
                    DiagnosticKind::UnreachableBlock {
                        block: block_id,
                        address: block.address,
                    },
                ));
                continue;
            };

            for instr in block.instructions.iter().filter(|i| i.has_decode_gap()) {
                warn!(
                    function = name,
                    address = instr.address,
                    mnemonic = %instr.mnemonic,
                    "unmodeled instruction"
                );
                analysis.diagnostics.push(Diagnostic::new(
                    name,
                    DiagnosticKind::DecodeGap {
                        address: instr.address,
                        mnemonic: instr.mnemonic.clone(),
                    },
                ));
            }

            let observed = match self.config.observe {
                ObservationPoints::CallSites => analysis.cfg.call_sites[idx],
                ObservationPoints::BlockExits => true,
            };
            let Some((last, body)) = block.instructions.split_last() else {
                continue;
            };
            if !observed {
                continue;
            }
            let mut state = entry.clone();
            state.apply_all(body, A::REG_BITS);
            analysis.observations.push(Observation {
                address: last.address,
                values: state.iter().collect(),
            });
        }
    }
}
