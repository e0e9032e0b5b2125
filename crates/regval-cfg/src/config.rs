//! Analysis configuration.

use regval_ir::{Arch, RegisterSet};

/// What a call does to the caller's registers at the return site.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CallPolicy {
    /// Callee has no observable effect on tracked registers.
    Preserve,
    /// Caller-saved registers are unknown after the call.
    #[default]
    ClobberCallerSaved,
    /// Every tracked register is unknown after the call.
    ClobberAll,
}

impl CallPolicy {
    /// Registers made Top on the return edge.
    pub fn clobbered<A: Arch>(self, tracked: RegisterSet) -> RegisterSet {
        match self {
            Self::Preserve => RegisterSet::EMPTY,
            Self::ClobberCallerSaved => A::caller_saved().intersection(tracked),
            Self::ClobberAll => tracked,
        }
    }
}

/// Which program points produce observations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ObservationPoints {
    /// The call instruction ending each block with an outgoing call edge.
    #[default]
    CallSites,
    /// The last instruction of every reachable block.
    BlockExits,
}

/// Analysis configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Registers to track. `None` uses the architecture default.
    pub tracked: Option<RegisterSet>,
    /// Return-site treatment of calls.
    pub call_policy: CallPolicy,
    /// Observation points for fact extraction.
    pub observe: ObservationPoints,
    /// Per-block visit cap is `visit_limit_multiplier * (tracked + 1)`.
    pub visit_limit_multiplier: usize,
    /// Analyze functions on the rayon pool.
    pub parallel: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            tracked: None,
            call_policy: CallPolicy::default(),
            observe: ObservationPoints::default(),
            visit_limit_multiplier: 2,
            parallel: true,
        }
    }
}

impl AnalysisConfig {
    /// Tracked set for architecture `A`, restricted to its register file.
    pub fn tracked_for<A: Arch>(&self) -> RegisterSet {
        self.tracked
            .unwrap_or_else(A::default_tracked)
            .intersection(RegisterSet::first_n(A::NUM_REGS))
    }

    /// Maximum visits of a single block before the analysis gives up.
    pub const fn visit_limit(&self, tracked: RegisterSet) -> usize {
        self.visit_limit_multiplier * (tracked.len() + 1)
    }

    #[must_use]
    pub const fn with_tracked(mut self, tracked: RegisterSet) -> Self {
        self.tracked = Some(tracked);
        self
    }

    #[must_use]
    pub const fn with_call_policy(mut self, policy: CallPolicy) -> Self {
        self.call_policy = policy;
        self
    }

    #[must_use]
    pub const fn with_observe(mut self, observe: ObservationPoints) -> Self {
        self.observe = observe;
        self
    }

    #[must_use]
    pub const fn with_visit_limit_multiplier(mut self, multiplier: usize) -> Self {
        self.visit_limit_multiplier = multiplier;
        self
    }

    #[must_use]
    pub const fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}
