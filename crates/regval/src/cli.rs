//! CLI definitions and argument types.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use regval::{AnalysisConfig, CallPolicy, ObservationPoints, OutputFormat};

/// Exit code for success.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code for failure.
pub const EXIT_FAILURE: i32 = 1;

#[derive(Parser)]
#[command(name = "regval")]
#[command(about = "Static register value inference at call sites of ARM code")]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (sets RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output (only show errors)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub silent: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Infer register values at call sites of a CFG listing
    Analyze {
        /// Input listing
        #[arg(value_name = "LISTING")]
        input: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "relation")]
        format: FormatArg,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },

    /// Check inferred values against runtime observations
    Verify {
        /// Input listing
        #[arg(value_name = "LISTING")]
        input: PathBuf,

        /// Observed values, one `<addr> <reg> <value>` per line
        #[arg(value_name = "OBSERVED")]
        observed: PathBuf,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },
}

/// Options shared by commands that run the analysis.
#[derive(clap::Args, Clone, Debug)]
pub struct AnalysisArgs {
    /// Comma separated registers to track (default: argument and scratch registers)
    #[arg(long, value_delimiter = ',')]
    pub tracked: Vec<String>,

    /// Effect of calls on the caller's registers
    #[arg(long, value_enum, default_value = "clobber-caller-saved")]
    pub call_policy: CallPolicyArg,

    /// Program points to report
    #[arg(long, value_enum, default_value = "call-sites")]
    pub observe: ObserveArg,

    /// Per-block visit cap multiplier
    #[arg(long, default_value_t = 2)]
    pub visit_limit: usize,

    /// Analyze functions on one thread
    #[arg(long)]
    pub sequential: bool,
}

impl AnalysisArgs {
    pub fn config(&self) -> AnalysisConfig {
        AnalysisConfig::default()
            .with_call_policy(self.call_policy.into())
            .with_observe(self.observe.into())
            .with_visit_limit_multiplier(self.visit_limit)
            .with_parallel(!self.sequential)
    }
}

// ============================================================================
// Argument types with conversions
// ============================================================================

/// Fact output format.
#[derive(Clone, Copy, Debug, ValueEnum, Default)]
pub enum FormatArg {
    /// Tab separated relation rows
    #[default]
    Relation,
    /// Per-address comments
    Comments,
    /// Aligned table
    Table,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Relation => Self::Relation,
            FormatArg::Comments => Self::Comments,
            FormatArg::Table => Self::Table,
        }
    }
}

/// Call treatment at return sites.
#[derive(Clone, Copy, Debug, ValueEnum, Default)]
pub enum CallPolicyArg {
    /// Calls leave tracked registers untouched
    Preserve,
    /// Caller-saved registers are unknown after a call
    #[default]
    ClobberCallerSaved,
    /// All tracked registers are unknown after a call
    ClobberAll,
}

impl From<CallPolicyArg> for CallPolicy {
    fn from(arg: CallPolicyArg) -> Self {
        match arg {
            CallPolicyArg::Preserve => Self::Preserve,
            CallPolicyArg::ClobberCallerSaved => Self::ClobberCallerSaved,
            CallPolicyArg::ClobberAll => Self::ClobberAll,
        }
    }
}

/// Observation points.
#[derive(Clone, Copy, Debug, ValueEnum, Default)]
pub enum ObserveArg {
    /// Call instructions
    #[default]
    CallSites,
    /// Last instruction of every block
    BlockExits,
}

impl From<ObserveArg> for ObservationPoints {
    fn from(arg: ObserveArg) -> Self {
        match arg {
            ObserveArg::CallSites => Self::CallSites,
            ObserveArg::BlockExits => Self::BlockExits,
        }
    }
}
