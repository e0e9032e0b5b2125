use std::fmt;

use regval_ir::{BlockId, Register};
use thiserror::Error;

/// Fatal errors for one function's analysis.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("malformed CFG in `{function}`: {detail}")]
    MalformedCfg { function: String, detail: String },
    #[error("`{function}` did not stabilize: {block} visited {visits} times (limit {limit})")]
    DivergenceLimitExceeded {
        function: String,
        block: BlockId,
        visits: usize,
        limit: usize,
    },
}

impl AnalysisError {
    pub(crate) fn malformed(function: &str, detail: impl Into<String>) -> Self {
        Self::MalformedCfg {
            function: function.to_string(),
            detail: detail.into(),
        }
    }

    /// Function the error is scoped to.
    pub fn function(&self) -> &str {
        match self {
            Self::MalformedCfg { function, .. }
            | Self::DivergenceLimitExceeded { function, .. } => function,
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Non-fatal finding, or a function-level failure that did not stop others.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Instruction semantics unknown; written registers degraded to Top.
    DecodeGap { address: u64, mnemonic: String },
    /// Block has no path from the function entry.
    UnreachableBlock { block: BlockId, address: u64 },
    /// Mode-bit aliases of one address computed different values.
    AliasConflict {
        address: u64,
        register: Register,
        values: Vec<u64>,
    },
    /// The function's analysis failed; it contributes no facts.
    FunctionFailed(AnalysisError),
}

impl DiagnosticKind {
    pub const fn severity(&self) -> Severity {
        match self {
            Self::FunctionFailed(_) => Severity::Error,
            _ => Severity::Warning,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub function: String,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn new(function: &str, kind: DiagnosticKind) -> Self {
        Self {
            function: function.to_string(),
            kind,
        }
    }

    pub const fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DiagnosticKind::DecodeGap { address, mnemonic } => write!(
                f,
                "{}: unmodeled instruction `{mnemonic}` at {address:#x}",
                self.function
            ),
            DiagnosticKind::UnreachableBlock { block, address } => {
                write!(f, "{}: {block} at {address:#x} is unreachable", self.function)
            }
            DiagnosticKind::AliasConflict {
                address,
                register,
                values,
            } => {
                write!(f, "{}: conflicting values for {register} at {address:#x}:", self.function)?;
                for value in values {
                    write!(f, " {value:#x}")?;
                }
                Ok(())
            }
            DiagnosticKind::FunctionFailed(err) => write!(f, "{err}"),
        }
    }
}
