//! Target architecture definitions.
//!
//! Architectures are marker types with associated constants, so analysis code
//! is monomorphized per target and never looks registers up by name.

use std::fmt::{self, Debug};
use std::str::FromStr;

use crate::register::{Register, RegisterSet};

/// Marker type for 32-bit ARM (A32/T32).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Arm32;

/// Marker type for 64-bit ARM (A64).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Arm64;

/// A register operand as written in assembly: the register plus the width of
/// the view (`w0` is a 32-bit view of `x0`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegisterView {
    pub reg: Register,
    pub bits: u8,
}

/// Mask selecting the low `bits` bits.
pub const fn width_mask(bits: u8) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// Trait for architecture-dependent register and address facts.
pub trait Arch: Copy + Clone + Send + Sync + Default + Debug + 'static {
    /// Short lowercase name (`arm32`, `arm64`).
    const NAME: &'static str;

    /// Runtime selector for this architecture.
    const KIND: ArchKind;

    /// Number of general purpose registers.
    const NUM_REGS: usize;

    /// Register width in bits.
    const REG_BITS: u8;

    /// Address bits that encode the instruction-set mode rather than location.
    const MODE_BIT_MASK: u64;

    /// Canonical name of a register.
    fn register_name(reg: Register) -> &'static str;

    /// Parse a register name (case-insensitive), including alias and narrow views.
    fn parse_register(name: &str) -> Option<RegisterView>;

    /// Names of the hardwired zero register, if the architecture has one.
    fn is_zero_register(_name: &str) -> bool {
        false
    }

    /// Argument and scratch registers tracked when no explicit set is given.
    fn default_tracked() -> RegisterSet;

    /// Registers a callee may overwrite under the standard calling convention.
    fn caller_saved() -> RegisterSet;

    /// Register receiving the return address on a call.
    fn link_register() -> Register;

    /// Strip mode bits from a raw address.
    #[inline]
    fn normalize(addr: u64) -> u64 {
        addr & !Self::MODE_BIT_MASK
    }

    /// Mask for a full-width register value.
    #[inline]
    fn value_mask() -> u64 {
        width_mask(Self::REG_BITS)
    }
}

fn reg(index: u8) -> Register {
    // Architectures below define at most 32 registers.
    Register::new(index).unwrap_or_else(|| unreachable!("register index {index} out of range"))
}

fn numbered(name: &str, prefix: char, limit: u8) -> Option<u8> {
    let rest = name.strip_prefix(prefix)?;
    if rest.is_empty() || (rest.len() > 1 && rest.starts_with('0')) {
        return None;
    }
    let idx = rest.parse::<u8>().ok()?;
    (idx < limit).then_some(idx)
}

const ARM32_NAMES: [&str; 16] = [
    "r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8", "r9", "r10", "r11", "r12", "sp", "lr",
    "pc",
];

impl Arch for Arm32 {
    const NAME: &'static str = "arm32";
    const KIND: ArchKind = ArchKind::Arm32;
    const NUM_REGS: usize = 16;
    const REG_BITS: u8 = 32;
    // Thumb code addresses carry bit 0 set.
    const MODE_BIT_MASK: u64 = 1;

    fn register_name(reg: Register) -> &'static str {
        ARM32_NAMES.get(reg.index()).copied().unwrap_or("?")
    }

    fn parse_register(name: &str) -> Option<RegisterView> {
        let lower = name.to_ascii_lowercase();
        let idx = match lower.as_str() {
            "sp" => 13,
            "lr" => 14,
            "pc" => 15,
            "ip" => 12,
            "fp" => 11,
            "sb" => 9,
            other => numbered(other, 'r', 16)?,
        };
        Some(RegisterView {
            reg: reg(idx),
            bits: 32,
        })
    }

    fn default_tracked() -> RegisterSet {
        RegisterSet::first_n(4).with(reg(12))
    }

    fn caller_saved() -> RegisterSet {
        Self::default_tracked().with(reg(14))
    }

    fn link_register() -> Register {
        reg(14)
    }
}

const ARM64_NAMES: [&str; 32] = [
    "x0", "x1", "x2", "x3", "x4", "x5", "x6", "x7", "x8", "x9", "x10", "x11", "x12", "x13", "x14",
    "x15", "x16", "x17", "x18", "x19", "x20", "x21", "x22", "x23", "x24", "x25", "x26", "x27",
    "x28", "x29", "x30", "sp",
];

impl Arch for Arm64 {
    const NAME: &'static str = "arm64";
    const KIND: ArchKind = ArchKind::Arm64;
    const NUM_REGS: usize = 32;
    const REG_BITS: u8 = 64;
    const MODE_BIT_MASK: u64 = 0;

    fn register_name(reg: Register) -> &'static str {
        ARM64_NAMES.get(reg.index()).copied().unwrap_or("?")
    }

    fn parse_register(name: &str) -> Option<RegisterView> {
        let lower = name.to_ascii_lowercase();
        let (idx, bits) = match lower.as_str() {
            "sp" => (31, 64),
            "wsp" => (31, 32),
            "fp" => (29, 64),
            "lr" => (30, 64),
            other => {
                if let Some(idx) = numbered(other, 'x', 31) {
                    (idx, 64)
                } else {
                    (numbered(other, 'w', 31)?, 32)
                }
            }
        };
        Some(RegisterView {
            reg: reg(idx),
            bits,
        })
    }

    fn is_zero_register(name: &str) -> bool {
        name.eq_ignore_ascii_case("xzr") || name.eq_ignore_ascii_case("wzr")
    }

    fn default_tracked() -> RegisterSet {
        RegisterSet::first_n(19)
    }

    fn caller_saved() -> RegisterSet {
        RegisterSet::first_n(19).with(reg(30))
    }

    fn link_register() -> Register {
        reg(30)
    }
}

/// Runtime architecture selector, for inputs that name their target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArchKind {
    Arm32,
    Arm64,
}

impl ArchKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Arm32 => Arm32::NAME,
            Self::Arm64 => Arm64::NAME,
        }
    }
}

impl fmt::Display for ArchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ArchKind {
    type Err = UnknownArch;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "arm32" | "arm" | "armv7" | "thumb" => Ok(Self::Arm32),
            "arm64" | "aarch64" => Ok(Self::Arm64),
            _ => Err(UnknownArch(s.to_string())),
        }
    }
}

/// Architecture name not recognized.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown architecture: {0}")]
pub struct UnknownArch(pub String);
