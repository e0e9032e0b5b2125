//! Instruction effects on registers.
//!
//! The effect set is closed: decoders pick one variant per write when an
//! instruction is lifted, and propagation only matches on these.

use crate::register::{Register, RegisterSet};

/// Effect of an instruction on one destination register (or, for
/// [`Effect::Unmodeled`], on a set of them).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    /// `dst = value` (raw bit pattern, masked to register width by the engine).
    Immediate { dst: Register, value: u64 },
    /// `dst = src`.
    Copy { dst: Register, src: Register },
    /// `dst` = the low `from` bits of `src`, sign or zero extended to `to`
    /// bits, then zero extended into the register.
    Extend {
        dst: Register,
        src: Register,
        from: u8,
        to: u8,
        signed: bool,
    },
    /// `dst = (src * multiplier + offset) mod 2^bits`.
    Affine {
        dst: Register,
        src: Register,
        multiplier: i64,
        offset: i64,
        bits: u8,
    },
    /// `dst` receives a value the model cannot know.
    Clobber { dst: Register },
    /// The instruction could not be modeled; `written` are the registers it may write.
    Unmodeled { written: RegisterSet },
}

impl Effect {
    pub const fn immediate(dst: Register, value: u64) -> Self {
        Self::Immediate { dst, value }
    }

    pub const fn copy(dst: Register, src: Register) -> Self {
        Self::Copy { dst, src }
    }

    pub const fn extend(dst: Register, src: Register, from: u8, to: u8, signed: bool) -> Self {
        Self::Extend {
            dst,
            src,
            from,
            to,
            signed,
        }
    }

    /// `dst = src + offset` at the given width.
    pub const fn offset(dst: Register, src: Register, offset: i64, bits: u8) -> Self {
        Self::Affine {
            dst,
            src,
            multiplier: 1,
            offset,
            bits,
        }
    }

    pub const fn clobber(dst: Register) -> Self {
        Self::Clobber { dst }
    }

    pub const fn unmodeled(written: RegisterSet) -> Self {
        Self::Unmodeled { written }
    }

    /// Registers this effect writes.
    pub const fn written(&self) -> RegisterSet {
        match *self {
            Self::Immediate { dst, .. }
            | Self::Copy { dst, .. }
            | Self::Extend { dst, .. }
            | Self::Affine { dst, .. }
            | Self::Clobber { dst } => RegisterSet::EMPTY.with(dst),
            Self::Unmodeled { written } => written,
        }
    }

    /// Check if this effect records a decode gap.
    pub const fn is_unmodeled(&self) -> bool {
        matches!(self, Self::Unmodeled { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effect_written() {
        let r0 = Register::new(0).unwrap();
        let r1 = Register::new(1).unwrap();

        let copy = Effect::copy(r0, r1);
        assert!(copy.written().contains(r0));
        assert!(!copy.written().contains(r1));

        let ext = Effect::extend(r1, r0, 8, 32, true);
        assert_eq!(ext.written(), RegisterSet::EMPTY.with(r1));
        assert!(!ext.is_unmodeled());

        let gap = Effect::unmodeled(RegisterSet::first_n(3));
        assert!(gap.is_unmodeled());
        assert_eq!(gap.written().len(), 3);
        assert!(Effect::unmodeled(RegisterSet::EMPTY).written().is_empty());
    }
}
