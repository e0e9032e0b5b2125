//! Register identifiers and fixed-size register sets.

use std::fmt;

/// Maximum number of registers any supported architecture defines.
pub const MAX_REGS: usize = 64;

/// Architecture register, resolved once to a dense index.
///
/// Names are only looked up through [`crate::Arch`] at the edges (parsing and
/// display); analysis code compares indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Register(u8);

impl Register {
    /// Create a register from its index. Returns `None` past [`MAX_REGS`].
    pub const fn new(index: u8) -> Option<Self> {
        if (index as usize) < MAX_REGS {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Dense index of this register.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reg{}", self.0)
    }
}

/// Set of registers stored as a bitmask.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RegisterSet(u64);

impl RegisterSet {
    /// Empty set.
    pub const EMPTY: Self = Self(0);

    /// Create a set from a raw bitmask.
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Set containing registers `0..count`.
    pub const fn first_n(count: usize) -> Self {
        if count >= MAX_REGS {
            Self(u64::MAX)
        } else {
            Self((1u64 << count) - 1)
        }
    }

    /// Raw bitmask.
    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn contains(self, reg: Register) -> bool {
        self.0 & (1u64 << reg.0) != 0
    }

    pub const fn insert(&mut self, reg: Register) {
        self.0 |= 1u64 << reg.0;
    }

    pub const fn remove(&mut self, reg: Register) {
        self.0 &= !(1u64 << reg.0);
    }

    #[must_use]
    pub const fn with(mut self, reg: Register) -> Self {
        self.insert(reg);
        self
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate registers in ascending index order.
    pub fn iter(self) -> impl Iterator<Item = Register> {
        let mut bits = self.0;
        std::iter::from_fn(move || {
            if bits == 0 {
                return None;
            }
            let idx = bits.trailing_zeros();
            bits &= bits - 1;
            // idx < 64, always a valid register
            Some(Register(idx as u8))
        })
    }
}

impl FromIterator<Register> for RegisterSet {
    fn from_iter<I: IntoIterator<Item = Register>>(iter: I) -> Self {
        let mut set = Self::EMPTY;
        for reg in iter {
            set.insert(reg);
        }
        set
    }
}
