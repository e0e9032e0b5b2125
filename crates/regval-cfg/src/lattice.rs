//! Flat value lattice: Bottom < Exact(n) < Top.

use std::fmt;

use regval_ir::width_mask;

/// Abstract value of one register at one program point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LatticeValue {
    /// Never written on any path reaching this point.
    #[default]
    Bottom,
    /// Provably holds `value`, a raw bit pattern of `bits` width.
    Exact { value: u64, bits: u8 },
    /// Conflicting or unknown.
    Top,
}

impl LatticeValue {
    /// Exact value, masked to `bits`.
    pub const fn exact(value: u64, bits: u8) -> Self {
        Self::Exact {
            value: value & width_mask(bits),
            bits,
        }
    }

    /// Least upper bound.
    #[must_use]
    pub fn join(self, other: Self) -> Self {
        match (self, other) {
            (Self::Bottom, v) | (v, Self::Bottom) => v,
            (Self::Top, _) | (_, Self::Top) => Self::Top,
            (a, b) if a == b => a,
            _ => Self::Top,
        }
    }

    /// Lattice order.
    pub fn leq(self, other: Self) -> bool {
        match (self, other) {
            (Self::Bottom, _) | (_, Self::Top) => true,
            (a, b) => a == b,
        }
    }

    /// Value and width if exact.
    pub const fn is_exact(self) -> Option<(u64, u8)> {
        match self {
            Self::Exact { value, bits } => Some((value, bits)),
            _ => None,
        }
    }

    pub const fn is_top(self) -> bool {
        matches!(self, Self::Top)
    }

    pub const fn is_bottom(self) -> bool {
        matches!(self, Self::Bottom)
    }

    /// `self * multiplier + offset`, wrapped to `bits`.
    #[must_use]
    pub const fn affine(self, multiplier: i64, offset: i64, bits: u8) -> Self {
        match self {
            Self::Exact { value, .. } => Self::exact(
                value
                    .wrapping_mul(multiplier as u64)
                    .wrapping_add(offset as u64),
                bits,
            ),
            other => other,
        }
    }

    /// Low `from` bits, sign or zero extended to `to` bits.
    #[must_use]
    pub const fn extend(self, from: u8, to: u8, signed: bool) -> Self {
        match self {
            Self::Exact { value, .. } => {
                let low = value & width_mask(from);
                let sign_bit = from > 0 && from < 64 && (low >> (from - 1)) & 1 == 1;
                let value = if signed && sign_bit {
                    low | !width_mask(from)
                } else {
                    low
                };
                Self::exact(value, to)
            }
            other => other,
        }
    }

    /// The same register contents tagged with the full register width.
    ///
    /// Narrow results are zero extended, so the value is unchanged.
    #[must_use]
    pub const fn widen(self, reg_bits: u8) -> Self {
        match self {
            Self::Exact { value, .. } => Self::exact(value, reg_bits),
            other => other,
        }
    }
}

impl fmt::Display for LatticeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bottom => write!(f, "⊥"),
            Self::Exact { value, .. } => write!(f, "{value:#x}"),
            Self::Top => write!(f, "⊤"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [LatticeValue; 5] = [
        LatticeValue::Bottom,
        LatticeValue::exact(5, 32),
        LatticeValue::exact(7, 32),
        LatticeValue::exact(5, 64),
        LatticeValue::Top,
    ];

    #[test]
    fn test_join_laws() {
        for a in ALL {
            assert_eq!(a.join(a), a);
            for b in ALL {
                assert_eq!(a.join(b), b.join(a));
                assert!(a.leq(a.join(b)));
                assert!(b.leq(a.join(b)));
                for c in ALL {
                    assert_eq!(a.join(b).join(c), a.join(b.join(c)));
                }
            }
        }
    }

    #[test]
    fn test_join_disagreement_is_top() {
        let five = LatticeValue::exact(5, 32);
        let seven = LatticeValue::exact(7, 32);
        assert_eq!(five.join(seven), LatticeValue::Top);
        assert_eq!(five.join(LatticeValue::Bottom), five);
        assert_eq!(five.join(five), five);
        // same pattern at a different width is a different value
        assert_eq!(five.join(LatticeValue::exact(5, 64)), LatticeValue::Top);
    }

    #[test]
    fn test_leq_order() {
        let five = LatticeValue::exact(5, 32);
        assert!(LatticeValue::Bottom.leq(five));
        assert!(five.leq(LatticeValue::Top));
        assert!(!LatticeValue::Top.leq(five));
        assert!(!five.leq(LatticeValue::exact(7, 32)));
    }

    #[test]
    fn test_affine_wraps_to_width() {
        let v = LatticeValue::exact(0xFFFF_FFFF, 32);
        assert_eq!(v.affine(1, 1, 32), LatticeValue::exact(0, 32));
        assert_eq!(
            LatticeValue::exact(3, 32).affine(-1, 0, 32),
            LatticeValue::exact(0xFFFF_FFFD, 32)
        );
        assert_eq!(
            LatticeValue::exact(3, 64).affine(4, 0, 64).is_exact(),
            Some((12, 64))
        );
        assert_eq!(LatticeValue::Top.affine(2, 1, 32), LatticeValue::Top);
        assert_eq!(LatticeValue::Bottom.affine(2, 1, 32), LatticeValue::Bottom);
    }

    #[test]
    fn test_extend_truncates_then_extends() {
        let v = LatticeValue::exact(300, 32);
        assert_eq!(v.extend(8, 32, false), LatticeValue::exact(44, 32));
        assert_eq!(v.extend(8, 32, true), LatticeValue::exact(44, 32));

        let half = LatticeValue::exact(0x8000, 32);
        assert_eq!(half.extend(16, 32, true), LatticeValue::exact(0xFFFF_8000, 32));
        assert_eq!(half.extend(16, 32, false), LatticeValue::exact(0x8000, 32));

        let word = LatticeValue::exact(0xFFFF_FFFF, 64);
        assert_eq!(word.extend(32, 64, true), LatticeValue::exact(u64::MAX, 64));
        assert_eq!(word.extend(8, 32, true), LatticeValue::exact(0xFFFF_FFFF, 32));
        assert_eq!(LatticeValue::Top.extend(8, 32, true), LatticeValue::Top);
        assert_eq!(LatticeValue::Bottom.extend(8, 32, true), LatticeValue::Bottom);
    }

    #[test]
    fn test_widen_keeps_contents() {
        let narrow = LatticeValue::exact(0xFFFF_FFFF, 32);
        assert_eq!(narrow.widen(64), LatticeValue::exact(0xFFFF_FFFF, 64));
        assert_eq!(LatticeValue::Top.widen(64), LatticeValue::Top);
    }
}
