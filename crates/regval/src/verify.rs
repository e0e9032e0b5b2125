//! Cross-check of facts against runtime-observed register values.
//!
//! Observed values come one per line as `<hex-addr> <reg> <value>`, where the
//! value is the raw register content (decimal or `0x` hex, may be negative).
//! Comparison uses the signed reading at the fact's width, so `0xffffffff`
//! observed in a 32-bit register matches a fact of `-1`.

use std::sync::OnceLock;

use regex::Regex;
use regval_cfg::{Fact, FactTable};
use regval_ir::{Register, width_mask};
use tracing::debug;

use crate::error::{Error, Result};
use crate::listing::parse_value;
use crate::pipeline::ArchOps;

static OBSERVED_PATTERN: OnceLock<Regex> = OnceLock::new();

/// A register value seen at runtime at a (normalized) address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Observed {
    pub address: u64,
    pub register: Register,
    /// Raw register content.
    pub value: u64,
}

/// Outcome of comparing facts with observations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Verification {
    /// Observations confirmed by a fact.
    pub matched: Vec<Observed>,
    /// Observations contradicting a fact, with the fact.
    pub mismatched: Vec<(Observed, Fact)>,
    /// Observations with no fact; the analysis stayed silent.
    pub missing: Vec<Observed>,
}

impl Verification {
    /// True if no fact contradicts an observation.
    pub fn is_sound(&self) -> bool {
        self.mismatched.is_empty()
    }
}

pub fn parse_observed(text: &str, arch: &ArchOps) -> Result<Vec<Observed>> {
    let re = OBSERVED_PATTERN.get_or_init(|| {
        Regex::new(r"^\s*(?:0x)?([0-9a-fA-F]+)\s+(\w+)\s+(-?(?:0[xX][0-9a-fA-F]+|\d+))\s*$")
            .expect("observed pattern is valid")
    });
    let mut observed = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let bad = |message: String| Error::Observed {
            line: idx + 1,
            message,
        };
        let caps = re
            .captures(line)
            .ok_or_else(|| bad(format!("expected `<addr> <reg> <value>`, got `{trimmed}`")))?;
        let address = u64::from_str_radix(&caps[1], 16)
            .map_err(|e| bad(format!("bad address `{}`: {e}", &caps[1])))?;
        let register = arch
            .parse_register(&caps[2])
            .ok_or_else(|| bad(format!("unknown register `{}`", &caps[2])))?;
        let value = parse_value(&caps[3]).ok_or_else(|| bad(format!("bad value `{}`", &caps[3])))?;
        observed.push(Observed {
            address: arch.normalize(address),
            register,
            value,
        });
    }
    Ok(observed)
}

/// Compare each observation with the fact at its address and register.
pub fn verify(facts: &FactTable, observed: &[Observed]) -> Verification {
    let mut result = Verification::default();
    for obs in observed {
        match facts.get(obs.address, obs.register) {
            None => result.missing.push(*obs),
            Some(fact) => {
                let seen = Fact {
                    value: obs.value & width_mask(fact.bits),
                    ..*fact
                };
                if seen.signed() == fact.signed() {
                    result.matched.push(*obs);
                } else {
                    result.mismatched.push((*obs, *fact));
                }
            }
        }
    }
    debug!(
        matched = result.matched.len(),
        mismatched = result.mismatched.len(),
        missing = result.missing.len(),
        "verification complete"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use regval_ir::Arm32;

    fn r(idx: u8) -> Register {
        Register::new(idx).unwrap()
    }

    fn facts() -> FactTable {
        let mut table = FactTable::new();
        table.insert(Fact {
            address: 0x1008,
            register: r(0),
            value: 0xFFFF_FFFF,
            bits: 32,
        });
        table.insert(Fact {
            address: 0x1010,
            register: r(0),
            value: 3,
            bits: 32,
        });
        table
    }

    #[test]
    fn test_parse_observed_normalizes_addresses() {
        let arch = ArchOps::of::<Arm32>();
        let observed = parse_observed("# runtime\n1009 r0 -1\n0x1010\tr0\t0x3\n", &arch).unwrap();
        assert_eq!(
            observed,
            vec![
                Observed {
                    address: 0x1008,
                    register: r(0),
                    value: u64::MAX
                },
                Observed {
                    address: 0x1010,
                    register: r(0),
                    value: 3
                },
            ]
        );
        let err = parse_observed("1000 r0 1\n1004 q7 1\n", &arch).unwrap_err();
        assert!(matches!(err, Error::Observed { line: 2, .. }));
    }

    #[test]
    fn test_verify_uses_signed_interpretation() {
        let arch = ArchOps::of::<Arm32>();
        let observed = parse_observed("1008 r0 4294967295\n1010 r0 4\n1020 r1 9\n", &arch).unwrap();
        let result = verify(&facts(), &observed);
        assert_eq!(result.matched.len(), 1);
        assert_eq!(result.mismatched.len(), 1);
        assert_eq!(result.mismatched[0].1.value, 3);
        assert_eq!(result.missing.len(), 1);
        assert!(!result.is_sound());
    }
}
