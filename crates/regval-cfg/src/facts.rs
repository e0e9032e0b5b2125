//! Fact extraction and address normalization.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use regval_ir::{Arch, Register};
use tracing::warn;

use crate::engine::Observation;
use crate::error::{Diagnostic, DiagnosticKind};
use crate::lattice::LatticeValue;

/// A register provably holding an exact value at a normalized address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Fact {
    pub address: u64,
    pub register: Register,
    /// Raw bit pattern of width `bits`.
    pub value: u64,
    pub bits: u8,
}

impl Fact {
    /// Two's complement reading of `value` at `bits` width.
    pub const fn signed(&self) -> i64 {
        if self.bits == 0 || self.bits >= 64 {
            return self.value as i64;
        }
        let shift = 64 - self.bits as u32;
        ((self.value << shift) as i64) >> shift
    }
}

/// Facts ordered by address, then register.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FactTable {
    facts: BTreeMap<(u64, Register), Fact>,
}

impl FactTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, fact: Fact) -> Option<Fact> {
        self.facts.insert((fact.address, fact.register), fact)
    }

    pub fn get(&self, address: u64, register: Register) -> Option<&Fact> {
        self.facts.get(&(address, register))
    }

    /// All facts at one address.
    pub fn at(&self, address: u64) -> impl Iterator<Item = &Fact> {
        self.facts.values().filter(move |f| f.address == address)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Fact> {
        self.facts.values()
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

impl<'a> IntoIterator for &'a FactTable {
    type Item = &'a Fact;
    type IntoIter = std::collections::btree_map::Values<'a, (u64, Register), Fact>;

    fn into_iter(self) -> Self::IntoIter {
        self.facts.values()
    }
}

struct Merged<'a> {
    function: &'a str,
    value: LatticeValue,
    exact: Vec<LatticeValue>,
}

/// Join observations per (normalized address, register) and keep the exact ones.
///
/// Aliased encodings that disagree join to Top; when they carried different
/// exact values an [`DiagnosticKind::AliasConflict`] is recorded.
pub fn extract_facts<'a, A: Arch>(
    observations: impl IntoIterator<Item = (&'a str, &'a Observation)>,
) -> (FactTable, Vec<Diagnostic>) {
    let mut merged: BTreeMap<(u64, Register), Merged<'a>> = BTreeMap::new();
    for (function, obs) in observations {
        let address = A::normalize(obs.address);
        for &(register, value) in &obs.values {
            let slot = match merged.entry((address, register)) {
                Entry::Vacant(e) => e.insert(Merged {
                    function,
                    value: LatticeValue::Bottom,
                    exact: Vec::new(),
                }),
                Entry::Occupied(e) => e.into_mut(),
            };
            slot.value = slot.value.join(value);
            if value.is_exact().is_some() && !slot.exact.contains(&value) {
                slot.exact.push(value);
            }
        }
    }

    let mut table = FactTable::new();
    let mut diagnostics = Vec::new();
    for ((address, register), slot) in merged {
        if let Some((value, bits)) = slot.value.is_exact() {
            table.insert(Fact {
                address,
                register,
                value,
                bits,
            });
        } else if slot.exact.len() > 1 {
            let values: Vec<u64> = slot
                .exact
                .iter()
                .filter_map(|v| v.is_exact())
                .map(|(v, _)| v)
                .collect();
            warn!(
                function = slot.function,
                address,
                register = %register,
                "aliased addresses disagree"
            );
            diagnostics.push(Diagnostic::new(
                slot.function,
                DiagnosticKind::AliasConflict {
                    address,
                    register,
                    values,
                },
            ));
        }
    }
    (table, diagnostics)
}
