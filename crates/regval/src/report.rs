//! Fact rendering.

use std::fmt::Write;

use regval_cfg::FactTable;

use crate::pipeline::ArchOps;

/// Output rendering for a fact table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Tab separated `value_reg` rows: `ea reg ea NONE 0 value`.
    #[default]
    Relation,
    /// One line per address with `reg=value` annotations.
    Comments,
    /// Aligned human readable table.
    Table,
}

pub fn render(format: OutputFormat, facts: &FactTable, arch: &ArchOps) -> String {
    match format {
        OutputFormat::Relation => render_relation(facts, arch),
        OutputFormat::Comments => render_comments(facts, arch),
        OutputFormat::Table => render_table(facts, arch),
    }
}

/// Relation rows. An exact value is the affine form `NONE * 0 + value`, so
/// the source columns are fixed and the last column carries the signed value.
pub fn render_relation(facts: &FactTable, arch: &ArchOps) -> String {
    let mut out = String::new();
    for fact in facts {
        let _ = writeln!(
            out,
            "{:#x}\t{}\t{:#x}\tNONE\t0\t{}",
            fact.address,
            arch.register_name(fact.register),
            fact.address,
            fact.signed()
        );
    }
    out
}

pub fn render_comments(facts: &FactTable, arch: &ArchOps) -> String {
    let mut out = String::new();
    let mut current = None;
    for fact in facts {
        if current != Some(fact.address) {
            if current.is_some() {
                out.push('\n');
            }
            let _ = write!(out, "{:#x}:", fact.address);
            current = Some(fact.address);
        }
        let _ = write!(out, " {}={:#x}", arch.register_name(fact.register), fact.value);
    }
    if current.is_some() {
        out.push('\n');
    }
    out
}

pub fn render_table(facts: &FactTable, arch: &ArchOps) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<18} {:<6} {:<18} {:>20}", "address", "reg", "value", "signed");
    for fact in facts {
        let _ = writeln!(
            out,
            "{:<18} {:<6} {:<18} {:>20}",
            format!("{:#x}", fact.address),
            arch.register_name(fact.register),
            format!("{:#x}", fact.value),
            fact.signed()
        );
    }
    out
}
