//! Textual CFG listing reader.
//!
//! The listing stands in for a disassembler front end:
//!
//! ```text
//! # comment
//! arch arm32
//! function main r0=5
//! block entry entry
//!   10400 4 mov r0, #1
//!   10404 4 bl 10500 <fun>
//! block ret
//!   10408 4 pop {r4, pc}
//! edge entry ret fallthrough
//! edge entry fun call
//! ```
//!
//! Directives start in column zero; instruction lines are indented and
//! belong to the most recent `block`. Block labels are global so edges may
//! cross functions. Edges naming undefined labels are kept as dangling
//! references and rejected by the analysis for the functions they touch.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::OnceLock;

use regex::Regex;
use regval_ir::{
    Arch, ArchKind, BasicBlock, BlockId, Edge, EdgeKind, Function, Program, Register,
    UnknownArch, UnknownEdgeKind,
};
use regval_isa::{CompositeModel, DecodedInstr, ModeledArch, OperandError, parse_operands};
use thiserror::Error;
use tracing::{debug, warn};

static ARCH_PATTERN: OnceLock<Regex> = OnceLock::new();
static FUNCTION_PATTERN: OnceLock<Regex> = OnceLock::new();
static BLOCK_PATTERN: OnceLock<Regex> = OnceLock::new();
static EDGE_PATTERN: OnceLock<Regex> = OnceLock::new();
static INSTR_PATTERN: OnceLock<Regex> = OnceLock::new();

fn pattern(cell: &'static OnceLock<Regex>, source: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(source).expect("listing patterns are valid"))
}

/// What went wrong on a listing line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ListingErrorKind {
    #[error("unrecognized line `{0}`")]
    Unrecognized(String),
    #[error("listing does not start with an `arch` directive")]
    MissingArch,
    #[error(transparent)]
    Arch(#[from] UnknownArch),
    #[error("listing is for {found}, expected {expected}")]
    ArchMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("`block` before any `function`")]
    BlockOutsideFunction,
    #[error("instruction before any `block`")]
    InstructionOutsideBlock,
    #[error("block `{0}` defined twice")]
    DuplicateBlock(String),
    #[error("function `{0}` has no blocks")]
    EmptyFunction(String),
    #[error("function `{0}` has two entry blocks")]
    DuplicateEntry(String),
    #[error("unknown register `{0}`")]
    UnknownRegister(String),
    #[error("bad value `{0}`")]
    BadValue(String),
    #[error(transparent)]
    Edge(#[from] UnknownEdgeKind),
    #[error("bad operands: {0}")]
    Operand(#[from] OperandError),
}

/// Listing parse error with its 1-based line number.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {kind}")]
pub struct ListingError {
    pub line: usize,
    pub kind: ListingErrorKind,
}

impl ListingError {
    const fn new(line: usize, kind: ListingErrorKind) -> Self {
        Self { line, kind }
    }
}

type Result<T> = std::result::Result<T, ListingError>;

fn meaningful_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines().enumerate().filter_map(|(idx, line)| {
        let trimmed = line.trim();
        (!trimmed.is_empty() && !trimmed.starts_with('#')).then_some((idx + 1, line))
    })
}

/// Architecture named by the listing's leading `arch` directive.
pub fn detect_arch(text: &str) -> Result<ArchKind> {
    let arch_re = pattern(&ARCH_PATTERN, r"^arch\s+(\S+)\s*$");
    let Some((line, first)) = meaningful_lines(text).next() else {
        return Err(ListingError::new(1, ListingErrorKind::MissingArch));
    };
    let caps = arch_re
        .captures(first)
        .ok_or_else(|| ListingError::new(line, ListingErrorKind::MissingArch))?;
    caps[1]
        .parse()
        .map_err(|e: UnknownArch| ListingError::new(line, e.into()))
}

/// Parse a listing with the architecture's standard semantics.
pub fn parse_listing<A: ModeledArch>(text: &str) -> Result<Program<A>> {
    parse_listing_with(text, &A::standard_model())
}

/// Parse a listing, lifting instructions through `model`.
pub fn parse_listing_with<A: Arch>(text: &str, model: &CompositeModel<A>) -> Result<Program<A>> {
    let mut parser = Parser::<A>::new(model);
    for (line, content) in meaningful_lines(text) {
        parser.line(line, content)?;
    }
    parser.finish()
}

struct PendingFunction {
    line: usize,
    name: String,
    entry: Option<BlockId>,
    blocks: Vec<BlockId>,
    values: Vec<(Register, u64)>,
}

impl PendingFunction {
    fn into_function(self) -> Result<Function> {
        let Some(&first) = self.blocks.first() else {
            return Err(ListingError::new(
                self.line,
                ListingErrorKind::EmptyFunction(self.name),
            ));
        };
        let entry = self.entry.unwrap_or(first);
        let mut function = Function::new(&self.name, entry).with_blocks(self.blocks);
        for (reg, value) in self.values {
            function = function.with_entry_value(reg, value);
        }
        Ok(function)
    }
}

struct PendingEdge {
    from: String,
    to: String,
    kind: EdgeKind,
}

struct Parser<'m, A: Arch> {
    model: &'m CompositeModel<A>,
    program: Program<A>,
    labels: HashMap<String, BlockId>,
    function: Option<PendingFunction>,
    block: Option<BlockId>,
    edges: Vec<PendingEdge>,
}

impl<'m, A: Arch> Parser<'m, A> {
    fn new(model: &'m CompositeModel<A>) -> Self {
        Self {
            model,
            program: Program::new(),
            labels: HashMap::new(),
            function: None,
            block: None,
            edges: Vec::new(),
        }
    }

    fn line(&mut self, line: usize, content: &str) -> Result<()> {
        let err = |kind| ListingError::new(line, kind);
        if content.starts_with(char::is_whitespace) {
            return self.instruction(content).map_err(err);
        }
        let content = content.trim_end();

        if let Some(caps) = pattern(&ARCH_PATTERN, r"^arch\s+(\S+)\s*$").captures(content) {
            let kind: ArchKind = caps[1].parse().map_err(|e: UnknownArch| err(e.into()))?;
            if kind.name() != A::NAME {
                return Err(err(ListingErrorKind::ArchMismatch {
                    expected: A::NAME,
                    found: kind.name(),
                }));
            }
            return Ok(());
        }
        if let Some(caps) =
            pattern(&FUNCTION_PATTERN, r"^function\s+(\S+)((?:\s+\S+=\S+)*)$").captures(content)
        {
            let values = parse_assignments::<A>(&caps[2]).map_err(err)?;
            self.start_function(line, &caps[1], values)?;
            return Ok(());
        }
        if let Some(caps) =
            pattern(&BLOCK_PATTERN, r"^block\s+(\S+)(?:\s+(entry))?$").captures(content)
        {
            return self
                .start_block(&caps[1], caps.get(2).is_some())
                .map_err(err);
        }
        if let Some(caps) =
            pattern(&EDGE_PATTERN, r"^edge\s+(\S+)\s+(\S+)\s+(\S+)$").captures(content)
        {
            let kind: EdgeKind = caps[3].parse().map_err(|e: UnknownEdgeKind| err(e.into()))?;
            self.edges.push(PendingEdge {
                from: caps[1].to_string(),
                to: caps[2].to_string(),
                kind,
            });
            return Ok(());
        }
        Err(err(ListingErrorKind::Unrecognized(content.to_string())))
    }

    fn start_function(
        &mut self,
        line: usize,
        name: &str,
        values: Vec<(Register, u64)>,
    ) -> Result<()> {
        self.finish_function()?;
        self.block = None;
        self.function = Some(PendingFunction {
            line,
            name: name.to_string(),
            entry: None,
            blocks: Vec::new(),
            values,
        });
        Ok(())
    }

    fn finish_function(&mut self) -> Result<()> {
        if let Some(pending) = self.function.take() {
            self.program.add_function(pending.into_function()?);
        }
        Ok(())
    }

    fn start_block(
        &mut self,
        label: &str,
        is_entry: bool,
    ) -> std::result::Result<(), ListingErrorKind> {
        let Some(function) = self.function.as_mut() else {
            return Err(ListingErrorKind::BlockOutsideFunction);
        };
        let id = match self.labels.entry(label.to_string()) {
            Entry::Occupied(_) => return Err(ListingErrorKind::DuplicateBlock(label.to_string())),
            Entry::Vacant(slot) => *slot.insert(self.program.add_block(BasicBlock::new(0))),
        };
        if is_entry {
            if function.entry.is_some() {
                return Err(ListingErrorKind::DuplicateEntry(function.name.clone()));
            }
            function.entry = Some(id);
        }
        function.blocks.push(id);
        self.block = Some(id);
        Ok(())
    }

    fn instruction(&mut self, content: &str) -> std::result::Result<(), ListingErrorKind> {
        let instr_re = pattern(
            &INSTR_PATTERN,
            r"^\s+(?:0x)?([0-9a-fA-F]+):?\s+(?:(\d{1,2})\s+)?([A-Za-z][\w.]*)(?:\s+(.*?))?\s*$",
        );
        let caps = instr_re
            .captures(content)
            .ok_or_else(|| ListingErrorKind::Unrecognized(content.trim().to_string()))?;
        let block_id = self.block.ok_or(ListingErrorKind::InstructionOutsideBlock)?;

        let address = u64::from_str_radix(&caps[1], 16)
            .map_err(|_| ListingErrorKind::BadValue(caps[1].to_string()))?;
        let size = match caps.get(2) {
            Some(m) => m
                .as_str()
                .parse()
                .map_err(|_| ListingErrorKind::BadValue(m.as_str().to_string()))?,
            None => 4,
        };
        // trailing objdump annotations: `; 0x1234` and `@ comment`
        let operands = caps
            .get(4)
            .map_or("", |m| m.as_str())
            .split([';', '@'])
            .next()
            .unwrap_or("");
        let decoded = DecodedInstr::new(address, size, &caps[3], parse_operands::<A>(operands)?);
        let lifted = self.model.lift(&decoded);

        let Some(block) = self.program.blocks.get_mut(block_id.index()) else {
            return Err(ListingErrorKind::InstructionOutsideBlock);
        };
        if block.is_empty() {
            block.address = address;
        }
        block.push(lifted);
        Ok(())
    }

    fn finish(mut self) -> Result<Program<A>> {
        self.finish_function()?;
        let mut dangling: HashMap<String, BlockId> = HashMap::new();
        let mut next = self.program.blocks.len();
        for edge in std::mem::take(&mut self.edges) {
            let mut resolve = |label: &str| {
                if let Some(&id) = self.labels.get(label) {
                    return id;
                }
                *dangling.entry(label.to_string()).or_insert_with(|| {
                    warn!(label, "edge references undefined block");
                    let id = BlockId(u32::try_from(next).unwrap_or(u32::MAX));
                    next += 1;
                    id
                })
            };
            let from = resolve(&edge.from);
            let to = resolve(&edge.to);
            self.program.add_edge(Edge::new(from, to, edge.kind));
        }
        debug!(
            blocks = self.program.blocks.len(),
            edges = self.program.edges.len(),
            functions = self.program.functions.len(),
            instructions = self.program.instruction_count(),
            "listing parsed"
        );
        Ok(self.program)
    }
}

/// `r0=5 r1=-1 r2=0x10` pairs after a function name.
fn parse_assignments<A: Arch>(
    text: &str,
) -> std::result::Result<Vec<(Register, u64)>, ListingErrorKind> {
    text.split_whitespace()
        .map(|pair| {
            let (name, value) = pair
                .split_once('=')
                .ok_or_else(|| ListingErrorKind::BadValue(pair.to_string()))?;
            let reg = A::parse_register(name)
                .ok_or_else(|| ListingErrorKind::UnknownRegister(name.to_string()))?
                .reg;
            let value = parse_value(value)
                .ok_or_else(|| ListingErrorKind::BadValue(value.to_string()))?;
            Ok((reg, value & A::value_mask()))
        })
        .collect()
}

/// Signed decimal or `0x` hex, returned as a raw 64-bit pattern.
pub(crate) fn parse_value(text: &str) -> Option<u64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let magnitude = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<u64>().ok()?,
    };
    Some(if negative {
        magnitude.wrapping_neg()
    } else {
        magnitude
    })
}
