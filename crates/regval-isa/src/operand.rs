//! Textual operand parsing (GNU/objdump ARM syntax).

use regval_ir::{Arch, RegisterSet};
use thiserror::Error;

use crate::types::{MemOperand, Operand, ShiftKind};

/// Operand text could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperandError {
    #[error("empty operand")]
    Empty,
    #[error("unbalanced brackets in `{0}`")]
    Unbalanced(String),
}

/// Parse a comma separated operand list.
///
/// Operands outside the core register model (FP/SIMD register lists,
/// floating point immediates) come back as [`Operand::Other`]; only
/// structurally broken text is an error.
pub fn parse_operands<A: Arch>(text: &str) -> Result<Vec<Operand>, OperandError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }
    split_top_level(text)?
        .into_iter()
        .map(|piece| parse_operand::<A>(piece.trim()))
        .collect()
}

fn split_top_level(text: &str) -> Result<Vec<&str>, OperandError> {
    let mut pieces = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (idx, ch) in text.char_indices() {
        match ch {
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth -= 1;
                if depth < 0 {
                    return Err(OperandError::Unbalanced(text.to_string()));
                }
            }
            ',' if depth == 0 => {
                pieces.push(&text[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(OperandError::Unbalanced(text.to_string()));
    }
    pieces.push(&text[start..]);
    Ok(pieces)
}

fn parse_operand<A: Arch>(piece: &str) -> Result<Operand, OperandError> {
    // objdump appends symbolic names: `10500 <fun>`
    let piece = piece.split('<').next().unwrap_or(piece).trim();
    if piece.is_empty() {
        return Err(OperandError::Empty);
    }

    if piece.starts_with('[') {
        return parse_mem::<A>(piece);
    }
    if piece.starts_with('{') {
        let close = piece
            .rfind('}')
            .ok_or_else(|| OperandError::Unbalanced(piece.to_string()))?;
        return Ok(parse_reg_list::<A>(&piece[1..close])
            .map_or_else(|| Operand::Other(piece.to_string()), Operand::RegList));
    }
    if let Some(rest) = piece.strip_prefix('#') {
        // `#0.0`, `#:lo12:sym` and friends stay opaque
        return Ok(parse_imm(rest)
            .map_or_else(|| Operand::Other(piece.to_string()), Operand::Imm));
    }

    let lower = piece.to_ascii_lowercase();
    let mut words = lower.split_whitespace();
    if let Some(kind) = words.next().and_then(ShiftKind::parse) {
        let amount = match words.next() {
            Some(word) => {
                let digits = word.strip_prefix('#').unwrap_or(word);
                parse_imm(digits).and_then(|v| u8::try_from(v).ok())
            }
            None => Some(0),
        };
        return Ok(amount.map_or_else(
            || Operand::Other(piece.to_string()),
            |amount| Operand::Shift { kind, amount },
        ));
    }

    if let Some(name) = lower.strip_suffix('!') {
        if let Some(view) = A::parse_register(name) {
            return Ok(Operand::WritebackReg(view));
        }
    }
    if let Some(view) = A::parse_register(&lower) {
        return Ok(Operand::Reg(view));
    }
    if A::is_zero_register(&lower) {
        let bits = if lower.starts_with('w') { 32 } else { 64 };
        return Ok(Operand::Zero { bits });
    }
    if let Some(addr) = parse_address(&lower) {
        return Ok(Operand::Target(addr));
    }
    Ok(Operand::Other(piece.to_string()))
}

fn parse_mem<A: Arch>(piece: &str) -> Result<Operand, OperandError> {
    let close = piece
        .rfind(']')
        .ok_or_else(|| OperandError::Unbalanced(piece.to_string()))?;
    let inner = &piece[1..close];
    let writeback = piece[close + 1..].trim() == "!";
    let base = inner
        .split(',')
        .next()
        .and_then(|b| A::parse_register(b.trim()));
    Ok(Operand::Mem(MemOperand { base, writeback }))
}

/// Core registers named by the inside of a `{...}` list, or `None` if any
/// item is not a core register.
fn parse_reg_list<A: Arch>(inner: &str) -> Option<RegisterSet> {
    let mut set = RegisterSet::EMPTY;
    for item in inner.split(',') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        if let Some((lo, hi)) = item.split_once('-') {
            let lo = A::parse_register(lo.trim())?.reg;
            let hi = A::parse_register(hi.trim())?.reg;
            if lo > hi {
                return None;
            }
            let span = RegisterSet::first_n(hi.index() + 1).bits()
                & !RegisterSet::first_n(lo.index()).bits();
            set = set.union(RegisterSet::from_bits(span));
        } else {
            set.insert(A::parse_register(item)?.reg);
        }
    }
    Some(set)
}

/// Parse a signed decimal or `0x` hex immediate.
pub(crate) fn parse_imm(text: &str) -> Option<i64> {
    let text = text.trim();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let magnitude = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        // full 64-bit patterns are allowed and reinterpreted
        u64::from_str_radix(hex, 16).ok()? as i64
    } else {
        digits.parse::<i64>().ok()?
    };
    Some(if negative {
        magnitude.wrapping_neg()
    } else {
        magnitude
    })
}

/// Branch targets are written in hex, with or without `0x`.
fn parse_address(text: &str) -> Option<u64> {
    let hex = text.strip_prefix("0x").unwrap_or(text);
    if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u64::from_str_radix(hex, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use regval_ir::{Arm32, Arm64, Register};

    fn r(idx: u8) -> Register {
        Register::new(idx).unwrap()
    }

    #[test]
    fn test_parse_register_and_immediate() {
        let ops = parse_operands::<Arm32>("r0, #5").unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].as_reg().map(|v| v.reg), Some(r(0)));
        assert_eq!(ops[1], Operand::Imm(5));

        let ops = parse_operands::<Arm32>("r1, #-0x10").unwrap();
        assert_eq!(ops[1], Operand::Imm(-16));
    }

    #[test]
    fn test_parse_memory_operands() {
        let ops = parse_operands::<Arm32>("r0, [sp, #4]!").unwrap();
        match &ops[1] {
            Operand::Mem(mem) => {
                assert!(mem.writeback);
                assert_eq!(mem.base.map(|v| v.reg), Some(r(13)));
            }
            other => panic!("expected memory operand, got {other:?}"),
        }

        let ops = parse_operands::<Arm32>("r2, [r3], #8").unwrap();
        assert_eq!(ops.len(), 3);
        assert_eq!(ops[2], Operand::Imm(8));
    }

    #[test]
    fn test_parse_register_list_with_range() {
        let ops = parse_operands::<Arm32>("{r4-r6, lr}").unwrap();
        let Operand::RegList(set) = ops[0] else {
            panic!("expected register list");
        };
        let regs: Vec<usize> = set.iter().map(Register::index).collect();
        assert_eq!(regs, vec![4, 5, 6, 14]);
    }

    #[test]
    fn test_parse_fp_simd_operands_stay_opaque() {
        let other = |text: &str| Operand::Other(text.to_string());
        for list in ["{d8, d9}", "{r4, q9}", "{r6-r4}"] {
            assert_eq!(parse_operands::<Arm32>(list).unwrap(), vec![other(list)]);
        }

        let ops = parse_operands::<Arm32>("d0, #0.0").unwrap();
        assert_eq!(ops[1], other("#0.0"));
        let ops = parse_operands::<Arm32>("s0, #1.0").unwrap();
        assert_eq!(ops, vec![other("s0"), other("#1.0")]);

        let ops = parse_operands::<Arm64>("{v0.16b}, [x1]").unwrap();
        assert_eq!(ops[0], other("{v0.16b}"));
        assert!(matches!(ops[1], Operand::Mem(_)));
    }

    #[test]
    fn test_parse_shift_and_target() {
        let ops = parse_operands::<Arm32>("r0, r1, lsl #2").unwrap();
        assert_eq!(
            ops[2],
            Operand::Shift {
                kind: ShiftKind::Lsl,
                amount: 2
            }
        );
        let ops = parse_operands::<Arm32>("10500 <fun>").unwrap();
        assert_eq!(ops[0], Operand::Target(0x10500));
    }

    #[test]
    fn test_parse_arm64_views() {
        let ops = parse_operands::<Arm64>("w0, wzr").unwrap();
        assert_eq!(ops[0].as_reg().map(|v| v.bits), Some(32));
        assert_eq!(ops[1], Operand::Zero { bits: 32 });
        let ops = parse_operands::<Arm64>("x0, x1, #:lo12:sym").unwrap();
        assert!(matches!(ops[2], Operand::Other(_)));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_operands::<Arm32>("").unwrap(), Vec::new());
        assert!(matches!(
            parse_operands::<Arm32>("r0, [r1"),
            Err(OperandError::Unbalanced(_))
        ));
        assert!(matches!(
            parse_operands::<Arm32>("{r4, r5"),
            Err(OperandError::Unbalanced(_))
        ));
        assert_eq!(parse_operands::<Arm32>("r0,"), Err(OperandError::Empty));

        let ops = parse_operands::<Arm32>("r0, #zz, lsl #x").unwrap();
        assert_eq!(ops[1], Operand::Other("#zz".to_string()));
        assert_eq!(ops[2], Operand::Other("lsl #x".to_string()));
    }
}
