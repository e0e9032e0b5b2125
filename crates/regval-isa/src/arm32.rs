//! A32/T32 instruction semantics.

use regval_ir::{Arch, Arm32, Effect, Register};

use crate::model::{
    EffectModel, clobber_all, clobber_dest, imm_bits, leading_registers, load_effects,
    register_operands, store_effects,
};
use crate::types::{DecodedInstr, Operand, ShiftKind};

const BITS: u8 = Arm32::REG_BITS;

const CONDITIONS: [&str; 16] = [
    "eq", "ne", "cs", "hs", "cc", "lo", "mi", "pl", "vs", "vc", "hi", "ls", "ge", "lt", "gt", "le",
];

/// Mnemonics that may carry an `s` (set flags) suffix.
const FLAG_SETTING: [&str; 22] = [
    "mov", "mvn", "add", "sub", "rsb", "rsc", "adc", "sbc", "and", "orr", "eor", "bic", "orn",
    "lsl", "lsr", "asr", "ror", "rrx", "mul", "mla", "umull", "smull",
];

/// Data processing mnemonics whose result is not modeled.
const UNTRACKED_ALU: [&str; 38] = [
    "adc", "sbc", "rsc", "and", "orr", "eor", "bic", "orn", "lsr", "asr", "ror", "rrx", "mul",
    "mla", "mls", "sdiv", "udiv", "clz", "rev", "rev16", "revsh", "rbit", "bfi", "bfc", "ubfx",
    "sbfx", "uxtab", "uxtah", "sxtab", "sxtah", "qadd", "qsub", "usat", "ssat", "sel", "mrs",
    "vmrs", "movt",
];

const LONG_MULTIPLY: [&str; 6] = ["umull", "smull", "umlal", "smlal", "umaal", "smlald"];

const LOADS: [&str; 14] = [
    "ldr", "ldrb", "ldrh", "ldrsb", "ldrsh", "ldrd", "ldrex", "ldrexb", "ldrexh", "ldrexd",
    "ldrt", "ldm", "ldmia", "ldmfd",
];

const LOAD_MULTIPLE_DB: [&str; 4] = ["ldmdb", "ldmea", "ldmib", "ldmda"];

const STORES: [&str; 13] = [
    "str", "strb", "strh", "strd", "strt", "stm", "stmia", "stmea", "stmdb", "stmfd", "stmib",
    "stmda", "vstr",
];

/// Exclusive stores write a status register as their first operand.
const EXCLUSIVE_STORES: [&str; 4] = ["strex", "strexb", "strexh", "strexd"];

const NO_WRITE: [&str; 18] = [
    "cmp", "cmn", "tst", "teq", "b", "bx", "cbz", "cbnz", "nop", "it", "ite", "itt", "itet",
    "dmb", "dsb", "isb", "pld", "bkpt",
];

/// Semantics for 32-bit ARM, covering the constant-producing instructions
/// compilers emit before calls.
#[derive(Clone, Copy, Debug, Default)]
pub struct Arm32Model;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Op {
    Mov,
    Mvn,
    Movw,
    Add,
    Sub,
    Rsb,
    Lsl,
    Adr,
    Extend { from: u8, signed: bool },
    /// `vmov` between core and FP registers writes its leading core registers.
    VmovCore,
    /// `mrc`/`mrrc` write core registers that follow the coprocessor operands.
    Coprocessor,
    Untracked,
    LongMultiply,
    Load,
    Store,
    ExclusiveStore,
    Push,
    Pop,
    Call,
    Svc,
    NoWrite,
}

fn op_for(mnemonic: &str) -> Option<Op> {
    let base = mnemonic
        .strip_suffix('s')
        .filter(|b| FLAG_SETTING.contains(b))
        .unwrap_or(mnemonic);
    Some(match base {
        "mov" | "cpy" => Op::Mov,
        "mvn" => Op::Mvn,
        "movw" => Op::Movw,
        "add" | "addw" => Op::Add,
        "sub" | "subw" => Op::Sub,
        "rsb" => Op::Rsb,
        "lsl" => Op::Lsl,
        "adr" => Op::Adr,
        "uxtb" => Op::Extend {
            from: 8,
            signed: false,
        },
        "uxth" => Op::Extend {
            from: 16,
            signed: false,
        },
        "sxtb" => Op::Extend {
            from: 8,
            signed: true,
        },
        "sxth" => Op::Extend {
            from: 16,
            signed: true,
        },
        "mrc" | "mrc2" | "mrrc" | "mrrc2" => Op::Coprocessor,
        m if m == "vmov" || m.starts_with("vmov.") => Op::VmovCore,
        "push" | "vpush" => Op::Push,
        "pop" | "vpop" => Op::Pop,
        m if m.starts_with("vcmp") => Op::NoWrite,
        "bl" | "blx" => Op::Call,
        "svc" | "swi" => Op::Svc,
        m if LONG_MULTIPLY.contains(&m) => Op::LongMultiply,
        m if UNTRACKED_ALU.contains(&m) => Op::Untracked,
        m if LOADS.contains(&m) || LOAD_MULTIPLE_DB.contains(&m) => Op::Load,
        m if STORES.contains(&m) => Op::Store,
        m if EXCLUSIVE_STORES.contains(&m) => Op::ExclusiveStore,
        m if NO_WRITE.contains(&m) => Op::NoWrite,
        _ => return None,
    })
}

/// Split a mnemonic into its operation and whether it executes conditionally.
fn classify(mnemonic: &str) -> Option<(Op, bool)> {
    if let Some(op) = op_for(mnemonic) {
        return Some((op, false));
    }
    if mnemonic.len() > 2 {
        let (head, tail) = mnemonic.split_at(mnemonic.len() - 2);
        if tail == "al" {
            return op_for(head).map(|op| (op, false));
        }
        if CONDITIONS.contains(&tail) {
            return op_for(head).map(|op| (op, true));
        }
    }
    None
}

fn reg_at(instr: &DecodedInstr, idx: usize) -> Option<Register> {
    instr.operand(idx).and_then(Operand::as_reg).map(|v| v.reg)
}

fn is_pc(reg: Register) -> bool {
    reg.index() == 15
}

/// `mov rd, <op2>` and friends.
fn lift_mov(instr: &DecodedInstr, dst: Register) -> Vec<Effect> {
    match (instr.operand(1), instr.operand(2)) {
        (Some(Operand::Imm(v)), None) => vec![Effect::immediate(dst, imm_bits(*v, BITS))],
        (Some(Operand::Reg(src)), None) if !is_pc(src.reg) => vec![Effect::copy(dst, src.reg)],
        (
            Some(Operand::Reg(src)),
            Some(Operand::Shift {
                kind: ShiftKind::Lsl,
                amount,
            }),
        ) if !is_pc(src.reg) => lift_shift_left(dst, src.reg, *amount),
        _ => vec![Effect::clobber(dst)],
    }
}

fn lift_shift_left(dst: Register, src: Register, amount: u8) -> Vec<Effect> {
    if amount >= BITS {
        return vec![Effect::immediate(dst, 0)];
    }
    vec![Effect::Affine {
        dst,
        src,
        multiplier: 1i64 << amount,
        offset: 0,
        bits: BITS,
    }]
}

/// `add`/`sub`/`rsb` with an immediate, in both the three and two operand forms.
fn lift_add_imm(instr: &DecodedInstr, dst: Register, multiplier: i64, sign: i64) -> Vec<Effect> {
    let (src, imm) = match (instr.operand(1), instr.operand(2)) {
        (Some(Operand::Reg(src)), Some(Operand::Imm(v))) => (src.reg, *v),
        (Some(Operand::Imm(v)), None) => (dst, *v),
        _ => return vec![Effect::clobber(dst)],
    };
    if is_pc(src) || instr.operands.len() > 3 {
        return vec![Effect::clobber(dst)];
    }
    vec![Effect::Affine {
        dst,
        src,
        multiplier,
        offset: imm.wrapping_mul(sign),
        bits: BITS,
    }]
}

fn lift_lsl(instr: &DecodedInstr, dst: Register) -> Vec<Effect> {
    match (instr.operand(1), instr.operand(2)) {
        (Some(Operand::Reg(src)), Some(Operand::Imm(v))) => match u8::try_from(*v) {
            Ok(amount) => lift_shift_left(dst, src.reg, amount),
            Err(_) => vec![Effect::clobber(dst)],
        },
        (Some(Operand::Imm(v)), None) => match u8::try_from(*v) {
            Ok(amount) => lift_shift_left(dst, dst, amount),
            Err(_) => vec![Effect::clobber(dst)],
        },
        _ => vec![Effect::clobber(dst)],
    }
}

fn lift_long_multiply(instr: &DecodedInstr) -> Vec<Effect> {
    [reg_at(instr, 0), reg_at(instr, 1)]
        .into_iter()
        .flatten()
        .map(Effect::clobber)
        .collect()
}

impl Arm32Model {
    fn lift_unconditional(instr: &DecodedInstr, op: Op) -> Option<Vec<Effect>> {
        let dst = instr.first_register().map(|v| v.reg);
        let effects = match op {
            Op::Mov => lift_mov(instr, dst?),
            Op::Mvn => match instr.operand(1) {
                Some(Operand::Imm(v)) => vec![Effect::immediate(dst?, imm_bits(!*v, BITS))],
                _ => vec![Effect::clobber(dst?)],
            },
            Op::Movw => match instr.operand(1) {
                Some(Operand::Imm(v)) => vec![Effect::immediate(dst?, imm_bits(*v, 16))],
                _ => vec![Effect::clobber(dst?)],
            },
            Op::Add => lift_add_imm(instr, dst?, 1, 1),
            Op::Sub => lift_add_imm(instr, dst?, 1, -1),
            Op::Rsb => match (instr.operand(1), instr.operand(2)) {
                (Some(Operand::Reg(src)), Some(Operand::Imm(v))) if !is_pc(src.reg) => {
                    vec![Effect::Affine {
                        dst: dst?,
                        src: src.reg,
                        multiplier: -1,
                        offset: *v,
                        bits: BITS,
                    }]
                }
                _ => vec![Effect::clobber(dst?)],
            },
            Op::Lsl => lift_lsl(instr, dst?),
            Op::Adr => match instr.operand(1) {
                Some(Operand::Target(addr)) => {
                    vec![Effect::immediate(dst?, addr & Arm32::value_mask())]
                }
                _ => vec![Effect::clobber(dst?)],
            },
            Op::Extend { from, signed } => match instr.operand(1) {
                Some(Operand::Reg(src)) if instr.operands.len() == 2 => {
                    vec![Effect::extend(dst?, src.reg, from, BITS, signed)]
                }
                _ => vec![Effect::clobber(dst?)],
            },
            Op::VmovCore => clobber_all(leading_registers(instr)),
            Op::Coprocessor => clobber_all(register_operands(instr)),
            Op::Untracked => clobber_dest(instr),
            Op::LongMultiply => lift_long_multiply(instr),
            Op::Load => load_effects(instr),
            Op::Store => store_effects(instr),
            Op::ExclusiveStore => {
                let mut effects = clobber_dest(instr);
                effects.extend(store_effects(instr));
                effects
            }
            Op::Push => vec![Effect::clobber(sp())],
            Op::Pop => {
                let mut effects = load_effects(instr);
                effects.push(Effect::clobber(sp()));
                effects
            }
            Op::Call => vec![Effect::clobber(Arm32::link_register())],
            Op::Svc => vec![Effect::clobber(r0())],
            Op::NoWrite => Vec::new(),
        };
        Some(effects)
    }
}

fn sp() -> Register {
    Arm32::parse_register("sp").map_or_else(|| unreachable!("arm32 has sp"), |v| v.reg)
}

fn r0() -> Register {
    Arm32::parse_register("r0").map_or_else(|| unreachable!("arm32 has r0"), |v| v.reg)
}

impl EffectModel<Arm32> for Arm32Model {
    fn name(&self) -> &'static str {
        "arm32"
    }

    fn effects(&self, instr: &DecodedInstr) -> Option<Vec<Effect>> {
        let (op, conditional) = classify(&instr.mnemonic)?;
        let effects = Self::lift_unconditional(instr, op)?;
        if !conditional {
            return Some(effects);
        }
        // A skipped conditional write leaves the old value, so nothing written is known.
        let written = effects
            .iter()
            .fold(regval_ir::RegisterSet::EMPTY, |acc, e| acc.union(e.written()));
        Some(clobber_all(written))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operand::parse_operands;

    fn r(idx: u8) -> Register {
        Register::new(idx).unwrap()
    }

    fn lift(mnemonic: &str, ops: &str) -> Option<Vec<Effect>> {
        let instr = DecodedInstr::new(0x1000, 4, mnemonic, parse_operands::<Arm32>(ops).unwrap());
        Arm32Model.effects(&instr)
    }

    #[test]
    fn test_classify_suffixes() {
        assert_eq!(classify("movs"), Some((Op::Mov, false)));
        assert_eq!(classify("moveq"), Some((Op::Mov, true)));
        assert_eq!(classify("addsne"), Some((Op::Add, true)));
        assert_eq!(classify("bls"), Some((Op::NoWrite, true)));
        assert_eq!(classify("bleq"), Some((Op::Call, true)));
        assert_eq!(classify("bal"), Some((Op::NoWrite, false)));
        assert_eq!(classify("teq"), Some((Op::NoWrite, false)));
        assert_eq!(classify("ldrbeq"), Some((Op::Load, true)));
        assert_eq!(classify("vfma"), None);
    }

    #[test]
    fn test_mov_immediate_and_copy() {
        assert_eq!(lift("mov", "r0, #7"), Some(vec![Effect::immediate(r(0), 7)]));
        assert_eq!(
            lift("mov", "r0, #-1"),
            Some(vec![Effect::immediate(r(0), 0xFFFF_FFFF)])
        );
        assert_eq!(lift("mov", "r1, r2"), Some(vec![Effect::copy(r(1), r(2))]));
        assert_eq!(lift("mov", "r1, pc"), Some(vec![Effect::clobber(r(1))]));
        assert_eq!(lift("mvn", "r3, #0"), Some(vec![Effect::immediate(r(3), 0xFFFF_FFFF)]));
        assert_eq!(lift("movw", "r3, #0x1234"), Some(vec![Effect::immediate(r(3), 0x1234)]));
        assert_eq!(lift("movt", "r3, #0x1"), Some(vec![Effect::clobber(r(3))]));
    }

    #[test]
    fn test_arithmetic_as_affine() {
        assert_eq!(
            lift("add", "r0, r1, #4"),
            Some(vec![Effect::offset(r(0), r(1), 4, 32)])
        );
        assert_eq!(
            lift("subs", "r2, #1"),
            Some(vec![Effect::offset(r(2), r(2), -1, 32)])
        );
        assert_eq!(
            lift("lsl", "r0, r1, #3"),
            Some(vec![Effect::Affine {
                dst: r(0),
                src: r(1),
                multiplier: 8,
                offset: 0,
                bits: 32
            }])
        );
        assert_eq!(lift("add", "r0, r1, r2"), Some(vec![Effect::clobber(r(0))]));
        assert_eq!(lift("add", "r0, pc, #4"), Some(vec![Effect::clobber(r(0))]));
    }

    #[test]
    fn test_extensions_carry_width_and_sign() {
        assert_eq!(
            lift("uxtb", "r0, r1"),
            Some(vec![Effect::extend(r(0), r(1), 8, 32, false)])
        );
        assert_eq!(
            lift("sxth", "r12, r12"),
            Some(vec![Effect::extend(r(12), r(12), 16, 32, true)])
        );
        assert_eq!(lift("uxtb", "r0, r1, ror #8"), Some(vec![Effect::clobber(r(0))]));
    }

    #[test]
    fn test_vmov_and_coprocessor_writes() {
        assert_eq!(
            lift("vmov", "r0, r1, d0"),
            Some(vec![Effect::clobber(r(0)), Effect::clobber(r(1))])
        );
        assert_eq!(lift("vmov", "d0, r0, r1"), Some(Vec::new()));
        assert_eq!(lift("vmov.32", "r2, d1[1]"), Some(vec![Effect::clobber(r(2))]));
        assert_eq!(lift("vmov.f32", "s0, #1.0"), Some(Vec::new()));
        assert_eq!(lift("vpush", "{d8, d9}"), Some(vec![Effect::clobber(r(13))]));
        assert_eq!(lift("vcmp.f64", "d0, #0.0"), Some(Vec::new()));
        assert_eq!(
            lift("mrrc", "p15, 0, r0, r1, c14"),
            Some(vec![Effect::clobber(r(0)), Effect::clobber(r(1))])
        );
        assert_eq!(
            lift("mrc", "p15, 0, r3, c13, c0, 3"),
            Some(vec![Effect::clobber(r(3))])
        );
    }

    #[test]
    fn test_conditional_write_clobbers() {
        assert_eq!(lift("movne", "r0, #1"), Some(vec![Effect::clobber(r(0))]));
        assert_eq!(lift("bne", "1040c"), Some(Vec::new()));
    }

    #[test]
    fn test_memory_and_calls() {
        assert_eq!(lift("ldr", "r0, [r1]"), Some(vec![Effect::clobber(r(0))]));
        assert_eq!(lift("str", "r0, [r1]"), Some(Vec::new()));
        assert_eq!(
            lift("pop", "{r4, pc}"),
            Some(vec![
                Effect::clobber(r(4)),
                Effect::clobber(r(15)),
                Effect::clobber(r(13))
            ])
        );
        assert_eq!(lift("push", "{r4, lr}"), Some(vec![Effect::clobber(r(13))]));
        assert_eq!(lift("bl", "10500 <fun>"), Some(vec![Effect::clobber(r(14))]));
        assert_eq!(
            lift("umull", "r0, r1, r2, r3"),
            Some(vec![Effect::clobber(r(0)), Effect::clobber(r(1))])
        );
        assert!(lift("vcvt", "s0, s1").is_none());
        assert_eq!(
            lift("ldrexd", "r2, r3, [r12]"),
            Some(vec![Effect::clobber(r(2)), Effect::clobber(r(3))])
        );
        assert_eq!(lift("strex", "r0, r1, [r2]"), Some(vec![Effect::clobber(r(0))]));
    }
}
