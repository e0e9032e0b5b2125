//! A64 instruction semantics.

use regval_ir::{Arch, Arm64, Effect, Register, RegisterView};

use crate::model::{EffectModel, clobber_dest, imm_bits, load_effects, store_effects};
use crate::types::{DecodedInstr, Operand, ShiftKind};

const UNTRACKED_ALU: [&str; 44] = [
    "and", "ands", "eor", "eon", "bic", "bics", "orn", "mul", "madd", "msub", "mneg", "udiv",
    "sdiv", "lsr", "asr", "ror", "mvn", "adc", "adcs", "sbc", "sbcs", "ngc", "ubfx", "sbfx",
    "ubfiz", "sbfiz", "bfi", "bfxil", "extr", "clz", "cls", "rev", "rev16", "rev32", "rbit",
    "umulh", "smulh", "umaddl", "smaddl", "csel", "csinc", "csinv", "csneg", "movk",
];

const CONDITIONAL_SET: [&str; 5] = ["cset", "csetm", "cinc", "cinv", "cneg"];

const LOADS: [&str; 16] = [
    "ldr", "ldrb", "ldrh", "ldrsb", "ldrsh", "ldrsw", "ldur", "ldurb", "ldurh", "ldursw", "ldp",
    "ldpsw", "ldxr", "ldaxr", "ldar", "ldnp",
];

const STORES: [&str; 10] = [
    "str", "strb", "strh", "stur", "sturb", "sturh", "stp", "stnp", "stlr", "stlrb",
];

/// Exclusive stores write a status register as their first operand.
const EXCLUSIVE_STORES: [&str; 4] = ["stxr", "stlxr", "stxp", "stlxp"];

const NO_WRITE: [&str; 18] = [
    "cmp", "cmn", "tst", "ccmp", "ccmn", "b", "br", "ret", "cbz", "cbnz", "tbz", "tbnz", "nop",
    "dmb", "dsb", "isb", "prfm", "hint",
];

/// Semantics for 64-bit ARM.
#[derive(Clone, Copy, Debug, Default)]
pub struct Arm64Model;

/// Destination operand: a real register, or the zero register (write discarded).
enum Dest {
    Reg(RegisterView),
    Discard,
}

fn dest(instr: &DecodedInstr) -> Option<Dest> {
    match instr.operand(0)? {
        Operand::Reg(view) | Operand::WritebackReg(view) => Some(Dest::Reg(*view)),
        Operand::Zero { .. } => Some(Dest::Discard),
        _ => None,
    }
}

/// Optional trailing `lsl #n` applied to an immediate.
fn imm_shift(instr: &DecodedInstr, idx: usize) -> Option<u8> {
    match instr.operand(idx) {
        None => Some(0),
        Some(Operand::Shift {
            kind: ShiftKind::Lsl,
            amount,
        }) if *amount < 64 => Some(*amount),
        _ => None,
    }
}

fn is_sp(reg: Register) -> bool {
    reg.index() == 31
}

/// A move from `src` into `dst`, honouring 32-bit views.
fn mov_reg(dst: RegisterView, src: RegisterView) -> Effect {
    if dst.bits == 64 && src.bits == 64 {
        Effect::copy(dst.reg, src.reg)
    } else {
        Effect::offset(dst.reg, src.reg, 0, 32)
    }
}

fn lift_mov(instr: &DecodedInstr, dst: RegisterView) -> Effect {
    match (instr.operand(1), instr.operand(2)) {
        (Some(Operand::Imm(v)), None) => Effect::immediate(dst.reg, imm_bits(*v, dst.bits)),
        (Some(Operand::Zero { .. }), None) => Effect::immediate(dst.reg, 0),
        (Some(Operand::Reg(src)), None) => mov_reg(dst, *src),
        _ => Effect::clobber(dst.reg),
    }
}

fn lift_movz(instr: &DecodedInstr, dst: RegisterView, invert: bool) -> Effect {
    let (Some(imm), Some(shift)) = (instr.operand(1).and_then(Operand::as_imm), imm_shift(instr, 2))
    else {
        return Effect::clobber(dst.reg);
    };
    let value = imm.wrapping_shl(u32::from(shift));
    let value = if invert { !value } else { value };
    Effect::immediate(dst.reg, imm_bits(value, dst.bits))
}

fn lift_add_imm(instr: &DecodedInstr, dst: RegisterView, sign: i64) -> Effect {
    let (Some(Operand::Reg(src)), Some(Operand::Imm(imm))) = (instr.operand(1), instr.operand(2))
    else {
        return Effect::clobber(dst.reg);
    };
    let Some(shift) = imm_shift(instr, 3) else {
        return Effect::clobber(dst.reg);
    };
    let offset = imm.wrapping_shl(u32::from(shift)).wrapping_mul(sign);
    Effect::offset(dst.reg, src.reg, offset, dst.bits)
}

fn lift_orr(instr: &DecodedInstr, dst: RegisterView) -> Effect {
    match (instr.operand(1), instr.operand(2), instr.operand(3)) {
        (Some(Operand::Zero { .. }), Some(Operand::Imm(v)), None) => {
            Effect::immediate(dst.reg, imm_bits(*v, dst.bits))
        }
        (Some(Operand::Zero { .. }), Some(Operand::Reg(src)), None) => mov_reg(dst, *src),
        _ => Effect::clobber(dst.reg),
    }
}

fn lift_lsl(instr: &DecodedInstr, dst: RegisterView) -> Effect {
    match (instr.operand(1), instr.operand(2)) {
        (Some(Operand::Reg(src)), Some(Operand::Imm(v)))
            if (0..i64::from(dst.bits)).contains(v) =>
        {
            Effect::Affine {
                dst: dst.reg,
                src: src.reg,
                multiplier: 1i64 << *v,
                offset: 0,
                bits: dst.bits,
            }
        }
        _ => Effect::clobber(dst.reg),
    }
}

fn lift_neg(instr: &DecodedInstr, dst: RegisterView) -> Effect {
    match (instr.operand(1), instr.operand(2)) {
        (Some(Operand::Reg(src)), None) if !is_sp(src.reg) => Effect::Affine {
            dst: dst.reg,
            src: src.reg,
            multiplier: -1,
            offset: 0,
            bits: dst.bits,
        },
        _ => Effect::clobber(dst.reg),
    }
}

/// `uxtb`/`sxth`/...: extend the low `from` bits of the source to the
/// destination view.
fn lift_extend(instr: &DecodedInstr, dst: RegisterView, from: u8, signed: bool) -> Effect {
    match instr.operand(1) {
        Some(Operand::Reg(src)) if instr.operands.len() == 2 => {
            Effect::extend(dst.reg, src.reg, from, dst.bits, signed)
        }
        _ => Effect::clobber(dst.reg),
    }
}

fn lift_adr(instr: &DecodedInstr, dst: RegisterView) -> Effect {
    match instr.operand(1) {
        Some(Operand::Target(addr)) => Effect::immediate(dst.reg, *addr),
        _ => Effect::clobber(dst.reg),
    }
}

fn x0() -> Register {
    Arm64::parse_register("x0").map_or_else(|| unreachable!("arm64 has x0"), |v| v.reg)
}

impl Arm64Model {
    fn lift_write(instr: &DecodedInstr, mnemonic: &str, dst: RegisterView) -> Option<Effect> {
        Some(match mnemonic {
            "mov" => lift_mov(instr, dst),
            "movz" => lift_movz(instr, dst, false),
            "movn" => lift_movz(instr, dst, true),
            "add" | "adds" => lift_add_imm(instr, dst, 1),
            "sub" | "subs" => lift_add_imm(instr, dst, -1),
            "orr" => lift_orr(instr, dst),
            "lsl" => lift_lsl(instr, dst),
            "neg" | "negs" => lift_neg(instr, dst),
            "uxtb" => lift_extend(instr, dst, 8, false),
            "uxth" => lift_extend(instr, dst, 16, false),
            "uxtw" => lift_extend(instr, dst, 32, false),
            "sxtb" => lift_extend(instr, dst, 8, true),
            "sxth" => lift_extend(instr, dst, 16, true),
            "sxtw" => lift_extend(instr, dst, 32, true),
            "adr" | "adrp" => lift_adr(instr, dst),
            m if UNTRACKED_ALU.contains(&m) || CONDITIONAL_SET.contains(&m) => {
                Effect::clobber(dst.reg)
            }
            "mrs" => Effect::clobber(dst.reg),
            _ => return None,
        })
    }
}

impl EffectModel<Arm64> for Arm64Model {
    fn name(&self) -> &'static str {
        "arm64"
    }

    fn effects(&self, instr: &DecodedInstr) -> Option<Vec<Effect>> {
        let mnemonic = instr.mnemonic.as_str();
        if mnemonic.starts_with("b.") || NO_WRITE.contains(&mnemonic) {
            return Some(Vec::new());
        }
        if LOADS.contains(&mnemonic) {
            return Some(load_effects(instr));
        }
        if STORES.contains(&mnemonic) {
            return Some(store_effects(instr));
        }
        if EXCLUSIVE_STORES.contains(&mnemonic) {
            let mut effects = clobber_dest(instr);
            effects.extend(store_effects(instr));
            return Some(effects);
        }
        match mnemonic {
            "bl" | "blr" => return Some(vec![Effect::clobber(Arm64::link_register())]),
            "svc" => return Some(vec![Effect::clobber(x0())]),
            _ => {}
        }
        match dest(instr)? {
            Dest::Discard => {
                // still validate the mnemonic so unknown instructions stay gaps
                let scratch = RegisterView { reg: x0(), bits: 64 };
                Self::lift_write(instr, mnemonic, scratch).map(|_| Vec::new())
            }
            Dest::Reg(view) => Self::lift_write(instr, mnemonic, view).map(|e| vec![e]),
        }
    }
}
