//! Per-program-point register state and the instruction transfer function.

use std::fmt;

use regval_ir::{Effect, Instruction, MAX_REGS, Register, RegisterSet};

use crate::lattice::LatticeValue;

/// Lattice values for the tracked registers at one program point.
///
/// The mapping is total over `tracked`: registers never written read as
/// Bottom. Untracked registers always read as Top.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterState {
    tracked: RegisterSet,
    values: [LatticeValue; MAX_REGS],
}

impl RegisterState {
    /// All-Bottom state over `tracked`.
    pub const fn new(tracked: RegisterSet) -> Self {
        Self {
            tracked,
            values: [LatticeValue::Bottom; MAX_REGS],
        }
    }

    pub const fn tracked(&self) -> RegisterSet {
        self.tracked
    }

    pub const fn get(&self, reg: Register) -> LatticeValue {
        if self.tracked.contains(reg) {
            self.values[reg.index()]
        } else {
            LatticeValue::Top
        }
    }

    /// Set a tracked register. Writes to untracked registers are dropped.
    pub const fn set(&mut self, reg: Register, value: LatticeValue) {
        if self.tracked.contains(reg) {
            self.values[reg.index()] = value;
        }
    }

    /// Make every register in `set` Top.
    pub fn clobber(&mut self, set: RegisterSet) {
        for reg in set.intersection(self.tracked).iter() {
            self.values[reg.index()] = LatticeValue::Top;
        }
    }

    /// Join `other` into `self`. Returns true if anything changed.
    pub fn join_from(&mut self, other: &Self) -> bool {
        let mut changed = false;
        for reg in self.tracked.iter() {
            let idx = reg.index();
            let joined = self.values[idx].join(other.get(reg));
            if joined != self.values[idx] {
                self.values[idx] = joined;
                changed = true;
            }
        }
        changed
    }

    /// Pointwise lattice order over the tracked registers.
    pub fn leq(&self, other: &Self) -> bool {
        self.tracked
            .iter()
            .all(|reg| self.values[reg.index()].leq(other.get(reg)))
    }

    /// Tracked registers whose value is not Bottom.
    pub fn iter(&self) -> impl Iterator<Item = (Register, LatticeValue)> + '_ {
        self.tracked
            .iter()
            .map(|reg| (reg, self.values[reg.index()]))
            .filter(|(_, value)| !value.is_bottom())
    }

    /// Apply one instruction.
    ///
    /// All effects read the state before the instruction, so `Copy`
    /// chains inside one instruction see the old values.
    pub fn apply(&mut self, instr: &Instruction, reg_bits: u8) {
        let writes: Vec<Write> = instr
            .effects
            .iter()
            .map(|effect| self.evaluate(effect, reg_bits))
            .collect();
        for write in writes {
            match write {
                Write::One(reg, value) => self.set(reg, value),
                Write::Many(set) => self.clobber(set),
            }
        }
    }

    /// Apply a sequence of instructions.
    pub fn apply_all<'a>(
        &mut self,
        instrs: impl IntoIterator<Item = &'a Instruction>,
        reg_bits: u8,
    ) {
        for instr in instrs {
            self.apply(instr, reg_bits);
        }
    }

    /// Exact results are always tagged with `reg_bits`; narrow writes are
    /// zero extended into the register.
    fn evaluate(&self, effect: &Effect, reg_bits: u8) -> Write {
        match *effect {
            Effect::Immediate { dst, value } => {
                Write::One(dst, LatticeValue::exact(value, reg_bits))
            }
            Effect::Copy { dst, src } => Write::One(dst, self.get(src)),
            Effect::Extend {
                dst,
                src,
                from,
                to,
                signed,
            } => Write::One(dst, self.get(src).extend(from, to, signed).widen(reg_bits)),
            Effect::Affine {
                dst,
                src,
                multiplier,
                offset,
                bits,
            } => Write::One(
                dst,
                self.get(src).affine(multiplier, offset, bits).widen(reg_bits),
            ),
            Effect::Clobber { dst } => Write::One(dst, LatticeValue::Top),
            Effect::Unmodeled { written } => Write::Many(written),
        }
    }
}

enum Write {
    One(Register, LatticeValue),
    Many(RegisterSet),
}

impl fmt::Display for RegisterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (reg, value) in self.iter() {
            if !first {
                write!(f, " ")?;
            }
            first = false;
            write!(f, "{reg}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(idx: u8) -> Register {
        Register::new(idx).unwrap()
    }

    fn tracked() -> RegisterSet {
        RegisterSet::first_n(4)
    }

    fn instr(effects: Vec<Effect>) -> Instruction {
        Instruction::new(0x100, 4, "test", effects)
    }

    #[test]
    fn test_new_state_is_bottom_and_untracked_is_top() {
        let state = RegisterState::new(tracked());
        assert_eq!(state.get(r(0)), LatticeValue::Bottom);
        assert_eq!(state.get(r(9)), LatticeValue::Top);
        assert_eq!(state.iter().count(), 0);
    }

    #[test]
    fn test_apply_immediate_copy_and_clobber() {
        let mut state = RegisterState::new(tracked());
        state.apply(&instr(vec![Effect::immediate(r(0), 0x1_0000_0005)]), 32);
        assert_eq!(state.get(r(0)), LatticeValue::exact(5, 32));

        state.apply(&instr(vec![Effect::copy(r(1), r(0))]), 32);
        assert_eq!(state.get(r(1)), LatticeValue::exact(5, 32));

        // copy from an untracked register is unknown
        state.apply(&instr(vec![Effect::copy(r(2), r(9))]), 32);
        assert!(state.get(r(2)).is_top());

        state.apply(&instr(vec![Effect::clobber(r(0))]), 32);
        assert!(state.get(r(0)).is_top());
        assert_eq!(state.get(r(1)), LatticeValue::exact(5, 32));
    }

    #[test]
    fn test_apply_reads_pre_instruction_state() {
        let mut state = RegisterState::new(tracked());
        state.set(r(0), LatticeValue::exact(1, 32));
        state.set(r(1), LatticeValue::exact(2, 32));
        // swap: both copies read the old values
        state.apply(
            &instr(vec![Effect::copy(r(0), r(1)), Effect::copy(r(1), r(0))]),
            32,
        );
        assert_eq!(state.get(r(0)), LatticeValue::exact(2, 32));
        assert_eq!(state.get(r(1)), LatticeValue::exact(1, 32));
    }

    #[test]
    fn test_unmodeled_clobbers_only_written() {
        let mut state = RegisterState::new(tracked());
        state.set(r(0), LatticeValue::exact(1, 32));
        state.set(r(1), LatticeValue::exact(2, 32));
        state.apply(&instr(vec![Effect::unmodeled(RegisterSet::EMPTY.with(r(1)))]), 32);
        assert_eq!(state.get(r(0)), LatticeValue::exact(1, 32));
        assert!(state.get(r(1)).is_top());
    }

    #[test]
    fn test_apply_extend() {
        let mut state = RegisterState::new(tracked());
        state.set(r(1), LatticeValue::exact(300, 32));
        state.set(r(3), LatticeValue::exact(0x8000, 32));
        state.apply(
            &instr(vec![
                Effect::extend(r(0), r(1), 8, 32, false),
                Effect::extend(r(2), r(3), 16, 32, true),
            ]),
            32,
        );
        assert_eq!(state.get(r(0)), LatticeValue::exact(44, 32));
        assert_eq!(state.get(r(2)), LatticeValue::exact(0xFFFF_8000, 32));
    }

    #[test]
    fn test_narrow_writes_use_register_width() {
        let mut state = RegisterState::new(tracked());
        state.apply(&instr(vec![Effect::immediate(r(3), 0xFFFF_FFFF)]), 64);
        // `mov w2, w3` and `sxtw x1, w3`
        state.apply(
            &instr(vec![
                Effect::offset(r(2), r(3), 0, 32),
                Effect::extend(r(1), r(3), 32, 64, true),
            ]),
            64,
        );
        assert_eq!(state.get(r(2)), state.get(r(3)));
        assert_eq!(state.get(r(2)), LatticeValue::exact(0xFFFF_FFFF, 64));
        assert_eq!(state.get(r(1)), LatticeValue::exact(u64::MAX, 64));
    }

    #[test]
    fn test_join_from_reports_change() {
        let mut a = RegisterState::new(tracked());
        let mut b = RegisterState::new(tracked());
        b.set(r(0), LatticeValue::exact(5, 32));
        assert!(a.join_from(&b));
        assert!(!a.join_from(&b));
        assert!(b.leq(&a) && a.leq(&b));

        b.set(r(0), LatticeValue::exact(7, 32));
        assert!(a.join_from(&b));
        assert!(a.get(r(0)).is_top());
        assert!(b.leq(&a));
        assert!(!a.leq(&b));
    }
}
