use crate::virtual_machine::isa::{REGISTER_COUNT, Register, Word};
use std::fmt;

/// Register file holding VM storage.
///
/// Provides the 11 fixed-purpose registers, each storing one [`Word`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Registers {
    regs: [Word; REGISTER_COUNT],
}

impl Registers {
    /// Creates a zeroed register file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value in `reg`.
    #[inline(always)]
    pub fn get(&self, reg: Register) -> Word {
        self.regs[reg.index()]
    }

    /// Stores `value` into `reg`.
    #[inline(always)]
    pub fn set(&mut self, reg: Register, value: Word) {
        self.regs[reg.index()] = value;
    }

    /// Zeroes every register.
    pub fn clear(&mut self) {
        self.regs = [0; REGISTER_COUNT];
    }

    /// Iterates over `(register, value)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (Register, Word)> + '_ {
        Register::ALL.into_iter().zip(self.regs)
    }
}

/// Comparison flags written by CMP.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Flags {
    pub less_than: bool,
    pub greater_than: bool,
    pub equal: bool,
    /// Never set by the current instruction set; CMP clears it.
    pub error: bool,
}

impl Flags {
    /// Records the outcome of comparing `a` against `b` and clears `error`.
    pub fn compare(&mut self, a: Word, b: Word) {
        let ordering = a.cmp(&b);
        self.less_than = ordering.is_lt();
        self.greater_than = ordering.is_gt();
        self.equal = ordering.is_eq();
        self.error = false;
    }

    /// Lowers every flag.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bit = |b: bool| if b { '1' } else { '0' };
        write!(
            f,
            "LT={} GT={} EQ={} ERR={}",
            bit(self.less_than),
            bit(self.greater_than),
            bit(self.equal),
            bit(self.error)
        )
    }
}
