//! Core virtual machine implementation.
//!
//! The VM executes one fighter program at a time against a register file of
//! 11 fixed-purpose registers and a set of four comparison flags. All
//! arithmetic uses wrapping semantics to prevent overflow panics.
//!
//! One VM is meant to live for a whole match. Registers are zeroed at the
//! start of every run; flags are not, so a program observes the flags left by
//! the previous run unless [`VM::reset_flags`] is called in between.

mod budget;
mod clock;
mod intent;
mod registers;

pub use budget::{DEFAULT_STEP_LIMIT, StepBudget};
pub use clock::{Clock, FixedClock, SystemClock};
pub use intent::Intent;
pub use registers::{Flags, Registers};

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::{Instruction, Register, Word};
use crate::virtual_machine::program::{LabelTable, Program};

/// Control flow after a single instruction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Flow {
    Continue,
    Halt,
}

macro_rules! exec_vm {
    // Entry point
    (
        vm = $vm:ident,
        code = $code:ident,
        labels = $labels:ident,
        instr = $instr:ident,
        { $( $variant:ident => $handler:ident $args:tt ),* $(,)? }
    ) => {{
        match $instr {
            $(
                Instruction::$variant => exec_vm!(@call $vm, $code, $labels, $handler, $args),
            )*
        }
    }};

    // Handler that needs the label table (semicolon separator)
    (@call $vm:ident, $code:ident, $labels:ident, $handler:ident,
        (labels; $( $field:ident : $kind:ident ),* $(,)? )
    ) => {{
        $( let $field = exec_vm!(@read $vm, $code, $kind)?; )*
        $vm.$handler($labels, $( $field ),*)
    }};

    // Handler without the label table
    (@call $vm:ident, $code:ident, $labels:ident, $handler:ident,
        ( $( $field:ident : $kind:ident ),* $(,)? )
    ) => {{
        $( let $field = exec_vm!(@read $vm, $code, $kind)?; )*
        $vm.$handler($( $field ),*)
    }};

    (@read $vm:ident, $code:ident, Reg) => {
        $vm.read_register($code)
    };
    (@read $vm:ident, $code:ident, Imm) => {
        $vm.read_word($code)
    };
    (@read $vm:ident, $code:ident, Label) => {
        $vm.read_word($code)
    };
}

/// Register-based virtual machine running fighter programs.
pub struct VM<C: Clock = SystemClock> {
    /// Instruction pointer into the current program's bytecode.
    ip: usize,
    registers: Registers,
    flags: Flags,
    budget: StepBudget,
    clock: C,
}

impl VM<SystemClock> {
    /// Creates a VM ticking on the wall clock.
    pub fn new(step_limit: u64) -> Self {
        Self::with_clock(SystemClock::new(), step_limit)
    }
}

impl<C: Clock> VM<C> {
    /// Creates a VM reading T0 from `clock`.
    pub fn with_clock(clock: C, step_limit: u64) -> Self {
        Self {
            ip: 0,
            registers: Registers::new(),
            flags: Flags::default(),
            budget: StepBudget::new(step_limit),
            clock,
        }
    }

    /// Runs `program` once and returns the intent it left in O0.
    ///
    /// Registers are zeroed, then C0 and E0 are seeded with the given health
    /// values. Execution ends on RET, when the instruction pointer leaves the
    /// bytecode, or on a word that does not decode as an instruction.
    ///
    /// Returns [`VMError::StepLimitExceeded`] if the program executes more
    /// instructions than the configured step limit, and
    /// [`VMError::MalformedBytecode`] for operands the assembler would have
    /// rejected.
    pub fn run(
        &mut self,
        program: &Program,
        own_health: Word,
        enemy_health: Word,
    ) -> Result<Intent, VMError> {
        self.registers.clear();
        self.registers.set(Register::C0, own_health);
        self.registers.set(Register::E0, enemy_health);
        self.budget.reset();
        self.ip = 0;

        let code = program.bytecode.as_slice();
        while let Some(instr) = code.get(self.ip).copied().and_then(Instruction::decode) {
            self.registers.set(Register::T0, self.clock.ticks());
            self.budget.charge()?;
            self.ip += 1;
            if self.exec(instr, code, &program.labels)? == Flow::Halt {
                break;
            }
        }

        Ok(Intent::from_word(self.registers.get(Register::O0)))
    }

    /// Lowers every flag before the next run.
    pub fn reset_flags(&mut self) {
        self.flags.clear();
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Instructions executed by the last run.
    pub fn steps_used(&self) -> u64 {
        self.budget.used()
    }

    pub fn step_limit(&self) -> u64 {
        self.budget.limit()
    }

    /// Reads the word at the instruction pointer and advances past it.
    #[inline(always)]
    fn read_word(&mut self, code: &[Word]) -> Result<Word, VMError> {
        let word = code.get(self.ip).copied().ok_or(VMError::MalformedBytecode {
            index: self.ip,
            reason: "operand past the end of the bytecode",
        })?;
        self.ip += 1;
        Ok(word)
    }

    #[inline(always)]
    fn read_register(&mut self, code: &[Word]) -> Result<Register, VMError> {
        let index = self.ip;
        let word = self.read_word(code)?;
        Register::from_word(word).ok_or(VMError::MalformedBytecode {
            index,
            reason: "operand is not a register",
        })
    }

    /// Executes a single instruction whose opcode word was already consumed.
    fn exec(
        &mut self,
        instr: Instruction,
        code: &[Word],
        labels: &LabelTable,
    ) -> Result<Flow, VMError> {
        exec_vm! {
            vm = self,
            code = code,
            labels = labels,
            instr = instr,
            {
                // Counters
                Inc => op_inc(reg: Reg),
                Dec => op_dec(reg: Reg),
                IncEq => op_inc_eq(reg: Reg),
                DecEq => op_dec_eq(reg: Reg),
                // Arithmetic
                Add => op_add(),
                Sub => op_sub(),
                Mul => op_mul(),
                // Data movement
                Store => op_store(rd: Reg, imm: Imm),
                Move => op_move(rd: Reg, rs: Reg),
                // Control flow
                Label => op_label(id: Label),
                Jmp => op_jmp(labels; id: Label),
                JmpEq => op_jmp_eq(labels; id: Label),
                JmpNe => op_jmp_ne(labels; id: Label),
                JmpGt => op_jmp_gt(labels; id: Label),
                JmpLt => op_jmp_lt(labels; id: Label),
                Cmp => op_cmp(),
                Ret => op_ret(),
            }
        }
    }

    fn update(&mut self, reg: Register, f: impl FnOnce(Word) -> Word) -> Result<Flow, VMError> {
        let value = f(self.registers.get(reg));
        self.registers.set(reg, value);
        Ok(Flow::Continue)
    }

    fn op_inc(&mut self, reg: Register) -> Result<Flow, VMError> {
        self.update(reg, |v| v.wrapping_add(1))
    }

    fn op_dec(&mut self, reg: Register) -> Result<Flow, VMError> {
        self.update(reg, |v| v.wrapping_sub(1))
    }

    fn op_inc_eq(&mut self, reg: Register) -> Result<Flow, VMError> {
        if self.flags.equal {
            return self.op_inc(reg);
        }
        Ok(Flow::Continue)
    }

    fn op_dec_eq(&mut self, reg: Register) -> Result<Flow, VMError> {
        if self.flags.equal {
            return self.op_dec(reg);
        }
        Ok(Flow::Continue)
    }

    /// Applies `f` to I0 and I1 and writes the result to O0.
    fn arith(&mut self, f: impl FnOnce(Word, Word) -> Word) -> Result<Flow, VMError> {
        let a = self.registers.get(Register::I0);
        let b = self.registers.get(Register::I1);
        self.registers.set(Register::O0, f(a, b));
        Ok(Flow::Continue)
    }

    fn op_add(&mut self) -> Result<Flow, VMError> {
        self.arith(Word::wrapping_add)
    }

    fn op_sub(&mut self) -> Result<Flow, VMError> {
        self.arith(Word::wrapping_sub)
    }

    fn op_mul(&mut self) -> Result<Flow, VMError> {
        self.arith(Word::wrapping_mul)
    }

    fn op_store(&mut self, rd: Register, imm: Word) -> Result<Flow, VMError> {
        self.registers.set(rd, imm);
        Ok(Flow::Continue)
    }

    fn op_move(&mut self, rd: Register, rs: Register) -> Result<Flow, VMError> {
        self.registers.set(rd, self.registers.get(rs));
        Ok(Flow::Continue)
    }

    fn op_label(&mut self, _id: Word) -> Result<Flow, VMError> {
        Ok(Flow::Continue)
    }

    /// Resumes execution one word past the LABEL operand recorded for `id`.
    fn jump_if(&mut self, labels: &LabelTable, id: Word, taken: bool) -> Result<Flow, VMError> {
        if taken {
            let target = labels.get(id).ok_or(VMError::MalformedBytecode {
                index: self.ip - 1,
                reason: "jump to an undefined label",
            })?;
            self.ip = target + 1;
        }
        Ok(Flow::Continue)
    }

    fn op_jmp(&mut self, labels: &LabelTable, id: Word) -> Result<Flow, VMError> {
        self.jump_if(labels, id, true)
    }

    fn op_jmp_eq(&mut self, labels: &LabelTable, id: Word) -> Result<Flow, VMError> {
        self.jump_if(labels, id, self.flags.equal)
    }

    fn op_jmp_ne(&mut self, labels: &LabelTable, id: Word) -> Result<Flow, VMError> {
        self.jump_if(labels, id, !self.flags.equal)
    }

    fn op_jmp_gt(&mut self, labels: &LabelTable, id: Word) -> Result<Flow, VMError> {
        self.jump_if(labels, id, self.flags.greater_than)
    }

    fn op_jmp_lt(&mut self, labels: &LabelTable, id: Word) -> Result<Flow, VMError> {
        self.jump_if(labels, id, self.flags.less_than)
    }

    fn op_cmp(&mut self) -> Result<Flow, VMError> {
        let a = self.registers.get(Register::I0);
        let b = self.registers.get(Register::I1);
        self.flags.compare(a, b);
        Ok(Flow::Continue)
    }

    fn op_ret(&mut self) -> Result<Flow, VMError> {
        Ok(Flow::Halt)
    }
}
