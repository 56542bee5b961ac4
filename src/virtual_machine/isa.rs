//! Instruction Set Architecture (ISA) definitions.
//!
//! Holds the two static symbol tables the assembler matches against: the
//! opcode table generated from [`for_each_instruction!`](crate::for_each_instruction)
//! and the register table ([`Register`]).
//!
//! # Bytecode Format
//!
//! A program is a flat sequence of [`Word`]s. Each instruction is one opcode
//! word followed by a fixed number of operand words:
//! - Register operand: register index (0-10)
//! - Immediate operand: the literal value
//! - Label operand: the label id (0-9)
//!
//! Opcode numbers and register indices are part of the bytecode format and
//! must not be reordered.

/// One bytecode word.
pub type Word = i64;

/// Number of slots in the label table.
pub const LABEL_CAPACITY: usize = 10;

/// Kind of operand an instruction takes, in emission order.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OperandKind {
    /// Register name, encoded as its index.
    Reg,
    /// Integer literal, encoded as-is.
    Imm,
    /// Label id, encoded as-is and checked against the label table.
    Label,
}

/// Invokes a callback macro with the complete instruction definition list.
///
/// The table order is the order the assembler tries mnemonics in.
#[macro_export]
macro_rules! for_each_instruction {
    ($callback:ident) => {
        $callback! {
            // =========================
            // Counters
            // =========================
            /// INC reg ; reg = reg + 1
            Inc = 0, "INC" => [reg: Reg],
            /// DEC reg ; reg = reg - 1
            Dec = 1, "DEC" => [reg: Reg],
            /// INCEQ reg ; if Equal then reg = reg + 1
            IncEq = 2, "INCEQ" => [reg: Reg],
            /// DECEQ reg ; if Equal then reg = reg - 1
            DecEq = 3, "DECEQ" => [reg: Reg],
            // =========================
            // Arithmetic (fixed registers)
            // =========================
            /// ADD ; O0 = I0 + I1
            Add = 4, "ADD" => [],
            /// SUB ; O0 = I0 - I1
            Sub = 5, "SUB" => [],
            /// MUL ; O0 = I0 * I1
            Mul = 6, "MUL" => [],
            // =========================
            // Data movement
            // =========================
            /// STORE rd, imm ; rd = imm
            Store = 7, "STORE" => [rd: Reg, imm: Imm],
            /// MOVE rd, rs ; rd = rs
            Move = 8, "MOVE" => [rd: Reg, rs: Reg],
            // =========================
            // Control Flow
            // =========================
            /// LABEL id ; declares jump target `id`
            Label = 9, "LABEL" => [id: Label],
            /// JMP id ; jump to label `id`
            Jmp = 10, "JMP" => [id: Label],
            /// JMPEQ id ; jump to label `id` if Equal
            JmpEq = 11, "JMPEQ" => [id: Label],
            /// JMPNE id ; jump to label `id` if not Equal
            JmpNe = 12, "JMPNE" => [id: Label],
            /// JMPGT id ; jump to label `id` if GreaterThan
            JmpGt = 13, "JMPGT" => [id: Label],
            /// JMPLT id ; jump to label `id` if LessThan
            JmpLt = 14, "JMPLT" => [id: Label],
            /// CMP ; set Equal/LessThan/GreaterThan from I0 vs I1, clear Error
            Cmp = 15, "CMP" => [],
            /// RET ; end this run
            Ret = 16, "RET" => [],
        }
    };
}

#[macro_export]
macro_rules! define_instructions {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $opcode:expr, $mnemonic:literal => [
                $( $field:ident : $kind:ident ),* $(,)?
            ]
        ),* $(,)?
    ) => {
        // =========================
        // VM instruction enum
        // =========================
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        #[repr(u8)]
        pub enum Instruction {
            $(
                $(#[$doc])*
                $name = $opcode,
            )*
        }

        impl Instruction {
            /// Every instruction in table order.
            pub const ALL: &'static [Instruction] = &[ $( Instruction::$name, )* ];

            /// Decodes an opcode word. Returns `None` for unknown opcodes.
            pub const fn decode(word: Word) -> Option<Self> {
                match word {
                    $( $opcode => Some(Instruction::$name), )*
                    _ => None,
                }
            }

            /// Returns the assembly mnemonic for this instruction.
            pub const fn mnemonic(&self) -> &'static str {
                match self {
                    $( Instruction::$name => $mnemonic, )*
                }
            }

            /// Returns the operand kinds in emission order.
            pub const fn operands(&self) -> &'static [OperandKind] {
                match self {
                    $( Instruction::$name => &[ $( OperandKind::$kind ),* ], )*
                }
            }
        }
    };
}

for_each_instruction!(define_instructions);

impl Instruction {
    /// Returns the opcode word.
    pub const fn opcode(&self) -> Word {
        *self as u8 as Word
    }

    /// Number of bytecode words taken by the opcode and its operands.
    pub const fn word_count(&self) -> usize {
        1 + self.operands().len()
    }

    /// True for LABEL's jump counterparts.
    pub const fn is_jump(&self) -> bool {
        matches!(
            self,
            Instruction::Jmp
                | Instruction::JmpEq
                | Instruction::JmpNe
                | Instruction::JmpGt
                | Instruction::JmpLt
        )
    }

    /// Matches a whole token against the opcode table by exact length and content.
    pub fn from_mnemonic(token: &[u8]) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|instr| instr.mnemonic().as_bytes() == token)
    }
}

/// Number of registers in the register file.
pub const REGISTER_COUNT: usize = 11;

/// Fixed-purpose registers.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum Register {
    /// General purpose.
    R0 = 0,
    /// General purpose.
    R1 = 1,
    /// General purpose.
    R2 = 2,
    /// Own health, seeded before each run.
    C0 = 3,
    /// Reserved.
    C1 = 4,
    /// Enemy health, seeded before each run.
    E0 = 5,
    /// Reserved.
    E1 = 6,
    /// First arithmetic/compare input.
    I0 = 7,
    /// Second arithmetic/compare input.
    I1 = 8,
    /// Arithmetic output; also read as the run's intent.
    O0 = 9,
    /// Millisecond tick, refreshed before every instruction.
    T0 = 10,
}

impl Register {
    /// Every register in table order.
    pub const ALL: [Register; REGISTER_COUNT] = [
        Register::R0,
        Register::R1,
        Register::R2,
        Register::C0,
        Register::C1,
        Register::E0,
        Register::E1,
        Register::I0,
        Register::I1,
        Register::O0,
        Register::T0,
    ];

    /// Assembly name of the register.
    pub const fn name(&self) -> &'static str {
        match self {
            Register::R0 => "R0",
            Register::R1 => "R1",
            Register::R2 => "R2",
            Register::C0 => "C0",
            Register::C1 => "C1",
            Register::E0 => "E0",
            Register::E1 => "E1",
            Register::I0 => "I0",
            Register::I1 => "I1",
            Register::O0 => "O0",
            Register::T0 => "T0",
        }
    }

    /// Index of the register in the register file.
    pub const fn index(&self) -> usize {
        *self as usize
    }

    /// Decodes a register operand word.
    pub fn from_word(word: Word) -> Option<Self> {
        usize::try_from(word)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    /// Resolves the register whose name prefixes `text`.
    ///
    /// The first table entry wins; nothing after the two-character name is checked.
    pub fn match_prefix(text: &[u8]) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|reg| text.starts_with(reg.name().as_bytes()))
    }
}
