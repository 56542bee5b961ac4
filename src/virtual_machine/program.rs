//! Compiled program representation.
//!
//! [`Program`] bundles the bytecode produced by the assembler with its
//! [`LabelTable`]. Both are built once and never mutated afterwards.

use crate::virtual_machine::isa::{Instruction, LABEL_CAPACITY, OperandKind, Register, Word};
use std::fmt::Write;

/// Fixed-capacity mapping from label id to bytecode index.
///
/// The recorded index is the position of the LABEL instruction's operand
/// word, not of its opcode. Jumps resume one word past that index.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LabelTable {
    slots: [Option<usize>; LABEL_CAPACITY],
}

impl LabelTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Converts a raw label operand into a slot index, if it fits.
    pub fn slot(id: Word) -> Option<usize> {
        usize::try_from(id).ok().filter(|&i| i < LABEL_CAPACITY)
    }

    /// Returns the recorded bytecode index for label `id`.
    pub fn get(&self, id: Word) -> Option<usize> {
        Self::slot(id).and_then(|i| self.slots[i])
    }

    /// Returns true if label `id` is declared.
    pub fn contains(&self, id: Word) -> bool {
        self.get(id).is_some()
    }

    /// Records label `id` at bytecode index `index`.
    ///
    /// Returns the previous index if `id` was already declared; the caller
    /// is expected to have validated `id` with [`LabelTable::slot`].
    pub(crate) fn insert(&mut self, slot: usize, index: usize) -> Option<usize> {
        self.slots[slot].replace(index)
    }

    /// Iterates over declared labels as `(id, index)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(id, index)| index.map(|index| (id, index)))
    }
}

/// Assembled fighter program.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Program {
    /// Flat opcode/operand words.
    pub bytecode: Vec<Word>,
    /// Label id to bytecode index.
    pub labels: LabelTable,
}

impl Program {
    /// Number of bytecode words.
    pub fn len(&self) -> usize {
        self.bytecode.len()
    }

    /// True when the assembler found no instruction.
    pub fn is_empty(&self) -> bool {
        self.bytecode.is_empty()
    }

    /// Renders a listing with one instruction per line, prefixed by its index.
    ///
    /// Decoding stops at the first word that is not a known opcode or whose
    /// operands are cut off.
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        let mut ip = 0usize;
        while let Some(instr) = self.bytecode.get(ip).copied().and_then(Instruction::decode) {
            let Some(operands) = self.bytecode.get(ip + 1..ip + instr.word_count()) else {
                let _ = writeln!(out, "{ip:04}: {} <truncated>", instr.mnemonic());
                break;
            };
            let rendered: Vec<String> = instr
                .operands()
                .iter()
                .zip(operands)
                .map(|(kind, &word)| match kind {
                    OperandKind::Reg => Register::from_word(word)
                        .map_or_else(|| format!("?{word}"), |r| r.name().to_string()),
                    OperandKind::Imm | OperandKind::Label => word.to_string(),
                })
                .collect();
            if rendered.is_empty() {
                let _ = writeln!(out, "{ip:04}: {}", instr.mnemonic());
            } else {
                let _ = writeln!(out, "{ip:04}: {} {}", instr.mnemonic(), rendered.join(", "));
            }
            ip += instr.word_count();
        }
        out
    }
}
