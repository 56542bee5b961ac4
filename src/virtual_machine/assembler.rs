//! Assembly language parser and bytecode compiler.
//!
//! Converts one fighter's assembly source into a [`Program`] in a single pass.
//! Operands are read according to the [`OperandKind`] list of each instruction
//! in the [`isa`](super::isa) table.
//!
//! # Syntax
//!
//! ```text
//! STORE R0, 1
//! LABEL 0
//! MOVE O0, R0
//! RET
//! ```
//!
//! - Mnemonics and register names are uppercase and case-sensitive
//! - Integer literals accept a sign and `0x` (hex) or leading `0` (octal) prefixes
//! - Commas between operands are optional
//! - An integer operand runs to the end of its line
//! - Text after a trailing register operand is ignored up to the end of the line
//! - The first token that is not a mnemonic ends the program; the rest of
//!   the source is ignored

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::{Instruction, LABEL_CAPACITY, OperandKind, Register, Word};
use crate::virtual_machine::lexer::{
    is_whitespace, line_col, next_line_end, next_whitespace, skip_separator, skip_whitespace,
};
use crate::virtual_machine::program::{LabelTable, Program};
use crate::{error, warn};
use std::fmt::Write;
use std::fs;
use std::path::Path;

/// Formats a compiler-style diagnostic for assembly failures.
///
/// Returns `None` for errors that do not point into the source.
pub fn render_assembly_diagnostic(file: &str, source: &str, err: &VMError) -> Option<String> {
    let line = err.source_line()?;
    let column = err.source_column();

    let mut diag = String::new();
    let _ = writeln!(diag, "error: {err}");
    let _ = writeln!(diag, " --> {file}:{line}:{}", column.unwrap_or(1));

    if let Some(raw_line) = source.lines().nth(line.saturating_sub(1)) {
        let line_text = raw_line.trim_end_matches('\r');
        let _ = writeln!(diag, "  |");
        let _ = writeln!(diag, "{:>4} | {}", line, line_text);
        if let Some(column) = column {
            let underline = " ".repeat(column.saturating_sub(1));
            let _ = writeln!(diag, "  | {}^", underline);
        }
    }

    Some(diag)
}

/// Parses an integer literal with C-style base prefixes.
///
/// The whole text must be the literal: optional sign, then `0x`/`0X` for
/// hexadecimal, a leading `0` for octal, or plain decimal digits.
pub(crate) fn parse_literal(text: &str) -> Option<Word> {
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let (radix, body) = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        (16, hex)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits)
    };
    if body.is_empty() || !body.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    let magnitude = i128::from_str_radix(body, radix).ok()?;
    Word::try_from(if negative { -magnitude } else { magnitude }).ok()
}

impl OperandKind {
    /// Name used in "expected ..." diagnostics.
    const fn expected(&self) -> &'static str {
        match self {
            OperandKind::Reg => "register",
            OperandKind::Imm => "integer",
            OperandKind::Label => "label id",
        }
    }
}

/// Single-pass assembler state for one program.
struct Assembler<'a> {
    src: &'a [u8],
    /// Cursor into `src`.
    pos: usize,
    program: Program,
    /// Label id and source line of every jump, checked once the source is consumed.
    jumps: Vec<(Word, usize)>,
}

impl<'a> Assembler<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            src: source.as_bytes(),
            pos: 0,
            program: Program::default(),
            jumps: Vec::new(),
        }
    }

    fn line_of(&self, offset: usize) -> usize {
        line_col(self.src, offset).0
    }

    /// Builds a syntax error describing the token found at `offset`.
    ///
    /// An error at the end of the input is placed right after the last
    /// non-whitespace byte so it points into an existing line.
    fn syntax_error(&self, offset: usize, expected: &'static str) -> VMError {
        let at_end = offset >= self.src.len();
        let offset = if at_end {
            self.src
                .iter()
                .rposition(|&b| !is_whitespace(b))
                .map_or(0, |last| last + 1)
        } else {
            offset
        };
        let rest = &self.src[offset..];
        let token_len = rest.iter().take_while(|&&b| !is_whitespace(b)).count();
        let found = if at_end {
            "end of input".to_string()
        } else if token_len == 0 {
            "end of line".to_string()
        } else {
            format!("`{}`", String::from_utf8_lossy(&rest[..token_len]))
        };
        let (line, column) = line_col(self.src, offset);
        VMError::Syntax {
            offset,
            line,
            column,
            expected,
            found,
        }
    }

    /// Unwraps a lexer result, reporting a cursor overrun as a syntax error.
    fn cursor(&self, scanned: Option<usize>, expected: &'static str) -> Result<usize, VMError> {
        scanned.ok_or_else(|| self.syntax_error(self.src.len(), expected))
    }

    /// Skips whitespace, separators, and whitespace again between two operands.
    fn skip_operand_gap(&mut self, expected: &'static str) -> Result<(), VMError> {
        let pos = self.cursor(skip_whitespace(self.src, self.pos), expected)?;
        let pos = self.cursor(skip_separator(self.src, pos), expected)?;
        self.pos = self.cursor(skip_whitespace(self.src, pos), expected)?;
        Ok(())
    }

    fn emit(&mut self, word: Word) {
        self.program.bytecode.push(word);
    }

    fn register(&mut self) -> Result<Register, VMError> {
        let reg = Register::match_prefix(&self.src[self.pos..])
            .ok_or_else(|| self.syntax_error(self.pos, OperandKind::Reg.expected()))?;
        self.pos += reg.name().len();
        Ok(reg)
    }

    /// Reads an integer operand spanning the rest of the line.
    fn integer(&mut self, kind: OperandKind) -> Result<Word, VMError> {
        let src = self.src;
        let start = self.pos;
        let end = self.cursor(next_line_end(src, start), kind.expected())?;
        let text = String::from_utf8_lossy(&src[start..end]);
        let value =
            parse_literal(text.trim()).ok_or_else(|| self.syntax_error(start, kind.expected()))?;
        self.pos = end;
        Ok(value)
    }

    fn define_label(&mut self, id: Word, line: usize) -> Result<(), VMError> {
        let slot = LabelTable::slot(id).ok_or(VMError::LabelOutOfRange {
            line,
            label: id,
            capacity: LABEL_CAPACITY,
        })?;
        let operand_index = self.program.bytecode.len() - 1;
        match self.program.labels.insert(slot, operand_index) {
            Some(_) => Err(VMError::DuplicateLabel { line, label: id }),
            None => Ok(()),
        }
    }

    /// Emits one instruction whose mnemonic ends at `self.pos`.
    fn instruction(&mut self, instr: Instruction) -> Result<(), VMError> {
        self.emit(instr.opcode());
        let operands = instr.operands();
        let mut last_operand = None;

        for (i, kind) in operands.iter().copied().enumerate() {
            if i == 0 {
                self.pos = self.cursor(skip_whitespace(self.src, self.pos), kind.expected())?;
            } else {
                self.skip_operand_gap(kind.expected())?;
            }
            let operand_start = self.pos;
            let word = match kind {
                OperandKind::Reg => self.register()?.index() as Word,
                OperandKind::Imm | OperandKind::Label => self.integer(kind)?,
            };
            self.emit(word);
            last_operand = Some((kind, word, operand_start));
        }

        match last_operand {
            Some((OperandKind::Reg, _, _)) => {
                self.pos = self.cursor(next_line_end(self.src, self.pos), "end of line")?;
            }
            Some((OperandKind::Label, id, start)) => {
                let line = self.line_of(start);
                if instr == Instruction::Label {
                    self.define_label(id, line)?;
                } else {
                    self.jumps.push((id, line));
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn run(mut self) -> Result<Program, VMError> {
        loop {
            let start = self.cursor(skip_whitespace(self.src, self.pos), "instruction")?;
            if start == self.src.len() {
                break;
            }
            let end = self.cursor(next_whitespace(self.src, start), "instruction")?;
            let Some(instr) = Instruction::from_mnemonic(&self.src[start..end]) else {
                warn!(
                    "assembly stopped at line {}: `{}` is not an instruction",
                    self.line_of(start),
                    String::from_utf8_lossy(&self.src[start..end])
                );
                break;
            };
            self.pos = end;
            self.instruction(instr)?;
        }

        for &(id, line) in &self.jumps {
            if LabelTable::slot(id).is_none() {
                return Err(VMError::LabelOutOfRange {
                    line,
                    label: id,
                    capacity: LABEL_CAPACITY,
                });
            }
            if !self.program.labels.contains(id) {
                return Err(VMError::UndefinedLabel { line, label: id });
            }
        }

        Ok(self.program)
    }
}

/// Assembles one program's source into bytecode and its label table.
///
/// Any malformed operand, out-of-range or duplicate label, or jump to an
/// undeclared label rejects the whole program.
pub fn assemble_source(source: &str) -> Result<Program, VMError> {
    Assembler::new(source).run()
}

/// Reads a program's source text from disk.
///
/// Bytes that are not valid UTF-8 are reported as a syntax error at the first
/// offending byte.
pub fn load_source<P: AsRef<Path>>(path: P) -> Result<String, VMError> {
    let path_ref = path.as_ref();
    let bytes = fs::read(path_ref).map_err(|e| VMError::IoError {
        path: path_ref.display().to_string(),
        reason: e.to_string(),
    })?;
    String::from_utf8(bytes).map_err(|e| {
        let bytes = e.as_bytes();
        let offset = e.utf8_error().valid_up_to();
        let (line, column) = line_col(bytes, offset);
        VMError::Syntax {
            offset,
            line,
            column,
            expected: "UTF-8 text",
            found: bytes
                .get(offset)
                .map_or_else(|| "end of input".to_string(), |b| format!("byte 0x{b:02x}")),
        }
    })
}

/// Logs `err` against `file`, as a compiler-style diagnostic when it points
/// into `source`.
fn report(file: &str, source: &str, err: &VMError) {
    match render_assembly_diagnostic(file, source, err) {
        Some(diag) => error!("{diag}"),
        None if matches!(err, VMError::IoError { .. }) => error!("{err}"),
        None => error!("{file}: {err}"),
    }
}

/// Reads `path` like [`load_source`], logging the failure if there is one.
pub fn load_reported<P: AsRef<Path>>(path: P) -> Result<String, VMError> {
    let path_ref = path.as_ref();
    // An encoding error has no decoded text to quote, only its position.
    load_source(path_ref).inspect_err(|err| report(&path_ref.display().to_string(), "", err))
}

/// Assembles `source`, logging a compiler-style diagnostic against `file` on failure.
pub fn assemble_reported(file: &str, source: &str) -> Result<Program, VMError> {
    assemble_source(source).inspect_err(|err| report(file, source, err))
}

/// Convenience: load and assemble a file, logging a diagnostic on failure.
pub fn assemble_file<P: AsRef<Path>>(path: P) -> Result<Program, VMError> {
    let path_ref = path.as_ref();
    let source = load_reported(path_ref)?;
    assemble_reported(&path_ref.display().to_string(), &source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn op(instr: Instruction) -> Word {
        instr.opcode()
    }

    fn reg(reg: Register) -> Word {
        reg.index() as Word
    }

    #[test]
    fn parse_literal_bases() {
        assert_eq!(parse_literal("42"), Some(42));
        assert_eq!(parse_literal("-7"), Some(-7));
        assert_eq!(parse_literal("+3"), Some(3));
        assert_eq!(parse_literal("0"), Some(0));
        assert_eq!(parse_literal("0x1F"), Some(31));
        assert_eq!(parse_literal("0XfF"), Some(255));
        assert_eq!(parse_literal("010"), Some(8));
        assert_eq!(parse_literal("-0x10"), Some(-16));
    }

    #[test]
    fn parse_literal_rejects_garbage() {
        assert_eq!(parse_literal(""), None);
        assert_eq!(parse_literal("-"), None);
        assert_eq!(parse_literal("0x"), None);
        assert_eq!(parse_literal("08"), None);
        assert_eq!(parse_literal("7 7"), None);
        assert_eq!(parse_literal("abc"), None);
        assert_eq!(parse_literal("99999999999999999999999"), None);
    }

    #[test]
    fn assemble_empty_source() {
        let program = assemble_source("").unwrap();
        assert!(program.is_empty());
        assert!(assemble_source(" \n\t\r\n").unwrap().is_empty());
    }

    #[test]
    fn assemble_store() {
        let program = assemble_source("STORE R0, 7").unwrap();
        assert_eq!(program.bytecode, vec![op(Instruction::Store), reg(Register::R0), 7]);
    }

    #[test]
    fn assemble_store_base_prefixes() {
        let program = assemble_source("STORE R1, 0x10\nSTORE R2, 010\nSTORE I0, -5").unwrap();
        assert_eq!(
            program.bytecode,
            vec![
                op(Instruction::Store),
                reg(Register::R1),
                16,
                op(Instruction::Store),
                reg(Register::R2),
                8,
                op(Instruction::Store),
                reg(Register::I0),
                -5,
            ]
        );
    }

    #[test]
    fn assemble_store_without_comma() {
        let program = assemble_source("STORE R0 7").unwrap();
        assert_eq!(program.bytecode, vec![op(Instruction::Store), reg(Register::R0), 7]);
    }

    #[test]
    fn assemble_move_keeps_operand_order() {
        let program = assemble_source("MOVE O0, R2").unwrap();
        assert_eq!(
            program.bytecode,
            vec![op(Instruction::Move), reg(Register::O0), reg(Register::R2)]
        );
    }

    #[test]
    fn assemble_single_register_ops() {
        let program = assemble_source("INC R0\nDEC R1\nINCEQ I0\nDECEQ I1").unwrap();
        assert_eq!(
            program.bytecode,
            vec![
                op(Instruction::Inc),
                reg(Register::R0),
                op(Instruction::Dec),
                reg(Register::R1),
                op(Instruction::IncEq),
                reg(Register::I0),
                op(Instruction::DecEq),
                reg(Register::I1),
            ]
        );
    }

    #[test]
    fn assemble_opcode_only_instructions() {
        let program = assemble_source("CMP\nADD\nSUB\nMUL\nRET").unwrap();
        assert_eq!(
            program.bytecode,
            vec![
                op(Instruction::Cmp),
                op(Instruction::Add),
                op(Instruction::Sub),
                op(Instruction::Mul),
                op(Instruction::Ret),
            ]
        );
    }

    #[test]
    fn label_records_its_operand_index() {
        let program = assemble_source("STORE R0, 1\nLABEL 4\nRET").unwrap();
        // STORE takes words 0..3, LABEL opcode is word 3, its operand word 4.
        assert_eq!(program.labels.get(4), Some(4));
        assert_eq!(program.bytecode[4], 4);
    }

    #[test]
    fn jumps_accept_forward_references() {
        let program = assemble_source("JMP 1\nINC R0\nLABEL 1\nRET").unwrap();
        assert_eq!(
            program.bytecode,
            vec![
                op(Instruction::Jmp),
                1,
                op(Instruction::Inc),
                reg(Register::R0),
                op(Instruction::Label),
                1,
                op(Instruction::Ret),
            ]
        );
        assert_eq!(program.labels.get(1), Some(5));
    }

    #[test]
    fn all_jump_mnemonics_assemble() {
        let source = "LABEL 0\nJMP 0\nJMPEQ 0\nJMPNE 0\nJMPGT 0\nJMPLT 0";
        let program = assemble_source(source).unwrap();
        let opcodes: Vec<Word> = program.bytecode.iter().step_by(2).copied().collect();
        assert_eq!(
            opcodes,
            vec![
                op(Instruction::Label),
                op(Instruction::Jmp),
                op(Instruction::JmpEq),
                op(Instruction::JmpNe),
                op(Instruction::JmpGt),
                op(Instruction::JmpLt),
            ]
        );
    }

    #[test]
    fn trailing_garbage_ends_program() {
        let program = assemble_source("STORE R0, 1\nRET\nthis is not code").unwrap();
        assert_eq!(program.len(), 4);
        let program = assemble_source("hello world\nSTORE R0, 1").unwrap();
        assert!(program.is_empty());
    }

    #[test]
    fn opcode_only_instruction_does_not_skip_line() {
        // Text after ADD is read as the next mnemonic, which ends the program.
        let program = assemble_source("ADD R0\nRET").unwrap();
        assert_eq!(program.bytecode, vec![op(Instruction::Add)]);
    }

    #[test]
    fn text_after_trailing_register_is_ignored() {
        let program = assemble_source("INC R0 whatever\nRET").unwrap();
        assert_eq!(
            program.bytecode,
            vec![op(Instruction::Inc), reg(Register::R0), op(Instruction::Ret)]
        );
    }

    #[test]
    fn register_prefix_wins() {
        let program = assemble_source("INC R05").unwrap();
        assert_eq!(program.bytecode, vec![op(Instruction::Inc), reg(Register::R0)]);
    }

    #[test]
    fn operands_may_follow_a_line_break() {
        let program = assemble_source("STORE\nR0,\n  3").unwrap();
        assert_eq!(program.bytecode, vec![op(Instruction::Store), reg(Register::R0), 3]);
    }

    #[test]
    fn missing_register_is_syntax_error() {
        let err = assemble_source("INC X9").unwrap_err();
        assert_eq!(
            err,
            VMError::Syntax {
                offset: 4,
                line: 1,
                column: 5,
                expected: "register",
                found: "`X9`".to_string(),
            }
        );
    }

    #[test]
    fn register_at_end_of_input_is_syntax_error() {
        let err = assemble_source("RET\nDEC").unwrap_err();
        assert!(matches!(
            err,
            VMError::Syntax { line: 2, expected: "register", ref found, .. } if found == "end of input"
        ));
    }

    #[test]
    fn operand_missing_before_trailing_newline_points_at_last_line() {
        let source = "STORE R0,\n";
        let err = assemble_source(source).unwrap_err();
        assert_eq!(
            err,
            VMError::Syntax {
                offset: 9,
                line: 1,
                column: 10,
                expected: "integer",
                found: "end of input".to_string(),
            }
        );
        let diag = render_assembly_diagnostic("bot.asm", source, &err).unwrap();
        assert_eq!(
            diag,
            "error: line 1:10: expected integer, found end of input\n --> bot.asm:1:10\n  |\n   1 | STORE R0,\n  |          ^\n"
        );

        let err = assemble_source("RET\nINC\r\n\n  \t").unwrap_err();
        assert!(matches!(
            err,
            VMError::Syntax { offset: 7, line: 2, column: 4, expected: "register", .. }
        ));
    }

    #[test]
    fn missing_integer_is_syntax_error() {
        let err = assemble_source("STORE R0,\nRET").unwrap_err();
        assert!(matches!(
            err,
            VMError::Syntax { line: 2, expected: "integer", ref found, .. } if found == "`RET`"
        ));

        let err = assemble_source("STORE R0, seven").unwrap_err();
        assert!(matches!(
            err,
            VMError::Syntax { offset: 10, expected: "integer", .. }
        ));
    }

    #[test]
    fn label_id_must_be_integer() {
        let err = assemble_source("JMP start").unwrap_err();
        assert!(matches!(
            err,
            VMError::Syntax { expected: "label id", ref found, .. } if found == "`start`"
        ));
    }

    #[test]
    fn label_out_of_range() {
        assert_eq!(
            assemble_source("LABEL 10").unwrap_err(),
            VMError::LabelOutOfRange {
                line: 1,
                label: 10,
                capacity: LABEL_CAPACITY,
            }
        );
        assert!(matches!(
            assemble_source("RET\nJMP -1").unwrap_err(),
            VMError::LabelOutOfRange { line: 2, label: -1, .. }
        ));
    }

    #[test]
    fn duplicate_label() {
        assert_eq!(
            assemble_source("LABEL 2\nINC R0\nLABEL 2").unwrap_err(),
            VMError::DuplicateLabel { line: 3, label: 2 }
        );
    }

    #[test]
    fn undefined_label() {
        assert_eq!(
            assemble_source("LABEL 0\nJMPEQ 3").unwrap_err(),
            VMError::UndefinedLabel { line: 2, label: 3 }
        );
    }

    #[test]
    fn diagnostic_points_at_offending_token() {
        let source = "STORE R0, 1\nMOVE O0, Q1";
        let err = assemble_source(source).unwrap_err();
        let diag = render_assembly_diagnostic("bot.asm", source, &err).unwrap();
        assert_eq!(
            diag,
            "error: line 2:10: expected register, found `Q1`\n --> bot.asm:2:10\n  |\n   2 | MOVE O0, Q1\n  |          ^\n"
        );
    }

    #[test]
    fn diagnostic_for_label_error_has_no_caret() {
        let source = "LABEL 1\nLABEL 1";
        let err = assemble_source(source).unwrap_err();
        let diag = render_assembly_diagnostic("bot.asm", source, &err).unwrap();
        assert!(diag.starts_with("error: line 2: duplicate label 1\n --> bot.asm:2:1\n"));
        assert!(!diag.contains('^'));
    }

    #[test]
    fn load_missing_file() {
        let err = load_source("/definitely/not/here.asm").unwrap_err();
        assert!(matches!(err, VMError::IoError { ref path, .. } if path == "/definitely/not/here.asm"));
        assert!(matches!(assemble_file("/definitely/not/here.asm"), Err(VMError::IoError { .. })));
    }

    #[test]
    fn load_rejects_invalid_utf8_at_offending_byte() {
        let path = std::env::temp_dir().join(format!("fightvm-latin1-{}.asm", std::process::id()));
        fs::write(&path, b"STORE R0, 1\nRET ; caf\xe9\n").unwrap();
        let err = load_source(&path).unwrap_err();
        let _ = fs::remove_file(&path);
        assert_eq!(
            err,
            VMError::Syntax {
                offset: 21,
                line: 2,
                column: 10,
                expected: "UTF-8 text",
                found: "byte 0xe9".to_string(),
            }
        );
        let diag = render_assembly_diagnostic("latin1.asm", "", &err).unwrap();
        assert_eq!(
            diag,
            "error: line 2:10: expected UTF-8 text, found byte 0xe9\n --> latin1.asm:2:10\n"
        );
    }

    #[test]
    fn assemble_sample_programs() {
        for source in [
            include_str!("../../programs/berserker.asm"),
            include_str!("../../programs/turtle.asm"),
            include_str!("../../programs/gambler.asm"),
            include_str!("../../programs/tactician.asm"),
        ] {
            let program = assemble_source(source).unwrap();
            assert!(!program.is_empty());
        }
    }
}
