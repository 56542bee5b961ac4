use thiserror::Error;

/// Errors that can occur while loading, assembling or running a fighter program.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VMError {
    /// Source file could not be read.
    #[error("cannot read {path}: {reason}")]
    IoError { path: String, reason: String },
    /// Unexpected or missing token in the assembly source.
    #[error("line {line}:{column}: expected {expected}, found {found}")]
    Syntax {
        /// Byte offset into the source.
        offset: usize,
        /// 1-based line of `offset`.
        line: usize,
        /// 1-based column of `offset`.
        column: usize,
        expected: &'static str,
        found: String,
    },
    /// Label id does not fit in the label table.
    #[error("line {line}: label {label} out of range (0..{capacity})")]
    LabelOutOfRange {
        line: usize,
        label: i64,
        capacity: usize,
    },
    /// LABEL declared more than once with the same id.
    #[error("line {line}: duplicate label {label}")]
    DuplicateLabel { line: usize, label: i64 },
    /// Jump to a label id that is never declared.
    #[error("line {line}: undefined label {label}")]
    UndefinedLabel { line: usize, label: i64 },
    /// A single run executed more instructions than allowed.
    #[error("step limit of {limit} instructions exceeded")]
    StepLimitExceeded { limit: u64 },
    /// Bytecode the assembler would never emit: an operand cut off by the end
    /// of the stream, a word that names no register, or a jump to a label
    /// missing from the table.
    #[error("malformed bytecode at word {index}: {reason}")]
    MalformedBytecode { index: usize, reason: &'static str },
}

impl VMError {
    /// Returns the byte offset of a compile error in its source, if any.
    pub fn source_offset(&self) -> Option<usize> {
        match self {
            VMError::Syntax { offset, .. } => Some(*offset),
            _ => None,
        }
    }

    /// Returns the 1-based column of a compile error, if it has one.
    pub fn source_column(&self) -> Option<usize> {
        match self {
            VMError::Syntax { column, .. } => Some(*column),
            _ => None,
        }
    }

    /// Returns the 1-based source line of a compile error, if any.
    pub fn source_line(&self) -> Option<usize> {
        match self {
            VMError::Syntax { line, .. }
            | VMError::LabelOutOfRange { line, .. }
            | VMError::DuplicateLabel { line, .. }
            | VMError::UndefinedLabel { line, .. } => Some(*line),
            VMError::IoError { .. }
            | VMError::StepLimitExceeded { .. }
            | VMError::MalformedBytecode { .. } => None,
        }
    }
}
