//! Register-based bytecode virtual machine for fighter programs.
//!
//! Each fighter is a small assembly program. The assembler turns its source
//! into flat bytecode once per match, and the VM runs that bytecode once per
//! round to obtain the fighter's [`vm::Intent`].
//!
//! # Architecture
//!
//! - **Registers**: 11 fixed-purpose integer registers (see [`isa::Register`])
//! - **Flags**: LessThan, GreaterThan, Equal and Error, written by `CMP`
//! - **Instruction format**: one opcode word followed by a fixed number of
//!   operand words
//! - **Labels**: up to [`isa::LABEL_CAPACITY`] jump targets per program,
//!   validated at assembly time
//! - **Step limit**: each run is bounded by a configurable instruction count
//!
//! # Modules
//!
//! - [`assembler`]: Assembly parsing, diagnostics, and bytecode generation
//! - [`errors`]: Assembly and execution error types
//! - [`isa`]: Instruction set definition, opcode and register tables
//! - [`lexer`]: Cursor scanning helpers used by the assembler
//! - [`program`]: Bytecode and label table of an assembled program
//! - [`vm`]: Core virtual machine implementation and step metering

pub mod assembler;
pub mod errors;
pub mod isa;
pub mod lexer;
pub mod program;
pub mod vm;
