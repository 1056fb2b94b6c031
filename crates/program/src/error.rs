//! Error types for the BEAST program/opcode model.

use thiserror::Error;

/// Errors raised while reading bytes out of a [`crate::Program`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProgramError {
    /// The cursor advanced past the end of the program bytes.
    #[error("read of {requested} byte(s) at offset {offset} exceeds program length {length}")]
    OutOfRange {
        offset: usize,
        requested: usize,
        length: usize,
    },

    /// The byte at the cursor does not correspond to a known opcode.
    #[error("unknown opcode {opcode:#04x} at offset {offset}")]
    UnknownOpCode { opcode: u8, offset: usize },
}

pub type ProgramResult<T> = Result<T, ProgramError>;
