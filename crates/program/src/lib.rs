//! # BEAST Program & Opcode Model
//!
//! The immutable bytecode container (`Program`) and the instruction set (`OpCode`)
//! that a `VmSession` (see `beast-vm`) decodes and dispatches. Operand widths are
//! fixed at 1, 2, or 4 bytes, little-endian, two's-complement — see
//! [`OpCode::operand_layout`].

mod error;
mod opcode;
mod program;

pub use error::{ProgramError, ProgramResult};
pub use opcode::{OpCode, OperandWidth};
pub use program::Program;
