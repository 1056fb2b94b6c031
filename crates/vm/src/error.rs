//! Error types for the BEAST VM crate.
//!
//! Every `VmFault` variant is also a termination reason: a fault inside
//! `VmSession` always terminates the session with a non-zero return code rather than
//! unwinding out of the call — `VmSession` catches faults internally (see
//! `VmSession::fault`) and callers mostly observe them through
//! `VmSession::return_code`/`was_terminated`. The `Result<_, VmFault>` surface still
//! exists so direct API callers (fuzzers, the instruction dispatcher, tests) can
//! distinguish *why* a call failed before the session absorbs it.

use thiserror::Error;

/// VM execution errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VmFault {
    /// Read/write of an index that was never registered (or was unregistered).
    #[error("unregistered variable {0}")]
    UnregisteredVariable(i32),

    /// `follow_links` resolution revisited an index already on the chain.
    #[error("link cycle detected starting at variable {0}")]
    LinkCycle(i32),

    /// A link variable did not resolve to a registered `Int32` variable.
    #[error("link chain starting at variable {0} did not resolve to an Int32 variable")]
    BrokenLinkChain(i32),

    /// String table write rejected by capacity or per-entry length limits.
    #[error("string table index {index} out of range (capacity {capacity})")]
    StringTableIndexOutOfRange { index: i32, capacity: usize },

    /// String content longer than `max_string_size`.
    #[error("string of length {length} exceeds max_string_size {max}")]
    StringTooLong { length: usize, max: usize },

    /// No string table entry stored at the requested index yet.
    #[error("string table index {0} has no entry")]
    StringTableEntryMissing(i32),

    /// Jump target landed outside `[0, program_len]`.
    #[error("jump target {0} is outside the program")]
    InvalidJumpTarget(i32),

    /// Division/modulo by zero.
    #[error("modulo by zero")]
    ModuloByZero,

    /// Stack (hosted in a variable) underflowed on pop.
    #[error("stack hosted at variable {0} is empty")]
    StackUnderflow(i32),

    /// Stack (hosted in a variable) exceeded its hosted range on push.
    #[error("stack hosted at variable {0} overflowed its hosted range")]
    StackOverflow(i32),

    /// The cursor read past the end of the program.
    #[error("read past end of program: {0}")]
    OutOfRange(#[from] beast_program::ProgramError),

    /// A mutating operation was attempted after `terminate`.
    #[error("session already terminated with return code {0}")]
    AlreadyTerminated(i8),

    /// An immediate operand held a value outside the domain the opcode expects
    /// (e.g. a `VariableType`/`VariableIoBehavior` discriminant byte).
    #[error("operand value {0} is not valid in this position")]
    InvalidOperand(i32),

    /// The opcode byte at the cursor does not correspond to a known `OpCode`.
    #[error("unknown opcode at offset {0}")]
    UnknownOpCode(usize),

    /// `performSystemCall` was given a (major, minor) pair the host does not
    /// implement. Unlike every other fault, this does not terminate the session —
    /// it is reported back through the destination variable instead.
    #[error("unhandled system call ({major}, {minor})")]
    UnhandledSystemCall { major: i8, minor: i8 },
}

pub type VmResult<T> = Result<T, VmFault>;
