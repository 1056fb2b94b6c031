//! `VmSession`: a stateful execution context over one [`Program`].
//!
//! Exposes every bytecode operation as a discrete method (`session/*.rs`) so that
//! higher layers — the fetch-decode-execute loop in `dispatch.rs`, fuzzers,
//! evaluators — can all drive the same state machine uniformly.

mod arithmetic;
mod bitwise;
mod control_flow;
mod dispatch;
mod introspection;
mod stack_ops;
mod string_ops;
mod variables;

use beast_program::Program;

use crate::error::{VmFault, VmResult};
use crate::random::SessionRng;
use crate::stack::StackTable;
use crate::string_table::StringTable;
use crate::variable::VariableTable;

pub use dispatch::{StepOutcome, DEFAULT_MAX_STEPS, STEP_BUDGET_EXCEEDED_CODE};

/// Fresh -> Running on the first cursor read or mutation; Terminated is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Fresh,
    Running,
    Terminated,
}

pub struct VmSession {
    pub(crate) program: Program,
    pub(crate) pointer: usize,
    pub(crate) variable_count: usize,
    pub(crate) variables: VariableTable,
    pub(crate) strings: StringTable,
    pub(crate) stacks: StackTable,
    pub(crate) print_buffer: String,
    pub(crate) state: SessionState,
    pub(crate) return_code: i8,
    pub(crate) rng: SessionRng,
    pub(crate) dyn_noop_count: u64,
    pub(crate) executed_offsets: std::collections::HashSet<usize>,
}

impl VmSession {
    /// Creates a session with a caller-supplied PRNG seed.
    pub fn with_seed(
        program: Program,
        variable_count: usize,
        string_table_count: usize,
        max_string_size: usize,
        seed: u64,
    ) -> Self {
        Self {
            program,
            pointer: 0,
            variable_count,
            variables: VariableTable::new(),
            strings: StringTable::new(string_table_count, max_string_size),
            stacks: StackTable::new(variable_count),
            print_buffer: String::new(),
            state: SessionState::Fresh,
            return_code: 0,
            rng: SessionRng::new(seed),
            dyn_noop_count: 0,
            executed_offsets: std::collections::HashSet::new(),
        }
    }

    /// Creates a session whose seed mixes a caller-supplied clock sample with an
    /// opaque session identity.
    pub fn new(
        program: Program,
        variable_count: usize,
        string_table_count: usize,
        max_string_size: usize,
        session_id: u64,
        clock_sample: u64,
    ) -> Self {
        let seed = SessionRng::default_seed(session_id, clock_sample);
        Self::with_seed(
            program,
            variable_count,
            string_table_count,
            max_string_size,
            seed,
        )
    }

    fn mark_running(&mut self) {
        if self.state == SessionState::Fresh {
            self.state = SessionState::Running;
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn was_terminated(&self) -> bool {
        self.state == SessionState::Terminated
    }

    pub fn return_code(&self) -> i8 {
        self.return_code
    }

    /// `true` once every mutating operation below should become a no-op.
    fn is_terminated(&self) -> bool {
        self.state == SessionState::Terminated
    }

    /// Terminates the session, recording `code`. Idempotent: a second call is a
    /// no-op, matching "terminated is absorbing".
    pub fn terminate(&mut self, code: i8) {
        self.mark_running();
        if self.is_terminated() {
            return;
        }
        self.state = SessionState::Terminated;
        self.return_code = code;
        tracing::debug!(return_code = code, "session terminated");
    }

    /// Terminates with the resolved variable's low 8 bits as the return code.
    pub fn terminate_with_variable_return_code(
        &mut self,
        variable_index: i32,
        follow_links: bool,
    ) -> VmResult<()> {
        let value = self.guarded(|s| {
            let real = s.resolve(variable_index, follow_links)?;
            s.variables.raw_value(real)
        })?;
        self.terminate(value as i8);
        Ok(())
    }

    /// Any `VmFault` is fatal to the session. Maps the fault to a small
    /// distinguishing non-zero code and terminates, then returns the fault to
    /// the caller so direct API users still see exactly what went wrong.
    pub(crate) fn fault(&mut self, err: VmFault) -> VmFault {
        if !self.is_terminated() {
            let code = fault_return_code(&err);
            self.terminate(code);
            tracing::warn!(error = %err, "vm fault");
        }
        err
    }

    /// Consumes 1 byte at the cursor, sign-extended, and advances it.
    pub fn get_data1(&mut self) -> VmResult<i8> {
        self.mark_running();
        let value = self.program.read_i8(self.pointer).map_err(VmFault::from);
        match value {
            Ok(v) => {
                self.pointer += 1;
                Ok(v)
            }
            Err(e) => Err(self.fault(e)),
        }
    }

    /// Consumes 2 bytes at the cursor, sign-extended, and advances it.
    pub fn get_data2(&mut self) -> VmResult<i16> {
        self.mark_running();
        let value = self.program.read_i16(self.pointer).map_err(VmFault::from);
        match value {
            Ok(v) => {
                self.pointer += 2;
                Ok(v)
            }
            Err(e) => Err(self.fault(e)),
        }
    }

    /// Consumes 4 bytes at the cursor, sign-extended, and advances it.
    pub fn get_data4(&mut self) -> VmResult<i32> {
        self.mark_running();
        let value = self.program.read_i32(self.pointer).map_err(VmFault::from);
        match value {
            Ok(v) => {
                self.pointer += 4;
                Ok(v)
            }
            Err(e) => Err(self.fault(e)),
        }
    }

    pub fn is_at_end(&self) -> bool {
        self.pointer == self.program.len()
    }

    pub fn current_address(&self) -> usize {
        self.pointer
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn print_buffer(&self) -> &str {
        &self.print_buffer
    }

    pub fn clear_print_buffer(&mut self) {
        if self.is_terminated() {
            return;
        }
        self.print_buffer.clear();
    }

    pub fn append_to_print_buffer(&mut self, text: &str) {
        if self.is_terminated() {
            return;
        }
        self.print_buffer.push_str(text);
    }

    /// Variable capacity configured at construction.
    pub fn variable_capacity(&self) -> usize {
        self.variable_count
    }

    pub fn registered_variable_count(&self) -> usize {
        self.variables.len()
    }

    pub fn string_table_capacity(&self) -> usize {
        self.strings.capacity()
    }

    pub fn max_string_size(&self) -> usize {
        self.strings.max_entry_len()
    }

    /// Number of dynamic no-ops (`OpCode::Nop`) executed so far; read by
    /// `RuntimeStatisticsEvaluator`.
    pub fn dyn_noop_count(&self) -> u64 {
        self.dyn_noop_count
    }

    /// Distinct instruction-start offsets executed so far; used to compute the
    /// "fraction of the Program actually executed".
    pub fn executed_offset_count(&self) -> usize {
        self.executed_offsets.len()
    }

    /// Number of bytes the current program spans, for coverage calculations.
    pub fn program_len(&self) -> usize {
        self.program.len()
    }

    fn guard(&mut self) -> bool {
        self.mark_running();
        !self.is_terminated()
    }

    /// Resolves `index` through link hops (if `follow_links`). Does not itself
    /// fault the session — callers run it inside [`VmSession::guarded`], which is
    /// the single fault point for every public operation.
    pub(crate) fn resolve(&self, index: i32, follow_links: bool) -> VmResult<i32> {
        self.variables.resolve(index, follow_links)
    }

    /// Every mutating `VmSession` operation (§4.B) funnels through this: it
    /// transitions `Fresh -> Running`, rejects calls after termination with
    /// `AlreadyTerminated` (without re-logging a fault), and faults the session
    /// exactly once if `op` itself returns an `Err`.
    pub(crate) fn guarded<T>(&mut self, op: impl FnOnce(&mut Self) -> VmResult<T>) -> VmResult<T> {
        if !self.guard() {
            return Err(VmFault::AlreadyTerminated(self.return_code));
        }
        match op(self) {
            Ok(v) => Ok(v),
            Err(e) => Err(self.fault(e)),
        }
    }
}

/// Maps a fault to a small, stable non-zero return code. Not meant to be a full
/// error-code registry — just enough to let a caller distinguish fault categories
/// from `return_code()` alone without re-deriving from the `VmFault` value.
fn fault_return_code(err: &VmFault) -> i8 {
    match err {
        VmFault::UnregisteredVariable(_) => -1,
        VmFault::LinkCycle(_) | VmFault::BrokenLinkChain(_) => -2,
        VmFault::StringTableIndexOutOfRange { .. }
        | VmFault::StringTooLong { .. }
        | VmFault::StringTableEntryMissing(_) => -3,
        VmFault::InvalidJumpTarget(_) => -4,
        VmFault::ModuloByZero => -5,
        VmFault::StackUnderflow(_) | VmFault::StackOverflow(_) => -6,
        VmFault::OutOfRange(_) => -7,
        VmFault::InvalidOperand(_) => -8,
        VmFault::UnknownOpCode(_) => -9,
        VmFault::UnhandledSystemCall { .. } => -10,
        VmFault::AlreadyTerminated(code) => *code,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beast_program::OpCode;

    fn program_of(ops: Vec<u8>) -> Program {
        Program::new(ops)
    }

    #[test]
    fn terminated_is_absorbing() {
        let mut session = VmSession::with_seed(program_of(vec![]), 4, 4, 16, 1);
        session.terminate(7);
        assert!(session.was_terminated());
        assert_eq!(session.return_code(), 7);

        session.terminate(9);
        assert_eq!(session.return_code(), 7, "second terminate is a no-op");
    }

    #[test]
    fn fresh_transitions_to_running_on_first_read() {
        let mut session = VmSession::with_seed(program_of(vec![OpCode::Nop as u8]), 1, 1, 1, 1);
        assert_eq!(session.state(), SessionState::Fresh);
        session.get_data1().unwrap();
        assert_eq!(session.state(), SessionState::Running);
    }

    #[test]
    fn reading_past_end_faults_and_terminates() {
        let mut session = VmSession::with_seed(program_of(vec![]), 1, 1, 1, 1);
        let err = session.get_data1().unwrap_err();
        assert!(matches!(err, VmFault::OutOfRange(_)));
        assert!(session.was_terminated());
        assert_eq!(session.return_code(), -7);
    }
}
