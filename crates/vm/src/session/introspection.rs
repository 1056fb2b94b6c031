//! Read-only session facts exposed to a running program: memory size, I/O
//! counts, the current address, string table limits, and a random value.
//!
//! `perform_system_call` is the one escape hatch into host-defined behavior. No
//! concrete (major, minor) pairs are defined here, so every pair is currently
//! "unhandled": the host reports that back through the destination variable
//! rather than failing the call, since this particular path is not fatal to
//! the session.

use crate::error::VmResult;
use crate::variable::VariableIoBehavior;

use super::VmSession;

/// Written into the destination variable when `perform_system_call` is given a
/// (major, minor) pair the host does not implement.
pub const UNHANDLED_SYSTEM_CALL_CODE: i32 = -1;

impl VmSession {
    pub fn load_memory_size_into_variable(&mut self, variable: i32, follow_links: bool) -> VmResult<()> {
        self.guarded(|s| {
            let real = s.resolve(variable, follow_links)?;
            s.variables.set_raw_value(real, s.variable_count as i32)
        })
    }

    pub fn load_input_count_into_variable(&mut self, variable: i32, follow_links: bool) -> VmResult<()> {
        self.guarded(|s| {
            let count = s.variables.count_with_behavior(VariableIoBehavior::Input);
            let real = s.resolve(variable, follow_links)?;
            s.variables.set_raw_value(real, count as i32)
        })
    }

    pub fn load_output_count_into_variable(&mut self, variable: i32, follow_links: bool) -> VmResult<()> {
        self.guarded(|s| {
            let count = s.variables.count_with_behavior(VariableIoBehavior::Output);
            let real = s.resolve(variable, follow_links)?;
            s.variables.set_raw_value(real, count as i32)
        })
    }

    pub fn load_current_address_into_variable(&mut self, variable: i32, follow_links: bool) -> VmResult<()> {
        self.guarded(|s| {
            let address = s.pointer as i32;
            let real = s.resolve(variable, follow_links)?;
            s.variables.set_raw_value(real, address)
        })
    }

    pub fn load_string_table_limit_into_variable(
        &mut self,
        variable_index: i32,
        follow_links: bool,
    ) -> VmResult<()> {
        self.guarded(|s| {
            let limit = s.strings.capacity() as i32;
            let real = s.resolve(variable_index, follow_links)?;
            s.variables.set_raw_value(real, limit)
        })
    }

    pub fn load_string_table_item_length_limit_into_variable(
        &mut self,
        variable_index: i32,
        follow_links: bool,
    ) -> VmResult<()> {
        self.guarded(|s| {
            let limit = s.strings.max_entry_len() as i32;
            let real = s.resolve(variable_index, follow_links)?;
            s.variables.set_raw_value(real, limit)
        })
    }

    pub fn load_random_value_into_variable(&mut self, variable_index: i32, follow_links: bool) -> VmResult<()> {
        self.guarded(|s| {
            let value = s.rng.next_i32();
            let real = s.resolve(variable_index, follow_links)?;
            s.variables.set_raw_value(real, value)
        })
    }

    pub fn perform_system_call(
        &mut self,
        major_code: i8,
        minor_code: i8,
        variable_index: i32,
        follow_links: bool,
    ) -> VmResult<()> {
        self.guarded(|s| {
            let _ = (major_code, minor_code);
            let real = s.resolve(variable_index, follow_links)?;
            s.variables.set_raw_value(real, UNHANDLED_SYSTEM_CALL_CODE)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::VariableType;
    use beast_program::Program;

    fn session() -> VmSession {
        let mut s = VmSession::with_seed(Program::new(vec![]), 4, 2, 8, 1);
        s.register_variable(0, VariableType::Int32).unwrap();
        s.register_variable(1, VariableType::Int32).unwrap();
        s
    }

    #[test]
    fn reports_configured_limits() {
        let mut s = session();
        s.load_memory_size_into_variable(0, false).unwrap();
        assert_eq!(s.get_variable_value(0, false).unwrap(), 4);
        s.load_string_table_limit_into_variable(0, false).unwrap();
        assert_eq!(s.get_variable_value(0, false).unwrap(), 2);
        s.load_string_table_item_length_limit_into_variable(0, false).unwrap();
        assert_eq!(s.get_variable_value(0, false).unwrap(), 8);
    }

    #[test]
    fn counts_input_and_output_variables() {
        let mut s = session();
        s.set_variable_behavior(0, VariableIoBehavior::Input).unwrap();
        s.set_variable_behavior(1, VariableIoBehavior::Output).unwrap();
        s.load_input_count_into_variable(0, false).unwrap();
        assert_eq!(s.get_variable_value(0, false).unwrap(), 1);
    }

    #[test]
    fn unhandled_system_call_reports_sentinel_without_terminating() {
        let mut s = session();
        s.perform_system_call(1, 1, 1, false).unwrap();
        assert_eq!(s.get_variable_value(1, false).unwrap(), UNHANDLED_SYSTEM_CALL_CODE);
        assert!(!s.was_terminated());
    }
}
