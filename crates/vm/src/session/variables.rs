//! Variable registry operations: register/unregister, value and behavior
//! accessors, link-resolution probing, copy/swap.

use crate::error::{VmFault, VmResult};
use crate::variable::{VariableIoBehavior, VariableType};

use super::VmSession;

impl VmSession {
    pub fn register_variable(&mut self, variable_index: i32, variable_type: VariableType) -> VmResult<()> {
        self.guarded(|s| {
            s.variables.register(variable_index, variable_type);
            Ok(())
        })
    }

    pub fn unregister_variable(&mut self, variable_index: i32) -> VmResult<()> {
        self.guarded(|s| {
            s.variables.unregister(variable_index);
            Ok(())
        })
    }

    /// Resolves `variable_index` through link hops (if `follow_links`) without
    /// dereferencing its value; the read-only counterpart of `get_variable_value`.
    pub fn real_variable_index(&mut self, variable_index: i32, follow_links: bool) -> VmResult<i32> {
        self.guarded(|s| s.resolve(variable_index, follow_links))
    }

    pub fn get_variable_value(&mut self, variable_index: i32, follow_links: bool) -> VmResult<i32> {
        self.guarded(|s| {
            let real = s.resolve(variable_index, follow_links)?;
            s.variables.raw_value(real)
        })
    }

    pub fn set_variable_value(
        &mut self,
        variable_index: i32,
        follow_links: bool,
        value: i32,
    ) -> VmResult<()> {
        self.guarded(|s| {
            let real = s.resolve(variable_index, follow_links)?;
            s.variables.set_raw_value(real, value)
        })
    }

    pub fn get_variable_behavior(
        &mut self,
        variable_index: i32,
        follow_links: bool,
    ) -> VmResult<VariableIoBehavior> {
        self.guarded(|s| {
            let real = s.resolve(variable_index, follow_links)?;
            s.variables.behavior(real)
        })
    }

    /// Matches the header's `setVariableBehavior`, which (unlike every other
    /// setter) takes no `follow_links`: behavior lives on the index as named.
    pub fn set_variable_behavior(
        &mut self,
        variable_index: i32,
        behavior: VariableIoBehavior,
    ) -> VmResult<()> {
        self.guarded(|s| s.variables.set_behavior(variable_index, behavior))
    }

    pub fn check_if_variable_is_input(
        &mut self,
        source_variable: i32,
        follow_source_links: bool,
        destination_variable: i32,
        follow_destination_links: bool,
    ) -> VmResult<()> {
        self.guarded(|s| {
            let real_source = s.resolve(source_variable, follow_source_links)?;
            let is_input = s.variables.behavior(real_source)? == VariableIoBehavior::Input;
            let real_dest = s.resolve(destination_variable, follow_destination_links)?;
            s.variables.set_raw_value(real_dest, is_input as i32)
        })
    }

    pub fn check_if_variable_is_output(
        &mut self,
        source_variable: i32,
        follow_source_links: bool,
        destination_variable: i32,
        follow_destination_links: bool,
    ) -> VmResult<()> {
        self.guarded(|s| {
            let real_source = s.resolve(source_variable, follow_source_links)?;
            let is_output = s.variables.behavior(real_source)? == VariableIoBehavior::Output;
            let real_dest = s.resolve(destination_variable, follow_destination_links)?;
            s.variables.set_raw_value(real_dest, is_output as i32)
        })
    }

    /// Reads and clears `source_variable`'s changed-since-last-interaction flag,
    /// writing `1`/`0` into `destination_variable`.
    pub fn check_if_input_was_set(
        &mut self,
        source_variable: i32,
        follow_source_links: bool,
        destination_variable: i32,
        follow_destination_links: bool,
    ) -> VmResult<()> {
        self.guarded(|s| {
            let real_source = s.resolve(source_variable, follow_source_links)?;
            let was_set = s.variables.take_changed_flag(real_source)?;
            let real_dest = s.resolve(destination_variable, follow_destination_links)?;
            s.variables.set_raw_value(real_dest, was_set as i32)
        })
    }

    pub fn copy_variable(
        &mut self,
        source_variable: i32,
        follow_source_links: bool,
        destination_variable: i32,
        follow_destination_links: bool,
    ) -> VmResult<()> {
        self.guarded(|s| {
            let real_source = s.resolve(source_variable, follow_source_links)?;
            let value = s.variables.raw_value(real_source)?;
            let real_dest = s.resolve(destination_variable, follow_destination_links)?;
            s.variables.set_raw_value(real_dest, value)
        })
    }

    pub fn swap_variables(
        &mut self,
        variable_index_a: i32,
        follow_links_a: bool,
        variable_index_b: i32,
        follow_links_b: bool,
    ) -> VmResult<()> {
        self.guarded(|s| {
            let real_a = s.resolve(variable_index_a, follow_links_a)?;
            let real_b = s.resolve(variable_index_b, follow_links_b)?;
            s.variables.swap(real_a, real_b)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::VariableType;
    use beast_program::Program;

    fn session() -> VmSession {
        VmSession::with_seed(Program::new(vec![]), 8, 1, 1, 1)
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut s = session();
        s.register_variable(0, VariableType::Int32).unwrap();
        s.set_variable_value(0, false, 42).unwrap();
        assert_eq!(s.get_variable_value(0, false).unwrap(), 42);
    }

    #[test]
    fn value_follows_link_chain() {
        let mut s = session();
        s.register_variable(0, VariableType::Int32).unwrap();
        s.register_variable(1, VariableType::Link).unwrap();
        s.set_variable_value(0, false, 7).unwrap();
        s.set_variable_value(1, false, 0).unwrap();
        assert_eq!(s.get_variable_value(1, true).unwrap(), 7);
    }

    #[test]
    fn unregistered_access_faults_and_terminates() {
        let mut s = session();
        let err = s.get_variable_value(0, false).unwrap_err();
        assert!(matches!(err, VmFault::UnregisteredVariable(0)));
        assert!(s.was_terminated());
    }

    #[test]
    fn swap_exchanges_values() {
        let mut s = session();
        s.register_variable(0, VariableType::Int32).unwrap();
        s.register_variable(1, VariableType::Int32).unwrap();
        s.set_variable_value(0, false, 1).unwrap();
        s.set_variable_value(1, false, 2).unwrap();
        s.swap_variables(0, false, 1, false).unwrap();
        assert_eq!(s.get_variable_value(0, false).unwrap(), 2);
        assert_eq!(s.get_variable_value(1, false).unwrap(), 1);
    }

    #[test]
    fn check_if_input_was_set_clears_flag() {
        let mut s = session();
        s.register_variable(0, VariableType::Int32).unwrap();
        s.register_variable(1, VariableType::Int32).unwrap();
        s.set_variable_value(0, false, 99).unwrap();
        s.check_if_input_was_set(0, false, 1, false).unwrap();
        assert_eq!(s.get_variable_value(1, false).unwrap(), 1);
        s.check_if_input_was_set(0, false, 1, false).unwrap();
        assert_eq!(s.get_variable_value(1, false).unwrap(), 0);
    }
}
