//! Stacks hosted in a variable: the stack's identity is the (resolved) index of
//! the variable that names it; that variable's value is kept in lock-step with
//! the stack's current depth after every push/pop.

use crate::error::VmResult;

use super::VmSession;

impl VmSession {
    fn sync_depth(&mut self, holder: i32) -> VmResult<()> {
        let depth = self.stacks.depth(holder);
        self.variables.set_raw_value(holder, depth)
    }

    pub fn push_variable_on_stack(
        &mut self,
        stack_variable_index: i32,
        stack_follow_links: bool,
        variable_index: i32,
        follow_links: bool,
    ) -> VmResult<()> {
        self.guarded(|s| {
            let holder = s.resolve(stack_variable_index, stack_follow_links)?;
            let real = s.resolve(variable_index, follow_links)?;
            let value = s.variables.raw_value(real)?;
            s.stacks.push(holder, value)?;
            s.sync_depth(holder)
        })
    }

    pub fn push_constant_on_stack(
        &mut self,
        stack_variable_index: i32,
        stack_follow_links: bool,
        constant: i32,
    ) -> VmResult<()> {
        self.guarded(|s| {
            let holder = s.resolve(stack_variable_index, stack_follow_links)?;
            s.stacks.push(holder, constant)?;
            s.sync_depth(holder)
        })
    }

    pub fn pop_variable_from_stack(
        &mut self,
        stack_variable_index: i32,
        stack_follow_links: bool,
        variable_index: i32,
        follow_links: bool,
    ) -> VmResult<()> {
        self.guarded(|s| {
            let holder = s.resolve(stack_variable_index, stack_follow_links)?;
            let value = s.stacks.pop(holder)?;
            s.sync_depth(holder)?;
            let real = s.resolve(variable_index, follow_links)?;
            s.variables.set_raw_value(real, value)
        })
    }

    pub fn pop_from_stack(&mut self, stack_variable_index: i32, stack_follow_links: bool) -> VmResult<()> {
        self.guarded(|s| {
            let holder = s.resolve(stack_variable_index, stack_follow_links)?;
            s.stacks.pop(holder)?;
            s.sync_depth(holder)
        })
    }

    pub fn check_if_stack_is_empty(
        &mut self,
        stack_variable_index: i32,
        stack_follow_links: bool,
        variable_index: i32,
        follow_links: bool,
    ) -> VmResult<()> {
        self.guarded(|s| {
            let holder = s.resolve(stack_variable_index, stack_follow_links)?;
            let is_empty = s.stacks.is_empty(holder);
            let real = s.resolve(variable_index, follow_links)?;
            s.variables.set_raw_value(real, is_empty as i32)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VmFault;
    use crate::variable::VariableType;
    use beast_program::Program;

    fn session() -> VmSession {
        let mut s = VmSession::with_seed(Program::new(vec![]), 8, 1, 1, 1);
        s.register_variable(0, VariableType::Int32).unwrap();
        s.register_variable(1, VariableType::Int32).unwrap();
        s.register_variable(2, VariableType::Int32).unwrap();
        s
    }

    #[test]
    fn lifo_ordering_round_trips_through_variables() {
        let mut s = session();
        s.set_variable_value(1, false, 10).unwrap();
        s.push_variable_on_stack(0, false, 1, false).unwrap();
        s.set_variable_value(1, false, 20).unwrap();
        s.push_variable_on_stack(0, false, 1, false).unwrap();

        s.pop_variable_from_stack(0, false, 2, false).unwrap();
        assert_eq!(s.get_variable_value(2, false).unwrap(), 20);
        s.pop_variable_from_stack(0, false, 2, false).unwrap();
        assert_eq!(s.get_variable_value(2, false).unwrap(), 10);
    }

    #[test]
    fn holder_variable_tracks_depth() {
        let mut s = session();
        s.push_constant_on_stack(0, false, 1).unwrap();
        s.push_constant_on_stack(0, false, 2).unwrap();
        assert_eq!(s.get_variable_value(0, false).unwrap(), 2);
        s.pop_from_stack(0, false).unwrap();
        assert_eq!(s.get_variable_value(0, false).unwrap(), 1);
    }

    #[test]
    fn popping_empty_stack_faults() {
        let mut s = session();
        let err = s.pop_from_stack(0, false).unwrap_err();
        assert_eq!(err, VmFault::StackUnderflow(0));
    }

    #[test]
    fn check_if_stack_is_empty_reports_state() {
        let mut s = session();
        s.check_if_stack_is_empty(0, false, 2, false).unwrap();
        assert_eq!(s.get_variable_value(2, false).unwrap(), 1);
        s.push_constant_on_stack(0, false, 5).unwrap();
        s.check_if_stack_is_empty(0, false, 2, false).unwrap();
        assert_eq!(s.get_variable_value(2, false).unwrap(), 0);
    }
}
