//! Jumps: three comparisons (`> 0`, `< 0`, `== 0`) times two addressing modes
//! (absolute, relative) times two address sources (immediate constant, variable),
//! plus four unconditional jump modes.
//!
//! Relative jumps are relative to the instruction pointer *after* the jump
//! instruction's own operands have been consumed — i.e. where execution would
//! have continued had the jump not been taken. A target outside `[0, program_len]`
//! faults the session rather than silently clamping.

use crate::error::{VmFault, VmResult};

use super::VmSession;

#[derive(Clone, Copy)]
enum Cmp {
    Gt0,
    Lt0,
    Eq0,
}

impl Cmp {
    fn holds(self, value: i32) -> bool {
        match self {
            Cmp::Gt0 => value > 0,
            Cmp::Lt0 => value < 0,
            Cmp::Eq0 => value == 0,
        }
    }
}

impl VmSession {
    fn validate_jump(&self, target: i64) -> VmResult<usize> {
        if target < 0 || target as usize > self.program.len() {
            return Err(VmFault::InvalidJumpTarget(target as i32));
        }
        Ok(target as usize)
    }

    fn conditional_jump_const(
        &mut self,
        cmp: Cmp,
        relative: bool,
        condition_variable: i32,
        follow_condition_links: bool,
        addr: i32,
    ) -> VmResult<()> {
        self.guarded(|s| {
            let real = s.resolve(condition_variable, follow_condition_links)?;
            let value = s.variables.raw_value(real)?;
            if !cmp.holds(value) {
                return Ok(());
            }
            let base = if relative { s.pointer as i64 } else { 0 };
            let target = s.validate_jump(base + addr as i64)?;
            s.pointer = target;
            Ok(())
        })
    }

    fn conditional_jump_variable(
        &mut self,
        cmp: Cmp,
        relative: bool,
        condition_variable: i32,
        follow_condition_links: bool,
        addr_variable: i32,
        follow_addr_links: bool,
    ) -> VmResult<()> {
        self.guarded(|s| {
            let real_cond = s.resolve(condition_variable, follow_condition_links)?;
            let value = s.variables.raw_value(real_cond)?;
            if !cmp.holds(value) {
                return Ok(());
            }
            let real_addr = s.resolve(addr_variable, follow_addr_links)?;
            let addr = s.variables.raw_value(real_addr)?;
            let base = if relative { s.pointer as i64 } else { 0 };
            let target = s.validate_jump(base + addr as i64)?;
            s.pointer = target;
            Ok(())
        })
    }

    pub fn relative_jump_to_address_if_variable_gt0(
        &mut self,
        condition_variable: i32,
        follow_condition_links: bool,
        addr: i32,
    ) -> VmResult<()> {
        self.conditional_jump_const(Cmp::Gt0, true, condition_variable, follow_condition_links, addr)
    }

    pub fn relative_jump_to_address_if_variable_lt0(
        &mut self,
        condition_variable: i32,
        follow_condition_links: bool,
        addr: i32,
    ) -> VmResult<()> {
        self.conditional_jump_const(Cmp::Lt0, true, condition_variable, follow_condition_links, addr)
    }

    pub fn relative_jump_to_address_if_variable_eq0(
        &mut self,
        condition_variable: i32,
        follow_condition_links: bool,
        addr: i32,
    ) -> VmResult<()> {
        self.conditional_jump_const(Cmp::Eq0, true, condition_variable, follow_condition_links, addr)
    }

    pub fn absolute_jump_to_address_if_variable_gt0(
        &mut self,
        condition_variable: i32,
        follow_condition_links: bool,
        addr: i32,
    ) -> VmResult<()> {
        self.conditional_jump_const(Cmp::Gt0, false, condition_variable, follow_condition_links, addr)
    }

    pub fn absolute_jump_to_address_if_variable_lt0(
        &mut self,
        condition_variable: i32,
        follow_condition_links: bool,
        addr: i32,
    ) -> VmResult<()> {
        self.conditional_jump_const(Cmp::Lt0, false, condition_variable, follow_condition_links, addr)
    }

    pub fn absolute_jump_to_address_if_variable_eq0(
        &mut self,
        condition_variable: i32,
        follow_condition_links: bool,
        addr: i32,
    ) -> VmResult<()> {
        self.conditional_jump_const(Cmp::Eq0, false, condition_variable, follow_condition_links, addr)
    }

    pub fn relative_jump_to_variable_address_if_variable_gt0(
        &mut self,
        condition_variable: i32,
        follow_condition_links: bool,
        addr_variable: i32,
        follow_addr_links: bool,
    ) -> VmResult<()> {
        self.conditional_jump_variable(
            Cmp::Gt0,
            true,
            condition_variable,
            follow_condition_links,
            addr_variable,
            follow_addr_links,
        )
    }

    pub fn relative_jump_to_variable_address_if_variable_lt0(
        &mut self,
        condition_variable: i32,
        follow_condition_links: bool,
        addr_variable: i32,
        follow_addr_links: bool,
    ) -> VmResult<()> {
        self.conditional_jump_variable(
            Cmp::Lt0,
            true,
            condition_variable,
            follow_condition_links,
            addr_variable,
            follow_addr_links,
        )
    }

    pub fn relative_jump_to_variable_address_if_variable_eq0(
        &mut self,
        condition_variable: i32,
        follow_condition_links: bool,
        addr_variable: i32,
        follow_addr_links: bool,
    ) -> VmResult<()> {
        self.conditional_jump_variable(
            Cmp::Eq0,
            true,
            condition_variable,
            follow_condition_links,
            addr_variable,
            follow_addr_links,
        )
    }

    pub fn absolute_jump_to_variable_address_if_variable_gt0(
        &mut self,
        condition_variable: i32,
        follow_condition_links: bool,
        addr_variable: i32,
        follow_addr_links: bool,
    ) -> VmResult<()> {
        self.conditional_jump_variable(
            Cmp::Gt0,
            false,
            condition_variable,
            follow_condition_links,
            addr_variable,
            follow_addr_links,
        )
    }

    pub fn absolute_jump_to_variable_address_if_variable_lt0(
        &mut self,
        condition_variable: i32,
        follow_condition_links: bool,
        addr_variable: i32,
        follow_addr_links: bool,
    ) -> VmResult<()> {
        self.conditional_jump_variable(
            Cmp::Lt0,
            false,
            condition_variable,
            follow_condition_links,
            addr_variable,
            follow_addr_links,
        )
    }

    pub fn absolute_jump_to_variable_address_if_variable_eq0(
        &mut self,
        condition_variable: i32,
        follow_condition_links: bool,
        addr_variable: i32,
        follow_addr_links: bool,
    ) -> VmResult<()> {
        self.conditional_jump_variable(
            Cmp::Eq0,
            false,
            condition_variable,
            follow_condition_links,
            addr_variable,
            follow_addr_links,
        )
    }

    pub fn unconditional_jump_to_absolute_address(&mut self, addr: i32) -> VmResult<()> {
        self.guarded(|s| {
            let target = s.validate_jump(addr as i64)?;
            s.pointer = target;
            Ok(())
        })
    }

    pub fn unconditional_jump_to_relative_address(&mut self, addr: i32) -> VmResult<()> {
        self.guarded(|s| {
            let target = s.validate_jump(s.pointer as i64 + addr as i64)?;
            s.pointer = target;
            Ok(())
        })
    }

    pub fn unconditional_jump_to_absolute_variable_address(
        &mut self,
        variable_index: i32,
        follow_links: bool,
    ) -> VmResult<()> {
        self.guarded(|s| {
            let real = s.resolve(variable_index, follow_links)?;
            let addr = s.variables.raw_value(real)?;
            let target = s.validate_jump(addr as i64)?;
            s.pointer = target;
            Ok(())
        })
    }

    pub fn unconditional_jump_to_relative_variable_address(
        &mut self,
        variable_index: i32,
        follow_links: bool,
    ) -> VmResult<()> {
        self.guarded(|s| {
            let real = s.resolve(variable_index, follow_links)?;
            let addr = s.variables.raw_value(real)?;
            let target = s.validate_jump(s.pointer as i64 + addr as i64)?;
            s.pointer = target;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::VariableType;
    use beast_program::Program;

    fn session_with(len: usize) -> VmSession {
        VmSession::with_seed(Program::new(vec![0u8; len]), 4, 1, 1, 1)
    }

    #[test]
    fn unconditional_relative_jump_moves_pointer() {
        let mut s = session_with(10);
        s.unconditional_jump_to_relative_address(3).unwrap();
        assert_eq!(s.current_address(), 3);
    }

    #[test]
    fn conditional_jump_skipped_when_condition_false() {
        let mut s = session_with(10);
        s.register_variable(0, VariableType::Int32).unwrap();
        s.set_variable_value(0, false, 0).unwrap();
        s.relative_jump_to_address_if_variable_gt0(0, false, 5).unwrap();
        assert_eq!(s.current_address(), 0);
    }

    #[test]
    fn conditional_jump_taken_when_condition_true() {
        let mut s = session_with(10);
        s.register_variable(0, VariableType::Int32).unwrap();
        s.set_variable_value(0, false, 1).unwrap();
        s.relative_jump_to_address_if_variable_gt0(0, false, 5).unwrap();
        assert_eq!(s.current_address(), 5);
    }

    #[test]
    fn jump_outside_program_faults_and_terminates() {
        let mut s = session_with(10);
        let err = s.unconditional_jump_to_absolute_address(999).unwrap_err();
        assert!(matches!(err, VmFault::InvalidJumpTarget(999)));
        assert!(s.was_terminated());
    }

    #[test]
    fn absolute_jump_to_program_end_is_valid() {
        let mut s = session_with(10);
        s.unconditional_jump_to_absolute_address(10).unwrap();
        assert!(s.is_at_end());
    }
}
