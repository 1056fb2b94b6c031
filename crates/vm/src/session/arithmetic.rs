//! Two's-complement wraparound arithmetic over variables.

use crate::error::{VmFault, VmResult};

use super::VmSession;

impl VmSession {
    pub fn add_constant_to_variable(
        &mut self,
        variable_index: i32,
        constant: i32,
        follow_links: bool,
    ) -> VmResult<()> {
        self.guarded(|s| {
            let real = s.resolve(variable_index, follow_links)?;
            let value = s.variables.raw_value(real)?;
            s.variables.set_raw_value(real, value.wrapping_add(constant))
        })
    }

    pub fn subtract_constant_from_variable(
        &mut self,
        variable_index: i32,
        constant: i32,
        follow_links: bool,
    ) -> VmResult<()> {
        self.guarded(|s| {
            let real = s.resolve(variable_index, follow_links)?;
            let value = s.variables.raw_value(real)?;
            s.variables.set_raw_value(real, value.wrapping_sub(constant))
        })
    }

    pub fn add_variable_to_variable(
        &mut self,
        source_variable: i32,
        follow_source_links: bool,
        destination_variable: i32,
        follow_destination_links: bool,
    ) -> VmResult<()> {
        self.guarded(|s| {
            let real_source = s.resolve(source_variable, follow_source_links)?;
            let addend = s.variables.raw_value(real_source)?;
            let real_dest = s.resolve(destination_variable, follow_destination_links)?;
            let base = s.variables.raw_value(real_dest)?;
            s.variables.set_raw_value(real_dest, base.wrapping_add(addend))
        })
    }

    pub fn subtract_variable_from_variable(
        &mut self,
        source_variable: i32,
        follow_source_links: bool,
        destination_variable: i32,
        follow_destination_links: bool,
    ) -> VmResult<()> {
        self.guarded(|s| {
            let real_source = s.resolve(source_variable, follow_source_links)?;
            let subtrahend = s.variables.raw_value(real_source)?;
            let real_dest = s.resolve(destination_variable, follow_destination_links)?;
            let base = s.variables.raw_value(real_dest)?;
            s.variables.set_raw_value(real_dest, base.wrapping_sub(subtrahend))
        })
    }

    /// C-style modulo: the result's sign follows the dividend, not the divisor.
    pub fn modulo_variable_by_constant(
        &mut self,
        variable_index: i32,
        follow_links: bool,
        constant: i32,
    ) -> VmResult<()> {
        self.guarded(|s| {
            if constant == 0 {
                return Err(VmFault::ModuloByZero);
            }
            let real = s.resolve(variable_index, follow_links)?;
            let value = s.variables.raw_value(real)?;
            s.variables.set_raw_value(real, value.wrapping_rem(constant))
        })
    }

    pub fn modulo_variable_by_variable(
        &mut self,
        variable_index: i32,
        follow_links: bool,
        modulo_variable_index: i32,
        modulo_follow_links: bool,
    ) -> VmResult<()> {
        self.guarded(|s| {
            let real_modulo = s.resolve(modulo_variable_index, modulo_follow_links)?;
            let divisor = s.variables.raw_value(real_modulo)?;
            if divisor == 0 {
                return Err(VmFault::ModuloByZero);
            }
            let real = s.resolve(variable_index, follow_links)?;
            let value = s.variables.raw_value(real)?;
            s.variables.set_raw_value(real, value.wrapping_rem(divisor))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::VariableType;
    use beast_program::Program;

    fn session() -> VmSession {
        VmSession::with_seed(Program::new(vec![]), 4, 1, 1, 1)
    }

    #[test]
    fn add_wraps_on_overflow() {
        let mut s = session();
        s.register_variable(0, VariableType::Int32).unwrap();
        s.set_variable_value(0, false, i32::MAX).unwrap();
        s.add_constant_to_variable(0, 1, false).unwrap();
        assert_eq!(s.get_variable_value(0, false).unwrap(), i32::MIN);
    }

    #[test]
    fn subtract_variable_from_variable_works() {
        let mut s = session();
        s.register_variable(0, VariableType::Int32).unwrap();
        s.register_variable(1, VariableType::Int32).unwrap();
        s.set_variable_value(0, false, 3).unwrap();
        s.set_variable_value(1, false, 10).unwrap();
        s.subtract_variable_from_variable(0, false, 1, false).unwrap();
        assert_eq!(s.get_variable_value(1, false).unwrap(), 7);
    }

    #[test]
    fn modulo_sign_follows_dividend() {
        let mut s = session();
        s.register_variable(0, VariableType::Int32).unwrap();
        s.set_variable_value(0, false, -7).unwrap();
        s.modulo_variable_by_constant(0, false, 3).unwrap();
        assert_eq!(s.get_variable_value(0, false).unwrap(), -1);
    }

    #[test]
    fn modulo_by_zero_faults_and_terminates() {
        let mut s = session();
        s.register_variable(0, VariableType::Int32).unwrap();
        s.set_variable_value(0, false, 5).unwrap();
        let err = s.modulo_variable_by_constant(0, false, 0).unwrap_err();
        assert_eq!(err, VmFault::ModuloByZero);
        assert!(s.was_terminated());
    }
}
