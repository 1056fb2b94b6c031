//! Bitwise operations: AND/OR/XOR/invert, and shift/rotate by a constant or by
//! another variable's value.
//!
//! Shift-by-constant takes a signed places operand: positive shifts left,
//! negative shifts right (arithmetic, sign-extending), magnitude taken mod 32.
//! The directional `variable_*_variable_left/right` opcodes ignore the sign of
//! the places variable and always shift/rotate the named way.

use crate::error::VmResult;

use super::VmSession;

fn shift_by(value: i32, places: i32) -> i32 {
    if places >= 0 {
        value.wrapping_shl((places as u32) % 32)
    } else {
        value.wrapping_shr(((-places) as u32) % 32)
    }
}

fn rotate_by(value: i32, places: i32) -> i32 {
    if places >= 0 {
        value.rotate_left((places as u32) % 32)
    } else {
        value.rotate_right(((-places) as u32) % 32)
    }
}

impl VmSession {
    pub fn bitwise_and_two_variables(
        &mut self,
        variable_index_a: i32,
        follow_links_a: bool,
        variable_index_b: i32,
        follow_links_b: bool,
    ) -> VmResult<()> {
        self.guarded(|s| {
            let real_a = s.resolve(variable_index_a, follow_links_a)?;
            let a = s.variables.raw_value(real_a)?;
            let real_b = s.resolve(variable_index_b, follow_links_b)?;
            let b = s.variables.raw_value(real_b)?;
            s.variables.set_raw_value(real_b, a & b)
        })
    }

    pub fn bitwise_or_two_variables(
        &mut self,
        variable_index_a: i32,
        follow_links_a: bool,
        variable_index_b: i32,
        follow_links_b: bool,
    ) -> VmResult<()> {
        self.guarded(|s| {
            let real_a = s.resolve(variable_index_a, follow_links_a)?;
            let a = s.variables.raw_value(real_a)?;
            let real_b = s.resolve(variable_index_b, follow_links_b)?;
            let b = s.variables.raw_value(real_b)?;
            s.variables.set_raw_value(real_b, a | b)
        })
    }

    pub fn bitwise_xor_two_variables(
        &mut self,
        variable_index_a: i32,
        follow_links_a: bool,
        variable_index_b: i32,
        follow_links_b: bool,
    ) -> VmResult<()> {
        self.guarded(|s| {
            let real_a = s.resolve(variable_index_a, follow_links_a)?;
            let a = s.variables.raw_value(real_a)?;
            let real_b = s.resolve(variable_index_b, follow_links_b)?;
            let b = s.variables.raw_value(real_b)?;
            s.variables.set_raw_value(real_b, a ^ b)
        })
    }

    pub fn bitwise_invert_variable(&mut self, variable_index: i32, follow_links: bool) -> VmResult<()> {
        self.guarded(|s| {
            let real = s.resolve(variable_index, follow_links)?;
            let value = s.variables.raw_value(real)?;
            s.variables.set_raw_value(real, !value)
        })
    }

    pub fn bit_shift_variable(
        &mut self,
        variable_index: i32,
        follow_links: bool,
        places: i16,
    ) -> VmResult<()> {
        self.guarded(|s| {
            let real = s.resolve(variable_index, follow_links)?;
            let value = s.variables.raw_value(real)?;
            s.variables.set_raw_value(real, shift_by(value, places as i32))
        })
    }

    pub fn rotate_variable(
        &mut self,
        variable_index: i32,
        follow_links: bool,
        places: i16,
    ) -> VmResult<()> {
        self.guarded(|s| {
            let real = s.resolve(variable_index, follow_links)?;
            let value = s.variables.raw_value(real)?;
            s.variables.set_raw_value(real, rotate_by(value, places as i32))
        })
    }

    pub fn variable_bit_shift_variable_left(
        &mut self,
        variable_index: i32,
        follow_links: bool,
        places_variable_index: i32,
        places_follow_links: bool,
    ) -> VmResult<()> {
        self.guarded(|s| {
            let real_places = s.resolve(places_variable_index, places_follow_links)?;
            let places = s.variables.raw_value(real_places)?;
            let real = s.resolve(variable_index, follow_links)?;
            let value = s.variables.raw_value(real)?;
            s.variables
                .set_raw_value(real, value.wrapping_shl((places as u32) % 32))
        })
    }

    pub fn variable_bit_shift_variable_right(
        &mut self,
        variable_index: i32,
        follow_links: bool,
        places_variable_index: i32,
        places_follow_links: bool,
    ) -> VmResult<()> {
        self.guarded(|s| {
            let real_places = s.resolve(places_variable_index, places_follow_links)?;
            let places = s.variables.raw_value(real_places)?;
            let real = s.resolve(variable_index, follow_links)?;
            let value = s.variables.raw_value(real)?;
            s.variables
                .set_raw_value(real, value.wrapping_shr((places as u32) % 32))
        })
    }

    pub fn variable_rotate_variable_left(
        &mut self,
        variable_index: i32,
        follow_links: bool,
        places_variable_index: i32,
        places_follow_links: bool,
    ) -> VmResult<()> {
        self.guarded(|s| {
            let real_places = s.resolve(places_variable_index, places_follow_links)?;
            let places = s.variables.raw_value(real_places)?;
            let real = s.resolve(variable_index, follow_links)?;
            let value = s.variables.raw_value(real)?;
            s.variables
                .set_raw_value(real, value.rotate_left((places as u32) % 32))
        })
    }

    pub fn variable_rotate_variable_right(
        &mut self,
        variable_index: i32,
        follow_links: bool,
        places_variable_index: i32,
        places_follow_links: bool,
    ) -> VmResult<()> {
        self.guarded(|s| {
            let real_places = s.resolve(places_variable_index, places_follow_links)?;
            let places = s.variables.raw_value(real_places)?;
            let real = s.resolve(variable_index, follow_links)?;
            let value = s.variables.raw_value(real)?;
            s.variables
                .set_raw_value(real, value.rotate_right((places as u32) % 32))
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
    fn positive_places_shifts_left() {
        let mut s = session();
        s.register_variable(0, VariableType::Int32).unwrap();
        s.set_variable_value(0, false, 1).unwrap();
        s.bit_shift_variable(0, false, 3).unwrap();
        assert_eq!(s.get_variable_value(0, false).unwrap(), 8);
    }

    #[test]
    fn negative_places_shifts_right_arithmetic() {
        let mut s = session();
        s.register_variable(0, VariableType::Int32).unwrap();
        s.set_variable_value(0, false, -8).unwrap();
        s.bit_shift_variable(0, false, -1).unwrap();
        assert_eq!(s.get_variable_value(0, false).unwrap(), -4);
    }

    #[test]
    fn rotate_wraps_bits() {
        let mut s = session();
        s.register_variable(0, VariableType::Int32).unwrap();
        s.set_variable_value(0, false, 1).unwrap();
        s.rotate_variable(0, false, 31).unwrap();
        assert_eq!(s.get_variable_value(0, false).unwrap(), i32::MIN);
    }

    #[test]
    fn xor_with_self_zeroes() {
        let mut s = session();
        s.register_variable(0, VariableType::Int32).unwrap();
        s.register_variable(1, VariableType::Int32).unwrap();
        s.set_variable_value(0, false, 0b1010).unwrap();
        s.set_variable_value(1, false, 0b1010).unwrap();
        s.bitwise_xor_two_variables(0, false, 1, false).unwrap();
        assert_eq!(s.get_variable_value(1, false).unwrap(), 0);
    }
}
