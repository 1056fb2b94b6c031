//! String table population and the operations that read it back into variables
//! or the print buffer.
//!
//! `set_string_table_entry`/`set_variable_string_table_entry` are host-API-only:
//! they would need to embed a variable-length string as an inline operand, which
//! the fixed 1/2/4-byte operand model cannot support, so no `OpCode` encodes them.
//! A program populates the string table only indirectly, by running under a host
//! that calls these before execution starts.

use crate::error::VmResult;

use super::VmSession;

impl VmSession {
    pub fn set_string_table_entry(&mut self, string_table_index: i32, content: String) -> VmResult<()> {
        self.guarded(|s| s.strings.set(string_table_index, content))
    }

    pub fn get_string_table_entry(&self, string_table_index: i32) -> VmResult<&str> {
        self.strings.get(string_table_index)
    }

    /// Stores `content` at the string table index held (not pointed to by link
    /// chain on the string table itself, only on locating the index) in
    /// `variable_index`'s resolved value.
    pub fn set_variable_string_table_entry(
        &mut self,
        variable_index: i32,
        follow_links: bool,
        content: String,
    ) -> VmResult<()> {
        self.guarded(|s| {
            let real = s.resolve(variable_index, follow_links)?;
            let index = s.variables.raw_value(real)?;
            s.strings.set(index, content)
        })
    }

    pub fn load_string_item_length_into_variable(
        &mut self,
        string_table_index: i32,
        variable_index: i32,
        follow_links: bool,
    ) -> VmResult<()> {
        self.guarded(|s| {
            let length = s.strings.len_of(string_table_index)? as i32;
            let real = s.resolve(variable_index, follow_links)?;
            s.variables.set_raw_value(real, length)
        })
    }

    pub fn load_variable_string_item_length_into_variable(
        &mut self,
        string_item_variable_index: i32,
        string_item_follow_links: bool,
        variable_index: i32,
        follow_links: bool,
    ) -> VmResult<()> {
        self.guarded(|s| {
            let real_item = s.resolve(string_item_variable_index, string_item_follow_links)?;
            let string_table_index = s.variables.raw_value(real_item)?;
            let length = s.strings.len_of(string_table_index)? as i32;
            let real = s.resolve(variable_index, follow_links)?;
            s.variables.set_raw_value(real, length)
        })
    }

    /// Fills `start_variable_index`, `start_variable_index + 1`, ... with each
    /// character's code point. Only the start index follows links; the filled
    /// range is consecutive raw indices from there.
    pub fn load_string_item_into_variables(
        &mut self,
        string_table_index: i32,
        start_variable_index: i32,
        follow_links: bool,
    ) -> VmResult<()> {
        self.guarded(|s| {
            let content = s.strings.get(string_table_index)?.to_owned();
            let base = s.resolve(start_variable_index, follow_links)?;
            for (offset, ch) in content.chars().enumerate() {
                s.variables.set_raw_value(base + offset as i32, ch as i32)?;
            }
            Ok(())
        })
    }

    pub fn load_variable_string_item_into_variables(
        &mut self,
        string_item_variable_index: i32,
        string_item_follow_links: bool,
        variable_index: i32,
        follow_links: bool,
    ) -> VmResult<()> {
        self.guarded(|s| {
            let real_item = s.resolve(string_item_variable_index, string_item_follow_links)?;
            let string_table_index = s.variables.raw_value(real_item)?;
            let content = s.strings.get(string_table_index)?.to_owned();
            let base = s.resolve(variable_index, follow_links)?;
            for (offset, ch) in content.chars().enumerate() {
                s.variables.set_raw_value(base + offset as i32, ch as i32)?;
            }
            Ok(())
        })
    }

    pub fn print_variable_string_from_string_table(
        &mut self,
        variable_index: i32,
        follow_links: bool,
    ) -> VmResult<()> {
        self.guarded(|s| {
            let real = s.resolve(variable_index, follow_links)?;
            let string_table_index = s.variables.raw_value(real)?;
            let content = s.strings.get(string_table_index)?.to_owned();
            s.print_buffer.push_str(&content);
            Ok(())
        })
    }

    /// Appends a variable's value to the print buffer: as a single character when
    /// `as_char`, or as a decimal integer otherwise.
    pub fn append_variable_to_print_buffer(
        &mut self,
        variable_index: i32,
        follow_links: bool,
        as_char: bool,
    ) -> VmResult<()> {
        self.guarded(|s| {
            let real = s.resolve(variable_index, follow_links)?;
            let value = s.variables.raw_value(real)?;
            if as_char {
                if let Some(c) = char::from_u32(value as u32) {
                    s.print_buffer.push(c);
                }
            } else {
                s.print_buffer.push_str(&value.to_string());
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::VariableType;
    use beast_program::Program;

    fn session() -> VmSession {
        VmSession::with_seed(Program::new(vec![]), 8, 4, 16, 1)
    }

    #[test]
    fn loads_string_length_and_chars_into_variables() {
        let mut s = session();
        s.set_string_table_entry(0, "hi".into()).unwrap();
        s.register_variable(0, VariableType::Int32).unwrap();
        s.register_variable(1, VariableType::Int32).unwrap();
        s.register_variable(2, VariableType::Int32).unwrap();

        s.load_string_item_length_into_variable(0, 0, false).unwrap();
        assert_eq!(s.get_variable_value(0, false).unwrap(), 2);

        s.load_string_item_into_variables(0, 1, false).unwrap();
        assert_eq!(s.get_variable_value(1, false).unwrap(), 'h' as i32);
        assert_eq!(s.get_variable_value(2, false).unwrap(), 'i' as i32);
    }

    #[test]
    fn print_variable_string_appends_to_buffer() {
        let mut s = session();
        s.set_string_table_entry(0, "ok".into()).unwrap();
        s.register_variable(0, VariableType::Int32).unwrap();
        s.set_variable_value(0, false, 0).unwrap();
        s.print_variable_string_from_string_table(0, false).unwrap();
        assert_eq!(s.print_buffer(), "ok");
    }

    #[test]
    fn append_variable_as_char_vs_number() {
        let mut s = session();
        s.register_variable(0, VariableType::Int32).unwrap();
        s.set_variable_value(0, false, 'A' as i32).unwrap();
        s.append_variable_to_print_buffer(0, false, true).unwrap();
        assert_eq!(s.print_buffer(), "A");

        s.clear_print_buffer();
        s.append_variable_to_print_buffer(0, false, false).unwrap();
        assert_eq!(s.print_buffer(), (('A' as i32)).to_string());
    }
}
