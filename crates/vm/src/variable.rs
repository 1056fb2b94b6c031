//! Variable registry: the `index -> descriptor+value` mapping that backs every
//! `VmSession` read/write.

use std::collections::HashMap;

use crate::error::{VmFault, VmResult};

/// The type of value a variable currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableType {
    /// An ordinary 32-bit signed cell.
    Int32,
    /// Stores another variable's index; transparently dereferenced when
    /// `follow_links = true`.
    Link,
}

impl VariableType {
    /// Decodes the 1-byte operand `RegisterVariable` carries.
    pub fn from_operand(byte: i8) -> VmResult<Self> {
        match byte {
            0 => Ok(VariableType::Int32),
            1 => Ok(VariableType::Link),
            other => Err(VmFault::InvalidOperand(other as i32)),
        }
    }
}

/// How a variable is expected to be used by the surrounding host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableIoBehavior {
    /// In-memory storage only; no I/O is expected.
    Store = 0,
    /// Expected to receive input from outside the session.
    Input = 1,
    /// Expected to be read from outside the session.
    Output = 2,
}

impl VariableIoBehavior {
    /// Decodes the 1-byte operand `SetVariableBehavior` carries.
    pub fn from_operand(byte: i8) -> VmResult<Self> {
        match byte {
            0 => Ok(VariableIoBehavior::Store),
            1 => Ok(VariableIoBehavior::Input),
            2 => Ok(VariableIoBehavior::Output),
            other => Err(VmFault::InvalidOperand(other as i32)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct VariableDescriptor {
    pub variable_type: VariableType,
    pub behavior: VariableIoBehavior,
    pub changed_since_last_interaction: bool,
}

#[derive(Debug, Clone, Copy)]
struct VariableEntry {
    descriptor: VariableDescriptor,
    value: i32,
}

/// The `index -> descriptor+value` mapping. Link traversal (`resolve`) is
/// cycle-detecting: it bounds the walk by the number of registered variables, which
/// is the longest a cycle-free chain could possibly be.
#[derive(Debug, Default)]
pub struct VariableTable {
    entries: HashMap<i32, VariableEntry>,
}

impl VariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, index: i32, variable_type: VariableType) {
        self.entries.insert(
            index,
            VariableEntry {
                descriptor: VariableDescriptor {
                    variable_type,
                    behavior: VariableIoBehavior::Store,
                    changed_since_last_interaction: false,
                },
                value: 0,
            },
        );
    }

    pub fn unregister(&mut self, index: i32) {
        self.entries.remove(&index);
    }

    pub fn contains(&self, index: i32) -> bool {
        self.entries.contains_key(&index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, index: i32) -> VmResult<&VariableEntry> {
        self.entries
            .get(&index)
            .ok_or(VmFault::UnregisteredVariable(index))
    }

    fn entry_mut(&mut self, index: i32) -> VmResult<&mut VariableEntry> {
        self.entries
            .get_mut(&index)
            .ok_or(VmFault::UnregisteredVariable(index))
    }

    pub fn variable_type(&self, index: i32) -> VmResult<VariableType> {
        Ok(self.entry(index)?.descriptor.variable_type)
    }

    /// Raw (non-link-following) read of a variable's stored value.
    pub fn raw_value(&self, index: i32) -> VmResult<i32> {
        Ok(self.entry(index)?.value)
    }

    /// Raw (non-link-following) write. Sets the `changed_since_last_interaction`
    /// flag on every write.
    pub fn set_raw_value(&mut self, index: i32, value: i32) -> VmResult<()> {
        let entry = self.entry_mut(index)?;
        entry.value = value;
        entry.descriptor.changed_since_last_interaction = true;
        Ok(())
    }

    pub fn behavior(&self, index: i32) -> VmResult<VariableIoBehavior> {
        Ok(self.entry(index)?.descriptor.behavior)
    }

    pub fn set_behavior(&mut self, index: i32, behavior: VariableIoBehavior) -> VmResult<()> {
        self.entry_mut(index)?.descriptor.behavior = behavior;
        Ok(())
    }

    /// Reads and clears the `changed_since_last_interaction` flag, matching the
    /// "I/O probe" semantics of `checkIfInputWasSet`.
    pub fn take_changed_flag(&mut self, index: i32) -> VmResult<bool> {
        let entry = self.entry_mut(index)?;
        let was_changed = entry.descriptor.changed_since_last_interaction;
        entry.descriptor.changed_since_last_interaction = false;
        Ok(was_changed)
    }

    /// Resolves `index` through zero or more `Link` hops to an `Int32` variable,
    /// returning the terminal index. Detects cycles by bounding the walk at
    /// `entries.len() + 1` hops.
    pub fn resolve(&self, index: i32, follow_links: bool) -> VmResult<i32> {
        if !follow_links {
            self.entry(index)?;
            return Ok(index);
        }

        let max_hops = self.entries.len() + 1;
        let mut current = index;
        for _ in 0..max_hops {
            let entry = self.entry(current)?;
            match entry.descriptor.variable_type {
                VariableType::Int32 => return Ok(current),
                VariableType::Link => current = entry.value,
            }
        }
        Err(VmFault::LinkCycle(index))
    }

    /// Number of registered variables with the given I/O behavior.
    pub fn count_with_behavior(&self, behavior: VariableIoBehavior) -> usize {
        self.entries
            .values()
            .filter(|entry| entry.descriptor.behavior == behavior)
            .count()
    }

    pub fn swap(&mut self, a: i32, b: i32) -> VmResult<()> {
        let value_a = self.raw_value(a)?;
        let value_b = self.raw_value(b)?;
        self.set_raw_value(a, value_b)?;
        self.set_raw_value(b, value_a)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_a_link_chain() {
        let mut table = VariableTable::new();
        table.register(0, VariableType::Int32);
        table.register(1, VariableType::Link);
        table.register(2, VariableType::Link);
        table.set_raw_value(1, 0).unwrap();
        table.set_raw_value(2, 1).unwrap();

        assert_eq!(table.resolve(2, true).unwrap(), 0);
    }

    #[test]
    fn detects_a_link_cycle() {
        let mut table = VariableTable::new();
        table.register(0, VariableType::Link);
        table.register(1, VariableType::Link);
        table.set_raw_value(0, 1).unwrap();
        table.set_raw_value(1, 0).unwrap();

        assert_eq!(table.resolve(0, true), Err(VmFault::LinkCycle(0)));
    }

    #[test]
    fn write_sets_changed_flag_and_probe_clears_it() {
        let mut table = VariableTable::new();
        table.register(0, VariableType::Int32);
        assert!(!table.take_changed_flag(0).unwrap());
        table.set_raw_value(0, 5).unwrap();
        assert!(table.take_changed_flag(0).unwrap());
        assert!(!table.take_changed_flag(0).unwrap());
    }

    #[test]
    fn unregistered_access_fails() {
        let table = VariableTable::new();
        assert_eq!(table.raw_value(0), Err(VmFault::UnregisteredVariable(0)));
    }
}
