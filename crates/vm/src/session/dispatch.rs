//! Fetch-decode-execute step.
//!
//! `VmSession` exposes every operation as a discrete method (the rest of
//! `session/*.rs`); this module is the one piece that reads a `Program` byte
//! sequence and calls the right method for it, so a host (CLI, pipeline worker,
//! fuzzer) can drive a whole program without knowing the opcode encoding itself.
//! Everything here funnels decode failures into the same fault path the discrete
//! methods use, so a malformed operand terminates the session exactly like an
//! out-of-range variable index would.

use beast_program::OpCode;

use crate::error::{VmFault, VmResult};
use crate::variable::{VariableIoBehavior, VariableType};

use super::VmSession;

/// Default upper bound on steps `run` will execute before forcing termination.
/// Evolved programs can loop forever without an explicit `terminate`, and a
/// pipeline worker's `execute()` must not block indefinitely, so a bound is
/// required somewhere above the single-step API.
pub const DEFAULT_MAX_STEPS: u64 = 1_000_000;

/// Return code recorded when `run`/`run_bounded` hits its step budget without the
/// program terminating itself.
pub const STEP_BUDGET_EXCEEDED_CODE: i8 = i8::MIN;

/// Outcome of a single `step()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The session is still running.
    Continued,
    /// The session terminated (explicitly, by fault, or by reaching the end of
    /// the program) with the given return code.
    Terminated(i8),
}

impl VmSession {
    fn get_bool(&mut self) -> VmResult<bool> {
        Ok(self.get_data1()? != 0)
    }

    /// Reads the opcode byte at the cursor and advances past it. Distinct from
    /// `get_data1` because opcode bytes are unsigned-by-convention lookups, not
    /// sign-extended operands.
    fn fetch_opcode(&mut self) -> VmResult<OpCode> {
        self.mark_running();
        let byte = self.program.byte_at(self.pointer).map_err(VmFault::from)?;
        let opcode =
            OpCode::try_from(byte).map_err(|_| VmFault::UnknownOpCode(self.pointer))?;
        self.pointer += 1;
        Ok(opcode)
    }

    /// Decodes and executes exactly one instruction at the cursor. Returns
    /// `StepOutcome::Terminated` if the instruction itself terminates the
    /// session, if decoding it faults, or if the cursor was already at the end
    /// of the program (an implicit `terminate(0)`, matching the common VM
    /// convention of halting cleanly on falling off the end of a script).
    pub fn step(&mut self) -> StepOutcome {
        if self.is_terminated() {
            return StepOutcome::Terminated(self.return_code);
        }
        if self.is_at_end() {
            self.terminate(0);
            return StepOutcome::Terminated(0);
        }

        let start = self.pointer;
        match self.dispatch_one() {
            Ok(()) => {
                self.executed_offsets.insert(start);
                if self.is_terminated() {
                    StepOutcome::Terminated(self.return_code)
                } else {
                    StepOutcome::Continued
                }
            }
            Err(err) => {
                self.fault(err);
                StepOutcome::Terminated(self.return_code)
            }
        }
    }

    /// Steps until termination or `max_steps` decoded instructions have run
    /// without the program terminating itself, in which case the session is
    /// force-terminated with [`STEP_BUDGET_EXCEEDED_CODE`].
    pub fn run_bounded(&mut self, max_steps: u64) -> i8 {
        let mut steps = 0u64;
        loop {
            match self.step() {
                StepOutcome::Terminated(code) => return code,
                StepOutcome::Continued => {
                    steps += 1;
                    if steps >= max_steps {
                        self.terminate(STEP_BUDGET_EXCEEDED_CODE);
                        return self.return_code;
                    }
                }
            }
        }
    }

    /// `run_bounded` with [`DEFAULT_MAX_STEPS`].
    pub fn run(&mut self) -> i8 {
        self.run_bounded(DEFAULT_MAX_STEPS)
    }

    fn dispatch_one(&mut self) -> VmResult<()> {
        let opcode = self.fetch_opcode()?;
        match opcode {
            OpCode::Nop => {
                self.dyn_noop_count += 1;
                Ok(())
            }
            OpCode::RegisterVariable => {
                let variable_index = self.get_data4()?;
                let variable_type = VariableType::from_operand(self.get_data1()?)?;
                self.register_variable(variable_index, variable_type)
            }
            OpCode::UnregisterVariable => {
                let variable_index = self.get_data4()?;
                self.unregister_variable(variable_index)
            }
            OpCode::SetVariableValue => {
                let variable_index = self.get_data4()?;
                let follow_links = self.get_bool()?;
                let value = self.get_data4()?;
                self.set_variable_value(variable_index, follow_links, value)
            }
            OpCode::SetVariableBehavior => {
                let variable_index = self.get_data4()?;
                let behavior = VariableIoBehavior::from_operand(self.get_data1()?)?;
                self.set_variable_behavior(variable_index, behavior)
            }
            OpCode::CopyVariable => {
                let source = self.get_data4()?;
                let follow_source = self.get_bool()?;
                let dest = self.get_data4()?;
                let follow_dest = self.get_bool()?;
                self.copy_variable(source, follow_source, dest, follow_dest)
            }
            OpCode::SwapVariables => {
                let a = self.get_data4()?;
                let follow_a = self.get_bool()?;
                let b = self.get_data4()?;
                let follow_b = self.get_bool()?;
                self.swap_variables(a, follow_a, b, follow_b)
            }
            OpCode::CheckIfVariableIsInput => {
                let source = self.get_data4()?;
                let follow_source = self.get_bool()?;
                let dest = self.get_data4()?;
                let follow_dest = self.get_bool()?;
                self.check_if_variable_is_input(source, follow_source, dest, follow_dest)
            }
            OpCode::CheckIfVariableIsOutput => {
                let source = self.get_data4()?;
                let follow_source = self.get_bool()?;
                let dest = self.get_data4()?;
                let follow_dest = self.get_bool()?;
                self.check_if_variable_is_output(source, follow_source, dest, follow_dest)
            }
            OpCode::CheckIfInputWasSet => {
                let source = self.get_data4()?;
                let follow_source = self.get_bool()?;
                let dest = self.get_data4()?;
                let follow_dest = self.get_bool()?;
                self.check_if_input_was_set(source, follow_source, dest, follow_dest)
            }
            OpCode::AddConstantToVariable => {
                let variable_index = self.get_data4()?;
                let constant = self.get_data4()?;
                let follow_links = self.get_bool()?;
                self.add_constant_to_variable(variable_index, constant, follow_links)
            }
            OpCode::SubtractConstantFromVariable => {
                let variable_index = self.get_data4()?;
                let constant = self.get_data4()?;
                let follow_links = self.get_bool()?;
                self.subtract_constant_from_variable(variable_index, constant, follow_links)
            }
            OpCode::AddVariableToVariable => {
                let source = self.get_data4()?;
                let follow_source = self.get_bool()?;
                let dest = self.get_data4()?;
                let follow_dest = self.get_bool()?;
                self.add_variable_to_variable(source, follow_source, dest, follow_dest)
            }
            OpCode::SubtractVariableFromVariable => {
                let source = self.get_data4()?;
                let follow_source = self.get_bool()?;
                let dest = self.get_data4()?;
                let follow_dest = self.get_bool()?;
                self.subtract_variable_from_variable(source, follow_source, dest, follow_dest)
            }
            OpCode::BitwiseAndTwoVariables => {
                let a = self.get_data4()?;
                let follow_a = self.get_bool()?;
                let b = self.get_data4()?;
                let follow_b = self.get_bool()?;
                self.bitwise_and_two_variables(a, follow_a, b, follow_b)
            }
            OpCode::BitwiseOrTwoVariables => {
                let a = self.get_data4()?;
                let follow_a = self.get_bool()?;
                let b = self.get_data4()?;
                let follow_b = self.get_bool()?;
                self.bitwise_or_two_variables(a, follow_a, b, follow_b)
            }
            OpCode::BitwiseXorTwoVariables => {
                let a = self.get_data4()?;
                let follow_a = self.get_bool()?;
                let b = self.get_data4()?;
                let follow_b = self.get_bool()?;
                self.bitwise_xor_two_variables(a, follow_a, b, follow_b)
            }
            OpCode::BitwiseInvertVariable => {
                let variable_index = self.get_data4()?;
                let follow_links = self.get_bool()?;
                self.bitwise_invert_variable(variable_index, follow_links)
            }
            OpCode::BitShiftVariable => {
                let variable_index = self.get_data4()?;
                let follow_links = self.get_bool()?;
                let places = self.get_data2()?;
                self.bit_shift_variable(variable_index, follow_links, places)
            }
            OpCode::VariableBitShiftVariableLeft => {
                let variable_index = self.get_data4()?;
                let follow_links = self.get_bool()?;
                let places_variable_index = self.get_data4()?;
                let places_follow_links = self.get_bool()?;
                self.variable_bit_shift_variable_left(
                    variable_index,
                    follow_links,
                    places_variable_index,
                    places_follow_links,
                )
            }
            OpCode::VariableBitShiftVariableRight => {
                let variable_index = self.get_data4()?;
                let follow_links = self.get_bool()?;
                let places_variable_index = self.get_data4()?;
                let places_follow_links = self.get_bool()?;
                self.variable_bit_shift_variable_right(
                    variable_index,
                    follow_links,
                    places_variable_index,
                    places_follow_links,
                )
            }
            OpCode::RotateVariable => {
                let variable_index = self.get_data4()?;
                let follow_links = self.get_bool()?;
                let places = self.get_data2()?;
                self.rotate_variable(variable_index, follow_links, places)
            }
            OpCode::VariableRotateVariableLeft => {
                let variable_index = self.get_data4()?;
                let follow_links = self.get_bool()?;
                let places_variable_index = self.get_data4()?;
                let places_follow_links = self.get_bool()?;
                self.variable_rotate_variable_left(
                    variable_index,
                    follow_links,
                    places_variable_index,
                    places_follow_links,
                )
            }
            OpCode::VariableRotateVariableRight => {
                let variable_index = self.get_data4()?;
                let follow_links = self.get_bool()?;
                let places_variable_index = self.get_data4()?;
                let places_follow_links = self.get_bool()?;
                self.variable_rotate_variable_right(
                    variable_index,
                    follow_links,
                    places_variable_index,
                    places_follow_links,
                )
            }
            OpCode::ModuloVariableByConstant => {
                let variable_index = self.get_data4()?;
                let follow_links = self.get_bool()?;
                let constant = self.get_data4()?;
                self.modulo_variable_by_constant(variable_index, follow_links, constant)
            }
            OpCode::ModuloVariableByVariable => {
                let variable_index = self.get_data4()?;
                let follow_links = self.get_bool()?;
                let modulo_variable_index = self.get_data4()?;
                let modulo_follow_links = self.get_bool()?;
                self.modulo_variable_by_variable(
                    variable_index,
                    follow_links,
                    modulo_variable_index,
                    modulo_follow_links,
                )
            }
            OpCode::RelativeJumpToAddressIfVariableGt0 => {
                let condition_variable = self.get_data4()?;
                let follow_condition_links = self.get_bool()?;
                let addr = self.get_data4()?;
                self.relative_jump_to_address_if_variable_gt0(
                    condition_variable,
                    follow_condition_links,
                    addr,
                )
            }
            OpCode::RelativeJumpToAddressIfVariableLt0 => {
                let condition_variable = self.get_data4()?;
                let follow_condition_links = self.get_bool()?;
                let addr = self.get_data4()?;
                self.relative_jump_to_address_if_variable_lt0(
                    condition_variable,
                    follow_condition_links,
                    addr,
                )
            }
            OpCode::RelativeJumpToAddressIfVariableEq0 => {
                let condition_variable = self.get_data4()?;
                let follow_condition_links = self.get_bool()?;
                let addr = self.get_data4()?;
                self.relative_jump_to_address_if_variable_eq0(
                    condition_variable,
                    follow_condition_links,
                    addr,
                )
            }
            OpCode::AbsoluteJumpToAddressIfVariableGt0 => {
                let condition_variable = self.get_data4()?;
                let follow_condition_links = self.get_bool()?;
                let addr = self.get_data4()?;
                self.absolute_jump_to_address_if_variable_gt0(
                    condition_variable,
                    follow_condition_links,
                    addr,
                )
            }
            OpCode::AbsoluteJumpToAddressIfVariableLt0 => {
                let condition_variable = self.get_data4()?;
                let follow_condition_links = self.get_bool()?;
                let addr = self.get_data4()?;
                self.absolute_jump_to_address_if_variable_lt0(
                    condition_variable,
                    follow_condition_links,
                    addr,
                )
            }
            OpCode::AbsoluteJumpToAddressIfVariableEq0 => {
                let condition_variable = self.get_data4()?;
                let follow_condition_links = self.get_bool()?;
                let addr = self.get_data4()?;
                self.absolute_jump_to_address_if_variable_eq0(
                    condition_variable,
                    follow_condition_links,
                    addr,
                )
            }
            OpCode::RelativeJumpToVariableAddressIfVariableGt0 => {
                let condition_variable = self.get_data4()?;
                let follow_condition_links = self.get_bool()?;
                let addr_variable = self.get_data4()?;
                let follow_addr_links = self.get_bool()?;
                self.relative_jump_to_variable_address_if_variable_gt0(
                    condition_variable,
                    follow_condition_links,
                    addr_variable,
                    follow_addr_links,
                )
            }
            OpCode::RelativeJumpToVariableAddressIfVariableLt0 => {
                let condition_variable = self.get_data4()?;
                let follow_condition_links = self.get_bool()?;
                let addr_variable = self.get_data4()?;
                let follow_addr_links = self.get_bool()?;
                self.relative_jump_to_variable_address_if_variable_lt0(
                    condition_variable,
                    follow_condition_links,
                    addr_variable,
                    follow_addr_links,
                )
            }
            OpCode::RelativeJumpToVariableAddressIfVariableEq0 => {
                let condition_variable = self.get_data4()?;
                let follow_condition_links = self.get_bool()?;
                let addr_variable = self.get_data4()?;
                let follow_addr_links = self.get_bool()?;
                self.relative_jump_to_variable_address_if_variable_eq0(
                    condition_variable,
                    follow_condition_links,
                    addr_variable,
                    follow_addr_links,
                )
            }
            OpCode::AbsoluteJumpToVariableAddressIfVariableGt0 => {
                let condition_variable = self.get_data4()?;
                let follow_condition_links = self.get_bool()?;
                let addr_variable = self.get_data4()?;
                let follow_addr_links = self.get_bool()?;
                self.absolute_jump_to_variable_address_if_variable_gt0(
                    condition_variable,
                    follow_condition_links,
                    addr_variable,
                    follow_addr_links,
                )
            }
            OpCode::AbsoluteJumpToVariableAddressIfVariableLt0 => {
                let condition_variable = self.get_data4()?;
                let follow_condition_links = self.get_bool()?;
                let addr_variable = self.get_data4()?;
                let follow_addr_links = self.get_bool()?;
                self.absolute_jump_to_variable_address_if_variable_lt0(
                    condition_variable,
                    follow_condition_links,
                    addr_variable,
                    follow_addr_links,
                )
            }
            OpCode::AbsoluteJumpToVariableAddressIfVariableEq0 => {
                let condition_variable = self.get_data4()?;
                let follow_condition_links = self.get_bool()?;
                let addr_variable = self.get_data4()?;
                let follow_addr_links = self.get_bool()?;
                self.absolute_jump_to_variable_address_if_variable_eq0(
                    condition_variable,
                    follow_condition_links,
                    addr_variable,
                    follow_addr_links,
                )
            }
            OpCode::UnconditionalJumpToAbsoluteAddress => {
                let addr = self.get_data4()?;
                self.unconditional_jump_to_absolute_address(addr)
            }
            OpCode::UnconditionalJumpToRelativeAddress => {
                let addr = self.get_data4()?;
                self.unconditional_jump_to_relative_address(addr)
            }
            OpCode::UnconditionalJumpToAbsoluteVariableAddress => {
                let variable_index = self.get_data4()?;
                let follow_links = self.get_bool()?;
                self.unconditional_jump_to_absolute_variable_address(variable_index, follow_links)
            }
            OpCode::UnconditionalJumpToRelativeVariableAddress => {
                let variable_index = self.get_data4()?;
                let follow_links = self.get_bool()?;
                self.unconditional_jump_to_relative_variable_address(variable_index, follow_links)
            }
            OpCode::LoadMemorySizeIntoVariable => {
                let variable = self.get_data4()?;
                let follow_links = self.get_bool()?;
                self.load_memory_size_into_variable(variable, follow_links)
            }
            OpCode::LoadInputCountIntoVariable => {
                let variable = self.get_data4()?;
                let follow_links = self.get_bool()?;
                self.load_input_count_into_variable(variable, follow_links)
            }
            OpCode::LoadOutputCountIntoVariable => {
                let variable = self.get_data4()?;
                let follow_links = self.get_bool()?;
                self.load_output_count_into_variable(variable, follow_links)
            }
            OpCode::LoadCurrentAddressIntoVariable => {
                let variable = self.get_data4()?;
                let follow_links = self.get_bool()?;
                self.load_current_address_into_variable(variable, follow_links)
            }
            OpCode::LoadStringTableLimitIntoVariable => {
                let variable_index = self.get_data4()?;
                let follow_links = self.get_bool()?;
                self.load_string_table_limit_into_variable(variable_index, follow_links)
            }
            OpCode::LoadStringTableItemLengthLimitIntoVariable => {
                let variable_index = self.get_data4()?;
                let follow_links = self.get_bool()?;
                self.load_string_table_item_length_limit_into_variable(variable_index, follow_links)
            }
            OpCode::LoadRandomValueIntoVariable => {
                let variable_index = self.get_data4()?;
                let follow_links = self.get_bool()?;
                self.load_random_value_into_variable(variable_index, follow_links)
            }
            OpCode::LoadStringItemLengthIntoVariable => {
                let string_table_index = self.get_data4()?;
                let variable_index = self.get_data4()?;
                let follow_links = self.get_bool()?;
                self.load_string_item_length_into_variable(string_table_index, variable_index, follow_links)
            }
            OpCode::LoadStringItemIntoVariables => {
                let string_table_index = self.get_data4()?;
                let start_variable_index = self.get_data4()?;
                let follow_links = self.get_bool()?;
                self.load_string_item_into_variables(string_table_index, start_variable_index, follow_links)
            }
            OpCode::LoadVariableStringItemLengthIntoVariable => {
                let string_item_variable_index = self.get_data4()?;
                let string_item_follow_links = self.get_bool()?;
                let variable_index = self.get_data4()?;
                let follow_links = self.get_bool()?;
                self.load_variable_string_item_length_into_variable(
                    string_item_variable_index,
                    string_item_follow_links,
                    variable_index,
                    follow_links,
                )
            }
            OpCode::LoadVariableStringItemIntoVariables => {
                let string_item_variable_index = self.get_data4()?;
                let string_item_follow_links = self.get_bool()?;
                let variable_index = self.get_data4()?;
                let follow_links = self.get_bool()?;
                self.load_variable_string_item_into_variables(
                    string_item_variable_index,
                    string_item_follow_links,
                    variable_index,
                    follow_links,
                )
            }
            OpCode::PrintVariableStringFromStringTable => {
                let variable_index = self.get_data4()?;
                let follow_links = self.get_bool()?;
                self.print_variable_string_from_string_table(variable_index, follow_links)
            }
            OpCode::AppendVariableToPrintBuffer => {
                let variable_index = self.get_data4()?;
                let follow_links = self.get_bool()?;
                let as_char = self.get_bool()?;
                self.append_variable_to_print_buffer(variable_index, follow_links, as_char)
            }
            OpCode::ClearPrintBuffer => {
                self.clear_print_buffer();
                Ok(())
            }
            OpCode::PushVariableOnStack => {
                let stack_variable_index = self.get_data4()?;
                let stack_follow_links = self.get_bool()?;
                let variable_index = self.get_data4()?;
                let follow_links = self.get_bool()?;
                self.push_variable_on_stack(
                    stack_variable_index,
                    stack_follow_links,
                    variable_index,
                    follow_links,
                )
            }
            OpCode::PushConstantOnStack => {
                let stack_variable_index = self.get_data4()?;
                let stack_follow_links = self.get_bool()?;
                let constant = self.get_data4()?;
                self.push_constant_on_stack(stack_variable_index, stack_follow_links, constant)
            }
            OpCode::PopVariableFromStack => {
                let stack_variable_index = self.get_data4()?;
                let stack_follow_links = self.get_bool()?;
                let variable_index = self.get_data4()?;
                let follow_links = self.get_bool()?;
                self.pop_variable_from_stack(
                    stack_variable_index,
                    stack_follow_links,
                    variable_index,
                    follow_links,
                )
            }
            OpCode::PopFromStack => {
                let stack_variable_index = self.get_data4()?;
                let stack_follow_links = self.get_bool()?;
                self.pop_from_stack(stack_variable_index, stack_follow_links)
            }
            OpCode::CheckIfStackIsEmpty => {
                let stack_variable_index = self.get_data4()?;
                let stack_follow_links = self.get_bool()?;
                let variable_index = self.get_data4()?;
                let follow_links = self.get_bool()?;
                self.check_if_stack_is_empty(
                    stack_variable_index,
                    stack_follow_links,
                    variable_index,
                    follow_links,
                )
            }
            OpCode::PerformSystemCall => {
                let major_code = self.get_data1()?;
                let minor_code = self.get_data1()?;
                let variable_index = self.get_data4()?;
                let follow_links = self.get_bool()?;
                self.perform_system_call(major_code, minor_code, variable_index, follow_links)
            }
            OpCode::Terminate => {
                let return_code = self.get_data1()?;
                self.terminate(return_code);
                Ok(())
            }
            OpCode::TerminateWithVariableReturnCode => {
                let variable_index = self.get_data4()?;
                let follow_links = self.get_bool()?;
                self.terminate_with_variable_return_code(variable_index, follow_links)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beast_program::Program;

    fn assemble(ops: &[(OpCode, &[&[u8]])]) -> Vec<u8> {
        let mut bytes = Vec::new();
        for (op, operands) in ops {
            bytes.push(*op as u8);
            for operand in *operands {
                bytes.extend_from_slice(operand);
            }
        }
        bytes
    }

    /// Add a constant, print it, terminate.
    #[test]
    fn add_print_terminate_scenario() {
        let program = assemble(&[
            (OpCode::RegisterVariable, &[&0i32.to_le_bytes(), &[0]]),
            (
                OpCode::AddConstantToVariable,
                &[&0i32.to_le_bytes(), &42i32.to_le_bytes(), &[0]],
            ),
            (
                OpCode::AppendVariableToPrintBuffer,
                &[&0i32.to_le_bytes(), &[0], &[0]],
            ),
            (OpCode::Terminate, &[&[0]]),
        ]);
        let mut session = VmSession::with_seed(Program::new(program), 4, 1, 1, 1);
        let code = session.run();
        assert_eq!(session.print_buffer(), "42");
        assert_eq!(code, 0);
        assert!(session.was_terminated());
    }

    /// A link chain write affects the underlying cell.
    #[test]
    fn link_chain_scenario() {
        let program = assemble(&[
            (OpCode::RegisterVariable, &[&0i32.to_le_bytes(), &[0]]),
            (OpCode::RegisterVariable, &[&1i32.to_le_bytes(), &[1]]),
            (
                OpCode::SetVariableValue,
                &[&0i32.to_le_bytes(), &[0], &7i32.to_le_bytes()],
            ),
            (
                OpCode::SetVariableValue,
                &[&1i32.to_le_bytes(), &[0], &0i32.to_le_bytes()],
            ),
            (
                OpCode::SetVariableValue,
                &[&1i32.to_le_bytes(), &[1], &11i32.to_le_bytes()],
            ),
            (OpCode::Terminate, &[&[0]]),
        ]);
        let mut session = VmSession::with_seed(Program::new(program), 4, 1, 1, 1);
        session.run();
        assert_eq!(session.get_variable_value(0, false).unwrap(), 11);
    }

    /// An unconditional relative jump skips a terminate(1) and lands on a
    /// terminate(0).
    #[test]
    fn unconditional_relative_jump_scenario() {
        let jump_over = OpCode::Terminate.instruction_size() as i32;
        let program = assemble(&[
            (
                OpCode::UnconditionalJumpToRelativeAddress,
                &[&jump_over.to_le_bytes()],
            ),
            (OpCode::Terminate, &[&[1]]),
            (OpCode::Terminate, &[&[0]]),
        ]);
        let mut session = VmSession::with_seed(Program::new(program), 1, 1, 1, 1);
        let code = session.run();
        assert_eq!(code, 0);
    }

    #[test]
    fn reaching_program_end_implicitly_terminates_zero() {
        let program = assemble(&[(OpCode::Nop, &[])]);
        let mut session = VmSession::with_seed(Program::new(program), 1, 1, 1, 1);
        let code = session.run();
        assert_eq!(code, 0);
        assert_eq!(session.dyn_noop_count(), 1);
    }

    #[test]
    fn unknown_opcode_faults_and_terminates() {
        let mut session = VmSession::with_seed(Program::new(vec![0xFFu8]), 1, 1, 1, 1);
        let outcome = session.step();
        assert!(matches!(outcome, StepOutcome::Terminated(_)));
        assert!(session.was_terminated());
        assert_ne!(session.return_code(), 0);
    }

    #[test]
    fn runaway_loop_is_bounded() {
        // Jump to self forever.
        let program = assemble(&[(OpCode::UnconditionalJumpToRelativeAddress, &[&0i32.to_le_bytes()])]);
        let mut session = VmSession::with_seed(Program::new(program), 1, 1, 1, 1);
        let code = session.run_bounded(10);
        assert_eq!(code, STEP_BUDGET_EXCEEDED_CODE);
    }

    #[test]
    fn executed_offsets_track_program_coverage() {
        let program = assemble(&[(OpCode::Nop, &[]), (OpCode::Nop, &[]), (OpCode::Terminate, &[&[0]])]);
        let mut session = VmSession::with_seed(Program::new(program), 1, 1, 1, 1);
        session.run();
        assert_eq!(session.executed_offset_count(), 3);
    }

    #[test]
    fn register_variable_rejects_invalid_type_byte() {
        let program = assemble(&[(OpCode::RegisterVariable, &[&0i32.to_le_bytes(), &[9]])]);
        let mut session = VmSession::with_seed(Program::new(program), 1, 1, 1, 1);
        session.run();
        assert!(session.was_terminated());
        assert_eq!(session.registered_variable_count(), 0);
    }
}
