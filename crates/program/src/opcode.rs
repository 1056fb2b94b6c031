//! OpCode module for the BEAST virtual machine.
//!
//! Every variant here corresponds 1:1 to a mutating `VmSession` operation. Pure
//! accessors (`getVariableValue`, `isAtEnd`, ...) have no opcode: they are part of
//! the embedding API only, driven directly by a host rather than encoded in a
//! Program. Operations that would need to embed a variable-length string inline
//! (`setStringTableEntry`, `setVariableStringTableEntry`, `appendToPrintBuffer`) are
//! excluded for the same reason — the operand model only supports fixed 1/2/4 byte
//! widths, so string table population is a host-side setup call, not a bytecode op.

use crate::error::ProgramError;

/// Width of a single decoded operand field, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandWidth {
    One,
    Two,
    Four,
}

impl OperandWidth {
    pub fn len_bytes(self) -> usize {
        match self {
            OperandWidth::One => 1,
            OperandWidth::Two => 2,
            OperandWidth::Four => 4,
        }
    }
}

/// The full BEAST instruction set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    /// Explicit no-operation; counted both statically and dynamically by
    /// `RuntimeStatisticsEvaluator`.
    Nop = 0,
    RegisterVariable = 1,
    UnregisterVariable = 2,
    SetVariableValue = 3,
    SetVariableBehavior = 4,
    CopyVariable = 5,
    SwapVariables = 6,
    CheckIfVariableIsInput = 7,
    CheckIfVariableIsOutput = 8,
    CheckIfInputWasSet = 9,
    AddConstantToVariable = 10,
    SubtractConstantFromVariable = 11,
    AddVariableToVariable = 12,
    SubtractVariableFromVariable = 13,
    BitwiseAndTwoVariables = 14,
    BitwiseOrTwoVariables = 15,
    BitwiseXorTwoVariables = 16,
    BitwiseInvertVariable = 17,
    BitShiftVariable = 18,
    VariableBitShiftVariableLeft = 19,
    VariableBitShiftVariableRight = 20,
    RotateVariable = 21,
    VariableRotateVariableLeft = 22,
    VariableRotateVariableRight = 23,
    ModuloVariableByConstant = 24,
    ModuloVariableByVariable = 25,
    RelativeJumpToAddressIfVariableGt0 = 26,
    RelativeJumpToAddressIfVariableLt0 = 27,
    RelativeJumpToAddressIfVariableEq0 = 28,
    AbsoluteJumpToAddressIfVariableGt0 = 29,
    AbsoluteJumpToAddressIfVariableLt0 = 30,
    AbsoluteJumpToAddressIfVariableEq0 = 31,
    RelativeJumpToVariableAddressIfVariableGt0 = 32,
    RelativeJumpToVariableAddressIfVariableLt0 = 33,
    RelativeJumpToVariableAddressIfVariableEq0 = 34,
    AbsoluteJumpToVariableAddressIfVariableGt0 = 35,
    AbsoluteJumpToVariableAddressIfVariableLt0 = 36,
    AbsoluteJumpToVariableAddressIfVariableEq0 = 37,
    UnconditionalJumpToAbsoluteAddress = 38,
    UnconditionalJumpToRelativeAddress = 39,
    UnconditionalJumpToAbsoluteVariableAddress = 40,
    UnconditionalJumpToRelativeVariableAddress = 41,
    LoadMemorySizeIntoVariable = 42,
    LoadInputCountIntoVariable = 43,
    LoadOutputCountIntoVariable = 44,
    LoadCurrentAddressIntoVariable = 45,
    LoadStringTableLimitIntoVariable = 46,
    LoadStringTableItemLengthLimitIntoVariable = 47,
    LoadRandomValueIntoVariable = 48,
    LoadStringItemLengthIntoVariable = 49,
    LoadStringItemIntoVariables = 50,
    LoadVariableStringItemLengthIntoVariable = 51,
    LoadVariableStringItemIntoVariables = 52,
    PrintVariableStringFromStringTable = 53,
    AppendVariableToPrintBuffer = 54,
    ClearPrintBuffer = 55,
    PushVariableOnStack = 56,
    PushConstantOnStack = 57,
    PopVariableFromStack = 58,
    PopFromStack = 59,
    CheckIfStackIsEmpty = 60,
    PerformSystemCall = 61,
    Terminate = 62,
    TerminateWithVariableReturnCode = 63,
}

impl OpCode {
    /// The operand layout for this opcode, in decode order.
    pub fn operand_layout(self) -> &'static [OperandWidth] {
        use OperandWidth::{Four as F, One as O, Two as T};
        match self {
            OpCode::Nop => &[],
            OpCode::RegisterVariable => &[F, O],
            OpCode::UnregisterVariable => &[F],
            OpCode::SetVariableValue => &[F, O, F],
            OpCode::SetVariableBehavior => &[F, O],
            OpCode::CopyVariable => &[F, O, F, O],
            OpCode::SwapVariables => &[F, O, F, O],
            OpCode::CheckIfVariableIsInput => &[F, O, F, O],
            OpCode::CheckIfVariableIsOutput => &[F, O, F, O],
            OpCode::CheckIfInputWasSet => &[F, O, F, O],
            OpCode::AddConstantToVariable => &[F, F, O],
            OpCode::SubtractConstantFromVariable => &[F, F, O],
            OpCode::AddVariableToVariable => &[F, O, F, O],
            OpCode::SubtractVariableFromVariable => &[F, O, F, O],
            OpCode::BitwiseAndTwoVariables => &[F, O, F, O],
            OpCode::BitwiseOrTwoVariables => &[F, O, F, O],
            OpCode::BitwiseXorTwoVariables => &[F, O, F, O],
            OpCode::BitwiseInvertVariable => &[F, O],
            OpCode::BitShiftVariable => &[F, O, T],
            OpCode::VariableBitShiftVariableLeft => &[F, O, F, O],
            OpCode::VariableBitShiftVariableRight => &[F, O, F, O],
            OpCode::RotateVariable => &[F, O, T],
            OpCode::VariableRotateVariableLeft => &[F, O, F, O],
            OpCode::VariableRotateVariableRight => &[F, O, F, O],
            OpCode::ModuloVariableByConstant => &[F, O, F],
            OpCode::ModuloVariableByVariable => &[F, O, F, O],
            OpCode::RelativeJumpToAddressIfVariableGt0 => &[F, O, F],
            OpCode::RelativeJumpToAddressIfVariableLt0 => &[F, O, F],
            OpCode::RelativeJumpToAddressIfVariableEq0 => &[F, O, F],
            OpCode::AbsoluteJumpToAddressIfVariableGt0 => &[F, O, F],
            OpCode::AbsoluteJumpToAddressIfVariableLt0 => &[F, O, F],
            OpCode::AbsoluteJumpToAddressIfVariableEq0 => &[F, O, F],
            OpCode::RelativeJumpToVariableAddressIfVariableGt0 => &[F, O, F, O],
            OpCode::RelativeJumpToVariableAddressIfVariableLt0 => &[F, O, F, O],
            OpCode::RelativeJumpToVariableAddressIfVariableEq0 => &[F, O, F, O],
            OpCode::AbsoluteJumpToVariableAddressIfVariableGt0 => &[F, O, F, O],
            OpCode::AbsoluteJumpToVariableAddressIfVariableLt0 => &[F, O, F, O],
            OpCode::AbsoluteJumpToVariableAddressIfVariableEq0 => &[F, O, F, O],
            OpCode::UnconditionalJumpToAbsoluteAddress => &[F],
            OpCode::UnconditionalJumpToRelativeAddress => &[F],
            OpCode::UnconditionalJumpToAbsoluteVariableAddress => &[F, O],
            OpCode::UnconditionalJumpToRelativeVariableAddress => &[F, O],
            OpCode::LoadMemorySizeIntoVariable => &[F, O],
            OpCode::LoadInputCountIntoVariable => &[F, O],
            OpCode::LoadOutputCountIntoVariable => &[F, O],
            OpCode::LoadCurrentAddressIntoVariable => &[F, O],
            OpCode::LoadStringTableLimitIntoVariable => &[F, O],
            OpCode::LoadStringTableItemLengthLimitIntoVariable => &[F, O],
            OpCode::LoadRandomValueIntoVariable => &[F, O],
            OpCode::LoadStringItemLengthIntoVariable => &[F, F, O],
            OpCode::LoadStringItemIntoVariables => &[F, F, O],
            OpCode::LoadVariableStringItemLengthIntoVariable => &[F, O, F, O],
            OpCode::LoadVariableStringItemIntoVariables => &[F, O, F, O],
            OpCode::PrintVariableStringFromStringTable => &[F, O],
            OpCode::AppendVariableToPrintBuffer => &[F, O, O],
            OpCode::ClearPrintBuffer => &[],
            OpCode::PushVariableOnStack => &[F, O, F, O],
            OpCode::PushConstantOnStack => &[F, O, F],
            OpCode::PopVariableFromStack => &[F, O, F, O],
            OpCode::PopFromStack => &[F, O],
            OpCode::CheckIfStackIsEmpty => &[F, O, F, O],
            OpCode::PerformSystemCall => &[O, O, F, O],
            OpCode::Terminate => &[O],
            OpCode::TerminateWithVariableReturnCode => &[F, O],
        }
    }

    /// Total operand size in bytes for this opcode.
    pub fn operand_size(self) -> usize {
        self.operand_layout().iter().map(|w| w.len_bytes()).sum()
    }

    /// Total instruction size (opcode byte + operands) in bytes.
    pub fn instruction_size(self) -> usize {
        1 + self.operand_size()
    }

    /// `true` for the `Nop` opcode; used by static no-op counting.
    pub fn is_noop(self) -> bool {
        matches!(self, OpCode::Nop)
    }
}

impl TryFrom<u8> for OpCode {
    type Error = ProgramError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        use OpCode::*;
        Ok(match byte {
            0 => Nop,
            1 => RegisterVariable,
            2 => UnregisterVariable,
            3 => SetVariableValue,
            4 => SetVariableBehavior,
            5 => CopyVariable,
            6 => SwapVariables,
            7 => CheckIfVariableIsInput,
            8 => CheckIfVariableIsOutput,
            9 => CheckIfInputWasSet,
            10 => AddConstantToVariable,
            11 => SubtractConstantFromVariable,
            12 => AddVariableToVariable,
            13 => SubtractVariableFromVariable,
            14 => BitwiseAndTwoVariables,
            15 => BitwiseOrTwoVariables,
            16 => BitwiseXorTwoVariables,
            17 => BitwiseInvertVariable,
            18 => BitShiftVariable,
            19 => VariableBitShiftVariableLeft,
            20 => VariableBitShiftVariableRight,
            21 => RotateVariable,
            22 => VariableRotateVariableLeft,
            23 => VariableRotateVariableRight,
            24 => ModuloVariableByConstant,
            25 => ModuloVariableByVariable,
            26 => RelativeJumpToAddressIfVariableGt0,
            27 => RelativeJumpToAddressIfVariableLt0,
            28 => RelativeJumpToAddressIfVariableEq0,
            29 => AbsoluteJumpToAddressIfVariableGt0,
            30 => AbsoluteJumpToAddressIfVariableLt0,
            31 => AbsoluteJumpToAddressIfVariableEq0,
            32 => RelativeJumpToVariableAddressIfVariableGt0,
            33 => RelativeJumpToVariableAddressIfVariableLt0,
            34 => RelativeJumpToVariableAddressIfVariableEq0,
            35 => AbsoluteJumpToVariableAddressIfVariableGt0,
            36 => AbsoluteJumpToVariableAddressIfVariableLt0,
            37 => AbsoluteJumpToVariableAddressIfVariableEq0,
            38 => UnconditionalJumpToAbsoluteAddress,
            39 => UnconditionalJumpToRelativeAddress,
            40 => UnconditionalJumpToAbsoluteVariableAddress,
            41 => UnconditionalJumpToRelativeVariableAddress,
            42 => LoadMemorySizeIntoVariable,
            43 => LoadInputCountIntoVariable,
            44 => LoadOutputCountIntoVariable,
            45 => LoadCurrentAddressIntoVariable,
            46 => LoadStringTableLimitIntoVariable,
            47 => LoadStringTableItemLengthLimitIntoVariable,
            48 => LoadRandomValueIntoVariable,
            49 => LoadStringItemLengthIntoVariable,
            50 => LoadStringItemIntoVariables,
            51 => LoadVariableStringItemLengthIntoVariable,
            52 => LoadVariableStringItemIntoVariables,
            53 => PrintVariableStringFromStringTable,
            54 => AppendVariableToPrintBuffer,
            55 => ClearPrintBuffer,
            56 => PushVariableOnStack,
            57 => PushConstantOnStack,
            58 => PopVariableFromStack,
            59 => PopFromStack,
            60 => CheckIfStackIsEmpty,
            61 => PerformSystemCall,
            62 => Terminate,
            63 => TerminateWithVariableReturnCode,
            other => return Err(ProgramError::UnknownOpCode { opcode: other, offset: 0 }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_discriminant() {
        for byte in 0u8..=63 {
            let op = OpCode::try_from(byte).expect("all 0..=63 are valid opcodes");
            assert_eq!(op as u8, byte);
        }
    }

    #[test]
    fn rejects_unknown_opcode() {
        assert!(OpCode::try_from(64).is_err());
    }

    #[test]
    fn instruction_size_includes_opcode_byte() {
        assert_eq!(OpCode::Nop.instruction_size(), 1);
        assert_eq!(OpCode::Terminate.instruction_size(), 2);
        assert_eq!(OpCode::SetVariableValue.instruction_size(), 1 + 4 + 1 + 4);
    }

    #[test]
    fn exercises_all_three_operand_widths() {
        let widths: std::collections::HashSet<_> = OpCode::BitShiftVariable
            .operand_layout()
            .iter()
            .copied()
            .chain(OpCode::Terminate.operand_layout().iter().copied())
            .chain(OpCode::SetVariableValue.operand_layout().iter().copied())
            .collect();
        assert!(widths.contains(&OperandWidth::One));
        assert!(widths.contains(&OperandWidth::Two));
        assert!(widths.contains(&OperandWidth::Four));
    }
}
