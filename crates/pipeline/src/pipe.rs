use crate::error::PipelineResult;

/// A staged compute node with a fixed number of input and output slots. A
/// `Pipe` owns whatever state it needs between `execute()` calls;
/// the `Pipeline` worker loop is the only caller of every method here, always
/// from the single OS thread assigned to that pipe.
///
/// `execute()` must not block: if a stage needs to wait for more input, it
/// simply returns without having done anything and is polled again next
/// cycle.
pub trait Pipe {
    /// Number of input slots, `N_in`.
    fn input_slot_count(&self) -> usize;

    /// Number of output slots, `N_out`.
    fn output_slot_count(&self) -> usize;

    /// `true` when at least one input slot can currently accept more data.
    fn has_space(&self) -> bool;

    /// `true` when `slot` currently holds an output datum ready to draw.
    fn has_output(&self, slot: usize) -> bool;

    /// `true` when the stage judges it has enough input queued to run.
    /// Stage-defined; typically "every required input slot is filled".
    fn inputs_are_saturated(&self) -> bool;

    /// `true` when running further would overfill this stage's outputs.
    fn outputs_are_saturated(&self) -> bool;

    /// Enqueues `datum` onto `slot`. Fails if the slot is saturated or does
    /// not exist.
    fn add_input(&mut self, slot: usize, datum: Vec<u8>) -> PipelineResult<()>;

    /// Removes and returns the datum waiting on `slot`. Fails if none is
    /// available or the slot does not exist.
    fn draw_output(&mut self, slot: usize) -> PipelineResult<Vec<u8>>;

    /// Performs one unit of work. May read any subset of available inputs and
    /// write any subset of outputs. Must not block.
    fn execute(&mut self);
}
