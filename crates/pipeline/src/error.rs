use crate::pipe_id::PipeId;

/// Errors raised by the `Pipe` contract and the `Pipeline` topology/lifecycle
/// API: *invalid-argument* (occupied port, unknown pipe), *state-violation*
/// (start while running, stop while stopped, mutating topology while
/// running), *capacity-exceeded* (saturated input, empty output), surfaced
/// synchronously to the caller as `Result`s rather than through panics.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("pipe {0:?} is not part of this pipeline")]
    UnknownPipe(PipeId),

    #[error("pipe {pipe:?} has no input slot {slot} (it has {available})")]
    InvalidInputSlot {
        pipe: PipeId,
        slot: usize,
        available: usize,
    },

    #[error("pipe {pipe:?} has no output slot {slot} (it has {available})")]
    InvalidOutputSlot {
        pipe: PipeId,
        slot: usize,
        available: usize,
    },

    #[error("input slot {slot} on pipe {pipe:?} is already connected")]
    InputSlotOccupied { pipe: PipeId, slot: usize },

    #[error("output slot {slot} on pipe {pipe:?} is already connected")]
    OutputSlotOccupied { pipe: PipeId, slot: usize },

    #[error("the pipeline is already running")]
    AlreadyRunning,

    #[error("the pipeline is not running")]
    NotRunning,

    #[error("topology cannot change while the pipeline is running")]
    RunningTopologyMutation,

    #[error("pipe {pipe:?} worker failed: {message}")]
    WorkerFailed { pipe: PipeId, message: String },

    #[error("slot index {0} does not exist on this pipe")]
    InvalidSlotIndex(usize),

    #[error("input slot {0} is saturated")]
    InputSaturated(usize),

    #[error("output slot {0} has no data available")]
    OutputEmpty(usize),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
