use crossbeam_channel::{Receiver, Sender};

use crate::pipe_id::PipeId;

/// A bounded FIFO buffer between exactly one (pipe, output slot) pair and
/// exactly one (pipe, input slot) pair.
///
/// Backed by a `crossbeam_channel` bounded channel: the source worker
/// `try_send`s (never blocking when full, matching "the source worker stops
/// draining that slot"), and the destination worker `try_recv`s (never
/// blocking when empty). FIFO delivery within one `Connection` falls directly
/// out of the channel's own ordering guarantee.
pub(crate) struct Connection {
    pub source: PipeId,
    pub source_slot: usize,
    pub destination: PipeId,
    pub destination_slot: usize,
    pub capacity: usize,
    pub sender: Sender<Vec<u8>>,
    pub receiver: Receiver<Vec<u8>>,
}

impl Connection {
    pub fn new(
        source: PipeId,
        source_slot: usize,
        destination: PipeId,
        destination_slot: usize,
        capacity: usize,
    ) -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(capacity.max(1));
        Self {
            source,
            source_slot,
            destination,
            destination_slot,
            capacity,
            sender,
            receiver,
        }
    }
}
