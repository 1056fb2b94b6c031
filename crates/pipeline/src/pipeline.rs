//! The `Pipeline` runtime: owns a set of `Pipe`s and the `Connection`s
//! between them, and drives each `Pipe` on its own worker thread.
//!
//! The `Pipeline` is the sole owner of every `Pipe`, held in an arena
//! (`Vec<Mutex<Box<dyn Pipe + Send>>>`)
//! addressed by stable `PipeId`s. While running, the arena is shared with the
//! worker threads behind an `Arc`; each worker locks only its own slot, so
//! there is never contention between stages. `stop` joins every worker and
//! reclaims the arena back into the `Pipeline`, so topology is always plain,
//! directly-owned data while stopped.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use crate::connection::Connection;
use crate::error::{PipelineError, PipelineResult};
use crate::pipe::Pipe;
use crate::pipe_id::PipeId;

/// Default worker cycle quantum: sleep between polls of a pipe. Spec §4.E /
/// §9: "the cycle quantum must not exceed 10 ms by default."
pub const DEFAULT_CYCLE_QUANTUM: Duration = Duration::from_millis(10);

/// Ambient configuration for a `Pipeline`, overridable from `beast-cli`.
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub cycle_quantum: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cycle_quantum: DEFAULT_CYCLE_QUANTUM,
        }
    }
}

struct RunningState {
    arena: Arc<Vec<Mutex<Box<dyn Pipe + Send>>>>,
    handles: Vec<JoinHandle<()>>,
    should_run: Arc<AtomicBool>,
    failure: Arc<Mutex<Option<(PipeId, String)>>>,
}

pub struct Pipeline {
    pipes: Vec<Box<dyn Pipe + Send>>,
    connections: Vec<Connection>,
    cycle_quantum: Duration,
    running: Option<RunningState>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        Self {
            pipes: Vec::new(),
            connections: Vec::new(),
            cycle_quantum: config.cycle_quantum,
            running: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn pipe_count(&self) -> usize {
        self.pipes.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Adds `pipe` to the arena and returns its stable ID. Ownership moves
    /// into the `Pipeline`: there is no way for the same `Pipe` value to be
    /// added twice, which is how this crate satisfies "addPipe rejects
    /// duplicates" under move semantics rather than an identity check.
    pub fn add_pipe(&mut self, pipe: impl Pipe + Send + 'static) -> PipelineResult<PipeId> {
        if self.running.is_some() {
            return Err(PipelineError::RunningTopologyMutation);
        }
        self.pipes.push(Box::new(pipe));
        Ok(PipeId(self.pipes.len() - 1))
    }

    fn pipe(&self, id: PipeId) -> PipelineResult<&Box<dyn Pipe + Send>> {
        self.pipes.get(id.index()).ok_or(PipelineError::UnknownPipe(id))
    }

    /// Connects `source`'s output slot to `destination`'s input slot with a
    /// buffer of fixed capacity `buffer_size`. Fails if either pipe is
    /// unknown, either slot index is out of range, or either endpoint is
    /// already occupied by another `Connection`.
    pub fn connect_pipes(
        &mut self,
        source: PipeId,
        source_slot: usize,
        destination: PipeId,
        destination_slot: usize,
        buffer_size: usize,
    ) -> PipelineResult<()> {
        if self.running.is_some() {
            return Err(PipelineError::RunningTopologyMutation);
        }

        let source_pipe = self.pipe(source)?;
        let available = source_pipe.output_slot_count();
        if source_slot >= available {
            return Err(PipelineError::InvalidOutputSlot {
                pipe: source,
                slot: source_slot,
                available,
            });
        }

        let destination_pipe = self.pipe(destination)?;
        let available = destination_pipe.input_slot_count();
        if destination_slot >= available {
            return Err(PipelineError::InvalidInputSlot {
                pipe: destination,
                slot: destination_slot,
                available,
            });
        }

        for connection in &self.connections {
            if connection.source == source && connection.source_slot == source_slot {
                return Err(PipelineError::OutputSlotOccupied {
                    pipe: source,
                    slot: source_slot,
                });
            }
            if connection.destination == destination && connection.destination_slot == destination_slot {
                return Err(PipelineError::InputSlotOccupied {
                    pipe: destination,
                    slot: destination_slot,
                });
            }
        }

        self.connections.push(Connection::new(
            source,
            source_slot,
            destination,
            destination_slot,
            buffer_size,
        ));
        Ok(())
    }

    /// Spawns one worker thread per pipe and marks the pipeline running.
    /// Fails if already running.
    pub fn start(&mut self) -> PipelineResult<()> {
        if self.running.is_some() {
            return Err(PipelineError::AlreadyRunning);
        }

        let pipe_count = self.pipes.len();
        let mut outputs: Vec<Vec<Option<Sender<Vec<u8>>>>> = self
            .pipes
            .iter()
            .map(|p| vec![None; p.output_slot_count()])
            .collect();
        let mut inputs: Vec<Vec<Option<Receiver<Vec<u8>>>>> = self
            .pipes
            .iter()
            .map(|p| vec![None; p.input_slot_count()])
            .collect();
        for connection in &self.connections {
            outputs[connection.source.index()][connection.source_slot] = Some(connection.sender.clone());
            inputs[connection.destination.index()][connection.destination_slot] = Some(connection.receiver.clone());
        }

        let arena: Arc<Vec<Mutex<Box<dyn Pipe + Send>>>> =
            Arc::new(self.pipes.drain(..).map(Mutex::new).collect());
        let should_run = Arc::new(AtomicBool::new(true));
        let failure = Arc::new(Mutex::new(None));

        let mut handles = Vec::with_capacity(pipe_count);
        for id in 0..pipe_count {
            let arena = Arc::clone(&arena);
            let should_run = Arc::clone(&should_run);
            let failure = Arc::clone(&failure);
            let outputs = std::mem::take(&mut outputs[id]);
            let inputs = std::mem::take(&mut inputs[id]);
            let cycle_quantum = self.cycle_quantum;
            handles.push(thread::spawn(move || {
                worker_loop(id, arena, should_run, failure, outputs, inputs, cycle_quantum)
            }));
        }

        self.running = Some(RunningState {
            arena,
            handles,
            should_run,
            failure,
        });
        Ok(())
    }

    /// Signals every worker to stop, joins them, and reclaims the pipes.
    /// Fails if not running. On success, returns the first worker failure (if
    /// any) observed during this run.
    pub fn stop(&mut self) -> PipelineResult<()> {
        let running = self.running.take().ok_or(PipelineError::NotRunning)?;
        running.should_run.store(false, Ordering::Release);
        for handle in running.handles {
            let _ = handle.join();
        }

        let arena = Arc::try_unwrap(running.arena).unwrap_or_else(|arc| {
            tracing::warn!("pipeline arena still shared after joining all workers");
            (*arc).iter().map(|_| Mutex::new(stub_pipe())).collect()
        });
        self.pipes = arena
            .into_iter()
            .map(|m| m.into_inner().unwrap_or_else(|poison| poison.into_inner()))
            .collect();

        if let Some((pipe, message)) = running.failure.lock().unwrap_or_else(|p| p.into_inner()).take() {
            return Err(PipelineError::WorkerFailed { pipe, message });
        }
        Ok(())
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Placeholder pipe used only when an arena can't be reclaimed cleanly (a
/// worker leaked an `Arc` clone). Never exercised in the happy path: `stop`
/// always runs after every handle has been joined, at which point this
/// pipeline holds the last reference.
fn stub_pipe() -> Box<dyn Pipe + Send> {
    struct Stub;
    impl Pipe for Stub {
        fn input_slot_count(&self) -> usize {
            0
        }
        fn output_slot_count(&self) -> usize {
            0
        }
        fn has_space(&self) -> bool {
            false
        }
        fn has_output(&self, _slot: usize) -> bool {
            false
        }
        fn inputs_are_saturated(&self) -> bool {
            false
        }
        fn outputs_are_saturated(&self) -> bool {
            true
        }
        fn add_input(&mut self, slot: usize, _datum: Vec<u8>) -> PipelineResult<()> {
            Err(PipelineError::InvalidSlotIndex(slot))
        }
        fn draw_output(&mut self, slot: usize) -> PipelineResult<Vec<u8>> {
            Err(PipelineError::InvalidSlotIndex(slot))
        }
        fn execute(&mut self) {}
    }
    Box::new(Stub)
}

#[allow(clippy::too_many_arguments)]
fn worker_loop(
    id: usize,
    arena: Arc<Vec<Mutex<Box<dyn Pipe + Send>>>>,
    should_run: Arc<AtomicBool>,
    failure: Arc<Mutex<Option<(PipeId, String)>>>,
    outputs: Vec<Option<Sender<Vec<u8>>>>,
    inputs: Vec<Option<Receiver<Vec<u8>>>>,
    cycle_quantum: Duration,
) {
    while should_run.load(Ordering::Acquire) {
        let result = catch_unwind(AssertUnwindSafe(|| {
            let mut pipe = arena[id].lock().unwrap_or_else(|poison| poison.into_inner());

            for (slot, sender) in outputs.iter().enumerate() {
                let Some(sender) = sender else { continue };
                while pipe.has_output(slot) {
                    if sender.is_full() {
                        break;
                    }
                    match pipe.draw_output(slot) {
                        Ok(data) => {
                            if sender.try_send(data).is_err() {
                                break;
                            }
                        }
                        Err(_) => break,
                    }
                }
            }

            for (slot, receiver) in inputs.iter().enumerate() {
                let Some(receiver) = receiver else { continue };
                while pipe.has_space() {
                    match receiver.try_recv() {
                        Ok(data) => {
                            let _ = pipe.add_input(slot, data);
                        }
                        Err(_) => break,
                    }
                }
            }

            if pipe.inputs_are_saturated() && !pipe.outputs_are_saturated() {
                pipe.execute();
            }
        }));

        if let Err(panic) = result {
            let message = panic_message(&panic);
            tracing::error!(pipe = id, error = %message, "pipeline worker failed");
            let mut guard = failure.lock().unwrap_or_else(|p| p.into_inner());
            if guard.is_none() {
                *guard = Some((PipeId(id), message));
            }
            should_run.store(false, Ordering::Release);
            return;
        }

        thread::sleep(cycle_quantum);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked with a non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct OneShotSource {
        emitted: bool,
    }
    impl Pipe for OneShotSource {
        fn input_slot_count(&self) -> usize {
            0
        }
        fn output_slot_count(&self) -> usize {
            1
        }
        fn has_space(&self) -> bool {
            false
        }
        fn has_output(&self, slot: usize) -> bool {
            slot == 0 && self.emitted
        }
        fn inputs_are_saturated(&self) -> bool {
            true
        }
        fn outputs_are_saturated(&self) -> bool {
            self.emitted
        }
        fn add_input(&mut self, slot: usize, _d: Vec<u8>) -> PipelineResult<()> {
            Err(PipelineError::InvalidSlotIndex(slot))
        }
        fn draw_output(&mut self, slot: usize) -> PipelineResult<Vec<u8>> {
            if slot == 0 && self.emitted {
                self.emitted = false;
                Ok(vec![42])
            } else {
                Err(PipelineError::OutputEmpty(slot))
            }
        }
        fn execute(&mut self) {
            self.emitted = true;
        }
    }

    struct Sink;
    impl Pipe for Sink {
        fn input_slot_count(&self) -> usize {
            1
        }
        fn output_slot_count(&self) -> usize {
            0
        }
        fn has_space(&self) -> bool {
            true
        }
        fn has_output(&self, _slot: usize) -> bool {
            false
        }
        fn inputs_are_saturated(&self) -> bool {
            false
        }
        fn outputs_are_saturated(&self) -> bool {
            false
        }
        fn add_input(&mut self, _slot: usize, _d: Vec<u8>) -> PipelineResult<()> {
            Ok(())
        }
        fn draw_output(&mut self, slot: usize) -> PipelineResult<Vec<u8>> {
            Err(PipelineError::OutputEmpty(slot))
        }
        fn execute(&mut self) {}
    }

    #[test]
    fn connect_rejects_unknown_pipe() {
        let mut pipeline = Pipeline::new();
        let a = pipeline.add_pipe(OneShotSource { emitted: false }).unwrap();
        let bogus = PipeId(99);
        let err = pipeline.connect_pipes(a, 0, bogus, 0, 4).unwrap_err();
        assert!(matches!(err, PipelineError::UnknownPipe(_)));
    }

    #[test]
    fn connect_rejects_out_of_range_slot() {
        let mut pipeline = Pipeline::new();
        let a = pipeline.add_pipe(OneShotSource { emitted: false }).unwrap();
        let b = pipeline.add_pipe(Sink).unwrap();
        let err = pipeline.connect_pipes(a, 5, b, 0, 4).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidOutputSlot { .. }));
    }

    #[test]
    fn connect_rejects_occupied_port() {
        let mut pipeline = Pipeline::new();
        let a = pipeline.add_pipe(OneShotSource { emitted: false }).unwrap();
        let b = pipeline.add_pipe(Sink).unwrap();
        let c = pipeline.add_pipe(Sink).unwrap();
        pipeline.connect_pipes(a, 0, b, 0, 4).unwrap();
        let err = pipeline.connect_pipes(a, 0, c, 0, 4).unwrap_err();
        assert!(matches!(err, PipelineError::OutputSlotOccupied { .. }));
    }

    #[test]
    fn start_twice_fails() {
        let mut pipeline = Pipeline::new();
        pipeline.add_pipe(Sink).unwrap();
        pipeline.start().unwrap();
        let err = pipeline.start().unwrap_err();
        assert!(matches!(err, PipelineError::AlreadyRunning));
        pipeline.stop().unwrap();
    }

    #[test]
    fn stop_without_start_fails() {
        let mut pipeline = Pipeline::new();
        let err = pipeline.stop().unwrap_err();
        assert!(matches!(err, PipelineError::NotRunning));
    }

    #[test]
    fn topology_is_immutable_while_running() {
        let mut pipeline = Pipeline::new();
        let a = pipeline.add_pipe(OneShotSource { emitted: false }).unwrap();
        let b = pipeline.add_pipe(Sink).unwrap();
        pipeline.start().unwrap();
        let err = pipeline.connect_pipes(a, 0, b, 0, 1).unwrap_err();
        assert!(matches!(err, PipelineError::RunningTopologyMutation));
        let err = pipeline.add_pipe(Sink).unwrap_err();
        assert!(matches!(err, PipelineError::RunningTopologyMutation));
        pipeline.stop().unwrap();
    }

    #[test]
    fn worker_panic_is_reported_and_stops_the_pipeline() {
        struct Bomb(Arc<AtomicUsize>);
        impl Pipe for Bomb {
            fn input_slot_count(&self) -> usize {
                0
            }
            fn output_slot_count(&self) -> usize {
                0
            }
            fn has_space(&self) -> bool {
                false
            }
            fn has_output(&self, _slot: usize) -> bool {
                false
            }
            fn inputs_are_saturated(&self) -> bool {
                true
            }
            fn outputs_are_saturated(&self) -> bool {
                false
            }
            fn add_input(&mut self, slot: usize, _d: Vec<u8>) -> PipelineResult<()> {
                Err(PipelineError::InvalidSlotIndex(slot))
            }
            fn draw_output(&mut self, slot: usize) -> PipelineResult<Vec<u8>> {
                Err(PipelineError::OutputEmpty(slot))
            }
            fn execute(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
                panic!("stage exploded");
            }
        }

        let mut pipeline = Pipeline::with_config(PipelineConfig {
            cycle_quantum: Duration::from_millis(1),
        });
        let calls = Arc::new(AtomicUsize::new(0));
        pipeline.add_pipe(Bomb(Arc::clone(&calls))).unwrap();
        pipeline.start().unwrap();
        thread::sleep(Duration::from_millis(50));
        let err = pipeline.stop().unwrap_err();
        assert!(matches!(err, PipelineError::WorkerFailed { .. }));
        assert!(calls.load(Ordering::SeqCst) >= 1);
    }
}
