//! # BEAST Pipeline
//!
//! The `Pipe` contract, bounded-channel `Connection`s, and the worker-thread
//! `Pipeline` runtime that drives a directed graph of pipes. `EvolutionPipe`
//! is the one concrete `Pipe` the core ships: it scores candidate bytecode
//! programs with a `beast_eval::Evaluator` and breeds the next generation
//! from the fittest.

mod connection;
mod error;
mod evolution_pipe;
mod pipe;
mod pipe_id;
mod pipeline;

pub use error::{PipelineError, PipelineResult};
pub use evolution_pipe::{CandidateSessionLimits, EvolutionPipe};
pub use pipe::Pipe;
pub use pipe_id::PipeId;
pub use pipeline::{Pipeline, PipelineConfig, DEFAULT_CYCLE_QUANTUM};
