//! `beast` — runs a BEAST bytecode file to termination and, independently,
//! demonstrates the pipeline runtime with a small built-in two-stage topology.
//!
//! The core has no persisted state and no wire protocol: a `Program` is raw
//! bytes with no header, and a `Pipeline` is addressed programmatically, not
//! through a file format. So `run` takes a bare bytecode file, and
//! `demo-pipeline` builds its topology in code rather than reading one from
//! disk — see `DESIGN.md` for why no topology file format was invented.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use beast_eval::{Evaluator, RuntimeStatisticsEvaluator};
use beast_pipeline::{Pipe, PipelineConfig, PipelineResult};
use beast_program::Program;
use beast_vm::{VmSession, DEFAULT_MAX_STEPS};

#[derive(Parser, Debug)]
#[command(name = "beast", about = "BEAST bytecode VM and evolutionary pipeline", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Loads a raw bytecode file, runs it to termination, and prints the
    /// resulting print buffer and return code.
    Run(RunArgs),
    /// Builds a small two-stage pipeline in process (a counting source feeding
    /// a summing sink) and runs it for a bounded window.
    DemoPipeline(DemoPipelineArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Path to a raw bytecode file (no header).
    program: PathBuf,

    /// Number of variable slots the session reserves.
    #[arg(long, default_value_t = 64)]
    variables: usize,

    /// String table capacity (max entries).
    #[arg(long = "string-table", default_value_t = 16)]
    string_table: usize,

    /// Per-entry maximum string length.
    #[arg(long = "max-string", default_value_t = 256)]
    max_string: usize,

    /// PRNG seed for this session's `loadRandomValueIntoVariable` stream.
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Upper bound on decoded instructions before forcing termination.
    #[arg(long = "max-steps", default_value_t = DEFAULT_MAX_STEPS)]
    max_steps: u64,

    /// Scores the terminated session with `RuntimeStatisticsEvaluator` using
    /// these three non-negative weights (dynamic no-op, static no-op, program
    /// coverage), printed alongside the run result.
    #[arg(long = "eval-weights", num_args = 3, value_names = ["DYN_NOOP", "STAT_NOOP", "PRG_EXEC"])]
    eval_weights: Option<Vec<f64>>,
}

#[derive(Parser, Debug)]
struct DemoPipelineArgs {
    /// How many integers the source stage emits before going idle.
    #[arg(long, default_value_t = 10)]
    count: i32,

    /// Connection buffer capacity between the two stages.
    #[arg(long = "buffer-size", default_value_t = 4)]
    buffer_size: usize,

    /// Worker cycle quantum in milliseconds (must not exceed 10ms by default).
    #[arg(long = "cycle-quantum-ms", default_value_t = 10)]
    cycle_quantum_ms: u64,

    /// How long to let the pipeline run before stopping and reading the result.
    #[arg(long = "run-for-ms", default_value_t = 500)]
    run_for_ms: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run(args),
        Command::DemoPipeline(args) => demo_pipeline(args),
    }
}

fn run(args: RunArgs) -> Result<()> {
    let bytes = std::fs::read(&args.program)
        .with_context(|| format!("reading bytecode file {}", args.program.display()))?;
    let program = Program::new(bytes);

    let mut session = VmSession::with_seed(
        program,
        args.variables,
        args.string_table,
        args.max_string,
        args.seed,
    );
    let code = session.run_bounded(args.max_steps);

    tracing::info!(
        return_code = code,
        terminated = session.was_terminated(),
        executed = session.executed_offset_count(),
        "program finished"
    );
    println!("return code: {code}");
    println!("print buffer: {}", session.print_buffer());

    if let Some(weights) = args.eval_weights {
        let evaluator = RuntimeStatisticsEvaluator::new(weights[0], weights[1], weights[2]);
        println!("score: {:.4}", evaluator.evaluate(&session));
    }

    Ok(())
}

/// Emits `0..count` on output slot 0, one integer (4 little-endian bytes,
/// matching `Program`'s operand encoding) per `execute()`, then goes idle.
struct CountingSource {
    next: i32,
    count: i32,
    pending: Option<Vec<u8>>,
}

impl Pipe for CountingSource {
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
        slot == 0 && self.pending.is_some()
    }
    fn inputs_are_saturated(&self) -> bool {
        true
    }
    fn outputs_are_saturated(&self) -> bool {
        self.pending.is_some()
    }
    fn add_input(&mut self, slot: usize, _datum: Vec<u8>) -> PipelineResult<()> {
        Err(beast_pipeline::PipelineError::InvalidSlotIndex(slot))
    }
    fn draw_output(&mut self, slot: usize) -> PipelineResult<Vec<u8>> {
        if slot != 0 {
            return Err(beast_pipeline::PipelineError::InvalidSlotIndex(slot));
        }
        self.pending
            .take()
            .ok_or(beast_pipeline::PipelineError::OutputEmpty(slot))
    }
    fn execute(&mut self) {
        if self.pending.is_none() && self.next < self.count {
            self.pending = Some(self.next.to_le_bytes().to_vec());
            self.next += 1;
        }
    }
}

/// Consumes input slot 0, summing each 4-byte little-endian integer into a
/// running accumulator.
struct SummingSink {
    accumulator: i64,
    received: i32,
    buffered: Option<Vec<u8>>,
}

impl Pipe for SummingSink {
    fn input_slot_count(&self) -> usize {
        1
    }
    fn output_slot_count(&self) -> usize {
        0
    }
    fn has_space(&self) -> bool {
        self.buffered.is_none()
    }
    fn has_output(&self, _slot: usize) -> bool {
        false
    }
    fn inputs_are_saturated(&self) -> bool {
        self.buffered.is_some()
    }
    fn outputs_are_saturated(&self) -> bool {
        false
    }
    fn add_input(&mut self, slot: usize, datum: Vec<u8>) -> PipelineResult<()> {
        if slot != 0 {
            return Err(beast_pipeline::PipelineError::InvalidSlotIndex(slot));
        }
        if self.buffered.is_some() {
            return Err(beast_pipeline::PipelineError::InputSaturated(slot));
        }
        self.buffered = Some(datum);
        Ok(())
    }
    fn draw_output(&mut self, slot: usize) -> PipelineResult<Vec<u8>> {
        Err(beast_pipeline::PipelineError::OutputEmpty(slot))
    }
    fn execute(&mut self) {
        if let Some(datum) = self.buffered.take() {
            if let Ok(bytes) = <[u8; 4]>::try_from(datum.as_slice()) {
                self.accumulator += i32::from_le_bytes(bytes) as i64;
                self.received += 1;
            }
        }
    }
}

fn demo_pipeline(args: DemoPipelineArgs) -> Result<()> {
    let mut pipeline = beast_pipeline::Pipeline::with_config(PipelineConfig {
        cycle_quantum: Duration::from_millis(args.cycle_quantum_ms),
    });

    let source = pipeline.add_pipe(CountingSource {
        next: 0,
        count: args.count,
        pending: None,
    })?;
    let sink = pipeline.add_pipe(SummingSink {
        accumulator: 0,
        received: 0,
        buffered: None,
    })?;
    pipeline.connect_pipes(source, 0, sink, 0, args.buffer_size)?;

    tracing::info!(count = args.count, "starting demo pipeline");
    pipeline.start()?;

    let deadline = Instant::now() + Duration::from_millis(args.run_for_ms);
    while Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(args.cycle_quantum_ms));
    }

    pipeline.stop()?;
    println!("demo pipeline stopped after ~{}ms", args.run_for_ms);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_run_subcommand_with_defaults() {
        let cli = Cli::try_parse_from(["beast", "run", "program.bin"]).unwrap();
        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.variables, 64);
                assert_eq!(args.max_steps, DEFAULT_MAX_STEPS);
            }
            _ => panic!("expected Run"),
        }
    }

    #[test]
    fn cli_parses_demo_pipeline_overrides() {
        let cli = Cli::try_parse_from([
            "beast",
            "demo-pipeline",
            "--count",
            "5",
            "--buffer-size",
            "2",
        ])
        .unwrap();
        match cli.command {
            Command::DemoPipeline(args) => {
                assert_eq!(args.count, 5);
                assert_eq!(args.buffer_size, 2);
            }
            _ => panic!("expected DemoPipeline"),
        }
    }

    #[test]
    fn counting_source_then_summing_sink_accumulates_in_process() {
        let mut source = CountingSource {
            next: 0,
            count: 3,
            pending: None,
        };
        let mut sink = SummingSink {
            accumulator: 0,
            received: 0,
            buffered: None,
        };
        for _ in 0..3 {
            source.execute();
            let datum = source.draw_output(0).unwrap();
            sink.add_input(0, datum).unwrap();
            sink.execute();
        }
        assert_eq!(sink.accumulator, 0 + 1 + 2);
        assert_eq!(sink.received, 3);
    }
}
