//! `EvolutionPipe`: a `Pipe` specialisation that scores candidate bytecode
//! programs and breeds the next generation from the fittest.
//!
//! Filling every input slot and calling `execute()` once invokes the evaluator
//! at least once per filled candidate. Scoring runs each candidate as a
//! throwaway `VmSession` bounded by `max_steps`, exactly like a host would run
//! any other program, and hands the terminated session to an `Evaluator`.

use std::collections::VecDeque;

use beast_eval::Evaluator;
use beast_program::Program;
use beast_vm::VmSession;
use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg32;

use crate::error::{PipelineError, PipelineResult};
use crate::pipe::Pipe;

/// Sandbox limits used to run each candidate before scoring it. Kept separate
/// from whatever limits the candidate's own session would otherwise use: an
/// evolved program should not be able to smuggle in state that outlives its
/// evaluation.
#[derive(Debug, Clone, Copy)]
pub struct CandidateSessionLimits {
    pub variable_count: usize,
    pub string_table_count: usize,
    pub max_string_size: usize,
    pub max_steps: u64,
}

impl Default for CandidateSessionLimits {
    fn default() -> Self {
        Self {
            variable_count: 16,
            string_table_count: 4,
            max_string_size: 64,
            max_steps: 10_000,
        }
    }
}

pub struct EvolutionPipe {
    candidates: Vec<Option<Vec<u8>>>,
    scores: Vec<Option<f64>>,
    offspring: VecDeque<Vec<u8>>,
    evaluator: Box<dyn Evaluator + Send>,
    limits: CandidateSessionLimits,
    mutation_rate: f64,
    rng: Pcg32,
}

impl EvolutionPipe {
    pub fn new(
        max_candidates: usize,
        evaluator: Box<dyn Evaluator + Send>,
        limits: CandidateSessionLimits,
        mutation_rate: f64,
        seed: u64,
    ) -> Self {
        Self {
            candidates: vec![None; max_candidates],
            scores: vec![None; max_candidates],
            offspring: VecDeque::new(),
            evaluator,
            limits,
            mutation_rate: mutation_rate.clamp(0.0, 1.0),
            rng: Pcg32::new(seed, 0xa02bdbf7bb3c0a7),
        }
    }

    pub fn max_candidates(&self) -> usize {
        self.candidates.len()
    }

    /// The score recorded for `slot` by the most recent `execute()`, if any.
    pub fn score(&self, slot: usize) -> Option<f64> {
        self.scores.get(slot).copied().flatten()
    }

    fn score_candidate(&mut self, candidate: &[u8]) -> f64 {
        let program = Program::new(candidate.to_vec());
        let mut session = VmSession::with_seed(
            program,
            self.limits.variable_count,
            self.limits.string_table_count,
            self.limits.max_string_size,
            self.rng.next_u64(),
        );
        let _ = session.run_bounded(self.limits.max_steps);
        self.evaluator.evaluate(&session)
    }

    fn crossover_and_mutate(&mut self, a: &[u8], b: &[u8]) -> Vec<u8> {
        let len = a.len().max(b.len());
        let split = if len > 0 {
            (self.rng.next_u32() as usize) % len
        } else {
            0
        };
        let mut child = Vec::with_capacity(len);
        for i in 0..len {
            let byte = if i < split {
                a.get(i).copied().unwrap_or(0)
            } else {
                b.get(i).copied().unwrap_or(0)
            };
            child.push(byte);
        }
        for byte in child.iter_mut() {
            let roll = self.rng.next_u32() as f64 / u32::MAX as f64;
            if roll < self.mutation_rate {
                *byte = (self.rng.next_u32() & 0xff) as u8;
            }
        }
        child
    }
}

impl Pipe for EvolutionPipe {
    fn input_slot_count(&self) -> usize {
        self.candidates.len()
    }

    fn output_slot_count(&self) -> usize {
        1
    }

    fn has_space(&self) -> bool {
        self.candidates.iter().any(Option::is_none)
    }

    fn has_output(&self, slot: usize) -> bool {
        slot == 0 && !self.offspring.is_empty()
    }

    fn inputs_are_saturated(&self) -> bool {
        self.candidates.iter().all(Option::is_some)
    }

    fn outputs_are_saturated(&self) -> bool {
        self.offspring.len() >= self.max_candidates()
    }

    fn add_input(&mut self, slot: usize, datum: Vec<u8>) -> PipelineResult<()> {
        let entry = self
            .candidates
            .get_mut(slot)
            .ok_or(PipelineError::InvalidSlotIndex(slot))?;
        if entry.is_some() {
            return Err(PipelineError::InputSaturated(slot));
        }
        *entry = Some(datum);
        Ok(())
    }

    fn draw_output(&mut self, slot: usize) -> PipelineResult<Vec<u8>> {
        if slot != 0 {
            return Err(PipelineError::InvalidSlotIndex(slot));
        }
        self.offspring.pop_front().ok_or(PipelineError::OutputEmpty(slot))
    }

    /// Scores every filled candidate (invoking `evaluate` once per candidate),
    /// then, if at least two were scored, breeds a full new generation from
    /// the top two and clears the slots.
    fn execute(&mut self) {
        let mut scored = Vec::new();
        for i in 0..self.candidates.len() {
            if let Some(candidate) = self.candidates[i].clone() {
                let score = self.score_candidate(&candidate);
                self.scores[i] = Some(score);
                scored.push((i, score));
            }
        }

        if scored.len() < 2 {
            return;
        }
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        let parent_a = self.candidates[scored[0].0].clone().unwrap();
        let parent_b = self.candidates[scored[1].0].clone().unwrap();

        let generation_size = self.candidates.len();
        for _ in 0..generation_size {
            let child = self.crossover_and_mutate(&parent_a, &parent_b);
            self.offspring.push_back(child);
        }

        for slot in self.candidates.iter_mut() {
            *slot = None;
        }
        for slot in self.scores.iter_mut() {
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beast_program::OpCode;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingEvaluator(Arc<AtomicUsize>);
    impl Evaluator for CountingEvaluator {
        fn evaluate(&self, session: &VmSession) -> f64 {
            self.0.fetch_add(1, Ordering::SeqCst);
            session.executed_offset_count() as f64
        }
    }

    fn terminate_program() -> Vec<u8> {
        vec![OpCode::Terminate as u8, 0]
    }

    #[test]
    fn fills_and_evaluates_all_candidates() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut pipe = EvolutionPipe::new(
            4,
            Box::new(CountingEvaluator(Arc::clone(&calls))),
            CandidateSessionLimits::default(),
            0.0,
            7,
        );
        for slot in 0..4 {
            pipe.add_input(slot, terminate_program()).unwrap();
        }
        assert!(pipe.inputs_are_saturated());
        pipe.execute();
        assert!(calls.load(Ordering::SeqCst) >= 4);
    }

    #[test]
    fn execute_breeds_full_generation_and_clears_slots() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut pipe = EvolutionPipe::new(
            3,
            Box::new(CountingEvaluator(Arc::clone(&calls))),
            CandidateSessionLimits::default(),
            0.0,
            11,
        );
        for slot in 0..3 {
            pipe.add_input(slot, terminate_program()).unwrap();
        }
        pipe.execute();
        assert!(pipe.has_space());
        assert!(!pipe.inputs_are_saturated());
        let mut drawn = 0;
        while pipe.has_output(0) {
            pipe.draw_output(0).unwrap();
            drawn += 1;
        }
        assert_eq!(drawn, 3);
    }

    #[test]
    fn add_input_rejects_saturated_slot() {
        let mut pipe = EvolutionPipe::new(
            2,
            Box::new(CountingEvaluator(Arc::new(AtomicUsize::new(0)))),
            CandidateSessionLimits::default(),
            0.0,
            3,
        );
        pipe.add_input(0, terminate_program()).unwrap();
        let err = pipe.add_input(0, terminate_program()).unwrap_err();
        assert!(matches!(err, PipelineError::InputSaturated(0)));
    }

    #[test]
    fn single_candidate_is_scored_but_not_bred() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut pipe = EvolutionPipe::new(
            2,
            Box::new(CountingEvaluator(Arc::clone(&calls))),
            CandidateSessionLimits::default(),
            0.0,
            5,
        );
        pipe.add_input(0, terminate_program()).unwrap();
        pipe.execute();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!pipe.has_output(0));
    }
}
