//! `RuntimeStatisticsEvaluator`: scores a session on how much of the program it
//! covered and how wasteful its execution was, without ever inspecting the
//! session's actual output values.
//!
//! Takes all three weights (`dyn_noop_weight`, `stat_noop_weight`,
//! `prg_exec_weight`) through the constructor; see `DESIGN.md` for the
//! normalization this evaluator settled on.

use beast_vm::VmSession;

use crate::evaluator::Evaluator;

/// Scores a session as a weighted combination of:
/// - `1 - dynamic no-op fraction`: reward for *not* spending executed steps on
///   `Nop`.
/// - `1 - static no-op fraction`: reward for the program itself containing few
///   `Nop` instructions.
/// - program-coverage fraction: reward for exercising more of the program's
///   reachable instructions.
///
/// The three terms are combined as a weighted sum and normalised by the sum of
/// the weights, then clamped to `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeStatisticsEvaluator {
    dyn_noop_weight: f64,
    stat_noop_weight: f64,
    prg_exec_weight: f64,
}

impl RuntimeStatisticsEvaluator {
    /// All three weights must be non-negative; a weight of `0.0` drops that
    /// term from the score entirely (rather than, say, panicking), since a
    /// caller may legitimately want a two- or one-term evaluator.
    pub fn new(dyn_noop_weight: f64, stat_noop_weight: f64, prg_exec_weight: f64) -> Self {
        debug_assert!(dyn_noop_weight >= 0.0);
        debug_assert!(stat_noop_weight >= 0.0);
        debug_assert!(prg_exec_weight >= 0.0);
        Self {
            dyn_noop_weight,
            stat_noop_weight,
            prg_exec_weight,
        }
    }
}

impl Evaluator for RuntimeStatisticsEvaluator {
    fn evaluate(&self, session: &VmSession) -> f64 {
        let total_weight = self.dyn_noop_weight + self.stat_noop_weight + self.prg_exec_weight;
        if total_weight <= 0.0 {
            return 0.0;
        }

        let executed = session.executed_offset_count() as f64;
        let static_instructions = session.program().static_instruction_count() as f64;
        let static_noops = session.program().static_noop_count() as f64;
        let dyn_noops = session.dyn_noop_count() as f64;

        let dyn_noop_fraction = if executed > 0.0 { dyn_noops / executed } else { 0.0 };
        let static_noop_fraction = if static_instructions > 0.0 {
            static_noops / static_instructions
        } else {
            0.0
        };
        let exec_fraction = if static_instructions > 0.0 {
            (executed / static_instructions).min(1.0)
        } else {
            0.0
        };

        let score = (self.dyn_noop_weight * (1.0 - dyn_noop_fraction)
            + self.stat_noop_weight * (1.0 - static_noop_fraction)
            + self.prg_exec_weight * exec_fraction)
            / total_weight;

        score.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beast_program::{OpCode, Program};

    fn terminated_session(ops: Vec<u8>) -> VmSession {
        let mut session = VmSession::with_seed(Program::new(ops), 1, 1, 1, 1);
        session.run();
        session
    }

    #[test]
    fn zero_weights_score_zero() {
        let session = terminated_session(vec![OpCode::Terminate as u8, 0]);
        let evaluator = RuntimeStatisticsEvaluator::new(0.0, 0.0, 0.0);
        assert_eq!(evaluator.evaluate(&session), 0.0);
    }

    #[test]
    fn full_coverage_no_noops_scores_one() {
        let session = terminated_session(vec![OpCode::Terminate as u8, 0]);
        let evaluator = RuntimeStatisticsEvaluator::new(1.0, 1.0, 1.0);
        assert_eq!(evaluator.evaluate(&session), 1.0);
    }

    #[test]
    fn dynamic_noops_pull_score_down() {
        let busy = terminated_session(vec![
            OpCode::Nop as u8,
            OpCode::Nop as u8,
            OpCode::Terminate as u8,
            0,
        ]);
        let clean = terminated_session(vec![OpCode::Terminate as u8, 0]);
        let evaluator = RuntimeStatisticsEvaluator::new(1.0, 0.0, 0.0);
        assert!(evaluator.evaluate(&busy) < evaluator.evaluate(&clean));
    }

    #[test]
    fn score_is_always_within_unit_interval() {
        let session = terminated_session(vec![OpCode::Nop as u8, OpCode::Terminate as u8, 0]);
        let evaluator = RuntimeStatisticsEvaluator::new(2.5, 1.5, 3.0);
        let score = evaluator.evaluate(&session);
        assert!((0.0..=1.0).contains(&score));
    }
}
