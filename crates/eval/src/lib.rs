//! # BEAST Evaluators
//!
//! An `Evaluator` is a pure function from a terminated `VmSession` to a score in
//! `[0.0, 1.0]`. Evaluators hold no state of their own and perform no I/O — they
//! only read back what the session already recorded while it ran.

mod evaluator;
mod runtime_statistics;

pub use evaluator::Evaluator;
pub use runtime_statistics::RuntimeStatisticsEvaluator;
