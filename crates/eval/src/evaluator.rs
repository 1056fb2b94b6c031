use beast_vm::VmSession;

/// Maps a terminated `VmSession` to a fitness score in `[0.0, 1.0]`.
///
/// Implementations must be pure: same session state in, same score out, no
/// side effects. A session need not be terminated for `evaluate` to be called
/// (a `Pipe` may choose to score partial runs), but every evaluator shipped
/// here assumes termination and treats a still-running session as "as scored
/// so far".
pub trait Evaluator {
    /// Scores `session`, clamped to `[0.0, 1.0]`.
    fn evaluate(&self, session: &VmSession) -> f64;
}
