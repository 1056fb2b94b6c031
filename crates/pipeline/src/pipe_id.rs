/// A stable handle to a `Pipe` owned by a `Pipeline`'s arena.
///
/// Connections and callers address pipes by this opaque ID rather than by
/// reference: the `Pipeline` is the sole owner of every `Pipe`, and `PipeId`
/// is just an index into its arena. This avoids the shared-ownership-plus-
/// back-pointer cycle a `Pipeline`/`Pipe` pair would otherwise need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipeId(pub(crate) usize);

impl PipeId {
    pub(crate) fn index(self) -> usize {
        self.0
    }
}
