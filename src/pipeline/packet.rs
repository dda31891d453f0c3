//! The unit of data handed between stages.

/// One payload tagged with its sequence index.
///
/// Indices are assigned by the source stage only (0, 1, 2, ...) and are
/// never rewritten downstream. `Item` is moved through the queues; there is
/// no shared backing storage between a pushed item and anything the
/// producing stage keeps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item<P> {
    pub index: u64,
    pub payload: P,
}

impl<P> Item<P> {
    pub fn new(index: u64, payload: P) -> Self {
        Self { index, payload }
    }

    /// Split into `(index, payload)`.
    pub fn into_parts(self) -> (u64, P) {
        (self.index, self.payload)
    }
}
