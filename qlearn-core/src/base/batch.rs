//! Batch of transitions.

/// A batch of transitions `(o_t, a_t, o_t+1, r_t, done_t)`.
///
/// A single transition pushed into a replay buffer is a batch of length 1.
pub trait TransitionBatch {
    /// A set of observations in a batch.
    type ObsBatch;

    /// A set of actions in a batch.
    type ActBatch;

    /// Unpack the data `(o_t, a_t, o_t+1, r_t, done_t)`.
    fn unpack(self) -> (Self::ObsBatch, Self::ActBatch, Self::ObsBatch, Vec<f32>, Vec<i8>);

    /// Returns the number of samples in the batch.
    fn len(&self) -> usize;

    /// Returns `true` if the batch has no sample.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `o_t`.
    fn obs(&self) -> &Self::ObsBatch;

    /// Returns `a_t`.
    fn act(&self) -> &Self::ActBatch;
}
