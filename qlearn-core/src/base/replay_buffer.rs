//! Replay buffer interface for reinforcement learning.
//!
//! Replay buffers store transitions produced by interaction with an
//! environment and sample batches of them for optimization steps.
//! The ingestion side ([`ExperienceBufferBase`]) and the sampling side
//! ([`ReplayBufferBase`]) are separate traits, so that a process pushing
//! transitions does not need to know how batches are generated.

use anyhow::Result;

/// Interface for buffers that store experiences from environments.
///
/// # Examples
///
/// ```ignore
/// struct SimpleBuffer<T> {
///     items: Vec<T>,
/// }
///
/// impl<T> ExperienceBufferBase for SimpleBuffer<T> {
///     type Item = T;
///
///     fn push(&mut self, tr: T) -> Result<()> {
///         self.items.push(tr);
///         Ok(())
///     }
///
///     fn len(&self) -> usize {
///         self.items.len()
///     }
/// }
/// ```
pub trait ExperienceBufferBase {
    /// The type of items stored in the buffer.
    type Item;

    /// Pushes a new experience into the buffer.
    ///
    /// Returns an error if the experience violates a precondition of the
    /// buffer, for example its shape does not match the stored experiences.
    fn push(&mut self, tr: Self::Item) -> Result<()>;

    /// Returns the current number of experiences in the buffer.
    fn len(&self) -> usize;

    /// Returns `true` if the buffer holds no experience.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Interface for replay buffers that generate batches for training.
pub trait ReplayBufferBase {
    /// Configuration parameters for the replay buffer.
    type Config: Clone;

    /// The type of batch generated for training.
    type Batch;

    /// Builds a new replay buffer from the given configuration.
    ///
    /// Fails if the configuration is invalid.
    fn build(config: &Self::Config) -> Result<Self>
    where
        Self: Sized;

    /// Constructs a batch of `size` experiences for training.
    ///
    /// Fails if the buffer is empty.
    fn batch(&mut self, size: usize) -> Result<Self::Batch>;
}
