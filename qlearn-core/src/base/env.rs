//! Environment.
use super::Step;
use anyhow::Result;

/// Represents an environment, typically an MDP.
///
/// Only a single (non-vectorized) environment is assumed. Observations are
/// expected to carry a leading batch dimension of size 1, so that they can be
/// fed to an action-value function and pushed into a replay buffer as they are.
pub trait Env {
    /// Configurations.
    type Config: Clone;

    /// Observation of the environment.
    type Obs: Clone;

    /// Action of the environment.
    type Act;

    /// Builds an environment with a given random seed.
    fn build(config: &Self::Config, seed: i64) -> Result<Self>
    where
        Self: Sized;

    /// Resets the environment and returns the initial observation of a new episode.
    fn reset(&mut self) -> Result<Self::Obs>;

    /// Performes an environment step.
    fn step(&mut self, a: &Self::Act) -> Result<Step<Self>>
    where
        Self: Sized;

    /// Returns the shape of observations, including the batch dimension,
    /// and the number of discrete actions.
    ///
    /// This is queried once at setup to shape the replay buffer and the
    /// action-value function.
    fn size(&self) -> (Vec<usize>, usize);
}
