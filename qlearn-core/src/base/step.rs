//! Environment step.
use super::Env;

/// Represents an observation, reward and termination tuple `(o_t+1, r_t, done_t)`.
///
/// An environment emits [`Step`] object at every interaction steps.
/// Together with the previous observation and the action taken, it forms a
/// transition `(o_t, a_t, r_t, o_t+1, done_t)`.
pub struct Step<E: Env> {
    /// Observation.
    pub obs: E::Obs,

    /// Reward.
    pub reward: f32,

    /// Flag denoting if episode is terminated.
    pub is_done: bool,
}

impl<E: Env> Step<E> {
    /// Constructs a [`Step`] object.
    pub fn new(obs: E::Obs, reward: f32, is_done: bool) -> Self {
        Step {
            obs,
            reward,
            is_done,
        }
    }
}
