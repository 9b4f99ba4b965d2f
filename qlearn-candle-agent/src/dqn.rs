//! Deep Q-network.
//!
//! [`DqnTrainer`] updates an action-value function held in a [`DqnModel`]
//! with transitions sampled from a replay buffer. Bootstrapped targets are
//! computed either by the model being trained ([`LiveTarget`]) or by a
//! frozen copy of it, refreshed at a fixed interval ([`FrozenTarget`]).
//! [`EpsilonGreedy`] selects actions during interaction with an environment.
mod config;
mod explorer;
mod model;
mod target;
mod trainer;
pub use config::DqnTrainerConfig;
pub use explorer::EpsilonGreedy;
pub use model::{DqnModel, DqnModelConfig};
pub use target::{FrozenTarget, LiveTarget, TargetSource};
pub use trainer::{DqnTrainer, OffPolicyTrainer, OnPolicyTrainer};
