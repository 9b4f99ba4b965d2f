#![warn(missing_docs)]
//! Backend-agnostic building blocks of deep Q-learning.
//!
//! This crate provides the environment abstraction, observation filters,
//! a fixed-capacity replay buffer and metric records. Anything that depends
//! on a tensor library lives in a backend crate.
pub mod error;
pub mod filter;
pub mod record;
pub mod replay_buffer;

mod base;
pub use base::{Env, ExperienceBufferBase, ReplayBufferBase, Step, TransitionBatch};
