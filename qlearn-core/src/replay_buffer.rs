//! Fixed-capacity experience replay.
//!
//! This module provides a replay buffer that can hold transitions of
//! arbitrary observation and action types, as long as their storage
//! implements [`BatchBase`].
//!
//! # Key Components
//!
//! - [`SimpleReplayBuffer`]: A ring buffer with uniform sampling
//! - [`GenericTransitionBatch`]: A single transition or a sampled batch
//! - [`EvictionPolicy`]: Which row a full buffer overwrites
//! - [`VecBatch`]: Row storage backed by a [`Vec`]
//!
//! # Examples
//!
//! ```rust
//! use qlearn_core::{
//!     replay_buffer::{GenericTransitionBatch, SimpleReplayBuffer, SimpleReplayBufferConfig, VecBatch},
//!     ExperienceBufferBase, ReplayBufferBase,
//! };
//!
//! let config = SimpleReplayBufferConfig::default().capacity(100).seed(42);
//! let mut buffer = SimpleReplayBuffer::<VecBatch<f32>, VecBatch<i64>>::build(&config).unwrap();
//!
//! let tr = GenericTransitionBatch::from_transition(
//!     VecBatch::from_row(vec![0.0, 1.0]),
//!     VecBatch::from_row(vec![1]),
//!     1.0,
//!     VecBatch::from_row(vec![1.0, 2.0]),
//!     false,
//! );
//! buffer.push(tr).unwrap();
//!
//! let batch = buffer.batch(4).unwrap();
//! assert_eq!(batch.reward, vec![1.0; 4]);
//! ```
mod base;
mod batch;
mod config;
mod eviction;
mod vec_batch;
pub use base::SimpleReplayBuffer;
pub use batch::{BatchBase, GenericTransitionBatch};
pub use config::SimpleReplayBufferConfig;
pub use eviction::EvictionPolicy;
pub use vec_batch::VecBatch;
