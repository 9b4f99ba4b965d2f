//! Deep Q-learning implemented with [candle](https://crates.io/crates/candle-core).
//!
//! The crate provides the tensor side of the workspace: tensor storage for
//! [`SimpleReplayBuffer`](qlearn_core::replay_buffer::SimpleReplayBuffer),
//! action-value functions, the epsilon-greedy explorer, the DQN trainer and
//! a runner alternating environment interaction and updates.
pub mod cnn;
pub mod dqn;
pub mod filter;
pub mod mlp;
pub mod model;
pub mod opt;
pub mod runner;
mod tensor_batch;
pub mod util;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
pub use tensor_batch::{TensorBatch, TensorReplayBuffer, TensorTransition};

#[derive(Clone, Debug, Copy, Deserialize, Serialize, PartialEq)]
/// Device for using candle.
///
/// This enum is added because [`candle_core::Device`] does not support serialization.
pub enum Device {
    /// The main CPU device.
    Cpu,

    /// The GPU device with the given ordinal.
    Cuda(usize),
}

impl Default for Device {
    fn default() -> Self {
        Self::Cpu
    }
}

impl TryFrom<Device> for candle_core::Device {
    type Error = anyhow::Error;

    fn try_from(device: Device) -> Result<Self> {
        match device {
            Device::Cpu => Ok(candle_core::Device::Cpu),
            Device::Cuda(n) => Ok(candle_core::Device::new_cuda(n)?),
        }
    }
}
