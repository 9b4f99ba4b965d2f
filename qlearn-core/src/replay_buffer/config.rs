//! Configuration of the replay buffer.
use super::EvictionPolicy;
use crate::error::QlearnError;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::{
    default::Default,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`SimpleReplayBuffer`](super::SimpleReplayBuffer).
///
/// # Examples
///
/// ```rust
/// use qlearn_core::replay_buffer::{EvictionPolicy, SimpleReplayBufferConfig};
///
/// let config = SimpleReplayBufferConfig::default()
///     .capacity(10000)
///     .seed(42)
///     .eviction(EvictionPolicy::Fifo);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct SimpleReplayBufferConfig {
    /// Maximum number of transitions that can be stored in the buffer.
    pub capacity: usize,

    /// Random seed used for sampling transitions.
    pub seed: u64,

    /// Which row is overwritten when the buffer is full.
    #[serde(default)]
    pub eviction: EvictionPolicy,
}

impl Default for SimpleReplayBufferConfig {
    fn default() -> Self {
        Self {
            capacity: 10000,
            seed: 42,
            eviction: EvictionPolicy::Fifo,
        }
    }
}

impl SimpleReplayBufferConfig {
    /// Sets the capacity of the replay buffer.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the random seed for sampling.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the eviction policy.
    pub fn eviction(mut self, eviction: EvictionPolicy) -> Self {
        self.eviction = eviction;
        self
    }

    /// Checks the values of the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            bail!(QlearnError::InvalidConfig(
                "capacity of replay buffer must be positive".to_string()
            ));
        }
        Ok(())
    }

    /// Loads the configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves the configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_serde_replay_buffer_config() -> Result<()> {
        let config = SimpleReplayBufferConfig::default()
            .capacity(500)
            .seed(7)
            .eviction(EvictionPolicy::Random);

        let dir = TempDir::new("replay_buffer_config")?;
        let path = dir.path().join("replay_buffer.yaml");
        config.save(&path)?;
        let config_ = SimpleReplayBufferConfig::load(&path)?;
        assert_eq!(config, config_);
        Ok(())
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let err = SimpleReplayBufferConfig::default()
            .capacity(0)
            .validate()
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<QlearnError>(),
            Some(QlearnError::InvalidConfig(_))
        ));
    }
}
