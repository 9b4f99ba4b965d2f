//! Configuration of DQN trainer.
use crate::{util::CriticLoss, Device};
use anyhow::{bail, Result};
use qlearn_core::error::QlearnError;
use serde::{Deserialize, Serialize};
use std::{
    default::Default,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`DqnTrainer`](super::DqnTrainer).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct DqnTrainerConfig {
    /// Number of transitions in a batch.
    pub batch_size: usize,

    /// Discount factor of future rewards.
    pub discount_factor: f64,

    /// An update runs at every this number of trainer steps.
    pub steps_per_update: usize,

    /// The frozen target is replaced at every this number of trainer steps.
    /// Ignored when bootstrapping from the model being trained.
    pub swap_interval: usize,

    /// Gradients are clamped to `[-grad_clip, grad_clip]` if given.
    pub grad_clip: Option<f64>,

    /// Loss between predictions and targets.
    #[serde(default)]
    pub critic_loss: CriticLoss,

    /// Device on which batches are processed.
    #[serde(default)]
    pub device: Device,
}

impl Default for DqnTrainerConfig {
    fn default() -> Self {
        Self {
            batch_size: 128,
            discount_factor: 0.999,
            steps_per_update: 100,
            swap_interval: 50,
            grad_clip: Some(1.0),
            critic_loss: CriticLoss::SmoothL1,
            device: Device::Cpu,
        }
    }
}

impl DqnTrainerConfig {
    /// Sets the batch size.
    pub fn batch_size(mut self, v: usize) -> Self {
        self.batch_size = v;
        self
    }

    /// Sets the discount factor.
    pub fn discount_factor(mut self, v: f64) -> Self {
        self.discount_factor = v;
        self
    }

    /// Sets the number of trainer steps per update.
    pub fn steps_per_update(mut self, v: usize) -> Self {
        self.steps_per_update = v;
        self
    }

    /// Sets the interval of replacing the frozen target.
    pub fn swap_interval(mut self, v: usize) -> Self {
        self.swap_interval = v;
        self
    }

    /// Sets the bound of gradient clipping.
    pub fn grad_clip(mut self, v: Option<f64>) -> Self {
        self.grad_clip = v;
        self
    }

    /// Sets the loss function.
    pub fn critic_loss(mut self, v: CriticLoss) -> Self {
        self.critic_loss = v;
        self
    }

    /// Sets the device.
    pub fn device(mut self, v: Device) -> Self {
        self.device = v;
        self
    }

    /// Checks the values of the configuration.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| QlearnError::InvalidConfig(msg.to_string());
        if self.batch_size == 0 {
            bail!(invalid("batch_size must be positive"));
        }
        if self.steps_per_update == 0 {
            bail!(invalid("steps_per_update must be positive"));
        }
        if self.swap_interval == 0 {
            bail!(invalid("swap_interval must be positive"));
        }
        if !(0.0..=1.0).contains(&self.discount_factor) {
            bail!(invalid("discount_factor must be in [0, 1]"));
        }
        if matches!(self.grad_clip, Some(v) if v <= 0.0) {
            bail!(invalid("grad_clip must be positive"));
        }
        Ok(())
    }

    /// Constructs [`DqnTrainerConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`DqnTrainerConfig`] as a YAML file.
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
    fn test_serde_trainer_config() -> Result<()> {
        let config = DqnTrainerConfig::default()
            .batch_size(32)
            .discount_factor(0.99)
            .grad_clip(None)
            .critic_loss(CriticLoss::Mse);

        let dir = TempDir::new("dqn_trainer_config")?;
        let path = dir.path().join("trainer.yaml");
        config.save(&path)?;
        let config_ = DqnTrainerConfig::load(&path)?;
        assert_eq!(config, config_);
        Ok(())
    }

    #[test]
    fn test_validate() {
        assert!(DqnTrainerConfig::default().validate().is_ok());
        for config in [
            DqnTrainerConfig::default().batch_size(0),
            DqnTrainerConfig::default().steps_per_update(0),
            DqnTrainerConfig::default().swap_interval(0),
            DqnTrainerConfig::default().discount_factor(1.5),
            DqnTrainerConfig::default().grad_clip(Some(0.0)),
        ] {
            let err = config.validate().unwrap_err();
            assert!(matches!(
                err.downcast_ref::<QlearnError>(),
                Some(QlearnError::InvalidConfig(_))
            ));
        }
    }
}
