//! Sources of bootstrapped targets.
use super::DqnModel;
use crate::{model::SubModel1, util::OutDim};
use anyhow::{bail, Result};
use candle_core::{shape::D, Tensor};
use log::debug;
use qlearn_core::error::QlearnError;
use serde::{de::DeserializeOwned, Serialize};

/// Chooses the action-value function used for bootstrapped targets.
///
/// Implementations differ only in which model [`TargetSource::estimator`]
/// returns; the target itself is computed by [`TargetSource::compute_target`].
pub trait TargetSource<Q>
where
    Q: SubModel1<Input = Tensor, Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + OutDim + Clone,
{
    /// Called when training starts.
    fn reset(&mut self, qnet: &DqnModel<Q>) -> Result<()>;

    /// Called at every trainer step, before any target computation of the step.
    ///
    /// `steps` is the trainer step counter, already incremented for this step.
    fn sync(&mut self, qnet: &DqnModel<Q>, steps: usize) -> Result<()>;

    /// Returns the model that estimates the values of next observations.
    fn estimator<'a>(&'a self, qnet: &'a DqnModel<Q>) -> Result<&'a DqnModel<Q>>;

    /// Computes `reward + not_done * gamma * max_a Q'(next_obs, a)`.
    ///
    /// The returned tensor is detached from the computation graph.
    fn compute_target(
        &self,
        qnet: &DqnModel<Q>,
        reward: &Tensor,
        next_obs: &Tensor,
        not_done: &Tensor,
        gamma: f64,
    ) -> Result<Tensor> {
        let q = self.estimator(qnet)?.forward(next_obs)?.max(D::Minus1)?;
        let bootstrap = not_done.mul(&q)?.affine(gamma, 0.0)?;
        Ok(reward.add(&bootstrap)?.detach())
    }
}

/// Bootstraps from the model being trained.
#[derive(Debug, Default, Clone, Copy)]
pub struct LiveTarget;

impl<Q> TargetSource<Q> for LiveTarget
where
    Q: SubModel1<Input = Tensor, Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + OutDim + Clone,
{
    fn reset(&mut self, _qnet: &DqnModel<Q>) -> Result<()> {
        Ok(())
    }

    fn sync(&mut self, _qnet: &DqnModel<Q>, _steps: usize) -> Result<()> {
        Ok(())
    }

    fn estimator<'a>(&'a self, qnet: &'a DqnModel<Q>) -> Result<&'a DqnModel<Q>> {
        Ok(qnet)
    }
}

/// Bootstraps from a frozen copy of the model being trained.
///
/// The copy is taken at reset and replaced by a fresh copy every
/// `swap_interval` trainer steps.
pub struct FrozenTarget<Q>
where
    Q: SubModel1<Input = Tensor, Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + OutDim + Clone,
{
    swap_interval: usize,
    snapshot: Option<DqnModel<Q>>,
}

impl<Q> FrozenTarget<Q>
where
    Q: SubModel1<Input = Tensor, Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + OutDim + Clone,
{
    /// Creates a target refreshed every `swap_interval` steps.
    pub fn new(swap_interval: usize) -> Result<Self> {
        if swap_interval == 0 {
            bail!(QlearnError::InvalidConfig(
                "swap_interval must be positive".to_string()
            ));
        }
        Ok(Self {
            swap_interval,
            snapshot: None,
        })
    }

    /// Returns the frozen model, `None` before reset.
    pub fn snapshot(&self) -> Option<&DqnModel<Q>> {
        self.snapshot.as_ref()
    }
}

impl<Q> TargetSource<Q> for FrozenTarget<Q>
where
    Q: SubModel1<Input = Tensor, Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + OutDim + Clone,
{
    fn reset(&mut self, qnet: &DqnModel<Q>) -> Result<()> {
        self.snapshot = Some(qnet.copy()?);
        Ok(())
    }

    fn sync(&mut self, qnet: &DqnModel<Q>, steps: usize) -> Result<()> {
        if steps % self.swap_interval == 0 {
            self.snapshot = Some(qnet.copy()?);
            debug!("Replaced the frozen target at step {}", steps);
        }
        Ok(())
    }

    fn estimator<'a>(&'a self, _qnet: &'a DqnModel<Q>) -> Result<&'a DqnModel<Q>> {
        match &self.snapshot {
            Some(snapshot) => Ok(snapshot),
            None => bail!(QlearnError::NotReset("frozen target".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dqn::DqnModelConfig,
        mlp::{Mlp, MlpConfig},
        opt::OptimizerConfig,
    };
    use candle_core::{DType, Device};

    fn model() -> Result<DqnModel<Mlp>> {
        let config = DqnModelConfig::default()
            .q_config(MlpConfig::new(2, vec![4], 3, false))
            .opt_config(OptimizerConfig::Sgd { lr: 0.1 });
        DqnModel::build(config, Device::Cpu)
    }

    #[test]
    fn test_terminal_rows_take_reward_only() -> Result<()> {
        let qnet = model()?;
        let next_obs = Tensor::from_vec(vec![0.5f32, -1.0, 2.0, 0.3], (2, 2), &Device::Cpu)?;
        let reward = Tensor::from_vec(vec![1f32, 2.0], 2, &Device::Cpu)?;
        let not_done = Tensor::from_vec(vec![0f32, 1.0], 2, &Device::Cpu)?;

        let tgt = LiveTarget.compute_target(&qnet, &reward, &next_obs, &not_done, 0.5)?;
        let tgt = tgt.to_vec1::<f32>()?;
        let max_q = qnet
            .forward(&next_obs)?
            .max(D::Minus1)?
            .to_vec1::<f32>()?;

        assert_eq!(tgt[0], 1.0);
        assert!((tgt[1] - (2.0 + 0.5 * max_q[1])).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_frozen_target_requires_reset() -> Result<()> {
        let qnet = model()?;
        let target = FrozenTarget::<Mlp>::new(10)?;
        let res = target.estimator(&qnet);
        assert!(matches!(
            res.err().unwrap().downcast_ref::<QlearnError>(),
            Some(QlearnError::NotReset(_))
        ));
        assert!(FrozenTarget::<Mlp>::new(0).is_err());
        Ok(())
    }

    #[test]
    fn test_frozen_target_is_independent() -> Result<()> {
        let mut qnet = model()?;
        let mut target = FrozenTarget::new(3)?;
        target.reset(&qnet)?;
        let frozen = qnet.param_values()?;

        let obs = Tensor::ones((2, 2), DType::F32, &Device::Cpu)?;
        let loss = qnet.forward(&obs)?.sqr()?.mean_all()?;
        qnet.backward_step(&loss, None)?;

        target.sync(&qnet, 1)?;
        target.sync(&qnet, 2)?;
        let snapshot = target.estimator(&qnet)?;
        assert_eq!(snapshot.param_values()?, frozen);

        target.sync(&qnet, 3)?;
        let snapshot = target.estimator(&qnet)?;
        assert_eq!(snapshot.param_values()?, qnet.param_values()?);
        assert_ne!(snapshot.param_values()?, frozen);
        Ok(())
    }
}
