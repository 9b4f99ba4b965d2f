//! DQN trainer.
use super::{DqnModel, DqnTrainerConfig, FrozenTarget, LiveTarget, TargetSource};
use crate::{
    model::SubModel1,
    util::{smooth_l1_loss, CriticLoss, OutDim},
};
use anyhow::Result;
use candle_core::{shape::D, DType, Device, Tensor};
use candle_nn::loss::mse;
use log::{debug, trace};
use qlearn_core::{
    record::{Record, RecordValue},
    ExperienceBufferBase, ReplayBufferBase, TransitionBatch,
};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    convert::{TryFrom, TryInto},
    marker::PhantomData,
};

/// Trainer bootstrapping from the model being trained.
pub type OnPolicyTrainer<Q> = DqnTrainer<Q, LiveTarget>;

/// Trainer bootstrapping from a periodically refreshed frozen copy.
pub type OffPolicyTrainer<Q> = DqnTrainer<Q, FrozenTarget<Q>>;

/// Updates an action-value function with batches sampled from a replay buffer.
///
/// [`DqnTrainer::step`] is called once per environment step. Every
/// `steps_per_update` calls, provided the buffer holds at least `batch_size`
/// transitions, it samples a batch and takes one gradient step on the TD
/// error. Other calls return a loss of zero without touching the model.
pub struct DqnTrainer<Q, T>
where
    Q: SubModel1<Input = Tensor, Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + OutDim + Clone,
    T: TargetSource<Q>,
{
    batch_size: usize,
    discount_factor: f64,
    steps_per_update: usize,
    grad_clip: Option<f64>,
    critic_loss: CriticLoss,
    device: Device,
    target: T,
    steps: usize,
    n_updates: usize,
    phantom: PhantomData<Q>,
}

impl<Q> DqnTrainer<Q, LiveTarget>
where
    Q: SubModel1<Input = Tensor, Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + OutDim + Clone,
{
    /// Constructs a trainer bootstrapping from the model being trained.
    pub fn on_policy(config: DqnTrainerConfig) -> Result<Self> {
        Self::build(config, LiveTarget)
    }
}

impl<Q> DqnTrainer<Q, FrozenTarget<Q>>
where
    Q: SubModel1<Input = Tensor, Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + OutDim + Clone,
{
    /// Constructs a trainer bootstrapping from a frozen copy, replaced every
    /// `swap_interval` steps.
    pub fn off_policy(config: DqnTrainerConfig) -> Result<Self> {
        let target = FrozenTarget::new(config.swap_interval)?;
        Self::build(config, target)
    }
}

impl<Q, T> DqnTrainer<Q, T>
where
    Q: SubModel1<Input = Tensor, Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + OutDim + Clone,
    T: TargetSource<Q>,
{
    /// Constructs a trainer with the given source of targets.
    pub fn build(config: DqnTrainerConfig, target: T) -> Result<Self> {
        config.validate()?;
        let device = candle_core::Device::try_from(config.device)?;

        Ok(Self {
            batch_size: config.batch_size,
            discount_factor: config.discount_factor,
            steps_per_update: config.steps_per_update,
            grad_clip: config.grad_clip,
            critic_loss: config.critic_loss,
            device,
            target,
            steps: 0,
            n_updates: 0,
            phantom: PhantomData,
        })
    }

    /// Resets the step counter and the source of targets.
    ///
    /// Must be called before the first [`DqnTrainer::step`].
    pub fn reset(&mut self, qnet: &DqnModel<Q>) -> Result<()> {
        self.steps = 0;
        self.target.reset(qnet)
    }

    /// Returns the number of calls of [`DqnTrainer::step`] since reset.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Returns the number of gradient steps since the trainer was built.
    pub fn n_updates(&self) -> usize {
        self.n_updates
    }

    /// Returns the source of targets.
    pub fn target(&self) -> &T {
        &self.target
    }

    /// Advances the trainer by one step and returns the loss.
    ///
    /// The loss is zero if no update runs in this step.
    pub fn step<R>(&mut self, qnet: &mut DqnModel<Q>, buffer: &mut R) -> Result<f32>
    where
        R: ReplayBufferBase + ExperienceBufferBase,
        R::Batch: TransitionBatch,
        <R::Batch as TransitionBatch>::ObsBatch: TryInto<Tensor, Error = anyhow::Error>,
        <R::Batch as TransitionBatch>::ActBatch: TryInto<Tensor, Error = anyhow::Error>,
    {
        self.steps += 1;
        self.target.sync(qnet, self.steps)?;

        if self.steps % self.steps_per_update != 0 {
            return Ok(0.0);
        }
        if buffer.len() < self.batch_size {
            trace!(
                "Skipped update, {} transitions in buffer < batch size {}",
                buffer.len(),
                self.batch_size
            );
            return Ok(0.0);
        }

        let loss = self.update(qnet, buffer)?;
        self.n_updates += 1;
        debug!("Update {} at step {}, loss = {}", self.n_updates, self.steps, loss);

        Ok(loss)
    }

    /// Same as [`DqnTrainer::step`], returning the loss and the number of
    /// updates as a [`Record`].
    pub fn step_with_record<R>(&mut self, qnet: &mut DqnModel<Q>, buffer: &mut R) -> Result<Record>
    where
        R: ReplayBufferBase + ExperienceBufferBase,
        R::Batch: TransitionBatch,
        <R::Batch as TransitionBatch>::ObsBatch: TryInto<Tensor, Error = anyhow::Error>,
        <R::Batch as TransitionBatch>::ActBatch: TryInto<Tensor, Error = anyhow::Error>,
    {
        let loss = self.step(qnet, buffer)?;
        Ok(Record::from_slice(&[
            ("loss", RecordValue::Scalar(loss)),
            ("n_updates", RecordValue::Scalar(self.n_updates as f32)),
        ]))
    }

    fn update<R>(&mut self, qnet: &mut DqnModel<Q>, buffer: &mut R) -> Result<f32>
    where
        R: ReplayBufferBase,
        R::Batch: TransitionBatch,
        <R::Batch as TransitionBatch>::ObsBatch: TryInto<Tensor, Error = anyhow::Error>,
        <R::Batch as TransitionBatch>::ActBatch: TryInto<Tensor, Error = anyhow::Error>,
    {
        let batch = buffer.batch(self.batch_size)?;
        let (obs, act, next_obs, reward, is_done) = batch.unpack();
        let n = reward.len();
        let obs: Tensor = obs.try_into()?;
        let act: Tensor = act.try_into()?;
        let next_obs: Tensor = next_obs.try_into()?;
        let obs = obs.to_device(&self.device)?;
        let act = act
            .to_device(&self.device)?
            .to_dtype(DType::I64)?
            .reshape((n, 1))?;
        let next_obs = next_obs.to_device(&self.device)?;
        let reward = Tensor::from_slice(&reward[..], (n,), &self.device)?;
        let not_done = {
            let not_done = is_done
                .into_iter()
                .map(|v| (1 - v) as f32)
                .collect::<Vec<_>>();
            Tensor::from_vec(not_done, (n,), &self.device)?
        };

        let pred = qnet
            .forward(&obs)?
            .gather(&act, D::Minus1)?
            .squeeze(D::Minus1)?;
        let tgt = self.target.compute_target(
            qnet,
            &reward,
            &next_obs,
            &not_done,
            self.discount_factor,
        )?;

        let loss = match self.critic_loss {
            CriticLoss::Mse => mse(&pred, &tgt)?,
            CriticLoss::SmoothL1 => smooth_l1_loss(&pred, &tgt)?,
        };
        qnet.backward_step(&loss, self.grad_clip)?;

        Ok(loss.to_scalar::<f32>()?)
    }
}
