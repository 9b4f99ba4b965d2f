//! Training loop alternating environment interaction and updates.
use crate::{
    dqn::{DqnModel, DqnTrainer, EpsilonGreedy, TargetSource},
    model::SubModel1,
    util::OutDim,
    TensorBatch, TensorTransition,
};
use anyhow::{bail, Result};
use candle_core::Tensor;
use log::{info, trace};
use qlearn_core::{
    error::QlearnError,
    filter::FilteredEnv,
    record::{EpisodeStats, RecordValue, Recorder},
    Env, ExperienceBufferBase, ReplayBufferBase,
};
use rand::{rngs::SmallRng, SeedableRng};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`Runner`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct RunnerConfig {
    /// Number of episodes to run.
    pub max_episodes: usize,

    /// An episode ends after this number of steps even if not done.
    pub max_steps_per_episode: usize,

    /// Episode records are written at every this number of episodes.
    pub record_interval: usize,

    /// Number of episodes over which the mean reward is computed.
    pub mean_window: usize,

    /// Random seed of action selection.
    pub seed: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_episodes: 1000,
            max_steps_per_episode: 1000,
            record_interval: 1,
            mean_window: 100,
            seed: 42,
        }
    }
}

impl RunnerConfig {
    /// Sets the number of episodes.
    pub fn max_episodes(mut self, v: usize) -> Self {
        self.max_episodes = v;
        self
    }

    /// Sets the step limit of an episode.
    pub fn max_steps_per_episode(mut self, v: usize) -> Self {
        self.max_steps_per_episode = v;
        self
    }

    /// Sets the interval of writing episode records.
    pub fn record_interval(mut self, v: usize) -> Self {
        self.record_interval = v;
        self
    }

    /// Sets the window of the mean reward.
    pub fn mean_window(mut self, v: usize) -> Self {
        self.mean_window = v;
        self
    }

    /// Sets the random seed.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Checks the values of the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.max_steps_per_episode == 0 || self.record_interval == 0 || self.mean_window == 0 {
            bail!(QlearnError::InvalidConfig(
                "max_steps_per_episode, record_interval and mean_window must be positive"
                    .to_string()
            ));
        }
        Ok(())
    }

    /// Constructs [`RunnerConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`RunnerConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Runs episodes, pushing every transition into a replay buffer and calling
/// the trainer once per environment step.
///
/// Observations of the environment are expected to be tensors with a batch
/// dimension of size 1, and actions are `[1]` tensors of action indices.
pub struct Runner {
    config: RunnerConfig,
    rng: SmallRng,
}

impl Runner {
    /// Constructs [`Runner`].
    pub fn build(config: RunnerConfig) -> Result<Self> {
        config.validate()?;
        let rng = SmallRng::seed_from_u64(config.seed);
        Ok(Self { config, rng })
    }

    /// Runs the configured number of episodes and returns their statistics.
    ///
    /// The explorer and the trainer are reset before the first episode.
    pub fn run<E, Q, T, R>(
        &mut self,
        env: &mut FilteredEnv<E>,
        qnet: &mut DqnModel<Q>,
        explorer: &mut EpsilonGreedy,
        trainer: &mut DqnTrainer<Q, T>,
        buffer: &mut R,
        recorder: &mut dyn Recorder,
    ) -> Result<EpisodeStats>
    where
        E: Env<Obs = Tensor, Act = Tensor>,
        Q: SubModel1<Input = Tensor, Output = Tensor>,
        Q::Config: DeserializeOwned + Serialize + OutDim + Clone,
        T: TargetSource<Q>,
        R: ExperienceBufferBase<Item = TensorTransition> + ReplayBufferBase<Batch = TensorTransition>,
    {
        explorer.validate()?;
        explorer.reset();
        trainer.reset(qnet)?;
        let mut stats = EpisodeStats::new(self.config.mean_window);
        let mut total_steps = 0;
        info!("Start training for {} episodes", self.config.max_episodes);

        for episode in 1..=self.config.max_episodes {
            let mut obs = env.reset()?;

            for _ in 0..self.config.max_steps_per_episode {
                let q = qnet.forward(&obs)?;
                let act = explorer.select(&q, &mut self.rng)?;
                explorer.step();

                let step = env.step(&act)?;
                let tr = TensorTransition::from_transition(
                    TensorBatch::from_tensor(obs),
                    TensorBatch::from_tensor(act.reshape((1, 1))?),
                    step.reward,
                    TensorBatch::from_tensor(step.obs.clone()),
                    step.is_done,
                );
                buffer.push(tr)?;

                let loss = trainer.step(qnet, buffer)?;
                stats.push_step(step.reward, loss);
                total_steps += 1;
                trace!("step = {}, reward = {}, loss = {}", total_steps, step.reward, loss);

                obs = step.obs;
                if step.is_done {
                    break;
                }
            }

            let mut record = stats.end_episode();
            if episode % self.config.record_interval == 0 {
                record.insert("epsilon", RecordValue::Scalar(explorer.epsilon() as f32));
                info!(
                    "Episode {}: reward = {}, mean reward = {}, epsilon = {:.3}",
                    episode,
                    record.get_scalar("episode_reward")?,
                    stats.mean_reward(),
                    explorer.epsilon()
                );
                recorder.write(record);
            }
        }

        recorder.flush(total_steps);
        info!(
            "Finished {} episodes, {} steps, {} updates",
            stats.n_episodes(),
            total_steps,
            trainer.n_updates()
        );

        Ok(stats)
    }
}
