//! Per-episode statistics of a training run.
use super::{Record, RecordValue};
use std::collections::VecDeque;

/// Accumulates rewards and losses over an episode and summarizes finished
/// episodes.
///
/// ```rust
/// use qlearn_core::record::EpisodeStats;
///
/// let mut stats = EpisodeStats::new(2);
/// stats.push_step(1.0, 0.5);
/// stats.push_step(2.0, 0.0);
/// let record = stats.end_episode();
/// assert_eq!(record.get_scalar("episode_reward").unwrap(), 3.0);
/// ```
#[derive(Debug, Clone)]
pub struct EpisodeStats {
    window: usize,

    // Rewards of the last `window` episodes
    recent: VecDeque<f32>,

    n_episodes: usize,
    best: Option<f32>,
    reward: f32,
    loss: f32,
    n_steps: usize,
}

impl EpisodeStats {
    /// Creates statistics averaging episode rewards over `window` episodes.
    ///
    /// A `window` of 0 is treated as 1.
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            recent: VecDeque::with_capacity(window),
            n_episodes: 0,
            best: None,
            reward: 0.0,
            loss: 0.0,
            n_steps: 0,
        }
    }

    /// Adds the reward and the loss of an environment step in the current episode.
    pub fn push_step(&mut self, reward: f32, loss: f32) {
        self.reward += reward;
        self.loss += loss;
        self.n_steps += 1;
    }

    /// Finishes the current episode and returns its summary.
    ///
    /// The record holds the scalars `episode`, `episode_steps`,
    /// `episode_reward`, `episode_loss`, `mean_reward` and `best_reward`, and
    /// `recent_rewards`, the rewards of the last `window` episodes oldest
    /// first.
    pub fn end_episode(&mut self) -> Record {
        let reward = self.reward;
        if self.recent.len() == self.window {
            self.recent.pop_front();
        }
        self.recent.push_back(reward);
        self.n_episodes += 1;
        let best = self.best.map_or(reward, |b| b.max(reward));
        self.best = Some(best);

        let record = Record::from_slice(&[
            ("episode", RecordValue::Scalar(self.n_episodes as f32)),
            ("episode_steps", RecordValue::Scalar(self.n_steps as f32)),
            ("episode_reward", RecordValue::Scalar(reward)),
            ("episode_loss", RecordValue::Scalar(self.loss)),
            ("mean_reward", RecordValue::Scalar(self.mean_reward())),
            ("best_reward", RecordValue::Scalar(best)),
            (
                "recent_rewards",
                RecordValue::Array1(self.recent.iter().copied().collect()),
            ),
        ]);

        self.reward = 0.0;
        self.loss = 0.0;
        self.n_steps = 0;
        record
    }

    /// Mean reward of the last `window` finished episodes, 0 before the first one.
    pub fn mean_reward(&self) -> f32 {
        if self.recent.is_empty() {
            0.0
        } else {
            self.recent.iter().sum::<f32>() / self.recent.len() as f32
        }
    }

    /// Best episode reward so far.
    pub fn best_reward(&self) -> Option<f32> {
        self.best
    }

    /// Number of finished episodes.
    pub fn n_episodes(&self) -> usize {
        self.n_episodes
    }
}
