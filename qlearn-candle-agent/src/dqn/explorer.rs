//! Exploration strategy of DQN.
use anyhow::{bail, Result};
use candle_core::{shape::D, DType, Tensor};
use qlearn_core::error::QlearnError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Epsilon-greedy explorer for DQN.
///
/// The probability of a random action decays linearly from `eps_start` to
/// `eps_final` over `decay_steps` calls of [`EpsilonGreedy::step`], then
/// stays at `eps_final`.
///
/// ```rust
/// use qlearn_candle_agent::dqn::EpsilonGreedy;
///
/// let mut explorer = EpsilonGreedy::new(1.0, 0.1, 10);
/// explorer.reset();
/// for _ in 0..5 {
///     explorer.step();
/// }
/// assert!((explorer.epsilon() - 0.55).abs() < 1e-9);
/// ```
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct EpsilonGreedy {
    /// Probability of a random action at the first step.
    pub eps_start: f64,

    /// Probability of a random action after the decay.
    pub eps_final: f64,

    /// Number of steps over which the probability decays.
    pub decay_steps: usize,

    #[serde(skip)]
    counter: usize,
}

impl Default for EpsilonGreedy {
    fn default() -> Self {
        Self::new(1.0, 0.02, 100_000)
    }
}

impl EpsilonGreedy {
    /// Constructs epsilon-greedy explorer.
    pub fn new(eps_start: f64, eps_final: f64, decay_steps: usize) -> Self {
        Self {
            eps_start,
            eps_final,
            decay_steps,
            counter: 0,
        }
    }

    /// Set the epsilon value at the start.
    pub fn eps_start(mut self, v: f64) -> Self {
        self.eps_start = v;
        self
    }

    /// Set the epsilon value at the final step.
    pub fn eps_final(mut self, v: f64) -> Self {
        self.eps_final = v;
        self
    }

    /// Set the number of decay steps.
    pub fn decay_steps(mut self, v: usize) -> Self {
        self.decay_steps = v;
        self
    }

    /// Checks the values of the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.decay_steps == 0 {
            bail!(QlearnError::InvalidConfig(
                "decay_steps must be positive".to_string()
            ));
        }
        let in_range = |v: f64| (0.0..=1.0).contains(&v);
        if !in_range(self.eps_start) || !in_range(self.eps_final) {
            bail!(QlearnError::InvalidConfig(format!(
                "epsilon must be in [0, 1], got start = {} and final = {}",
                self.eps_start, self.eps_final
            )));
        }
        Ok(())
    }

    /// Resets the step counter.
    pub fn reset(&mut self) {
        self.counter = 0;
    }

    /// Advances the step counter by one.
    pub fn step(&mut self) {
        self.counter += 1;
    }

    /// Returns the number of steps since the last reset.
    pub fn counter(&self) -> usize {
        self.counter
    }

    /// Returns the current probability of a random action.
    pub fn epsilon(&self) -> f64 {
        let d = (self.eps_final - self.eps_start) / self.decay_steps as f64;
        (self.eps_start + d * self.counter as f64).max(self.eps_final)
    }

    /// Selects actions given action values, returns an `i64` tensor.
    ///
    /// * `q` - action values of shape `[batch_size, n_actions]`.
    ///
    /// Each row independently takes a uniformly random action with
    /// probability epsilon and the greedy action otherwise.
    pub fn select(&self, q: &Tensor, rng: &mut impl Rng) -> Result<Tensor> {
        let eps = self.epsilon();
        let (n_samples, n_actions) = q.dims2()?;
        let greedy: Vec<i64> = q.argmax(D::Minus1)?.to_dtype(DType::I64)?.to_vec1()?;

        let act = greedy
            .into_iter()
            .map(|a| {
                if rng.gen::<f64>() <= eps {
                    rng.gen_range(0..n_actions as i64)
                } else {
                    a
                }
            })
            .collect::<Vec<_>>();

        Ok(Tensor::from_vec(act, &[n_samples], q.device())?)
    }

    /// Constructs [`EpsilonGreedy`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`EpsilonGreedy`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
