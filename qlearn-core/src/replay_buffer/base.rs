//! Generic implementation of the replay buffer.
use super::{BatchBase, EvictionPolicy, GenericTransitionBatch, SimpleReplayBufferConfig};
use crate::{error::QlearnError, ExperienceBufferBase, ReplayBufferBase, TransitionBatch};
use anyhow::{bail, Context, Result};
use log::trace;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// A fixed-capacity replay buffer for transitions of arbitrary observation
/// and action types.
///
/// Storage is a ring: every field is preallocated for `capacity` rows and
/// rows are written at a cursor. Once the buffer is full, each push
/// overwrites the slot chosen by the [`EvictionPolicy`]; with the default
/// FIFO policy that is always the oldest row, so the buffer holds the most
/// recent `capacity` transitions.
///
/// Batches are sampled uniformly with replacement.
///
/// # Type Parameters
///
/// * `O` - The type of observations, must implement [`BatchBase`]
/// * `A` - The type of actions, must implement [`BatchBase`]
///
/// # Examples
///
/// ```ignore
/// let config = SimpleReplayBufferConfig::default().capacity(10000);
/// let mut buffer = SimpleReplayBuffer::<TensorBatch, TensorBatch>::build(&config)?;
///
/// buffer.push(transition)?;
/// let batch = buffer.batch(32)?;
/// ```
pub struct SimpleReplayBuffer<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    /// Maximum number of transitions that can be stored.
    capacity: usize,

    /// Slot following the most recently written one.
    i: usize,

    /// Current number of stored transitions.
    size: usize,

    obs: O,
    act: A,
    next_obs: O,
    reward: Vec<f32>,
    is_done: Vec<i8>,

    /// Insertion order of the row held in each slot.
    stamps: Vec<u64>,

    /// Number of transitions pushed so far.
    n_pushed: u64,

    eviction: EvictionPolicy,

    /// Random number generator for sampling and eviction.
    rng: StdRng,
}

impl<O, A> SimpleReplayBuffer<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    /// Returns the maximum number of transitions.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of transitions pushed since the buffer was built,
    /// including evicted ones.
    pub fn n_pushed(&self) -> u64 {
        self.n_pushed
    }

    /// Returns the occupied slots ordered from the oldest to the newest row.
    pub fn ordered_indices(&self) -> Vec<usize> {
        let mut ixs = (0..self.size).collect::<Vec<_>>();
        ixs.sort_by_key(|&ix| self.stamps[ix]);
        ixs
    }

    /// Returns the rows at the given slots as a batch.
    pub fn gather(&self, ixs: &[usize]) -> Result<GenericTransitionBatch<O, A>> {
        if self.size == 0 {
            bail!(QlearnError::EmptyBuffer);
        }
        if let Some(&ix) = ixs.iter().find(|&&ix| ix >= self.size) {
            bail!("slot {} is out of the {} stored transitions", ix, self.size);
        }

        Ok(GenericTransitionBatch {
            obs: self.obs.sample(ixs)?,
            act: self.act.sample(ixs)?,
            next_obs: self.next_obs.sample(ixs)?,
            reward: ixs.iter().map(|&ix| self.reward[ix]).collect(),
            is_done: ixs.iter().map(|&ix| self.is_done[ix]).collect(),
        })
    }

    /// Returns all the stored transitions, oldest first.
    ///
    /// # Warning
    ///
    /// This copies the whole buffer; use it with care on large buffers.
    pub fn whole(&self) -> Result<GenericTransitionBatch<O, A>> {
        self.gather(&self.ordered_indices())
    }

    /// Returns the number of terminal transitions in the buffer.
    pub fn num_done_flags(&self) -> usize {
        self.is_done[..self.size]
            .iter()
            .map(|&is_done| is_done as usize)
            .sum()
    }

    /// Returns the sum of all rewards in the buffer.
    pub fn sum_rewards(&self) -> f32 {
        self.reward[..self.size].iter().sum()
    }

    fn check_transition(&self, tr: &GenericTransitionBatch<O, A>) -> Result<()> {
        let lens = [
            tr.len(),
            tr.is_done.len(),
            tr.obs.batch_len(),
            tr.act.batch_len(),
            tr.next_obs.batch_len(),
        ];
        if let Some(&actual) = lens.iter().find(|&&n| n != 1) {
            bail!(QlearnError::BatchSize {
                expected: 1,
                actual,
            });
        }
        // Both observations must share a shape even before storage is allocated
        tr.obs.check_compatible(&tr.next_obs).context("next_obs")?;
        self.obs.check_compatible(&tr.obs).context("obs")?;
        self.act.check_compatible(&tr.act).context("act")?;
        self.next_obs
            .check_compatible(&tr.next_obs)
            .context("next_obs")?;
        self.obs.check_compatible(&tr.next_obs).context("next_obs")?;
        Ok(())
    }
}

impl<O, A> ExperienceBufferBase for SimpleReplayBuffer<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    type Item = GenericTransitionBatch<O, A>;

    fn len(&self) -> usize {
        self.size
    }

    /// Adds a transition to the buffer.
    ///
    /// # Errors
    ///
    /// * [`QlearnError::BatchSize`] if the transition does not have batch size 1.
    /// * [`QlearnError::ShapeMismatch`] if a field does not match the shape of
    ///   the stored transitions.
    ///
    /// The buffer is left untouched when an error is returned.
    fn push(&mut self, tr: Self::Item) -> Result<()> {
        self.check_transition(&tr)?;

        let slot = if self.size < self.capacity {
            self.i
        } else {
            self.eviction.victim(self.i, self.capacity, &mut self.rng)
        };

        let (obs, act, next_obs, reward, is_done) = tr.unpack();
        self.obs.push(slot, obs)?;
        self.act.push(slot, act)?;
        self.next_obs.push(slot, next_obs)?;
        self.reward[slot] = reward[0];
        self.is_done[slot] = is_done[0];
        self.stamps[slot] = self.n_pushed;

        self.n_pushed += 1;
        self.i = (slot + 1) % self.capacity;
        if self.size < self.capacity {
            self.size += 1;
        }
        trace!("Pushed transition into slot {} (len = {})", slot, self.size);

        Ok(())
    }
}

impl<O, A> ReplayBufferBase for SimpleReplayBuffer<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    type Config = SimpleReplayBufferConfig;
    type Batch = GenericTransitionBatch<O, A>;

    fn build(config: &Self::Config) -> Result<Self> {
        config.validate()?;
        let capacity = config.capacity;

        Ok(Self {
            capacity,
            i: 0,
            size: 0,
            obs: O::new(capacity),
            act: A::new(capacity),
            next_obs: O::new(capacity),
            reward: vec![0.; capacity],
            is_done: vec![0; capacity],
            stamps: vec![0; capacity],
            n_pushed: 0,
            eviction: config.eviction,
            rng: StdRng::seed_from_u64(config.seed),
        })
    }

    /// Samples `size` transitions uniformly with replacement.
    ///
    /// # Errors
    ///
    /// [`QlearnError::EmptyBuffer`] if no transition has been pushed yet.
    fn batch(&mut self, size: usize) -> Result<Self::Batch> {
        if self.size == 0 {
            bail!(QlearnError::EmptyBuffer);
        }
        let n = self.size;
        let ixs = (0..size)
            .map(|_| self.rng.gen_range(0..n))
            .collect::<Vec<_>>();

        self.gather(&ixs)
    }
}
