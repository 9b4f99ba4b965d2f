//! Generic implementation of transition batches.
//!
//! A transition batch bundles observations, actions, next observations,
//! rewards and termination flags. The same type is used both for a single
//! transition pushed into [`SimpleReplayBuffer`](super::SimpleReplayBuffer)
//! (batch size 1) and for batches sampled from it.
use crate::TransitionBatch;
use anyhow::Result;

/// Row storage for observations or actions.
///
/// An implementation holds a number of rows sharing a trailing shape. It is
/// used in two roles: as the fixed-capacity storage inside a replay buffer,
/// and as the data of a transition or a sampled batch.
///
/// # Examples
///
/// ```ignore
/// struct RowBatch {
///     rows: Vec<Vec<f32>>,
/// }
///
/// impl BatchBase for RowBatch {
///     fn new(capacity: usize) -> Self {
///         Self { rows: vec![vec![]; capacity] }
///     }
///
///     fn batch_len(&self) -> usize {
///         self.rows.len()
///     }
///
///     fn check_compatible(&self, _data: &Self) -> Result<()> {
///         Ok(())
///     }
///
///     fn push(&mut self, ix: usize, data: Self) -> Result<()> {
///         self.rows[ix] = data.rows[0].clone();
///         Ok(())
///     }
///
///     fn sample(&self, ixs: &[usize]) -> Result<Self> {
///         Ok(Self { rows: ixs.iter().map(|&i| self.rows[i].clone()).collect() })
///     }
/// }
/// ```
pub trait BatchBase: Sized {
    /// Creates storage for `capacity` rows.
    ///
    /// The trailing shape is typically fixed by the first call of
    /// [`BatchBase::push`].
    fn new(capacity: usize) -> Self;

    /// Returns the size of the leading (batch) dimension.
    ///
    /// For storage created with [`BatchBase::new`] this is the capacity.
    fn batch_len(&self) -> usize;

    /// Checks that `data` can be written into this storage.
    ///
    /// Fails if the trailing shape (or element type) of `data` differs from
    /// the rows already held. Storage without any row accepts anything.
    fn check_compatible(&self, data: &Self) -> Result<()>;

    /// Writes the rows of `data` starting at row `ix`, wrapping around at
    /// the capacity.
    ///
    /// Fails under the same conditions as [`BatchBase::check_compatible`].
    fn push(&mut self, ix: usize, data: Self) -> Result<()>;

    /// Gathers the rows at `ixs`, in that order. Indices may repeat.
    fn sample(&self, ixs: &[usize]) -> Result<Self>;
}

/// A generic structure representing transitions in reinforcement learning.
///
/// # Type Parameters
///
/// * `O` - Observation type, must implement `BatchBase`
/// * `A` - Action type, must implement `BatchBase`
pub struct GenericTransitionBatch<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    /// Current observations
    pub obs: O,

    /// Selected actions
    pub act: A,

    /// Next state observations
    pub next_obs: O,

    /// Transition rewards
    pub reward: Vec<f32>,

    /// Episode termination flags, `1` for terminal transitions.
    pub is_done: Vec<i8>,
}

impl<O, A> TransitionBatch for GenericTransitionBatch<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    type ObsBatch = O;
    type ActBatch = A;

    fn unpack(self) -> (O, A, O, Vec<f32>, Vec<i8>) {
        (self.obs, self.act, self.next_obs, self.reward, self.is_done)
    }

    fn len(&self) -> usize {
        self.reward.len()
    }

    fn obs(&self) -> &Self::ObsBatch {
        &self.obs
    }

    fn act(&self) -> &Self::ActBatch {
        &self.act
    }
}

impl<O, A> GenericTransitionBatch<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    /// Creates a single transition `(o_t, a_t, r_t, o_t+1, done_t)`.
    ///
    /// `obs`, `act` and `next_obs` are expected to have batch size 1.
    pub fn from_transition(obs: O, act: A, reward: f32, next_obs: O, is_done: bool) -> Self {
        Self {
            obs,
            act,
            next_obs,
            reward: vec![reward],
            is_done: vec![is_done as i8],
        }
    }
}
