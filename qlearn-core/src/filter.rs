//! Observation preprocessing.
//!
//! Observations of an environment can be transformed by an ordered chain of
//! filters before they reach the agent and the replay buffer. Filters may be
//! stateful (frame stacking, for example); their state is cleared at every
//! episode reset.
use crate::{Env, Step};
use anyhow::Result;
use log::trace;

/// Transforms an observation.
pub trait ObsFilter<O> {
    /// Filters an observation.
    fn filt(&mut self, obs: O) -> Result<O>;

    /// Returns the shape of filtered observations given the input shape.
    fn shape(&self, shape: &[usize]) -> Vec<usize> {
        shape.to_vec()
    }

    /// Called when the environment is reset.
    ///
    /// This method is useful for stateful filters.
    fn reset(&mut self) {}
}

/// Applies filters in the order they were pushed.
pub struct FilterChain<O> {
    filters: Vec<Box<dyn ObsFilter<O>>>,
}

impl<O> Default for FilterChain<O> {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
        }
    }
}

impl<O> FilterChain<O> {
    /// Creates an empty chain, which passes observations through.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a filter to the chain.
    pub fn push(mut self, filter: impl ObsFilter<O> + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Returns the number of filters.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns `true` if the chain has no filter.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl<O> ObsFilter<O> for FilterChain<O> {
    fn filt(&mut self, obs: O) -> Result<O> {
        self.filters.iter_mut().try_fold(obs, |obs, f| f.filt(obs))
    }

    fn shape(&self, shape: &[usize]) -> Vec<usize> {
        self.filters
            .iter()
            .fold(shape.to_vec(), |shape, f| f.shape(&shape))
    }

    fn reset(&mut self) {
        self.filters.iter_mut().for_each(|f| f.reset());
    }
}

/// An environment whose observations go through a [`FilterChain`].
pub struct FilteredEnv<E: Env> {
    env: E,
    chain: FilterChain<E::Obs>,
}

impl<E: Env> FilteredEnv<E> {
    /// Wraps an environment.
    pub fn new(env: E, chain: FilterChain<E::Obs>) -> Self {
        Self { env, chain }
    }

    /// Returns the wrapped environment.
    pub fn inner(&self) -> &E {
        &self.env
    }

    /// Resets the environment and the filters, returning the filtered
    /// initial observation.
    pub fn reset(&mut self) -> Result<E::Obs> {
        self.chain.reset();
        let obs = self.env.reset()?;
        trace!("Reset filtered environment");
        self.chain.filt(obs)
    }

    /// Performs an environment step and filters the resulting observation.
    pub fn step(&mut self, a: &E::Act) -> Result<Step<E>> {
        let step = self.env.step(a)?;
        let obs = self.chain.filt(step.obs)?;
        Ok(Step::new(obs, step.reward, step.is_done))
    }

    /// Returns the shape of filtered observations and the number of actions.
    pub fn size(&self) -> (Vec<usize>, usize) {
        let (shape, n_actions) = self.env.size();
        (self.chain.shape(&shape), n_actions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct CountEnv {
        t: i64,
    }

    impl Env for CountEnv {
        type Config = ();
        type Obs = Vec<i64>;
        type Act = i64;

        fn build(_config: &(), _seed: i64) -> Result<Self> {
            Ok(Self { t: 0 })
        }

        fn reset(&mut self) -> Result<Vec<i64>> {
            self.t = 0;
            Ok(vec![0])
        }

        fn step(&mut self, a: &i64) -> Result<Step<Self>> {
            self.t += a;
            Ok(Step::new(vec![self.t], 1.0, self.t >= 3))
        }

        fn size(&self) -> (Vec<usize>, usize) {
            (vec![1, 1], 2)
        }
    }

    struct Double;

    impl ObsFilter<Vec<i64>> for Double {
        fn filt(&mut self, obs: Vec<i64>) -> Result<Vec<i64>> {
            Ok(obs.into_iter().map(|x| 2 * x).collect())
        }
    }

    // Appends the previous observation
    #[derive(Default)]
    struct Previous {
        prev: Option<Vec<i64>>,
    }

    impl ObsFilter<Vec<i64>> for Previous {
        fn filt(&mut self, obs: Vec<i64>) -> Result<Vec<i64>> {
            let prev = self.prev.replace(obs.clone()).unwrap_or(vec![-1]);
            Ok(obs.into_iter().chain(prev).collect())
        }

        fn shape(&self, shape: &[usize]) -> Vec<usize> {
            vec![shape[0], 2 * shape[1]]
        }

        fn reset(&mut self) {
            self.prev = None;
        }
    }

    #[test]
    fn test_filters_apply_in_order() -> Result<()> {
        let chain = FilterChain::new().push(Double).push(Previous::default());
        let mut env = FilteredEnv::new(CountEnv::build(&(), 0)?, chain);
        assert_eq!(env.size(), (vec![1, 2], 2));

        assert_eq!(env.reset()?, vec![0, -1]);
        let step = env.step(&1)?;
        assert_eq!(step.obs, vec![2, 0]);
        let step = env.step(&2)?;
        assert_eq!(step.obs, vec![6, 2]);
        assert!(step.is_done);

        // State of filters is cleared on reset
        assert_eq!(env.reset()?, vec![0, -1]);
        Ok(())
    }

    #[test]
    fn test_empty_chain_passes_through() -> Result<()> {
        let mut chain = FilterChain::<Vec<i64>>::new();
        assert!(chain.is_empty());
        assert_eq!(chain.filt(vec![3, 4])?, vec![3, 4]);
        assert_eq!(chain.shape(&[1, 2]), vec![1, 2]);
        Ok(())
    }
}
