//! Observation filters on tensors.
use anyhow::{bail, Result};
use candle_core::Tensor;
use qlearn_core::{error::QlearnError, filter::ObsFilter};
use std::collections::VecDeque;

/// Adds a leading batch dimension of size 1.
#[derive(Debug, Default, Clone, Copy)]
pub struct AddBatchDim;

impl ObsFilter<Tensor> for AddBatchDim {
    fn filt(&mut self, obs: Tensor) -> Result<Tensor> {
        Ok(obs.unsqueeze(0)?)
    }

    fn shape(&self, shape: &[usize]) -> Vec<usize> {
        std::iter::once(1).chain(shape.iter().copied()).collect()
    }
}

/// Multiplies observations by a constant, for example `1 / 255` for images.
#[derive(Debug, Clone, Copy)]
pub struct Scale {
    factor: f64,
}

impl Scale {
    /// Creates the filter.
    pub fn new(factor: f64) -> Self {
        Self { factor }
    }
}

impl ObsFilter<Tensor> for Scale {
    fn filt(&mut self, obs: Tensor) -> Result<Tensor> {
        Ok(obs.affine(self.factor, 0.0)?)
    }
}

/// Stacks the last `n_stack` observations along the channel dimension.
///
/// Observations are expected to have a batch dimension followed by a
/// channel dimension, as in `[1, channels, height, width]`. At the start of
/// an episode the missing frames are zeros.
#[derive(Debug, Clone)]
pub struct FrameStack {
    n_stack: usize,
    frames: VecDeque<Tensor>,
}

impl FrameStack {
    /// Creates the filter.
    pub fn new(n_stack: usize) -> Result<Self> {
        if n_stack == 0 {
            bail!(QlearnError::InvalidConfig(
                "n_stack must be positive".to_string()
            ));
        }
        Ok(Self {
            n_stack,
            frames: VecDeque::with_capacity(n_stack),
        })
    }
}

impl ObsFilter<Tensor> for FrameStack {
    fn filt(&mut self, obs: Tensor) -> Result<Tensor> {
        if obs.rank() < 2 {
            bail!(QlearnError::ShapeMismatch {
                field: "frame".to_string(),
                expected: vec![1, 1],
                actual: obs.dims().to_vec(),
            });
        }
        if self.frames.is_empty() {
            for _ in 0..self.n_stack {
                self.frames.push_back(obs.zeros_like()?);
            }
        }
        self.frames.pop_front();
        self.frames.push_back(obs);

        let frames = self.frames.iter().collect::<Vec<_>>();
        Ok(Tensor::cat(&frames, 1)?)
    }

    fn shape(&self, shape: &[usize]) -> Vec<usize> {
        let mut shape = shape.to_vec();
        if let Some(c) = shape.get_mut(1) {
            *c *= self.n_stack;
        }
        shape
    }

    fn reset(&mut self) {
        self.frames.clear();
    }
}
