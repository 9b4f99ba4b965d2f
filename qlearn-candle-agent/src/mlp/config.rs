use crate::util::OutDim;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`Mlp`](super::Mlp).
pub struct MlpConfig {
    pub(super) in_dim: usize,
    pub(super) units: Vec<usize>,
    pub(super) out_dim: usize,
    pub(super) activation_out: bool,
}

impl MlpConfig {
    /// Creates configuration of MLP.
    ///
    /// * `units` - Numbers of units of the hidden layers, may be empty.
    /// * `activation_out` - If `true`, activation function is added in the final layer.
    pub fn new(in_dim: usize, units: Vec<usize>, out_dim: usize, activation_out: bool) -> Self {
        Self {
            in_dim,
            units,
            out_dim,
            activation_out,
        }
    }

    /// Returns the sizes of all layers, from the input to the output.
    pub(super) fn dims(&self) -> Vec<usize> {
        std::iter::once(self.in_dim)
            .chain(self.units.iter().copied())
            .chain(std::iter::once(self.out_dim))
            .collect()
    }
}

impl OutDim for MlpConfig {
    fn get_out_dim(&self) -> usize {
        self.out_dim
    }

    fn set_out_dim(&mut self, out_dim: usize) {
        self.out_dim = out_dim;
    }
}
