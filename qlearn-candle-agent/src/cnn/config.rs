use crate::util::OutDim;
use anyhow::{bail, Result};
use qlearn_core::error::QlearnError;
use serde::{Deserialize, Serialize};

fn default_channels() -> Vec<usize> {
    vec![16, 16, 16]
}

fn default_kernel_size() -> usize {
    5
}

fn default_stride() -> usize {
    2
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`Cnn`](super::Cnn).
///
/// The default layer stack is three 5x5 convolutions with stride 2 and 16
/// output channels each, followed by a linear head.
pub struct CnnConfig {
    pub(super) in_channels: usize,
    pub(super) height: usize,
    pub(super) width: usize,
    pub(super) out_dim: usize,

    #[serde(default = "default_channels")]
    pub(super) channels: Vec<usize>,

    #[serde(default = "default_kernel_size")]
    pub(super) kernel_size: usize,

    #[serde(default = "default_stride")]
    pub(super) stride: usize,
}

impl CnnConfig {
    /// Creates configuration for inputs of shape `[batch_size, in_channels, height, width]`.
    pub fn new(in_channels: usize, height: usize, width: usize, out_dim: usize) -> Self {
        Self {
            in_channels,
            height,
            width,
            out_dim,
            channels: default_channels(),
            kernel_size: default_kernel_size(),
            stride: default_stride(),
        }
    }

    /// Sets the output channels of the convolution layers.
    pub fn channels(mut self, v: Vec<usize>) -> Self {
        self.channels = v;
        self
    }

    /// Sets the kernel size of the convolution layers.
    pub fn kernel_size(mut self, v: usize) -> Self {
        self.kernel_size = v;
        self
    }

    /// Sets the stride of the convolution layers.
    pub fn stride(mut self, v: usize) -> Self {
        self.stride = v;
        self
    }

    /// Returns the spatial size `(height, width)` after the convolutions.
    pub fn conv_out_size(&self) -> Result<(usize, usize)> {
        if self.channels.is_empty() || self.kernel_size == 0 || self.stride == 0 {
            bail!(QlearnError::InvalidConfig(
                "cnn needs at least one convolution with positive kernel size and stride"
                    .to_string()
            ));
        }
        let (mut h, mut w) = (self.height, self.width);
        for _ in 0..self.channels.len() {
            if h < self.kernel_size || w < self.kernel_size {
                bail!(QlearnError::InvalidConfig(format!(
                    "input of {}x{} is too small for the convolutions",
                    self.height, self.width
                )));
            }
            h = (h - self.kernel_size) / self.stride + 1;
            w = (w - self.kernel_size) / self.stride + 1;
        }
        Ok((h, w))
    }
}

impl OutDim for CnnConfig {
    fn get_out_dim(&self) -> usize {
        self.out_dim
    }

    fn set_out_dim(&mut self, v: usize) {
        self.out_dim = v;
    }
}
