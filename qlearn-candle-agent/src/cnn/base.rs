use super::CnnConfig;
use crate::model::SubModel1;
use anyhow::Result;
use candle_core::{DType::F32, Device, Tensor};
use candle_nn::{
    conv::Conv2dConfig,
    conv2d, linear,
    sequential::{seq, Sequential},
    Module, VarBuilder,
};

/// Convolutional neural network with a linear head.
///
/// Each convolution is followed by ReLU. The input is a
/// `[batch_size, in_channels, height, width]` tensor.
pub struct Cnn {
    device: Device,
    seq: Sequential,
}

impl Cnn {
    fn create_net(vb: &VarBuilder, config: &CnnConfig) -> Result<Sequential> {
        let (h, w) = config.conv_out_size()?;
        let conv_config = Conv2dConfig {
            stride: config.stride,
            ..Default::default()
        };

        let mut seq = seq().add_fn(|xs| xs.to_dtype(F32));
        let mut in_channels = config.in_channels;
        for (i, &out_channels) in config.channels.iter().enumerate() {
            seq = seq
                .add(conv2d(
                    in_channels,
                    out_channels,
                    config.kernel_size,
                    conv_config,
                    vb.pp(format!("c{}", i + 1)),
                )?)
                .add_fn(|xs| xs.relu());
            in_channels = out_channels;
        }
        let lin_size = in_channels * h * w;
        let seq = seq
            .add_fn(|xs| xs.flatten_from(1))
            .add(linear(lin_size, config.out_dim, vb.pp("head"))?);

        Ok(seq)
    }
}

impl SubModel1 for Cnn {
    type Config = CnnConfig;
    type Input = Tensor;
    type Output = Tensor;

    fn forward(&self, x: &Self::Input) -> Result<Tensor> {
        Ok(self.seq.forward(&x.to_device(&self.device)?)?)
    }

    fn build(vb: VarBuilder, config: Self::Config) -> Result<Self> {
        let device = vb.device().clone();
        let seq = Self::create_net(&vb, &config)?;

        Ok(Self { device, seq })
    }
}
