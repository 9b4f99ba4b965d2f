//! Optimizers.
use anyhow::Result;
use candle_core::{backprop::GradStore, Var};
use candle_nn::{AdamW, Optimizer as _, ParamsAdamW, SGD};
use candle_optimisers::adam::{Adam, ParamsAdam};
use serde::{Deserialize, Serialize};

/// Configuration of the optimizer of an action-value function.
///
/// Parameters not listed here take the defaults of the underlying
/// optimizer.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub enum OptimizerConfig {
    /// AdamW of `candle-nn`.
    AdamW {
        /// Learning rate.
        lr: f64,

        /// Weight decay.
        #[serde(default)]
        weight_decay: f64,
    },

    /// Adam of `candle-optimisers`.
    Adam {
        /// Learning rate.
        lr: f64,
    },

    /// Plain stochastic gradient descent.
    Sgd {
        /// Learning rate.
        lr: f64,
    },
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::AdamW {
            lr: 1e-4,
            weight_decay: 0.0,
        }
    }
}

impl OptimizerConfig {
    /// Builds the optimizer updating `vars`.
    pub fn build(&self, vars: Vec<Var>) -> Result<Optimizer> {
        let opt = match *self {
            Self::AdamW { lr, weight_decay } => Optimizer::AdamW(AdamW::new(
                vars,
                ParamsAdamW {
                    lr,
                    weight_decay,
                    ..ParamsAdamW::default()
                },
            )?),
            Self::Adam { lr } => Optimizer::Adam(Adam::new(
                vars,
                ParamsAdam {
                    lr,
                    ..ParamsAdam::default()
                },
            )?),
            Self::Sgd { lr } => Optimizer::Sgd(SGD::new(vars, lr)?),
        };
        Ok(opt)
    }

    /// Returns the configuration with the learning rate replaced.
    pub fn learning_rate(self, lr: f64) -> Self {
        match self {
            Self::AdamW { weight_decay, .. } => Self::AdamW { lr, weight_decay },
            Self::Adam { .. } => Self::Adam { lr },
            Self::Sgd { .. } => Self::Sgd { lr },
        }
    }

    /// Learning rate.
    pub fn lr(&self) -> f64 {
        match *self {
            Self::AdamW { lr, .. } | Self::Adam { lr } | Self::Sgd { lr } => lr,
        }
    }
}

/// Optimizer built from [`OptimizerConfig`].
///
/// Gradients are computed by the caller, so that they can be clipped
/// before the update.
pub enum Optimizer {
    /// AdamW optimizer.
    AdamW(AdamW),

    /// Adam optimizer.
    Adam(Adam),

    /// Stochastic gradient descent.
    Sgd(SGD),
}

impl Optimizer {
    /// Updates the variables with the given gradients.
    pub fn step(&mut self, grads: &GradStore) -> Result<()> {
        match self {
            Self::AdamW(opt) => opt.step(grads)?,
            Self::Adam(opt) => opt.step(grads)?,
            Self::Sgd(opt) => opt.step(grads)?,
        }
        Ok(())
    }
}
