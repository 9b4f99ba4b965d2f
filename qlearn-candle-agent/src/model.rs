//! Interface of neural networks used as action-value functions.
use anyhow::Result;
use candle_nn::VarBuilder;

/// Neural network model not owing its [`VarMap`] internally.
///
/// The parameters are created through the given [`VarBuilder`], so that the
/// owner of the [`VarMap`] can optimize, copy and save them.
///
/// [`VarMap`]: https://docs.rs/candle-nn/0.8.4/candle_nn/var_map/struct.VarMap.html
pub trait SubModel1 {
    /// Configuration from which [`SubModel1`] is constructed.
    type Config;

    /// Input of the [`SubModel1`].
    type Input;

    /// Output of the [`SubModel1`].
    type Output;

    /// Builds [`SubModel1`] with [`VarBuilder`] and [`SubModel1::Config`].
    ///
    /// [`VarBuilder`]: https://docs.rs/candle-nn/0.8.4/candle_nn/var_builder/type.VarBuilder.html
    fn build(vb: VarBuilder, config: Self::Config) -> Result<Self>
    where
        Self: Sized;

    /// A generalized forward function.
    fn forward(&self, input: &Self::Input) -> Result<Self::Output>;
}
