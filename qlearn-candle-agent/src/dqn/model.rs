use crate::{
    model::SubModel1,
    opt::{Optimizer, OptimizerConfig},
    util::{clip_grads, hard_copy, var_values, OutDim},
};
use anyhow::{bail, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use log::info;
use qlearn_core::error::QlearnError;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`DqnModel`].
pub struct DqnModelConfig<Q>
where
    Q: OutDim,
{
    pub(super) q_config: Option<Q>,
    pub(super) opt_config: OptimizerConfig,
}

impl<Q> Default for DqnModelConfig<Q>
where
    Q: OutDim,
{
    fn default() -> Self {
        Self {
            q_config: None,
            opt_config: OptimizerConfig::default(),
        }
    }
}

impl<Q> DqnModelConfig<Q>
where
    Q: DeserializeOwned + Serialize + OutDim,
{
    /// Sets configurations for action-value function.
    pub fn q_config(mut self, v: Q) -> Self {
        self.q_config = Some(v);
        self
    }

    /// Sets output dimension of the model.
    pub fn out_dim(mut self, v: usize) -> Self {
        if let Some(q_config) = &mut self.q_config {
            q_config.set_out_dim(v);
        }
        self
    }

    /// Sets optimizer configuration.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }

    /// Constructs [`DqnModelConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`DqnModelConfig`] to as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Action-value function with its parameters and optimizer.
///
/// The parameters of the function live in a [`VarMap`] owned by this struct.
/// [`DqnModel::copy`] creates an independent model with equal parameters,
/// which is used as the frozen target network.
pub struct DqnModel<Q>
where
    Q: SubModel1<Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + OutDim + Clone,
{
    device: Device,
    varmap: VarMap,

    // Dimension of the output vector (equal to the number of actions).
    out_dim: usize,

    // Action-value function
    q: Q,

    opt_config: OptimizerConfig,
    q_config: Q::Config,

    // Built at the first update, so frozen copies never allocate optimizer state
    opt: Option<Optimizer>,
}

impl<Q> DqnModel<Q>
where
    Q: SubModel1<Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + OutDim + Clone,
{
    /// Constructs [`DqnModel`].
    pub fn build(config: DqnModelConfig<Q::Config>, device: Device) -> Result<Self> {
        let q_config = match config.q_config {
            Some(q_config) => q_config,
            None => bail!(QlearnError::InvalidConfig("q_config is not set".to_string())),
        };
        Self::_build(device, config.opt_config, q_config)
    }

    fn _build(device: Device, opt_config: OptimizerConfig, q_config: Q::Config) -> Result<Self> {
        let out_dim = q_config.get_out_dim();
        let varmap = VarMap::new();
        let q = {
            let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
            Q::build(vb, q_config.clone())?
        };
        Ok(Self {
            device,
            varmap,
            out_dim,
            q,
            opt_config,
            q_config,
            opt: None,
        })
    }

    /// Outputs the action-value given observation(s).
    pub fn forward(&self, obs: &Q::Input) -> Result<Tensor> {
        self.q.forward(obs)
    }

    /// Computes gradients of `loss` and applies an optimization step.
    ///
    /// If `clip` is given, the gradient of every parameter is clamped to
    /// `[-clip, clip]` before the step. The optimizer is built at the first
    /// call.
    pub fn backward_step(&mut self, loss: &Tensor, clip: Option<f64>) -> Result<()> {
        let mut grads = loss.backward()?;
        if let Some(clip) = clip {
            clip_grads(&mut grads, &self.varmap, clip)?;
        }
        let opt = match &mut self.opt {
            Some(opt) => opt,
            empty => empty.insert(self.opt_config.build(self.varmap.all_vars())?),
        };
        opt.step(&grads)
    }

    /// Returns a model with a copy of the parameters of this model.
    ///
    /// The returned model has its own parameter storage and no optimizer
    /// state until it is updated.
    pub fn copy(&self) -> Result<Self> {
        let model = Self::_build(
            self.device.clone(),
            self.opt_config.clone(),
            self.q_config.clone(),
        )?;
        hard_copy(&model.varmap, &self.varmap)?;
        Ok(model)
    }

    /// Returns the parameter values as flat vectors, sorted by name.
    pub fn param_values(&self) -> Result<Vec<(String, Vec<f32>)>> {
        var_values(&self.varmap)
    }

    /// Returns the number of actions.
    pub fn out_dim(&self) -> usize {
        self.out_dim
    }

    /// Returns the device of the parameters.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Returns the variables of the model.
    pub fn get_varmap(&self) -> &VarMap {
        &self.varmap
    }

    /// Saves the parameters in safetensors format.
    pub fn save<T: AsRef<Path>>(&self, path: T) -> Result<()> {
        self.varmap.save(&path)?;
        info!("Save dqnmodel to {:?}", path.as_ref());
        Ok(())
    }

    /// Loads the parameters saved with [`DqnModel::save`].
    pub fn load<T: AsRef<Path>>(&mut self, path: T) -> Result<()> {
        self.varmap.load(&path)?;
        info!("Load dqnmodel from {:?}", path.as_ref());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mlp::{Mlp, MlpConfig};
    use tempdir::TempDir;

    fn model() -> Result<DqnModel<Mlp>> {
        let config = DqnModelConfig::default()
            .q_config(MlpConfig::new(3, vec![8], 2, false))
            .opt_config(OptimizerConfig::Adam { lr: 0.01 });
        DqnModel::build(config, Device::Cpu)
    }

    fn loss(model: &DqnModel<Mlp>) -> Result<Tensor> {
        let obs = Tensor::ones((4, 3), DType::F32, &Device::Cpu)?;
        Ok(model.forward(&obs)?.sqr()?.mean_all()?)
    }

    #[test]
    fn test_copy_does_not_alias() -> Result<()> {
        let mut model = model()?;
        let copy = model.copy()?;
        let before = model.param_values()?;
        assert_eq!(copy.param_values()?, before);

        let loss = loss(&model)?;
        model.backward_step(&loss, None)?;
        assert_ne!(model.param_values()?, before);
        assert_eq!(copy.param_values()?, before);
        Ok(())
    }

    #[test]
    fn test_optimizer_is_built_at_first_update() -> Result<()> {
        let mut model = model()?;
        assert!(model.opt.is_none());
        let mut copy = model.copy()?;

        model.backward_step(&loss(&model)?, Some(1.0))?;
        assert!(model.opt.is_some());

        let snapshot = model.copy()?;
        assert!(snapshot.opt.is_none());
        assert_eq!(snapshot.param_values()?, model.param_values()?);

        // A copy can still be trained on its own
        let before = copy.param_values()?;
        copy.backward_step(&loss(&copy)?, None)?;
        assert!(copy.opt.is_some());
        assert_ne!(copy.param_values()?, before);
        Ok(())
    }

    #[test]
    fn test_missing_q_config() {
        let config = DqnModelConfig::<MlpConfig>::default();
        let res = DqnModel::<Mlp>::build(config, Device::Cpu);
        assert!(matches!(
            res.err().unwrap().downcast_ref::<QlearnError>(),
            Some(QlearnError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let model1 = model()?;
        let mut model2 = model()?;
        assert_ne!(model1.param_values()?, model2.param_values()?);

        let dir = TempDir::new("dqn_model")?;
        let path = dir.path().join("qnet.safetensors");
        model1.save(&path)?;
        model2.load(&path)?;
        assert_eq!(model1.param_values()?, model2.param_values()?);
        Ok(())
    }

    #[test]
    fn test_serde_model_config() -> Result<()> {
        let config = DqnModelConfig::default()
            .q_config(MlpConfig::new(4, vec![64, 64], 1, false))
            .out_dim(2)
            .opt_config(OptimizerConfig::default().learning_rate(3e-4));

        let dir = TempDir::new("dqn_model_config")?;
        let path = dir.path().join("model.yaml");
        config.save(&path)?;
        let config_ = DqnModelConfig::<MlpConfig>::load(&path)?;
        assert_eq!(config, config_);
        assert_eq!(config_.q_config.map(|q| q.get_out_dim()), Some(2));
        Ok(())
    }
}
