//! Utilities.
use anyhow::{anyhow, Context, Result};
use candle_core::{backprop::GradStore, Tensor};
use candle_nn::VarMap;
use log::trace;
use serde::{Deserialize, Serialize};

/// Critic loss type.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Copy)]
pub enum CriticLoss {
    /// Mean squared error.
    Mse,

    /// Smooth L1 loss.
    SmoothL1,
}

impl Default for CriticLoss {
    fn default() -> Self {
        Self::SmoothL1
    }
}

/// Interface for handling output dimensions.
pub trait OutDim {
    /// Returns the output dimension.
    fn get_out_dim(&self) -> usize;

    /// Sets the output dimension.
    fn set_out_dim(&mut self, v: usize);
}

/// Copies the values of variables in `src` into `dest`.
///
/// Variables are identified by their names. Values are written into the
/// storage of `dest`, so the two maps never share memory afterwards.
pub fn hard_copy(dest: &VarMap, src: &VarMap) -> Result<()> {
    let dest = dest.data().lock().map_err(|e| anyhow!("{}", e))?;
    let src = src.data().lock().map_err(|e| anyhow!("{}", e))?;

    for (k, v_dest) in dest.iter() {
        let v_src = src
            .get(k)
            .with_context(|| format!("variable {} is missing in the source", k))?;
        v_dest.set(v_src.as_tensor())?;
    }
    trace!("Copied {} variables", dest.len());

    Ok(())
}

/// Clamps the gradients of all variables in `varmap` to `[-clip, clip]`.
///
/// The clamped gradients replace the original ones in `grads`.
pub fn clip_grads(grads: &mut GradStore, varmap: &VarMap, clip: f64) -> Result<()> {
    for var in varmap.all_vars() {
        let clipped = match grads.get(var.as_tensor()) {
            Some(g) => g.clamp(-clip, clip)?,
            None => continue,
        };
        grads.insert(var.as_tensor(), clipped);
    }
    Ok(())
}

/// See <https://pytorch.org/docs/stable/generated/torch.nn.SmoothL1Loss.html>.
///
/// `beta` is fixed to 1 and the loss is averaged over all elements.
pub fn smooth_l1_loss(x: &Tensor, y: &Tensor) -> Result<Tensor> {
    let d = x.sub(y)?.abs()?;
    let m1 = d.lt(1.0)?.to_dtype(d.dtype())?;
    let m2 = m1.affine(-1.0, 1.0)?;
    let quadratic = m1.mul(&d.sqr()?.affine(0.5, 0.0)?)?;
    let linear = m2.mul(&d.affine(1.0, -0.5)?)?;
    Ok(quadratic.add(&linear)?.mean_all()?)
}

/// Returns the values of all variables as flat vectors, sorted by name.
pub fn var_values(varmap: &VarMap) -> Result<Vec<(String, Vec<f32>)>> {
    let data = varmap.data().lock().map_err(|e| anyhow!("{}", e))?;
    let mut values = data
        .iter()
        .map(|(k, v)| -> Result<(String, Vec<f32>)> {
            Ok((k.clone(), v.as_tensor().flatten_all()?.to_vec1::<f32>()?))
        })
        .collect::<Result<Vec<_>>>()?;
    values.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(values)
}
