use anyhow::{bail, Result};
use candle_core::{Device, IndexOp, Tensor};
use qlearn_core::{
    error::QlearnError,
    replay_buffer::{BatchBase, GenericTransitionBatch, SimpleReplayBuffer},
};
use std::convert::TryFrom;

/// A transition whose observations and actions are tensors.
pub type TensorTransition = GenericTransitionBatch<TensorBatch, TensorBatch>;

/// A replay buffer storing tensors.
pub type TensorReplayBuffer = SimpleReplayBuffer<TensorBatch, TensorBatch>;

/// A batch of rows held in a single [`Tensor`].
///
/// As storage of a replay buffer, the tensor is allocated on CPU with shape
/// `[capacity, ...]` at the first push, taking the trailing shape and the
/// dtype of the pushed data.
///
/// [`Tensor`]: https://docs.rs/candle-core/0.8.4/candle_core/struct.Tensor.html
#[derive(Clone, Debug)]
pub struct TensorBatch {
    buf: Option<Tensor>,
    capacity: usize,
}

impl TensorBatch {
    /// Wraps a tensor. Its first dimension is the batch dimension.
    pub fn from_tensor(t: Tensor) -> Self {
        let capacity = t.dims().first().copied().unwrap_or(0);
        Self {
            buf: Some(t),
            capacity,
        }
    }

    /// Returns the tensor, `None` for storage without any row.
    pub fn tensor(&self) -> Option<&Tensor> {
        self.buf.as_ref()
    }

    /// Returns the tensor.
    pub fn into_tensor(self) -> Result<Tensor> {
        match self.buf {
            Some(t) => Ok(t),
            None => bail!(QlearnError::EmptyBuffer),
        }
    }

    /// Moves the data to the given device.
    pub fn to_device(self, device: &Device) -> Result<Self> {
        let buf = match self.buf {
            Some(t) => Some(t.to_device(device)?),
            None => None,
        };
        Ok(Self {
            buf,
            capacity: self.capacity,
        })
    }
}

impl From<Tensor> for TensorBatch {
    fn from(t: Tensor) -> Self {
        Self::from_tensor(t)
    }
}

impl TryFrom<TensorBatch> for Tensor {
    type Error = anyhow::Error;

    fn try_from(b: TensorBatch) -> Result<Self> {
        b.into_tensor()
    }
}

impl BatchBase for TensorBatch {
    fn new(capacity: usize) -> Self {
        Self {
            buf: None,
            capacity,
        }
    }

    fn batch_len(&self) -> usize {
        match &self.buf {
            Some(t) => t.dims().first().copied().unwrap_or(0),
            None => self.capacity,
        }
    }

    fn check_compatible(&self, data: &Self) -> Result<()> {
        if let (Some(buf), Some(data)) = (&self.buf, &data.buf) {
            let expected = buf.dims().get(1..).unwrap_or(&[]).to_vec();
            let actual = data.dims().get(1..).unwrap_or(&[]).to_vec();
            if expected != actual || buf.dtype() != data.dtype() {
                bail!(QlearnError::ShapeMismatch {
                    field: format!("tensor ({:?} vs {:?})", buf.dtype(), data.dtype()),
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }

    /// Writes the given rows at `index`, wrapping around the end.
    ///
    /// If the internal buffer is empty, it will be initialized with the shape
    /// `[capacity, data.dims()[1..]]`. Stored rows are kept when an error
    /// is returned.
    fn push(&mut self, index: usize, data: Self) -> Result<()> {
        self.check_compatible(&data)?;
        let data = match data.buf {
            Some(t) if t.rank() > 0 && t.dims()[0] > 0 => t.to_device(&Device::Cpu)?.contiguous()?,
            _ => return Ok(()),
        };
        let batch_size = data.dims()[0];
        if index >= self.capacity || batch_size > self.capacity {
            bail!(
                "cannot write {} rows at {} into storage of {} rows",
                batch_size,
                index,
                self.capacity
            );
        }

        let buf = match &mut self.buf {
            Some(buf) => &*buf,
            empty => {
                let mut shape = data.dims().to_vec();
                shape[0] = self.capacity;
                &*empty.insert(Tensor::zeros(shape, data.dtype(), &Device::Cpu)?)
            }
        };

        if index + batch_size > self.capacity {
            let n = self.capacity - index;
            buf.slice_set(&data.i(..n)?.contiguous()?, 0, index)?;
            buf.slice_set(&data.i(n..)?.contiguous()?, 0, 0)?;
        } else {
            buf.slice_set(&data, 0, index)?;
        }

        Ok(())
    }

    fn sample(&self, ixs: &[usize]) -> Result<Self> {
        let buf = match &self.buf {
            Some(buf) => buf,
            None => bail!(QlearnError::EmptyBuffer),
        };
        let capacity = ixs.len();
        let ixs = {
            let ixs = ixs.iter().map(|&x| x as u32).collect::<Vec<_>>();
            Tensor::from_vec(ixs, &[capacity], buf.device())?
        };
        let buf = Some(buf.index_select(&ixs, 0)?);
        Ok(Self { buf, capacity })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::DType;
    use qlearn_core::{
        replay_buffer::SimpleReplayBufferConfig, ExperienceBufferBase, ReplayBufferBase,
    };

    fn transition(i: usize) -> Result<TensorTransition> {
        let obs = Tensor::full(i as f32, (1, 3), &Device::Cpu)?;
        let next_obs = Tensor::full(i as f32 + 1., (1, 3), &Device::Cpu)?;
        let act = Tensor::from_vec(vec![(i % 2) as i64], (1, 1), &Device::Cpu)?;
        Ok(TensorTransition::from_transition(
            obs.into(),
            act.into(),
            i as f32,
            next_obs.into(),
            false,
        ))
    }

    #[test]
    fn test_push_and_sample() -> Result<()> {
        let mut storage = TensorBatch::new(4);
        for i in 0..6 {
            let t = Tensor::full(i as f32, (1, 2), &Device::Cpu)?;
            storage.push(i % 4, t.into())?;
        }
        let b = storage.sample(&[0, 1, 3, 3])?.into_tensor()?;
        assert_eq!(b.dims(), &[4, 2]);
        let v = b.to_vec2::<f32>()?;
        assert_eq!(v, vec![vec![4., 4.], vec![5., 5.], vec![3., 3.], vec![3., 3.]]);
        Ok(())
    }

    #[test]
    fn test_failed_push_keeps_rows() -> Result<()> {
        let mut storage = TensorBatch::new(2);
        let row = |v: f32| Tensor::from_vec(vec![v, v], (1, 2), &Device::Cpu);
        storage.push(0, row(1.)?.into())?;
        storage.push(1, row(2.)?.into())?;

        let too_many = Tensor::zeros((3, 2), DType::F32, &Device::Cpu)?;
        assert!(storage.push(1, too_many.into()).is_err());
        assert!(storage.push(2, row(3.)?.into()).is_err());

        let v = storage.sample(&[0, 1])?.into_tensor()?.to_vec2::<f32>()?;
        assert_eq!(v, vec![vec![1., 1.], vec![2., 2.]]);
        Ok(())
    }

    #[test]
    fn test_rejects_inconsistent_observations() -> Result<()> {
        let config = SimpleReplayBufferConfig::default().capacity(3);
        let mut buffer = TensorReplayBuffer::build(&config)?;
        let tr = TensorTransition::from_transition(
            Tensor::zeros((1, 2), DType::F32, &Device::Cpu)?.into(),
            Tensor::zeros((1, 1), DType::I64, &Device::Cpu)?.into(),
            0.,
            Tensor::zeros((1, 3), DType::F32, &Device::Cpu)?.into(),
            false,
        );
        assert!(buffer.push(tr).is_err());
        assert_eq!(buffer.len(), 0);

        buffer.push(transition(0)?)?;
        assert_eq!(buffer.len(), 1);
        Ok(())
    }

    #[test]
    fn test_rejects_other_dtype() -> Result<()> {
        let mut storage = TensorBatch::new(4);
        storage.push(0, Tensor::zeros((1, 2), DType::F32, &Device::Cpu)?.into())?;
        let res = storage.push(1, Tensor::zeros((1, 2), DType::I64, &Device::Cpu)?.into());
        assert!(matches!(
            res.unwrap_err().downcast_ref::<QlearnError>(),
            Some(QlearnError::ShapeMismatch { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_tensor_replay_buffer() -> Result<()> {
        let config = SimpleReplayBufferConfig::default().capacity(5);
        let mut buffer = TensorReplayBuffer::build(&config)?;
        for i in 0..8 {
            buffer.push(transition(i)?)?;
        }
        assert_eq!(buffer.len(), 5);

        let batch = buffer.batch(16)?;
        let obs = batch.obs.into_tensor()?.to_vec2::<f32>()?;
        let next_obs = batch.next_obs.into_tensor()?.to_vec2::<f32>()?;
        let act = batch.act.into_tensor()?;
        assert_eq!(act.dims(), &[16, 1]);
        for j in 0..16 {
            let r = batch.reward[j];
            assert!(r >= 3.);
            assert_eq!(obs[j], vec![r; 3]);
            assert_eq!(next_obs[j], vec![r + 1.; 3]);
        }

        // Wrong trailing shape is rejected without modifying the buffer
        let tr = TensorTransition::from_transition(
            Tensor::zeros((1, 4), DType::F32, &Device::Cpu)?.into(),
            Tensor::zeros((1, 1), DType::I64, &Device::Cpu)?.into(),
            0.,
            Tensor::zeros((1, 4), DType::F32, &Device::Cpu)?.into(),
            true,
        );
        assert!(buffer.push(tr).is_err());
        assert_eq!(buffer.len(), 5);
        assert_eq!(buffer.num_done_flags(), 0);
        Ok(())
    }
}
