//! Row storage backed by a flat [`Vec`].
use super::BatchBase;
use crate::error::QlearnError;
use anyhow::{bail, Result};

/// A batch of fixed-shape rows stored contiguously in a [`Vec`].
///
/// This is the backend-free counterpart of tensor based storages. It is
/// useful for tabular methods and for discrete actions.
#[derive(Clone, Debug, PartialEq)]
pub struct VecBatch<T> {
    data: Vec<T>,

    // Shape of a row, without the batch dimension.
    shape: Option<Vec<usize>>,

    n_rows: usize,
}

impl<T: Copy + Default> VecBatch<T> {
    /// Creates a batch from flat data and its full shape (batch dimension first).
    pub fn from_rows(shape: &[usize], data: Vec<T>) -> Result<Self> {
        if shape.is_empty() {
            bail!(QlearnError::InvalidConfig(
                "shape of VecBatch needs a batch dimension".to_string()
            ));
        }
        let n_elems: usize = shape.iter().product();
        if n_elems != data.len() {
            bail!(QlearnError::ShapeMismatch {
                field: "data".to_string(),
                expected: shape.to_vec(),
                actual: vec![data.len()],
            });
        }
        Ok(Self {
            data,
            shape: Some(shape[1..].to_vec()),
            n_rows: shape[0],
        })
    }

    /// Creates a batch with a single row.
    pub fn from_row(row: Vec<T>) -> Self {
        Self {
            shape: Some(vec![row.len()]),
            n_rows: 1,
            data: row,
        }
    }

    /// Shape of a row, `None` before the first push into an empty storage.
    pub fn row_shape(&self) -> Option<&[usize]> {
        self.shape.as_deref()
    }

    fn row_len(&self) -> usize {
        self.shape
            .as_ref()
            .map(|s| s.iter().product())
            .unwrap_or(0)
    }

    /// Returns the `i`-th row.
    pub fn row(&self, i: usize) -> &[T] {
        let n = self.row_len();
        &self.data[i * n..(i + 1) * n]
    }

    /// Returns the flat data.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}

impl<T: Copy + Default> BatchBase for VecBatch<T> {
    fn new(capacity: usize) -> Self {
        Self {
            data: Vec::new(),
            shape: None,
            n_rows: capacity,
        }
    }

    fn batch_len(&self) -> usize {
        self.n_rows
    }

    fn check_compatible(&self, data: &Self) -> Result<()> {
        match (&self.shape, &data.shape) {
            (Some(expected), Some(actual)) if expected != actual => {
                bail!(QlearnError::ShapeMismatch {
                    field: "row".to_string(),
                    expected: expected.clone(),
                    actual: actual.clone(),
                })
            }
            _ => Ok(()),
        }
    }

    fn push(&mut self, ix: usize, data: Self) -> Result<()> {
        self.check_compatible(&data)?;
        if data.n_rows == 0 {
            return Ok(());
        }
        let shape = match &data.shape {
            Some(shape) => shape.clone(),
            None => return Ok(()),
        };

        if self.shape.is_none() {
            let n: usize = shape.iter().product();
            self.data = vec![T::default(); self.n_rows * n];
            self.shape = Some(shape);
        }

        let n = self.row_len();
        for j in 0..data.n_rows {
            let dst = (ix + j) % self.n_rows;
            self.data[dst * n..(dst + 1) * n].copy_from_slice(data.row(j));
        }

        Ok(())
    }

    fn sample(&self, ixs: &[usize]) -> Result<Self> {
        let shape = match &self.shape {
            Some(shape) => shape.clone(),
            None => bail!(QlearnError::EmptyBuffer),
        };
        let mut data = Vec::with_capacity(ixs.len() * self.row_len());
        for &ix in ixs {
            data.extend_from_slice(self.row(ix));
        }
        Ok(Self {
            data,
            shape: Some(shape),
            n_rows: ixs.len(),
        })
    }
}
