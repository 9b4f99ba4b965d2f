//! Key-value records of metrics.
use crate::error::QlearnError;
use std::collections::HashMap;

/// Possible types of values stored in a [`Record`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    /// A single value, typically a metric like a loss or a return.
    Scalar(f32),

    /// A 1-dimensional array, for example the rewards of recent episodes.
    Array1(Vec<f32>),
}

/// A container of named values.
///
/// # Examples
///
/// ```rust
/// use qlearn_core::record::{Record, RecordValue};
///
/// let mut record = Record::from_slice(&[("loss", RecordValue::Scalar(0.5))]);
/// record.insert("epsilon", RecordValue::Scalar(0.1));
///
/// assert_eq!(record.get_scalar("loss").unwrap(), 0.5);
/// assert!(record.get_array1("loss").is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record(HashMap<String, RecordValue>);

impl Record {
    /// Creates a record from a slice of key-value pairs.
    pub fn from_slice<K: Into<String> + Clone>(s: &[(K, RecordValue)]) -> Self {
        Self(
            s.iter()
                .map(|(k, v)| (k.clone().into(), v.clone()))
                .collect(),
        )
    }

    /// Inserts a key-value pair, overwriting an existing value of the key.
    pub fn insert(&mut self, k: impl Into<String>, v: RecordValue) {
        self.0.insert(k.into(), v);
    }

    /// Gets a scalar value.
    ///
    /// # Errors
    ///
    /// [`QlearnError::RecordKeyError`] if the key does not exist and
    /// [`QlearnError::RecordValueTypeError`] if the value is not a scalar.
    pub fn get_scalar(&self, k: &str) -> Result<f32, QlearnError> {
        match self.0.get(k) {
            Some(RecordValue::Scalar(v)) => Ok(*v),
            Some(_) => Err(QlearnError::RecordValueTypeError("Scalar".to_string())),
            None => Err(QlearnError::RecordKeyError(k.to_string())),
        }
    }

    /// Gets a 1-dimensional array.
    pub fn get_array1(&self, k: &str) -> Result<&[f32], QlearnError> {
        match self.0.get(k) {
            Some(RecordValue::Array1(v)) => Ok(v),
            Some(_) => Err(QlearnError::RecordValueTypeError("Array1".to_string())),
            None => Err(QlearnError::RecordKeyError(k.to_string())),
        }
    }

    /// Returns `true` if the record has no value.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of values.
    pub fn len(&self) -> usize {
        self.0.len()
    }
}
