use super::{Record, Recorder};
use log::debug;

/// Keeps every written record in memory.
///
/// This is used for inspecting the course of a training run after it
/// finishes, for example in tests.
#[derive(Default)]
pub struct BufferedRecorder {
    buf: Vec<Record>,
}

impl BufferedRecorder {
    /// Construct the recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns an iterator over the records.
    pub fn iter(&self) -> std::slice::Iter<Record> {
        self.buf.iter()
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

impl Recorder for BufferedRecorder {
    fn write(&mut self, record: Record) {
        self.buf.push(record);
    }

    fn flush(&mut self, step: i64) {
        debug!("{} records buffered at step {}", self.buf.len(), step);
    }
}
