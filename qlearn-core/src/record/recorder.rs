use super::Record;

/// Writes a record to an output destination with [`Recorder::write`].
pub trait Recorder {
    /// Write a record to the [`Recorder`].
    fn write(&mut self, record: Record);

    /// Flushes buffered values, if any, tagged with the given step.
    fn flush(&mut self, _step: i64) {}
}
