use super::Record;

/// Writes records to some destination.
pub trait Recorder {
    /// Writes a record.
    fn write(&mut self, record: Record);

    /// Flushes pending records, if the recorder buffers them.
    fn flush(&mut self) {}
}
