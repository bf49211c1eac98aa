//! Types and traits for recording training metrics.
//!
//! ```rust
//! use kestrel_core::record::{Record, RecordValue};
//!
//! let mut record = Record::empty();
//! record.insert("epoch", RecordValue::Scalar(3.0));
//! record.insert("test_accuracy", RecordValue::Scalar(0.25));
//! assert_eq!(record.get_scalar("epoch").unwrap(), 3.0);
//! ```
mod base;
mod buffered_recorder;
mod null_recorder;
mod recorder;

pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use null_recorder::NullRecorder;
pub use recorder::Recorder;
