//! Records of training metrics.
//!
//! A [`Record`] is a set of named values produced at some point of training,
//! for example at the end of an episode. Records are handed to a [`Recorder`],
//! which decides where they go.
//!
//! # Core Components
//!
//! * [`Record`] - Key-value pairs of metrics
//! * [`RecordValue`] - The value types a record can hold
//! * [`Recorder`] - Destination of records
//! * [`BufferedRecorder`] - Keeps records in memory
//! * [`EpisodeStats`] - Per-episode reward and loss statistics
//!
//! # Basic Usage
//!
//! ```rust
//! use qlearn_core::record::{Record, RecordValue};
//!
//! let mut record = Record::from_slice(&[("episode", RecordValue::Scalar(1.0))]);
//! record.insert("episode_reward", RecordValue::Scalar(-12.0));
//! record.insert("recent_rewards", RecordValue::Array1(vec![-15.0, -12.0]));
//!
//! assert_eq!(record.get_scalar("episode_reward").unwrap(), -12.0);
//! assert_eq!(record.get_array1("recent_rewards").unwrap().len(), 2);
//! ```
mod base;
mod buffered_recorder;
mod episode_stats;
mod recorder;

pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use episode_stats::EpisodeStats;
pub use recorder::Recorder;
