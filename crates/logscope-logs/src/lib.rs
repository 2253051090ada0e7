//! Record processing for logscope
//!
//! This crate provides the bounded record window, the client-side filter
//! engine, CSV export, and the polling stream controller.

mod buffer;
mod export;
mod filter;
mod stream;

pub use buffer::{ClassificationCounts, LevelCounts, RecordBuffer};
pub use export::to_csv;
pub use filter::{filter_records, ClassificationFilter, FilterSpec};
pub use stream::{RecordSource, StreamConfig, StreamController, StreamState};

// Re-export types used in our public API
pub use logscope_types::{Classification, LogLevel, LogRecord, LogUpdate};
