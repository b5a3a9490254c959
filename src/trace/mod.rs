//! Decision trace persistence and querying (spec §4.11).

pub mod query;
pub mod recorder;

pub use query::{query_traces, TraceFilter, TraceQueryMatch};
pub use recorder::{DebugRecorder, TraceIndexEntry};
