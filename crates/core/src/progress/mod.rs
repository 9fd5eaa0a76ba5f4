//! Download progress tracking.
//!
//! [`ProgressTracker`] turns a stream of downloaded-byte samples into
//! throttled speed/ETA snapshots and hands them to a [`ProgressRenderer`].

mod format;
mod render;
mod tracker;

pub use format::{format_size, format_time};
pub use render::{BarRenderer, HiddenRenderer, LogRenderer, ProgressRenderer};
pub use tracker::{Eta, ProgressError, ProgressSnapshot, ProgressTracker, TrackerState};
