//! Progress renderer that records what it is given.

use std::sync::{Arc, Mutex};

use crate::progress::{ProgressRenderer, ProgressSnapshot};

#[derive(Debug, Default)]
struct Recorded {
    started_with: Option<u64>,
    rendered: Vec<ProgressSnapshot>,
    finished: Option<ProgressSnapshot>,
    finish_count: usize,
}

/// Records every call; clones share the same record.
///
/// Hand one clone to the tracker and keep another for assertions.
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total passed to `start`, if it was called.
    pub fn started_with(&self) -> Option<u64> {
        self.lock().started_with
    }

    /// Snapshots passed to `render`, in order.
    pub fn rendered(&self) -> Vec<ProgressSnapshot> {
        self.lock().rendered.clone()
    }

    /// Snapshot passed to the last `finish`.
    pub fn finished(&self) -> Option<ProgressSnapshot> {
        self.lock().finished.clone()
    }

    pub fn finish_count(&self) -> usize {
        self.lock().finish_count
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recorded> {
        // a panicking test thread must not hide the record from the others
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ProgressRenderer for RecordingRenderer {
    fn start(&mut self, total: u64) {
        self.lock().started_with = Some(total);
    }

    fn render(&mut self, snapshot: &ProgressSnapshot) {
        self.lock().rendered.push(snapshot.clone());
    }

    fn finish(&mut self, snapshot: &ProgressSnapshot) {
        let mut recorded = self.lock();
        recorded.finished = Some(snapshot.clone());
        recorded.finish_count += 1;
    }
}
