//! Progress renderers.

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use super::format::{format_size, format_time};
use super::tracker::{Eta, ProgressSnapshot};

/// Receives the snapshots a tracker emits.
pub trait ProgressRenderer: Send {
    /// Called once when the tracker is created.
    fn start(&mut self, total: u64);

    /// Called for every throttled emission.
    fn render(&mut self, snapshot: &ProgressSnapshot);

    /// Called once with the final 100% snapshot; releases any resources.
    fn finish(&mut self, snapshot: &ProgressSnapshot);
}

fn eta_text(eta: &Eta) -> String {
    match eta {
        Eta::Calculating => "calculating...".to_string(),
        Eta::Remaining(d) => format_time(*d),
    }
}

/// Terminal progress bar.
pub struct BarRenderer {
    label: String,
    bar: Option<ProgressBar>,
}

impl BarRenderer {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            bar: None,
        }
    }

    fn message(snapshot: &ProgressSnapshot) -> String {
        format!(
            "{} / {} | {}/s | ETA: {}",
            format_size(snapshot.downloaded as f64),
            format_size(snapshot.total as f64),
            format_size(snapshot.speed_bps),
            eta_text(&snapshot.eta)
        )
    }
}

impl ProgressRenderer for BarRenderer {
    fn start(&mut self, total: u64) {
        let bar = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::default_bar()
            .template(" {prefix}: |{bar:40.cyan}| {percent}% | {msg}")
        {
            bar.set_style(style.progress_chars("█-"));
        }
        bar.set_prefix(self.label.clone());
        bar.set_message(format!(
            "0.0B / {} | 0.0B/s | ETA: calculating...",
            format_size(total as f64)
        ));
        self.bar = Some(bar);
    }

    fn render(&mut self, snapshot: &ProgressSnapshot) {
        if let Some(bar) = &self.bar {
            bar.set_position(snapshot.downloaded);
            bar.set_message(Self::message(snapshot));
        }
    }

    fn finish(&mut self, snapshot: &ProgressSnapshot) {
        if let Some(bar) = self.bar.take() {
            bar.set_position(snapshot.downloaded);
            bar.set_message(Self::message(snapshot));
            bar.finish_and_clear();
        }
    }
}

/// Emits progress through `tracing`.
pub struct LogRenderer {
    label: String,
}

impl LogRenderer {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl ProgressRenderer for LogRenderer {
    fn start(&mut self, total: u64) {
        debug!("{}: expecting {}", self.label, format_size(total as f64));
    }

    fn render(&mut self, snapshot: &ProgressSnapshot) {
        info!(
            "{}: {:.0}% ({} / {}) at {}/s, ETA {}",
            self.label,
            snapshot.percent(),
            format_size(snapshot.downloaded as f64),
            format_size(snapshot.total as f64),
            format_size(snapshot.speed_bps),
            eta_text(&snapshot.eta)
        );
    }

    fn finish(&mut self, snapshot: &ProgressSnapshot) {
        info!(
            "{}: finished {}",
            self.label,
            format_size(snapshot.downloaded as f64)
        );
    }
}

/// Draws nothing.
#[derive(Debug, Default)]
pub struct HiddenRenderer;

impl ProgressRenderer for HiddenRenderer {
    fn start(&mut self, _total: u64) {}
    fn render(&mut self, _snapshot: &ProgressSnapshot) {}
    fn finish(&mut self, _snapshot: &ProgressSnapshot) {}
}
