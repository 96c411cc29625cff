// src/progress.rs

//! Publish progress reporting
//!
//! Every object key is reported to a [`ProgressTracker`] immediately
//! before it is written, so callers can show what is being uploaded and,
//! on failure, which write was in flight. Implementations:
//! - `SilentProgress`: counts uploads, prints nothing
//! - `LogProgress`: logs each upload through tracing
//! - `CallbackProgress`: forwards events to a closure
//! - `CliProgress`: indicatif spinner for interactive use

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tracing::info;

/// Core trait for publish progress
pub trait ProgressTracker {
    /// An object is about to be written at `key`
    fn uploading(&self, key: &str);

    /// Number of uploads reported so far
    fn uploads(&self) -> u64;

    /// Finish progress successfully with a message
    fn finish_with_message(&self, message: &str);

    /// Finish progress with an error message
    fn finish_with_error(&self, message: &str);
}

/// Silent progress tracker (no-op)
#[derive(Debug, Default)]
pub struct SilentProgress {
    uploads: AtomicU64,
    finished: AtomicBool,
}

impl SilentProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }
}

impl ProgressTracker for SilentProgress {
    fn uploading(&self, _key: &str) {
        self.uploads.fetch_add(1, Ordering::Relaxed);
    }

    fn uploads(&self) -> u64 {
        self.uploads.load(Ordering::Relaxed)
    }

    fn finish_with_message(&self, _message: &str) {
        self.finished.store(true, Ordering::Relaxed);
    }

    fn finish_with_error(&self, _message: &str) {
        self.finished.store(true, Ordering::Relaxed);
    }
}

/// Logging progress tracker
///
/// Logs every upload at info level. Useful for CI jobs where a spinner
/// would only clutter the output.
#[derive(Debug)]
pub struct LogProgress {
    name: String,
    uploads: AtomicU64,
}

impl LogProgress {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uploads: AtomicU64::new(0),
        }
    }
}

impl ProgressTracker for LogProgress {
    fn uploading(&self, key: &str) {
        self.uploads.fetch_add(1, Ordering::Relaxed);
        info!("{}: uploading {}", self.name, key);
    }

    fn uploads(&self) -> u64 {
        self.uploads.load(Ordering::Relaxed)
    }

    fn finish_with_message(&self, message: &str) {
        info!("{}: {}", self.name, message);
    }

    fn finish_with_error(&self, message: &str) {
        info!("{}: ERROR - {}", self.name, message);
    }
}

/// Events emitted by [`CallbackProgress`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// An object is about to be written
    Uploading(String),
    /// Progress finished successfully
    Finished(String),
    /// Progress finished with error
    Error(String),
}

/// Callback-based progress tracker
pub struct CallbackProgress<F>
where
    F: Fn(ProgressEvent),
{
    callback: F,
    uploads: AtomicU64,
}

impl<F> CallbackProgress<F>
where
    F: Fn(ProgressEvent),
{
    pub fn new(callback: F) -> Self {
        Self {
            callback,
            uploads: AtomicU64::new(0),
        }
    }
}

impl<F> ProgressTracker for CallbackProgress<F>
where
    F: Fn(ProgressEvent),
{
    fn uploading(&self, key: &str) {
        self.uploads.fetch_add(1, Ordering::Relaxed);
        (self.callback)(ProgressEvent::Uploading(key.to_string()));
    }

    fn uploads(&self) -> u64 {
        self.uploads.load(Ordering::Relaxed)
    }

    fn finish_with_message(&self, message: &str) {
        (self.callback)(ProgressEvent::Finished(message.to_string()));
    }

    fn finish_with_error(&self, message: &str) {
        (self.callback)(ProgressEvent::Error(message.to_string()));
    }
}

/// Spinner showing the key currently being uploaded
pub struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    pub fn new(prefix: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        let style =
            ProgressStyle::with_template("{spinner:.green} {prefix:.bold} [{pos}] {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        bar.set_prefix(prefix.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }
}

impl ProgressTracker for CliProgress {
    fn uploading(&self, key: &str) {
        self.bar.inc(1);
        self.bar.set_message(key.to_string());
    }

    fn uploads(&self) -> u64 {
        self.bar.position()
    }

    fn finish_with_message(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    fn finish_with_error(&self, message: &str) {
        self.bar.abandon_with_message(format!("ERROR: {}", message));
    }
}
