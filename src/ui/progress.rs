use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

/// Receives human-readable status lines from the extraction core.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, message: &str);
}

/// Serializes calls into a [`ProgressSink`] so concurrent fetches can share it.
/// A sink that panics is ignored rather than allowed to abort the run.
#[derive(Clone)]
pub struct ProgressReporter {
    sink: Arc<dyn ProgressSink>,
    lock: Arc<Mutex<()>>,
}

impl ProgressReporter {
    pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            sink,
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn emit(&self, message: &str) {
        debug!(target: "gitcorpus::progress", "{}", message);

        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if catch_unwind(AssertUnwindSafe(|| self.sink.emit(message))).is_err() {
            debug!("progress sink panicked; message dropped");
        }
    }
}

/// Keeps every message, for embedding callers and tests.
#[derive(Default)]
pub struct MemorySink {
    messages: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }
}

impl ProgressSink for MemorySink {
    fn emit(&self, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }
}

pub struct ProgressManager {
    multi_progress: MultiProgress,
    enabled: bool,
}

impl ProgressManager {
    pub fn new(enabled: bool) -> Self {
        Self {
            multi_progress: MultiProgress::new(),
            enabled,
        }
    }

    pub fn create_spinner(&self, message: &str) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }

        let pb = self.multi_progress.add(ProgressBar::new_spinner());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg} ({elapsed})")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        pb.set_message(message.to_string());
        pb
    }

    pub fn clear(&self) {
        if self.enabled {
            self.multi_progress.clear().ok();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Prints each status line above a spinner and shows the latest one next to it.
pub struct SpinnerSink {
    progress_bar: ProgressBar,
}

impl SpinnerSink {
    pub fn new(progress_bar: ProgressBar) -> Self {
        Self { progress_bar }
    }

    pub fn progress_bar(&self) -> &ProgressBar {
        &self.progress_bar
    }
}

impl ProgressSink for SpinnerSink {
    fn emit(&self, message: &str) {
        self.progress_bar.println(message);
        self.progress_bar.set_message(message.to_string());
    }
}

pub fn finish_progress_with_summary(pb: &ProgressBar, message: &str, duration: Duration) {
    let final_message = format!("{} (completed in {})", message, format_duration(duration));
    pb.finish_with_message(final_message);
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}s", secs)
    } else {
        format!("{}ms", duration.as_millis())
    }
}
