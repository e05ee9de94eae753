//! Output formatting and progress indicators
//!
//! This module provides the build progress bar, status prefixes and error
//! display used by the commands.

use std::io::IsTerminal;

use indicatif::{ProgressBar, ProgressStyle};

use crate::core::identity::Identity;
use crate::core::reporter::{Channel, EventSink};

/// Create a progress bar for build steps
///
/// Hidden when stderr is not a terminal so piped output stays clean.
pub fn create_build_bar(total: u64) -> ProgressBar {
    if !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} artifacts ({msg})")
            .expect("Invalid progress bar template")
            .progress_chars("█▓▒░"),
    );
    pb
}

/// Event sink that clears `bar` while the wrapped sink prints
pub struct SuspendingSink<S> {
    inner: S,
    bar: ProgressBar,
}

impl<S: EventSink> SuspendingSink<S> {
    pub fn new(inner: S, bar: ProgressBar) -> Self {
        Self { inner, bar }
    }
}

impl<S: EventSink> EventSink for SuspendingSink<S> {
    fn command(&self, origin: Option<&Identity>, message: &str) {
        self.emit(Channel::Command, origin, message);
    }

    fn progress(&self, origin: Option<&Identity>, message: &str) {
        self.emit(Channel::Progress, origin, message);
    }

    fn error(&self, origin: Option<&Identity>, message: &str) {
        self.emit(Channel::Error, origin, message);
    }

    fn info(&self, origin: Option<&Identity>, message: &str) {
        self.emit(Channel::Info, origin, message);
    }

    fn warning(&self, origin: Option<&Identity>, message: &str) {
        self.emit(Channel::Warning, origin, message);
    }

    fn note(&self, origin: Option<&Identity>, message: &str) {
        self.emit(Channel::Note, origin, message);
    }

    fn emit(&self, channel: Channel, origin: Option<&Identity>, message: &str) {
        self.bar.suspend(|| self.inner.emit(channel, origin, message));
    }
}

/// `1 artifact`, `3 artifacts`
pub fn artifacts(count: usize) -> String {
    if count == 1 {
        "1 artifact".to_string()
    } else {
        format!("{count} artifacts")
    }
}

/// Print an error and its causes to stderr
pub fn display_error(err: &anyhow::Error) {
    eprintln!("{} Error: {err}", status::ERROR);
    for cause in err.chain().skip(1) {
        eprintln!("  caused by: {cause}");
    }
}

/// Status message prefixes
pub mod status {
    /// Success prefix (green checkmark)
    pub const SUCCESS: &str = "✓";

    /// Error prefix (red X)
    pub const ERROR: &str = "✗";

    /// Warning prefix (yellow triangle)
    pub const WARNING: &str = "⚠";
}
