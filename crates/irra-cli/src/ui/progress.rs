//! Spinners for slow CLI operations (embedding, LLM calls).
//!
//! Progress output is hidden when stdout is not a TTY, with `--quiet`, and
//! with `--json`.

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Progress feedback mode based on output context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressMode {
    /// Interactive TTY: show animated spinners
    Interactive,
    /// Non-TTY or `--quiet`: show only final results
    Quiet,
    /// Machine-readable output: nothing at all
    Silent,
}

impl ProgressMode {
    pub fn detect(quiet: bool, json: bool) -> Self {
        if json {
            Self::Silent
        } else if quiet || !std::io::stdout().is_terminal() {
            Self::Quiet
        } else {
            Self::Interactive
        }
    }

    pub fn is_interactive(&self) -> bool {
        matches!(self, Self::Interactive)
    }

    /// Whether final status lines should be printed.
    pub fn shows_messages(&self) -> bool {
        !matches!(self, Self::Silent)
    }
}

const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// A spinner wrapping indicatif.
pub struct Progress {
    bar: ProgressBar,
    mode: ProgressMode,
}

impl Progress {
    pub fn spinner(message: &str, mode: ProgressMode) -> Self {
        let bar = if mode.is_interactive() {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) =
                ProgressStyle::default_spinner().template("{spinner:.cyan} {msg} ({elapsed})")
            {
                pb.set_style(style.tick_chars(SPINNER_CHARS));
            }
            pb.set_message(message.to_string());
            pb.enable_steady_tick(Duration::from_millis(80));
            pb
        } else {
            ProgressBar::hidden()
        };

        Self { bar, mode }
    }

    pub fn finish_clear(&self) {
        self.bar.finish_and_clear();
    }

    /// Clear the spinner and print `message` unless output is silent.
    pub fn finish_with_message(&self, message: &str) {
        self.bar.finish_and_clear();
        if self.mode.shows_messages() && !message.is_empty() {
            println!("{}", message);
        }
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_json_is_silent() {
        assert_eq!(ProgressMode::detect(false, true), ProgressMode::Silent);
        assert_eq!(ProgressMode::detect(true, false), ProgressMode::Quiet);
    }

    #[test]
    fn test_hidden_spinner_is_noop() {
        let progress = Progress::spinner("Working", ProgressMode::Silent);
        progress.finish_clear();
        assert!(!ProgressMode::Silent.shows_messages());
    }
}
