//! Message styling for CLI output.
//!
//! Status lines start with a bracketed tag so they stay readable with
//! colors off: `[ok]` green, `[err]` red, `[warn]` yellow, `[info]` blue,
//! `[hint]` cyan, `[skip]` dim.

use owo_colors::{OwoColorize, Style as Paint};

use super::color::ColorMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Ok,
    Err,
    Warn,
    Info,
    Hint,
    Skip,
}

impl MessageType {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Ok => "[ok]",
            Self::Err => "[err]",
            Self::Warn => "[warn]",
            Self::Info => "[info]",
            Self::Hint => "[hint]",
            Self::Skip => "[skip]",
        }
    }

    fn paint(&self) -> Paint {
        match self {
            Self::Ok => Paint::new().green(),
            Self::Err => Paint::new().red(),
            Self::Warn => Paint::new().yellow(),
            Self::Info => Paint::new().blue(),
            Self::Hint => Paint::new().cyan(),
            Self::Skip => Paint::new().dimmed(),
        }
    }
}

/// Formats CLI output lines. Whether to color is decided once, at creation.
#[derive(Debug, Clone, Copy)]
pub struct Style {
    colors: bool,
}

impl Style {
    pub fn new(color_mode: ColorMode) -> Self {
        Self {
            colors: color_mode.is_enabled(),
        }
    }

    fn paint(&self, text: &str, paint: Paint) -> String {
        if self.colors {
            text.style(paint).to_string()
        } else {
            text.to_string()
        }
    }

    /// `[ok] Indexed 12 chunks`
    pub fn message(&self, msg_type: MessageType, text: &str) -> String {
        format!("{} {}", self.paint(msg_type.prefix(), msg_type.paint()), text)
    }

    /// Indented `label: value` line under a message.
    pub fn message_detail(&self, label: &str, value: &str) -> String {
        format!("     {}: {}", label, value)
    }

    pub fn section(&self, title: &str) -> String {
        self.paint(title, Paint::new().bold())
    }

    pub fn error_with_context(&self, msg: &str, cause: Option<&str>, hint: Option<&str>) -> String {
        let mut lines = vec![self.message(MessageType::Err, msg)];
        lines.extend(cause.map(|c| format!("      Cause: {}", c)));
        lines.extend(hint.map(|h| format!("      Hint: {}", h)));
        lines.join("\n")
    }

    pub fn key_value(&self, key: &str, value: &str) -> String {
        format!("{}: {}", self.paint(key, Paint::new().dimmed()), value)
    }

    pub fn file_path(&self, path: &str) -> String {
        self.paint(path, Paint::new().cyan())
    }

    /// Confidence with two decimals: green from 0.8, yellow from 0.5, red below.
    pub fn score(&self, value: f32) -> String {
        let paint = match value {
            v if v >= 0.8 => Paint::new().green(),
            v if v >= 0.5 => Paint::new().yellow(),
            _ => Paint::new().red(),
        };
        self.paint(&format!("{:.2}", value), paint)
    }

    /// Bulleted citation line.
    pub fn citation(&self, text: &str) -> String {
        format!("  - {}", self.paint(text, Paint::new().dimmed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> Style {
        Style::new(ColorMode::Never)
    }

    #[test]
    fn test_plain_messages() {
        assert_eq!(plain().message(MessageType::Ok, "Indexed 3 chunks"), "[ok] Indexed 3 chunks");
        assert_eq!(plain().message(MessageType::Skip, "Nothing to do"), "[skip] Nothing to do");
        assert_eq!(plain().message_detail("Chunks", "42"), "     Chunks: 42");
    }

    #[test]
    fn test_error_with_context_lines() {
        let output = plain().error_with_context(
            "Failed to load configuration",
            Some("retrieval.finalK cannot be 0"),
            Some("Run `irra config check`"),
        );
        assert_eq!(
            output,
            "[err] Failed to load configuration\n      Cause: retrieval.finalK cannot be 0\n      Hint: Run `irra config check`"
        );
        assert_eq!(plain().error_with_context("Boom", None, None), "[err] Boom");
    }

    #[test]
    fn test_score_and_citation_plain() {
        assert_eq!(plain().score(0.756), "0.76");
        assert_eq!(plain().citation("📄 w1.pdf, Page 2"), "  - 📄 w1.pdf, Page 2");
        assert_eq!(plain().key_value("Chunks", "3"), "Chunks: 3");
    }

    #[test]
    fn test_forced_colors_wrap_prefix_only() {
        let style = Style::new(ColorMode::Always);
        let line = style.message(MessageType::Err, "bad");
        assert!(line.contains("\u{1b}["));
        assert!(line.ends_with(" bad"));
    }
}
