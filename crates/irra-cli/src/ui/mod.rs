//! # CLI UI Module
//!
//! Styling and formatting layer for `irra` output.
//!
//! Every command prints through these helpers so that prefixes, colors and
//! tables look the same everywhere. Colors respect `NO_COLOR` and `--color`;
//! `--json` bypasses the layer entirely.
//!
//! ## Module Structure
//!
//! - `color`: Color mode detection and terminal capability checks
//! - `style`: Message types, prefixes, and styling functions
//! - `format`: Small text formatters (truncation, relative time, previews)
//! - `table`: Table rendering with comfy-table
//! - `progress`: Spinners for slow operations

pub mod color;
pub mod format;
pub mod progress;
pub mod style;
pub mod table;

pub use color::ColorMode;
pub use progress::{Progress, ProgressMode};
pub use style::{MessageType, Style};
