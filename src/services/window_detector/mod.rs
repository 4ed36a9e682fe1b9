//! WindowDetector service: responsibility and boundaries
//!
//! This module and its submodules are responsible ONLY for detecting the focused
//! window (id, owning pid, title, class) and publishing it to the EngineContext.
//! Mapping the pid to a program name and any blacklist decisions belong to the
//! BlacklistMatcher.

mod dry_run;
mod kdotool;
mod sway;
mod r#trait;
mod window_detector;
mod xdotool;

pub use self::r#trait::{create_window_detector, WindowDetectorTrait, WindowSource};
pub use self::window_detector::{query_foreground_once, sources_for_method};
