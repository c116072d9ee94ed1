//! Terminal-facing output.
//!
//! Orchestration code depends only on [`RenderSink`]; [`Renderer`] is the
//! crossterm/termimad implementation used by the binary.

pub mod markdown;
pub mod progress;
pub mod render;
pub mod settings;

pub use progress::ProgressHandle;
pub use render::{RenderSink, Renderer};
