//! Centralized UI settings: labels, glyphs, colors and spinner timing.

use crossterm::style::Color;

pub const INDENT_1: &str = "  ";

// ---------------------------------------------------------------------------
// Prompt / labels
// ---------------------------------------------------------------------------

pub const PROMPT_USER: &str = "You: ";
pub const LABEL_WARNING: &str = "warning:";
pub const LABEL_ERROR: &str = "Error:";
pub const GOODBYE: &str = "Goodbye!";

pub const GLYPH_SECTION_BULLET: &str = "•";
pub const GLYPH_TOOL_CALL: &str = "▶";
pub const GLYPH_TOOL_RESULT: &str = "\u{2190}";
pub const GLYPH_TOOL_CALL_PLAIN: &str = ">";
pub const GLYPH_TOOL_RESULT_PLAIN: &str = "<-";

/// Tool arguments/results are previewed on one line of at most this many chars.
pub const TOOL_PREVIEW_CHARS: usize = 120;

// ---------------------------------------------------------------------------
// Spinner / progress
// ---------------------------------------------------------------------------

pub const PROGRESS_CLEAR_LINE: &str = "\r\x1b[2K";
pub const PROGRESS_FRAMES: [char; 4] = ['|', '/', '-', '\\'];
pub const PROGRESS_TICK_MS: u64 = 100;

// ---------------------------------------------------------------------------
// Colors
// ---------------------------------------------------------------------------

pub const COLOR_BANNER: Color = Color::Blue;
pub const COLOR_PROMPT: Color = Color::Green;
pub const COLOR_PROVIDER_LABEL: Color = Color::Magenta;
pub const COLOR_TOOL_CALL_GLYPH: Color = Color::DarkYellow;
pub const COLOR_TOOL_CALL_NAME: Color = Color::Yellow;
pub const COLOR_TOOL_DETAIL: Color = Color::DarkGrey;
pub const COLOR_INFO: Color = Color::DarkGrey;
pub const COLOR_WARNING: Color = Color::Yellow;
pub const COLOR_ERROR: Color = Color::Red;
pub const COLOR_PROGRESS_FRAME: Color = Color::Cyan;
pub const COLOR_PROGRESS_LABEL: Color = Color::DarkGrey;
