//! Markdown-to-terminal rendering with `termimad`.

use termimad::MadSkin;

/// Lay out markdown for the terminal. With `color` the default skin styles
/// headings, emphasis and code; without it the structure is kept but no ANSI
/// sequences are emitted.
pub fn render_markdown(input: &str, color: bool) -> String {
    let skin = if color {
        MadSkin::default()
    } else {
        MadSkin::no_style()
    };
    let formatted = skin.text(input, None).to_string();
    formatted.trim_end_matches('\n').to_string()
}

/// Collapse `text` to one line of at most `max` characters.
pub fn single_line_preview(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        return flat;
    }
    let mut out: String = flat.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}
