//! Rendering contract and the default terminal renderer.
//!
//! Replies and turn errors go to stdout; everything else (prompt, warnings,
//! tool traces, spinner) goes to stderr so piped output stays clean.

use crossterm::style::Stylize;
use std::io::{self, Write};

use super::markdown::{render_markdown, single_line_preview};
use super::progress::{start_progress, ProgressHandle};
use super::settings;

/// Injectable rendering interface used by the message loop and turn handler.
pub trait RenderSink: Send + Sync {
    /// Welcome line shown once at startup.
    fn banner(&self, title: &str, detail: &str);
    /// Interactive input prompt.
    fn prompt(&self);
    /// One labelled assistant reply, rendered as markdown.
    fn reply(&self, label: &str, markdown: &str);
    /// A failed turn.
    fn error(&self, msg: &str);
    fn warn(&self, msg: &str);
    /// Neutral status text (connection probes, OAuth instructions).
    fn info(&self, msg: &str);
    fn tool_call(&self, name: &str, args: &str);
    fn tool_result(&self, result: &str);
    /// Start a spinner for a long-running request.
    fn progress(&self, label: &str) -> ProgressHandle;
    fn goodbye(&self);
}

/// Terminal renderer.
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    color: bool,
    spinner: bool,
}

impl Renderer {
    pub fn new(color: bool, spinner: bool) -> Self {
        Self { color, spinner }
    }
}

impl RenderSink for Renderer {
    fn banner(&self, title: &str, detail: &str) {
        if self.color {
            eprintln!("{}", title.with(settings::COLOR_BANNER).bold());
            eprintln!("{}", detail.with(settings::COLOR_INFO));
        } else {
            eprintln!("{title}");
            eprintln!("{detail}");
        }
    }

    fn prompt(&self) {
        if self.color {
            eprint!("\n{}", settings::PROMPT_USER.with(settings::COLOR_PROMPT).bold());
        } else {
            eprint!("\n{}", settings::PROMPT_USER);
        }
        let _ = io::stderr().flush();
    }

    fn reply(&self, label: &str, markdown: &str) {
        let body = render_markdown(markdown, self.color);
        let mut out = io::stdout().lock();
        if self.color {
            let _ = writeln!(out, "\n{}", label.with(settings::COLOR_PROVIDER_LABEL).bold());
        } else {
            let _ = writeln!(out, "\n{label}");
        }
        let _ = writeln!(out, "{body}");
        let _ = out.flush();
    }

    fn error(&self, msg: &str) {
        let mut out = io::stdout().lock();
        if self.color {
            let _ = writeln!(
                out,
                "\n{}",
                format!("{} {msg}", settings::LABEL_ERROR).with(settings::COLOR_ERROR)
            );
        } else {
            let _ = writeln!(out, "\n{} {msg}", settings::LABEL_ERROR);
        }
        let _ = out.flush();
    }

    fn warn(&self, msg: &str) {
        if self.color {
            eprintln!(
                "{} {msg}",
                settings::LABEL_WARNING.with(settings::COLOR_WARNING).bold()
            );
        } else {
            eprintln!("{} {msg}", settings::LABEL_WARNING);
        }
    }

    fn info(&self, msg: &str) {
        if self.color {
            eprintln!(
                "{} {}",
                settings::GLYPH_SECTION_BULLET.with(settings::COLOR_INFO),
                msg.with(settings::COLOR_INFO)
            );
        } else {
            eprintln!("{} {msg}", settings::GLYPH_SECTION_BULLET);
        }
    }

    fn tool_call(&self, name: &str, args: &str) {
        let preview = single_line_preview(args, settings::TOOL_PREVIEW_CHARS);
        if self.color {
            eprintln!(
                "{}{} {}({})",
                settings::INDENT_1,
                settings::GLYPH_TOOL_CALL.with(settings::COLOR_TOOL_CALL_GLYPH),
                name.with(settings::COLOR_TOOL_CALL_NAME).bold(),
                preview.with(settings::COLOR_TOOL_DETAIL),
            );
        } else {
            eprintln!(
                "{}{} {name}({preview})",
                settings::INDENT_1,
                settings::GLYPH_TOOL_CALL_PLAIN
            );
        }
    }

    fn tool_result(&self, result: &str) {
        let preview = single_line_preview(result, settings::TOOL_PREVIEW_CHARS);
        if self.color {
            eprintln!(
                "{}{} {}",
                settings::INDENT_1,
                settings::GLYPH_TOOL_RESULT.with(settings::COLOR_TOOL_DETAIL),
                preview.with(settings::COLOR_TOOL_DETAIL),
            );
        } else {
            eprintln!(
                "{}{} {preview}",
                settings::INDENT_1,
                settings::GLYPH_TOOL_RESULT_PLAIN
            );
        }
    }

    fn progress(&self, label: &str) -> ProgressHandle {
        if self.spinner {
            start_progress(label, self.color)
        } else {
            ProgressHandle::disabled()
        }
    }

    fn goodbye(&self) {
        if self.color {
            eprintln!("\n{}", settings::GOODBYE.with(settings::COLOR_BANNER).bold());
        } else {
            eprintln!("\n{}", settings::GOODBYE);
        }
    }
}
