//! Error formatting for terminal diagnostics.
//!
//! This module provides:
//! - ANSI color support with TTY auto-detection
//! - Source snippet formatting with carets/underlines
//! - A complete report for any [`SourceError`]

use crate::ast::{SourceMap, Span};
use crate::codegen::SourceError;

/// ANSI color codes for terminal output
#[derive(Debug, Clone)]
pub struct Colors {
    pub enabled: bool,
}

impl Colors {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn red(&self) -> &'static str {
        if self.enabled { "\x1b[31m" } else { "" }
    }

    pub fn cyan(&self) -> &'static str {
        if self.enabled { "\x1b[36m" } else { "" }
    }

    pub fn bold(&self) -> &'static str {
        if self.enabled { "\x1b[1m" } else { "" }
    }

    pub fn reset(&self) -> &'static str {
        if self.enabled { "\x1b[0m" } else { "" }
    }
}

impl Default for Colors {
    fn default() -> Self {
        Self::new(false)
    }
}

// ============================================================================
// Source Snippet Formatting
// ============================================================================

/// Format a source code snippet with line number and caret/underline.
///
/// Example output:
/// ```text
/// 3 | while n:
///     ^^^^^^^^
/// ```
pub fn format_snippet(source_map: &SourceMap, span: &Span, colors: &Colors) -> String {
    let start = source_map.position(span.start);
    let end = source_map.position(span.end);
    let line_text = source_map.line(start.line).unwrap_or("");

    let gutter = start.line.to_string();
    let mut out = format!(
        "{}{} |{} {}\n",
        colors.cyan(),
        gutter,
        colors.reset(),
        line_text
    );

    // Pad to align with content after "NN | "
    let padding = " ".repeat(gutter.len() + 3 + start.column - 1);
    let underline = if start.line == end.line {
        "^".repeat(end.column.saturating_sub(start.column).max(1))
    } else {
        // Multi-line: underline to the end of the first line
        let rest = line_text.chars().count() + 1;
        "^".repeat(rest.saturating_sub(start.column).max(1))
    };

    out.push_str(&format!(
        "{}{}{}{}",
        padding,
        colors.red(),
        underline,
        colors.reset()
    ));
    out
}

/// Format the error header line.
///
/// Example: "-- PARSE ERROR -------------------------------------------"
pub fn format_header(error_kind: &str, colors: &Colors) -> String {
    let dashes = "-".repeat(60usize.saturating_sub(error_kind.len() + 4));
    format!(
        "{}-- {} {}{}",
        colors.cyan(),
        error_kind,
        dashes,
        colors.reset()
    )
}

/// Format the location line.
///
/// Example: "fib.py:12:15"
pub fn format_location(
    filename: Option<&str>,
    span: &Span,
    source_map: &SourceMap,
    colors: &Colors,
) -> String {
    let pos = source_map.position(span.start);
    let file = filename.unwrap_or("<input>");
    format!("{}{}:{}{}", colors.bold(), file, pos, colors.reset())
}

/// Full report: header, location and snippet when the error has a span,
/// then the message.
pub fn format_source_error(
    error: &SourceError,
    source_map: &SourceMap,
    filename: Option<&str>,
    colors: &Colors,
) -> String {
    let mut out = format_header(error.kind(), colors);
    out.push('\n');
    if let Some(span) = error.span() {
        out.push_str(&format_location(filename, span, source_map, colors));
        out.push_str("\n\n");
        out.push_str(&format_snippet(source_map, span, colors));
        out.push('\n');
    }
    out.push('\n');
    out.push_str(&error.to_string());
    out.push('\n');
    out
}

// ============================================================================
// Tests
// ============================================================================
