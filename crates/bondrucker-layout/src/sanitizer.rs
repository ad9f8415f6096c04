// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Markup repair before content reaches the printer codec.
//
// The codec rejects lines without an alignment marker and chokes on
// unbalanced style tags, so every line is normalised here. Sanitizing never
// fails; the worst case is the fallback line.

use tracing::debug;

use crate::formatter::Alignment;

/// Printed when the input has nothing printable.
pub const FALLBACK_LINE: &str = "[L]Print test";

/// Style tags kept balanced per line.
const BALANCED_TAGS: [&str; 5] = ["b", "i", "u", "h", "w"];

/// Repairs a `[L]/[C]/[R]` markup stream line by line.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContentSanitizer;

impl ContentSanitizer {
    pub fn new() -> Self {
        Self
    }

    /// Repair `content`.
    ///
    /// - whitespace-only lines become `[L] `
    /// - lines without a leading alignment marker get `[L]`
    /// - marker-only lines get one space of content
    /// - unbalanced `<b> <i> <u> <h> <w>` tags are closed (or opened) within
    ///   the line
    pub fn sanitize(&self, content: &str) -> String {
        if content.trim().is_empty() {
            debug!("empty print content, using fallback line");
            return FALLBACK_LINE.to_string();
        }

        let mut repaired = 0usize;
        let lines: Vec<String> = content
            .split('\n')
            .map(|line| {
                let fixed = sanitize_line(line);
                if fixed != line {
                    repaired += 1;
                }
                fixed
            })
            .collect();
        let result = lines.join("\n");

        if result.trim().is_empty() || !result.contains('[') {
            debug!("sanitized content has no printable line, using fallback line");
            return FALLBACK_LINE.to_string();
        }
        if repaired > 0 {
            debug!(repaired, lines = lines.len(), "print markup repaired");
        }
        result
    }
}

/// Normalise one markup line.
pub fn sanitize_line(line: &str) -> String {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return "[L] ".to_string();
    }

    let (marker, content) = match trimmed.get(..3).and_then(Alignment::from_marker) {
        Some(alignment) => (alignment.marker(), &trimmed[3..]),
        None => (Alignment::Left.marker(), trimmed),
    };

    if content.is_empty() {
        return format!("{marker} ");
    }
    format!("{marker}{}", balance_tags(content))
}

/// Balance the tracked style tags of one line.
///
/// Closes with no matching open get the open prepended; opens left on the
/// stack at end of line are closed in reverse order.
pub fn balance_tags(content: &str) -> String {
    let mut stack: Vec<&str> = Vec::new();
    let mut missing_opens: Vec<&str> = Vec::new();

    let mut rest = content;
    while let Some(start) = rest.find('<') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('>') else {
            break;
        };
        let raw = &after[..end];
        let (closing, name) = match raw.strip_prefix('/') {
            Some(name) => (true, name),
            None => (false, raw),
        };
        if let Some(tag) = BALANCED_TAGS.iter().copied().find(|t| *t == name) {
            if !closing {
                stack.push(tag);
            } else if let Some(pos) = stack.iter().rposition(|t| *t == tag) {
                stack.remove(pos);
            } else {
                missing_opens.push(tag);
            }
        }
        rest = &after[end + 1..];
    }

    if stack.is_empty() && missing_opens.is_empty() {
        return content.to_string();
    }

    let mut out = String::with_capacity(content.len() + 4 * (stack.len() + missing_opens.len()));
    for tag in missing_opens.iter().rev() {
        out.push('<');
        out.push_str(tag);
        out.push('>');
    }
    out.push_str(content);
    for tag in stack.iter().rev() {
        out.push_str("</");
        out.push_str(tag);
        out.push('>');
    }
    out
}
