// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// bondrucker-layout: Receipt layout for fixed-width thermal printers.
//
// Turns semantic receipt sections into `[L]/[C]/[R]` + `<b>/<h>/<w>` markup
// lines that respect the paper's column budget (CJK glyphs count double),
// repairs markup before it reaches hardware, and builds the standard order
// receipt and printer test page.

pub mod formatter;
pub mod sanitizer;
pub mod template;
pub mod width;

pub use formatter::{
    Alignment, ContentFormatter, FormattedLine, ItemRow, Section, Style, column_budget,
    format_left_right, render_markup,
};
pub use sanitizer::ContentSanitizer;
pub use template::OrderTemplate;
pub use width::{strip_tags, visible_columns, wrap_to_columns};
