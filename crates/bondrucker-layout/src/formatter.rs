// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content formatter: semantic receipt sections to aligned, width-aware
// markup lines.
//
// Output uses the `[L]/[C]/[R]` alignment prefixes and `<b>/<h>/<w>` style
// tags understood by the printer's markup codec. Every line fits the paper's
// column budget; double-width glyphs and the `<w>` style count twice.

use std::fmt;

use bondrucker_core::types::{ItemOption, PaperWidth};
use tracing::trace;

use crate::width::{markup_columns, pad_left, pad_right, visible_columns, wrap_to_columns};

// ---------------------------------------------------------------------------
// Line model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

impl Alignment {
    /// The markup prefix for this alignment.
    pub fn marker(self) -> &'static str {
        match self {
            Self::Left => "[L]",
            Self::Center => "[C]",
            Self::Right => "[R]",
        }
    }

    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "[L]" => Some(Self::Left),
            "[C]" => Some(Self::Center),
            "[R]" => Some(Self::Right),
            _ => None,
        }
    }
}

/// Style applied to a whole line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Style {
    pub bold: bool,
    pub double_height: bool,
    pub double_width: bool,
}

impl Style {
    pub const PLAIN: Self = Self {
        bold: false,
        double_height: false,
        double_width: false,
    };

    pub const BOLD: Self = Self {
        bold: true,
        double_height: false,
        double_width: false,
    };

    /// Emphasis for content aligned in columns. Never changes glyph width.
    pub fn column_emphasis(paper: PaperWidth) -> Self {
        Self {
            bold: true,
            double_height: paper == PaperWidth::Mm80,
            double_width: false,
        }
    }

    /// Emphasis for free-standing titles and the store name.
    pub fn title_emphasis(paper: PaperWidth) -> Self {
        Self {
            bold: true,
            double_height: true,
            double_width: paper == PaperWidth::Mm80,
        }
    }

    pub fn is_plain(&self) -> bool {
        *self == Self::PLAIN
    }

    /// Cells one glyph cell occupies under this style.
    pub fn width_factor(&self) -> usize {
        if self.double_width { 2 } else { 1 }
    }

    fn wrap(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len() + 21);
        if self.double_height {
            out.push_str("<h>");
        }
        if self.double_width {
            out.push_str("<w>");
        }
        if self.bold {
            out.push_str("<b>");
        }
        out.push_str(text);
        if self.bold {
            out.push_str("</b>");
        }
        if self.double_width {
            out.push_str("</w>");
        }
        if self.double_height {
            out.push_str("</h>");
        }
        out
    }
}

/// One printed row.
///
/// `text` may carry inline style tags (the bold label of a label/value line,
/// for instance); the line-level `style` wraps the whole text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedLine {
    pub alignment: Alignment,
    pub style: Style,
    pub text: String,
}

impl FormattedLine {
    pub fn new(alignment: Alignment, text: impl Into<String>) -> Self {
        Self {
            alignment,
            style: Style::PLAIN,
            text: text.into(),
        }
    }

    pub fn left(text: impl Into<String>) -> Self {
        Self::new(Alignment::Left, text)
    }

    pub fn center(text: impl Into<String>) -> Self {
        Self::new(Alignment::Center, text)
    }

    pub fn right(text: impl Into<String>) -> Self {
        Self::new(Alignment::Right, text)
    }

    /// An empty feed line.
    pub fn blank() -> Self {
        Self::left("")
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    /// Physical cells this line occupies on paper.
    pub fn columns(&self) -> usize {
        markup_columns(&self.text) * self.style.width_factor()
    }

    /// Markup for this line. Empty lines carry a single space so the codec
    /// never sees a bare alignment marker.
    pub fn to_markup(&self) -> String {
        let marker = self.alignment.marker();
        if self.text.is_empty() {
            return format!("{marker} ");
        }
        format!("{marker}{}", self.style.wrap(&self.text))
    }
}

impl fmt::Display for FormattedLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_markup())
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// One purchased line as it appears on the receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRow {
    pub quantity: u32,
    pub name: String,
    /// Already formatted price text, e.g. `$12.50`.
    pub price: String,
    pub options: Vec<ItemOption>,
}

/// Semantic building blocks of a receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Section {
    /// Centered emphasized heading.
    Title(String),
    /// Store name between rules, then address and phone.
    StoreHeader {
        name: String,
        address: String,
        phone: String,
    },
    Divider,
    /// `label: value` with a bold label.
    LabelValue { label: String, value: String },
    /// Free text; `\n` starts a new line, long lines wrap.
    Text {
        text: String,
        alignment: Alignment,
        style: Style,
    },
    /// Left text and right text on one line when they fit.
    LeftRight { left: String, right: String },
    /// Column headings above the item rows.
    ItemHeader {
        quantity: String,
        name: String,
        price: String,
    },
    Item(ItemRow),
    /// Divider, centered text, then room to tear the paper.
    Footer(String),
    /// Blank lines.
    Feed(usize),
}

impl Section {
    pub fn text(text: impl Into<String>, alignment: Alignment) -> Self {
        Self::Text {
            text: text.into(),
            alignment,
            style: Style::PLAIN,
        }
    }

    pub fn heading(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            alignment: Alignment::Left,
            style: Style::BOLD,
        }
    }

    pub fn label_value(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self::LabelValue {
            label: label.into(),
            value: value.into(),
        }
    }

    pub fn left_right(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self::LeftRight {
            left: left.into(),
            right: right.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Character cells per line for `paper`.
pub fn column_budget(paper: PaperWidth) -> usize {
    paper.columns()
}

/// Place `left` and `right` on one line, right text flush right.
///
/// Falls back to two lines (`[L]left`, `[R]right`) when the pair is wider
/// than `budget`. Text is never truncated.
pub fn format_left_right(left: &str, right: &str, budget: usize) -> Vec<FormattedLine> {
    let left_cols = markup_columns(left);
    let right_cols = markup_columns(right);

    if left_cols + right_cols > budget {
        return vec![FormattedLine::left(left), FormattedLine::right(right)];
    }

    let gap = budget - left_cols - right_cols;
    let mut text = String::with_capacity(left.len() + gap + right.len());
    text.push_str(left);
    text.extend(std::iter::repeat_n(' ', gap));
    text.push_str(right);
    vec![FormattedLine::left(text)]
}

/// Newline-joined markup stream for the codec.
pub fn render_markup(lines: &[FormattedLine]) -> String {
    lines
        .iter()
        .map(FormattedLine::to_markup)
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Formatter
// ---------------------------------------------------------------------------

/// Fixed cell widths of the `qty | name | price` layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ItemColumns {
    quantity: usize,
    name: usize,
    price: usize,
    gap: usize,
}

impl ItemColumns {
    fn for_paper(paper: PaperWidth) -> Self {
        match paper {
            PaperWidth::Mm80 => Self {
                quantity: 4,
                name: 27,
                price: 10,
                gap: 1,
            },
            PaperWidth::Mm57 => Self {
                quantity: 3,
                name: 22,
                price: 7,
                gap: 0,
            },
        }
    }

    /// Widen quantity/price to fit their text and give the name what is left.
    /// `None` when not even a one-cell name column fits.
    fn fitted(self, quantity: &str, price: &str, budget: usize) -> Option<Self> {
        let quantity = self.quantity.max(visible_columns(quantity) + 1);
        let price = self.price.max(visible_columns(price));
        let fixed = quantity + price + self.gap;
        if fixed >= budget {
            return None;
        }
        Some(Self {
            quantity,
            name: budget - fixed,
            price,
            gap: self.gap,
        })
    }
}

/// Renders [`Section`]s for one paper width.
#[derive(Debug, Clone, Copy)]
pub struct ContentFormatter {
    paper: PaperWidth,
}

impl ContentFormatter {
    pub fn new(paper: PaperWidth) -> Self {
        Self { paper }
    }

    pub fn paper(&self) -> PaperWidth {
        self.paper
    }

    pub fn budget(&self) -> usize {
        column_budget(self.paper)
    }

    pub fn format(&self, sections: &[Section]) -> Vec<FormattedLine> {
        let mut lines = Vec::with_capacity(sections.len() * 2);
        for section in sections {
            self.format_section(section, &mut lines);
        }
        trace!(
            sections = sections.len(),
            lines = lines.len(),
            paper_mm = self.paper.millimetres(),
            "receipt formatted"
        );
        lines
    }

    /// Sections straight to the markup stream.
    pub fn render(&self, sections: &[Section]) -> String {
        render_markup(&self.format(sections))
    }

    fn format_section(&self, section: &Section, out: &mut Vec<FormattedLine>) {
        let budget = self.budget();
        match section {
            Section::Title(text) => {
                self.push_wrapped(text, Alignment::Center, Style::title_emphasis(self.paper), out)
            }
            Section::StoreHeader {
                name,
                address,
                phone,
            } => {
                let rule = "=".repeat(budget);
                out.push(FormattedLine::center(rule.clone()));
                self.push_wrapped(name, Alignment::Center, Style::title_emphasis(self.paper), out);
                out.push(FormattedLine::center(rule));
                if !address.trim().is_empty() {
                    self.push_wrapped(address, Alignment::Center, Style::PLAIN, out);
                }
                if !phone.trim().is_empty() {
                    self.push_wrapped(&format!("Tel: {phone}"), Alignment::Center, Style::PLAIN, out);
                }
            }
            Section::Divider => out.push(self.divider()),
            Section::LabelValue { label, value } => self.push_label_value(label, value, out),
            Section::Text {
                text,
                alignment,
                style,
            } => self.push_wrapped(text, *alignment, *style, out),
            Section::LeftRight { left, right } => out.extend(format_left_right(left, right, budget)),
            Section::ItemHeader {
                quantity,
                name,
                price,
            } => out.push(self.item_header(quantity, name, price)),
            Section::Item(row) => out.extend(self.item_lines(row)),
            Section::Footer(text) => {
                out.push(self.divider());
                self.push_wrapped(text, Alignment::Center, Style::PLAIN, out);
                out.extend(std::iter::repeat_n(FormattedLine::blank(), 3));
            }
            Section::Feed(n) => out.extend(std::iter::repeat_n(FormattedLine::blank(), *n)),
        }
    }

    fn divider(&self) -> FormattedLine {
        FormattedLine::center("-".repeat(self.budget()))
    }

    /// Split on newlines, wrap each paragraph to the budget (halved for
    /// double-width styles), one line per segment.
    fn push_wrapped(&self, text: &str, alignment: Alignment, style: Style, out: &mut Vec<FormattedLine>) {
        let width = self.budget() / style.width_factor();
        for paragraph in text.split('\n') {
            let paragraph = paragraph.trim_end();
            if paragraph.is_empty() {
                out.push(FormattedLine::new(alignment, ""));
                continue;
            }
            for segment in wrap_to_columns(paragraph, width) {
                out.push(FormattedLine::new(alignment, segment).with_style(style));
            }
        }
    }

    fn push_label_value(&self, label: &str, value: &str, out: &mut Vec<FormattedLine>) {
        let budget = self.budget();
        let head = format!("{label}:");
        if visible_columns(&head) + 1 + visible_columns(value) <= budget {
            out.push(FormattedLine::left(format!("<b>{head}</b> {value}")));
            return;
        }
        self.push_wrapped(&head, Alignment::Left, Style::BOLD, out);
        self.push_wrapped(value, Alignment::Left, Style::PLAIN, out);
    }

    /// Bold column headings aligned with [`Self::item_lines`].
    pub fn item_header(&self, quantity: &str, name: &str, price: &str) -> FormattedLine {
        let cols = ItemColumns::for_paper(self.paper);
        let mut text = pad_right(quantity, cols.quantity);
        text.push_str(&pad_right(name, cols.name));
        text.push_str(&pad_left(price, cols.price));
        text.extend(std::iter::repeat_n(' ', cols.gap));
        FormattedLine::left(text).with_style(Style::BOLD)
    }

    /// Three-column item layout: `qty | name | price`.
    ///
    /// The name wraps inside its column. The price appears only on the first
    /// line; continuation lines (name overflow, then options as
    /// `- key: value`) are blank in the quantity column.
    pub fn item_lines(&self, row: &ItemRow) -> Vec<FormattedLine> {
        let budget = self.budget();
        let quantity = row.quantity.to_string();

        let Some(cols) = ItemColumns::for_paper(self.paper).fitted(&quantity, &row.price, budget) else {
            // Price text alone is about as wide as the paper: stack the row.
            let mut lines: Vec<FormattedLine> = wrap_to_columns(&format!("{quantity} {}", row.name), budget)
                .into_iter()
                .map(FormattedLine::left)
                .collect();
            lines.extend(wrap_to_columns(&row.price, budget).into_iter().map(FormattedLine::right));
            let indent = 2.min(budget.saturating_sub(1));
            for opt in &row.options {
                for segment in wrap_to_columns(&format!("- {}: {}", opt.key, opt.value), budget - indent) {
                    lines.push(FormattedLine::left(format!("{}{segment}", " ".repeat(indent))));
                }
            }
            return lines;
        };

        let mut lines = Vec::new();
        let segments = wrap_to_columns(&row.name, cols.name);
        let mut segments = segments.iter();

        let first = segments.next().map(String::as_str).unwrap_or_default();
        let mut text = pad_right(&quantity, cols.quantity);
        text.push_str(&pad_right(first, cols.name));
        text.push_str(&pad_left(&row.price, cols.price));
        text.extend(std::iter::repeat_n(' ', cols.gap));
        lines.push(FormattedLine::left(text).with_style(Style::column_emphasis(self.paper)));

        let continuation = |segment: &str| {
            let mut text = " ".repeat(cols.quantity);
            text.push_str(segment);
            FormattedLine::left(text)
        };

        for segment in segments {
            lines.push(continuation(segment.as_str()));
        }
        for opt in &row.options {
            for segment in wrap_to_columns(&format!("- {}: {}", opt.key, opt.value), cols.name) {
                lines.push(continuation(segment.as_str()));
            }
        }
        lines
    }
}
