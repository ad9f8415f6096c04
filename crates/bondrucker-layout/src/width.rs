// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Column accounting for fixed-width thermal output. CJK ideographs and
// full-width forms occupy two character cells, everything else one.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

static TAG: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"<[^>]*>").ok());

/// Cells occupied by one character.
pub fn char_columns(ch: char) -> usize {
    match ch as u32 {
        0x4E00..=0x9FFF // CJK unified ideographs
        | 0x3400..=0x4DBF // extension A
        | 0x3000..=0x303F // CJK symbols and punctuation
        | 0xFF00..=0xFFEF // half/full-width forms
        | 0xFE30..=0xFE4F => 2, // CJK compatibility forms
        _ => 1,
    }
}

/// Cells occupied by `text`, taken literally.
pub fn visible_columns(text: &str) -> usize {
    text.chars().map(char_columns).sum()
}

/// Remove `<...>` style tags.
pub fn strip_tags(text: &str) -> Cow<'_, str> {
    match TAG.as_ref() {
        Some(re) => re.replace_all(text, ""),
        None => Cow::Borrowed(text),
    }
}

/// Cells occupied by `text` once style tags are removed.
pub fn markup_columns(text: &str) -> usize {
    visible_columns(&strip_tags(text))
}

/// Append spaces until `text` fills `target` cells. Never truncates.
pub fn pad_right(text: &str, target: usize) -> String {
    let pad = target.saturating_sub(markup_columns(text));
    let mut out = String::with_capacity(text.len() + pad);
    out.push_str(text);
    out.extend(std::iter::repeat_n(' ', pad));
    out
}

/// Prepend spaces until `text` fills `target` cells. Never truncates.
pub fn pad_left(text: &str, target: usize) -> String {
    let pad = target.saturating_sub(markup_columns(text));
    let mut out = " ".repeat(pad);
    out.push_str(text);
    out
}

/// Split `text` into segments of at most `max_cols` cells.
///
/// Breaks at the last space of the current segment (the space itself is
/// dropped); a segment with no space is broken hard. An empty input yields a
/// single empty segment.
pub fn wrap_to_columns(text: &str, max_cols: usize) -> Vec<String> {
    if text.is_empty() {
        return vec![String::new()];
    }
    let max_cols = max_cols.max(1);

    let mut out = Vec::new();
    let mut seg = String::new();
    let mut cols = 0;
    // Byte offset of the last space in `seg`.
    let mut last_space: Option<usize> = None;

    for ch in text.chars() {
        let w = char_columns(ch);
        while cols + w > max_cols && !seg.is_empty() {
            match last_space.take() {
                Some(idx) => {
                    let remain = seg[idx + 1..].to_string();
                    if idx > 0 {
                        out.push(seg[..idx].to_string());
                    }
                    seg = remain;
                    cols = visible_columns(&seg);
                }
                None => {
                    out.push(std::mem::take(&mut seg));
                    cols = 0;
                }
            }
        }
        if ch == ' ' && seg.is_empty() && !out.is_empty() {
            continue;
        }
        seg.push(ch);
        cols += w;
        if ch == ' ' {
            last_space = Some(seg.len() - 1);
        }
    }
    if !seg.is_empty() {
        out.push(seg);
    }
    if out.is_empty() {
        out.push(String::new());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_and_cjk_columns() {
        assert_eq!(visible_columns("AB"), 2);
        assert_eq!(visible_columns("中文"), 4);
        assert_eq!(visible_columns("A中"), 3);
        assert_eq!(visible_columns("，"), 2);
        assert_eq!(visible_columns(""), 0);
    }

    #[test]
    fn columns_are_additive() {
        let a = "Pad Thai ";
        let b = "宫保鸡丁";
        assert_eq!(
            visible_columns(&format!("{a}{b}")),
            visible_columns(a) + visible_columns(b)
        );
    }

    #[test]
    fn tags_do_not_count() {
        assert_eq!(strip_tags("<h><b>Total</b></h>"), "Total");
        assert_eq!(markup_columns("<b>中</b>x"), 3);
    }

    #[test]
    fn padding_uses_visible_width() {
        assert_eq!(pad_right("中", 4), "中  ");
        assert_eq!(pad_left("<b>9</b>", 3), "  <b>9</b>");
        assert_eq!(pad_right("toolong", 3), "toolong");
    }

    #[test]
    fn wrap_prefers_word_boundaries() {
        assert_eq!(
            wrap_to_columns("Chicken Burger Deluxe", 10),
            vec!["Chicken", "Burger", "Deluxe"]
        );
    }

    #[test]
    fn wrap_hard_breaks_long_words() {
        assert_eq!(wrap_to_columns("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn wrap_counts_cjk_as_double() {
        assert_eq!(wrap_to_columns("中文中文中文", 5), vec!["中文", "中文", "中文"]);
    }

    #[test]
    fn wrap_never_exceeds_budget() {
        let text = "Spicy 麻辣 hot pot with extra 牛肉 and a very long descriptionwithoutspaces";
        for max in 2..20 {
            for line in wrap_to_columns(text, max) {
                assert!(visible_columns(&line) <= max, "{line:?} exceeds {max}");
            }
        }
    }

    #[test]
    fn wrap_of_empty_is_one_empty_segment() {
        assert_eq!(wrap_to_columns("", 8), vec![String::new()]);
    }
}
