//! Grapheme width and visible width helpers.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use super::ansi::{ansi_code_len, strip_ansi};

const TAB_WIDTH: usize = 3;

pub fn grapheme_width(grapheme: &str) -> usize {
    if grapheme == "\t" {
        return TAB_WIDTH;
    }
    UnicodeWidthStr::width(grapheme)
}

/// Terminal column count of `input`, ignoring ANSI control sequences.
pub fn visible_width(input: &str) -> usize {
    if input.is_empty() {
        return 0;
    }
    strip_ansi(input).graphemes(true).map(grapheme_width).sum()
}

/// Right-pads `input` with spaces up to `width` visible columns.
pub fn pad_to_width(input: &str, width: usize) -> String {
    let padding = width.saturating_sub(visible_width(input));
    format!("{input}{}", " ".repeat(padding))
}

/// Centers `input` inside `width` columns; extra space goes to the right.
pub fn center_in_width(input: &str, width: usize) -> String {
    let total = width.saturating_sub(visible_width(input));
    let left = total / 2;
    format!("{}{input}{}", " ".repeat(left), " ".repeat(total - left))
}

/// Cuts `input` to at most `width` visible columns. ANSI sequences are kept intact.
pub fn truncate_to_width(input: &str, width: usize) -> String {
    if visible_width(input) <= width {
        return input.to_string();
    }

    let mut out = String::new();
    let mut used = 0usize;
    let mut pos = 0usize;
    while pos < input.len() {
        if let Some(len) = ansi_code_len(input, pos) {
            out.push_str(&input[pos..pos + len]);
            pos += len;
            continue;
        }
        let Some(grapheme) = input[pos..].graphemes(true).next() else {
            break;
        };
        let grapheme_cols = grapheme_width(grapheme);
        if used + grapheme_cols > width {
            break;
        }
        out.push_str(grapheme);
        used += grapheme_cols;
        pos += grapheme.len();
    }
    out
}
