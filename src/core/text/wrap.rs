//! Word wrapping that keeps ANSI sequences attached to the text they style.

use unicode_segmentation::UnicodeSegmentation;

use super::ansi::ansi_code_len;
use super::width::{grapheme_width, visible_width};

/// Wraps each input line to `width` columns, breaking on whitespace and splitting words that
/// are longer than a full line. Always returns at least one line.
pub fn wrap_text_with_ansi(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![String::new()];
    }

    let mut result = Vec::new();
    for line in text.split('\n') {
        if visible_width(line) <= width {
            result.push(line.to_string());
            continue;
        }
        wrap_single_line(line, width, &mut result);
    }

    if result.is_empty() {
        result.push(String::new());
    }
    result
}

fn wrap_single_line(line: &str, width: usize, out: &mut Vec<String>) {
    let mut current = String::new();
    let mut current_width = 0usize;

    for token in split_tokens(line) {
        let token_width = visible_width(&token);
        let is_space = !token.is_empty() && strip_codes_is_blank(&token);

        if current_width + token_width <= width {
            current.push_str(&token);
            current_width += token_width;
            continue;
        }

        if is_space {
            out.push(current.trim_end().to_string());
            current.clear();
            current_width = 0;
            continue;
        }

        if current_width > 0 {
            out.push(current.trim_end().to_string());
            current.clear();
            current_width = 0;
        }

        if token_width <= width {
            current.push_str(&token);
            current_width = token_width;
            continue;
        }

        for piece in break_long_token(&token, width) {
            if current_width > 0 {
                out.push(std::mem::take(&mut current));
            }
            current_width = visible_width(&piece);
            current = piece;
        }
    }

    if !current.is_empty() || out.is_empty() {
        out.push(current.trim_end().to_string());
    }
}

fn strip_codes_is_blank(token: &str) -> bool {
    super::ansi::strip_ansi(token).trim().is_empty()
}

/// Splits into alternating word/whitespace runs; escape sequences stick to the following run.
fn split_tokens(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut current_is_space: Option<bool> = None;
    let mut idx = 0;

    while idx < line.len() {
        if let Some(len) = ansi_code_len(line, idx) {
            current.push_str(&line[idx..idx + len]);
            idx += len;
            continue;
        }
        let Some(ch) = line[idx..].chars().next() else {
            break;
        };
        let is_space = ch.is_whitespace();
        if current_is_space.is_some_and(|prev| prev != is_space) {
            tokens.push(std::mem::take(&mut current));
        }
        current_is_space = Some(is_space);
        current.push(ch);
        idx += ch.len_utf8();
    }

    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn break_long_token(token: &str, width: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_width = 0usize;
    let mut idx = 0;

    while idx < token.len() {
        if let Some(len) = ansi_code_len(token, idx) {
            current.push_str(&token[idx..idx + len]);
            idx += len;
            continue;
        }
        let next_code = (idx..token.len())
            .find(|pos| token.as_bytes()[*pos] == 0x1b && ansi_code_len(token, *pos).is_some())
            .unwrap_or(token.len());
        for grapheme in token[idx..next_code].graphemes(true) {
            let g_width = grapheme_width(grapheme);
            if current_width + g_width > width && current_width > 0 {
                pieces.push(std::mem::take(&mut current));
                current_width = 0;
            }
            current.push_str(grapheme);
            current_width += g_width;
        }
        idx = next_code;
    }

    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}
