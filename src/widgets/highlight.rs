//! Syntax highlighting for fenced code blocks.

use once_cell::sync::Lazy;
use syntect::easy::HighlightLines;
use syntect::highlighting::ThemeSet;
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::{as_24_bit_terminal_escaped, LinesWithEndings};

static SYNTAX_SET: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: Lazy<ThemeSet> = Lazy::new(ThemeSet::load_defaults);

const THEME_NAME: &str = "base16-ocean.dark";
const RESET: &str = "\x1b[0m";

/// Loads the syntax and theme sets. Run on a background thread at startup so the first
/// highlighted block does not pay the load cost on the UI thread.
pub fn prewarm_code_highlighting() {
    Lazy::force(&SYNTAX_SET);
    Lazy::force(&THEME_SET);
}

fn syntax_for(lang: Option<&str>) -> &'static SyntaxReference {
    let token = lang.map(|lang| match lang.to_ascii_lowercase().as_str() {
        "shell" | "sh" | "zsh" | "console" => "bash".to_string(),
        "ts" | "typescript" | "tsx" | "jsx" => "js".to_string(),
        "yml" => "yaml".to_string(),
        other => other.to_string(),
    });

    token
        .and_then(|token| SYNTAX_SET.find_syntax_by_token(&token))
        .unwrap_or_else(|| SYNTAX_SET.find_syntax_plain_text())
}

/// Highlights `code` into one ANSI-styled string per source line. Unknown languages and
/// highlighting failures fall back to the raw lines.
pub fn highlight_code(code: &str, lang: Option<&str>) -> Vec<String> {
    let Some(theme) = THEME_SET.themes.get(THEME_NAME) else {
        return code.split('\n').map(str::to_string).collect();
    };
    let mut highlighter = HighlightLines::new(syntax_for(lang), theme);

    let mut lines = Vec::new();
    for line in LinesWithEndings::from(code) {
        let text = line.trim_end_matches(['\n', '\r']);
        match highlighter.highlight_line(line, &SYNTAX_SET) {
            Ok(ranges) => {
                let styled = as_24_bit_terminal_escaped(&ranges[..], false);
                lines.push(format!("{}{RESET}", styled.trim_end_matches(['\n', '\r'])));
            }
            Err(error) => {
                tracing::debug!(%error, "syntax highlighting failed; using plain text");
                lines.push(text.to_string());
            }
        }
    }
    if code.is_empty() || code.ends_with('\n') {
        lines.push(String::new());
    }
    lines
}
