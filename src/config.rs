//! Environment configuration for the chat UI.

use std::env;
use std::time::Duration;

use crate::clipboard::DEFAULT_COPIED_DURATION;
use crate::diagram::{DiagramConfig, DiagramTheme};

pub const COPIED_MS_ENV: &str = "DIAGRAM_CHAT_COPIED_MS";
pub const DIAGRAM_THEME_ENV: &str = "DIAGRAM_CHAT_DIAGRAM_THEME";
pub const PLAIN_ENV: &str = "DIAGRAM_CHAT_PLAIN";
pub const LOG_ENV: &str = "DIAGRAM_CHAT_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiConfig {
    pub copied_duration: Duration,
    pub diagram_theme: DiagramTheme,
    /// Disables ANSI styling in rendered output.
    pub plain: bool,
    pub log_file: Option<String>,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            copied_duration: DEFAULT_COPIED_DURATION,
            diagram_theme: DiagramTheme::default(),
            plain: false,
            log_file: None,
        }
    }
}

impl UiConfig {
    /// Reads the `DIAGRAM_CHAT_*` variables. Malformed values are logged and replaced by
    /// defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let copied_duration = match env_string_opt(COPIED_MS_ENV) {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) => Duration::from_millis(ms),
                Err(error) => {
                    tracing::warn!(%raw, %error, "ignoring {COPIED_MS_ENV}");
                    defaults.copied_duration
                }
            },
            None => defaults.copied_duration,
        };

        let diagram_theme = match env_string_opt(DIAGRAM_THEME_ENV) {
            Some(raw) => raw.parse().unwrap_or_else(|error| {
                tracing::warn!(%error, "ignoring {DIAGRAM_THEME_ENV}");
                defaults.diagram_theme
            }),
            None => defaults.diagram_theme,
        };

        Self {
            copied_duration,
            diagram_theme,
            plain: env_flag(PLAIN_ENV),
            log_file: env_string_opt(LOG_ENV),
        }
    }

    pub fn diagram_config(&self) -> DiagramConfig {
        DiagramConfig {
            theme: self.diagram_theme,
        }
    }
}

fn env_flag(key: &str) -> bool {
    env::var(key).map(|value| value == "1").unwrap_or(false)
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}
