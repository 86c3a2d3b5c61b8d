//! Diagram engine: turns Mermaid flowchart sources into terminal lines.
//!
//! Engine configuration is process-wide. Call [`initialize`] once during startup to pick a
//! theme; if nothing does, the first [`config`] lookup installs [`DiagramConfig::default`].

mod error;
pub mod flowchart;
pub mod layout;
pub mod theme;

use std::sync::OnceLock;

pub use error::DiagramError;
pub use flowchart::Flowchart;
pub use theme::{DiagramTheme, Glyphs};

/// One-time engine settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagramConfig {
    pub theme: DiagramTheme,
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            theme: DiagramTheme::Default,
        }
    }
}

static ENGINE_CONFIG: OnceLock<DiagramConfig> = OnceLock::new();

/// Installs the engine configuration. Returns `false` when a configuration was already in
/// place, in which case the existing one is kept.
pub fn initialize(config: DiagramConfig) -> bool {
    let installed = ENGINE_CONFIG.set(config).is_ok();
    if installed {
        tracing::debug!(theme = %config.theme, "diagram engine initialized");
    } else {
        tracing::debug!("diagram engine already initialized; keeping existing config");
    }
    installed
}

/// Returns the active engine configuration, defaulting it on first use.
pub fn config() -> &'static DiagramConfig {
    ENGINE_CONFIG.get_or_init(DiagramConfig::default)
}

/// Renders diagram source text into terminal lines.
///
/// Implementations are called from render worker threads, hence the `Send + Sync` bound.
pub trait DiagramRenderer: Send + Sync + 'static {
    fn render(&self, source: &str) -> Result<Vec<String>, DiagramError>;
}

/// Flowchart renderer backed by the process-wide engine config.
#[derive(Debug, Clone, Copy, Default)]
pub struct MermaidRenderer {
    theme: Option<DiagramTheme>,
}

impl MermaidRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins a theme for this renderer instead of reading the engine config.
    pub fn with_theme(theme: DiagramTheme) -> Self {
        Self { theme: Some(theme) }
    }

    fn theme(&self) -> DiagramTheme {
        self.theme.unwrap_or_else(|| config().theme)
    }
}

impl DiagramRenderer for MermaidRenderer {
    fn render(&self, source: &str) -> Result<Vec<String>, DiagramError> {
        let chart = Flowchart::parse(source)?;
        Ok(layout::draw(&chart, self.theme().glyphs()))
    }
}
