//! Border glyph sets selected by the diagram theme.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyphs {
    pub horizontal: char,
    pub vertical: char,
    pub top_left: char,
    pub top_right: char,
    pub bottom_left: char,
    pub bottom_right: char,
    pub tee_down: char,
    pub tee_up: char,
    pub junction: char,
    pub round_top_left: char,
    pub round_top_right: char,
    pub round_bottom_left: char,
    pub round_bottom_right: char,
    pub rise: char,
    pub fall: char,
    pub up: char,
    pub down: char,
    pub left: char,
    pub right: char,
    pub dotted: char,
    pub thick: char,
    pub cross: char,
    pub circle: char,
}

impl Glyphs {
    pub fn square_corners(&self) -> [char; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_left,
            self.bottom_right,
        ]
    }

    pub fn round_corners(&self) -> [char; 4] {
        [
            self.round_top_left,
            self.round_top_right,
            self.round_bottom_left,
            self.round_bottom_right,
        ]
    }
}

const LIGHT: Glyphs = Glyphs {
    horizontal: '─',
    vertical: '│',
    top_left: '┌',
    top_right: '┐',
    bottom_left: '└',
    bottom_right: '┘',
    tee_down: '┬',
    tee_up: '┴',
    junction: '┼',
    round_top_left: '╭',
    round_top_right: '╮',
    round_bottom_left: '╰',
    round_bottom_right: '╯',
    rise: '╱',
    fall: '╲',
    up: '▲',
    down: '▼',
    left: '◀',
    right: '▶',
    dotted: '┄',
    thick: '━',
    cross: '✕',
    circle: '○',
};

const ASCII: Glyphs = Glyphs {
    horizontal: '-',
    vertical: '|',
    top_left: '+',
    top_right: '+',
    bottom_left: '+',
    bottom_right: '+',
    tee_down: '+',
    tee_up: '+',
    junction: '+',
    round_top_left: '.',
    round_top_right: '.',
    round_bottom_left: '\'',
    round_bottom_right: '\'',
    rise: '/',
    fall: '\\',
    up: '^',
    down: 'v',
    left: '<',
    right: '>',
    dotted: '.',
    thick: '=',
    cross: 'x',
    circle: 'o',
};

const HEAVY: Glyphs = Glyphs {
    horizontal: '━',
    vertical: '┃',
    top_left: '┏',
    top_right: '┓',
    bottom_left: '┗',
    bottom_right: '┛',
    tee_down: '┳',
    tee_up: '┻',
    junction: '╋',
    round_top_left: '┏',
    round_top_right: '┓',
    round_bottom_left: '┗',
    round_bottom_right: '┛',
    thick: '█',
    ..LIGHT
};

const DOUBLE: Glyphs = Glyphs {
    horizontal: '═',
    vertical: '║',
    top_left: '╔',
    top_right: '╗',
    bottom_left: '╚',
    bottom_right: '╝',
    tee_down: '╦',
    tee_up: '╩',
    junction: '╬',
    round_top_left: '╔',
    round_top_right: '╗',
    round_bottom_left: '╚',
    round_bottom_right: '╝',
    ..LIGHT
};

/// Named diagram themes, matching the Mermaid theme names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DiagramTheme {
    #[default]
    Default,
    Neutral,
    Dark,
    Forest,
}

impl DiagramTheme {
    pub fn glyphs(self) -> &'static Glyphs {
        match self {
            Self::Default => &LIGHT,
            Self::Neutral => &ASCII,
            Self::Dark => &HEAVY,
            Self::Forest => &DOUBLE,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Neutral => "neutral",
            Self::Dark => "dark",
            Self::Forest => "forest",
        }
    }
}

impl fmt::Display for DiagramTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTheme(pub String);

impl fmt::Display for UnknownTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown diagram theme '{}'", self.0)
    }
}

impl std::error::Error for UnknownTheme {}

impl FromStr for DiagramTheme {
    type Err = UnknownTheme;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "neutral" => Ok(Self::Neutral),
            "dark" => Ok(Self::Dark),
            "forest" => Ok(Self::Forest),
            _ => Err(UnknownTheme(value.to_string())),
        }
    }
}
