use thiserror::Error;

/// Failure raised while parsing or laying out a diagram source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiagramError {
    #[error("diagram source is empty")]
    Empty,

    #[error("unsupported diagram type '{kind}'")]
    UnsupportedDiagram { kind: String },

    #[error("unknown flowchart direction '{direction}' on line {line}")]
    UnknownDirection { line: usize, direction: String },

    #[error("syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("diagram declares no nodes")]
    NoNodes,

    #[error("diagram renderer panicked")]
    Panicked,
}

impl DiagramError {
    pub(crate) fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            message: message.into(),
        }
    }
}
