//! Parser for the Mermaid flowchart dialect (`graph` / `flowchart`).

use super::error::DiagramError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    TopDown,
    BottomUp,
    LeftRight,
    RightLeft,
}

impl Direction {
    fn parse(token: &str) -> Option<Self> {
        Some(match token {
            "TD" | "TB" => Self::TopDown,
            "BT" => Self::BottomUp,
            "LR" => Self::LeftRight,
            "RL" => Self::RightLeft,
            _ => return None,
        })
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::LeftRight | Self::RightLeft)
    }

    pub fn is_reversed(self) -> bool {
        matches!(self, Self::BottomUp | Self::RightLeft)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeShape {
    /// `id[label]`
    Rect,
    /// `id(label)`
    Round,
    /// `id([label])`
    Stadium,
    /// `id((label))`
    Circle,
    /// `id{label}` and `id{{label}}`
    Rhombus,
    /// `id>label]`
    Flag,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowNode {
    pub id: String,
    pub label: String,
    pub shape: NodeShape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeStyle {
    Arrow,
    Open,
    DottedArrow,
    Dotted,
    Thick,
    ThickOpen,
    Cross,
    Circle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowEdge {
    pub from: String,
    pub to: String,
    pub label: Option<String>,
    pub style: EdgeStyle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flowchart {
    pub direction: Direction,
    pub nodes: Vec<FlowNode>,
    pub edges: Vec<FlowEdge>,
}

const IGNORED_KEYWORDS: [&str; 8] = [
    "classDef",
    "class",
    "style",
    "linkStyle",
    "click",
    "subgraph",
    "end",
    "direction",
];

impl Flowchart {
    /// Parses a flowchart source. The first statement must be the `graph`/`flowchart` header.
    pub fn parse(source: &str) -> Result<Self, DiagramError> {
        let statements = split_statements(source);
        let Some((header_line, header)) = statements.first() else {
            return Err(DiagramError::Empty);
        };

        let mut words = header.split_whitespace();
        let kind = words.next().unwrap_or_default();
        if kind != "graph" && kind != "flowchart" {
            return Err(DiagramError::UnsupportedDiagram {
                kind: kind.to_string(),
            });
        }
        let direction = match words.next() {
            Some(token) => Direction::parse(token).ok_or_else(|| DiagramError::UnknownDirection {
                line: *header_line,
                direction: token.to_string(),
            })?,
            None => Direction::TopDown,
        };
        if let Some(extra) = words.next() {
            return Err(DiagramError::syntax(
                *header_line,
                format!("unexpected '{extra}' after diagram header"),
            ));
        }

        let mut chart = Self {
            direction,
            nodes: Vec::new(),
            edges: Vec::new(),
        };

        for (line, statement) in statements.iter().skip(1) {
            let keyword = statement.split_whitespace().next().unwrap_or_default();
            if IGNORED_KEYWORDS.contains(&keyword) {
                continue;
            }
            StatementParser::new(statement, *line).parse_chain(&mut chart)?;
        }

        if chart.nodes.is_empty() {
            return Err(DiagramError::NoNodes);
        }
        Ok(chart)
    }

    pub fn node(&self, id: &str) -> Option<&FlowNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    fn upsert_node(&mut self, id: &str, shape: Option<(NodeShape, String)>) {
        if let Some(node) = self.nodes.iter_mut().find(|node| node.id == id) {
            if let Some((shape, label)) = shape {
                node.shape = shape;
                node.label = label;
            }
            return;
        }

        let (shape, label) = shape.unwrap_or((NodeShape::Rect, String::new()));
        let label = if label.is_empty() {
            id.to_string()
        } else {
            label
        };
        self.nodes.push(FlowNode {
            id: id.to_string(),
            label,
            shape,
        });
    }
}

/// Splits the source into `(line_number, statement)` pairs on newlines and on `;` outside
/// of quotes and shape brackets. Comments and blank statements are dropped.
fn split_statements(source: &str) -> Vec<(usize, String)> {
    let mut statements = Vec::new();

    for (idx, raw) in source.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with("%%") {
            continue;
        }

        let mut depth = 0usize;
        let mut in_quote = false;
        let mut start = 0usize;
        for (pos, ch) in raw.char_indices() {
            match ch {
                '"' => in_quote = !in_quote,
                '[' | '(' | '{' if !in_quote => depth += 1,
                ']' | ')' | '}' if !in_quote => depth = depth.saturating_sub(1),
                ';' if !in_quote && depth == 0 => {
                    push_statement(&mut statements, line, &raw[start..pos]);
                    start = pos + 1;
                }
                _ => {}
            }
        }
        push_statement(&mut statements, line, &raw[start..]);
    }

    statements
}

fn push_statement(statements: &mut Vec<(usize, String)>, line: usize, text: &str) {
    let text = text.trim();
    if !text.is_empty() {
        statements.push((line, text.to_string()));
    }
}

struct StatementParser {
    chars: Vec<char>,
    pos: usize,
    line: usize,
}

impl StatementParser {
    fn new(statement: &str, line: usize) -> Self {
        Self {
            chars: statement.chars().collect(),
            pos: 0,
            line,
        }
    }

    fn parse_chain(&mut self, chart: &mut Flowchart) -> Result<(), DiagramError> {
        let mut sources = self.parse_node_group(chart)?;

        loop {
            self.skip_ws();
            if self.at_end() {
                return Ok(());
            }

            let Some((style, inline_label)) = self.parse_edge()? else {
                return Err(self.error(format!("unexpected '{}'", self.rest())));
            };
            self.skip_ws();
            let label = match inline_label {
                Some(label) => Some(label),
                None => self.parse_pipe_label()?,
            };

            self.skip_ws();
            if self.at_end() {
                return Err(self.error("edge has no target node"));
            }
            let targets = self.parse_node_group(chart)?;

            for from in &sources {
                for to in &targets {
                    chart.edges.push(FlowEdge {
                        from: from.clone(),
                        to: to.clone(),
                        label: label.clone(),
                        style,
                    });
                }
            }
            sources = targets;
        }
    }

    fn parse_node_group(&mut self, chart: &mut Flowchart) -> Result<Vec<String>, DiagramError> {
        let mut ids = vec![self.parse_node(chart)?];
        loop {
            let save = self.pos;
            self.skip_ws();
            if self.eat('&') {
                ids.push(self.parse_node(chart)?);
            } else {
                self.pos = save;
                return Ok(ids);
            }
        }
    }

    fn parse_node(&mut self, chart: &mut Flowchart) -> Result<String, DiagramError> {
        self.skip_ws();
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|ch| ch.is_alphanumeric() || ch == '_')
        {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error(format!("expected node id at '{}'", self.rest())));
        }

        let id: String = self.chars[start..self.pos].iter().collect();
        let shape = self.parse_shape()?;
        self.skip_class_suffix();
        chart.upsert_node(&id, shape);
        Ok(id)
    }

    fn parse_shape(&mut self) -> Result<Option<(NodeShape, String)>, DiagramError> {
        const OPENERS: [(&str, NodeShape, &str); 7] = [
            ("((", NodeShape::Circle, "))"),
            ("([", NodeShape::Stadium, "])"),
            ("{{", NodeShape::Rhombus, "}}"),
            ("[", NodeShape::Rect, "]"),
            ("(", NodeShape::Round, ")"),
            ("{", NodeShape::Rhombus, "}"),
            (">", NodeShape::Flag, "]"),
        ];

        for (open, shape, close) in OPENERS {
            if self.starts_with(open) {
                self.pos += open.chars().count();
                let label = self.read_shape_label(close)?;
                return Ok(Some((shape, label)));
            }
        }
        Ok(None)
    }

    fn read_shape_label(&mut self, close: &str) -> Result<String, DiagramError> {
        self.skip_ws();
        if self.eat('"') {
            let start = self.pos;
            while self.peek().is_some_and(|ch| ch != '"') {
                self.pos += 1;
            }
            if self.at_end() {
                return Err(self.error("unterminated quoted label"));
            }
            let label: String = self.chars[start..self.pos].iter().collect();
            self.pos += 1;
            self.skip_ws();
            if !self.starts_with(close) {
                return Err(self.error(format!("expected '{close}' after quoted label")));
            }
            self.pos += close.chars().count();
            return Ok(clean_label(&label));
        }

        let start = self.pos;
        while !self.at_end() && !self.starts_with(close) {
            self.pos += 1;
        }
        if self.at_end() {
            return Err(self.error(format!("unterminated node shape, expected '{close}'")));
        }
        let label: String = self.chars[start..self.pos].iter().collect();
        self.pos += close.chars().count();
        Ok(clean_label(&label))
    }

    fn skip_class_suffix(&mut self) {
        if self.starts_with(":::") {
            self.pos += 3;
            while self
                .peek()
                .is_some_and(|ch| ch.is_alphanumeric() || ch == '_' || ch == '-')
            {
                self.pos += 1;
            }
        }
    }

    /// Parses an edge operator, including the `-- label -->` inline label form.
    fn parse_edge(&mut self) -> Result<Option<(EdgeStyle, Option<String>)>, DiagramError> {
        match (self.peek(), self.peek_at(1)) {
            (Some('-'), Some('.')) => {
                self.pos += 1;
                self.eat_run('.');
                self.eat_run('-');
                let style = if self.eat('>') {
                    EdgeStyle::DottedArrow
                } else {
                    EdgeStyle::Dotted
                };
                Ok(Some((style, None)))
            }
            (Some('-'), Some('-')) => {
                let dashes = self.eat_run('-');
                if self.eat('>') {
                    return Ok(Some((EdgeStyle::Arrow, None)));
                }
                if let Some(style) = self.eat_edge_cap() {
                    return Ok(Some((style, None)));
                }
                if dashes >= 3 {
                    return Ok(Some((EdgeStyle::Open, None)));
                }
                let label = self.read_inline_label('-')?;
                self.eat_run('-');
                let style = if self.eat('>') {
                    EdgeStyle::Arrow
                } else {
                    self.eat_edge_cap().unwrap_or(EdgeStyle::Open)
                };
                Ok(Some((style, label)))
            }
            (Some('='), Some('=')) => {
                let bars = self.eat_run('=');
                if self.eat('>') {
                    return Ok(Some((EdgeStyle::Thick, None)));
                }
                if bars >= 3 {
                    return Ok(Some((EdgeStyle::ThickOpen, None)));
                }
                let label = self.read_inline_label('=')?;
                self.eat_run('=');
                let style = if self.eat('>') {
                    EdgeStyle::Thick
                } else {
                    EdgeStyle::ThickOpen
                };
                Ok(Some((style, label)))
            }
            _ => Ok(None),
        }
    }

    fn eat_edge_cap(&mut self) -> Option<EdgeStyle> {
        let style = match self.peek()? {
            'x' => EdgeStyle::Cross,
            'o' => EdgeStyle::Circle,
            _ => return None,
        };
        let next_is_id = self
            .peek_at(1)
            .is_some_and(|ch| ch.is_alphanumeric() || ch == '_');
        if next_is_id {
            return None;
        }
        self.pos += 1;
        Some(style)
    }

    fn read_inline_label(&mut self, fill: char) -> Result<Option<String>, DiagramError> {
        let start = self.pos;
        while !self.at_end() && !(self.peek() == Some(fill) && self.peek_at(1) == Some(fill)) {
            self.pos += 1;
        }
        if self.at_end() {
            return Err(self.error("unterminated edge label"));
        }
        let label: String = self.chars[start..self.pos].iter().collect();
        let label = clean_label(&label);
        Ok((!label.is_empty()).then_some(label))
    }

    fn parse_pipe_label(&mut self) -> Result<Option<String>, DiagramError> {
        if !self.eat('|') {
            return Ok(None);
        }
        let start = self.pos;
        while self.peek().is_some_and(|ch| ch != '|') {
            self.pos += 1;
        }
        if self.at_end() {
            return Err(self.error("unterminated edge label"));
        }
        let label: String = self.chars[start..self.pos].iter().collect();
        self.pos += 1;
        let label = clean_label(&label);
        Ok((!label.is_empty()).then_some(label))
    }

    fn eat_run(&mut self, ch: char) -> usize {
        let start = self.pos;
        while self.peek() == Some(ch) {
            self.pos += 1;
        }
        self.pos - start
    }

    fn eat(&mut self, ch: char) -> bool {
        if self.peek() == Some(ch) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn starts_with(&self, pattern: &str) -> bool {
        pattern
            .chars()
            .enumerate()
            .all(|(offset, ch)| self.peek_at(offset) == Some(ch))
    }

    fn peek(&self) -> Option<char> {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn rest(&self) -> String {
        self.chars[self.pos.min(self.chars.len())..].iter().collect()
    }

    fn error(&self, message: impl Into<String>) -> DiagramError {
        DiagramError::syntax(self.line, message)
    }
}

fn clean_label(raw: &str) -> String {
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|value| value.strip_suffix('"'))
        .unwrap_or(trimmed);
    unquoted
        .replace("<br/>", " ")
        .replace("<br>", " ")
        .trim()
        .to_string()
}
