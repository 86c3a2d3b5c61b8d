//! Node tree owned by a single block instance.

pub type NodeId = u64;

/// A detached node: raw source text, class list, and the lines a renderer wrote into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderNode {
    id: NodeId,
    text: String,
    classes: Vec<String>,
    rendered: Option<Vec<String>>,
}

impl RenderNode {
    pub fn new(id: NodeId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            classes: Vec::new(),
            rendered: None,
        }
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|candidate| candidate == class)
    }

    pub fn rendered(&self) -> Option<&[String]> {
        self.rendered.as_deref()
    }

    pub fn set_rendered(&mut self, lines: Vec<String>) {
        self.rendered = Some(lines);
    }

    /// Rendered output when present, otherwise the raw text.
    pub fn lines(&self) -> Vec<String> {
        match &self.rendered {
            Some(lines) => lines.clone(),
            None => self.text.lines().map(str::to_string).collect(),
        }
    }
}

/// Region a block draws into. Implementations must only be touched from the UI thread.
pub trait RenderTarget {
    /// Makes `node` the sole child, dropping whatever was shown before.
    fn replace_children(&mut self, node: RenderNode);

    /// Clears all children and shows `text` instead.
    fn show_placeholder(&mut self, text: &str);

    fn node_mut(&mut self, id: NodeId) -> Option<&mut RenderNode>;

    fn lines(&self) -> Vec<String>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderRegion {
    placeholder: Option<String>,
    children: Vec<RenderNode>,
}

impl RenderRegion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn children(&self) -> &[RenderNode] {
        &self.children
    }

    pub fn placeholder(&self) -> Option<&str> {
        self.placeholder.as_deref()
    }
}

impl RenderTarget for RenderRegion {
    fn replace_children(&mut self, node: RenderNode) {
        self.placeholder = None;
        self.children.clear();
        self.children.push(node);
    }

    fn show_placeholder(&mut self, text: &str) {
        self.children.clear();
        self.placeholder = Some(text.to_string());
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut RenderNode> {
        self.children.iter_mut().find(|node| node.id() == id)
    }

    fn lines(&self) -> Vec<String> {
        if self.children.is_empty() {
            return self
                .placeholder
                .as_deref()
                .map(|text| vec![text.to_string()])
                .unwrap_or_default();
        }
        self.children.iter().flat_map(RenderNode::lines).collect()
    }
}
