use slotmap::new_key_type;

use super::style::InlineStyle;

const VOID_ELEMENTS: [&str; 13] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

new_key_type! {
    /// Generational handle to a node in a [`Document`](super::Document).
    ///
    /// A handle to a discarded node never resolves to a node created later.
    pub struct NodeId;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    tag: String,
    attrs: Vec<Attribute>,
}

impl ElementData {
    pub fn new(tag: impl Into<String>, attrs: Vec<Attribute>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            attrs,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn is(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }

    /// Void elements serialize without content or a closing tag.
    pub fn is_void(&self) -> bool {
        VOID_ELEMENTS.contains(&self.tag.as_str())
    }

    pub fn attrs(&self) -> &[Attribute] {
        &self.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|attr| attr.name == name)
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or_default().split_ascii_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|existing| existing == class)
    }

    pub fn style(&self) -> InlineStyle {
        InlineStyle::parse(self.attr("style").unwrap_or_default())
    }

    /// Returns `true` when the stored value changed.
    pub(crate) fn set_attr(&mut self, name: &str, value: &str) -> bool {
        match self.attrs.iter_mut().find(|attr| attr.name == name) {
            Some(attr) if attr.value == value => false,
            Some(attr) => {
                attr.value = value.to_string();
                true
            }
            None => {
                self.attrs.push(Attribute::new(name, value));
                true
            }
        }
    }

    pub(crate) fn remove_attr(&mut self, name: &str) -> Option<String> {
        let index = self.attrs.iter().position(|attr| attr.name == name)?;
        Some(self.attrs.remove(index).value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Document,
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) data: NodeData,
}

impl Node {
    pub(crate) fn new(data: NodeData) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            data,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn data(&self) -> &NodeData {
        &self.data
    }

    pub fn element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn can_have_children(&self) -> bool {
        matches!(self.data, NodeData::Document | NodeData::Element(_))
    }
}
