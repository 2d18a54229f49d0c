//! In-memory document model standing in for the host page's DOM.
//!
//! Nodes live in a generational arena. Structural, attribute and text
//! changes are reported to registered observers as [`MutationRecord`]s,
//! queued until the observer drains them.

mod mutation;
mod node;
mod style;

use slotmap::SlotMap;
use thiserror::Error;

pub use mutation::{MutationKind, MutationRecord, ObserveOptions, ObserverId};
pub use node::{Attribute, ElementData, Node, NodeData, NodeId};
pub use style::InlineStyle;

use mutation::Observer;

use crate::infra::html;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("node does not exist in this document")]
    UnknownNode,
    #[error("node is not an element")]
    NotAnElement,
    #[error("node cannot hold children")]
    NotAContainer,
    #[error("insertion would place a node inside itself")]
    HierarchyRequest,
    #[error("reference node is not a child of the given parent")]
    NotAChild,
    #[error("offset {offset} is out of range for a node of length {length}")]
    OffsetOutOfRange { offset: usize, length: usize },
}

/// Text cursor position. For text nodes `offset` counts characters, for
/// element and document nodes it is a child index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caret {
    pub node: NodeId,
    pub offset: usize,
}

impl Caret {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

#[derive(Debug)]
pub struct Document {
    nodes: SlotMap<NodeId, Node>,
    root: NodeId,
    observers: SlotMap<ObserverId, Observer>,
    caret: Option<Caret>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::new(NodeData::Document));
        Self {
            nodes,
            root,
            observers: SlotMap::with_key(),
            caret: None,
        }
    }

    /// The document node every connected node descends from.
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn exists(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.nodes.get(id).and_then(Node::element)
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(ElementData::tag)
    }

    pub fn is_tag(&self, id: NodeId, tag: &str) -> bool {
        self.element(id).is_some_and(|element| element.is(tag))
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|element| element.attr(name))
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id)
            .is_some_and(|element| element.has_class(class))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(Node::parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map(Node::children).unwrap_or_default()
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|child| *child == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        index
            .checked_sub(1)
            .and_then(|previous| self.children(parent).get(previous).copied())
    }

    /// Strict ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            nodes: &self.nodes,
            next: self.parent(id),
        }
    }

    /// Inclusive: a node contains itself.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        contains_in(&self.nodes, ancestor, node)
    }

    pub fn is_connected(&self, id: NodeId) -> bool {
        self.contains(self.root, id)
    }

    /// Pre-order walk of the subtree rooted at `id`, including `id`.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let stack = if self.exists(id) { vec![id] } else { Vec::new() };
        Descendants { doc: self, stack }
    }

    /// First strict descendant element matching `predicate`, in document order.
    pub fn find_descendant(
        &self,
        id: NodeId,
        mut predicate: impl FnMut(NodeId, &ElementData) -> bool,
    ) -> Option<NodeId> {
        self.descendants(id)
            .skip(1)
            .find(|candidate| {
                self.element(*candidate)
                    .is_some_and(|element| predicate(*candidate, element))
            })
    }

    pub fn find_descendants(
        &self,
        id: NodeId,
        mut predicate: impl FnMut(NodeId, &ElementData) -> bool,
    ) -> Vec<NodeId> {
        self.descendants(id)
            .skip(1)
            .filter(|candidate| {
                self.element(*candidate)
                    .is_some_and(|element| predicate(*candidate, element))
            })
            .collect()
    }

    /// Nearest inclusive ancestor element matching `predicate`.
    pub fn closest(
        &self,
        id: NodeId,
        mut predicate: impl FnMut(NodeId, &ElementData) -> bool,
    ) -> Option<NodeId> {
        std::iter::once(id).chain(self.ancestors(id)).find(|candidate| {
            self.element(*candidate)
                .is_some_and(|element| predicate(*candidate, element))
        })
    }

    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .filter_map(|node| self.nodes.get(node).and_then(Node::text))
            .collect()
    }

    pub fn inner_html(&self, id: NodeId) -> String {
        html::inner_html(self, id)
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        html::outer_html(self, id)
    }

    pub fn create_element<I, K, V>(&mut self, tag: &str, attrs: I) -> NodeId
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let attrs = attrs
            .into_iter()
            .map(|(name, value)| Attribute::new(name, value))
            .collect();
        self.create_node(NodeData::Element(ElementData::new(tag, attrs)))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.create_node(NodeData::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.create_node(NodeData::Comment(text.into()))
    }

    pub(crate) fn create_node(&mut self, data: NodeData) -> NodeId {
        self.nodes.insert(Node::new(data))
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` into `parent` before `reference`, or last when
    /// `reference` is `None`. A child that already has a parent is moved.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        let parent_node = self.nodes.get(parent).ok_or(DomError::UnknownNode)?;
        if !parent_node.can_have_children() {
            return Err(DomError::NotAContainer);
        }
        let child_node = self.nodes.get(child).ok_or(DomError::UnknownNode)?;
        // Only a node with children can be an ancestor of `parent`.
        let cycle = child == parent
            || (!child_node.children.is_empty() && self.contains(child, parent));
        if matches!(child_node.data, NodeData::Document) || cycle {
            return Err(DomError::HierarchyRequest);
        }
        if let Some(reference) = reference {
            if self.parent(reference) != Some(parent) {
                return Err(DomError::NotAChild);
            }
            if reference == child {
                return Ok(());
            }
        }

        self.detach(child);
        let index = reference
            .and_then(|reference| self.index_in_parent(reference))
            .unwrap_or_else(|| self.children(parent).len());
        self.link(parent, child, index);
        self.record(
            parent,
            MutationKind::ChildList {
                added: vec![child],
                removed: Vec::new(),
            },
        );
        Ok(())
    }

    pub fn insert_after(&mut self, reference: NodeId, child: NodeId) -> Result<(), DomError> {
        let parent = self.parent(reference).ok_or(DomError::NotAChild)?;
        let next = self.next_sibling(reference);
        if next == Some(child) {
            return Ok(());
        }
        self.insert_before(parent, child, next)
    }

    /// Detach `node` from its parent. The node stays alive and can be
    /// re-inserted; detaching an already detached node is a no-op.
    pub fn remove(&mut self, node: NodeId) -> Result<(), DomError> {
        if !self.exists(node) {
            return Err(DomError::UnknownNode);
        }
        if node == self.root {
            return Err(DomError::HierarchyRequest);
        }
        self.detach(node);
        Ok(())
    }

    /// Detach `node` and free its whole subtree. Handles to freed nodes
    /// stop resolving.
    pub fn discard(&mut self, node: NodeId) -> Result<(), DomError> {
        self.remove(node)?;
        let doomed: Vec<NodeId> = self.descendants(node).collect();
        if let Some(caret) = self.caret
            && doomed.contains(&caret.node)
        {
            self.caret = None;
        }
        for id in doomed {
            self.nodes.remove(id);
        }
        Ok(())
    }

    /// Detach every child of `parent`, returning them in order.
    pub fn remove_children(&mut self, parent: NodeId) -> Result<Vec<NodeId>, DomError> {
        let node = self.nodes.get_mut(parent).ok_or(DomError::UnknownNode)?;
        let removed = std::mem::take(&mut node.children);
        if removed.is_empty() {
            return Ok(removed);
        }
        for child in &removed {
            if let Some(child) = self.nodes.get_mut(*child) {
                child.parent = None;
            }
        }
        self.record(
            parent,
            MutationKind::ChildList {
                added: Vec::new(),
                removed: removed.clone(),
            },
        );
        Ok(removed)
    }

    /// Copy the subtree rooted at `node`. The copy is detached.
    pub fn deep_clone(&mut self, node: NodeId) -> Result<NodeId, DomError> {
        let data = self.nodes.get(node).ok_or(DomError::UnknownNode)?.data.clone();
        let copy = self.create_node(data);
        let mut pending = vec![(node, copy)];
        while let Some((source, target)) = pending.pop() {
            for (index, child) in self.children(source).to_vec().into_iter().enumerate() {
                let Some(data) = self.nodes.get(child).map(|node| node.data.clone()) else {
                    continue;
                };
                let child_copy = self.create_node(data);
                self.link(target, child_copy, index);
                pending.push((child, child_copy));
            }
        }
        Ok(copy)
    }

    /// Split a text node at a character offset; the tail becomes the next sibling.
    pub fn split_text(&mut self, node: NodeId, offset: usize) -> Result<NodeId, DomError> {
        let text = self
            .nodes
            .get(node)
            .ok_or(DomError::UnknownNode)?
            .text()
            .ok_or(DomError::NotAContainer)?;
        let length = text.chars().count();
        if offset > length {
            return Err(DomError::OffsetOutOfRange { offset, length });
        }
        let split_at = text
            .char_indices()
            .nth(offset)
            .map(|(index, _)| index)
            .unwrap_or(text.len());
        let tail = text[split_at..].to_string();
        let head = text[..split_at].to_string();

        self.replace_character_data(node, head);
        let tail = self.create_text(tail);
        if self.parent(node).is_some() {
            self.insert_after(node, tail)?;
        }
        Ok(tail)
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let element = self
            .nodes
            .get_mut(node)
            .ok_or(DomError::UnknownNode)?
            .element_mut()
            .ok_or(DomError::NotAnElement)?;
        if element.set_attr(name, value) {
            self.record(
                node,
                MutationKind::Attributes {
                    name: name.to_string(),
                },
            );
        }
        Ok(())
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<Option<String>, DomError> {
        let element = self
            .nodes
            .get_mut(node)
            .ok_or(DomError::UnknownNode)?
            .element_mut()
            .ok_or(DomError::NotAnElement)?;
        let removed = element.remove_attr(name);
        if removed.is_some() {
            self.record(
                node,
                MutationKind::Attributes {
                    name: name.to_string(),
                },
            );
        }
        Ok(removed)
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) -> Result<(), DomError> {
        let element = self.element(node).ok_or(DomError::NotAnElement)?;
        if element.has_class(class) {
            return Ok(());
        }
        let value = match element.attr("class").map(str::trim) {
            Some(existing) if !existing.is_empty() => format!("{existing} {class}"),
            _ => class.to_string(),
        };
        self.set_attribute(node, "class", &value)
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) -> Result<(), DomError> {
        let element = self.element(node).ok_or(DomError::NotAnElement)?;
        if !element.has_class(class) {
            return Ok(());
        }
        let remaining = element
            .classes()
            .filter(|existing| *existing != class)
            .collect::<Vec<_>>()
            .join(" ");
        if remaining.is_empty() {
            self.remove_attribute(node, "class").map(|_| ())
        } else {
            self.set_attribute(node, "class", &remaining)
        }
    }

    pub fn set_style_property(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let mut style = self.element(node).ok_or(DomError::NotAnElement)?.style();
        style.set(name, value);
        self.write_style(node, &style)
    }

    pub fn remove_style_property(&mut self, node: NodeId, name: &str) -> Result<(), DomError> {
        let mut style = self.element(node).ok_or(DomError::NotAnElement)?.style();
        if style.remove(name) {
            self.write_style(node, &style)?;
        }
        Ok(())
    }

    pub fn write_style(&mut self, node: NodeId, style: &InlineStyle) -> Result<(), DomError> {
        if style.is_empty() {
            self.remove_attribute(node, "style").map(|_| ())
        } else {
            self.set_attribute(node, "style", &style.to_string())
        }
    }

    /// Replace the text of a text/comment node, or the children of an
    /// element with a single text node.
    pub fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), DomError> {
        let character_data = match self.nodes.get(node).ok_or(DomError::UnknownNode)?.data {
            NodeData::Text(_) | NodeData::Comment(_) => true,
            NodeData::Element(_) => false,
            NodeData::Document => return Err(DomError::NotAnElement),
        };
        if character_data {
            self.replace_character_data(node, text.to_string());
            return Ok(());
        }

        if let [only] = self.children(node)
            && self.get(*only).and_then(Node::text) == Some(text)
        {
            return Ok(());
        }
        self.remove_children(node)?;
        if !text.is_empty() {
            let text_node = self.create_text(text);
            self.append_child(node, text_node)?;
        }
        Ok(())
    }

    /// Replace the children of `parent` with the parsed `markup`.
    pub fn set_inner_html(&mut self, parent: NodeId, markup: &str) -> Result<(), DomError> {
        if !self
            .nodes
            .get(parent)
            .ok_or(DomError::UnknownNode)?
            .can_have_children()
        {
            return Err(DomError::NotAContainer);
        }
        for child in self.remove_children(parent)? {
            self.discard(child)?;
        }
        for child in html::parse_fragment(self, markup) {
            self.append_child(parent, child)?;
        }
        Ok(())
    }

    /// Append text to an existing text node. Returns `false` for other nodes.
    pub(crate) fn push_text(&mut self, node: NodeId, text: &str) -> bool {
        match self.nodes.get_mut(node).map(|node| &mut node.data) {
            Some(NodeData::Text(existing)) => {
                existing.push_str(text);
                true
            }
            _ => false,
        }
    }

    pub fn caret(&self) -> Option<Caret> {
        self.caret.filter(|caret| self.exists(caret.node))
    }

    pub fn set_caret(&mut self, caret: Option<Caret>) {
        self.caret = caret;
    }

    /// Start queueing mutation records for changes at or below `target`.
    pub fn observe(&mut self, target: NodeId, options: ObserveOptions) -> ObserverId {
        self.observers.insert(Observer::new(target, options))
    }

    /// Drain every record queued for `observer`, oldest first.
    pub fn take_records(&mut self, observer: ObserverId) -> Vec<MutationRecord> {
        self.observers
            .get_mut(observer)
            .map(|observer| observer.pending.drain(..).collect())
            .unwrap_or_default()
    }

    pub fn pending_records(&self, observer: ObserverId) -> usize {
        self.observers
            .get(observer)
            .map_or(0, |observer| observer.pending.len())
    }

    pub fn disconnect(&mut self, observer: ObserverId) -> bool {
        self.observers.remove(observer).is_some()
    }

    fn replace_character_data(&mut self, node: NodeId, text: String) {
        let changed = match self.nodes.get_mut(node).map(|node| &mut node.data) {
            Some(NodeData::Text(existing)) | Some(NodeData::Comment(existing)) => {
                let changed = *existing != text;
                *existing = text;
                changed
            }
            _ => false,
        };
        if changed {
            self.record(node, MutationKind::CharacterData);
        }
    }

    fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.parent(child) else {
            return;
        };
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.children.retain(|existing| *existing != child);
        }
        if let Some(child_node) = self.nodes.get_mut(child) {
            child_node.parent = None;
        }
        self.record(
            parent,
            MutationKind::ChildList {
                added: Vec::new(),
                removed: vec![child],
            },
        );
    }

    fn link(&mut self, parent: NodeId, child: NodeId, index: usize) {
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            let index = index.min(parent_node.children.len());
            parent_node.children.insert(index, child);
        }
        if let Some(child_node) = self.nodes.get_mut(child) {
            child_node.parent = Some(parent);
        }
    }

    fn record(&mut self, target: NodeId, kind: MutationKind) {
        if self.observers.is_empty() {
            return;
        }
        let nodes = &self.nodes;
        for observer in self.observers.values_mut() {
            if !observer.wants(&kind) {
                continue;
            }
            let covered = observer.target == target
                || (observer.options.subtree && contains_in(nodes, observer.target, target));
            if covered {
                observer.pending.push_back(MutationRecord {
                    target,
                    kind: kind.clone(),
                });
            }
        }
    }
}

fn contains_in(nodes: &SlotMap<NodeId, Node>, ancestor: NodeId, node: NodeId) -> bool {
    let mut current = Some(node);
    while let Some(id) = current {
        if id == ancestor {
            return true;
        }
        current = nodes.get(id).and_then(Node::parent);
    }
    false
}

pub struct Ancestors<'a> {
    nodes: &'a SlotMap<NodeId, Node>,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.nodes.get(current).and_then(Node::parent);
        Some(current)
    }
}

pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(current).iter().rev().copied());
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editable(doc: &mut Document) -> NodeId {
        let root = doc.create_element("div", [("contenteditable", "true")]);
        doc.append_child(doc.root(), root).expect("attach root");
        root
    }

    #[test]
    fn insert_before_moves_existing_children() {
        let mut doc = Document::new();
        let root = editable(&mut doc);
        let a = doc.create_element("p", [("id", "a")]);
        let b = doc.create_element("p", [("id", "b")]);
        doc.append_child(root, a).unwrap();
        doc.append_child(root, b).unwrap();

        doc.insert_before(root, b, Some(a)).unwrap();

        assert_eq!(doc.children(root), &[b, a]);
        assert_eq!(doc.next_sibling(b), Some(a));
        assert_eq!(doc.previous_sibling(a), Some(b));
    }

    #[test]
    fn cannot_insert_a_node_into_its_own_subtree() {
        let mut doc = Document::new();
        let root = editable(&mut doc);
        let outer = doc.create_element("div", Vec::<(String, String)>::new());
        let inner = doc.create_element("span", Vec::<(String, String)>::new());
        doc.append_child(root, outer).unwrap();
        doc.append_child(outer, inner).unwrap();

        assert_eq!(
            doc.append_child(inner, outer),
            Err(DomError::HierarchyRequest)
        );
    }

    #[test]
    fn discarded_handles_stop_resolving() {
        let mut doc = Document::new();
        let root = editable(&mut doc);
        let figure = doc.create_element("figure", Vec::<(String, String)>::new());
        let img = doc.create_element("img", [("src", "a.png")]);
        doc.append_child(root, figure).unwrap();
        doc.append_child(figure, img).unwrap();

        doc.discard(figure).unwrap();

        assert!(!doc.exists(figure));
        assert!(!doc.exists(img));
        assert!(doc.children(root).is_empty());
        let replacement = doc.create_element("figure", Vec::<(String, String)>::new());
        assert_ne!(replacement, figure);
    }

    #[test]
    fn observers_only_see_changes_they_cover() {
        let mut doc = Document::new();
        let root = editable(&mut doc);
        let outside = doc.create_element("aside", Vec::<(String, String)>::new());
        doc.append_child(doc.root(), outside).unwrap();
        let observer = doc.observe(root, ObserveOptions::structure());

        let p = doc.create_element("p", Vec::<(String, String)>::new());
        doc.append_child(root, p).unwrap();
        let span = doc.create_element("span", Vec::<(String, String)>::new());
        doc.append_child(p, span).unwrap();
        let ignored = doc.create_element("span", Vec::<(String, String)>::new());
        doc.append_child(outside, ignored).unwrap();
        doc.set_attribute(p, "class", "lead").unwrap();

        let records = doc.take_records(observer);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].target, root);
        assert_eq!(records[0].added(), &[p]);
        assert_eq!(records[1].target, p);
        assert_eq!(records[1].added(), &[span]);
        assert_eq!(doc.pending_records(observer), 0);
    }

    #[test]
    fn attribute_and_text_changes_are_opt_in() {
        let mut doc = Document::new();
        let root = editable(&mut doc);
        let caption = doc.create_element("figcaption", Vec::<(String, String)>::new());
        let text = doc.create_text("A");
        doc.append_child(root, caption).unwrap();
        doc.append_child(caption, text).unwrap();
        let observer = doc.observe(
            root,
            ObserveOptions {
                attributes: true,
                character_data: true,
                subtree: true,
                ..ObserveOptions::default()
            },
        );

        doc.set_attribute(caption, "lang", "en").unwrap();
        doc.set_attribute(caption, "lang", "en").unwrap();
        doc.set_text(text, "B").unwrap();
        let ignored = doc.create_text("ignored");
        doc.append_child(root, ignored).unwrap();

        let kinds: Vec<_> = doc
            .take_records(observer)
            .into_iter()
            .map(|record| record.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                MutationKind::Attributes {
                    name: "lang".to_string()
                },
                MutationKind::CharacterData,
            ]
        );
    }

    #[test]
    fn moves_are_reported_as_removal_then_insertion() {
        let mut doc = Document::new();
        let root = editable(&mut doc);
        let first = doc.create_element("div", Vec::<(String, String)>::new());
        let second = doc.create_element("div", Vec::<(String, String)>::new());
        let img = doc.create_element("img", Vec::<(String, String)>::new());
        doc.append_child(root, first).unwrap();
        doc.append_child(root, second).unwrap();
        doc.append_child(first, img).unwrap();
        let observer = doc.observe(root, ObserveOptions::structure());

        doc.append_child(second, img).unwrap();

        let records = doc.take_records(observer);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].removed(), &[img]);
        assert_eq!(records[1].added(), &[img]);
    }

    #[test]
    fn class_and_style_helpers_rewrite_attributes() {
        let mut doc = Document::new();
        let img = doc.create_element("img", [("class", "a")]);

        doc.add_class(img, "b").unwrap();
        doc.add_class(img, "b").unwrap();
        doc.remove_class(img, "a").unwrap();
        doc.set_style_property(img, "width", "50%").unwrap();
        doc.set_style_property(img, "float", "left").unwrap();
        doc.remove_style_property(img, "width").unwrap();

        assert_eq!(doc.attr(img, "class"), Some("b"));
        assert_eq!(doc.attr(img, "style"), Some("float: left"));

        doc.remove_class(img, "b").unwrap();
        doc.remove_style_property(img, "float").unwrap();
        assert!(doc.element(img).unwrap().attrs().is_empty());
    }

    #[test]
    fn split_text_counts_characters() {
        let mut doc = Document::new();
        let root = editable(&mut doc);
        let p = doc.create_element("p", Vec::<(String, String)>::new());
        let text = doc.create_text("héllo");
        doc.append_child(root, p).unwrap();
        doc.append_child(p, text).unwrap();

        let tail = doc.split_text(text, 2).unwrap();

        assert_eq!(doc.get(text).and_then(Node::text), Some("hé"));
        assert_eq!(doc.get(tail).and_then(Node::text), Some("llo"));
        assert_eq!(doc.children(p), &[text, tail]);
        assert!(matches!(
            doc.split_text(text, 9),
            Err(DomError::OffsetOutOfRange { offset: 9, length: 2 })
        ));
    }

    #[test]
    fn deep_clone_copies_structure_detached() {
        let mut doc = Document::new();
        let root = editable(&mut doc);
        let figure = doc.create_element("figure", [("class", "figure-component")]);
        let caption = doc.create_element("figcaption", Vec::<(String, String)>::new());
        let text = doc.create_text("A");
        doc.append_child(root, figure).unwrap();
        doc.append_child(figure, caption).unwrap();
        doc.append_child(caption, text).unwrap();

        let copy = doc.deep_clone(figure).unwrap();

        assert_eq!(doc.parent(copy), None);
        assert!(!doc.is_connected(copy));
        assert_eq!(doc.text_content(copy), "A");
        assert_eq!(doc.outer_html(copy), doc.outer_html(figure));
    }

    #[test]
    fn deep_clone_handles_deep_nesting_and_keeps_sibling_order() {
        let mut doc = Document::new();
        let top = doc.create_element("span", Vec::<(String, String)>::new());
        let mut parent = top;
        for _ in 0..100_000 {
            let span = doc.create_element("span", Vec::<(String, String)>::new());
            doc.append_child(parent, span).unwrap();
            parent = span;
        }
        for label in ["a", "b", "c"] {
            let text = doc.create_text(label);
            doc.append_child(parent, text).unwrap();
        }

        let copy = doc.deep_clone(top).unwrap();

        assert_eq!(doc.descendants(copy).count(), doc.descendants(top).count());
        assert_eq!(doc.text_content(copy), "abc");
    }

    #[test]
    fn set_text_replaces_element_children() {
        let mut doc = Document::new();
        let cite = doc.create_element("cite", Vec::<(String, String)>::new());
        let em = doc.create_element("em", Vec::<(String, String)>::new());
        doc.append_child(cite, em).unwrap();

        doc.set_text(cite, "Ada").unwrap();

        assert_eq!(doc.text_content(cite), "Ada");
        assert_eq!(doc.children(cite).len(), 1);
    }
}
