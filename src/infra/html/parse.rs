//! An html5ever tree sink that parses markup straight into a [`Document`].

use std::{
    borrow::Cow,
    cell::{Ref, RefCell},
    collections::HashMap,
};

use html5ever::{
    LocalName, Namespace, ParseOpts, QualName,
    tendril::{StrTendril, TendrilSink},
    tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeBuilderOpts, TreeSink},
};
use tracing::trace;

use crate::infra::dom::{Attribute, DomError, Document, ElementData, NodeData, NodeId};

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Parse `markup` as body content. Returns the top-level nodes, detached
/// and in document order, ready to be inserted wherever the caller wants.
pub fn parse_fragment(doc: &mut Document, markup: &str) -> Vec<NodeId> {
    let scaffold = doc.create_node(NodeData::Document);
    let sink = FragmentSink::new(doc, scaffold);
    let opts = ParseOpts {
        tree_builder: TreeBuilderOpts {
            scripting_enabled: false,
            drop_doctype: true,
            ..Default::default()
        },
        ..Default::default()
    };

    // An explicit <body> keeps leading <style>/<meta> content in the body
    // instead of letting the tree builder hoist it into <head>.
    let parsed = html5ever::parse_document(sink, opts).one(format!("<!DOCTYPE html><body>{markup}"));
    if !parsed.errors.is_empty() {
        trace!(
            count = parsed.errors.len(),
            first = %parsed.errors[0],
            "recovered from markup parse errors"
        );
    }

    let body = doc.find_descendant(parsed.scaffold, |_, element| element.is("body"));
    let nodes = body
        .map(|body| doc.children(body).to_vec())
        .unwrap_or_default();
    for node in &nodes {
        note(doc.remove(*node));
    }
    note(doc.discard(parsed.scaffold));
    nodes
}

struct ParsedFragment {
    scaffold: NodeId,
    errors: Vec<Cow<'static, str>>,
}

struct FragmentSink<'doc> {
    doc: RefCell<&'doc mut Document>,
    scaffold: NodeId,
    names: RefCell<HashMap<NodeId, QualName>>,
    fallback_name: QualName,
    errors: RefCell<Vec<Cow<'static, str>>>,
}

impl<'doc> FragmentSink<'doc> {
    fn new(doc: &'doc mut Document, scaffold: NodeId) -> Self {
        Self {
            doc: RefCell::new(doc),
            scaffold,
            names: RefCell::new(HashMap::new()),
            fallback_name: QualName::new(
                None,
                Namespace::from(HTML_NAMESPACE),
                LocalName::from("div"),
            ),
            errors: RefCell::new(Vec::new()),
        }
    }
}

fn convert_attribute(attr: html5ever::Attribute) -> Attribute {
    let name = match &attr.name.prefix {
        Some(prefix) => format!("{}:{}", prefix, attr.name.local),
        None => attr.name.local.to_string(),
    };
    Attribute::new(name, attr.value.to_string())
}

fn note(result: Result<(), DomError>) {
    if let Err(err) = result {
        trace!(error = %err, "tree builder operation ignored");
    }
}

impl<'doc> TreeSink for FragmentSink<'doc> {
    type Output = ParsedFragment;

    type Handle = NodeId;

    type ElemName<'a>
        = Ref<'a, QualName>
    where
        Self: 'a;

    fn finish(self) -> Self::Output {
        ParsedFragment {
            scaffold: self.scaffold,
            errors: self.errors.into_inner(),
        }
    }

    fn parse_error(&self, msg: Cow<'static, str>) {
        self.errors.borrow_mut().push(msg);
    }

    fn get_document(&self) -> Self::Handle {
        self.scaffold
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> Self::ElemName<'a> {
        self.names
            .borrow_mut()
            .entry(*target)
            .or_insert_with(|| self.fallback_name.clone());
        Ref::map(self.names.borrow(), |names| &names[target])
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<html5ever::Attribute>,
        _flags: ElementFlags,
    ) -> Self::Handle {
        let attrs = attrs.into_iter().map(convert_attribute).collect();
        let element = ElementData::new(&*name.local, attrs);
        let id = self
            .doc
            .borrow_mut()
            .create_node(NodeData::Element(element));
        self.names.borrow_mut().insert(id, name);
        id
    }

    fn create_comment(&self, text: StrTendril) -> Self::Handle {
        self.doc.borrow_mut().create_comment(text.to_string())
    }

    fn create_pi(&self, _target: StrTendril, data: StrTendril) -> Self::Handle {
        self.doc.borrow_mut().create_comment(data.to_string())
    }

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        let mut doc = self.doc.borrow_mut();
        match child {
            NodeOrText::AppendNode(node) => note(doc.append_child(*parent, node)),
            // Adjacent text merges into the previous text node.
            NodeOrText::AppendText(text) => {
                let last = doc.children(*parent).last().copied();
                let merged = last.is_some_and(|last| doc.push_text(last, &text));
                if !merged {
                    let text = doc.create_text(text.to_string());
                    note(doc.append_child(*parent, text));
                }
            }
        }
    }

    fn append_before_sibling(&self, sibling: &Self::Handle, new_node: NodeOrText<Self::Handle>) {
        let mut doc = self.doc.borrow_mut();
        let Some(parent) = doc.parent(*sibling) else {
            return;
        };
        match new_node {
            NodeOrText::AppendNode(node) => note(doc.insert_before(parent, node, Some(*sibling))),
            NodeOrText::AppendText(text) => {
                let previous = doc.previous_sibling(*sibling);
                let merged = previous.is_some_and(|previous| doc.push_text(previous, &text));
                if !merged {
                    let text = doc.create_text(text.to_string());
                    note(doc.insert_before(parent, text, Some(*sibling)));
                }
            }
        }
    }

    fn append_based_on_parent_node(
        &self,
        element: &Self::Handle,
        prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    ) {
        let has_parent = self.doc.borrow().parent(*element).is_some();
        if has_parent {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_doctype_to_document(
        &self,
        _name: StrTendril,
        _public_id: StrTendril,
        _system_id: StrTendril,
    ) {
    }

    fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle {
        *target
    }

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool {
        x == y
    }

    fn set_quirks_mode(&self, _mode: QuirksMode) {}

    fn add_attrs_if_missing(&self, target: &Self::Handle, attrs: Vec<html5ever::Attribute>) {
        let mut doc = self.doc.borrow_mut();
        for attr in attrs.into_iter().map(convert_attribute) {
            if doc.attr(*target, &attr.name).is_none() {
                note(doc.set_attribute(*target, &attr.name, &attr.value));
            }
        }
    }

    fn remove_from_parent(&self, target: &Self::Handle) {
        note(self.doc.borrow_mut().remove(*target));
    }

    fn reparent_children(&self, node: &Self::Handle, new_parent: &Self::Handle) {
        let mut doc = self.doc.borrow_mut();
        let children = doc.children(*node).to_vec();
        for child in children {
            note(doc.append_child(*new_parent, child));
        }
    }
}
