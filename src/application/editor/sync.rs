//! Copies the editable root's markup into the host's output field.

use std::{cell::RefCell, rc::Rc};

use metrics::counter;
use tracing::trace;

use crate::infra::dom::{Document, NodeId};

const METRIC_CONTENT_SYNCS: &str = "quire_content_syncs_total";

/// Destination of the serialized content, typically a hidden form field.
pub trait ContentSink {
    fn write(&mut self, markup: &str);
}

/// Shared string cell standing in for a form field. Clones share the value,
/// so the host keeps one handle and gives another to the engine.
#[derive(Debug, Clone, Default)]
pub struct OutputField(Rc<RefCell<String>>);

impl OutputField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> String {
        self.0.borrow().clone()
    }
}

impl ContentSink for OutputField {
    fn write(&mut self, markup: &str) {
        let mut value = self.0.borrow_mut();
        value.clear();
        value.push_str(markup);
    }
}

impl<F> ContentSink for F
where
    F: FnMut(&str),
{
    fn write(&mut self, markup: &str) {
        self(markup)
    }
}

/// Full-copy synchronizer: no diffing, every sync rewrites the field.
pub struct ContentSynchronizer {
    sink: Box<dyn ContentSink>,
}

impl ContentSynchronizer {
    pub fn new(sink: impl ContentSink + 'static) -> Self {
        Self {
            sink: Box::new(sink),
        }
    }

    /// Write the current markup of `root` and return it.
    pub fn sync(&mut self, doc: &Document, root: NodeId) -> String {
        let markup = doc.inner_html(root);
        self.sink.write(&markup);
        counter!(METRIC_CONTENT_SYNCS).increment(1);
        trace!(bytes = markup.len(), "content synchronized");
        markup
    }
}

impl std::fmt::Debug for ContentSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentSynchronizer").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_field_clones_share_the_value() {
        let field = OutputField::new();
        let mut doc = Document::new();
        let root = doc.create_element("div", [("contenteditable", "true")]);
        let p = doc.create_element("p", Vec::<(String, String)>::new());
        doc.append_child(root, p).unwrap();

        let mut synchronizer = ContentSynchronizer::new(field.clone());
        let markup = synchronizer.sync(&doc, root);

        assert_eq!(markup, "<p></p>");
        assert_eq!(field.value(), "<p></p>");
    }

    #[test]
    fn closures_are_sinks() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let captured = Rc::clone(&seen);
        let mut doc = Document::new();
        let root = doc.create_element("div", Vec::<(String, String)>::new());

        let mut synchronizer =
            ContentSynchronizer::new(move |markup: &str| captured.borrow_mut().push(markup.to_string()));
        synchronizer.sync(&doc, root);
        synchronizer.sync(&doc, root);

        assert_eq!(seen.borrow().len(), 2);
    }
}
