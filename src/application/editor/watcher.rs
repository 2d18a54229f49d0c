//! Keeps the registry consistent with structural edits made outside the
//! engine's own operations.
//!
//! The document queues mutation records for the watcher's observer; the
//! host drains them once per render tick through
//! [`ComponentManager::flush_mutations`](super::ComponentManager::flush_mutations).
//! Between flushes, externally inserted nodes have no registry entry.

use tracing::{debug, trace};

use crate::{
    domain::{components::ComponentKind, ids::ComponentId},
    infra::dom::{DomError, Document, NodeId, ObserveOptions, ObserverId},
};

use super::{
    extract::{classify, extract, is_component_root},
    registry::Registry,
};

/// Structural changes drained from the observer queue in one go.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MutationBatch {
    pub records: usize,
    /// Inserted nodes, first occurrence order, without duplicates.
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
}

impl MutationBatch {
    pub fn is_empty(&self) -> bool {
        self.records == 0
    }
}

/// What a reconciliation pass changed in the registry.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub registered: Vec<ComponentId>,
    pub removed: Vec<ComponentId>,
    /// Marker attributes rewritten or stripped from the markup.
    pub markers_rewritten: usize,
}

impl Reconciliation {
    /// Whether the markup or the registry changed.
    pub fn changed(&self) -> bool {
        !self.registered.is_empty() || !self.removed.is_empty() || self.markers_rewritten > 0
    }
}

#[derive(Debug)]
pub struct MutationWatcher {
    observer: ObserverId,
}

impl MutationWatcher {
    /// Observe child-list changes anywhere below `root`. Attribute and text
    /// edits inside tracked components are not observed.
    pub fn attach(doc: &mut Document, root: NodeId) -> Self {
        let observer = doc.observe(root, ObserveOptions::structure());
        Self { observer }
    }

    pub fn pending(&self, doc: &Document) -> usize {
        doc.pending_records(self.observer)
    }

    pub fn take_batch(&self, doc: &mut Document) -> MutationBatch {
        let records = doc.take_records(self.observer);
        let mut batch = MutationBatch {
            records: records.len(),
            ..MutationBatch::default()
        };
        for record in &records {
            for node in record.added() {
                if !batch.added.contains(node) {
                    batch.added.push(*node);
                }
            }
            batch.removed.extend_from_slice(record.removed());
        }
        batch
    }

    pub fn disconnect(self, doc: &mut Document) -> bool {
        doc.disconnect(self.observer)
    }
}

/// Bring the registry in line with the document after `batch`.
///
/// Removals are swept rather than matched one by one: a record survives
/// exactly when its node is still inside the root, which also keeps nodes
/// that were moved within the same batch.
pub(crate) fn reconcile(
    doc: &mut Document,
    root: NodeId,
    registry: &mut Registry,
    marker_attribute: &str,
    batch: &MutationBatch,
) -> Result<Reconciliation, DomError> {
    let mut outcome = Reconciliation::default();
    if batch.is_empty() {
        return Ok(outcome);
    }

    for record in registry.remove_where(|record| !doc.contains(root, record.node())) {
        debug!(component_id = %record.id(), kind = %record.kind(), "component left the document");
        outcome.removed.push(record.id().clone());
    }

    let mut adopter = Adopter {
        doc,
        root,
        registry,
        marker_attribute,
        outcome: &mut outcome,
    };
    for node in &batch.added {
        if adopter.doc.contains(root, *node) {
            adopter.adopt(*node)?;
        }
    }
    adopter.restamp()?;

    Ok(outcome)
}

/// Register every top-level component at or below each child of `root`.
pub(crate) fn scan(
    doc: &mut Document,
    root: NodeId,
    registry: &mut Registry,
    marker_attribute: &str,
) -> Result<Reconciliation, DomError> {
    let mut outcome = Reconciliation::default();
    let mut adopter = Adopter {
        doc,
        root,
        registry,
        marker_attribute,
        outcome: &mut outcome,
    };
    for child in adopter.doc.children(root).to_vec() {
        adopter.walk(child)?;
    }
    Ok(outcome)
}

struct Adopter<'a> {
    doc: &'a mut Document,
    root: NodeId,
    registry: &'a mut Registry,
    marker_attribute: &'a str,
    outcome: &'a mut Reconciliation,
}

impl Adopter<'_> {
    fn adopt(&mut self, node: NodeId) -> Result<(), DomError> {
        if self.doc.element(node).is_none() {
            return Ok(());
        }
        let host = self
            .doc
            .ancestors(node)
            .take_while(|ancestor| *ancestor != self.root)
            .find(|ancestor| self.doc.element(*ancestor).is_some_and(is_component_root));
        match host {
            // Content added inside a component belongs to that component.
            Some(_) => self.strip_markers(node, true),
            None => self.walk(node),
        }
    }

    /// Pre-order walk that stops descending at component roots and at
    /// nodes that were registered explicitly. Any other marker is stale.
    fn walk(&mut self, start: NodeId) -> Result<(), DomError> {
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            let Some(element) = self.doc.element(current) else {
                continue;
            };
            if is_component_root(element) {
                let kind = classify(element);
                self.ensure_tracked(current, kind)?;
                self.strip_markers(current, false)?;
                continue;
            }
            if element.has_attr(self.marker_attribute) {
                if self
                    .registry
                    .tracked_at(self.doc, current, self.marker_attribute)
                    .is_some()
                {
                    self.strip_markers(current, false)?;
                    continue;
                }
                self.doc.remove_attribute(current, self.marker_attribute)?;
                trace!("dropped marker from a non-component element");
                self.outcome.markers_rewritten += 1;
            }
            stack.extend(self.doc.children(current).iter().rev().copied());
        }
        Ok(())
    }

    fn ensure_tracked(&mut self, node: NodeId, kind: ComponentKind) -> Result<(), DomError> {
        if self
            .registry
            .tracked_at(self.doc, node, self.marker_attribute)
            .is_some()
        {
            return Ok(());
        }
        let stale = self.doc.attr(node, self.marker_attribute).is_some();
        let properties = extract(self.doc, node, kind);
        let id = self
            .registry
            .track(self.doc, node, kind, properties, self.marker_attribute)?;
        trace!(component_id = %id, %kind, stale, "adopted component");
        if stale {
            self.outcome.markers_rewritten += 1;
        }
        self.outcome.registered.push(id);
        Ok(())
    }

    /// Remove markers below `node` (and on it when `inclusive`), dropping any
    /// record that pointed at a stripped node.
    fn strip_markers(&mut self, node: NodeId, inclusive: bool) -> Result<(), DomError> {
        let marked: Vec<NodeId> = self
            .doc
            .descendants(node)
            .skip(usize::from(!inclusive))
            .filter(|candidate| self.doc.attr(*candidate, self.marker_attribute).is_some())
            .collect();
        for nested in marked {
            if let Some(id) = self
                .registry
                .find_by_node(nested)
                .map(|record| record.id().clone())
            {
                self.registry.remove(&id);
                self.outcome.removed.push(id);
            }
            self.doc.remove_attribute(nested, self.marker_attribute)?;
            self.outcome.markers_rewritten += 1;
        }
        Ok(())
    }

    /// Put back markers that were edited away from tracked nodes.
    fn restamp(&mut self) -> Result<(), DomError> {
        let drifted: Vec<(NodeId, ComponentId)> = self
            .registry
            .iter()
            .filter(|record| {
                self.doc.attr(record.node(), self.marker_attribute) != Some(record.id().as_str())
            })
            .map(|record| (record.node(), record.id().clone()))
            .collect();
        for (node, id) in drifted {
            self.doc
                .set_attribute(node, self.marker_attribute, id.as_str())?;
            self.outcome.markers_rewritten += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::infra::html::parse_fragment;

    use super::*;

    const MARKER: &str = "data-component-id";

    fn session(markup: &str) -> (Document, NodeId, Registry) {
        let mut doc = Document::new();
        let root = doc.create_element("div", [("contenteditable", "true")]);
        let document_root = doc.root();
        doc.append_child(document_root, root).unwrap();
        doc.set_inner_html(root, markup).unwrap();
        (doc, root, Registry::new("cmp"))
    }

    #[test]
    fn scan_tracks_top_level_components_in_document_order() {
        let (mut doc, root, mut registry) = session(
            r#"<p>Intro <img src="inline.png"></p><figure><img src="a.png"><figcaption>A</figcaption></figure><div class="image-gallery"><img src="g.png"></div>"#,
        );

        let outcome = scan(&mut doc, root, &mut registry, MARKER).unwrap();

        let kinds: Vec<_> = registry.iter().map(|record| record.kind()).collect();
        assert_eq!(
            kinds,
            vec![ComponentKind::Image, ComponentKind::Figure, ComponentKind::Gallery]
        );
        assert_eq!(outcome.registered.len(), 3);
        assert!(outcome.removed.is_empty());
    }

    #[test]
    fn markers_from_another_session_are_replaced() {
        let (mut doc, root, mut registry) =
            session(r#"<figure data-component-id="cmp-old-7"><img src="a.png"></figure>"#);

        let outcome = scan(&mut doc, root, &mut registry, MARKER).unwrap();

        let figure = doc.first_child(root).unwrap();
        let record = registry.get(&outcome.registered[0]).unwrap();
        assert_ne!(record.id().as_str(), "cmp-old-7");
        assert_eq!(doc.attr(figure, MARKER), Some(record.id().as_str()));
        assert_eq!(outcome.markers_rewritten, 1);
    }

    #[test]
    fn nested_markers_are_stripped() {
        let (mut doc, root, mut registry) = session(
            r#"<div class="image-gallery"><img src="a.png" data-component-id="cmp-old-1"></div>"#,
        );

        scan(&mut doc, root, &mut registry, MARKER).unwrap();

        assert_eq!(registry.len(), 1);
        let img = doc
            .find_descendant(root, |_, element| element.is("img"))
            .unwrap();
        assert_eq!(doc.attr(img, MARKER), None);
    }

    #[test]
    fn batch_reconciles_insertions_and_removals() {
        let (mut doc, root, mut registry) =
            session(r#"<figure><img src="a.png"></figure><p>text</p>"#);
        scan(&mut doc, root, &mut registry, MARKER).unwrap();
        let watcher = MutationWatcher::attach(&mut doc, root);
        let old_figure = doc.first_child(root).unwrap();

        doc.discard(old_figure).unwrap();
        let pasted = parse_fragment(&mut doc, r#"<div class="quote-block"><blockquote>Hi</blockquote></div>"#);
        for node in pasted {
            doc.append_child(root, node).unwrap();
        }
        assert_eq!(watcher.pending(&doc), 2);

        let batch = watcher.take_batch(&mut doc);
        let outcome = reconcile(&mut doc, root, &mut registry, MARKER, &batch).unwrap();

        assert_eq!(outcome.removed.len(), 1);
        assert_eq!(outcome.registered.len(), 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.iter().next().map(|record| record.kind()),
            Some(ComponentKind::Quote)
        );
    }

    #[test]
    fn moved_components_keep_their_identity() {
        let (mut doc, root, mut registry) =
            session(r#"<p>one</p><figure><img src="a.png"></figure>"#);
        scan(&mut doc, root, &mut registry, MARKER).unwrap();
        let watcher = MutationWatcher::attach(&mut doc, root);
        let figure = doc.children(root)[1];
        let id = registry.find_by_node(figure).unwrap().id().clone();

        let first = doc.first_child(root);
        doc.insert_before(root, figure, first).unwrap();
        let batch = watcher.take_batch(&mut doc);
        let outcome = reconcile(&mut doc, root, &mut registry, MARKER, &batch).unwrap();

        assert!(!outcome.changed());
        assert_eq!(registry.find_by_node(figure).map(|record| record.id()), Some(&id));
    }

    #[test]
    fn images_added_inside_a_component_are_not_tracked() {
        let (mut doc, root, mut registry) = session(r#"<div class="image-gallery"></div>"#);
        scan(&mut doc, root, &mut registry, MARKER).unwrap();
        let watcher = MutationWatcher::attach(&mut doc, root);
        let gallery = doc.first_child(root).unwrap();

        let img = doc.create_element("img", [("src", "b.png"), (MARKER, "cmp-x-9")]);
        doc.append_child(gallery, img).unwrap();
        let batch = watcher.take_batch(&mut doc);
        let outcome = reconcile(&mut doc, root, &mut registry, MARKER, &batch).unwrap();

        assert!(outcome.registered.is_empty());
        assert_eq!(registry.len(), 1);
        assert_eq!(doc.attr(img, MARKER), None);
    }

    #[test]
    fn a_pasted_copy_gets_its_own_id() {
        let (mut doc, root, mut registry) = session(r#"<figure><img src="a.png"></figure>"#);
        scan(&mut doc, root, &mut registry, MARKER).unwrap();
        let watcher = MutationWatcher::attach(&mut doc, root);
        let figure = doc.first_child(root).unwrap();

        let copy = doc.deep_clone(figure).unwrap();
        doc.append_child(root, copy).unwrap();
        let batch = watcher.take_batch(&mut doc);
        let outcome = reconcile(&mut doc, root, &mut registry, MARKER, &batch).unwrap();

        assert_eq!(outcome.registered.len(), 1);
        assert_ne!(doc.attr(copy, MARKER), doc.attr(figure, MARKER));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn erased_markers_are_restored_on_the_next_flush() {
        let (mut doc, root, mut registry) = session(r#"<figure><img src="a.png"></figure>"#);
        scan(&mut doc, root, &mut registry, MARKER).unwrap();
        let watcher = MutationWatcher::attach(&mut doc, root);
        let figure = doc.first_child(root).unwrap();
        let id = registry.find_by_node(figure).unwrap().id().clone();

        doc.remove_attribute(figure, MARKER).unwrap();
        let p = doc.create_element("p", Vec::<(String, String)>::new());
        doc.append_child(root, p).unwrap();
        let batch = watcher.take_batch(&mut doc);
        reconcile(&mut doc, root, &mut registry, MARKER, &batch).unwrap();

        assert_eq!(doc.attr(figure, MARKER), Some(id.as_str()));
    }
}
