//! Session-scoped index of tracked components.

use std::collections::HashMap;

use serde::Serialize;

use crate::{
    domain::{
        components::ComponentKind,
        ids::{ComponentId, IdAllocator},
        properties::Properties,
    },
    infra::dom::{DomError, Document, NodeId},
};

/// One tracked component: identity, kind, stored properties and the node
/// that renders it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentRecord {
    id: ComponentId,
    kind: ComponentKind,
    properties: Properties,
    #[serde(skip)]
    node: NodeId,
}

impl ComponentRecord {
    pub(crate) fn new(
        id: ComponentId,
        kind: ComponentKind,
        properties: Properties,
        node: NodeId,
    ) -> Self {
        Self {
            id,
            kind,
            properties,
            node,
        }
    }

    pub fn id(&self) -> &ComponentId {
        &self.id
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Node the component renders into. The association is non-owning and
    /// may point at a detached or freed node until the next reconciliation.
    pub fn node(&self) -> NodeId {
        self.node
    }
}

/// Id → record mapping with registration order preserved for listing.
#[derive(Debug)]
pub struct Registry {
    records: HashMap<ComponentId, ComponentRecord>,
    order: Vec<ComponentId>,
    ids: IdAllocator,
}

impl Registry {
    pub fn new(id_prefix: &str) -> Self {
        Self {
            records: HashMap::new(),
            order: Vec::new(),
            ids: IdAllocator::new(id_prefix),
        }
    }

    /// Mint an id that has never been handed out in this session.
    pub fn allocate_id(&mut self) -> ComponentId {
        self.ids.allocate()
    }

    pub fn insert(&mut self, record: ComponentRecord) -> &ComponentRecord {
        let id = record.id.clone();
        if self.records.insert(id.clone(), record).is_none() {
            self.order.push(id.clone());
        }
        &self.records[&id]
    }

    pub fn get(&self, id: &ComponentId) -> Option<&ComponentRecord> {
        self.records.get(id)
    }

    /// Stamp `node` with a fresh id and start tracking it.
    pub(crate) fn track(
        &mut self,
        doc: &mut Document,
        node: NodeId,
        kind: ComponentKind,
        properties: Properties,
        marker_attribute: &str,
    ) -> Result<ComponentId, DomError> {
        let id = self.allocate_id();
        doc.set_attribute(node, marker_attribute, id.as_str())?;
        self.insert(ComponentRecord::new(id.clone(), kind, properties, node));
        Ok(id)
    }

    /// Record the marker on `node` points at, provided that record really
    /// belongs to `node`. Copied or stale markers resolve to nothing.
    pub fn tracked_at(
        &self,
        doc: &Document,
        node: NodeId,
        marker_attribute: &str,
    ) -> Option<&ComponentRecord> {
        let id = doc.attr(node, marker_attribute)?;
        self.records.get(id).filter(|record| record.node == node)
    }

    /// Record whose node is exactly `node`, if any.
    pub fn find_by_node(&self, node: NodeId) -> Option<&ComponentRecord> {
        self.iter().find(|record| record.node == node)
    }

    pub(crate) fn set_properties(&mut self, id: &ComponentId, properties: Properties) -> bool {
        match self.records.get_mut(id) {
            Some(record) => {
                record.properties = properties;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &ComponentId) -> Option<ComponentRecord> {
        let record = self.records.remove(id)?;
        self.order.retain(|existing| existing != id);
        Some(record)
    }

    /// Drop every record matching `reject`, returning them in registration order.
    pub fn remove_where(
        &mut self,
        mut reject: impl FnMut(&ComponentRecord) -> bool,
    ) -> Vec<ComponentRecord> {
        let doomed: Vec<ComponentId> = self
            .iter()
            .filter(|record| reject(record))
            .map(|record| record.id.clone())
            .collect();
        doomed.iter().filter_map(|id| self.remove(id)).collect()
    }

    /// Records in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentRecord> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    pub fn of_kind(&self, kind: ComponentKind) -> impl Iterator<Item = &ComponentRecord> {
        self.iter().filter(move |record| record.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn ids_issued(&self) -> u64 {
        self.ids.issued()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use crate::infra::dom::Document;

    use super::*;

    fn record(registry: &mut Registry, doc: &mut Document, kind: ComponentKind) -> ComponentId {
        let node = doc.create_element("div", Vec::<(String, String)>::new());
        let id = registry.allocate_id();
        registry.insert(ComponentRecord::new(id.clone(), kind, Properties::new(), node));
        id
    }

    #[test]
    fn iteration_follows_registration_order() {
        let mut doc = Document::new();
        let mut registry = Registry::new("cmp");
        let first = record(&mut registry, &mut doc, ComponentKind::Figure);
        let second = record(&mut registry, &mut doc, ComponentKind::Image);
        let third = record(&mut registry, &mut doc, ComponentKind::Figure);

        let ids: Vec<_> = registry.iter().map(|r| r.id().clone()).collect();
        assert_eq!(ids, vec![first.clone(), second, third.clone()]);

        let figures: Vec<_> = registry
            .of_kind(ComponentKind::Figure)
            .map(|r| r.id().clone())
            .collect();
        assert_eq!(figures, vec![first, third]);
    }

    #[test]
    fn removed_ids_are_never_reissued() {
        let mut doc = Document::new();
        let mut registry = Registry::new("cmp");
        let mut seen = HashSet::new();
        for _ in 0..50 {
            let id = record(&mut registry, &mut doc, ComponentKind::Image);
            registry.remove(&id);
            assert!(seen.insert(id));
        }
        assert!(registry.is_empty());
        assert_eq!(registry.ids_issued(), 50);
    }

    #[test]
    fn remove_where_keeps_order_of_survivors() {
        let mut doc = Document::new();
        let mut registry = Registry::new("cmp");
        let a = record(&mut registry, &mut doc, ComponentKind::Quote);
        let b = record(&mut registry, &mut doc, ComponentKind::Image);
        let c = record(&mut registry, &mut doc, ComponentKind::Quote);

        let removed = registry.remove_where(|r| r.kind() == ComponentKind::Image);

        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].id(), &b);
        let ids: Vec<_> = registry.iter().map(|r| r.id().clone()).collect();
        assert_eq!(ids, vec![a, c]);
    }

    #[test]
    fn serializes_without_the_node_handle() {
        let mut doc = Document::new();
        let node = doc.create_element("figure", Vec::<(String, String)>::new());
        let record = ComponentRecord::new(
            ComponentId::from("cmp-1"),
            ComponentKind::Figure,
            [("caption", "A")].into_iter().collect(),
            node,
        );

        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"id": "cmp-1", "kind": "figure", "properties": {"caption": "A"}})
        );
    }
}
