//! The component manager: the single owner of an editing session's
//! document, registry and output binding.

use metrics::{counter, gauge, histogram};
use tracing::{debug, info, instrument, warn};

use crate::{
    application::error::EditorError,
    config::EditorSettings,
    domain::{
        components::ComponentKind,
        ids::ComponentId,
        properties::{ImageProps, Properties},
    },
    infra::{
        dom::{Caret, DomError, Document, NodeId},
        html::{PasteSanitizer, parse_fragment, strip_markers},
    },
};

use super::{
    bus::{ChangeBus, ChangeKind, ComponentChange, ListenerId},
    extract::{classify, extract},
    factory::{self, InsertImageOptions},
    patch::{self, ImagePatch},
    registry::{ComponentRecord, Registry},
    sync::{ContentSink, ContentSynchronizer},
    watcher::{self, MutationWatcher, Reconciliation},
};

const METRIC_REGISTERED: &str = "quire_components_registered_total";
const METRIC_REMOVED: &str = "quire_components_removed_total";
const METRIC_UPDATES: &str = "quire_component_updates_total";
const METRIC_UPDATE_FAILURES: &str = "quire_component_update_failures_total";
const METRIC_TRACKED: &str = "quire_components_tracked";
const METRIC_MUTATION_BATCH: &str = "quire_mutation_batch_size";

/// Tracks the components of one editable root and keeps the output field
/// equal to the root's markup after every mutating call.
///
/// Stored properties are derived when a component is registered and then
/// changed only through [`update_component`](Self::update_component) and
/// [`update_image`](Self::update_image). Attribute or text edits made
/// directly on the document are not observed; call
/// [`refresh`](Self::refresh) to re-derive a component from its markup.
#[derive(Debug)]
pub struct ComponentManager {
    document: Document,
    root: NodeId,
    settings: EditorSettings,
    registry: Registry,
    watcher: MutationWatcher,
    synchronizer: ContentSynchronizer,
    bus: ChangeBus,
    sanitizer: PasteSanitizer,
}

impl ComponentManager {
    /// Bind to `root` inside `document`, seed the registry from the
    /// existing markup and write the initial content to `sink`.
    pub fn init(
        mut document: Document,
        root: NodeId,
        sink: impl ContentSink + 'static,
        settings: EditorSettings,
    ) -> Result<Self, EditorError> {
        if document.element(root).is_none() || !document.is_connected(root) {
            return Err(EditorError::RootDetached);
        }

        let mut registry = Registry::new(&settings.id_prefix);
        let scanned = watcher::scan(
            &mut document,
            root,
            &mut registry,
            &settings.marker_attribute,
        )?;
        let watcher = MutationWatcher::attach(&mut document, root);
        let sanitizer = PasteSanitizer::new(&settings.marker_attribute);

        let mut manager = Self {
            document,
            root,
            settings,
            registry,
            watcher,
            synchronizer: ContentSynchronizer::new(sink),
            bus: ChangeBus::new(),
            sanitizer,
        };
        manager.record_registered(scanned.registered.len());
        manager.sync();

        info!(
            components = manager.registry.len(),
            markers_rewritten = scanned.markers_rewritten,
            "editing session started"
        );
        Ok(manager)
    }

    /// Start a session over a fresh document whose editable root holds `markup`.
    pub fn new_session(
        markup: &str,
        sink: impl ContentSink + 'static,
        settings: EditorSettings,
    ) -> Result<Self, EditorError> {
        let mut document = Document::new();
        let root = document.create_element("div", [("contenteditable", "true")]);
        let document_root = document.root();
        document.append_child(document_root, root)?;
        document.set_inner_html(root, markup)?;
        Self::init(document, root, sink, settings)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Raw access for edits the engine does not perform itself (typing,
    /// drag and drop, scripts). Structural changes are picked up by the
    /// next [`flush_mutations`](Self::flush_mutations).
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    /// Current markup of the editable root.
    pub fn content(&self) -> String {
        self.document.inner_html(self.root)
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn get(&self, id: &ComponentId) -> Option<&ComponentRecord> {
        self.registry.get(id)
    }

    /// Record for `node`, looked up through its marker attribute.
    pub fn get_by_node(&self, node: NodeId) -> Option<&ComponentRecord> {
        self.registry
            .tracked_at(&self.document, node, &self.settings.marker_attribute)
    }

    pub fn get_all_by_type(&self, kind: ComponentKind) -> Vec<&ComponentRecord> {
        self.registry.of_kind(kind).collect()
    }

    /// Every record, in registration order.
    pub fn get_all(&self) -> Vec<&ComponentRecord> {
        self.registry.iter().collect()
    }

    /// Track `node` as the component its classes say it is. Registering a
    /// node that is already tracked returns its existing id.
    pub fn register(&mut self, node: NodeId) -> Result<ComponentId, EditorError> {
        let kind = classify(self.document.element(node).ok_or(DomError::NotAnElement)?);
        self.register_as(node, kind)
    }

    /// Track a bare `<img>` that has no component container.
    pub fn register_image(&mut self, node: NodeId) -> Result<ComponentId, EditorError> {
        if !self.document.is_tag(node, "img") {
            return Err(EditorError::NotAnImage);
        }
        self.register_as(node, ComponentKind::Image)
    }

    fn register_as(&mut self, node: NodeId, kind: ComponentKind) -> Result<ComponentId, EditorError> {
        if node == self.root || !self.document.contains(self.root, node) {
            return Err(EditorError::OutsideRoot);
        }
        if let Some(existing) = self.get_by_node(node) {
            return Ok(existing.id().clone());
        }

        let properties = extract(&self.document, node, kind);
        let id = self.registry.track(
            &mut self.document,
            node,
            kind,
            properties,
            &self.settings.marker_attribute,
        )?;
        self.record_registered(1);
        debug!(component_id = %id, %kind, "component registered");

        self.sync();
        self.notify(ChangeKind::Registered, &id);
        Ok(id)
    }

    /// Merge `patch` into the component's properties and patch its markup.
    ///
    /// The patch is validated against the component's kind before anything
    /// is written; a rejected patch leaves the document, the stored
    /// properties and the output field untouched.
    #[instrument(level = "debug", skip(self, id, patch), fields(component_id = %id))]
    pub fn update_component(
        &mut self,
        id: &ComponentId,
        patch: Properties,
    ) -> Result<(), EditorError> {
        let result = self.try_update_component(id, &patch);
        self.finish_update(id, "update_component", result)
    }

    fn try_update_component(
        &mut self,
        id: &ComponentId,
        patch: &Properties,
    ) -> Result<ComponentKind, EditorError> {
        let (node, kind) = self.resolve(id)?;
        let plan = patch::plan_update(&self.document, id, node, kind, patch)?;
        plan.apply(&mut self.document, &self.settings)?;

        let merged = self.stored_properties(id).merged(patch);
        self.registry.set_properties(id, merged);
        Ok(kind)
    }

    /// Patch the image element of a component: the node itself for bare
    /// images, its first `<img>` descendant for containers.
    #[instrument(level = "debug", skip(self, id, patch), fields(component_id = %id))]
    pub fn update_image(&mut self, id: &ComponentId, patch: ImagePatch) -> Result<(), EditorError> {
        let result = self.try_update_image(id, patch);
        self.finish_update(id, "update_image", result)
    }

    fn try_update_image(
        &mut self,
        id: &ComponentId,
        patch: ImagePatch,
    ) -> Result<ComponentKind, EditorError> {
        let (node, kind) = self.resolve(id)?;
        let props = ImageProps::from(patch);
        let stored = Properties::from_typed(&props).map_err(|err| EditorError::invalid(kind, err))?;
        let plan = patch::plan_image(&self.document, id, node, props)?;
        plan.apply(&mut self.document, &self.settings)?;

        let current = self.stored_properties(id);
        let properties = match kind {
            ComponentKind::Image => current.merged(&stored),
            ComponentKind::Hero => current,
            other => current.merged(&extract(&self.document, node, other)),
        };
        self.registry.set_properties(id, properties);
        Ok(kind)
    }

    fn finish_update(
        &mut self,
        id: &ComponentId,
        op: &'static str,
        result: Result<ComponentKind, EditorError>,
    ) -> Result<(), EditorError> {
        match result {
            Ok(kind) => {
                counter!(METRIC_UPDATES, "kind" => kind.as_str()).increment(1);
                debug!(component_id = %id, %kind, op, "component updated");
                self.sync();
                self.notify(ChangeKind::Updated, id);
                Ok(())
            }
            Err(err) => {
                counter!(METRIC_UPDATE_FAILURES).increment(1);
                warn!(component_id = %id, op, error = %err, "component update rejected");
                Err(err)
            }
        }
    }

    /// Insert a new image component at the caret, or at the end when the
    /// caret is not inside the root. An empty paragraph follows it and
    /// receives the caret.
    pub fn insert_image(
        &mut self,
        src: &str,
        alt: &str,
        options: InsertImageOptions,
    ) -> Result<ComponentId, EditorError> {
        if src.trim().is_empty() {
            return Err(EditorError::invalid(
                ComponentKind::Image,
                "`src` must not be empty",
            ));
        }
        if let Some(width) = &options.width {
            patch::validate_css_value(ComponentKind::Image, "width", width)?;
        }
        self.ensure_root_attached()?;

        let point = factory::insertion_point(&mut self.document, self.root)?;
        let wrapper = factory::build_image(&mut self.document, src, alt, &options, &self.settings)?;
        let mut nodes = vec![wrapper];
        let trailing = if self.settings.trailing_paragraph {
            let paragraph = factory::build_trailing_paragraph(&mut self.document)?;
            nodes.push(paragraph);
            Some(paragraph)
        } else {
            None
        };
        let after = factory::insert_nodes(&mut self.document, self.root, point, &nodes)?;

        let properties = extract(&self.document, wrapper, ComponentKind::Image);
        let id = self.registry.track(
            &mut self.document,
            wrapper,
            ComponentKind::Image,
            properties,
            &self.settings.marker_attribute,
        )?;
        let caret = match trailing {
            Some(paragraph) => Caret::new(paragraph, 0),
            None => Caret::new(self.root, after),
        };
        self.document.set_caret(Some(caret));
        self.record_registered(1);
        debug!(component_id = %id, layout = %options.layout, "image inserted");

        self.sync();
        self.notify(ChangeKind::Inserted, &id);
        Ok(id)
    }

    /// Clone a component right after itself under a fresh id. The copy
    /// starts with a shallow copy of the source's properties.
    pub fn duplicate_component(&mut self, id: &ComponentId) -> Result<ComponentId, EditorError> {
        let (node, kind) = self.resolve(id)?;
        let properties = self.stored_properties(id);

        let copy = self.document.deep_clone(node)?;
        let marked: Vec<NodeId> = self
            .document
            .descendants(copy)
            .filter(|candidate| {
                self.document
                    .attr(*candidate, &self.settings.marker_attribute)
                    .is_some()
            })
            .collect();
        for marked in marked {
            self.document
                .remove_attribute(marked, &self.settings.marker_attribute)?;
        }
        self.document.insert_after(node, copy)?;

        let copy_id = self.registry.track(
            &mut self.document,
            copy,
            kind,
            properties,
            &self.settings.marker_attribute,
        )?;
        self.record_registered(1);
        debug!(source = %id, component_id = %copy_id, %kind, "component duplicated");

        self.sync();
        self.notify(ChangeKind::Duplicated, &copy_id);
        Ok(copy_id)
    }

    /// Delete a component's node from the document and forget it.
    pub fn remove_component(&mut self, id: &ComponentId) -> Result<(), EditorError> {
        let (node, kind) = self.resolve(id)?;
        self.document.discard(node)?;
        let Some(record) = self.registry.remove(id) else {
            return Err(EditorError::unknown(id));
        };
        counter!(METRIC_REMOVED).increment(1);
        self.update_tracked_gauge();
        debug!(component_id = %id, %kind, "component removed");

        self.sync();
        self.bus.emit(&ComponentChange {
            kind: ChangeKind::Removed,
            id: record.id(),
            record: &record,
        });
        Ok(())
    }

    /// Re-derive a component's properties from its current markup. Returns
    /// whether the stored properties changed. Kinds without an extractor
    /// keep their properties.
    pub fn refresh(&mut self, id: &ComponentId) -> Result<bool, EditorError> {
        let (node, kind) = self.resolve(id)?;
        if !kind.has_extractor() {
            return Ok(false);
        }
        let extracted = extract(&self.document, node, kind);
        if self.stored_properties(id) == extracted {
            return Ok(false);
        }
        self.registry.set_properties(id, extracted);
        debug!(component_id = %id, %kind, "component refreshed from markup");
        self.notify(ChangeKind::Updated, id);
        Ok(true)
    }

    /// Sanitize `markup` and insert it at the caret. Components inside it
    /// are registered by the next [`flush_mutations`](Self::flush_mutations).
    pub fn paste_html(&mut self, markup: &str) -> Result<Vec<NodeId>, EditorError> {
        self.ensure_root_attached()?;
        let cleaned = self.sanitizer.clean(markup);
        let point = factory::insertion_point(&mut self.document, self.root)?;
        let nodes = parse_fragment(&mut self.document, &cleaned);
        if nodes.is_empty() {
            return Ok(nodes);
        }
        let after = factory::insert_nodes(&mut self.document, self.root, point, &nodes)?;
        self.document.set_caret(Some(Caret::new(self.root, after)));
        debug!(nodes = nodes.len(), "markup pasted");

        self.sync();
        Ok(nodes)
    }

    /// Markup for publishing: the content without engine marker attributes.
    pub fn export_markup(&self) -> Result<String, EditorError> {
        let exported = strip_markers(&self.content(), &self.settings.marker_attribute)?;
        Ok(exported)
    }

    /// Copy the root's markup into the output field and return it.
    pub fn sync(&mut self) -> String {
        self.synchronizer.sync(&self.document, self.root)
    }

    /// Drain queued structural changes and reconcile the registry with them.
    /// Hosts call this once per render tick.
    pub fn flush_mutations(&mut self) -> Result<Reconciliation, EditorError> {
        self.ensure_root_attached()?;
        let batch = self.watcher.take_batch(&mut self.document);
        if batch.is_empty() {
            return Ok(Reconciliation::default());
        }
        histogram!(METRIC_MUTATION_BATCH).record(batch.records as f64);

        let outcome = watcher::reconcile(
            &mut self.document,
            self.root,
            &mut self.registry,
            &self.settings.marker_attribute,
            &batch,
        )?;
        if !outcome.removed.is_empty() {
            counter!(METRIC_REMOVED).increment(outcome.removed.len() as u64);
        }
        self.record_registered(outcome.registered.len());
        if outcome.changed() {
            self.sync();
        }
        debug!(
            records = batch.records,
            registered = outcome.registered.len(),
            removed = outcome.removed.len(),
            markers_rewritten = outcome.markers_rewritten,
            "mutation batch reconciled"
        );
        Ok(outcome)
    }

    /// Call `listener` after every successful mutating operation.
    ///
    /// Listeners receive the change by reference and cannot reach the
    /// manager through it. A listener that reaches it anyway (through a
    /// shared `RefCell` or [`with_global`](super::with_global)) finds it
    /// borrowed; its edit is not applied.
    pub fn on_change(
        &mut self,
        listener: impl FnMut(&ComponentChange<'_>) + 'static,
    ) -> ListenerId {
        self.bus.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, listener: ListenerId) -> bool {
        self.bus.unsubscribe(listener)
    }

    /// End the session and hand the document back to the host.
    pub fn into_document(mut self) -> Document {
        self.watcher.disconnect(&mut self.document);
        info!(components = self.registry.len(), "editing session closed");
        self.document
    }

    fn resolve(&self, id: &ComponentId) -> Result<(NodeId, ComponentKind), EditorError> {
        let record = self.registry.get(id).ok_or_else(|| EditorError::unknown(id))?;
        if !self.document.contains(self.root, record.node()) {
            return Err(EditorError::detached(id));
        }
        Ok((record.node(), record.kind()))
    }

    fn stored_properties(&self, id: &ComponentId) -> Properties {
        self.registry
            .get(id)
            .map(|record| record.properties().clone())
            .unwrap_or_default()
    }

    fn ensure_root_attached(&self) -> Result<(), EditorError> {
        if self.document.is_connected(self.root) {
            Ok(())
        } else {
            Err(EditorError::RootDetached)
        }
    }

    fn notify(&mut self, kind: ChangeKind, id: &ComponentId) {
        if let Some(record) = self.registry.get(id) {
            self.bus.emit(&ComponentChange {
                kind,
                id: record.id(),
                record,
            });
        }
    }

    fn record_registered(&self, count: usize) {
        if count > 0 {
            counter!(METRIC_REGISTERED).increment(count as u64);
        }
        self.update_tracked_gauge();
    }

    fn update_tracked_gauge(&self) {
        gauge!(METRIC_TRACKED).set(self.registry.len() as f64);
    }
}
