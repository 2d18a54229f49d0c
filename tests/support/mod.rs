use std::collections::BTreeSet;

use quire::application::editor::ComponentManager;

/// Every marked element under the root is tracked under the id it carries,
/// and every tracked component is marked with its own id.
pub fn assert_markers_match_registry(manager: &ComponentManager) {
    let doc = manager.document();
    let marker = manager.settings().marker_attribute.as_str();

    let marked: BTreeSet<(String, String)> = doc
        .find_descendants(manager.root(), |_, element| element.has_attr(marker))
        .into_iter()
        .map(|node| {
            let id = doc.attr(node, marker).unwrap_or_default().to_string();
            (id, doc.outer_html(node))
        })
        .collect();
    let tracked: BTreeSet<(String, String)> = manager
        .get_all()
        .iter()
        .map(|record| (record.id().to_string(), doc.outer_html(record.node())))
        .collect();

    assert_eq!(marked, tracked, "marked elements and registry diverged");
    for record in manager.get_all() {
        assert!(doc.contains(manager.root(), record.node()));
        assert_eq!(manager.get_by_node(record.node()), Some(record));
    }
}
