//! Construction and placement of new content inside the editable root.

use serde::{Deserialize, Serialize};

use crate::{
    config::EditorSettings,
    domain::{components::classes, properties::{ImageLayout, ImageProps}},
    infra::dom::{DomError, Document, NodeId},
};

use super::patch::apply_image;

/// Options for [`ComponentManager::insert_image`](super::ComponentManager::insert_image).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InsertImageOptions {
    /// Defaults to the session's configured image width.
    pub width: Option<String>,
    #[serde(default)]
    pub layout: ImageLayout,
}

impl InsertImageOptions {
    pub fn with_layout(layout: ImageLayout) -> Self {
        Self {
            layout,
            ..Self::default()
        }
    }
}

/// Where new top-level content goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InsertionPoint {
    /// Before the child at this index of the root.
    Index(usize),
    End,
}

/// Resolve the caret to a position among the root's children.
///
/// A caret inside a top-level block inserts after that block. A caret in a
/// text node directly under the root splits the text. Without a caret in
/// the root, content is appended.
pub(crate) fn insertion_point(doc: &mut Document, root: NodeId) -> Result<InsertionPoint, DomError> {
    let Some(caret) = doc.caret().filter(|caret| doc.contains(root, caret.node)) else {
        return Ok(InsertionPoint::End);
    };

    if caret.node == root {
        let count = doc.children(root).len();
        return Ok(if caret.offset >= count {
            InsertionPoint::End
        } else {
            InsertionPoint::Index(caret.offset)
        });
    }

    let block = std::iter::once(caret.node)
        .chain(doc.ancestors(caret.node))
        .find(|node| doc.parent(*node) == Some(root))
        .ok_or(DomError::NotAChild)?;
    let index = doc.index_in_parent(block).ok_or(DomError::NotAChild)?;

    let splits_text = block == caret.node && doc.get(block).and_then(|node| node.text()).is_some();
    if splits_text {
        let length = doc
            .get(block)
            .and_then(|node| node.text())
            .map_or(0, |text| text.chars().count());
        if caret.offset == 0 {
            return Ok(InsertionPoint::Index(index));
        }
        if caret.offset < length {
            doc.split_text(block, caret.offset)?;
        }
    }
    Ok(InsertionPoint::Index(index + 1))
}

/// Insert `nodes` in order at `point`. Returns the index after the last one.
pub(crate) fn insert_nodes(
    doc: &mut Document,
    root: NodeId,
    point: InsertionPoint,
    nodes: &[NodeId],
) -> Result<usize, DomError> {
    let mut index = match point {
        InsertionPoint::Index(index) => index,
        InsertionPoint::End => doc.children(root).len(),
    };
    for node in nodes {
        let reference = doc.children(root).get(index).copied();
        doc.insert_before(root, *node, reference)?;
        index += 1;
    }
    Ok(index)
}

/// Detached `<div class="image-component"><img></div>` with the layout applied.
pub(crate) fn build_image(
    doc: &mut Document,
    src: &str,
    alt: &str,
    options: &InsertImageOptions,
    settings: &EditorSettings,
) -> Result<NodeId, DomError> {
    let wrapper = doc.create_element("div", [("class", classes::IMAGE_WRAPPER)]);
    let img = doc.create_element("img", [("src", src), ("alt", alt)]);
    doc.append_child(wrapper, img)?;

    let width = options
        .width
        .clone()
        .unwrap_or_else(|| settings.default_image_width.clone());
    let props = ImageProps {
        width: Some(width),
        layout: Some(options.layout),
        ..ImageProps::default()
    };
    apply_image(doc, img, &props, &settings.float_gap)?;
    Ok(wrapper)
}

/// Detached `<p><br></p>` so typing can continue below inserted content.
pub(crate) fn build_trailing_paragraph(doc: &mut Document) -> Result<NodeId, DomError> {
    let paragraph = doc.create_element("p", Vec::<(String, String)>::new());
    let br = doc.create_element("br", Vec::<(String, String)>::new());
    doc.append_child(paragraph, br)?;
    Ok(paragraph)
}
