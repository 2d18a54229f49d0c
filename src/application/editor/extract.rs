//! Derivation of a component's kind and properties from its current markup.
//!
//! Extraction never fails: a missing child simply leaves the matching
//! property out of the bag.

use crate::{
    domain::{
        components::{ComponentKind, classes},
        properties::{
            ComparisonProps, DEFAULT_AFTER_LABEL, DEFAULT_BEFORE_LABEL, FigureProps,
            GalleryColumns, GalleryProps, ImageLayout, ImageProps, ImageRef, LayoutProps,
            LayoutType, Properties, QuoteProps,
        },
    },
    infra::dom::{Document, ElementData, NodeId},
};

/// Older markup spelled layouts with these classes.
pub(crate) const LEGACY_LAYOUT_CLASSES: [(&str, ImageLayout); 6] = [
    ("float-left", ImageLayout::FloatLeft),
    ("align-left", ImageLayout::FloatLeft),
    ("float-right", ImageLayout::FloatRight),
    ("align-right", ImageLayout::FloatRight),
    ("center", ImageLayout::Center),
    ("align-center", ImageLayout::Center),
];

/// Kind of `element` by fixed precedence; anything unrecognised is an image.
pub fn classify(element: &ElementData) -> ComponentKind {
    if element.has_class(classes::LAYOUT) {
        ComponentKind::Layout
    } else if element.has_class(classes::GALLERY) {
        ComponentKind::Gallery
    } else if element.has_class(classes::HERO) {
        ComponentKind::Hero
    } else if element.has_class(classes::QUOTE) {
        ComponentKind::Quote
    } else if element.has_class(classes::COMPARISON) {
        ComponentKind::Comparison
    } else if element.has_class(classes::FIGURE) || element.is("figure") {
        ComponentKind::Figure
    } else {
        ComponentKind::Image
    }
}

/// Whether `element` starts a component of its own: a container class, a
/// `<figure>`, or an `<img>`.
pub fn is_component_root(element: &ElementData) -> bool {
    element.is("img")
        || element.is("figure")
        || classes::CONTAINERS
            .iter()
            .any(|class| element.has_class(class))
}

/// The `<img>` a component renders: the node itself or its first image descendant.
pub fn image_element(doc: &Document, node: NodeId) -> Option<NodeId> {
    if doc.is_tag(node, "img") {
        Some(node)
    } else {
        doc.find_descendant(node, |_, element| element.is("img"))
    }
}

pub fn extract(doc: &Document, node: NodeId, kind: ComponentKind) -> Properties {
    let typed = match kind {
        ComponentKind::Image => Properties::from_typed(&extract_image_component(doc, node)),
        ComponentKind::Figure => Properties::from_typed(&extract_figure(doc, node)),
        ComponentKind::Quote => Properties::from_typed(&extract_quote(doc, node)),
        ComponentKind::Comparison => Properties::from_typed(&extract_comparison(doc, node)),
        ComponentKind::Gallery => Properties::from_typed(&extract_gallery(doc, node)),
        ComponentKind::Layout => Properties::from_typed(&extract_layout(doc, node)),
        ComponentKind::Hero => return Properties::new(),
    };
    typed.unwrap_or_default()
}

fn extract_image_component(doc: &Document, node: NodeId) -> ImageProps {
    image_element(doc, node)
        .map(|img| extract_image(doc, img))
        .unwrap_or_default()
}

/// Properties of a single `<img>`, including the layout it currently shows.
pub fn extract_image(doc: &Document, img: NodeId) -> ImageProps {
    let Some(element) = doc.element(img) else {
        return ImageProps::default();
    };
    let width = element
        .style()
        .get("width")
        .map(str::to_string)
        .or_else(|| element.attr("width").map(str::to_string));

    ImageProps {
        src: element.attr("src").map(str::to_string),
        alt: element.attr("alt").map(str::to_string),
        width,
        layout: Some(derive_image_layout(doc, img)),
    }
}

/// Layout from layout classes, then inline float/centering styles, then
/// figure ancestry; inline otherwise.
pub fn derive_image_layout(doc: &Document, img: NodeId) -> ImageLayout {
    let Some(element) = doc.element(img) else {
        return ImageLayout::default();
    };

    let from_class = element.classes().find_map(|class| {
        ImageLayout::ALL
            .into_iter()
            .find(|layout| layout.class_name() == class)
            .or_else(|| {
                LEGACY_LAYOUT_CLASSES
                    .iter()
                    .find(|(legacy, _)| *legacy == class)
                    .map(|(_, layout)| *layout)
            })
    });
    if let Some(layout) = from_class {
        return layout;
    }

    let style = element.style();
    match style.get("float").map(str::to_ascii_lowercase).as_deref() {
        Some("left") => return ImageLayout::FloatLeft,
        Some("right") => return ImageLayout::FloatRight,
        _ => {}
    }
    let block = style.get("display") == Some("block");
    let auto_margins = style.get("margin-left") == Some("auto")
        && style.get("margin-right") == Some("auto");
    if block && auto_margins {
        return ImageLayout::Center;
    }

    let in_figure = doc.closest(img, |_, element| {
        element.is("figure") || element.has_class(classes::FIGURE)
    });
    if in_figure.is_some() {
        return ImageLayout::Figure;
    }
    ImageLayout::Inline
}

fn extract_figure(doc: &Document, node: NodeId) -> FigureProps {
    let img = image_element(doc, node);
    let caption = doc
        .find_descendant(node, |_, element| element.is("figcaption"))
        .map(|caption| doc.text_content(caption).trim().to_string());

    FigureProps {
        src: img.and_then(|img| doc.attr(img, "src")).map(str::to_string),
        alt: img.and_then(|img| doc.attr(img, "alt")).map(str::to_string),
        caption,
    }
}

fn extract_quote(doc: &Document, node: NodeId) -> QuoteProps {
    let avatar = find_class(doc, node, classes::QUOTE_AVATAR)
        .or_else(|| doc.find_descendant(node, |_, element| element.is("img")));
    let quote = find_class(doc, node, classes::QUOTE_TEXT)
        .or_else(|| doc.find_descendant(node, |_, element| element.is("blockquote")));
    let author = find_class(doc, node, classes::QUOTE_AUTHOR)
        .or_else(|| doc.find_descendant(node, |_, element| element.is("cite")));

    QuoteProps {
        avatar_src: avatar
            .and_then(|avatar| doc.attr(avatar, "src"))
            .map(str::to_string),
        quote: quote.map(|quote| trimmed_text(doc, quote, author)),
        author: author.map(|author| doc.text_content(author).trim().to_string()),
    }
}

/// Text of `node`, leaving out `exclude` when it is nested inside.
fn trimmed_text(doc: &Document, node: NodeId, exclude: Option<NodeId>) -> String {
    let nested = exclude.filter(|exclude| *exclude != node && doc.contains(node, *exclude));
    let text: String = doc
        .descendants(node)
        .filter(|candidate| !nested.is_some_and(|nested| doc.contains(nested, *candidate)))
        .filter_map(|candidate| doc.get(candidate).and_then(|n| n.text()))
        .collect();
    text.trim().to_string()
}

fn extract_comparison(doc: &Document, node: NodeId) -> ComparisonProps {
    let images = doc.find_descendants(node, |_, element| element.is("img"));
    let side_image = |class: &str, fallback: usize| {
        find_class(doc, node, class)
            .and_then(|side| image_element(doc, side))
            .or_else(|| images.get(fallback).copied())
            .and_then(|img| doc.attr(img, "src"))
            .map(str::to_string)
    };
    let label = |class: &str, default: &str| {
        find_class(doc, node, class)
            .map(|label| doc.text_content(label).trim().to_string())
            .filter(|label| !label.is_empty())
            .unwrap_or_else(|| default.to_string())
    };

    ComparisonProps {
        before_image: side_image(classes::COMPARISON_BEFORE, 0),
        after_image: side_image(classes::COMPARISON_AFTER, 1),
        before_label: Some(label(classes::COMPARISON_LABEL_BEFORE, DEFAULT_BEFORE_LABEL)),
        after_label: Some(label(classes::COMPARISON_LABEL_AFTER, DEFAULT_AFTER_LABEL)),
    }
}

fn extract_gallery(doc: &Document, node: NodeId) -> GalleryProps {
    let columns = doc
        .element(node)
        .and_then(|element| element.classes().find_map(GalleryColumns::from_class));

    GalleryProps {
        columns,
        images: Some(image_refs(doc, node)),
    }
}

fn extract_layout(doc: &Document, node: NodeId) -> LayoutProps {
    let layout_type = doc
        .element(node)
        .and_then(|element| element.classes().find_map(LayoutType::from_class));
    let text = find_class(doc, node, classes::LAYOUT_TEXT);
    let images = match find_class(doc, node, classes::LAYOUT_IMAGES) {
        Some(column) => image_refs(doc, column),
        None => doc
            .find_descendants(node, |_, element| element.is("img"))
            .into_iter()
            .filter(|img| !text.is_some_and(|text| doc.contains(text, *img)))
            .filter_map(|img| image_ref(doc, img))
            .collect(),
    };

    LayoutProps {
        layout_type,
        images: Some(images),
        text: text.map(|text| doc.inner_html(text)),
    }
}

fn image_refs(doc: &Document, node: NodeId) -> Vec<ImageRef> {
    doc.find_descendants(node, |_, element| element.is("img"))
        .into_iter()
        .filter_map(|img| image_ref(doc, img))
        .collect()
}

fn image_ref(doc: &Document, img: NodeId) -> Option<ImageRef> {
    let src = doc.attr(img, "src")?;
    Some(ImageRef::new(src, doc.attr(img, "alt").unwrap_or_default()))
}

pub(crate) fn find_class(doc: &Document, node: NodeId, class: &str) -> Option<NodeId> {
    doc.find_descendant(node, |_, element| element.has_class(class))
}
