//! Granular DOM patches applied by component updates.
//!
//! An update is planned first (property validation and element lookup)
//! and applied second, so a rejected update never touches the document.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    application::error::EditorError,
    config::EditorSettings,
    domain::{
        components::{ComponentKind, classes},
        ids::ComponentId,
        properties::{
            ComparisonProps, FigureProps, GalleryColumns, GalleryProps, ImageLayout, ImageProps,
            ImageRef, LayoutProps, LayoutType, Properties, QuoteProps,
        },
    },
    infra::dom::{DomError, Document, NodeId},
};

use super::extract::{LEGACY_LAYOUT_CLASSES, find_class, image_element};

/// Inline style properties owned by the image layout patch.
const LAYOUT_STYLE_PROPERTIES: [&str; 7] = [
    "float",
    "display",
    "margin",
    "margin-left",
    "margin-right",
    "margin-top",
    "margin-bottom",
];

/// Partial update of an image's rendering. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ImagePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<ImageLayout>,
}

impl ImagePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn src(mut self, src: impl Into<String>) -> Self {
        self.src = Some(src.into());
        self
    }

    pub fn alt(mut self, alt: impl Into<String>) -> Self {
        self.alt = Some(alt.into());
        self
    }

    pub fn width(mut self, width: impl Into<String>) -> Self {
        self.width = Some(width.into());
        self
    }

    pub fn layout(mut self, layout: ImageLayout) -> Self {
        self.layout = Some(layout);
        self
    }
}

impl From<ImagePatch> for ImageProps {
    fn from(patch: ImagePatch) -> Self {
        ImageProps {
            src: patch.src,
            alt: patch.alt,
            width: patch.width,
            layout: patch.layout,
        }
    }
}

/// A validated update, bound to the nodes it will write.
#[derive(Debug)]
pub(crate) enum PatchPlan {
    Image { image: NodeId, props: ImageProps },
    Figure { node: NodeId, props: FigureProps },
    Quote { node: NodeId, props: QuoteProps },
    Comparison { node: NodeId, props: ComparisonProps },
    Gallery { node: NodeId, props: GalleryProps },
    Layout { node: NodeId, props: LayoutProps },
}

/// Validate `patch` against `kind` and locate what it will write to.
pub(crate) fn plan_update(
    doc: &Document,
    id: &ComponentId,
    node: NodeId,
    kind: ComponentKind,
    patch: &Properties,
) -> Result<PatchPlan, EditorError> {
    if let Some((key, _)) = patch.iter().find(|(_, value)| value.is_null()) {
        return Err(EditorError::invalid(
            kind,
            format!("`{key}` cannot be cleared with null"),
        ));
    }

    // A void element renders no content, so only attribute patches reach it.
    let void_tag = doc
        .element(node)
        .filter(|element| element.is_void())
        .map(|element| element.tag().to_string());
    let reject_content = |kind: ComponentKind| match &void_tag {
        Some(tag) => Err(EditorError::invalid(
            kind,
            format!("a <{tag}> component cannot hold child content"),
        )),
        None => Ok(()),
    };

    match kind {
        ComponentKind::Hero => Err(EditorError::Unpatchable { kind }),
        ComponentKind::Image => {
            let props: ImageProps = typed(kind, patch)?;
            plan_image(doc, id, node, props)
        }
        ComponentKind::Figure => {
            let props: FigureProps = typed(kind, patch)?;
            if props.caption.is_some() {
                reject_content(kind)?;
            }
            Ok(PatchPlan::Figure { node, props })
        }
        ComponentKind::Quote => {
            let props: QuoteProps = typed(kind, patch)?;
            reject_content(kind)?;
            Ok(PatchPlan::Quote { node, props })
        }
        ComponentKind::Comparison => {
            let props: ComparisonProps = typed(kind, patch)?;
            reject_content(kind)?;
            Ok(PatchPlan::Comparison { node, props })
        }
        ComponentKind::Gallery => {
            let props: GalleryProps = typed(kind, patch)?;
            reject_content(kind)?;
            if let Some(images) = &props.images {
                validate_image_refs(kind, images)?;
            }
            Ok(PatchPlan::Gallery { node, props })
        }
        ComponentKind::Layout => {
            let props: LayoutProps = typed(kind, patch)?;
            reject_content(kind)?;
            if let Some(images) = &props.images {
                validate_image_refs(kind, images)?;
            }
            Ok(PatchPlan::Layout { node, props })
        }
    }
}

/// Plan an image patch against the image element of any component.
pub(crate) fn plan_image(
    doc: &Document,
    id: &ComponentId,
    node: NodeId,
    props: ImageProps,
) -> Result<PatchPlan, EditorError> {
    if let Some(width) = &props.width {
        validate_css_value(ComponentKind::Image, "width", width)?;
    }
    if props.src.as_deref().is_some_and(|src| src.trim().is_empty()) {
        return Err(EditorError::invalid(
            ComponentKind::Image,
            "`src` must not be empty",
        ));
    }
    let image = image_element(doc, node).ok_or_else(|| EditorError::MissingImage { id: id.clone() })?;
    Ok(PatchPlan::Image { image, props })
}

fn typed<T: DeserializeOwned>(kind: ComponentKind, patch: &Properties) -> Result<T, EditorError> {
    patch.to_typed().map_err(|err| EditorError::invalid(kind, err))
}

fn validate_image_refs(kind: ComponentKind, images: &[ImageRef]) -> Result<(), EditorError> {
    match images.iter().position(|image| image.src.trim().is_empty()) {
        Some(index) => Err(EditorError::invalid(
            kind,
            format!("image {index} has an empty `src`"),
        )),
        None => Ok(()),
    }
}

pub(crate) fn validate_css_value(kind: ComponentKind, key: &str, value: &str) -> Result<(), EditorError> {
    if value.trim().is_empty() || value.contains([';', '{', '}', '"', '<', '>']) {
        return Err(EditorError::invalid(
            kind,
            format!("`{value}` is not a valid {key}"),
        ));
    }
    Ok(())
}

impl PatchPlan {
    pub(crate) fn apply(self, doc: &mut Document, settings: &EditorSettings) -> Result<(), DomError> {
        match self {
            PatchPlan::Image { image, props } => apply_image(doc, image, &props, &settings.float_gap),
            PatchPlan::Figure { node, props } => apply_figure(doc, node, &props),
            PatchPlan::Quote { node, props } => apply_quote(doc, node, &props),
            PatchPlan::Comparison { node, props } => apply_comparison(doc, node, &props),
            PatchPlan::Gallery { node, props } => apply_gallery(doc, node, &props),
            PatchPlan::Layout { node, props } => apply_layout(doc, node, &props),
        }
    }
}

pub(crate) fn apply_image(
    doc: &mut Document,
    img: NodeId,
    props: &ImageProps,
    float_gap: &str,
) -> Result<(), DomError> {
    if let Some(src) = &props.src {
        doc.set_attribute(img, "src", src)?;
    }
    if let Some(alt) = &props.alt {
        doc.set_attribute(img, "alt", alt)?;
    }
    if let Some(width) = &props.width {
        doc.remove_attribute(img, "width")?;
        doc.set_style_property(img, "width", width)?;
    }
    if let Some(layout) = props.layout {
        apply_image_layout(doc, img, layout, float_gap)?;
    }
    Ok(())
}

/// Reset every layout class and float/display/margin style, then apply
/// `layout`. Applying the same layout twice leaves the element unchanged.
pub(crate) fn apply_image_layout(
    doc: &mut Document,
    img: NodeId,
    layout: ImageLayout,
    float_gap: &str,
) -> Result<(), DomError> {
    let element = doc.element(img).ok_or(DomError::NotAnElement)?;

    let mut class_list: Vec<&str> = element
        .classes()
        .filter(|class| !is_image_layout_class(class))
        .collect();
    class_list.push(layout.class_name());
    let class_value = class_list.join(" ");

    let mut style = element.style();
    style.retain(|name, _| !LAYOUT_STYLE_PROPERTIES.contains(&name));
    match layout {
        ImageLayout::FloatLeft => {
            style.set("float", "left");
            style.set("margin-right", float_gap);
        }
        ImageLayout::FloatRight => {
            style.set("float", "right");
            style.set("margin-left", float_gap);
        }
        ImageLayout::Center => {
            style.set("display", "block");
            style.set("margin-left", "auto");
            style.set("margin-right", "auto");
        }
        ImageLayout::Inline | ImageLayout::Figure => {}
    }

    doc.set_attribute(img, "class", &class_value)?;
    doc.write_style(img, &style)
}

fn is_image_layout_class(class: &str) -> bool {
    ImageLayout::ALL
        .iter()
        .any(|layout| layout.class_name() == class)
        || LEGACY_LAYOUT_CLASSES
            .iter()
            .any(|(legacy, _)| *legacy == class)
}

fn apply_figure(doc: &mut Document, node: NodeId, props: &FigureProps) -> Result<(), DomError> {
    if props.src.is_some() || props.alt.is_some() {
        let img = match image_element(doc, node) {
            Some(img) => img,
            None => prepend_element(doc, node, "img", None)?,
        };
        if let Some(src) = &props.src {
            doc.set_attribute(img, "src", src)?;
        }
        if let Some(alt) = &props.alt {
            doc.set_attribute(img, "alt", alt)?;
        }
    }
    if let Some(caption) = &props.caption {
        let figcaption = match doc.find_descendant(node, |_, element| element.is("figcaption")) {
            Some(figcaption) => figcaption,
            None => append_element(doc, node, "figcaption", None)?,
        };
        doc.set_text(figcaption, caption)?;
    }
    Ok(())
}

fn apply_quote(doc: &mut Document, node: NodeId, props: &QuoteProps) -> Result<(), DomError> {
    if let Some(src) = &props.avatar_src {
        let avatar = match find_class(doc, node, classes::QUOTE_AVATAR)
            .or_else(|| doc.find_descendant(node, |_, element| element.is("img")))
        {
            Some(avatar) => avatar,
            None => prepend_element(doc, node, "img", Some(classes::QUOTE_AVATAR))?,
        };
        doc.set_attribute(avatar, "src", src)?;
    }

    let author = find_class(doc, node, classes::QUOTE_AUTHOR)
        .or_else(|| doc.find_descendant(node, |_, element| element.is("cite")));

    if let Some(text) = &props.quote {
        let quote = match find_class(doc, node, classes::QUOTE_TEXT)
            .or_else(|| doc.find_descendant(node, |_, element| element.is("blockquote")))
        {
            Some(quote) => quote,
            None => append_element(doc, node, "blockquote", Some(classes::QUOTE_TEXT))?,
        };
        // An avatar or cite nested in the quote survives the text replacement.
        let avatar = find_class(doc, node, classes::QUOTE_AVATAR)
            .or_else(|| doc.find_descendant(node, |_, element| element.is("img")));
        let nested_in_quote =
            |part: Option<NodeId>| part.filter(|part| *part != quote && doc.contains(quote, *part));
        let kept_author = nested_in_quote(author);
        let kept_avatar = nested_in_quote(avatar)
            .filter(|avatar| !kept_author.is_some_and(|author| doc.contains(author, *avatar)));
        for part in [kept_avatar, kept_author].into_iter().flatten() {
            doc.remove(part)?;
        }
        doc.set_text(quote, text)?;
        if let Some(avatar) = kept_avatar {
            let first = doc.first_child(quote);
            doc.insert_before(quote, avatar, first)?;
        }
        if let Some(author) = kept_author {
            doc.append_child(quote, author)?;
        }
    }

    if let Some(text) = &props.author {
        let author = match author {
            Some(author) => author,
            None => append_element(doc, node, "cite", Some(classes::QUOTE_AUTHOR))?,
        };
        doc.set_text(author, text)?;
    }
    Ok(())
}

fn apply_comparison(
    doc: &mut Document,
    node: NodeId,
    props: &ComparisonProps,
) -> Result<(), DomError> {
    let sides = [
        (
            classes::COMPARISON_BEFORE,
            classes::COMPARISON_LABEL_BEFORE,
            0,
            &props.before_image,
            &props.before_label,
        ),
        (
            classes::COMPARISON_AFTER,
            classes::COMPARISON_LABEL_AFTER,
            1,
            &props.after_image,
            &props.after_label,
        ),
    ];

    for (side_class, label_class, index, image, label) in sides {
        if let Some(src) = image {
            let img = match find_class(doc, node, side_class) {
                Some(side) => match image_element(doc, side) {
                    Some(img) => img,
                    None => prepend_element(doc, side, "img", None)?,
                },
                None => {
                    let loose = doc.find_descendants(node, |_, element| element.is("img"));
                    match loose.get(index) {
                        Some(img) => *img,
                        None => {
                            let side = comparison_side(doc, node, side_class, index)?;
                            append_element(doc, side, "img", None)?
                        }
                    }
                }
            };
            doc.set_attribute(img, "src", src)?;
        }
        if let Some(text) = label {
            let label = match find_class(doc, node, label_class) {
                Some(label) => label,
                None => {
                    let side = comparison_side(doc, node, side_class, index)?;
                    append_element(doc, side, "span", Some(label_class))?
                }
            };
            doc.set_text(label, text)?;
        }
    }
    Ok(())
}

fn comparison_side(
    doc: &mut Document,
    node: NodeId,
    side_class: &str,
    index: usize,
) -> Result<NodeId, DomError> {
    if let Some(side) = find_class(doc, node, side_class) {
        return Ok(side);
    }
    if index == 0 {
        prepend_element(doc, node, "div", Some(side_class))
    } else {
        append_element(doc, node, "div", Some(side_class))
    }
}

fn apply_gallery(doc: &mut Document, node: NodeId, props: &GalleryProps) -> Result<(), DomError> {
    if let Some(columns) = props.columns {
        replace_class(
            doc,
            node,
            |class| GalleryColumns::from_class(class).is_some(),
            &columns.class_name(),
        )?;
    }
    if let Some(images) = &props.images {
        for img in doc.find_descendants(node, |_, element| element.is("img")) {
            doc.discard(img)?;
        }
        append_images(doc, node, images)?;
    }
    Ok(())
}

fn apply_layout(doc: &mut Document, node: NodeId, props: &LayoutProps) -> Result<(), DomError> {
    if let Some(layout_type) = props.layout_type {
        replace_class(
            doc,
            node,
            |class| LayoutType::from_class(class).is_some(),
            layout_type.class_name(),
        )?;
    }
    if let Some(images) = &props.images {
        let column = match find_class(doc, node, classes::LAYOUT_IMAGES) {
            Some(column) => {
                for child in doc.children(column).to_vec() {
                    doc.discard(child)?;
                }
                column
            }
            None => {
                let text = find_class(doc, node, classes::LAYOUT_TEXT);
                let loose: Vec<NodeId> = doc
                    .find_descendants(node, |_, element| element.is("img"))
                    .into_iter()
                    .filter(|img| !text.is_some_and(|text| doc.contains(text, *img)))
                    .collect();
                for img in loose {
                    doc.discard(img)?;
                }
                prepend_element(doc, node, "div", Some(classes::LAYOUT_IMAGES))?
            }
        };
        append_images(doc, column, images)?;
    }
    if let Some(text) = &props.text {
        let column = match find_class(doc, node, classes::LAYOUT_TEXT) {
            Some(column) => column,
            None => append_element(doc, node, "div", Some(classes::LAYOUT_TEXT))?,
        };
        doc.set_inner_html(column, text)?;
    }
    Ok(())
}

fn append_images(doc: &mut Document, parent: NodeId, images: &[ImageRef]) -> Result<(), DomError> {
    for image in images {
        let img = doc.create_element(
            "img",
            [("src", image.src.as_str()), ("alt", image.alt.as_str())],
        );
        doc.append_child(parent, img)?;
    }
    Ok(())
}

/// Swap every class matching `is_old` for `new`, keeping the other classes in place.
fn replace_class(
    doc: &mut Document,
    node: NodeId,
    is_old: impl Fn(&str) -> bool,
    new: &str,
) -> Result<(), DomError> {
    let element = doc.element(node).ok_or(DomError::NotAnElement)?;
    let mut class_list: Vec<&str> = element.classes().filter(|class| !is_old(class)).collect();
    class_list.push(new);
    let value = class_list.join(" ");
    doc.set_attribute(node, "class", &value)
}

fn new_element(doc: &mut Document, tag: &str, class: Option<&str>) -> NodeId {
    match class {
        Some(class) => doc.create_element(tag, [("class", class)]),
        None => doc.create_element(tag, Vec::<(String, String)>::new()),
    }
}

fn prepend_element(
    doc: &mut Document,
    parent: NodeId,
    tag: &str,
    class: Option<&str>,
) -> Result<NodeId, DomError> {
    let element = new_element(doc, tag, class);
    let first = doc.first_child(parent);
    doc.insert_before(parent, element, first)?;
    Ok(element)
}

fn append_element(
    doc: &mut Document,
    parent: NodeId,
    tag: &str,
    class: Option<&str>,
) -> Result<NodeId, DomError> {
    let element = new_element(doc, tag, class);
    doc.append_child(parent, element)?;
    Ok(element)
}
