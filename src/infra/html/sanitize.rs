//! Cleaning of pasted markup before it reaches the editable surface.

use std::{borrow::Cow, collections::HashSet};

use ammonia::Builder as AmmoniaBuilder;

use crate::infra::dom::InlineStyle;

const ALLOWED_STYLE_PROPERTIES: [&str; 10] = [
    "width",
    "max-width",
    "float",
    "display",
    "margin",
    "margin-left",
    "margin-right",
    "margin-top",
    "margin-bottom",
    "text-align",
];

/// Ammonia policy for pasted content. Component classes and `data-*`
/// attributes survive; the engine's own marker never does, so pasted
/// copies of tracked components are picked up as new components.
pub struct PasteSanitizer {
    builder: AmmoniaBuilder<'static>,
}

impl PasteSanitizer {
    pub fn new(marker_attribute: &str) -> Self {
        Self {
            builder: build_paste_sanitizer(marker_attribute.to_string()),
        }
    }

    pub fn clean(&self, markup: &str) -> String {
        self.builder.clean(markup).to_string()
    }
}

impl std::fmt::Debug for PasteSanitizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasteSanitizer").finish_non_exhaustive()
    }
}

fn build_paste_sanitizer(marker_attribute: String) -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    let tags: HashSet<&'static str> = HashSet::from([
        "a",
        "b",
        "blockquote",
        "br",
        "cite",
        "code",
        "div",
        "em",
        "figcaption",
        "figure",
        "h2",
        "h3",
        "h4",
        "h5",
        "h6",
        "hr",
        "i",
        "img",
        "li",
        "ol",
        "p",
        "pre",
        "s",
        "section",
        "span",
        "strong",
        "sub",
        "sup",
        "u",
        "ul",
    ]);
    builder.tags(tags);

    let generic: HashSet<&'static str> = HashSet::from(["class", "title", "lang", "dir"]);
    builder.generic_attributes(generic);
    builder.add_generic_attribute_prefixes(&["data-"]);

    builder.add_tag_attributes("a", &["target"]);
    builder.add_tag_attributes("img", &["width", "height", "alt", "loading", "style"]);

    builder.attribute_filter(move |_element, attribute, value| {
        if attribute.eq_ignore_ascii_case(&marker_attribute) {
            None
        } else if attribute.eq_ignore_ascii_case("style") {
            sanitize_style_attribute(value).map(Cow::Owned)
        } else {
            Some(Cow::Borrowed(value))
        }
    });

    builder
}

fn sanitize_style_attribute(value: &str) -> Option<String> {
    let mut style = InlineStyle::parse(value);
    style.retain(|name, value| {
        ALLOWED_STYLE_PROPERTIES.contains(&name)
            && !value.to_ascii_lowercase().contains("expression")
            && !value.to_ascii_lowercase().contains("url(")
    });
    (!style.is_empty()).then(|| style.to_string())
}
