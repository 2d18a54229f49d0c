//! Component kinds recognised inside the editable surface and the markup
//! conventions that identify them.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Class names that mark a subtree as a component container.
pub mod classes {
    pub const LAYOUT: &str = "content-layout";
    pub const LAYOUT_IMAGES: &str = "layout-images";
    pub const LAYOUT_TEXT: &str = "layout-text";
    pub const GALLERY: &str = "image-gallery";
    pub const HERO: &str = "hero-section";
    pub const QUOTE: &str = "quote-block";
    pub const QUOTE_AVATAR: &str = "quote-avatar";
    pub const QUOTE_TEXT: &str = "quote-text";
    pub const QUOTE_AUTHOR: &str = "quote-author";
    pub const COMPARISON: &str = "image-comparison";
    pub const COMPARISON_BEFORE: &str = "comparison-before";
    pub const COMPARISON_AFTER: &str = "comparison-after";
    pub const COMPARISON_LABEL_BEFORE: &str = "comparison-label-before";
    pub const COMPARISON_LABEL_AFTER: &str = "comparison-label-after";
    pub const FIGURE: &str = "figure-component";
    pub const IMAGE_WRAPPER: &str = "image-component";

    /// Every class that turns an element into a component container.
    pub const CONTAINERS: [&str; 7] = [
        LAYOUT,
        GALLERY,
        HERO,
        QUOTE,
        COMPARISON,
        FIGURE,
        IMAGE_WRAPPER,
    ];
}

/// Closed set of component variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Image,
    Layout,
    Gallery,
    Figure,
    Quote,
    Comparison,
    Hero,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 7] = [
        ComponentKind::Image,
        ComponentKind::Layout,
        ComponentKind::Gallery,
        ComponentKind::Figure,
        ComponentKind::Quote,
        ComponentKind::Comparison,
        ComponentKind::Hero,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ComponentKind::Image => "image",
            ComponentKind::Layout => "layout",
            ComponentKind::Gallery => "gallery",
            ComponentKind::Figure => "figure",
            ComponentKind::Quote => "quote",
            ComponentKind::Comparison => "comparison",
            ComponentKind::Hero => "hero",
        }
    }

    /// Whether the engine knows how to derive this kind's properties from markup.
    pub fn has_extractor(self) -> bool {
        !matches!(self, ComponentKind::Hero)
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentKind {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ComponentKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| DomainError::unknown("component kind", value))
    }
}
