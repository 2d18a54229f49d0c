//! Property bags attached to components and the typed views used to
//! validate them per kind.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use super::error::DomainError;

/// Open mapping of property name to value. Its valid shape depends on the
/// owning component's kind; see the typed views below.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties(Map<String, Value>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Shallow merge: keys in `patch` win, a `null` value removes the key.
    pub fn merged(&self, patch: &Properties) -> Properties {
        let mut merged = self.0.clone();
        for (key, value) in &patch.0 {
            if value.is_null() {
                merged.remove(key);
            } else {
                merged.insert(key.clone(), value.clone());
            }
        }
        Properties(merged)
    }

    pub fn from_typed<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        match serde_json::to_value(value)? {
            Value::Object(map) => Ok(Properties(map)),
            Value::Null => Ok(Properties::default()),
            other => Err(serde::ser::Error::custom(format!(
                "expected an object of properties, found {other}"
            ))),
        }
    }

    pub fn to_typed<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.0.clone()))
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl<K, V> FromIterator<(K, V)> for Properties
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Properties(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// How an image sits in the surrounding text flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageLayout {
    #[default]
    Inline,
    FloatLeft,
    FloatRight,
    Center,
    Figure,
}

impl ImageLayout {
    pub const ALL: [ImageLayout; 5] = [
        ImageLayout::Inline,
        ImageLayout::FloatLeft,
        ImageLayout::FloatRight,
        ImageLayout::Center,
        ImageLayout::Figure,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ImageLayout::Inline => "inline",
            ImageLayout::FloatLeft => "float-left",
            ImageLayout::FloatRight => "float-right",
            ImageLayout::Center => "center",
            ImageLayout::Figure => "figure",
        }
    }

    /// Class applied to the `<img>` element for this layout.
    pub fn class_name(self) -> &'static str {
        match self {
            ImageLayout::Inline => "image-inline",
            ImageLayout::FloatLeft => "image-float-left",
            ImageLayout::FloatRight => "image-float-right",
            ImageLayout::Center => "image-center",
            ImageLayout::Figure => "image-figure",
        }
    }
}

impl fmt::Display for ImageLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageLayout {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ImageLayout::ALL
            .into_iter()
            .find(|layout| layout.as_str() == value.trim())
            .ok_or_else(|| DomainError::unknown("image layout", value))
    }
}

/// Arrangement of a layout block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutType {
    ImageLeft,
    ImageRight,
    #[serde(rename = "split-50-50")]
    Split5050,
    Custom,
}

impl LayoutType {
    pub const ALL: [LayoutType; 4] = [
        LayoutType::ImageLeft,
        LayoutType::ImageRight,
        LayoutType::Split5050,
        LayoutType::Custom,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LayoutType::ImageLeft => "image-left",
            LayoutType::ImageRight => "image-right",
            LayoutType::Split5050 => "split-50-50",
            LayoutType::Custom => "custom",
        }
    }

    pub fn class_name(self) -> &'static str {
        match self {
            LayoutType::ImageLeft => "layout-image-left",
            LayoutType::ImageRight => "layout-image-right",
            LayoutType::Split5050 => "layout-split-50-50",
            LayoutType::Custom => "layout-custom",
        }
    }

    pub fn from_class(class: &str) -> Option<Self> {
        LayoutType::ALL
            .into_iter()
            .find(|layout| layout.class_name() == class)
    }
}

impl fmt::Display for LayoutType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gallery column count; only two or three columns are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct GalleryColumns(u8);

impl GalleryColumns {
    pub const TWO: GalleryColumns = GalleryColumns(2);
    pub const THREE: GalleryColumns = GalleryColumns(3);

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn class_name(self) -> String {
        format!("gallery-columns-{}", self.0)
    }

    pub fn from_class(class: &str) -> Option<Self> {
        class
            .strip_prefix("gallery-columns-")
            .and_then(|count| count.parse::<u8>().ok())
            .and_then(|count| GalleryColumns::try_from(count).ok())
    }
}

impl TryFrom<u8> for GalleryColumns {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            2 | 3 => Ok(GalleryColumns(value)),
            other => Err(DomainError::validation(format!(
                "gallery columns must be 2 or 3, got {other}"
            ))),
        }
    }
}

impl From<GalleryColumns> for u8 {
    fn from(value: GalleryColumns) -> Self {
        value.0
    }
}

/// One image inside a gallery or layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageRef {
    pub src: String,
    #[serde(default)]
    pub alt: String,
}

impl ImageRef {
    pub fn new(src: impl Into<String>, alt: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            alt: alt.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ImageProps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<ImageLayout>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LayoutProps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout_type: Option<LayoutType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<ImageRef>>,
    /// Raw markup of the text column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GalleryProps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<GalleryColumns>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<ImageRef>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FigureProps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QuoteProps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_src: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

pub const DEFAULT_BEFORE_LABEL: &str = "Before";
pub const DEFAULT_AFTER_LABEL: &str = "After";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ComparisonProps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_label: Option<String>,
}
