//! Publish-time rewriting of editor markup.

use lol_html::{
    RewriteStrSettings, Selector, element,
    errors::{RewritingError, SelectorError},
    rewrite_str,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("invalid marker attribute `{attribute}`: {source}")]
    Selector {
        attribute: String,
        #[source]
        source: SelectorError,
    },
    #[error("failed to rewrite markup: {0}")]
    Rewrite(#[from] RewritingError),
}

/// Remove the engine's marker attribute from every element so the markup
/// can be published without editor bookkeeping.
pub fn strip_markers(markup: &str, marker_attribute: &str) -> Result<String, ExportError> {
    let selector = format!("[{marker_attribute}]");
    selector
        .parse::<Selector>()
        .map_err(|source| ExportError::Selector {
            attribute: marker_attribute.to_string(),
            source,
        })?;

    let rewritten = rewrite_str(
        markup,
        RewriteStrSettings {
            element_content_handlers: vec![element!(selector, |el| {
                el.remove_attribute(marker_attribute);
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )?;
    Ok(rewritten)
}
