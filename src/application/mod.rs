//! Editing services built on the document model.

pub mod editor;
pub mod error;
