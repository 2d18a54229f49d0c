//! Component tracking for the rich content editor.
//!
//! A [`ComponentManager`] owns the document of one editing session. It
//! assigns every structured block (images, figures, galleries, layouts,
//! quotes, comparisons, hero sections) a stable id, applies property
//! patches to the markup and mirrors the root's markup into an output
//! field after each change.

mod bus;
mod extract;
mod factory;
mod global;
mod manager;
mod patch;
mod registry;
mod sync;
mod watcher;

pub use bus::{ChangeBus, ChangeKind, ComponentChange, ListenerId};
pub use extract::{classify, derive_image_layout, extract, extract_image};
pub use factory::InsertImageOptions;
pub use global::{GlobalAccessError, GlobalGuard, install_global, with_global};
pub use manager::ComponentManager;
pub use patch::ImagePatch;
pub use registry::{ComponentRecord, Registry};
pub use sync::{ContentSink, ContentSynchronizer, OutputField};
pub use watcher::{MutationBatch, MutationWatcher, Reconciliation};
