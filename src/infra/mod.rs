//! Infrastructure adapters: the document model, markup handling and
//! runtime bootstrap.

pub mod dom;
pub mod error;
pub mod html;
pub mod telemetry;
