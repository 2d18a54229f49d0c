pub mod components;
pub mod error;
pub mod ids;
pub mod properties;
