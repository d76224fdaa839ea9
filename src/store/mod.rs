pub mod document;
pub mod registry;

pub use registry::{ProjectStore, SharedStore};
