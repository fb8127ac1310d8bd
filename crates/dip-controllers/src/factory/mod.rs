//! Controller construction

pub mod registry;

pub use registry::{ControllerMetadata, ControllerRegistry, REGISTRY_LOCK_TIMEOUT};
