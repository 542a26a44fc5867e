//! kmodel schema: version-scoped type registries and the built-in model catalog.

#![forbid(unsafe_code)]

pub mod builtin;
pub mod registry;

pub use builtin::{release, release_1_19, RELEASE_1_19};
pub use registry::{TypeRegistry, TypeRegistryBuilder};
