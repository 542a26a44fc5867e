//! kmodel mapper: converts raw documents into typed nodes and back.
//!
//! Conversion is driven entirely by the descriptors held in a
//! [`TypeRegistry`]; nested node types resolve within the version of the
//! enclosing type. Every operation is a pure function of its inputs.

#![forbid(unsafe_code)]

mod convert;
mod diff;
mod query;
mod text;

use std::sync::Arc;

use kmodel_core::{MapResult, RawDocument, TypeDescriptor, TypedNode, TypedValue};
use kmodel_schema::TypeRegistry;
use serde_json::Value;

pub use convert::to_raw;
pub use diff::{diff, summarize, DiffEntry, DiffKind, DiffSummary};
pub use query::{find_by_name, object_at_path, parse_path};

/// Per-call mapping switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapOptions {
    /// Match and emit wire (camelCase) keys. When off, keys are host names.
    pub translate: bool,
    /// Emit `null` for absent fields instead of omitting them.
    pub include_empty: bool,
}

impl Default for MapOptions {
    fn default() -> Self { Self { translate: true, include_empty: false } }
}

impl MapOptions {
    pub fn translate(mut self, on: bool) -> Self {
        self.translate = on;
        self
    }

    pub fn include_empty(mut self, on: bool) -> Self {
        self.include_empty = on;
        self
    }
}

/// Structural mapper bound to a type registry.
#[derive(Debug, Clone, Copy)]
pub struct Mapper<'r> {
    registry: &'r TypeRegistry,
    opts: MapOptions,
}

impl<'r> Mapper<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self { Self { registry, opts: MapOptions::default() } }

    pub fn with_options(registry: &'r TypeRegistry, opts: MapOptions) -> Self { Self { registry, opts } }

    pub fn registry(&self) -> &'r TypeRegistry { self.registry }
    pub fn options(&self) -> MapOptions { self.opts }

    /// Convert `doc` into an instance of `descriptor`.
    ///
    /// Optional fields that are missing (or `null`) read as absent, and an
    /// explicit `null` is remembered so [`Mapper::to_raw`] writes it back. A
    /// missing required field is an error. Keys the type does not declare are kept
    /// in the node's extras. Either the whole tree converts or nothing does.
    pub fn to_typed(&self, doc: &RawDocument, descriptor: &Arc<TypeDescriptor>) -> MapResult<TypedNode> {
        convert::to_typed(self.registry, doc, descriptor, self.opts)
    }

    /// [`Mapper::to_typed`] with the target named by `(version, type name)`.
    pub fn to_typed_as(&self, doc: &RawDocument, version: &str, name: &str) -> MapResult<TypedNode> {
        let descriptor = self.registry.get(version, name)?;
        self.to_typed(doc, &descriptor)
    }

    /// Convert a top-level document, resolving its type from `apiVersion`
    /// and `kind`.
    pub fn from_document(&self, doc: &RawDocument) -> MapResult<TypedNode> {
        convert::from_document(self.registry, doc, self.opts)
    }

    pub fn from_value(&self, value: &Value) -> MapResult<TypedNode> {
        convert::from_value(self.registry, value, self.opts)
    }

    pub fn to_raw(&self, node: &TypedNode) -> RawDocument { to_raw(node, self.opts) }

    pub fn to_value(&self, node: &TypedNode) -> Value { Value::Object(self.to_raw(node)) }

    /// Wire JSON for any typed value; absent reads as `null`.
    pub fn value_json(&self, value: &TypedValue) -> Value { convert::value_to_json(value, self.opts) }
}
