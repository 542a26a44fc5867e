use kmodel_core::{MapResult, TypedNode};
use kmodel_mapper::{MapOptions, Mapper};
use kmodel_schema::TypeRegistry;
use serde_json::Value;

/// Turns a reply payload into a typed document.
pub trait Translate: Send + Sync {
    fn translate(&self, payload: &Value, translate_keys: bool) -> MapResult<TypedNode>;
}

/// Resolves payload types through a process-wide registry.
#[derive(Debug, Clone, Copy)]
pub struct RegistryTranslator {
    registry: &'static TypeRegistry,
}

impl RegistryTranslator {
    pub fn new(registry: &'static TypeRegistry) -> Self { Self { registry } }
}

impl Translate for RegistryTranslator {
    fn translate(&self, payload: &Value, translate_keys: bool) -> MapResult<TypedNode> {
        let opts = MapOptions::default().translate(translate_keys);
        Mapper::with_options(self.registry, opts).from_value(payload)
    }
}
