//! Version-scoped registry of type descriptors.
//!
//! A registry is assembled once from generated metadata and is read-only
//! afterwards. Top-level documents resolve through their `(group, version,
//! kind)` identity; every other type is addressed by `(version, name)`.

use std::sync::Arc;

use kmodel_core::{ApiIdentity, MapError, MapResult, RegistryError, RegistryResult, TypeDescriptor, TypedNode};
use rustc_hash::FxHashMap;
use tracing::{debug, info};

type IdentityKey = (String, String, String);

fn identity_key(group: &str, version: &str, kind: &str) -> IdentityKey {
    (group.to_string(), version.to_string(), kind.to_string())
}

#[derive(Debug, Default)]
pub struct TypeRegistry {
    versions: FxHashMap<String, FxHashMap<String, Arc<TypeDescriptor>>>,
    documents: FxHashMap<IdentityKey, Arc<TypeDescriptor>>,
}

impl TypeRegistry {
    pub fn builder() -> TypeRegistryBuilder { TypeRegistryBuilder::default() }

    pub fn descriptor(&self, version: &str, name: &str) -> Option<&Arc<TypeDescriptor>> {
        self.versions.get(version)?.get(name)
    }

    /// Descriptor for `(version, name)`, or `UnknownType`.
    pub fn get(&self, version: &str, name: &str) -> MapResult<Arc<TypeDescriptor>> {
        self.descriptor(version, name).cloned().ok_or_else(|| MapError::UnknownType {
            version: version.to_string(),
            name: name.to_string(),
        })
    }

    pub fn contains(&self, version: &str, name: &str) -> bool {
        self.descriptor(version, name).is_some()
    }

    /// Resolve the document type registered for `(group, version, kind)`.
    pub fn resolve(&self, group: &str, version: &str, kind: &str) -> MapResult<Arc<TypeDescriptor>> {
        match self.documents.get(&identity_key(group, version, kind)) {
            Some(d) => {
                debug!(group, version, kind, type_name = %d.name, "resolved document type");
                Ok(Arc::clone(d))
            }
            None => {
                let id = ApiIdentity { group: group.to_string(), version: version.to_string(), kind: kind.to_string() };
                Err(MapError::UnresolvableType { api_version: id.api_version(), kind: kind.to_string() })
            }
        }
    }

    /// Resolve from an `apiVersion` string as found in documents.
    pub fn resolve_api_version(&self, api_version: &str, kind: &str) -> MapResult<Arc<TypeDescriptor>> {
        let id = ApiIdentity::parse(api_version, kind);
        self.resolve(&id.group, &id.version, &id.kind)
    }

    /// Empty instance of a registered type.
    pub fn instantiate(&self, version: &str, name: &str) -> MapResult<TypedNode> {
        Ok(TypedNode::new(self.get(version, name)?))
    }

    /// Registered API versions, sorted.
    pub fn versions(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.versions.keys().map(|s| s.as_str()).collect();
        out.sort_unstable();
        out
    }

    /// Types of one version, sorted by name.
    pub fn types(&self, version: &str) -> RegistryResult<Vec<&Arc<TypeDescriptor>>> {
        let types = self.versions.get(version).ok_or_else(|| RegistryError::UnknownVersion(version.to_string()))?;
        let mut out: Vec<&Arc<TypeDescriptor>> = types.values().collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    /// Every resolvable document identity with its type, sorted by identity.
    pub fn documents(&self) -> Vec<(ApiIdentity, &Arc<TypeDescriptor>)> {
        let mut out: Vec<(ApiIdentity, &Arc<TypeDescriptor>)> = self
            .documents
            .iter()
            .map(|((g, v, k), d)| (ApiIdentity { group: g.clone(), version: v.clone(), kind: k.clone() }, d))
            .collect();
        out.sort_by(|a, b| a.0.to_string().cmp(&b.0.to_string()));
        out
    }

    pub fn len(&self) -> usize {
        self.versions.values().map(|t| t.len()).sum()
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

/// Collects descriptors and verifies them into a [`TypeRegistry`].
#[derive(Debug, Default)]
pub struct TypeRegistryBuilder {
    types: Vec<TypeDescriptor>,
    aliases: Vec<(ApiIdentity, String)>,
}

impl TypeRegistryBuilder {
    pub fn add(mut self, descriptor: TypeDescriptor) -> Self {
        self.types.push(descriptor);
        self
    }

    pub fn extend(mut self, descriptors: impl IntoIterator<Item = TypeDescriptor>) -> Self {
        self.types.extend(descriptors);
        self
    }

    /// Load descriptors from generated metadata: a JSON array of descriptors.
    pub fn extend_json(self, json: &str) -> RegistryResult<Self> {
        let loaded: Vec<TypeDescriptor> = serde_json::from_str(json)?;
        Ok(self.extend(loaded))
    }

    /// Resolve an additional document identity to an existing type of the
    /// same version (a kind served by two groups, like `extensions` and
    /// `networking.k8s.io` Ingress).
    pub fn alias(mut self, api_version: &str, kind: &str, type_name: &str) -> Self {
        self.aliases.push((ApiIdentity::parse(api_version, kind), type_name.to_string()));
        self
    }

    pub fn build(self) -> RegistryResult<TypeRegistry> {
        let mut versions: FxHashMap<String, FxHashMap<String, Arc<TypeDescriptor>>> = FxHashMap::default();
        for mut d in self.types {
            d.normalize();
            let by_name = versions.entry(d.version.clone()).or_default();
            if by_name.contains_key(&d.name) {
                return Err(RegistryError::DuplicateType { version: d.version, name: d.name });
            }
            by_name.insert(d.name.clone(), Arc::new(d));
        }

        // Nested references must resolve within the same version.
        for (version, by_name) in versions.iter() {
            for d in by_name.values() {
                for f in d.fields.iter() {
                    if let Some(target) = f.shape.referenced_type() {
                        if !by_name.contains_key(target) {
                            return Err(RegistryError::DanglingType {
                                version: version.clone(),
                                owner: d.name.clone(),
                                field: f.name.clone(),
                                target: target.to_string(),
                            });
                        }
                    }
                }
            }
        }

        let mut documents: FxHashMap<IdentityKey, Arc<TypeDescriptor>> = FxHashMap::default();
        let mut claim = |id: ApiIdentity, d: &Arc<TypeDescriptor>| -> RegistryResult<()> {
            let key = identity_key(&id.group, &id.version, &id.kind);
            if let Some(prev) = documents.get(&key) {
                return Err(RegistryError::DuplicateIdentity {
                    identity: id.to_string(),
                    first: prev.name.clone(),
                    second: d.name.clone(),
                });
            }
            documents.insert(key, Arc::clone(d));
            Ok(())
        };
        for by_name in versions.values() {
            for d in by_name.values() {
                if let Some(id) = d.identity() {
                    claim(id, d)?;
                }
            }
        }
        for (id, type_name) in self.aliases {
            let d = versions
                .get(&id.version)
                .and_then(|t| t.get(&type_name))
                .ok_or_else(|| RegistryError::DanglingType {
                    version: id.version.clone(),
                    owner: format!("alias {}", id),
                    field: "kind".to_string(),
                    target: type_name.clone(),
                })?
                .clone();
            claim(id, &d)?;
        }

        let registry = TypeRegistry { versions, documents };
        info!(versions = registry.versions.len(), types = registry.len(), documents = registry.documents.len(), "type registry built");
        Ok(registry)
    }
}
