//! kmodel watch: which resource kinds support watches, per release and API
//! version, and whether watching them requires a namespace.
//!
//! Tables are built on first use and never change afterwards.

#![forbid(unsafe_code)]

mod tables;

use kmodel_core::{RegistryError, RegistryResult};
use kmodel_schema::{TypeRegistry, RELEASE_1_19};
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::debug;

use tables::Row;

/// Types behind one watchable kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WatchEntry {
    /// `None` when only the list can be watched.
    pub item_type: Option<&'static str>,
    pub list_type: &'static str,
}

/// Answer to a lookup by kind name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WatchCapability {
    pub kind: &'static str,
    pub item_type: Option<&'static str>,
    pub list_type: &'static str,
    pub namespace_required: bool,
}

#[derive(Debug)]
pub struct WatchRegistry {
    release: &'static str,
    version: &'static str,
    all: FxHashMap<&'static str, WatchEntry>,
    namespaced: FxHashMap<&'static str, WatchEntry>,
}

fn table(rows: &[Row]) -> FxHashMap<&'static str, WatchEntry> {
    rows.iter().map(|&(kind, item_type, list_type)| (kind, WatchEntry { item_type, list_type })).collect()
}

static REL_1_19_V1BETA1: Lazy<WatchRegistry> = Lazy::new(|| {
    WatchRegistry::new(RELEASE_1_19, "v1beta1", tables::REL_1_19_V1BETA1_ALL, tables::REL_1_19_V1BETA1_NAMESPACED)
});

static REL_1_19_V1: Lazy<WatchRegistry> = Lazy::new(|| {
    WatchRegistry::new(RELEASE_1_19, "v1", tables::REL_1_19_V1_ALL, tables::REL_1_19_V1_NAMESPACED)
});

impl WatchRegistry {
    fn new(release: &'static str, version: &'static str, all: &[Row], namespaced: &[Row]) -> Self {
        Self { release, version, all: table(all), namespaced: table(namespaced) }
    }

    /// Registry for `(release, version)`, if one is defined.
    pub fn for_version(release: &str, version: &str) -> Option<&'static WatchRegistry> {
        match (release, version) {
            (RELEASE_1_19, "v1beta1") => Some(&*REL_1_19_V1BETA1),
            (RELEASE_1_19, "v1") => Some(&*REL_1_19_V1),
            _ => None,
        }
    }

    /// Every defined registry, ordered by release then version.
    pub fn all() -> [&'static WatchRegistry; 2] { [&*REL_1_19_V1, &*REL_1_19_V1BETA1] }

    pub fn release(&self) -> &'static str { self.release }
    pub fn version(&self) -> &'static str { self.version }

    /// Capability for a kind. A list type name (`PodList`) finds its kind.
    pub fn lookup(&self, kind: &str) -> Option<WatchCapability> {
        let (kind, entry) = match self.all.get_key_value(kind) {
            Some((k, e)) => (*k, *e),
            None => {
                let base = kind.strip_suffix("List")?;
                let (k, e) = self.all.get_key_value(base)?;
                if e.list_type != kind {
                    return None;
                }
                (*k, *e)
            }
        };
        Some(WatchCapability {
            kind,
            item_type: entry.item_type,
            list_type: entry.list_type,
            namespace_required: self.namespaced.contains_key(kind),
        })
    }

    pub fn watchable(&self, kind: &str) -> bool { self.lookup(kind).is_some() }

    pub fn namespaced(&self, kind: &str) -> bool { self.lookup(kind).is_some_and(|c| c.namespace_required) }

    /// Watchable kinds, sorted.
    pub fn kinds(&self) -> Vec<&'static str> {
        let mut out: Vec<&'static str> = self.all.keys().copied().collect();
        out.sort_unstable();
        out
    }

    /// Capabilities of every watchable kind, sorted by kind.
    pub fn capabilities(&self) -> Vec<WatchCapability> {
        self.kinds().into_iter().filter_map(|k| self.lookup(k)).collect()
    }

    /// Check the tables against a type registry: every item and list type
    /// exists in this version, and every namespaced entry appears in the
    /// full table with the same types.
    pub fn verify(&self, types: &TypeRegistry) -> RegistryResult<()> {
        let context = format!("watch table {}/{}", self.release, self.version);
        let fail = |message: String| RegistryError::Coverage { context: context.clone(), message };

        for (kind, entry) in self.namespaced.iter() {
            match self.all.get(kind) {
                Some(full) if full == entry => {}
                Some(full) => {
                    return Err(fail(format!("namespaced entry {} is {:?}, full table has {:?}", kind, entry, full)));
                }
                None => return Err(fail(format!("namespaced entry {} is missing from the full table", kind))),
            }
        }
        for kind in self.kinds() {
            let entry = &self.all[kind];
            for name in entry.item_type.into_iter().chain(std::iter::once(entry.list_type)) {
                if !types.contains(self.version, name) {
                    return Err(fail(format!("{} refers to unknown type {}/{}", kind, self.version, name)));
                }
            }
        }
        debug!(release = self.release, version = self.version, kinds = self.all.len(), "watch table verified");
        Ok(())
    }
}
