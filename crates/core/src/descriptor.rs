//! Type metadata describing the shape of typed nodes.
//!
//! Descriptors are plain data (serde-derivable) so they can be loaded from the
//! metadata emitted by the model generator, or built in code.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::naming;

/// Declared kind of a scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    Str,
    Int,
    Float,
    Bool,
    /// `IntOrString` fields accept either representation.
    IntOrStr,
}

impl ScalarKind {
    pub fn name(&self) -> &'static str {
        match self {
            ScalarKind::Str => "string",
            ScalarKind::Int => "integer",
            ScalarKind::Float => "number",
            ScalarKind::Bool => "boolean",
            ScalarKind::IntOrStr => "integer or string",
        }
    }
}

/// Shape of a sequence element or a mapping value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElemShape {
    Scalar(ScalarKind),
    /// Nested node; names a type of the same API version.
    Node(String),
    Raw,
}

/// Declared shape of a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldShape {
    Scalar(ScalarKind),
    Node(String),
    Seq(ElemShape),
    Map(ElemShape),
    /// Free-form JSON kept as-is (`RawExtension`, `JSON`).
    Raw,
}

impl FieldShape {
    /// Type name referenced by this shape, if any.
    pub fn referenced_type(&self) -> Option<&str> {
        match self {
            FieldShape::Node(name) => Some(name),
            FieldShape::Seq(ElemShape::Node(name)) | FieldShape::Map(ElemShape::Node(name)) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for ElemShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElemShape::Scalar(k) => f.write_str(k.name()),
            ElemShape::Node(n) => write!(f, "object {}", n),
            ElemShape::Raw => f.write_str("any"),
        }
    }
}

impl fmt::Display for FieldShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldShape::Scalar(k) => f.write_str(k.name()),
            FieldShape::Node(n) => write!(f, "object {}", n),
            FieldShape::Seq(e) => write!(f, "list of {}", e),
            FieldShape::Map(e) => write!(f, "map of {}", e),
            FieldShape::Raw => f.write_str("any"),
        }
    }
}

fn default_true() -> bool { true }

fn is_true(b: &bool) -> bool { *b }

/// One declared field of a type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Host (snake_case) name.
    pub name: String,
    /// Wire (camelCase) name. Empty means "derive from `name`"; filled by
    /// [`TypeDescriptor::normalize`].
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub wire: String,
    pub shape: FieldShape,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub optional: bool,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, shape: FieldShape) -> Self {
        let name = name.into();
        let wire = naming::host_to_wire(&name);
        Self { name, wire, shape, optional: true }
    }

    /// Override the derived wire name (`pod_ip` ↔ `podIP`).
    pub fn wire(mut self, wire: impl Into<String>) -> Self {
        self.wire = wire.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.optional = false;
        self
    }

    /// Key used in raw documents for this field.
    pub fn key(&self, translate: bool) -> &str {
        if translate { &self.wire } else { &self.name }
    }
}

/// Group and kind carried by top-level document types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentIdentity {
    /// API group; empty for the core group.
    #[serde(default)]
    pub group: String,
    pub kind: String,
}

/// Fully qualified identity of a document: group, version and kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApiIdentity {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl ApiIdentity {
    /// Split an `apiVersion` string (`batch/v1beta1`, `v1`) and pair it with a kind.
    pub fn parse(api_version: &str, kind: &str) -> Self {
        let (group, version) = match api_version.rsplit_once('/') {
            Some((g, v)) => (g.to_string(), v.to_string()),
            None => (String::new(), api_version.to_string()),
        };
        Self { group, version, kind: kind.to_string() }
    }

    pub fn api_version(&self) -> String {
        if self.group.is_empty() { self.version.clone() } else { format!("{}/{}", self.group, self.version) }
    }
}

impl fmt::Display for ApiIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}/{}", self.version, self.kind)
        } else {
            write!(f, "{}/{}/{}", self.group, self.version, self.kind)
        }
    }
}

/// Shape of one typed node type within an API version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentIdentity>,
    pub fields: Vec<FieldSpec>,
}

impl TypeDescriptor {
    pub fn new(version: impl Into<String>, name: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self { name: name.into(), version: version.into(), document: None, fields }
    }

    /// Mark this type as a top-level document with the given group and kind.
    pub fn document(mut self, group: impl Into<String>, kind: impl Into<String>) -> Self {
        self.document = Some(DocumentIdentity { group: group.into(), kind: kind.into() });
        self
    }

    /// Fill in derived wire names left empty by loaded metadata.
    pub fn normalize(&mut self) {
        for f in self.fields.iter_mut() {
            if f.wire.is_empty() {
                f.wire = naming::host_to_wire(&f.name);
            }
        }
    }

    pub fn is_document(&self) -> bool { self.document.is_some() }

    pub fn identity(&self) -> Option<ApiIdentity> {
        self.document.as_ref().map(|d| ApiIdentity {
            group: d.group.clone(),
            version: self.version.clone(),
            kind: d.kind.clone(),
        })
    }

    pub fn field(&self, host: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == host)
    }

    pub fn field_index(&self, host: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == host)
    }

    /// Find the field a raw-document key maps to under the given naming mode.
    pub fn field_by_key(&self, key: &str, translate: bool) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.key(translate) == key)
    }
}
