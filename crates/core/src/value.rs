//! Typed object trees.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use smallvec::SmallVec;

use crate::descriptor::{ElemShape, FieldShape, FieldSpec, ScalarKind, TypeDescriptor};
use crate::error::{MapError, MapResult};

/// Untyped nested document using wire naming.
pub type RawDocument = Map<String, Value>;

/// Short name of a JSON value's type, for error messages.
pub fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    /// Read a JSON scalar. Numbers keep their integer/float representation so
    /// they serialize back unchanged.
    pub fn from_json(v: &Value) -> Option<Scalar> {
        match v {
            Value::String(s) => Some(Scalar::Str(s.clone())),
            Value::Bool(b) => Some(Scalar::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Scalar::Int(i)),
                None => n.as_f64().map(Scalar::Float),
            },
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Scalar::Str(s) => Value::String(s.clone()),
            Scalar::Int(i) => Value::from(*i),
            Scalar::Float(f) => serde_json::Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
            Scalar::Bool(b) => Value::Bool(*b),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Scalar::Str(_) => "string",
            Scalar::Int(_) => "integer",
            Scalar::Float(_) => "number",
            Scalar::Bool(_) => "boolean",
        }
    }

    /// Whether this scalar is acceptable for a field declared as `kind`.
    pub fn fits(&self, kind: ScalarKind) -> bool {
        matches!(
            (self, kind),
            (Scalar::Str(_), ScalarKind::Str | ScalarKind::IntOrStr)
                | (Scalar::Int(_), ScalarKind::Int | ScalarKind::Float | ScalarKind::IntOrStr)
                | (Scalar::Float(_), ScalarKind::Float)
                | (Scalar::Bool(_), ScalarKind::Bool)
        )
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Str(s) => f.write_str(s),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Value held by one field of a typed node.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TypedValue {
    /// Optional-default sentinel: the field was not set.
    #[default]
    Absent,
    Scalar(Scalar),
    Node(TypedNode),
    Seq(Vec<TypedValue>),
    Map(BTreeMap<String, TypedValue>),
    Raw(Value),
}

impl TypedValue {
    pub fn is_absent(&self) -> bool { matches!(self, TypedValue::Absent) }

    pub fn as_str(&self) -> Option<&str> {
        match self { TypedValue::Scalar(Scalar::Str(s)) => Some(s), _ => None }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self { TypedValue::Scalar(Scalar::Int(i)) => Some(*i), _ => None }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TypedValue::Scalar(Scalar::Float(f)) => Some(*f),
            TypedValue::Scalar(Scalar::Int(i)) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self { TypedValue::Scalar(Scalar::Bool(b)) => Some(*b), _ => None }
    }

    pub fn as_node(&self) -> Option<&TypedNode> {
        match self { TypedValue::Node(n) => Some(n), _ => None }
    }

    pub fn as_seq(&self) -> Option<&[TypedValue]> {
        match self { TypedValue::Seq(v) => Some(v), _ => None }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, TypedValue>> {
        match self { TypedValue::Map(m) => Some(m), _ => None }
    }

    pub fn as_raw(&self) -> Option<&Value> {
        match self { TypedValue::Raw(v) => Some(v), _ => None }
    }

    pub fn kind_name(&self) -> String {
        match self {
            TypedValue::Absent => "absent".into(),
            TypedValue::Scalar(s) => s.kind_name().into(),
            TypedValue::Node(n) => format!("object {}", n.type_name()),
            TypedValue::Seq(_) => "list".into(),
            TypedValue::Map(_) => "map".into(),
            TypedValue::Raw(_) => "any".into(),
        }
    }

    fn fits_elem(&self, shape: &ElemShape) -> bool {
        match (self, shape) {
            // null entry
            (TypedValue::Absent, _) => true,
            (TypedValue::Scalar(s), ElemShape::Scalar(k)) => s.fits(*k),
            (TypedValue::Node(n), ElemShape::Node(name)) => n.type_name() == name,
            (TypedValue::Raw(_), ElemShape::Raw) => true,
            _ => false,
        }
    }

    /// Whether this value may be stored in a field of the given shape.
    pub fn fits(&self, shape: &FieldShape) -> bool {
        match (self, shape) {
            (TypedValue::Absent, _) => true,
            (TypedValue::Scalar(s), FieldShape::Scalar(k)) => s.fits(*k),
            (TypedValue::Node(n), FieldShape::Node(name)) => n.type_name() == name,
            (TypedValue::Seq(items), FieldShape::Seq(e)) => items.iter().all(|v| v.fits_elem(e)),
            (TypedValue::Map(m), FieldShape::Map(e)) => m.values().all(|v| v.fits_elem(e)),
            (TypedValue::Raw(_), FieldShape::Raw) => true,
            _ => false,
        }
    }
}

impl From<Scalar> for TypedValue {
    fn from(s: Scalar) -> Self { TypedValue::Scalar(s) }
}
impl From<&str> for TypedValue {
    fn from(s: &str) -> Self { TypedValue::Scalar(Scalar::Str(s.to_string())) }
}
impl From<String> for TypedValue {
    fn from(s: String) -> Self { TypedValue::Scalar(Scalar::Str(s)) }
}
impl From<i64> for TypedValue {
    fn from(i: i64) -> Self { TypedValue::Scalar(Scalar::Int(i)) }
}
impl From<i32> for TypedValue {
    fn from(i: i32) -> Self { TypedValue::Scalar(Scalar::Int(i as i64)) }
}
impl From<f64> for TypedValue {
    fn from(f: f64) -> Self { TypedValue::Scalar(Scalar::Float(f)) }
}
impl From<bool> for TypedValue {
    fn from(b: bool) -> Self { TypedValue::Scalar(Scalar::Bool(b)) }
}
impl From<TypedNode> for TypedValue {
    fn from(n: TypedNode) -> Self { TypedValue::Node(n) }
}
impl From<Vec<TypedValue>> for TypedValue {
    fn from(v: Vec<TypedValue>) -> Self { TypedValue::Seq(v) }
}
impl From<BTreeMap<String, TypedValue>> for TypedValue {
    fn from(m: BTreeMap<String, TypedValue>) -> Self { TypedValue::Map(m) }
}

/// One step of a path into a typed tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSeg {
    Field(String),
    Index(usize),
    Key(String),
}

pub type Path = SmallVec<[PathSeg; 8]>;

/// Render a path as `spec.containers[0].env["HOME"]`; the empty path is `.`.
pub fn render_path(path: &[PathSeg]) -> String {
    if path.is_empty() {
        return ".".to_string();
    }
    let mut out = String::new();
    for seg in path {
        match seg {
            PathSeg::Field(name) => {
                if !out.is_empty() { out.push('.'); }
                out.push_str(name);
            }
            PathSeg::Index(i) => { out.push('['); out.push_str(&i.to_string()); out.push(']'); }
            PathSeg::Key(k) => { out.push_str("[\""); out.push_str(k); out.push_str("\"]"); }
        }
    }
    out
}

/// A node of a version-specific typed object tree.
///
/// Holds one value per declared field (in declared order) plus the undeclared
/// keys found in the source document, kept verbatim for re-emission.
#[derive(Debug, Clone)]
pub struct TypedNode {
    descriptor: Arc<TypeDescriptor>,
    values: Vec<TypedValue>,
    extras: RawDocument,
}

impl PartialEq for TypedNode {
    fn eq(&self, other: &Self) -> bool {
        self.descriptor.name == other.descriptor.name
            && self.descriptor.version == other.descriptor.version
            && self.values == other.values
            && self.extras == other.extras
    }
}

impl TypedNode {
    /// Empty instance: every field holds [`TypedValue::Absent`].
    pub fn new(descriptor: Arc<TypeDescriptor>) -> Self {
        let values = vec![TypedValue::Absent; descriptor.fields.len()];
        Self { descriptor, values, extras: RawDocument::new() }
    }

    /// Assemble a node from values listed in declared field order. Every
    /// value is checked against its field's shape.
    pub fn from_parts(descriptor: Arc<TypeDescriptor>, values: Vec<TypedValue>, extras: RawDocument) -> MapResult<Self> {
        if values.len() != descriptor.fields.len() {
            return Err(MapError::mismatch(
                descriptor.name.as_str(),
                format!("{} field values", descriptor.fields.len()),
                values.len(),
            ));
        }
        for (spec, value) in descriptor.fields.iter().zip(values.iter()) {
            if !value.fits(&spec.shape) {
                return Err(MapError::mismatch(spec.name.as_str(), &spec.shape, value.kind_name()));
            }
        }
        Ok(Self { descriptor, values, extras })
    }

    pub fn descriptor(&self) -> &Arc<TypeDescriptor> { &self.descriptor }
    pub fn type_name(&self) -> &str { &self.descriptor.name }
    pub fn version(&self) -> &str { &self.descriptor.version }
    pub fn is_document(&self) -> bool { self.descriptor.is_document() }

    /// Declared field names in host convention, in declared order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.descriptor.fields.iter().map(|f| f.name.as_str())
    }

    /// Declared fields paired with their current values.
    pub fn fields(&self) -> impl Iterator<Item = (&FieldSpec, &TypedValue)> + '_ {
        self.descriptor.fields.iter().zip(self.values.iter())
    }

    /// Value of a declared field; `None` only when the type has no such field.
    pub fn get(&self, host: &str) -> Option<&TypedValue> {
        self.values.get(self.descriptor.field_index(host)?)
    }

    fn get_mut(&mut self, host: &str) -> Option<&mut TypedValue> {
        let i = self.descriptor.field_index(host)?;
        self.values.get_mut(i)
    }

    /// Set a declared field, checking the value against the field's shape.
    pub fn set(&mut self, host: &str, value: impl Into<TypedValue>) -> MapResult<&mut Self> {
        let value = value.into();
        let idx = self.descriptor.field_index(host).ok_or_else(|| MapError::UnknownField {
            type_name: self.descriptor.name.clone(),
            field: host.to_string(),
        })?;
        let spec = &self.descriptor.fields[idx];
        if !value.fits(&spec.shape) {
            return Err(MapError::mismatch(host, &spec.shape, value.kind_name()));
        }
        if let Some(slot) = self.values.get_mut(idx) {
            *slot = value;
        }
        Ok(self)
    }

    /// Reset a field to its optional default.
    pub fn clear(&mut self, host: &str) -> Option<TypedValue> {
        let v = self.get_mut(host)?;
        Some(std::mem::take(v))
    }

    /// Undeclared keys retained from the source document.
    pub fn extras(&self) -> &RawDocument { &self.extras }
    pub fn extras_mut(&mut self) -> &mut RawDocument { &mut self.extras }

    /// `apiVersion` string of a document node.
    pub fn api_version(&self) -> Option<String> {
        self.descriptor.identity().map(|id| id.api_version())
    }

    /// Kind of a document node.
    pub fn kind(&self) -> Option<&str> {
        self.descriptor.document.as_ref().map(|d| d.kind.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> Arc<TypeDescriptor> {
        Arc::new(TypeDescriptor::new("v1", "ObjectMeta", vec![
            FieldSpec::new("name", FieldShape::Scalar(ScalarKind::Str)),
            FieldSpec::new("generation", FieldShape::Scalar(ScalarKind::Int)),
            FieldSpec::new("labels", FieldShape::Map(ElemShape::Scalar(ScalarKind::Str))),
        ]))
    }

    #[test]
    fn empty_node_reads_absent() {
        let node = TypedNode::new(meta());
        assert_eq!(node.get("name"), Some(&TypedValue::Absent));
        assert!(node.get("nope").is_none());
        assert_eq!(node.field_names().collect::<Vec<_>>(), vec!["name", "generation", "labels"]);
        assert!(!node.is_document());
    }

    #[test]
    fn set_checks_shape() {
        let mut node = TypedNode::new(meta());
        node.set("name", "web").unwrap().set("generation", 3i64).unwrap();
        assert_eq!(node.get("name").and_then(|v| v.as_str()), Some("web"));
        assert_eq!(node.get("generation").and_then(|v| v.as_i64()), Some(3));

        let err = node.set("generation", "three").unwrap_err();
        assert!(matches!(err, MapError::ShapeMismatch { .. }), "err={err}");
        let err = node.set("missing", 1i64).unwrap_err();
        assert!(matches!(err, MapError::UnknownField { .. }));

        let mut labels = BTreeMap::new();
        labels.insert("app".to_string(), TypedValue::from("web"));
        node.set("labels", labels).unwrap();
        assert_eq!(node.clear("name"), Some(TypedValue::from("web")));
        assert!(node.get("name").unwrap().is_absent());
    }

    #[test]
    fn from_parts_checks_count_and_shapes() {
        let mut labels = BTreeMap::new();
        labels.insert("gone".to_string(), TypedValue::Absent);
        let node = TypedNode::from_parts(
            meta(),
            vec!["web".into(), TypedValue::Absent, labels.into()],
            RawDocument::new(),
        )
        .unwrap();
        assert_eq!(node.get("name").and_then(|v| v.as_str()), Some("web"));

        let err = TypedNode::from_parts(meta(), vec!["web".into()], RawDocument::new()).unwrap_err();
        assert!(matches!(err, MapError::ShapeMismatch { ref found, .. } if found == "1"), "err={err}");

        let err = TypedNode::from_parts(meta(), vec![TypedValue::Absent, "3".into(), TypedValue::Absent], RawDocument::new())
            .unwrap_err();
        assert!(matches!(err, MapError::ShapeMismatch { ref path, .. } if path == "generation"), "err={err}");
    }

    #[test]
    fn scalars_keep_number_representation() {
        assert_eq!(Scalar::from_json(&serde_json::json!(3)), Some(Scalar::Int(3)));
        assert_eq!(Scalar::from_json(&serde_json::json!(1.5)), Some(Scalar::Float(1.5)));
        assert_eq!(Scalar::Int(3).to_json(), serde_json::json!(3));
        assert!(Scalar::Int(1).fits(ScalarKind::Float));
        assert!(!Scalar::Float(1.5).fits(ScalarKind::Int));
        assert!(Scalar::Str("50%".into()).fits(ScalarKind::IntOrStr));
    }

    #[test]
    fn paths_render_readably() {
        let p: Path = smallvec::smallvec![
            PathSeg::Field("spec".into()),
            PathSeg::Field("containers".into()),
            PathSeg::Index(0),
            PathSeg::Field("env".into()),
            PathSeg::Key("HOME".into()),
        ];
        assert_eq!(render_path(&p), "spec.containers[0].env[\"HOME\"]");
        assert_eq!(render_path(&[]), ".");
    }
}
