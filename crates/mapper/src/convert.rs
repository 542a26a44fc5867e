use std::collections::BTreeMap;
use std::sync::Arc;

use kmodel_core::{
    json_kind, render_path, ElemShape, FieldShape, MapError, MapResult, Path, PathSeg, RawDocument, Scalar,
    ScalarKind, TypeDescriptor, TypedNode, TypedValue,
};
use kmodel_schema::TypeRegistry;
use metrics::counter;
use serde_json::Value;
use tracing::debug;

use crate::MapOptions;

pub(crate) fn to_typed(
    registry: &TypeRegistry,
    doc: &RawDocument,
    descriptor: &Arc<TypeDescriptor>,
    opts: MapOptions,
) -> MapResult<TypedNode> {
    let mut walk = Walk { registry, opts, path: Path::new(), unknown: 0 };
    let node = walk.node(doc, descriptor)?;
    counter!("mapper_to_typed_total", 1u64);
    if walk.unknown > 0 {
        counter!("mapper_unknown_keys_total", walk.unknown as u64);
    }
    Ok(node)
}

pub(crate) fn from_document(registry: &TypeRegistry, doc: &RawDocument, opts: MapOptions) -> MapResult<TypedNode> {
    let version_key = if opts.translate { "apiVersion" } else { "api_version" };
    let api_version = identity_field(doc, version_key)?;
    let kind = identity_field(doc, "kind")?;
    let descriptor = registry.resolve_api_version(api_version, kind)?;
    to_typed(registry, doc, &descriptor, opts)
}

pub(crate) fn from_value(registry: &TypeRegistry, value: &Value, opts: MapOptions) -> MapResult<TypedNode> {
    match value {
        Value::Object(doc) => from_document(registry, doc, opts),
        other => Err(MapError::mismatch(".", "object", json_kind(other))),
    }
}

fn identity_field<'a>(doc: &'a RawDocument, key: &str) -> MapResult<&'a str> {
    doc.get(key).and_then(Value::as_str).ok_or_else(|| MapError::MissingIdentity { key: key.to_string() })
}

struct Walk<'a> {
    registry: &'a TypeRegistry,
    opts: MapOptions,
    // wire-side path of the value being converted, for error reports
    path: Path,
    unknown: usize,
}

impl Walk<'_> {
    fn here(&self) -> String { render_path(&self.path) }

    fn node(&mut self, doc: &RawDocument, descriptor: &Arc<TypeDescriptor>) -> MapResult<TypedNode> {
        let translate = self.opts.translate;
        let mut values = Vec::with_capacity(descriptor.fields.len());
        let mut extras = RawDocument::new();
        for field in descriptor.fields.iter() {
            let key = field.key(translate);
            self.path.push(PathSeg::Field(key.to_string()));
            let value = match doc.get(key) {
                None if field.optional => TypedValue::Absent,
                // explicit null is kept so the document re-emits it
                Some(Value::Null) if field.optional => {
                    extras.insert(key.to_string(), Value::Null);
                    TypedValue::Absent
                }
                None | Some(Value::Null) => return Err(MapError::MissingField { path: self.here() }),
                Some(v) => self.field(v, &field.shape, &descriptor.version)?,
            };
            self.path.pop();
            values.push(value);
        }

        let mut unknown = 0;
        for (key, value) in doc.iter() {
            if descriptor.field_by_key(key, translate).is_none() {
                extras.insert(key.clone(), value.clone());
                unknown += 1;
            }
        }
        if unknown > 0 {
            self.unknown += unknown;
            debug!(
                type_name = %descriptor.name,
                path = %self.here(),
                keys = unknown,
                "retained undeclared keys"
            );
        }
        TypedNode::from_parts(Arc::clone(descriptor), values, extras)
    }

    fn field(&mut self, value: &Value, shape: &FieldShape, version: &str) -> MapResult<TypedValue> {
        match shape {
            FieldShape::Scalar(kind) => self.scalar(value, *kind),
            FieldShape::Node(name) => self.nested(value, version, name),
            FieldShape::Raw => Ok(TypedValue::Raw(value.clone())),
            FieldShape::Seq(elem) => {
                let items = value.as_array().ok_or_else(|| MapError::mismatch(self.here(), shape, json_kind(value)))?;
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    self.path.push(PathSeg::Index(i));
                    out.push(self.elem(item, elem, version)?);
                    self.path.pop();
                }
                Ok(TypedValue::Seq(out))
            }
            FieldShape::Map(elem) => {
                let entries = value.as_object().ok_or_else(|| MapError::mismatch(self.here(), shape, json_kind(value)))?;
                let mut out = BTreeMap::new();
                for (k, item) in entries.iter() {
                    self.path.push(PathSeg::Key(k.clone()));
                    out.insert(k.clone(), self.elem(item, elem, version)?);
                    self.path.pop();
                }
                Ok(TypedValue::Map(out))
            }
        }
    }

    fn elem(&mut self, value: &Value, shape: &ElemShape, version: &str) -> MapResult<TypedValue> {
        match shape {
            // a null entry (a merge-patch delete) is kept and written back as null
            _ if value.is_null() => Ok(TypedValue::Absent),
            ElemShape::Scalar(kind) => self.scalar(value, *kind),
            ElemShape::Node(name) => self.nested(value, version, name),
            ElemShape::Raw => Ok(TypedValue::Raw(value.clone())),
        }
    }

    fn scalar(&self, value: &Value, kind: ScalarKind) -> MapResult<TypedValue> {
        match Scalar::from_json(value) {
            Some(s) if s.fits(kind) => Ok(TypedValue::Scalar(s)),
            _ => Err(MapError::mismatch(self.here(), kind.name(), json_kind(value))),
        }
    }

    fn nested(&mut self, value: &Value, version: &str, name: &str) -> MapResult<TypedValue> {
        let doc = value.as_object().ok_or_else(|| MapError::mismatch(self.here(), name, json_kind(value)))?;
        let descriptor = self.registry.get(version, name)?;
        Ok(TypedValue::Node(self.node(doc, &descriptor)?))
    }
}

/// Convert a typed node back into a raw document.
///
/// Absent fields are omitted, or written as `null` with `include_empty`.
/// Absent list and map entries are always written as `null`. Retained extras are written after the declared fields; a declared field
/// wins over an extra with the same key.
pub fn to_raw(node: &TypedNode, opts: MapOptions) -> RawDocument {
    let mut out = RawDocument::new();
    for (spec, value) in node.fields() {
        let key = spec.key(opts.translate).to_string();
        match value {
            TypedValue::Absent if opts.include_empty => {
                out.insert(key, Value::Null);
            }
            TypedValue::Absent => {}
            v => {
                out.insert(key, value_to_json(v, opts));
            }
        }
    }
    for (k, v) in node.extras().iter() {
        if !out.contains_key(k) {
            out.insert(k.clone(), v.clone());
        }
    }
    out
}

pub(crate) fn value_to_json(value: &TypedValue, opts: MapOptions) -> Value {
    match value {
        TypedValue::Absent => Value::Null,
        TypedValue::Scalar(s) => s.to_json(),
        TypedValue::Node(n) => Value::Object(to_raw(n, opts)),
        TypedValue::Seq(items) => Value::Array(items.iter().map(|v| value_to_json(v, opts)).collect()),
        TypedValue::Map(m) => Value::Object(m.iter().map(|(k, v)| (k.clone(), value_to_json(v, opts))).collect()),
        TypedValue::Raw(v) => v.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kmodel_core::FieldSpec;
    use serde_json::json;

    fn registry() -> TypeRegistry {
        TypeRegistry::builder()
            .add(TypeDescriptor::new("v1", "Meta", vec![
                FieldSpec::new("name", FieldShape::Scalar(ScalarKind::Str)),
                FieldSpec::new("labels", FieldShape::Map(ElemShape::Scalar(ScalarKind::Str))),
            ]))
            .add(TypeDescriptor::new("v1", "Port", vec![
                FieldSpec::new("container_port", FieldShape::Scalar(ScalarKind::Int)).required(),
                FieldSpec::new("host_ip", FieldShape::Scalar(ScalarKind::Str)).wire("hostIP"),
            ]))
            .add(
                TypeDescriptor::new("v1", "Widget", vec![
                    FieldSpec::new("api_version", FieldShape::Scalar(ScalarKind::Str)),
                    FieldSpec::new("kind", FieldShape::Scalar(ScalarKind::Str)),
                    FieldSpec::new("metadata", FieldShape::Node("Meta".into())),
                    FieldSpec::new("ports", FieldShape::Seq(ElemShape::Node("Port".into()))),
                    FieldSpec::new("weight", FieldShape::Scalar(ScalarKind::Float)),
                    FieldSpec::new("data", FieldShape::Raw),
                ])
                .document("example.io", "Widget"),
            )
            .build()
            .unwrap()
    }

    fn widget() -> Value {
        json!({
            "apiVersion": "example.io/v1",
            "kind": "Widget",
            "metadata": {"name": "w", "labels": {"app": "w"}},
            "ports": [{"containerPort": 80, "hostIP": "10.0.0.1"}, {"containerPort": 443}],
            "weight": 2,
            "data": {"anything": [1, "two", null]}
        })
    }

    #[test]
    fn converts_nested_fields() {
        let reg = registry();
        let node = from_value(&reg, &widget(), MapOptions::default()).unwrap();
        assert_eq!(node.type_name(), "Widget");
        let meta = node.get("metadata").and_then(|v| v.as_node()).unwrap();
        assert_eq!(meta.get("name").and_then(|v| v.as_str()), Some("w"));
        let ports = node.get("ports").and_then(|v| v.as_seq()).unwrap();
        assert_eq!(ports.len(), 2);
        let first = ports[0].as_node().unwrap();
        assert_eq!(first.get("container_port").and_then(|v| v.as_i64()), Some(80));
        assert_eq!(first.get("host_ip").and_then(|v| v.as_str()), Some("10.0.0.1"));
        assert!(ports[1].as_node().unwrap().get("host_ip").unwrap().is_absent());
        // integer input for a float field keeps its representation
        assert_eq!(node.get("weight").and_then(|v| v.as_i64()), Some(2));
        assert_eq!(node.get("data").and_then(|v| v.as_raw()), Some(&json!({"anything": [1, "two", null]})));
    }

    #[test]
    fn round_trips_declared_and_unknown_keys() {
        let reg = registry();
        let mut doc = widget();
        doc["status"] = json!({"phase": "Ready"});
        doc["metadata"]["uid"] = json!("abc");
        let node = from_value(&reg, &doc, MapOptions::default()).unwrap();
        assert!(node.extras().contains_key("status"));
        assert_eq!(Value::Object(to_raw(&node, MapOptions::default())), doc);
    }

    #[test]
    fn null_reads_as_absent() {
        let reg = registry();
        let mut doc = widget();
        doc["weight"] = Value::Null;
        let node = from_value(&reg, &doc, MapOptions::default()).unwrap();
        assert!(node.get("weight").unwrap().is_absent());
        assert_eq!(node.extras().get("weight"), Some(&Value::Null));
        assert_eq!(Value::Object(to_raw(&node, MapOptions::default())), doc);

        // a value set later wins over the remembered null
        let mut node = node;
        node.set("weight", 1.5).unwrap();
        assert_eq!(to_raw(&node, MapOptions::default()).get("weight"), Some(&json!(1.5)));

        let mut doc = widget();
        doc.as_object_mut().unwrap().remove("weight");
        let node = from_value(&reg, &doc, MapOptions::default()).unwrap();
        assert!(!to_raw(&node, MapOptions::default()).contains_key("weight"));
        let raw = to_raw(&node, MapOptions::default().include_empty(true));
        assert_eq!(raw.get("weight"), Some(&Value::Null));
    }

    #[test]
    fn null_entries_survive_in_maps_and_lists() {
        let reg = registry();
        let mut doc = widget();
        doc["metadata"]["labels"]["drop"] = Value::Null;
        doc["ports"].as_array_mut().unwrap().push(Value::Null);
        let node = from_value(&reg, &doc, MapOptions::default()).unwrap();
        let meta = node.get("metadata").and_then(|v| v.as_node()).unwrap();
        let labels = meta.get("labels").and_then(|v| v.as_map()).unwrap();
        assert!(labels["drop"].is_absent());
        assert_eq!(labels["app"].as_str(), Some("w"));
        assert!(node.get("ports").and_then(|v| v.as_seq()).unwrap()[2].is_absent());
        assert_eq!(Value::Object(to_raw(&node, MapOptions::default())), doc);
    }

    #[test]
    fn missing_required_field_is_reported_with_its_path() {
        let reg = registry();
        let mut doc = widget();
        doc["ports"][1] = json!({"hostIP": "x"});
        let err = from_value(&reg, &doc, MapOptions::default()).unwrap_err();
        match err {
            MapError::MissingField { path } => assert_eq!(path, "ports[1].containerPort"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn shape_mismatches_fail_the_whole_conversion() {
        let reg = registry();
        let mut doc = widget();
        doc["metadata"]["labels"]["app"] = json!(7);
        let err = from_value(&reg, &doc, MapOptions::default()).unwrap_err();
        match err {
            MapError::ShapeMismatch { path, expected, found } => {
                assert_eq!(path, "metadata.labels[\"app\"]");
                assert_eq!(expected, "string");
                assert_eq!(found, "integer");
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = from_value(&reg, &json!(["not", "a", "document"]), MapOptions::default()).unwrap_err();
        assert!(matches!(err, MapError::ShapeMismatch { .. }));
    }

    #[test]
    fn identity_is_required_and_must_resolve() {
        let reg = registry();
        let err = from_value(&reg, &json!({"kind": "Widget"}), MapOptions::default()).unwrap_err();
        assert!(matches!(err, MapError::MissingIdentity { ref key } if key == "apiVersion"));
        let err = from_value(&reg, &json!({"apiVersion": "example.io/v9", "kind": "Widget"}), MapOptions::default())
            .unwrap_err();
        assert!(matches!(err, MapError::UnresolvableType { .. }));
    }

    #[test]
    fn untranslated_mapping_uses_host_names() {
        let reg = registry();
        let opts = MapOptions::default().translate(false);
        let doc = json!({
            "api_version": "example.io/v1",
            "kind": "Widget",
            "ports": [{"container_port": 8080, "host_ip": "h"}],
            "hostIP": "unknown here"
        });
        let node = from_value(&reg, &doc, opts).unwrap();
        let port = node.get("ports").and_then(|v| v.as_seq()).and_then(|s| s[0].as_node()).unwrap();
        assert_eq!(port.get("container_port").and_then(|v| v.as_i64()), Some(8080));
        assert!(node.extras().contains_key("hostIP"));
        assert_eq!(Value::Object(to_raw(&node, opts)), doc);

        // wire keys are not recognized with translation off
        let err = from_value(&reg, &widget(), opts).unwrap_err();
        assert!(matches!(err, MapError::MissingIdentity { ref key } if key == "api_version"));
    }

    #[test]
    fn declared_fields_win_over_extras() {
        let reg = registry();
        let mut node = reg.instantiate("v1", "Meta").unwrap();
        node.set("name", "declared").unwrap();
        node.extras_mut().insert("name".into(), json!("extra"));
        node.extras_mut().insert("uid".into(), json!("u"));
        let raw = to_raw(&node, MapOptions::default());
        assert_eq!(Value::Object(raw), json!({"name": "declared", "uid": "u"}));
    }
}
