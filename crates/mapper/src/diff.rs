use kmodel_core::{Path, PathSeg, RawDocument, TypeDescriptor, TypedNode, TypedValue};
use serde_json::Value;

use crate::convert::value_to_json;
use crate::MapOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffKind {
    Added,
    Removed,
    Changed,
}

/// One difference between two typed trees. Paths use host field names;
/// values are rendered as wire JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffEntry {
    pub path: Path,
    pub kind: DiffKind,
    pub before: Option<Value>,
    pub after: Option<Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffSummary {
    pub adds: usize,
    pub updates: usize,
    pub removes: usize,
}

/// Per-path differences going from `base` to `target`.
///
/// Nodes of different types are reported as a single change at the point
/// where they diverge, the root included.
pub fn diff(base: &TypedNode, target: &TypedNode) -> Vec<DiffEntry> {
    let mut d = Differ { out: Vec::new(), path: Path::new() };
    d.node(base, target);
    d.out
}

pub fn summarize(entries: &[DiffEntry]) -> DiffSummary {
    let mut s = DiffSummary::default();
    for e in entries {
        match e.kind {
            DiffKind::Added => s.adds += 1,
            DiffKind::Removed => s.removes += 1,
            DiffKind::Changed => s.updates += 1,
        }
    }
    s
}

fn json(v: &TypedValue) -> Value { value_to_json(v, MapOptions::default()) }

struct Differ {
    out: Vec<DiffEntry>,
    path: Path,
}

impl Differ {
    fn push(&mut self, kind: DiffKind, before: Option<Value>, after: Option<Value>) {
        self.out.push(DiffEntry { path: self.path.clone(), kind, before, after });
    }

    fn node(&mut self, a: &TypedNode, b: &TypedNode) {
        if a.type_name() != b.type_name() || a.version() != b.version() {
            let opts = MapOptions::default();
            self.push(
                DiffKind::Changed,
                Some(Value::Object(crate::to_raw(a, opts))),
                Some(Value::Object(crate::to_raw(b, opts))),
            );
            return;
        }
        for ((spec, av), (_, bv)) in a.fields().zip(b.fields()) {
            self.path.push(PathSeg::Field(spec.name.clone()));
            self.value(av, bv);
            self.path.pop();
        }
        self.extras(a.descriptor(), a.extras(), b.extras());
    }

    fn extras(&mut self, descriptor: &TypeDescriptor, a: &RawDocument, b: &RawDocument) {
        // a remembered null on a declared field is already covered by the field itself
        let shadowed = |k: &str, v: &Value| {
            v.is_null() && (descriptor.field_by_key(k, true).is_some() || descriptor.field_by_key(k, false).is_some())
        };
        let a: RawDocument = a.iter().filter(|(k, v)| !shadowed(k.as_str(), *v)).map(|(k, v)| (k.clone(), v.clone())).collect();
        let b: RawDocument = b.iter().filter(|(k, v)| !shadowed(k.as_str(), *v)).map(|(k, v)| (k.clone(), v.clone())).collect();
        for (k, av) in a.iter() {
            self.path.push(PathSeg::Field(k.clone()));
            match b.get(k) {
                None => self.push(DiffKind::Removed, Some(av.clone()), None),
                Some(bv) if bv != av => self.push(DiffKind::Changed, Some(av.clone()), Some(bv.clone())),
                Some(_) => {}
            }
            self.path.pop();
        }
        for (k, bv) in b.iter() {
            if !a.contains_key(k) {
                self.path.push(PathSeg::Field(k.clone()));
                self.push(DiffKind::Added, None, Some(bv.clone()));
                self.path.pop();
            }
        }
    }

    fn value(&mut self, a: &TypedValue, b: &TypedValue) {
        match (a, b) {
            (TypedValue::Absent, TypedValue::Absent) => {}
            (TypedValue::Absent, b) => self.push(DiffKind::Added, None, Some(json(b))),
            (a, TypedValue::Absent) => self.push(DiffKind::Removed, Some(json(a)), None),
            (TypedValue::Node(an), TypedValue::Node(bn)) => self.node(an, bn),
            (TypedValue::Seq(aa), TypedValue::Seq(bb)) => {
                for i in 0..aa.len().max(bb.len()) {
                    self.path.push(PathSeg::Index(i));
                    match (aa.get(i), bb.get(i)) {
                        (Some(x), Some(y)) => self.value(x, y),
                        (Some(x), None) => self.push(DiffKind::Removed, Some(json(x)), None),
                        (None, Some(y)) => self.push(DiffKind::Added, None, Some(json(y))),
                        (None, None) => {}
                    }
                    self.path.pop();
                }
            }
            (TypedValue::Map(am), TypedValue::Map(bm)) => {
                for (k, x) in am.iter() {
                    self.path.push(PathSeg::Key(k.clone()));
                    match bm.get(k) {
                        Some(y) => self.value(x, y),
                        None => self.push(DiffKind::Removed, Some(json(x)), None),
                    }
                    self.path.pop();
                }
                for (k, y) in bm.iter() {
                    if !am.contains_key(k) {
                        self.path.push(PathSeg::Key(k.clone()));
                        self.push(DiffKind::Added, None, Some(json(y)));
                        self.path.pop();
                    }
                }
            }
            (a, b) if a != b => self.push(DiffKind::Changed, Some(json(a)), Some(json(b))),
            _ => {}
        }
    }
}
