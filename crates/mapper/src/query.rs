use kmodel_core::{MapError, MapResult, Path, PathSeg, TypedNode, TypedValue};

/// Follow a path of host field names, sequence indexes and map keys.
///
/// Returns `None` when a step does not exist or when the path is empty.
pub fn object_at_path<'a>(node: &'a TypedNode, path: &[PathSeg]) -> Option<&'a TypedValue> {
    let (first, rest) = path.split_first()?;
    let mut cur = match first {
        PathSeg::Field(name) => node.get(name)?,
        _ => return None,
    };
    for seg in rest {
        cur = match (seg, cur) {
            (PathSeg::Field(name), TypedValue::Node(n)) => n.get(name)?,
            (PathSeg::Index(i), TypedValue::Seq(items)) => items.get(*i)?,
            (PathSeg::Key(k), TypedValue::Map(m)) => m.get(k)?,
            _ => return None,
        };
    }
    Some(cur)
}

/// Parse `spec.containers[0].env["HOME"]` style paths.
pub fn parse_path(text: &str) -> MapResult<Path> {
    let bad = || MapError::InvalidPath(text.to_string());
    let mut out = Path::new();
    let mut rest = text.trim();
    if rest.is_empty() || rest == "." {
        return Ok(out);
    }
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('[') {
            let close = after.find(']').ok_or_else(bad)?;
            let inner = &after[..close];
            let seg = match inner.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
                Some(key) => PathSeg::Key(key.to_string()),
                None => PathSeg::Index(inner.parse().map_err(|_| bad())?),
            };
            out.push(seg);
            rest = &after[close + 1..];
            continue;
        }
        let body = if out.is_empty() { rest } else { rest.strip_prefix('.').ok_or_else(bad)? };
        let end = body.find(['.', '[']).unwrap_or(body.len());
        if end == 0 {
            return Err(bad());
        }
        out.push(PathSeg::Field(body[..end].to_string()));
        rest = &body[end..];
    }
    Ok(out)
}

/// Every path under `node` at which a field named `host` holds a value,
/// in declared-field order, depth first.
pub fn find_by_name(node: &TypedNode, host: &str) -> Vec<Path> {
    let mut out = Vec::new();
    let mut path = Path::new();
    walk_node(node, host, &mut path, &mut out);
    out
}

fn walk_node(node: &TypedNode, host: &str, path: &mut Path, out: &mut Vec<Path>) {
    for (spec, value) in node.fields() {
        if value.is_absent() {
            continue;
        }
        path.push(PathSeg::Field(spec.name.clone()));
        if spec.name == host {
            out.push(path.clone());
        }
        walk_value(value, host, path, out);
        path.pop();
    }
}

fn walk_value(value: &TypedValue, host: &str, path: &mut Path, out: &mut Vec<Path>) {
    match value {
        TypedValue::Node(n) => walk_node(n, host, path, out),
        TypedValue::Seq(items) => {
            for (i, item) in items.iter().enumerate() {
                path.push(PathSeg::Index(i));
                walk_value(item, host, path, out);
                path.pop();
            }
        }
        TypedValue::Map(m) => {
            for (k, item) in m.iter() {
                path.push(PathSeg::Key(k.clone()));
                walk_value(item, host, path, out);
                path.pop();
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kmodel_core::render_path;

    #[test]
    fn parses_mixed_paths() {
        let p = parse_path("spec.containers[0].env[\"HOME\"]").unwrap();
        assert_eq!(p.as_slice(), &[
            PathSeg::Field("spec".into()),
            PathSeg::Field("containers".into()),
            PathSeg::Index(0),
            PathSeg::Field("env".into()),
            PathSeg::Key("HOME".into()),
        ]);
        assert_eq!(render_path(&p), "spec.containers[0].env[\"HOME\"]");
        assert!(parse_path(".").unwrap().is_empty());
        for bad in ["spec..name", "spec[x]", "spec[0", "a.", "[0]x"] {
            assert!(matches!(parse_path(bad), Err(MapError::InvalidPath(_))), "{bad}");
        }
    }
}
