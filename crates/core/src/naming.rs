//! Field-name translation between the wire convention (`camelCase`, as sent by
//! the API server) and the host convention (`snake_case`, as exposed on typed
//! nodes).
//!
//! The generic rules below cover almost every schema field. Fields whose wire
//! name does not follow them (`podIP`, `clusterIPs`) carry an explicit wire name
//! in their descriptor, which keeps the mapping exactly invertible per field.

/// Rust keywords that cannot be used verbatim as host field names.
const KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "static", "struct", "super", "trait", "true", "type",
    "unsafe", "use", "where", "while",
];

const DOLLAR_PREFIX: &str = "dollar_";
const EXTENSION_PREFIX: &str = "x_kubernetes_";

fn is_keyword(s: &str) -> bool {
    KEYWORDS.contains(&s)
}

/// Convert a host (snake_case) field name to its wire (camelCase) form.
///
/// `api_version` → `apiVersion`, `type_` → `type`, `dollar_ref` → `$ref`,
/// `x_kubernetes_int_or_string` → `x-kubernetes-int-or-string`.
pub fn host_to_wire(host: &str) -> String {
    if let Some(base) = host.strip_suffix('_') {
        if is_keyword(base) {
            return base.to_string();
        }
    }
    if let Some(rest) = host.strip_prefix(DOLLAR_PREFIX) {
        return format!("${}", host_to_wire(rest));
    }
    if host.starts_with(EXTENSION_PREFIX) {
        return host.replace('_', "-");
    }
    let mut out = String::with_capacity(host.len());
    let mut upper_next = false;
    for ch in host.chars() {
        if ch == '_' {
            // leading underscores are kept, inner ones start a new word
            if out.is_empty() { out.push(ch); } else { upper_next = true; }
            continue;
        }
        if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Convert a wire (camelCase) key to its host (snake_case) form.
///
/// Acronym runs are folded into one word (`podIP` → `pod_ip`,
/// `externalIPPolicy` → `external_ip_policy`): a run of capitals is split only
/// before its last letter when that letter starts a lowercase word.
pub fn wire_to_host(wire: &str) -> String {
    if let Some(rest) = wire.strip_prefix('$') {
        return format!("{}{}", DOLLAR_PREFIX, split_words(rest));
    }
    let mut out = split_words(wire);
    if is_keyword(&out) {
        out.push('_');
    }
    out
}

fn split_words(wire: &str) -> String {
    let chars: Vec<char> = wire.chars().collect();
    let mut out = String::with_capacity(wire.len() + 4);
    for (i, &ch) in chars.iter().enumerate() {
        if ch == '-' {
            out.push('_');
            continue;
        }
        if ch.is_uppercase() {
            let prev = if i > 0 { chars.get(i - 1).copied() } else { None };
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.map(|n| n.is_lowercase()).unwrap_or(false),
                _ => false,
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
