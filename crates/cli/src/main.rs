use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use kmodel_core::{render_path, wire_to_host, TypedNode};
use kmodel_mapper::{diff, find_by_name, object_at_path, parse_path, summarize, DiffKind, MapOptions, Mapper};
use kmodel_response::{spawn_blocking_call, Headers, Payload, RawReply, RegistryTranslator, Response};
use kmodel_watch::WatchRegistry;
use serde_json::Value;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "kmodelctl", version, about = "Typed Kubernetes model tooling")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// Model release to load
    #[arg(long = "release", env = "KMODEL_RELEASE", global = true, default_value = kmodel_schema::RELEASE_1_19)]
    release: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json, Yaml }

#[derive(Subcommand, Debug)]
enum Commands {
    /// List registered types
    Types {
        /// Only this API version, e.g. "v1beta1"
        #[arg(long = "version")]
        version: Option<String>,
    },
    /// Map documents to typed nodes and back
    Convert {
        file: PathBuf,
        /// Match keys by host (snake_case) names instead of wire names
        #[arg(long = "no-translate", action = ArgAction::SetTrue)]
        no_translate: bool,
        /// Write absent fields as null
        #[arg(long = "include-empty", action = ArgAction::SetTrue)]
        include_empty: bool,
    },
    /// Show a value inside a document, e.g. "spec.containers[0].image"
    Path { file: PathBuf, path: String },
    /// Find every path where a field name holds a value
    Find { file: PathBuf, name: String },
    /// Per-path differences between two documents
    Diff { base: PathBuf, target: PathBuf },
    /// Watchable kinds of an API version
    Watchables { version: String },
    /// Check watch tables against the type catalog
    Verify,
    /// Feed a recorded API reply through a deferred response
    Reply {
        file: PathBuf,
        /// Status code of the recorded reply
        #[arg(long = "code", default_value_t = 200)]
        code: u16,
        /// Codes whose payload is a typed document
        #[arg(long = "typed-codes", value_delimiter = ',', default_values_t = [200u16, 201])]
        typed_codes: Vec<u16>,
        #[arg(long = "no-translate", action = ArgAction::SetTrue)]
        no_translate: bool,
        #[arg(long = "timeout-ms", default_value_t = 5000)]
        timeout_ms: u64,
    },
}

fn init_tracing() {
    let env = std::env::var("KMODEL_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let registry = kmodel_schema::release(&cli.release).with_context(|| format!("loading release {}", cli.release))?;

    match cli.command {
        Commands::Types { version } => {
            let versions = match version {
                Some(v) => vec![v],
                None => registry.versions().into_iter().map(str::to_string).collect(),
            };
            let mut rows: Vec<Value> = Vec::new();
            for v in versions.iter() {
                for d in registry.types(v)? {
                    let identity = d.identity().map(|id| format!("{} {}", id.api_version(), id.kind));
                    rows.push(serde_json::json!({
                        "version": d.version,
                        "name": d.name,
                        "document": identity,
                        "fields": d.fields.len(),
                    }));
                }
            }
            match cli.output {
                Output::Human => {
                    println!("{:<10} {:<40} {:>6}  DOCUMENT", "VERSION", "NAME", "FIELDS");
                    for r in rows.iter() {
                        println!(
                            "{:<10} {:<40} {:>6}  {}",
                            r["version"].as_str().unwrap_or(""),
                            r["name"].as_str().unwrap_or(""),
                            r["fields"].as_u64().unwrap_or(0),
                            r["document"].as_str().unwrap_or("-")
                        );
                    }
                }
                other => emit(other, &Value::Array(rows))?,
            }
        }
        Commands::Convert { file, no_translate, include_empty } => {
            let opts = MapOptions::default().translate(!no_translate).include_empty(include_empty);
            let mapper = Mapper::with_options(registry, opts);
            let nodes = read_documents(&mapper, &file)?;
            info!(file = %file.display(), documents = nodes.len(), "converted");
            let mut out = Vec::with_capacity(nodes.len());
            for n in nodes.iter() {
                let unknown = unknown_keys(n, !no_translate);
                if !unknown.is_empty() {
                    warn!(type_name = %n.type_name(), keys = ?unknown, "document has undeclared keys; kept as-is");
                }
                out.push(mapper.to_value(n));
            }
            emit_documents(cli.output, out)?;
        }
        Commands::Path { file, path } => {
            let mapper = Mapper::new(registry);
            let node = first_document(&mapper, &file)?;
            let segs = parse_path(&path)?;
            let value = object_at_path(&node, &segs).ok_or_else(|| anyhow!("{} not found in {}", path, file.display()))?;
            let json = mapper.value_json(value);
            match cli.output {
                Output::Human => match &json {
                    Value::String(s) => println!("{}", s),
                    other => print!("{}", serde_yaml::to_string(other)?),
                },
                other => emit(other, &json)?,
            }
        }
        Commands::Find { file, name } => {
            let mapper = Mapper::new(registry);
            let node = first_document(&mapper, &file)?;
            let paths: Vec<String> = find_by_name(&node, &name).iter().map(|p| render_path(p)).collect();
            match cli.output {
                Output::Human => paths.iter().for_each(|p| println!("{}", p)),
                other => emit(other, &serde_json::to_value(&paths)?)?,
            }
        }
        Commands::Diff { base, target } => {
            let mapper = Mapper::new(registry);
            let a = first_document(&mapper, &base)?;
            let b = first_document(&mapper, &target)?;
            let entries = diff(&a, &b);
            let s = summarize(&entries);
            match cli.output {
                Output::Human => {
                    for e in entries.iter() {
                        let mark = match e.kind { DiffKind::Added => '+', DiffKind::Removed => '-', DiffKind::Changed => '~' };
                        println!("{} {}", mark, render_path(&e.path));
                    }
                    println!("{} added, {} changed, {} removed", s.adds, s.updates, s.removes);
                }
                other => {
                    let rows: Vec<Value> = entries
                        .iter()
                        .map(|e| {
                            serde_json::json!({
                                "path": render_path(&e.path),
                                "kind": format!("{:?}", e.kind).to_lowercase(),
                                "before": e.before,
                                "after": e.after,
                            })
                        })
                        .collect();
                    emit(other, &Value::Array(rows))?;
                }
            }
        }
        Commands::Watchables { version } => {
            let watch = WatchRegistry::for_version(&cli.release, &version)
                .ok_or_else(|| anyhow!("no watch table for {} {}", cli.release, version))?;
            let caps = watch.capabilities();
            match cli.output {
                Output::Human => {
                    println!("{:<32} {:<32} {:<36} NAMESPACED", "KIND", "ITEM", "LIST");
                    for c in caps.iter() {
                        println!("{:<32} {:<32} {:<36} {}", c.kind, c.item_type.unwrap_or("-"), c.list_type, c.namespace_required);
                    }
                }
                other => emit(other, &serde_json::to_value(&caps)?)?,
            }
        }
        Commands::Verify => {
            let tables: Vec<&WatchRegistry> =
                WatchRegistry::all().into_iter().filter(|w| w.release() == cli.release).collect();
            for w in tables.iter() {
                w.verify(registry).with_context(|| format!("verifying {}/{}", w.release(), w.version()))?;
            }
            println!("ok: {} types, {} watch tables", registry.len(), tables.len());
        }
        Commands::Reply { file, code, typed_codes, no_translate, timeout_ms } => {
            let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build().context("starting runtime")?;
            let path = file.clone();
            let task = spawn_blocking_call(rt.handle(), move || -> std::io::Result<RawReply> {
                let text = std::fs::read_to_string(&path)?;
                let payload: Value = serde_json::from_str(&text)?;
                Ok(RawReply::new(payload, code, Headers::new()))
            });
            let response = Response::builder(Arc::new(RegistryTranslator::new(registry)))
                .typed_codes(typed_codes)
                .translate_keys(!no_translate)
                .deferred(task);
            let reply = response
                .get(Some(Duration::from_millis(timeout_ms)))
                .with_context(|| format!("reading reply from {}", file.display()))?;
            let mapper = Mapper::with_options(registry, MapOptions::default().translate(!no_translate));
            let (typed, body) = match &reply.payload {
                Some(Payload::Typed(n)) => (Some(n.type_name().to_string()), Value::Object(mapper.to_raw(n))),
                Some(Payload::Raw(v)) => (None, v.clone()),
                None => (None, Value::Null),
            };
            match cli.output {
                Output::Human => {
                    println!("code: {}", reply.code);
                    println!("typed: {}", typed.as_deref().unwrap_or("no"));
                    print!("{}", serde_yaml::to_string(&body)?);
                }
                other => emit(other, &serde_json::json!({"code": reply.code, "typed": typed, "payload": body}))?,
            }
        }
    }
    Ok(())
}

fn read_documents(mapper: &Mapper<'_>, path: &Path) -> Result<Vec<TypedNode>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
    let nodes = if is_json {
        vec![mapper.from_json_str(&text).with_context(|| format!("mapping {}", path.display()))?]
    } else {
        mapper.from_yaml_str(&text).with_context(|| format!("mapping {}", path.display()))?
    };
    Ok(nodes)
}

fn first_document(mapper: &Mapper<'_>, path: &Path) -> Result<TypedNode> {
    read_documents(mapper, path)?.into_iter().next().ok_or_else(|| anyhow!("{} holds no documents", path.display()))
}

/// Undeclared keys anywhere in the tree, as host field names.
fn unknown_keys(node: &TypedNode, translate: bool) -> Vec<String> {
    let mut out = Vec::new();
    collect_unknown(node, translate, &mut out);
    out
}

fn collect_unknown(node: &TypedNode, translate: bool, out: &mut Vec<String>) {
    for key in node.extras().keys() {
        // remembered nulls of declared fields are not unknown
        if node.descriptor().field_by_key(key, translate).is_none() {
            out.push(if translate { wire_to_host(key) } else { key.clone() });
        }
    }
    for (_, value) in node.fields() {
        unknown_in_value(value, translate, out);
    }
}

fn unknown_in_value(value: &kmodel_core::TypedValue, translate: bool, out: &mut Vec<String>) {
    use kmodel_core::TypedValue as V;
    match value {
        V::Node(n) => collect_unknown(n, translate, out),
        V::Seq(items) => items.iter().for_each(|v| unknown_in_value(v, translate, out)),
        V::Map(m) => m.values().for_each(|v| unknown_in_value(v, translate, out)),
        _ => {}
    }
}

fn emit(output: Output, value: &Value) -> Result<()> {
    match output {
        Output::Json => println!("{}", serde_json::to_string_pretty(value)?),
        Output::Human | Output::Yaml => print!("{}", serde_yaml::to_string(value)?),
    }
    Ok(())
}

fn emit_documents(output: Output, docs: Vec<Value>) -> Result<()> {
    match output {
        Output::Json if docs.len() == 1 => emit(output, &docs[0]),
        Output::Json => emit(output, &Value::Array(docs)),
        _ => {
            for (i, d) in docs.iter().enumerate() {
                if i > 0 {
                    println!("---");
                }
                emit(output, d)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["kmodelctl", "-o", "json", "convert", "pod.yaml", "--no-translate"]).unwrap();
        assert_eq!(cli.output, Output::Json);
        assert!(matches!(cli.command, Commands::Convert { no_translate: true, include_empty: false, .. }));

        let cli = Cli::try_parse_from(["kmodelctl", "reply", "r.json", "--typed-codes", "200,202"]).unwrap();
        match cli.command {
            Commands::Reply { typed_codes, code, .. } => {
                assert_eq!(typed_codes, vec![200, 202]);
                assert_eq!(code, 200);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn counts_nested_unknown_keys() {
        let registry = kmodel_schema::release_1_19().unwrap();
        let mapper = Mapper::new(registry);
        let node = mapper
            .from_value(&serde_json::json!({
                "apiVersion": "v1",
                "kind": "ConfigMap",
                "metadata": {"name": "c", "creationTimestamp": null, "zoneName": "a"},
                "extraField": 1
            }))
            .unwrap();
        assert_eq!(unknown_keys(&node, true), vec!["extra_field", "zone_name"]);
    }

    #[test]
    fn untranslated_reply_payloads_keep_host_keys() {
        let registry = kmodel_schema::release_1_19().unwrap();
        let payload = serde_json::json!({
            "api_version": "v1",
            "kind": "Service",
            "metadata": {"name": "s"},
            "spec": {"cluster_ip": "10.0.0.1"}
        });
        let response = Response::builder(Arc::new(RegistryTranslator::new(registry)))
            .typed_codes([200])
            .translate_keys(false)
            .immediate(RawReply::new(payload.clone(), 200, Headers::new()))
            .unwrap();
        let node = response.typed().unwrap();
        let mapper = Mapper::with_options(registry, MapOptions::default().translate(false));
        assert_eq!(Value::Object(mapper.to_raw(node)), payload);
    }
}
