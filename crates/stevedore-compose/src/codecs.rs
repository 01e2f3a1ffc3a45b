//! Field codecs for the docker-compose schema.
//!
//! Compose CPU shares match the canonical unit; memory does not
//! (`mem_limit` carries a `b`/`k`/`m`/`g` suffix) and is normalized to
//! MB. Commands may be a string or a token list on ingest; environment
//! may be a mapping or a `K=V` list.

use stevedore_common::error::{Result, StevedoreError};
use stevedore_core::codec::{CodecRegistry, FieldCodec};
use stevedore_core::command::join_tokens;
use stevedore_core::value::{Value, ValueMap};

const BYTES_PER_MB: i64 = 1024 * 1024;

/// Builds the compose codec table.
///
/// A compose service's primary name is its key in the `services` mapping
/// (envelope code), but an explicit `container_name` takes precedence.
/// `essential` has no entry; compose cannot express it and the field is
/// dropped on emit.
#[must_use]
pub fn registry() -> CodecRegistry {
    CodecRegistry::new()
        .register(FieldCodec::identity("name", "container_name"))
        .register(FieldCodec::identity("image", "image"))
        .register(FieldCodec::identity("cpu", "cpu_shares"))
        .register(FieldCodec::new("memory", "mem_limit", ingest_memory, emit_memory))
        .register(FieldCodec::identity("links", "links"))
        .register(FieldCodec::new("command", "command", ingest_command, emit_command))
        .register(FieldCodec::new(
            "entrypoint",
            "entrypoint",
            ingest_command,
            emit_command,
        ))
        .register(FieldCodec::new(
            "environment",
            "environment",
            ingest_environment,
            emit_environment,
        ))
        .register(FieldCodec::new("ports", "ports", ingest_ports, emit_ports))
}

/// `mem_limit` values: a bare integer is already MB; a string carries a
/// `b`/`k`/`m`/`g` suffix and is normalized (non-zero byte counts round
/// up to at least 1 MB).
fn ingest_memory(value: Value) -> Result<Value> {
    match &value {
        Value::Integer(mb) => Ok(Value::Integer(*mb)),
        Value::String(raw) => parse_memory(raw)
            .map(Value::Integer)
            .ok_or_else(|| StevedoreError::malformed("memory", &value)),
        _ => Err(StevedoreError::malformed("memory", &value)),
    }
}

fn parse_memory(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    let (digits, unit) = match trimmed.char_indices().last()? {
        (idx, c) if c.is_ascii_alphabetic() => (&trimmed[..idx], c.to_ascii_lowercase()),
        _ => (trimmed, 'm'),
    };
    let amount: i64 = digits.trim().parse().ok()?;
    let bytes = match unit {
        'b' => amount,
        'k' => amount * 1024,
        'm' => amount * BYTES_PER_MB,
        'g' => amount * 1024 * BYTES_PER_MB,
        _ => return None,
    };
    if bytes == 0 {
        Some(0)
    } else {
        Some(std::cmp::max(bytes / BYTES_PER_MB, 1))
    }
}

fn emit_memory(value: &Value) -> Value {
    match value {
        Value::Integer(mb) => Value::String(format!("{mb}m")),
        other => other.clone(),
    }
}

/// Compose commands are a string or a token list; the canonical form is
/// the string.
fn ingest_command(value: Value) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(s)),
        Value::Sequence(items) => {
            let tokens = items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_owned)
                        .ok_or_else(|| StevedoreError::malformed("command", item))
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::String(join_tokens(&tokens)))
        }
        other => Err(StevedoreError::malformed("command", &other)),
    }
}

fn emit_command(value: &Value) -> Value {
    value.clone()
}

/// Environment as a mapping (identity, values stringified) or a `K=V`
/// list.
fn ingest_environment(value: Value) -> Result<Value> {
    match &value {
        Value::Mapping(map) => {
            let mut env = ValueMap::new();
            for (name, val) in map.iter() {
                env.insert(name, Value::String(stringify(val)));
            }
            Ok(Value::Mapping(env))
        }
        Value::Sequence(items) => {
            let mut env = ValueMap::new();
            for item in items {
                let entry = item
                    .as_str()
                    .ok_or_else(|| StevedoreError::malformed("environment", item))?;
                let (name, val) = entry
                    .split_once('=')
                    .ok_or_else(|| StevedoreError::malformed("environment", item))?;
                env.insert(name, Value::from(val));
            }
            Ok(Value::Mapping(env))
        }
        _ => Err(StevedoreError::malformed("environment", &value)),
    }
}

/// The canonical mapping becomes a sorted `K=V` list.
fn emit_environment(value: &Value) -> Value {
    let Some(env) = value.as_mapping() else {
        return value.clone();
    };
    Value::Sequence(
        env.sorted_entries()
            .into_iter()
            .map(|(name, val)| Value::String(format!("{name}={}", stringify(val))))
            .collect(),
    )
}

/// Port strings (`"8080:80"`, `"80"`) or bare integers become the
/// canonical `[{container, host?}]` shape.
fn ingest_ports(value: Value) -> Result<Value> {
    let Value::Sequence(items) = value else {
        return Err(StevedoreError::malformed("ports", &value));
    };
    let mut ports = Vec::with_capacity(items.len());
    for item in items {
        let mut port = ValueMap::new();
        match &item {
            Value::Integer(container) => {
                port.insert("container", Value::Integer(*container));
            }
            Value::String(spec) => {
                let (host, container) = match spec.split_once(':') {
                    Some((host, container)) => (Some(host), container),
                    None => (None, spec.as_str()),
                };
                let container: i64 = container
                    .parse()
                    .map_err(|_| StevedoreError::malformed("ports", &item))?;
                port.insert("container", Value::Integer(container));
                if let Some(host) = host {
                    let host: i64 = host
                        .parse()
                        .map_err(|_| StevedoreError::malformed("ports", &item))?;
                    port.insert("host", Value::Integer(host));
                }
            }
            _ => return Err(StevedoreError::malformed("ports", &item)),
        }
        ports.push(Value::Mapping(port));
    }
    Ok(Value::Sequence(ports))
}

fn emit_ports(value: &Value) -> Value {
    let Some(items) = value.as_sequence() else {
        return value.clone();
    };
    Value::Sequence(
        items
            .iter()
            .filter_map(Value::as_mapping)
            .filter_map(|port| {
                let container = port.get("container").and_then(Value::as_integer)?;
                let spec = match port.get("host").and_then(Value::as_integer) {
                    Some(host) => format!("{host}:{container}"),
                    None => container.to_string(),
                };
                Some(Value::String(spec))
            })
            .collect(),
    )
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Integer(n) => n.to_string(),
        Value::Boolean(b) => b.to_string(),
        other => other.to_string(),
    }
}
