//! Field codecs for the ECS task-definition schema.
//!
//! ECS shares the canonical CPU/memory units, so numeric fields are
//! identity. Commands are native token lists and convert through the
//! shared tokenizer; environment variables use the `[{name, value}]`
//! shape.

use stevedore_common::error::{Result, StevedoreError};
use stevedore_core::codec::{CodecRegistry, FieldCodec};
use stevedore_core::command::{join_tokens, split_tokens};
use stevedore_core::value::{Value, ValueMap};

/// Builds the ECS codec table.
#[must_use]
pub fn registry() -> CodecRegistry {
    CodecRegistry::new()
        .register(FieldCodec::identity("name", "name"))
        .register(FieldCodec::identity("image", "image"))
        .register(FieldCodec::identity("cpu", "cpu"))
        .register(FieldCodec::identity("memory", "memory"))
        .register(FieldCodec::identity("essential", "essential"))
        .register(FieldCodec::identity("links", "links"))
        .register(FieldCodec::new("command", "command", ingest_command, emit_command))
        .register(FieldCodec::new(
            "entrypoint",
            "entryPoint",
            ingest_command,
            emit_command,
        ))
        .register(FieldCodec::new(
            "environment",
            "environment",
            ingest_environment,
            emit_environment,
        ))
        .register(FieldCodec::new(
            "ports",
            "portMappings",
            ingest_ports,
            emit_ports,
        ))
}

/// ECS commands are argv token lists; the canonical form is one printable
/// string, so single tokens containing spaces are quoted on the way in.
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

/// Splits the canonical command string back into ECS's token list,
/// respecting quoted spans.
fn emit_command(value: &Value) -> Value {
    let command = value.as_str().unwrap_or_default();
    Value::Sequence(
        split_tokens(command)
            .into_iter()
            .map(Value::String)
            .collect(),
    )
}

/// `[{name, value}]` pairs become the canonical name-to-value mapping.
fn ingest_environment(value: Value) -> Result<Value> {
    let Value::Sequence(items) = value else {
        return Err(StevedoreError::malformed("environment", &value));
    };
    let mut env = ValueMap::new();
    for item in items {
        let pair = item
            .as_mapping()
            .ok_or_else(|| StevedoreError::malformed("environment", &item))?;
        let name = pair
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| StevedoreError::malformed("environment", &item))?;
        let raw = pair
            .get("value")
            .ok_or_else(|| StevedoreError::malformed("environment", &item))?;
        env.insert(name, Value::String(stringify(raw)));
    }
    Ok(Value::Mapping(env))
}

/// The canonical mapping becomes `[{name, value}]` pairs, sorted by name
/// for deterministic output.
fn emit_environment(value: &Value) -> Value {
    let Some(env) = value.as_mapping() else {
        return value.clone();
    };
    Value::Sequence(
        env.sorted_entries()
            .into_iter()
            .map(|(name, val)| {
                let mut pair = ValueMap::new();
                pair.insert("name", Value::from(name));
                pair.insert("value", Value::String(stringify(val)));
                Value::Mapping(pair)
            })
            .collect(),
    )
}

/// `[{containerPort, hostPort?}]` becomes the canonical
/// `[{container, host?}]` shape.
fn ingest_ports(value: Value) -> Result<Value> {
    let Value::Sequence(items) = value else {
        return Err(StevedoreError::malformed("ports", &value));
    };
    let mut ports = Vec::with_capacity(items.len());
    for item in items {
        let mapping = item
            .as_mapping()
            .ok_or_else(|| StevedoreError::malformed("ports", &item))?;
        let container = mapping
            .get("containerPort")
            .and_then(Value::as_integer)
            .ok_or_else(|| StevedoreError::malformed("ports", &item))?;
        let mut port = ValueMap::new();
        port.insert("container", Value::Integer(container));
        if let Some(host) = mapping.get("hostPort").and_then(Value::as_integer) {
            port.insert("host", Value::Integer(host));
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
            .map(|port| {
                let mut mapping = ValueMap::new();
                if let Some(container) = port.get("container").and_then(Value::as_integer) {
                    mapping.insert("containerPort", Value::Integer(container));
                }
                if let Some(host) = port.get("host").and_then(Value::as_integer) {
                    mapping.insert("hostPort", Value::Integer(host));
                }
                Value::Mapping(mapping)
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
