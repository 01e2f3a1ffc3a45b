//! Field codecs for the systemd unit schema.
//!
//! Only the directive-shaped fields live in the table; name, image,
//! command, and ports travel inside the assembled `ExecStart` line and
//! are handled by the transformer's envelope code.

use stevedore_common::error::{Result, StevedoreError};
use stevedore_core::codec::{CodecRegistry, FieldCodec};
use stevedore_core::command::split_with_quote;
use stevedore_core::value::{Value, ValueMap};

/// Builds the systemd codec table.
#[must_use]
pub fn registry() -> CodecRegistry {
    CodecRegistry::new()
        .register(FieldCodec::new("cpu", "CPUShares", ingest_cpu, emit_cpu))
        .register(FieldCodec::new(
            "memory",
            "MemoryLimit",
            ingest_memory,
            emit_memory,
        ))
        .register(FieldCodec::new(
            "environment",
            "Environment",
            ingest_environment,
            emit_environment,
        ))
}

/// Directive values are strings; `CPUShares=512` carries a bare integer.
fn ingest_cpu(value: Value) -> Result<Value> {
    match &value {
        Value::Integer(n) => Ok(Value::Integer(*n)),
        Value::String(raw) => raw
            .trim()
            .parse()
            .map(Value::Integer)
            .map_err(|_| StevedoreError::malformed("cpu", &value)),
        _ => Err(StevedoreError::malformed("cpu", &value)),
    }
}

fn emit_cpu(value: &Value) -> Value {
    match value {
        Value::Integer(n) => Value::String(n.to_string()),
        other => other.clone(),
    }
}

/// `MemoryLimit` carries a byte count with an optional `K`/`M`/`G`
/// suffix; the canonical unit is MB.
fn ingest_memory(value: Value) -> Result<Value> {
    let Value::String(raw) = &value else {
        return Err(StevedoreError::malformed("memory", &value));
    };
    let trimmed = raw.trim();
    let (digits, unit) = match trimmed.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&trimmed[..idx], c.to_ascii_uppercase()),
        _ => (trimmed, 'B'),
    };
    let amount: i64 = digits
        .trim()
        .parse()
        .map_err(|_| StevedoreError::malformed("memory", &value))?;
    let mb = match unit {
        'B' => std::cmp::max(amount / (1024 * 1024), i64::from(amount > 0)),
        'K' => std::cmp::max(amount / 1024, i64::from(amount > 0)),
        'M' => amount,
        'G' => amount * 1024,
        _ => return Err(StevedoreError::malformed("memory", &value)),
    };
    Ok(Value::Integer(mb))
}

fn emit_memory(value: &Value) -> Value {
    match value {
        Value::Integer(mb) => Value::String(format!("{mb}M")),
        other => other.clone(),
    }
}

/// `Environment="A=1" "B=2"`: double-quoted assignments separated by
/// spaces; bare single assignments are also accepted.
fn ingest_environment(value: Value) -> Result<Value> {
    let Value::String(raw) = &value else {
        return Err(StevedoreError::malformed("environment", &value));
    };
    let mut env = ValueMap::new();
    for assignment in split_with_quote(raw, '"') {
        let (name, val) = assignment
            .split_once('=')
            .ok_or_else(|| StevedoreError::malformed("environment", &value))?;
        env.insert(name, Value::from(val));
    }
    Ok(Value::Mapping(env))
}

fn emit_environment(value: &Value) -> Value {
    let Some(env) = value.as_mapping() else {
        return value.clone();
    };
    let line = env
        .sorted_entries()
        .into_iter()
        .map(|(name, val)| {
            let val = val.as_str().map_or_else(|| val.to_string(), str::to_owned);
            format!("\"{name}={val}\"")
        })
        .collect::<Vec<_>>()
        .join(" ");
    Value::String(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_parses_directive_strings() {
        assert_eq!(
            ingest_cpu(Value::from("512")).expect("ingest"),
            Value::Integer(512)
        );
        assert_eq!(emit_cpu(&Value::Integer(512)), Value::from("512"));
    }

    #[test]
    fn memory_suffixes_normalize_to_mb() {
        assert_eq!(
            ingest_memory(Value::from("128M")).expect("M"),
            Value::Integer(128)
        );
        assert_eq!(
            ingest_memory(Value::from("1G")).expect("G"),
            Value::Integer(1024)
        );
        assert_eq!(
            ingest_memory(Value::from("2048K")).expect("K"),
            Value::Integer(2)
        );
    }

    #[test]
    fn memory_emits_with_suffix() {
        assert_eq!(emit_memory(&Value::Integer(128)), Value::from("128M"));
    }

    #[test]
    fn malformed_memory_fails_strictly() {
        assert!(ingest_memory(Value::from("heaps")).is_err());
    }

    #[test]
    fn environment_line_round_trips() {
        let ingested = ingest_environment(Value::from("\"A=1\" \"B=two words\"")).expect("ingest");
        let env = ingested.as_mapping().expect("mapping");
        assert_eq!(env.get("A"), Some(&Value::from("1")));
        assert_eq!(env.get("B"), Some(&Value::from("two words")));

        assert_eq!(
            emit_environment(&ingested),
            Value::from("\"A=1\" \"B=two words\"")
        );
    }

    #[test]
    fn bare_environment_assignment_is_accepted() {
        let ingested = ingest_environment(Value::from("MODE=prod")).expect("ingest");
        assert_eq!(
            ingested.as_mapping().expect("mapping").get("MODE"),
            Some(&Value::from("prod"))
        );
    }
}
