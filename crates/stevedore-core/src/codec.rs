//! Per-schema field codec registry.
//!
//! Each concrete schema builds one [`CodecRegistry`] at construction
//! time: a table keyed by canonical field name, each entry carrying the
//! schema's foreign key name and a pair of pure conversion functions.
//! "Field has no destination codec" is an explicit, testable lookup miss,
//! not reflection.
//!
//! Adding support for a new field in a schema means adding one registry
//! entry; orchestration code is untouched.

use stevedore_common::error::Result;

use crate::value::Value;

/// Converts a foreign raw value into its canonical form.
///
/// Must be pure. Fails with `MalformedField` when the raw value's shape
/// does not match the field's documented type.
pub type IngestFn = fn(Value) -> Result<Value>;

/// Converts a canonical value into its foreign form. Pure, infallible:
/// canonical values are already shape-checked.
pub type EmitFn = fn(&Value) -> Value;

/// One field's conversion contract for one schema.
#[derive(Clone, Copy)]
pub struct FieldCodec {
    /// Canonical field name this codec claims.
    pub canonical: &'static str,
    /// Key under which the field appears in the concrete schema.
    pub foreign: &'static str,
    /// Foreign-to-canonical conversion; `None` means the schema never
    /// supplies this field.
    pub ingest: Option<IngestFn>,
    /// Canonical-to-foreign conversion; `None` means the schema cannot
    /// represent this field and it is dropped on emit.
    pub emit: Option<EmitFn>,
}

impl FieldCodec {
    /// A codec with explicit conversions in both directions.
    #[must_use]
    pub const fn new(
        canonical: &'static str,
        foreign: &'static str,
        ingest: IngestFn,
        emit: EmitFn,
    ) -> Self {
        Self {
            canonical,
            foreign,
            ingest: Some(ingest),
            emit: Some(emit),
        }
    }

    /// An identity codec: the value passes through unchanged both ways,
    /// possibly under a different key.
    #[must_use]
    pub const fn identity(canonical: &'static str, foreign: &'static str) -> Self {
        Self::new(canonical, foreign, identity_ingest, identity_emit)
    }

    /// A codec the schema only emits (never ingests).
    #[must_use]
    pub const fn emit_only(canonical: &'static str, foreign: &'static str, emit: EmitFn) -> Self {
        Self {
            canonical,
            foreign,
            ingest: None,
            emit: Some(emit),
        }
    }
}

impl std::fmt::Debug for FieldCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldCodec")
            .field("canonical", &self.canonical)
            .field("foreign", &self.foreign)
            .field("ingest", &self.ingest.is_some())
            .field("emit", &self.emit.is_some())
            .finish()
    }
}

/// Identity ingest: the raw value is already canonical.
///
/// # Errors
///
/// Never fails; present to satisfy the [`IngestFn`] contract.
pub fn identity_ingest(value: Value) -> Result<Value> {
    Ok(value)
}

/// Identity emit: the canonical value is already foreign.
#[must_use]
pub fn identity_emit(value: &Value) -> Value {
    value.clone()
}

/// The codec table for one concrete schema.
#[derive(Debug, Default)]
pub struct CodecRegistry {
    codecs: Vec<FieldCodec>,
}

impl CodecRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self { codecs: Vec::new() }
    }

    /// Adds a codec to the table. Builder-style, used at transformer
    /// construction.
    #[must_use]
    pub fn register(mut self, codec: FieldCodec) -> Self {
        self.codecs.push(codec);
        self
    }

    /// Looks up a codec by canonical field name.
    #[must_use]
    pub fn by_canonical(&self, field: &str) -> Option<&FieldCodec> {
        self.codecs.iter().find(|c| c.canonical == field)
    }

    /// Looks up a codec by the schema's foreign key name.
    #[must_use]
    pub fn by_foreign(&self, key: &str) -> Option<&FieldCodec> {
        self.codecs.iter().find(|c| c.foreign == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn double(value: Value) -> Result<Value> {
        match value {
            Value::Integer(n) => Ok(Value::Integer(n * 2)),
            other => Ok(other),
        }
    }

    fn halve(value: &Value) -> Value {
        match value {
            Value::Integer(n) => Value::Integer(n / 2),
            other => other.clone(),
        }
    }

    #[test]
    fn registry_resolves_by_canonical_and_foreign_names() {
        let registry = CodecRegistry::new()
            .register(FieldCodec::identity("cpu", "cpu_shares"))
            .register(FieldCodec::new("memory", "mem_limit", double, halve));

        assert_eq!(
            registry.by_canonical("cpu").map(|c| c.foreign),
            Some("cpu_shares")
        );
        assert_eq!(
            registry.by_foreign("mem_limit").map(|c| c.canonical),
            Some("memory")
        );
        assert!(registry.by_canonical("essential").is_none());
    }

    #[test]
    fn identity_codec_passes_values_unchanged() {
        let codec = FieldCodec::identity("essential", "essential");
        let ingest = codec.ingest.expect("ingest");
        let emit = codec.emit.expect("emit");
        let value = Value::from("testing");
        assert_eq!(ingest(value.clone()).expect("identity"), value);
        assert_eq!(emit(&value), value);
    }

    #[test]
    fn missing_codec_is_an_explicit_lookup_miss() {
        let registry = CodecRegistry::new().register(FieldCodec::identity("image", "image"));
        assert!(registry.by_canonical("essential").is_none());
        assert!(registry.by_foreign("essential").is_none());
    }
}
