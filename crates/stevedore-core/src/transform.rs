//! The transformer contract and conversion pipeline.
//!
//! A conversion run moves through three strictly ordered phases with no
//! backward transition: ingest (raw document to canonical services),
//! validate (normalization, name defaulting), emit (canonical services to
//! raw destination document plus deterministic text).

use stevedore_common::error::Result;
use stevedore_common::types::Format;

use crate::codec::CodecRegistry;
use crate::ident::IdGenerator;
use crate::model::{CanonicalService, CanonicalSystem};
use crate::value::{Value, ValueMap};

/// One concrete schema's implementation of the three conversion phases.
pub trait Transformer {
    /// The schema this transformer handles.
    fn format(&self) -> Format;

    /// The schema's field codec table.
    fn registry(&self) -> &CodecRegistry;

    /// Converts a raw document tree into canonical services plus system
    /// metadata.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedDocument` when the top-level shape does not
    /// match the schema's expected envelope, and `MalformedField` when a
    /// field's raw value has the wrong shape for its codec.
    fn ingest(&self, doc: &Value) -> Result<CanonicalSystem>;

    /// Returns a normalized copy of a service: fills `name` from the
    /// identifier generator when absent, plus any schema-specific
    /// required defaults. Never mutates its input, so repeated validation
    /// is idempotent given a fixed generator.
    fn validate(&self, service: &CanonicalService, ids: &dyn IdGenerator) -> CanonicalService {
        let mut normalized = service.clone();
        if normalized.name.as_deref().is_none_or(str::is_empty) {
            normalized.name = Some(ids.next_id());
        }
        normalized
    }

    /// Converts canonical services into a raw destination document tree,
    /// structurally complete per the destination schema.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedDocument` when the system cannot be expressed
    /// in the destination schema at all.
    fn emit(&self, system: &CanonicalSystem) -> Result<Value>;

    /// Renders an emitted document tree as deterministic text.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` when the underlying renderer fails.
    fn serialize(&self, doc: &Value) -> Result<String>;
}

/// Runs a full conversion: source ingest, destination validate per
/// service (order preserved), destination emit and serialize.
///
/// # Errors
///
/// Propagates structural, field-level, and serialization errors from the
/// phases; lossy field drops are logged, never errors.
pub fn convert(
    source: &dyn Transformer,
    destination: &dyn Transformer,
    doc: &Value,
    ids: &dyn IdGenerator,
) -> Result<String> {
    tracing::info!(
        from = %source.format(),
        to = %destination.format(),
        "starting conversion"
    );
    let mut system = source.ingest(doc)?;
    system.services = system
        .services
        .iter()
        .map(|service| destination.validate(service, ids))
        .collect();
    let tree = destination.emit(&system)?;
    destination.serialize(&tree)
}

/// Ingests one raw service mapping through a schema's codec table.
///
/// Foreign keys with a codec are converted and shape-checked into the
/// canonical fields; unknown keys pass unchanged into the `extra` bucket.
///
/// # Errors
///
/// Returns `MalformedField` when a claimed field's raw value has the
/// wrong shape.
pub fn ingest_fields(registry: &CodecRegistry, raw: &ValueMap) -> Result<CanonicalService> {
    let mut service = CanonicalService::default();
    for (key, value) in raw.iter() {
        match registry.by_foreign(key).and_then(|codec| {
            codec.ingest.map(|ingest| (codec.canonical, ingest))
        }) {
            Some((canonical, ingest)) => {
                let converted = ingest(value.clone())?;
                service.set(canonical, converted)?;
            }
            None => {
                tracing::debug!(field = key, "no ingest codec; carrying field as-is");
                let _ = service.extra.insert(key.to_owned(), value.clone());
            }
        }
    }
    Ok(service)
}

/// Emits one canonical service through a schema's codec table.
///
/// Fields with an emit codec appear under their foreign names; fields
/// without one are dropped, surfaced through the diagnostics channel
/// rather than an error. `extra` fields survive only when the destination
/// schema claims their key.
#[must_use]
pub fn emit_fields(registry: &CodecRegistry, service: &CanonicalService) -> ValueMap {
    let mut out = ValueMap::new();
    for field in CanonicalService::FIELDS {
        let Some(value) = service.get(field) else {
            continue;
        };
        match registry.by_canonical(field).and_then(|codec| {
            codec.emit.map(|emit| (codec.foreign, emit))
        }) {
            Some((foreign, emit)) => out.insert(foreign, emit(&value)),
            None => {
                tracing::warn!(field, "destination schema has no codec; field dropped");
            }
        }
    }
    for (key, value) in &service.extra {
        match registry.by_foreign(key).and_then(|codec| codec.emit) {
            Some(emit) => out.insert(key.clone(), emit(value)),
            None => {
                tracing::warn!(field = %key, "destination schema does not claim field; dropped");
            }
        }
    }
    out
}
