//! # stevedore-ecs
//!
//! Transformer for the ECS task-definition JSON schema.
//!
//! The emitted envelope always carries `containerDefinitions`, `family`,
//! and `volumes` (empty or not); `networkMode` appears only when a
//! non-default mode was set upstream. Output is rendered with keys sorted
//! ascending and 4-space indentation so repeated runs are byte-identical.

pub mod codecs;

use stevedore_common::constants::DEFAULT_TASK_FAMILY;
use stevedore_common::error::{Result, StevedoreError};
use stevedore_common::types::Format;
use stevedore_core::codec::CodecRegistry;
use stevedore_core::model::{CanonicalService, CanonicalSystem};
use stevedore_core::serialize::to_deterministic_json;
use stevedore_core::transform::{Transformer, emit_fields, ingest_fields};
use stevedore_core::value::{Value, ValueMap};

/// Transformer for ECS task-definition documents.
#[derive(Debug)]
pub struct EcsTransformer {
    registry: CodecRegistry,
    family: String,
}

impl EcsTransformer {
    /// Creates a transformer with the default task family.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: codecs::registry(),
            family: DEFAULT_TASK_FAMILY.to_owned(),
        }
    }

    /// Overrides the task family written into emitted documents.
    #[must_use]
    pub fn with_family(mut self, family: impl Into<String>) -> Self {
        self.family = family.into();
        self
    }

    fn ingest_volumes(doc: &ValueMap, system: &mut CanonicalSystem) {
        let Some(volumes) = doc.get("volumes").and_then(Value::as_sequence) else {
            return;
        };
        for volume in volumes {
            let name = match volume {
                Value::String(name) => Some(name.clone()),
                Value::Mapping(map) => map.get("name").and_then(Value::as_str).map(str::to_owned),
                _ => None,
            };
            if let Some(name) = name {
                let _ = system.volumes.insert(name);
            }
        }
    }
}

impl Default for EcsTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl Transformer for EcsTransformer {
    fn format(&self) -> Format {
        Format::Ecs
    }

    fn registry(&self) -> &CodecRegistry {
        &self.registry
    }

    fn ingest(&self, doc: &Value) -> Result<CanonicalSystem> {
        let envelope = doc.as_mapping().ok_or_else(|| {
            StevedoreError::unsupported("task definition is not a JSON object")
        })?;
        let definitions = envelope
            .get("containerDefinitions")
            .and_then(Value::as_sequence)
            .ok_or_else(|| {
                StevedoreError::unsupported("missing top-level \"containerDefinitions\" array")
            })?;

        let mut system = CanonicalSystem::default();
        for definition in definitions {
            let raw = definition.as_mapping().ok_or_else(|| {
                StevedoreError::unsupported("container definition is not an object")
            })?;
            system.services.push(ingest_fields(&self.registry, raw)?);
        }
        system.network_mode = envelope
            .get("networkMode")
            .and_then(Value::as_str)
            .map(str::to_owned);
        Self::ingest_volumes(envelope, &mut system);
        tracing::info!(services = system.services.len(), "ingested task definition");
        Ok(system)
    }

    fn emit(&self, system: &CanonicalSystem) -> Result<Value> {
        let definitions: Vec<Value> = system
            .services
            .iter()
            .map(|service| Value::Mapping(emit_fields(&self.registry, service)))
            .collect();
        let volumes: Vec<Value> = system
            .volumes
            .iter()
            .map(|name| {
                let mut volume = ValueMap::new();
                volume.insert("name", Value::from(name.as_str()));
                Value::Mapping(volume)
            })
            .collect();

        let mut envelope = ValueMap::new();
        envelope.insert("containerDefinitions", Value::Sequence(definitions));
        envelope.insert("family", Value::from(self.family.as_str()));
        if let Some(mode) = &system.network_mode {
            envelope.insert("networkMode", Value::from(mode.as_str()));
        }
        envelope.insert("volumes", Value::Sequence(volumes));
        Ok(Value::Mapping(envelope))
    }

    fn serialize(&self, doc: &Value) -> Result<String> {
        to_deterministic_json(doc)
    }
}
