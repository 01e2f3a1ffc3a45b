//! # stevedore-compose
//!
//! Transformer for the docker-compose YAML schema.
//!
//! A compose service's name is its key in the `services` mapping, so the
//! envelope code carries it rather than a field codec; `container_name`
//! takes precedence when present. Service order follows the source
//! document. Output YAML is rendered with sorted keys.

pub mod codecs;

use stevedore_common::error::{Result, StevedoreError};
use stevedore_common::types::Format;
use stevedore_core::codec::CodecRegistry;
use stevedore_core::model::CanonicalSystem;
use stevedore_core::serialize::to_deterministic_yaml;
use stevedore_core::transform::{Transformer, emit_fields, ingest_fields};
use stevedore_core::value::{Value, ValueMap};

/// Transformer for docker-compose documents.
#[derive(Debug)]
pub struct ComposeTransformer {
    registry: CodecRegistry,
}

impl ComposeTransformer {
    /// Creates a compose transformer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: codecs::registry(),
        }
    }
}

impl Default for ComposeTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl Transformer for ComposeTransformer {
    fn format(&self) -> Format {
        Format::Compose
    }

    fn registry(&self) -> &CodecRegistry {
        &self.registry
    }

    fn ingest(&self, doc: &Value) -> Result<CanonicalSystem> {
        let envelope = doc
            .as_mapping()
            .ok_or_else(|| StevedoreError::unsupported("compose document is not a mapping"))?;
        let services = envelope
            .get("services")
            .and_then(Value::as_mapping)
            .ok_or_else(|| {
                StevedoreError::unsupported("missing top-level \"services\" mapping")
            })?;

        let mut system = CanonicalSystem::default();
        for (key, raw) in services.iter() {
            let mut raw = raw
                .as_mapping()
                .ok_or_else(|| {
                    StevedoreError::unsupported(format!("service \"{key}\" is not a mapping"))
                })?
                .clone();
            // network_mode is system-level in the canonical model; the
            // first one seen wins.
            if let Some(mode) = raw.remove("network_mode") {
                if system.network_mode.is_none() {
                    system.network_mode = mode.as_str().map(str::to_owned);
                }
            }
            let mut service = ingest_fields(&self.registry, &raw)?;
            if service.name.is_none() {
                service.name = Some(key.to_owned());
            }
            system.services.push(service);
        }

        if let Some(volumes) = envelope.get("volumes").and_then(Value::as_mapping) {
            for (name, _) in volumes.iter() {
                let _ = system.volumes.insert(name.to_owned());
            }
        }
        tracing::info!(services = system.services.len(), "ingested compose file");
        Ok(system)
    }

    fn emit(&self, system: &CanonicalSystem) -> Result<Value> {
        let mut services = ValueMap::new();
        for service in &system.services {
            let name = service.name.clone().ok_or_else(|| {
                StevedoreError::unsupported("cannot emit a service without a name")
            })?;
            let mut fields = emit_fields(&self.registry, service);
            // The services key already names the service; container_name
            // is only worth emitting when it differs.
            if fields.get("container_name").and_then(Value::as_str) == Some(name.as_str()) {
                let _ = fields.remove("container_name");
            }
            if let Some(mode) = &system.network_mode {
                fields.insert("network_mode", Value::from(mode.as_str()));
            }
            services.insert(name, Value::Mapping(fields));
        }

        let mut envelope = ValueMap::new();
        envelope.insert("services", Value::Mapping(services));
        if !system.volumes.is_empty() {
            let volumes: ValueMap = system
                .volumes
                .iter()
                .map(|name| (name.clone(), Value::Mapping(ValueMap::new())))
                .collect();
            envelope.insert("volumes", Value::Mapping(volumes));
        }
        Ok(Value::Mapping(envelope))
    }

    fn serialize(&self, doc: &Value) -> Result<String> {
        to_deterministic_yaml(doc)
    }
}
