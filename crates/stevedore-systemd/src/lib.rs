//! # stevedore-systemd
//!
//! Transformer for the systemd unit schema.
//!
//! Each service becomes one unit with `Unit`, `Service`, and `Install`
//! sections; the container image, name, ports, and command travel in a
//! `docker run`-style `ExecStart` line, and the image is additionally
//! recorded under the `X-ContainerImage` extension key so units can be
//! ingested back. Units without that key are rejected: they do not
//! describe a container.

pub mod codecs;
pub mod unit;

use stevedore_common::constants::{UNIT_EXTENSION, UNIT_IMAGE_KEY};
use stevedore_common::error::{Result, StevedoreError};
use stevedore_common::types::Format;
use stevedore_core::codec::CodecRegistry;
use stevedore_core::command::{join_tokens, split_tokens};
use stevedore_core::model::{CanonicalService, CanonicalSystem};
use stevedore_core::transform::{Transformer, ingest_fields};
use stevedore_core::value::{Value, ValueMap};

const DOCKER_BIN: &str = "/usr/bin/docker";

/// Transformer for systemd unit documents.
#[derive(Debug)]
pub struct SystemdTransformer {
    registry: CodecRegistry,
}

impl SystemdTransformer {
    /// Creates a systemd transformer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: codecs::registry(),
        }
    }

    fn ingest_unit(
        &self,
        unit_name: &str,
        unit: &Value,
        system: &mut CanonicalSystem,
    ) -> Result<()> {
        let sections = unit.as_mapping().ok_or_else(|| {
            StevedoreError::unsupported(format!("unit \"{unit_name}\" is not a mapping"))
        })?;
        let service_section = sections
            .get("Service")
            .and_then(Value::as_mapping)
            .ok_or_else(|| {
                StevedoreError::unsupported(format!(
                    "missing [Service] section in \"{unit_name}\""
                ))
            })?;
        let image = service_section
            .get(UNIT_IMAGE_KEY)
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| {
                StevedoreError::unsupported(format!(
                    "unit \"{unit_name}\" carries no {UNIT_IMAGE_KEY} key"
                ))
            })?;

        let mut directives = service_section.clone();
        let exec_start = directives.remove("ExecStart");
        let _ = directives.remove("ExecStop");
        let _ = directives.remove(UNIT_IMAGE_KEY);

        let mut service = ingest_fields(&self.registry, &directives)?;
        service.image = Some(image.clone());
        if let Some(exec) = exec_start.as_ref().and_then(Value::as_str) {
            parse_exec_start(exec, &image, &mut service, system)?;
        }
        if service.name.is_none() {
            service.name = Some(unit_name.trim_end_matches(UNIT_EXTENSION).to_owned());
        }
        system.services.push(service);
        Ok(())
    }

    fn emit_unit(&self, service: &CanonicalService, system: &CanonicalSystem) -> Result<Value> {
        let name = service
            .name
            .as_deref()
            .ok_or_else(|| StevedoreError::unsupported("cannot emit a unit without a name"))?;
        let image = service.image.as_deref().ok_or_else(|| {
            StevedoreError::unsupported(format!(
                "cannot emit a unit for \"{name}\" without an image"
            ))
        })?;

        let mut service_section = ValueMap::new();
        for field in ["cpu", "memory", "environment"] {
            let Some(value) = service.get(field) else {
                continue;
            };
            if let Some((foreign, emit)) = self
                .registry
                .by_canonical(field)
                .and_then(|codec| codec.emit.map(|emit| (codec.foreign, emit)))
            {
                service_section.insert(foreign, emit(&value));
            }
        }
        for field in ["essential", "entrypoint", "links"] {
            if service.get(field).is_some() {
                tracing::warn!(field, "systemd schema has no codec; field dropped");
            }
        }
        for key in service.extra.keys() {
            tracing::warn!(field = %key, "systemd schema does not claim field; dropped");
        }

        service_section.insert(
            "ExecStart",
            Value::String(build_exec_start(service, system, name, image)),
        );
        service_section.insert("ExecStop", Value::String(format!("{DOCKER_BIN} stop {name}")));
        service_section.insert(UNIT_IMAGE_KEY, Value::from(image));

        let mut unit_section = ValueMap::new();
        unit_section.insert("Description", Value::String(format!("{name} container")));
        unit_section.insert("After", Value::from("docker.service"));
        unit_section.insert("Requires", Value::from("docker.service"));

        let mut install_section = ValueMap::new();
        install_section.insert("WantedBy", Value::from("multi-user.target"));

        let mut sections = ValueMap::new();
        sections.insert("Unit", Value::Mapping(unit_section));
        sections.insert("Service", Value::Mapping(service_section));
        sections.insert("Install", Value::Mapping(install_section));
        Ok(Value::Mapping(sections))
    }
}

impl Default for SystemdTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl Transformer for SystemdTransformer {
    fn format(&self) -> Format {
        Format::Systemd
    }

    fn registry(&self) -> &CodecRegistry {
        &self.registry
    }

    fn ingest(&self, doc: &Value) -> Result<CanonicalSystem> {
        let units = doc
            .as_mapping()
            .ok_or_else(|| StevedoreError::unsupported("unit document is not a mapping"))?;
        let mut system = CanonicalSystem::default();
        for (unit_name, unit) in units.iter() {
            self.ingest_unit(unit_name, unit, &mut system)?;
        }
        tracing::info!(services = system.services.len(), "ingested unit document");
        Ok(system)
    }

    fn emit(&self, system: &CanonicalSystem) -> Result<Value> {
        if !system.volumes.is_empty() {
            tracing::warn!(
                volumes = system.volumes.len(),
                "systemd schema has no named-volume counterpart; dropped"
            );
        }
        let mut units = ValueMap::new();
        for service in &system.services {
            let sections = self.emit_unit(service, system)?;
            let name = service.name.as_deref().unwrap_or_default();
            units.insert(format!("{name}{UNIT_EXTENSION}"), sections);
        }
        Ok(Value::Mapping(units))
    }

    fn serialize(&self, doc: &Value) -> Result<String> {
        unit::render_units(doc)
    }
}

fn parse_port_spec(spec: &str) -> Option<Value> {
    let (host, container) = match spec.split_once(':') {
        Some((host, container)) => (Some(host), container),
        None => (None, spec),
    };
    let mut port = ValueMap::new();
    port.insert("container", Value::Integer(container.parse().ok()?));
    if let Some(host) = host {
        port.insert("host", Value::Integer(host.parse().ok()?));
    }
    Some(Value::Mapping(port))
}

/// Reads name, ports, network mode, and the trailing command back out of
/// a `docker run`-style `ExecStart` line. The image token marks where
/// the command begins.
fn parse_exec_start(
    exec: &str,
    image: &str,
    service: &mut CanonicalService,
    system: &mut CanonicalSystem,
) -> Result<()> {
    let tokens = split_tokens(exec);
    let image_pos = tokens.iter().position(|t| t == image);
    let scan_end = image_pos.unwrap_or(tokens.len());

    let mut ports = Vec::new();
    let mut i = 0;
    while i < scan_end {
        match tokens[i].as_str() {
            "--name" if i + 1 < scan_end => {
                service.name = Some(tokens[i + 1].clone());
                i += 2;
            }
            "--net" | "--network" if i + 1 < scan_end => {
                if system.network_mode.is_none() {
                    system.network_mode = Some(tokens[i + 1].clone());
                }
                i += 2;
            }
            "-p" if i + 1 < scan_end => {
                let port = parse_port_spec(&tokens[i + 1]).ok_or_else(|| {
                    StevedoreError::malformed("ports", &Value::from(tokens[i + 1].as_str()))
                })?;
                ports.push(port);
                i += 2;
            }
            _ => i += 1,
        }
    }
    if !ports.is_empty() {
        service.ports = Some(Value::Sequence(ports));
    }
    if let Some(pos) = image_pos {
        let command = &tokens[pos + 1..];
        if !command.is_empty() {
            service.command = Some(join_tokens(command));
        }
    }
    Ok(())
}

fn build_exec_start(
    service: &CanonicalService,
    system: &CanonicalSystem,
    name: &str,
    image: &str,
) -> String {
    let mut tokens: Vec<String> = vec![
        DOCKER_BIN.to_owned(),
        "run".to_owned(),
        "--rm".to_owned(),
        "--name".to_owned(),
        name.to_owned(),
    ];
    if let Some(mode) = &system.network_mode {
        tokens.push("--net".to_owned());
        tokens.push(mode.clone());
    }
    if let Some(ports) = service.ports.as_ref().and_then(Value::as_sequence) {
        for port in ports.iter().filter_map(Value::as_mapping) {
            let Some(container) = port.get("container").and_then(Value::as_integer) else {
                continue;
            };
            let spec = match port.get("host").and_then(Value::as_integer) {
                Some(host) => format!("{host}:{container}"),
                None => container.to_string(),
            };
            tokens.push("-p".to_owned());
            tokens.push(spec);
        }
    }
    tokens.push(image.to_owned());

    let mut exec = join_tokens(&tokens);
    if let Some(command) = &service.command {
        if !command.is_empty() {
            exec.push(' ');
            exec.push_str(command);
        }
    }
    exec
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_service() -> CanonicalService {
        let mut service = CanonicalService::default();
        service.name = Some("api".into());
        service.image = Some("nginx:latest".into());
        service.cpu = Some(512);
        service.memory = Some(128);
        service.command = Some("nginx -g 'daemon off;'".into());
        service
    }

    #[test]
    fn emit_builds_a_complete_unit() {
        let transformer = SystemdTransformer::new();
        let system = CanonicalSystem::from_services(vec![sample_service()]);
        let doc = transformer.emit(&system).expect("emit");
        let output = transformer.serialize(&doc).expect("serialize");

        let expected = concat!(
            "# unit: api.service\n",
            "[Unit]\n",
            "After=docker.service\n",
            "Description=api container\n",
            "Requires=docker.service\n",
            "\n",
            "[Service]\n",
            "CPUShares=512\n",
            "ExecStart=/usr/bin/docker run --rm --name api nginx:latest nginx -g 'daemon off;'\n",
            "ExecStop=/usr/bin/docker stop api\n",
            "MemoryLimit=128M\n",
            "X-ContainerImage=nginx:latest\n",
            "\n",
            "[Install]\n",
            "WantedBy=multi-user.target",
        );
        assert_eq!(output, expected);
    }

    #[test]
    fn emit_then_ingest_round_trips_the_service() {
        let transformer = SystemdTransformer::new();
        let mut original = sample_service();
        let mut ports = ValueMap::new();
        ports.insert("container", Value::Integer(80));
        ports.insert("host", Value::Integer(8080));
        original.ports = Some(Value::Sequence(vec![Value::Mapping(ports)]));
        let system = CanonicalSystem::from_services(vec![original.clone()]);

        let doc = transformer.emit(&system).expect("emit");
        let back = transformer.ingest(&doc).expect("ingest");
        let service = &back.services[0];
        assert_eq!(service.name, original.name);
        assert_eq!(service.image, original.image);
        assert_eq!(service.cpu, original.cpu);
        assert_eq!(service.memory, original.memory);
        assert_eq!(service.command, original.command);
        assert_eq!(service.ports, original.ports);
    }

    #[test]
    fn ingest_requires_the_image_extension_key() {
        let transformer = SystemdTransformer::new();
        let mut service_section = ValueMap::new();
        service_section.insert("ExecStart", Value::from("/bin/true"));
        let mut sections = ValueMap::new();
        sections.insert("Service", Value::Mapping(service_section));
        let mut units = ValueMap::new();
        units.insert("plain.service", Value::Mapping(sections));

        let err = transformer.ingest(&Value::Mapping(units)).unwrap_err();
        assert!(matches!(err, StevedoreError::UnsupportedDocument { .. }));
    }

    #[test]
    fn ingest_requires_a_service_section() {
        let transformer = SystemdTransformer::new();
        let mut units = ValueMap::new();
        units.insert("empty.service", Value::Mapping(ValueMap::new()));
        let err = transformer.ingest(&Value::Mapping(units)).unwrap_err();
        assert!(matches!(err, StevedoreError::UnsupportedDocument { .. }));
    }

    #[test]
    fn network_mode_travels_through_the_net_flag() {
        let transformer = SystemdTransformer::new();
        let mut system = CanonicalSystem::from_services(vec![sample_service()]);
        system.network_mode = Some("host".into());

        let doc = transformer.emit(&system).expect("emit");
        let back = transformer.ingest(&doc).expect("ingest");
        assert_eq!(back.network_mode.as_deref(), Some("host"));
    }

    #[test]
    fn unknown_directives_land_in_the_extra_bucket() {
        let transformer = SystemdTransformer::new();
        let mut service_section = ValueMap::new();
        service_section.insert("X-ContainerImage", Value::from("redis"));
        service_section.insert("Restart", Value::from("always"));
        let mut sections = ValueMap::new();
        sections.insert("Service", Value::Mapping(service_section));
        let mut units = ValueMap::new();
        units.insert("cache.service", Value::Mapping(sections));

        let system = transformer.ingest(&Value::Mapping(units)).expect("ingest");
        assert_eq!(
            system.services[0].extra.get("Restart"),
            Some(&Value::from("always"))
        );
        assert_eq!(system.services[0].name.as_deref(), Some("cache"));
    }
}
