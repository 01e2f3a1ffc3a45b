//! Transformer selection, text decoding, and the conversion pipeline.
//!
//! The core works on in-memory trees; parsing text into a tree (YAML,
//! JSON, unit file) happens here.

use stevedore_common::config::ConvertConfig;
use stevedore_common::error::{Result, StevedoreError};
use stevedore_common::types::Format;
use stevedore_compose::ComposeTransformer;
use stevedore_core::ident::IdGenerator;
use stevedore_core::transform::{Transformer, convert};
use stevedore_core::value::Value;
use stevedore_ecs::EcsTransformer;
use stevedore_systemd::SystemdTransformer;

/// Builds the transformer registered for a format.
fn transformer_for(format: Format, family: Option<&str>) -> Box<dyn Transformer> {
    match format {
        Format::Compose => Box::new(ComposeTransformer::new()),
        Format::Ecs => {
            let transformer = EcsTransformer::new();
            Box::new(match family {
                Some(family) => transformer.with_family(family),
                None => transformer,
            })
        }
        Format::Systemd => Box::new(SystemdTransformer::new()),
    }
}

/// Decodes source text into the in-memory tree the given schema's
/// transformer expects.
fn decode(format: Format, text: &str) -> Result<Value> {
    let tree = match format {
        Format::Compose => {
            let raw: serde_yaml::Value =
                serde_yaml::from_str(text).map_err(|err| StevedoreError::Serialization {
                    message: err.to_string(),
                })?;
            Value::from_yaml(&raw)?
        }
        Format::Ecs => {
            let raw: serde_json::Value = serde_json::from_str(text)?;
            Value::from_json(&raw)?
        }
        Format::Systemd => Some(stevedore_systemd::unit::parse_units(text)?),
    };
    tree.ok_or_else(|| StevedoreError::unsupported("source document is empty"))
}

/// Runs one conversion: decode, ingest, validate, emit, serialize.
///
/// # Errors
///
/// Propagates decoding, structural, field-level, and serialization
/// errors from the phases.
pub fn run(config: &ConvertConfig, text: &str, ids: &dyn IdGenerator) -> Result<String> {
    let source = transformer_for(config.input_format, None);
    let destination = transformer_for(config.output_format, config.family.as_deref());
    let doc = decode(config.input_format, text)?;
    convert(source.as_ref(), destination.as_ref(), &doc, ids)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use stevedore_core::ident::{FixedIdGenerator, UuidGenerator};

    use super::*;

    const COMPOSE: &str = concat!(
        "services:\n",
        "  db:\n",
        "    image: postgres:9.3\n",
        "    cpu_shares: 200\n",
        "    mem_limit: 40m\n",
    );

    fn config(from: Format, to: Format) -> ConvertConfig {
        ConvertConfig::new(from, to)
    }

    #[test]
    fn compose_to_ecs_is_byte_stable() {
        let output = run(&config(Format::Compose, Format::Ecs), COMPOSE, &UuidGenerator)
            .expect("convert");
        let expected = concat!(
            "{\n",
            "    \"containerDefinitions\": [\n",
            "        {\n",
            "            \"cpu\": 200,\n",
            "            \"image\": \"postgres:9.3\",\n",
            "            \"memory\": 40,\n",
            "            \"name\": \"db\"\n",
            "        }\n",
            "    ],\n",
            "    \"family\": \"pythonapp\",\n",
            "    \"volumes\": []\n",
            "}",
        );
        assert_eq!(output, expected);

        let again = run(&config(Format::Compose, Format::Ecs), COMPOSE, &UuidGenerator)
            .expect("convert again");
        assert_eq!(again, output);
    }

    #[test]
    fn family_override_reaches_the_ecs_emitter() {
        let output = run(
            &config(Format::Compose, Format::Ecs).with_family("webapp"),
            COMPOSE,
            &UuidGenerator,
        )
        .expect("convert");
        assert!(output.contains("\"family\": \"webapp\""));
    }

    #[test]
    fn ecs_to_compose_round_trips_the_fields() {
        let task = concat!(
            "{\n",
            "  \"containerDefinitions\": [\n",
            "    {\"name\": \"db\", \"image\": \"postgres:9.3\", \"cpu\": 200,\n",
            "     \"memory\": 40, \"essential\": true,\n",
            "     \"command\": [\"/bin/echo\", \"Hello world\"]}\n",
            "  ],\n",
            "  \"family\": \"sample\",\n",
            "  \"volumes\": []\n",
            "}\n",
        );
        let output =
            run(&config(Format::Ecs, Format::Compose), task, &UuidGenerator).expect("convert");
        let expected = concat!(
            "services:\n",
            "  db:\n",
            "    command: /bin/echo 'Hello world'\n",
            "    cpu_shares: 200\n",
            "    image: postgres:9.3\n",
            "    mem_limit: 40m",
        );
        assert_eq!(output, expected);
    }

    #[test]
    fn compose_to_systemd_produces_units() {
        let output = run(&config(Format::Compose, Format::Systemd), COMPOSE, &UuidGenerator)
            .expect("convert");
        assert!(output.starts_with("# unit: db.service\n[Unit]\n"));
        assert!(output.contains("X-ContainerImage=postgres:9.3"));
        assert!(output.contains("MemoryLimit=40M"));
    }

    #[test]
    fn unnamed_services_get_generated_names() {
        let task = concat!(
            "{\"containerDefinitions\": [",
            "{\"image\": \"postgres:9.3\", \"cpu\": 200}",
            "]}\n",
        );
        let ids = FixedIdGenerator::new("2e9c3538-b9d3-4f47-8a23-2a19315b370b");
        let output = run(&config(Format::Ecs, Format::Compose), task, &ids).expect("convert");
        assert!(output.contains("2e9c3538-b9d3-4f47-8a23-2a19315b370b:\n"));
    }

    #[test]
    fn malformed_fields_abort_the_conversion() {
        let bad = "services:\n  db:\n    image: postgres:9.3\n    cpu_shares: lots\n";
        let err = run(&config(Format::Compose, Format::Ecs), bad, &UuidGenerator).unwrap_err();
        assert!(matches!(err, StevedoreError::MalformedField { .. }));
    }

    #[test]
    fn wrong_envelope_aborts_the_conversion() {
        let err = run(&config(Format::Ecs, Format::Compose), "{}", &UuidGenerator).unwrap_err();
        assert!(matches!(err, StevedoreError::UnsupportedDocument { .. }));
    }

    #[test]
    fn converts_a_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(COMPOSE.as_bytes()).expect("write");
        let text = std::fs::read_to_string(file.path()).expect("read back");
        let output =
            run(&config(Format::Compose, Format::Ecs), &text, &UuidGenerator).expect("convert");
        assert!(output.contains("\"family\": \"pythonapp\""));
    }
}
