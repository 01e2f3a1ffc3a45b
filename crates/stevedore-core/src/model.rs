//! The canonical intermediate representation.
//!
//! Every conversion passes through [`CanonicalService`] and
//! [`CanonicalSystem`]. Instances are created fresh per run: populated
//! during ingest, normalized by validate, read-only during emit.

use std::collections::{BTreeMap, BTreeSet};

use stevedore_common::error::{Result, StevedoreError};

use crate::value::Value;

/// A single service/container in schema-neutral form.
///
/// `None` is the unset sentinel, distinct from a field's zero value, so
/// emitters can tell "absent" from "explicitly false/zero". Fields no
/// codec claims land in `extra` under their source-document key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalService {
    /// Service name, unique within a system. Filled at validation time
    /// when the source never supplied one.
    pub name: Option<String>,
    /// Container image reference.
    pub image: Option<String>,
    /// CPU shares, unit-less.
    pub cpu: Option<i64>,
    /// Memory limit in MB.
    pub memory: Option<i64>,
    /// Whether the service is essential. Deliberately untyped: the value
    /// is preserved verbatim, boolean or not.
    pub essential: Option<Value>,
    /// Command as a single printable string (see [`crate::command`]).
    pub command: Option<String>,
    /// Entrypoint, same encoding as `command`.
    pub entrypoint: Option<String>,
    /// Environment variables: mapping of name to string value.
    pub environment: Option<Value>,
    /// Port mappings: sequence of mappings with `container` and optional
    /// `host` integer keys.
    pub ports: Option<Value>,
    /// Linked service names: sequence of strings.
    pub links: Option<Value>,
    /// Passthrough bucket for fields no codec claims.
    pub extra: BTreeMap<String, Value>,
}

impl CanonicalService {
    /// Canonical field names, in the order emitters iterate them.
    pub const FIELDS: [&'static str; 10] = [
        "command",
        "cpu",
        "entrypoint",
        "environment",
        "essential",
        "image",
        "links",
        "memory",
        "name",
        "ports",
    ];

    /// Reads a field by canonical name as a dynamically-typed value.
    ///
    /// Returns `None` when the field is unset or the name is not a
    /// canonical field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<Value> {
        match field {
            "name" => self.name.clone().map(Value::String),
            "image" => self.image.clone().map(Value::String),
            "cpu" => self.cpu.map(Value::Integer),
            "memory" => self.memory.map(Value::Integer),
            "essential" => self.essential.clone(),
            "command" => self.command.clone().map(Value::String),
            "entrypoint" => self.entrypoint.clone().map(Value::String),
            "environment" => self.environment.clone(),
            "ports" => self.ports.clone(),
            "links" => self.links.clone(),
            _ => None,
        }
    }

    /// Writes a field by canonical name, checking the value's shape.
    ///
    /// # Errors
    ///
    /// Returns [`StevedoreError::MalformedField`] when the value's type
    /// does not match the field's documented shape, or the name is not a
    /// canonical field.
    pub fn set(&mut self, field: &str, value: Value) -> Result<()> {
        match field {
            "name" => self.name = Some(require_string(field, value)?),
            "image" => self.image = Some(require_string(field, value)?),
            "cpu" => self.cpu = Some(require_integer(field, value)?),
            "memory" => self.memory = Some(require_integer(field, value)?),
            "essential" => self.essential = Some(value),
            "command" => self.command = Some(require_string(field, value)?),
            "entrypoint" => self.entrypoint = Some(require_string(field, value)?),
            "environment" => {
                if value.as_mapping().is_none() {
                    return Err(StevedoreError::malformed(field, &value));
                }
                self.environment = Some(value);
            }
            "ports" | "links" => {
                if value.as_sequence().is_none() {
                    return Err(StevedoreError::malformed(field, &value));
                }
                if field == "ports" {
                    self.ports = Some(value);
                } else {
                    self.links = Some(value);
                }
            }
            _ => return Err(StevedoreError::malformed(field, &value)),
        }
        Ok(())
    }
}

fn require_string(field: &str, value: Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(StevedoreError::malformed(field, &other)),
    }
}

fn require_integer(field: &str, value: Value) -> Result<i64> {
    match value {
        Value::Integer(n) => Ok(n),
        other => Err(StevedoreError::malformed(field, &other)),
    }
}

/// A whole system of services plus shared resources.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalSystem {
    /// Services in source-document order. Order is preserved end-to-end
    /// because destination formats treat array position as an implicit
    /// identifier.
    pub services: Vec<CanonicalService>,
    /// Network mode, only set when the source carried a non-default one.
    pub network_mode: Option<String>,
    /// Named volumes shared across services.
    pub volumes: BTreeSet<String>,
}

impl CanonicalSystem {
    /// Creates a system from services with default metadata.
    #[must_use]
    pub fn from_services(services: Vec<CanonicalService>) -> Self {
        Self {
            services,
            network_mode: None,
            volumes: BTreeSet::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_fields_read_as_none() {
        let service = CanonicalService::default();
        for field in CanonicalService::FIELDS {
            assert!(service.get(field).is_none(), "{field} should be unset");
        }
    }

    #[test]
    fn set_and_get_round_trip_typed_fields() {
        let mut service = CanonicalService::default();
        service.set("image", Value::from("postgres:9.3")).expect("image");
        service.set("cpu", Value::Integer(200)).expect("cpu");
        assert_eq!(service.image.as_deref(), Some("postgres:9.3"));
        assert_eq!(service.get("cpu"), Some(Value::Integer(200)));
    }

    #[test]
    fn set_rejects_wrong_shapes() {
        let mut service = CanonicalService::default();
        let err = service.set("cpu", Value::from("high")).unwrap_err();
        assert!(matches!(
            err,
            StevedoreError::MalformedField { field, .. } if field == "cpu"
        ));
        assert!(service.set("environment", Value::Integer(1)).is_err());
        assert!(service.set("links", Value::from("db")).is_err());
    }

    #[test]
    fn essential_accepts_any_shape() {
        let mut service = CanonicalService::default();
        service.set("essential", Value::from("testing")).expect("string");
        assert_eq!(service.essential, Some(Value::from("testing")));
        service.set("essential", Value::Boolean(true)).expect("bool");
        assert_eq!(service.essential, Some(Value::Boolean(true)));
    }

    #[test]
    fn unknown_field_name_is_malformed() {
        let mut service = CanonicalService::default();
        assert!(service.set("restart", Value::from("always")).is_err());
    }

    #[test]
    fn explicit_false_is_distinct_from_unset() {
        let mut service = CanonicalService::default();
        assert!(service.get("essential").is_none());
        service.set("essential", Value::Boolean(false)).expect("set");
        assert_eq!(service.get("essential"), Some(Value::Boolean(false)));
    }

    #[test]
    fn system_preserves_service_order() {
        let mut first = CanonicalService::default();
        first.name = Some("zebra".into());
        let mut second = CanonicalService::default();
        second.name = Some("alpha".into());
        let system = CanonicalSystem::from_services(vec![first, second]);
        let names: Vec<_> = system
            .services
            .iter()
            .filter_map(|s| s.name.as_deref())
            .collect();
        assert_eq!(names, vec!["zebra", "alpha"]);
    }

    #[test]
    fn extra_bucket_carries_unclaimed_fields() {
        let mut service = CanonicalService::default();
        let _ = service
            .extra
            .insert("restart".into(), Value::from("always"));
        assert_eq!(service.extra.get("restart"), Some(&Value::from("always")));
    }
}
