//! Format identifiers shared across the workspace.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StevedoreError;

/// A concrete configuration schema the engine can convert between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Multi-service docker-compose YAML descriptor.
    Compose,
    /// ECS task-definition JSON document.
    Ecs,
    /// systemd unit file.
    Systemd,
}

impl Format {
    /// Returns the canonical lowercase name of the format.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Compose => "compose",
            Self::Ecs => "ecs",
            Self::Systemd => "systemd",
        }
    }

    /// All supported formats, in CLI help order.
    pub const ALL: [Self; 3] = [Self::Compose, Self::Ecs, Self::Systemd];
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = StevedoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compose" | "docker-compose" => Ok(Self::Compose),
            "ecs" | "task-definition" => Ok(Self::Ecs),
            "systemd" => Ok(Self::Systemd),
            other => Err(StevedoreError::UnknownTransformer {
                format: other.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parses_canonical_names() {
        assert_eq!("compose".parse::<Format>().ok(), Some(Format::Compose));
        assert_eq!("ecs".parse::<Format>().ok(), Some(Format::Ecs));
        assert_eq!("systemd".parse::<Format>().ok(), Some(Format::Systemd));
    }

    #[test]
    fn format_parses_aliases_case_insensitively() {
        assert_eq!(
            "Docker-Compose".parse::<Format>().ok(),
            Some(Format::Compose)
        );
        assert_eq!("ECS".parse::<Format>().ok(), Some(Format::Ecs));
    }

    #[test]
    fn unknown_format_is_an_unknown_transformer_error() {
        let err = "nomad".parse::<Format>().unwrap_err();
        assert!(matches!(
            err,
            StevedoreError::UnknownTransformer { format } if format == "nomad"
        ));
    }

    #[test]
    fn display_matches_as_str() {
        for format in Format::ALL {
            assert_eq!(format.to_string(), format.as_str());
        }
    }
}
