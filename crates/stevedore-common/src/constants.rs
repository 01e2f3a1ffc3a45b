//! System-wide constants and defaults.

/// Default task family written into emitted ECS task definitions when the
/// source document does not carry a project name.
pub const DEFAULT_TASK_FAMILY: &str = "pythonapp";

/// Indentation unit used by the deterministic JSON serializer.
pub const JSON_INDENT: &str = "    ";

/// File extension for systemd unit files.
pub const UNIT_EXTENSION: &str = ".service";

/// Extension key carrying the container image in emitted systemd units.
pub const UNIT_IMAGE_KEY: &str = "X-ContainerImage";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "stvd";
