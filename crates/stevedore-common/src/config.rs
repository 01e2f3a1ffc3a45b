//! Conversion configuration model.

use serde::{Deserialize, Serialize};

use crate::types::Format;

/// Options for a single conversion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertConfig {
    /// Schema of the source document.
    pub input_format: Format,
    /// Schema of the destination document.
    pub output_format: Format,
    /// Task family override for ECS output; `None` keeps the default.
    pub family: Option<String>,
}

impl ConvertConfig {
    /// Creates a configuration for the given schema pair with defaults.
    #[must_use]
    pub const fn new(input_format: Format, output_format: Format) -> Self {
        Self {
            input_format,
            output_format,
            family: None,
        }
    }

    /// Sets the ECS task family override.
    #[must_use]
    pub fn with_family(mut self, family: impl Into<String>) -> Self {
        self.family = Some(family.into());
        self
    }
}
