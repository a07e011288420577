//! Declarative catalog model configuration
//!
//! The host hands in a TOML snippet per datasource; everything has a
//! default, so an empty document is valid.

use serde::{Deserialize, Serialize};
use stela_core::{IdentifierCase, Result, StelaError};

/// Configuration for one datasource's catalog model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// How the engine stores unquoted identifiers
    #[serde(default)]
    pub identifier_case: IdentifierCase,

    /// Sort listings by name; fetch order otherwise
    #[serde(default = "default_sorted_lists")]
    pub sorted_lists: bool,
}

fn default_sorted_lists() -> bool {
    true
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            identifier_case: IdentifierCase::default(),
            sorted_lists: true,
        }
    }
}

impl CatalogConfig {
    /// Parse a TOML document
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|error| StelaError::Configuration(error.to_string()))
    }
}
