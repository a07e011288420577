//! Shared identifier normalization
//!
//! Every cache instance normalizes lookup names through one policy
//! instead of re-deriving case rules per entity type. Caches keyed by a
//! surrogate rather than a name use `IdentifierCase::Preserve` with the
//! stringified key; a cache picks exactly one of the two and documents it.

use serde::{Deserialize, Serialize};

/// How the engine reports identifiers in its catalog tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierCase {
    /// Unquoted identifiers are stored upper-case (the engine default)
    #[default]
    Upper,
    /// Unquoted identifiers are stored lower-case
    Lower,
    /// Identifiers are stored exactly as written
    Preserve,
}

impl IdentifierCase {
    /// Normalize a name the way the catalog reports it
    pub fn normalize(&self, name: &str) -> String {
        match self {
            IdentifierCase::Upper => name.to_uppercase(),
            IdentifierCase::Lower => name.to_lowercase(),
            IdentifierCase::Preserve => name.to_string(),
        }
    }
}

/// Case-normalized lookup key for one cached object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Build a key from a raw name under the given case policy
    pub fn new(case: IdentifierCase, name: &str) -> Self {
        Self(case.normalize(name))
    }

    /// The normalized key text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
