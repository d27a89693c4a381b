use crate::error::DigestError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use xmldigest_core::MandatoryPlacement;

/// Parse-time settings for a [`Digester`](crate::Digester).
///
/// Every field has a default, so a configuration file only needs to name what it changes:
///
/// ```json
/// { "trim-body-text": true, "mandatory-placement": "before-universal" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct DigesterConfig {
    /// Trim surrounding whitespace from the text handed to `body`.
    pub trim_body_text: bool,
    /// Resolve namespace prefixes in documents.
    pub namespace_aware: bool,
    pub mandatory_placement: MandatoryPlacement,
}

impl Default for DigesterConfig {
    fn default() -> Self {
        Self {
            trim_body_text: false,
            namespace_aware: true,
            mandatory_placement: MandatoryPlacement::default(),
        }
    }
}

impl DigesterConfig {
    pub fn from_json(json: &str) -> Result<Self, DigestError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DigestError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}
