//! Language model.

use serde::{Deserialize, Serialize};

/// A configured language.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Language {
    /// ISO code, e.g. "en-us".
    pub iso_code: String,

    /// Display name, e.g. "English (United States)".
    pub culture_name: String,

    /// A mandatory language must be part of any published culture set.
    pub mandatory: bool,

    /// Whether this is the default language.
    pub is_default: bool,
}

impl Language {
    pub fn new(iso_code: &str, culture_name: &str) -> Self {
        Self {
            iso_code: iso_code.to_string(),
            culture_name: culture_name.to_string(),
            mandatory: false,
            is_default: false,
        }
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    pub fn default_language(mut self) -> Self {
        self.is_default = true;
        self
    }
}
