//! Content type model.
//!
//! A content type carries property types, property groups (tabs), and a list
//! of composition references to other content types. Aliases identify types
//! and properties; composition merges property sets, so alias uniqueness must
//! hold across the whole composition graph (see [`crate::composition`]).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Usage kind of a property group. Groups with the same alias but different
/// kinds cannot be merged through composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupKind {
    /// A regular group of properties.
    Group,
    /// A tab in the editor.
    Tab,
}

/// A property definition on a content type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyType {
    pub alias: String,
    pub name: String,
    /// Whether the property value varies by culture.
    pub variant: bool,
}

impl PropertyType {
    pub fn new(alias: &str, name: &str) -> Self {
        Self {
            alias: alias.to_string(),
            name: name.to_string(),
            variant: false,
        }
    }
}

/// A property group on a content type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyGroup {
    pub alias: String,
    pub name: String,
    pub kind: GroupKind,
}

impl PropertyGroup {
    pub fn new(alias: &str, name: &str, kind: GroupKind) -> Self {
        Self {
            alias: alias.to_string(),
            name: name.to_string(),
            kind,
        }
    }
}

/// A content type definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentType {
    /// Integer identity; 0 until first saved.
    pub id: i32,

    /// Stable key, assigned at creation.
    pub key: Uuid,

    /// Unique alias; the stable identity used by composition references.
    pub alias: String,

    /// Display name.
    pub name: String,

    /// Whether content of this type varies by culture.
    pub varies_by_culture: bool,

    /// Properties declared directly on this type.
    pub property_types: Vec<PropertyType>,

    /// Property groups declared directly on this type.
    pub property_groups: Vec<PropertyGroup>,

    /// Aliases of directly composed content types (covers both single
    /// inheritance and N-ary composition).
    pub compositions: Vec<String>,

    /// Aliases of content types allowed as children of this type.
    pub allowed_children: Vec<String>,
}

impl ContentType {
    /// Create a new, unsaved content type.
    pub fn new(alias: &str, name: &str, varies_by_culture: bool) -> Self {
        Self {
            id: 0,
            key: Uuid::now_v7(),
            alias: alias.to_string(),
            name: name.to_string(),
            varies_by_culture,
            property_types: Vec::new(),
            property_groups: Vec::new(),
            compositions: Vec::new(),
            allowed_children: Vec::new(),
        }
    }

    /// Whether the type has been persisted and assigned an id.
    pub fn has_identity(&self) -> bool {
        self.id != 0
    }

    /// Whether this type directly composes the given alias.
    pub fn composes(&self, alias: &str) -> bool {
        self.compositions
            .iter()
            .any(|c| c.eq_ignore_ascii_case(alias))
    }
}
