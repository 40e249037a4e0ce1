//! Repository contracts.
//!
//! Persistence is an external collaborator with a narrow contract: CRUD plus
//! paged path-prefix queries. A save hydrates computed fields — identity,
//! path, level, and the version lineage — so callers always hold entities
//! consistent with the store. In-memory implementations back tests and
//! embedded use.

pub mod memory;

use anyhow::Result;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::model::{AuditEntry, Content, ContentType, Language, ScheduleAction};

pub use memory::{
    MemoryAuditRepository, MemoryContentRepository, MemoryContentTypeRepository,
    MemoryLanguageRepository,
};

/// How a save should be persisted. This carries what the original transient
/// published-state values used to encode on the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persist {
    /// Update the current version; published state untouched.
    SaveOnly,
    /// Write a new published version and advance the version lineage.
    Publish,
    /// Retire the published version.
    Unpublish,
}

/// Ordering of paged descendant queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Path ascending: parents strictly before children.
    Ascending,
    /// Path descending: children strictly before parents.
    Descending,
}

/// Content persistence.
pub trait ContentRepository: Send + Sync {
    fn get(&self, id: i32) -> Result<Option<Content>>;

    fn get_by_key(&self, key: Uuid) -> Result<Option<Content>>;

    fn get_many(&self, ids: &[i32]) -> Result<Vec<Content>>;

    /// Persist the item, assigning identity on first save and recomputing
    /// path and level from the stored parent.
    fn save(&self, content: &mut Content, mode: Persist) -> Result<()>;

    fn delete(&self, id: i32) -> Result<()>;

    /// One page of the descendants strictly under `path`, ordered by path.
    /// Returns the page and the total count of matching items.
    fn descendants_page(
        &self,
        path: &str,
        page: usize,
        page_size: usize,
        direction: Direction,
    ) -> Result<(Vec<Content>, u64)>;

    fn children(&self, parent_id: i32) -> Result<Vec<Content>>;

    fn has_children(&self, id: i32) -> Result<bool>;

    fn content_of_types(&self, type_ids: &[i32]) -> Result<Vec<Content>>;

    /// Whether every ancestor of `content`, up to the root, is published.
    fn is_path_published(&self, content: &Content) -> Result<bool>;

    fn has_content_for_release(&self, date: DateTime<Utc>) -> Result<bool>;

    fn content_for_release(&self, date: DateTime<Utc>) -> Result<Vec<Content>>;

    fn has_content_for_expiration(&self, date: DateTime<Utc>) -> Result<bool>;

    fn content_for_expiration(&self, date: DateTime<Utc>) -> Result<Vec<Content>>;

    /// Drop all schedule entries for `action` due at `date` across the store.
    fn clear_schedule(&self, date: DateTime<Utc>, action: ScheduleAction) -> Result<()>;

    fn next_sort_order(&self, parent_id: i32) -> Result<i32>;
}

/// Content type persistence.
pub trait ContentTypeRepository: Send + Sync {
    fn get(&self, id: i32) -> Result<Option<ContentType>>;

    fn get_by_alias(&self, alias: &str) -> Result<Option<ContentType>>;

    fn get_all(&self) -> Result<Vec<ContentType>>;

    fn save(&self, content_type: &mut ContentType) -> Result<()>;

    fn delete(&self, id: i32) -> Result<()>;
}

/// Language persistence.
pub trait LanguageRepository: Send + Sync {
    fn get_many(&self) -> Result<Vec<Language>>;
}

/// Audit sink. Writes must never block or fail the audited operation;
/// callers log and continue on error.
pub trait AuditRepository: Send + Sync {
    fn save(&self, entry: &AuditEntry) -> Result<()>;
}
