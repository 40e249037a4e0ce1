//! Content item model.
//!
//! A content item is a tree node. Its `path` is the comma-joined chain of
//! ancestor ids from the root down to the item itself, and `level` is its
//! depth; both are recomputed by the repository on save and must stay
//! consistent across every tree operation.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::content_type::ContentType;
use super::{CULTURE_ALL, RECYCLE_BIN_ID, ROOT_ID};

/// Publication status of a content item (or one of its cultures) at a point
/// in time, derived from the trashed flag and the pending schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentStatus {
    Available,
    Expired,
    AwaitingRelease,
    Trashed,
}

/// Scheduled publishing action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleAction {
    /// Publish when the date is reached.
    Release,
    /// Unpublish when the date is reached.
    Expire,
}

/// One pending schedule entry. Invariant content uses the `"*"` culture token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub culture: String,
    pub action: ScheduleAction,
    pub date: DateTime<Utc>,
}

/// The set of pending release/expire entries for one content item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentSchedule {
    entries: Vec<ScheduleEntry>,
}

impl ContentSchedule {
    /// Add a schedule entry.
    pub fn add(&mut self, culture: &str, action: ScheduleAction, date: DateTime<Utc>) {
        self.entries.push(ScheduleEntry {
            culture: culture.to_string(),
            action,
            date,
        });
    }

    /// Entries for `action` that are due at `date` (date reached or passed).
    pub fn pending(&self, action: ScheduleAction, date: DateTime<Utc>) -> Vec<&ScheduleEntry> {
        self.entries
            .iter()
            .filter(|e| e.action == action && e.date <= date)
            .collect()
    }

    /// Remove due entries for one culture and action.
    pub fn clear(&mut self, culture: &str, action: ScheduleAction, date: DateTime<Utc>) {
        self.entries
            .retain(|e| !(e.culture == culture && e.action == action && e.date <= date));
    }

    /// Remove due entries for an action across all cultures.
    pub fn clear_action(&mut self, action: ScheduleAction, date: DateTime<Utc>) {
        self.entries
            .retain(|e| !(e.action == action && e.date <= date));
    }

    /// Remove release entries dated in the past. An unpublished item cannot
    /// simultaneously carry an overdue auto-publish.
    pub fn remove_overdue_releases(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|e| !(e.action == ScheduleAction::Release && e.date <= now));
        before - self.entries.len()
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-culture state of a variant content item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CultureInfo {
    /// Culture-specific name.
    pub name: String,

    /// Whether this culture has been explicitly published. Masked by the
    /// item-level published flag: a culture is only routable when both hold.
    pub published: bool,

    /// Whether this culture has pending edits since it was last published.
    pub edited: bool,

    /// When this culture was last published.
    pub publish_date: Option<DateTime<Utc>>,
}

impl CultureInfo {
    pub fn new(name: String) -> Self {
        Self {
            name,
            published: false,
            edited: true,
            publish_date: None,
        }
    }
}

/// A content item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    /// Integer identity; 0 until first saved.
    pub id: i32,

    /// Stable key, assigned at creation.
    pub key: Uuid,

    /// Parent id, or [`ROOT_ID`] for root-level content.
    pub parent_id: i32,

    /// Invariant name.
    pub name: String,

    /// Comma-joined ancestor id chain ending with this item's id.
    pub path: String,

    /// Tree depth. Root-level content sits at level 1.
    pub level: i32,

    /// Position among siblings.
    pub sort_order: i32,

    /// Whether this item lives under the recycle bin.
    pub trashed: bool,

    /// Content type id.
    pub content_type_id: i32,

    /// Content type alias.
    pub content_type_alias: String,

    /// Whether the content type varies by culture.
    variant: bool,

    /// Settled published state. Transient publish intent never appears here;
    /// it travels as a [`crate::publish::PublishIntent`] value instead.
    pub published: bool,

    /// Whether there are edits pending since the last publish.
    pub edited: bool,

    /// Current version id; advances when a publish writes a new version.
    pub version_id: i32,

    /// Version id of the published version, or 0 when never published.
    pub published_version_id: i32,

    /// User who created the item.
    pub creator_id: i32,

    /// User who last wrote the item.
    pub writer_id: i32,

    /// Creation timestamp.
    pub created: DateTime<Utc>,

    /// Last-write timestamp.
    pub updated: DateTime<Utc>,

    /// Per-culture state; empty for invariant types.
    pub cultures: BTreeMap<String, CultureInfo>,

    /// Pending release/expire schedule.
    pub schedule: ContentSchedule,
}

impl Content {
    /// Create a new, unsaved content item under the given parent.
    pub fn new(name: &str, parent_id: i32, content_type: &ContentType, user_id: i32) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            key: Uuid::now_v7(),
            parent_id,
            name: name.to_string(),
            path: String::new(),
            level: 0,
            sort_order: 0,
            trashed: false,
            content_type_id: content_type.id,
            content_type_alias: content_type.alias.clone(),
            variant: content_type.varies_by_culture,
            published: false,
            edited: true,
            version_id: 0,
            published_version_id: 0,
            creator_id: user_id,
            writer_id: user_id,
            created: now,
            updated: now,
            cultures: BTreeMap::new(),
            schedule: ContentSchedule::default(),
        }
    }

    /// Whether the item has been persisted and assigned an id.
    pub fn has_identity(&self) -> bool {
        self.id != 0
    }

    /// Whether the content type varies by culture.
    pub fn varies_by_culture(&self) -> bool {
        self.variant
    }

    /// Set (or create) the name for a culture, marking the culture edited.
    pub fn set_culture_name(&mut self, culture: &str, name: &str) {
        match self.cultures.get_mut(culture) {
            Some(info) => {
                info.name = name.to_string();
                info.edited = true;
            }
            None => {
                self.cultures
                    .insert(culture.to_string(), CultureInfo::new(name.to_string()));
            }
        }
        self.edited = true;
    }

    /// Cultures that exist on this item.
    pub fn available_cultures(&self) -> Vec<String> {
        self.cultures.keys().cloned().collect()
    }

    /// Whether a culture is currently published. A culture counts as
    /// published only when explicitly published and not masked by an
    /// unpublished item.
    pub fn is_culture_published(&self, culture: &str) -> bool {
        self.published && self.cultures.get(culture).is_some_and(|c| c.published)
    }

    /// Whether a culture has pending edits.
    pub fn is_culture_edited(&self, culture: &str) -> bool {
        self.cultures.get(culture).is_some_and(|c| c.edited)
    }

    /// The set of currently published (unmasked) cultures.
    pub fn published_cultures(&self) -> BTreeSet<String> {
        if !self.published {
            return BTreeSet::new();
        }
        self.cultures
            .iter()
            .filter(|(_, c)| c.published)
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Publication status for a culture (use [`CULTURE_ALL`] for invariant
    /// content) at the given instant.
    pub fn status(&self, culture: &str, now: DateTime<Utc>) -> ContentStatus {
        if self.trashed {
            return ContentStatus::Trashed;
        }
        let entries = self
            .schedule
            .entries()
            .iter()
            .filter(|e| e.culture == culture || culture == CULTURE_ALL);
        let mut awaiting = false;
        for e in entries {
            match e.action {
                ScheduleAction::Expire if e.date <= now => return ContentStatus::Expired,
                ScheduleAction::Release if e.date > now => awaiting = true,
                _ => {}
            }
        }
        if awaiting {
            ContentStatus::AwaitingRelease
        } else {
            ContentStatus::Available
        }
    }

    /// Clone this item as a new, unsaved copy under `parent_id`. The copy
    /// keeps names, cultures, and schedule but starts unpublished, with a
    /// fresh key and no identity.
    pub fn duplicate_under(&self, parent_id: i32) -> Self {
        let now = Utc::now();
        let mut copy = self.clone();
        copy.id = 0;
        copy.key = Uuid::now_v7();
        copy.parent_id = parent_id;
        copy.path = String::new();
        copy.level = 0;
        copy.trashed = false;
        copy.published = false;
        copy.edited = true;
        copy.version_id = 0;
        copy.published_version_id = 0;
        copy.created = now;
        copy.updated = now;
        for info in copy.cultures.values_mut() {
            info.published = false;
            info.publish_date = None;
        }
        copy
    }

    /// Whether this item sits directly under the recycle-bin root.
    pub fn is_in_recycle_bin_root(&self) -> bool {
        self.parent_id == RECYCLE_BIN_ID
    }

    /// Whether this item sits at the tree root.
    pub fn is_at_root(&self) -> bool {
        self.parent_id == ROOT_ID
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::model::content_type::ContentType;
    use chrono::Duration;

    fn page_type() -> ContentType {
        ContentType::new("page", "Page", false)
    }

    #[test]
    fn new_content_has_no_identity() {
        let item = Content::new("Home", ROOT_ID, &page_type(), -1);
        assert!(!item.has_identity());
        assert!(!item.published);
        assert!(item.edited);
    }

    #[test]
    fn status_trashed_wins() {
        let mut item = Content::new("Home", ROOT_ID, &page_type(), -1);
        item.trashed = true;
        item.schedule
            .add(CULTURE_ALL, ScheduleAction::Expire, Utc::now() - Duration::hours(1));
        assert_eq!(item.status(CULTURE_ALL, Utc::now()), ContentStatus::Trashed);
    }

    #[test]
    fn status_expired_and_awaiting() {
        let now = Utc::now();
        let mut item = Content::new("Home", ROOT_ID, &page_type(), -1);
        item.schedule
            .add(CULTURE_ALL, ScheduleAction::Release, now + Duration::hours(1));
        assert_eq!(item.status(CULTURE_ALL, now), ContentStatus::AwaitingRelease);

        item.schedule
            .add(CULTURE_ALL, ScheduleAction::Expire, now - Duration::hours(1));
        assert_eq!(item.status(CULTURE_ALL, now), ContentStatus::Expired);
    }

    #[test]
    fn culture_published_is_masked_by_item_state() {
        let variant = ContentType::new("post", "Post", true);
        let mut item = Content::new("Post", ROOT_ID, &variant, -1);
        item.set_culture_name("en-us", "Post");
        item.cultures.get_mut("en-us").unwrap().published = true;

        assert!(!item.is_culture_published("en-us"));
        item.published = true;
        assert!(item.is_culture_published("en-us"));
    }

    #[test]
    fn overdue_release_removal() {
        let now = Utc::now();
        let mut schedule = ContentSchedule::default();
        schedule.add("en-us", ScheduleAction::Release, now - Duration::hours(2));
        schedule.add("en-us", ScheduleAction::Release, now + Duration::hours(2));
        schedule.add("en-us", ScheduleAction::Expire, now - Duration::hours(2));

        assert_eq!(schedule.remove_overdue_releases(now), 1);
        assert_eq!(schedule.entries().len(), 2);
    }
}
