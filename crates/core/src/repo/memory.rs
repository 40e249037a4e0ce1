//! In-memory repository implementations.
//!
//! These back the test suite and embedded use. They keep the same contract a
//! database-backed implementation would: identity assignment on first save,
//! path/level recomputation from the stored parent, and version lineage
//! advancement on publish.

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::model::{
    AuditEntry, Content, ContentType, Language, ScheduleAction, RECYCLE_BIN_ID, ROOT_ID,
    ROOT_PATH, RECYCLE_BIN_PATH,
};

use super::{
    AuditRepository, ContentRepository, ContentTypeRepository, Direction, LanguageRepository,
    Persist,
};

#[derive(Default)]
struct ContentStore {
    items: BTreeMap<i32, Content>,
    next_id: i32,
    next_version: i32,
}

/// Content store held behind a single lock.
#[derive(Default)]
pub struct MemoryContentRepository {
    store: RwLock<ContentStore>,
}

impl MemoryContentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path and level for a child of `parent_id`, resolved against the store.
    fn parent_frame(store: &ContentStore, parent_id: i32) -> Result<(String, i32)> {
        match parent_id {
            ROOT_ID => Ok((ROOT_PATH.to_string(), 0)),
            RECYCLE_BIN_ID => Ok((RECYCLE_BIN_PATH.to_string(), 0)),
            id => match store.items.get(&id) {
                Some(parent) => Ok((parent.path.clone(), parent.level)),
                None => bail!("parent {id} does not exist"),
            },
        }
    }
}

impl ContentRepository for MemoryContentRepository {
    fn get(&self, id: i32) -> Result<Option<Content>> {
        Ok(self.store.read().items.get(&id).cloned())
    }

    fn get_by_key(&self, key: Uuid) -> Result<Option<Content>> {
        Ok(self
            .store
            .read()
            .items
            .values()
            .find(|c| c.key == key)
            .cloned())
    }

    fn get_many(&self, ids: &[i32]) -> Result<Vec<Content>> {
        let store = self.store.read();
        Ok(ids
            .iter()
            .filter_map(|id| store.items.get(id).cloned())
            .collect())
    }

    fn save(&self, content: &mut Content, mode: Persist) -> Result<()> {
        let mut store = self.store.write();
        if content.id == 0 {
            store.next_id += 1;
            content.id = store.next_id;
            store.next_version += 1;
            content.version_id = store.next_version;
        }
        let (parent_path, parent_level) = Self::parent_frame(&store, content.parent_id)?;
        content.path = format!("{parent_path},{}", content.id);
        content.level = parent_level + 1;
        content.updated = Utc::now();
        match mode {
            Persist::SaveOnly => {}
            Persist::Publish => {
                store.next_version += 1;
                content.version_id = store.next_version;
                content.published_version_id = content.version_id;
            }
            Persist::Unpublish => {
                content.published_version_id = 0;
            }
        }
        store.items.insert(content.id, content.clone());
        Ok(())
    }

    fn delete(&self, id: i32) -> Result<()> {
        self.store.write().items.remove(&id);
        Ok(())
    }

    fn descendants_page(
        &self,
        path: &str,
        page: usize,
        page_size: usize,
        direction: Direction,
    ) -> Result<(Vec<Content>, u64)> {
        let prefix = format!("{path},");
        let store = self.store.read();
        let mut matching: Vec<&Content> = store
            .items
            .values()
            .filter(|c| c.path.starts_with(&prefix))
            .collect();
        matching.sort_by(|a, b| match direction {
            Direction::Ascending => a.path.cmp(&b.path),
            Direction::Descending => b.path.cmp(&a.path),
        });
        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(page * page_size)
            .take(page_size)
            .cloned()
            .collect();
        Ok((items, total))
    }

    fn children(&self, parent_id: i32) -> Result<Vec<Content>> {
        let store = self.store.read();
        let mut children: Vec<Content> = store
            .items
            .values()
            .filter(|c| c.parent_id == parent_id)
            .cloned()
            .collect();
        children.sort_by_key(|c| c.sort_order);
        Ok(children)
    }

    fn has_children(&self, id: i32) -> Result<bool> {
        Ok(self
            .store
            .read()
            .items
            .values()
            .any(|c| c.parent_id == id))
    }

    fn content_of_types(&self, type_ids: &[i32]) -> Result<Vec<Content>> {
        Ok(self
            .store
            .read()
            .items
            .values()
            .filter(|c| type_ids.contains(&c.content_type_id))
            .cloned()
            .collect())
    }

    fn is_path_published(&self, content: &Content) -> Result<bool> {
        let store = self.store.read();
        let mut parent_id = content.parent_id;
        loop {
            match parent_id {
                ROOT_ID => return Ok(true),
                RECYCLE_BIN_ID => return Ok(false),
                id => match store.items.get(&id) {
                    Some(parent) if parent.published => parent_id = parent.parent_id,
                    _ => return Ok(false),
                },
            }
        }
    }

    fn has_content_for_release(&self, date: DateTime<Utc>) -> Result<bool> {
        Ok(!self.content_for_release(date)?.is_empty())
    }

    fn content_for_release(&self, date: DateTime<Utc>) -> Result<Vec<Content>> {
        Ok(self
            .store
            .read()
            .items
            .values()
            .filter(|c| !c.schedule.pending(ScheduleAction::Release, date).is_empty())
            .cloned()
            .collect())
    }

    fn has_content_for_expiration(&self, date: DateTime<Utc>) -> Result<bool> {
        Ok(!self.content_for_expiration(date)?.is_empty())
    }

    fn content_for_expiration(&self, date: DateTime<Utc>) -> Result<Vec<Content>> {
        Ok(self
            .store
            .read()
            .items
            .values()
            .filter(|c| !c.schedule.pending(ScheduleAction::Expire, date).is_empty())
            .cloned()
            .collect())
    }

    fn clear_schedule(&self, date: DateTime<Utc>, action: ScheduleAction) -> Result<()> {
        let mut store = self.store.write();
        for content in store.items.values_mut() {
            content.schedule.clear_action(action, date);
        }
        Ok(())
    }

    fn next_sort_order(&self, parent_id: i32) -> Result<i32> {
        Ok(self
            .store
            .read()
            .items
            .values()
            .filter(|c| c.parent_id == parent_id)
            .map(|c| c.sort_order + 1)
            .max()
            .unwrap_or(0))
    }
}

#[derive(Default)]
struct TypeStore {
    types: BTreeMap<i32, ContentType>,
    next_id: i32,
}

/// Content type store.
#[derive(Default)]
pub struct MemoryContentTypeRepository {
    store: RwLock<TypeStore>,
}

impl MemoryContentTypeRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContentTypeRepository for MemoryContentTypeRepository {
    fn get(&self, id: i32) -> Result<Option<ContentType>> {
        Ok(self.store.read().types.get(&id).cloned())
    }

    fn get_by_alias(&self, alias: &str) -> Result<Option<ContentType>> {
        Ok(self
            .store
            .read()
            .types
            .values()
            .find(|t| t.alias.eq_ignore_ascii_case(alias))
            .cloned())
    }

    fn get_all(&self) -> Result<Vec<ContentType>> {
        Ok(self.store.read().types.values().cloned().collect())
    }

    fn save(&self, content_type: &mut ContentType) -> Result<()> {
        let mut store = self.store.write();
        if content_type.id == 0 {
            store.next_id += 1;
            content_type.id = store.next_id;
        }
        store.types.insert(content_type.id, content_type.clone());
        Ok(())
    }

    fn delete(&self, id: i32) -> Result<()> {
        self.store.write().types.remove(&id);
        Ok(())
    }
}

/// Language store.
#[derive(Default)]
pub struct MemoryLanguageRepository {
    languages: RwLock<Vec<Language>>,
}

impl MemoryLanguageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, language: Language) {
        self.languages.write().push(language);
    }
}

impl LanguageRepository for MemoryLanguageRepository {
    fn get_many(&self) -> Result<Vec<Language>> {
        Ok(self.languages.read().clone())
    }
}

/// Audit store; tests read entries back through [`Self::entries`].
#[derive(Default)]
pub struct MemoryAuditRepository {
    entries: RwLock<Vec<AuditEntry>>,
}

impl MemoryAuditRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.read().clone()
    }
}

impl AuditRepository for MemoryAuditRepository {
    fn save(&self, entry: &AuditEntry) -> Result<()> {
        self.entries.write().push(entry.clone());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::model::ContentType as ModelContentType;

    fn save_new(repo: &MemoryContentRepository, name: &str, parent_id: i32) -> Content {
        let ct = ModelContentType::new("page", "Page", false);
        let mut item = Content::new(name, parent_id, &ct, -1);
        repo.save(&mut item, Persist::SaveOnly).unwrap();
        item
    }

    #[test]
    fn save_assigns_identity_path_and_level() {
        let repo = MemoryContentRepository::new();
        let root = save_new(&repo, "Home", ROOT_ID);
        assert_eq!(root.path, format!("-1,{}", root.id));
        assert_eq!(root.level, 1);

        let child = save_new(&repo, "About", root.id);
        assert_eq!(child.path, format!("{},{}", root.path, child.id));
        assert_eq!(child.level, 2);
    }

    #[test]
    fn save_to_missing_parent_fails() {
        let repo = MemoryContentRepository::new();
        let ct = ModelContentType::new("page", "Page", false);
        let mut item = Content::new("Orphan", 999, &ct, -1);
        assert!(repo.save(&mut item, Persist::SaveOnly).is_err());
    }

    #[test]
    fn publish_advances_the_version_lineage() {
        let repo = MemoryContentRepository::new();
        let mut item = save_new(&repo, "Home", ROOT_ID);
        let v1 = item.version_id;
        assert_eq!(item.published_version_id, 0);

        repo.save(&mut item, Persist::Publish).unwrap();
        assert!(item.version_id > v1);
        assert_eq!(item.published_version_id, item.version_id);

        repo.save(&mut item, Persist::Unpublish).unwrap();
        assert_eq!(item.published_version_id, 0);
    }

    #[test]
    fn descendants_page_orders_by_path() {
        let repo = MemoryContentRepository::new();
        let root = save_new(&repo, "Home", ROOT_ID);
        let a = save_new(&repo, "A", root.id);
        let _a1 = save_new(&repo, "A1", a.id);
        let _b = save_new(&repo, "B", root.id);

        let (asc, total) = repo
            .descendants_page(&root.path, 0, 10, Direction::Ascending)
            .unwrap();
        assert_eq!(total, 3);
        let paths: Vec<&str> = asc.iter().map(|c| c.path.as_str()).collect();
        let mut sorted = paths.clone();
        sorted.sort_unstable();
        assert_eq!(paths, sorted);

        let (desc, _) = repo
            .descendants_page(&root.path, 0, 10, Direction::Descending)
            .unwrap();
        assert_eq!(desc.first().unwrap().path, *paths.last().unwrap());
    }

    #[test]
    fn path_published_walks_the_ancestor_chain() {
        let repo = MemoryContentRepository::new();
        let mut root = save_new(&repo, "Home", ROOT_ID);
        let child = save_new(&repo, "About", root.id);

        assert!(!repo.is_path_published(&child).unwrap());

        root.published = true;
        repo.save(&mut root, Persist::Publish).unwrap();
        assert!(repo.is_path_published(&child).unwrap());
        assert!(repo.is_path_published(&root).unwrap());
    }
}
