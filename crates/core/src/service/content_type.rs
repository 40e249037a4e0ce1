//! The content type service.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use tracing::{info, instrument};

use crate::audit::Auditor;
use crate::composition::{validate_composition, CompositionConflicts};
use crate::config::CoreConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::events::{ContentEvent, TreeChangeKind};
use crate::model::{AuditKind, ContentType};
use crate::publish::OperationResult;
use crate::repo::{AuditRepository, ContentRepository, ContentTypeRepository};
use crate::scope::{LockKey, ScopeProvider};
use crate::tree::delete_locked;

struct Inner {
    scopes: ScopeProvider,
    types: Arc<dyn ContentTypeRepository>,
    content: Arc<dyn ContentRepository>,
    auditor: Auditor,
    config: CoreConfig,
}

/// Content type service handle. Clones share the same state.
#[derive(Clone)]
pub struct ContentTypeService {
    inner: Arc<Inner>,
}

impl ContentTypeService {
    pub fn new(
        scopes: ScopeProvider,
        types: Arc<dyn ContentTypeRepository>,
        content: Arc<dyn ContentRepository>,
        audit_sink: Arc<dyn AuditRepository>,
        config: CoreConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                scopes,
                types,
                content,
                auditor: Auditor::for_content_types(audit_sink),
                config,
            }),
        }
    }

    /// Save a content type, validating the composition graph first. A type
    /// that would introduce alias collisions is rejected before anything is
    /// written.
    #[instrument(skip(self, content_type), fields(alias = %content_type.alias))]
    pub fn save(
        &self,
        content_type: &mut ContentType,
        user_id: i32,
    ) -> ServiceResult<OperationResult> {
        let mut scope = self.inner.scopes.create_scope();
        scope.write_lock(LockKey::ContentTypes);

        if scope.events().dispatch_cancelable(&ContentEvent::TypeSaving {
            alias: content_type.alias.clone(),
        }) {
            scope.complete();
            return Ok(OperationResult::cancelled());
        }

        let all = self.inner.types.get_all()?;
        if let Err(conflicts) = validate_composition(content_type, &all) {
            return Err(ServiceError::InvalidComposition {
                alias: content_type.alias.clone(),
                conflicts,
            });
        }

        let is_new = !content_type.has_identity();
        self.inner.types.save(content_type)?;
        scope.events().dispatch(&ContentEvent::TypeSaved {
            alias: content_type.alias.clone(),
        });
        let kind = if is_new { AuditKind::New } else { AuditKind::Save };
        self.inner
            .auditor
            .log(kind, user_id, content_type.id, Some("saved"), None);
        info!(alias = %content_type.alias, "content type saved");
        scope.complete();
        Ok(OperationResult::success())
    }

    /// Dry-run composition validation; `None` means the type is valid.
    pub fn validate_composition(
        &self,
        content_type: &ContentType,
    ) -> ServiceResult<Option<CompositionConflicts>> {
        let mut scope = self.inner.scopes.create_scope();
        scope.read_lock(LockKey::ContentTypes);
        let all = self.inner.types.get_all()?;
        let conflicts = validate_composition(content_type, &all).err();
        scope.complete();
        Ok(conflicts)
    }

    pub fn get(&self, id: i32) -> ServiceResult<Option<ContentType>> {
        let mut scope = self.inner.scopes.create_scope();
        scope.read_lock(LockKey::ContentTypes);
        let content_type = self.inner.types.get(id)?;
        scope.complete();
        Ok(content_type)
    }

    pub fn get_by_alias(&self, alias: &str) -> ServiceResult<Option<ContentType>> {
        let mut scope = self.inner.scopes.create_scope();
        scope.read_lock(LockKey::ContentTypes);
        let content_type = self.inner.types.get_by_alias(alias)?;
        scope.complete();
        Ok(content_type)
    }

    /// Delete a content type.
    ///
    /// Deleting a type also dooms every type that composes it, transitively,
    /// deletes all content of the doomed types (whole subtrees, children
    /// first), and strips the doomed aliases from the allowed-children lists
    /// of surviving types.
    #[instrument(skip(self))]
    pub fn delete(&self, id: i32, user_id: i32) -> ServiceResult<OperationResult> {
        let mut scope = self.inner.scopes.create_scope();
        scope.write_lock(LockKey::ContentTypes);
        scope.write_lock(LockKey::ContentTree);

        if scope
            .events()
            .dispatch_cancelable(&ContentEvent::TypeDeleting { id })
        {
            scope.complete();
            return Ok(OperationResult::cancelled());
        }

        let target = self
            .inner
            .types
            .get(id)?
            .ok_or(ServiceError::NotFound(id))?;
        let all = self.inner.types.get_all()?;

        // Doomed set: the target plus everything composing it, transitively.
        let mut doomed_aliases: HashSet<String> = HashSet::new();
        doomed_aliases.insert(target.alias.to_ascii_lowercase());
        let mut queue: VecDeque<String> = VecDeque::from([target.alias.clone()]);
        while let Some(alias) = queue.pop_front() {
            for t in &all {
                if t.composes(&alias) && doomed_aliases.insert(t.alias.to_ascii_lowercase()) {
                    queue.push_back(t.alias.clone());
                }
            }
        }
        let doomed: Vec<&ContentType> = all
            .iter()
            .filter(|t| doomed_aliases.contains(&t.alias.to_ascii_lowercase()))
            .collect();
        let doomed_ids: Vec<i32> = doomed.iter().map(|t| t.id).collect();

        // Delete content of the doomed types; deleting a subtree covers any
        // nested instances, so skip items under an already-deleted ancestor.
        let mut items = self.inner.content.content_of_types(&doomed_ids)?;
        items.sort_by(|a, b| a.path.cmp(&b.path));
        let mut deleted_prefixes: Vec<String> = Vec::new();
        for item in items {
            if deleted_prefixes
                .iter()
                .any(|p| item.path.starts_with(p.as_str()))
            {
                continue;
            }
            delete_locked(
                self.inner.content.as_ref(),
                scope.events(),
                &self.inner.config,
                &item,
            )?;
            scope.events().dispatch(&ContentEvent::TreeChanged {
                id: item.id,
                kind: TreeChangeKind::Remove,
            });
            deleted_prefixes.push(format!("{},", item.path));
        }

        // Surviving types may no longer allow the doomed aliases as children.
        for t in &all {
            if doomed_aliases.contains(&t.alias.to_ascii_lowercase()) {
                continue;
            }
            if t.allowed_children
                .iter()
                .any(|a| doomed_aliases.contains(&a.to_ascii_lowercase()))
            {
                let mut survivor = t.clone();
                survivor
                    .allowed_children
                    .retain(|a| !doomed_aliases.contains(&a.to_ascii_lowercase()));
                self.inner.types.save(&mut survivor)?;
            }
        }

        for doomed_id in &doomed_ids {
            self.inner.types.delete(*doomed_id)?;
        }
        scope.events().dispatch(&ContentEvent::TypeDeleted {
            ids: doomed_ids.clone(),
        });

        self.inner.auditor.log(
            AuditKind::Delete,
            user_id,
            id,
            Some(&format!("deleted content types: {}", doomed_ids.len())),
            None,
        );
        info!(alias = %target.alias, doomed = doomed_ids.len(), "content type deleted");
        scope.complete();
        Ok(OperationResult::success())
    }
}

impl std::fmt::Debug for ContentTypeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentTypeService").finish()
    }
}
