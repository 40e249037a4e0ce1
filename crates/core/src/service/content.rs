//! The content service.
//!
//! Public operations on the content tree: create/save, publish and
//! unpublish (immediate, scheduled, and whole branches), move, recycle bin,
//! delete, and sort. Expected business refusals come back as result values;
//! violated preconditions come back as errors and roll the scope back.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::audit::Auditor;
use crate::config::CoreConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::events::{ContentEvent, MoveInfo, TreeChangeKind};
use crate::model::{
    AuditKind, Content, Language, ScheduleAction, CULTURE_ALL, RECYCLE_BIN_ID, ROOT_ID,
};
use crate::publish::{
    publish_branch_locked, BranchFilter, CommitContext, Committer, IntentAction, OperationResult,
    PublishIntent, PublishResult, PublishResultType,
};
use crate::repo::{
    AuditRepository, ContentRepository, ContentTypeRepository, Direction, LanguageRepository,
    Persist,
};
use crate::scope::{LockKey, Scope, ScopeProvider};
use crate::tree::{delete_locked, perform_move_locked};

struct Inner {
    scopes: ScopeProvider,
    repo: Arc<dyn ContentRepository>,
    types: Arc<dyn ContentTypeRepository>,
    languages: Arc<dyn LanguageRepository>,
    auditor: Auditor,
    config: CoreConfig,
}

/// Content service handle. Clones share the same state.
#[derive(Clone)]
pub struct ContentService {
    inner: Arc<Inner>,
}

impl ContentService {
    pub fn new(
        scopes: ScopeProvider,
        repo: Arc<dyn ContentRepository>,
        types: Arc<dyn ContentTypeRepository>,
        languages: Arc<dyn LanguageRepository>,
        audit_sink: Arc<dyn AuditRepository>,
        config: CoreConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                scopes,
                repo,
                types,
                languages,
                auditor: Auditor::for_documents(audit_sink),
                config,
            }),
        }
    }

    fn committer(&self) -> Committer<'_> {
        Committer {
            repo: self.inner.repo.as_ref(),
            auditor: &self.inner.auditor,
            config: &self.inner.config,
        }
    }

    fn validate_name(&self, name: &str) -> ServiceResult<()> {
        if name.trim().is_empty() {
            return Err(ServiceError::InvalidOperation(
                "name cannot be empty".to_string(),
            ));
        }
        if name.chars().count() > self.inner.config.name_max_length {
            return Err(ServiceError::InvalidOperation(format!(
                "name cannot be more than {} characters in length",
                self.inner.config.name_max_length
            )));
        }
        Ok(())
    }

    fn check_variance(&self, content: &Content, culture: &str) -> ServiceResult<()> {
        if !content.varies_by_culture() && culture != CULTURE_ALL {
            return Err(ServiceError::NotSupported(format!(
                "culture '{culture}' on invariant content"
            )));
        }
        if content.varies_by_culture() && culture.is_empty() {
            return Err(ServiceError::NotSupported(
                "a culture is required on variant content".to_string(),
            ));
        }
        Ok(())
    }

    /// Create an unsaved content item under `parent_id`.
    pub fn create(
        &self,
        name: &str,
        parent_id: i32,
        type_alias: &str,
        user_id: i32,
    ) -> ServiceResult<Content> {
        self.validate_name(name)?;
        let content_type = self
            .inner
            .types
            .get_by_alias(type_alias)?
            .ok_or_else(|| {
                ServiceError::InvalidOperation(format!(
                    "content type '{type_alias}' does not exist"
                ))
            })?;
        if parent_id != ROOT_ID {
            let parent = self.inner.repo.get(parent_id)?;
            if !parent.is_some_and(|p| !p.trashed) {
                return Err(ServiceError::InvalidOperation(
                    "parent does not exist or is trashed".to_string(),
                ));
            }
        }
        let mut content = Content::new(name, parent_id, &content_type, user_id);
        content.sort_order = self.inner.repo.next_sort_order(parent_id)?;
        Ok(content)
    }

    /// Save without touching published state.
    #[instrument(skip(self, content), fields(content_id = content.id))]
    pub fn save(&self, content: &mut Content, user_id: i32) -> ServiceResult<OperationResult> {
        self.validate_name(&content.name)?;

        let mut scope = self.inner.scopes.create_scope();
        scope.write_lock(LockKey::ContentTree);

        if scope.events().dispatch_cancelable(&ContentEvent::Saving {
            id: content.id,
            name: content.name.clone(),
        }) {
            scope.complete();
            return Ok(OperationResult::cancelled());
        }

        let is_new = !content.has_identity();
        if is_new {
            content.creator_id = user_id;
        }
        content.writer_id = user_id;
        self.inner.repo.save(content, Persist::SaveOnly)?;

        scope.events().dispatch(&ContentEvent::Saved {
            id: content.id,
            name: content.name.clone(),
        });
        scope.events().dispatch(&ContentEvent::TreeChanged {
            id: content.id,
            kind: TreeChangeKind::RefreshNode,
        });
        let kind = if is_new { AuditKind::New } else { AuditKind::Save };
        self.inner
            .auditor
            .log(kind, user_id, content.id, Some("saved"), None);
        info!(content_id = content.id, "content saved");
        scope.complete();
        Ok(OperationResult::success())
    }

    /// Save and publish one culture (or [`CULTURE_ALL`]).
    #[instrument(skip(self, content), fields(content_id = content.id))]
    pub fn save_and_publish(
        &self,
        content: &mut Content,
        culture: &str,
        user_id: i32,
    ) -> ServiceResult<PublishResult> {
        self.validate_name(&content.name)?;
        self.check_variance(content, culture)?;

        let mut scope = self.inner.scopes.create_scope();
        scope.write_lock(LockKey::ContentTree);
        let languages = self.inner.languages.get_many()?;

        if scope.events().dispatch_cancelable(&ContentEvent::Saving {
            id: content.id,
            name: content.name.clone(),
        }) {
            scope.complete();
            return Ok(PublishResult::new(
                PublishResultType::FailedPublishCancelledByEvent,
                content,
            ));
        }

        let intent = PublishIntent::publish(content, &[culture.to_string()]);
        let result = self.committer().commit_locked(
            &scope,
            content,
            &intent,
            &self.commit_ctx(user_id, &languages, Utc::now()),
        )?;
        scope.complete();
        Ok(result)
    }

    /// Save and publish an explicit set of cultures in one operation.
    pub fn save_and_publish_cultures(
        &self,
        content: &mut Content,
        cultures: &[String],
        user_id: i32,
    ) -> ServiceResult<PublishResult> {
        self.validate_name(&content.name)?;
        if !content.varies_by_culture() {
            return Err(ServiceError::NotSupported(
                "culture list on invariant content".to_string(),
            ));
        }
        if cultures.is_empty() {
            return Err(ServiceError::InvalidOperation(
                "no cultures specified".to_string(),
            ));
        }
        if cultures.iter().any(|c| c.is_empty() || c == CULTURE_ALL) {
            return Err(ServiceError::InvalidOperation(
                "the culture list cannot contain the wildcard or empty cultures".to_string(),
            ));
        }

        let mut scope = self.inner.scopes.create_scope();
        scope.write_lock(LockKey::ContentTree);
        let languages = self.inner.languages.get_many()?;

        if scope.events().dispatch_cancelable(&ContentEvent::Saving {
            id: content.id,
            name: content.name.clone(),
        }) {
            scope.complete();
            return Ok(PublishResult::new(
                PublishResultType::FailedPublishCancelledByEvent,
                content,
            ));
        }

        let intent = PublishIntent::publish(content, cultures);
        let result = self.committer().commit_locked(
            &scope,
            content,
            &intent,
            &self.commit_ctx(user_id, &languages, Utc::now()),
        )?;
        scope.complete();
        Ok(result)
    }

    /// Unpublish the document, or one culture of a variant document.
    ///
    /// Unpublishing a mandatory culture, or the last published culture,
    /// unpublishes the whole document and reports it as such.
    #[instrument(skip(self, content), fields(content_id = content.id))]
    pub fn unpublish(
        &self,
        content: &mut Content,
        culture: &str,
        user_id: i32,
    ) -> ServiceResult<PublishResult> {
        self.check_variance(content, culture)?;

        let mut scope = self.inner.scopes.create_scope();
        scope.write_lock(LockKey::ContentTree);
        let languages = self.inner.languages.get_many()?;

        if !content.published {
            scope.complete();
            return Ok(PublishResult::new(
                PublishResultType::SuccessUnpublishAlready,
                content,
            ));
        }

        if scope.events().dispatch_cancelable(&ContentEvent::Saving {
            id: content.id,
            name: content.name.clone(),
        }) {
            scope.complete();
            return Ok(PublishResult::new(
                PublishResultType::FailedPublishCancelledByEvent,
                content,
            ));
        }

        let (intent, removed) = if !content.varies_by_culture() || culture == CULTURE_ALL {
            (PublishIntent::unpublish(), true)
        } else {
            PublishIntent::unpublish_culture(content, culture)
        };

        let mut result = self.committer().commit_locked(
            &scope,
            content,
            &intent,
            &self.commit_ctx(user_id, &languages, Utc::now()),
        )?;
        // Unpublishing a culture that is not published is a no-op.
        if result.kind == PublishResultType::FailedPublishNothingToPublish && !removed {
            result = PublishResult::new(PublishResultType::SuccessUnpublishAlready, content);
        }
        scope.complete();
        Ok(result)
    }

    /// Publish a whole branch for one culture (or [`CULTURE_ALL`]).
    #[instrument(skip(self, content), fields(content_id = content.id))]
    pub fn save_and_publish_branch(
        &self,
        content: &mut Content,
        force: bool,
        culture: &str,
        user_id: i32,
    ) -> ServiceResult<Vec<PublishResult>> {
        self.check_variance(content, culture)?;
        self.publish_branch(content, &BranchFilter::culture(culture, force), user_id)
    }

    /// Publish a whole branch for an explicit culture list.
    pub fn save_and_publish_branch_cultures(
        &self,
        content: &mut Content,
        force: bool,
        cultures: &[String],
        user_id: i32,
    ) -> ServiceResult<Vec<PublishResult>> {
        if !content.varies_by_culture() {
            return Err(ServiceError::NotSupported(
                "culture list on invariant content".to_string(),
            ));
        }
        self.publish_branch(content, &BranchFilter::cultures(cultures, force), user_id)
    }

    /// Publish a whole branch with a caller-supplied selection filter.
    pub fn publish_branch(
        &self,
        content: &mut Content,
        filter: &BranchFilter,
        user_id: i32,
    ) -> ServiceResult<Vec<PublishResult>> {
        let mut scope = self.inner.scopes.create_scope();
        scope.write_lock(LockKey::ContentTree);
        let languages = self.inner.languages.get_many()?;

        let results = publish_branch_locked(
            &self.committer(),
            &scope,
            content,
            filter,
            &languages,
            user_id,
        )?;
        scope.complete();
        Ok(results)
    }

    /// Run all scheduled releases and expirations due at `date`.
    ///
    /// The release pass runs first, then the expiration pass, each in its
    /// own scope. Schedule entries are consumed even when the transition
    /// fails, so a failing document does not wedge the scheduler.
    #[instrument(skip(self))]
    pub fn perform_scheduled_publish(
        &self,
        date: DateTime<Utc>,
    ) -> ServiceResult<Vec<PublishResult>> {
        let mut results = Vec::new();
        if self.inner.repo.has_content_for_release(date)? {
            self.scheduled_release_pass(date, &mut results)?;
        }
        if self.inner.repo.has_content_for_expiration(date)? {
            self.scheduled_expiration_pass(date, &mut results)?;
        }
        Ok(results)
    }

    fn scheduled_release_pass(
        &self,
        date: DateTime<Utc>,
        results: &mut Vec<PublishResult>,
    ) -> ServiceResult<()> {
        let mut scope = self.inner.scopes.create_scope();
        scope.write_lock(LockKey::ContentTree);
        let languages = self.inner.languages.get_many()?;

        for mut content in self.inner.repo.content_for_release(date)? {
            let result = self.scheduled_release_one(&scope, &mut content, date, &languages)?;
            if let Some(result) = result {
                if !result.succeeded() {
                    error!(
                        content_id = content.id,
                        kind = ?result.kind,
                        "scheduled release failed"
                    );
                }
                results.push(result);
            }
        }
        self.inner
            .repo
            .clear_schedule(date, ScheduleAction::Release)?;
        scope.complete();
        Ok(())
    }

    fn scheduled_release_one(
        &self,
        scope: &Scope,
        content: &mut Content,
        date: DateTime<Utc>,
        languages: &[Language],
    ) -> ServiceResult<Option<PublishResult>> {
        let writer_id = content.writer_id;
        let intent = if content.varies_by_culture() {
            let mut pending: Vec<String> = content
                .schedule
                .pending(ScheduleAction::Release, date)
                .iter()
                .map(|e| e.culture.clone())
                .collect();
            pending.dedup();
            if pending.is_empty() {
                return Ok(None);
            }
            for culture in &pending {
                content.schedule.clear(culture, ScheduleAction::Release, date);
            }
            PublishIntent {
                action: IntentAction::Publish,
                cultures_publishing: pending,
                cultures_unpublishing: Vec::new(),
            }
        } else {
            content
                .schedule
                .clear(CULTURE_ALL, ScheduleAction::Release, date);
            PublishIntent::publish(content, &[CULTURE_ALL.to_string()])
        };

        if content.trashed {
            return Ok(Some(PublishResult::new(
                PublishResultType::FailedPublishIsTrashed,
                content,
            )));
        }
        if scope.events().dispatch_cancelable(&ContentEvent::Saving {
            id: content.id,
            name: content.name.clone(),
        }) {
            return Ok(Some(PublishResult::new(
                PublishResultType::FailedPublishCancelledByEvent,
                content,
            )));
        }

        let result = self.committer().commit_locked(
            scope,
            content,
            &intent,
            &self.commit_ctx(writer_id, languages, date),
        )?;
        Ok(Some(result))
    }

    fn scheduled_expiration_pass(
        &self,
        date: DateTime<Utc>,
        results: &mut Vec<PublishResult>,
    ) -> ServiceResult<()> {
        let mut scope = self.inner.scopes.create_scope();
        scope.write_lock(LockKey::ContentTree);
        let languages = self.inner.languages.get_many()?;

        for mut content in self.inner.repo.content_for_expiration(date)? {
            let writer_id = content.writer_id;
            let intent = if content.varies_by_culture() {
                let mut pending: Vec<String> = content
                    .schedule
                    .pending(ScheduleAction::Expire, date)
                    .iter()
                    .map(|e| e.culture.clone())
                    .collect();
                pending.dedup();
                if pending.is_empty() {
                    continue;
                }
                for culture in &pending {
                    content.schedule.clear(culture, ScheduleAction::Expire, date);
                }
                let (intent, _) = PublishIntent::unpublish_cultures(&content, &pending);
                intent
            } else {
                content
                    .schedule
                    .clear(CULTURE_ALL, ScheduleAction::Expire, date);
                if !content.published {
                    results.push(PublishResult::new(
                        PublishResultType::SuccessUnpublishAlready,
                        &content,
                    ));
                    continue;
                }
                PublishIntent::unpublish()
            };

            let result = self.committer().commit_locked(
                &scope,
                &mut content,
                &intent,
                &self.commit_ctx(writer_id, &languages, date),
            )?;
            if !result.succeeded() {
                error!(
                    content_id = content.id,
                    kind = ?result.kind,
                    "scheduled expiration failed"
                );
            }
            results.push(result);
        }
        self.inner
            .repo
            .clear_schedule(date, ScheduleAction::Expire)?;
        scope.complete();
        Ok(())
    }

    /// Move the document (and its subtree) under a new parent. Moving into
    /// the recycle bin delegates to [`Self::move_to_recycle_bin`].
    #[instrument(skip(self, content), fields(content_id = content.id))]
    pub fn move_to(
        &self,
        content: &mut Content,
        parent_id: i32,
        user_id: i32,
    ) -> ServiceResult<OperationResult> {
        if parent_id == RECYCLE_BIN_ID {
            return self.move_to_recycle_bin(content, user_id);
        }

        let mut scope = self.inner.scopes.create_scope();
        scope.write_lock(LockKey::ContentTree);

        let parent = if parent_id == ROOT_ID {
            None
        } else {
            let parent = self
                .inner
                .repo
                .get(parent_id)?
                .filter(|p| !p.trashed)
                .ok_or_else(|| {
                    ServiceError::InvalidOperation(
                        "parent does not exist or is trashed".to_string(),
                    )
                })?;
            Some(parent)
        };

        if scope.events().dispatch_cancelable(&ContentEvent::Moving {
            id: content.id,
            original_path: content.path.clone(),
            new_parent_id: parent_id,
        }) {
            scope.complete();
            return Ok(OperationResult::cancelled());
        }

        // Restoring from the recycle bin clears the trashed flag on the
        // whole subtree; a restored document always comes back unpublished.
        let trash = if content.trashed { Some(false) } else { None };
        if content.trashed && content.published {
            content.published = false;
            self.inner.repo.save(content, Persist::Unpublish)?;
        }

        let mut moves = Vec::new();
        perform_move_locked(
            self.inner.repo.as_ref(),
            &self.inner.config,
            content,
            parent_id,
            parent.as_ref(),
            user_id,
            &mut moves,
            trash,
        )?;

        scope.events().dispatch(&ContentEvent::TreeChanged {
            id: content.id,
            kind: TreeChangeKind::RefreshBranch,
        });
        scope.events().dispatch(&ContentEvent::Moved {
            moves: move_infos(&moves),
        });
        self.inner
            .auditor
            .log(AuditKind::Move, user_id, content.id, Some("moved"), None);
        info!(content_id = content.id, parent_id, "content moved");
        scope.complete();
        Ok(OperationResult::success())
    }

    /// Move the document (and its subtree) into the recycle bin. The
    /// published flags are left alone; publication is masked by the trashed
    /// state and survives an eventual restore decision.
    #[instrument(skip(self, content), fields(content_id = content.id))]
    pub fn move_to_recycle_bin(
        &self,
        content: &mut Content,
        user_id: i32,
    ) -> ServiceResult<OperationResult> {
        let mut scope = self.inner.scopes.create_scope();
        scope.write_lock(LockKey::ContentTree);

        if scope.events().dispatch_cancelable(&ContentEvent::Trashing {
            id: content.id,
            original_path: content.path.clone(),
        }) {
            scope.complete();
            return Ok(OperationResult::cancelled());
        }

        let mut moves = Vec::new();
        perform_move_locked(
            self.inner.repo.as_ref(),
            &self.inner.config,
            content,
            RECYCLE_BIN_ID,
            None,
            user_id,
            &mut moves,
            Some(true),
        )?;

        scope.events().dispatch(&ContentEvent::TreeChanged {
            id: content.id,
            kind: TreeChangeKind::RefreshBranch,
        });
        scope.events().dispatch(&ContentEvent::Trashed {
            moves: move_infos(&moves),
        });
        self.inner.auditor.log(
            AuditKind::Move,
            user_id,
            content.id,
            Some("moved to recycle bin"),
            None,
        );
        info!(content_id = content.id, "content moved to recycle bin");
        scope.complete();
        Ok(OperationResult::success())
    }

    /// Copy the document under a new parent, optionally with its whole
    /// subtree. A copy always starts unpublished. Returns `None` when a
    /// subscriber cancels the copy.
    #[instrument(skip(self, content), fields(content_id = content.id))]
    pub fn copy(
        &self,
        content: &Content,
        parent_id: i32,
        recursive: bool,
        user_id: i32,
    ) -> ServiceResult<Option<Content>> {
        let mut scope = self.inner.scopes.create_scope();

        if scope.events().dispatch_cancelable(&ContentEvent::Copying {
            id: content.id,
            new_parent_id: parent_id,
        }) {
            scope.complete();
            return Ok(None);
        }

        scope.write_lock(LockKey::ContentTree);

        let mut copy = content.duplicate_under(parent_id);
        copy.creator_id = user_id;
        copy.writer_id = user_id;
        self.inner.repo.save(&mut copy, Persist::SaveOnly)?;

        // Maps source ids to copy ids so each descendant lands under its
        // parent's copy; descendants of a skipped parent are skipped too.
        let mut copies: Vec<(i32, i32)> = vec![(content.id, copy.id)];
        let mut id_map: HashMap<i32, i32> = HashMap::from([(content.id, copy.id)]);

        if recursive {
            let mut page = 0;
            loop {
                let (items, total) = self.inner.repo.descendants_page(
                    &content.path,
                    page,
                    self.inner.config.move_page_size,
                    Direction::Ascending,
                )?;
                if items.is_empty() {
                    break;
                }
                for descendant in &items {
                    let Some(&copy_parent_id) = id_map.get(&descendant.parent_id) else {
                        continue;
                    };
                    if scope.events().dispatch_cancelable(&ContentEvent::Copying {
                        id: descendant.id,
                        new_parent_id: copy_parent_id,
                    }) {
                        continue;
                    }
                    let mut descendant_copy = descendant.duplicate_under(copy_parent_id);
                    descendant_copy.creator_id = user_id;
                    descendant_copy.writer_id = user_id;
                    self.inner
                        .repo
                        .save(&mut descendant_copy, Persist::SaveOnly)?;
                    copies.push((descendant.id, descendant_copy.id));
                    id_map.insert(descendant.id, descendant_copy.id);
                }
                page += 1;
                if (page * self.inner.config.move_page_size) as u64 >= total {
                    break;
                }
            }
        }

        scope.events().dispatch(&ContentEvent::TreeChanged {
            id: copy.id,
            kind: TreeChangeKind::RefreshBranch,
        });
        for (id, copy_id) in &copies {
            scope.events().dispatch(&ContentEvent::Copied {
                id: *id,
                copy_id: *copy_id,
            });
        }
        self.inner
            .auditor
            .log(AuditKind::Copy, user_id, content.id, Some("copied"), None);
        info!(content_id = content.id, copy_id = copy.id, "content copied");
        scope.complete();
        Ok(Some(copy))
    }

    /// Permanently delete everything in the recycle bin.
    pub fn empty_recycle_bin(&self, user_id: i32) -> ServiceResult<OperationResult> {
        let mut scope = self.inner.scopes.create_scope();
        scope.write_lock(LockKey::ContentTree);

        for item in self.inner.repo.children(RECYCLE_BIN_ID)? {
            if scope
                .events()
                .dispatch_cancelable(&ContentEvent::Deleting { id: item.id })
            {
                continue;
            }
            delete_locked(
                self.inner.repo.as_ref(),
                scope.events(),
                &self.inner.config,
                &item,
            )?;
            scope.events().dispatch(&ContentEvent::TreeChanged {
                id: item.id,
                kind: TreeChangeKind::Remove,
            });
        }
        self.inner.auditor.log(
            AuditKind::Delete,
            user_id,
            RECYCLE_BIN_ID,
            Some("recycle bin emptied"),
            None,
        );
        info!("recycle bin emptied");
        scope.complete();
        Ok(OperationResult::success())
    }

    /// Permanently delete the document and its whole subtree.
    #[instrument(skip(self, content), fields(content_id = content.id))]
    pub fn delete(&self, content: &Content, user_id: i32) -> ServiceResult<OperationResult> {
        let mut scope = self.inner.scopes.create_scope();

        if scope
            .events()
            .dispatch_cancelable(&ContentEvent::Deleting { id: content.id })
        {
            scope.complete();
            return Ok(OperationResult::cancelled());
        }

        scope.write_lock(LockKey::ContentTree);

        // Deleting published content takes it off the published site first.
        if !content.trashed && content.published {
            scope
                .events()
                .dispatch(&ContentEvent::Unpublished { id: content.id });
        }

        delete_locked(
            self.inner.repo.as_ref(),
            scope.events(),
            &self.inner.config,
            content,
        )?;
        scope.events().dispatch(&ContentEvent::TreeChanged {
            id: content.id,
            kind: TreeChangeKind::Remove,
        });
        self.inner
            .auditor
            .log(AuditKind::Delete, user_id, content.id, Some("deleted"), None);
        scope.complete();
        Ok(OperationResult::success())
    }

    /// Re-order siblings to match the given id order.
    pub fn sort(&self, ids: &[i32], user_id: i32) -> ServiceResult<OperationResult> {
        let mut scope = self.inner.scopes.create_scope();
        scope.write_lock(LockKey::ContentTree);

        if scope
            .events()
            .dispatch_cancelable(&ContentEvent::Sorting { ids: ids.to_vec() })
        {
            scope.complete();
            return Ok(OperationResult::cancelled());
        }

        let items = self.inner.repo.get_many(ids)?;
        for (position, mut item) in items.into_iter().enumerate() {
            let sort_order = i32::try_from(position).map_err(|_| {
                ServiceError::InvalidOperation("sort list too large".to_string())
            })?;
            if item.sort_order == sort_order {
                continue;
            }
            item.sort_order = sort_order;
            item.writer_id = user_id;
            self.inner.repo.save(&mut item, Persist::SaveOnly)?;
            scope.events().dispatch(&ContentEvent::Saved {
                id: item.id,
                name: item.name.clone(),
            });
            scope.events().dispatch(&ContentEvent::TreeChanged {
                id: item.id,
                kind: TreeChangeKind::RefreshNode,
            });
        }

        scope
            .events()
            .dispatch(&ContentEvent::Sorted { ids: ids.to_vec() });
        self.inner.auditor.log(
            AuditKind::Sort,
            user_id,
            ids.first().copied().unwrap_or(ROOT_ID),
            Some("sorted content items"),
            None,
        );
        scope.complete();
        Ok(OperationResult::success())
    }

    pub fn get(&self, id: i32) -> ServiceResult<Option<Content>> {
        let mut scope = self.inner.scopes.create_scope();
        scope.read_lock(LockKey::ContentTree);
        let content = self.inner.repo.get(id)?;
        scope.complete();
        Ok(content)
    }

    pub fn get_by_key(&self, key: Uuid) -> ServiceResult<Option<Content>> {
        let mut scope = self.inner.scopes.create_scope();
        scope.read_lock(LockKey::ContentTree);
        let content = self.inner.repo.get_by_key(key)?;
        scope.complete();
        Ok(content)
    }

    /// Ids of published descendants reachable through a published chain.
    pub fn get_published_descendants(&self, id: i32) -> ServiceResult<Vec<i32>> {
        let mut scope = self.inner.scopes.create_scope();
        scope.read_lock(LockKey::ContentTree);
        let content = self.inner.repo.get(id)?.ok_or(ServiceError::NotFound(id))?;
        let ids = self.committer().published_descendants_locked(&content)?;
        scope.complete();
        Ok(ids)
    }

    /// Whether every ancestor of the document is published.
    pub fn is_path_published(&self, content: &Content) -> ServiceResult<bool> {
        let mut scope = self.inner.scopes.create_scope();
        scope.read_lock(LockKey::ContentTree);
        let published = self.inner.repo.is_path_published(content)?;
        scope.complete();
        Ok(published)
    }

    fn commit_ctx<'a>(
        &self,
        user_id: i32,
        languages: &'a [Language],
        now: DateTime<Utc>,
    ) -> CommitContext<'a> {
        CommitContext {
            user_id,
            raise_events: true,
            branch_one: false,
            branch_root: false,
            languages,
            now,
        }
    }
}

impl std::fmt::Debug for ContentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentService").finish()
    }
}

fn move_infos(moves: &[(Content, String)]) -> Vec<MoveInfo> {
    moves
        .iter()
        .map(|(content, original_path)| MoveInfo {
            id: content.id,
            original_path: original_path.clone(),
            new_parent_id: content.parent_id,
        })
        .collect()
}
