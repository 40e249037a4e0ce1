//! The commit pipeline for document changes.
//!
//! `commit_locked` is the single funnel every publish, unpublish, and
//! scheduled transition goes through. It runs the strategy checks, persists
//! exactly once per settled state (the last-published-culture case persists
//! twice, once per state), dispatches events, and writes the audit trail.
//! Callers hold the content tree write lock before entering.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::audit::Auditor;
use crate::config::CoreConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::events::{ContentEvent, TreeChangeKind};
use crate::model::{AuditKind, Content, ContentStatus, Language, CULTURE_ALL, ROOT_ID};
use crate::repo::{ContentRepository, Direction, Persist};
use crate::scope::Scope;

use super::intent::PublishIntent;
use super::result::{PublishResult, PublishResultType};

/// Ambient parameters of one commit.
pub struct CommitContext<'a> {
    pub user_id: i32,
    /// Whether to dispatch the saved notification.
    pub raise_events: bool,
    /// True when committing one document within a branch operation.
    pub branch_one: bool,
    /// True when the document is the root of that branch operation.
    pub branch_root: bool,
    /// All configured languages, for mandatory-culture checks and audits.
    pub languages: &'a [Language],
    /// The instant schedules are evaluated against.
    pub now: DateTime<Utc>,
}

/// Runs commits against one repository.
pub struct Committer<'a> {
    pub repo: &'a dyn ContentRepository,
    pub auditor: &'a Auditor,
    pub config: &'a CoreConfig,
}

impl Committer<'_> {
    /// Commit one document change under the already-held tree lock.
    pub fn commit_locked(
        &self,
        scope: &Scope,
        content: &mut Content,
        intent: &PublishIntent,
        ctx: &CommitContext<'_>,
    ) -> ServiceResult<PublishResult> {
        let varies = content.varies_by_culture();
        let is_new = !content.has_identity();
        let previously_published = content.has_identity() && content.published;
        let mut change_type = if is_new {
            TreeChangeKind::RefreshNode
        } else {
            TreeChangeKind::RefreshBranch
        };

        let mut publishing = intent.is_publish();
        let mut unpublishing = !intent.is_publish();
        // Set when the publish state was already persisted by the
        // last-culture special case below.
        let mut publish_persisted = false;

        let cultures_changing = if varies {
            let mut touched: Vec<String> = intent.cultures_publishing.clone();
            touched.extend(intent.cultures_unpublishing.iter().cloned());
            touched.retain(|c| c != CULTURE_ALL);
            (!touched.is_empty()).then_some(touched)
        } else {
            None
        };

        let mut publish_result: Option<PublishResult> = None;
        if publishing {
            let can = self.strategy_can_publish(scope, content, intent, ctx)?;
            if can.succeeded() {
                let done = self.strategy_publish(content, intent);

                // Unpublishing the last published culture: persist the
                // culture-less publish first, then fall through to a full
                // unpublish of the document.
                if done.kind == PublishResultType::SuccessUnpublishCulture
                    && intent.resulting_published_cultures(content).is_empty()
                {
                    intent.apply(content, ctx.now);
                    self.save_document(content, is_new, Persist::Publish, ctx)?;
                    publish_persisted = true;
                    unpublishing = content.published;
                }
                publish_result = Some(done);
            } else {
                // In a branch, a failing descendant is simply reported.
                if ctx.branch_one && !ctx.branch_root {
                    return Ok(can);
                }
                if can.kind == PublishResultType::FailedPublishMandatoryCultureMissing {
                    // Downgrade: removing a mandatory culture turns the
                    // operation into a full unpublish.
                    publishing = false;
                    unpublishing = content.published;
                }
                // The failed publish is reported, but the document is still
                // saved below, with Saved and the save audit.
                publish_result = Some(can);
            }
        }

        let mut unpublish_result: Option<PublishResult> = None;
        if unpublishing {
            if let Some(newest) = self.repo.get(content.id)? {
                if newest.version_id != content.version_id {
                    return Ok(PublishResult::new(
                        PublishResultType::FailedPublishConcurrencyViolation,
                        content,
                    ));
                }
            }
            if content.published {
                let can = self.strategy_can_unpublish(scope, content);
                if can.succeeded() {
                    unpublish_result = Some(self.strategy_unpublish(content, ctx));
                } else {
                    unpublishing = false;
                    unpublish_result = Some(can);
                }
            } else {
                // Unpublishing a document that is not published means two
                // writers raced; die fast rather than corrupt state.
                return Err(ServiceError::InvalidOperation(
                    "concurrency collision: cannot unpublish an unpublished document".to_string(),
                ));
            }
        }

        let persist = if unpublishing && unpublish_result.as_ref().is_some_and(PublishResult::succeeded)
        {
            content.published = false;
            Persist::Unpublish
        } else if publishing
            && !publish_persisted
            && publish_result.as_ref().is_some_and(PublishResult::succeeded)
        {
            intent.apply(content, ctx.now);
            Persist::Publish
        } else {
            Persist::SaveOnly
        };
        self.save_document(content, is_new, persist, ctx)?;

        if ctx.raise_events {
            scope.events().dispatch(&ContentEvent::Saved {
                id: content.id,
                name: content.name.clone(),
            });
        }

        if let Some(result) = unpublish_result {
            if result.succeeded() {
                scope
                    .events()
                    .dispatch(&ContentEvent::Unpublished { id: content.id });
                scope.events().dispatch(&ContentEvent::TreeChanged {
                    id: content.id,
                    kind: TreeChangeKind::RefreshBranch,
                });

                if varies && intent.is_publish() {
                    // We got here from a publish action, so either a
                    // mandatory culture or the last culture was unpublished.
                    let langs = self.language_names(&intent.cultures_unpublishing, ctx);
                    self.auditor.log(
                        AuditKind::UnpublishVariant,
                        ctx.user_id,
                        content.id,
                        Some(&format!("unpublished languages: {langs}")),
                        Some(&langs),
                    );
                    let publish_kind = publish_result
                        .as_ref()
                        .map(|r| r.kind)
                        .ok_or_else(|| {
                            ServiceError::InvalidOperation(
                                "missing publish outcome for culture unpublish".to_string(),
                            )
                        })?;
                    let mapped = match publish_kind {
                        PublishResultType::FailedPublishMandatoryCultureMissing => {
                            self.auditor.log(
                                AuditKind::Unpublish,
                                ctx.user_id,
                                content.id,
                                Some("unpublished (mandatory language unpublished)"),
                                None,
                            );
                            PublishResultType::SuccessUnpublishMandatoryCulture
                        }
                        PublishResultType::SuccessUnpublishCulture => {
                            PublishResultType::SuccessUnpublishLastCulture
                        }
                        other => other,
                    };
                    return Ok(PublishResult::new(mapped, content));
                }

                self.auditor.log(
                    AuditKind::Unpublish,
                    ctx.user_id,
                    content.id,
                    Some("unpublished"),
                    None,
                );
                return Ok(PublishResult::new(PublishResultType::SuccessUnpublish, content));
            }

            scope.events().dispatch(&ContentEvent::TreeChanged {
                id: content.id,
                kind: change_type,
            });
            return Ok(result);
        }

        if publishing {
            match publish_result {
                Some(result) if result.succeeded() => {
                    if !is_new && !previously_published {
                        change_type = TreeChangeKind::RefreshBranch;
                    } else if !is_new && previously_published {
                        change_type = TreeChangeKind::RefreshNode;
                    }

                    // Branch operations raise one combined notification instead.
                    if !ctx.branch_one {
                        scope.events().dispatch(&ContentEvent::TreeChanged {
                            id: content.id,
                            kind: change_type,
                        });
                        scope.events().dispatch(&ContentEvent::Published {
                            ids: vec![content.id],
                        });

                        // First publish of an existing item un-masks published
                        // descendants; notify for them too.
                        if !is_new && !previously_published && self.repo.has_children(content.id)? {
                            let descendants = self.published_descendants_locked(content)?;
                            if !descendants.is_empty() {
                                scope
                                    .events()
                                    .dispatch(&ContentEvent::Published { ids: descendants });
                            }
                        }
                    }

                    match result.kind {
                        PublishResultType::SuccessPublish => {
                            self.auditor
                                .log(AuditKind::Publish, ctx.user_id, content.id, Some("published"), None);
                        }
                        PublishResultType::SuccessPublishCulture
                        | PublishResultType::SuccessMixedCulture => {
                            let langs = self.language_names(&intent.cultures_publishing, ctx);
                            self.auditor.log(
                                AuditKind::PublishVariant,
                                ctx.user_id,
                                content.id,
                                Some(&format!("published languages: {langs}")),
                                Some(&langs),
                            );
                        }
                        PublishResultType::SuccessUnpublishCulture => {
                            let langs = self.language_names(&intent.cultures_unpublishing, ctx);
                            self.auditor.log(
                                AuditKind::UnpublishVariant,
                                ctx.user_id,
                                content.id,
                                Some(&format!("unpublished languages: {langs}")),
                                Some(&langs),
                            );
                        }
                        _ => {}
                    }
                    return Ok(result);
                }
                _ if ctx.branch_one && !ctx.branch_root => {
                    return Err(ServiceError::InvalidOperation(
                        "branch descendant reached the save path with a failed publish".to_string(),
                    ));
                }
                _ => {}
            }
        }

        // Publishing did not happen, or failed; the change still settled as
        // a save, so log which cultures were saved.
        if !ctx.branch_one {
            match &cultures_changing {
                Some(cultures) => {
                    let langs = self.language_names(cultures, ctx);
                    self.auditor.log(
                        AuditKind::SaveVariant,
                        ctx.user_id,
                        content.id,
                        Some(&format!("saved languages: {langs}")),
                        Some(&langs),
                    );
                }
                None => {
                    self.auditor
                        .log(AuditKind::Save, ctx.user_id, content.id, Some("saved"), None);
                }
            }
        }

        scope.events().dispatch(&ContentEvent::TreeChanged {
            id: content.id,
            kind: change_type,
        });
        publish_result
            .map(Ok)
            .unwrap_or_else(|| {
                Err(ServiceError::InvalidOperation(
                    "commit settled without an outcome".to_string(),
                ))
            })
    }

    /// Ordered pre-publish checks. Expected refusals come back as failed
    /// results, never errors.
    fn strategy_can_publish(
        &self,
        scope: &Scope,
        content: &Content,
        intent: &PublishIntent,
        ctx: &CommitContext<'_>,
    ) -> ServiceResult<PublishResult> {
        if scope
            .events()
            .dispatch_cancelable(&ContentEvent::Publishing { id: content.id })
        {
            return Ok(PublishResult::new(
                PublishResultType::FailedPublishCancelledByEvent,
                content,
            ));
        }

        let varies = content.varies_by_culture();
        let nothing_requested =
            intent.cultures_publishing.is_empty() && intent.cultures_unpublishing.is_empty();

        if varies && content.published && nothing_requested {
            return Ok(PublishResult::new(
                PublishResultType::FailedPublishNothingToPublish,
                content,
            ));
        }

        if varies {
            let resulting: Vec<String> = intent.resulting_published_cultures(content);
            let missing_mandatory = ctx.languages.iter().any(|lang| {
                lang.mandatory
                    && !resulting
                        .iter()
                        .any(|c| c.eq_ignore_ascii_case(&lang.iso_code))
            });
            if missing_mandatory {
                return Ok(PublishResult::new(
                    PublishResultType::FailedPublishMandatoryCultureMissing,
                    content,
                ));
            }

            if intent.cultures_publishing.is_empty() && !intent.cultures_unpublishing.is_empty() {
                return Ok(PublishResult::new(
                    PublishResultType::SuccessUnpublishCulture,
                    content,
                ));
            }
        }

        if nothing_requested && content.published_version_id == 0 {
            return Ok(PublishResult::new(
                PublishResultType::FailedPublishNothingToPublish,
                content,
            ));
        }

        if varies {
            for culture in &intent.cultures_publishing {
                match content.status(culture, ctx.now) {
                    ContentStatus::Expired => {
                        return Ok(PublishResult::new(
                            PublishResultType::FailedPublishCultureHasExpired,
                            content,
                        ));
                    }
                    ContentStatus::AwaitingRelease => {
                        return Ok(PublishResult::new(
                            PublishResultType::FailedPublishCultureAwaitingRelease,
                            content,
                        ));
                    }
                    ContentStatus::Trashed => {
                        return Ok(PublishResult::new(
                            PublishResultType::FailedPublishIsTrashed,
                            content,
                        ));
                    }
                    ContentStatus::Available => {}
                }
            }
        } else {
            match content.status(CULTURE_ALL, ctx.now) {
                ContentStatus::Expired => {
                    return Ok(PublishResult::new(
                        PublishResultType::FailedPublishHasExpired,
                        content,
                    ));
                }
                ContentStatus::AwaitingRelease => {
                    return Ok(PublishResult::new(
                        PublishResultType::FailedPublishAwaitingRelease,
                        content,
                    ));
                }
                ContentStatus::Trashed => {
                    return Ok(PublishResult::new(
                        PublishResultType::FailedPublishIsTrashed,
                        content,
                    ));
                }
                ContentStatus::Available => {}
            }
        }

        // A branch descendant's ancestors are being published by the same
        // operation, so only the branch root checks its path.
        let check_path = !ctx.branch_one || ctx.branch_root;
        if check_path
            && content.parent_id != ROOT_ID
            && !self.repo.is_path_published(content)?
        {
            return Ok(PublishResult::new(
                PublishResultType::FailedPublishPathNotPublished,
                content,
            ));
        }

        if varies && !intent.cultures_publishing.is_empty() && !intent.cultures_unpublishing.is_empty()
        {
            return Ok(PublishResult::new(
                PublishResultType::SuccessMixedCulture,
                content,
            ));
        }
        Ok(PublishResult::new(PublishResultType::SuccessPublish, content))
    }

    /// Refine the success kind once the checks have passed.
    fn strategy_publish(&self, content: &Content, intent: &PublishIntent) -> PublishResult {
        let kind = if content.varies_by_culture() {
            if !intent.cultures_publishing.is_empty() && !intent.cultures_unpublishing.is_empty() {
                info!(
                    content_id = content.id,
                    publishing = ?intent.cultures_publishing,
                    unpublishing = ?intent.cultures_unpublishing,
                    "document mixed-culture published"
                );
                PublishResultType::SuccessMixedCulture
            } else if intent.cultures_publishing.is_empty() {
                info!(
                    content_id = content.id,
                    unpublishing = ?intent.cultures_unpublishing,
                    "document cultures unpublished"
                );
                PublishResultType::SuccessUnpublishCulture
            } else {
                info!(
                    content_id = content.id,
                    publishing = ?intent.cultures_publishing,
                    "document cultures published"
                );
                PublishResultType::SuccessPublishCulture
            }
        } else {
            info!(content_id = content.id, "document published");
            PublishResultType::SuccessPublish
        };
        PublishResult::new(kind, content)
    }

    fn strategy_can_unpublish(&self, scope: &Scope, content: &Content) -> PublishResult {
        if scope
            .events()
            .dispatch_cancelable(&ContentEvent::Unpublishing { id: content.id })
        {
            return PublishResult::new(PublishResultType::FailedUnpublishCancelledByEvent, content);
        }
        PublishResult::new(PublishResultType::SuccessUnpublish, content)
    }

    fn strategy_unpublish(&self, content: &mut Content, ctx: &CommitContext<'_>) -> PublishResult {
        // An unpublished document cannot keep an overdue auto-release.
        let removed = content.schedule.remove_overdue_releases(ctx.now);
        if removed > 0 {
            debug!(
                content_id = content.id,
                removed, "dropped overdue release schedules on unpublish"
            );
        }
        info!(content_id = content.id, "document unpublished");
        PublishResult::new(PublishResultType::SuccessUnpublish, content)
    }

    fn save_document(
        &self,
        content: &mut Content,
        is_new: bool,
        mode: Persist,
        ctx: &CommitContext<'_>,
    ) -> ServiceResult<()> {
        if is_new && !content.has_identity() {
            content.creator_id = ctx.user_id;
        }
        content.writer_id = ctx.user_id;
        self.repo.save(content, mode)?;
        Ok(())
    }

    /// Ids of published descendants reachable through a published chain from
    /// `content`, in path order.
    pub fn published_descendants_locked(&self, content: &Content) -> ServiceResult<Vec<i32>> {
        let mut reachable: HashSet<i32> = HashSet::from([content.id]);
        let mut ids = Vec::new();
        let mut page = 0;
        loop {
            let (items, total) = self.repo.descendants_page(
                &content.path,
                page,
                self.config.branch_page_size,
                Direction::Ascending,
            )?;
            if items.is_empty() {
                break;
            }
            for item in &items {
                if item.published && reachable.contains(&item.parent_id) {
                    reachable.insert(item.id);
                    ids.push(item.id);
                }
            }
            page += 1;
            if (page * self.config.branch_page_size) as u64 >= total {
                break;
            }
        }
        Ok(ids)
    }

    fn language_names(&self, cultures: &[String], ctx: &CommitContext<'_>) -> String {
        let names: Vec<&str> = ctx
            .languages
            .iter()
            .filter(|lang| {
                cultures
                    .iter()
                    .any(|c| c.eq_ignore_ascii_case(&lang.iso_code))
            })
            .map(|lang| lang.culture_name.as_str())
            .collect();
        names.join(", ")
    }
}
