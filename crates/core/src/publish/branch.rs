//! Branch publishing.
//!
//! Publishes a document and its descendants in one pass: the root first,
//! then descendants page by page in path order so parents always commit
//! before their children. Descendants under a failed node are excluded by
//! parent id instead of re-walking the tree. Per-node notifications are
//! suppressed; the whole branch raises one refresh and one published
//! notification at the end.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::error::{ServiceError, ServiceResult};
use crate::events::{ContentEvent, TreeChangeKind};
use crate::model::{AuditKind, Content, Language, CULTURE_ALL};
use crate::repo::Direction;
use crate::scope::Scope;

use super::intent::PublishIntent;
use super::result::{PublishResult, PublishResultType};
use super::state_machine::{CommitContext, Committer};

type ShouldPublish = dyn Fn(&Content, bool) -> Option<Vec<String>> + Send + Sync;

/// Decides, per document, which cultures a branch publish targets.
///
/// The predicate receives the document and whether it is the branch root and
/// returns `None` to skip the document entirely, an empty list when it is
/// already published with nothing pending, or the cultures to publish.
#[derive(Clone)]
pub struct BranchFilter {
    should_publish: Arc<ShouldPublish>,
}

impl BranchFilter {
    /// Target one culture (or [`CULTURE_ALL`] for every culture).
    pub fn culture(culture: &str, force: bool) -> Self {
        let culture = culture.to_string();
        Self::custom(move |content, is_root| {
            let mut set: Option<Vec<String>> = None;
            if !content.varies_by_culture() {
                accumulate(
                    &mut set,
                    CULTURE_ALL,
                    content.published,
                    content.edited,
                    is_root,
                    force,
                );
                return set;
            }
            if culture == CULTURE_ALL {
                for c in content.available_cultures() {
                    accumulate(
                        &mut set,
                        &c,
                        content.is_culture_published(&c),
                        content.is_culture_edited(&c),
                        is_root,
                        force,
                    );
                }
                return set;
            }
            accumulate(
                &mut set,
                &culture,
                content.is_culture_published(&culture),
                content.is_culture_edited(&culture),
                is_root,
                force,
            );
            set
        })
    }

    /// Target an explicit culture list.
    pub fn cultures(cultures: &[String], force: bool) -> Self {
        let cultures = cultures.to_vec();
        Self::custom(move |content, is_root| {
            let mut set: Option<Vec<String>> = None;
            if !content.varies_by_culture() {
                accumulate(
                    &mut set,
                    CULTURE_ALL,
                    content.published,
                    content.edited,
                    is_root,
                    force,
                );
                return set;
            }
            for culture in &cultures {
                accumulate(
                    &mut set,
                    culture,
                    content.is_culture_published(culture),
                    content.is_culture_edited(culture),
                    is_root,
                    force,
                );
            }
            set
        })
    }

    /// A caller-supplied predicate, for selection rules beyond the built-in
    /// culture strategies.
    pub fn custom<F>(should_publish: F) -> Self
    where
        F: Fn(&Content, bool) -> Option<Vec<String>> + Send + Sync + 'static,
    {
        Self {
            should_publish: Arc::new(should_publish),
        }
    }

    fn cultures_to_publish(&self, content: &Content, is_root: bool) -> Option<Vec<String>> {
        (self.should_publish)(content, is_root)
    }
}

impl std::fmt::Debug for BranchFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BranchFilter").finish()
    }
}

/// Accumulate one culture into the publish set. A published culture
/// republishes only when edited; an unpublished one publishes only when
/// forced or at the branch root.
fn accumulate(
    set: &mut Option<Vec<String>>,
    culture: &str,
    published: bool,
    edited: bool,
    is_root: bool,
    force: bool,
) {
    if published {
        let set = set.get_or_insert_with(Vec::new);
        if edited {
            set.push(culture.to_string());
        }
        return;
    }
    if !force && !is_root {
        return;
    }
    set.get_or_insert_with(Vec::new).push(culture.to_string());
}

/// Publish a branch under the already-held tree lock. Returns one result
/// per visited document; skipped documents produce no result.
pub fn publish_branch_locked(
    committer: &Committer<'_>,
    scope: &Scope,
    content: &mut Content,
    filter: &BranchFilter,
    languages: &[Language],
    user_id: i32,
) -> ServiceResult<Vec<PublishResult>> {
    if !content.has_identity() {
        return Err(ServiceError::InvalidOperation(
            "cannot branch-publish a new document".to_string(),
        ));
    }

    let mut results = Vec::new();
    let mut published_ids = Vec::new();

    if let Some(root_result) = branch_item(
        committer,
        scope,
        content,
        filter,
        true,
        languages,
        user_id,
        &mut published_ids,
    )? {
        let aborted = !root_result.succeeded();
        results.push(root_result);
        if aborted {
            return Ok(results);
        }
    }

    // Descendants in path order: a parent always commits before its
    // children, and children of a failed parent are excluded by id.
    let mut exclude: HashSet<i32> = HashSet::new();
    let mut page = 0;
    loop {
        let (items, _) = committer.repo.descendants_page(
            &content.path,
            page,
            committer.config.branch_page_size,
            Direction::Ascending,
        )?;
        if items.is_empty() {
            break;
        }
        for mut descendant in items {
            if exclude.contains(&descendant.parent_id) {
                exclude.insert(descendant.id);
                continue;
            }
            if let Some(result) = branch_item(
                committer,
                scope,
                &mut descendant,
                filter,
                false,
                languages,
                user_id,
                &mut published_ids,
            )? {
                let failed = !result.succeeded();
                results.push(result);
                if failed {
                    exclude.insert(descendant.id);
                }
            }
        }
        page += 1;
    }

    info!(
        root_id = content.id,
        published = published_ids.len(),
        visited = results.len(),
        "branch published"
    );
    committer.auditor.log(
        AuditKind::Publish,
        user_id,
        content.id,
        Some("branch published"),
        None,
    );
    scope.events().dispatch(&ContentEvent::TreeChanged {
        id: content.id,
        kind: TreeChangeKind::RefreshBranch,
    });
    if !published_ids.is_empty() {
        scope
            .events()
            .dispatch(&ContentEvent::Published { ids: published_ids });
    }
    Ok(results)
}

#[allow(clippy::too_many_arguments)]
fn branch_item(
    committer: &Committer<'_>,
    scope: &Scope,
    content: &mut Content,
    filter: &BranchFilter,
    is_root: bool,
    languages: &[Language],
    user_id: i32,
    published_ids: &mut Vec<i32>,
) -> ServiceResult<Option<PublishResult>> {
    let Some(cultures) = filter.cultures_to_publish(content, is_root) else {
        return Ok(None);
    };
    if cultures.is_empty() {
        return Ok(Some(PublishResult::new(
            PublishResultType::SuccessPublishAlready,
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

    let intent = PublishIntent::publish(content, &cultures);
    let ctx = CommitContext {
        user_id,
        raise_events: true,
        branch_one: true,
        branch_root: is_root,
        languages,
        now: Utc::now(),
    };
    let result = committer.commit_locked(scope, content, &intent, &ctx)?;
    if result.succeeded() {
        published_ids.push(content.id);
    }
    Ok(Some(result))
}
