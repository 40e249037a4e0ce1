//! Tree structure maintenance: moves and recursive deletes.
//!
//! A move rewrites the path and level of the moved item and every
//! descendant. Descendants are visited in path order and each new path is
//! derived from the already-rewritten path of its parent, carried in a map,
//! so one pass suffices and the path invariant holds transitively.

use anyhow::Result;
use std::collections::HashMap;

use tracing::{debug, info};

use crate::config::CoreConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::events::{ContentEvent, EventBus};
use crate::model::{Content, RECYCLE_BIN_ID, RECYCLE_BIN_PATH, ROOT_PATH};
use crate::repo::{ContentRepository, Direction, Persist};

/// Move `content` under `parent_id`, rewriting paths and levels for the
/// whole subtree. `parent` is the resolved target (None for the sentinels).
/// Each touched node is appended to `moves` with its original path. `trash`
/// forces the trashed flag on the subtree; `None` leaves it untouched.
pub fn perform_move_locked(
    repo: &dyn ContentRepository,
    config: &CoreConfig,
    content: &mut Content,
    parent_id: i32,
    parent: Option<&Content>,
    user_id: i32,
    moves: &mut Vec<(Content, String)>,
    trash: Option<bool>,
) -> ServiceResult<()> {
    // Everything under the moved node shifts by the same depth delta.
    let level_delta = 1 - content.level + parent.map_or(0, |p| p.level);

    let original_path = content.path.clone();
    content.parent_id = parent_id;
    perform_move_content(repo, content, user_id, trash)?;

    let parent_path = match parent {
        Some(p) => p.path.clone(),
        None if parent_id == RECYCLE_BIN_ID => RECYCLE_BIN_PATH.to_string(),
        None => ROOT_PATH.to_string(),
    };

    // Map from node id to its rewritten path, seeded with the moved node.
    let mut paths: HashMap<i32, String> = HashMap::new();
    content.path = format!("{parent_path},{}", content.id);
    content.level += level_delta;
    paths.insert(content.id, content.path.clone());
    moves.push((content.clone(), original_path.clone()));

    debug!(
        content_id = content.id,
        from = %original_path,
        to = %content.path,
        "moving subtree"
    );

    // Page 0 repeatedly: each processed page is re-parented out of the
    // original path prefix, so the remainder shifts into page 0.
    loop {
        let (descendants, total) = repo.descendants_page(
            &original_path,
            0,
            config.move_page_size,
            Direction::Ascending,
        )?;
        if descendants.is_empty() {
            break;
        }
        for mut descendant in descendants {
            let descendant_original = descendant.path.clone();
            let parent_path = paths.get(&descendant.parent_id).cloned().ok_or_else(|| {
                ServiceError::InvalidOperation(format!(
                    "invalid path for content {}: parent {} not yet moved",
                    descendant.id, descendant.parent_id
                ))
            })?;
            descendant.path = format!("{parent_path},{}", descendant.id);
            paths.insert(descendant.id, descendant.path.clone());
            descendant.level += level_delta;
            perform_move_content(repo, &mut descendant, user_id, trash)?;
            moves.push((descendant, descendant_original));
        }
        if total <= config.move_page_size as u64 {
            break;
        }
    }
    Ok(())
}

fn perform_move_content(
    repo: &dyn ContentRepository,
    content: &mut Content,
    user_id: i32,
    trash: Option<bool>,
) -> Result<()> {
    if let Some(trashed) = trash {
        content.trashed = trashed;
    }
    content.writer_id = user_id;
    repo.save(content, Persist::SaveOnly)
}

/// Delete `content` and every descendant, children before parents so no
/// orphan is ever observable. Dispatches a deleted notification per node.
pub fn delete_locked(
    repo: &dyn ContentRepository,
    events: &EventBus,
    config: &CoreConfig,
    content: &Content,
) -> ServiceResult<()> {
    loop {
        // Deepest first; page 0 refills as rows are deleted.
        let (descendants, total) = repo.descendants_page(
            &content.path,
            0,
            config.delete_page_size,
            Direction::Descending,
        )?;
        if descendants.is_empty() {
            break;
        }
        for descendant in descendants {
            repo.delete(descendant.id)?;
            events.dispatch(&ContentEvent::Deleted { id: descendant.id });
        }
        if total <= config.delete_page_size as u64 {
            break;
        }
    }
    repo.delete(content.id)?;
    events.dispatch(&ContentEvent::Deleted { id: content.id });
    info!(content_id = content.id, "content deleted");
    Ok(())
}
