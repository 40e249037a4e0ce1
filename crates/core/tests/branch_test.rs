#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use arbor_core::events::{ContentEvent, EventResponse};
use arbor_core::model::{ROOT_ID, SUPER_USER_ID};
use arbor_core::publish::PublishResultType;
use arbor_core::ServiceError;

use common::{three_level_tree, Fixture};

#[test]
fn branch_publish_republishes_only_edited_documents() {
    let fixture = Fixture::new();
    let (mut root, child, grandchild) = three_level_tree(&fixture);

    // Only the middle document carries edits.
    let mut edited = fixture.reload(child.id);
    edited.edited = true;
    fixture.content.save(&mut edited, SUPER_USER_ID).unwrap();

    let results = fixture
        .content
        .save_and_publish_branch(&mut root, false, "*", SUPER_USER_ID)
        .unwrap();
    assert_eq!(results.len(), 3);

    let kind_of = |id: i32| {
        results
            .iter()
            .find(|r| r.content_id == id)
            .map(|r| r.kind)
            .unwrap()
    };
    assert_eq!(kind_of(root.id), PublishResultType::SuccessPublishAlready);
    assert_eq!(kind_of(child.id), PublishResultType::SuccessPublish);
    assert_eq!(
        kind_of(grandchild.id),
        PublishResultType::SuccessPublishAlready
    );
}

#[test]
fn branch_publish_raises_one_combined_published_notification() {
    let fixture = Fixture::new();
    let (mut root, child, grandchild) = three_level_tree(&fixture);

    for id in [child.id, grandchild.id] {
        let mut edited = fixture.reload(id);
        edited.edited = true;
        fixture.content.save(&mut edited, SUPER_USER_ID).unwrap();
    }
    fixture.clear_events();

    fixture
        .content
        .save_and_publish_branch(&mut root, false, "*", SUPER_USER_ID)
        .unwrap();

    let events = fixture.captured_events();
    let published: Vec<&ContentEvent> = events
        .iter()
        .filter(|e| matches!(e, ContentEvent::Published { .. }))
        .collect();
    assert_eq!(published.len(), 1);
    assert!(
        matches!(published[0], ContentEvent::Published { ids } if ids.contains(&child.id) && ids.contains(&grandchild.id))
    );

    let tree_changes = events
        .iter()
        .filter(|e| matches!(e, ContentEvent::TreeChanged { .. }))
        .count();
    assert_eq!(tree_changes, 1);
}

#[test]
fn unpublished_descendants_publish_only_when_forced() {
    let fixture = Fixture::new();
    fixture.invariant_type("page");
    let mut root = fixture.published_page("Root", ROOT_ID, "page");
    let draft = fixture.saved_page("Draft", root.id, "page");

    let results = fixture
        .content
        .save_and_publish_branch(&mut root, false, "*", SUPER_USER_ID)
        .unwrap();
    assert!(results.iter().all(|r| r.content_id != draft.id));
    assert!(!fixture.reload(draft.id).published);

    let results = fixture
        .content
        .save_and_publish_branch(&mut root, true, "*", SUPER_USER_ID)
        .unwrap();
    let draft_result = results.iter().find(|r| r.content_id == draft.id).unwrap();
    assert!(draft_result.succeeded());
    assert!(fixture.reload(draft.id).published);
}

#[test]
fn a_failing_document_excludes_its_subtree() {
    let fixture = Fixture::new();
    let (mut root, child, grandchild) = three_level_tree(&fixture);

    for id in [child.id, grandchild.id] {
        let mut edited = fixture.reload(id);
        edited.edited = true;
        fixture.content.save(&mut edited, SUPER_USER_ID).unwrap();
    }

    let blocked = child.id;
    fixture.events.subscribe(move |event| match event {
        ContentEvent::Publishing { id } if *id == blocked => EventResponse::Cancel,
        _ => EventResponse::Continue,
    });
    let grandchild_version = fixture.reload(grandchild.id).version_id;

    let results = fixture
        .content
        .save_and_publish_branch(&mut root, false, "*", SUPER_USER_ID)
        .unwrap();

    let child_result = results.iter().find(|r| r.content_id == child.id).unwrap();
    assert_eq!(
        child_result.kind,
        PublishResultType::FailedPublishCancelledByEvent
    );
    // The grandchild sits under the failed document and is never visited.
    assert!(results.iter().all(|r| r.content_id != grandchild.id));
    assert_eq!(fixture.reload(grandchild.id).version_id, grandchild_version);
}

#[test]
fn branch_publishing_a_new_document_is_an_error() {
    let fixture = Fixture::new();
    fixture.invariant_type("page");
    let mut unsaved = fixture
        .content
        .create("Home", ROOT_ID, "page", SUPER_USER_ID)
        .unwrap();
    let error = fixture
        .content
        .save_and_publish_branch(&mut unsaved, false, "*", SUPER_USER_ID)
        .unwrap_err();
    assert!(matches!(error, ServiceError::InvalidOperation(_)));
}
