#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use chrono::{Duration, Utc};

use arbor_core::model::{ScheduleAction, ROOT_ID, SUPER_USER_ID};
use arbor_core::publish::PublishResultType;

use common::Fixture;

#[test]
fn due_releases_are_published_and_consumed() {
    let fixture = Fixture::new();
    fixture.invariant_type("page");
    let now = Utc::now();

    let mut home = fixture.saved_page("Home", ROOT_ID, "page");
    home.schedule
        .add("*", ScheduleAction::Release, now - Duration::minutes(5));
    fixture.content.save(&mut home, SUPER_USER_ID).unwrap();

    let results = fixture.content.perform_scheduled_publish(now).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].kind, PublishResultType::SuccessPublish);

    let stored = fixture.reload(home.id);
    assert!(stored.published);
    assert!(stored.schedule.is_empty());

    // Nothing is left for a second pass.
    assert!(fixture
        .content
        .perform_scheduled_publish(now)
        .unwrap()
        .is_empty());
}

#[test]
fn future_schedules_are_left_alone() {
    let fixture = Fixture::new();
    fixture.invariant_type("page");
    let now = Utc::now();

    let mut home = fixture.saved_page("Home", ROOT_ID, "page");
    home.schedule
        .add("*", ScheduleAction::Release, now + Duration::hours(1));
    fixture.content.save(&mut home, SUPER_USER_ID).unwrap();

    assert!(fixture
        .content
        .perform_scheduled_publish(now)
        .unwrap()
        .is_empty());
    let stored = fixture.reload(home.id);
    assert!(!stored.published);
    assert_eq!(stored.schedule.entries().len(), 1);
}

#[test]
fn due_expirations_unpublish_the_document() {
    let fixture = Fixture::new();
    fixture.invariant_type("page");
    let now = Utc::now();

    let mut home = fixture.published_page("Home", ROOT_ID, "page");
    home.schedule
        .add("*", ScheduleAction::Expire, now - Duration::minutes(5));
    fixture.content.save(&mut home, SUPER_USER_ID).unwrap();

    let results = fixture.content.perform_scheduled_publish(now).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].kind, PublishResultType::SuccessUnpublish);

    let stored = fixture.reload(home.id);
    assert!(!stored.published);
    assert!(stored.schedule.is_empty());
}

#[test]
fn releases_run_before_expirations() {
    let fixture = Fixture::new();
    fixture.invariant_type("page");
    let now = Utc::now();

    let mut expiring = fixture.published_page("Expiring", ROOT_ID, "page");
    expiring
        .schedule
        .add("*", ScheduleAction::Expire, now - Duration::minutes(5));
    fixture.content.save(&mut expiring, SUPER_USER_ID).unwrap();

    let mut releasing = fixture.saved_page("Releasing", ROOT_ID, "page");
    releasing
        .schedule
        .add("*", ScheduleAction::Release, now - Duration::minutes(5));
    fixture.content.save(&mut releasing, SUPER_USER_ID).unwrap();

    let results = fixture.content.perform_scheduled_publish(now).unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].content_id, releasing.id);
    assert_eq!(results[0].kind, PublishResultType::SuccessPublish);
    assert_eq!(results[1].content_id, expiring.id);
    assert_eq!(results[1].kind, PublishResultType::SuccessUnpublish);

    assert!(fixture.reload(releasing.id).published);
    assert!(!fixture.reload(expiring.id).published);
}

#[test]
fn an_overdue_expiry_blocks_an_overdue_release() {
    let fixture = Fixture::new();
    fixture.invariant_type("page");
    let now = Utc::now();

    let mut home = fixture.saved_page("Home", ROOT_ID, "page");
    home.schedule
        .add("*", ScheduleAction::Release, now - Duration::minutes(10));
    home.schedule
        .add("*", ScheduleAction::Expire, now - Duration::minutes(5));
    fixture.content.save(&mut home, SUPER_USER_ID).unwrap();

    let results = fixture.content.perform_scheduled_publish(now).unwrap();
    assert_eq!(results[0].kind, PublishResultType::FailedPublishHasExpired);
    assert!(!fixture.reload(home.id).published);
}

#[test]
fn a_due_release_on_a_variant_culture_publishes_only_that_culture() {
    let fixture = Fixture::new();
    fixture.variant_type("post");
    let now = Utc::now();

    let mut post = fixture
        .content
        .create("Post", ROOT_ID, "post", SUPER_USER_ID)
        .unwrap();
    post.set_culture_name("en-us", "Post");
    post.set_culture_name("da-dk", "Indlæg");
    let result = fixture
        .content
        .save_and_publish(&mut post, "en-us", SUPER_USER_ID)
        .unwrap();
    assert!(result.succeeded());

    post.schedule
        .add("da-dk", ScheduleAction::Release, now - Duration::minutes(5));
    fixture.content.save(&mut post, SUPER_USER_ID).unwrap();

    let results = fixture.content.perform_scheduled_publish(now).unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].succeeded());

    let stored = fixture.reload(post.id);
    assert!(stored.is_culture_published("en-us"));
    assert!(stored.is_culture_published("da-dk"));
    assert!(stored.schedule.is_empty());
}

#[test]
fn a_due_expiration_on_a_variant_culture_keeps_the_others() {
    let fixture = Fixture::new();
    fixture.variant_type("post");
    let now = Utc::now();

    let mut post = fixture
        .content
        .create("Post", ROOT_ID, "post", SUPER_USER_ID)
        .unwrap();
    post.set_culture_name("en-us", "Post");
    post.set_culture_name("da-dk", "Indlæg");
    fixture
        .content
        .save_and_publish(&mut post, "*", SUPER_USER_ID)
        .unwrap();

    post.schedule
        .add("da-dk", ScheduleAction::Expire, now - Duration::minutes(5));
    fixture.content.save(&mut post, SUPER_USER_ID).unwrap();

    let results = fixture.content.perform_scheduled_publish(now).unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].succeeded());

    let stored = fixture.reload(post.id);
    assert!(stored.published);
    assert!(stored.is_culture_published("en-us"));
    assert!(!stored.is_culture_published("da-dk"));
}

#[test]
fn a_trashed_document_fails_its_release_but_consumes_the_schedule() {
    let fixture = Fixture::new();
    fixture.invariant_type("page");
    let now = Utc::now();

    let mut home = fixture.saved_page("Home", ROOT_ID, "page");
    home.schedule
        .add("*", ScheduleAction::Release, now - Duration::minutes(5));
    fixture.content.save(&mut home, SUPER_USER_ID).unwrap();
    fixture
        .content
        .move_to_recycle_bin(&mut home, SUPER_USER_ID)
        .unwrap();

    let results = fixture.content.perform_scheduled_publish(now).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].kind, PublishResultType::FailedPublishIsTrashed);

    let stored = fixture.reload(home.id);
    assert!(!stored.published);
    assert!(stored.schedule.is_empty());

    assert!(fixture
        .content
        .perform_scheduled_publish(now)
        .unwrap()
        .is_empty());
}
