#![allow(dead_code)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Shared test fixture: services wired over in-memory repositories, with
//! every dispatched event captured for assertions.

use std::sync::Arc;

use parking_lot::Mutex;

use arbor_core::config::CoreConfig;
use arbor_core::events::{ContentEvent, EventBus};
use arbor_core::model::{Content, ContentType, Language, ROOT_ID, SUPER_USER_ID};
use arbor_core::repo::{
    MemoryAuditRepository, MemoryContentRepository, MemoryContentTypeRepository,
    MemoryLanguageRepository,
};
use arbor_core::scope::ScopeProvider;
use arbor_core::{ContentService, ContentTypeService};

pub struct Fixture {
    pub content: ContentService,
    pub types: ContentTypeService,
    pub content_repo: Arc<MemoryContentRepository>,
    pub type_repo: Arc<MemoryContentTypeRepository>,
    pub language_repo: Arc<MemoryLanguageRepository>,
    pub audit_repo: Arc<MemoryAuditRepository>,
    pub events: EventBus,
    captured: Arc<Mutex<Vec<ContentEvent>>>,
}

impl Fixture {
    pub fn new() -> Self {
        // RUST_LOG=arbor_core=debug surfaces service logs while debugging.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let events = EventBus::new();
        let captured = Arc::new(Mutex::new(Vec::new()));
        let sink = captured.clone();
        events.observe(move |event| sink.lock().push(event.clone()));

        let scopes = ScopeProvider::with_events(events.clone());
        let content_repo = Arc::new(MemoryContentRepository::new());
        let type_repo = Arc::new(MemoryContentTypeRepository::new());
        let language_repo = Arc::new(MemoryLanguageRepository::new());
        let audit_repo = Arc::new(MemoryAuditRepository::new());

        let content = ContentService::new(
            scopes.clone(),
            content_repo.clone(),
            type_repo.clone(),
            language_repo.clone(),
            audit_repo.clone(),
            CoreConfig::default(),
        );
        let types = ContentTypeService::new(
            scopes,
            type_repo.clone(),
            content_repo.clone(),
            audit_repo.clone(),
            CoreConfig::default(),
        );

        Self {
            content,
            types,
            content_repo,
            type_repo,
            language_repo,
            audit_repo,
            events,
            captured,
        }
    }

    /// Save (and return) an invariant content type.
    pub fn invariant_type(&self, alias: &str) -> ContentType {
        let mut content_type = ContentType::new(alias, alias, false);
        self.types.save(&mut content_type, SUPER_USER_ID).unwrap();
        content_type
    }

    /// Save (and return) a culture-variant content type.
    pub fn variant_type(&self, alias: &str) -> ContentType {
        let mut content_type = ContentType::new(alias, alias, true);
        self.types.save(&mut content_type, SUPER_USER_ID).unwrap();
        content_type
    }

    pub fn add_language(&self, language: Language) {
        self.language_repo.add(language);
    }

    /// Create and save a content item under `parent_id`.
    pub fn saved_page(&self, name: &str, parent_id: i32, type_alias: &str) -> Content {
        let mut item = self
            .content
            .create(name, parent_id, type_alias, SUPER_USER_ID)
            .unwrap();
        self.content.save(&mut item, SUPER_USER_ID).unwrap();
        item
    }

    /// Create, save, and publish a content item under `parent_id`.
    pub fn published_page(&self, name: &str, parent_id: i32, type_alias: &str) -> Content {
        let mut item = self
            .content
            .create(name, parent_id, type_alias, SUPER_USER_ID)
            .unwrap();
        let result = self
            .content
            .save_and_publish(&mut item, "*", SUPER_USER_ID)
            .unwrap();
        assert!(result.succeeded(), "fixture publish failed: {:?}", result.kind);
        item
    }

    pub fn captured_events(&self) -> Vec<ContentEvent> {
        self.captured.lock().clone()
    }

    pub fn clear_events(&self) {
        self.captured.lock().clear();
    }

    /// Reload an item from the store.
    pub fn reload(&self, id: i32) -> Content {
        self.content.get(id).unwrap().expect("content should exist")
    }
}

/// A tree of three invariant pages: root -> child -> grandchild.
pub fn three_level_tree(fixture: &Fixture) -> (Content, Content, Content) {
    fixture.invariant_type("page");
    let root = fixture.published_page("Root", ROOT_ID, "page");
    let child = fixture.published_page("Child", root.id, "page");
    let grandchild = fixture.published_page("Grandchild", child.id, "page");
    (root, child, grandchild)
}
