//! Content management core: the application service layer over a content
//! tree.
//!
//! The crate provides two service façades. [`ContentService`] owns the
//! content lifecycle: create/save, the publish state machine (immediate,
//! per-culture, scheduled, and whole branches), moves and the recycle bin,
//! deletes, and sorting. [`ContentTypeService`] owns content type
//! definitions and validates the composition graph on every change.
//!
//! Services are handles over shared state: clone them freely and call them
//! from any thread. Every operation runs inside a [`scope::Scope`] that
//! takes coarse read/write locks and dispatches lifecycle events through an
//! explicit [`events::EventBus`] registry.
//!
//! ```
//! use std::sync::Arc;
//!
//! use arbor_core::config::CoreConfig;
//! use arbor_core::model::{ContentType, ROOT_ID, SUPER_USER_ID};
//! use arbor_core::repo::{
//!     MemoryAuditRepository, MemoryContentRepository, MemoryContentTypeRepository,
//!     MemoryLanguageRepository,
//! };
//! use arbor_core::scope::ScopeProvider;
//! use arbor_core::{ContentService, ContentTypeService};
//!
//! # fn main() -> Result<(), arbor_core::error::ServiceError> {
//! let scopes = ScopeProvider::new();
//! let content_repo = Arc::new(MemoryContentRepository::new());
//! let type_repo = Arc::new(MemoryContentTypeRepository::new());
//! let language_repo = Arc::new(MemoryLanguageRepository::new());
//! let audit_repo = Arc::new(MemoryAuditRepository::new());
//!
//! let types = ContentTypeService::new(
//!     scopes.clone(),
//!     type_repo.clone(),
//!     content_repo.clone(),
//!     audit_repo.clone(),
//!     CoreConfig::default(),
//! );
//! let mut page = ContentType::new("page", "Page", false);
//! types.save(&mut page, SUPER_USER_ID)?;
//!
//! let content = ContentService::new(
//!     scopes,
//!     content_repo,
//!     type_repo,
//!     language_repo,
//!     audit_repo,
//!     CoreConfig::default(),
//! );
//! let mut home = content.create("Home", ROOT_ID, "page", SUPER_USER_ID)?;
//! let result = content.save_and_publish(&mut home, "*", SUPER_USER_ID)?;
//! assert!(result.succeeded());
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod composition;
pub mod config;
pub mod error;
pub mod events;
pub mod model;
pub mod publish;
pub mod repo;
pub mod scope;
pub mod service;
pub mod tree;

pub use error::{ServiceError, ServiceResult};
pub use service::{ContentService, ContentTypeService};
