//! Service façades.
//!
//! Handles are cheap to clone and share their state behind an `Arc`; every
//! public operation opens a scope, takes the coarse locks it needs, and
//! completes the scope on the happy path.

mod content;
mod content_type;

pub use content::ContentService;
pub use content_type::ContentTypeService;
