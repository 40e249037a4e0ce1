//! Audit trail model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditKind {
    New,
    Save,
    SaveVariant,
    Publish,
    PublishVariant,
    Unpublish,
    UnpublishVariant,
    Move,
    Copy,
    Delete,
    Sort,
}

/// One audit trail entry. Writing an entry is fire-and-forget: a failing
/// audit sink never fails the operation being audited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub object_id: i32,
    pub kind: AuditKind,
    pub user_id: i32,
    pub entity_type: String,
    pub message: Option<String>,
    pub parameters: Option<String>,
    pub created: DateTime<Utc>,
}
