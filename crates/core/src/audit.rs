//! Audit trail writer.

use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use crate::model::{AuditEntry, AuditKind};
use crate::repo::AuditRepository;

/// Writes audit entries. A failing sink is logged and swallowed so the
/// audited operation is never failed by its own bookkeeping.
#[derive(Clone)]
pub struct Auditor {
    sink: Arc<dyn AuditRepository>,
    entity_type: &'static str,
}

impl Auditor {
    pub fn for_documents(sink: Arc<dyn AuditRepository>) -> Self {
        Self {
            sink,
            entity_type: "document",
        }
    }

    pub fn for_content_types(sink: Arc<dyn AuditRepository>) -> Self {
        Self {
            sink,
            entity_type: "content-type",
        }
    }

    pub fn log(
        &self,
        kind: AuditKind,
        user_id: i32,
        object_id: i32,
        message: Option<&str>,
        parameters: Option<&str>,
    ) {
        let entry = AuditEntry {
            object_id,
            kind,
            user_id,
            entity_type: self.entity_type.to_string(),
            message: message.map(str::to_string),
            parameters: parameters.map(str::to_string),
            created: Utc::now(),
        };
        if let Err(error) = self.sink.save(&entry) {
            warn!(object_id, ?kind, %error, "audit write failed");
        }
    }
}

impl std::fmt::Debug for Auditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Auditor")
            .field("entity_type", &self.entity_type)
            .finish()
    }
}
