//! Domain models.

pub mod audit;
pub mod content;
pub mod content_type;
pub mod language;

pub use audit::{AuditEntry, AuditKind};
pub use content::{
    Content, ContentSchedule, ContentStatus, CultureInfo, ScheduleAction, ScheduleEntry,
};
pub use content_type::{ContentType, GroupKind, PropertyGroup, PropertyType};
pub use language::Language;

/// Id of the conceptual tree root. Root-level content has this parent id.
pub const ROOT_ID: i32 = -1;

/// Id of the recycle-bin root. Trashed content hangs off this sentinel.
pub const RECYCLE_BIN_ID: i32 = -20;

/// Path prefix of root-level content.
pub const ROOT_PATH: &str = "-1";

/// Path prefix of recycle-bin content.
pub const RECYCLE_BIN_PATH: &str = "-1,-20";

/// User id used for system-initiated operations.
pub const SUPER_USER_ID: i32 = -1;

/// Culture token meaning "all cultures" (and the single pseudo-culture of
/// invariant content types).
pub const CULTURE_ALL: &str = "*";
