//! Publish operation outcomes.

use serde::Serialize;

use crate::model::Content;

/// Fine-grained outcome of a publish or unpublish attempt. Failed variants
/// are expected refusals, reported as values rather than errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PublishResultType {
    SuccessPublish,
    SuccessPublishCulture,
    SuccessPublishAlready,
    SuccessUnpublish,
    SuccessUnpublishAlready,
    SuccessUnpublishCulture,
    /// Unpublishing the last published culture unpublished the document.
    SuccessUnpublishLastCulture,
    /// Unpublishing a mandatory culture unpublished the whole document.
    SuccessUnpublishMandatoryCulture,
    /// Some cultures published while others unpublished in one operation.
    SuccessMixedCulture,
    FailedPublishPathNotPublished,
    FailedPublishHasExpired,
    FailedPublishCultureHasExpired,
    FailedPublishAwaitingRelease,
    FailedPublishCultureAwaitingRelease,
    FailedPublishIsTrashed,
    FailedPublishCancelledByEvent,
    FailedPublishNothingToPublish,
    FailedPublishMandatoryCultureMissing,
    FailedPublishConcurrencyViolation,
    FailedUnpublish,
    FailedUnpublishCancelledByEvent,
}

impl PublishResultType {
    pub fn succeeded(self) -> bool {
        matches!(
            self,
            Self::SuccessPublish
                | Self::SuccessPublishCulture
                | Self::SuccessPublishAlready
                | Self::SuccessUnpublish
                | Self::SuccessUnpublishAlready
                | Self::SuccessUnpublishCulture
                | Self::SuccessUnpublishLastCulture
                | Self::SuccessUnpublishMandatoryCulture
                | Self::SuccessMixedCulture
        )
    }
}

/// The outcome of one publish or unpublish attempt on one document.
#[derive(Debug, Clone, Serialize)]
pub struct PublishResult {
    pub kind: PublishResultType,
    pub content_id: i32,
}

impl PublishResult {
    pub fn new(kind: PublishResultType, content: &Content) -> Self {
        Self {
            kind,
            content_id: content.id,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.kind.succeeded()
    }
}

/// Outcome of a non-publish operation (save, move, sort): either completed
/// or cancelled by a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OperationResult {
    Success,
    Cancelled,
}

impl OperationResult {
    pub fn success() -> Self {
        Self::Success
    }

    pub fn cancelled() -> Self {
        Self::Cancelled
    }

    pub fn succeeded(self) -> bool {
        self == Self::Success
    }
}
