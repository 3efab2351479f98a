//! Feedback recording seam.
//!
//! Persistence is outside this service's scope; the trait is the contract a
//! database-backed implementation plugs into, and [`NoopFeedbackSink`]
//! accepts and logs feedback without storing it.

use std::future::Future;
use std::pin::Pin;

use tracing::info;

use crate::error::AppResult;
use crate::models::{EditFeedbackRequest, ThumbFeedbackRequest};

/// Boxed future so the trait stays object-safe behind `Arc<dyn
/// FeedbackSink>`.
pub type RecordFuture<'a> = Pin<Box<dyn Future<Output = AppResult<()>> + Send + 'a>>;

/// Records user feedback events.
pub trait FeedbackSink: Send + Sync {
    fn record_thumb<'a>(&'a self, req: &'a ThumbFeedbackRequest) -> RecordFuture<'a>;
    fn record_edit<'a>(&'a self, req: &'a EditFeedbackRequest) -> RecordFuture<'a>;
}

/// Sink that acknowledges feedback without persisting it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopFeedbackSink;

impl FeedbackSink for NoopFeedbackSink {
    fn record_thumb<'a>(&'a self, req: &'a ThumbFeedbackRequest) -> RecordFuture<'a> {
        Box::pin(async move {
            info!(
                submission_id = %req.submission.id,
                vote = ?req.vote,
                "Thumb feedback received (persistence disabled)"
            );
            Ok(())
        })
    }

    fn record_edit<'a>(&'a self, req: &'a EditFeedbackRequest) -> RecordFuture<'a> {
        Box::pin(async move {
            info!(
                submission_id = %req.submission.id,
                edited_text_len = req.edited_text.chars().count(),
                "Edit feedback received (persistence disabled)"
            );
            Ok(())
        })
    }
}
