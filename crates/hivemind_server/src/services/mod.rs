//! Core services behind the tool surface and the reviewer CLI.

pub mod approval;
pub mod ingest;
pub mod prescreen;
pub mod retrieval;
pub mod reviewer;

pub use approval::{ApprovalRequest, ApprovalService};
pub use ingest::{IngestReceipt, IngestService};
pub use prescreen::{PrescreenReport, PrescreenService, QualityBadge, QualityIndex, SimilarEntry};
pub use retrieval::{RetrievalService, SearchRequest, SearchResponse};
pub use reviewer::ReviewerService;

use std::future::Future;
use std::time::Duration;

use tracing::error;

use hivemind_db::DbError;
use hivemind_embed::EmbedError;
use hivemind_types::CoreError;

/// Map store errors into the service taxonomy. Anything unexpected
/// becomes an opaque internal error; the cause is logged with the
/// correlation id, never surfaced.
pub(crate) fn map_db_error(err: DbError) -> CoreError {
    match err {
        DbError::Duplicate => CoreError::Duplicate,
        DbError::Gone => CoreError::Gone,
        other => {
            let mapped = CoreError::internal();
            if let CoreError::Internal { correlation_id } = &mapped {
                error!(%correlation_id, error = %other, "store failure");
            }
            mapped
        }
    }
}

pub(crate) fn map_embed_error(err: EmbedError) -> CoreError {
    match err {
        EmbedError::Busy => CoreError::busy("embedding queue saturated"),
        EmbedError::Inference(cause) => {
            let mapped = CoreError::internal();
            if let CoreError::Internal { correlation_id } = &mapped {
                error!(%correlation_id, error = %cause, "embedding failure");
            }
            mapped
        }
    }
}

/// Enforce the per-request deadline around a service call.
pub async fn with_deadline<T, F>(deadline: Duration, fut: F) -> Result<T, CoreError>
where
    F: Future<Output = Result<T, CoreError>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(CoreError::busy("deadline exceeded")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deadline_miss_is_busy() {
        let result: Result<(), CoreError> = with_deadline(Duration::from_millis(5), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(CoreError::Busy(_))));
    }

    #[tokio::test]
    async fn deadline_pass_through() {
        let result = with_deadline(Duration::from_secs(1), async { Ok::<_, CoreError>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }
}
