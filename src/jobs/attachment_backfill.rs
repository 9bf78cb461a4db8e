use async_trait::async_trait;
use serde_json::json;

use super::{JobContext, JobError, JobOutcome, MaintenanceJob};
use crate::services::file_service;

/// Fills in stored sizes for uploaded files that do not have one yet and
/// corrects the owner's quota from the declared size to the real one
pub struct AttachmentBackfillJob {
    pub batch_size: i64,
}

#[async_trait]
impl MaintenanceJob for AttachmentBackfillJob {
    fn name(&self) -> &'static str {
        "attachment-backfill"
    }

    async fn run(&self, ctx: &JobContext) -> Result<JobOutcome, JobError> {
        let files = file_service::missing_sizes(&ctx.pool, self.batch_size.max(1)).await?;
        let checked = files.len();
        let mut updated = 0u64;
        let mut missing = 0u64;
        let mut failed = 0u64;

        for file in files {
            match ctx.storage.object_size(&file.object_key).await {
                Ok(Some(size)) => {
                    if file_service::set_size(&ctx.pool, file.id, size).await? {
                        updated += 1;
                    }
                }
                Ok(None) => {
                    tracing::warn!("Object {} for file {} is missing from storage", file.object_key, file.id);
                    missing += 1;
                }
                Err(e) => {
                    tracing::warn!("Size lookup failed for file {}: {}", file.id, e);
                    failed += 1;
                }
            }
        }

        Ok(JobOutcome::new(
            updated,
            json!({ "checked": checked, "updated": updated, "missing": missing, "failed": failed }),
        ))
    }
}
