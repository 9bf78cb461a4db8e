use async_trait::async_trait;
use serde_json::json;

use super::{JobContext, JobError, JobOutcome, MaintenanceJob};
use crate::services::file_service;

pub struct QuotaReconcileJob {
    pub default_quota_bytes: i64,
}

#[async_trait]
impl MaintenanceJob for QuotaReconcileJob {
    fn name(&self) -> &'static str {
        "quota-reconcile"
    }

    async fn run(&self, ctx: &JobContext) -> Result<JobOutcome, JobError> {
        let owners = file_service::reconcile_quotas(&ctx.pool, self.default_quota_bytes).await?;
        Ok(JobOutcome::new(owners, json!({ "owners": owners })))
    }
}
