use async_trait::async_trait;
use serde_json::json;

use super::{JobContext, JobError, JobOutcome, MaintenanceJob};
use crate::services::{audit_service, dlq_service, notification_service};

/// Deletes read notifications, old audit rows and settled DLQ messages
pub struct RetentionJob {
    pub notification_days: i64,
    pub audit_days: i64,
    pub dlq_days: i64,
}

#[async_trait]
impl MaintenanceJob for RetentionJob {
    fn name(&self) -> &'static str {
        "retention"
    }

    async fn run(&self, ctx: &JobContext) -> Result<JobOutcome, JobError> {
        let notifications = notification_service::purge_read_older_than(&ctx.pool, self.notification_days).await?;
        let audit_logs = audit_service::purge_older_than(&ctx.pool, self.audit_days).await?;
        let dlq = dlq_service::purge_settled_older_than(&ctx.pool, self.dlq_days).await?;

        Ok(JobOutcome::new(
            notifications + audit_logs + dlq,
            json!({
                "notifications": notifications,
                "audit_logs": audit_logs,
                "dlq_messages": dlq,
            }),
        ))
    }
}
