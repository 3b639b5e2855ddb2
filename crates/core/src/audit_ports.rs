//! Audit trail port

use async_trait::async_trait;
use washslot_domain::{AuditEvent, Result};

/// Best-effort sink for audit events. Callers log failures and move on.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: AuditEvent) -> Result<()>;
}

/// Sink that drops every event, for deployments without an audit store.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditSink;

#[async_trait]
impl AuditSink for NoopAuditSink {
    async fn record(&self, _event: AuditEvent) -> Result<()> {
        Ok(())
    }
}
