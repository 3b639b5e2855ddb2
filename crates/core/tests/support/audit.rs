use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use washslot_core::AuditSink;
use washslot_domain::{AuditEvent, Result as DomainResult, WashSlotError};

/// Keeps every recorded event. Can be told to fail.
#[derive(Default, Clone)]
pub struct RecordingAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
    failing: Arc<Mutex<bool>>,
}

impl RecordingAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let sink = Self::default();
        *sink.failing.lock().unwrap() = true;
        sink
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(AuditEvent::name).collect()
    }
}

#[async_trait]
impl AuditSink for RecordingAuditSink {
    async fn record(&self, event: AuditEvent) -> DomainResult<()> {
        if *self.failing.lock().unwrap() {
            return Err(WashSlotError::Internal("audit store offline".into()));
        }
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}
