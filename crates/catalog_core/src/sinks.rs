//! Audit and event sinks that need no external system.

use std::sync::Mutex;

use anyhow::anyhow;
use async_trait::async_trait;
use tracing::info;

use crate::ports::{AuditEntry, AuditSink, DomainEvent, EventPublisher};

/// Writes audit entries as structured `tracing` events under the `audit` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, entry: &AuditEntry) -> anyhow::Result<()> {
        info!(
            target: "audit",
            actor_id = %entry.actor_id,
            action = entry.action.as_str(),
            entity_kind = %entry.entity_kind,
            entity_id = %entry.entity_id,
            source_ip = entry.source_ip.as_deref().unwrap_or("-"),
            severity = entry.severity.as_str(),
            "{}",
            entry.message
        );
        Ok(())
    }
}

/// Logs events; for deployments without a bus.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventPublisher;

#[async_trait]
impl EventPublisher for TracingEventPublisher {
    async fn publish(&self, event: &DomainEvent) -> anyhow::Result<()> {
        info!(target: "events", name = %event.name, payload = %event.payload, "domain event");
        Ok(())
    }
}

/// Keeps every audit entry in memory.
#[derive(Debug, Default)]
pub struct RecordingAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl RecordingAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AuditSink for RecordingAuditSink {
    async fn record(&self, entry: &AuditEntry) -> anyhow::Result<()> {
        let mut entries = self.entries.lock().map_err(|e| anyhow!("Lock: {}", e))?;
        entries.push(entry.clone());
        Ok(())
    }
}

/// Keeps every published event in memory.
#[derive(Debug, Default)]
pub struct RecordingEventPublisher {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DomainEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn names(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.name).collect()
    }
}

#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish(&self, event: &DomainEvent) -> anyhow::Result<()> {
        let mut events = self.events.lock().map_err(|e| anyhow!("Lock: {}", e))?;
        events.push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{AuditAction, Severity};
    use chrono::Utc;
    use serde_json::json;

    #[tokio::test]
    async fn recording_sinks_keep_order() {
        let audit = RecordingAuditSink::new();
        for id in ["a", "b"] {
            audit
                .record(&AuditEntry {
                    actor_id: "admin".into(),
                    action: AuditAction::Delete,
                    entity_kind: "color".into(),
                    source_ip: None,
                    entity_id: id.into(),
                    severity: Severity::Warning,
                    message: "deleted".into(),
                })
                .await
                .unwrap();
        }
        let ids: Vec<_> = audit.entries().into_iter().map(|e| e.entity_id).collect();
        assert_eq!(ids, vec!["a", "b"]);

        let events = RecordingEventPublisher::new();
        events
            .publish(&DomainEvent {
                name: "color.deleted".into(),
                payload: json!({ "code": "BLK" }),
                occurred_at: Utc::now(),
            })
            .await
            .unwrap();
        assert_eq!(events.names(), vec!["color.deleted"]);
    }

    #[tokio::test]
    async fn tracing_sinks_never_fail() {
        let entry = AuditEntry {
            actor_id: "admin".into(),
            action: AuditAction::Create,
            entity_kind: "component:cpu".into(),
            source_ip: Some("127.0.0.1".into()),
            entity_id: "x".into(),
            severity: Severity::Info,
            message: "created".into(),
        };
        assert!(TracingAuditSink.record(&entry).await.is_ok());
        let event = DomainEvent {
            name: "component.created".into(),
            payload: json!({}),
            occurred_at: Utc::now(),
        };
        assert!(TracingEventPublisher.publish(&event).await.is_ok());
    }
}
