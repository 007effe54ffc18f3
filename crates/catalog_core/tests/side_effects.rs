//! Audit entries and domain events around mutations.

mod common;

use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use catalog_core::ports::{AuditAction, AuditEntry, AuditSink, DomainEvent, EventPublisher};
use catalog_core::taxonomy::CpuPatch;
use catalog_core::{
    CatalogConfig, CatalogService, Color, ComponentAttributes, MemoryStore, NewEntity,
    UpdateRequest,
};
use common::{admin, Harness};

struct BrokenAudit;

#[async_trait]
impl AuditSink for BrokenAudit {
    async fn record(&self, _entry: &AuditEntry) -> anyhow::Result<()> {
        Err(anyhow!("audit table unavailable"))
    }
}

struct BrokenBus;

#[async_trait]
impl EventPublisher for BrokenBus {
    async fn publish(&self, _event: &DomainEvent) -> anyhow::Result<()> {
        Err(anyhow!("broker down"))
    }
}

#[tokio::test]
async fn failing_sinks_do_not_fail_mutations() {
    let service = CatalogService::new(
        Arc::new(MemoryStore::new()),
        Arc::new(BrokenAudit),
        Arc::new(BrokenBus),
        CatalogConfig::fixed(),
    );
    let id = service
        .create_typed(
            &admin(),
            NewEntity::new("Ryzen 7 7700X", "AMD"),
            ComponentAttributes::Cpu(common::cpu()),
        )
        .await
        .unwrap();
    let changes = service
        .update(
            &admin(),
            id,
            UpdateRequest::<ComponentAttributes>::with_patch(CpuPatch {
                tdp: Some(65),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
    assert_eq!(changes.fields(), vec!["tdp"]);
    service
        .create_color(
            &admin(),
            Color {
                code: "BLK".into(),
                name: "Black".into(),
                note: None,
            },
        )
        .await
        .unwrap();
    service.delete::<ComponentAttributes>(&admin(), id).await.unwrap();
}

#[tokio::test]
async fn mutations_are_audited_with_caller_details() {
    let h = Harness::new();
    let id = h.cpu("Ryzen 7 7700X").await;
    h.service
        .update(
            &admin(),
            id,
            UpdateRequest::<ComponentAttributes>::with_patch(CpuPatch {
                tdp: Some(65),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
    h.service.delete::<ComponentAttributes>(&admin(), id).await.unwrap();

    let entries = h.audit.entries();
    let actions: Vec<_> = entries.iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![AuditAction::Create, AuditAction::Update, AuditAction::Delete]
    );
    let update = &entries[1];
    assert_eq!(update.actor_id, "admin");
    assert_eq!(update.source_ip.as_deref(), Some("127.0.0.1"));
    assert_eq!(update.entity_kind, "component:cpu");
    assert_eq!(update.entity_id, id.to_string());
    assert_eq!(update.message, "Updated Fields: tdp (previously 105)");
    assert_eq!(entries[2].severity.as_str(), "warning");
}

#[tokio::test]
async fn events_are_named_by_family() {
    let h = Harness::new();
    let cpu = h.cpu("Ryzen 7 7700X").await;
    let lan = h.ethernet("2.5G LAN").await;
    h.service.delete::<ComponentAttributes>(&admin(), cpu).await.unwrap();

    assert_eq!(
        h.events.names(),
        vec!["component.created", "subComponent.created", "component.deleted"]
    );
    let created = &h.events.events()[1];
    assert_eq!(created.payload["id"], serde_json::json!(lan));
    assert_eq!(created.payload["kind"], "onboardEthernet");
}

#[tokio::test]
async fn rejected_mutations_leave_no_trace() {
    let h = Harness::new();
    let id = h.cpu("Ryzen 7 7700X").await;
    let stale = UpdateRequest::<ComponentAttributes>::default().expecting(7);
    assert!(h.service.update(&admin(), id, stale).await.is_err());
    assert!(h
        .service
        .update(&common::guest(), id, UpdateRequest::<ComponentAttributes>::default())
        .await
        .is_err());

    assert_eq!(h.audit.entries().len(), 1);
    assert_eq!(h.events.names(), vec!["component.created"]);
}
