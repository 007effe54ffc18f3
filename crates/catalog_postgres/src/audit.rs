//! Audit log and transactional-outbox sinks.

use anyhow::anyhow;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use catalog_core::ports::{AuditEntry, AuditSink, DomainEvent, EventPublisher};

// ── PgAuditSink ───────────────────────────────────────────────

pub struct PgAuditSink {
    pool: PgPool,
}

impl PgAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn record(&self, entry: &AuditEntry) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO catalog.audit_log (
                actor_id, action, entity_kind, source_ip,
                entity_id, severity, message
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&entry.actor_id)
        .bind(entry.action.as_str())
        .bind(&entry.entity_kind)
        .bind(&entry.source_ip)
        .bind(&entry.entity_id)
        .bind(entry.severity.as_str())
        .bind(&entry.message)
        .execute(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(())
    }
}

// ── PgOutboxPublisher ─────────────────────────────────────────

/// Enqueues events into `catalog.outbox_events`; a relay outside this crate
/// drains them.
pub struct PgOutboxPublisher {
    pool: PgPool,
}

impl PgOutboxPublisher {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Events not yet marked processed, oldest first.
    pub async fn pending(&self, limit: i64) -> anyhow::Result<Vec<(Uuid, DomainEvent)>> {
        let rows = sqlx::query_as::<_, (Uuid, String, serde_json::Value, chrono::DateTime<chrono::Utc>)>(
            r#"
            SELECT event_id, event_name, payload, occurred_at
            FROM catalog.outbox_events
            WHERE processed_at IS NULL
            ORDER BY outbox_seq
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(rows
            .into_iter()
            .map(|(event_id, name, payload, occurred_at)| {
                (
                    event_id,
                    DomainEvent {
                        name,
                        payload,
                        occurred_at,
                    },
                )
            })
            .collect())
    }

    pub async fn mark_processed(&self, event_id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE catalog.outbox_events
            SET processed_at = now()
            WHERE event_id = $1 AND processed_at IS NULL
            "#,
        )
        .bind(event_id)
        .execute(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl EventPublisher for PgOutboxPublisher {
    async fn publish(&self, event: &DomainEvent) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO catalog.outbox_events (event_id, event_name, payload, occurred_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&event.name)
        .bind(&event.payload)
        .bind(event.occurred_at)
        .execute(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(())
    }
}
