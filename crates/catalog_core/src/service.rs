//! Catalog service: the operations callers invoke.
//!
//! Entity operations are generic over the family (`ComponentAttributes` or
//! `SubComponentAttributes`). Mutations require a privileged caller, run as
//! one store call, then report to the audit sink and event publisher. Side
//! effect failures are logged and never returned.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::changes::ChangeSummary;
use crate::config::CatalogConfig;
use crate::context::CallerContext;
use crate::error::{CatalogError, Result};
use crate::mutation::{apply_update, build_record, CreateRequest, NewEntity, UpdateRequest};
use crate::ports::{
    AuditAction, AuditEntry, AuditSink, CatalogStore, DomainEvent, EventPublisher, Severity,
    StoredFamily,
};
use crate::projection::{project, project_all, EntityView};
use crate::query::{EntityQuery, QueryEngine, QueryRequest};
use crate::store_memory::MemoryStore;
use crate::sinks::{TracingAuditSink, TracingEventPublisher};
use crate::taxonomy::KindTag;

pub struct CatalogService {
    pub(crate) store: Arc<dyn CatalogStore>,
    audit: Arc<dyn AuditSink>,
    events: Arc<dyn EventPublisher>,
    config: CatalogConfig,
    queries: QueryEngine,
}

impl CatalogService {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        audit: Arc<dyn AuditSink>,
        events: Arc<dyn EventPublisher>,
        config: CatalogConfig,
    ) -> Self {
        Self {
            store,
            audit,
            events,
            config,
            queries: QueryEngine::new(config),
        }
    }

    /// Memory store with tracing sinks.
    pub fn in_memory(config: CatalogConfig) -> Self {
        Self::new(
            Arc::new(MemoryStore::new()),
            Arc::new(TracingAuditSink),
            Arc::new(TracingEventPublisher),
            config,
        )
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn CatalogStore {
        self.store.as_ref()
    }

    // ── Side effects ───────────────────────────────────────────

    pub(crate) async fn audit(
        &self,
        ctx: &CallerContext,
        action: AuditAction,
        entity_kind: impl Into<String>,
        entity_id: impl ToString,
        severity: Severity,
        message: impl Into<String>,
    ) {
        let entry = AuditEntry {
            actor_id: ctx.actor_id.clone(),
            action,
            entity_kind: entity_kind.into(),
            source_ip: ctx.source_ip.clone(),
            entity_id: entity_id.to_string(),
            severity,
            message: message.into(),
        };
        if let Err(e) = self.audit.record(&entry).await {
            warn!(
                error = %e,
                entity_kind = %entry.entity_kind,
                entity_id = %entry.entity_id,
                "audit sink failed; mutation kept"
            );
        }
    }

    pub(crate) async fn emit(&self, name: impl Into<String>, payload: serde_json::Value) {
        let event = DomainEvent {
            name: name.into(),
            payload,
            occurred_at: Utc::now(),
        };
        if let Err(e) = self.events.publish(&event).await {
            warn!(error = %e, event = %event.name, "event publish failed; mutation kept");
        }
    }

    // ── Entities ───────────────────────────────────────────────

    /// Creates an entity from a wire payload and returns its id.
    pub async fn create<A: StoredFamily>(
        &self,
        ctx: &CallerContext,
        request: CreateRequest<A>,
    ) -> Result<Uuid> {
        ctx.require_privileged(&format!("create {}", A::FAMILY))?;
        let (entity, attributes) = request.dispatch()?;
        self.insert_entity(ctx, entity, attributes).await
    }

    /// Creates an entity from already-typed attributes.
    pub async fn create_typed<A: StoredFamily>(
        &self,
        ctx: &CallerContext,
        entity: NewEntity,
        attributes: A,
    ) -> Result<Uuid> {
        ctx.require_privileged(&format!("create {}", A::FAMILY))?;
        self.insert_entity(ctx, entity, attributes).await
    }

    async fn insert_entity<A: StoredFamily>(
        &self,
        ctx: &CallerContext,
        entity: NewEntity,
        attributes: A,
    ) -> Result<Uuid> {
        let record = build_record(entity, attributes, Utc::now())?;
        let id = record.id();
        let kind = record.kind();
        A::entities(self.store()).insert(&record).await?;

        info!(family = A::FAMILY, %kind, %id, name = %record.header.name, "created");
        self.audit(
            ctx,
            AuditAction::Create,
            format!("{}:{kind}", A::FAMILY),
            id,
            Severity::Info,
            format!("Created {kind} '{}'", record.header.name),
        )
        .await;
        self.emit(
            format!("{}.created", A::FAMILY),
            json!({ "id": id, "kind": kind.as_str(), "name": record.header.name }),
        )
        .await;
        Ok(id)
    }

    /// Applies a partial update and returns the change summary.
    pub async fn update<A: StoredFamily>(
        &self,
        ctx: &CallerContext,
        id: Uuid,
        request: UpdateRequest<A>,
    ) -> Result<ChangeSummary> {
        ctx.require_privileged(&format!("update {}", A::FAMILY))?;
        let store = A::entities(self.store());
        let mut record = store
            .find_by_id(id)
            .await?
            .ok_or_else(|| CatalogError::not_found(A::FAMILY, id))?;
        let loaded_version = record.header.version;
        let changes = apply_update(&mut record, request, Utc::now())?;

        if let Err(e) = store.update(&record, loaded_version).await {
            if let CatalogError::ConflictNotApplied { expected, actual } = &e {
                warn!(family = A::FAMILY, %id, expected, actual, "concurrent update refused");
            }
            return Err(e);
        }

        let kind = record.kind();
        info!(family = A::FAMILY, %kind, %id, changed = changes.len(), "updated");
        self.audit(
            ctx,
            AuditAction::Update,
            format!("{}:{kind}", A::FAMILY),
            id,
            Severity::Info,
            changes.to_string(),
        )
        .await;
        self.emit(
            format!("{}.updated", A::FAMILY),
            json!({
                "id": id,
                "kind": kind.as_str(),
                "version": record.header.version,
                "changedFields": changes.fields(),
            }),
        )
        .await;
        Ok(changes)
    }

    pub async fn get<A: StoredFamily>(&self, ctx: &CallerContext, id: Uuid) -> Result<EntityView<A>> {
        let record = A::entities(self.store())
            .find_by_id(id)
            .await?
            .ok_or_else(|| CatalogError::not_found(A::FAMILY, id))?;
        Ok(project(&record, ctx.is_privileged))
    }

    pub async fn query<A: StoredFamily>(
        &self,
        ctx: &CallerContext,
        request: QueryRequest<A>,
    ) -> Result<Vec<EntityView<A>>> {
        let query = self.queries.build(request)?;
        self.run_query(ctx, &query).await
    }

    pub async fn query_typed<A: StoredFamily>(
        &self,
        ctx: &CallerContext,
        query: EntityQuery<A>,
    ) -> Result<Vec<EntityView<A>>> {
        query.validate(&self.config)?;
        self.run_query(ctx, &query).await
    }

    async fn run_query<A: StoredFamily>(
        &self,
        ctx: &CallerContext,
        query: &EntityQuery<A>,
    ) -> Result<Vec<EntityView<A>>> {
        let records = A::entities(self.store()).find_many(query).await?;
        Ok(project_all(&records, ctx.is_privileged))
    }

    /// Deletes the entity and everything attached to it.
    pub async fn delete<A: StoredFamily>(&self, ctx: &CallerContext, id: Uuid) -> Result<()> {
        ctx.require_privileged(&format!("delete {}", A::FAMILY))?;
        let store = A::entities(self.store());
        let record = store
            .find_by_id(id)
            .await?
            .ok_or_else(|| CatalogError::not_found(A::FAMILY, id))?;
        if !store.delete(id).await? {
            return Err(CatalogError::not_found(A::FAMILY, id));
        }

        let kind = record.kind();
        info!(family = A::FAMILY, %kind, %id, "deleted");
        self.audit(
            ctx,
            AuditAction::Delete,
            format!("{}:{kind}", A::FAMILY),
            id,
            Severity::Warning,
            format!("Deleted {kind} '{}'", record.header.name),
        )
        .await;
        self.emit(
            format!("{}.deleted", A::FAMILY),
            json!({ "id": id, "kind": kind.as_str() }),
        )
        .await;
        Ok(())
    }
}
