//! Port traits the catalog depends on.
//! Implemented by `MemoryStore` here and by catalog_postgres; core logic only
//! sees these traits.
//!
//! Every store method is one atomic unit: either all of its row changes are
//! visible afterwards or none are.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::CatalogError;
use crate::model::{
    Color, ColorCascade, ComponentColor, ComponentCompatibility, ComponentPart, ComponentVariant,
    Record, SubComponentPart,
};
use crate::query::EntityQuery;
use crate::taxonomy::{ComponentAttributes, SubComponentAttributes, Taxonomy};

pub type Result<T> = std::result::Result<T, CatalogError>;

/// Storage of one entity family (header + kind attributes).
#[async_trait]
pub trait EntityStore<A: Taxonomy>: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Record<A>>>;

    /// Filtered, ordered and paged per `query`.
    async fn find_many(&self, query: &EntityQuery<A>) -> Result<Vec<Record<A>>>;

    async fn insert(&self, record: &Record<A>) -> Result<()>;

    /// Writes `record` only if the stored version still equals
    /// `loaded_version`; otherwise `ConflictNotApplied`.
    async fn update(&self, record: &Record<A>, loaded_version: i64) -> Result<()>;

    /// Deletes the entity together with its variants, color associations,
    /// part edges and compatibility edges. Returns false when absent.
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

/// Part and compatibility edges.
///
/// Inserts check that both endpoints exist (`InvalidReference`) and that the
/// ordered pair is new (`ValidationFailed`).
#[async_trait]
pub trait RelationStore: Send + Sync {
    // ── Component parts ────────────────────────────────────────

    async fn insert_component_part(&self, part: &ComponentPart) -> Result<()>;
    async fn delete_component_part(&self, component_id: Uuid, sub_component_id: Uuid)
        -> Result<bool>;
    async fn component_parts(&self, component_id: Uuid) -> Result<Vec<ComponentPart>>;

    // ── Sub-component parts ────────────────────────────────────

    async fn insert_sub_component_part(&self, part: &SubComponentPart) -> Result<()>;
    async fn delete_sub_component_part(&self, sub_component_id: Uuid, part_id: Uuid)
        -> Result<bool>;
    async fn sub_component_parts(&self, sub_component_id: Uuid) -> Result<Vec<SubComponentPart>>;

    // ── Compatibility ──────────────────────────────────────────

    async fn insert_compatibility(&self, edge: &ComponentCompatibility) -> Result<()>;
    async fn delete_compatibility(
        &self,
        component_id: Uuid,
        compatible_component_id: Uuid,
    ) -> Result<bool>;
    /// Outgoing edges only.
    async fn compatibilities(&self, component_id: Uuid) -> Result<Vec<ComponentCompatibility>>;
}

#[async_trait]
pub trait ColorStore: Send + Sync {
    async fn find_color(&self, code: &str) -> Result<Option<Color>>;
    async fn list_colors(&self) -> Result<Vec<Color>>;
    /// `ValidationFailed` when the code is taken.
    async fn insert_color(&self, color: &Color) -> Result<()>;
    async fn update_color(&self, color: &Color) -> Result<bool>;

    /// Deletes every variant joined to the color, the color's component
    /// associations, then the color. `None` when the color is absent.
    async fn delete_color(&self, code: &str) -> Result<Option<ColorCascade>>;

    /// Inserts the association, creating `new_color` first when given.
    async fn insert_component_color(
        &self,
        association: &ComponentColor,
        new_color: Option<&Color>,
    ) -> Result<()>;
    async fn delete_component_color(&self, component_id: Uuid, code: &str) -> Result<bool>;
    async fn component_colors(&self, component_id: Uuid) -> Result<Vec<Color>>;
}

#[async_trait]
pub trait VariantStore: Send + Sync {
    async fn find_variant(&self, id: Uuid) -> Result<Option<ComponentVariant>>;
    async fn component_variants(&self, component_id: Uuid) -> Result<Vec<ComponentVariant>>;

    /// Writes the variant row and one join row per color code. Fails with
    /// `NotFound` for a missing component and `InvalidReference` for a
    /// missing color, writing nothing.
    async fn insert_variant(&self, variant: &ComponentVariant) -> Result<()>;

    /// Writes the scalar fields; with `replace_colors` the join rows are
    /// replaced by `variant.color_codes` after every code is resolved.
    async fn update_variant(&self, variant: &ComponentVariant, replace_colors: bool) -> Result<()>;

    async fn delete_variant(&self, id: Uuid) -> Result<bool>;

    /// Variants whose component name plus color names contain every token.
    async fn search_variants(&self, text: &str) -> Result<Vec<ComponentVariant>>;
}

/// Everything the catalog service needs from storage.
pub trait CatalogStore:
    EntityStore<ComponentAttributes>
    + EntityStore<SubComponentAttributes>
    + RelationStore
    + ColorStore
    + VariantStore
{
    fn components(&self) -> &dyn EntityStore<ComponentAttributes>;
    fn sub_components(&self) -> &dyn EntityStore<SubComponentAttributes>;
}

impl<T> CatalogStore for T
where
    T: EntityStore<ComponentAttributes>
        + EntityStore<SubComponentAttributes>
        + RelationStore
        + ColorStore
        + VariantStore,
{
    fn components(&self) -> &dyn EntityStore<ComponentAttributes> {
        self
    }

    fn sub_components(&self) -> &dyn EntityStore<SubComponentAttributes> {
        self
    }
}

/// Picks a family's entity store out of a `CatalogStore`.
pub trait StoredFamily: Taxonomy {
    fn entities(store: &dyn CatalogStore) -> &dyn EntityStore<Self>;
}

impl StoredFamily for ComponentAttributes {
    fn entities(store: &dyn CatalogStore) -> &dyn EntityStore<Self> {
        store.components()
    }
}

impl StoredFamily for SubComponentAttributes {
    fn entities(store: &dyn CatalogStore) -> &dyn EntityStore<Self> {
        store.sub_components()
    }
}

// ── Side effects ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    pub actor_id: String,
    pub action: AuditAction,
    pub entity_kind: String,
    pub source_ip: Option<String>,
    pub entity_id: String,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainEvent {
    /// Dotted name, e.g. `component.created`.
    pub name: String,
    pub payload: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

/// Receives audit entries. Failures are logged by the caller, never surfaced.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: &AuditEntry) -> anyhow::Result<()>;
}

/// Receives domain events. Failures are logged by the caller, never surfaced.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &DomainEvent) -> anyhow::Result<()>;
}
