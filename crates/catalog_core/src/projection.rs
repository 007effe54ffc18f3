//! Projection engine: caller-appropriate views of stored entities.
//!
//! Public views carry the header, the discriminator and the entity's own
//! kind fields. Privileged views add the administrative fields listed in
//! [`crate::taxonomy::registry::REDACTED_FIELDS`].

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::error::Result;
use crate::model::{Color, ComponentVariant, Record, StoredEntity};
use crate::taxonomy::Taxonomy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminFields {
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_edited_at: DateTime<Utc>,
    pub version: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", bound(serialize = ""))]
pub struct EntityView<A: Taxonomy> {
    pub id: Uuid,
    pub kind: A::Kind,
    pub name: String,
    pub manufacturer: String,
    pub release: Option<NaiveDate>,
    #[serde(flatten)]
    pub attributes: A,
    #[serde(flatten)]
    pub admin: Option<AdminFields>,
}

impl<A: Taxonomy> EntityView<A> {
    pub fn is_privileged(&self) -> bool {
        self.admin.is_some()
    }
}

pub fn project<A: Taxonomy>(record: &Record<A>, privileged: bool) -> EntityView<A> {
    let header = &record.header;
    EntityView {
        id: header.id,
        kind: record.kind(),
        name: header.name.clone(),
        manufacturer: header.manufacturer.clone(),
        release: header.release,
        attributes: record.attributes.clone(),
        admin: privileged.then(|| AdminFields {
            note: header.note.clone(),
            created_at: header.created_at,
            last_edited_at: header.last_edited_at,
            version: header.version,
        }),
    }
}

pub fn project_all<A: Taxonomy>(records: &[Record<A>], privileged: bool) -> Vec<EntityView<A>> {
    records.iter().map(|r| project(r, privileged)).collect()
}

/// Decodes and projects an untyped row; unregistered discriminators fail
/// with `UnrecognizedKind`.
pub fn project_stored<A: Taxonomy>(stored: StoredEntity, privileged: bool) -> Result<EntityView<A>> {
    let record = stored.decode::<A>()?;
    Ok(project(&record, privileged))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantAdminFields {
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_edited_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantView {
    pub id: Uuid,
    pub component_id: Uuid,
    pub is_available: bool,
    pub additional_price: Option<Decimal>,
    pub color_codes: Vec<String>,
    #[serde(flatten)]
    pub admin: Option<VariantAdminFields>,
}

pub fn project_variant(variant: &ComponentVariant, privileged: bool) -> VariantView {
    VariantView {
        id: variant.id,
        component_id: variant.component_id,
        is_available: variant.is_available,
        additional_price: variant.additional_price,
        color_codes: variant.color_codes.clone(),
        admin: privileged.then(|| VariantAdminFields {
            note: variant.note.clone(),
            created_at: variant.created_at,
            last_edited_at: variant.last_edited_at,
        }),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorView {
    pub code: String,
    pub name: String,
    /// Present only for privileged callers; an absent note then serializes as null.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<Option<String>>,
}

pub fn project_color(color: &Color, privileged: bool) -> ColorView {
    ColorView {
        code: color.code.clone(),
        name: color.name.clone(),
        note: privileged.then(|| color.note.clone()),
    }
}
