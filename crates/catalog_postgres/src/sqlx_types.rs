//! Row types read with `sqlx::FromRow`, converted into catalog_core shapes.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use catalog_core::model::{Color, ComponentVariant, Header, StoredEntity};

#[derive(Debug, sqlx::FromRow)]
pub struct PgEntityRow {
    pub id: Uuid,
    pub kind: String,
    pub name: String,
    pub manufacturer: String,
    pub release: Option<NaiveDate>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_edited_at: DateTime<Utc>,
    pub version: i64,
    pub attributes: serde_json::Value,
}

impl From<PgEntityRow> for StoredEntity {
    fn from(row: PgEntityRow) -> Self {
        StoredEntity {
            header: Header {
                id: row.id,
                name: row.name,
                manufacturer: row.manufacturer,
                release: row.release,
                note: row.note,
                created_at: row.created_at,
                last_edited_at: row.last_edited_at,
                version: row.version,
            },
            kind: row.kind,
            attributes: row.attributes,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct PgColorRow {
    pub code: String,
    pub name: String,
    pub note: Option<String>,
}

impl From<PgColorRow> for Color {
    fn from(row: PgColorRow) -> Self {
        Color {
            code: row.code,
            name: row.name,
            note: row.note,
        }
    }
}

/// Variant row with its color codes aggregated in join order.
#[derive(Debug, sqlx::FromRow)]
pub struct PgVariantRow {
    pub id: Uuid,
    pub component_id: Uuid,
    pub is_available: bool,
    pub additional_price: Option<Decimal>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_edited_at: DateTime<Utc>,
    pub color_codes: Vec<String>,
}

impl From<PgVariantRow> for ComponentVariant {
    fn from(row: PgVariantRow) -> Self {
        ComponentVariant {
            id: row.id,
            component_id: row.component_id,
            is_available: row.is_available,
            additional_price: row.additional_price,
            note: row.note,
            color_codes: row.color_codes,
            created_at: row.created_at,
            last_edited_at: row.last_edited_at,
        }
    }
}
