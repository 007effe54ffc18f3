//! Stored entity shapes: the shared header, typed records, and the
//! relation / color / variant rows.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CatalogError, Result};
use crate::query::BaseSortKey;
use crate::taxonomy::{
    ComponentAttributes, FieldValue, KindTag, SortValue, SubComponentAttributes, Taxonomy,
};

/// Base fields every component and sub-component carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    pub id: Uuid,
    pub name: String,
    pub manufacturer: String,
    pub release: Option<NaiveDate>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_edited_at: DateTime<Utc>,
    pub version: i64,
}

impl Header {
    pub fn sort_value(&self, key: BaseSortKey) -> SortValue {
        match key {
            BaseSortKey::Name => SortValue::Text(self.name.clone()),
            BaseSortKey::Manufacturer => SortValue::Text(self.manufacturer.clone()),
            BaseSortKey::Release => self.release.sort_value(),
            BaseSortKey::CreatedAt => SortValue::Timestamp(self.created_at),
            BaseSortKey::LastEditedAt => SortValue::Timestamp(self.last_edited_at),
        }
    }
}

/// A header plus exactly one concrete kind's attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Record<A> {
    pub header: Header,
    pub attributes: A,
}

pub type Component = Record<ComponentAttributes>;
pub type SubComponent = Record<SubComponentAttributes>;

impl<A: Taxonomy> Record<A> {
    pub fn id(&self) -> Uuid {
        self.header.id
    }

    pub fn kind(&self) -> A::Kind {
        self.attributes.kind()
    }

    /// Base searchable fields followed by the kind's searchable fields.
    pub fn search_text(&self) -> Vec<&str> {
        let mut text = vec![self.header.name.as_str(), self.header.manufacturer.as_str()];
        text.extend(self.attributes.search_text());
        text
    }

    pub fn to_stored(&self) -> Result<StoredEntity> {
        let attributes = self
            .attributes
            .to_json()
            .map_err(|e| anyhow::anyhow!("encode {} attributes: {e}", self.kind()))?;
        Ok(StoredEntity {
            header: self.header.clone(),
            kind: self.kind().as_str().to_string(),
            attributes,
        })
    }
}

/// Untyped row as a storage adapter reads it: header, discriminator string
/// and the attribute object.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEntity {
    pub header: Header,
    pub kind: String,
    pub attributes: serde_json::Value,
}

impl StoredEntity {
    /// Fails with `UnrecognizedKind` when the discriminator is not registered.
    pub fn decode<A: Taxonomy>(self) -> Result<Record<A>> {
        let kind = <A::Kind as KindTag>::parse(&self.kind).ok_or_else(|| {
            CatalogError::UnrecognizedKind(format!(
                "{} {} has kind '{}'",
                A::FAMILY,
                self.header.id,
                self.kind
            ))
        })?;
        let attributes = A::from_json(kind, self.attributes).map_err(|e| {
            anyhow::anyhow!("decode {kind} attributes of {}: {e}", self.header.id)
        })?;
        Ok(Record {
            header: self.header,
            attributes,
        })
    }
}

// ── Relations ─────────────────────────────────────────────────

/// Component is composed of `amount` of a sub-component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentPart {
    pub component_id: Uuid,
    pub sub_component_id: Uuid,
    pub amount: i32,
}

/// Sub-component is composed of `amount` of another sub-component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubComponentPart {
    pub sub_component_id: Uuid,
    pub part_id: Uuid,
    pub amount: i32,
}

/// Stored-directed edge; the reverse direction is a separate row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentCompatibility {
    pub component_id: Uuid,
    pub compatible_component_id: Uuid,
}

// ── Colors and variants ───────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Color {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentColor {
    pub component_id: Uuid,
    pub color_code: String,
}

/// Purchasable variant. `color_codes` mirrors the variant's join rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentVariant {
    pub id: Uuid,
    pub component_id: Uuid,
    pub is_available: bool,
    pub additional_price: Option<Decimal>,
    pub note: Option<String>,
    pub color_codes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_edited_at: DateTime<Utc>,
}

/// Variant-to-color join row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorVariant {
    pub variant_id: Uuid,
    pub color_code: String,
}

/// Outcome of a color delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorCascade {
    pub removed_variants: Vec<Uuid>,
    pub removed_component_colors: usize,
}
