//! Mutation engine: create dispatch and field-level partial update.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::changes::{apply_field, ChangeSummary};
use crate::error::{CatalogError, Result};
use crate::model::{Header, Record};
use crate::taxonomy::{FieldValue, Taxonomy};

/// Header fields of a new entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEntity {
    pub name: String,
    pub manufacturer: String,
    #[serde(default)]
    pub release: Option<NaiveDate>,
    #[serde(default)]
    pub note: Option<String>,
}

impl NewEntity {
    pub fn new(name: impl Into<String>, manufacturer: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            manufacturer: manufacturer.into(),
            release: None,
            note: None,
        }
    }

    pub fn released(mut self, release: NaiveDate) -> Self {
        self.release = Some(release);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Create payload: header fields, an optional explicit `kind`, and one
/// attribute object keyed by kind tag, e.g. `{"name": .., "cpu": {..}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(serialize = "", deserialize = ""))]
pub struct CreateRequest<A: Taxonomy> {
    #[serde(flatten)]
    pub entity: NewEntity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<A::Kind>,
    #[serde(flatten)]
    pub attributes: A::CreateSets,
}

impl<A: Taxonomy> CreateRequest<A> {
    pub fn typed(entity: NewEntity, attributes: A) -> Self {
        Self {
            entity,
            kind: Some(attributes.kind()),
            attributes: attributes.into_create_sets(),
        }
    }

    /// Resolves the single populated attribute object.
    pub fn dispatch(self) -> Result<(NewEntity, A)> {
        let attributes = A::from_create_sets(self.attributes, self.kind)?;
        Ok((self.entity, attributes))
    }
}

/// Partial update payload. Absent fields are untouched; `note: ""` clears
/// the note.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(serialize = "", deserialize = ""))]
pub struct UpdateRequest<A: Taxonomy> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// When set, the update only applies to this stored version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_version: Option<i64>,
    #[serde(flatten)]
    pub attributes: A::PatchSets,
}

impl<A: Taxonomy> Default for UpdateRequest<A> {
    fn default() -> Self {
        Self {
            name: None,
            manufacturer: None,
            release: None,
            note: None,
            expected_version: None,
            attributes: A::PatchSets::default(),
        }
    }
}

impl<A: Taxonomy> UpdateRequest<A> {
    pub fn with_patch(patch: impl Into<A::Patch>) -> Self {
        Self {
            attributes: A::patch_into_sets(patch.into()),
            ..Self::default()
        }
    }

    pub fn expecting(mut self, version: i64) -> Self {
        self.expected_version = Some(version);
        self
    }
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CatalogError::ValidationFailed(format!(
            "{field} must not be empty"
        )));
    }
    Ok(())
}

/// Builds a version-1 record with a fresh id.
pub fn build_record<A: Taxonomy>(
    entity: NewEntity,
    attributes: A,
    now: DateTime<Utc>,
) -> Result<Record<A>> {
    require_text("name", &entity.name)?;
    require_text("manufacturer", &entity.manufacturer)?;
    Ok(Record {
        header: Header {
            id: Uuid::new_v4(),
            name: entity.name,
            manufacturer: entity.manufacturer,
            release: entity.release,
            note: entity.note.normalized(),
            created_at: now,
            last_edited_at: now,
            version: 1,
        },
        attributes: attributes.normalized(),
    })
}

/// Applies `request` to `record` in place.
///
/// Every check runs before the first assignment, so an error leaves the
/// record untouched. On success `lastEditedAt` is refreshed and `version`
/// incremented even when no field changed.
pub fn apply_update<A: Taxonomy>(
    record: &mut Record<A>,
    request: UpdateRequest<A>,
    now: DateTime<Utc>,
) -> Result<ChangeSummary> {
    if let Some(expected) = request.expected_version {
        if expected != record.header.version {
            return Err(CatalogError::ConflictNotApplied {
                expected,
                actual: record.header.version,
            });
        }
    }
    let patch = A::patch_from_sets(request.attributes)?;
    if let Some(patch) = &patch {
        let patch_kind = A::patch_kind(patch);
        if patch_kind != record.kind() {
            return Err(CatalogError::ValidationFailed(format!(
                "a {patch_kind} patch cannot update {} {}",
                record.kind(),
                record.id()
            )));
        }
    }
    if let Some(name) = &request.name {
        require_text("name", name)?;
    }
    if let Some(manufacturer) = &request.manufacturer {
        require_text("manufacturer", manufacturer)?;
    }

    let mut changes = ChangeSummary::new();
    let header = &mut record.header;
    apply_field(&mut changes, "name", &mut header.name, request.name);
    apply_field(&mut changes, "manufacturer", &mut header.manufacturer, request.manufacturer);
    apply_field(&mut changes, "release", &mut header.release, request.release);
    apply_field(&mut changes, "note", &mut header.note, request.note);
    if let Some(patch) = patch {
        record.attributes.apply_patch(patch, &mut changes)?;
    }
    record.header.last_edited_at = now;
    record.header.version += 1;
    Ok(changes)
}
