//! Registry lookups over the declared kinds.
//!
//! Everything here is static data; the lookups exist so callers (and the
//! storage adapters) can work from a discriminator string instead of a typed
//! kind.

use chrono::NaiveDate;
use serde::Serialize;

use super::{FieldDescriptor, FilterClass, KindTag};

/// Header fields shared by every entity in both families.
pub const BASE_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::of::<String>("name", true),
    FieldDescriptor::of::<String>("manufacturer", true),
    FieldDescriptor::of::<Option<NaiveDate>>("release", false),
    FieldDescriptor::of::<Option<String>>("note", false),
];

/// Fields only privileged callers see.
pub const REDACTED_FIELDS: &[&str] = &["createdAt", "lastEditedAt", "note", "version"];

/// Keys a projection writes alongside the kind fields. No kind may declare them.
pub const RESERVED_KEYS: &[&str] = &[
    "id",
    "kind",
    "name",
    "manufacturer",
    "release",
    "note",
    "createdAt",
    "lastEditedAt",
    "version",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KindDescriptor<K> {
    pub kind: K,
    pub tag: &'static str,
    pub fields: &'static [FieldDescriptor],
    pub redacted: &'static [&'static str],
}

impl<K: KindTag> KindDescriptor<K> {
    pub fn of(kind: K) -> Self {
        Self {
            kind,
            tag: kind.as_str(),
            fields: kind.fields(),
            redacted: REDACTED_FIELDS,
        }
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn searchable(&self) -> impl Iterator<Item = &'static FieldDescriptor> {
        self.fields.iter().filter(|f| f.searchable)
    }

    pub fn filterable(&self, class: FilterClass) -> impl Iterator<Item = &'static FieldDescriptor> {
        self.fields.iter().filter(move |f| f.filter == class)
    }

    pub fn clearable(&self) -> impl Iterator<Item = &'static FieldDescriptor> {
        self.fields.iter().filter(|f| f.is_clearable())
    }
}

/// Resolves a discriminator tag; `None` for tags no kind declares.
pub fn lookup<K: KindTag>(tag: &str) -> Option<KindDescriptor<K>> {
    K::parse(tag).map(KindDescriptor::of)
}

pub fn all<K: KindTag>() -> Vec<KindDescriptor<K>> {
    K::all().iter().copied().map(KindDescriptor::of).collect()
}

pub fn base_field(name: &str) -> Option<&'static FieldDescriptor> {
    BASE_FIELDS.iter().find(|f| f.name == name)
}
