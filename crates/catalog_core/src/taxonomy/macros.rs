//! Declarative generators for the taxonomy.
//!
//! `kind_fields!` turns one field list into the stored attribute struct, the
//! update patch, the kind filter and the sort-key enum of a single kind.
//! `taxonomy_family!` ties a set of kinds into a family: the discriminator
//! enum, the attribute sum type and the `Taxonomy` implementation. Every
//! per-kind `match` is generated, so a kind missing from any of them does not
//! compile.

macro_rules! kind_fields {
    (@search) => {
        false
    };
    (@search search) => {
        true
    };
    (
        $(#[$meta:meta])*
        $fields:ident, $patch:ident, $filter:ident, $sort:ident {
            $(
                $field:ident ($variant:ident): $ty:ty => $wire:literal $(, $search:ident)?;
            )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
        #[serde(deny_unknown_fields)]
        pub struct $fields {
            $(
                #[serde(rename = $wire)]
                pub $field: $ty,
            )+
        }

        /// Partial update. Absent fields are left untouched.
        #[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
        #[serde(default, deny_unknown_fields)]
        pub struct $patch {
            $(
                #[serde(rename = $wire, skip_serializing_if = "Option::is_none")]
                pub $field: Option<<$ty as $crate::taxonomy::FieldValue>::Input>,
            )+
        }

        /// Kind-scoped filter. Absent fields impose no constraint.
        #[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
        #[serde(default, deny_unknown_fields)]
        pub struct $filter {
            $(
                #[serde(rename = $wire, skip_serializing_if = "Option::is_none")]
                pub $field: Option<<$ty as $crate::taxonomy::FieldValue>::Constraint>,
            )+
        }

        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $sort {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $sort {
            pub const ALL: &'static [$sort] = &[$($sort::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($sort::$variant => $wire,)+
                }
            }

            pub fn parse(name: &str) -> Option<Self> {
                match name {
                    $($wire => Some($sort::$variant),)+
                    _ => None,
                }
            }
        }

        impl $fields {
            pub const FIELDS: &'static [$crate::taxonomy::FieldDescriptor] = &[
                $(
                    $crate::taxonomy::FieldDescriptor::of::<$ty>(
                        $wire,
                        kind_fields!(@search $($search)?),
                    ),
                )+
            ];

            pub fn normalized(self) -> Self {
                Self {
                    $($field: $crate::taxonomy::FieldValue::normalized(self.$field),)+
                }
            }

            pub fn apply_patch(&mut self, patch: $patch, changes: &mut $crate::changes::ChangeSummary) {
                $(
                    $crate::changes::apply_field(changes, $wire, &mut self.$field, patch.$field);
                )+
            }

            pub fn matches(&self, filter: &$filter) -> bool {
                $(
                    if let Some(constraint) = &filter.$field {
                        if !$crate::taxonomy::FieldValue::matches(&self.$field, constraint) {
                            return false;
                        }
                    }
                )+
                true
            }

            pub fn search_text(&self) -> Vec<&str> {
                let mut out = Vec::new();
                $(
                    if kind_fields!(@search $($search)?) {
                        if let Some(text) = $crate::taxonomy::FieldValue::text(&self.$field) {
                            out.push(text);
                        }
                    }
                )+
                out
            }

            pub fn sort_value(&self, key: $sort) -> $crate::taxonomy::SortValue {
                match key {
                    $($sort::$variant => $crate::taxonomy::FieldValue::sort_value(&self.$field),)+
                }
            }
        }

        impl $patch {
            pub fn is_empty(&self) -> bool {
                true $(&& self.$field.is_none())+
            }
        }

        impl $filter {
            /// Wire name and type-erased constraint of every populated field.
            pub fn constraints(&self) -> Vec<(&'static str, $crate::taxonomy::FieldConstraint)> {
                let mut out = Vec::new();
                $(
                    if let Some(constraint) = &self.$field {
                        out.push(($wire, <$ty as $crate::taxonomy::FieldValue>::erase(constraint)));
                    }
                )+
                out
            }
        }
    };
}

macro_rules! taxonomy_family {
    (
        family: $family:literal,
        kind: $kind:ident,
        attributes: $attrs:ident,
        create_sets: $create:ident,
        patch: $patch_enum:ident,
        patch_sets: $patch_sets:ident,
        filter: $filter_enum:ident,
        sort_key: $sort_enum:ident,
        kinds: {
            $(
                $variant:ident ($slot:ident) => $tag:literal: $fields:ident, $patch:ident, $filter:ident, $sort:ident;
            )+
        }
    ) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            serde::Serialize,
            serde::Deserialize,
            strum::EnumIter,
            strum::EnumCount,
        )]
        pub enum $kind {
            $(
                #[serde(rename = $tag)]
                $variant,
            )+
        }

        impl $kind {
            pub const ALL: &'static [$kind] = &[$($kind::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($kind::$variant => $tag,)+
                }
            }

            pub fn parse(tag: &str) -> Option<Self> {
                match tag {
                    $($tag => Some($kind::$variant),)+
                    _ => None,
                }
            }

            pub fn fields(&self) -> &'static [$crate::taxonomy::FieldDescriptor] {
                match self {
                    $($kind::$variant => $fields::FIELDS,)+
                }
            }

            pub fn sort_keys(&self) -> Vec<&'static str> {
                match self {
                    $($kind::$variant => $sort::ALL.iter().map($sort::as_str).collect(),)+
                }
            }
        }

        impl std::fmt::Display for $kind {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $crate::taxonomy::KindTag for $kind {
            fn as_str(&self) -> &'static str {
                $kind::as_str(self)
            }

            fn parse(tag: &str) -> Option<Self> {
                $kind::parse(tag)
            }

            fn all() -> &'static [Self] {
                $kind::ALL
            }

            fn fields(&self) -> &'static [$crate::taxonomy::FieldDescriptor] {
                $kind::fields(self)
            }
        }

        /// Kind-specific attributes. Serializes as the bare field object; the
        /// discriminator travels separately.
        #[derive(Debug, Clone, PartialEq, serde::Serialize)]
        #[serde(untagged)]
        pub enum $attrs {
            $($variant($fields),)+
        }

        $(
            impl From<$fields> for $attrs {
                fn from(fields: $fields) -> Self {
                    $attrs::$variant(fields)
                }
            }
        )+

        #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
        pub enum $patch_enum {
            $(
                #[serde(rename = $tag)]
                $variant($patch),
            )+
        }

        impl $patch_enum {
            pub fn kind(&self) -> $kind {
                match self {
                    $($patch_enum::$variant(_) => $kind::$variant,)+
                }
            }
        }

        $(
            impl From<$patch> for $patch_enum {
                fn from(patch: $patch) -> Self {
                    $patch_enum::$variant(patch)
                }
            }
        )+

        /// Update-payload attribute objects keyed by kind tag; at most one may be set.
        #[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
        #[serde(default)]
        pub struct $patch_sets {
            $(
                #[serde(rename = $tag, skip_serializing_if = "Option::is_none")]
                pub $slot: Option<$patch>,
            )+
        }

        impl $patch_sets {
            pub fn into_patch(self) -> $crate::error::Result<Option<$patch_enum>> {
                let mut found = Vec::new();
                $(
                    if let Some(patch) = self.$slot {
                        found.push($patch_enum::$variant(patch));
                    }
                )+
                match found.len() {
                    0 | 1 => Ok(found.pop()),
                    n => Err($crate::error::CatalogError::ValidationFailed(format!(
                        "update payload carries {n} attribute objects, at most one is allowed"
                    ))),
                }
            }

            pub fn from_patch(patch: $patch_enum) -> Self {
                let mut sets = Self::default();
                match patch {
                    $($patch_enum::$variant(p) => sets.$slot = Some(p),)+
                }
                sets
            }
        }

        /// Create-payload attribute objects keyed by kind tag; exactly one must be set.
        #[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
        #[serde(default)]
        pub struct $create {
            $(
                #[serde(rename = $tag, skip_serializing_if = "Option::is_none")]
                pub $slot: Option<$fields>,
            )+
        }

        impl $create {
            pub fn populated_kinds(&self) -> Vec<$kind> {
                let mut kinds = Vec::new();
                $(
                    if self.$slot.is_some() {
                        kinds.push($kind::$variant);
                    }
                )+
                kinds
            }

            pub fn into_attributes(self, declared: Option<$kind>) -> $crate::error::Result<$attrs> {
                let mut found = Vec::new();
                $(
                    if let Some(fields) = self.$slot {
                        found.push($attrs::$variant(fields));
                    }
                )+
                let attributes = match found.len() {
                    1 => found.pop(),
                    _ => None,
                };
                let Some(attributes) = attributes else {
                    return Err($crate::error::CatalogError::UnknownKind(format!(
                        "payload must carry exactly one {} attribute object, found {}",
                        $family,
                        found.len()
                    )));
                };
                let actual = $crate::taxonomy::Taxonomy::kind(&attributes);
                match declared {
                    Some(declared) if declared != actual => {
                        Err($crate::error::CatalogError::UnknownKind(format!(
                            "declared kind {declared} does not match the {actual} attribute object"
                        )))
                    }
                    _ => Ok(attributes),
                }
            }

            pub fn from_attributes(attributes: $attrs) -> Self {
                let mut sets = Self::default();
                match attributes {
                    $($attrs::$variant(fields) => sets.$slot = Some(fields),)+
                }
                sets
            }
        }

        /// Kind filter keyed by kind tag. Supplying one narrows the query to that kind.
        #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
        pub enum $filter_enum {
            $(
                #[serde(rename = $tag)]
                $variant($filter),
            )+
        }

        impl $filter_enum {
            pub fn kind(&self) -> $kind {
                match self {
                    $($filter_enum::$variant(_) => $kind::$variant,)+
                }
            }

            /// Narrows to `kind` without constraining any field.
            pub fn of_kind(kind: $kind) -> Self {
                match kind {
                    $($kind::$variant => $filter_enum::$variant($filter::default()),)+
                }
            }

            pub fn constraints(&self) -> Vec<(&'static str, $crate::taxonomy::FieldConstraint)> {
                match self {
                    $($filter_enum::$variant(filter) => filter.constraints(),)+
                }
            }
        }

        $(
            impl From<$filter> for $filter_enum {
                fn from(filter: $filter) -> Self {
                    $filter_enum::$variant(filter)
                }
            }
        )+

        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $sort_enum {
            $($variant($sort),)+
        }

        impl $sort_enum {
            pub fn kind(&self) -> $kind {
                match self {
                    $($sort_enum::$variant(_) => $kind::$variant,)+
                }
            }

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($sort_enum::$variant(key) => key.as_str(),)+
                }
            }

            pub fn parse(kind: $kind, name: &str) -> Option<Self> {
                match kind {
                    $($kind::$variant => $sort::parse(name).map($sort_enum::$variant),)+
                }
            }
        }

        $(
            impl From<$sort> for $sort_enum {
                fn from(key: $sort) -> Self {
                    $sort_enum::$variant(key)
                }
            }
        )+

        impl $crate::taxonomy::Taxonomy for $attrs {
            type Kind = $kind;
            type CreateSets = $create;
            type Patch = $patch_enum;
            type PatchSets = $patch_sets;
            type Filter = $filter_enum;
            type SortKey = $sort_enum;

            const FAMILY: &'static str = $family;

            fn kind(&self) -> $kind {
                match self {
                    $($attrs::$variant(_) => $kind::$variant,)+
                }
            }

            fn normalized(self) -> Self {
                match self {
                    $($attrs::$variant(fields) => $attrs::$variant(fields.normalized()),)+
                }
            }

            fn from_create_sets(sets: $create, declared: Option<$kind>) -> $crate::error::Result<Self> {
                sets.into_attributes(declared)
            }

            fn into_create_sets(self) -> $create {
                $create::from_attributes(self)
            }

            fn patch_from_sets(sets: $patch_sets) -> $crate::error::Result<Option<$patch_enum>> {
                sets.into_patch()
            }

            fn patch_into_sets(patch: $patch_enum) -> $patch_sets {
                $patch_sets::from_patch(patch)
            }

            fn patch_kind(patch: &$patch_enum) -> $kind {
                patch.kind()
            }

            fn apply_patch(
                &mut self,
                patch: $patch_enum,
                changes: &mut $crate::changes::ChangeSummary,
            ) -> $crate::error::Result<()> {
                match (self, patch) {
                    $(
                        ($attrs::$variant(fields), $patch_enum::$variant(patch)) => {
                            fields.apply_patch(patch, changes);
                            Ok(())
                        }
                    )+
                    (current, patch) => Err($crate::error::CatalogError::ValidationFailed(format!(
                        "a {} patch cannot update a {} entity",
                        patch.kind(),
                        $crate::taxonomy::Taxonomy::kind(&*current)
                    ))),
                }
            }

            fn filter_kind(filter: &$filter_enum) -> $kind {
                filter.kind()
            }

            fn filter_constraints(filter: &$filter_enum) -> Vec<(&'static str, $crate::taxonomy::FieldConstraint)> {
                filter.constraints()
            }

            fn matches(&self, filter: &$filter_enum) -> bool {
                match (self, filter) {
                    $(($attrs::$variant(fields), $filter_enum::$variant(filter)) => fields.matches(filter),)+
                    _ => false,
                }
            }

            fn search_text(&self) -> Vec<&str> {
                match self {
                    $($attrs::$variant(fields) => fields.search_text(),)+
                }
            }

            fn parse_sort_key(kind: $kind, name: &str) -> Option<$sort_enum> {
                $sort_enum::parse(kind, name)
            }

            fn sort_key_kind(key: &$sort_enum) -> $kind {
                key.kind()
            }

            fn sort_key_name(key: &$sort_enum) -> &'static str {
                key.as_str()
            }

            fn sort_value(&self, key: &$sort_enum) -> $crate::taxonomy::SortValue {
                match (self, key) {
                    $(($attrs::$variant(fields), $sort_enum::$variant(key)) => fields.sort_value(*key),)+
                    _ => $crate::taxonomy::SortValue::Null,
                }
            }

            fn to_json(&self) -> serde_json::Result<serde_json::Value> {
                match self {
                    $($attrs::$variant(fields) => serde_json::to_value(fields),)+
                }
            }

            fn from_json(kind: $kind, value: serde_json::Value) -> serde_json::Result<Self> {
                match kind {
                    $($kind::$variant => serde_json::from_value::<$fields>(value).map($attrs::$variant),)+
                }
            }
        }
    };
}
