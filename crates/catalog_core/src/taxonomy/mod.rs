//! Component and sub-component taxonomy.
//!
//! Each family is a closed sum type over its concrete kinds. Field sets,
//! filter classes, clear rules and searchable flags are declared once per
//! kind in `components` / `sub_components`; the registry in `registry`
//! exposes them as data.

#[macro_use]
mod macros;

pub mod components;
mod field;
pub mod registry;
pub mod sub_components;

use std::fmt::{Debug, Display};
use std::hash::Hash;

use serde::{de::DeserializeOwned, Serialize};

use crate::changes::ChangeSummary;
use crate::error::Result;

pub use components::*;
pub use field::{
    ClearRule, Dimensions, DimensionsFilter, FieldConstraint, FieldDescriptor, FieldType,
    FieldValue, FilterClass, RangeFilter, SortValue,
};
pub use sub_components::*;

/// Discriminator enum of a family.
pub trait KindTag:
    Copy + Eq + Hash + Ord + Debug + Display + Serialize + DeserializeOwned + Send + Sync + 'static
{
    fn as_str(&self) -> &'static str;

    fn parse(tag: &str) -> Option<Self>;

    fn all() -> &'static [Self];

    fn fields(&self) -> &'static [FieldDescriptor];
}

/// A family of concrete kinds sharing the entity header.
///
/// Implemented by the generated attribute sum types; the mutation, query and
/// projection engines are generic over it.
pub trait Taxonomy: Clone + Debug + PartialEq + Serialize + Send + Sync + 'static {
    type Kind: KindTag;
    type CreateSets: Clone + Debug + Default + Serialize + DeserializeOwned + Send + Sync + 'static;
    type Patch: Clone + Debug + PartialEq + Send + Sync + 'static;
    type PatchSets: Clone + Debug + Default + Serialize + DeserializeOwned + Send + Sync + 'static;
    type Filter: Clone + Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static;
    type SortKey: Copy + Debug + Eq + Hash + Send + Sync + 'static;

    /// Event and audit prefix (`component`, `subComponent`).
    const FAMILY: &'static str;

    fn kind(&self) -> Self::Kind;

    fn normalized(self) -> Self;

    /// Dispatches a create payload to its concrete kind.
    fn from_create_sets(sets: Self::CreateSets, declared: Option<Self::Kind>) -> Result<Self>;

    fn into_create_sets(self) -> Self::CreateSets;

    fn patch_from_sets(sets: Self::PatchSets) -> Result<Option<Self::Patch>>;

    fn patch_into_sets(patch: Self::Patch) -> Self::PatchSets;

    fn patch_kind(patch: &Self::Patch) -> Self::Kind;

    /// Applies a same-kind patch; a patch of another kind is rejected untouched.
    fn apply_patch(&mut self, patch: Self::Patch, changes: &mut ChangeSummary) -> Result<()>;

    fn filter_kind(filter: &Self::Filter) -> Self::Kind;

    fn filter_constraints(filter: &Self::Filter) -> Vec<(&'static str, FieldConstraint)>;

    /// False when the filter targets another kind.
    fn matches(&self, filter: &Self::Filter) -> bool;

    fn search_text(&self) -> Vec<&str>;

    fn parse_sort_key(kind: Self::Kind, name: &str) -> Option<Self::SortKey>;

    fn sort_key_kind(key: &Self::SortKey) -> Self::Kind;

    fn sort_key_name(key: &Self::SortKey) -> &'static str;

    fn sort_value(&self, key: &Self::SortKey) -> SortValue;

    fn to_json(&self) -> serde_json::Result<serde_json::Value>;

    fn from_json(kind: Self::Kind, value: serde_json::Value) -> serde_json::Result<Self>;
}
