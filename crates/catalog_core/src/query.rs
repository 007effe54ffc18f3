//! Query engine.
//!
//! A wire-level [`QueryRequest`] is validated against the registry into a
//! typed [`EntityQuery`]. The memory store evaluates an `EntityQuery` with
//! [`EntityQuery::evaluate`]; the Postgres adapter renders the same value to
//! SQL.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::CatalogConfig;
use crate::error::{CatalogError, Result};
use crate::model::{Header, Record};
use crate::taxonomy::{FieldValue, RangeFilter, SortValue, Taxonomy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Header fields a query may order by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BaseSortKey {
    Name,
    Manufacturer,
    Release,
    CreatedAt,
    LastEditedAt,
}

impl BaseSortKey {
    pub const ALL: &'static [BaseSortKey] = &[
        BaseSortKey::Name,
        BaseSortKey::Manufacturer,
        BaseSortKey::Release,
        BaseSortKey::CreatedAt,
        BaseSortKey::LastEditedAt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BaseSortKey::Name => "name",
            BaseSortKey::Manufacturer => "manufacturer",
            BaseSortKey::Release => "release",
            BaseSortKey::CreatedAt => "createdAt",
            BaseSortKey::LastEditedAt => "lastEditedAt",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortKey<S> {
    Base(BaseSortKey),
    Kind(S),
}

impl<S> Default for SortKey<S> {
    fn default() -> Self {
        SortKey::Base(BaseSortKey::Name)
    }
}

/// Base-field constraints, applicable to every kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BaseFilter {
    pub names: Vec<String>,
    pub manufacturers: Vec<String>,
    pub release_start: Option<NaiveDate>,
    pub release_end: Option<NaiveDate>,
}

impl BaseFilter {
    pub fn release_range(&self) -> RangeFilter<NaiveDate> {
        RangeFilter {
            start: self.release_start,
            end: self.release_end,
        }
    }

    pub fn matches(&self, header: &Header) -> bool {
        FieldValue::matches(&header.name, &self.names)
            && FieldValue::matches(&header.manufacturer, &self.manufacturers)
            && FieldValue::matches(&header.release, &self.release_range())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paging {
    /// 1-based.
    pub page: u32,
    pub page_length: u32,
}

impl Paging {
    pub fn skip(&self) -> usize {
        (self.page.saturating_sub(1) as usize) * self.page_length as usize
    }

    pub fn take(&self) -> usize {
        self.page_length as usize
    }
}

/// Query payload as callers send it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(serialize = "", deserialize = ""))]
pub struct QueryRequest<A: Taxonomy> {
    #[serde(flatten)]
    pub base: BaseFilter,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub filter: Option<A::Filter>,
    #[serde(default)]
    pub order_by: Option<String>,
    #[serde(default)]
    pub direction: SortDirection,
    #[serde(default)]
    pub paged: bool,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_length: Option<u32>,
}

impl<A: Taxonomy> Default for QueryRequest<A> {
    fn default() -> Self {
        Self {
            base: BaseFilter::default(),
            query: None,
            filter: None,
            order_by: None,
            direction: SortDirection::Asc,
            paged: false,
            page: None,
            page_length: None,
        }
    }
}

/// Validated, typed query.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityQuery<A: Taxonomy> {
    pub base: BaseFilter,
    /// Lowercased free-text tokens; every one must match.
    pub terms: Vec<String>,
    pub filter: Option<A::Filter>,
    pub order_by: SortKey<A::SortKey>,
    pub direction: SortDirection,
    pub paging: Option<Paging>,
}

impl<A: Taxonomy> Default for EntityQuery<A> {
    fn default() -> Self {
        Self {
            base: BaseFilter::default(),
            terms: Vec::new(),
            filter: None,
            order_by: SortKey::default(),
            direction: SortDirection::Asc,
            paging: None,
        }
    }
}

impl<A: Taxonomy> EntityQuery<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.base.names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn manufacturers(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.base.manufacturers = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn released_between(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.base.release_start = start;
        self.base.release_end = end;
        self
    }

    pub fn search(mut self, text: &str) -> Self {
        self.terms = tokenize(text);
        self
    }

    pub fn filter(mut self, filter: impl Into<A::Filter>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn order_by(mut self, key: SortKey<A::SortKey>, direction: SortDirection) -> Self {
        self.order_by = key;
        self.direction = direction;
        self
    }

    pub fn paged(mut self, page: u32, page_length: u32) -> Self {
        self.paging = Some(Paging { page, page_length });
        self
    }

    pub fn narrowed_kind(&self) -> Option<A::Kind> {
        self.filter.as_ref().map(A::filter_kind)
    }

    /// Checks sort key and paging against the registry and limits.
    pub fn validate(&self, config: &CatalogConfig) -> Result<()> {
        if let SortKey::Kind(key) = &self.order_by {
            let key_kind = A::sort_key_kind(key);
            match self.narrowed_kind() {
                Some(kind) if kind == key_kind => {}
                Some(kind) => {
                    return Err(CatalogError::InvalidQuery(format!(
                        "cannot order {kind} results by {key_kind} field '{}'",
                        A::sort_key_name(key)
                    )))
                }
                None => {
                    return Err(CatalogError::InvalidQuery(format!(
                        "ordering by '{}' requires a {key_kind} filter",
                        A::sort_key_name(key)
                    )))
                }
            }
        }
        if let Some(paging) = &self.paging {
            if paging.page == 0 {
                return Err(CatalogError::InvalidQuery("page is 1-based".into()));
            }
            if paging.page_length == 0 || paging.page_length > config.max_page_length {
                return Err(CatalogError::InvalidQuery(format!(
                    "pageLength must be between 1 and {}",
                    config.max_page_length
                )));
            }
        }
        Ok(())
    }

    pub fn matches(&self, record: &Record<A>) -> bool {
        if !self.base.matches(&record.header) {
            return false;
        }
        if let Some(filter) = &self.filter {
            if !record.attributes.matches(filter) {
                return false;
            }
        }
        if self.terms.is_empty() {
            return true;
        }
        let haystack: Vec<String> = record
            .search_text()
            .into_iter()
            .map(str::to_lowercase)
            .collect();
        self.terms
            .iter()
            .all(|term| haystack.iter().any(|field| field.contains(term.as_str())))
    }

    pub fn sort_value(&self, record: &Record<A>) -> SortValue {
        match &self.order_by {
            SortKey::Base(key) => record.header.sort_value(*key),
            SortKey::Kind(key) => record.attributes.sort_value(key),
        }
    }

    /// Total order: sort value in the requested direction, absent values first
    /// ascending and last descending, then id ascending.
    pub fn compare(&self, a: &Record<A>, b: &Record<A>) -> Ordering {
        let primary = self.sort_value(a).cmp(&self.sort_value(b));
        let primary = match self.direction {
            SortDirection::Asc => primary,
            SortDirection::Desc => primary.reverse(),
        };
        primary.then_with(|| a.header.id.cmp(&b.header.id))
    }

    /// Filters, orders and pages `records`.
    pub fn evaluate<'a>(&self, records: impl IntoIterator<Item = &'a Record<A>>) -> Vec<Record<A>> {
        let mut matched: Vec<&Record<A>> = records.into_iter().filter(|r| self.matches(r)).collect();
        matched.sort_by(|a, b| self.compare(a, b));
        let page = matched.into_iter();
        match self.paging {
            Some(paging) => page
                .skip(paging.skip())
                .take(paging.take())
                .cloned()
                .collect(),
            None => page.cloned().collect(),
        }
    }
}

/// Turns wire requests into validated queries.
#[derive(Debug, Clone, Copy)]
pub struct QueryEngine {
    config: CatalogConfig,
}

impl QueryEngine {
    pub fn new(config: CatalogConfig) -> Self {
        Self { config }
    }

    pub fn build<A: Taxonomy>(&self, request: QueryRequest<A>) -> Result<EntityQuery<A>> {
        let narrowed = request.filter.as_ref().map(A::filter_kind);
        let order_by = match request.order_by.as_deref() {
            None | Some("") => SortKey::Base(BaseSortKey::Name),
            Some(name) => match BaseSortKey::parse(name) {
                Some(key) => SortKey::Base(key),
                None => match narrowed {
                    Some(kind) => A::parse_sort_key(kind, name).map(SortKey::Kind).ok_or_else(|| {
                        CatalogError::InvalidQuery(format!("{kind} has no field '{name}' to order by"))
                    })?,
                    None => {
                        return Err(CatalogError::InvalidQuery(format!(
                            "unknown order field '{name}' without a kind filter"
                        )))
                    }
                },
            },
        };
        let paging = if request.paged {
            Some(Paging {
                page: request.page.unwrap_or(1),
                page_length: request.page_length.unwrap_or(self.config.default_page_length),
            })
        } else {
            None
        };
        let query = EntityQuery {
            base: request.base,
            terms: request.query.as_deref().map(tokenize).unwrap_or_default(),
            filter: request.filter,
            order_by,
            direction: request.direction,
            paging,
        };
        query.validate(&self.config)?;
        debug!(
            family = A::FAMILY,
            narrowed = ?query.narrowed_kind(),
            terms = query.terms.len(),
            paged = query.paging.is_some(),
            "built query"
        );
        Ok(query)
    }
}

pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}
