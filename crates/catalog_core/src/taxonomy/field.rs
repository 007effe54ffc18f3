//! Field-level building blocks shared by every concrete kind.
//!
//! The stored Rust type of a field decides its registry semantics: filter
//! class, clearing sentinel, sort value and how a payload value is turned
//! into a stored value. Kind declarations only name the type.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Integer,
    Decimal,
    Text,
    Flag,
    Date,
    Dimensions,
}

/// How a field may be constrained by a kind filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterClass {
    /// Inclusive start/end bounds.
    Range,
    /// Set membership (any-of).
    Equality,
    /// Exact match.
    Boolean,
}

/// Which update-payload value, if any, unsets a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearRule {
    Never,
    Zero,
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub field_type: FieldType,
    pub filter: FilterClass,
    pub clear: ClearRule,
    pub nullable: bool,
    pub searchable: bool,
}

impl FieldDescriptor {
    pub const fn of<T: FieldValue>(name: &'static str, searchable: bool) -> Self {
        Self {
            name,
            field_type: T::TYPE,
            filter: T::FILTER,
            clear: T::CLEAR,
            nullable: T::NULLABLE,
            searchable,
        }
    }

    pub fn is_clearable(&self) -> bool {
        self.clear != ClearRule::Never
    }
}

// ── Constraints ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeFilter<T> {
    #[serde(default)]
    pub start: Option<T>,
    #[serde(default)]
    pub end: Option<T>,
}

impl<T> Default for RangeFilter<T> {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
        }
    }
}

impl<T: PartialOrd> RangeFilter<T> {
    pub fn between(start: T, end: T) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn at_least(start: T) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    pub fn at_most(end: T) -> Self {
        Self {
            start: None,
            end: Some(end),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, value: &T) -> bool {
        if let Some(start) = &self.start {
            if value < start {
                return false;
            }
        }
        if let Some(end) = &self.end {
            if value > end {
                return false;
            }
        }
        true
    }

    /// An absent value only satisfies an unbounded range.
    pub fn contains_opt(&self, value: Option<&T>) -> bool {
        match value {
            Some(v) => self.contains(v),
            None => self.is_unbounded(),
        }
    }
}

impl<T: Clone> RangeFilter<T> {
    pub fn map<U>(&self, f: impl Fn(T) -> U) -> RangeFilter<U> {
        RangeFilter {
            start: self.start.clone().map(&f),
            end: self.end.clone().map(&f),
        }
    }
}

/// Outer case dimensions in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Dimensions {
    pub width_mm: i32,
    pub height_mm: i32,
    pub depth_mm: i32,
}

impl Dimensions {
    pub fn new(width_mm: i32, height_mm: i32, depth_mm: i32) -> Self {
        Self {
            width_mm,
            height_mm,
            depth_mm,
        }
    }

    pub fn volume_mm3(&self) -> i64 {
        i64::from(self.width_mm) * i64::from(self.height_mm) * i64::from(self.depth_mm)
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} x {} x {} mm",
            self.width_mm, self.height_mm, self.depth_mm
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct DimensionsFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width_mm: Option<RangeFilter<i32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height_mm: Option<RangeFilter<i32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth_mm: Option<RangeFilter<i32>>,
}

impl DimensionsFilter {
    pub fn matches(&self, dims: &Dimensions) -> bool {
        let axis = |range: &Option<RangeFilter<i32>>, value: i32| {
            range.as_ref().map_or(true, |r| r.contains(&value))
        };
        axis(&self.width_mm, dims.width_mm)
            && axis(&self.height_mm, dims.height_mm)
            && axis(&self.depth_mm, dims.depth_mm)
    }
}

/// Type-erased constraint, used by storage adapters that render predicates.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldConstraint {
    IntRange(RangeFilter<i64>),
    DecimalRange(RangeFilter<Decimal>),
    DateRange(RangeFilter<NaiveDate>),
    AnyOf(Vec<String>),
    Exact(bool),
    Dimensions(DimensionsFilter),
}

impl FieldConstraint {
    /// True when the constraint admits every value.
    pub fn is_vacuous(&self) -> bool {
        match self {
            Self::IntRange(r) => r.is_unbounded(),
            Self::DecimalRange(r) => r.is_unbounded(),
            Self::DateRange(r) => r.is_unbounded(),
            Self::AnyOf(values) => values.is_empty(),
            Self::Exact(_) => false,
            Self::Dimensions(d) => {
                d.width_mm.as_ref().map_or(true, RangeFilter::is_unbounded)
                    && d.height_mm.as_ref().map_or(true, RangeFilter::is_unbounded)
                    && d.depth_mm.as_ref().map_or(true, RangeFilter::is_unbounded)
            }
        }
    }
}

/// Comparable projection of a field value. `Null` orders first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortValue {
    Null,
    Flag(bool),
    Int(i64),
    Decimal(Decimal),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    Text(String),
}

// ── FieldValue ────────────────────────────────────────────────

/// Registry semantics of a stored field type.
pub trait FieldValue: Clone + PartialEq + Send + Sync + 'static {
    /// Value accepted by update payloads.
    type Input: Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static;
    /// Value accepted by kind filters.
    type Constraint: Clone
        + fmt::Debug
        + PartialEq
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static;

    const TYPE: FieldType;
    const FILTER: FilterClass;
    const CLEAR: ClearRule;
    const NULLABLE: bool;

    /// Converts a payload value to the stored value, applying the clearing sentinel.
    fn from_input(input: Self::Input) -> Self;

    /// Applies the clearing sentinel to a value supplied whole (create payloads).
    fn normalized(self) -> Self {
        self
    }

    fn matches(&self, constraint: &Self::Constraint) -> bool;

    fn erase(constraint: &Self::Constraint) -> FieldConstraint;

    fn sort_value(&self) -> SortValue;

    /// Rendering used for change-log entries.
    fn describe(&self) -> String;

    fn text(&self) -> Option<&str> {
        None
    }
}

const NULL: &str = "null";

impl FieldValue for i32 {
    type Input = i32;
    type Constraint = RangeFilter<i32>;

    const TYPE: FieldType = FieldType::Integer;
    const FILTER: FilterClass = FilterClass::Range;
    const CLEAR: ClearRule = ClearRule::Never;
    const NULLABLE: bool = false;

    fn from_input(input: i32) -> Self {
        input
    }

    fn matches(&self, constraint: &RangeFilter<i32>) -> bool {
        constraint.contains(self)
    }

    fn erase(constraint: &RangeFilter<i32>) -> FieldConstraint {
        FieldConstraint::IntRange(constraint.map(i64::from))
    }

    fn sort_value(&self) -> SortValue {
        SortValue::Int(i64::from(*self))
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

impl FieldValue for Option<i32> {
    type Input = i32;
    type Constraint = RangeFilter<i32>;

    const TYPE: FieldType = FieldType::Integer;
    const FILTER: FilterClass = FilterClass::Range;
    const CLEAR: ClearRule = ClearRule::Zero;
    const NULLABLE: bool = true;

    fn from_input(input: i32) -> Self {
        (input != 0).then_some(input)
    }

    fn normalized(self) -> Self {
        self.filter(|v| *v != 0)
    }

    fn matches(&self, constraint: &RangeFilter<i32>) -> bool {
        constraint.contains_opt(self.as_ref())
    }

    fn erase(constraint: &RangeFilter<i32>) -> FieldConstraint {
        FieldConstraint::IntRange(constraint.map(i64::from))
    }

    fn sort_value(&self) -> SortValue {
        self.map_or(SortValue::Null, |v| SortValue::Int(i64::from(v)))
    }

    fn describe(&self) -> String {
        self.map_or_else(|| NULL.to_string(), |v| v.to_string())
    }
}

impl FieldValue for Decimal {
    type Input = Decimal;
    type Constraint = RangeFilter<Decimal>;

    const TYPE: FieldType = FieldType::Decimal;
    const FILTER: FilterClass = FilterClass::Range;
    const CLEAR: ClearRule = ClearRule::Never;
    const NULLABLE: bool = false;

    fn from_input(input: Decimal) -> Self {
        input
    }

    fn matches(&self, constraint: &RangeFilter<Decimal>) -> bool {
        constraint.contains(self)
    }

    fn erase(constraint: &RangeFilter<Decimal>) -> FieldConstraint {
        FieldConstraint::DecimalRange(constraint.clone())
    }

    fn sort_value(&self) -> SortValue {
        SortValue::Decimal(*self)
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

impl FieldValue for Option<Decimal> {
    type Input = Decimal;
    type Constraint = RangeFilter<Decimal>;

    const TYPE: FieldType = FieldType::Decimal;
    const FILTER: FilterClass = FilterClass::Range;
    const CLEAR: ClearRule = ClearRule::Zero;
    const NULLABLE: bool = true;

    fn from_input(input: Decimal) -> Self {
        (!input.is_zero()).then_some(input)
    }

    fn normalized(self) -> Self {
        self.filter(|v| !v.is_zero())
    }

    fn matches(&self, constraint: &RangeFilter<Decimal>) -> bool {
        constraint.contains_opt(self.as_ref())
    }

    fn erase(constraint: &RangeFilter<Decimal>) -> FieldConstraint {
        FieldConstraint::DecimalRange(constraint.clone())
    }

    fn sort_value(&self) -> SortValue {
        self.map_or(SortValue::Null, SortValue::Decimal)
    }

    fn describe(&self) -> String {
        self.map_or_else(|| NULL.to_string(), |v| v.to_string())
    }
}

impl FieldValue for String {
    type Input = String;
    type Constraint = Vec<String>;

    const TYPE: FieldType = FieldType::Text;
    const FILTER: FilterClass = FilterClass::Equality;
    const CLEAR: ClearRule = ClearRule::Never;
    const NULLABLE: bool = false;

    fn from_input(input: String) -> Self {
        input
    }

    fn matches(&self, constraint: &Vec<String>) -> bool {
        constraint.is_empty() || constraint.iter().any(|v| v == self)
    }

    fn erase(constraint: &Vec<String>) -> FieldConstraint {
        FieldConstraint::AnyOf(constraint.clone())
    }

    fn sort_value(&self) -> SortValue {
        SortValue::Text(self.clone())
    }

    fn describe(&self) -> String {
        self.clone()
    }

    fn text(&self) -> Option<&str> {
        Some(self)
    }
}

impl FieldValue for Option<String> {
    type Input = String;
    type Constraint = Vec<String>;

    const TYPE: FieldType = FieldType::Text;
    const FILTER: FilterClass = FilterClass::Equality;
    const CLEAR: ClearRule = ClearRule::Empty;
    const NULLABLE: bool = true;

    fn from_input(input: String) -> Self {
        (!input.is_empty()).then_some(input)
    }

    fn normalized(self) -> Self {
        self.filter(|v| !v.is_empty())
    }

    fn matches(&self, constraint: &Vec<String>) -> bool {
        if constraint.is_empty() {
            return true;
        }
        self.as_ref()
            .is_some_and(|value| constraint.iter().any(|v| v == value))
    }

    fn erase(constraint: &Vec<String>) -> FieldConstraint {
        FieldConstraint::AnyOf(constraint.clone())
    }

    fn sort_value(&self) -> SortValue {
        self.as_ref()
            .map_or(SortValue::Null, |v| SortValue::Text(v.clone()))
    }

    fn describe(&self) -> String {
        self.clone().unwrap_or_else(|| NULL.to_string())
    }

    fn text(&self) -> Option<&str> {
        self.as_deref()
    }
}

impl FieldValue for bool {
    type Input = bool;
    type Constraint = bool;

    const TYPE: FieldType = FieldType::Flag;
    const FILTER: FilterClass = FilterClass::Boolean;
    const CLEAR: ClearRule = ClearRule::Never;
    const NULLABLE: bool = false;

    fn from_input(input: bool) -> Self {
        input
    }

    fn matches(&self, constraint: &bool) -> bool {
        self == constraint
    }

    fn erase(constraint: &bool) -> FieldConstraint {
        FieldConstraint::Exact(*constraint)
    }

    fn sort_value(&self) -> SortValue {
        SortValue::Flag(*self)
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

impl FieldValue for Option<bool> {
    type Input = bool;
    type Constraint = bool;

    const TYPE: FieldType = FieldType::Flag;
    const FILTER: FilterClass = FilterClass::Boolean;
    const CLEAR: ClearRule = ClearRule::Never;
    const NULLABLE: bool = true;

    fn from_input(input: bool) -> Self {
        Some(input)
    }

    fn matches(&self, constraint: &bool) -> bool {
        *self == Some(*constraint)
    }

    fn erase(constraint: &bool) -> FieldConstraint {
        FieldConstraint::Exact(*constraint)
    }

    fn sort_value(&self) -> SortValue {
        self.map_or(SortValue::Null, SortValue::Flag)
    }

    fn describe(&self) -> String {
        self.map_or_else(|| NULL.to_string(), |v| v.to_string())
    }
}

impl FieldValue for Option<NaiveDate> {
    type Input = NaiveDate;
    type Constraint = RangeFilter<NaiveDate>;

    const TYPE: FieldType = FieldType::Date;
    const FILTER: FilterClass = FilterClass::Range;
    const CLEAR: ClearRule = ClearRule::Never;
    const NULLABLE: bool = true;

    fn from_input(input: NaiveDate) -> Self {
        Some(input)
    }

    fn matches(&self, constraint: &RangeFilter<NaiveDate>) -> bool {
        constraint.contains_opt(self.as_ref())
    }

    fn erase(constraint: &RangeFilter<NaiveDate>) -> FieldConstraint {
        FieldConstraint::DateRange(constraint.clone())
    }

    fn sort_value(&self) -> SortValue {
        self.map_or(SortValue::Null, SortValue::Date)
    }

    fn describe(&self) -> String {
        self.map_or_else(|| NULL.to_string(), |v| v.to_string())
    }
}

impl FieldValue for Dimensions {
    type Input = Dimensions;
    type Constraint = DimensionsFilter;

    const TYPE: FieldType = FieldType::Dimensions;
    const FILTER: FilterClass = FilterClass::Range;
    const CLEAR: ClearRule = ClearRule::Never;
    const NULLABLE: bool = false;

    fn from_input(input: Dimensions) -> Self {
        input
    }

    fn matches(&self, constraint: &DimensionsFilter) -> bool {
        constraint.matches(self)
    }

    fn erase(constraint: &DimensionsFilter) -> FieldConstraint {
        FieldConstraint::Dimensions(constraint.clone())
    }

    fn sort_value(&self) -> SortValue {
        SortValue::Int(self.volume_mm3())
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}
