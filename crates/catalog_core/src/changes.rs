//! Field-level change log produced by partial updates.

use std::fmt;

use serde::Serialize;

use crate::taxonomy::FieldValue;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub field: &'static str,
    pub previous: String,
}

/// Ordered list of `(field, previous value)` pairs.
///
/// Renders as `Updated Fields: a (previously x), b (previously y)` or
/// `No Fields Changed`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ChangeSummary {
    changes: Vec<FieldChange>,
}

impl ChangeSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, field: &'static str, previous: String) {
        self.changes.push(FieldChange { field, previous });
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn changes(&self) -> &[FieldChange] {
        &self.changes
    }

    pub fn fields(&self) -> Vec<&'static str> {
        self.changes.iter().map(|c| c.field).collect()
    }

    pub fn previous(&self, field: &str) -> Option<&str> {
        self.changes
            .iter()
            .find(|c| c.field == field)
            .map(|c| c.previous.as_str())
    }
}

impl fmt::Display for ChangeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.changes.is_empty() {
            return f.write_str("No Fields Changed");
        }
        f.write_str("Updated Fields: ")?;
        for (i, change) in self.changes.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} (previously {})", change.field, change.previous)?;
        }
        Ok(())
    }
}

/// Applies an optional payload value to a stored field. Records the previous
/// value only when the converted value differs.
pub fn apply_field<T: FieldValue>(
    changes: &mut ChangeSummary,
    field: &'static str,
    slot: &mut T,
    input: Option<T::Input>,
) {
    let Some(input) = input else {
        return;
    };
    let next = T::from_input(input);
    if *slot != next {
        let previous = std::mem::replace(slot, next);
        changes.record(field, previous.describe());
    }
}
