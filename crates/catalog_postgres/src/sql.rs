//! Renders catalog queries to SQL.
//!
//! Kind attributes are read out of the `attributes` JSONB column with `->>`
//! and cast by the registry's field type. Wire names and kind tags come from
//! the registry, never from callers, so they are inlined; every caller value
//! is bound.

use sqlx::{Postgres, QueryBuilder};

use catalog_core::ports::StoredFamily;
use catalog_core::query::{BaseFilter, EntityQuery, SortDirection, SortKey};
use catalog_core::taxonomy::{
    ComponentAttributes, FieldConstraint, FieldType, KindTag, RangeFilter, SubComponentAttributes,
};
use catalog_core::BaseSortKey;

pub const ENTITY_COLUMNS: &str =
    "id, kind, name, manufacturer, release, note, created_at, last_edited_at, version, attributes";

/// A family stored in its own table.
pub trait PgFamily: StoredFamily {
    const TABLE: &'static str;
    /// Singular noun for error messages.
    const NOUN: &'static str;
}

impl PgFamily for ComponentAttributes {
    const TABLE: &'static str = "catalog.components";
    const NOUN: &'static str = "component";
}

impl PgFamily for SubComponentAttributes {
    const TABLE: &'static str = "catalog.sub_components";
    const NOUN: &'static str = "sub-component";
}

/// `SELECT` for `query`: filters, free text, total order and paging.
pub fn select_entities<A: PgFamily>(query: &EntityQuery<A>) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT {ENTITY_COLUMNS} FROM {} WHERE TRUE",
        A::TABLE
    ));

    push_base_filter(&mut qb, &query.base);

    if let Some(filter) = &query.filter {
        qb.push(" AND kind = ");
        qb.push_bind(A::filter_kind(filter).as_str().to_string());
        for (wire, constraint) in A::filter_constraints(filter) {
            if !constraint.is_vacuous() {
                push_constraint(&mut qb, wire, &constraint);
            }
        }
    }

    for term in &query.terms {
        push_term::<A>(&mut qb, term);
    }

    qb.push(" ORDER BY ");
    qb.push(sort_expression::<A>(&query.order_by));
    qb.push(match query.direction {
        SortDirection::Asc => " ASC NULLS FIRST",
        SortDirection::Desc => " DESC NULLS LAST",
    });
    qb.push(", id ASC");

    if let Some(paging) = &query.paging {
        qb.push(" LIMIT ");
        qb.push_bind(paging.take() as i64);
        qb.push(" OFFSET ");
        qb.push_bind(paging.skip() as i64);
    }
    qb
}

fn push_base_filter(qb: &mut QueryBuilder<'static, Postgres>, base: &BaseFilter) {
    if !base.names.is_empty() {
        qb.push(" AND name = ANY(");
        qb.push_bind(base.names.clone());
        qb.push(")");
    }
    if !base.manufacturers.is_empty() {
        qb.push(" AND manufacturer = ANY(");
        qb.push_bind(base.manufacturers.clone());
        qb.push(")");
    }
    if let Some(start) = base.release_start {
        qb.push(" AND release >= ");
        qb.push_bind(start);
    }
    if let Some(end) = base.release_end {
        qb.push(" AND release <= ");
        qb.push_bind(end);
    }
}

fn push_range<T>(
    qb: &mut QueryBuilder<'static, Postgres>,
    expression: &str,
    range: &RangeFilter<T>,
) where
    T: Clone + Send + sqlx::Encode<'static, Postgres> + sqlx::Type<Postgres> + 'static,
{
    if let Some(start) = &range.start {
        qb.push(format!(" AND {expression} >= "));
        qb.push_bind(start.clone());
    }
    if let Some(end) = &range.end {
        qb.push(format!(" AND {expression} <= "));
        qb.push_bind(end.clone());
    }
}

fn push_constraint(qb: &mut QueryBuilder<'static, Postgres>, wire: &str, constraint: &FieldConstraint) {
    let text = format!("(attributes->>'{wire}')");
    match constraint {
        FieldConstraint::IntRange(range) => push_range(qb, &format!("{text}::bigint"), range),
        FieldConstraint::DecimalRange(range) => push_range(qb, &format!("{text}::numeric"), range),
        FieldConstraint::DateRange(range) => push_range(qb, &format!("{text}::date"), range),
        FieldConstraint::AnyOf(values) => {
            qb.push(format!(" AND {text} = ANY("));
            qb.push_bind(values.clone());
            qb.push(")");
        }
        FieldConstraint::Exact(flag) => {
            qb.push(format!(" AND {text}::boolean = "));
            qb.push_bind(*flag);
        }
        FieldConstraint::Dimensions(dims) => {
            let axes = [
                ("widthMm", &dims.width_mm),
                ("heightMm", &dims.height_mm),
                ("depthMm", &dims.depth_mm),
            ];
            for (axis, range) in axes {
                if let Some(range) = range {
                    let range = range.map(i64::from);
                    push_range(qb, &dimension_axis(wire, axis), &range);
                }
            }
        }
    }
}

fn dimension_axis(wire: &str, axis: &str) -> String {
    format!("(attributes->'{wire}'->>'{axis}')::bigint")
}

/// One free-text token: a case-insensitive substring of the name, the
/// manufacturer or a searchable field of the row's own kind.
fn push_term<A: PgFamily>(qb: &mut QueryBuilder<'static, Postgres>, term: &str) {
    let mut haystacks = vec![("name".to_string(), None), ("manufacturer".to_string(), None)];
    for kind in <A::Kind as KindTag>::all() {
        for field in kind.fields().iter().filter(|f| f.searchable) {
            haystacks.push((format!("attributes->>'{}'", field.name), Some(kind.as_str())));
        }
    }

    qb.push(" AND (");
    for (i, (haystack, kind)) in haystacks.iter().enumerate() {
        if i > 0 {
            qb.push(" OR ");
        }
        match kind {
            Some(kind) => qb.push(format!("(kind = '{kind}' AND strpos(lower({haystack}), ")),
            None => qb.push(format!("(strpos(lower({haystack}), ")),
        };
        qb.push_bind(term.to_string());
        qb.push(") > 0)");
    }
    qb.push(")");
}

/// Sort expression; text compares bytewise.
pub fn sort_expression<A: PgFamily>(key: &SortKey<A::SortKey>) -> String {
    match key {
        SortKey::Base(BaseSortKey::Name) => r#"name COLLATE "C""#.to_string(),
        SortKey::Base(BaseSortKey::Manufacturer) => r#"manufacturer COLLATE "C""#.to_string(),
        SortKey::Base(BaseSortKey::Release) => "release".to_string(),
        SortKey::Base(BaseSortKey::CreatedAt) => "created_at".to_string(),
        SortKey::Base(BaseSortKey::LastEditedAt) => "last_edited_at".to_string(),
        SortKey::Kind(key) => {
            let wire = A::sort_key_name(key);
            let field_type = A::sort_key_kind(key)
                .fields()
                .iter()
                .find(|f| f.name == wire)
                .map(|f| f.field_type)
                .unwrap_or(FieldType::Text);
            let text = format!("(attributes->>'{wire}')");
            match field_type {
                FieldType::Integer => format!("{text}::bigint"),
                FieldType::Decimal => format!("{text}::numeric"),
                FieldType::Date => format!("{text}::date"),
                FieldType::Flag => format!("{text}::boolean"),
                FieldType::Text => format!(r#"{text} COLLATE "C""#),
                FieldType::Dimensions => format!(
                    "({} * {} * {})",
                    dimension_axis(wire, "widthMm"),
                    dimension_axis(wire, "heightMm"),
                    dimension_axis(wire, "depthMm")
                ),
            }
        }
    }
}

// ── Variants ──────────────────────────────────────────────────

/// Variant columns plus color codes in join order.
pub const VARIANT_SELECT: &str = r#"
    SELECT v.id, v.component_id, v.is_available, v.additional_price, v.note,
           v.created_at, v.last_edited_at,
           COALESCE(
               array_agg(cv.color_code ORDER BY cv.position)
                   FILTER (WHERE cv.color_code IS NOT NULL),
               '{}'::text[]
           ) AS color_codes
    FROM catalog.component_variants v
    LEFT JOIN catalog.color_variants cv ON cv.variant_id = v.id
"#;

/// Variants whose component name followed by their color names contains
/// every term.
pub fn search_variants(terms: &[String]) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(
        r#"
    SELECT v.id, v.component_id, v.is_available, v.additional_price, v.note,
           v.created_at, v.last_edited_at,
           COALESCE(
               array_agg(cv.color_code ORDER BY cv.position)
                   FILTER (WHERE cv.color_code IS NOT NULL),
               '{}'::text[]
           ) AS color_codes
    FROM catalog.component_variants v
    JOIN catalog.components c ON c.id = v.component_id
    LEFT JOIN catalog.color_variants cv ON cv.variant_id = v.id
    LEFT JOIN catalog.colors col ON col.code = cv.color_code
    GROUP BY v.id, c.name
    HAVING TRUE"#,
    );
    for term in terms {
        qb.push(
            " AND strpos(lower(c.name || COALESCE(string_agg(' ' || col.name, '' ORDER BY cv.position), '')), ",
        );
        qb.push_bind(term.clone());
        qb.push(") > 0");
    }
    qb.push(" ORDER BY v.created_at, v.id");
    qb
}
