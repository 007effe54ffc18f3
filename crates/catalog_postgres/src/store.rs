//! Postgres implementation of the catalog_core storage ports.
//!
//! One newtype wrapping PgPool. All SQL is runtime-checked (sqlx::query, not
//! sqlx::query!) so building needs no database. Methods that touch more than
//! one row run in a single transaction.

use anyhow::anyhow;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use catalog_core::error::CatalogError;
use catalog_core::model::{
    Color, ColorCascade, ComponentColor, ComponentCompatibility, ComponentPart, ComponentVariant,
    Record, StoredEntity, SubComponentPart,
};
use catalog_core::ports::{ColorStore, EntityStore, RelationStore, Result, VariantStore};
use catalog_core::query::{tokenize, EntityQuery};

use crate::sql::{self, PgFamily, ENTITY_COLUMNS, VARIANT_SELECT};
use crate::sqlx_types::{PgColorRow, PgEntityRow, PgVariantRow};

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";

/// Maps constraint violations onto catalog errors; everything else is
/// internal.
fn db_error(e: sqlx::Error) -> CatalogError {
    if let Some(db) = e.as_database_error() {
        match db.code().as_deref() {
            Some(UNIQUE_VIOLATION) | Some(CHECK_VIOLATION) => {
                return CatalogError::ValidationFailed(db.message().to_string())
            }
            Some(FOREIGN_KEY_VIOLATION) => {
                return CatalogError::InvalidReference(db.message().to_string())
            }
            _ => {}
        }
    }
    CatalogError::Internal(anyhow!(e))
}

pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>> {
        self.pool.begin().await.map_err(|e| anyhow!(e).into())
    }
}

async fn commit(tx: Transaction<'static, Postgres>) -> Result<()> {
    tx.commit().await.map_err(|e| anyhow!(e).into())
}

async fn exists(
    tx: &mut Transaction<'static, Postgres>,
    table: &str,
    key: &str,
    value: impl for<'q> sqlx::Encode<'q, Postgres> + sqlx::Type<Postgres> + Send + 'static,
) -> Result<bool> {
    let sql = format!("SELECT EXISTS (SELECT 1 FROM {table} WHERE {key} = $1)");
    sqlx::query_scalar::<_, bool>(&sql)
        .bind(value)
        .fetch_one(&mut **tx)
        .await
        .map_err(db_error)
}

async fn require_colors(tx: &mut Transaction<'static, Postgres>, codes: &[String]) -> Result<()> {
    let known: Vec<String> =
        sqlx::query_scalar("SELECT code FROM catalog.colors WHERE code = ANY($1)")
            .bind(codes.to_vec())
            .fetch_all(&mut **tx)
            .await
            .map_err(db_error)?;
    match codes.iter().find(|code| !known.contains(code)) {
        Some(code) => Err(CatalogError::InvalidReference(format!("color {code}"))),
        None => Ok(()),
    }
}

async fn insert_color_variants(
    tx: &mut Transaction<'static, Postgres>,
    variant_id: Uuid,
    codes: &[String],
) -> Result<()> {
    for (position, code) in codes.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO catalog.color_variants (variant_id, color_code, position)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(variant_id)
        .bind(code)
        .bind(position as i32)
        .execute(&mut **tx)
        .await
        .map_err(db_error)?;
    }
    Ok(())
}

// ── Entities ──────────────────────────────────────────────────

#[async_trait]
impl<A: PgFamily> EntityStore<A> for PgCatalogStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Record<A>>> {
        let row = sqlx::query_as::<_, PgEntityRow>(&format!(
            "SELECT {ENTITY_COLUMNS} FROM {} WHERE id = $1",
            A::TABLE
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        row.map(|r| StoredEntity::from(r).decode::<A>()).transpose()
    }

    async fn find_many(&self, query: &EntityQuery<A>) -> Result<Vec<Record<A>>> {
        let mut builder = sql::select_entities(query);
        let rows = builder
            .build_query_as::<PgEntityRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        rows.into_iter()
            .map(|r| StoredEntity::from(r).decode::<A>())
            .collect()
    }

    async fn insert(&self, record: &Record<A>) -> Result<()> {
        let stored = record.to_stored()?;
        let header = &stored.header;
        sqlx::query(&format!(
            r#"
            INSERT INTO {} (
                id, kind, name, manufacturer, release, note,
                created_at, last_edited_at, version, attributes
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
            A::TABLE
        ))
        .bind(header.id)
        .bind(&stored.kind)
        .bind(&header.name)
        .bind(&header.manufacturer)
        .bind(header.release)
        .bind(&header.note)
        .bind(header.created_at)
        .bind(header.last_edited_at)
        .bind(header.version)
        .bind(&stored.attributes)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn update(&self, record: &Record<A>, loaded_version: i64) -> Result<()> {
        let stored = record.to_stored()?;
        let header = &stored.header;
        let result = sqlx::query(&format!(
            r#"
            UPDATE {}
            SET name = $2, manufacturer = $3, release = $4, note = $5,
                last_edited_at = $6, version = $7, attributes = $8
            WHERE id = $1 AND version = $9
            "#,
            A::TABLE
        ))
        .bind(header.id)
        .bind(&header.name)
        .bind(&header.manufacturer)
        .bind(header.release)
        .bind(&header.note)
        .bind(header.last_edited_at)
        .bind(header.version)
        .bind(&stored.attributes)
        .bind(loaded_version)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 1 {
            return Ok(());
        }
        let actual = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT version FROM {} WHERE id = $1",
            A::TABLE
        ))
        .bind(header.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        match actual {
            Some(actual) => Err(CatalogError::ConflictNotApplied {
                expected: loaded_version,
                actual,
            }),
            None => Err(CatalogError::not_found(A::NOUN, header.id)),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        // Variants, color links, parts and compatibility edges cascade.
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", A::TABLE))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }
}

// ── Relations ─────────────────────────────────────────────────

#[async_trait]
impl RelationStore for PgCatalogStore {
    async fn insert_component_part(&self, part: &ComponentPart) -> Result<()> {
        let mut tx = self.begin().await?;
        if !exists(&mut tx, "catalog.components", "id", part.component_id).await? {
            return Err(CatalogError::InvalidReference(format!(
                "component {}",
                part.component_id
            )));
        }
        if !exists(&mut tx, "catalog.sub_components", "id", part.sub_component_id).await? {
            return Err(CatalogError::InvalidReference(format!(
                "sub-component {}",
                part.sub_component_id
            )));
        }
        let inserted = sqlx::query(
            r#"
            INSERT INTO catalog.component_parts (component_id, sub_component_id, amount)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(part.component_id)
        .bind(part.sub_component_id)
        .bind(part.amount)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;
        if inserted.rows_affected() == 0 {
            return Err(CatalogError::ValidationFailed(format!(
                "component {} already has part {}",
                part.component_id, part.sub_component_id
            )));
        }
        commit(tx).await
    }

    async fn delete_component_part(&self, component_id: Uuid, sub_component_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM catalog.component_parts WHERE component_id = $1 AND sub_component_id = $2",
        )
        .bind(component_id)
        .bind(sub_component_id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn component_parts(&self, component_id: Uuid) -> Result<Vec<ComponentPart>> {
        let rows = sqlx::query_as::<_, (Uuid, Uuid, i32)>(
            r#"
            SELECT component_id, sub_component_id, amount
            FROM catalog.component_parts
            WHERE component_id = $1
            ORDER BY sub_component_id
            "#,
        )
        .bind(component_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows
            .into_iter()
            .map(|(component_id, sub_component_id, amount)| ComponentPart {
                component_id,
                sub_component_id,
                amount,
            })
            .collect())
    }

    async fn insert_sub_component_part(&self, part: &SubComponentPart) -> Result<()> {
        let mut tx = self.begin().await?;
        for id in [part.sub_component_id, part.part_id] {
            if !exists(&mut tx, "catalog.sub_components", "id", id).await? {
                return Err(CatalogError::InvalidReference(format!("sub-component {id}")));
            }
        }
        let inserted = sqlx::query(
            r#"
            INSERT INTO catalog.sub_component_parts (sub_component_id, part_id, amount)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(part.sub_component_id)
        .bind(part.part_id)
        .bind(part.amount)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;
        if inserted.rows_affected() == 0 {
            return Err(CatalogError::ValidationFailed(format!(
                "sub-component {} already has part {}",
                part.sub_component_id, part.part_id
            )));
        }
        commit(tx).await
    }

    async fn delete_sub_component_part(&self, sub_component_id: Uuid, part_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM catalog.sub_component_parts WHERE sub_component_id = $1 AND part_id = $2",
        )
        .bind(sub_component_id)
        .bind(part_id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn sub_component_parts(&self, sub_component_id: Uuid) -> Result<Vec<SubComponentPart>> {
        let rows = sqlx::query_as::<_, (Uuid, Uuid, i32)>(
            r#"
            SELECT sub_component_id, part_id, amount
            FROM catalog.sub_component_parts
            WHERE sub_component_id = $1
            ORDER BY part_id
            "#,
        )
        .bind(sub_component_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows
            .into_iter()
            .map(|(sub_component_id, part_id, amount)| SubComponentPart {
                sub_component_id,
                part_id,
                amount,
            })
            .collect())
    }

    async fn insert_compatibility(&self, edge: &ComponentCompatibility) -> Result<()> {
        let mut tx = self.begin().await?;
        for id in [edge.component_id, edge.compatible_component_id] {
            if !exists(&mut tx, "catalog.components", "id", id).await? {
                return Err(CatalogError::InvalidReference(format!("component {id}")));
            }
        }
        let inserted = sqlx::query(
            r#"
            INSERT INTO catalog.component_compatibilities (component_id, compatible_component_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(edge.component_id)
        .bind(edge.compatible_component_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;
        if inserted.rows_affected() == 0 {
            return Err(CatalogError::ValidationFailed(format!(
                "component {} is already compatible with {}",
                edge.component_id, edge.compatible_component_id
            )));
        }
        commit(tx).await
    }

    async fn delete_compatibility(
        &self,
        component_id: Uuid,
        compatible_component_id: Uuid,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM catalog.component_compatibilities
            WHERE component_id = $1 AND compatible_component_id = $2
            "#,
        )
        .bind(component_id)
        .bind(compatible_component_id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn compatibilities(&self, component_id: Uuid) -> Result<Vec<ComponentCompatibility>> {
        let rows = sqlx::query_as::<_, (Uuid, Uuid)>(
            r#"
            SELECT component_id, compatible_component_id
            FROM catalog.component_compatibilities
            WHERE component_id = $1
            ORDER BY compatible_component_id
            "#,
        )
        .bind(component_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows
            .into_iter()
            .map(|(component_id, compatible_component_id)| ComponentCompatibility {
                component_id,
                compatible_component_id,
            })
            .collect())
    }
}

// ── Colors ────────────────────────────────────────────────────

#[async_trait]
impl ColorStore for PgCatalogStore {
    async fn find_color(&self, code: &str) -> Result<Option<Color>> {
        let row = sqlx::query_as::<_, PgColorRow>(
            "SELECT code, name, note FROM catalog.colors WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.map(Color::from))
    }

    async fn list_colors(&self) -> Result<Vec<Color>> {
        let rows = sqlx::query_as::<_, PgColorRow>(
            r#"SELECT code, name, note FROM catalog.colors ORDER BY code COLLATE "C""#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(Color::from).collect())
    }

    async fn insert_color(&self, color: &Color) -> Result<()> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO catalog.colors (code, name, note)
            VALUES ($1, $2, $3)
            ON CONFLICT (code) DO NOTHING
            "#,
        )
        .bind(&color.code)
        .bind(&color.name)
        .bind(&color.note)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        if inserted.rows_affected() == 0 {
            return Err(CatalogError::ValidationFailed(format!(
                "color {} already exists",
                color.code
            )));
        }
        Ok(())
    }

    async fn update_color(&self, color: &Color) -> Result<bool> {
        let result = sqlx::query("UPDATE catalog.colors SET name = $2, note = $3 WHERE code = $1")
            .bind(&color.code)
            .bind(&color.name)
            .bind(&color.note)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_color(&self, code: &str) -> Result<Option<ColorCascade>> {
        let mut tx = self.begin().await?;
        if !exists(&mut tx, "catalog.colors", "code", code.to_string()).await? {
            return Ok(None);
        }
        let removed_variants: Vec<Uuid> = sqlx::query_scalar(
            r#"
            DELETE FROM catalog.component_variants
            WHERE id IN (
                SELECT variant_id FROM catalog.color_variants WHERE color_code = $1
            )
            RETURNING id
            "#,
        )
        .bind(code)
        .fetch_all(&mut *tx)
        .await
        .map_err(db_error)?;
        let removed_component_colors =
            sqlx::query("DELETE FROM catalog.component_colors WHERE color_code = $1")
                .bind(code)
                .execute(&mut *tx)
                .await
                .map_err(db_error)?
                .rows_affected();
        sqlx::query("DELETE FROM catalog.colors WHERE code = $1")
            .bind(code)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        commit(tx).await?;

        let mut removed_variants = removed_variants;
        removed_variants.sort();
        Ok(Some(ColorCascade {
            removed_variants,
            removed_component_colors: removed_component_colors as usize,
        }))
    }

    async fn insert_component_color(
        &self,
        association: &ComponentColor,
        new_color: Option<&Color>,
    ) -> Result<()> {
        let mut tx = self.begin().await?;
        if !exists(&mut tx, "catalog.components", "id", association.component_id).await? {
            return Err(CatalogError::not_found("component", association.component_id));
        }
        match new_color {
            Some(color) => {
                let inserted = sqlx::query(
                    r#"
                    INSERT INTO catalog.colors (code, name, note)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (code) DO NOTHING
                    "#,
                )
                .bind(&color.code)
                .bind(&color.name)
                .bind(&color.note)
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;
                if inserted.rows_affected() == 0 {
                    return Err(CatalogError::ValidationFailed(format!(
                        "color {} already exists",
                        color.code
                    )));
                }
            }
            None => require_colors(&mut tx, std::slice::from_ref(&association.color_code)).await?,
        }
        let inserted = sqlx::query(
            r#"
            INSERT INTO catalog.component_colors (component_id, color_code)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(association.component_id)
        .bind(&association.color_code)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;
        if inserted.rows_affected() == 0 {
            return Err(CatalogError::ValidationFailed(format!(
                "component {} already has color {}",
                association.component_id, association.color_code
            )));
        }
        commit(tx).await
    }

    async fn delete_component_color(&self, component_id: Uuid, code: &str) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM catalog.component_colors WHERE component_id = $1 AND color_code = $2",
        )
        .bind(component_id)
        .bind(code)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn component_colors(&self, component_id: Uuid) -> Result<Vec<Color>> {
        let rows = sqlx::query_as::<_, PgColorRow>(
            r#"
            SELECT c.code, c.name, c.note
            FROM catalog.component_colors cc
            JOIN catalog.colors c ON c.code = cc.color_code
            WHERE cc.component_id = $1
            ORDER BY c.code COLLATE "C"
            "#,
        )
        .bind(component_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(Color::from).collect())
    }
}

// ── Variants ──────────────────────────────────────────────────

#[async_trait]
impl VariantStore for PgCatalogStore {
    async fn find_variant(&self, id: Uuid) -> Result<Option<ComponentVariant>> {
        let row = sqlx::query_as::<_, PgVariantRow>(&format!(
            "{VARIANT_SELECT} WHERE v.id = $1 GROUP BY v.id"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.map(ComponentVariant::from))
    }

    async fn component_variants(&self, component_id: Uuid) -> Result<Vec<ComponentVariant>> {
        let rows = sqlx::query_as::<_, PgVariantRow>(&format!(
            "{VARIANT_SELECT} WHERE v.component_id = $1 GROUP BY v.id ORDER BY v.created_at, v.id"
        ))
        .bind(component_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(ComponentVariant::from).collect())
    }

    async fn insert_variant(&self, variant: &ComponentVariant) -> Result<()> {
        let mut tx = self.begin().await?;
        if !exists(&mut tx, "catalog.components", "id", variant.component_id).await? {
            return Err(CatalogError::not_found("component", variant.component_id));
        }
        require_colors(&mut tx, &variant.color_codes).await?;
        sqlx::query(
            r#"
            INSERT INTO catalog.component_variants (
                id, component_id, is_available, additional_price, note,
                created_at, last_edited_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(variant.id)
        .bind(variant.component_id)
        .bind(variant.is_available)
        .bind(variant.additional_price)
        .bind(&variant.note)
        .bind(variant.created_at)
        .bind(variant.last_edited_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;
        insert_color_variants(&mut tx, variant.id, &variant.color_codes).await?;
        commit(tx).await
    }

    async fn update_variant(&self, variant: &ComponentVariant, replace_colors: bool) -> Result<()> {
        let mut tx = self.begin().await?;
        if replace_colors {
            require_colors(&mut tx, &variant.color_codes).await?;
        }
        let result = sqlx::query(
            r#"
            UPDATE catalog.component_variants
            SET is_available = $2, additional_price = $3, note = $4, last_edited_at = $5
            WHERE id = $1
            "#,
        )
        .bind(variant.id)
        .bind(variant.is_available)
        .bind(variant.additional_price)
        .bind(&variant.note)
        .bind(variant.last_edited_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(CatalogError::not_found("variant", variant.id));
        }
        if replace_colors {
            sqlx::query("DELETE FROM catalog.color_variants WHERE variant_id = $1")
                .bind(variant.id)
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;
            insert_color_variants(&mut tx, variant.id, &variant.color_codes).await?;
        }
        commit(tx).await
    }

    async fn delete_variant(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM catalog.component_variants WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn search_variants(&self, text: &str) -> Result<Vec<ComponentVariant>> {
        let terms = tokenize(text);
        let mut builder = sql::search_variants(&terms);
        let rows = builder
            .build_query_as::<PgVariantRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(ComponentVariant::from).collect())
    }
}
