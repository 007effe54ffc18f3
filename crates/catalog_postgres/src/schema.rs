//! Catalog DDL.
//!
//! Header columns are real columns; kind attributes live in one JSONB object
//! next to the `kind` discriminator. Edge and join tables cascade from their
//! owners so a single `DELETE` removes everything attached to an entity.

use sqlx::PgPool;

pub const SCHEMA: &str = "catalog";

pub const TABLES: &[&str] = &[
    "components",
    "sub_components",
    "component_parts",
    "sub_component_parts",
    "component_compatibilities",
    "colors",
    "component_colors",
    "component_variants",
    "color_variants",
    "audit_log",
    "outbox_events",
];

pub const STATEMENTS: &[&str] = &[
    "CREATE SCHEMA IF NOT EXISTS catalog",
    r#"
    CREATE TABLE IF NOT EXISTS catalog.components (
        id              UUID PRIMARY KEY,
        kind            TEXT NOT NULL,
        name            TEXT NOT NULL,
        manufacturer    TEXT NOT NULL,
        release         DATE,
        note            TEXT,
        created_at      TIMESTAMPTZ NOT NULL,
        last_edited_at  TIMESTAMPTZ NOT NULL,
        version         BIGINT NOT NULL DEFAULT 1,
        attributes      JSONB NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS components_kind_idx ON catalog.components (kind)",
    r#"
    CREATE TABLE IF NOT EXISTS catalog.sub_components (
        id              UUID PRIMARY KEY,
        kind            TEXT NOT NULL,
        name            TEXT NOT NULL,
        manufacturer    TEXT NOT NULL,
        release         DATE,
        note            TEXT,
        created_at      TIMESTAMPTZ NOT NULL,
        last_edited_at  TIMESTAMPTZ NOT NULL,
        version         BIGINT NOT NULL DEFAULT 1,
        attributes      JSONB NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS sub_components_kind_idx ON catalog.sub_components (kind)",
    r#"
    CREATE TABLE IF NOT EXISTS catalog.component_parts (
        component_id      UUID NOT NULL REFERENCES catalog.components (id) ON DELETE CASCADE,
        sub_component_id  UUID NOT NULL REFERENCES catalog.sub_components (id) ON DELETE CASCADE,
        amount            INTEGER NOT NULL CHECK (amount >= 1),
        PRIMARY KEY (component_id, sub_component_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS catalog.sub_component_parts (
        sub_component_id  UUID NOT NULL REFERENCES catalog.sub_components (id) ON DELETE CASCADE,
        part_id           UUID NOT NULL REFERENCES catalog.sub_components (id) ON DELETE CASCADE,
        amount            INTEGER NOT NULL CHECK (amount >= 1),
        PRIMARY KEY (sub_component_id, part_id),
        CHECK (sub_component_id <> part_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS catalog.component_compatibilities (
        component_id             UUID NOT NULL REFERENCES catalog.components (id) ON DELETE CASCADE,
        compatible_component_id  UUID NOT NULL REFERENCES catalog.components (id) ON DELETE CASCADE,
        PRIMARY KEY (component_id, compatible_component_id),
        CHECK (component_id <> compatible_component_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS catalog.colors (
        code  TEXT PRIMARY KEY,
        name  TEXT NOT NULL,
        note  TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS catalog.component_colors (
        component_id  UUID NOT NULL REFERENCES catalog.components (id) ON DELETE CASCADE,
        color_code    TEXT NOT NULL REFERENCES catalog.colors (code),
        PRIMARY KEY (component_id, color_code)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS catalog.component_variants (
        id                UUID PRIMARY KEY,
        component_id      UUID NOT NULL REFERENCES catalog.components (id) ON DELETE CASCADE,
        is_available      BOOLEAN NOT NULL,
        additional_price  NUMERIC,
        note              TEXT,
        created_at        TIMESTAMPTZ NOT NULL,
        last_edited_at    TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS catalog.color_variants (
        variant_id  UUID NOT NULL REFERENCES catalog.component_variants (id) ON DELETE CASCADE,
        color_code  TEXT NOT NULL REFERENCES catalog.colors (code),
        position    INTEGER NOT NULL,
        PRIMARY KEY (variant_id, color_code)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS catalog.audit_log (
        audit_id     BIGSERIAL PRIMARY KEY,
        actor_id     TEXT NOT NULL,
        action       TEXT NOT NULL,
        entity_kind  TEXT NOT NULL,
        source_ip    TEXT,
        entity_id    TEXT NOT NULL,
        severity     TEXT NOT NULL,
        message      TEXT NOT NULL,
        recorded_at  TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS catalog.outbox_events (
        outbox_seq    BIGSERIAL PRIMARY KEY,
        event_id      UUID NOT NULL UNIQUE,
        event_name    TEXT NOT NULL,
        payload       JSONB NOT NULL,
        occurred_at   TIMESTAMPTZ NOT NULL,
        processed_at  TIMESTAMPTZ
    )
    "#,
];

/// Runs every statement in one transaction.
pub async fn apply(pool: &PgPool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for statement in STATEMENTS {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await
}
