//! Component variants and their colors.
//!
//! A variant's color set is written together with the variant row. Updates
//! resolve every new code before any join row is touched.

use std::collections::BTreeSet;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::changes::{apply_field, ChangeSummary};
use crate::context::CallerContext;
use crate::error::{CatalogError, Result};
use crate::model::{ColorCascade, ComponentVariant};
use crate::ports::{AuditAction, Severity};
use crate::projection::{project_variant, VariantView};
use crate::service::CatalogService;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVariant {
    pub component_id: Uuid,
    #[serde(default)]
    pub color_codes: Vec<String>,
    #[serde(default)]
    pub is_available: bool,
    #[serde(default)]
    pub additional_price: Option<Decimal>,
    #[serde(default)]
    pub note: Option<String>,
}

impl NewVariant {
    pub fn new(component_id: Uuid) -> Self {
        Self {
            component_id,
            color_codes: Vec::new(),
            is_available: true,
            additional_price: None,
            note: None,
        }
    }

    pub fn colors<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.color_codes = codes.into_iter().map(Into::into).collect();
        self
    }

    pub fn priced(mut self, additional_price: Decimal) -> Self {
        self.additional_price = Some(additional_price);
        self
    }
}

/// Partial update of a variant. `additionalPrice: 0` and `note: ""` clear.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VariantPatch {
    pub color_codes: Option<Vec<String>>,
    pub is_available: Option<bool>,
    pub additional_price: Option<Decimal>,
    pub note: Option<String>,
}

/// Trims, drops blanks and collapses duplicates, keeping first occurrence.
fn distinct_codes(codes: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    codes
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty() && seen.insert(c.clone()))
        .collect()
}

fn same_colors(a: &[String], b: &[String]) -> bool {
    a.iter().collect::<BTreeSet<_>>() == b.iter().collect::<BTreeSet<_>>()
}

impl CatalogService {
    pub async fn create_variant(&self, ctx: &CallerContext, request: NewVariant) -> Result<Uuid> {
        ctx.require_privileged("create variants")?;
        let now = Utc::now();
        let variant = ComponentVariant {
            id: Uuid::new_v4(),
            component_id: request.component_id,
            is_available: request.is_available,
            additional_price: request.additional_price.filter(|p| !p.is_zero()),
            note: request.note.filter(|n| !n.is_empty()),
            color_codes: distinct_codes(request.color_codes),
            created_at: now,
            last_edited_at: now,
        };
        self.store.insert_variant(&variant).await?;

        let id = variant.id;
        info!(%id, component_id = %variant.component_id, colors = variant.color_codes.len(), "variant created");
        self.audit(
            ctx,
            AuditAction::Create,
            "componentVariant",
            id,
            Severity::Info,
            format!(
                "Created variant of {} in [{}]",
                variant.component_id,
                variant.color_codes.join(", ")
            ),
        )
        .await;
        self.emit(
            "componentVariant.created",
            json!({
                "id": id,
                "componentId": variant.component_id,
                "colorCodes": variant.color_codes,
            }),
        )
        .await;
        Ok(id)
    }

    pub async fn update_variant(
        &self,
        ctx: &CallerContext,
        id: Uuid,
        patch: VariantPatch,
    ) -> Result<ChangeSummary> {
        ctx.require_privileged("update variants")?;
        let mut variant = self
            .store
            .find_variant(id)
            .await?
            .ok_or_else(|| CatalogError::not_found("variant", id))?;

        let mut changes = ChangeSummary::new();
        let mut replace_colors = false;
        if let Some(codes) = patch.color_codes {
            let codes = distinct_codes(codes);
            if !same_colors(&variant.color_codes, &codes) {
                let previous = std::mem::replace(&mut variant.color_codes, codes);
                changes.record("colors", format!("[{}]", previous.join(", ")));
                replace_colors = true;
            }
        }
        apply_field(&mut changes, "isAvailable", &mut variant.is_available, patch.is_available);
        apply_field(
            &mut changes,
            "additionalPrice",
            &mut variant.additional_price,
            patch.additional_price,
        );
        apply_field(&mut changes, "note", &mut variant.note, patch.note);
        variant.last_edited_at = Utc::now();

        self.store.update_variant(&variant, replace_colors).await?;

        info!(%id, changed = changes.len(), replace_colors, "variant updated");
        self.audit(
            ctx,
            AuditAction::Update,
            "componentVariant",
            id,
            Severity::Info,
            changes.to_string(),
        )
        .await;
        self.emit(
            "componentVariant.updated",
            json!({ "id": id, "changedFields": changes.fields() }),
        )
        .await;
        Ok(changes)
    }

    pub async fn delete_variant(&self, ctx: &CallerContext, id: Uuid) -> Result<()> {
        ctx.require_privileged("delete variants")?;
        if !self.store.delete_variant(id).await? {
            return Err(CatalogError::not_found("variant", id));
        }
        info!(%id, "variant deleted");
        self.audit(
            ctx,
            AuditAction::Delete,
            "componentVariant",
            id,
            Severity::Warning,
            "Deleted variant",
        )
        .await;
        self.emit("componentVariant.deleted", json!({ "id": id })).await;
        Ok(())
    }

    pub async fn get_variant(&self, ctx: &CallerContext, id: Uuid) -> Result<VariantView> {
        let variant = self
            .store
            .find_variant(id)
            .await?
            .ok_or_else(|| CatalogError::not_found("variant", id))?;
        Ok(project_variant(&variant, ctx.is_privileged))
    }

    pub async fn component_variants(
        &self,
        ctx: &CallerContext,
        component_id: Uuid,
    ) -> Result<Vec<VariantView>> {
        let variants = self.store.component_variants(component_id).await?;
        Ok(variants
            .iter()
            .map(|v| project_variant(v, ctx.is_privileged))
            .collect())
    }

    /// Variants whose component name plus color names contain every term.
    pub async fn search_variants(&self, ctx: &CallerContext, text: &str) -> Result<Vec<VariantView>> {
        let variants = self.store.search_variants(text).await?;
        Ok(variants
            .iter()
            .map(|v| project_variant(v, ctx.is_privileged))
            .collect())
    }

    /// Deletes a color together with every variant that uses it and every
    /// direct component association.
    pub async fn delete_color(&self, ctx: &CallerContext, code: &str) -> Result<ColorCascade> {
        ctx.require_privileged("delete colors")?;
        let cascade = self
            .store
            .delete_color(code)
            .await?
            .ok_or_else(|| CatalogError::not_found("color", code))?;

        info!(
            %code,
            removed_variants = cascade.removed_variants.len(),
            removed_component_colors = cascade.removed_component_colors,
            "color deleted"
        );
        for variant_id in &cascade.removed_variants {
            self.emit(
                "componentVariant.deleted",
                json!({ "id": variant_id, "colorCode": code }),
            )
            .await;
        }
        let severity = if cascade.removed_variants.is_empty() {
            Severity::Warning
        } else {
            Severity::Critical
        };
        self.audit(
            ctx,
            AuditAction::Delete,
            "color",
            code,
            severity,
            format!(
                "Deleted color {code}; removed {} variant(s) and {} component color(s)",
                cascade.removed_variants.len(),
                cascade.removed_component_colors
            ),
        )
        .await;
        self.emit("color.deleted", json!({ "code": code, "cascade": cascade }))
            .await;
        Ok(cascade)
    }
}
