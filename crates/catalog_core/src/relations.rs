//! Part edges, compatibility edges, colors and direct component colors.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::changes::{apply_field, ChangeSummary};
use crate::context::CallerContext;
use crate::error::{CatalogError, Result};
use crate::model::{
    Color, ComponentColor, ComponentCompatibility, ComponentPart, SubComponentPart,
};
use crate::ports::{AuditAction, Severity};
use crate::projection::{project_color, ColorView};
use crate::service::CatalogService;

fn require_amount(amount: i32) -> Result<()> {
    if amount < 1 {
        return Err(CatalogError::ValidationFailed(format!(
            "amount must be at least 1, got {amount}"
        )));
    }
    Ok(())
}

fn require_distinct(what: &str, a: Uuid, b: Uuid) -> Result<()> {
    if a == b {
        return Err(CatalogError::ValidationFailed(format!(
            "{what} {a} cannot reference itself"
        )));
    }
    Ok(())
}

/// Partial update of a color. `note: ""` clears the note.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColorPatch {
    pub name: Option<String>,
    pub note: Option<String>,
}

impl CatalogService {
    // ── Component parts ────────────────────────────────────────

    pub async fn add_component_part(&self, ctx: &CallerContext, part: ComponentPart) -> Result<()> {
        ctx.require_privileged("add component parts")?;
        require_amount(part.amount)?;
        self.store.insert_component_part(&part).await?;

        info!(component_id = %part.component_id, sub_component_id = %part.sub_component_id, amount = part.amount, "component part added");
        self.audit(
            ctx,
            AuditAction::Create,
            "componentPart",
            format!("{}:{}", part.component_id, part.sub_component_id),
            Severity::Info,
            format!("Added {} x {} to {}", part.amount, part.sub_component_id, part.component_id),
        )
        .await;
        self.emit("componentPart.created", json!(part)).await;
        Ok(())
    }

    pub async fn remove_component_part(
        &self,
        ctx: &CallerContext,
        component_id: Uuid,
        sub_component_id: Uuid,
    ) -> Result<()> {
        ctx.require_privileged("remove component parts")?;
        if !self
            .store
            .delete_component_part(component_id, sub_component_id)
            .await?
        {
            return Err(CatalogError::NotFound(format!(
                "component part {component_id} -> {sub_component_id}"
            )));
        }
        info!(%component_id, %sub_component_id, "component part removed");
        self.audit(
            ctx,
            AuditAction::Delete,
            "componentPart",
            format!("{component_id}:{sub_component_id}"),
            Severity::Info,
            "Removed component part",
        )
        .await;
        self.emit(
            "componentPart.deleted",
            json!({ "componentId": component_id, "subComponentId": sub_component_id }),
        )
        .await;
        Ok(())
    }

    pub async fn component_parts(&self, component_id: Uuid) -> Result<Vec<ComponentPart>> {
        self.store.component_parts(component_id).await
    }

    // ── Sub-component parts ────────────────────────────────────

    pub async fn add_sub_component_part(
        &self,
        ctx: &CallerContext,
        part: SubComponentPart,
    ) -> Result<()> {
        ctx.require_privileged("add sub-component parts")?;
        require_amount(part.amount)?;
        require_distinct("sub-component", part.sub_component_id, part.part_id)?;
        self.store.insert_sub_component_part(&part).await?;

        info!(sub_component_id = %part.sub_component_id, part_id = %part.part_id, amount = part.amount, "sub-component part added");
        self.audit(
            ctx,
            AuditAction::Create,
            "subComponentPart",
            format!("{}:{}", part.sub_component_id, part.part_id),
            Severity::Info,
            format!("Added {} x {} to {}", part.amount, part.part_id, part.sub_component_id),
        )
        .await;
        self.emit("subComponentPart.created", json!(part)).await;
        Ok(())
    }

    pub async fn remove_sub_component_part(
        &self,
        ctx: &CallerContext,
        sub_component_id: Uuid,
        part_id: Uuid,
    ) -> Result<()> {
        ctx.require_privileged("remove sub-component parts")?;
        if !self
            .store
            .delete_sub_component_part(sub_component_id, part_id)
            .await?
        {
            return Err(CatalogError::NotFound(format!(
                "sub-component part {sub_component_id} -> {part_id}"
            )));
        }
        info!(%sub_component_id, %part_id, "sub-component part removed");
        self.audit(
            ctx,
            AuditAction::Delete,
            "subComponentPart",
            format!("{sub_component_id}:{part_id}"),
            Severity::Info,
            "Removed sub-component part",
        )
        .await;
        self.emit(
            "subComponentPart.deleted",
            json!({ "subComponentId": sub_component_id, "partId": part_id }),
        )
        .await;
        Ok(())
    }

    pub async fn sub_component_parts(&self, sub_component_id: Uuid) -> Result<Vec<SubComponentPart>> {
        self.store.sub_component_parts(sub_component_id).await
    }

    // ── Compatibility ──────────────────────────────────────────

    /// Records `component_id -> compatible_component_id`. The reverse edge is
    /// neither created nor checked.
    pub async fn add_compatibility(
        &self,
        ctx: &CallerContext,
        edge: ComponentCompatibility,
    ) -> Result<()> {
        ctx.require_privileged("add compatibilities")?;
        require_distinct("component", edge.component_id, edge.compatible_component_id)?;
        self.store.insert_compatibility(&edge).await?;

        info!(component_id = %edge.component_id, compatible_component_id = %edge.compatible_component_id, "compatibility added");
        self.audit(
            ctx,
            AuditAction::Create,
            "componentCompatibility",
            format!("{}:{}", edge.component_id, edge.compatible_component_id),
            Severity::Info,
            "Added compatibility",
        )
        .await;
        self.emit("componentCompatibility.created", json!(edge)).await;
        Ok(())
    }

    pub async fn remove_compatibility(
        &self,
        ctx: &CallerContext,
        component_id: Uuid,
        compatible_component_id: Uuid,
    ) -> Result<()> {
        ctx.require_privileged("remove compatibilities")?;
        if !self
            .store
            .delete_compatibility(component_id, compatible_component_id)
            .await?
        {
            return Err(CatalogError::NotFound(format!(
                "compatibility {component_id} -> {compatible_component_id}"
            )));
        }
        info!(%component_id, %compatible_component_id, "compatibility removed");
        self.audit(
            ctx,
            AuditAction::Delete,
            "componentCompatibility",
            format!("{component_id}:{compatible_component_id}"),
            Severity::Info,
            "Removed compatibility",
        )
        .await;
        self.emit(
            "componentCompatibility.deleted",
            json!({
                "componentId": component_id,
                "compatibleComponentId": compatible_component_id
            }),
        )
        .await;
        Ok(())
    }

    pub async fn compatibilities(&self, component_id: Uuid) -> Result<Vec<ComponentCompatibility>> {
        self.store.compatibilities(component_id).await
    }

    // ── Colors ─────────────────────────────────────────────────

    pub async fn create_color(&self, ctx: &CallerContext, color: Color) -> Result<()> {
        ctx.require_privileged("create colors")?;
        let color = validate_color(color)?;
        self.store.insert_color(&color).await?;
        self.color_created(ctx, &color).await;
        Ok(())
    }

    async fn color_created(&self, ctx: &CallerContext, color: &Color) {
        info!(code = %color.code, name = %color.name, "color created");
        self.audit(
            ctx,
            AuditAction::Create,
            "color",
            &color.code,
            Severity::Info,
            format!("Created color '{}'", color.name),
        )
        .await;
        self.emit(
            "color.created",
            json!({ "code": color.code, "name": color.name }),
        )
        .await;
    }

    pub async fn update_color(
        &self,
        ctx: &CallerContext,
        code: &str,
        patch: ColorPatch,
    ) -> Result<ChangeSummary> {
        ctx.require_privileged("update colors")?;
        if let Some(name) = &patch.name {
            if name.trim().is_empty() {
                return Err(CatalogError::ValidationFailed("color name must not be empty".into()));
            }
        }
        let mut color = self
            .store
            .find_color(code)
            .await?
            .ok_or_else(|| CatalogError::not_found("color", code))?;
        let mut changes = ChangeSummary::new();
        apply_field(&mut changes, "name", &mut color.name, patch.name);
        apply_field(&mut changes, "note", &mut color.note, patch.note);
        if !self.store.update_color(&color).await? {
            return Err(CatalogError::not_found("color", code));
        }

        info!(%code, changed = changes.len(), "color updated");
        self.audit(
            ctx,
            AuditAction::Update,
            "color",
            code,
            Severity::Info,
            changes.to_string(),
        )
        .await;
        self.emit(
            "color.updated",
            json!({ "code": code, "changedFields": changes.fields() }),
        )
        .await;
        Ok(changes)
    }

    pub async fn get_color(&self, ctx: &CallerContext, code: &str) -> Result<ColorView> {
        let color = self
            .store
            .find_color(code)
            .await?
            .ok_or_else(|| CatalogError::not_found("color", code))?;
        Ok(project_color(&color, ctx.is_privileged))
    }

    pub async fn list_colors(&self, ctx: &CallerContext) -> Result<Vec<ColorView>> {
        let colors = self.store.list_colors().await?;
        Ok(colors
            .iter()
            .map(|c| project_color(c, ctx.is_privileged))
            .collect())
    }

    // ── Component colors ───────────────────────────────────────

    /// Associates a color with a component. An unknown code is created on
    /// the fly only when `name` is supplied; otherwise `InvalidReference`.
    pub async fn add_component_color(
        &self,
        ctx: &CallerContext,
        component_id: Uuid,
        code: &str,
        name: Option<String>,
    ) -> Result<()> {
        ctx.require_privileged("add component colors")?;
        if self.store.components().find_by_id(component_id).await?.is_none() {
            return Err(CatalogError::not_found("component", component_id));
        }
        let new_color = match self.store.find_color(code).await? {
            Some(_) => None,
            None => match name.filter(|n| !n.trim().is_empty()) {
                Some(name) => Some(validate_color(Color {
                    code: code.to_string(),
                    name,
                    note: None,
                })?),
                None => {
                    return Err(CatalogError::InvalidReference(format!(
                        "color {code} does not exist and no name was given"
                    )))
                }
            },
        };
        let association = ComponentColor {
            component_id,
            color_code: code.to_string(),
        };
        self.store
            .insert_component_color(&association, new_color.as_ref())
            .await?;

        if let Some(color) = &new_color {
            self.color_created(ctx, color).await;
        }
        info!(%component_id, %code, "component color added");
        self.audit(
            ctx,
            AuditAction::Create,
            "componentColor",
            format!("{component_id}:{code}"),
            Severity::Info,
            format!("Added color {code} to {component_id}"),
        )
        .await;
        self.emit("componentColor.created", json!(association)).await;
        Ok(())
    }

    pub async fn remove_component_color(
        &self,
        ctx: &CallerContext,
        component_id: Uuid,
        code: &str,
    ) -> Result<()> {
        ctx.require_privileged("remove component colors")?;
        if !self.store.delete_component_color(component_id, code).await? {
            return Err(CatalogError::NotFound(format!(
                "component color {component_id}:{code}"
            )));
        }
        info!(%component_id, %code, "component color removed");
        self.audit(
            ctx,
            AuditAction::Delete,
            "componentColor",
            format!("{component_id}:{code}"),
            Severity::Info,
            format!("Removed color {code} from {component_id}"),
        )
        .await;
        self.emit(
            "componentColor.deleted",
            json!({ "componentId": component_id, "colorCode": code }),
        )
        .await;
        Ok(())
    }

    pub async fn component_colors(
        &self,
        ctx: &CallerContext,
        component_id: Uuid,
    ) -> Result<Vec<ColorView>> {
        let colors = self.store.component_colors(component_id).await?;
        Ok(colors
            .iter()
            .map(|c| project_color(c, ctx.is_privileged))
            .collect())
    }
}

fn validate_color(mut color: Color) -> Result<Color> {
    color.code = color.code.trim().to_string();
    if color.code.is_empty() {
        return Err(CatalogError::ValidationFailed("color code must not be empty".into()));
    }
    if color.name.trim().is_empty() {
        return Err(CatalogError::ValidationFailed(format!(
            "color {} needs a name",
            color.code
        )));
    }
    color.note = color.note.filter(|n| !n.is_empty());
    Ok(color)
}
