//! In-memory `CatalogStore` for tests and embedded use.

use std::collections::{BTreeMap, HashSet};
use std::sync::RwLock;

use anyhow::anyhow;
use async_trait::async_trait;
use uuid::Uuid;

use crate::error::CatalogError;
use crate::model::{
    Color, ColorCascade, ColorVariant, Component, ComponentColor, ComponentCompatibility,
    ComponentPart, ComponentVariant, Record, SubComponent, SubComponentPart,
};
use crate::ports::{ColorStore, EntityStore, RelationStore, Result, VariantStore};
use crate::query::{tokenize, EntityQuery};
use crate::taxonomy::{ComponentAttributes, SubComponentAttributes};

#[derive(Default)]
struct State {
    components: BTreeMap<Uuid, Component>,
    sub_components: BTreeMap<Uuid, SubComponent>,
    component_parts: Vec<ComponentPart>,
    sub_component_parts: Vec<SubComponentPart>,
    compatibilities: Vec<ComponentCompatibility>,
    colors: BTreeMap<String, Color>,
    component_colors: Vec<ComponentColor>,
    /// Variant rows; `color_codes` is rebuilt from `color_variants` on read.
    variants: BTreeMap<Uuid, ComponentVariant>,
    color_variants: Vec<ColorVariant>,
}

impl State {
    fn variant_with_colors(&self, variant: &ComponentVariant) -> ComponentVariant {
        let mut out = variant.clone();
        out.color_codes = self
            .color_variants
            .iter()
            .filter(|cv| cv.variant_id == variant.id)
            .map(|cv| cv.color_code.clone())
            .collect();
        out
    }

    fn require_colors(&self, codes: &[String]) -> Result<()> {
        match codes.iter().find(|code| !self.colors.contains_key(*code)) {
            Some(code) => Err(CatalogError::InvalidReference(format!("color {code}"))),
            None => Ok(()),
        }
    }

    fn remove_variants(&mut self, ids: &HashSet<Uuid>) {
        self.variants.retain(|id, _| !ids.contains(id));
        self.color_variants.retain(|cv| !ids.contains(&cv.variant_id));
    }

    fn purge_component(&mut self, id: Uuid) {
        let variants: HashSet<Uuid> = self
            .variants
            .values()
            .filter(|v| v.component_id == id)
            .map(|v| v.id)
            .collect();
        self.remove_variants(&variants);
        self.component_colors.retain(|cc| cc.component_id != id);
        self.component_parts.retain(|p| p.component_id != id);
        self.compatibilities
            .retain(|c| c.component_id != id && c.compatible_component_id != id);
    }

    fn purge_sub_component(&mut self, id: Uuid) {
        self.component_parts.retain(|p| p.sub_component_id != id);
        self.sub_component_parts
            .retain(|p| p.sub_component_id != id && p.part_id != id);
    }
}

/// Whole catalog behind one `RwLock`. Each method holds a single guard for
/// its full duration, which makes every call atomic.
pub struct MemoryStore {
    inner: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(State::default()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn check_version(stored: i64, loaded: i64) -> Result<()> {
    if stored != loaded {
        return Err(CatalogError::ConflictNotApplied {
            expected: loaded,
            actual: stored,
        });
    }
    Ok(())
}

#[async_trait]
impl EntityStore<ComponentAttributes> for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Component>> {
        let state = self.inner.read().map_err(|e| anyhow!("Lock: {}", e))?;
        Ok(state.components.get(&id).cloned())
    }

    async fn find_many(&self, query: &EntityQuery<ComponentAttributes>) -> Result<Vec<Component>> {
        let state = self.inner.read().map_err(|e| anyhow!("Lock: {}", e))?;
        Ok(query.evaluate(state.components.values()))
    }

    async fn insert(&self, record: &Component) -> Result<()> {
        let mut state = self.inner.write().map_err(|e| anyhow!("Lock: {}", e))?;
        if state.components.contains_key(&record.id()) {
            return Err(CatalogError::ValidationFailed(format!(
                "component {} already exists",
                record.id()
            )));
        }
        state.components.insert(record.id(), record.clone());
        Ok(())
    }

    async fn update(&self, record: &Component, loaded_version: i64) -> Result<()> {
        let mut state = self.inner.write().map_err(|e| anyhow!("Lock: {}", e))?;
        let stored = state
            .components
            .get_mut(&record.id())
            .ok_or_else(|| CatalogError::not_found("component", record.id()))?;
        check_version(stored.header.version, loaded_version)?;
        *stored = record.clone();
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut state = self.inner.write().map_err(|e| anyhow!("Lock: {}", e))?;
        if state.components.remove(&id).is_none() {
            return Ok(false);
        }
        state.purge_component(id);
        Ok(true)
    }
}

#[async_trait]
impl EntityStore<SubComponentAttributes> for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<SubComponent>> {
        let state = self.inner.read().map_err(|e| anyhow!("Lock: {}", e))?;
        Ok(state.sub_components.get(&id).cloned())
    }

    async fn find_many(
        &self,
        query: &EntityQuery<SubComponentAttributes>,
    ) -> Result<Vec<SubComponent>> {
        let state = self.inner.read().map_err(|e| anyhow!("Lock: {}", e))?;
        Ok(query.evaluate(state.sub_components.values()))
    }

    async fn insert(&self, record: &SubComponent) -> Result<()> {
        let mut state = self.inner.write().map_err(|e| anyhow!("Lock: {}", e))?;
        if state.sub_components.contains_key(&record.id()) {
            return Err(CatalogError::ValidationFailed(format!(
                "sub-component {} already exists",
                record.id()
            )));
        }
        state.sub_components.insert(record.id(), record.clone());
        Ok(())
    }

    async fn update(&self, record: &SubComponent, loaded_version: i64) -> Result<()> {
        let mut state = self.inner.write().map_err(|e| anyhow!("Lock: {}", e))?;
        let stored = state
            .sub_components
            .get_mut(&record.id())
            .ok_or_else(|| CatalogError::not_found("sub-component", record.id()))?;
        check_version(stored.header.version, loaded_version)?;
        *stored = record.clone();
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut state = self.inner.write().map_err(|e| anyhow!("Lock: {}", e))?;
        if state.sub_components.remove(&id).is_none() {
            return Ok(false);
        }
        state.purge_sub_component(id);
        Ok(true)
    }
}

#[async_trait]
impl RelationStore for MemoryStore {
    async fn insert_component_part(&self, part: &ComponentPart) -> Result<()> {
        let mut state = self.inner.write().map_err(|e| anyhow!("Lock: {}", e))?;
        if !state.components.contains_key(&part.component_id) {
            return Err(CatalogError::InvalidReference(format!(
                "component {}",
                part.component_id
            )));
        }
        if !state.sub_components.contains_key(&part.sub_component_id) {
            return Err(CatalogError::InvalidReference(format!(
                "sub-component {}",
                part.sub_component_id
            )));
        }
        if state.component_parts.iter().any(|p| {
            p.component_id == part.component_id && p.sub_component_id == part.sub_component_id
        }) {
            return Err(CatalogError::ValidationFailed(format!(
                "component {} already has part {}",
                part.component_id, part.sub_component_id
            )));
        }
        state.component_parts.push(part.clone());
        Ok(())
    }

    async fn delete_component_part(&self, component_id: Uuid, sub_component_id: Uuid) -> Result<bool> {
        let mut state = self.inner.write().map_err(|e| anyhow!("Lock: {}", e))?;
        let before = state.component_parts.len();
        state
            .component_parts
            .retain(|p| !(p.component_id == component_id && p.sub_component_id == sub_component_id));
        Ok(state.component_parts.len() < before)
    }

    async fn component_parts(&self, component_id: Uuid) -> Result<Vec<ComponentPart>> {
        let state = self.inner.read().map_err(|e| anyhow!("Lock: {}", e))?;
        Ok(state
            .component_parts
            .iter()
            .filter(|p| p.component_id == component_id)
            .cloned()
            .collect())
    }

    async fn insert_sub_component_part(&self, part: &SubComponentPart) -> Result<()> {
        let mut state = self.inner.write().map_err(|e| anyhow!("Lock: {}", e))?;
        for id in [part.sub_component_id, part.part_id] {
            if !state.sub_components.contains_key(&id) {
                return Err(CatalogError::InvalidReference(format!("sub-component {id}")));
            }
        }
        if state
            .sub_component_parts
            .iter()
            .any(|p| p.sub_component_id == part.sub_component_id && p.part_id == part.part_id)
        {
            return Err(CatalogError::ValidationFailed(format!(
                "sub-component {} already has part {}",
                part.sub_component_id, part.part_id
            )));
        }
        state.sub_component_parts.push(part.clone());
        Ok(())
    }

    async fn delete_sub_component_part(&self, sub_component_id: Uuid, part_id: Uuid) -> Result<bool> {
        let mut state = self.inner.write().map_err(|e| anyhow!("Lock: {}", e))?;
        let before = state.sub_component_parts.len();
        state
            .sub_component_parts
            .retain(|p| !(p.sub_component_id == sub_component_id && p.part_id == part_id));
        Ok(state.sub_component_parts.len() < before)
    }

    async fn sub_component_parts(&self, sub_component_id: Uuid) -> Result<Vec<SubComponentPart>> {
        let state = self.inner.read().map_err(|e| anyhow!("Lock: {}", e))?;
        Ok(state
            .sub_component_parts
            .iter()
            .filter(|p| p.sub_component_id == sub_component_id)
            .cloned()
            .collect())
    }

    async fn insert_compatibility(&self, edge: &ComponentCompatibility) -> Result<()> {
        let mut state = self.inner.write().map_err(|e| anyhow!("Lock: {}", e))?;
        for id in [edge.component_id, edge.compatible_component_id] {
            if !state.components.contains_key(&id) {
                return Err(CatalogError::InvalidReference(format!("component {id}")));
            }
        }
        if state.compatibilities.contains(edge) {
            return Err(CatalogError::ValidationFailed(format!(
                "component {} is already compatible with {}",
                edge.component_id, edge.compatible_component_id
            )));
        }
        state.compatibilities.push(edge.clone());
        Ok(())
    }

    async fn delete_compatibility(
        &self,
        component_id: Uuid,
        compatible_component_id: Uuid,
    ) -> Result<bool> {
        let mut state = self.inner.write().map_err(|e| anyhow!("Lock: {}", e))?;
        let before = state.compatibilities.len();
        state.compatibilities.retain(|c| {
            !(c.component_id == component_id && c.compatible_component_id == compatible_component_id)
        });
        Ok(state.compatibilities.len() < before)
    }

    async fn compatibilities(&self, component_id: Uuid) -> Result<Vec<ComponentCompatibility>> {
        let state = self.inner.read().map_err(|e| anyhow!("Lock: {}", e))?;
        Ok(state
            .compatibilities
            .iter()
            .filter(|c| c.component_id == component_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ColorStore for MemoryStore {
    async fn find_color(&self, code: &str) -> Result<Option<Color>> {
        let state = self.inner.read().map_err(|e| anyhow!("Lock: {}", e))?;
        Ok(state.colors.get(code).cloned())
    }

    async fn list_colors(&self) -> Result<Vec<Color>> {
        let state = self.inner.read().map_err(|e| anyhow!("Lock: {}", e))?;
        Ok(state.colors.values().cloned().collect())
    }

    async fn insert_color(&self, color: &Color) -> Result<()> {
        let mut state = self.inner.write().map_err(|e| anyhow!("Lock: {}", e))?;
        if state.colors.contains_key(&color.code) {
            return Err(CatalogError::ValidationFailed(format!(
                "color {} already exists",
                color.code
            )));
        }
        state.colors.insert(color.code.clone(), color.clone());
        Ok(())
    }

    async fn update_color(&self, color: &Color) -> Result<bool> {
        let mut state = self.inner.write().map_err(|e| anyhow!("Lock: {}", e))?;
        match state.colors.get_mut(&color.code) {
            Some(stored) => {
                *stored = color.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_color(&self, code: &str) -> Result<Option<ColorCascade>> {
        let mut state = self.inner.write().map_err(|e| anyhow!("Lock: {}", e))?;
        if !state.colors.contains_key(code) {
            return Ok(None);
        }
        let doomed: HashSet<Uuid> = state
            .color_variants
            .iter()
            .filter(|cv| cv.color_code == code)
            .map(|cv| cv.variant_id)
            .collect();
        let mut removed_variants: Vec<Uuid> = doomed.iter().copied().collect();
        removed_variants.sort();
        state.remove_variants(&doomed);

        let before = state.component_colors.len();
        state.component_colors.retain(|cc| cc.color_code != code);
        let removed_component_colors = before - state.component_colors.len();

        state.colors.remove(code);
        Ok(Some(ColorCascade {
            removed_variants,
            removed_component_colors,
        }))
    }

    async fn insert_component_color(
        &self,
        association: &ComponentColor,
        new_color: Option<&Color>,
    ) -> Result<()> {
        let mut state = self.inner.write().map_err(|e| anyhow!("Lock: {}", e))?;
        if !state.components.contains_key(&association.component_id) {
            return Err(CatalogError::not_found("component", association.component_id));
        }
        match new_color {
            Some(color) if state.colors.contains_key(&color.code) => {
                return Err(CatalogError::ValidationFailed(format!(
                    "color {} already exists",
                    color.code
                )));
            }
            Some(_) => {}
            None => state.require_colors(std::slice::from_ref(&association.color_code))?,
        }
        if state.component_colors.contains(association) {
            return Err(CatalogError::ValidationFailed(format!(
                "component {} already has color {}",
                association.component_id, association.color_code
            )));
        }
        if let Some(color) = new_color {
            state.colors.insert(color.code.clone(), color.clone());
        }
        state.component_colors.push(association.clone());
        Ok(())
    }

    async fn delete_component_color(&self, component_id: Uuid, code: &str) -> Result<bool> {
        let mut state = self.inner.write().map_err(|e| anyhow!("Lock: {}", e))?;
        let before = state.component_colors.len();
        state
            .component_colors
            .retain(|cc| !(cc.component_id == component_id && cc.color_code == code));
        Ok(state.component_colors.len() < before)
    }

    async fn component_colors(&self, component_id: Uuid) -> Result<Vec<Color>> {
        let state = self.inner.read().map_err(|e| anyhow!("Lock: {}", e))?;
        Ok(state
            .component_colors
            .iter()
            .filter(|cc| cc.component_id == component_id)
            .filter_map(|cc| state.colors.get(&cc.color_code).cloned())
            .collect())
    }
}

#[async_trait]
impl VariantStore for MemoryStore {
    async fn find_variant(&self, id: Uuid) -> Result<Option<ComponentVariant>> {
        let state = self.inner.read().map_err(|e| anyhow!("Lock: {}", e))?;
        Ok(state.variants.get(&id).map(|v| state.variant_with_colors(v)))
    }

    async fn component_variants(&self, component_id: Uuid) -> Result<Vec<ComponentVariant>> {
        let state = self.inner.read().map_err(|e| anyhow!("Lock: {}", e))?;
        Ok(state
            .variants
            .values()
            .filter(|v| v.component_id == component_id)
            .map(|v| state.variant_with_colors(v))
            .collect())
    }

    async fn insert_variant(&self, variant: &ComponentVariant) -> Result<()> {
        let mut state = self.inner.write().map_err(|e| anyhow!("Lock: {}", e))?;
        if !state.components.contains_key(&variant.component_id) {
            return Err(CatalogError::not_found("component", variant.component_id));
        }
        state.require_colors(&variant.color_codes)?;
        let mut row = variant.clone();
        row.color_codes.clear();
        state.variants.insert(variant.id, row);
        state
            .color_variants
            .extend(variant.color_codes.iter().map(|code| ColorVariant {
                variant_id: variant.id,
                color_code: code.clone(),
            }));
        Ok(())
    }

    async fn update_variant(&self, variant: &ComponentVariant, replace_colors: bool) -> Result<()> {
        let mut state = self.inner.write().map_err(|e| anyhow!("Lock: {}", e))?;
        if !state.variants.contains_key(&variant.id) {
            return Err(CatalogError::not_found("variant", variant.id));
        }
        if replace_colors {
            state.require_colors(&variant.color_codes)?;
        }
        let mut row = variant.clone();
        row.color_codes.clear();
        state.variants.insert(variant.id, row);
        if replace_colors {
            state.color_variants.retain(|cv| cv.variant_id != variant.id);
            state
                .color_variants
                .extend(variant.color_codes.iter().map(|code| ColorVariant {
                    variant_id: variant.id,
                    color_code: code.clone(),
                }));
        }
        Ok(())
    }

    async fn delete_variant(&self, id: Uuid) -> Result<bool> {
        let mut state = self.inner.write().map_err(|e| anyhow!("Lock: {}", e))?;
        if !state.variants.contains_key(&id) {
            return Ok(false);
        }
        state.remove_variants(&HashSet::from([id]));
        Ok(true)
    }

    /// Two phases: materialize every variant's composite text, then filter.
    /// Linear in the number of variants.
    async fn search_variants(&self, text: &str) -> Result<Vec<ComponentVariant>> {
        let state = self.inner.read().map_err(|e| anyhow!("Lock: {}", e))?;
        let terms = tokenize(text);

        let composites: Vec<(ComponentVariant, String)> = state
            .variants
            .values()
            .map(|variant| {
                let variant = state.variant_with_colors(variant);
                let mut composite = state
                    .components
                    .get(&variant.component_id)
                    .map(|c: &Record<ComponentAttributes>| c.header.name.clone())
                    .unwrap_or_default();
                for code in &variant.color_codes {
                    if let Some(color) = state.colors.get(code) {
                        composite.push(' ');
                        composite.push_str(&color.name);
                    }
                }
                (variant, composite.to_lowercase())
            })
            .collect();

        Ok(composites
            .into_iter()
            .filter(|(_, composite)| terms.iter().all(|t| composite.contains(t.as_str())))
            .map(|(variant, _)| variant)
            .collect())
    }
}
