//! In-process preset repository for local development.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use vmeter_models::{Preset, PresetId, PresetQuery, PresetUpdate};

use crate::error::{PostgrestError, PostgrestResult};
use crate::repository::PresetRepository;

/// Preset repository held in memory. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryPresetRepository {
    presets: RwLock<HashMap<PresetId, Preset>>,
}

impl InMemoryPresetRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the repository with existing presets.
    pub fn with_presets(presets: impl IntoIterator<Item = Preset>) -> Self {
        Self {
            presets: RwLock::new(presets.into_iter().map(|p| (p.id, p)).collect()),
        }
    }
}

#[async_trait]
impl PresetRepository for InMemoryPresetRepository {
    async fn list(&self, query: &PresetQuery) -> PostgrestResult<Vec<Preset>> {
        let scope = query.scope();
        let presets = self.presets.read().await;

        let mut matched: Vec<Preset> = presets.values().filter(|p| scope.matches(p)).cloned().collect();
        // Newest first; undated rows sort last
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matched)
    }

    async fn get(&self, id: &PresetId) -> PostgrestResult<Preset> {
        self.presets
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| PostgrestError::not_found(format!("preset {}", id)))
    }

    async fn create(&self, preset: Preset) -> PostgrestResult<Preset> {
        let mut presets = self.presets.write().await;
        if presets.contains_key(&preset.id) {
            return Err(PostgrestError::AlreadyExists(format!("preset {}", preset.id)));
        }
        presets.insert(preset.id, preset.clone());
        Ok(preset)
    }

    async fn update(&self, id: &PresetId, update: &PresetUpdate) -> PostgrestResult<Preset> {
        let mut presets = self.presets.write().await;
        let preset = presets
            .get_mut(id)
            .ok_or_else(|| PostgrestError::not_found(format!("preset {}", id)))?;
        update.apply_to(preset);
        Ok(preset.clone())
    }

    async fn delete(&self, id: &PresetId) -> PostgrestResult<()> {
        self.presets
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| PostgrestError::not_found(format!("preset {}", id)))
    }

    async fn health_check(&self) -> PostgrestResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
