//! Preset repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use vmeter_models::{Preset, PresetId, PresetQuery, PresetScope, PresetUpdate};

use crate::client::{Params, PostgrestClient};
use crate::error::{PostgrestError, PostgrestResult};

/// Default presets table name.
pub const DEFAULT_PRESETS_TABLE: &str = "presets";

/// Storage for loudness presets.
#[async_trait]
pub trait PresetRepository: Send + Sync {
    /// List presets in the query's scope, newest first.
    async fn list(&self, query: &PresetQuery) -> PostgrestResult<Vec<Preset>>;

    /// Fetch one preset. Missing presets are `NotFound`.
    async fn get(&self, id: &PresetId) -> PostgrestResult<Preset>;

    /// Store a new preset and return it as stored.
    async fn create(&self, preset: Preset) -> PostgrestResult<Preset>;

    /// Apply a partial update and return the updated preset.
    async fn update(&self, id: &PresetId, update: &PresetUpdate) -> PostgrestResult<Preset>;

    /// Remove a preset. Missing presets are `NotFound`.
    async fn delete(&self, id: &PresetId) -> PostgrestResult<()>;

    /// Make a preset public.
    async fn share(&self, id: &PresetId) -> PostgrestResult<Preset> {
        self.update(id, &PresetUpdate::share()).await
    }

    /// Verify the backend is reachable.
    async fn health_check(&self) -> PostgrestResult<()>;

    /// Short backend label for logs and readiness output.
    fn backend_name(&self) -> &'static str;
}

/// Row shape of the presets table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetRow {
    pub id: Uuid,
    pub name: String,
    pub target: f64,
    pub tolerance: f64,
    #[serde(default)]
    pub is_mono_check: bool,
    pub created_by: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<Preset> for PresetRow {
    fn from(p: Preset) -> Self {
        Self {
            id: p.id.0,
            name: p.name,
            target: p.target,
            tolerance: p.tolerance,
            is_mono_check: p.is_mono_check,
            created_by: p.created_by,
            is_public: p.is_public,
            created_at: p.created_at,
        }
    }
}

impl From<PresetRow> for Preset {
    fn from(row: PresetRow) -> Self {
        Self {
            id: PresetId(row.id),
            name: row.name,
            target: row.target,
            tolerance: row.tolerance,
            is_mono_check: row.is_mono_check,
            created_by: row.created_by,
            is_public: row.is_public,
            created_at: row.created_at,
        }
    }
}

/// Column patch for partial updates.
#[derive(Debug, Default, Serialize)]
struct PresetPatch<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tolerance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_mono_check: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_public: Option<bool>,
}

impl<'a> From<&'a PresetUpdate> for PresetPatch<'a> {
    fn from(u: &'a PresetUpdate) -> Self {
        Self {
            name: u.name.as_deref().map(str::trim),
            target: u.target,
            tolerance: u.tolerance,
            is_mono_check: u.is_mono_check,
            is_public: u.is_public,
        }
    }
}

/// PostgREST filter value, quoted so commas and parentheses stay literal.
fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Filter and ordering parameters for a listing scope.
pub(crate) fn scope_params(scope: &PresetScope) -> Option<Params> {
    let filter = match scope {
        PresetScope::OwnedOrPublic(user) => (
            "or".to_string(),
            format!("(created_by.eq.{},is_public.eq.true)", quoted(user)),
        ),
        PresetScope::Owned(user) => ("created_by".to_string(), format!("eq.{}", quoted(user))),
        PresetScope::PublicOnly => ("is_public".to_string(), "eq.true".to_string()),
        PresetScope::Empty => return None,
    };

    Some(vec![
        ("select".to_string(), "*".to_string()),
        filter,
        ("order".to_string(), "created_at.desc".to_string()),
    ])
}

fn id_params(id: &PresetId) -> Params {
    vec![("id".to_string(), format!("eq.{}", id))]
}

fn single(rows: Vec<PresetRow>, id: &PresetId) -> PostgrestResult<Preset> {
    rows.into_iter()
        .next()
        .map(Preset::from)
        .ok_or_else(|| PostgrestError::not_found(format!("preset {}", id)))
}

/// Preset repository backed by a PostgREST table.
#[derive(Debug, Clone)]
pub struct PostgrestPresetRepository {
    client: PostgrestClient,
    table: String,
}

impl PostgrestPresetRepository {
    pub fn new(client: PostgrestClient, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }

    /// Create from environment variables (`PRESETS_TABLE` defaults to `presets`).
    pub fn from_env() -> PostgrestResult<Self> {
        let table = std::env::var("PRESETS_TABLE")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PRESETS_TABLE.to_string());
        Ok(Self::new(PostgrestClient::from_env()?, table))
    }
}

#[async_trait]
impl PresetRepository for PostgrestPresetRepository {
    async fn list(&self, query: &PresetQuery) -> PostgrestResult<Vec<Preset>> {
        let Some(params) = scope_params(&query.scope()) else {
            return Ok(Vec::new());
        };

        let rows: Vec<PresetRow> = self
            .client
            .with_retry("list_presets", || self.client.select(&self.table, &params))
            .await?;
        Ok(rows.into_iter().map(Preset::from).collect())
    }

    async fn get(&self, id: &PresetId) -> PostgrestResult<Preset> {
        let mut params = id_params(id);
        params.push(("select".to_string(), "*".to_string()));

        let rows: Vec<PresetRow> = self
            .client
            .with_retry("get_preset", || self.client.select(&self.table, &params))
            .await?;
        single(rows, id)
    }

    async fn create(&self, preset: Preset) -> PostgrestResult<Preset> {
        let id = preset.id;
        let row = PresetRow::from(preset);

        // Not retried: a replayed insert would surface as a conflict
        let rows: Vec<PresetRow> = self.client.insert(&self.table, &[row]).await?;
        let created = single(rows, &id)?;

        info!(preset_id = %created.id, created_by = %created.created_by, "Created preset");
        Ok(created)
    }

    async fn update(&self, id: &PresetId, update: &PresetUpdate) -> PostgrestResult<Preset> {
        if update.is_empty() {
            return self.get(id).await;
        }

        let params = id_params(id);
        let patch = PresetPatch::from(update);

        let rows: Vec<PresetRow> = self
            .client
            .with_retry("update_preset", || self.client.update(&self.table, &params, &patch))
            .await?;
        let updated = single(rows, id)?;

        info!(preset_id = %id, is_public = updated.is_public, "Updated preset");
        Ok(updated)
    }

    async fn delete(&self, id: &PresetId) -> PostgrestResult<()> {
        let params = id_params(id);

        let rows: Vec<PresetRow> = self
            .client
            .with_retry("delete_preset", || self.client.delete(&self.table, &params))
            .await?;
        single(rows, id)?;

        info!(preset_id = %id, "Deleted preset");
        Ok(())
    }

    async fn health_check(&self) -> PostgrestResult<()> {
        let params: Params = vec![
            ("select".to_string(), "id".to_string()),
            ("limit".to_string(), "1".to_string()),
        ];
        let _: Vec<serde_json::Value> = self.client.select(&self.table, &params).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgrest"
    }
}
