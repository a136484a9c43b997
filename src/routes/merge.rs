//! Field merge API routes

use axum::{
    extract::Path,
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::catalog::{Field, FieldRole};
use crate::db::{FieldRepository, TemplateRepository};
use crate::error::{AppError, Result};
use crate::merge::{MergeCoordinator, MergeOutcome};
use crate::state::AppState;

/// Extended state with database pool
#[derive(Clone)]
pub struct MergeState {
    pub pool: SqlitePool,
}

/// Create the merge router
pub fn router(pool: SqlitePool) -> Router<AppState> {
    let state = MergeState { pool };

    Router::new()
        .route("/:id/merge-fields", post(merge_fields))
        .route("/:id/merge-fields", get(list_groups))
        .route("/:id/merge-fields/:group_id/fields", post(add_to_group))
        .route("/:id/merge-fields/:group_id", delete(dissolve_group))
        .layer(axum::Extension(state))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MergeRequest {
    primary_field_id: String,
    alias_field_ids: Vec<String>,
    #[serde(default)]
    group_name: Option<String>,
}

/// Commit an operator-approved merge, creating a new field group
async fn merge_fields(
    axum::Extension(state): axum::Extension<MergeState>,
    Path(id): Path<String>,
    Json(data): Json<MergeRequest>,
) -> Result<(StatusCode, Json<MergeOutcome>)> {
    require_template(&state.pool, &id).await?;

    let coordinator = MergeCoordinator::new(&state.pool);
    let outcome = coordinator
        .merge(&id, &data.primary_field_id, &data.alias_field_ids, data.group_name)
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// One committed field group
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GroupView {
    group_id: String,
    group_name: String,
    primary_field_id: String,
    fields: Vec<Field>,
}

/// List all committed field groups for a template
async fn list_groups(
    axum::Extension(state): axum::Extension<MergeState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<GroupView>>> {
    require_template(&state.pool, &id).await?;

    let repo = FieldRepository::new(&state.pool);
    let fields = repo.list_for_template(&id).await?;

    // Catalog order is deterministic, so group order is too: by the first
    // member encountered.
    let mut groups: Vec<GroupView> = Vec::new();
    for field in fields {
        let Some(group_id) = field.role.group_id().map(str::to_string) else {
            continue;
        };

        let index = match groups.iter().position(|g| g.group_id == group_id) {
            Some(index) => index,
            None => {
                groups.push(GroupView {
                    group_id: group_id.clone(),
                    group_name: String::new(),
                    primary_field_id: String::new(),
                    fields: Vec::new(),
                });
                groups.len() - 1
            }
        };
        let entry = &mut groups[index];

        match &field.role {
            FieldRole::Primary { group_name, .. } => {
                entry.group_name = group_name.clone();
                entry.primary_field_id = field.id.clone();
            }
            FieldRole::Alias { group_name, .. } => {
                if entry.group_name.is_empty() {
                    entry.group_name = group_name.clone();
                }
            }
            FieldRole::Unmerged => {}
        }
        entry.fields.push(field);
    }

    for group in &groups {
        if group.primary_field_id.is_empty() {
            return Err(AppError::CatalogCorruption(format!(
                "group {} has no primary field",
                group.group_id
            )));
        }
    }

    Ok(Json(groups))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddFieldsRequest {
    field_ids: Vec<String>,
}

/// Add fields to an existing group
async fn add_to_group(
    axum::Extension(state): axum::Extension<MergeState>,
    Path((id, group_id)): Path<(String, String)>,
    Json(data): Json<AddFieldsRequest>,
) -> Result<Json<MergeOutcome>> {
    require_template(&state.pool, &id).await?;

    let coordinator = MergeCoordinator::new(&state.pool);
    let outcome = coordinator.add_to_group(&id, &group_id, &data.field_ids).await?;
    Ok(Json(outcome))
}

/// Dissolved-group response
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DissolveResponse {
    group_id: String,
    released_fields: u64,
}

/// Dissolve a group; every member reverts to an independent field
async fn dissolve_group(
    axum::Extension(state): axum::Extension<MergeState>,
    Path((id, group_id)): Path<(String, String)>,
) -> Result<Json<DissolveResponse>> {
    require_template(&state.pool, &id).await?;

    let coordinator = MergeCoordinator::new(&state.pool);
    let released = coordinator.dissolve(&id, &group_id).await?;
    Ok(Json(DissolveResponse {
        group_id,
        released_fields: released,
    }))
}

async fn require_template(pool: &SqlitePool, id: &str) -> Result<()> {
    let repo = TemplateRepository::new(pool);
    if repo.get(id).await?.is_none() {
        return Err(AppError::NotFound(format!("Template not found: {}", id)));
    }
    Ok(())
}
