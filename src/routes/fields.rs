//! Field catalog API routes

use axum::{
    extract::Path,
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use sqlx::SqlitePool;

use crate::catalog::Field;
use crate::db::{FieldRepository, NewField, TemplateRepository};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Extended state with database pool
#[derive(Clone)]
pub struct FieldsState {
    pub pool: SqlitePool,
}

/// Create the fields router
pub fn router(pool: SqlitePool) -> Router<AppState> {
    let state = FieldsState { pool };

    Router::new()
        .route("/:id/fields", get(list_fields))
        .route("/:id/fields", post(create_field))
        .route("/:id/fields/:field_id", delete(delete_field))
        .layer(axum::Extension(state))
}

/// List the full field catalog for a template
async fn list_fields(
    axum::Extension(state): axum::Extension<FieldsState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Field>>> {
    require_template(&state.pool, &id).await?;

    let repo = FieldRepository::new(&state.pool);
    let fields = repo.list_for_template(&id).await?;
    Ok(Json(fields))
}

/// Create a new field
async fn create_field(
    axum::Extension(state): axum::Extension<FieldsState>,
    Path(id): Path<String>,
    Json(data): Json<NewField>,
) -> Result<(StatusCode, Json<Field>)> {
    require_template(&state.pool, &id).await?;

    let repo = FieldRepository::new(&state.pool);
    let field = repo.create(&id, &data).await?;
    Ok((StatusCode::CREATED, Json(field)))
}

/// Delete a field. Group primaries are rejected until their group is
/// dissolved.
async fn delete_field(
    axum::Extension(state): axum::Extension<FieldsState>,
    Path((id, field_id)): Path<(String, String)>,
) -> Result<StatusCode> {
    require_template(&state.pool, &id).await?;

    let repo = FieldRepository::new(&state.pool);
    let deleted = repo.delete(&id, &field_id).await?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Field not found: {}", field_id)))
    }
}

async fn require_template(pool: &SqlitePool, id: &str) -> Result<()> {
    let repo = TemplateRepository::new(pool);
    if repo.get(id).await?.is_none() {
        return Err(AppError::NotFound(format!("Template not found: {}", id)));
    }
    Ok(())
}
