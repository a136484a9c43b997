//! Redundancy detection API routes

use axum::{extract::Path, routing::post, Json, Router};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::db::{FieldRepository, TemplateRepository};
use crate::dedup::{detect, suggest_merges, DetectOptions, MergeSuggestion, RedundantGroup};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Extended state with database pool
#[derive(Clone)]
pub struct DedupState {
    pub pool: SqlitePool,
}

/// Create the redundancy-detection router
pub fn router(pool: SqlitePool) -> Router<AppState> {
    let state = DedupState { pool };

    Router::new()
        .route("/:id/detect-redundant", post(detect_redundant))
        .layer(axum::Extension(state))
}

/// Detection report for one template
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DetectionReport {
    template_id: String,
    total_fields: usize,
    redundant_groups: Vec<RedundantGroup>,
    merge_suggestions: Vec<MergeSuggestion>,
    detection_options: DetectOptions,
}

/// Run redundancy detection over a template's catalog.
///
/// The request body may override any threshold; an absent body runs with the
/// defaults. The catalog itself is never mutated here.
async fn detect_redundant(
    axum::Extension(state): axum::Extension<DedupState>,
    Path(id): Path<String>,
    options: Option<Json<DetectOptions>>,
) -> Result<Json<DetectionReport>> {
    let templates = TemplateRepository::new(&state.pool);
    if templates.get(&id).await?.is_none() {
        return Err(AppError::NotFound(format!("Template not found: {}", id)));
    }

    let options = options.map(|Json(o)| o).unwrap_or_default();

    let repo = FieldRepository::new(&state.pool);
    let fields = repo.list_for_template(&id).await?;

    let groups = detect(&fields, &options);
    let suggestions = suggest_merges(&groups);

    tracing::debug!(
        template_id = %id,
        fields = fields.len(),
        groups = groups.len(),
        "redundancy detection complete"
    );

    Ok(Json(DetectionReport {
        template_id: id,
        total_fields: fields.len(),
        redundant_groups: groups,
        merge_suggestions: suggestions,
        detection_options: options,
    }))
}
