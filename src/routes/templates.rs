//! Template API routes

use axum::{
    body::Bytes,
    extract::Path,
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use lopdf::Document;
use sqlx::SqlitePool;

use crate::db::{GeneratedDocument, GeneratedDocumentRepository, Template, TemplateRepository};
use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::storage::BlobStore;

/// Extended state with database pool and blob store
#[derive(Clone)]
pub struct TemplatesState {
    pub pool: SqlitePool,
    pub storage: BlobStore,
}

/// Create the templates router
pub fn router(pool: SqlitePool, storage: BlobStore) -> Router<AppState> {
    let state = TemplatesState { pool, storage };

    Router::new()
        .route("/", post(create_template))
        .route("/", get(list_templates))
        .route("/:id", get(get_template))
        .route("/:id/document", put(upload_document))
        .route("/:id/generated", get(list_generated))
        .layer(axum::Extension(state))
}

#[derive(serde::Deserialize)]
struct CreateTemplate {
    name: String,
}

/// Create a new template
async fn create_template(
    axum::Extension(state): axum::Extension<TemplatesState>,
    Json(data): Json<CreateTemplate>,
) -> Result<(StatusCode, Json<Template>)> {
    if data.name.trim().is_empty() {
        return Err(AppError::BadRequest(
            "template name must not be empty".to_string(),
        ));
    }

    let repo = TemplateRepository::new(&state.pool);
    let template = repo.create(&data.name).await?;

    tracing::info!(template_id = %template.id, "created template");
    Ok((StatusCode::CREATED, Json(template)))
}

/// List all templates
async fn list_templates(
    axum::Extension(state): axum::Extension<TemplatesState>,
) -> Result<Json<Vec<Template>>> {
    let repo = TemplateRepository::new(&state.pool);
    let templates = repo.list().await?;
    Ok(Json(templates))
}

/// Get a specific template
async fn get_template(
    axum::Extension(state): axum::Extension<TemplatesState>,
    Path(id): Path<String>,
) -> Result<Json<Template>> {
    let repo = TemplateRepository::new(&state.pool);
    let template = repo
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Template not found: {}", id)))?;
    Ok(Json(template))
}

/// Upload (or replace) the template's original PDF.
///
/// The bytes are validated as a loadable PDF before anything is stored, so a
/// template never points at a document that cannot be rendered later.
async fn upload_document(
    axum::Extension(state): axum::Extension<TemplatesState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Template>> {
    let repo = TemplateRepository::new(&state.pool);
    let template = repo
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Template not found: {}", id)))?;

    let doc = Document::load_mem(&body)
        .map_err(|e| AppError::BadRequest(format!("not a valid PDF document: {e}")))?;
    let page_count = doc.get_pages().len() as i64;
    if page_count == 0 {
        return Err(AppError::BadRequest(
            "PDF document has no pages".to_string(),
        ));
    }

    state.storage.put(&template.pdf_key, &body).await?;
    repo.set_page_count(&id, page_count).await?;

    tracing::info!(template_id = %id, page_count, size = body.len(), "stored template PDF");

    let template = repo
        .get(&id)
        .await?
        .ok_or_else(|| AppError::Internal("template vanished after upload".to_string()))?;
    Ok(Json(template))
}

/// List generation history for a template, newest first
async fn list_generated(
    axum::Extension(state): axum::Extension<TemplatesState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<GeneratedDocument>>> {
    let templates = TemplateRepository::new(&state.pool);
    if templates.get(&id).await?.is_none() {
        return Err(AppError::NotFound(format!("Template not found: {}", id)));
    }

    let repo = GeneratedDocumentRepository::new(&state.pool);
    let docs = repo.list_for_template(&id).await?;
    Ok(Json(docs))
}
