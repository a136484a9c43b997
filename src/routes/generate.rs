//! Document generation API routes

use std::collections::HashMap;
use std::time::Instant;

use axum::{
    http::{header, HeaderMap, HeaderValue},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use sqlx::SqlitePool;

use crate::db::{FieldRepository, GeneratedDocumentRepository, TemplateRepository};
use crate::error::{AppError, Result};
use crate::fill::{render, resolve};
use crate::state::AppState;
use crate::storage::BlobStore;

/// Extended state with database pool and blob store
#[derive(Clone)]
pub struct GenerateState {
    pub pool: SqlitePool,
    pub storage: BlobStore,
}

/// Create the generation router
pub fn router(pool: SqlitePool, storage: BlobStore) -> Router<AppState> {
    let state = GenerateState { pool, storage };

    Router::new()
        .route("/", post(generate_document))
        .layer(axum::Extension(state))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    template_id: String,
    values: serde_json::Map<String, Value>,
}

/// Generate a filled document.
///
/// Values are keyed by canonical field name; one value lands at every
/// physical location of a merged group. The response body is the filled PDF,
/// with fill statistics in response headers.
async fn generate_document(
    axum::Extension(state): axum::Extension<GenerateState>,
    Json(data): Json<GenerateRequest>,
) -> Result<(HeaderMap, Vec<u8>)> {
    let started = Instant::now();

    let templates = TemplateRepository::new(&state.pool);
    let template = templates.get(&data.template_id).await?.ok_or_else(|| {
        AppError::NotFound(format!("Template not found: {}", data.template_id))
    })?;
    if template.page_count.is_none() {
        return Err(AppError::BadRequest(
            "template has no PDF document uploaded".to_string(),
        ));
    }

    let values = stringify_values(data.values)?;

    let fields = FieldRepository::new(&state.pool)
        .list_for_template(&data.template_id)
        .await?;
    let instructions = resolve(&fields, &values)?;

    let original = state.storage.get(&template.pdf_key).await?;
    let rendered = render(&original, &instructions)?;

    let elapsed_ms = started.elapsed().as_millis() as i64;
    GeneratedDocumentRepository::new(&state.pool)
        .record(
            &data.template_id,
            rendered.drawn as i64,
            rendered.warnings.len() as i64,
            rendered.bytes.len() as i64,
            elapsed_ms,
        )
        .await?;

    tracing::info!(
        template_id = %data.template_id,
        drawn = rendered.drawn,
        warnings = rendered.warnings.len(),
        elapsed_ms,
        "generated document"
    );
    for warning in &rendered.warnings {
        tracing::warn!(template_id = %data.template_id, warning, "render warning");
    }

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/pdf"),
    );
    headers.insert(
        "x-fields-filled",
        HeaderValue::from_str(&rendered.drawn.to_string())
            .map_err(|e| AppError::Internal(e.to_string()))?,
    );
    headers.insert(
        "x-render-warnings",
        HeaderValue::from_str(&rendered.warnings.len().to_string())
            .map_err(|e| AppError::Internal(e.to_string()))?,
    );

    Ok((headers, rendered.bytes))
}

/// Flatten submitted JSON values to strings.
///
/// Scalars are stringified, nulls are treated as absent, and structured
/// values are rejected outright rather than being serialized into the
/// document.
fn stringify_values(values: serde_json::Map<String, Value>) -> Result<HashMap<String, String>> {
    let mut out = HashMap::with_capacity(values.len());
    for (name, value) in values {
        let text = match value {
            Value::Null => continue,
            Value::String(s) => s,
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::Array(_) | Value::Object(_) => {
                return Err(AppError::BadRequest(format!(
                    "value for field '{}' must be a scalar",
                    name
                )));
            }
        };
        out.insert(name, text);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars_stringify_and_null_is_absent() {
        let mut map = serde_json::Map::new();
        map.insert("name".to_string(), json!("Jane"));
        map.insert("age".to_string(), json!(42));
        map.insert("agreed".to_string(), json!(true));
        map.insert("skip".to_string(), json!(null));

        let values = stringify_values(map).unwrap();
        assert_eq!(values.get("name").map(String::as_str), Some("Jane"));
        assert_eq!(values.get("age").map(String::as_str), Some("42"));
        assert_eq!(values.get("agreed").map(String::as_str), Some("true"));
        assert!(!values.contains_key("skip"));
    }

    #[test]
    fn structured_values_are_rejected() {
        let mut map = serde_json::Map::new();
        map.insert("name".to_string(), json!({"first": "Jane"}));

        let err = stringify_values(map).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
