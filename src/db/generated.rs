//! Generated-document log

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::Result;

/// One generated (filled) document
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedDocument {
    pub id: String,
    pub template_id: String,
    pub fields_filled: i64,
    pub render_warnings: i64,
    pub file_size_bytes: i64,
    pub processing_time_ms: i64,
    pub created_at: String,
}

/// Generated-document repository
pub struct GeneratedDocumentRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> GeneratedDocumentRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a completed fill
    pub async fn record(
        &self,
        template_id: &str,
        fields_filled: i64,
        render_warnings: i64,
        file_size_bytes: i64,
        processing_time_ms: i64,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO generated_documents
                (id, template_id, fields_filled, render_warnings,
                 file_size_bytes, processing_time_ms, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(template_id)
        .bind(fields_filled)
        .bind(render_warnings)
        .bind(file_size_bytes)
        .bind(processing_time_ms)
        .bind(&now)
        .execute(self.pool)
        .await?;

        Ok(id)
    }

    /// List generation history for a template, newest first
    pub async fn list_for_template(&self, template_id: &str) -> Result<Vec<GeneratedDocument>> {
        let docs = sqlx::query_as::<_, GeneratedDocument>(
            r#"
            SELECT id, template_id, fields_filled, render_warnings,
                   file_size_bytes, processing_time_ms, created_at
            FROM generated_documents
            WHERE template_id = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(template_id)
        .fetch_all(self.pool)
        .await?;

        Ok(docs)
    }
}
