//! Template database operations

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::Result;

/// Template record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub name: String,
    /// Blob-store key of the original PDF bytes
    pub pdf_key: String,
    pub page_count: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

/// Template repository
pub struct TemplateRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> TemplateRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new template. The PDF itself is stored separately under the
    /// returned `pdf_key`.
    pub async fn create(&self, name: &str) -> Result<Template> {
        let id = Uuid::new_v4().to_string();
        let pdf_key = format!("templates/{}.pdf", id);
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO templates (id, name, pdf_key, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(name)
        .bind(&pdf_key)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await?;

        self.get(&id).await?.ok_or_else(|| {
            crate::error::AppError::Internal("Failed to fetch created template".to_string())
        })
    }

    /// Get a template by id
    pub async fn get(&self, id: &str) -> Result<Option<Template>> {
        let template = sqlx::query_as::<_, Template>(
            r#"
            SELECT id, name, pdf_key, page_count, created_at, updated_at
            FROM templates
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(template)
    }

    /// List all templates
    pub async fn list(&self) -> Result<Vec<Template>> {
        let templates = sqlx::query_as::<_, Template>(
            r#"
            SELECT id, name, pdf_key, page_count, created_at, updated_at
            FROM templates
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(templates)
    }

    /// Record the page count after the original PDF has been stored
    pub async fn set_page_count(&self, id: &str, page_count: i64) -> Result<bool> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"
            UPDATE templates
            SET page_count = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(page_count)
        .bind(&now)
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
