//! Database schema initialization

use sqlx::SqlitePool;

use crate::error::Result;

/// Initialize the database schema
pub async fn initialize_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(SCHEMA_SQL).execute(pool).await?;

    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- Document templates (one uploaded PDF each)
CREATE TABLE IF NOT EXISTS templates (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    pdf_key TEXT NOT NULL,
    page_count INTEGER,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_templates_name ON templates(name);

-- Field catalog: one row per declared fillable location.
-- Merge state lives in dedicated columns (group_id / is_primary /
-- primary_field_id / group_name); an alias row always carries a
-- back-reference to its primary.
CREATE TABLE IF NOT EXISTS template_fields (
    id TEXT PRIMARY KEY,
    template_id TEXT NOT NULL,
    field_name TEXT NOT NULL,
    field_type TEXT NOT NULL DEFAULT 'text',
    page_number INTEGER NOT NULL DEFAULT 1,
    x_coordinate REAL NOT NULL DEFAULT 0,
    y_coordinate REAL NOT NULL DEFAULT 0,
    font_size REAL NOT NULL DEFAULT 12,
    is_required INTEGER NOT NULL DEFAULT 0,
    validation_pattern TEXT,
    group_id TEXT,
    is_primary INTEGER,
    primary_field_id TEXT,
    group_name TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_fields_template ON template_fields(template_id);
CREATE INDEX IF NOT EXISTS idx_fields_group ON template_fields(group_id);
CREATE INDEX IF NOT EXISTS idx_fields_primary ON template_fields(primary_field_id);

-- Log of generated (filled) documents, for analytics
CREATE TABLE IF NOT EXISTS generated_documents (
    id TEXT PRIMARY KEY,
    template_id TEXT NOT NULL,
    fields_filled INTEGER NOT NULL DEFAULT 0,
    render_warnings INTEGER NOT NULL DEFAULT 0,
    file_size_bytes INTEGER NOT NULL DEFAULT 0,
    processing_time_ms INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_generated_template ON generated_documents(template_id);
"#;
