//! Field catalog database operations
//!
//! Rows are mapped into the typed `Field`/`FieldRole` domain model on the way
//! out. Inconsistent merge columns (an alias without a back-reference, a
//! grouped row without a primary flag) are rejected as catalog corruption
//! rather than being papered over.

use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::catalog::{Field, FieldKind, FieldRole};
use crate::error::{AppError, Result};

const FIELD_COLUMNS: &str = "id, template_id, field_name, field_type, page_number, \
     x_coordinate, y_coordinate, font_size, is_required, validation_pattern, \
     group_id, is_primary, primary_field_id, group_name";

/// Raw field row as persisted
#[derive(Debug, Clone, sqlx::FromRow)]
struct FieldRow {
    id: String,
    template_id: String,
    field_name: String,
    field_type: String,
    page_number: i64,
    x_coordinate: f64,
    y_coordinate: f64,
    font_size: f64,
    is_required: bool,
    validation_pattern: Option<String>,
    group_id: Option<String>,
    is_primary: Option<bool>,
    primary_field_id: Option<String>,
    group_name: Option<String>,
}

/// New field request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewField {
    pub name: String,
    pub kind: FieldKind,
    pub page: u32,
    pub x: f64,
    pub y: f64,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub validation_pattern: Option<String>,
}

fn default_font_size() -> f64 {
    12.0
}

/// Field catalog repository
pub struct FieldRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FieldRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// List the full catalog for a template, in deterministic order.
    ///
    /// Alias lists on primary fields are derived from the alias rows, so
    /// they are always complete here.
    pub async fn list_for_template(&self, template_id: &str) -> Result<Vec<Field>> {
        let sql = format!(
            "SELECT {FIELD_COLUMNS} FROM template_fields \
             WHERE template_id = ? \
             ORDER BY page_number ASC, field_name ASC, id ASC"
        );
        let rows = sqlx::query_as::<_, FieldRow>(&sql)
            .bind(template_id)
            .fetch_all(self.pool)
            .await?;

        assemble(rows)
    }

    /// Fetch a specific set of fields by id.
    ///
    /// Alias lists on primaries are derived from the supplied subset only;
    /// callers needing complete group membership use `list_for_template`
    /// or `list_by_group`.
    pub async fn get_many(&self, template_id: &str, ids: &[String]) -> Result<Vec<Field>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT {FIELD_COLUMNS} FROM template_fields \
             WHERE template_id = ? AND id IN ({placeholders}) \
             ORDER BY page_number ASC, field_name ASC, id ASC"
        );

        let mut query = sqlx::query_as::<_, FieldRow>(&sql).bind(template_id);
        for id in ids {
            query = query.bind(id);
        }
        let rows = query.fetch_all(self.pool).await?;

        assemble(rows)
    }

    /// Fetch all members of a committed field group
    pub async fn list_by_group(&self, template_id: &str, group_id: &str) -> Result<Vec<Field>> {
        let sql = format!(
            "SELECT {FIELD_COLUMNS} FROM template_fields \
             WHERE template_id = ? AND group_id = ? \
             ORDER BY page_number ASC, field_name ASC, id ASC"
        );
        let rows = sqlx::query_as::<_, FieldRow>(&sql)
            .bind(template_id)
            .bind(group_id)
            .fetch_all(self.pool)
            .await?;

        assemble(rows)
    }

    /// Create a new field
    pub async fn create(&self, template_id: &str, new: &NewField) -> Result<Field> {
        if new.page == 0 {
            return Err(AppError::BadRequest(
                "page numbers are 1-based; page 0 is invalid".to_string(),
            ));
        }
        if new.name.trim().is_empty() {
            return Err(AppError::BadRequest("field name must not be empty".to_string()));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO template_fields
                (id, template_id, field_name, field_type, page_number,
                 x_coordinate, y_coordinate, font_size, is_required,
                 validation_pattern, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(template_id)
        .bind(&new.name)
        .bind(new.kind.as_str())
        .bind(new.page as i64)
        .bind(new.x)
        .bind(new.y)
        .bind(new.font_size)
        .bind(new.required)
        .bind(&new.validation_pattern)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await?;

        let mut fields = self.get_many(template_id, &[id]).await?;
        fields.pop().ok_or_else(|| {
            AppError::Internal("Failed to fetch created field".to_string())
        })
    }

    /// Count aliases referencing a field as their primary
    pub async fn alias_count(&self, field_id: &str) -> Result<i64> {
        let result: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM template_fields WHERE primary_field_id = ?
            "#,
        )
        .bind(field_id)
        .fetch_one(self.pool)
        .await?;

        Ok(result.0)
    }

    /// Delete a field. Removal is an explicit operator action; deleting a
    /// group primary is rejected until the group is dissolved.
    pub async fn delete(&self, template_id: &str, field_id: &str) -> Result<bool> {
        if self.alias_count(field_id).await? > 0 {
            return Err(AppError::BadRequest(
                "field is the primary of a merge group; dissolve the group first".to_string(),
            ));
        }

        let result = sqlx::query(
            r#"
            DELETE FROM template_fields WHERE template_id = ? AND id = ?
            "#,
        )
        .bind(template_id)
        .bind(field_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Map persisted rows into domain fields, deriving primary alias lists and
/// rejecting inconsistent merge columns.
fn assemble(rows: Vec<FieldRow>) -> Result<Vec<Field>> {
    let mut aliases_by_primary: HashMap<String, Vec<String>> = HashMap::new();
    for row in &rows {
        if row.group_id.is_some() && row.is_primary == Some(false) {
            if let Some(primary_id) = &row.primary_field_id {
                aliases_by_primary
                    .entry(primary_id.clone())
                    .or_default()
                    .push(row.id.clone());
            }
        }
    }

    rows.into_iter()
        .map(|row| {
            let kind = FieldKind::parse(&row.field_type).ok_or_else(|| {
                AppError::CatalogCorruption(format!(
                    "field {} has unknown type '{}'",
                    row.id, row.field_type
                ))
            })?;

            let page = u32::try_from(row.page_number).map_err(|_| {
                AppError::CatalogCorruption(format!(
                    "field {} has invalid page number {}",
                    row.id, row.page_number
                ))
            })?;

            let role = match (&row.group_id, row.is_primary) {
                (None, _) => {
                    if row.primary_field_id.is_some() {
                        return Err(AppError::CatalogCorruption(format!(
                            "field {} references a primary but has no group",
                            row.id
                        )));
                    }
                    FieldRole::Unmerged
                }
                (Some(group_id), Some(true)) => FieldRole::Primary {
                    group_id: group_id.clone(),
                    group_name: row.group_name.clone().unwrap_or_else(|| row.field_name.clone()),
                    aliases: aliases_by_primary.remove(&row.id).unwrap_or_default(),
                },
                (Some(group_id), Some(false)) => FieldRole::Alias {
                    group_id: group_id.clone(),
                    group_name: row.group_name.clone().unwrap_or_else(|| row.field_name.clone()),
                    primary_id: row.primary_field_id.clone().ok_or_else(|| {
                        AppError::CatalogCorruption(format!(
                            "alias field {} has no primary reference",
                            row.id
                        ))
                    })?,
                },
                (Some(_), None) => {
                    return Err(AppError::CatalogCorruption(format!(
                        "field {} belongs to a group but has no primary flag",
                        row.id
                    )));
                }
            };

            Ok(Field {
                id: row.id,
                template_id: row.template_id,
                name: row.field_name,
                kind,
                page,
                x: row.x_coordinate,
                y: row.y_coordinate,
                font_size: row.font_size,
                required: row.is_required,
                validation_pattern: row.validation_pattern,
                role,
            })
        })
        .collect()
}
